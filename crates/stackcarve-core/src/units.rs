//! Unit handling for parameter values.
//!
//! All engine-internal geometry is millimeters; parameters authored in
//! inches are converted once when resolved.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MM_PER_INCH: f64 = 25.4;

/// Unit a parameter value was authored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Millimeters.
    Millimeters,
    /// Inches.
    Inches,
}

impl Unit {
    /// Converts a value in this unit to millimeters.
    pub fn to_mm(&self, value: f64) -> f64 {
        match self {
            Unit::Millimeters => value,
            Unit::Inches => value * MM_PER_INCH,
        }
    }
}

impl Default for Unit {
    fn default() -> Self {
        Self::Millimeters
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Millimeters => write!(f, "mm"),
            Unit::Inches => write!(f, "in"),
        }
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mm" | "millimeters" => Ok(Self::Millimeters),
            "in" | "inch" | "inches" => Ok(Self::Inches),
            _ => Err(format!("Unknown unit: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_mm() {
        assert_eq!(Unit::Millimeters.to_mm(12.5), 12.5);
        assert!((Unit::Inches.to_mm(1.0) - 25.4).abs() < 1e-12);
    }

    #[test]
    fn test_parse() {
        assert_eq!("mm".parse::<Unit>().unwrap(), Unit::Millimeters);
        assert_eq!("Inch".parse::<Unit>().unwrap(), Unit::Inches);
        assert!("furlong".parse::<Unit>().is_err());
    }
}
