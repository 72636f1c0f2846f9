//! Arithmetic dimension expressions.
//!
//! Every dimension in the model (positions, thicknesses, depths,
//! radii) is stored as an expression string and resolved against the
//! parameter table at build time: `"plate_w / 2 - 1.5"`. The grammar
//! is plain arithmetic: numbers, parameter names, `+ - * /`, unary
//! minus, and parentheses. Evaluation is pure and deterministic.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ExprError;
use crate::params::ParamSet;

/// A dimension expression, kept as authored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expr(pub String);

impl Expr {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    /// A constant-valued expression.
    pub fn number(value: f64) -> Self {
        Self(format!("{}", value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Evaluates the expression to millimeters.
    pub fn eval(&self, params: &ParamSet) -> Result<f64, ExprError> {
        let mut parser = Parser {
            src: self.0.as_bytes(),
            pos: 0,
            params,
        };
        let value = parser.expr()?;
        parser.skip_ws();
        if parser.pos != parser.src.len() {
            return Err(ExprError::Parse {
                offset: parser.pos,
                message: "trailing input".to_string(),
            });
        }
        if !value.is_finite() {
            return Err(ExprError::NotFinite);
        }
        Ok(value)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::number(value)
    }
}

impl From<&str> for Expr {
    fn from(source: &str) -> Self {
        Expr::new(source)
    }
}

/// Recursive-descent evaluator over the expression bytes.
struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    params: &'a ParamSet,
}

impl<'a> Parser<'a> {
    fn skip_ws(&mut self) {
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.src.get(self.pos).copied()
    }

    fn expr(&mut self) -> Result<f64, ExprError> {
        let mut acc = self.term()?;
        loop {
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    acc += self.term()?;
                }
                Some(b'-') => {
                    self.pos += 1;
                    acc -= self.term()?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn term(&mut self) -> Result<f64, ExprError> {
        let mut acc = self.factor()?;
        loop {
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    acc *= self.factor()?;
                }
                Some(b'/') => {
                    self.pos += 1;
                    let rhs = self.factor()?;
                    if rhs == 0.0 {
                        return Err(ExprError::DivisionByZero);
                    }
                    acc /= rhs;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn factor(&mut self) -> Result<f64, ExprError> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some(b'(') => {
                self.pos += 1;
                let value = self.expr()?;
                if self.peek() != Some(b')') {
                    return Err(ExprError::Parse {
                        offset: self.pos,
                        message: "expected ')'".to_string(),
                    });
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => self.identifier(),
            _ => Err(ExprError::Parse {
                offset: self.pos,
                message: "expected number, parameter, or '('".to_string(),
            }),
        }
    }

    fn number(&mut self) -> Result<f64, ExprError> {
        let start = self.pos;
        while self
            .src
            .get(self.pos)
            .is_some_and(|c| c.is_ascii_digit() || *c == b'.')
        {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).expect("ascii digits");
        text.parse::<f64>().map_err(|_| ExprError::Parse {
            offset: start,
            message: format!("invalid number '{}'", text),
        })
    }

    fn identifier(&mut self) -> Result<f64, ExprError> {
        let start = self.pos;
        while self
            .src
            .get(self.pos)
            .is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_')
        {
            self.pos += 1;
        }
        let name = std::str::from_utf8(&self.src[start..self.pos]).expect("ascii identifier");
        self.params
            .get_mm(name)
            .ok_or_else(|| ExprError::UnknownParameter(name.to_string()))
    }
}


#[cfg(test)]
mod properties {
    use super::*;
    use crate::params::Parameter;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_number_literals_round_trip(value in -1.0e6f64..1.0e6) {
            let p = ParamSet::new();
            let resolved = Expr::number(value).eval(&p).unwrap();
            prop_assert_eq!(resolved.to_bits(), value.to_bits());
        }

        #[test]
        fn prop_eval_is_pure(a in -1.0e3f64..1.0e3, b in 0.001f64..1.0e3) {
            let p = ParamSet::from_parameters([
                Parameter::new("a", a),
                Parameter::new("b", b),
            ]);
            let e = Expr::new("(a + b) * 2 - a / b");
            let first = e.eval(&p).unwrap();
            let second = e.eval(&p).unwrap();
            prop_assert_eq!(first.to_bits(), second.to_bits());
        }

        #[test]
        fn prop_arbitrary_input_never_panics(source in "[ -~]{0,32}") {
            let p = ParamSet::new();
            // Garbage must come back as Err, never a panic.
            let _ = Expr::new(source).eval(&p);
        }
    }
}
