//! Last-writer-wins commit gate for concurrent layer builds.
//!
//! Inputs can change while a build is in flight. Each build takes a
//! ticket before reading its inputs; a superseded build's result is
//! refused at commit time, so an older generation can never overwrite
//! a newer one.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use stackcarve_core::model::{FootprintId, LayerId};

use crate::builder::LayerBuildOutput;

/// Key of one committed build result.
pub type BuildKey = (FootprintId, LayerId);

/// Proof that a build started at a particular input generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildTicket {
    generation: u64,
}

/// Generation counter plus the committed result table.
#[derive(Debug, Default)]
pub struct BuildGate {
    generation: AtomicU64,
    committed: Mutex<HashMap<BuildKey, (u64, LayerBuildOutput)>>,
}

impl BuildGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new build generation, invalidating all outstanding
    /// tickets. Call when inputs change and before each rebuild.
    pub fn begin(&self) -> BuildTicket {
        BuildTicket {
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    /// The current generation without starting a new one.
    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Commits a build result unless the ticket is stale. Returns
    /// whether the result was accepted.
    pub fn commit(&self, key: BuildKey, ticket: BuildTicket, output: LayerBuildOutput) -> bool {
        if ticket.generation < self.current() {
            return false;
        }
        let mut committed = self.committed.lock();
        match committed.get(&key) {
            Some((existing, _)) if *existing > ticket.generation => false,
            _ => {
                committed.insert(key, (ticket.generation, output));
                true
            }
        }
    }

    /// Last committed output for a (footprint, layer) pair.
    pub fn result(&self, key: &BuildKey) -> Option<LayerBuildOutput> {
        self.committed.lock().get(key).map(|(_, output)| output.clone())
    }

    /// Drops the committed result for a pair, if any.
    pub fn invalidate(&self, key: &BuildKey) {
        self.committed.lock().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn key() -> BuildKey {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    fn output() -> LayerBuildOutput {
        LayerBuildOutput::default()
    }

    #[test]
    fn test_fresh_ticket_commits() {
        let gate = BuildGate::new();
        let key = key();
        let ticket = gate.begin();
        assert!(gate.commit(key, ticket, output()));
        assert!(gate.result(&key).is_some());
    }

    #[test]
    fn test_stale_ticket_is_refused() {
        let gate = BuildGate::new();
        let key = key();
        let stale = gate.begin();
        let fresh = gate.begin();
        assert!(gate.commit(key, fresh, output()));
        assert!(!gate.commit(key, stale, output()));
    }

    #[test]
    fn test_stale_ticket_refused_even_before_fresh_commit() {
        let gate = BuildGate::new();
        let key = key();
        let stale = gate.begin();
        let _fresh = gate.begin();
        // The newer generation exists, so the old result must not
        // become visible even transiently.
        assert!(!gate.commit(key, stale, output()));
        assert!(gate.result(&key).is_none());
    }

    #[test]
    fn test_keys_are_independent() {
        let gate = BuildGate::new();
        let a = key();
        let b = key();
        let ticket = gate.begin();
        assert!(gate.commit(a, ticket, output()));
        assert!(gate.result(&a).is_some());
        assert!(gate.result(&b).is_none());
    }

    #[test]
    fn test_invalidate_clears_result() {
        let gate = BuildGate::new();
        let key = key();
        let ticket = gate.begin();
        gate.commit(key, ticket, output());
        gate.invalidate(&key);
        assert!(gate.result(&key).is_none());
    }
}
