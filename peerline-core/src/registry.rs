//! In-memory peer table: peers heard from, plus the actively-connected set.

use std::collections::HashSet;

use crate::peer::PeerAddr;

/// Table of known peers. A peer is present iff at least one inbound message
/// was received from it and no disconnect has been processed since.
/// Insertion order is preserved so menu numbering stays stable.
///
/// The registry itself is single-threaded; the host serializes access by
/// holding it behind one mutex (see the node crate).
#[derive(Debug, Default)]
pub struct PeerRegistry {
    entries: Vec<PeerAddr>,
    connected: HashSet<PeerAddr>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert if absent; no-op if present (first-seen wins).
    pub fn upsert(&mut self, addr: PeerAddr) {
        if !self.entries.contains(&addr) {
            self.entries.push(addr);
        }
    }

    /// Remove if present; removing an unknown peer is not an error.
    /// Also forgets any active-connection mark for the address.
    pub fn remove(&mut self, addr: PeerAddr) {
        self.entries.retain(|e| *e != addr);
        self.connected.remove(&addr);
    }

    pub fn contains(&self, addr: PeerAddr) -> bool {
        self.entries.contains(&addr)
    }

    /// Snapshot of known peers in insertion order.
    pub fn list(&self) -> Vec<PeerAddr> {
        self.entries.clone()
    }

    /// Mark a peer as actively (outbound) connected.
    pub fn mark_connected(&mut self, addr: PeerAddr) {
        self.connected.insert(addr);
    }

    pub fn is_connected(&self, addr: PeerAddr) -> bool {
        self.connected.contains(&addr)
    }

    /// Known peers we have not actively connected to yet, in insertion order.
    pub fn unconnected(&self) -> Vec<PeerAddr> {
        self.entries
            .iter()
            .filter(|a| !self.connected.contains(*a))
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> PeerAddr {
        s.parse().unwrap()
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut reg = PeerRegistry::new();
        for _ in 0..5 {
            reg.upsert(addr("10.0.0.1:4000"));
        }
        assert_eq!(reg.list(), vec![addr("10.0.0.1:4000")]);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let mut reg = PeerRegistry::new();
        reg.upsert(addr("10.0.0.3:4000"));
        reg.upsert(addr("10.0.0.1:4000"));
        reg.upsert(addr("10.0.0.2:4000"));
        reg.upsert(addr("10.0.0.1:4000")); // re-seen, keeps original slot
        assert_eq!(
            reg.list(),
            vec![
                addr("10.0.0.3:4000"),
                addr("10.0.0.1:4000"),
                addr("10.0.0.2:4000"),
            ]
        );
    }

    #[test]
    fn remove_absent_is_a_noop() {
        let mut reg = PeerRegistry::new();
        reg.upsert(addr("10.0.0.1:4000"));
        reg.remove(addr("10.0.0.9:4000"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn remove_drops_connected_mark() {
        let mut reg = PeerRegistry::new();
        reg.upsert(addr("10.0.0.1:4000"));
        reg.mark_connected(addr("10.0.0.1:4000"));
        assert!(reg.is_connected(addr("10.0.0.1:4000")));
        reg.remove(addr("10.0.0.1:4000"));
        assert!(!reg.is_connected(addr("10.0.0.1:4000")));
        assert!(reg.is_empty());
    }

    #[test]
    fn unconnected_excludes_marked_peers() {
        let mut reg = PeerRegistry::new();
        reg.upsert(addr("10.0.0.1:4000"));
        reg.upsert(addr("10.0.0.2:4000"));
        reg.mark_connected(addr("10.0.0.1:4000"));
        assert_eq!(reg.unconnected(), vec![addr("10.0.0.2:4000")]);
    }
}
