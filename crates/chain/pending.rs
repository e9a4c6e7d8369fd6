//! The pending-transaction set: an insertion-ordered list of hashes whose
//! status is not yet terminal (§3's `PendingTransactions`).

use std::collections::HashSet;

use photon_common::transaction::TxHash;

#[derive(Default)]
pub struct PendingTransactions {
    order: Vec<TxHash>,
    members: HashSet<TxHash>,
}

impl PendingTransactions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, hash: &TxHash) -> bool {
        self.members.contains(hash)
    }

    /// Appends `hash` if it isn't already pending.
    pub fn add(&mut self, hash: TxHash) {
        if self.members.insert(hash) {
            self.order.push(hash);
        }
    }

    /// Removes `hash` if present. No-op otherwise.
    pub fn remove(&mut self, hash: &TxHash) {
        if self.members.remove(hash) {
            self.order.retain(|h| h != hash);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TxHash> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::H256;

    #[test]
    fn preserves_insertion_order() {
        let mut pending = PendingTransactions::new();
        let a = H256::repeat_byte(1);
        let b = H256::repeat_byte(2);
        let c = H256::repeat_byte(3);
        pending.add(a);
        pending.add(b);
        pending.add(c);
        assert_eq!(pending.iter().copied().collect::<Vec<_>>(), vec![a, b, c]);
    }

    #[test]
    fn add_is_idempotent() {
        let mut pending = PendingTransactions::new();
        let a = H256::repeat_byte(1);
        pending.add(a);
        pending.add(a);
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn remove_preserves_remaining_order() {
        let mut pending = PendingTransactions::new();
        let a = H256::repeat_byte(1);
        let b = H256::repeat_byte(2);
        let c = H256::repeat_byte(3);
        pending.add(a);
        pending.add(b);
        pending.add(c);
        pending.remove(&b);
        assert_eq!(pending.iter().copied().collect::<Vec<_>>(), vec![a, c]);
        assert!(!pending.contains(&b));
    }
}
