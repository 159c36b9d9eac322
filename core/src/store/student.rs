use super::{DeskStore, StoreKey};
use crate::{
    error::DeskResult,
    record::{StudentRecord, Transaction},
};

impl DeskStore {
    // ── Students ──────────────────────────────────────────────────

    pub fn students(&self) -> Vec<StudentRecord> {
        self.get_each(StoreKey::Students)
    }

    pub fn save_students(&self, students: &[StudentRecord]) -> DeskResult<()> {
        self.set(StoreKey::Students, students)
    }

    // ── Transactions ──────────────────────────────────────────────

    pub fn transactions(&self) -> Vec<Transaction> {
        self.get_each(StoreKey::Transactions)
    }

    pub fn save_transactions(&self, transactions: &[Transaction]) -> DeskResult<()> {
        self.set(StoreKey::Transactions, transactions)
    }
}
