//! Dashboard KPIs over the current snapshot.

use crate::{
    config::ReportConfig,
    record::{StudentRecord, StudentStatus, Transaction},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub active_students: u32,
    /// Sum of all transaction amounts, refunds included as stored.
    pub revenue: f64,
    /// Sum of negative balances, as a positive amount.
    pub outstanding_debt: f64,
    pub at_risk_students: u32,
}

impl DashboardSummary {
    pub fn compute(
        students:     &[StudentRecord],
        transactions: &[Transaction],
        config:       &ReportConfig,
    ) -> Self {
        let active_students = students
            .iter()
            .filter(|s| s.status == StudentStatus::Active)
            .count() as u32;
        let revenue = transactions.iter().map(|t| t.amount).sum();
        let outstanding_debt = students
            .iter()
            .filter(|s| s.balance < 0.0)
            .map(|s| s.balance.abs())
            .sum();
        let at_risk_students = students
            .iter()
            .filter(|s| s.consecutive_absences >= config.at_risk_absence_threshold)
            .count() as u32;
        Self {
            active_students,
            revenue,
            outstanding_debt,
            at_risk_students,
        }
    }
}
