//! Document financial engine: totals, balances, numbering and status rules.
//!
//! Everything here is pure. Persistence and HTTP concerns live in
//! `services::database` and `handlers`.

pub mod balance;
pub mod numbering;
pub mod status;
pub mod summary;
pub mod totals;

pub use balance::{calculate_balance_due, validate_financial_rules};
pub use numbering::{format_document_number, generate_document_number, parse_document_number};
pub use status::ensure_transition;
pub use summary::{DashboardSummary, DocumentFigures, LedgerTotals};
pub use totals::{
    compute_totals, estimate_financials, total_from_breakdown, EstimateFinancials, FinancialTotals,
};

use crate::models::DocumentStatus;
use rust_decimal::Decimal;
use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FinancialRuleError {
    #[error("Total value cannot be negative")]
    NegativeTotal,

    #[error("Balance due cannot be negative")]
    NegativeBalance,

    #[error("Balance due cannot exceed total value")]
    BalanceExceedsTotal,

    #[error("Paid documents must have balance due of 0")]
    PaidWithBalance,

    #[error("Invalid status transition from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },

    #[error("Financial breakdown is only available for estimates")]
    NotAnEstimate,

    #[error("Provide either sections or items, not both")]
    ConflictingBreakdown,

    #[error("Amounts are too large to calculate")]
    Overflow,

    #[error("Total value exceeds the maximum supported amount")]
    TotalTooLarge,
}

impl From<FinancialRuleError> for AppError {
    fn from(err: FinancialRuleError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

/// Largest amount a NUMERIC(14,2) money column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Largest rate a NUMERIC(6,3) tax rate column holds.
pub const MAX_TAX_RATE: Decimal = Decimal::from_parts(999_999, 0, 0, false, 3);

/// Money and percentages are reported to the cent.
pub(crate) fn round_money(value: Decimal) -> Decimal {
    value.round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_column_bounds() {
        assert_eq!(MAX_AMOUNT, dec!(999999999999.99));
        assert_eq!(MAX_TAX_RATE, dec!(999.999));
    }
}
