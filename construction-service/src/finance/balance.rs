use super::{FinancialRuleError, MAX_AMOUNT};
use crate::models::DocumentStatus;
use rust_decimal::Decimal;

/// Balance due implied by a document's status.
pub fn calculate_balance_due(
    total_value: Decimal,
    provided_balance: Decimal,
    status: DocumentStatus,
) -> Decimal {
    match status {
        DocumentStatus::Paid => Decimal::ZERO,
        DocumentStatus::Pending | DocumentStatus::Accepted => total_value,
        DocumentStatus::Draft | DocumentStatus::Overdue => provided_balance.min(total_value),
    }
}

pub fn validate_financial_rules(
    total_value: Decimal,
    balance_due: Decimal,
    status: DocumentStatus,
) -> Result<(), FinancialRuleError> {
    if total_value < Decimal::ZERO {
        return Err(FinancialRuleError::NegativeTotal);
    }
    if total_value > MAX_AMOUNT {
        return Err(FinancialRuleError::TotalTooLarge);
    }
    if balance_due < Decimal::ZERO {
        return Err(FinancialRuleError::NegativeBalance);
    }
    if balance_due > total_value {
        return Err(FinancialRuleError::BalanceExceedsTotal);
    }
    if status == DocumentStatus::Paid && !balance_due.is_zero() {
        return Err(FinancialRuleError::PaidWithBalance);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_by_status() {
        let total = dec!(1000);
        let provided = dec!(400);

        assert_eq!(calculate_balance_due(total, provided, DocumentStatus::Paid), Decimal::ZERO);
        assert_eq!(calculate_balance_due(total, provided, DocumentStatus::Pending), total);
        assert_eq!(calculate_balance_due(total, provided, DocumentStatus::Accepted), total);
        assert_eq!(calculate_balance_due(total, provided, DocumentStatus::Draft), provided);
        assert_eq!(calculate_balance_due(total, provided, DocumentStatus::Overdue), provided);
    }

    #[test]
    fn test_balance_clamped_to_total() {
        assert_eq!(
            calculate_balance_due(dec!(500), dec!(900), DocumentStatus::Overdue),
            dec!(500)
        );
        assert_eq!(
            calculate_balance_due(dec!(1000), dec!(1500), DocumentStatus::Draft),
            dec!(1000)
        );
        assert_eq!(
            calculate_balance_due(dec!(1000), dec!(1000), DocumentStatus::Paid),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_validation_messages() {
        let cases = [
            (dec!(-1), dec!(0), DocumentStatus::Draft, "Total value cannot be negative"),
            (dec!(10), dec!(-1), DocumentStatus::Draft, "Balance due cannot be negative"),
            (dec!(10), dec!(11), DocumentStatus::Draft, "Balance due cannot exceed total value"),
            (dec!(10), dec!(5), DocumentStatus::Paid, "Paid documents must have balance due of 0"),
            (
                dec!(1000000000000),
                dec!(0),
                DocumentStatus::Draft,
                "Total value exceeds the maximum supported amount",
            ),
        ];

        for (total, balance, status, message) in cases {
            let err = validate_financial_rules(total, balance, status).unwrap_err();
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn test_computed_balance_always_validates() {
        for status in DocumentStatus::ALL {
            let total = dec!(250.75);
            let balance = calculate_balance_due(total, dec!(100), status);
            assert!(validate_financial_rules(total, balance, status).is_ok());
        }
    }
}
