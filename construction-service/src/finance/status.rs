use super::FinancialRuleError;
use crate::models::DocumentStatus;

impl DocumentStatus {
    /// Allowed lifecycle moves. Re-applying the current status is always allowed.
    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;

        if self == next {
            return true;
        }

        matches!(
            (self, next),
            (Draft, Pending)
                | (Pending, Accepted)
                | (Pending, Overdue)
                | (Pending, Draft)
                | (Accepted, Overdue)
                | (Accepted, Paid)
                | (Overdue, Paid)
                | (Overdue, Accepted)
        )
    }
}

pub fn ensure_transition(
    from: DocumentStatus,
    to: DocumentStatus,
) -> Result<(), FinancialRuleError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(FinancialRuleError::InvalidTransition { from, to })
    }
}
