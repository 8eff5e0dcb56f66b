//! Role-keyed redaction of financial figures.
//!
//! Every handler that returns documents, customers, projects, statements,
//! project financials or the dashboard passes the response through
//! [`RoleProjection::project_for`]. Only SALES loses information.

use crate::dtos::customers::{CustomerResponse, CustomerStatement, StatementDocument};
use crate::dtos::documents::DocumentResponse;
use crate::dtos::projects::{ProjectFinancialSummary, ProjectResponse};
use crate::finance::DashboardSummary;
use crate::models::{DocumentStatus, DocumentType, Role};
use rust_decimal::Decimal;

pub trait RoleProjection: Sized {
    fn project_for(self, role: Role) -> Self;
}

impl<T: RoleProjection> RoleProjection for Vec<T> {
    fn project_for(self, role: Role) -> Self {
        self.into_iter().map(|item| item.project_for(role)).collect()
    }
}

fn hides_finances(role: Role) -> bool {
    role == Role::Sales
}

impl RoleProjection for DocumentResponse {
    fn project_for(mut self, role: Role) -> Self {
        if hides_finances(role) && self.document_type == DocumentType::Invoice {
            self.total_value = None;
            self.balance_due = None;
        }
        self
    }
}

impl RoleProjection for StatementDocument {
    fn project_for(mut self, role: Role) -> Self {
        if hides_finances(role) && self.document_type == DocumentType::Invoice.as_str() {
            self.total_value = None;
            self.balance_due = None;
        }
        self
    }
}

impl RoleProjection for CustomerResponse {
    fn project_for(mut self, role: Role) -> Self {
        if hides_finances(role) {
            self.financials.total_paid = None;
            self.financials.total_outstanding = None;
        }
        self
    }
}

impl RoleProjection for ProjectResponse {
    fn project_for(mut self, role: Role) -> Self {
        if hides_finances(role) {
            self.financials.total_paid = None;
            self.financials.total_outstanding = None;
        }
        self
    }
}

impl RoleProjection for CustomerStatement {
    fn project_for(mut self, role: Role) -> Self {
        self.documents = self.documents.project_for(role);
        if hides_finances(role) {
            self.totals = None;
        }
        self
    }
}

impl RoleProjection for ProjectFinancialSummary {
    fn project_for(mut self, role: Role) -> Self {
        self.documents = self.documents.project_for(role);
        if hides_finances(role) {
            self.financials.total_paid = None;
            self.financials.total_outstanding = None;
        }
        self
    }
}

impl RoleProjection for DashboardSummary {
    fn project_for(mut self, role: Role) -> Self {
        if !hides_finances(role) {
            return self;
        }

        for (status, bucket) in self.invoices.by_status.iter_mut() {
            if matches!(status, DocumentStatus::Paid | DocumentStatus::Overdue) {
                bucket.amount = Decimal::ZERO;
            }
        }
        for (status, amount) in self.revenue_by_status.iter_mut() {
            if matches!(status, DocumentStatus::Paid | DocumentStatus::Overdue) {
                *amount = Decimal::ZERO;
            }
        }
        self.outstanding_balance = None;
        self.paid_this_period = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::customers::{StatementCustomer, StatementTotals};
    use crate::finance::DocumentFigures;
    use crate::models::{ContactEmails, ContactPhones};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn document(document_type: DocumentType) -> DocumentResponse {
        let now = Utc::now();
        DocumentResponse {
            id: Uuid::new_v4(),
            document_type,
            status: DocumentStatus::Pending,
            number: "INV-2024-001".to_string(),
            customer_id: Uuid::new_v4(),
            project_id: None,
            total_value: Some(dec!(1000)),
            balance_due: Some(dec!(1000)),
            tax_rate: None,
            sections: None,
            items: None,
            sent_date: None,
            due_date: None,
            estimate_date: None,
            validity_days: None,
            project_dates: None,
            prepared_by: None,
            notes: None,
            introduction: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_sales_loses_invoice_amounts_only() {
        let invoice = document(DocumentType::Invoice).project_for(Role::Sales);
        assert_eq!(invoice.total_value, None);
        assert_eq!(invoice.balance_due, None);

        let estimate = document(DocumentType::Estimate).project_for(Role::Sales);
        assert_eq!(estimate.total_value, Some(dec!(1000)));

        let json = serde_json::to_value(&invoice).unwrap();
        assert!(json.get("totalValue").is_none());
        assert!(json.get("balanceDue").is_none());
    }

    #[test]
    fn test_other_roles_see_everything() {
        for role in [Role::Admin, Role::Manager, Role::Worker] {
            let invoice = document(DocumentType::Invoice).project_for(role);
            assert_eq!(invoice.total_value, Some(dec!(1000)));
        }
    }

    #[test]
    fn test_statement_totals_removed_for_sales() {
        let statement = CustomerStatement {
            customer: StatementCustomer {
                id: Uuid::new_v4(),
                name: "Jane".to_string(),
                emails: ContactEmails {
                    work: "jane@example.com".to_string(),
                    personal: None,
                },
                phones: ContactPhones {
                    work: "555".to_string(),
                    personal: None,
                },
                address: None,
            },
            documents: vec![StatementDocument {
                id: Uuid::new_v4(),
                number: "INV-2024-001".to_string(),
                document_type: "INVOICE".to_string(),
                status: "PAID".to_string(),
                total_value: Some(dec!(50)),
                balance_due: Some(dec!(0)),
                sent_date: None,
                due_date: None,
                project: None,
            }],
            totals: Some(StatementTotals {
                total_invoiced: dec!(50),
                total_paid: dec!(50),
                total_outstanding: dec!(0),
            }),
            generated_at: Utc::now(),
        };

        let projected = statement.clone().project_for(Role::Sales);
        assert!(projected.totals.is_none());
        assert!(projected.documents[0].total_value.is_none());

        let admin = statement.project_for(Role::Admin);
        assert!(admin.totals.is_some());
    }

    #[test]
    fn test_dashboard_redaction() {
        let figures = [DocumentStatus::Paid, DocumentStatus::Overdue, DocumentStatus::Pending]
            .into_iter()
            .map(|status| DocumentFigures {
                document_type: DocumentType::Invoice,
                status,
                total_value: dec!(100),
                balance_due: dec!(0),
                updated_utc: Utc::now(),
            })
            .collect::<Vec<_>>();

        let summary = DashboardSummary::build(&figures, Utc::now()).project_for(Role::Sales);

        assert_eq!(summary.invoices.by_status[&DocumentStatus::Paid].amount, Decimal::ZERO);
        assert_eq!(summary.invoices.by_status[&DocumentStatus::Paid].count, 1);
        assert_eq!(summary.invoices.by_status[&DocumentStatus::Pending].amount, dec!(100));
        assert_eq!(summary.revenue_by_status[&DocumentStatus::Overdue], Decimal::ZERO);
        assert_eq!(summary.revenue_by_status[&DocumentStatus::Pending], dec!(100));
        assert!(summary.outstanding_balance.is_none());
        assert!(summary.paid_this_period.is_none());
    }
}
