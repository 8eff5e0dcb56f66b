//! Aggregations over document figures for customers, projects and the dashboard.

use super::round_money;
use crate::models::{
    Document, DocumentFigureRow, DocumentListing, DocumentStatus, DocumentType,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Days counted as "this period" on the dashboard.
pub const PAID_PERIOD_DAYS: i64 = 30;

/// The money-relevant slice of a document.
#[derive(Debug, Clone)]
pub struct DocumentFigures {
    pub document_type: DocumentType,
    pub status: DocumentStatus,
    pub total_value: Decimal,
    pub balance_due: Decimal,
    pub updated_utc: DateTime<Utc>,
}

impl DocumentFigures {
    /// Invoices marked PAID or fully settled.
    pub fn is_paid_invoice(&self) -> bool {
        self.document_type == DocumentType::Invoice
            && (self.status == DocumentStatus::Paid || self.balance_due.is_zero())
    }
}

impl From<&Document> for DocumentFigures {
    fn from(doc: &Document) -> Self {
        Self {
            document_type: doc.doc_type(),
            status: doc.doc_status(),
            total_value: doc.total_value,
            balance_due: doc.balance_due,
            updated_utc: doc.updated_utc,
        }
    }
}

impl From<&DocumentFigureRow> for DocumentFigures {
    fn from(row: &DocumentFigureRow) -> Self {
        Self {
            document_type: DocumentType::from_string(&row.document_type),
            status: DocumentStatus::from_string(&row.status),
            total_value: row.total_value,
            balance_due: row.balance_due,
            updated_utc: row.updated_utc,
        }
    }
}

impl From<&DocumentListing> for DocumentFigures {
    fn from(row: &DocumentListing) -> Self {
        Self {
            document_type: DocumentType::from_string(&row.document_type),
            status: DocumentStatus::from_string(&row.status),
            total_value: row.total_value,
            balance_due: row.balance_due,
            updated_utc: row.updated_utc,
        }
    }
}

/// Totals shared by customer, project and statement views.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerTotals {
    pub estimates_value: Decimal,
    pub invoices_value: Decimal,
    pub total_paid: Decimal,
    pub total_outstanding: Decimal,
    pub documents_count: i64,
}

impl LedgerTotals {
    pub fn from_figures<'a>(figures: impl IntoIterator<Item = &'a DocumentFigures>) -> Self {
        let mut totals = Self::default();
        for fig in figures {
            totals.documents_count += 1;
            match fig.document_type {
                DocumentType::Estimate => totals.estimates_value += fig.total_value,
                DocumentType::Invoice => {
                    totals.invoices_value += fig.total_value;
                    totals.total_outstanding += fig.balance_due;
                    if fig.is_paid_invoice() {
                        totals.total_paid += fig.total_value;
                    }
                }
                DocumentType::ChangeOrder => {}
            }
        }
        totals.estimates_value = round_money(totals.estimates_value);
        totals.invoices_value = round_money(totals.invoices_value);
        totals.total_paid = round_money(totals.total_paid);
        totals.total_outstanding = round_money(totals.total_outstanding);
        totals
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusBucket {
    pub count: i64,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSummary {
    pub total: i64,
    pub total_amount: Decimal,
    pub by_status: BTreeMap<DocumentStatus, StatusBucket>,
}

impl TypeSummary {
    fn add(&mut self, fig: &DocumentFigures) {
        self.total += 1;
        self.total_amount += fig.total_value;
        let bucket = self.by_status.entry(fig.status).or_default();
        bucket.count += 1;
        bucket.amount += fig.total_value;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub estimates: TypeSummary,
    pub invoices: TypeSummary,
    pub change_orders: TypeSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outstanding_balance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_this_period: Option<Decimal>,
    pub revenue_by_status: BTreeMap<DocumentStatus, Decimal>,
}

impl DashboardSummary {
    pub fn build(figures: &[DocumentFigures], now: DateTime<Utc>) -> Self {
        let period_start = now - Duration::days(PAID_PERIOD_DAYS);
        let mut summary = Self::default();
        let mut outstanding = Decimal::ZERO;
        let mut paid = Decimal::ZERO;

        for fig in figures {
            match fig.document_type {
                DocumentType::Estimate => summary.estimates.add(fig),
                DocumentType::ChangeOrder => summary.change_orders.add(fig),
                DocumentType::Invoice => {
                    summary.invoices.add(fig);
                    outstanding += fig.balance_due;
                    *summary.revenue_by_status.entry(fig.status).or_default() += fig.total_value;
                    if fig.is_paid_invoice() && fig.updated_utc >= period_start {
                        paid += fig.total_value;
                    }
                }
            }
        }

        summary.outstanding_balance = Some(round_money(outstanding));
        summary.paid_this_period = Some(round_money(paid));
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fig(
        document_type: DocumentType,
        status: DocumentStatus,
        total: Decimal,
        balance: Decimal,
        age_days: i64,
    ) -> DocumentFigures {
        DocumentFigures {
            document_type,
            status,
            total_value: total,
            balance_due: balance,
            updated_utc: Utc::now() - Duration::days(age_days),
        }
    }

    #[test]
    fn test_ledger_totals() {
        let figures = vec![
            fig(DocumentType::Estimate, DocumentStatus::Accepted, dec!(5000), dec!(5000), 1),
            fig(DocumentType::Invoice, DocumentStatus::Paid, dec!(1000), dec!(0), 1),
            fig(DocumentType::Invoice, DocumentStatus::Overdue, dec!(2000), dec!(0), 1),
            fig(DocumentType::Invoice, DocumentStatus::Pending, dec!(3000), dec!(3000), 1),
            fig(DocumentType::ChangeOrder, DocumentStatus::Draft, dec!(700), dec!(700), 1),
        ];

        let totals = LedgerTotals::from_figures(&figures);

        assert_eq!(totals.estimates_value, dec!(5000));
        assert_eq!(totals.invoices_value, dec!(6000));
        assert_eq!(totals.total_paid, dec!(3000));
        assert_eq!(totals.total_outstanding, dec!(3000));
        assert_eq!(totals.documents_count, 5);
    }

    #[test]
    fn test_dashboard_summary() {
        let figures = vec![
            fig(DocumentType::Estimate, DocumentStatus::Draft, dec!(100), dec!(100), 1),
            fig(DocumentType::Estimate, DocumentStatus::Draft, dec!(50), dec!(50), 1),
            fig(DocumentType::Invoice, DocumentStatus::Paid, dec!(1000), dec!(0), 3),
            fig(DocumentType::Invoice, DocumentStatus::Paid, dec!(400), dec!(0), 45),
            fig(DocumentType::Invoice, DocumentStatus::Overdue, dec!(250), dec!(200), 2),
        ];

        let summary = DashboardSummary::build(&figures, Utc::now());

        assert_eq!(summary.estimates.total, 2);
        assert_eq!(summary.estimates.total_amount, dec!(150));
        assert_eq!(summary.estimates.by_status[&DocumentStatus::Draft].count, 2);
        assert_eq!(summary.invoices.by_status[&DocumentStatus::Paid].amount, dec!(1400));
        assert_eq!(summary.outstanding_balance, Some(dec!(200)));
        assert_eq!(summary.paid_this_period, Some(dec!(1000)));
        assert_eq!(summary.revenue_by_status[&DocumentStatus::Overdue], dec!(250));
        assert_eq!(summary.change_orders, TypeSummary::default());
    }

    #[test]
    fn test_dashboard_wire_shape() {
        let summary = DashboardSummary::build(
            &[fig(DocumentType::Invoice, DocumentStatus::Pending, dec!(10), dec!(10), 0)],
            Utc::now(),
        );
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["invoices"]["byStatus"]["PENDING"]["count"], 1);
        assert_eq!(json["revenueByStatus"]["PENDING"], 10.0);
        assert!(json.get("changeOrders").is_some());
    }
}
