//! HTML rendering for PDFs and outgoing email.
//!
//! Templates live in `templates/` and are compiled in by askama. All values
//! are escaped on output.

use crate::dtos::branding::BrandingResponse;
use crate::dtos::customers::{CustomerStatement, StatementDocument};
use crate::dtos::projects::ProjectFinancialSummary;
use crate::models::{Breakdown, Customer, Document, Project};
use askama::Template;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// `$1,234.56`, with a leading minus for negative amounts.
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{}", if negative { "-" } else { "" }, grouped, cents)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

fn format_opt_date(date: Option<NaiveDate>) -> String {
    date.map(format_date).unwrap_or_else(|| "-".to_string())
}

fn type_label(document_type: &str) -> String {
    match document_type {
        "CHANGE_ORDER" => "Change Order".to_string(),
        "INVOICE" => "Invoice".to_string(),
        "ESTIMATE" => "Estimate".to_string(),
        other => other.to_string(),
    }
}

pub struct EstimateRow {
    pub category: String,
    pub description: String,
    pub labor: String,
    pub materials: String,
    pub cost: String,
}

#[derive(Template)]
#[template(path = "estimate.html")]
pub struct EstimateTemplate {
    pub brand_name: String,
    pub primary_color: String,
    pub logo_url: Option<String>,
    pub contact_email: String,
    pub number: String,
    pub estimate_date: String,
    pub project_name: String,
    pub project_dates: String,
    pub prepared_by: String,
    pub client_name: String,
    pub client_address: Option<String>,
    pub detailed: bool,
    pub rows: Vec<EstimateRow>,
    pub total: String,
    pub validity_days: i32,
    pub notes: Option<String>,
}

/// Customer-facing rows. Hidden section items and internal costs never
/// appear; a document with no breakdown prints as one line for its total.
fn estimate_rows(document: &Document) -> (bool, Vec<EstimateRow>) {
    let row = |category: &str, description: &str, cost: Decimal| EstimateRow {
        category: category.to_string(),
        description: description.to_string(),
        labor: String::new(),
        materials: String::new(),
        cost: format_money(cost),
    };

    let rows: Vec<EstimateRow> = match document.breakdown() {
        Some(Breakdown::Sections(sections)) => sections
            .iter()
            .flat_map(|section| {
                section
                    .items
                    .iter()
                    .filter(|item| item.is_visible())
                    .map(move |item| row(&section.name, &item.name, item.customer_price))
            })
            .collect(),
        Some(Breakdown::Legacy(items)) => {
            let detailed = items
                .iter()
                .any(|item| item.labor.is_some() || item.materials.is_some());
            let rows = items
                .iter()
                .map(|item| {
                    let labor = item.labor.unwrap_or_default();
                    let materials = item.materials.unwrap_or_default();
                    let combined = labor + materials;
                    EstimateRow {
                        labor: format_money(labor),
                        materials: format_money(materials),
                        ..row(
                            &item.category,
                            &item.description,
                            if combined.is_zero() { item.cost } else { combined },
                        )
                    }
                })
                .collect::<Vec<_>>();
            if !rows.is_empty() {
                return (detailed, rows);
            }
            Vec::new()
        }
        None => Vec::new(),
    };

    if rows.is_empty() {
        return (
            false,
            vec![row("General Work", "Construction work per plans", document.total_value)],
        );
    }
    (false, rows)
}

pub fn render_estimate(
    document: &Document,
    customer: &Customer,
    project: Option<&Project>,
    branding: &BrandingResponse,
) -> Result<String, askama::Error> {
    let (detailed, rows) = estimate_rows(document);
    let estimate_date = document
        .estimate_date
        .unwrap_or_else(|| document.created_utc.date_naive());

    EstimateTemplate {
        brand_name: branding.display_name.clone(),
        primary_color: branding.primary_color.clone(),
        logo_url: branding.logo_url.clone(),
        contact_email: branding.email_from_address.clone(),
        number: document.number.clone(),
        estimate_date: format_date(estimate_date),
        project_name: project
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "N/A".to_string()),
        project_dates: document
            .project_dates
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "TBT".to_string()),
        prepared_by: document.prepared_by.clone().unwrap_or_default(),
        client_name: customer.name.clone(),
        client_address: customer.primary_address(),
        detailed,
        rows,
        total: format_money(document.total_value),
        validity_days: document.validity_days.unwrap_or(30),
        notes: document.notes.clone().filter(|s| !s.is_empty()),
    }
    .render()
}

pub struct DocumentRow {
    pub number: String,
    pub type_label: String,
    pub status: String,
    pub status_class: String,
    pub project: String,
    pub sent_date: String,
    pub due_date: String,
    pub total: String,
    pub balance: String,
}

impl DocumentRow {
    fn from_statement(doc: &StatementDocument) -> Self {
        let money = |value: Option<Decimal>| value.map(format_money).unwrap_or_else(|| "-".to_string());
        Self {
            number: doc.number.clone(),
            type_label: type_label(&doc.document_type),
            status: doc.status.clone(),
            status_class: doc.status.to_lowercase(),
            project: doc
                .project
                .as_ref()
                .map(|p| p.name.clone())
                .unwrap_or_else(|| "-".to_string()),
            sent_date: format_opt_date(doc.sent_date),
            due_date: format_opt_date(doc.due_date),
            total: money(doc.total_value),
            balance: money(doc.balance_due),
        }
    }
}

pub struct SummaryCard {
    pub title: &'static str,
    pub value: String,
}

#[derive(Template)]
#[template(path = "customer_statement.html")]
pub struct CustomerStatementTemplate {
    pub brand_name: String,
    pub primary_color: String,
    pub logo_url: Option<String>,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub include_financials: bool,
    pub cards: Vec<SummaryCard>,
    pub documents: Vec<DocumentRow>,
    pub generated_at: String,
}

fn generated_label(at: DateTime<Utc>) -> String {
    at.format("%m/%d/%Y %H:%M UTC").to_string()
}

/// `include_financials` controls the money columns and summary cards.
pub fn render_customer_statement(
    statement: &CustomerStatement,
    branding: &BrandingResponse,
    include_financials: bool,
) -> Result<String, askama::Error> {
    let cards = match (&statement.totals, include_financials) {
        (Some(totals), true) => vec![
            SummaryCard {
                title: "Total Invoiced",
                value: format_money(totals.total_invoiced),
            },
            SummaryCard {
                title: "Total Paid",
                value: format_money(totals.total_paid),
            },
            SummaryCard {
                title: "Outstanding",
                value: format_money(totals.total_outstanding),
            },
        ],
        _ => Vec::new(),
    };

    let emails = &statement.customer.emails;
    CustomerStatementTemplate {
        brand_name: branding.display_name.clone(),
        primary_color: branding.primary_color.clone(),
        logo_url: branding.logo_url.clone(),
        customer_name: statement.customer.name.clone(),
        email: emails.preferred().unwrap_or("N/A").to_string(),
        phone: Some(statement.customer.phones.work.clone())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "N/A".to_string()),
        address: statement.customer.address.clone(),
        include_financials,
        cards,
        documents: statement.documents.iter().map(DocumentRow::from_statement).collect(),
        generated_at: generated_label(statement.generated_at),
    }
    .render()
}

#[derive(Template)]
#[template(path = "project_financials.html")]
pub struct ProjectFinancialsTemplate {
    pub brand_name: String,
    pub primary_color: String,
    pub logo_url: Option<String>,
    pub project_name: String,
    pub project_status: String,
    pub customer_name: String,
    pub include_financials: bool,
    pub cards: Vec<SummaryCard>,
    pub documents: Vec<DocumentRow>,
    pub generated_at: String,
}

pub fn render_project_financials(
    summary: &ProjectFinancialSummary,
    branding: &BrandingResponse,
    include_financials: bool,
) -> Result<String, askama::Error> {
    let fin = &summary.financials;
    let mut cards = vec![
        SummaryCard {
            title: "Estimated Value",
            value: format_money(fin.total_estimated_value),
        },
        SummaryCard {
            title: "Invoiced Value",
            value: format_money(fin.total_invoiced_value),
        },
    ];
    if include_financials {
        if let Some(paid) = fin.total_paid {
            cards.push(SummaryCard {
                title: "Total Paid",
                value: format_money(paid),
            });
        }
        if let Some(outstanding) = fin.total_outstanding {
            cards.push(SummaryCard {
                title: "Outstanding",
                value: format_money(outstanding),
            });
        }
    }

    ProjectFinancialsTemplate {
        brand_name: branding.display_name.clone(),
        primary_color: branding.primary_color.clone(),
        logo_url: branding.logo_url.clone(),
        project_name: summary.project.name.clone(),
        project_status: summary.project.status.replace('_', " "),
        customer_name: summary.customer.name.clone(),
        include_financials,
        cards,
        documents: summary.documents.iter().map(DocumentRow::from_statement).collect(),
        generated_at: generated_label(summary.generated_at),
    }
    .render()
}

#[derive(Template)]
#[template(path = "email_notice.html")]
pub struct EmailNoticeTemplate<'a> {
    pub brand_name: &'a str,
    pub accent_color: &'a str,
    pub title: &'a str,
    pub recipient_name: &'a str,
    pub paragraphs: &'a [String],
}

/// HTML and plain-text bodies of a notice email.
pub struct EmailBodies {
    pub html: String,
    pub text: String,
}

fn render_notice(
    branding: &BrandingResponse,
    title: &str,
    recipient_name: &str,
    paragraphs: Vec<String>,
) -> Result<EmailBodies, askama::Error> {
    let html = EmailNoticeTemplate {
        brand_name: &branding.display_name,
        accent_color: &branding.accent_color,
        title,
        recipient_name,
        paragraphs: &paragraphs,
    }
    .render()?;

    let text = format!(
        "Dear {},\n\n{}\n\nBest regards,\nThe {} Team\n",
        recipient_name,
        paragraphs.join("\n\n"),
        branding.display_name
    );

    Ok(EmailBodies { html, text })
}

pub fn statement_email(
    customer_name: &str,
    branding: &BrandingResponse,
) -> Result<EmailBodies, askama::Error> {
    render_notice(
        branding,
        "Customer Statement",
        customer_name,
        vec![
            "Please find attached your current statement, which includes all invoices, estimates, and change orders for your account.".to_string(),
            "If you have any questions about your statement, please don't hesitate to contact us.".to_string(),
        ],
    )
}

pub fn project_financials_email(
    customer_name: &str,
    project_name: &str,
    branding: &BrandingResponse,
) -> Result<EmailBodies, askama::Error> {
    render_notice(
        branding,
        "Project Financial Summary",
        customer_name,
        vec![
            format!(
                "Please find attached the financial summary for your project \"{}\".",
                project_name
            ),
            "It lists every estimate, invoice and change order on the project along with the current totals.".to_string(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::customers::{NamedRef, StatementCustomer, StatementTotals};
    use crate::models::{
        ContactEmails, ContactPhones, EstimateLineItem, EstimateSection, LineItemType,
    };
    use rust_decimal_macros::dec;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn branding() -> BrandingResponse {
        BrandingResponse {
            display_name: "Acme <Builders>".to_string(),
            logo_url: None,
            primary_color: "#1ECAD3".to_string(),
            accent_color: "#1ECAD3".to_string(),
            email_from_name: "Acme".to_string(),
            email_from_address: "office@acme.test".to_string(),
        }
    }

    fn document(sections: Option<Vec<EstimateSection>>) -> Document {
        Document {
            document_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            project_id: None,
            document_type: "ESTIMATE".to_string(),
            status: "DRAFT".to_string(),
            number: "EST-2024-001".to_string(),
            total_value: dec!(12500),
            balance_due: dec!(12500),
            tax_rate: None,
            sections: sections.map(Json),
            legacy_items: None,
            sent_date: None,
            due_date: None,
            estimate_date: NaiveDate::from_ymd_opt(2024, 3, 5),
            validity_days: None,
            project_dates: None,
            prepared_by: None,
            notes: None,
            introduction: None,
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        }
    }

    fn customer() -> Customer {
        Customer {
            customer_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "Jane Doe".to_string(),
            emails: Json(ContactEmails {
                work: "jane@example.com".to_string(),
                personal: None,
            }),
            phones: Json(ContactPhones {
                work: "555-0100".to_string(),
                personal: None,
            }),
            addresses: Json(vec![]),
            lead_source: None,
            notes: None,
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        }
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(dec!(0)), "$0.00");
        assert_eq!(format_money(dec!(999.5)), "$999.50");
        assert_eq!(format_money(dec!(1234.567)), "$1,234.57");
        assert_eq!(format_money(dec!(1234567)), "$1,234,567.00");
        assert_eq!(format_money(dec!(-42.1)), "-$42.10");
    }

    #[test]
    fn test_estimate_without_breakdown_uses_general_work_row() {
        let html = render_estimate(&document(None), &customer(), None, &branding()).unwrap();

        assert!(html.contains("General Work"));
        assert!(html.contains("Construction work per plans"));
        assert!(html.contains("$12,500.00"));
        assert!(html.contains("03/05/2024"));
        assert!(html.contains("Acme &lt;Builders&gt;"));
    }

    #[test]
    fn test_estimate_hides_internal_and_invisible_items() {
        let item = |name: &str, visible: i32| EstimateLineItem {
            item_type: LineItemType::Labor,
            name: name.to_string(),
            hours: None,
            quantity: None,
            company_cost: dec!(777.77),
            customer_price: dec!(1000),
            tax: None,
            tax_amount: None,
            visible,
        };
        let doc = document(Some(vec![EstimateSection {
            name: "Framing".to_string(),
            items: vec![item("Walls", 1), item("Overhead", 0)],
        }]));

        let html = render_estimate(&doc, &customer(), None, &branding()).unwrap();

        assert!(html.contains("Walls"));
        assert!(!html.contains("Overhead"));
        assert!(!html.contains("777.77"));
    }

    #[test]
    fn test_statement_financial_columns_follow_flag() {
        let statement = CustomerStatement {
            customer: StatementCustomer {
                id: Uuid::new_v4(),
                name: "Jane Doe".to_string(),
                emails: ContactEmails {
                    work: "jane@example.com".to_string(),
                    personal: None,
                },
                phones: ContactPhones {
                    work: "555-0100".to_string(),
                    personal: None,
                },
                address: None,
            },
            documents: vec![StatementDocument {
                id: Uuid::new_v4(),
                number: "INV-2024-007".to_string(),
                document_type: "INVOICE".to_string(),
                status: "PENDING".to_string(),
                total_value: Some(dec!(4321)),
                balance_due: Some(dec!(4321)),
                sent_date: None,
                due_date: None,
                project: Some(NamedRef {
                    id: Uuid::new_v4(),
                    name: "Kitchen".to_string(),
                }),
            }],
            totals: Some(StatementTotals {
                total_invoiced: dec!(4321),
                total_paid: dec!(0),
                total_outstanding: dec!(4321),
            }),
            generated_at: Utc::now(),
        };

        let full = render_customer_statement(&statement, &branding(), true).unwrap();
        assert!(full.contains("$4,321.00"));
        assert!(full.contains("Total Invoiced"));

        let limited = render_customer_statement(&statement, &branding(), false).unwrap();
        assert!(limited.contains("INV-2024-007"));
        assert!(!limited.contains("$4,321.00"));
        assert!(!limited.contains("Total Invoiced"));
    }

    #[test]
    fn test_statement_email_bodies() {
        let bodies = statement_email("Jane Doe", &branding()).unwrap();
        assert!(bodies.html.contains("Dear Jane Doe"));
        assert!(bodies.text.starts_with("Dear Jane Doe"));
        assert!(bodies.text.contains("The Acme <Builders> Team"));
    }
}
