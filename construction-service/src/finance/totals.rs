use super::{round_money, FinancialRuleError};
use crate::models::{Breakdown, Document, DocumentType, EstimateSection, LineItemType};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanyCosts {
    pub labor: Decimal,
    pub material: Decimal,
    pub other: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomerCosts {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Profit {
    pub gross: Decimal,
    /// Percent of company cost.
    pub markup: Decimal,
    /// Percent of customer subtotal.
    pub margin: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTotals {
    pub company_costs: CompanyCosts,
    pub customer_costs: CustomerCosts,
    pub profit: Profit,
}

fn add(a: Decimal, b: Decimal) -> Result<Decimal, FinancialRuleError> {
    a.checked_add(b).ok_or(FinancialRuleError::Overflow)
}

/// `part / whole` as a percentage, 0 when `whole` is zero.
fn percent_of(part: Decimal, whole: Decimal) -> Result<Decimal, FinancialRuleError> {
    if whole.is_zero() {
        return Ok(Decimal::ZERO);
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or(FinancialRuleError::Overflow)
}

/// Internal cost, customer price, tax and profit for a sectioned estimate.
///
/// Customer figures only count visible items. Company costs count every item,
/// hidden ones included, since hidden work still costs the company money.
pub fn compute_totals(
    sections: &[EstimateSection],
    tax_rate: Decimal,
) -> Result<FinancialTotals, FinancialRuleError> {
    let mut costs = CompanyCosts::default();
    let mut subtotal = Decimal::ZERO;
    let mut tax = Decimal::ZERO;

    for item in sections.iter().flat_map(|s| s.items.iter()) {
        let bucket = match item.item_type {
            LineItemType::Labor => &mut costs.labor,
            LineItemType::Material => &mut costs.material,
            LineItemType::OtherCost => &mut costs.other,
        };
        *bucket = add(*bucket, item.company_cost)?;

        if !item.is_visible() {
            continue;
        }

        subtotal = add(subtotal, item.customer_price)?;
        let item_tax = match item.tax_amount {
            Some(amount) => amount,
            None => item
                .tax
                .unwrap_or(tax_rate)
                .checked_mul(item.customer_price)
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .ok_or(FinancialRuleError::Overflow)?,
        };
        tax = add(tax, item_tax)?;
    }

    costs.total = add(add(costs.labor, costs.material)?, costs.other)?;
    let gross = subtotal
        .checked_sub(costs.total)
        .ok_or(FinancialRuleError::Overflow)?;
    let markup = percent_of(gross, costs.total)?;
    let margin = percent_of(gross, subtotal)?;
    let customer_total = add(subtotal, tax)?;

    Ok(FinancialTotals {
        company_costs: CompanyCosts {
            labor: round_money(costs.labor),
            material: round_money(costs.material),
            other: round_money(costs.other),
            total: round_money(costs.total),
        },
        customer_costs: CustomerCosts {
            subtotal: round_money(subtotal),
            tax: round_money(tax),
            total: round_money(customer_total),
        },
        profit: Profit {
            gross: round_money(gross),
            markup: round_money(markup),
            margin: round_money(margin),
        },
    })
}

/// Document total implied by a breakdown.
pub fn total_from_breakdown(
    breakdown: &Breakdown,
    tax_rate: Decimal,
) -> Result<Decimal, FinancialRuleError> {
    match breakdown {
        Breakdown::Sections(sections) => {
            Ok(compute_totals(sections, tax_rate)?.customer_costs.total)
        }
        Breakdown::Legacy(items) => items
            .iter()
            .try_fold(Decimal::ZERO, |acc, i| add(acc, i.cost))
            .map(round_money),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateFinancials {
    #[serde(flatten)]
    pub totals: FinancialTotals,
    pub tax_rate: Decimal,
}

/// Financial view of a stored estimate. Legacy or missing breakdowns count as empty.
pub fn estimate_financials(document: &Document) -> Result<EstimateFinancials, FinancialRuleError> {
    if document.doc_type() != DocumentType::Estimate {
        return Err(FinancialRuleError::NotAnEstimate);
    }

    let tax_rate = document.tax_rate.unwrap_or_default();
    let sections = document
        .sections
        .as_ref()
        .map(|s| s.0.as_slice())
        .unwrap_or_default();

    Ok(EstimateFinancials {
        totals: compute_totals(sections, tax_rate)?,
        tax_rate,
    })
}
