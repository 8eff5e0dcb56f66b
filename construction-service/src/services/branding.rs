//! Company branding resolution for the UI, PDFs and outgoing email.

use crate::dtos::branding::{BrandingResponse, UpdateBrandingRequest};
use crate::models::{Company, UpdateBranding};
use crate::services::database::BrandingDefaults;

pub const DEFAULT_DISPLAY_NAME: &str = "Harmony House Construction";
pub const DEFAULT_COLOR: &str = "#1ECAD3";

/// Normalise a 3 or 6 digit hex colour to `#rrggbb` / `#rgb` form.
pub fn sanitize_color(color: &str) -> Option<String> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    let valid = matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
    valid.then(|| format!("#{}", hex))
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

/// Branding with every fallback applied. `company` is `None` when the
/// company row could not be found.
pub fn resolve_branding(company: Option<&Company>, email_from: &str) -> BrandingResponse {
    let Some(company) = company else {
        return BrandingResponse {
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            logo_url: None,
            primary_color: DEFAULT_COLOR.to_string(),
            accent_color: DEFAULT_COLOR.to_string(),
            email_from_name: DEFAULT_DISPLAY_NAME.to_string(),
            email_from_address: email_from.to_string(),
        };
    };

    let display_name = non_empty(company.display_name.as_ref())
        .or(Some(company.name.as_str()).filter(|s| !s.is_empty()))
        .unwrap_or(DEFAULT_DISPLAY_NAME);

    BrandingResponse {
        display_name: display_name.to_string(),
        logo_url: non_empty(company.logo_url.as_ref()).map(str::to_string),
        primary_color: non_empty(company.primary_color.as_ref())
            .and_then(sanitize_color)
            .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        accent_color: non_empty(company.accent_color.as_ref())
            .and_then(sanitize_color)
            .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        email_from_name: non_empty(company.email_from_name.as_ref())
            .unwrap_or(DEFAULT_DISPLAY_NAME)
            .to_string(),
        email_from_address: non_empty(company.email_from_address.as_ref())
            .unwrap_or(email_from)
            .to_string(),
    }
}

pub fn branding_defaults(email_from: &str) -> BrandingDefaults {
    BrandingDefaults {
        display_name: DEFAULT_DISPLAY_NAME.to_string(),
        primary_color: DEFAULT_COLOR.to_string(),
        accent_color: DEFAULT_COLOR.to_string(),
        email_from_name: DEFAULT_DISPLAY_NAME.to_string(),
        email_from_address: email_from.to_string(),
    }
}

/// Empty strings clear a field; invalid colours are stored as null.
pub fn branding_update_from_request(req: &UpdateBrandingRequest) -> UpdateBranding {
    let text = |value: &Option<String>| {
        value
            .as_ref()
            .map(|s| Some(s.trim().to_string()).filter(|s| !s.is_empty()))
    };
    let color = |value: &Option<String>| value.as_ref().map(|s| sanitize_color(s.trim()));

    UpdateBranding {
        display_name: text(&req.display_name),
        logo_url: text(&req.logo_url),
        primary_color: color(&req.primary_color),
        accent_color: color(&req.accent_color),
        email_from_name: text(&req.email_from_name),
        email_from_address: text(&req.email_from_address),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn company() -> Company {
        Company {
            company_id: Uuid::new_v4(),
            name: "Acme Builders".to_string(),
            display_name: None,
            logo_url: Some(String::new()),
            primary_color: Some("abc".to_string()),
            accent_color: Some("not-a-colour".to_string()),
            email_from_name: None,
            email_from_address: None,
            plan: "STARTER".to_string(),
            subscription_status: "TRIALING".to_string(),
            stripe_customer_id: None,
            stripe_subscription_id: None,
            trial_ends_at: None,
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        }
    }

    #[test]
    fn test_sanitize_color() {
        assert_eq!(sanitize_color("#1ECAD3").as_deref(), Some("#1ECAD3"));
        assert_eq!(sanitize_color("fff").as_deref(), Some("#fff"));
        assert_eq!(sanitize_color("#12345"), None);
        assert_eq!(sanitize_color("#ggg"), None);
        assert_eq!(sanitize_color(""), None);
    }

    #[test]
    fn test_resolve_branding_fallbacks() {
        let branding = resolve_branding(Some(&company()), "noreply@harmonyhouse.com");

        assert_eq!(branding.display_name, "Acme Builders");
        assert_eq!(branding.logo_url, None);
        assert_eq!(branding.primary_color, "#abc");
        assert_eq!(branding.accent_color, DEFAULT_COLOR);
        assert_eq!(branding.email_from_name, DEFAULT_DISPLAY_NAME);
        assert_eq!(branding.email_from_address, "noreply@harmonyhouse.com");
    }

    #[test]
    fn test_resolve_branding_without_company() {
        let branding = resolve_branding(None, "x@example.com");
        assert_eq!(branding.display_name, DEFAULT_DISPLAY_NAME);
        assert_eq!(branding.email_from_address, "x@example.com");
    }

    #[test]
    fn test_update_request_mapping() {
        let update = branding_update_from_request(&UpdateBrandingRequest {
            display_name: Some(String::new()),
            primary_color: Some("#zzzzzz".to_string()),
            accent_color: Some("123456".to_string()),
            ..Default::default()
        });

        assert_eq!(update.display_name, Some(None));
        assert_eq!(update.primary_color, Some(None));
        assert_eq!(update.accent_color, Some(Some("#123456".to_string())));
        assert_eq!(update.logo_url, None);
    }
}
