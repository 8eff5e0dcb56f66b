use serde::{Deserialize, Serialize};

/// Branding as rendered into PDFs and emails.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingResponse {
    pub display_name: String,
    pub logo_url: Option<String>,
    pub primary_color: String,
    pub accent_color: String,
    pub email_from_name: String,
    pub email_from_address: String,
}

/// Partial update. Empty strings clear the field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBrandingRequest {
    pub display_name: Option<String>,
    pub logo_url: Option<String>,
    pub primary_color: Option<String>,
    pub accent_color: Option<String>,
    pub email_from_name: Option<String>,
    pub email_from_address: Option<String>,
}
