pub mod branding;
pub mod database;
pub mod email;
pub mod executor;
pub mod jwt;
pub mod metrics;
pub mod password;
pub mod pdf;
pub mod plan_limits;
pub mod stripe;

pub use database::Database;
pub use email::{EmailAttachment, EmailMessage, EmailProvider, MockEmailProvider, SmtpProvider};
pub use jwt::{Claims, JwtService};
pub use pdf::{ChromiumPdfRenderer, MockPdfRenderer, PdfOptions, PdfRenderer};
pub use stripe::StripeClient;
