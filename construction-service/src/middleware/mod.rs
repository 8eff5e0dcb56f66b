pub mod auth;
pub mod subscription;

pub use auth::{auth_middleware, AuthUser};
pub use subscription::subscription_middleware;
