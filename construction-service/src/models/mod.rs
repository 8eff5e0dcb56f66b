//! Data models for construction-service.

pub mod company;
pub mod customer;
pub mod document;
pub mod project;
pub mod task;
pub mod timelog;
pub mod user;

pub use company::*;
pub use customer::*;
pub use document::*;
pub use project::*;
pub use task::*;
pub use timelog::*;
pub use user::*;
