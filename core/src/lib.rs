//! Core of the kcal calorie tracker: role hierarchy, per-operation sessions,
//! the calorie ledger and user directory, the entry filter language, and
//! SQLite persistence.

pub mod calories;
pub mod credentials;
pub mod db;
pub mod error;
pub mod filter;
pub mod models;
pub mod role;
pub mod service;
pub mod session;
pub mod users;

pub use error::{Error, ErrorKind, Result};
pub use role::Role;
pub use service::CalorieService;
pub use session::Session;
