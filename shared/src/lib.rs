//! Shared types for the outreach mailer
//!
//! Holds the vocabulary every part of the mailer speaks (stages, lead
//! statuses, timestamps) together with run-scoped logging.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
