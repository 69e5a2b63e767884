//! Core business logic modules
//!
//! This module contains the pure lead state machine with no I/O dependencies.
//! Given the same inputs and random source every function is deterministic.

pub mod compose;
pub mod lead;
pub mod outcome;
pub mod run_state;
pub mod selector;

pub use lead::{columns, Lead, LeadTable, LeadUpdate};
pub use outcome::{FollowupFailurePolicy, RunOutcome, SendFailure};
pub use run_state::RunState;
pub use selector::{select, Selection, SelectionPolicy, SelectionRules};
