//! Practice sessions over generated question sets.

mod service;
mod workflow;

pub use service::PracticeService;
pub use workflow::{PracticeAction, PracticeOutcome};
