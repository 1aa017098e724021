#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod generation;
pub mod practice;
pub mod question_set_service;
pub mod stats_service;

pub use quiz_core::{Clock, RandomSource};

pub use app_services::AppServices;
pub use error::{
    AppServicesError, GenerationError, PracticeServiceError, QuestionSetServiceError,
    StatsServiceError,
};
pub use generation::{ChatCompletionGenerator, GenerationTask, GeneratorConfig, QuestionGenerator};
pub use practice::{PracticeAction, PracticeOutcome, PracticeService};
pub use question_set_service::{GenerationTicket, QuestionSetDetail, QuestionSetService};
pub use stats_service::{DashboardStats, StatsService};
