#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod config;
pub mod error;
pub mod progress_service;
pub mod random;
pub mod selection;
pub mod sessions;
pub mod stats_service;
pub mod user_service;

pub use vocab_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::{CatalogService, SEARCH_LIMIT, UserWordEntry};
pub use config::AppConfig;
pub use error::{
    AppServicesError, CatalogError, ConfigError, ProgressError, SelectionError, SessionError,
    StatsError, UserError,
};
pub use progress_service::ProgressService;
pub use random::{RandomSource, ScriptedRandom, SeededRandom, SystemRandom};
pub use selection::{SelectionService, SessionBuilder, SessionEntry, SessionPlan};
pub use sessions::{
    AnswerFeedback, InMemorySessionStore, QuizLoopService, QuizQuestion, QuizSession,
    QuizSummary, SessionStore,
};
pub use stats_service::StatsService;
pub use user_service::UserService;
