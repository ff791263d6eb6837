mod quiz;
mod store;
mod workflow;

// Public API of the quiz subsystem.
pub use crate::error::SessionError;
pub use quiz::{AnswerFeedback, QuizQuestion, QuizSession, QuizSummary};
pub use store::{InMemorySessionStore, SessionStore};
pub use workflow::QuizLoopService;
