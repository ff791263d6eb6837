//! Study batch selection and distractor picking.

mod plan;
mod service;

pub use crate::error::SelectionError;
pub use plan::{SessionBuilder, SessionEntry, SessionPlan};
pub use service::SelectionService;
