pub mod config;
pub mod conflict;
pub mod error;
pub mod grouping;
pub mod merge;
pub mod organizer;
pub mod service;

pub use config::{OrganizerConfig, DEFAULT_ADDR};
pub use conflict::ConflictAnalyzer;
pub use error::{OrganizerError, Result};
pub use grouping::GroupingEngine;
pub use merge::MergeEngine;
pub use organizer::CodeOrganizer;
pub use service::router;
