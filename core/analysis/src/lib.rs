pub mod append;
pub mod catalog;
pub mod classifier;
pub mod error;
pub mod naming;
pub mod sequence;
pub mod signature;
pub mod similarity;
pub mod text;

pub use append::AppendAdvisor;
pub use catalog::{Catalog, GENERAL_TOPIC, UNKNOWN_LANGUAGE};
pub use classifier::Classifier;
pub use error::{AnalysisError, Result};
pub use naming::{core_topic, sanitize_name, NameGenerator};
pub use sequence::SequenceDetector;
pub use signature::SignatureExtractor;
pub use similarity::{SimilarityEngine, TextProfile, DEFAULT_SEARCH_THRESHOLD};
