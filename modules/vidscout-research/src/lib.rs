pub mod adapters;
pub mod chat;
pub mod infra;
pub mod insights;
pub mod parsers;
pub mod research;
pub mod scoring;
pub mod selection;
pub mod synthesis;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use research::Researcher;
pub use traits::{CandidateSource, InsightExtractor, TranscriptSource};
