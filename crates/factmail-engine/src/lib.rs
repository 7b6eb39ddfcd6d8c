//! Digest pipeline: recipients, recency filter, generation, formatting,
//! delivery and the sent-fact log, wired together by [`Dispatcher`].

pub mod dispatcher;
pub mod error;
pub mod formatter;
pub mod generator;
pub mod parse;
pub mod prompt;
pub mod recency;

pub use dispatcher::{DispatchOutcome, DispatchSummary, Dispatcher, DispatcherConfig, Preview};
pub use error::{DispatchError, GenerationError};
pub use formatter::{DigestFormatter, DigestTemplate};
pub use generator::FactGenerator;
pub use recency::RecencyFilter;
