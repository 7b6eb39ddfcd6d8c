pub mod errors;
pub mod facts;
pub mod ids;
pub mod provider;
pub mod security;

pub use errors::CompletionError;
pub use facts::{Fact, FactCategory, SentFactRecord, Subscriber, FACTS_PER_DIGEST};
pub use ids::DispatchId;
pub use security::ApiKey;
pub use provider::{Completion, CompletionContent, CompletionProvider, CompletionRequest};
