use factmail_core::errors::CompletionError;
use factmail_mail::MailError;
use factmail_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("unexpected response type from model: {0}")]
    UnexpectedContent(String),

    #[error("malformed fact batch: {0}")]
    MalformedResponse(String),
}

/// Hard failures of a dispatch. Recency and persistence problems are
/// warnings on the summary, never one of these.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("recipient lookup failed: {0}")]
    Directory(#[source] StoreError),

    #[error("fact generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("email delivery failed: {0}")]
    Delivery(#[from] MailError),
}

impl DispatchError {
    /// Stable tag for logs and HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Directory(_) => "directory",
            Self::Generation(_) => "generation",
            Self::Delivery(_) => "delivery",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            DispatchError::Directory(StoreError::Database("x".into())).kind(),
            "directory"
        );
        assert_eq!(
            DispatchError::from(GenerationError::MalformedResponse("x".into())).kind(),
            "generation"
        );
        assert_eq!(
            DispatchError::from(MailError::Smtp("x".into())).kind(),
            "delivery"
        );
    }

    #[test]
    fn completion_error_converts() {
        let err: GenerationError = CompletionError::ProviderOverloaded.into();
        assert_eq!(err.to_string(), "completion failed: provider overloaded");
    }
}
