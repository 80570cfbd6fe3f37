use thiserror::Error;

/// Failure categories surfaced by `ask`. Abstention is a successful response,
/// not one of these.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("retrieval failed")]
    RetrievalFailure(#[source] anyhow::Error),
    #[error("reranking failed")]
    RerankFailure(#[source] anyhow::Error),
    #[error("answer extraction failed")]
    ExtractionFailure(#[source] anyhow::Error),
}

impl RagError {
    pub fn code(&self) -> &'static str {
        match self {
            RagError::Configuration(_) => "configuration_error",
            RagError::IndexUnavailable(_) => "index_unavailable",
            RagError::InvalidRequest(_) => "invalid_request",
            RagError::RetrievalFailure(_) => "retrieval_failure",
            RagError::RerankFailure(_) => "rerank_failure",
            RagError::ExtractionFailure(_) => "extraction_failure",
        }
    }

    /// True for failures raised by an external collaborator.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            RagError::RetrievalFailure(_)
                | RagError::RerankFailure(_)
                | RagError::ExtractionFailure(_)
        )
    }
}

impl From<clauselens_index::IndexError> for RagError {
    fn from(err: clauselens_index::IndexError) -> Self {
        RagError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn collaborator_messages_hide_details() {
        let err = RagError::RerankFailure(anyhow!("connection refused to 10.0.0.4"));
        assert_eq!(err.to_string(), "reranking failed");
        assert_eq!(err.code(), "rerank_failure");
        assert!(err.is_collaborator_failure());
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            RagError::Configuration("x".into()).code(),
            "configuration_error"
        );
        assert_eq!(
            RagError::IndexUnavailable("x".into()).code(),
            "index_unavailable"
        );
        assert_eq!(RagError::InvalidRequest("x".into()).code(), "invalid_request");
        assert!(!RagError::InvalidRequest("x".into()).is_collaborator_failure());
    }
}
