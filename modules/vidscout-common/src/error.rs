use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResearchError {
    /// Missing or malformed caller input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A collaborator backend is unreachable or misconfigured.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("No candidates found for query: {0}")]
    NoCandidates(String),

    /// The language model answered with something unusable, or the call failed.
    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Extractor unavailable: no language model is configured")]
    ExtractorUnavailable,

    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal faults that no caller input or collaborator explains.
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl ResearchError {
    /// True for errors caused by the caller rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ResearchError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    fn encode(value: &str) -> Result<u32, ResearchError> {
        let parsed: u32 = value.parse().context("failed to encode input")?;
        Ok(parsed)
    }

    #[test]
    fn internal_faults_convert_through_question_mark() {
        let err = encode("not a number").unwrap_err();
        assert!(matches!(err, ResearchError::Anyhow(_)));
        assert_eq!(err.to_string(), "failed to encode input");
        assert!(!err.is_client_error());
    }

    #[test]
    fn only_validation_is_a_client_error() {
        assert!(ResearchError::Validation("query is required".into()).is_client_error());
        assert!(!ResearchError::ExtractorUnavailable.is_client_error());
        assert!(!ResearchError::SourceUnavailable("down".into()).is_client_error());
    }
}
