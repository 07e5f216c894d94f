use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApifyError>;

#[derive(Debug, Error)]
pub enum ApifyError {
    #[error("Apify request failed: {0}")]
    Network(String),

    #[error("Apify returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unreadable Apify response: {0}")]
    Parse(String),

    /// The actor run reached a terminal status other than SUCCEEDED.
    #[error("Actor run {run_id} ended with status {status}")]
    RunFailed { run_id: String, status: String },

    #[error("Actor run {run_id} still unfinished after {polls} polls")]
    PollLimit { run_id: String, polls: u32 },
}

impl From<reqwest::Error> for ApifyError {
    fn from(err: reqwest::Error) -> Self {
        ApifyError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ApifyError {
    fn from(err: serde_json::Error) -> Self {
        ApifyError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_errors_name_the_run() {
        let failed = ApifyError::RunFailed {
            run_id: "HG7ML7M8z78YcAPEB".into(),
            status: "TIMED-OUT".into(),
        };
        assert_eq!(failed.to_string(), "Actor run HG7ML7M8z78YcAPEB ended with status TIMED-OUT");

        let stuck = ApifyError::PollLimit {
            run_id: "HG7ML7M8z78YcAPEB".into(),
            polls: 10,
        };
        assert_eq!(stuck.to_string(), "Actor run HG7ML7M8z78YcAPEB still unfinished after 10 polls");
    }
}
