use thiserror::Error;

/// Why a fetch cycle failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{context}: HTTP {status}")]
    Status {
        context: String,
        status: reqwest::StatusCode,
    },

    /// Error message reported by the upstream service, passed through verbatim
    #[error("{0}")]
    Upstream(String),

    #[error("unexpected payload: {0}")]
    Payload(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// The query asks for something the upstream source cannot provide
    #[error("{0}")]
    Unsupported(String),
}

impl FetchError {
    pub fn transport(context: impl Into<String>, source: reqwest::Error) -> Self {
        FetchError::Transport {
            context: context.into(),
            source,
        }
    }

    /// Fatal errors end the fetcher without consulting the retry policy.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Config(_) | FetchError::Unsupported(_))
    }
}

/// Why the foreground render loop stopped.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("display error: {0}")]
    Display(#[from] std::io::Error),

    /// The fetcher published an error snapshot
    #[error("{0}")]
    Upstream(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(FetchError::Config("league not found".into()).is_fatal());
        assert!(FetchError::Unsupported("live results only".into()).is_fatal());
        assert!(!FetchError::Upstream("city not found".into()).is_fatal());
        assert!(!FetchError::Payload("missing fixtures".into()).is_fatal());
    }

    #[test]
    fn test_upstream_message_is_verbatim() {
        let err = FetchError::Upstream("city not found".into());
        assert_eq!(err.to_string(), "city not found");
    }
}
