use evroute_core::PlanningError;
use thiserror::Error;

const MAX_ERROR_BODY: usize = 256;

/// Failure talking to an external collaborator.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no results for {0}")]
    NoResults(String),
    #[error("quota exceeded: {0}")]
    Quota(String),
    #[error("provider rejected request ({status}): {message}")]
    Rejected { status: String, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ServiceError {
    /// Transport-level failures worth another attempt.
    ///
    /// Semantic answers (no results, quota, bad request) are final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Rejected { status, .. } => status == "UNKNOWN_ERROR",
            Self::NoResults(_) | Self::Quota(_) | Self::InvalidResponse(_) => false,
        }
    }

    pub fn into_planning_error(self, service: &str) -> PlanningError {
        PlanningError::upstream(service, self.to_string())
    }
}

/// Turn a non-2xx response into [`ServiceError::Status`].
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(ServiceError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_throttling_are_transient() {
        let status = |status| ServiceError::Status {
            status,
            body: String::new(),
        };
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(404).is_transient());
        assert!(!status(400).is_transient());
    }

    #[test]
    fn semantic_failures_are_final() {
        assert!(!ServiceError::NoResults("Nowhere".into()).is_transient());
        assert!(!ServiceError::Quota("daily limit".into()).is_transient());
        assert!(ServiceError::Rejected {
            status: "UNKNOWN_ERROR".into(),
            message: String::new()
        }
        .is_transient());
    }

    #[test]
    fn maps_to_upstream_unavailable() {
        let err = ServiceError::NoResults("Atlantis".into()).into_planning_error("geocoder");
        assert_eq!(err.code(), "upstream_unavailable");
        assert!(err.to_string().contains("geocoder"));
    }
}
