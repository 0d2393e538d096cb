use thiserror::Error;

/// Failures surfaced by location resolution, weather fetching and the
/// knowledge assistant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExplorerError {
    /// The geocoder returned no match for the query.
    #[error("Location not found: {query}")]
    NotFound { query: String },

    /// Transport failure, timeout or unexpected status from a collaborator.
    #[error("Network error: {0}")]
    Network(String),

    /// The weather provider rejected the configured access key.
    #[error("Weather provider rejected the API key: {0}")]
    Credential(String),

    /// A provider response did not have the expected shape.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Weather was requested before any location was selected.
    #[error("No location selected yet")]
    NoLocation,

    /// A knowledge query with no text was submitted.
    #[error("Knowledge query is empty")]
    EmptyQuery,

    /// A knowledge query was submitted while another one is outstanding.
    #[error("A knowledge query is already in progress")]
    ConcurrentRequestRejected,

    /// A background worker ended without delivering its result.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExplorerError {
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedPayload(message.into())
    }

    /// Short message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "Could not find a place matching your query.",
            Self::Network(_) => "Could not reach the service. Check your connection.",
            Self::Credential(_) => "The weather API key is invalid. Run `meteomap configure`.",
            Self::MalformedPayload(_) => "The weather service sent an unexpected response.",
            Self::NoLocation => "Search for a place or use your location first.",
            Self::EmptyQuery => "Type a country or city to ask about.",
            Self::ConcurrentRequestRejected => "The assistant is still thinking about your last question.",
            Self::Internal(_) => "Something went wrong. Please try again.",
        }
    }
}

impl From<reqwest::Error> for ExplorerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(format!("request timed out: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

pub type Result<T, E = ExplorerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_is_distinct_from_network() {
        let cred = ExplorerError::Credential("401".into());
        let net = ExplorerError::network("connection refused");

        assert_ne!(cred.user_message(), net.user_message());
        assert!(cred.to_string().contains("API key"));
    }

    #[test]
    fn not_found_mentions_query() {
        let err = ExplorerError::NotFound { query: "Atlantis".into() };
        assert!(err.to_string().contains("Atlantis"));
    }
}
