use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    Config(String),
    TagFetch(String),
    BranchFetch(String),
    CommitFetch(String),
    Validation(String),
    BulkExecute(String),
    Network(String),
    Io(String),
    Unknown(String),
}

impl AppError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(_) => {
                "Could not load the dashboard configuration. Check the server and config file."
                    .to_string()
            }
            Self::TagFetch(_) => "Tags could not be fetched for this repository.".to_string(),
            Self::BranchFetch(_) => "Branches are unavailable for this repository.".to_string(),
            Self::CommitFetch(_) => "Commits could not be loaded.".to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::BulkExecute(_) => {
                "The bulk tag request failed before any repository reported back.".to_string()
            }
            Self::Network(_) => {
                "Network request failed. Check that the tag server is reachable.".to_string()
            }
            Self::Io(_) => {
                "File system operation failed. Verify permissions and disk space.".to_string()
            }
            Self::Unknown(_) => "An unexpected error occurred.".to_string(),
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::Config(msg)
            | Self::TagFetch(msg)
            | Self::BranchFetch(msg)
            | Self::CommitFetch(msg)
            | Self::Validation(msg)
            | Self::BulkExecute(msg)
            | Self::Network(msg)
            | Self::Io(msg)
            | Self::Unknown(msg) => msg,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "{msg}"),
            _ => write!(f, "{}: {}", self.user_message(), self.detail()),
        }
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        if let Some(status) = value.status() {
            Self::Network(format!("HTTP {}", status.as_u16()))
        } else if value.is_timeout() {
            Self::Network("The request timed out.".to_string())
        } else {
            Self::Network(value.to_string())
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Unknown(format!("Malformed JSON: {value}"))
    }
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        Self::Unknown(value)
    }
}

impl From<&str> for AppError {
    fn from(value: &str) -> Self {
        Self::Unknown(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_display_their_own_text() {
        let err = AppError::Validation("Tag name is required".to_string());
        assert_eq!(err.to_string(), "Tag name is required");
        assert_eq!(err.user_message(), "Tag name is required");
    }

    #[test]
    fn other_errors_join_summary_and_detail() {
        let err = AppError::CommitFetch("HTTP 500".to_string());
        assert_eq!(err.detail(), "HTTP 500");
        assert!(err.to_string().ends_with(": HTTP 500"));
    }
}
