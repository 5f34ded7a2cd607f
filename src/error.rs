//! Error types for diagram discovery

use thiserror::Error;

/// Result type for diagram operations
pub type Result<T> = std::result::Result<T, ErdError>;

/// Diagram discovery errors
#[derive(Error, Debug)]
pub enum ErdError {
    /// A value handed to a model/field constructor is not the descriptor it expects
    #[error("Invalid input: expected {expected}, received {received}")]
    InvalidInput { expected: String, received: String },

    #[error("Unknown model: {query}{}", format_suggestions(.suggestions))]
    UnknownModel { query: String, suggestions: Vec<String> },

    #[error("Unresolved reference in {from}: {reference}")]
    UnresolvedRef { from: String, reference: String },

    #[error("At least one root model is required")]
    NoRoots,

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Path error: {0}")]
    Path(#[from] std::path::StripPrefixError),
}

impl ErdError {
    pub fn invalid_input(expected: impl Into<String>, received: impl Into<String>) -> Self {
        ErdError::InvalidInput {
            expected: expected.into(),
            received: received.into(),
        }
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_lists_suggestions() {
        let err = ErdError::UnknownModel {
            query: "Usr".to_string(),
            suggestions: vec!["User".to_string(), "UserProfile".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unknown model: Usr (did you mean: User, UserProfile?)"
        );
    }

    #[test]
    fn test_unknown_model_without_suggestions() {
        let err = ErdError::UnknownModel {
            query: "Nothing".to_string(),
            suggestions: Vec::new(),
        };
        assert_eq!(err.to_string(), "Unknown model: Nothing");
    }

    #[test]
    fn test_invalid_input_message() {
        let err = ErdError::invalid_input("an object schema", "string schema `Color`");
        assert!(err.to_string().contains("expected an object schema"));
        assert!(err.to_string().contains("`Color`"));
    }
}
