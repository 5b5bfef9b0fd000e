//! Error types for the listings client

use std::time::Duration;
use thiserror::Error;

use crate::wizard::validate::ValidationError;

/// One data source that failed while fetching a listings page
#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub source: &'static str,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Photo upload failed ({failed}/{total}): {details}")]
    Upload {
        failed: usize,
        total: usize,
        details: String,
    },

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Account not verified")]
    Unverified,

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("Listing is no longer available")]
    Unavailable,

    #[error("Listing already reported by this user")]
    AlreadyReported,

    #[error("Not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("All listing sources failed: {}", describe_failures(.0))]
    AllSourcesFailed(Vec<SourceFailure>),

    #[error("A submission is already in progress")]
    SubmissionInProgress,

    #[error("Workflow is closed")]
    Closed,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Network(format!("timeout: {}", e))
        } else {
            Error::Http(e.to_string())
        }
    }
}

fn describe_failures(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.source, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    pub fn not_found(collection: &str, id: &str) -> Self {
        Error::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    /// Network-level failures that leave local state untouched and can be retried
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Network(_)
                | Error::Timeout(_)
                | Error::Http(_)
                | Error::AllSourcesFailed(_)
                | Error::Upload { .. }
                | Error::Store(_)
        )
    }

    /// Message shown to the user instead of the technical description
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(v) => v.message.clone(),
            Error::Network(_) | Error::Http(_) | Error::Timeout(_) => {
                "Problème de connexion. Vérifiez votre réseau puis réessayez.".to_string()
            }
            Error::AllSourcesFailed(_) => {
                "Impossible de charger les annonces. Tirez pour actualiser.".to_string()
            }
            Error::Upload { failed, total, .. } => format!(
                "Impossible de publier l'annonce: {} photo(s) sur {} n'ont pas pu être envoyées",
                failed, total
            ),
            Error::Store(msg) => format!("Impossible de publier l'annonce: {}", msg),
            Error::Unauthenticated => {
                "Veuillez vous connecter pour continuer.".to_string()
            }
            Error::Unverified => {
                "Votre compte doit être vérifié pour publier une annonce.".to_string()
            }
            Error::Forbidden(_) => "Cette action n'est pas autorisée.".to_string(),
            Error::NotFound { .. } => "Cette annonce n'existe plus.".to_string(),
            Error::Unavailable => "Cette annonce n'est plus disponible.".to_string(),
            Error::AlreadyReported => "Vous avez déjà signalé cette annonce.".to_string(),
            Error::Auth(msg) => msg.clone(),
            Error::SubmissionInProgress => "Publication en cours...".to_string(),
            Error::Closed | Error::Json(_) | Error::Io(_) => {
                "Une erreur est survenue. Veuillez réessayer.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sources_failed_lists_each_source() {
        let err = Error::AllSourcesFailed(vec![
            SourceFailure {
                source: "remote-api",
                reason: "timeout".to_string(),
            },
            SourceFailure {
                source: "record-store",
                reason: "offline".to_string(),
            },
        ]);

        let text = err.to_string();
        assert!(text.contains("remote-api (timeout)"));
        assert!(text.contains("record-store (offline)"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn user_message_hides_technical_details() {
        let err = Error::Network("connection reset by peer (os error 104)".to_string());
        assert!(!err.user_message().contains("os error"));

        let err = Error::Upload {
            failed: 1,
            total: 3,
            details: "photo2.jpg: 502 Bad Gateway".to_string(),
        };
        assert!(err.user_message().contains("1 photo(s) sur 3"));
        assert!(err.is_recoverable());
    }
}
