// src/error.rs
//! Public error type for the entire crate

use std::path::PathBuf;

use thiserror::Error;

use crate::cache::Generation;

/// Error returned by an external encrypt/decrypt provider
pub type ProviderError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("failed to open {generation} cache store at {}: {source}", path.display())]
    StoreOpen {
        generation: Generation,
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to create {generation} generation directory {}: {source}", path.display())]
    GenerationDir {
        generation: Generation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("failed to close {generation} cache store: {source}")]
    StoreClose {
        generation: Generation,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to rotate cache generation at {}: {source}", path.display())]
    Rotation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transform failed for `{path}`: {source}")]
    Transform {
        path: String,
        #[source]
        source: ProviderError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cached plaintext is not valid UTF-8: {0}")]
    InvalidPlaintext(#[from] std::string::FromUtf8Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("batch cancelled")]
    Cancelled,

    #[error("cache shutdown failed: {first} (+{} more)", rest.len())]
    Shutdown {
        first: Box<CoreError>,
        rest: Vec<CoreError>,
    },
}

impl CoreError {
    /// Collapse a list of failures into one error, keeping the first as primary.
    ///
    /// Returns `None` for an empty list.
    pub(crate) fn collect(mut errors: Vec<CoreError>) -> Option<CoreError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => {
                let first = errors.remove(0);
                Some(CoreError::Shutdown {
                    first: Box::new(first),
                    rest: errors,
                })
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn close_failure(generation: Generation) -> CoreError {
        CoreError::StoreClose {
            generation,
            source: rusqlite::Error::InvalidQuery,
        }
    }

    #[test]
    fn collect_of_nothing_is_none() {
        assert!(CoreError::collect(Vec::new()).is_none());
    }

    #[test]
    fn collect_of_one_returns_it_unwrapped() {
        let err = CoreError::collect(vec![close_failure(Generation::Old)]);
        assert!(matches!(
            err,
            Some(CoreError::StoreClose {
                generation: Generation::Old,
                ..
            })
        ));
    }

    #[test]
    fn collect_keeps_the_first_failure_primary_and_the_rest_in_order() {
        let err = CoreError::collect(vec![
            close_failure(Generation::Young),
            close_failure(Generation::Old),
            CoreError::Store(rusqlite::Error::QueryReturnedNoRows),
        ]);

        let (first, rest) = match err {
            Some(CoreError::Shutdown { first, rest }) => (first, rest),
            other => panic!("expected aggregated shutdown error, got {other:?}"),
        };
        assert!(matches!(
            *first,
            CoreError::StoreClose {
                generation: Generation::Young,
                ..
            }
        ));
        assert_eq!(rest.len(), 2);
        assert!(matches!(
            rest[0],
            CoreError::StoreClose {
                generation: Generation::Old,
                ..
            }
        ));
        assert!(matches!(rest[1], CoreError::Store(_)));
        assert!(CoreError::Shutdown { first, rest }
            .to_string()
            .ends_with("(+2 more)"));
    }
}
