use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by the persistence layer.
///
/// An unknown area is not an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be opened; areas fall back to legacy files.
    #[error("area store unavailable: {reason}")]
    StorageUnavailable { reason: String },

    /// A write transaction failed and was rolled back.
    #[error("saving area '{area}' failed, previous state kept")]
    TransactionFailure {
        area: String,
        #[source]
        source: sqlx::Error,
    },

    /// A legacy area file could not be deserialized.
    #[error("corrupt legacy area file {}", path.display())]
    CorruptLegacyInput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An area could not be encoded for a legacy file.
    #[error("could not encode legacy area file {}", path.display())]
    LegacyEncoding {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("i/o error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_encoding_names_the_write() {
        let source = serde_json::from_str::<u8>("\"x\"").unwrap_err();
        let err = StoreError::LegacyEncoding {
            path: PathBuf::from("conf/batMapAreas/sunderland.batmap"),
            source,
        };
        assert_eq!(
            err.to_string(),
            "could not encode legacy area file conf/batMapAreas/sunderland.batmap"
        );
        assert!(std::error::Error::source(&err).is_some());
        assert!(!matches!(err, StoreError::CorruptLegacyInput { .. }));
    }
}
