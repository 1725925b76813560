use half_ryd_transit::TransitError;

/// Broad category of an [`Error`], for callers that render messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum ErrorKind {
    Validation,
    Fetch,
    NotFound,
    OutOfRange,
    Storage,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed stop code, service number, date or column name
    #[error(transparent)]
    Validation(TransitError),

    /// HTTP failure or unreadable response from DataMall
    #[error(transparent)]
    Fetch(TransitError),

    #[error("{what} {key} is not present")]
    NotFound { what: &'static str, key: String },

    #[error("Invalid rollback number {index}: {len} savepoint(s) available")]
    OutOfRange { index: i64, len: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Stored document is unreadable: {0}")]
    Document(#[from] serde_json::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Fetch(_) => ErrorKind::Fetch,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::Storage(_) | Self::Document(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn not_found(what: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            what,
            key: key.to_string(),
        }
    }
}

impl From<TransitError> for Error {
    fn from(err: TransitError) -> Self {
        if err.is_validation() {
            Self::Validation(err)
        } else {
            Self::Fetch(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transit_errors_are_categorised() {
        let err: Error = TransitError::InvalidStopCode("123".into()).into();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err: Error = TransitError::HttpStatus {
            endpoint: "BusStops".into(),
            status: 503,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert_eq!(
            err.to_string(),
            "Request to BusStops failed with status code 503"
        );
    }

    #[test]
    fn test_out_of_range_message() {
        let err = Error::OutOfRange { index: 4, len: 2 };
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert_eq!(err.to_string(), "Invalid rollback number 4: 2 savepoint(s) available");
    }
}
