use std::path::PathBuf;

use thiserror::Error;

use crate::sources::FetchError;

/// Coarse classification of every failure the engine can report.
///
/// All of these are recoverable at the call site: the session reports the
/// error and re-prompts or skips the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    AlreadyExists,
    RemoteFailure,
    DivisionDefect,
    Io,
}

#[derive(Debug, Error)]
pub enum CarparkError {
    #[error("'{}' is not found", .0.display())]
    SourceNotFound(PathBuf),

    #[error("carpark {0} does not exist")]
    UnknownCarpark(String),

    #[error("carpark {0} is not in favourites")]
    NotFavourite(String),

    #[error("no carparks found in {0}")]
    NoMatch(String),

    #[error("no carparks to choose from")]
    Empty,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("line {line}: '{field}' is not a valid {expected}: {raw:?}")]
    Malformed {
        line: usize,
        field: &'static str,
        expected: &'static str,
        raw: String,
    },

    #[error("carpark {carpark} has no '{field}'")]
    MissingField {
        carpark: String,
        field: &'static str,
    },

    #[error("carpark {0} is already in favourites")]
    AlreadyFavourite(String),

    #[error("'{}' already exists", .0.display())]
    FileExists(PathBuf),

    #[error("carpark {0} reports zero total lots")]
    ZeroTotalLots(String),

    #[error(transparent)]
    Remote(#[from] FetchError),

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unreadable delimited text: {0}")]
    Csv(#[from] csv::Error),

    #[error("favourites file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl CarparkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceNotFound(_)
            | Self::UnknownCarpark(_)
            | Self::NotFavourite(_)
            | Self::NoMatch(_)
            | Self::Empty => ErrorKind::NotFound,
            Self::InvalidArgument(_)
            | Self::Malformed { .. }
            | Self::MissingField { .. }
            | Self::Csv(_)
            | Self::Corrupt(_) => ErrorKind::InvalidArgument,
            Self::AlreadyFavourite(_) | Self::FileExists(_) => ErrorKind::AlreadyExists,
            Self::Remote(_) => ErrorKind::RemoteFailure,
            Self::ZeroTotalLots(_) => ErrorKind::DivisionDefect,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Map an I/O failure on `path`, turning a missing file into [`CarparkError::SourceNotFound`].
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::SourceNotFound(path)
        } else {
            Self::Io { path, source }
        }
    }
}

pub type Result<T, E = CarparkError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_maps_to_not_found() {
        let err = CarparkError::from_io(
            "nope.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "'nope.csv' is not found");
    }

    #[test]
    fn permission_denied_stays_io() {
        let err = CarparkError::from_io(
            "locked.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn favourites_conditions_are_classified() {
        assert_eq!(
            CarparkError::AlreadyFavourite("A1".into()).kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            CarparkError::UnknownCarpark("ZZ".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CarparkError::ZeroTotalLots("B2".into()).kind(),
            ErrorKind::DivisionDefect
        );
    }
}
