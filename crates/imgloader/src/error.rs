//! Error types surfaced through a settled [`Promise`](crate::Promise).
//!
//! Every rejection carries one of three stable codes and a human-readable
//! message:
//!
//! - [`Error::InvalidUri`] (`E_INVALID_URI`): the caller passed an absent or
//!   empty URI. Detected synchronously, before any I/O.
//! - [`Error::PrefetchFailure`] (`E_PREFETCH_FAILURE`): anything that went
//!   wrong while the cache was fetching or persisting the image.
//! - [`Error::SizeResolutionFailure`] (`E_GET_SIZE_FAILURE`): anything that went
//!   wrong while decoding the image through the cache or a direct stream.
//!
//! Messages coming from collaborators are passed through verbatim.

use core::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// Error type reported by collaborators.
///
/// Only its `Display` output survives: the dispatcher copies it into the
/// rejection message unchanged.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// The three rejection kinds a request can settle with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidUri,
    PrefetchFailure,
    SizeResolutionFailure,
}

impl ErrorKind {
    /// The stable string identifier handed to the calling runtime.
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidUri => "E_INVALID_URI",
            Self::PrefetchFailure => "E_PREFETCH_FAILURE",
            Self::SizeResolutionFailure => "E_GET_SIZE_FAILURE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A typed rejection.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The URI was absent or empty.
    #[error("{message}")]
    InvalidUri { message: String },

    /// The cache could not fetch or persist the image.
    #[error("{message}")]
    PrefetchFailure { message: String },

    /// The image could not be decoded to read its dimensions.
    #[error("{message}")]
    SizeResolutionFailure { message: String },
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::InvalidUri => Self::InvalidUri { message },
            ErrorKind::PrefetchFailure => Self::PrefetchFailure { message },
            ErrorKind::SizeResolutionFailure => Self::SizeResolutionFailure { message },
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUri { .. } => ErrorKind::InvalidUri,
            Self::PrefetchFailure { .. } => ErrorKind::PrefetchFailure,
            Self::SizeResolutionFailure { .. } => ErrorKind::SizeResolutionFailure,
        }
    }

    /// Shorthand for `self.kind().code()`.
    pub const fn code(&self) -> &'static str {
        self.kind().code()
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidUri { message }
            | Self::PrefetchFailure { message }
            | Self::SizeResolutionFailure { message } => message,
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ErrorKind {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Error {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> core::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Error", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", self.message())?;
        state.end()
    }
}
