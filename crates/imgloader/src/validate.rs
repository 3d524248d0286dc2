use crate::{
    error::{Error, ErrorKind},
    types::Operation,
};
use core::fmt;

/// A URI string that passed [`validate`].
///
/// Non-empty by construction. Syntax is checked later, on the execution
/// context, so that a malformed URI is reported with the operation's failure
/// kind rather than as an invalid argument.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ValidUri(String);

impl ValidUri {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for ValidUri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rejects absent or empty URIs.
///
/// Pure and synchronous: meant to run on the caller's thread before anything
/// is scheduled. Whitespace is not trimmed.
///
/// # Errors
///
/// Returns [`Error::InvalidUri`] with a message naming `op`.
pub fn validate(uri: Option<&str>, op: Operation) -> Result<ValidUri, Error> {
    match uri {
        Some(uri) if !uri.is_empty() => Ok(ValidUri(uri.to_owned())),
        _ => Err(Error::new(ErrorKind::InvalidUri, op.empty_uri_message())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_absent_and_empty() {
        for op in [Operation::Prefetch, Operation::GetSize] {
            for uri in [None, Some("")] {
                let err = validate(uri, op).unwrap_err();
                assert_eq!(err.kind(), ErrorKind::InvalidUri);
            }
        }
    }

    #[test]
    fn message_names_the_operation() {
        let prefetch = validate(None, Operation::Prefetch).unwrap_err();
        let get_size = validate(Some(""), Operation::GetSize).unwrap_err();

        assert_eq!(
            prefetch.message(),
            "Cannot prefetch an image for an empty URI."
        );
        assert_eq!(
            get_size.message(),
            "Cannot get the size of an image for an empty URI."
        );
        assert_eq!(prefetch.code(), get_size.code());
    }

    #[test]
    fn accepts_anything_non_empty() {
        assert_eq!(
            validate(Some("https://example.com/a.png"), Operation::Prefetch)
                .unwrap()
                .as_str(),
            "https://example.com/a.png"
        );
        // Syntax and whitespace are someone else's problem.
        assert_eq!(validate(Some(" "), Operation::GetSize).unwrap().as_str(), " ");
        assert_eq!(
            validate(Some("not a uri"), Operation::GetSize)
                .unwrap()
                .into_inner(),
            "not a uri"
        );
    }
}
