use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};

/// A failure that prevented generating any bindings: malformed JSON, an IR
/// that is inconsistent with itself, or unusable options. Problems with
/// individual declarations are not errors; see
/// [`GeneratedCode::errors`](crate::GeneratedCode::errors).
pub struct Error {
    pub(crate) err: crate::gen::Error,
}

/// Which part of the input the generator could not accept.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// There was no IR document at all.
    Empty,
    /// The document is not well-formed IR JSON.
    Json,
    /// The IR declares an item id twice or refers to one it never declares.
    InvalidIr,
    /// An [`Opt`](crate::Opt) field holds an unusable value.
    Options,
    /// The input could not be read.
    Io,
}

impl Error {
    /// Which part of the input was rejected.
    pub fn kind(&self) -> ErrorKind {
        match &self.err {
            crate::gen::Error::Empty => ErrorKind::Empty,
            crate::gen::Error::Json(_) => ErrorKind::Json,
            crate::gen::Error::Invalid(_) => ErrorKind::InvalidIr,
            crate::gen::Error::RuntimeCrate(_) => ErrorKind::Options,
            crate::gen::Error::Io(_) | crate::gen::Error::Utf8(..) => ErrorKind::Io,
        }
    }

    /// Line and column of malformed JSON input, if that is what failed.
    pub fn position(&self) -> Option<(usize, usize)> {
        match &self.err {
            crate::gen::Error::Json(err) if err.line() > 0 => Some((err.line(), err.column())),
            _ => None,
        }
    }
}

impl From<crate::gen::Error> for Error {
    fn from(err: crate::gen::Error) -> Self {
        Error { err }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.err, f)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Debug::fmt(&self.err, f)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.err.source()
    }
}
