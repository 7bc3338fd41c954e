use bstr::BString;
use thiserror::Error;

use std::io;
use std::path::PathBuf;

use crate::compression::Kind;
use crate::fd::Fd;
use crate::Whence;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No entry named {path:?}")]
    NotFound { path: BString },
    #[error("All {capacity} file descriptors are in use")]
    NoCapacity { capacity: usize },
    #[error("Bad file descriptor {fd}")]
    InvalidDescriptor { fd: Fd },
    #[error("Seek by {offset} from {whence:?} would move before the start of the file")]
    InvalidArgument { offset: i64, whence: Whence },
    #[error("Invalid {field} field in header {index}: {source}")]
    MalformedHeader {
        index: usize,
        field: &'static str,
        source: repr::OctalError,
    },
    #[error("Archive truncated at entry {index}: expected {expected} bytes, found {available}")]
    Truncated {
        index: usize,
        expected: usize,
        available: usize,
    },
    #[error("tarfs built without support for {kind}")]
    DisabledCompression { kind: Kind },
    #[error("Unable to open {}: {}", path.display(), source)]
    UnableToOpen { path: PathBuf, source: io::Error },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn malformed(index: usize, field: &'static str) -> impl FnOnce(repr::OctalError) -> Self {
        move |source| Error::MalformedHeader {
            index,
            field,
            source,
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        let kind = match e {
            Error::Io(inner) => return inner,
            Error::UnableToOpen { ref source, .. } => source.kind(),
            Error::NotFound { .. } => io::ErrorKind::NotFound,
            Error::InvalidArgument { .. } => io::ErrorKind::InvalidInput,
            Error::MalformedHeader { .. } => io::ErrorKind::InvalidData,
            Error::Truncated { .. } => io::ErrorKind::UnexpectedEof,
            Error::NoCapacity { .. }
            | Error::InvalidDescriptor { .. }
            | Error::DisabledCompression { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}
