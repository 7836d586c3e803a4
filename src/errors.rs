use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

#[derive(Debug)]
pub enum FuzzalnError {
    /// Error variant when we couldn't read a stored index from a file
    IndexReadError { source: io::Error },

    /// Error variant when a stored index could not be decoded (incompatible
    /// or corrupt format; rebuilding the index is the usual fix)
    SerializationError { source: bincode::Error },

    /// The graph's dependency wave never drained; some node's predecessors
    /// never became available
    GraphError,

    /// Error variant when something went wrong in the alignment
    AlignmentError,

    /// Other IO errors
    IOError(io::Error),

    /// Other miscellaneous errors
    Other,
}

impl Error for FuzzalnError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            Self::IndexReadError { ref source } => Some(source),
            Self::SerializationError { ref source } => Some(source),
            Self::IOError(ref source) => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for FuzzalnError {
    fn from(value: io::Error) -> Self {
        Self::IOError(value)
    }
}

impl From<bincode::Error> for FuzzalnError {
    fn from(value: bincode::Error) -> Self {
        Self::SerializationError { source: value }
    }
}

impl Display for FuzzalnError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::IndexReadError { source: _ } =>
                write!(f, "Could not read the index from file!"),
            Self::SerializationError { source: _ } =>
                write!(f, "Could not encode or decode the index (try rebuilding it)."),
            Self::GraphError =>
                write!(f, "The graph is in an invalid state (unreachable predecessors or a cycle?)."),
            Self::AlignmentError =>
                write!(f, "Something went wrong with the alignment!"),
            Self::IOError(ref err) =>
                err.fmt(f),
            Self::Other =>
                write!(f, "Fuzzaln error!"),
        }
    }
}
