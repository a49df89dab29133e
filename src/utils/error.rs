// src/utils/error.rs

use std::error::Error;
use std::fmt;
use std::io;

use crate::decoder::error::ConformanceError;
use crate::decoder::picture::PictureError;
use crate::transform::TransformError;

/// Main error type for the VC-2 conformance library.
#[derive(Debug)]
pub enum Vc2Error {
    /// An I/O error occurred
    Io(io::Error),
    /// The bitstream (or a value being serialized) is not conformant
    Conformance(ConformanceError),
    /// A transform or quantisation parameter was out of range
    Transform(TransformError),
    /// Slice data could not be assembled into a picture
    Picture(PictureError),
    /// An invalid argument was provided
    InvalidArg(String),
}

impl fmt::Display for Vc2Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vc2Error::Io(err) => write!(f, "I/O error: {}", err),
            Vc2Error::Conformance(err) => write!(f, "Conformance error: {}", err),
            Vc2Error::Transform(err) => write!(f, "Transform error: {}", err),
            Vc2Error::Picture(err) => write!(f, "Picture error: {}", err),
            Vc2Error::InvalidArg(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl Error for Vc2Error {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Vc2Error::Io(err) => Some(err),
            Vc2Error::Conformance(err) => Some(err),
            Vc2Error::Transform(err) => Some(err),
            Vc2Error::Picture(err) => Some(err),
            Vc2Error::InvalidArg(_) => None,
        }
    }
}

impl From<io::Error> for Vc2Error {
    fn from(err: io::Error) -> Self {
        Vc2Error::Io(err)
    }
}

impl From<ConformanceError> for Vc2Error {
    fn from(err: ConformanceError) -> Self {
        Vc2Error::Conformance(err)
    }
}

impl From<TransformError> for Vc2Error {
    fn from(err: TransformError) -> Self {
        Vc2Error::Transform(err)
    }
}

impl From<PictureError> for Vc2Error {
    fn from(err: PictureError) -> Self {
        match err {
            PictureError::Transform(err) => Vc2Error::Transform(err),
            other => Vc2Error::Picture(other),
        }
    }
}

impl Vc2Error {
    /// The conformance error carried by this error, if any.
    pub fn conformance(&self) -> Option<&ConformanceError> {
        match self {
            Vc2Error::Conformance(err) => Some(err),
            _ => None,
        }
    }
}

/// A specialized `Result` type for VC-2 operations.
pub type Result<T> = std::result::Result<T, Vc2Error>;
