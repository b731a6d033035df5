use std::{array::TryFromSliceError, fmt, str::Utf8Error};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Error {
    // Malformed, out-of-range, duplicate or missing input. Decode only.
    InvalidData,
    // Destination buffer too small. Encode only.
    OutOfResources,
    // The following are passed through verbatim from value codecs
    InvalidState,
    Busy,
    Unknown,
}

impl From<TryFromSliceError> for Error {
    fn from(_e: TryFromSliceError) -> Self {
        Self::InvalidData
    }
}

impl From<Utf8Error> for Error {
    fn from(_e: Utf8Error) -> Self {
        Self::InvalidData
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
