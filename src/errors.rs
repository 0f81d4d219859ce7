//
// Errors
//
use std::io;
use std::result;
use std::error;
use std::num;
use std::fmt;
use ndarray as nd;
use regex;
use smartcore::error::Failed;

/// Type alias for embeval errors
pub type Result<X> = result::Result<X, Error>;

/// Wrapper for many kinds of errors occuring while loading and scoring embeddings
#[derive(Debug)]
pub enum Error {
    /// A vector row doesn't have the dimensionality the file declared
    IncompatibleInputs { line: usize, word: String, expected: usize, found: usize },
    InvalidDimensions(String),
    InvalidParameter(String),
    NonFinite { row: usize, dimension: usize },
    Malformed(String),
    DeadlineExceeded,
    ShapeError(nd::ShapeError),
    IOError(io::Error),
    ParseFloatError(num::ParseFloatError),
    ParseIntError(num::ParseIntError),
    RegexError(regex::Error),
    /// The classifier failed to fit or predict
    ClassifierError(Failed),
    MissingFile(&'static str, Option<io::Error>),
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::IncompatibleInputs { line, ref word, expected, found } => write!(f,
                "Incompatible inputs: line {} ({:?}) has {} values but the vectors have {} \
                dimensions",
                line, word, found, expected),
            Error::InvalidDimensions(ref info) => write!(f, "Dimension Mismatch: {}", info),
            Error::InvalidParameter(ref info) => write!(f, "Invalid parameter: {}", info),
            Error::NonFinite { row, dimension } => write!(f,
                "NaN or infinity in embedding at row {}, dimension {}; cannot create metrics.",
                row, dimension),
            Error::Malformed(ref info) => write!(f, "Malformed input: {}", info),
            Error::DeadlineExceeded => write!(f, "Deadline passed before scoring finished"),
            Error::ShapeError(ref err) => write!(f, "NDArray shape error: {:?}", err),
            Error::IOError(ref err) => write!(f, "IO error: {}", err),
            Error::ParseFloatError(ref err) => write!(f, "Error parsing float: {}", err),
            Error::ParseIntError(ref err) => write!(f, "Error parsing integer: {}", err),
            Error::RegexError(ref err) => write!(f, "Regex error: {}", err),
            Error::ClassifierError(ref err) => write!(f, "Classifier error: {}", err),
            Error::MissingFile(ref info, ref opt_err) => {
                write!(f,
                    "The {} must already exist at this point but there was a problem opening it. \
                    Wrong directory? The OS error was: ",
                    info)?;
                if let Some(ref err) = *opt_err { err.fmt(f) }
                else { write!(f, "Unknown") }
            },
            Error::Other(ref info) => write!(f, "{}", info),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::ShapeError(ref err) => Some(err),
            Error::IOError(ref err) => Some(err),
            Error::ParseFloatError(ref err) => Some(err),
            Error::ParseIntError(ref err) => Some(err),
            Error::RegexError(ref err) => Some(err),
            Error::ClassifierError(ref err) => Some(err),
            Error::MissingFile(_, Some(ref err)) => Some(err),
            _ => None,
        }
    }
}
//
// Convert everything else into Error
//
impl From<nd::ShapeError> for Error {
    fn from(err: nd::ShapeError) -> Self {
        Error::ShapeError(err)
    }
}
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IOError(err)
    }
}
impl From<num::ParseFloatError> for Error {
    fn from(err: num::ParseFloatError) -> Self {
        Error::ParseFloatError(err)
    }
}
impl From<num::ParseIntError> for Error {
    fn from(err: num::ParseIntError) -> Self {
        Error::ParseIntError(err)
    }
}
impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::RegexError(err)
    }
}
impl From<Failed> for Error {
    fn from(err: Failed) -> Self {
        Error::ClassifierError(err)
    }
}

//
// Convert Error into a general io Error
//
impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::IOError(err) => err,
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
