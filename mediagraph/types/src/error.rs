/*!
    Error types for the mediagraph crate family.
*/

use std::fmt;

/**
    Error type for the mediagraph crate family.
*/
#[derive(Debug)]
pub enum Error {
    /// The graph description failed to parse, or a named anchor could not
    /// be resolved. Terminal for the current build attempt.
    Parse { message: String },
    /// The graph engine failed mid-operation (codec/device failure,
    /// rejected state change). Potentially recoverable via restart.
    Engine { message: String },
    /// A format, channel count, or caps combination outside the supported
    /// set. Handled locally; never crosses the host boundary.
    UnsupportedFormat { message: String },
    /// Thread or execution context creation failed. Fatal for the instance.
    Resource(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { message } => write!(f, "parse error: {message}"),
            Self::Engine { message } => write!(f, "engine error: {message}"),
            Self::UnsupportedFormat { message } => {
                write!(f, "unsupported format: {message}")
            }
            Self::Resource(e) => write!(f, "resource error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Resource(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Resource(e)
    }
}

impl Error {
    /**
        Create a parse error with the given message.
    */
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }

    /**
        Create an engine error with the given message.
    */
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine { message: message.into() }
    }

    /**
        Create an unsupported format error with the given message.
    */
    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat { message: message.into() }
    }

    /**
        Returns true if this is a parse (configuration) error.
    */
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

/**
    Result type alias for the mediagraph crate family.
*/
pub type Result<T> = std::result::Result<T, Error>;
