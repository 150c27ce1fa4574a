use thiserror::Error;

/// Errors raised while scoring a batch of answer candidates.
///
/// Tensor and model failures are carried through untouched in
/// [`ScoreError::Candle`]; everything else is a contract violation detected
/// before (or instead of) any numeric work.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// Tensor ranks, lengths or row counts do not line up.
    #[error("shape error: {0}")]
    Shape(String),
    /// A model config that maps to neither supported topology.
    #[error("unsupported architecture: {0}")]
    UnsupportedArchitecture(String),
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Candle(#[from] candle_core::Error),
}

pub type Result<T> = std::result::Result<T, ScoreError>;

/// Shorthand for returning a [`ScoreError::Shape`] with a formatted message.
macro_rules! shape_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::ScoreError::Shape(format!($($arg)*)))
    };
}

pub(crate) use shape_bail;
