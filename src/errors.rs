//! Top-level error type for code that mixes engine calls, filter loading and
//! file output.

use thiserror::Error;

use crate::engine::EngineError;
use crate::filter::FilterError;

/// Any failure raised by this crate.
#[derive(Debug, Error)]
pub enum Nl5Error {
    /// Engine call or library loading failure.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// Coefficient validation or filter load failure.
    #[error(transparent)]
    Filter(#[from] FilterError),
    /// Writing exported data failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Nl5Error {
    /// Error register text when the engine itself reported the failure.
    #[must_use]
    pub fn engine_message(&self) -> Option<&str> {
        match self {
            Self::Engine(err) | Self::Filter(FilterError::Engine(err)) => err.engine_message(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_text_survives_filter_wrapping() {
        let err: Nl5Error = FilterError::from(EngineError::engine("Unknown parameter: F1.b3")).into();
        assert_eq!(err.engine_message(), Some("Unknown parameter: F1.b3"));
        assert_eq!(err.to_string(), "Unknown parameter: F1.b3");
    }

    #[test]
    fn validation_errors_carry_no_engine_text() {
        let err: Nl5Error = FilterError::LengthMismatch { b: 2, a: 3 }.into();
        assert_eq!(err.engine_message(), None);
    }
}
