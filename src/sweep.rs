//! AC sweep configuration and frequency grid helpers.

use crate::engine::EngineError;
use crate::math::Scalar;

/// Generates `n` linearly spaced samples in [start, stop].
#[must_use]
pub fn linspace(start: Scalar, stop: Scalar, n: usize) -> Vec<Scalar> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n as Scalar - 1.0);
            (0..n).map(|i| start + step * i as Scalar).collect()
        }
    }
}

/// Generates `n` logarithmically spaced samples between `start` and `stop` (Hz).
/// Both bounds must be positive; [`AcSweep::new`] checks this.
#[must_use]
pub fn logspace_hz(start_hz: Scalar, stop_hz: Scalar, n: usize) -> Vec<Scalar> {
    match n {
        0 => Vec::new(),
        1 => vec![start_hz],
        _ => {
            let log_start = start_hz.log10();
            let log_stop = stop_hz.log10();
            let step = (log_stop - log_start) / (n as Scalar - 1.0);
            (0..n)
                .map(|i| 10f64.powf(log_start + step * i as Scalar))
                .collect()
        }
    }
}

/// Spacing of AC sweep points.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepScale {
    /// Evenly spaced in frequency.
    Linear,
    /// Evenly spaced in log-frequency.
    #[default]
    Log,
}

impl SweepScale {
    /// Flag value the engine expects (`1` for log, `0` for linear).
    #[must_use]
    pub const fn engine_flag(self) -> i32 {
        match self {
            Self::Linear => 0,
            Self::Log => 1,
        }
    }
}

/// Frequency sweep for AC analysis.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcSweep {
    /// First frequency in Hz.
    pub start: Scalar,
    /// Last frequency in Hz.
    pub stop: Scalar,
    /// Number of points, including both ends.
    pub points: usize,
    /// Point spacing.
    pub scale: SweepScale,
}

impl AcSweep {
    /// Validates and builds a sweep.
    pub fn new(
        start: Scalar,
        stop: Scalar,
        points: usize,
        scale: SweepScale,
    ) -> Result<Self, EngineError> {
        if !(start.is_finite() && stop.is_finite()) {
            return Err(EngineError::InvalidArgument(format!(
                "sweep bounds must be finite, got {start}..{stop}"
            )));
        }
        if points == 0 || i32::try_from(points).is_err() {
            return Err(EngineError::InvalidArgument(format!(
                "sweep needs between 1 and {} points, got {points}",
                i32::MAX
            )));
        }
        if scale == SweepScale::Log && (start <= 0.0 || stop <= 0.0) {
            return Err(EngineError::InvalidArgument(format!(
                "log sweep bounds must be positive, got {start}..{stop}"
            )));
        }
        Ok(Self {
            start,
            stop,
            points,
            scale,
        })
    }

    /// Logarithmic sweep.
    pub fn log(start: Scalar, stop: Scalar, points: usize) -> Result<Self, EngineError> {
        Self::new(start, stop, points, SweepScale::Log)
    }

    /// Linear sweep.
    pub fn linear(start: Scalar, stop: Scalar, points: usize) -> Result<Self, EngineError> {
        Self::new(start, stop, points, SweepScale::Linear)
    }

    /// Frequencies this sweep visits, in Hz.
    #[must_use]
    pub fn frequencies(&self) -> Vec<Scalar> {
        match self.scale {
            SweepScale::Linear => linspace(self.start, self.stop, self.points),
            SweepScale::Log => logspace_hz(self.start, self.stop, self.points),
        }
    }
}
