//! Engine capability: the fallible operations offered by an NL5 engine.
//!
//! The native library keeps a process-wide "last error" register. Every
//! [`Engine`] implementation reads it after each call and turns anything other
//! than [`OK`] into an [`EngineError`], so callers only ever see `Result`s.

use std::path::Path;

use crate::data::{AcPoint, Sample};
use crate::math::Scalar;
use crate::sweep::AcSweep;
use crate::traces::{AcTrace, TraceKind};

/// Native library binding loaded with `libloading`.
pub mod ffi;
/// Deterministic in-process engine for tests and demos.
pub mod memory;
/// Host platform detection and library file layout.
pub mod platform;

pub use ffi::Nl5Library;
pub use memory::{CircuitTemplate, FieldWrite, FilterBlock, MemoryEngine, WrittenValue};
pub use platform::Platform;

/// Value of the error register after a successful call.
pub const OK: &str = "OK";

/// Opaque handle to a circuit opened by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CircuitHandle(pub i32);

/// Engine-assigned number of a transient or AC trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceId(pub i32);

/// Errors reported by, or raised while talking to, an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The error register held something other than `"OK"` after a call.
    #[error("{message}")]
    Engine {
        /// Literal text of the error register.
        message: String,
    },
    /// The shared library or one of its symbols could not be loaded.
    #[error("failed to load NL5 library: {0}")]
    Library(#[from] libloading::Error),
    /// No library build exists for the host platform.
    #[error("{0} is not supported by the NL5 library")]
    UnsupportedPlatform(String),
    /// Neither an explicit library path nor an install root was configured.
    #[error("NL5 library location not configured (set NL5_LIBRARY or NL5_HOME)")]
    LibraryNotConfigured,
    /// A name, text or path could not be passed as a C string.
    #[error("cannot pass {0:?} to the engine: not a valid C string")]
    InvalidString(String),
    /// An argument was rejected locally before any engine call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl EngineError {
    /// Builds an engine-reported error from the error register text.
    #[must_use]
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// Error register text when the engine itself reported the failure.
    #[must_use]
    pub fn engine_message(&self) -> Option<&str> {
        match self {
            Self::Engine { message } => Some(message),
            _ => None,
        }
    }
}

/// Operations exposed by an NL5 engine against explicit circuit handles.
///
/// Methods take `&self`: the engine owns its circuits, and exclusive access to
/// one circuit is enforced one level up by [`crate::schematic::Schematic`].
pub trait Engine {
    /// Opens a schematic file and returns its handle.
    fn open(&self, path: &Path) -> Result<CircuitHandle, EngineError>;
    /// Closes a circuit; the handle is invalid afterwards.
    fn close(&self, circuit: CircuitHandle) -> Result<(), EngineError>;
    /// Saves a circuit back to the file it was opened from.
    fn save(&self, circuit: CircuitHandle) -> Result<(), EngineError>;
    /// Saves a circuit under a new file name.
    fn save_as(&self, circuit: CircuitHandle, path: &Path) -> Result<(), EngineError>;

    /// Reads a named scalar field, e.g. `R1` or `F1.a0`.
    fn get_value(&self, circuit: CircuitHandle, name: &str) -> Result<Scalar, EngineError>;
    /// Writes a named scalar field.
    fn set_value(&self, circuit: CircuitHandle, name: &str, value: Scalar)
        -> Result<(), EngineError>;
    /// Reads a named text field, e.g. `F1.model`.
    fn get_text(&self, circuit: CircuitHandle, name: &str) -> Result<String, EngineError>;
    /// Writes a named text field.
    fn set_text(&self, circuit: CircuitHandle, name: &str, text: &str) -> Result<(), EngineError>;

    /// Number of transient traces. Does not consult the error register.
    fn traces_len(&self, circuit: CircuitHandle) -> usize;
    /// Trace at position `index`, or `None` past the end.
    fn trace_at(&self, circuit: CircuitHandle, index: usize) -> Option<TraceId>;
    /// Display name of a trace, or `None` if it does not exist.
    fn trace_name(&self, circuit: CircuitHandle, trace: TraceId) -> Option<String>;
    /// Looks up a transient trace by display name.
    fn trace_by_name(&self, circuit: CircuitHandle, name: &str) -> Result<TraceId, EngineError>;
    /// Adds a transient trace of the given kind.
    fn add_trace(&self, circuit: CircuitHandle, kind: TraceKind, name: &str)
        -> Result<(), EngineError>;
    /// Removes a transient trace.
    fn delete_trace(&self, circuit: CircuitHandle, trace: TraceId) -> Result<(), EngineError>;

    /// Sets the maximum transient step.
    fn set_step(&self, circuit: CircuitHandle, step: Scalar) -> Result<(), EngineError>;
    /// Sets the simulation timeout in seconds.
    fn set_timeout(&self, circuit: CircuitHandle, seconds: i32) -> Result<(), EngineError>;
    /// Resets the transient run to t = 0.
    fn start(&self, circuit: CircuitHandle) -> Result<(), EngineError>;
    /// Simulates for `interval` seconds from the current time.
    fn simulate(&self, circuit: CircuitHandle, interval: Scalar) -> Result<(), EngineError>;
    /// Simulates exactly `interval` seconds, ending on the interval boundary.
    fn simulate_interval(&self, circuit: CircuitHandle, interval: Scalar)
        -> Result<(), EngineError>;
    /// Advances the transient run by one step.
    fn simulate_step(&self, circuit: CircuitHandle) -> Result<(), EngineError>;
    /// Current transient time.
    fn simulation_time(&self, circuit: CircuitHandle) -> Result<Scalar, EngineError>;
    /// Stores the present state as the initial conditions.
    fn save_initial_conditions(&self, circuit: CircuitHandle) -> Result<(), EngineError>;

    /// Number of recorded samples of a trace.
    fn data_len(&self, circuit: CircuitHandle, trace: TraceId) -> Result<usize, EngineError>;
    /// Sample `n` of a trace.
    fn data_at(&self, circuit: CircuitHandle, trace: TraceId, n: usize)
        -> Result<Sample, EngineError>;
    /// Most recent sample of a trace.
    fn last_data(&self, circuit: CircuitHandle, trace: TraceId) -> Result<Sample, EngineError>;
    /// Trace value at time `t`.
    fn data_at_time(&self, circuit: CircuitHandle, trace: TraceId, t: Scalar)
        -> Result<Scalar, EngineError>;
    /// Appends a sample to a data trace.
    fn add_data(&self, circuit: CircuitHandle, trace: TraceId, t: Scalar, value: Scalar)
        -> Result<(), EngineError>;
    /// Clears the samples of a data trace.
    fn delete_data(&self, circuit: CircuitHandle, trace: TraceId) -> Result<(), EngineError>;
    /// Drops all samples except the last one of every trace.
    fn delete_old_data(&self, circuit: CircuitHandle) -> Result<(), EngineError>;
    /// Writes transient data to a file in the engine's own format.
    fn save_data(&self, circuit: CircuitHandle, path: &Path) -> Result<(), EngineError>;

    /// Configures the AC sweep.
    fn set_ac(&self, circuit: CircuitHandle, sweep: &AcSweep) -> Result<(), EngineError>;
    /// Selects the AC stimulus source.
    fn set_ac_source(&self, circuit: CircuitHandle, name: &str) -> Result<(), EngineError>;
    /// Adds an AC trace.
    fn add_ac_trace(&self, circuit: CircuitHandle, trace: &AcTrace<'_>) -> Result<(), EngineError>;
    /// Runs the configured AC sweep.
    fn calc_ac(&self, circuit: CircuitHandle) -> Result<(), EngineError>;
    /// Looks up an AC trace by display name.
    fn ac_trace_by_name(&self, circuit: CircuitHandle, name: &str)
        -> Result<TraceId, EngineError>;
    /// Number of points of an AC trace.
    fn ac_data_len(&self, circuit: CircuitHandle, trace: TraceId) -> Result<usize, EngineError>;
    /// Point `n` of an AC trace.
    fn ac_data_at(&self, circuit: CircuitHandle, trace: TraceId, n: usize)
        -> Result<AcPoint, EngineError>;
    /// Writes AC data to a file in the engine's own format.
    fn save_ac_data(&self, circuit: CircuitHandle, path: &Path) -> Result<(), EngineError>;
}

/// Named-field access on one open circuit.
///
/// This is the only engine surface the filter loader needs.
pub trait NamedFields {
    /// Writes a scalar field.
    fn set_value(&mut self, name: &str, value: Scalar) -> Result<(), EngineError>;
    /// Reads a scalar field.
    fn get_value(&self, name: &str) -> Result<Scalar, EngineError>;
    /// Writes a text field.
    fn set_text(&mut self, name: &str, text: &str) -> Result<(), EngineError>;
    /// Reads a text field.
    fn get_text(&self, name: &str) -> Result<String, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_display_register_text_verbatim() {
        let err = EngineError::engine("Unknown parameter: C2");
        assert_eq!(err.to_string(), "Unknown parameter: C2");
        assert_eq!(err.engine_message(), Some("Unknown parameter: C2"));
        assert_eq!(EngineError::LibraryNotConfigured.engine_message(), None);
    }
}
