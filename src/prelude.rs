//! Convenience re-exports for driving NL5 circuits.

pub use crate::config::EngineConfig;
pub use crate::data::{AcPoint, AcTable, AcTraceData, Sample, TraceData, TraceTable};
pub use crate::engine::{
    CircuitHandle, CircuitTemplate, Engine, EngineError, FilterBlock, MemoryEngine, NamedFields,
    Nl5Library, Platform, TraceId,
};
pub use crate::errors::Nl5Error;
pub use crate::filter::{
    load_filter_params, load_filter_params_with, set_filter_params_sos, Coefficients,
    FilterDomain, FilterError, LoadOptions, SecondOrderSection,
};
pub use crate::math::{CScalar, Scalar};
pub use crate::schematic::Schematic;
pub use crate::sweep::{AcSweep, SweepScale};
pub use crate::traces::{AcTrace, TraceKind};
