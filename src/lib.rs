#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(clippy::all, clippy::cargo, clippy::nursery, missing_docs)]
#![doc = include_str!("../README.md")]

/// Library location and engine settings.
pub mod config;
/// Trace samples, AC points and the tables built from them.
pub mod data;
/// The engine capability, its native binding and an in-memory engine.
pub mod engine;
/// Error types shared between modules.
pub mod errors;
/// Transfer-function coefficient loading.
pub mod filter;
/// Scalar aliases and phasor helpers.
pub mod math;
/// Open circuits bound to an engine.
pub mod schematic;
/// AC sweep definitions and frequency grids.
pub mod sweep;
/// Trace kinds and AC trace selectors.
pub mod traces;

/// Common exports for downstream crates.
pub mod prelude;

pub use filter::{load_filter_params, set_filter_params_sos};
