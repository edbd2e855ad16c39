//! An open schematic: one circuit handle plus the engine that owns it.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::data::{AcPoint, AcTable, AcTraceData, Sample, TraceData, TraceTable};
use crate::engine::{CircuitHandle, Engine, EngineError, NamedFields, TraceId};
use crate::filter::{self, FilterDomain, FilterError, IntoSection, LoadOptions};
use crate::math::Scalar;
use crate::sweep::AcSweep;
use crate::traces::{AcTrace, TraceKind};

/// A circuit opened from a schematic file.
///
/// The circuit is closed when the value is dropped; use [`Schematic::close`]
/// to observe close errors.
pub struct Schematic<'e, E: Engine + ?Sized> {
    engine: &'e E,
    handle: CircuitHandle,
    path: PathBuf,
    open: bool,
}

impl<'e, E: Engine + ?Sized> Schematic<'e, E> {
    /// Opens `path` with `engine`.
    pub fn open(engine: &'e E, path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let handle = engine.open(path)?;
        info!(path = %path.display(), handle = handle.0, "schematic opened");
        Ok(Self {
            engine,
            handle,
            path: path.to_path_buf(),
            open: true,
        })
    }

    /// Engine handle of this circuit.
    #[must_use]
    pub fn handle(&self) -> CircuitHandle {
        self.handle
    }

    /// File this schematic was opened from or last saved as.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Closes the circuit.
    pub fn close(mut self) -> Result<(), EngineError> {
        self.open = false;
        self.engine.close(self.handle)
    }

    /// Saves over the current file.
    pub fn save(&mut self) -> Result<(), EngineError> {
        self.engine.save(self.handle)?;
        info!(path = %self.path.display(), "schematic saved");
        Ok(())
    }

    /// Saves under a new file name, which becomes the current file.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let path = path.as_ref();
        self.engine.save_as(self.handle, path)?;
        info!(path = %path.display(), "schematic saved");
        self.path = path.to_path_buf();
        Ok(())
    }

    /// Writes a scalar field.
    pub fn set_value(&mut self, name: &str, value: Scalar) -> Result<(), EngineError> {
        self.engine.set_value(self.handle, name, value)
    }

    /// Reads a scalar field.
    pub fn get_value(&self, name: &str) -> Result<Scalar, EngineError> {
        self.engine.get_value(self.handle, name)
    }

    /// Writes a text field.
    pub fn set_text(&mut self, name: &str, text: &str) -> Result<(), EngineError> {
        self.engine.set_text(self.handle, name, text)
    }

    /// Reads a text field.
    pub fn get_text(&self, name: &str) -> Result<String, EngineError> {
        self.engine.get_text(self.handle, name)
    }

    // --- filter blocks -------------------------------------------------

    /// Loads polynomial coefficients into filter block `block`.
    ///
    /// See [`filter::load_filter_params`].
    pub fn load_filter_params(
        &mut self,
        block: &str,
        b: &[Scalar],
        a: &[Scalar],
        domain: FilterDomain,
    ) -> Result<(), FilterError> {
        filter::load_filter_params(self, block, b, a, domain)
    }

    /// [`Schematic::load_filter_params`] with explicit options.
    pub fn load_filter_params_with(
        &mut self,
        block: &str,
        b: &[Scalar],
        a: &[Scalar],
        domain: FilterDomain,
        options: LoadOptions,
    ) -> Result<(), FilterError> {
        filter::load_filter_params_with(self, block, b, a, domain, options)
    }

    /// Loads one second-order section into `block`.
    pub fn set_filter_params_sos(&mut self, block: &str, sos: impl IntoSection) -> Result<(), FilterError> {
        filter::set_filter_params_sos(self, block, sos)
    }

    // --- transient -----------------------------------------------------

    /// Restarts at t = 0 and simulates `screen` seconds with maximum step `step`.
    pub fn simulate_transient(&mut self, screen: Scalar, step: Scalar) -> Result<(), EngineError> {
        self.engine.set_step(self.handle, step)?;
        self.engine.start(self.handle)?;
        self.engine.simulate(self.handle, screen)?;
        info!(screen, step, "transient run finished");
        Ok(())
    }

    /// Restarts at t = 0 and simulates exactly `screen` seconds.
    pub fn simulate_interval(&mut self, screen: Scalar, step: Scalar) -> Result<(), EngineError> {
        self.engine.set_step(self.handle, step)?;
        self.engine.start(self.handle)?;
        self.engine.simulate_interval(self.handle, screen)?;
        info!(screen, step, "transient interval finished");
        Ok(())
    }

    /// Continues the current run for `screen` seconds.
    pub fn continue_transient(&mut self, screen: Scalar, step: Scalar) -> Result<(), EngineError> {
        self.engine.set_step(self.handle, step)?;
        self.engine.simulate(self.handle, screen)
    }

    /// Continues the current run for exactly `screen` seconds.
    pub fn continue_interval(&mut self, screen: Scalar, step: Scalar) -> Result<(), EngineError> {
        self.engine.set_step(self.handle, step)?;
        self.engine.simulate_interval(self.handle, screen)
    }

    /// Advances the current run by one step.
    pub fn simulate_step(&mut self) -> Result<(), EngineError> {
        self.engine.simulate_step(self.handle)
    }

    /// Sets the simulation timeout in seconds.
    pub fn set_timeout(&mut self, seconds: i32) -> Result<(), EngineError> {
        self.engine.set_timeout(self.handle, seconds)
    }

    /// Current transient time.
    pub fn simulation_time(&self) -> Result<Scalar, EngineError> {
        self.engine.simulation_time(self.handle)
    }

    /// Stores the present state as initial conditions.
    pub fn save_initial_conditions(&mut self) -> Result<(), EngineError> {
        self.engine.save_initial_conditions(self.handle)
    }

    // --- traces --------------------------------------------------------

    /// Names of all transient traces, in engine order.
    #[must_use]
    pub fn trace_names(&self) -> Vec<String> {
        (0..self.engine.traces_len(self.handle))
            .filter_map(|i| self.engine.trace_at(self.handle, i))
            .filter_map(|id| self.engine.trace_name(self.handle, id))
            .collect()
    }

    /// Adds a transient trace.
    pub fn add_trace(&mut self, name: &str, kind: TraceKind) -> Result<(), EngineError> {
        self.engine.add_trace(self.handle, kind, name)
    }

    /// Removes a transient trace by display name.
    pub fn delete_trace(&mut self, name: &str) -> Result<(), EngineError> {
        let id = self.trace_number(name)?;
        self.engine.delete_trace(self.handle, id)
    }

    /// Removes every transient trace.
    pub fn clear_traces(&mut self) -> Result<(), EngineError> {
        while let Some(id) = self.engine.trace_at(self.handle, 0) {
            self.engine.delete_trace(self.handle, id)?;
        }
        debug!("traces cleared");
        Ok(())
    }

    /// Engine number of a transient trace.
    pub fn trace_number(&self, name: &str) -> Result<TraceId, EngineError> {
        self.engine.trace_by_name(self.handle, name)
    }

    // --- transient data ------------------------------------------------

    /// Sample `n` of a trace.
    pub fn data_at(&self, trace: &str, n: usize) -> Result<Sample, EngineError> {
        let id = self.trace_number(trace)?;
        self.engine.data_at(self.handle, id, n)
    }

    /// Most recent sample of a trace.
    pub fn last_data(&self, trace: &str) -> Result<Sample, EngineError> {
        let id = self.trace_number(trace)?;
        self.engine.last_data(self.handle, id)
    }

    /// Trace value at time `t`.
    pub fn data_at_time(&self, trace: &str, t: Scalar) -> Result<Scalar, EngineError> {
        let id = self.trace_number(trace)?;
        self.engine.data_at_time(self.handle, id, t)
    }

    /// All samples of one trace.
    pub fn trace_data(&self, trace: &str) -> Result<TraceData, EngineError> {
        let id = self.trace_number(trace)?;
        let n = self.engine.data_len(self.handle, id)?;
        let samples = (0..n)
            .map(|i| self.engine.data_at(self.handle, id, i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TraceData {
            name: trace.to_owned(),
            samples,
        })
    }

    /// Several traces aligned on time; all traces when `traces` is `None`.
    ///
    /// With `fill`, gaps left by traces sampled on different time grids take
    /// the previous value of the same trace.
    pub fn data(&self, traces: Option<&[&str]>, fill: bool) -> Result<TraceTable, EngineError> {
        let names: Vec<String> = match traces {
            Some(names) => names.iter().map(|n| (*n).to_owned()).collect(),
            None => self.trace_names(),
        };
        let series = names
            .iter()
            .map(|name| self.trace_data(name))
            .collect::<Result<Vec<_>, _>>()?;
        let table = TraceTable::from_traces(series);
        Ok(if fill { table.filled() } else { table })
    }

    /// Appends a sample to a data trace.
    pub fn add_data(&mut self, trace: &str, t: Scalar, value: Scalar) -> Result<(), EngineError> {
        let id = self.trace_number(trace)?;
        self.engine.add_data(self.handle, id, t, value)
    }

    /// Clears the samples of a data trace.
    pub fn delete_data(&mut self, trace: &str) -> Result<(), EngineError> {
        let id = self.trace_number(trace)?;
        self.engine.delete_data(self.handle, id)
    }

    /// Keeps only the last sample of every trace.
    pub fn delete_old_data(&mut self) -> Result<(), EngineError> {
        self.engine.delete_old_data(self.handle)
    }

    /// Exports transient data in the engine's own format.
    pub fn save_data(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        self.engine.save_data(self.handle, path.as_ref())
    }

    // --- AC ------------------------------------------------------------

    /// Selects the AC stimulus source.
    pub fn set_ac_source(&mut self, name: &str) -> Result<(), EngineError> {
        self.engine.set_ac_source(self.handle, name)
    }

    /// Adds an AC trace.
    pub fn add_ac_trace(&mut self, trace: AcTrace<'_>) -> Result<(), EngineError> {
        self.engine.add_ac_trace(self.handle, &trace)
    }

    /// Configures and runs an AC sweep.
    pub fn simulate_ac(&mut self, sweep: &AcSweep) -> Result<(), EngineError> {
        self.engine.set_ac(self.handle, sweep)?;
        self.engine.calc_ac(self.handle)?;
        info!(
            start = sweep.start,
            stop = sweep.stop,
            points = sweep.points,
            "AC sweep finished"
        );
        Ok(())
    }

    /// Engine number of an AC trace.
    pub fn ac_trace_number(&self, name: &str) -> Result<TraceId, EngineError> {
        self.engine.ac_trace_by_name(self.handle, name)
    }

    /// Point `n` of an AC trace.
    pub fn ac_data_at(&self, trace: &str, n: usize) -> Result<AcPoint, EngineError> {
        let id = self.ac_trace_number(trace)?;
        self.engine.ac_data_at(self.handle, id, n)
    }

    /// All points of one AC trace.
    pub fn ac_trace_data(&self, trace: &str) -> Result<AcTraceData, EngineError> {
        let id = self.ac_trace_number(trace)?;
        let n = self.engine.ac_data_len(self.handle, id)?;
        let points = (0..n)
            .map(|i| self.engine.ac_data_at(self.handle, id, i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AcTraceData {
            name: trace.to_owned(),
            points,
        })
    }

    /// Several AC traces aligned on frequency, forward filled.
    pub fn ac_data(&self, traces: &[&str]) -> Result<AcTable, EngineError> {
        let series = traces
            .iter()
            .map(|name| self.ac_trace_data(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AcTable::from_ac_traces(series).filled())
    }

    /// Exports AC data in the engine's own format.
    pub fn save_ac_data(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        self.engine.save_ac_data(self.handle, path.as_ref())
    }
}

impl<E: Engine + ?Sized> NamedFields for Schematic<'_, E> {
    fn set_value(&mut self, name: &str, value: Scalar) -> Result<(), EngineError> {
        Schematic::set_value(self, name, value)
    }

    fn get_value(&self, name: &str) -> Result<Scalar, EngineError> {
        Schematic::get_value(self, name)
    }

    fn set_text(&mut self, name: &str, text: &str) -> Result<(), EngineError> {
        Schematic::set_text(self, name, text)
    }

    fn get_text(&self, name: &str) -> Result<String, EngineError> {
        Schematic::get_text(self, name)
    }
}

impl<E: Engine + ?Sized> Drop for Schematic<'_, E> {
    fn drop(&mut self) {
        if self.open {
            if let Err(err) = self.engine.close(self.handle) {
                warn!(path = %self.path.display(), %err, "failed to close schematic");
            }
        }
    }
}

impl<E: Engine + ?Sized> fmt::Debug for Schematic<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schematic")
            .field("path", &self.path)
            .field("handle", &self.handle)
            .field("open", &self.open)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::engine::{CircuitTemplate, FilterBlock, MemoryEngine};

    fn rc() -> MemoryEngine {
        MemoryEngine::new().with_circuit(
            "rc.nl5",
            CircuitTemplate::new()
                .value("V1", 1.0)
                .value("R1", 1.0)
                .value("C1", 1.0)
                .value("C1.IC", 0.0)
                .block("F1", FilterBlock::analog()),
        )
    }

    #[test]
    fn set_get_value_and_unknown_fields() {
        let engine = rc();
        let mut s = Schematic::open(&engine, "rc.nl5").expect("open");
        s.set_value("C1", 1e-9).expect("C1");
        s.set_value("R1", 1e-3).expect("R1");
        assert_eq!(s.get_value("C1").unwrap(), 1e-9);
        assert_eq!(s.get_value("R1").unwrap(), 1e-3);

        let err = s.set_value("C2", 1e-9).unwrap_err();
        assert_eq!(err.engine_message(), Some("Unknown parameter: C2"));
        assert!(s.get_value("C2").is_err());
    }

    #[test]
    fn add_and_remove_traces() {
        let engine = rc();
        let mut s = Schematic::open(&engine, "rc.nl5").expect("open");
        s.add_trace("C1", TraceKind::Voltage).unwrap();
        s.add_trace("C1", TraceKind::Current).unwrap();
        s.add_trace("C1", TraceKind::Power).unwrap();
        s.add_trace("V(C1)*I(C1)", TraceKind::Function).unwrap();

        let names = s.trace_names();
        assert_eq!(names, ["V(C1)", "I(C1)", "P(C1)", "V(C1)*I(C1)"]);

        s.delete_trace("V(C1)").unwrap();
        assert!(!s.trace_names().contains(&"V(C1)".to_owned()));

        s.clear_traces().unwrap();
        assert!(s.trace_names().is_empty());
    }

    #[test]
    fn interval_runs_continue_from_last_time() {
        let engine = rc();
        let mut s = Schematic::open(&engine, "rc.nl5").expect("open");
        s.add_trace("C1", TraceKind::Voltage).unwrap();
        s.simulate_interval(1.2, 1e-3).unwrap();
        let data = s.data(None, true).unwrap();
        assert_relative_eq!(*data.index().last().unwrap(), 1.2, max_relative = 1e-9);

        s.continue_interval(1.0 / 6.0, 1e-3).unwrap();
        let data = s.data(None, true).unwrap();
        assert_relative_eq!(*data.index().last().unwrap(), 1.2 + 1.0 / 6.0, max_relative = 1e-9);
        assert_eq!(data.last("V(C1)"), Some(s.last_data("V(C1)").unwrap().value));
    }

    #[test]
    fn data_traces_take_external_samples() {
        let engine = rc();
        let mut s = Schematic::open(&engine, "rc.nl5").expect("open");
        s.add_trace("ref", TraceKind::Data).unwrap();
        s.add_data("ref", 0.0, 1.0).unwrap();
        s.add_data("ref", 0.5, 2.0).unwrap();
        assert_eq!(s.data_at_time("ref", 0.7).unwrap(), 2.0);
        assert_eq!(s.trace_data("ref").unwrap().len(), 2);
        s.delete_data("ref").unwrap();
        assert!(s.trace_data("ref").unwrap().is_empty());
    }

    #[test]
    fn ac_sweep_reads_back_every_point() {
        let engine = rc();
        let mut s = Schematic::open(&engine, "rc.nl5").expect("open");
        s.set_ac_source("V1").unwrap();
        s.add_ac_trace(AcTrace::Voltage("C1")).unwrap();
        s.add_ac_trace(AcTrace::Impedance).unwrap();
        s.simulate_ac(&AcSweep::log(1.0, 1.0e3, 4).unwrap()).unwrap();

        let v = s.ac_trace_data("V(C1)").unwrap();
        assert_eq!(v.points.len(), 4);
        assert_relative_eq!(v.points[3].frequency, 1.0e3, max_relative = 1e-12);

        let table = s.ac_data(&["V(C1)", "Z"]).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.columns().len(), 2);
    }

    #[test]
    fn ac_needs_a_source() {
        let engine = rc();
        let mut s = Schematic::open(&engine, "rc.nl5").expect("open");
        let err = s.simulate_ac(&AcSweep::linear(1.0, 10.0, 3).unwrap()).unwrap_err();
        assert_eq!(err.engine_message(), Some("AC source is not defined"));
    }

    #[test]
    fn drop_closes_the_handle() {
        let engine = rc();
        {
            let _s = Schematic::open(&engine, "rc.nl5").expect("open");
            assert_eq!(engine.open_circuits(), 1);
        }
        assert_eq!(engine.open_circuits(), 0);

        let s = Schematic::open(&engine, "rc.nl5").expect("open");
        s.close().expect("close");
        assert_eq!(engine.open_circuits(), 0);
    }

    #[test]
    fn save_as_persists_field_values() {
        let engine = rc();
        let mut s = Schematic::open(&engine, "rc.nl5").expect("open");
        s.set_value("R1", 47.0).unwrap();
        s.save_as("rc_47.nl5").unwrap();
        assert_eq!(s.path(), Path::new("rc_47.nl5"));
        s.close().unwrap();

        let reopened = Schematic::open(&engine, "rc_47.nl5").expect("reopen");
        assert_eq!(reopened.get_value("R1").unwrap(), 47.0);
    }

    #[test]
    fn stepping_and_trimming_history() {
        let engine = rc();
        let mut s = Schematic::open(&engine, "rc.nl5").expect("open");
        s.add_trace("C1", TraceKind::Voltage).unwrap();
        s.simulate_interval(1.0, 0.25).unwrap();
        assert_eq!(s.trace_data("V(C1)").unwrap().len(), 5);

        s.simulate_step().unwrap();
        assert_relative_eq!(s.simulation_time().unwrap(), 1.25, max_relative = 1e-12);
        assert_eq!(s.trace_data("V(C1)").unwrap().len(), 6);

        s.save_initial_conditions().unwrap();
        s.delete_old_data().unwrap();
        let kept = s.trace_data("V(C1)").unwrap();
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept.samples[0].time, 1.25, max_relative = 1e-12);
    }
}
