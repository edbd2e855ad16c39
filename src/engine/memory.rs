//! In-process stand-in for the NL5 library.
//!
//! [`MemoryEngine`] follows the engine's observable rules closely enough to
//! exercise everything above the FFI layer: named fields, filter blocks whose
//! coefficient fields depend on the selected model, traces, transient and AC
//! runs, and a "last error" register updated by every call.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{CircuitHandle, Engine, EngineError, TraceId, OK};
use crate::data::{AcPoint, Sample};
use crate::filter::{FilterDomain, MAX_COEFFICIENTS, ROOTS_MODEL};
use crate::math::Scalar;
use crate::sweep::AcSweep;
use crate::traces::{AcTrace, TraceKind};

/// Most steps one transient call may record.
pub const MAX_RUN_STEPS: usize = 1_000_000;

/// A transfer-function block inside a [`CircuitTemplate`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBlock {
    domain: FilterDomain,
    model: String,
    b: [Scalar; MAX_COEFFICIENTS],
    a: [Scalar; MAX_COEFFICIENTS],
}

impl FilterBlock {
    /// An F(s) block, initially `Poly1`.
    #[must_use]
    pub fn analog() -> Self {
        Self::new(FilterDomain::Analog)
    }

    /// An F(z) block, initially `Poly1`.
    #[must_use]
    pub fn digital() -> Self {
        Self::new(FilterDomain::Digital)
    }

    fn new(domain: FilterDomain) -> Self {
        Self {
            domain,
            model: "Poly1".to_owned(),
            b: [0.0; MAX_COEFFICIENTS],
            a: [0.0; MAX_COEFFICIENTS],
        }
    }

    /// Starts the block with a different model, e.g. a biquad form.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn set_model(&mut self, block: &str, model: &str) -> Result<(), String> {
        if model == ROOTS_MODEL && self.domain == FilterDomain::Digital {
            return Err(format!("Model {model} is not available for {block}"));
        }
        if let Some(order) = model.strip_prefix("Poly") {
            match order.parse::<usize>() {
                Ok(n) if n < MAX_COEFFICIENTS => {}
                _ => return Err(format!("Invalid model {model} for {block}")),
            }
        }
        self.model = model.to_owned();
        Ok(())
    }

    /// Highest coefficient index the current model exposes.
    fn max_index(&self) -> Option<usize> {
        if self.model == ROOTS_MODEL {
            return None;
        }
        match self.model.strip_prefix("Poly").map(str::parse::<usize>) {
            Some(Ok(order)) => Some(order),
            _ => Some(MAX_COEFFICIENTS - 1),
        }
    }

    fn coefficient(&mut self, block: &str, field: &str) -> Result<&mut Scalar, String> {
        let unknown = || format!("Unknown parameter: {block}.{field}");
        let max = self.max_index();
        let (bank, index) = if let Some(rest) = field.strip_prefix('b') {
            (&mut self.b, rest)
        } else if let Some(rest) = field.strip_prefix('a') {
            (&mut self.a, rest)
        } else {
            return Err(unknown());
        };
        let index: usize = index.parse().map_err(|_| unknown())?;
        match max {
            Some(max) if index <= max => Ok(&mut bank[index]),
            _ => Err(unknown()),
        }
    }
}

/// Contents of a schematic file the [`MemoryEngine`] can open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CircuitTemplate {
    values: BTreeMap<String, Scalar>,
    texts: BTreeMap<String, String>,
    blocks: BTreeMap<String, FilterBlock>,
}

impl CircuitTemplate {
    /// Empty circuit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scalar field, e.g. a component value or `C1.IC`.
    #[must_use]
    pub fn value(mut self, name: impl Into<String>, value: Scalar) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Adds a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.texts.insert(name.into(), text.into());
        self
    }

    /// Adds a transfer-function block.
    #[must_use]
    pub fn block(mut self, name: impl Into<String>, block: FilterBlock) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }
}

/// Value passed to a field write.
#[derive(Debug, Clone, PartialEq)]
pub enum WrittenValue {
    /// `set_value`.
    Number(Scalar),
    /// `set_text`.
    Text(String),
}

/// One attempted field write, in call order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWrite {
    /// Field name as passed by the caller.
    pub name: String,
    /// Value written.
    pub value: WrittenValue,
    /// Whether the engine accepted the write.
    pub accepted: bool,
}

#[derive(Debug, Clone)]
struct MemTrace {
    id: TraceId,
    name: String,
    kind: TraceKind,
    source: String,
    samples: Vec<Sample>,
}

#[derive(Debug, Clone)]
struct MemAcTrace {
    id: TraceId,
    name: String,
    source: Option<String>,
    points: Vec<AcPoint>,
}

#[derive(Debug)]
struct Circuit {
    path: PathBuf,
    fields: CircuitTemplate,
    traces: Vec<MemTrace>,
    ac_traces: Vec<MemAcTrace>,
    next_trace: i32,
    step: Option<Scalar>,
    time: Scalar,
    started: bool,
    ac_sweep: Option<AcSweep>,
    ac_source: Option<String>,
}

impl Circuit {
    fn new(path: PathBuf, fields: CircuitTemplate) -> Self {
        Self {
            path,
            fields,
            traces: Vec::new(),
            ac_traces: Vec::new(),
            next_trace: 0,
            step: None,
            time: 0.0,
            started: false,
            ac_sweep: None,
            ac_source: None,
        }
    }

    fn has_component(&self, name: &str) -> bool {
        self.fields.values.contains_key(name) || self.fields.blocks.contains_key(name)
    }

    fn get_value(&mut self, name: &str) -> Result<Scalar, String> {
        if let Some((block_name, field)) = self.block_field(name) {
            let block = self.fields.blocks.get_mut(block_name).ok_or_else(|| unknown(name))?;
            return block.coefficient(block_name, field).map(|v| *v);
        }
        self.fields.values.get(name).copied().ok_or_else(|| unknown(name))
    }

    fn set_value(&mut self, name: &str, value: Scalar) -> Result<(), String> {
        if let Some((block_name, field)) = self.block_field(name) {
            let block = self.fields.blocks.get_mut(block_name).ok_or_else(|| unknown(name))?;
            *block.coefficient(block_name, field)? = value;
            return Ok(());
        }
        match self.fields.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(unknown(name)),
        }
    }

    fn get_text(&mut self, name: &str) -> Result<String, String> {
        if let Some(block) = name
            .strip_suffix(".model")
            .and_then(|block| self.fields.blocks.get(block))
        {
            return Ok(block.model.clone());
        }
        if let Some(text) = self.fields.texts.get(name) {
            return Ok(text.clone());
        }
        self.get_value(name).map(|v| v.to_string())
    }

    fn set_text(&mut self, name: &str, text: &str) -> Result<(), String> {
        if let Some(block_name) = name.strip_suffix(".model") {
            if let Some(block) = self.fields.blocks.get_mut(block_name) {
                return block.set_model(block_name, text);
            }
        }
        if let Some(slot) = self.fields.texts.get_mut(name) {
            *slot = text.to_owned();
            return Ok(());
        }
        let value: Scalar = text
            .trim()
            .parse()
            .map_err(|_| format!("Invalid value {text:?} for {name}"))?;
        self.set_value(name, value)
    }

    /// Splits `F1.b0` into (`F1`, `b0`) when `F1` is a filter block.
    fn block_field<'n>(&self, name: &'n str) -> Option<(&'n str, &'n str)> {
        let (block, field) = name.rsplit_once('.')?;
        self.fields.blocks.contains_key(block).then_some((block, field))
    }

    fn trace(&mut self, id: TraceId) -> Result<&mut MemTrace, String> {
        self.traces
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| format!("Trace {} not found", id.0))
    }

    fn ac_trace(&self, id: TraceId) -> Result<&MemAcTrace, String> {
        self.ac_traces
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| format!("AC trace {} not found", id.0))
    }

    fn next_id(&mut self) -> TraceId {
        let id = TraceId(self.next_trace);
        self.next_trace += 1;
        id
    }

    fn probe(&self, source: &str) -> Scalar {
        self.fields.values.get(source).copied().unwrap_or(0.0)
    }

    fn record(&mut self) {
        let time = self.time;
        let readings: Vec<Scalar> = self.traces.iter().map(|t| self.probe(&t.source)).collect();
        for (trace, value) in self.traces.iter_mut().zip(readings) {
            if trace.kind != TraceKind::Data {
                trace.samples.push(Sample { time, value });
            }
        }
    }

    fn run(&mut self, interval: Scalar) -> Result<(), String> {
        let step = self.step.ok_or("Step is not defined")?;
        if !(interval > 0.0 && step > 0.0) {
            return Err(format!("Invalid interval {interval} or step {step}"));
        }
        let steps = (interval / step - 1e-9).ceil().max(1.0);
        if steps > MAX_RUN_STEPS as Scalar {
            return Err(format!(
                "Interval {interval} needs more than {MAX_RUN_STEPS} steps of {step}"
            ));
        }
        let steps = steps as usize;
        if !self.started {
            self.record();
            self.started = true;
        }
        let origin = self.time;
        for k in 1..=steps {
            self.time = if k == steps {
                origin + interval
            } else {
                origin + step * k as Scalar
            };
            self.record();
        }
        Ok(())
    }
}

fn unknown(name: &str) -> String {
    format!("Unknown parameter: {name}")
}

#[derive(Debug)]
struct State {
    error: String,
    files: HashMap<PathBuf, CircuitTemplate>,
    circuits: HashMap<i32, Circuit>,
    next_handle: i32,
    writes: Vec<FieldWrite>,
}

/// Deterministic [`Engine`] backed by in-memory circuits.
#[derive(Debug)]
pub struct MemoryEngine {
    state: RefCell<State>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// Engine with no schematic files.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State {
                error: OK.to_owned(),
                files: HashMap::new(),
                circuits: HashMap::new(),
                next_handle: 0,
                writes: Vec::new(),
            }),
        }
    }

    /// Makes `template` openable under `path`.
    #[must_use]
    pub fn with_circuit(self, path: impl Into<PathBuf>, template: CircuitTemplate) -> Self {
        self.state.borrow_mut().files.insert(path.into(), template);
        self
    }

    /// Current contents of the error register.
    #[must_use]
    pub fn last_error(&self) -> String {
        self.state.borrow().error.clone()
    }

    /// Every field write attempted so far, accepted or not.
    #[must_use]
    pub fn writes(&self) -> Vec<FieldWrite> {
        self.state.borrow().writes.clone()
    }

    /// Forgets recorded writes.
    pub fn clear_writes(&self) {
        self.state.borrow_mut().writes.clear();
    }

    /// Number of circuits currently open.
    #[must_use]
    pub fn open_circuits(&self) -> usize {
        self.state.borrow().circuits.len()
    }

    /// Runs `op` against the engine state and mirrors the outcome in the error register.
    fn call<T>(&self, op: impl FnOnce(&mut State) -> Result<T, String>) -> Result<T, EngineError> {
        let mut state = self.state.borrow_mut();
        match op(&mut state) {
            Ok(out) => {
                OK.clone_into(&mut state.error);
                Ok(out)
            }
            Err(message) => {
                state.error.clone_from(&message);
                Err(EngineError::engine(message))
            }
        }
    }

    fn with_circuit_mut<T>(
        &self,
        circuit: CircuitHandle,
        op: impl FnOnce(&mut Circuit) -> Result<T, String>,
    ) -> Result<T, EngineError> {
        self.call(|state| {
            let circuit = state
                .circuits
                .get_mut(&circuit.0)
                .ok_or_else(|| format!("Invalid circuit handle {}", circuit.0))?;
            op(circuit)
        })
    }

    fn write(
        &self,
        circuit: CircuitHandle,
        name: &str,
        value: WrittenValue,
    ) -> Result<(), EngineError> {
        let result = self.with_circuit_mut(circuit, |c| match &value {
            WrittenValue::Number(v) => c.set_value(name, *v),
            WrittenValue::Text(t) => c.set_text(name, t),
        });
        self.state.borrow_mut().writes.push(FieldWrite {
            name: name.to_owned(),
            value,
            accepted: result.is_ok(),
        });
        result
    }

    fn peek<T>(&self, circuit: CircuitHandle, op: impl FnOnce(&Circuit) -> Option<T>) -> Option<T> {
        self.state.borrow().circuits.get(&circuit.0).and_then(op)
    }
}

impl Engine for MemoryEngine {
    fn open(&self, path: &Path) -> Result<CircuitHandle, EngineError> {
        self.call(|state| {
            let template = state
                .files
                .get(path)
                .cloned()
                .ok_or_else(|| format!("Cannot open file {}", path.display()))?;
            let handle = state.next_handle;
            state.next_handle += 1;
            state
                .circuits
                .insert(handle, Circuit::new(path.to_path_buf(), template));
            debug!(handle, path = %path.display(), "memory engine opened circuit");
            Ok(CircuitHandle(handle))
        })
    }

    fn close(&self, circuit: CircuitHandle) -> Result<(), EngineError> {
        self.call(|state| {
            state
                .circuits
                .remove(&circuit.0)
                .map(drop)
                .ok_or_else(|| format!("Invalid circuit handle {}", circuit.0))
        })
    }

    fn save(&self, circuit: CircuitHandle) -> Result<(), EngineError> {
        self.call(|state| {
            let c = state
                .circuits
                .get(&circuit.0)
                .ok_or_else(|| format!("Invalid circuit handle {}", circuit.0))?;
            let (path, fields) = (c.path.clone(), c.fields.clone());
            state.files.insert(path, fields);
            Ok(())
        })
    }

    fn save_as(&self, circuit: CircuitHandle, path: &Path) -> Result<(), EngineError> {
        self.call(|state| {
            let c = state
                .circuits
                .get_mut(&circuit.0)
                .ok_or_else(|| format!("Invalid circuit handle {}", circuit.0))?;
            c.path = path.to_path_buf();
            let fields = c.fields.clone();
            state.files.insert(path.to_path_buf(), fields);
            Ok(())
        })
    }

    fn get_value(&self, circuit: CircuitHandle, name: &str) -> Result<Scalar, EngineError> {
        self.with_circuit_mut(circuit, |c| c.get_value(name))
    }

    fn set_value(&self, circuit: CircuitHandle, name: &str, value: Scalar) -> Result<(), EngineError> {
        self.write(circuit, name, WrittenValue::Number(value))
    }

    fn get_text(&self, circuit: CircuitHandle, name: &str) -> Result<String, EngineError> {
        self.with_circuit_mut(circuit, |c| c.get_text(name))
    }

    fn set_text(&self, circuit: CircuitHandle, name: &str, text: &str) -> Result<(), EngineError> {
        self.write(circuit, name, WrittenValue::Text(text.to_owned()))
    }

    fn traces_len(&self, circuit: CircuitHandle) -> usize {
        self.peek(circuit, |c| Some(c.traces.len())).unwrap_or(0)
    }

    fn trace_at(&self, circuit: CircuitHandle, index: usize) -> Option<TraceId> {
        self.peek(circuit, |c| c.traces.get(index).map(|t| t.id))
    }

    fn trace_name(&self, circuit: CircuitHandle, trace: TraceId) -> Option<String> {
        self.peek(circuit, |c| {
            c.traces.iter().find(|t| t.id == trace).map(|t| t.name.clone())
        })
    }

    fn trace_by_name(&self, circuit: CircuitHandle, name: &str) -> Result<TraceId, EngineError> {
        self.with_circuit_mut(circuit, |c| {
            c.traces
                .iter()
                .find(|t| t.name == name)
                .map(|t| t.id)
                .ok_or_else(|| format!("Trace {name} not found"))
        })
    }

    fn add_trace(&self, circuit: CircuitHandle, kind: TraceKind, name: &str) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |c| {
            let needs_component = matches!(
                kind,
                TraceKind::Voltage | TraceKind::Current | TraceKind::Power
            );
            if needs_component && !c.has_component(name) {
                return Err(format!("Component {name} not found"));
            }
            let id = c.next_id();
            c.traces.push(MemTrace {
                id,
                name: kind.display_name(name),
                kind,
                source: name.to_owned(),
                samples: Vec::new(),
            });
            Ok(())
        })
    }

    fn delete_trace(&self, circuit: CircuitHandle, trace: TraceId) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |c| {
            let before = c.traces.len();
            c.traces.retain(|t| t.id != trace);
            if c.traces.len() == before {
                Err(format!("Trace {} not found", trace.0))
            } else {
                Ok(())
            }
        })
    }

    fn set_step(&self, circuit: CircuitHandle, step: Scalar) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |c| {
            if !(step.is_finite() && step > 0.0) {
                return Err(format!("Invalid step {step}"));
            }
            c.step = Some(step);
            Ok(())
        })
    }

    fn set_timeout(&self, circuit: CircuitHandle, seconds: i32) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |_| {
            if seconds < 0 {
                return Err(format!("Invalid timeout {seconds}"));
            }
            Ok(())
        })
    }

    fn start(&self, circuit: CircuitHandle) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |c| {
            c.time = 0.0;
            c.started = false;
            for trace in &mut c.traces {
                if trace.kind != TraceKind::Data {
                    trace.samples.clear();
                }
            }
            Ok(())
        })
    }

    fn simulate(&self, circuit: CircuitHandle, interval: Scalar) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |c| c.run(interval))
    }

    fn simulate_interval(&self, circuit: CircuitHandle, interval: Scalar) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |c| c.run(interval))
    }

    fn simulate_step(&self, circuit: CircuitHandle) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |c| {
            let step = c.step.ok_or("Step is not defined")?;
            c.run(step)
        })
    }

    fn simulation_time(&self, circuit: CircuitHandle) -> Result<Scalar, EngineError> {
        self.with_circuit_mut(circuit, |c| Ok(c.time))
    }

    fn save_initial_conditions(&self, circuit: CircuitHandle) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |_| Ok(()))
    }

    fn data_len(&self, circuit: CircuitHandle, trace: TraceId) -> Result<usize, EngineError> {
        self.with_circuit_mut(circuit, |c| Ok(c.trace(trace)?.samples.len()))
    }

    fn data_at(&self, circuit: CircuitHandle, trace: TraceId, n: usize) -> Result<Sample, EngineError> {
        self.with_circuit_mut(circuit, |c| {
            c.trace(trace)?
                .samples
                .get(n)
                .copied()
                .ok_or_else(|| format!("Index {n} out of range"))
        })
    }

    fn last_data(&self, circuit: CircuitHandle, trace: TraceId) -> Result<Sample, EngineError> {
        self.with_circuit_mut(circuit, |c| {
            c.trace(trace)?
                .samples
                .last()
                .copied()
                .ok_or_else(|| "No data".to_owned())
        })
    }

    fn data_at_time(&self, circuit: CircuitHandle, trace: TraceId, t: Scalar) -> Result<Scalar, EngineError> {
        self.with_circuit_mut(circuit, |c| {
            c.trace(trace)?
                .samples
                .iter()
                .take_while(|s| s.time <= t)
                .last()
                .map(|s| s.value)
                .ok_or_else(|| format!("No data at t={t}"))
        })
    }

    fn add_data(&self, circuit: CircuitHandle, trace: TraceId, t: Scalar, value: Scalar) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |c| {
            let trace = c.trace(trace)?;
            if trace.kind != TraceKind::Data {
                return Err(format!("{} is not a data trace", trace.name));
            }
            trace.samples.push(Sample { time: t, value });
            Ok(())
        })
    }

    fn delete_data(&self, circuit: CircuitHandle, trace: TraceId) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |c| {
            c.trace(trace)?.samples.clear();
            Ok(())
        })
    }

    fn delete_old_data(&self, circuit: CircuitHandle) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |c| {
            for trace in &mut c.traces {
                let keep = trace.samples.len().saturating_sub(1);
                trace.samples.drain(..keep);
            }
            Ok(())
        })
    }

    fn save_data(&self, circuit: CircuitHandle, path: &Path) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |_| {
            debug!(path = %path.display(), "memory engine ignores data export");
            Ok(())
        })
    }

    fn set_ac(&self, circuit: CircuitHandle, sweep: &AcSweep) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |c| {
            c.ac_sweep = Some(*sweep);
            Ok(())
        })
    }

    fn set_ac_source(&self, circuit: CircuitHandle, name: &str) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |c| {
            if !c.has_component(name) {
                return Err(format!("Component {name} not found"));
            }
            c.ac_source = Some(name.to_owned());
            Ok(())
        })
    }

    fn add_ac_trace(&self, circuit: CircuitHandle, trace: &AcTrace<'_>) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |c| {
            let source = match *trace {
                AcTrace::Voltage(name) | AcTrace::Current(name) => {
                    if !c.has_component(name) {
                        return Err(format!("Component {name} not found"));
                    }
                    Some(name.to_owned())
                }
                AcTrace::Function(expr) => Some(expr.to_owned()),
                AcTrace::Impedance | AcTrace::Gamma | AcTrace::Vswr | AcTrace::LoopGain => None,
            };
            let id = c.next_id();
            c.ac_traces.push(MemAcTrace {
                id,
                name: trace.display_name(),
                source,
                points: Vec::new(),
            });
            Ok(())
        })
    }

    fn calc_ac(&self, circuit: CircuitHandle) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |c| {
            let sweep = c.ac_sweep.ok_or("AC sweep is not defined")?;
            if c.ac_source.is_none() {
                return Err("AC source is not defined".to_owned());
            }
            let frequencies = sweep.frequencies();
            let magnitudes: Vec<Scalar> = c
                .ac_traces
                .iter()
                .map(|t| t.source.as_deref().map_or(1.0, |s| c.probe(s)))
                .collect();
            for (trace, magnitude) in c.ac_traces.iter_mut().zip(magnitudes) {
                trace.points = frequencies
                    .iter()
                    .map(|&frequency| AcPoint {
                        frequency,
                        magnitude,
                        phase: 0.0,
                    })
                    .collect();
            }
            Ok(())
        })
    }

    fn ac_trace_by_name(&self, circuit: CircuitHandle, name: &str) -> Result<TraceId, EngineError> {
        self.with_circuit_mut(circuit, |c| {
            c.ac_traces
                .iter()
                .find(|t| t.name == name)
                .map(|t| t.id)
                .ok_or_else(|| format!("AC trace {name} not found"))
        })
    }

    fn ac_data_len(&self, circuit: CircuitHandle, trace: TraceId) -> Result<usize, EngineError> {
        self.with_circuit_mut(circuit, |c| Ok(c.ac_trace(trace)?.points.len()))
    }

    fn ac_data_at(&self, circuit: CircuitHandle, trace: TraceId, n: usize) -> Result<AcPoint, EngineError> {
        self.with_circuit_mut(circuit, |c| {
            c.ac_trace(trace)?
                .points
                .get(n)
                .copied()
                .ok_or_else(|| format!("Index {n} out of range"))
        })
    }

    fn save_ac_data(&self, circuit: CircuitHandle, path: &Path) -> Result<(), EngineError> {
        self.with_circuit_mut(circuit, |_| {
            debug!(path = %path.display(), "memory engine ignores AC data export");
            Ok(())
        })
    }
}
