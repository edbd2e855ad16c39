use std::ffi::{c_char, c_double, c_int, CStr, CString};
use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::{debug, info};

use super::{CircuitHandle, Engine, EngineError, TraceId, OK};
use crate::config::EngineConfig;
use crate::data::{AcPoint, Sample};
use crate::math::Scalar;
use crate::sweep::AcSweep;
use crate::traces::{AcTrace, TraceKind};

type TextFn = unsafe extern "C" fn() -> *const c_char;
type NameFn = unsafe extern "C" fn(*const c_char) -> c_int;
type CircuitFn = unsafe extern "C" fn(c_int) -> c_int;
type CircuitNameFn = unsafe extern "C" fn(c_int, *const c_char) -> c_int;
type CircuitIntFn = unsafe extern "C" fn(c_int, c_int) -> c_int;
type CircuitDoubleFn = unsafe extern "C" fn(c_int, c_double) -> c_int;
type CircuitDoubleOutFn = unsafe extern "C" fn(c_int, *mut c_double) -> c_int;
type GetValueFn = unsafe extern "C" fn(c_int, *const c_char, *mut c_double) -> c_int;
type SetValueFn = unsafe extern "C" fn(c_int, *const c_char, c_double) -> c_int;
type GetTextFn = unsafe extern "C" fn(c_int, *const c_char, *mut c_char, c_int) -> c_int;
type SetTextFn = unsafe extern "C" fn(c_int, *const c_char, *const c_char) -> c_int;
type TraceNameFn = unsafe extern "C" fn(c_int, c_int, *mut c_char, c_int) -> c_int;
type DataAtFn = unsafe extern "C" fn(c_int, c_int, c_int, *mut c_double, *mut c_double) -> c_int;
type LastDataFn = unsafe extern "C" fn(c_int, c_int, *mut c_double, *mut c_double) -> c_int;
type DataAtTimeFn = unsafe extern "C" fn(c_int, c_int, c_double, *mut c_double) -> c_int;
type AddDataFn = unsafe extern "C" fn(c_int, c_int, c_double, c_double) -> c_int;
type SetAcFn = unsafe extern "C" fn(c_int, c_double, c_double, c_int, c_int) -> c_int;
type AcDataAtFn =
    unsafe extern "C" fn(c_int, c_int, c_int, *mut c_double, *mut c_double, *mut c_double) -> c_int;

/// Entry points resolved from `nl5_dll.h`.
struct Symbols {
    get_error: TextFn,
    get_info: TextFn,
    get_license: NameFn,

    open: NameFn,
    close: CircuitFn,
    save: CircuitFn,
    save_as: CircuitNameFn,

    get_value: GetValueFn,
    set_value: SetValueFn,
    get_text: GetTextFn,
    set_text: SetTextFn,

    get_traces_size: CircuitFn,
    get_trace_at: CircuitIntFn,
    get_trace_name: TraceNameFn,
    get_trace: CircuitNameFn,
    add_v_trace: CircuitNameFn,
    add_i_trace: CircuitNameFn,
    add_p_trace: CircuitNameFn,
    add_var_trace: CircuitNameFn,
    add_func_trace: CircuitNameFn,
    add_data_trace: CircuitNameFn,
    delete_trace: CircuitIntFn,

    set_timeout: CircuitIntFn,
    set_step: CircuitDoubleFn,
    get_simulation_time: CircuitDoubleOutFn,
    start: CircuitFn,
    simulate: CircuitDoubleFn,
    simulate_interval: CircuitDoubleFn,
    simulate_step: CircuitFn,
    save_ic: CircuitFn,

    get_data_size: CircuitIntFn,
    get_data_at: DataAtFn,
    get_last_data: LastDataFn,
    get_data: DataAtTimeFn,
    delete_old_data: CircuitFn,
    save_data: CircuitNameFn,
    add_data: AddDataFn,
    delete_data: CircuitIntFn,

    set_ac: SetAcFn,
    set_ac_source: CircuitNameFn,
    add_v_ac_trace: CircuitNameFn,
    add_i_ac_trace: CircuitNameFn,
    add_func_ac_trace: CircuitNameFn,
    add_z_ac_trace: CircuitFn,
    add_gamma_ac_trace: CircuitFn,
    add_vswr_ac_trace: CircuitFn,
    add_loop_ac_trace: CircuitFn,
    calc_ac: CircuitFn,
    get_ac_trace: CircuitNameFn,
    get_ac_data_size: CircuitIntFn,
    get_ac_data_at: AcDataAtFn,
    save_ac_data: CircuitNameFn,
}

macro_rules! resolve {
    ($library:expr, $ty:ty, $name:literal) => {{
        // SAFETY: the signature matches the declaration in nl5_dll.h.
        let symbol = unsafe { $library.get::<$ty>(concat!($name, "\0").as_bytes())? };
        *symbol
    }};
}

impl Symbols {
    fn resolve(library: &Library) -> Result<Self, EngineError> {
        Ok(Self {
            get_error: resolve!(library, TextFn, "NL5_GetError"),
            get_info: resolve!(library, TextFn, "NL5_GetInfo"),
            get_license: resolve!(library, NameFn, "NL5_GetLicense"),
            open: resolve!(library, NameFn, "NL5_Open"),
            close: resolve!(library, CircuitFn, "NL5_Close"),
            save: resolve!(library, CircuitFn, "NL5_Save"),
            save_as: resolve!(library, CircuitNameFn, "NL5_SaveAs"),
            get_value: resolve!(library, GetValueFn, "NL5_GetValue"),
            set_value: resolve!(library, SetValueFn, "NL5_SetValue"),
            get_text: resolve!(library, GetTextFn, "NL5_GetText"),
            set_text: resolve!(library, SetTextFn, "NL5_SetText"),
            get_traces_size: resolve!(library, CircuitFn, "NL5_GetTracesSize"),
            get_trace_at: resolve!(library, CircuitIntFn, "NL5_GetTraceAt"),
            get_trace_name: resolve!(library, TraceNameFn, "NL5_GetTraceName"),
            get_trace: resolve!(library, CircuitNameFn, "NL5_GetTrace"),
            add_v_trace: resolve!(library, CircuitNameFn, "NL5_AddVTrace"),
            add_i_trace: resolve!(library, CircuitNameFn, "NL5_AddITrace"),
            add_p_trace: resolve!(library, CircuitNameFn, "NL5_AddPTrace"),
            add_var_trace: resolve!(library, CircuitNameFn, "NL5_AddVarTrace"),
            add_func_trace: resolve!(library, CircuitNameFn, "NL5_AddFuncTrace"),
            add_data_trace: resolve!(library, CircuitNameFn, "NL5_AddDataTrace"),
            delete_trace: resolve!(library, CircuitIntFn, "NL5_DeleteTrace"),
            set_timeout: resolve!(library, CircuitIntFn, "NL5_SetTimeout"),
            set_step: resolve!(library, CircuitDoubleFn, "NL5_SetStep"),
            get_simulation_time: resolve!(library, CircuitDoubleOutFn, "NL5_GetSimulationTime"),
            start: resolve!(library, CircuitFn, "NL5_Start"),
            simulate: resolve!(library, CircuitDoubleFn, "NL5_Simulate"),
            simulate_interval: resolve!(library, CircuitDoubleFn, "NL5_SimulateInterval"),
            simulate_step: resolve!(library, CircuitFn, "NL5_SimulateStep"),
            save_ic: resolve!(library, CircuitFn, "NL5_SaveIC"),
            get_data_size: resolve!(library, CircuitIntFn, "NL5_GetDataSize"),
            get_data_at: resolve!(library, DataAtFn, "NL5_GetDataAt"),
            get_last_data: resolve!(library, LastDataFn, "NL5_GetLastData"),
            get_data: resolve!(library, DataAtTimeFn, "NL5_GetData"),
            delete_old_data: resolve!(library, CircuitFn, "NL5_DeleteOldData"),
            save_data: resolve!(library, CircuitNameFn, "NL5_SaveData"),
            add_data: resolve!(library, AddDataFn, "NL5_AddData"),
            delete_data: resolve!(library, CircuitIntFn, "NL5_DeleteData"),
            set_ac: resolve!(library, SetAcFn, "NL5_SetAC"),
            set_ac_source: resolve!(library, CircuitNameFn, "NL5_SetACSource"),
            add_v_ac_trace: resolve!(library, CircuitNameFn, "NL5_AddVACTrace"),
            add_i_ac_trace: resolve!(library, CircuitNameFn, "NL5_AddIACTrace"),
            add_func_ac_trace: resolve!(library, CircuitNameFn, "NL5_AddFuncACTrace"),
            add_z_ac_trace: resolve!(library, CircuitFn, "NL5_AddZACTrace"),
            add_gamma_ac_trace: resolve!(library, CircuitFn, "NL5_AddGammaACTrace"),
            add_vswr_ac_trace: resolve!(library, CircuitFn, "NL5_AddVSWRACTrace"),
            add_loop_ac_trace: resolve!(library, CircuitFn, "NL5_AddLoopACTrace"),
            calc_ac: resolve!(library, CircuitFn, "NL5_CalcAC"),
            get_ac_trace: resolve!(library, CircuitNameFn, "NL5_GetACTrace"),
            get_ac_data_size: resolve!(library, CircuitIntFn, "NL5_GetACDataSize"),
            get_ac_data_at: resolve!(library, AcDataAtFn, "NL5_GetACDataAt"),
            save_ac_data: resolve!(library, CircuitNameFn, "NL5_SaveACData"),
        })
    }
}

/// The NL5 engine loaded from its shared library.
///
/// All symbols are resolved once at load time. Each call is followed by a read
/// of the engine's error register, so a failure surfaces as
/// [`EngineError::Engine`] carrying the engine's own text.
pub struct Nl5Library {
    symbols: Symbols,
    text_capacity: usize,
    path: PathBuf,
    license: Option<String>,
    _library: Library,
}

impl Nl5Library {
    /// Default buffer size for text readback.
    pub const DEFAULT_TEXT_CAPACITY: usize = 100;

    /// Loads the engine library from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        // SAFETY: loading runs the library's initialisers; the NL5 library has
        // no load-time requirements beyond being a valid build for this host.
        let library = unsafe { Library::new(path)? };
        let symbols = Symbols::resolve(&library)?;
        info!(path = %path.display(), "loaded NL5 library");
        Ok(Self {
            symbols,
            text_capacity: Self::DEFAULT_TEXT_CAPACITY,
            path: path.to_path_buf(),
            license: None,
            _library: library,
        })
    }

    /// Loads the library located by `config` and applies its license file.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let mut library = Self::load(config.library_path()?)?.with_text_capacity(config.text_capacity);
        if let Some(license) = &config.license {
            let details = library.load_license(license)?;
            info!(%details, "NL5 license loaded");
            library.license = Some(details);
        }
        Ok(library)
    }

    /// Sets the buffer size used to read text fields and trace names.
    #[must_use]
    pub fn with_text_capacity(mut self, capacity: usize) -> Self {
        self.text_capacity = capacity.max(1);
        self
    }

    /// File the library was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// License details reported when [`Nl5Library::from_config`] applied a license file.
    #[must_use]
    pub fn license(&self) -> Option<&str> {
        self.license.as_deref()
    }

    /// Current contents of the error register.
    #[must_use]
    pub fn last_error(&self) -> String {
        // SAFETY: returns a pointer to a NUL-terminated string owned by the library.
        unsafe { owned_text((self.symbols.get_error)()) }
    }

    /// Version and build information of the engine.
    #[must_use]
    pub fn info(&self) -> String {
        // SAFETY: as for `last_error`.
        unsafe { owned_text((self.symbols.get_info)()) }
    }

    /// Applies a license file and returns the license details.
    ///
    /// A non-zero return code means the register holds an error; otherwise it
    /// holds the license information.
    pub fn load_license(&self, path: &Path) -> Result<String, EngineError> {
        let path = path_string(path)?;
        // SAFETY: `path` is a valid NUL-terminated string for the call's duration.
        let code = unsafe { (self.symbols.get_license)(path.as_ptr()) };
        let register = self.last_error();
        if code != 0 {
            return Err(EngineError::engine(register));
        }
        Ok(register)
    }

    fn check(&self) -> Result<(), EngineError> {
        let register = self.last_error();
        if register == OK {
            Ok(())
        } else {
            Err(EngineError::engine(register))
        }
    }

    /// Runs `call` and converts the error register into a `Result`.
    fn checked<T>(&self, call: impl FnOnce(&Symbols) -> T) -> Result<T, EngineError> {
        let out = call(&self.symbols);
        self.check()?;
        Ok(out)
    }

    fn read_text(&self, read: impl FnOnce(*mut c_char, c_int) -> c_int) -> String {
        let capacity = self.text_capacity.clamp(1, c_int::MAX as usize);
        let mut buffer = vec![0u8; capacity];
        read(buffer.as_mut_ptr().cast(), capacity as c_int);
        match CStr::from_bytes_until_nul(&buffer) {
            Ok(text) => text.to_string_lossy().into_owned(),
            Err(_) => String::from_utf8_lossy(&buffer).into_owned(),
        }
    }
}

impl fmt::Debug for Nl5Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nl5Library")
            .field("path", &self.path)
            .field("text_capacity", &self.text_capacity)
            .finish_non_exhaustive()
    }
}

/// Copies a library-owned C string.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn owned_text(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

fn c_string(text: &str) -> Result<CString, EngineError> {
    CString::new(text).map_err(|_| EngineError::InvalidString(text.to_owned()))
}

fn path_string(path: &Path) -> Result<CString, EngineError> {
    let text = path
        .to_str()
        .ok_or_else(|| EngineError::InvalidString(path.display().to_string()))?;
    c_string(text)
}

fn c_index(n: usize) -> Result<c_int, EngineError> {
    c_int::try_from(n).map_err(|_| EngineError::InvalidArgument(format!("index {n} out of range")))
}

fn count(n: c_int) -> usize {
    usize::try_from(n).unwrap_or(0)
}

// Safety for every `unsafe` block below: arguments are either plain values,
// pointers to locals that outlive the call, or `CString`s kept alive until the
// call returns; signatures match nl5_dll.h.
impl Engine for Nl5Library {
    fn open(&self, path: &Path) -> Result<CircuitHandle, EngineError> {
        let name = path_string(path)?;
        let handle = self.checked(|s| unsafe { (s.open)(name.as_ptr()) })?;
        info!(path = %path.display(), handle, "opened schematic");
        Ok(CircuitHandle(handle))
    }

    fn close(&self, circuit: CircuitHandle) -> Result<(), EngineError> {
        self.checked(|s| unsafe { (s.close)(circuit.0) })?;
        debug!(handle = circuit.0, "closed schematic");
        Ok(())
    }

    fn save(&self, circuit: CircuitHandle) -> Result<(), EngineError> {
        self.checked(|s| unsafe { (s.save)(circuit.0) }).map(drop)
    }

    fn save_as(&self, circuit: CircuitHandle, path: &Path) -> Result<(), EngineError> {
        let name = path_string(path)?;
        self.checked(|s| unsafe { (s.save_as)(circuit.0, name.as_ptr()) })
            .map(drop)
    }

    fn get_value(&self, circuit: CircuitHandle, name: &str) -> Result<Scalar, EngineError> {
        let name = c_string(name)?;
        let mut value: c_double = 0.0;
        self.checked(|s| unsafe { (s.get_value)(circuit.0, name.as_ptr(), &mut value) })?;
        Ok(value)
    }

    fn set_value(&self, circuit: CircuitHandle, name: &str, value: Scalar) -> Result<(), EngineError> {
        let name = c_string(name)?;
        self.checked(|s| unsafe { (s.set_value)(circuit.0, name.as_ptr(), value) })
            .map(drop)
    }

    fn get_text(&self, circuit: CircuitHandle, name: &str) -> Result<String, EngineError> {
        let name = c_string(name)?;
        let text = self.read_text(|buffer, len| unsafe {
            (self.symbols.get_text)(circuit.0, name.as_ptr(), buffer, len)
        });
        self.check()?;
        Ok(text)
    }

    fn set_text(&self, circuit: CircuitHandle, name: &str, text: &str) -> Result<(), EngineError> {
        let name = c_string(name)?;
        let text = c_string(text)?;
        self.checked(|s| unsafe { (s.set_text)(circuit.0, name.as_ptr(), text.as_ptr()) })
            .map(drop)
    }

    fn traces_len(&self, circuit: CircuitHandle) -> usize {
        count(unsafe { (self.symbols.get_traces_size)(circuit.0) })
    }

    fn trace_at(&self, circuit: CircuitHandle, index: usize) -> Option<TraceId> {
        let index = c_int::try_from(index).ok()?;
        let trace = unsafe { (self.symbols.get_trace_at)(circuit.0, index) };
        (trace >= 0).then_some(TraceId(trace))
    }

    fn trace_name(&self, circuit: CircuitHandle, trace: TraceId) -> Option<String> {
        let mut code = 0;
        let name = self.read_text(|buffer, len| {
            code = unsafe { (self.symbols.get_trace_name)(circuit.0, trace.0, buffer, len) };
            code
        });
        (code >= 0).then_some(name)
    }

    fn trace_by_name(&self, circuit: CircuitHandle, name: &str) -> Result<TraceId, EngineError> {
        let name = c_string(name)?;
        self.checked(|s| unsafe { (s.get_trace)(circuit.0, name.as_ptr()) })
            .map(TraceId)
    }

    fn add_trace(&self, circuit: CircuitHandle, kind: TraceKind, name: &str) -> Result<(), EngineError> {
        let text = c_string(name)?;
        let add = match kind {
            TraceKind::Voltage => self.symbols.add_v_trace,
            TraceKind::Current => self.symbols.add_i_trace,
            TraceKind::Power => self.symbols.add_p_trace,
            TraceKind::Variable => self.symbols.add_var_trace,
            TraceKind::Function => self.symbols.add_func_trace,
            TraceKind::Data => self.symbols.add_data_trace,
        };
        self.checked(|_| unsafe { add(circuit.0, text.as_ptr()) })?;
        debug!(%kind, name, "added trace");
        Ok(())
    }

    fn delete_trace(&self, circuit: CircuitHandle, trace: TraceId) -> Result<(), EngineError> {
        self.checked(|s| unsafe { (s.delete_trace)(circuit.0, trace.0) })
            .map(drop)
    }

    fn set_step(&self, circuit: CircuitHandle, step: Scalar) -> Result<(), EngineError> {
        self.checked(|s| unsafe { (s.set_step)(circuit.0, step) }).map(drop)
    }

    fn set_timeout(&self, circuit: CircuitHandle, seconds: i32) -> Result<(), EngineError> {
        self.checked(|s| unsafe { (s.set_timeout)(circuit.0, seconds) })
            .map(drop)
    }

    fn start(&self, circuit: CircuitHandle) -> Result<(), EngineError> {
        self.checked(|s| unsafe { (s.start)(circuit.0) }).map(drop)
    }

    fn simulate(&self, circuit: CircuitHandle, interval: Scalar) -> Result<(), EngineError> {
        self.checked(|s| unsafe { (s.simulate)(circuit.0, interval) })
            .map(drop)
    }

    fn simulate_interval(&self, circuit: CircuitHandle, interval: Scalar) -> Result<(), EngineError> {
        self.checked(|s| unsafe { (s.simulate_interval)(circuit.0, interval) })
            .map(drop)
    }

    fn simulate_step(&self, circuit: CircuitHandle) -> Result<(), EngineError> {
        self.checked(|s| unsafe { (s.simulate_step)(circuit.0) })
            .map(drop)
    }

    fn simulation_time(&self, circuit: CircuitHandle) -> Result<Scalar, EngineError> {
        let mut t: c_double = 0.0;
        self.checked(|s| unsafe { (s.get_simulation_time)(circuit.0, &mut t) })?;
        Ok(t)
    }

    fn save_initial_conditions(&self, circuit: CircuitHandle) -> Result<(), EngineError> {
        self.checked(|s| unsafe { (s.save_ic)(circuit.0) }).map(drop)
    }

    fn data_len(&self, circuit: CircuitHandle, trace: TraceId) -> Result<usize, EngineError> {
        self.checked(|s| unsafe { (s.get_data_size)(circuit.0, trace.0) })
            .map(count)
    }

    fn data_at(&self, circuit: CircuitHandle, trace: TraceId, n: usize) -> Result<Sample, EngineError> {
        let n = c_index(n)?;
        let (mut time, mut value): (c_double, c_double) = (0.0, 0.0);
        self.checked(|s| unsafe { (s.get_data_at)(circuit.0, trace.0, n, &mut time, &mut value) })?;
        Ok(Sample { time, value })
    }

    fn last_data(&self, circuit: CircuitHandle, trace: TraceId) -> Result<Sample, EngineError> {
        let (mut time, mut value): (c_double, c_double) = (0.0, 0.0);
        self.checked(|s| unsafe { (s.get_last_data)(circuit.0, trace.0, &mut time, &mut value) })?;
        Ok(Sample { time, value })
    }

    fn data_at_time(&self, circuit: CircuitHandle, trace: TraceId, t: Scalar) -> Result<Scalar, EngineError> {
        let mut value: c_double = 0.0;
        self.checked(|s| unsafe { (s.get_data)(circuit.0, trace.0, t, &mut value) })?;
        Ok(value)
    }

    fn add_data(&self, circuit: CircuitHandle, trace: TraceId, t: Scalar, value: Scalar) -> Result<(), EngineError> {
        self.checked(|s| unsafe { (s.add_data)(circuit.0, trace.0, t, value) })
            .map(drop)
    }

    fn delete_data(&self, circuit: CircuitHandle, trace: TraceId) -> Result<(), EngineError> {
        self.checked(|s| unsafe { (s.delete_data)(circuit.0, trace.0) })
            .map(drop)
    }

    fn delete_old_data(&self, circuit: CircuitHandle) -> Result<(), EngineError> {
        self.checked(|s| unsafe { (s.delete_old_data)(circuit.0) })
            .map(drop)
    }

    fn save_data(&self, circuit: CircuitHandle, path: &Path) -> Result<(), EngineError> {
        let name = path_string(path)?;
        self.checked(|s| unsafe { (s.save_data)(circuit.0, name.as_ptr()) })
            .map(drop)
    }

    fn set_ac(&self, circuit: CircuitHandle, sweep: &AcSweep) -> Result<(), EngineError> {
        let points = c_index(sweep.points)?;
        let scale = sweep.scale.engine_flag();
        self.checked(|s| unsafe { (s.set_ac)(circuit.0, sweep.start, sweep.stop, points, scale) })
            .map(drop)
    }

    fn set_ac_source(&self, circuit: CircuitHandle, name: &str) -> Result<(), EngineError> {
        let name = c_string(name)?;
        self.checked(|s| unsafe { (s.set_ac_source)(circuit.0, name.as_ptr()) })
            .map(drop)
    }

    fn add_ac_trace(&self, circuit: CircuitHandle, trace: &AcTrace<'_>) -> Result<(), EngineError> {
        let s = &self.symbols;
        let named = |add: CircuitNameFn, text: &str| -> Result<(), EngineError> {
            let text = c_string(text)?;
            self.checked(|_| unsafe { add(circuit.0, text.as_ptr()) })
                .map(drop)
        };
        let bare = |add: CircuitFn| self.checked(|_| unsafe { add(circuit.0) }).map(drop);
        match *trace {
            AcTrace::Voltage(name) => named(s.add_v_ac_trace, name),
            AcTrace::Current(name) => named(s.add_i_ac_trace, name),
            AcTrace::Function(expr) => named(s.add_func_ac_trace, expr),
            AcTrace::Impedance => bare(s.add_z_ac_trace),
            AcTrace::Gamma => bare(s.add_gamma_ac_trace),
            AcTrace::Vswr => bare(s.add_vswr_ac_trace),
            AcTrace::LoopGain => bare(s.add_loop_ac_trace),
        }
    }

    fn calc_ac(&self, circuit: CircuitHandle) -> Result<(), EngineError> {
        self.checked(|s| unsafe { (s.calc_ac)(circuit.0) }).map(drop)
    }

    fn ac_trace_by_name(&self, circuit: CircuitHandle, name: &str) -> Result<TraceId, EngineError> {
        let name = c_string(name)?;
        self.checked(|s| unsafe { (s.get_ac_trace)(circuit.0, name.as_ptr()) })
            .map(TraceId)
    }

    fn ac_data_len(&self, circuit: CircuitHandle, trace: TraceId) -> Result<usize, EngineError> {
        self.checked(|s| unsafe { (s.get_ac_data_size)(circuit.0, trace.0) })
            .map(count)
    }

    fn ac_data_at(&self, circuit: CircuitHandle, trace: TraceId, n: usize) -> Result<AcPoint, EngineError> {
        let n = c_index(n)?;
        let (mut frequency, mut magnitude, mut phase): (c_double, c_double, c_double) =
            (0.0, 0.0, 0.0);
        self.checked(|s| unsafe {
            (s.get_ac_data_at)(circuit.0, trace.0, n, &mut frequency, &mut magnitude, &mut phase)
        })?;
        Ok(AcPoint {
            frequency,
            magnitude,
            phase,
        })
    }

    fn save_ac_data(&self, circuit: CircuitHandle, path: &Path) -> Result<(), EngineError> {
        let name = path_string(path)?;
        self.checked(|s| unsafe { (s.save_ac_data)(circuit.0, name.as_ptr()) })
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_with_interior_nul_are_rejected_locally() {
        let err = c_string("R1\0R2").unwrap_err();
        assert!(matches!(err, EngineError::InvalidString(name) if name == "R1\0R2"));
    }

    #[test]
    fn negative_counts_read_as_empty() {
        assert_eq!(count(-1), 0);
        assert_eq!(count(7), 7);
    }

    #[test]
    fn missing_library_is_a_load_error() {
        let err = Nl5Library::load("/nonexistent/nl5_dll.dll").unwrap_err();
        assert!(matches!(err, EngineError::Library(_)));
    }
}
