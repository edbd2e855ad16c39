//! Transfer-function coefficient loading for F(s) and F(z) blocks.
//!
//! A filter block named `F1` exposes a text field `F1.model` and scalar fields
//! `F1.b0..F1.bN`, `F1.a0..F1.aN`. Coefficients usually come from a filter
//! design routine that lists them highest power first for analog filters and
//! in ascending powers of `z^-1` for digital ones, while the engine indexes
//! `b{i}`/`a{i}` by ascending power of `s` for analog blocks. Analog vectors
//! are therefore written reversed and digital ones as given.
//!
//! Writes are not transactional: if the engine rejects a write partway
//! through, earlier fields keep their new values.

use std::fmt;
use std::str::FromStr;

use nalgebra::DMatrix;
use tracing::debug;

use crate::engine::{EngineError, NamedFields};
use crate::math::Scalar;

/// Largest accepted coefficient vector length (model `Poly5`).
pub const MAX_COEFFICIENTS: usize = 6;

/// Model name the engine only accepts on analog blocks.
pub const ROOTS_MODEL: &str = "Roots";

/// Coefficient convention of a filter block.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterDomain {
    /// Continuous time, F(s). Coefficients are given highest power first.
    Analog,
    /// Discrete time, F(z). Coefficients are given in engine order.
    Digital,
}

impl FilterDomain {
    /// Maps the conventional `analog: bool` flag.
    #[must_use]
    pub const fn from_analog(analog: bool) -> Self {
        if analog {
            Self::Analog
        } else {
            Self::Digital
        }
    }

    /// True for [`FilterDomain::Analog`].
    #[must_use]
    pub const fn is_analog(self) -> bool {
        matches!(self, Self::Analog)
    }
}

impl fmt::Display for FilterDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Analog => "analog",
            Self::Digital => "digital",
        })
    }
}

impl FromStr for FilterDomain {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "analog" | "s" => Ok(Self::Analog),
            "digital" | "z" => Ok(Self::Digital),
            _ => Err(FilterError::UnknownDomain(s.to_owned())),
        }
    }
}

/// Errors raised while loading filter coefficients.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// A coefficient is NaN or infinite.
    #[error("{vector}[{index}] is not a finite number ({value})")]
    NonFinite {
        /// Which input held the value (`b`, `a` or `sos`).
        vector: &'static str,
        /// Position in that input.
        index: usize,
        /// Offending value.
        value: Scalar,
    },
    /// Numerator and denominator differ in length.
    #[error("'a' and 'b' must have the same length (b has {b}, a has {a})")]
    LengthMismatch {
        /// Numerator length.
        b: usize,
        /// Denominator length.
        a: usize,
    },
    /// Coefficient count outside `1..=MAX_COEFFICIENTS`.
    #[error("length of 'a' and 'b' must be between 1 and {max}, got {len}", max = MAX_COEFFICIENTS)]
    OrderOutOfRange {
        /// Offending length.
        len: usize,
    },
    /// A second-order section was not six values in one row.
    #[error("second-order section must be 6 values or a 1x6 array, got {rows}x{cols}")]
    SosShape {
        /// Number of rows supplied.
        rows: usize,
        /// Number of columns supplied (of the first row for ragged input).
        cols: usize,
    },
    /// Unrecognised domain name.
    #[error("unknown filter domain {0:?} (expected analog or digital)")]
    UnknownDomain(String),
    /// An analog block refused the `Roots` model.
    #[error("{block} is loaded as analog but rejected model Roots: {message}")]
    AnalogProbeRejected {
        /// Block name.
        block: String,
        /// Engine error text.
        message: String,
    },
    /// A digital block accepted the `Roots` model.
    #[error("{block} is loaded as digital but accepted model Roots")]
    DigitalProbeAccepted {
        /// Block name.
        block: String,
    },
    /// The engine rejected a field write.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Knobs for [`load_filter_params_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Verify the block's domain by writing the `Roots` model first.
    pub probe_domain: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { probe_domain: true }
    }
}

/// Validated numerator/denominator pair of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficients {
    b: Vec<Scalar>,
    a: Vec<Scalar>,
}

impl Coefficients {
    /// Validates `b` and `a`: finite values, equal length, `1..=6` entries.
    pub fn new(b: &[Scalar], a: &[Scalar]) -> Result<Self, FilterError> {
        check_finite("b", b)?;
        check_finite("a", a)?;
        if a.len() != b.len() {
            return Err(FilterError::LengthMismatch {
                b: b.len(),
                a: a.len(),
            });
        }
        if !(1..=MAX_COEFFICIENTS).contains(&a.len()) {
            return Err(FilterError::OrderOutOfRange { len: a.len() });
        }
        Ok(Self {
            b: b.to_vec(),
            a: a.to_vec(),
        })
    }

    /// Like [`Coefficients::new`], but zero-pads the shorter vector first.
    ///
    /// Digital vectors gain trailing zeros (higher powers of `z^-1`); analog
    /// vectors gain leading zeros, since they are listed highest power first.
    pub fn zero_padded(
        b: &[Scalar],
        a: &[Scalar],
        domain: FilterDomain,
    ) -> Result<Self, FilterError> {
        let len = a.len().max(b.len());
        let pad = |v: &[Scalar]| -> Vec<Scalar> {
            let zeros = std::iter::repeat(0.0).take(len - v.len());
            match domain {
                FilterDomain::Analog => zeros.chain(v.iter().copied()).collect(),
                FilterDomain::Digital => v.iter().copied().chain(zeros).collect(),
            }
        };
        Self::new(&pad(b), &pad(a))
    }

    /// Number of coefficients per vector.
    #[must_use]
    pub fn len(&self) -> usize {
        self.a.len()
    }

    /// Always false; construction rejects empty vectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// Polynomial order, `len - 1`.
    #[must_use]
    pub fn order(&self) -> usize {
        self.len() - 1
    }

    /// Model name selecting this order, e.g. `Poly2`.
    #[must_use]
    pub fn model(&self) -> String {
        format!("Poly{}", self.order())
    }

    /// Numerator as given.
    #[must_use]
    pub fn b(&self) -> &[Scalar] {
        &self.b
    }

    /// Denominator as given.
    #[must_use]
    pub fn a(&self) -> &[Scalar] {
        &self.a
    }

    /// `(field suffix, value)` pairs in write order: all `b{i}`, then all `a{i}`.
    #[must_use]
    pub fn field_values(&self, domain: FilterDomain) -> Vec<(String, Scalar)> {
        let bank = |prefix: char, values: &[Scalar]| -> Vec<(String, Scalar)> {
            let n = values.len();
            (0..n)
                .map(|i| {
                    let value = match domain {
                        FilterDomain::Analog => values[n - 1 - i],
                        FilterDomain::Digital => values[i],
                    };
                    (format!("{prefix}{i}"), value)
                })
                .collect()
        };
        let mut fields = bank('b', &self.b);
        fields.extend(bank('a', &self.a));
        fields
    }
}

fn check_finite(vector: &'static str, values: &[Scalar]) -> Result<(), FilterError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(FilterError::NonFinite {
            vector,
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}

/// Loads polynomial coefficients into filter block `block`.
///
/// Validates the vectors, probes the block's domain with the `Roots` model,
/// writes `{block}.model = Poly{n-1}`, then the `b{i}` and `a{i}` fields.
pub fn load_filter_params<F>(
    fields: &mut F,
    block: &str,
    b: &[Scalar],
    a: &[Scalar],
    domain: FilterDomain,
) -> Result<(), FilterError>
where
    F: NamedFields + ?Sized,
{
    load_filter_params_with(fields, block, b, a, domain, LoadOptions::default())
}

/// [`load_filter_params`] with explicit [`LoadOptions`].
pub fn load_filter_params_with<F>(
    fields: &mut F,
    block: &str,
    b: &[Scalar],
    a: &[Scalar],
    domain: FilterDomain,
    options: LoadOptions,
) -> Result<(), FilterError>
where
    F: NamedFields + ?Sized,
{
    let coefficients = Coefficients::new(b, a)?;
    write_coefficients(fields, block, &coefficients, domain, options)
}

/// Writes already validated coefficients.
pub fn write_coefficients<F>(
    fields: &mut F,
    block: &str,
    coefficients: &Coefficients,
    domain: FilterDomain,
    options: LoadOptions,
) -> Result<(), FilterError>
where
    F: NamedFields + ?Sized,
{
    if options.probe_domain {
        probe_domain(fields, block, domain)?;
    }

    let model = coefficients.model();
    fields.set_text(&format!("{block}.model"), &model)?;
    debug!(block, %model, %domain, "filter model set");

    for (suffix, value) in coefficients.field_values(domain) {
        let name = format!("{block}.{suffix}");
        debug!(field = %name, value, "setting filter coefficient");
        fields.set_value(&name, value)?;
    }
    Ok(())
}

/// Checks that `block` is wired for `domain`: analog blocks must accept the
/// `Roots` model, digital blocks must refuse it.
pub fn probe_domain<F>(fields: &mut F, block: &str, domain: FilterDomain) -> Result<(), FilterError>
where
    F: NamedFields + ?Sized,
{
    let outcome = fields.set_text(&format!("{block}.model"), ROOTS_MODEL);
    match (domain, outcome) {
        (FilterDomain::Analog, Ok(())) | (FilterDomain::Digital, Err(_)) => Ok(()),
        (FilterDomain::Analog, Err(err)) => Err(FilterError::AnalogProbeRejected {
            block: block.to_owned(),
            message: err.to_string(),
        }),
        (FilterDomain::Digital, Ok(())) => Err(FilterError::DigitalProbeAccepted {
            block: block.to_owned(),
        }),
    }
}

/// One biquad stage `[b0, b1, b2, a0, a1, a2]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondOrderSection([Scalar; 6]);

/// Field suffixes of a second-order section, in element order.
pub const SOS_FIELDS: [&str; 6] = ["b0", "b1", "b2", "a0", "a1", "a2"];

impl SecondOrderSection {
    /// Validates that all six values are finite.
    pub fn new(values: [Scalar; 6]) -> Result<Self, FilterError> {
        check_finite("sos", &values)?;
        Ok(Self(values))
    }

    /// Numerator `[b0, b1, b2]`.
    #[must_use]
    pub fn b(&self) -> [Scalar; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// Denominator `[a0, a1, a2]`.
    #[must_use]
    pub fn a(&self) -> [Scalar; 3] {
        [self.0[3], self.0[4], self.0[5]]
    }

    /// All six values in field order.
    #[must_use]
    pub const fn values(&self) -> [Scalar; 6] {
        self.0
    }

    fn from_rows<R: AsRef<[Scalar]>>(rows: &[R]) -> Result<Self, FilterError> {
        match rows {
            [row] => Self::from_flat(row.as_ref()),
            _ => Err(FilterError::SosShape {
                rows: rows.len(),
                cols: rows.first().map_or(0, |r| r.as_ref().len()),
            }),
        }
    }

    fn from_flat(values: &[Scalar]) -> Result<Self, FilterError> {
        let values: [Scalar; 6] = values.try_into().map_err(|_| FilterError::SosShape {
            rows: 1,
            cols: values.len(),
        })?;
        Self::new(values)
    }
}

/// Inputs accepted as a second-order section: six values flat, or one row of six.
pub trait IntoSection {
    /// Validates and converts.
    fn into_section(self) -> Result<SecondOrderSection, FilterError>;
}

impl IntoSection for SecondOrderSection {
    fn into_section(self) -> Result<SecondOrderSection, FilterError> {
        Ok(self)
    }
}

impl IntoSection for [Scalar; 6] {
    fn into_section(self) -> Result<SecondOrderSection, FilterError> {
        SecondOrderSection::new(self)
    }
}

impl IntoSection for &[Scalar] {
    fn into_section(self) -> Result<SecondOrderSection, FilterError> {
        SecondOrderSection::from_flat(self)
    }
}

impl IntoSection for &Vec<Scalar> {
    fn into_section(self) -> Result<SecondOrderSection, FilterError> {
        SecondOrderSection::from_flat(self)
    }
}

impl IntoSection for &[[Scalar; 6]] {
    fn into_section(self) -> Result<SecondOrderSection, FilterError> {
        SecondOrderSection::from_rows(self)
    }
}

impl IntoSection for &[Vec<Scalar>] {
    fn into_section(self) -> Result<SecondOrderSection, FilterError> {
        SecondOrderSection::from_rows(self)
    }
}

impl IntoSection for &Vec<Vec<Scalar>> {
    fn into_section(self) -> Result<SecondOrderSection, FilterError> {
        SecondOrderSection::from_rows(self.as_slice())
    }
}

impl IntoSection for &DMatrix<Scalar> {
    fn into_section(self) -> Result<SecondOrderSection, FilterError> {
        if self.shape() != (1, 6) {
            return Err(FilterError::SosShape {
                rows: self.nrows(),
                cols: self.ncols(),
            });
        }
        let row: Vec<Scalar> = self.row(0).iter().copied().collect();
        SecondOrderSection::from_flat(&row)
    }
}

/// Loads one second-order section into `block` as `b0 b1 b2 a0 a1 a2`.
///
/// The block's model is left untouched; it must already be a biquad-capable
/// form.
pub fn set_filter_params_sos<F, S>(fields: &mut F, block: &str, sos: S) -> Result<(), FilterError>
where
    F: NamedFields + ?Sized,
    S: IntoSection,
{
    let section = sos.into_section()?;
    for (suffix, value) in SOS_FIELDS.iter().zip(section.values()) {
        let name = format!("{block}.{suffix}");
        debug!(field = %name, value, "setting biquad coefficient");
        fields.set_value(&name, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    /// Records writes; rejects `Roots` unless `accepts_roots`.
    #[derive(Default)]
    struct Recorder {
        accepts_roots: bool,
        texts: BTreeMap<String, String>,
        values: BTreeMap<String, Scalar>,
        log: Vec<String>,
    }

    impl NamedFields for Recorder {
        fn set_value(&mut self, name: &str, value: Scalar) -> Result<(), EngineError> {
            self.log.push(name.to_owned());
            self.values.insert(name.to_owned(), value);
            Ok(())
        }

        fn get_value(&self, name: &str) -> Result<Scalar, EngineError> {
            self.values
                .get(name)
                .copied()
                .ok_or_else(|| EngineError::engine(format!("Unknown parameter: {name}")))
        }

        fn set_text(&mut self, name: &str, text: &str) -> Result<(), EngineError> {
            self.log.push(name.to_owned());
            if text == ROOTS_MODEL && !self.accepts_roots {
                return Err(EngineError::engine("Invalid model"));
            }
            self.texts.insert(name.to_owned(), text.to_owned());
            Ok(())
        }

        fn get_text(&self, name: &str) -> Result<String, EngineError> {
            self.texts
                .get(name)
                .cloned()
                .ok_or_else(|| EngineError::engine(format!("Unknown parameter: {name}")))
        }
    }

    fn analog_block() -> Recorder {
        Recorder {
            accepts_roots: true,
            ..Recorder::default()
        }
    }

    #[test]
    fn analog_coefficients_are_reversed() {
        let mut f = analog_block();
        load_filter_params(&mut f, "F1", &[1.0, 0.0, 0.0], &[1.0, 1.0e3, 1.0e6], FilterDomain::Analog)
            .expect("load");
        assert_eq!(f.get_text("F1.model").unwrap(), "Poly2");
        assert_eq!(f.get_value("F1.b0").unwrap(), 0.0);
        assert_eq!(f.get_value("F1.b2").unwrap(), 1.0);
        assert_eq!(f.get_value("F1.a0").unwrap(), 1.0e6);
        assert_eq!(f.get_value("F1.a1").unwrap(), 1.0e3);
        assert_eq!(f.get_value("F1.a2").unwrap(), 1.0);
    }

    #[test]
    fn digital_coefficients_keep_order() {
        let mut f = Recorder::default();
        let b = [0.1, 0.2, 0.3, 0.4];
        let a = [1.0, -0.5, 0.25, -0.125];
        load_filter_params(&mut f, "F2", &b, &a, FilterDomain::Digital).expect("load");
        assert_eq!(f.get_text("F2.model").unwrap(), "Poly3");
        for i in 0..4 {
            assert_eq!(f.get_value(&format!("F2.b{i}")).unwrap(), b[i]);
            assert_eq!(f.get_value(&format!("F2.a{i}")).unwrap(), a[i]);
        }
    }

    #[test]
    fn write_order_is_probe_model_then_b_then_a() {
        let mut f = analog_block();
        load_filter_params(&mut f, "F", &[1.0, 2.0], &[3.0, 4.0], FilterDomain::Analog).expect("load");
        assert_eq!(f.log, ["F.model", "F.model", "F.b0", "F.b1", "F.a0", "F.a1"]);
    }

    #[test]
    fn validation_happens_before_any_write() {
        let mut f = analog_block();
        let mismatch = load_filter_params(&mut f, "F", &[1.0], &[1.0, 2.0], FilterDomain::Analog);
        assert!(matches!(mismatch, Err(FilterError::LengthMismatch { b: 1, a: 2 })));

        let empty = load_filter_params(&mut f, "F", &[], &[], FilterDomain::Analog);
        assert!(matches!(empty, Err(FilterError::OrderOutOfRange { len: 0 })));

        let long = [1.0; 7];
        let too_long = load_filter_params(&mut f, "F", &long, &long, FilterDomain::Digital);
        assert!(matches!(too_long, Err(FilterError::OrderOutOfRange { len: 7 })));

        let nan = load_filter_params(&mut f, "F", &[1.0, f64::NAN], &[1.0, 2.0], FilterDomain::Digital);
        assert!(matches!(nan, Err(FilterError::NonFinite { vector: "b", index: 1, .. })));

        assert!(f.log.is_empty());
    }

    #[test]
    fn six_coefficients_are_accepted() {
        let mut f = Recorder::default();
        let v = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        load_filter_params(&mut f, "F", &v, &v, FilterDomain::Digital).expect("six is the limit");
        assert_eq!(f.get_text("F.model").unwrap(), "Poly5");
    }

    #[test]
    fn probe_flags_domain_mismatch() {
        let mut digital = Recorder::default();
        let err = load_filter_params(&mut digital, "F", &[1.0], &[1.0], FilterDomain::Analog).unwrap_err();
        assert!(matches!(err, FilterError::AnalogProbeRejected { ref block, .. } if block == "F"));

        let mut analog = analog_block();
        let err = load_filter_params(&mut analog, "F", &[1.0], &[1.0], FilterDomain::Digital).unwrap_err();
        assert!(matches!(err, FilterError::DigitalProbeAccepted { .. }));
        assert_eq!(analog.log, ["F.model"]);
    }

    #[test]
    fn probe_can_be_skipped() {
        let mut analog = analog_block();
        let options = LoadOptions { probe_domain: false };
        load_filter_params_with(&mut analog, "F", &[1.0], &[2.0], FilterDomain::Digital, options)
            .expect("no probe");
        assert_eq!(analog.log, ["F.model", "F.b0", "F.a0"]);
    }

    #[test]
    fn zero_padding_follows_domain() {
        let digital = Coefficients::zero_padded(&[1.0, 0.0], &[1.0, 2.0, 3.0], FilterDomain::Digital)
            .expect("pad");
        assert_eq!(digital.b(), &[1.0, 0.0, 0.0]);

        let analog = Coefficients::zero_padded(&[1.0], &[1.0, 2.0, 3.0], FilterDomain::Analog)
            .expect("pad");
        assert_eq!(analog.b(), &[0.0, 0.0, 1.0]);
        assert_eq!(analog.field_values(FilterDomain::Analog)[0], ("b0".to_owned(), 1.0));
    }

    #[test]
    fn sos_shapes_are_equivalent() {
        let values = [0.2, 0.4, 0.2, 1.0, -0.3, 0.1];
        let mut flat = Recorder::default();
        set_filter_params_sos(&mut flat, "F", values).expect("flat");

        let mut nested = Recorder::default();
        set_filter_params_sos(&mut nested, "F", &[values][..]).expect("1x6");

        let mut matrix = Recorder::default();
        let m = DMatrix::from_row_slice(1, 6, &values);
        set_filter_params_sos(&mut matrix, "F", &m).expect("matrix");

        assert_eq!(flat.values, nested.values);
        assert_eq!(flat.values, matrix.values);
        assert_eq!(flat.get_value("F.a1").unwrap(), -0.3);
        assert!(flat.texts.is_empty());
    }

    #[test]
    fn bad_sos_performs_no_writes() {
        let mut f = Recorder::default();
        let short: &[Scalar] = &[1.0, 2.0, 3.0];
        assert!(matches!(
            set_filter_params_sos(&mut f, "F", short),
            Err(FilterError::SosShape { rows: 1, cols: 3 })
        ));

        let two_rows = vec![vec![0.0; 6], vec![0.0; 6]];
        assert!(matches!(
            set_filter_params_sos(&mut f, "F", &two_rows),
            Err(FilterError::SosShape { rows: 2, cols: 6 })
        ));

        let m = DMatrix::<Scalar>::zeros(6, 1);
        assert!(matches!(
            set_filter_params_sos(&mut f, "F", &m),
            Err(FilterError::SosShape { rows: 6, cols: 1 })
        ));

        let nan = [1.0, f64::INFINITY, 0.0, 1.0, 0.0, 0.0];
        assert!(matches!(
            set_filter_params_sos(&mut f, "F", nan),
            Err(FilterError::NonFinite { vector: "sos", index: 1, .. })
        ));
        assert!(f.log.is_empty());
    }

    #[test]
    fn domain_parses_from_names() {
        assert_eq!("analog".parse::<FilterDomain>().unwrap(), FilterDomain::Analog);
        assert_eq!("Z".parse::<FilterDomain>().unwrap(), FilterDomain::Digital);
        assert!("bilinear".parse::<FilterDomain>().is_err());
        assert_eq!(FilterDomain::from_analog(true), FilterDomain::Analog);
    }
}
