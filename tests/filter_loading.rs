use std::fs;

use approx::assert_relative_eq;
use nalgebra::DMatrix;
use nl5::engine::{CircuitTemplate, FilterBlock, MemoryEngine, WrittenValue};
use nl5::filter::{Coefficients, FilterDomain, FilterError, LoadOptions};
use nl5::schematic::Schematic;
use nl5::traces::TraceKind;

fn filters() -> MemoryEngine {
    MemoryEngine::new().with_circuit(
        "filters.nl5",
        CircuitTemplate::new()
            .value("V1", 1.0)
            .value("C1", 1.0e-6)
            .block("Fs", FilterBlock::analog())
            .block("Fz", FilterBlock::digital())
            .block("Fq", FilterBlock::digital().with_model("Biquad")),
    )
}

fn coefficients(s: &Schematic<'_, MemoryEngine>, block: &str, n: usize) -> (Vec<f64>, Vec<f64>) {
    let bank = |prefix: char| {
        (0..n)
            .map(|i| s.get_value(&format!("{block}.{prefix}{i}")).unwrap())
            .collect::<Vec<_>>()
    };
    (bank('b'), bank('a'))
}

#[test]
fn analog_block_stores_ascending_powers() {
    let engine = filters();
    let mut s = Schematic::open(&engine, "filters.nl5").unwrap();
    let b = [0.0, 0.0, 1.0];
    let a = [1.0, std::f64::consts::SQRT_2, 1.0];
    s.load_filter_params("Fs", &b, &a, FilterDomain::Analog).unwrap();

    assert_eq!(s.get_text("Fs.model").unwrap(), "Poly2");
    let (sb, sa) = coefficients(&s, "Fs", 3);
    assert_eq!(sb, [1.0, 0.0, 0.0]);
    assert_eq!(sa[0], 1.0);
    assert_relative_eq!(sa[1], std::f64::consts::SQRT_2);
    assert_eq!(sa[2], 1.0);
    // Poly2 exposes nothing above index 2.
    assert!(s.get_value("Fs.b3").is_err());
}

#[test]
fn digital_block_keeps_given_order() {
    let engine = filters();
    let mut s = Schematic::open(&engine, "filters.nl5").unwrap();
    let b = [0.2, 0.4, 0.2];
    let a = [1.0, -0.5, 0.1];
    s.load_filter_params("Fz", &b, &a, FilterDomain::Digital).unwrap();

    assert_eq!(s.get_text("Fz.model").unwrap(), "Poly2");
    let (sb, sa) = coefficients(&s, "Fz", 3);
    assert_eq!(sb, b);
    assert_eq!(sa, a);
}

#[test]
fn every_supported_length_loads() {
    let engine = filters();
    let mut s = Schematic::open(&engine, "filters.nl5").unwrap();
    for n in 1..=6 {
        let b: Vec<f64> = (1..=n).map(|i| i as f64).collect();
        let a: Vec<f64> = (1..=n).map(|i| 10.0 * i as f64).collect();
        s.load_filter_params("Fs", &b, &a, FilterDomain::Analog).unwrap();
        s.load_filter_params("Fz", &b, &a, FilterDomain::Digital).unwrap();

        assert_eq!(s.get_text("Fs.model").unwrap(), format!("Poly{}", n - 1));
        let (sb, sa) = coefficients(&s, "Fs", n);
        let reversed_b: Vec<f64> = b.iter().rev().copied().collect();
        let reversed_a: Vec<f64> = a.iter().rev().copied().collect();
        assert_eq!(sb, reversed_b);
        assert_eq!(sa, reversed_a);
        let (zb, za) = coefficients(&s, "Fz", n);
        assert_eq!(zb, b);
        assert_eq!(za, a);
    }
}

#[test]
fn write_sequence_is_probe_model_numerator_denominator() {
    let engine = filters();
    let mut s = Schematic::open(&engine, "filters.nl5").unwrap();
    s.load_filter_params("Fz", &[1.0, 2.0], &[3.0, 4.0], FilterDomain::Digital)
        .unwrap();

    let writes = engine.writes();
    let names: Vec<&str> = writes.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(
        names,
        ["Fz.model", "Fz.model", "Fz.b0", "Fz.b1", "Fz.a0", "Fz.a1"]
    );
    assert_eq!(writes[0].value, WrittenValue::Text("Roots".into()));
    assert!(!writes[0].accepted);
    assert!(writes[1..].iter().all(|w| w.accepted));
}

#[test]
fn invalid_input_never_reaches_the_engine() {
    let engine = filters();
    let mut s = Schematic::open(&engine, "filters.nl5").unwrap();

    let err = s
        .load_filter_params("Fs", &[1.0, 2.0], &[1.0], FilterDomain::Analog)
        .unwrap_err();
    assert!(matches!(err, FilterError::LengthMismatch { b: 2, a: 1 }));

    let err = s
        .load_filter_params("Fs", &[], &[], FilterDomain::Analog)
        .unwrap_err();
    assert!(matches!(err, FilterError::OrderOutOfRange { len: 0 }));

    let seven = [1.0; 7];
    let err = s
        .load_filter_params("Fs", &seven, &seven, FilterDomain::Analog)
        .unwrap_err();
    assert!(matches!(err, FilterError::OrderOutOfRange { len: 7 }));

    let err = s
        .load_filter_params("Fs", &[1.0, f64::NAN], &[1.0, 2.0], FilterDomain::Analog)
        .unwrap_err();
    assert!(matches!(err, FilterError::NonFinite { vector: "b", index: 1, .. }));

    assert!(engine.writes().is_empty());
}

#[test]
fn wrong_domain_is_caught_by_the_probe() {
    let engine = filters();
    let mut s = Schematic::open(&engine, "filters.nl5").unwrap();

    let err = s
        .load_filter_params("Fz", &[1.0], &[1.0], FilterDomain::Analog)
        .unwrap_err();
    assert!(matches!(err, FilterError::AnalogProbeRejected { ref block, .. } if block == "Fz"));

    let err = s
        .load_filter_params("Fs", &[1.0], &[1.0], FilterDomain::Digital)
        .unwrap_err();
    assert!(matches!(err, FilterError::DigitalProbeAccepted { ref block } if block == "Fs"));

    // Only the two probes were attempted.
    assert_eq!(engine.writes().len(), 2);
}

#[test]
fn probe_can_be_skipped() {
    let engine = filters();
    let mut s = Schematic::open(&engine, "filters.nl5").unwrap();
    let options = LoadOptions {
        probe_domain: false,
    };
    s.load_filter_params_with("Fz", &[1.0, 0.5], &[1.0, -0.5], FilterDomain::Digital, options)
        .unwrap();
    assert!(engine.writes().iter().all(|w| w.accepted));
    assert_eq!(engine.writes()[0].value, WrittenValue::Text("Poly1".into()));
}

#[test]
fn unknown_block_surfaces_engine_text() {
    let engine = filters();
    let mut s = Schematic::open(&engine, "filters.nl5").unwrap();
    let options = LoadOptions {
        probe_domain: false,
    };
    let err = s
        .load_filter_params_with("F9", &[1.0], &[1.0], FilterDomain::Digital, options)
        .unwrap_err();
    match err {
        FilterError::Engine(err) => {
            assert!(err.engine_message().is_some_and(|m| m.contains("F9.model")));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn padded_coefficients_load_through_schematic() {
    let engine = filters();
    let mut s = Schematic::open(&engine, "filters.nl5").unwrap();
    // H(s) = 1 / (s + 1)
    let c = Coefficients::zero_padded(&[1.0], &[1.0, 1.0], FilterDomain::Analog).unwrap();
    nl5::filter::write_coefficients(&mut s, "Fs", &c, FilterDomain::Analog, LoadOptions::default())
        .unwrap();
    let (sb, sa) = coefficients(&s, "Fs", 2);
    assert_eq!(sb, [1.0, 0.0]);
    assert_eq!(sa, [1.0, 1.0]);
}

#[test]
fn biquad_accepts_every_section_shape() {
    let engine = filters();
    let mut s = Schematic::open(&engine, "filters.nl5").unwrap();
    let values = [0.1, 0.2, 0.1, 1.0, -0.9, 0.3];

    s.set_filter_params_sos("Fq", values).unwrap();
    let first = coefficients(&s, "Fq", 3);

    s.set_filter_params_sos("Fq", &vec![values.to_vec()]).unwrap();
    assert_eq!(coefficients(&s, "Fq", 3), first);

    let matrix = DMatrix::from_row_slice(1, 6, &values);
    s.set_filter_params_sos("Fq", &matrix).unwrap();
    assert_eq!(coefficients(&s, "Fq", 3), first);

    assert_eq!(first.0, [0.1, 0.2, 0.1]);
    assert_eq!(first.1, [1.0, -0.9, 0.3]);

    let two_rows = DMatrix::from_row_slice(2, 3, &values);
    let err = s.set_filter_params_sos("Fq", &two_rows).unwrap_err();
    assert!(matches!(err, FilterError::SosShape { rows: 2, cols: 3 }));
}

#[test]
fn transient_table_exports_to_csv() {
    let engine = filters();
    let mut s = Schematic::open(&engine, "filters.nl5").unwrap();
    s.add_trace("C1", TraceKind::Voltage).unwrap();
    s.add_trace("V1", TraceKind::Voltage).unwrap();
    s.simulate_interval(1.0, 0.25).unwrap();

    let table = s.data(None, true).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rc.csv");
    table.write_csv(fs::File::create(&path).unwrap()).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("time,V(C1),V(V1)"));
    assert_eq!(lines.count(), table.len());
    assert_eq!(table.len(), s.trace_data("V(C1)").unwrap().len());
}
