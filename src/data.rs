//! Simulation readback: samples, per-trace series and aligned tables.

use std::io::{self, Write};

use crate::math::{phasor_deg, to_db, CScalar, Scalar};

/// One transient sample.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Simulation time in seconds.
    pub time: Scalar,
    /// Trace value.
    pub value: Scalar,
}

/// One AC sweep point.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcPoint {
    /// Frequency in Hz.
    pub frequency: Scalar,
    /// Magnitude as reported by the engine.
    pub magnitude: Scalar,
    /// Phase in degrees.
    pub phase: Scalar,
}

impl AcPoint {
    /// Complex value of this point.
    #[must_use]
    pub fn phasor(&self) -> CScalar {
        phasor_deg(self.magnitude, self.phase)
    }

    /// Magnitude in dB.
    #[must_use]
    pub fn magnitude_db(&self) -> Scalar {
        to_db(self.magnitude)
    }

    /// Magnitude and phase without the frequency.
    #[must_use]
    pub const fn value(&self) -> AcValue {
        AcValue {
            magnitude: self.magnitude,
            phase: self.phase,
        }
    }
}

/// Magnitude/phase pair stored in an [`AcTable`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcValue {
    /// Magnitude as reported by the engine.
    pub magnitude: Scalar,
    /// Phase in degrees.
    pub phase: Scalar,
}

/// Samples of one transient trace.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TraceData {
    /// Trace display name.
    pub name: String,
    /// Samples in engine order.
    pub samples: Vec<Sample>,
}

impl TraceData {
    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if no samples were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recent sample.
    #[must_use]
    pub fn last(&self) -> Option<Sample> {
        self.samples.last().copied()
    }
}

/// Points of one AC trace.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AcTraceData {
    /// Trace display name.
    pub name: String,
    /// Points in sweep order.
    pub points: Vec<AcPoint>,
}

impl AcTraceData {
    /// Complex values of all points.
    #[must_use]
    pub fn phasors(&self) -> Vec<CScalar> {
        self.points.iter().map(AcPoint::phasor).collect()
    }
}

/// Values that can be written as CSV cells.
pub trait CsvCells: Copy {
    /// Header suffixes, one per cell; empty string means "use the column name".
    const SUFFIXES: &'static [&'static str];
    /// Writes the cells (each preceded by a comma).
    fn write_cells<W: Write>(value: Option<Self>, w: &mut W) -> io::Result<()>;
}

impl CsvCells for Scalar {
    const SUFFIXES: &'static [&'static str] = &[""];

    fn write_cells<W: Write>(value: Option<Self>, w: &mut W) -> io::Result<()> {
        match value {
            Some(v) => write!(w, ",{v:.16e}"),
            None => write!(w, ","),
        }
    }
}

impl CsvCells for AcValue {
    const SUFFIXES: &'static [&'static str] = &["magnitude", "phase"];

    fn write_cells<W: Write>(value: Option<Self>, w: &mut W) -> io::Result<()> {
        match value {
            Some(v) => write!(w, ",{:.16e},{:.16e}", v.magnitude, v.phase),
            None => write!(w, ",,"),
        }
    }
}

/// One named column of a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub struct Column<T> {
    /// Trace display name.
    pub name: String,
    /// One entry per index row; `None` where the trace has no sample.
    pub values: Vec<Option<T>>,
}

/// Several traces aligned on the sorted union of their independent variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<T> {
    index_label: &'static str,
    index: Vec<Scalar>,
    columns: Vec<Column<T>>,
}

/// Transient traces keyed on time.
pub type TraceTable = Table<Scalar>;
/// AC traces keyed on frequency.
pub type AcTable = Table<AcValue>;

impl<T: Copy> Table<T> {
    fn from_series<I>(index_label: &'static str, series: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<(Scalar, T)>)>,
    {
        let series: Vec<_> = series.into_iter().collect();
        let mut index: Vec<Scalar> = series
            .iter()
            .flat_map(|(_, points)| points.iter().map(|(x, _)| *x))
            .collect();
        index.sort_by(f64::total_cmp);
        index.dedup_by(|x, y| x.total_cmp(y).is_eq());

        let columns = series
            .into_iter()
            .map(|(name, points)| {
                let mut values = vec![None; index.len()];
                for (x, v) in points {
                    // duplicate abscissae within one trace: last sample wins
                    if let Ok(row) = index.binary_search_by(|probe| probe.total_cmp(&x)) {
                        values[row] = Some(v);
                    }
                }
                Column { name, values }
            })
            .collect();

        Self {
            index_label,
            index,
            columns,
        }
    }

    /// Independent variable, ascending.
    #[must_use]
    pub fn index(&self) -> &[Scalar] {
        &self.index
    }

    /// All columns in insertion order.
    #[must_use]
    pub fn columns(&self) -> &[Column<T>] {
        &self.columns
    }

    /// Column by trace name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[Option<T>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Last value of a column, if any row holds one.
    #[must_use]
    pub fn last(&self, name: &str) -> Option<T> {
        self.column(name)?.iter().rev().find_map(|v| *v)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when no trace contributed any row.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Replaces gaps with the previous value of the same column. Leading gaps stay empty.
    pub fn forward_fill(&mut self) {
        for column in &mut self.columns {
            let mut last = None;
            for value in &mut column.values {
                match value {
                    Some(v) => last = Some(*v),
                    None => *value = last,
                }
            }
        }
    }

    /// Builder-style [`Self::forward_fill`].
    #[must_use]
    pub fn filled(mut self) -> Self {
        self.forward_fill();
        self
    }
}

impl<T: CsvCells> Table<T> {
    /// Writes the table as CSV with one header row.
    pub fn write_csv<W: Write>(&self, mut w: W) -> io::Result<()> {
        write!(w, "{}", self.index_label)?;
        for column in &self.columns {
            for suffix in T::SUFFIXES {
                let header = if suffix.is_empty() {
                    column.name.clone()
                } else {
                    format!("{}.{suffix}", column.name)
                };
                write!(w, ",{}", csv_field(&header))?;
            }
        }
        writeln!(w)?;

        for (row, x) in self.index.iter().enumerate() {
            write!(w, "{x:.16e}")?;
            for column in &self.columns {
                T::write_cells(column.values[row], &mut w)?;
            }
            writeln!(w)?;
        }
        Ok(())
    }
}

impl TraceTable {
    /// Aligns transient traces on time.
    #[must_use]
    pub fn from_traces(traces: impl IntoIterator<Item = TraceData>) -> Self {
        Self::from_series(
            "time",
            traces.into_iter().map(|t| {
                let points = t.samples.iter().map(|s| (s.time, s.value)).collect();
                (t.name, points)
            }),
        )
    }
}

impl AcTable {
    /// Aligns AC traces on frequency.
    #[must_use]
    pub fn from_ac_traces(traces: impl IntoIterator<Item = AcTraceData>) -> Self {
        Self::from_series(
            "frequency",
            traces.into_iter().map(|t| {
                let points = t.points.iter().map(|p| (p.frequency, p.value())).collect();
                (t.name, points)
            }),
        )
    }
}

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn trace(name: &str, samples: &[(Scalar, Scalar)]) -> TraceData {
        TraceData {
            name: name.to_owned(),
            samples: samples
                .iter()
                .map(|&(time, value)| Sample { time, value })
                .collect(),
        }
    }

    #[test]
    fn aligns_traces_on_union_of_times() {
        let table = TraceTable::from_traces([
            trace("A", &[(0.0, 1.0), (2.0, 3.0)]),
            trace("B", &[(1.0, 10.0), (2.0, 20.0)]),
        ]);
        assert_eq!(table.index(), &[0.0, 1.0, 2.0]);
        assert_eq!(table.column("A"), Some(&[Some(1.0), None, Some(3.0)][..]));
        assert_eq!(table.column("B"), Some(&[None, Some(10.0), Some(20.0)][..]));
    }

    #[test]
    fn forward_fill_keeps_leading_gaps() {
        let table = TraceTable::from_traces([
            trace("A", &[(0.0, 1.0), (2.0, 3.0)]),
            trace("B", &[(1.0, 10.0)]),
        ])
        .filled();
        assert_eq!(table.column("A"), Some(&[Some(1.0), Some(1.0), Some(3.0)][..]));
        assert_eq!(table.column("B"), Some(&[None, Some(10.0), Some(10.0)][..]));
        assert_eq!(table.last("B"), Some(10.0));
    }

    #[test]
    fn csv_quotes_expression_headers() {
        let table = TraceTable::from_traces([trace("max(V(a),V(b))", &[(0.0, 0.5)])]);
        let mut out = Vec::new();
        table.write_csv(&mut out).expect("write to vec");
        let text = String::from_utf8(out).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("time,\"max(V(a),V(b))\""));
        assert_eq!(lines.next(), Some("0.0000000000000000e0,5.0000000000000000e-1"));
    }

    #[test]
    fn ac_table_writes_magnitude_and_phase() {
        let data = AcTraceData {
            name: "V(out)".to_owned(),
            points: vec![AcPoint {
                frequency: 1.0e3,
                magnitude: 0.5,
                phase: -45.0,
            }],
        };
        let phasor = data.phasors()[0];
        assert_relative_eq!(phasor.norm(), 0.5, epsilon = 1e-12);

        let table = AcTable::from_ac_traces([data]);
        let mut out = Vec::new();
        table.write_csv(&mut out).expect("write to vec");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("frequency,V(out).magnitude,V(out).phase\n"));
    }

    #[test]
    fn signed_zero_times_stay_distinct() {
        let table = TraceTable::from_traces([
            trace("a", &[(-0.0, 1.0)]),
            trace("b", &[(0.0, 2.0)]),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.column("a").unwrap(), [Some(1.0), None]);
        assert_eq!(table.column("b").unwrap(), [None, Some(2.0)]);
    }
}
