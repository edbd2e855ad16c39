//! Trace kinds for transient and AC analysis.

use std::fmt;
use std::str::FromStr;

/// Kind of a transient trace.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TraceKind {
    /// Voltage across a component, displayed as `V(name)`.
    Voltage,
    /// Current through a component, displayed as `I(name)`.
    Current,
    /// Power dissipated in a component, displayed as `P(name)`.
    Power,
    /// Schematic variable.
    Variable,
    /// Expression over other traces, e.g. `V(C1)*I(C1)`.
    #[default]
    Function,
    /// Externally supplied samples, filled with `add_data`.
    Data,
}

impl TraceKind {
    /// Short tag used by the NL5 scripting interface (`V`, `I`, `P`, `Var`, `Func`, `Data`).
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Voltage => "V",
            Self::Current => "I",
            Self::Power => "P",
            Self::Variable => "Var",
            Self::Function => "Func",
            Self::Data => "Data",
        }
    }

    /// Name the engine gives a trace of this kind added for `name`.
    #[must_use]
    pub fn display_name(self, name: &str) -> String {
        match self {
            Self::Voltage | Self::Current | Self::Power => format!("{}({name})", self.tag()),
            Self::Variable | Self::Function | Self::Data => name.to_owned(),
        }
    }
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned when parsing an unknown trace tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trace type {0:?} (expected V, I, P, Var, Func or Data)")]
pub struct ParseTraceKindError(String);

impl FromStr for TraceKind {
    type Err = ParseTraceKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "V" => Ok(Self::Voltage),
            "I" => Ok(Self::Current),
            "P" => Ok(Self::Power),
            "Var" => Ok(Self::Variable),
            "Func" => Ok(Self::Function),
            "Data" => Ok(Self::Data),
            other => Err(ParseTraceKindError(other.to_owned())),
        }
    }
}

/// AC-domain trace definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcTrace<'a> {
    /// Voltage across a component.
    Voltage(&'a str),
    /// Current through a component.
    Current(&'a str),
    /// Expression over other AC traces.
    Function(&'a str),
    /// Input impedance seen by the AC source.
    Impedance,
    /// Reflection coefficient at the AC source.
    Gamma,
    /// Voltage standing-wave ratio at the AC source.
    Vswr,
    /// Loop gain.
    LoopGain,
}

impl AcTrace<'_> {
    /// Name the engine gives this trace.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Voltage(name) => format!("V({name})"),
            Self::Current(name) => format!("I({name})"),
            Self::Function(expr) => (*expr).to_owned(),
            Self::Impedance => "Z".to_owned(),
            Self::Gamma => "Gamma".to_owned(),
            Self::Vswr => "VSWR".to_owned(),
            Self::LoopGain => "Loop".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scripting_tags() {
        assert_eq!("V".parse::<TraceKind>(), Ok(TraceKind::Voltage));
        assert_eq!("Var".parse::<TraceKind>(), Ok(TraceKind::Variable));
        assert_eq!("Data".parse::<TraceKind>(), Ok(TraceKind::Data));
        assert!("v".parse::<TraceKind>().is_err());
    }

    #[test]
    fn tags_round_trip_through_display() {
        for kind in [
            TraceKind::Voltage,
            TraceKind::Current,
            TraceKind::Power,
            TraceKind::Variable,
            TraceKind::Function,
            TraceKind::Data,
        ] {
            assert_eq!(kind.to_string().parse::<TraceKind>(), Ok(kind));
        }
    }

    #[test]
    fn component_traces_wrap_the_name() {
        assert_eq!(TraceKind::Voltage.display_name("C1"), "V(C1)");
        assert_eq!(TraceKind::Power.display_name("R1"), "P(R1)");
        assert_eq!(TraceKind::Function.display_name("V(C1)*I(C1)"), "V(C1)*I(C1)");
        assert_eq!(AcTrace::Current("L1").display_name(), "I(L1)");
        assert_eq!(AcTrace::Vswr.display_name(), "VSWR");
    }
}
