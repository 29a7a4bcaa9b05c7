use serde::{Serialize, Serializer};
use std::fmt;

/// Applicability-domain rank for predictions that extrapolate far outside the training domain.
pub const OUT_OF_DOMAIN: u8 = 6;
/// Rank flagging an indeterminate domain assessment.
pub const INDETERMINATE: u8 = 5;

/// Uncertainty Level (UL) of one estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UncertaintyLevel {
    Predicted(u8),
    Experimental,
    User,
    /// An aggregate over inputs of mixed provenance, rendered as e.g. `E0`, `EU3` or `EU`.
    Composite {
        experimental: bool,
        user: bool,
        rank: Option<u8>,
    },
}

impl UncertaintyLevel {
    /// Builds the simplest level describing the given provenance.
    pub fn from_parts(experimental: bool, user: bool, rank: Option<u8>) -> Self {
        match (experimental, user, rank) {
            (false, false, Some(rank)) => UncertaintyLevel::Predicted(rank),
            (true, false, None) => UncertaintyLevel::Experimental,
            (false, true, None) => UncertaintyLevel::User,
            (false, false, None) => UncertaintyLevel::Predicted(OUT_OF_DOMAIN),
            _ => UncertaintyLevel::Composite {
                experimental,
                user,
                rank,
            },
        }
    }

    pub fn rank(&self) -> Option<u8> {
        match self {
            UncertaintyLevel::Predicted(rank) => Some(*rank),
            UncertaintyLevel::Composite { rank, .. } => *rank,
            _ => None,
        }
    }

    pub fn is_experimental(&self) -> bool {
        matches!(self, UncertaintyLevel::Experimental)
    }

    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(rank) = text.parse::<u8>() {
            return Some(UncertaintyLevel::Predicted(rank));
        }
        let experimental = text.starts_with('E');
        let rest = text.strip_prefix('E').unwrap_or(text);
        let user = rest.starts_with('U');
        let rest = rest.strip_prefix('U').unwrap_or(rest);
        if !experimental && !user {
            return None;
        }
        let rank = match rest {
            "" => None,
            digits => Some(digits.parse::<u8>().ok()?),
        };
        Some(Self::from_parts(experimental, user, rank))
    }
}

impl fmt::Display for UncertaintyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UncertaintyLevel::Predicted(rank) => write!(f, "{}", rank),
            UncertaintyLevel::Experimental => f.write_str("E"),
            UncertaintyLevel::User => f.write_str("U"),
            UncertaintyLevel::Composite {
                experimental,
                user,
                rank,
            } => {
                if *experimental {
                    f.write_str("E")?;
                }
                if *user {
                    f.write_str("U")?;
                }
                if let Some(rank) = rank {
                    write!(f, "{}", rank)?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for UncertaintyLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Point estimate, uncertainty level and propagated error.
///
/// `uncertainty` is `None` for models that carry no applicability domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    pub value: f64,
    pub uncertainty: Option<UncertaintyLevel>,
    pub error: f64,
}

impl Estimate {
    pub fn new(value: f64, uncertainty: UncertaintyLevel, error: f64) -> Self {
        Self {
            value,
            uncertainty: Some(uncertainty),
            error,
        }
    }

    pub fn without_domain(value: f64, error: f64) -> Self {
        Self {
            value,
            uncertainty: None,
            error,
        }
    }

    /// Stand-in for a dependency that could not be evaluated.
    pub fn not_applicable() -> Self {
        Self::new(
            f64::NAN,
            UncertaintyLevel::Predicted(OUT_OF_DOMAIN),
            f64::NAN,
        )
    }

    pub fn rounded(self, digits: u32) -> Self {
        Self {
            value: round_to(self.value, digits),
            error: round_to(self.error, digits),
            ..self
        }
    }
}

pub fn round_to(value: f64, digits: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

/// Renders a number the way reports print it: blank for NaN, otherwise the shortest
/// round-trip digits with `3.0` for integral values and exponent notation (`1e-05`,
/// `1.2e+16`) outside `1e-4 <= |x| < 1e16`.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        return String::new();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .and_then(|(m, e)| e.parse::<i32>().ok().map(|e| (m, e)))
        .unwrap_or((scientific.as_str(), 0));
    if value != 0.0 && !(-4..16).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
    }

    let fixed = format!("{}", value);
    if fixed.contains('.') {
        fixed
    } else {
        format!("{}.0", fixed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Estimates {
    Scalar(Estimate),
    PerOccupant(Vec<Estimate>),
}

impl Estimates {
    pub fn scalar(&self) -> Option<&Estimate> {
        match self {
            Estimates::Scalar(estimate) => Some(estimate),
            Estimates::PerOccupant(list) if list.len() == 1 => list.first(),
            Estimates::PerOccupant(_) => None,
        }
    }

    /// Expands into one estimate per column, mirroring a scalar across all of them.
    pub fn expand(&self, columns: usize) -> Vec<Estimate> {
        match self {
            Estimates::Scalar(estimate) => vec![*estimate; columns],
            Estimates::PerOccupant(list) => list.clone(),
        }
    }

    fn map(self, f: impl Fn(Estimate) -> Estimate) -> Self {
        match self {
            Estimates::Scalar(estimate) => Estimates::Scalar(f(estimate)),
            Estimates::PerOccupant(list) => Estimates::PerOccupant(list.into_iter().map(f).collect()),
        }
    }

    pub fn rounded(self, digits: u32) -> Self {
        self.map(|estimate| estimate.rounded(digits))
    }
}

impl From<Estimate> for Estimates {
    fn from(estimate: Estimate) -> Self {
        Estimates::Scalar(estimate)
    }
}

/// The seven reported fields of one model applied to one record slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub estimates: Estimates,
    pub note: String,
    pub citation: String,
    pub units: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    Evaluated(EvaluationResult),
    NotApplicable { reason: String },
    NoStructure,
}

impl Outcome {
    pub fn result(&self) -> Option<&EvaluationResult> {
        match self {
            Outcome::Evaluated(result) => Some(result),
            _ => None,
        }
    }

    /// Scalar estimate and note for use as a dependency input.
    pub fn as_dependency(&self) -> (Estimate, &str) {
        match self.result() {
            Some(result) => (
                result
                    .estimates
                    .scalar()
                    .copied()
                    .unwrap_or_else(Estimate::not_applicable),
                result.note.as_str(),
            ),
            None => (Estimate::not_applicable(), ""),
        }
    }
}
