//! Uncertainty Level aggregation and the cap-and-flag policy shared by the meta models.

use super::result::{INDETERMINATE, OUT_OF_DOMAIN, UncertaintyLevel, format_value, round_to};

const IN_DOMAIN: &str = "aggregate solute descriptor UL is in the AD";
const OUT_OF_AD: &str = "aggregate solute descriptor UL is out of the AD";
const ALL_MEASURED: &str = "experimental or user values, aggregate solute descriptor UL is in the AD";

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub level: UncertaintyLevel,
    /// Numeric aggregate rank, absent when every descriptor is experimental or user supplied.
    pub rank: Option<u8>,
    pub note: String,
}

enum Kind {
    Experimental,
    User,
    Ranked(u8),
}

fn classify(level: Option<UncertaintyLevel>) -> Kind {
    match level {
        Some(UncertaintyLevel::Experimental) => Kind::Experimental,
        Some(UncertaintyLevel::User) => Kind::User,
        Some(UncertaintyLevel::Predicted(rank)) => Kind::Ranked(rank),
        Some(UncertaintyLevel::Composite {
            rank: Some(rank), ..
        }) => Kind::Ranked(rank),
        Some(UncertaintyLevel::Composite { experimental, .. }) => {
            if experimental {
                Kind::Experimental
            } else {
                Kind::User
            }
        }
        None => Kind::Ranked(0),
    }
}

fn contribution(descriptor: &str, rank: u8) -> f64 {
    match rank {
        0..=3 => (rank as f64).powi(2),
        4 if descriptor == "L" => 4.0,
        4 => 1.0,
        INDETERMINATE => 0.0,
        _ => 9.0,
    }
}

/// Aggregates the levels of a descriptor set into one level and its domain note.
///
/// Ranks 0 to 3 contribute their square, rank 4 contributes 1 (4 for `L`), rank 6 contributes
/// 9 and the aggregate rank is the ceiling of the root mean contribution over the predicted
/// descriptors. Any rank 5 descriptor forces the aggregate to 5.
pub fn aggregate(descriptors: &[(&str, Option<UncertaintyLevel>)]) -> Aggregate {
    let total = descriptors.len();
    let mut ecount = 0;
    let mut ucount = 0;
    let mut sum = 0.0;
    let mut indeterminate = false;

    for (name, level) in descriptors {
        match classify(*level) {
            Kind::Experimental => ecount += 1,
            Kind::User => ucount += 1,
            Kind::Ranked(rank) => {
                indeterminate |= rank == INDETERMINATE;
                sum += contribution(name, rank);
            }
        }
    }

    let measured = ecount + ucount;
    let mut rank = (measured < total)
        .then(|| (sum / (total - measured) as f64).sqrt().ceil() as u8)
        .map(|rank| rank.min(OUT_OF_DOMAIN));
    if indeterminate {
        rank = Some(INDETERMINATE);
    }

    let domain = |rank: u8| if rank <= 1 { IN_DOMAIN } else { OUT_OF_AD };
    let note = match (measured, rank) {
        (0, Some(rank)) => domain(rank).to_string(),
        (_, Some(rank)) => {
            let mut parts = Vec::new();
            if ecount > 0 {
                parts.push("experimental");
            }
            if ucount > 0 {
                parts.push("user");
            }
            parts.push("predicted values");
            parts.push(domain(rank));
            parts.join(", ")
        }
        (_, None) => ALL_MEASURED.to_string(),
    };

    Aggregate {
        level: UncertaintyLevel::from_parts(ecount > 0, ucount > 0, rank),
        rank,
        note,
    }
}

/// Base error multiplier: 1.0 when the aggregate is purely experimental, 1.25 otherwise.
pub fn base_error_scale(level: UncertaintyLevel) -> f64 {
    if level.is_experimental() { 1.0 } else { 1.25 }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Capped {
    pub value: f64,
    pub level: UncertaintyLevel,
    pub note: Option<String>,
}

/// Clips `value` at `ceiling`, forcing the level to the out-of-domain rank on clipping.
///
/// `quantity` names the predicted property and `limit` describes the ceiling, as in
/// "Predicted vapor pressure (5.43) capped at atmospheric pressure".
pub fn cap_and_flag(
    value: f64,
    ceiling: f64,
    level: UncertaintyLevel,
    quantity: &str,
    limit: &str,
    digits: u32,
) -> Capped {
    if value > ceiling {
        let note = format!(
            "Predicted {} ({}) capped at {}, UL set to {}; original aggregate UL: {}",
            quantity,
            format_value(round_to(value, digits)),
            limit,
            OUT_OF_DOMAIN,
            level
        );
        Capped {
            value: ceiling,
            level: UncertaintyLevel::Predicted(OUT_OF_DOMAIN),
            note: Some(note),
        }
    } else {
        Capped {
            value,
            level,
            note: None,
        }
    }
}

/// Joins non-empty note fragments with `separator`.
pub fn join_notes<'a>(notes: impl IntoIterator<Item = &'a str>, separator: &str) -> String {
    notes
        .into_iter()
        .filter(|note| !note.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}
