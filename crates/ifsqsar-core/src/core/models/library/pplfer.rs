//! PPLFER meta models built on the Abraham solute descriptors.
//!
//! Each model is a linear free energy relationship
//! `sS + aA + bB + ab*sqrt(A*B) + vVf + lL + c` with fitted coefficients and their standard
//! errors. The Uncertainty Level is the aggregate of the `S`, `A`, `B` and `L` levels and
//! the error combines coefficient and descriptor errors in quadrature.

use crate::core::models::descriptor::{
    Calculation, DependencyValues, Model, ModelDescriptor, ModelDescriptorBuilder, ModelError,
    ModelInputs, StoredValue,
};
use crate::core::models::registry::{ModelRegistry, RegistryError};
use crate::core::models::result::{Estimate, UncertaintyLevel, round_to};
use crate::core::models::uncertainty::{
    Capped, aggregate, base_error_scale, cap_and_flag, join_notes,
};

const PFAS_CITATION: &str = "Brown, T. N.; Armitage, J. M.; Sangion, A.; Arnot, J. A.; \
    Improved prediction of PFAS partitioning with PPLFERs and QSPRs. \
    Environ. Sci.: Process. Impacts, 2024, Accepted.";
const INCREMENTAL_CITATION: &str = "Brown, T. N.; Armitage, J. M.; Sangion, A.; Arnot, J. A.; \
    Incremental improvements in predicting physical-chemical properties for PFAS. In. prep.";

const GAS_CONSTANT: f64 = 8314.46261815324;
const TEMPERATURE: f64 = 298.15;
const ATMOSPHERIC_PRESSURE: f64 = 101325.0;
const SOLID_STATES: [&str; 2] = ["likely solid", "maybe solid"];

/// A fitted coefficient and its standard error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term {
    pub coefficient: f64,
    pub standard_error: f64,
}

const fn term(coefficient: f64, standard_error: f64) -> Term {
    Term {
        coefficient,
        standard_error,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equation {
    pub s: Term,
    pub a: Term,
    pub b: Term,
    /// Cross term on `sqrt(A*B)`, present in the solubility-type equations.
    pub ab: Option<Term>,
    pub v: Term,
    pub l: Term,
    pub c: Term,
}

#[derive(Debug, Clone, Copy)]
struct Descriptors {
    s: Estimate,
    a: Estimate,
    b: Estimate,
    l: Estimate,
    vf: f64,
}

impl Descriptors {
    fn gather(dependencies: &DependencyValues<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            s: dependencies.estimate("S")?,
            a: dependencies.estimate("A")?,
            b: dependencies.estimate("B")?,
            l: dependencies.estimate("L")?,
            vf: dependencies.value("Vf")?,
        })
    }

    fn levels(&self) -> [(&'static str, Option<UncertaintyLevel>); 4] {
        [
            ("S", self.s.uncertainty),
            ("A", self.a.uncertainty),
            ("B", self.b.uncertainty),
            ("L", self.l.uncertainty),
        ]
    }

    /// `sqrt(A*B)` and its error.
    fn cross(&self) -> (f64, f64) {
        let (a, b) = (self.a, self.b);
        let ab = (a.value * b.value).sqrt();
        let error = if a.value > 0.0 && b.value > 0.0 {
            ab * 0.5 * ((a.error / a.value).powi(2) + (b.error / b.value).powi(2)).sqrt()
        } else {
            0.0
        };
        (ab, error)
    }
}

/// Squared error contribution of a descriptor term; zero-valued descriptors contribute nothing.
fn contribution(value: f64, error: f64, term: Term) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    (value * term.coefficient).powi(2)
        * ((error / value).powi(2) + (term.standard_error / term.coefficient).powi(2))
}

impl Equation {
    fn predict(&self, d: &Descriptors) -> f64 {
        let mut value = self.s.coefficient * d.s.value
            + self.a.coefficient * d.a.value
            + self.b.coefficient * d.b.value
            + self.v.coefficient * d.vf
            + self.l.coefficient * d.l.value
            + self.c.coefficient;
        if let Some(ab) = self.ab {
            value += ab.coefficient * d.cross().0;
        }
        value
    }

    fn error(&self, d: &Descriptors) -> f64 {
        let mut variance = (d.vf * self.v.standard_error).powi(2) + self.c.standard_error.powi(2);
        variance += contribution(d.l.value, d.l.error, self.l);
        variance += contribution(d.s.value, d.s.error, self.s);
        variance += contribution(d.a.value, d.a.error, self.a);
        variance += contribution(d.b.value, d.b.error, self.b);
        if let Some(term) = self.ab {
            let (ab, ab_error) = d.cross();
            variance += contribution(ab, ab_error, term);
        }
        variance.sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Ceiling {
    AtmosphericPressure,
    InverseMolarVolume { quantity: &'static str },
}

/// A PPLFER equation plus the per-model post-processing rules.
#[derive(Debug, Clone)]
pub struct PplferModel {
    equation: Equation,
    offset: f64,
    solid_error_scale: f64,
    extrapolation_error_scale: bool,
    ceiling: Option<Ceiling>,
    note_separator: &'static str,
}

impl PplferModel {
    pub fn new(equation: Equation) -> Self {
        Self {
            equation,
            offset: 0.0,
            solid_error_scale: 1.0,
            extrapolation_error_scale: false,
            ceiling: None,
            note_separator: ", ",
        }
    }

    /// Converts the logSa prediction into log vapor pressure in Pa and caps it at one
    /// atmosphere. Solid solutes get a 5/3 error multiplier, aggregate ranks 2, 3 and 5 an
    /// extra 1.25.
    fn vapor_pressure(mut self) -> Self {
        self.offset = GAS_CONSTANT.log10() + TEMPERATURE.log10();
        self.solid_error_scale = 5.0 / 3.0;
        self.extrapolation_error_scale = true;
        self.ceiling = Some(Ceiling::AtmosphericPressure);
        self
    }

    fn solubility(mut self, quantity: &'static str) -> Self {
        self.ceiling = Some(Ceiling::InverseMolarVolume { quantity });
        self
    }

    fn solid_error_scale(mut self, scale: f64) -> Self {
        self.solid_error_scale = scale;
        self
    }

    fn note_separator(mut self, separator: &'static str) -> Self {
        self.note_separator = separator;
        self
    }

    fn error_scale(
        &self,
        level: UncertaintyLevel,
        dependencies: &DependencyValues<'_>,
    ) -> Result<f64, ModelError> {
        let mut scale = base_error_scale(level);
        if scale == 1.0 {
            return Ok(scale);
        }
        if self.solid_error_scale != 1.0 {
            let state = dependencies.get("state")?;
            if SOLID_STATES.iter().any(|solid| *solid == state.note) {
                scale *= self.solid_error_scale;
            }
        }
        if self.extrapolation_error_scale && matches!(level, UncertaintyLevel::Predicted(2 | 3 | 5)) {
            scale *= 1.25;
        }
        Ok(scale)
    }
}

impl Model for PplferModel {
    fn calculate(&self, inputs: &ModelInputs<'_>) -> Result<Calculation, ModelError> {
        let dependencies = &inputs.solute()?.dependencies;
        let descriptors = Descriptors::gather(dependencies)?;
        let aggregate = aggregate(&descriptors.levels());

        let value = self.equation.predict(&descriptors) + self.offset;
        let error = self.equation.error(&descriptors) * self.error_scale(aggregate.level, dependencies)?;

        let capped = match self.ceiling {
            Some(Ceiling::AtmosphericPressure) => cap_and_flag(
                value,
                ATMOSPHERIC_PRESSURE.log10(),
                aggregate.level,
                "vapor pressure",
                "atmospheric pressure",
                2,
            ),
            Some(Ceiling::InverseMolarVolume { quantity }) => cap_and_flag(
                value,
                (1000.0 / dependencies.value("MVliquid")?).log10(),
                aggregate.level,
                quantity,
                "inverse of molar volume",
                2,
            ),
            None => Capped {
                value,
                level: aggregate.level,
                note: None,
            },
        };

        let note = join_notes(
            [
                capped.note.as_deref().unwrap_or_default(),
                inputs.propagated_notes.as_str(),
                aggregate.note.as_str(),
            ],
            self.note_separator,
        );
        Ok(Calculation::new(
            Estimate::new(capped.value, capped.level, error),
            note,
        ))
    }
}

pub const LOG_KOW: Equation = Equation {
    s: term(-1.219, 0.035),
    a: term(-0.058, 0.028),
    b: term(-3.579, 0.034),
    ab: None,
    v: term(2.702, 0.047),
    l: term(0.341, 0.012),
    c: term(0.326, 0.025),
};

pub const LOG_KOW_DRY: Equation = Equation {
    s: term(-1.652, 0.063),
    a: term(-0.124, 0.064),
    b: term(-3.898, 0.062),
    ab: None,
    v: term(2.614, 0.076),
    l: term(0.447, 0.021),
    c: term(0.339, 0.039),
};

pub const LOG_KOO: Equation = Equation {
    s: term(0.433, 0.072),
    a: term(0.066, 0.070),
    b: term(0.319, 0.070),
    ab: None,
    v: term(0.087, 0.089),
    l: term(-0.106, 0.024),
    c: term(-0.013, 0.046),
};

pub const LOG_KOA: Equation = Equation {
    s: term(0.475, 0.050),
    a: term(3.566, 0.052),
    b: term(0.885, 0.049),
    ab: None,
    v: term(0.109, 0.059),
    l: term(0.892, 0.016),
    c: term(-0.166, 0.028),
};

pub const LOG_KAW: Equation = Equation {
    s: term(-2.127, 0.038),
    a: term(-3.690, 0.038),
    b: term(-4.783, 0.037),
    ab: None,
    v: term(2.505, 0.047),
    l: term(-0.445, 0.013),
    c: term(0.504, 0.027),
};

/// Solute activity in air (logSa), converted to vapor pressure by the model.
pub const LOG_SA: Equation = Equation {
    s: term(-1.309, 0.098),
    a: term(-0.983, 0.217),
    b: term(-0.558, 0.118),
    ab: Some(term(-1.629, 0.257)),
    v: term(-0.779, 0.132),
    l: term(-0.655, 0.035),
    c: term(0.690, 0.068),
};

pub const LOG_SW: Equation = Equation {
    s: term(0.831, 0.091),
    a: term(2.707, 0.213),
    b: term(4.218, 0.112),
    ab: Some(term(-1.629, 0.257)),
    v: term(-3.316, 0.124),
    l: term(-0.206, 0.033),
    c: term(0.194, 0.062),
};

pub const LOG_SO: Equation = Equation {
    s: term(-0.821, 0.110),
    a: term(2.583, 0.223),
    b: term(0.320, 0.128),
    ab: Some(term(-1.629, 0.257)),
    v: term(-0.702, 0.145),
    l: term(0.241, 0.039),
    c: term(0.532, 0.073),
};

pub const LOG_SO_WET: Equation = Equation {
    s: term(-0.388, 0.097),
    a: term(2.649, 0.215),
    b: term(0.639, 0.117),
    ab: Some(term(-1.629, 0.257)),
    v: term(-0.615, 0.132),
    l: term(0.136, 0.035),
    c: term(0.519, 0.067),
};

const DESCRIPTOR_DEPENDENCIES: [(&str, u8); 5] = [("S", 3), ("A", 3), ("B", 3), ("Vf", 1), ("L", 3)];

fn meta_model(name: &str, version: u32, endpoint: &str, units: &str) -> ModelDescriptorBuilder {
    ModelDescriptor::builder(name)
        .version(version)
        .endpoint(endpoint)
        .units(units)
        .citation(PFAS_CITATION)
        .round_digits(2)
        .default_group(true)
        .solute_dependencies(&DESCRIPTOR_DEPENDENCIES)
}

pub fn register(registry: &mut ModelRegistry) -> Result<(), RegistryError> {
    registry.register(
        meta_model(
            "logKow",
            2,
            "Log of wet (practical) octanol-water partition coefficient (log P) - updated for PFAS",
            "log L[w]/L[wet o]",
        )
        .build(PplferModel::new(LOG_KOW)),
    )?;
    registry.register(
        meta_model(
            "logKowdry",
            2,
            "Log of dry (hypothetical) octanol-water partition coefficient (log P) - updated for PFAS",
            "log L[w]/L[dry o]",
        )
        .build(PplferModel::new(LOG_KOW_DRY)),
    )?;
    registry.register(
        meta_model(
            "logKoo",
            2,
            "Log of wet octanol - dry octanol partition coefficient, used as a conversion factor - updated for PFAS",
            "log L[dry o]/L[wet o]",
        )
        .build(PplferModel::new(LOG_KOO)),
    )?;
    registry.register(
        meta_model(
            "logKoa",
            2,
            "Log of octanol-air partition coefficient - updated for PFAS",
            "log L[a]/L[o]",
        )
        .build(PplferModel::new(LOG_KOA)),
    )?;
    registry.register(
        meta_model(
            "logKaw",
            2,
            "Log of air-water partition coefficient (Henry's Law Constant) - updated for PFAS",
            "log L[w]/L[a]",
        )
        .build(PplferModel::new(LOG_KAW).note_separator("; ")),
    )?;
    registry.register(
        meta_model(
            "logVPliquid",
            3,
            "Log of vapor pressure of liquid or super-cooled liquid predicted by PPLFER at 298K - updated for PFAS",
            "log Pa",
        )
        .solute_dependencies(&[("state", 1), ("MVliquid", 2)])
        .stored(
            "O",
            StoredValue {
                estimate: Estimate::new(
                    round_to(3169.0f64.log10(), 2),
                    UncertaintyLevel::Predicted(0),
                    f64::NAN,
                ),
                note: "experimental value used".to_string(),
                citation: Some("well known value".to_string()),
            },
        )
        .build(PplferModel::new(LOG_SA).vapor_pressure().note_separator("; ")),
    )?;
    registry.register(
        meta_model(
            "logSwliquid",
            3,
            "Log of solubility for liquids or super-cooled liquid solutes in water predicted by PPLFER at 298K - updated for PFAS",
            "log mol/L[w]",
        )
        .citation(INCREMENTAL_CITATION)
        .solute_dependencies(&[("state", 1), ("MVliquid", 2)])
        .build(
            PplferModel::new(LOG_SW)
                .solubility("water solubility")
                .solid_error_scale(1.25)
                .note_separator("; "),
        ),
    )?;
    registry.register(
        meta_model(
            "logSoliquid",
            2,
            "Log of solubility in dry octanol for liquid or super-cooled liquid solute - updated for PFAS",
            "log mol/L",
        )
        .solute_dependencies(&[("MVliquid", 2)])
        .build(
            PplferModel::new(LOG_SO)
                .solubility("dry octanol solubility")
                .note_separator("; "),
        ),
    )?;
    registry.register(
        meta_model(
            "logSowetliquid",
            2,
            "Log of solubility in wet octanol for liquid or super-cooled liquid solute - updated for PFAS",
            "log mol/L",
        )
        .solute_dependencies(&[("MVliquid", 2)])
        .build(
            PplferModel::new(LOG_SO_WET)
                .solubility("wet octanol solubility")
                .note_separator("; "),
        ),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mixture::Fraction;
    use crate::core::models::descriptor::OccupantInputs;
    use crate::core::molecule::Molecule;

    const ETHANOL: [(&str, f64); 5] = [("S", 0.42), ("A", 0.37), ("B", 0.48), ("L", 1.485), ("Vf", 0.4491)];

    fn dependencies<'a>(
        values: &[(&'a str, f64)],
        level: UncertaintyLevel,
        extra: &[(&'a str, Estimate, &'a str)],
    ) -> DependencyValues<'a> {
        let mut deps = DependencyValues::new();
        for (name, value) in values {
            let estimate = if *name == "Vf" {
                Estimate::without_domain(*value, 0.0)
            } else {
                Estimate::new(*value, level, 0.02)
            };
            deps.insert(*name, estimate, "");
        }
        for (name, estimate, note) in extra {
            deps.insert(*name, *estimate, *note);
        }
        deps
    }

    fn run(model: &PplferModel, deps: DependencyValues<'_>) -> Calculation {
        let molecule = Molecule::default();
        let fraction = Fraction::new("u", "1");
        let inputs = ModelInputs {
            solutes: vec![OccupantInputs {
                smiles: "CCO",
                molecule: &molecule,
                fraction: &fraction,
                dependencies: deps,
            }],
            ..ModelInputs::default()
        };
        model.calculate(&inputs).unwrap()
    }

    #[test]
    fn log_kow_follows_the_linear_equation() {
        let calculation = run(
            &PplferModel::new(LOG_KOW),
            dependencies(&ETHANOL, UncertaintyLevel::Predicted(0), &[]),
        );
        let estimate = calculation.estimates.scalar().copied().unwrap();
        let expected = -1.219 * 0.42 - 0.058 * 0.37 - 3.579 * 0.48 + 2.702 * 0.4491 + 0.341 * 1.485 + 0.326;
        assert!((estimate.value - expected).abs() < 1e-12);
        assert_eq!(estimate.uncertainty, Some(UncertaintyLevel::Predicted(0)));
        assert!(estimate.error > 0.0);
        assert_eq!(calculation.note, "aggregate solute descriptor UL is in the AD");
    }

    #[test]
    fn experimental_descriptors_keep_the_unscaled_error() {
        let model = PplferModel::new(LOG_KOA);
        let predicted = run(&model, dependencies(&ETHANOL, UncertaintyLevel::Predicted(0), &[]));
        let measured = run(&model, dependencies(&ETHANOL, UncertaintyLevel::Experimental, &[]));
        let ratio = predicted.estimates.scalar().unwrap().error / measured.estimates.scalar().unwrap().error;
        assert!((ratio - 1.25).abs() < 1e-12);
        assert_eq!(measured.estimates.scalar().unwrap().uncertainty, Some(UncertaintyLevel::Experimental));
    }

    #[test]
    fn zero_descriptors_skip_their_error_terms() {
        let descriptors = Descriptors {
            s: Estimate::new(0.52, UncertaintyLevel::Predicted(0), 0.02),
            a: Estimate::new(0.0, UncertaintyLevel::Predicted(0), 0.02),
            b: Estimate::new(0.14, UncertaintyLevel::Predicted(0), 0.02),
            l: Estimate::new(0.0, UncertaintyLevel::Predicted(0), 0.02),
            vf: 0.7164,
        };
        let error = LOG_SW.error(&descriptors);
        assert!(error.is_finite());
        assert_eq!(descriptors.cross(), (0.0, 0.0));
    }

    #[test]
    fn vapor_pressure_is_capped_at_one_atmosphere() {
        // Small, non-polar solutes are far more volatile than one atmosphere allows.
        let values = [("S", 0.0), ("A", 0.0), ("B", 0.0), ("L", -1.0), ("Vf", 0.1)];
        let model = PplferModel::new(LOG_SA).vapor_pressure();
        let deps = dependencies(
            &values,
            UncertaintyLevel::Predicted(1),
            &[("state", Estimate::new(1.0, UncertaintyLevel::Experimental, f64::NAN), "likely liquid")],
        );
        let calculation = run(&model, deps);
        let estimate = calculation.estimates.scalar().copied().unwrap();
        assert_eq!(estimate.value, ATMOSPHERIC_PRESSURE.log10());
        assert_eq!(estimate.uncertainty, Some(UncertaintyLevel::Predicted(6)));
        assert!(calculation.note.starts_with("Predicted vapor pressure ("));
        assert!(calculation.note.contains("capped at atmospheric pressure, UL set to 6; original aggregate UL: 1"));
    }

    #[test]
    fn solid_solutes_inflate_the_vapor_pressure_error() {
        let model = PplferModel::new(LOG_SA).vapor_pressure();
        let state = |note| [("state", Estimate::new(2.0, UncertaintyLevel::Experimental, f64::NAN), note)];
        let liquid = run(&model, dependencies(&ETHANOL, UncertaintyLevel::Predicted(0), &state("likely liquid")));
        let solid = run(&model, dependencies(&ETHANOL, UncertaintyLevel::Predicted(0), &state("likely solid")));
        let ratio = solid.estimates.scalar().unwrap().error / liquid.estimates.scalar().unwrap().error;
        assert!((ratio - 5.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn extrapolated_vapor_pressures_get_an_extra_error_multiplier() {
        let model = PplferModel::new(LOG_SA).vapor_pressure();
        let state = [("state", Estimate::new(1.0, UncertaintyLevel::Experimental, f64::NAN), "likely liquid")];
        let in_domain = run(&model, dependencies(&ETHANOL, UncertaintyLevel::Predicted(1), &state));
        let extrapolated = run(&model, dependencies(&ETHANOL, UncertaintyLevel::Predicted(2), &state));
        let ratio = extrapolated.estimates.scalar().unwrap().error / in_domain.estimates.scalar().unwrap().error;
        assert!((ratio - 1.25).abs() < 1e-9);
        assert!(extrapolated.note.ends_with("out of the AD"));
    }

    #[test]
    fn solubility_is_capped_at_inverse_molar_volume() {
        let values = [("S", 0.45), ("A", 0.82), ("B", 0.35), ("L", 0.26), ("Vf", 0.1673)];
        let model = PplferModel::new(LOG_SW).solubility("water solubility").solid_error_scale(1.25).note_separator("; ");
        let deps = dependencies(
            &values,
            UncertaintyLevel::Predicted(0),
            &[
                ("state", Estimate::new(1.0, UncertaintyLevel::Experimental, f64::NAN), "likely liquid"),
                ("MVliquid", Estimate::new(18.07, UncertaintyLevel::Experimental, 0.5), ""),
            ],
        );
        let calculation = run(&model, deps);
        let estimate = calculation.estimates.scalar().copied().unwrap();
        assert_eq!(estimate.value, (1000.0f64 / 18.07).log10());
        assert_eq!(estimate.uncertainty, Some(UncertaintyLevel::Predicted(6)));
        assert!(calculation.note.starts_with("Predicted water solubility ("));
        assert!(calculation.note.ends_with("; aggregate solute descriptor UL is in the AD"));
    }

    #[test]
    fn propagated_notes_lead_the_domain_note() {
        let molecule = Molecule::default();
        let fraction = Fraction::new("u", "1");
        let inputs = ModelInputs {
            solutes: vec![OccupantInputs {
                smiles: "CCO",
                molecule: &molecule,
                fraction: &fraction,
                dependencies: dependencies(&ETHANOL, UncertaintyLevel::Predicted(4), &[]),
            }],
            propagated_notes: "S UL 4 exceeds 3".to_string(),
            ..ModelInputs::default()
        };
        let calculation = PplferModel::new(LOG_KOW).calculate(&inputs).unwrap();
        assert_eq!(
            calculation.note,
            "S UL 4 exceeds 3, aggregate solute descriptor UL is out of the AD"
        );
    }

    #[test]
    fn missing_descriptors_are_model_errors() {
        let molecule = Molecule::default();
        let fraction = Fraction::new("u", "1");
        let inputs = ModelInputs {
            solutes: vec![OccupantInputs {
                smiles: "CCO",
                molecule: &molecule,
                fraction: &fraction,
                dependencies: DependencyValues::new(),
            }],
            ..ModelInputs::default()
        };
        assert_eq!(
            PplferModel::new(LOG_KOW).calculate(&inputs),
            Err(ModelError::MissingDependency("S".into()))
        );
    }

    #[test]
    fn registered_models_declare_their_dependencies() {
        let mut registry = ModelRegistry::new();
        register(&mut registry).unwrap();
        assert_eq!(registry.len(), 9);
        let vp = registry.get("logVPliquid").unwrap();
        let names: Vec<&str> = vp.dependencies().solute.iter().map(|d| d.model.as_str()).collect();
        assert_eq!(names, vec!["S", "A", "B", "Vf", "L", "state", "MVliquid"]);
        assert_eq!(vp.version(), 3);
        assert!(vp.stored_value("O").is_some());
        assert_eq!(registry.get("logSwliquid").unwrap().citation(), INCREMENTAL_CITATION);
    }
}
