//! Structure-only models: McGowan characteristic volume with the fluorine adjustment, and
//! molecular weight.

use crate::core::models::descriptor::{
    Calculation, ModelDescriptor, ModelError, ModelInputs, StoredValue,
};
use crate::core::models::registry::{ModelRegistry, RegistryError};
use crate::core::models::result::Estimate;
use crate::core::molecule::{Molecule, elements};
use phf::{Map, phf_map};

const VF_CITATION: &str = "Mcgowan, J. C., \
    The Estimation of Solubility Parameters and Related Properties of Liquids. \
    J Chem Tech Biot A 1984, 34 (1), 38-42. \
    Adjustment for F: \
    Goss K-U, Bronner G, Harner T, Hertel M, Schmidt TC, \
    The Partition Behavior of Fluorotelomer Alcohols and Olefins. \
    Environ Sci Technol 40 (11):3572-3577.";

/// Atom contributions in units of 100 cm^3/mol; F carries the Goss et al. value.
static MCGOWAN: Map<&'static str, f64> = phf_map! {
    "C" => 0.1635,
    "N" => 0.1439,
    "O" => 0.1243,
    "F" => 0.1248,
    "Si" => 0.2683,
    "P" => 0.2487,
    "S" => 0.2291,
    "Cl" => 0.2095,
    "B" => 0.1832,
    "Ge" => 0.3102,
    "As" => 0.2942,
    "Se" => 0.2781,
    "Br" => 0.2621,
    "Sn" => 0.3935,
    "Sb" => 0.3744,
    "Te" => 0.3614,
    "I" => 0.3453,
};

const HYDROGEN: f64 = 0.0215;
const HEAVY_BOND: f64 = -0.0656;

/// Fails with the first element lacking a McGowan contribution.
pub fn mcgowan_volume(molecule: &Molecule) -> Result<f64, &'static str> {
    let mut volume = 0.0;
    for atom in molecule.heavy_atoms() {
        volume += MCGOWAN.get(atom.element).ok_or(atom.element)?;
    }
    volume += HYDROGEN * molecule.hydrogen_count() as f64;
    volume += HEAVY_BOND * molecule.heavy_bond_count() as f64;
    Ok(volume)
}

pub fn molecular_weight(molecule: &Molecule) -> Result<f64, &'static str> {
    let mut weight = 0.0;
    for atom in molecule.heavy_atoms() {
        weight += elements::lookup(atom.element)
            .ok_or(atom.element)?
            .mass;
    }
    let hydrogen = elements::lookup("H").map_or(1.008, |h| h.mass);
    Ok(weight + hydrogen * molecule.hydrogen_count() as f64)
}

fn structure_model(
    compute: fn(&Molecule) -> Result<f64, &'static str>,
    quantity: &'static str,
) -> impl Fn(&ModelInputs<'_>) -> Result<Calculation, ModelError> + Send + Sync {
    move |inputs: &ModelInputs<'_>| {
        let solute = inputs.solute()?;
        Ok(match compute(solute.molecule) {
            Ok(value) => Calculation::new(Estimate::without_domain(value, 0.0), ""),
            Err(element) => Calculation::new(
                Estimate::without_domain(f64::NAN, f64::NAN),
                format!("no {} contribution for element {}", quantity, element),
            ),
        })
    }
}

pub fn register(registry: &mut ModelRegistry) -> Result<(), RegistryError> {
    registry.register(
        ModelDescriptor::builder("Vf")
            .endpoint("Abraham PPLFER solute descriptor V - McGowan Volume - adjusted by Goss et al.")
            .units("0.01 cm^3/mol")
            .citation(VF_CITATION)
            .round_digits(3)
            .stored(
                "O",
                StoredValue {
                    estimate: Estimate::without_domain(0.1673, f64::NAN),
                    note: "reliable value used".to_string(),
                    citation: None,
                },
            )
            .build(structure_model(mcgowan_volume, "McGowan volume")),
    )?;
    registry.register(
        ModelDescriptor::builder("MW")
            .endpoint("Molecular weight")
            .units("g/mol")
            .citation("IUPAC standard atomic weights")
            .round_digits(2)
            .build(structure_model(molecular_weight, "atomic weight")),
    )?;
    Ok(())
}
