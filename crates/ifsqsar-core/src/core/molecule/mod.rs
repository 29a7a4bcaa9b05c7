//! Molecular graphs and the structure normalization contract.
//!
//! Every model consumes a [`Molecule`] produced by a [`StructureNormalizer`]. The
//! normalizer is an external collaborator: the engine only depends on the
//! [`StructureNormalizer::normalize`] contract, which turns a SMILES string into a
//! molecule, its normalized SMILES and a free-text warning note. [`BasicNormalizer`]
//! is the implementation shipped with the crate.

pub mod elements;
mod smiles;

pub use smiles::{BasicNormalizer, SmilesError};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl BondOrder {
    /// Bond order contribution to an atom's valence, with aromatic bonds counted as one.
    pub fn valence(self) -> u8 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Quadruple => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Atom {
    pub element: &'static str,
    pub aromatic: bool,
    pub charge: i8,
    /// Implicit plus bracket hydrogens attached to this atom.
    pub hydrogens: u8,
    pub isotope: Option<u16>,
}

impl Atom {
    pub fn is_hydrogen(&self) -> bool {
        self.element == "H"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bond {
    pub begin: usize,
    pub end: usize,
    pub order: BondOrder,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
}

impl Molecule {
    pub fn new(atoms: Vec<Atom>, bonds: Vec<Bond>) -> Self {
        Self { atoms, bonds }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn heavy_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.iter().filter(|atom| !atom.is_hydrogen())
    }

    /// Total hydrogen count, including explicit hydrogen atoms.
    pub fn hydrogen_count(&self) -> usize {
        self.atoms
            .iter()
            .map(|atom| atom.hydrogens as usize + usize::from(atom.is_hydrogen()))
            .sum()
    }

    pub fn heavy_bond_count(&self) -> usize {
        self.bonds
            .iter()
            .filter(|bond| {
                !self.atoms[bond.begin].is_hydrogen() && !self.atoms[bond.end].is_hydrogen()
            })
            .count()
    }

    pub fn net_charge(&self) -> i32 {
        self.atoms.iter().map(|atom| atom.charge as i32).sum()
    }

    pub fn has_charged_atoms(&self) -> bool {
        self.atoms.iter().any(|atom| atom.charge != 0)
    }

    /// Number of disconnected fragments, counted with a union-find over the bond list.
    pub fn fragment_count(&self) -> usize {
        let mut parent: Vec<usize> = (0..self.atoms.len()).collect();

        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        for bond in &self.bonds {
            let a = find(&mut parent, bond.begin);
            let b = find(&mut parent, bond.end);
            if a != b {
                parent[a] = b;
            }
        }

        (0..self.atoms.len())
            .filter(|&i| find(&mut parent, i) == i)
            .count()
    }
}

/// Output of [`StructureNormalizer::normalize`].
///
/// A failed normalization carries no molecule and an empty `smiles`; the reason is in `note`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Normalized {
    pub molecule: Option<Molecule>,
    pub smiles: String,
    pub note: String,
}

impl Normalized {
    pub fn failed(note: impl Into<String>) -> Self {
        Self {
            molecule: None,
            smiles: String::new(),
            note: note.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.molecule.is_some() && !self.smiles.is_empty()
    }
}

pub trait StructureNormalizer: Send + Sync {
    fn normalize(&self, smiles: &str) -> Normalized;
}
