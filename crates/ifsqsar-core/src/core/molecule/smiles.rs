use super::elements;
use super::{Atom, Bond, BondOrder, Molecule, Normalized, StructureNormalizer};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SmilesError {
    #[error("empty SMILES string")]
    Empty,
    #[error("unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("unknown element '{symbol}' at position {position}")]
    UnknownElement { symbol: String, position: usize },
    #[error("unterminated bracket atom starting at position {position}")]
    UnterminatedBracket { position: usize },
    #[error("bond or branch at position {position} has no preceding atom")]
    DanglingBond { position: usize },
    #[error("unbalanced parentheses")]
    UnbalancedBranch,
    #[error("unclosed ring bond {label}")]
    UnclosedRing { label: u32 },
    #[error("charge of bracket atom at position {position} is out of range")]
    ChargeOutOfRange { position: usize },
    #[error("atom {atom} has more bonds than any valence allows")]
    ValenceOverflow { atom: usize },
}

/// Reads organic-subset and bracket-atom SMILES into a [`Molecule`].
///
/// Stereo markers and atom classes are accepted and ignored. The normalized SMILES is the
/// trimmed input; this reader does not canonicalize atom order.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicNormalizer;

impl BasicNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, smiles: &str) -> Result<Molecule, SmilesError> {
        Parser::new(smiles).run()
    }
}

impl StructureNormalizer for BasicNormalizer {
    fn normalize(&self, smiles: &str) -> Normalized {
        let trimmed = smiles.trim();
        match self.parse(trimmed) {
            Ok(molecule) => {
                let mut notes = Vec::new();
                if molecule.has_charged_atoms() {
                    notes.push("structure contains charged atoms".to_string());
                }
                let fragments = molecule.fragment_count();
                if fragments > 1 {
                    notes.push(format!(
                        "structure contains {} disconnected fragments",
                        fragments
                    ));
                }
                Normalized {
                    molecule: Some(molecule),
                    smiles: trimmed.to_string(),
                    note: notes.join(", "),
                }
            }
            Err(e) => Normalized::failed(format!("SMILES error: {}", e)),
        }
    }
}

struct PendingAtom {
    atom: Atom,
    explicit_hydrogens: bool,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    atoms: Vec<PendingAtom>,
    bonds: Vec<Bond>,
    branch_stack: Vec<usize>,
    rings: HashMap<u32, (usize, Option<BondOrder>)>,
    previous: Option<usize>,
    pending_bond: Option<BondOrder>,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            atoms: Vec::new(),
            bonds: Vec::new(),
            branch_stack: Vec::new(),
            rings: HashMap::new(),
            previous: None,
            pending_bond: None,
        }
    }

    fn run(mut self) -> Result<Molecule, SmilesError> {
        if self.chars.is_empty() {
            return Err(SmilesError::Empty);
        }

        while let Some(&c) = self.chars.get(self.pos) {
            match c {
                '(' => {
                    let anchor = self
                        .previous
                        .ok_or(SmilesError::DanglingBond { position: self.pos })?;
                    self.branch_stack.push(anchor);
                    self.pos += 1;
                }
                ')' => {
                    self.previous = Some(
                        self.branch_stack
                            .pop()
                            .ok_or(SmilesError::UnbalancedBranch)?,
                    );
                    self.pos += 1;
                }
                '-' | '=' | '#' | '$' | ':' | '/' | '\\' => {
                    if self.previous.is_none() {
                        return Err(SmilesError::DanglingBond { position: self.pos });
                    }
                    self.pending_bond = Some(match c {
                        '=' => BondOrder::Double,
                        '#' => BondOrder::Triple,
                        '$' => BondOrder::Quadruple,
                        ':' => BondOrder::Aromatic,
                        _ => BondOrder::Single,
                    });
                    self.pos += 1;
                }
                '.' => {
                    self.previous = None;
                    self.pending_bond = None;
                    self.pos += 1;
                }
                '%' => {
                    let start = self.pos;
                    let digits: String = self.chars[self.pos + 1..]
                        .iter()
                        .take(2)
                        .take_while(|d| d.is_ascii_digit())
                        .collect();
                    if digits.len() != 2 {
                        return Err(SmilesError::UnexpectedCharacter {
                            character: '%',
                            position: start,
                        });
                    }
                    self.pos += 3;
                    self.ring_bond(digits.parse().unwrap_or(0), start)?;
                }
                d if d.is_ascii_digit() => {
                    let start = self.pos;
                    self.pos += 1;
                    self.ring_bond(d.to_digit(10).unwrap_or(0), start)?;
                }
                '[' => {
                    let atom = self.bracket_atom()?;
                    self.add_atom(atom, true);
                }
                _ => {
                    let atom = self.organic_atom()?;
                    self.add_atom(atom, false);
                }
            }
        }

        if !self.branch_stack.is_empty() {
            return Err(SmilesError::UnbalancedBranch);
        }
        if let Some(label) = self.rings.keys().min() {
            return Err(SmilesError::UnclosedRing { label: *label });
        }
        if self.pending_bond.is_some() {
            return Err(SmilesError::DanglingBond {
                position: self.chars.len(),
            });
        }

        self.finish()
    }

    fn add_atom(&mut self, atom: Atom, explicit_hydrogens: bool) {
        let index = self.atoms.len();
        self.atoms.push(PendingAtom {
            atom,
            explicit_hydrogens,
        });
        if let Some(previous) = self.previous {
            let order = self
                .pending_bond
                .take()
                .unwrap_or_else(|| self.default_order(previous, index));
            self.bonds.push(Bond {
                begin: previous,
                end: index,
                order,
            });
        }
        self.previous = Some(index);
    }

    fn default_order(&self, a: usize, b: usize) -> BondOrder {
        if self.atoms[a].atom.aromatic && self.atoms[b].atom.aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        }
    }

    fn ring_bond(&mut self, label: u32, position: usize) -> Result<(), SmilesError> {
        let current = self.previous.ok_or(SmilesError::DanglingBond { position })?;
        let explicit = self.pending_bond.take();
        match self.rings.remove(&label) {
            Some((opening, opening_order)) => {
                let order = explicit
                    .or(opening_order)
                    .unwrap_or_else(|| self.default_order(opening, current));
                self.bonds.push(Bond {
                    begin: opening,
                    end: current,
                    order,
                });
            }
            None => {
                self.rings.insert(label, (current, explicit));
            }
        }
        Ok(())
    }

    fn organic_atom(&mut self) -> Result<Atom, SmilesError> {
        let start = self.pos;
        let c = self.chars[self.pos];
        let next = self.chars.get(self.pos + 1).copied();

        let (symbol, aromatic, width) = match (c, next) {
            ('C', Some('l')) => ("Cl", false, 2),
            ('B', Some('r')) => ("Br", false, 2),
            ('B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I', _) => (upper_symbol(c), false, 1),
            ('b' | 'c' | 'n' | 'o' | 'p' | 's', _) => (upper_symbol(c), true, 1),
            _ => {
                return Err(SmilesError::UnexpectedCharacter {
                    character: c,
                    position: start,
                });
            }
        };
        self.pos += width;

        Ok(Atom {
            element: symbol,
            aromatic,
            charge: 0,
            hydrogens: 0,
            isotope: None,
        })
    }

    fn bracket_atom(&mut self) -> Result<Atom, SmilesError> {
        let open = self.pos;
        let close = self.chars[open..]
            .iter()
            .position(|&c| c == ']')
            .map(|offset| open + offset)
            .ok_or(SmilesError::UnterminatedBracket { position: open })?;
        let body: Vec<char> = self.chars[open + 1..close].to_vec();
        self.pos = close + 1;

        let mut i = 0;
        let isotope_digits: String = body.iter().take_while(|c| c.is_ascii_digit()).collect();
        i += isotope_digits.len();
        let isotope = isotope_digits.parse::<u16>().ok();

        let symbol_start = i;
        let first = *body
            .get(i)
            .ok_or(SmilesError::UnterminatedBracket { position: open })?;
        let aromatic = first.is_ascii_lowercase();
        let mut symbol = first.to_ascii_uppercase().to_string();
        i += 1;
        if let Some(&second) = body.get(i) {
            if second.is_ascii_lowercase() {
                let candidate = format!("{}{}", symbol, second);
                if elements::lookup(&candidate).is_some() {
                    symbol = candidate;
                    i += 1;
                }
            }
        }
        let element = elements::intern(&symbol).ok_or_else(|| SmilesError::UnknownElement {
            symbol: body[symbol_start..i].iter().collect(),
            position: open + 1 + symbol_start,
        })?;

        while body.get(i) == Some(&'@') {
            i += 1;
        }
        while body.get(i).is_some_and(|c| c.is_ascii_uppercase() && *c != 'H') {
            // Extended chirality classes such as @TH1 or @SP2.
            i += 1;
            while body.get(i).is_some_and(|c| c.is_ascii_digit()) {
                i += 1;
            }
        }

        let mut hydrogens = 0u8;
        if body.get(i) == Some(&'H') {
            i += 1;
            hydrogens = 1;
            if let Some(d) = body.get(i).and_then(|c| c.to_digit(10)) {
                hydrogens = d as u8;
                i += 1;
            }
        }

        let mut charge = 0i8;
        if let Some(&sign) = body.get(i).filter(|c| **c == '+' || **c == '-') {
            let unit: i8 = if sign == '+' { 1 } else { -1 };
            i += 1;
            let mut magnitude = 1i8;
            if let Some(d) = body.get(i).and_then(|c| c.to_digit(10)) {
                magnitude = d as i8;
                i += 1;
            } else {
                while body.get(i) == Some(&sign) {
                    magnitude = magnitude
                        .checked_add(1)
                        .ok_or(SmilesError::ChargeOutOfRange { position: open })?;
                    i += 1;
                }
            }
            charge = unit * magnitude;
        }

        if body.get(i) == Some(&':') {
            i += 1;
            while body.get(i).is_some_and(|c| c.is_ascii_digit()) {
                i += 1;
            }
        }

        if let Some(&c) = body.get(i) {
            return Err(SmilesError::UnexpectedCharacter {
                character: c,
                position: open + 1 + i,
            });
        }

        Ok(Atom {
            element,
            aromatic,
            charge,
            hydrogens,
            isotope,
        })
    }

    fn finish(self) -> Result<Molecule, SmilesError> {
        let mut bond_valence = vec![0u8; self.atoms.len()];
        for bond in &self.bonds {
            for atom in [bond.begin, bond.end] {
                bond_valence[atom] = bond_valence[atom]
                    .checked_add(bond.order.valence())
                    .ok_or(SmilesError::ValenceOverflow { atom })?;
            }
        }

        let atoms = self
            .atoms
            .into_iter()
            .enumerate()
            .map(|(index, pending)| {
                let mut atom = pending.atom;
                if !pending.explicit_hydrogens {
                    let used = bond_valence[index]
                        .checked_add(u8::from(atom.aromatic))
                        .ok_or(SmilesError::ValenceOverflow { atom: index })?;
                    atom.hydrogens = implicit_hydrogens(atom.element, used);
                }
                Ok(atom)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Molecule::new(atoms, self.bonds))
    }
}

fn upper_symbol(c: char) -> &'static str {
    match c.to_ascii_uppercase() {
        'B' => "B",
        'C' => "C",
        'N' => "N",
        'O' => "O",
        'P' => "P",
        'S' => "S",
        'F' => "F",
        _ => "I",
    }
}

fn implicit_hydrogens(symbol: &str, used: u8) -> u8 {
    elements::lookup(symbol)
        .and_then(|info| info.default_valences.iter().find(|&&v| v >= used))
        .map(|&valence| valence - used)
        .unwrap_or(0)
}
