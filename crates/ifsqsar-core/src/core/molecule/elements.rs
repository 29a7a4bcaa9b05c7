use phf::{Map, phf_map};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementInfo {
    pub atomic_number: u8,
    pub mass: f64,
    pub default_valences: &'static [u8],
}

const fn element(atomic_number: u8, mass: f64, default_valences: &'static [u8]) -> ElementInfo {
    ElementInfo {
        atomic_number,
        mass,
        default_valences,
    }
}

static ELEMENTS: Map<&'static str, ElementInfo> = phf_map! {
    "H" => element(1, 1.008, &[1]),
    "He" => element(2, 4.0026, &[]),
    "Li" => element(3, 6.94, &[]),
    "Be" => element(4, 9.0122, &[]),
    "B" => element(5, 10.81, &[3]),
    "C" => element(6, 12.011, &[4]),
    "N" => element(7, 14.007, &[3, 5]),
    "O" => element(8, 15.999, &[2]),
    "F" => element(9, 18.998, &[1]),
    "Ne" => element(10, 20.180, &[]),
    "Na" => element(11, 22.990, &[]),
    "Mg" => element(12, 24.305, &[]),
    "Al" => element(13, 26.982, &[]),
    "Si" => element(14, 28.085, &[4]),
    "P" => element(15, 30.974, &[3, 5]),
    "S" => element(16, 32.06, &[2, 4, 6]),
    "Cl" => element(17, 35.45, &[1]),
    "Ar" => element(18, 39.948, &[]),
    "K" => element(19, 39.098, &[]),
    "Ca" => element(20, 40.078, &[]),
    "Fe" => element(26, 55.845, &[]),
    "Cu" => element(29, 63.546, &[]),
    "Zn" => element(30, 65.38, &[]),
    "Ge" => element(32, 72.630, &[4]),
    "As" => element(33, 74.922, &[3, 5]),
    "Se" => element(34, 78.971, &[2, 4, 6]),
    "Br" => element(35, 79.904, &[1]),
    "Kr" => element(36, 83.798, &[]),
    "Sn" => element(50, 118.71, &[4]),
    "Sb" => element(51, 121.76, &[3, 5]),
    "Te" => element(52, 127.60, &[2, 4, 6]),
    "I" => element(53, 126.90, &[1]),
    "Xe" => element(54, 131.29, &[]),
    "Hg" => element(80, 200.59, &[]),
    "Pb" => element(82, 207.2, &[]),
};

pub fn lookup(symbol: &str) -> Option<&'static ElementInfo> {
    ELEMENTS.get(symbol)
}

/// Returns the canonical `'static` spelling of an element symbol.
pub fn intern(symbol: &str) -> Option<&'static str> {
    ELEMENTS.get_key(symbol).copied()
}
