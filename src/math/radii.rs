use super::constants::ANGSTROM_TO_BOHR;

/// Single-bond covalent radii in angstroms for H..Lr (Pyykkö and Atsumi, 2009),
/// indexed by atomic number. Index 0 is the padding sentinel.
const COVALENT_RADII_2009: [f64; 104] = [
    0.00, //
    0.32, 0.46, 1.33, 1.02, 0.85, 0.75, 0.71, 0.63, 0.64, 0.67, // H-Ne
    1.55, 1.39, 1.26, 1.16, 1.11, 1.03, 0.99, 0.96, // Na-Ar
    1.96, 1.71, 1.48, 1.36, 1.34, 1.22, 1.19, 1.16, 1.11, 1.10, // K-Ni
    1.12, 1.18, 1.24, 1.21, 1.21, 1.16, 1.14, 1.17, // Cu-Kr
    2.10, 1.85, 1.63, 1.54, 1.47, 1.38, 1.28, 1.25, 1.25, 1.20, // Rb-Pd
    1.28, 1.36, 1.42, 1.40, 1.40, 1.36, 1.33, 1.31, // Ag-Xe
    2.32, 1.96, 1.80, 1.63, 1.76, 1.74, 1.73, 1.72, 1.68, 1.69, // Cs-Gd
    1.68, 1.67, 1.66, 1.65, 1.64, 1.70, 1.62, 1.52, 1.46, 1.37, // Tb-W
    1.31, 1.29, 1.22, 1.23, 1.24, 1.33, 1.44, 1.44, 1.51, 1.45, // Re-Po
    1.47, 1.42, 2.23, 2.01, 1.86, 1.75, 1.69, 1.70, 1.71, 1.72, // At-Pu
    1.66, 1.66, 1.68, 1.68, 1.65, 1.67, 1.73, 1.76, 1.61, // Am-Lr
];

/// Scaling applied to the single-bond radii for the D3-style coordination number.
const D3_SCALE: f64 = 4.0 / 3.0;

/// Largest atomic number with a tabulated covalent radius.
pub const MAX_ATOMIC_NUMBER: usize = COVALENT_RADII_2009.len() - 1;

/// Scaled covalent radius in Bohr, or `None` outside 1..=103.
pub fn covalent_radius_d3(atomic_number: usize) -> Option<f64> {
    if atomic_number == 0 {
        return None;
    }
    COVALENT_RADII_2009
        .get(atomic_number)
        .map(|r| D3_SCALE * r * ANGSTROM_TO_BOHR)
}
