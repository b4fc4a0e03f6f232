//! Physical and numerical constants used throughout the eeq library.
//!
//! The charge model works in atomic units: lengths in Bohr, energies in Hartree.

/// Conversion factor from Bohr radii to angstroms.
pub const BOHR_TO_ANGSTROM: f64 = 0.529_177_210_903;

/// Conversion factor from angstroms to Bohr radii.
pub const ANGSTROM_TO_BOHR: f64 = 1.0 / BOHR_TO_ANGSTROM;

/// Conversion factor from Hartree energy units to electron volts.
pub const HARTREE_TO_EV: f64 = 27.211_386_245_988;

/// Distances below this value (in Bohr) are treated as coincident atoms.
///
/// The screened Coulomb kernel switches to its analytic short-range limit and pair
/// derivatives are skipped.
pub const DISTANCE_THRESHOLD_BOHR: f64 = 1e-12;

/// Regularization added under the square root of the coordination number.
pub const CN_REGULARIZATION: f64 = 1e-14;
