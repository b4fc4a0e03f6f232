//! This module defines the atom-level types of the single-molecule API.
//!
//! It includes the `AtomView` trait for reading atom data out of foreign structures, the `Atom`
//! struct as a concrete representation, and `CalculationResult` for the outcome of one solve.
//! The batched tensor API in [`crate::model`] does not need these types.

/// A trait for viewing atom data without owning it.
///
/// Implement this for your own atom type to pass slices of it straight to
/// [`EeqSolver::solve`](crate::EeqSolver::solve) without conversion.
pub trait AtomView {
    /// Returns the atomic number of the atom.
    fn atomic_number(&self) -> u8;

    /// Returns the Cartesian position of the atom in angstroms.
    fn position(&self) -> [f64; 3];

    /// Returns `true` for ghost atoms.
    ///
    /// Ghost atoms are part of the geometry but carry no charge. The default
    /// implementation treats every atom as real.
    fn is_ghost(&self) -> bool {
        false
    }
}

/// A concrete atom with atomic number, position and ghost flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atom {
    /// The atomic number of the atom, identifying its chemical element.
    pub atomic_number: u8,
    /// The Cartesian position of the atom in angstroms.
    pub position: [f64; 3],
    /// Whether the atom is a charge-free ghost.
    pub ghost: bool,
}

impl Atom {
    /// Creates a real atom.
    pub fn new(atomic_number: u8, position: [f64; 3]) -> Self {
        Self {
            atomic_number,
            position,
            ghost: false,
        }
    }

    /// Creates a ghost atom.
    pub fn ghost(atomic_number: u8, position: [f64; 3]) -> Self {
        Self {
            atomic_number,
            position,
            ghost: true,
        }
    }
}

impl AtomView for Atom {
    #[inline(always)]
    fn atomic_number(&self) -> u8 {
        self.atomic_number
    }

    #[inline(always)]
    fn position(&self) -> [f64; 3] {
        self.position
    }

    #[inline(always)]
    fn is_ghost(&self) -> bool {
        self.ghost
    }
}

/// The result of an EEQ calculation on one molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationResult {
    /// Partial charges in the order of the input atoms, zero for ghost atoms.
    ///
    /// The charges of real atoms sum to the requested total charge.
    pub charges: Vec<f64>,
    /// Per-atom EEQ energies in Hartree, zero for ghost atoms.
    pub energies: Vec<f64>,
    /// Total EEQ energy in Hartree.
    pub energy: f64,
    /// The equilibrated electronegativity (negative Lagrange multiplier) in Hartree.
    pub equilibrated_potential: f64,
}
