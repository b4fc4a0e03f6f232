//! This module contains the EEQ linear system and its solver.
//!
//! It includes the assembly of the augmented system for one molecule, the dense LU solve with
//! its adjoint for gradients, the single-molecule `EeqSolver` and `SolverOptions`.

pub(crate) mod assembly;
mod implementation;
mod options;

pub(crate) use implementation::{charge_gradient_sites, energy_gradient_sites, solve_sites};
pub use implementation::EeqSolver;
pub use options::SolverOptions;
