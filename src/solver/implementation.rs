//! This module implements the dense solve of the EEQ system and its analytic adjoint.
//!
//! `EeqSolver` is the single-molecule front end working on any type implementing `AtomView`.
//! The batched tensor front end in [`crate::model`] feeds the same per-molecule routines
//! (`solve_sites`, `charge_gradient_sites`, `energy_gradient_sites`), so both paths share one
//! assembly and one factorization strategy.

use super::assembly::{self, LinearSystem, Site, SiteKind, SiteParameters};
use super::options::SolverOptions;
use crate::{
    error::EeqError,
    math::{constants, coulomb, ncoord, radii},
    params::Parameters,
    types::{AtomView, CalculationResult},
};
use faer::{Col, Mat, prelude::*};
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

/// Charges, energies and Lagrange multiplier of one molecule.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SiteSolution {
    pub charges: Vec<f64>,
    pub energies: Vec<f64>,
    pub multiplier: f64,
}

/// Solves the EEQ system for one molecule.
///
/// Slots that are not real atoms receive exactly zero charge and energy. A
/// neutral molecule without real atoms is returned as all zeros without
/// solving; a charged one is `EeqError::NoChargeCarriers`.
pub(crate) fn solve_sites(
    sites: &[Site],
    total_charge: f64,
    options: &SolverOptions,
) -> Result<SiteSolution, EeqError> {
    let system = assembly::build_system(sites, total_charge, options);
    if system.n_real == 0 {
        return empty_solution(sites.len(), total_charge);
    }
    let (solution, _) = factor_and_solve(&system.matrix, &system.rhs, None)?;
    Ok(collect_solution(sites, &system, &solution))
}

/// Gradient of `Σ_i w_i q_i` with respect to the positions of all slots.
///
/// Uses the adjoint of the linear solve: with `x` the solution of `M x = r`
/// and `λ` the solution of `Mᵀ λ = w` (M is symmetric), the derivative along
/// any coordinate θ is `λ · (∂r/∂θ − ∂M/∂θ x)`.
pub(crate) fn charge_gradient_sites(
    sites: &[Site],
    total_charge: f64,
    weights: &[f64],
    options: &SolverOptions,
) -> Result<Vec<[f64; 3]>, EeqError> {
    let system = assembly::build_system(sites, total_charge, options);
    let n = sites.len();
    if system.n_real == 0 {
        require_neutral(total_charge)?;
        return Ok(vec![[0.0; 3]; n]);
    }

    let adjoint_rhs = Col::from_fn(n + 1, |i| {
        if i < n && sites[i].is_real() {
            weights[i]
        } else {
            0.0
        }
    });
    let (solution, adjoint) = factor_and_solve(&system.matrix, &system.rhs, Some(&adjoint_rhs))?;
    let adjoint = adjoint.ok_or_else(|| {
        EeqError::LinalgError("Adjoint solve did not produce a solution.".to_string())
    })?;

    let x: Vec<f64> = (0..n).map(|i| solution[i]).collect();
    let lambda: Vec<f64> = (0..n).map(|i| adjoint[i]).collect();

    Ok(accumulate_pair_gradient(sites, &system, options, |i, j, dcoulomb, dcount_i, dcount_j| {
        let mut g = 0.0;
        if let Some(dv) = dcoulomb {
            g -= dv * (lambda[i] * x[j] + lambda[j] * x[i]);
        }
        g += lambda[i] * system.rhs_cn_derivative[i] * dcount_i;
        g += lambda[j] * system.rhs_cn_derivative[j] * dcount_j;
        g
    }))
}

/// Gradient of the total EEQ energy with respect to the positions of all slots.
///
/// The charges minimize the energy under the total-charge constraint, so only
/// the explicit dependence survives: `dE/dθ = ½ qᵀ (∂A/∂θ) q − q · ∂b/∂θ`.
pub(crate) fn energy_gradient_sites(
    sites: &[Site],
    total_charge: f64,
    options: &SolverOptions,
) -> Result<Vec<[f64; 3]>, EeqError> {
    let system = assembly::build_system(sites, total_charge, options);
    if system.n_real == 0 {
        require_neutral(total_charge)?;
        return Ok(vec![[0.0; 3]; sites.len()]);
    }
    let (solution, _) = factor_and_solve(&system.matrix, &system.rhs, None)?;
    let q = collect_solution(sites, &system, &solution).charges;

    Ok(accumulate_pair_gradient(sites, &system, options, |i, j, dcoulomb, dcount_i, dcount_j| {
        let mut g = 0.0;
        if let Some(dv) = dcoulomb {
            g += dv * q[i] * q[j];
        }
        g -= q[i] * system.rhs_cn_derivative[i] * dcount_i;
        g -= q[j] * system.rhs_cn_derivative[j] * dcount_j;
        g
    }))
}

/// Loops over all present pairs and scatters `dL/dr_ij` onto Cartesian gradients.
///
/// `pair_term(i, j, dA_ij/dr, dcn_i/dr, dcn_j/dr)` returns the derivative of the
/// target with respect to the pair distance. `dA_ij/dr` is `None` unless both
/// slots are real atoms; the counting derivatives are zero when the partner is
/// not a neighbour or lies beyond the cutoff.
fn accumulate_pair_gradient<F>(
    sites: &[Site],
    system: &LinearSystem,
    options: &SolverOptions,
    pair_term: F,
) -> Vec<[f64; 3]>
where
    F: Fn(usize, usize, Option<f64>, f64, f64) -> f64,
{
    let n = system.n_sites();
    let mut gradient = vec![[0.0; 3]; n];

    for i in 0..n {
        if !sites[i].is_present() {
            continue;
        }
        for j in (i + 1)..n {
            if !sites[j].is_present() {
                continue;
            }
            let r = system.distances[[i, j]];
            if r < constants::DISTANCE_THRESHOLD_BOHR {
                continue;
            }

            let dcoulomb = (sites[i].is_real() && sites[j].is_real()).then(|| {
                let gamma =
                    coulomb::gamma(sites[i].params.charge_width, sites[j].params.charge_width);
                coulomb::screened_potential_derivative(r, gamma)
            });

            let dcount = if r <= options.cn_cutoff {
                ncoord::erf_count_derivative(
                    r,
                    sites[i].params.covalent_radius + sites[j].params.covalent_radius,
                    options.cn_steepness,
                )
            } else {
                0.0
            };
            let dcount_i = if system.neighbour[j] { dcount } else { 0.0 };
            let dcount_j = if system.neighbour[i] { dcount } else { 0.0 };

            let g = pair_term(i, j, dcoulomb, dcount_i, dcount_j);
            if g == 0.0 {
                continue;
            }

            let (pi, pj) = (sites[i].position, sites[j].position);
            for k in 0..3 {
                let component = g * (pi[k] - pj[k]) / r;
                gradient[i][k] += component;
                gradient[j][k] -= component;
            }
        }
    }

    gradient
}

/// Factorizes `matrix` once and solves for `rhs` and optionally a second right-hand side.
fn factor_and_solve(
    matrix: &Mat<f64>,
    rhs: &Col<f64>,
    second_rhs: Option<&Col<f64>>,
) -> Result<(Col<f64>, Option<Col<f64>>), EeqError> {
    let solve_result = panic::catch_unwind(AssertUnwindSafe(|| {
        let lu = matrix.partial_piv_lu();
        let solution = lu.solve(rhs);
        let second = second_rhs.map(|b| lu.solve(b));
        (solution, second)
    }));

    let (solution, second) = solve_result.map_err(|_| {
        EeqError::LinalgError(
            "Linear system solver panicked. Matrix might be singular.".to_string(),
        )
    })?;

    let finite = |col: &Col<f64>| (0..col.nrows()).all(|i| col[i].is_finite());
    if !finite(&solution) || second.as_ref().is_some_and(|col| !finite(col)) {
        return Err(EeqError::LinalgError(
            "Linear system is singular or ill-conditioned; check for overlapping atoms."
                .to_string(),
        ));
    }

    Ok((solution, second))
}

fn collect_solution(sites: &[Site], system: &LinearSystem, solution: &Col<f64>) -> SiteSolution {
    let n = sites.len();
    let charges: Vec<f64> = (0..n)
        .map(|i| if sites[i].is_real() { solution[i] } else { 0.0 })
        .collect();

    let energies = (0..n)
        .map(|i| {
            if !sites[i].is_real() {
                return 0.0;
            }
            let coulomb: f64 = (0..n).map(|j| system.matrix[(i, j)] * charges[j]).sum();
            charges[i] * (0.5 * coulomb - system.rhs[i])
        })
        .collect();

    SiteSolution {
        charges,
        energies,
        multiplier: solution[n],
    }
}

fn empty_solution(n: usize, total_charge: f64) -> Result<SiteSolution, EeqError> {
    require_neutral(total_charge)?;
    Ok(SiteSolution {
        charges: vec![0.0; n],
        energies: vec![0.0; n],
        multiplier: 0.0,
    })
}

/// Molecules without real atoms can only honour a zero total charge.
fn require_neutral(total_charge: f64) -> Result<(), EeqError> {
    if total_charge != 0.0 {
        return Err(EeqError::NoChargeCarriers(total_charge));
    }
    Ok(())
}

/// The single-molecule EEQ solver.
///
/// This struct holds a reference to the element parameters and the solver options. Atom
/// positions are read through [`AtomView`] in angstroms and converted to Bohr internally.
pub struct EeqSolver<'p> {
    parameters: &'p Parameters,
    options: SolverOptions,
}

impl<'p> EeqSolver<'p> {
    /// Creates a new `EeqSolver` with default options.
    ///
    /// # Arguments
    ///
    /// * `parameters` - A reference to the `Parameters` containing element data.
    ///
    /// # Returns
    ///
    /// A new `EeqSolver` instance with default `SolverOptions`.
    ///
    /// # Examples
    ///
    /// ```
    /// use eeq::{EeqSolver, get_default_parameters};
    ///
    /// let solver = EeqSolver::new(get_default_parameters());
    /// ```
    pub fn new(parameters: &'p Parameters) -> Self {
        Self {
            parameters,
            options: SolverOptions::default(),
        }
    }

    /// Replaces the solver options.
    ///
    /// # Examples
    ///
    /// ```
    /// use eeq::{EeqSolver, SolverOptions, get_default_parameters};
    ///
    /// let options = SolverOptions {
    ///     cn_cutoff: 20.0,
    ///     ..Default::default()
    /// };
    /// let solver = EeqSolver::new(get_default_parameters()).with_options(options);
    /// ```
    pub fn with_options(mut self, options: SolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Computes EEQ charges for a single molecule.
    ///
    /// Atoms for which [`AtomView::is_ghost`] returns `true` take part in the
    /// coordination numbers (unless disabled in the options) but carry no charge.
    ///
    /// # Arguments
    ///
    /// * `atoms` - A slice of atom data implementing the `AtomView` trait, in angstroms.
    /// * `total_charge` - The desired total charge of the system.
    ///
    /// # Returns
    ///
    /// A `Result` containing `CalculationResult` with charges, energies and the equilibrated
    /// electronegativity on success, or an `EeqError` on failure.
    ///
    /// # Errors
    ///
    /// Returns `EeqError::NoAtoms` for an empty slice, `EeqError::ParameterNotFound` for
    /// elements missing from the parameter set, `EeqError::NoChargeCarriers` if every atom is
    /// a ghost but `total_charge` is nonzero, and `EeqError::LinalgError` if the system
    /// cannot be solved.
    ///
    /// # Examples
    ///
    /// ```
    /// use eeq::{Atom, EeqSolver, get_default_parameters};
    ///
    /// let solver = EeqSolver::new(get_default_parameters());
    ///
    /// // Water, coordinates in angstroms.
    /// let atoms = vec![
    ///     Atom::new(8, [0.0, 0.0, 0.119]),
    ///     Atom::new(1, [0.0, 0.763, -0.477]),
    ///     Atom::new(1, [0.0, -0.763, -0.477]),
    /// ];
    ///
    /// let result = solver.solve(&atoms, 0.0).unwrap();
    ///
    /// assert_eq!(result.charges.len(), 3);
    /// assert!(result.charges[0] < 0.0);
    /// assert!(result.charges.iter().sum::<f64>().abs() < 1e-10);
    /// ```
    pub fn solve<A: AtomView>(
        &self,
        atoms: &[A],
        total_charge: f64,
    ) -> Result<CalculationResult, EeqError> {
        if atoms.is_empty() {
            return Err(EeqError::NoAtoms);
        }

        let sites = self.build_sites(atoms)?;
        debug!(
            "solving EEQ system for {} atoms with total charge {}",
            sites.len(),
            total_charge
        );
        let solution = solve_sites(&sites, total_charge, &self.options)?;

        Ok(CalculationResult {
            energy: solution.energies.iter().sum(),
            charges: solution.charges,
            energies: solution.energies,
            equilibrated_potential: -solution.multiplier,
        })
    }

    fn build_sites<A: AtomView>(&self, atoms: &[A]) -> Result<Vec<Site>, EeqError> {
        atoms
            .iter()
            .map(|atom| {
                let atomic_number = atom.atomic_number();
                let data = self.parameters.get(atomic_number)?;
                let covalent_radius = radii::covalent_radius_d3(usize::from(atomic_number))
                    .ok_or(EeqError::ParameterNotFound(i64::from(atomic_number)))?;
                let position = atom.position().map(|x| x * constants::ANGSTROM_TO_BOHR);
                Ok(Site {
                    position,
                    kind: if atom.is_ghost() {
                        SiteKind::Ghost
                    } else {
                        SiteKind::Real
                    },
                    params: SiteParameters {
                        electronegativity: data.electronegativity,
                        cn_scaling: data.cn_scaling,
                        hardness: data.hardness,
                        charge_width: data.charge_width,
                        covalent_radius,
                    },
                })
            })
            .collect()
    }
}
