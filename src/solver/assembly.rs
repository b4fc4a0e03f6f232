//! Assembly of the augmented EEQ linear system for one molecule.
//!
//! For `n` slots the system has size `n + 1`:
//!
//! ```text
//! | A   1 | | q |   | b |
//! | 1ᵀ  0 | | μ | = | Q |
//! ```
//!
//! with the screened Coulomb matrix `A`, the coordination-number dependent
//! electronegativities `b`, the total charge `Q` and the Lagrange multiplier `μ`.
//! Slots that are not real atoms (padding or ghosts) get an identity row and
//! column and a zero right-hand side, which pins their charge to zero without
//! coupling to the rest of the system.

use super::options::SolverOptions;
use crate::math::{constants::CN_REGULARIZATION, coulomb, distance, ncoord};
use faer::{Col, Mat};
use ndarray::Array2;

/// Role of a slot in a (possibly padded) molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SiteKind {
    Real,
    Ghost,
    Padding,
}

/// Element constants of one slot, already resolved from the parameter table.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct SiteParameters {
    pub electronegativity: f64,
    pub cn_scaling: f64,
    pub hardness: f64,
    pub charge_width: f64,
    pub covalent_radius: f64,
}

/// One slot of a molecule, positions in Bohr.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Site {
    pub position: [f64; 3],
    pub kind: SiteKind,
    pub params: SiteParameters,
}

impl Site {
    pub fn padding() -> Self {
        Self {
            position: [0.0; 3],
            kind: SiteKind::Padding,
            params: SiteParameters::default(),
        }
    }

    #[inline]
    pub fn is_real(&self) -> bool {
        self.kind == SiteKind::Real
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.kind != SiteKind::Padding
    }
}

/// The assembled system together with the geometric features needed to
/// differentiate it.
pub(crate) struct LinearSystem {
    pub matrix: Mat<f64>,
    pub rhs: Col<f64>,
    pub distances: Array2<f64>,
    /// Whether slot `j` counts as a coordination-number neighbour.
    pub neighbour: Vec<bool>,
    /// `∂b_i / ∂cn_i` with respect to the raw coordination number, zero for
    /// slots that are not real atoms.
    pub rhs_cn_derivative: Vec<f64>,
    pub n_real: usize,
}

impl LinearSystem {
    pub fn n_sites(&self) -> usize {
        self.distances.nrows()
    }
}

/// Builds the augmented EEQ system for one molecule.
pub(crate) fn build_system(
    sites: &[Site],
    total_charge: f64,
    options: &SolverOptions,
) -> LinearSystem {
    let n = sites.len();
    let size = n + 1;

    let positions: Vec<[f64; 3]> = sites.iter().map(|s| s.position).collect();
    let present: Vec<bool> = sites.iter().map(Site::is_present).collect();
    let neighbour: Vec<bool> = sites
        .iter()
        .map(|s| s.is_real() || (options.ghosts_in_cn && s.is_present()))
        .collect();
    let covalent_radii: Vec<f64> = sites.iter().map(|s| s.params.covalent_radius).collect();

    let distances = distance::pairwise(&positions, &present);
    let raw_cn = ncoord::coordination_numbers(
        &distances,
        &covalent_radii,
        &present,
        &neighbour,
        options.cn_steepness,
        options.cn_cutoff,
    );

    let mut matrix = Mat::zeros(size, size);
    let mut rhs = Col::zeros(size);
    let mut rhs_cn_derivative = vec![0.0; n];
    let mut n_real = 0;

    for (i, site) in sites.iter().enumerate() {
        if !site.is_real() {
            matrix[(i, i)] = 1.0;
            continue;
        }
        n_real += 1;
        let p = &site.params;

        let cn = ncoord::cut_coordination_number(raw_cn[i], options.cn_max);
        let dcut = ncoord::cut_coordination_number_derivative(raw_cn[i], options.cn_max);
        let shifted = cn + CN_REGULARIZATION;
        rhs[i] = -p.electronegativity + p.cn_scaling * cn / shifted.sqrt();
        rhs_cn_derivative[i] = p.cn_scaling * (cn + 2.0 * CN_REGULARIZATION)
            / (2.0 * shifted * shifted.sqrt())
            * dcut;

        matrix[(i, i)] = coulomb::self_interaction(p.hardness, p.charge_width);
        for j in (i + 1)..n {
            if !sites[j].is_real() {
                continue;
            }
            let gamma = coulomb::gamma(p.charge_width, sites[j].params.charge_width);
            let value = coulomb::screened_potential(distances[[i, j]], gamma);
            matrix[(i, j)] = value;
            matrix[(j, i)] = value;
        }

        matrix[(i, n)] = 1.0;
        matrix[(n, i)] = 1.0;
    }

    rhs[n] = total_charge;

    LinearSystem {
        matrix,
        rhs,
        distances,
        neighbour,
        rhs_cn_derivative,
        n_real,
    }
}
