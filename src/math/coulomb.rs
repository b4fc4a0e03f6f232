use super::constants::DISTANCE_THRESHOLD_BOHR;
use libm::erf;
use std::f64::consts::PI;

/// Combined Gaussian exponent of two atomic charge distributions.
///
/// `γ_ij = 1 / sqrt(a_i² + a_j²)` for charge widths `a_i`, `a_j` in Bohr.
#[inline]
pub fn gamma(width_i: f64, width_j: f64) -> f64 {
    1.0 / (width_i * width_i + width_j * width_j).sqrt()
}

/// Diagonal element of the EEQ matrix: hardness plus the self-interaction of a
/// Gaussian charge distribution of width `width`.
#[inline]
pub fn self_interaction(hardness: f64, width: f64) -> f64 {
    hardness + (2.0 / PI).sqrt() / width
}

/// Coulomb interaction `erf(γr)/r` between two Gaussian charge distributions.
///
/// Below [`DISTANCE_THRESHOLD_BOHR`] the analytic limit `2γ/√π` is returned.
#[inline]
pub fn screened_potential(distance_bohr: f64, gamma: f64) -> f64 {
    if distance_bohr < DISTANCE_THRESHOLD_BOHR {
        2.0 * gamma / PI.sqrt()
    } else {
        erf(gamma * distance_bohr) / distance_bohr
    }
}

/// Derivative of [`screened_potential`] with respect to the distance.
///
/// Zero at the coincident limit, where the kernel is flat.
#[inline]
pub fn screened_potential_derivative(distance_bohr: f64, gamma: f64) -> f64 {
    if distance_bohr < DISTANCE_THRESHOLD_BOHR {
        return 0.0;
    }
    let gr = gamma * distance_bohr;
    let gaussian = 2.0 * gamma / PI.sqrt() * (-gr * gr).exp();
    (gaussian - erf(gr) / distance_bohr) / distance_bohr
}
