use libm::erf;
use ndarray::Array2;
use std::f64::consts::PI;

/// Error-function counting function `0.5 * (1 + erf(-k (r - rc) / rc))`.
///
/// Smoothly goes from 1 for `r << rc` to 0 for `r >> rc`, passing 0.5 at `r = rc`.
#[inline]
pub fn erf_count(distance: f64, cutoff_radius: f64, steepness: f64) -> f64 {
    0.5 * (1.0 + erf(-steepness * (distance - cutoff_radius) / cutoff_radius))
}

/// Derivative of [`erf_count`] with respect to the distance.
#[inline]
pub fn erf_count_derivative(distance: f64, cutoff_radius: f64, steepness: f64) -> f64 {
    let t = steepness * (distance - cutoff_radius) / cutoff_radius;
    -steepness / (cutoff_radius * PI.sqrt()) * (-t * t).exp()
}

/// Smooth upper cap `ln(1 + e^max) - ln(1 + e^(max - cn))` of a coordination number.
///
/// Nearly the identity for small `cn` and saturates at `max` for large `cn`.
#[inline]
pub fn cut_coordination_number(cn: f64, max: f64) -> f64 {
    ln_1p_exp(max) - ln_1p_exp(max - cn)
}

/// Derivative of [`cut_coordination_number`] with respect to `cn`.
#[inline]
pub fn cut_coordination_number_derivative(cn: f64, max: f64) -> f64 {
    1.0 / (1.0 + (cn - max).exp())
}

/// Numerically stable `ln(1 + e^x)`.
#[inline]
fn ln_1p_exp(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

/// Raw (uncapped) error-function coordination numbers.
///
/// Atom `j` contributes to the coordination number of `i != j` when
/// `neighbour[j]` is set and `distances[[i, j]] <= cutoff`. The cutoff radius
/// of a pair is the sum of the two covalent radii.
pub fn coordination_numbers(
    distances: &Array2<f64>,
    covalent_radii: &[f64],
    present: &[bool],
    neighbour: &[bool],
    steepness: f64,
    cutoff: f64,
) -> Vec<f64> {
    let n = covalent_radii.len();
    let mut cn = vec![0.0; n];
    for i in 0..n {
        if !present[i] {
            continue;
        }
        for j in 0..n {
            if i == j || !neighbour[j] {
                continue;
            }
            let r = distances[[i, j]];
            if r > cutoff {
                continue;
            }
            cn[i] += erf_count(r, covalent_radii[i] + covalent_radii[j], steepness);
        }
    }
    cn
}
