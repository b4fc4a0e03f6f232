//! Geometric features and interaction kernels of the EEQ model.
//!
//! These pieces are independent of the linear system: unit conversions, covalent radii,
//! pairwise distances, the error-function coordination number and the screened Coulomb
//! interaction between Gaussian charge distributions, each with the derivatives needed for
//! analytic gradients.

/// Physical constants and numerical thresholds.
pub mod constants;

/// Coulomb interaction between Gaussian charge distributions.
pub mod coulomb;

/// Pairwise interatomic distances with padding masks.
pub mod distance;

/// Error-function coordination numbers and their smooth upper cap.
pub mod ncoord;

/// Covalent radii used by the coordination number.
pub mod radii;
