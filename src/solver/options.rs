//! This module defines configuration options for the EEQ solver.
//!
//! The options control the coordination number that shifts each atom's electronegativity; the
//! per-element constants themselves live in [`Parameters`](crate::Parameters).

/// Configuration parameters for the EEQ solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Real-space cutoff in Bohr beyond which atom pairs do not contribute to
    /// the coordination number.
    pub cn_cutoff: f64,
    /// Steepness `k` of the error-function counting function.
    pub cn_steepness: f64,
    /// Saturation value of the smooth coordination-number cap.
    pub cn_max: f64,
    /// Whether ghost atoms count as neighbours in the coordination number of
    /// real atoms. Ghost atoms never carry charge either way.
    pub ghosts_in_cn: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            cn_cutoff: 25.0,
            cn_steepness: 7.5,
            cn_max: 8.0,
            ghosts_in_cn: true,
        }
    }
}
