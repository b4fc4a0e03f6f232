pub mod elements;
pub mod error;
pub mod math;
pub mod model;
pub mod params;
pub mod solver;
pub mod tensor;
pub mod types;
mod validation;

pub use error::EeqError;
pub use model::{ChargeModel, EeqModel, EeqSolution};
pub use params::{ElementData, Parameters};
pub use solver::{EeqSolver, SolverOptions};
pub use tensor::{Device, Dtype, Tensor};
pub use types::{Atom, AtomView, CalculationResult};

use std::sync::OnceLock;

static DEFAULT_PARAMETERS: OnceLock<Parameters> = OnceLock::new();

/// Returns the embedded EEQ 2019 parameter table, parsed on first use.
pub fn get_default_parameters() -> &'static Parameters {
    DEFAULT_PARAMETERS.get_or_init(|| {
        const DEFAULT_PARAMS_TOML: &str = include_str!("../resources/eeq2019.toml");
        Parameters::load_from_str(DEFAULT_PARAMS_TOML)
            .expect("Failed to parse embedded default parameters. This is a library bug.")
    })
}
