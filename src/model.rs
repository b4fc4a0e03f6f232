//! The batched charge model working on tensors.
//!
//! [`ChargeModel`] owns the four per-element parameter tensors (electronegativity,
//! coordination-number scaling, hardness and charge width) and guarantees that
//! they share one floating dtype and one device. [`EeqModel`] wraps it with
//! [`SolverOptions`] and exposes the solve and gradient entry points.
//!
//! All inputs are validated before any numerical work, in the order device,
//! dtype, shape, parameter coverage. Molecules of a batch are independent and
//! are solved in parallel.

use crate::{
    error::EeqError,
    get_default_parameters,
    math::radii,
    params::Parameters,
    solver::{
        SolverOptions,
        assembly::{Site, SiteKind, SiteParameters},
        charge_gradient_sites, energy_gradient_sites, solve_sites,
    },
    tensor::{Device, Dtype, Tensor},
    validation::{self, Layout},
};
use rayon::prelude::*;
use tracing::debug;

/// Per-element EEQ parameters stored as tensors indexed by atomic number.
///
/// Index 0 is the padding sentinel and holds zeros. The dtype and device of the
/// model are fixed at construction; [`to_dtype`](Self::to_dtype) and
/// [`to_device`](Self::to_device) return converted copies. There are no setters:
///
/// ```compile_fail
/// let mut model = eeq::EeqModel::param2019();
/// model.dtype = eeq::Dtype::Float32;
/// ```
///
/// ```compile_fail
/// let mut model = eeq::EeqModel::param2019();
/// model.device = eeq::Device::Cpu;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeModel {
    chi: Tensor,
    kcn: Tensor,
    eta: Tensor,
    rad: Tensor,
    dtype: Dtype,
    device: Device,
}

impl ChargeModel {
    /// Creates a model from four parameter tensors of shape `(Z)`.
    ///
    /// # Errors
    ///
    /// - `EeqError::DeviceMismatch` if the tensors are not on one device.
    /// - `EeqError::TypeMismatch` if the tensors do not share one dtype.
    /// - `EeqError::UnsupportedType` if that dtype is not floating point.
    /// - `EeqError::ShapeMismatch` if the tensors are not one-dimensional and of
    ///   equal length.
    pub fn new(chi: Tensor, kcn: Tensor, eta: Tensor, rad: Tensor) -> Result<Self, EeqError> {
        let tensors = [&chi, &kcn, &eta, &rad];
        let device = validation::same_device(&tensors)?;
        let dtype = validation::same_dtype(&tensors)?.unwrap_or(Dtype::Float64);
        if !dtype.is_floating_point() {
            return Err(EeqError::UnsupportedType(dtype));
        }

        let shape = chi.shape();
        if shape.len() != 1 || tensors.iter().any(|t| t.shape() != shape) {
            return Err(EeqError::ShapeMismatch(format!(
                "Parameter tensors must be one-dimensional with equal length, got {:?}.",
                tensors.iter().map(|t| t.shape().to_vec()).collect::<Vec<_>>()
            )));
        }

        Ok(Self {
            chi,
            kcn,
            eta,
            rad,
            dtype,
            device,
        })
    }

    /// The floating dtype shared by all parameter tensors.
    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// The device all parameter tensors are placed on.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Electronegativities.
    pub fn chi(&self) -> &Tensor {
        &self.chi
    }

    /// Coordination-number scaling of the electronegativities.
    pub fn kcn(&self) -> &Tensor {
        &self.kcn
    }

    /// Chemical hardnesses.
    pub fn eta(&self) -> &Tensor {
        &self.eta
    }

    /// Gaussian charge widths.
    pub fn rad(&self) -> &Tensor {
        &self.rad
    }

    /// Returns a copy with all parameters cast to `dtype`.
    ///
    /// # Errors
    ///
    /// Returns `EeqError::UnsupportedType` for boolean and integer dtypes.
    pub fn to_dtype(&self, dtype: Dtype) -> Result<Self, EeqError> {
        if !dtype.is_floating_point() {
            return Err(EeqError::UnsupportedType(dtype));
        }
        Ok(Self {
            chi: self.chi.to_dtype(dtype),
            kcn: self.kcn.to_dtype(dtype),
            eta: self.eta.to_dtype(dtype),
            rad: self.rad.to_dtype(dtype),
            dtype,
            device: self.device,
        })
    }

    /// Returns a copy with all parameters placed on `device`.
    pub fn to_device(&self, device: Device) -> Self {
        Self {
            chi: self.chi.to_device(device),
            kcn: self.kcn.to_device(device),
            eta: self.eta.to_device(device),
            rad: self.rad.to_device(device),
            dtype: self.dtype,
            device,
        }
    }

    fn table(&self) -> ParameterTable {
        ParameterTable {
            chi: self.chi.to_vec_f64(),
            kcn: self.kcn.to_vec_f64(),
            eta: self.eta.to_vec_f64(),
            rad: self.rad.to_vec_f64(),
        }
    }
}

/// Host copy of the parameter columns used while building one batch.
struct ParameterTable {
    chi: Vec<f64>,
    kcn: Vec<f64>,
    eta: Vec<f64>,
    rad: Vec<f64>,
}

impl ParameterTable {
    fn lookup(&self, atomic_number: i64) -> Result<SiteParameters, EeqError> {
        let index = usize::try_from(atomic_number)
            .map_err(|_| EeqError::ParameterNotFound(atomic_number))?;
        let charge_width = self.rad.get(index).copied().unwrap_or(0.0);
        if charge_width <= 0.0 {
            return Err(EeqError::ParameterNotFound(atomic_number));
        }
        let covalent_radius = radii::covalent_radius_d3(index)
            .ok_or(EeqError::ParameterNotFound(atomic_number))?;
        Ok(SiteParameters {
            electronegativity: self.chi[index],
            cn_scaling: self.kcn[index],
            hardness: self.eta[index],
            charge_width,
            covalent_radius,
        })
    }
}

/// Charges and energies of a (batched) solve.
#[derive(Debug, Clone, PartialEq)]
pub struct EeqSolution {
    /// Partial charges with the shape of the atomic numbers, zero at padding
    /// and ghost slots.
    pub charges: Tensor,
    /// Per-atom EEQ energies in Hartree with the shape of the atomic numbers.
    pub energies: Tensor,
    /// Total EEQ energy per molecule, shape `(B)` or `()`.
    pub energy: Tensor,
}

/// The EEQ charge model.
///
/// # Examples
///
/// ```
/// use eeq::{Dtype, EeqModel, Tensor};
///
/// let model = EeqModel::param2019();
///
/// // Hydrogen fluoride, coordinates in Bohr.
/// let numbers = Tensor::from_i64(&[2], vec![9, 1]).unwrap();
/// let positions =
///     Tensor::from_f64(&[2, 3], vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.73], Dtype::Float64).unwrap();
/// let total_charge = Tensor::scalar(0.0, Dtype::Float64).unwrap();
/// let mask = numbers.ones_like();
///
/// let charges = model.charges(&numbers, &positions, &total_charge, &mask).unwrap();
/// let q = charges.to_vec_f64();
/// assert!(q[0] < 0.0);
/// assert!((q[0] + q[1]).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EeqModel {
    params: ChargeModel,
    options: SolverOptions,
}

impl From<ChargeModel> for EeqModel {
    fn from(params: ChargeModel) -> Self {
        Self {
            params,
            options: SolverOptions::default(),
        }
    }
}

impl EeqModel {
    /// Creates a model from four parameter tensors, see [`ChargeModel::new`].
    pub fn new(chi: Tensor, kcn: Tensor, eta: Tensor, rad: Tensor) -> Result<Self, EeqError> {
        ChargeModel::new(chi, kcn, eta, rad).map(Self::from)
    }

    /// Builds a model from a parameter table.
    ///
    /// # Arguments
    ///
    /// * `parameters` - The per-element table, e.g. from [`Parameters::load_from_file`].
    /// * `dtype` - The floating dtype of the model.
    /// * `device` - The device the parameter tensors are placed on.
    ///
    /// # Returns
    ///
    /// A model with default `SolverOptions` whose parameter tensors are indexed by atomic
    /// number, or `EeqError::UnsupportedType` if `dtype` is not floating point.
    pub fn from_parameters(
        parameters: &Parameters,
        dtype: Dtype,
        device: Device,
    ) -> Result<Self, EeqError> {
        let [chi, kcn, eta, rad] = parameters.to_columns();
        let shape = [chi.len()];
        let column = |values: Vec<f64>| -> Result<Tensor, EeqError> {
            Ok(Tensor::from_f64(&shape, values, dtype)?.on(device))
        };
        Self::new(column(chi)?, column(kcn)?, column(eta)?, column(rad)?)
    }

    /// The 2019 parametrization in double precision on the host.
    pub fn param2019() -> Self {
        Self::from_parameters(get_default_parameters(), Dtype::Float64, Device::Cpu)
            .expect("Failed to build the model from embedded parameters. This is a library bug.")
    }

    /// The 2019 parametrization with the given dtype and device.
    ///
    /// # Errors
    ///
    /// Returns `EeqError::UnsupportedType` if `dtype` is not floating point.
    pub fn param2019_with(dtype: Dtype, device: Device) -> Result<Self, EeqError> {
        Self::from_parameters(get_default_parameters(), dtype, device)
    }

    /// Replaces the solver options.
    pub fn with_options(mut self, options: SolverOptions) -> Self {
        self.options = options;
        self
    }

    /// The coordination-number options used by every solve.
    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// The underlying parameter tensors.
    pub fn charge_model(&self) -> &ChargeModel {
        &self.params
    }

    /// The dtype inputs must have and outputs are returned in.
    pub fn dtype(&self) -> Dtype {
        self.params.dtype()
    }

    /// The device inputs must be placed on.
    pub fn device(&self) -> Device {
        self.params.device()
    }

    /// Returns a copy computing in `dtype`, see [`ChargeModel::to_dtype`].
    ///
    /// # Examples
    ///
    /// ```
    /// use eeq::{Dtype, EeqModel};
    ///
    /// let model = EeqModel::param2019().to_dtype(Dtype::Float16).unwrap();
    /// assert_eq!(model.dtype(), Dtype::Float16);
    /// assert!(EeqModel::param2019().to_dtype(Dtype::Bool).is_err());
    /// ```
    pub fn to_dtype(&self, dtype: Dtype) -> Result<Self, EeqError> {
        Ok(Self {
            params: self.params.to_dtype(dtype)?,
            options: self.options,
        })
    }

    /// Returns a copy placed on `device`.
    pub fn to_device(&self, device: Device) -> Self {
        Self {
            params: self.params.to_device(device),
            options: self.options,
        }
    }

    /// Solves for the EEQ charges and energies.
    ///
    /// `numbers` has shape `(N)` or `(B, N)` with `0` marking padding. `positions`
    /// (Bohr) has shape `numbers.shape + (3)`. `total_charge` holds one value per
    /// molecule with shape `(B, 1)`, or `(1)` / `()` for a single molecule. `mask`
    /// has the shape of `numbers`; zero entries mark ghost atoms.
    ///
    /// # Arguments
    ///
    /// * `numbers` - Atomic numbers, `0` for padding.
    /// * `positions` - Cartesian coordinates in Bohr.
    /// * `total_charge` - Target charge of each molecule.
    /// * `mask` - Nonzero for real atoms, zero for ghost atoms.
    ///
    /// # Returns
    ///
    /// An [`EeqSolution`] with charges and energies in the model dtype on the model device.
    ///
    /// # Errors
    ///
    /// - `EeqError::DeviceMismatch` if any input is not on the model's device.
    /// - `EeqError::TypeMismatch` if `positions` or `total_charge` differ from the
    ///   model dtype, or `numbers` / `mask` are not integral.
    /// - `EeqError::ShapeMismatch` if the shapes do not follow the layout above.
    /// - `EeqError::ParameterNotFound` for atomic numbers without parameters.
    /// - `EeqError::NoChargeCarriers` if a molecule without real atoms has a
    ///   nonzero total charge.
    /// - `EeqError::LinalgError` if a molecule's system cannot be solved.
    pub fn solve(
        &self,
        numbers: &Tensor,
        positions: &Tensor,
        total_charge: &Tensor,
        mask: &Tensor,
    ) -> Result<EeqSolution, EeqError> {
        let layout = self.validate(numbers, positions, total_charge, mask, None)?;
        let molecules = self.molecules(numbers, positions, total_charge, mask, &layout)?;
        debug!(
            "solving {} EEQ system(s) with {} slots in {}",
            molecules.len(),
            layout.n_atoms,
            self.dtype()
        );

        let solutions = molecules
            .par_iter()
            .map(|molecule| solve_sites(&molecule.sites, molecule.total_charge, &self.options))
            .collect::<Result<Vec<_>, _>>()?;

        let energy: Vec<f64> = solutions.iter().map(|s| s.energies.iter().sum()).collect();
        let (charges, energies): (Vec<Vec<f64>>, Vec<Vec<f64>>) = solutions
            .into_iter()
            .map(|s| (s.charges, s.energies))
            .unzip();

        Ok(EeqSolution {
            charges: self.output(&layout.atom_shape(), charges.concat())?,
            energies: self.output(&layout.atom_shape(), energies.concat())?,
            energy: self.output(&layout.molecule_shape(), energy)?,
        })
    }

    /// Solves and returns only the charges.
    pub fn charges(
        &self,
        numbers: &Tensor,
        positions: &Tensor,
        total_charge: &Tensor,
        mask: &Tensor,
    ) -> Result<Tensor, EeqError> {
        Ok(self.solve(numbers, positions, total_charge, mask)?.charges)
    }

    /// Gradient of `Σ w_i q_i` with respect to the positions.
    ///
    /// `weights` has the shape of `numbers` and the model dtype; the result has
    /// the shape of `positions`. Summing the charges of one molecule (all weights
    /// one) gives a vanishing gradient since that sum is fixed by the constraint.
    ///
    /// # Arguments
    ///
    /// * `numbers`, `positions`, `total_charge`, `mask` - As for [`solve`](Self::solve).
    /// * `weights` - Weight `w_i` of every atom slot; padding and ghost weights are ignored.
    ///
    /// # Returns
    ///
    /// `∂(Σ w_i q_i)/∂R` in 1/Bohr with the shape of `positions`, zero at padding slots.
    /// Errors are reported as for [`solve`](Self::solve).
    pub fn charge_gradient(
        &self,
        numbers: &Tensor,
        positions: &Tensor,
        total_charge: &Tensor,
        mask: &Tensor,
        weights: &Tensor,
    ) -> Result<Tensor, EeqError> {
        let layout = self.validate(numbers, positions, total_charge, mask, Some(weights))?;
        let molecules = self.molecules(numbers, positions, total_charge, mask, &layout)?;
        let weights = weights.to_vec_f64();
        let n = layout.n_atoms;

        let gradients = molecules
            .par_iter()
            .enumerate()
            .map(|(m, molecule)| {
                charge_gradient_sites(
                    &molecule.sites,
                    molecule.total_charge,
                    &weights[m * n..(m + 1) * n],
                    &self.options,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.output(&layout.vector_shape(), flatten_vectors(gradients))
    }

    /// Gradient of the total EEQ energy with respect to the positions.
    pub fn energy_gradient(
        &self,
        numbers: &Tensor,
        positions: &Tensor,
        total_charge: &Tensor,
        mask: &Tensor,
    ) -> Result<Tensor, EeqError> {
        let layout = self.validate(numbers, positions, total_charge, mask, None)?;
        let molecules = self.molecules(numbers, positions, total_charge, mask, &layout)?;

        let gradients = molecules
            .par_iter()
            .map(|molecule| {
                energy_gradient_sites(&molecule.sites, molecule.total_charge, &self.options)
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.output(&layout.vector_shape(), flatten_vectors(gradients))
    }

    fn validate(
        &self,
        numbers: &Tensor,
        positions: &Tensor,
        total_charge: &Tensor,
        mask: &Tensor,
        weights: Option<&Tensor>,
    ) -> Result<Layout, EeqError> {
        let mut operands = vec![
            ("numbers", numbers),
            ("positions", positions),
            ("total_charge", total_charge),
            ("mask", mask),
        ];
        if let Some(weights) = weights {
            operands.push(("weights", weights));
        }
        validation::on_device(&operands, self.device())?;

        let floating: Vec<_> = operands
            .iter()
            .copied()
            .filter(|(name, _)| !matches!(*name, "numbers" | "mask"))
            .collect();
        validation::floating_as(&floating, self.dtype())?;
        validation::integral(("numbers", numbers), false)?;
        validation::integral(("mask", mask), true)?;

        let layout = validation::solve_layout(numbers, positions, total_charge, mask)?;
        if let Some(weights) = weights {
            if weights.shape() != layout.atom_shape().as_slice() {
                return Err(EeqError::ShapeMismatch(format!(
                    "Shape of 'weights' must be {:?} to match the atomic numbers, got {:?}.",
                    layout.atom_shape(),
                    weights.shape()
                )));
            }
        }
        Ok(layout)
    }

    fn molecules(
        &self,
        numbers: &Tensor,
        positions: &Tensor,
        total_charge: &Tensor,
        mask: &Tensor,
        layout: &Layout,
    ) -> Result<Vec<Molecule>, EeqError> {
        let table = self.params.table();
        let numbers = numbers.to_vec_i64();
        let positions = positions.to_vec_f64();
        let mask = mask.to_vec_i64();
        let total_charge = total_charge.to_vec_f64();
        let n = layout.n_atoms;

        (0..layout.n_molecules())
            .map(|m| {
                let sites = (m * n..(m + 1) * n)
                    .map(|slot| {
                        let atomic_number = numbers[slot];
                        if atomic_number == 0 {
                            return Ok(Site::padding());
                        }
                        Ok(Site {
                            position: [
                                positions[3 * slot],
                                positions[3 * slot + 1],
                                positions[3 * slot + 2],
                            ],
                            kind: if mask[slot] != 0 {
                                SiteKind::Real
                            } else {
                                SiteKind::Ghost
                            },
                            params: table.lookup(atomic_number)?,
                        })
                    })
                    .collect::<Result<Vec<_>, EeqError>>()?;
                Ok(Molecule {
                    sites,
                    total_charge: total_charge[m],
                })
            })
            .collect()
    }

    fn output(&self, shape: &[usize], values: Vec<f64>) -> Result<Tensor, EeqError> {
        Ok(Tensor::from_f64(shape, values, self.dtype())?.on(self.device()))
    }
}

struct Molecule {
    sites: Vec<Site>,
    total_charge: f64,
}

fn flatten_vectors(gradients: Vec<Vec<[f64; 3]>>) -> Vec<f64> {
    gradients.into_iter().flatten().flatten().collect()
}
