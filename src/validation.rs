//! Consistency checks shared by every public entry point.
//!
//! The charge model validates its operands eagerly, before any numerical work:
//! device placement first, then dtypes, then shapes. Each check returns the
//! offending property in its error message.

use crate::error::EeqError;
use crate::tensor::{Device, Dtype, Tensor};

/// A named operand of a public call, used for error messages.
pub(crate) type Operand<'a> = (&'a str, &'a Tensor);

/// Checks that all tensors share one device and returns it.
pub(crate) fn same_device(tensors: &[&Tensor]) -> Result<Device, EeqError> {
    let device = tensors.first().map(|t| t.device()).unwrap_or_default();
    if tensors.iter().any(|t| t.device() != device) {
        return Err(EeqError::DeviceMismatch(
            "All tensors must be on the same device!".to_string(),
        ));
    }
    Ok(device)
}

/// Checks that all tensors share one dtype and returns it.
pub(crate) fn same_dtype(tensors: &[&Tensor]) -> Result<Option<Dtype>, EeqError> {
    let dtype = tensors.first().map(|t| t.dtype());
    if tensors.iter().any(|t| Some(t.dtype()) != dtype) {
        return Err(EeqError::TypeMismatch(
            "All tensors must have the same dtype!".to_string(),
        ));
    }
    Ok(dtype)
}

/// Checks that every operand is placed on `device`.
pub(crate) fn on_device(operands: &[Operand<'_>], device: Device) -> Result<(), EeqError> {
    for (name, tensor) in operands {
        if tensor.device() != device {
            return Err(EeqError::DeviceMismatch(format!(
                "All tensors must be on the same device! The model is on '{device}' but \
                 '{name}' is on '{}'.",
                tensor.device()
            )));
        }
    }
    Ok(())
}

/// Checks that every operand is floating point with exactly `dtype`.
pub(crate) fn floating_as(operands: &[Operand<'_>], dtype: Dtype) -> Result<(), EeqError> {
    for (name, tensor) in operands {
        if tensor.dtype() != dtype {
            return Err(EeqError::TypeMismatch(format!(
                "All tensors must have the same dtype! The model uses '{dtype}' but '{name}' \
                 is '{}'.",
                tensor.dtype()
            )));
        }
    }
    Ok(())
}

/// Checks that an operand holds integers (or booleans when `allow_bool` is set).
pub(crate) fn integral(operand: Operand<'_>, allow_bool: bool) -> Result<(), EeqError> {
    let (name, tensor) = operand;
    let dtype = tensor.dtype();
    if dtype.is_integer() || (allow_bool && dtype == Dtype::Bool) {
        Ok(())
    } else {
        Err(EeqError::TypeMismatch(format!(
            "'{name}' must be an integer tensor, got '{dtype}'."
        )))
    }
}

/// Batch layout implied by the atomic numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Layout {
    /// Number of molecules, `None` for unbatched input.
    pub batch: Option<usize>,
    /// Number of atom slots per molecule.
    pub n_atoms: usize,
}

impl Layout {
    pub fn n_molecules(&self) -> usize {
        self.batch.unwrap_or(1)
    }

    /// Shape of per-atom tensors.
    pub fn atom_shape(&self) -> Vec<usize> {
        match self.batch {
            Some(b) => vec![b, self.n_atoms],
            None => vec![self.n_atoms],
        }
    }

    /// Shape of per-atom vector tensors such as positions.
    pub fn vector_shape(&self) -> Vec<usize> {
        let mut shape = self.atom_shape();
        shape.push(3);
        shape
    }

    /// Shape of per-molecule tensors, `(B)` or `()`.
    pub fn molecule_shape(&self) -> Vec<usize> {
        self.batch.map(|b| vec![b]).unwrap_or_default()
    }

    /// Expected shape of the total charge: the batch shape with a trailing
    /// singleton atom axis.
    pub fn charge_shape(&self) -> Vec<usize> {
        let mut shape = self.molecule_shape();
        shape.push(1);
        shape
    }
}

/// Derives the batch layout from `numbers` and checks the other operands against it.
pub(crate) fn solve_layout(
    numbers: &Tensor,
    positions: &Tensor,
    total_charge: &Tensor,
    mask: &Tensor,
) -> Result<Layout, EeqError> {
    let layout = match *numbers.shape() {
        [n] => Layout {
            batch: None,
            n_atoms: n,
        },
        [b, n] => Layout {
            batch: Some(b),
            n_atoms: n,
        },
        ref other => {
            return Err(EeqError::ShapeMismatch(format!(
                "Atomic numbers must have shape (N) or (B, N), got {other:?}."
            )));
        }
    };

    let expect = |name: &str, tensor: &Tensor, shape: &[usize]| {
        if tensor.shape() == shape {
            Ok(())
        } else {
            Err(EeqError::ShapeMismatch(format!(
                "Shape of '{name}' must be {shape:?} to match the atomic numbers, got {:?}.",
                tensor.shape()
            )))
        }
    };

    expect("positions", positions, &layout.vector_shape())?;
    expect("mask", mask, &layout.atom_shape())?;

    let scalar_ok = layout.batch.is_none() && total_charge.ndim() == 0;
    if !scalar_ok {
        expect("total_charge", total_charge, &layout.charge_shape())?;
    }

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(shape: &[usize]) -> Tensor {
        Tensor::zeros(shape, Dtype::Float64)
    }

    fn ints(shape: &[usize]) -> Tensor {
        Tensor::zeros(shape, Dtype::Int64)
    }

    #[test]
    fn test_same_device() {
        let a = floats(&[3]);
        let b = floats(&[3]).on(Device::Cuda(0));
        assert_eq!(same_device(&[&a, &a]).unwrap(), Device::Cpu);
        let err = same_device(&[&a, &b]).unwrap_err();
        assert!(err.to_string().contains("must be on the same device!"));
    }

    #[test]
    fn test_same_dtype() {
        let a = floats(&[3]);
        let b = a.to_dtype(Dtype::Float32);
        assert_eq!(same_dtype(&[&a, &a]).unwrap(), Some(Dtype::Float64));
        assert!(matches!(
            same_dtype(&[&a, &b]),
            Err(EeqError::TypeMismatch(_))
        ));
        assert_eq!(same_dtype(&[]).unwrap(), None);
    }

    #[test]
    fn test_operand_checks_name_the_operand() {
        let p = floats(&[2, 3]).on(Device::Cuda(1));
        let err = on_device(&[("positions", &p)], Device::Cpu).unwrap_err();
        assert!(err.to_string().contains("'positions'"));

        let q = floats(&[]).to_dtype(Dtype::Float16);
        let err = floating_as(&[("total_charge", &q)], Dtype::Float64).unwrap_err();
        assert!(err.to_string().contains("'total_charge' is 'float16'"));

        let f = floats(&[2]);
        assert!(integral(("numbers", &f), false).is_err());
        let mask = Tensor::from_bool(&[2], vec![true, false]).unwrap();
        assert!(integral(("mask", &mask), true).is_ok());
        assert!(integral(("numbers", &mask), false).is_err());
    }

    #[test]
    fn test_solve_layout_single_molecule() {
        let layout =
            solve_layout(&ints(&[5]), &floats(&[5, 3]), &floats(&[]), &ints(&[5])).unwrap();
        assert_eq!(layout.batch, None);
        assert_eq!(layout.n_atoms, 5);
        assert_eq!(layout.n_molecules(), 1);
        assert!(solve_layout(&ints(&[5]), &floats(&[5, 3]), &floats(&[1]), &ints(&[5])).is_ok());
    }

    #[test]
    fn test_solve_layout_batched() {
        let layout = solve_layout(
            &ints(&[2, 4]),
            &floats(&[2, 4, 3]),
            &floats(&[2, 1]),
            &ints(&[2, 4]),
        )
        .unwrap();
        assert_eq!(layout.batch, Some(2));
        assert_eq!(layout.molecule_shape(), vec![2]);
    }

    #[test]
    fn test_solve_layout_rejects_mismatches() {
        let bad_charge =
            solve_layout(&ints(&[1, 5]), &floats(&[1, 5, 3]), &floats(&[1]), &ints(&[1, 5]));
        assert!(matches!(bad_charge, Err(EeqError::ShapeMismatch(_))));

        let bad_positions =
            solve_layout(&ints(&[5]), &floats(&[4, 3]), &floats(&[]), &ints(&[5]));
        assert!(matches!(bad_positions, Err(EeqError::ShapeMismatch(_))));

        let bad_mask = solve_layout(&ints(&[5]), &floats(&[5, 3]), &floats(&[]), &ints(&[4]));
        assert!(matches!(bad_mask, Err(EeqError::ShapeMismatch(_))));

        let bad_rank = solve_layout(
            &ints(&[1, 1, 5]),
            &floats(&[1, 1, 5, 3]),
            &floats(&[1, 1, 1]),
            &ints(&[1, 1, 5]),
        );
        assert!(matches!(bad_rank, Err(EeqError::ShapeMismatch(_))));
    }
}
