//! Shaped numeric containers carrying a precision tag and a device tag.
//!
//! A [`Tensor`] is the unit of exchange with the charge model. It stores its
//! values in an [`ndarray::ArrayD`], remembers the [`Dtype`] the values are
//! represented in, and records the [`Device`] it is placed on. Floating values
//! are kept in `f64` storage but are always rounded to the precision of their
//! dtype, so a `Float32` tensor holds exactly the values an `f32` buffer would.
//!
//! Devices are placement tags. Every kernel in this crate runs on the host;
//! the tag exists so that the model can enforce that all operands of a call
//! were placed consistently by the caller.

use crate::error::EeqError;
use ndarray::{ArrayD, IxDyn};
use std::fmt;
use std::str::FromStr;

/// Numeric representation of tensor elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dtype {
    Bool,
    UInt8,
    Int32,
    Int64,
    Float16,
    Float32,
    Float64,
}

impl Dtype {
    /// Returns `true` for the half, single and double precision dtypes.
    pub fn is_floating_point(self) -> bool {
        matches!(self, Dtype::Float16 | Dtype::Float32 | Dtype::Float64)
    }

    /// Returns `true` for the integer dtypes (booleans excluded).
    pub fn is_integer(self) -> bool {
        matches!(self, Dtype::UInt8 | Dtype::Int32 | Dtype::Int64)
    }

    /// Short name used in messages and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Dtype::Bool => "bool",
            Dtype::UInt8 => "uint8",
            Dtype::Int32 => "int32",
            Dtype::Int64 => "int64",
            Dtype::Float16 => "float16",
            Dtype::Float32 => "float32",
            Dtype::Float64 => "float64",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dtype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bool" => Ok(Dtype::Bool),
            "uint8" | "u8" => Ok(Dtype::UInt8),
            "int32" | "i32" => Ok(Dtype::Int32),
            "int64" | "i64" | "long" => Ok(Dtype::Int64),
            "float16" | "f16" | "half" => Ok(Dtype::Float16),
            "float32" | "f32" | "float" | "single" => Ok(Dtype::Float32),
            "float64" | "f64" | "double" => Ok(Dtype::Float64),
            other => Err(format!("unknown dtype '{other}'")),
        }
    }
}

/// Compute device a tensor is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    #[default]
    Cpu,
    /// Accelerator with its ordinal.
    Cuda(usize),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(index) => write!(f, "cuda:{index}"),
        }
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda(0)),
            _ => lower
                .strip_prefix("cuda:")
                .and_then(|index| index.parse().ok())
                .map(Device::Cuda)
                .ok_or_else(|| format!("unknown device '{s}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Storage {
    Bool(ArrayD<bool>),
    Int(ArrayD<i64>),
    Float(ArrayD<f64>),
}

/// An n-dimensional array tagged with a [`Dtype`] and a [`Device`].
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    storage: Storage,
    dtype: Dtype,
    device: Device,
}

impl Tensor {
    /// Creates a floating tensor of the given shape, rounding every value to `dtype`.
    ///
    /// # Errors
    ///
    /// Returns [`EeqError::UnsupportedType`] if `dtype` is not floating point and
    /// [`EeqError::ShapeMismatch`] if `data` does not fill `shape`.
    ///
    /// # Examples
    ///
    /// ```
    /// use eeq::{Dtype, Tensor};
    ///
    /// let t = Tensor::from_f64(&[2, 3], vec![0.0; 6], Dtype::Float32).unwrap();
    /// assert_eq!(t.shape(), &[2, 3]);
    /// assert_eq!(t.dtype(), Dtype::Float32);
    /// ```
    pub fn from_f64(shape: &[usize], data: Vec<f64>, dtype: Dtype) -> Result<Self, EeqError> {
        if !dtype.is_floating_point() {
            return Err(EeqError::UnsupportedType(dtype));
        }
        let array = shaped(shape, data)?;
        Ok(Self {
            storage: Storage::Float(array.mapv(|v| round_to(v, dtype))),
            dtype,
            device: Device::Cpu,
        })
    }

    /// Creates an `Int64` tensor of the given shape.
    pub fn from_i64(shape: &[usize], data: Vec<i64>) -> Result<Self, EeqError> {
        Ok(Self {
            storage: Storage::Int(shaped(shape, data)?),
            dtype: Dtype::Int64,
            device: Device::Cpu,
        })
    }

    /// Creates a `Bool` tensor of the given shape.
    pub fn from_bool(shape: &[usize], data: Vec<bool>) -> Result<Self, EeqError> {
        Ok(Self {
            storage: Storage::Bool(shaped(shape, data)?),
            dtype: Dtype::Bool,
            device: Device::Cpu,
        })
    }

    /// Creates a 0-dimensional floating tensor.
    pub fn scalar(value: f64, dtype: Dtype) -> Result<Self, EeqError> {
        Self::from_f64(&[], vec![value], dtype)
    }

    /// Creates a tensor filled with zeros.
    pub fn zeros(shape: &[usize], dtype: Dtype) -> Self {
        let dim = IxDyn(shape);
        let storage = match dtype {
            Dtype::Bool => Storage::Bool(ArrayD::from_elem(dim, false)),
            d if d.is_integer() => Storage::Int(ArrayD::zeros(dim)),
            _ => Storage::Float(ArrayD::zeros(dim)),
        };
        Self {
            storage,
            dtype,
            device: Device::Cpu,
        }
    }

    /// Returns a tensor of ones with the shape, dtype and device of `self`.
    pub fn ones_like(&self) -> Self {
        let storage = match &self.storage {
            Storage::Bool(a) => Storage::Bool(a.mapv(|_| true)),
            Storage::Int(a) => Storage::Int(a.mapv(|_| 1)),
            Storage::Float(a) => Storage::Float(a.mapv(|_| 1.0)),
        };
        Self {
            storage,
            dtype: self.dtype,
            device: self.device,
        }
    }

    /// The precision the values are represented in.
    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// The device the tensor is placed on.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Extent of each axis; empty for a 0-dimensional tensor.
    pub fn shape(&self) -> &[usize] {
        match &self.storage {
            Storage::Bool(a) => a.shape(),
            Storage::Int(a) => a.shape(),
            Storage::Float(a) => a.shape(),
        }
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    /// Returns `true` if any axis has zero extent.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy converted to `dtype`.
    ///
    /// Floating values are rounded to the target precision, floating to
    /// integer conversion truncates toward zero, and any nonzero value becomes
    /// `true` when converting to `Bool`.
    pub fn to_dtype(&self, dtype: Dtype) -> Tensor {
        let storage = match dtype {
            Dtype::Bool => Storage::Bool(match &self.storage {
                Storage::Bool(a) => a.clone(),
                Storage::Int(a) => a.mapv(|v| v != 0),
                Storage::Float(a) => a.mapv(|v| v != 0.0),
            }),
            d if d.is_integer() => Storage::Int(match &self.storage {
                Storage::Bool(a) => a.mapv(i64::from),
                Storage::Int(a) => a.mapv(|v| wrap_integer(v, d)),
                Storage::Float(a) => a.mapv(|v| wrap_integer(v as i64, d)),
            }),
            d => Storage::Float(match &self.storage {
                Storage::Bool(a) => a.mapv(|v| if v { 1.0 } else { 0.0 }),
                Storage::Int(a) => a.mapv(|v| round_to(v as f64, d)),
                Storage::Float(a) => a.mapv(|v| round_to(v, d)),
            }),
        };
        Tensor {
            storage,
            dtype,
            device: self.device,
        }
    }

    /// Returns a copy placed on `device`.
    pub fn to_device(&self, device: Device) -> Tensor {
        Tensor {
            device,
            ..self.clone()
        }
    }

    /// Consumes the tensor and places it on `device`.
    pub fn on(mut self, device: Device) -> Tensor {
        self.device = device;
        self
    }

    /// Values in logical (row-major) order, converted to `f64`.
    pub fn to_vec_f64(&self) -> Vec<f64> {
        match &self.storage {
            Storage::Bool(a) => a.iter().map(|&v| if v { 1.0 } else { 0.0 }).collect(),
            Storage::Int(a) => a.iter().map(|&v| v as f64).collect(),
            Storage::Float(a) => a.iter().copied().collect(),
        }
    }

    /// Values in logical (row-major) order, converted to `i64`.
    pub fn to_vec_i64(&self) -> Vec<i64> {
        match &self.storage {
            Storage::Bool(a) => a.iter().map(|&v| i64::from(v)).collect(),
            Storage::Int(a) => a.iter().copied().collect(),
            Storage::Float(a) => a.iter().map(|&v| v as i64).collect(),
        }
    }
}

fn shaped<T>(shape: &[usize], data: Vec<T>) -> Result<ArrayD<T>, EeqError> {
    let expected: usize = shape.iter().product();
    let got = data.len();
    ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|_| {
        EeqError::ShapeMismatch(format!(
            "Cannot build a tensor of shape {shape:?} ({expected} elements) from {got} values."
        ))
    })
}

fn wrap_integer(value: i64, dtype: Dtype) -> i64 {
    match dtype {
        Dtype::UInt8 => value as u8 as i64,
        Dtype::Int32 => value as i32 as i64,
        _ => value,
    }
}

/// Rounds `value` to the nearest value representable in `dtype`.
pub(crate) fn round_to(value: f64, dtype: Dtype) -> f64 {
    match dtype {
        Dtype::Float16 => round_to_half(value),
        Dtype::Float32 => value as f32 as f64,
        _ => value,
    }
}

/// Rounds to the nearest IEEE 754 binary16 value (ties to even), including
/// subnormals and overflow to infinity.
fn round_to_half(value: f64) -> f64 {
    const MAX_HALF: f64 = 65504.0;
    const MIN_NORMAL_EXPONENT: f64 = -14.0;
    const MANTISSA_BITS: f64 = 10.0;

    if !value.is_finite() || value == 0.0 {
        return value;
    }
    let magnitude = value.abs();
    let exponent = magnitude.log2().floor().max(MIN_NORMAL_EXPONENT);
    let ulp = (exponent - MANTISSA_BITS).exp2();
    let rounded = (magnitude / ulp).round_ties_even() * ulp;
    if rounded > MAX_HALF {
        f64::INFINITY.copysign(value)
    } else {
        rounded.copysign(value)
    }
}
