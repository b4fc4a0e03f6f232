use crate::tensor::Dtype;
use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for all fallible operations in the `eeq` library.
///
/// Contract violations at the API boundary (mixed precisions, mixed devices,
/// incompatible shapes) are reported before any numerical work starts. The
/// message of each variant names the offending property so calling code can
/// match on the text as well as on the variant.
#[derive(Error, Debug)]
pub enum EeqError {
    /// Tensors that must share one numeric precision do not, or a tensor has
    /// the wrong kind of dtype (e.g. floating atomic numbers).
    #[error("{0}")]
    TypeMismatch(String),

    /// Tensors that must live on one compute device do not.
    #[error("{0}")]
    DeviceMismatch(String),

    /// A conversion to a dtype outside the supported floating-point set was
    /// requested.
    #[error("Only floating point dtypes are supported for the charge model, got '{0}'.")]
    UnsupportedType(Dtype),

    /// Tensor shapes are incompatible with each other or with the expected
    /// batch layout.
    #[error("{0}")]
    ShapeMismatch(String),

    /// No EEQ parameters are available for the given atomic number.
    ///
    /// Raised for elements missing from a custom parameter table, for atomic
    /// numbers beyond the covalent radius table, and for negative numbers.
    #[error("EEQ parameters not found for element with atomic number: {0}")]
    ParameterNotFound(i64),

    /// A nonzero total charge was requested for a molecule without real atoms.
    ///
    /// Padding and ghost slots never carry charge, so the constraint cannot be
    /// met. The requested charge is provided for diagnostic purposes.
    #[error("Cannot place total charge {0} on a molecule without real atoms")]
    NoChargeCarriers(f64),

    /// The linear system could not be solved, typically because it is singular.
    #[error("Failed to solve the linear matrix system: {0}")]
    LinalgError(String),

    /// An I/O error that occurred while attempting to read a parameter file.
    #[error("I/O error at path '{path}': {source}")]
    IoError {
        /// The path of the file that caused the I/O error.
        path: PathBuf,
        /// The underlying `std::io::Error`.
        #[source]
        source: std::io::Error,
    },

    /// A parameter file is not valid TOML or does not match the expected layout.
    #[error("Failed to deserialize TOML parameters: {0}")]
    DeserializationError(#[from] toml::de::Error),

    /// At least one atom is required for a calculation.
    #[error("Input validation failed: at least one atom is required for a calculation")]
    NoAtoms,
}
