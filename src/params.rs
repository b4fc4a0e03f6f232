//! This module provides the per-element EEQ parameters and utilities for loading them from TOML.
//!
//! It defines the `ElementData` struct holding the four constants of the electronegativity
//! equilibration model, and the `Parameters` struct collecting them per atomic number. Element
//! keys in TOML files may be atomic numbers or element symbols.

use super::elements::symbol_to_atomic_number;
use super::error::EeqError;
use serde::Deserialize;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// EEQ parameters of one element, in atomic units.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ElementData {
    /// Electronegativity χ in Hartree.
    #[serde(rename = "chi")]
    pub electronegativity: f64,
    /// Chemical hardness η in Hartree.
    ///
    /// Combined with the self-interaction of the Gaussian charge distribution it forms the
    /// diagonal of the EEQ matrix. It may be negative for some elements.
    #[serde(rename = "eta")]
    pub hardness: f64,
    /// Scaling κ of the coordination-number dependence of the electronegativity, in Hartree.
    #[serde(rename = "kcn")]
    pub cn_scaling: f64,
    /// Width of the Gaussian charge distribution in Bohr.
    #[serde(rename = "rad")]
    pub charge_width: f64,
}

/// A collection of EEQ parameters for multiple elements.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Parameters {
    /// A mapping from atomic number to the corresponding element parameters.
    #[serde(deserialize_with = "deserialize_element_map")]
    pub elements: HashMap<u8, ElementData>,
}

impl Parameters {
    /// Loads EEQ parameters from a TOML file.
    ///
    /// The file must contain an `[elements]` table keyed by atomic number or element symbol.
    ///
    /// # Errors
    ///
    /// Returns `EeqError::IoError` if the file cannot be read, or
    /// `EeqError::DeserializationError` if the content is invalid.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use eeq::Parameters;
    /// use std::path::Path;
    ///
    /// let params = Parameters::load_from_file(Path::new("eeq.toml")).unwrap();
    /// ```
    pub fn load_from_file(path: &Path) -> Result<Self, EeqError> {
        let content = std::fs::read_to_string(path).map_err(|io_error| EeqError::IoError {
            path: path.to_path_buf(),
            source: io_error,
        })?;

        Self::load_from_str(&content)
    }

    /// Parses EEQ parameters from a TOML string.
    ///
    /// # Examples
    ///
    /// ```
    /// use eeq::Parameters;
    ///
    /// let toml_data = r#"
    /// [elements]
    /// "1" = { chi = 1.23695041, eta = -0.35015861, kcn = 0.04916110, rad = 0.55159092 }
    /// "C" = { chi = 1.40028282, eta = 0.19408787, kcn = 0.06005196, rad = 1.88862966 }
    /// "#;
    ///
    /// let params = Parameters::load_from_str(toml_data).unwrap();
    /// assert_eq!(params.elements.len(), 2);
    /// assert!(params.elements.contains_key(&6));
    /// ```
    pub fn load_from_str(toml_str: &str) -> Result<Self, EeqError> {
        toml::from_str(toml_str).map_err(EeqError::from)
    }

    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Parameters {
            elements: HashMap::new(),
        }
    }

    /// Looks up the parameters of one element.
    pub fn get(&self, atomic_number: u8) -> Result<&ElementData, EeqError> {
        self.elements
            .get(&atomic_number)
            .ok_or(EeqError::ParameterNotFound(i64::from(atomic_number)))
    }

    /// Largest atomic number with parameters, 0 for an empty set.
    pub fn max_atomic_number(&self) -> u8 {
        self.elements.keys().copied().max().unwrap_or(0)
    }

    /// Flattens the table into four columns indexed by atomic number.
    ///
    /// Index 0 (the padding sentinel) and elements without parameters hold zeros.
    /// The columns are returned as `[chi, kcn, eta, rad]`.
    pub fn to_columns(&self) -> [Vec<f64>; 4] {
        let len = usize::from(self.max_atomic_number()) + 1;
        let mut columns = [vec![0.0; len], vec![0.0; len], vec![0.0; len], vec![0.0; len]];
        for (&z, data) in &self.elements {
            let z = usize::from(z);
            columns[0][z] = data.electronegativity;
            columns[1][z] = data.cn_scaling;
            columns[2][z] = data.hardness;
            columns[3][z] = data.charge_width;
        }
        columns
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserializes a map of element data whose keys are atomic numbers or element symbols.
fn deserialize_element_map<'de, D>(deserializer: D) -> Result<HashMap<u8, ElementData>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ElementMapVisitor;

    impl<'de> Visitor<'de> for ElementMapVisitor {
        type Value = HashMap<u8, ElementData>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map from atomic number or symbol to element data")
        }

        fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
        where
            M: MapAccess<'de>,
        {
            let mut elements = HashMap::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, ElementData>()? {
                let atomic_number = match key.parse::<u8>() {
                    Ok(0) => {
                        return Err(de::Error::custom(
                            "atomic number 0 is reserved for padding",
                        ));
                    }
                    Ok(number) => number,
                    Err(_) => symbol_to_atomic_number(&key).ok_or_else(|| {
                        de::Error::custom(format!("invalid element key: '{}'", key))
                    })?,
                };
                if value.charge_width <= 0.0 {
                    return Err(de::Error::custom(format!(
                        "charge width of element '{}' must be positive",
                        key
                    )));
                }
                elements.insert(atomic_number, value);
            }
            Ok(elements)
        }
    }

    deserializer.deserialize_map(ElementMapVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_toml_string() -> String {
        r#"
        [elements]
        "1" = { chi = 1.23695041, eta = -0.35015861, kcn = 0.04916110, rad = 0.55159092 }
        "Fe" = { chi = 1.04025281, eta = -0.15270393, kcn = -0.04163215, rad = 1.02766713 }
        "O" = { chi = 1.56866440, eta = 0.03151644, kcn = 0.11689703, rad = 1.23166285 }
        "#
        .to_string()
    }

    fn get_expected_parameters() -> Parameters {
        let mut elements = HashMap::new();
        elements.insert(
            1,
            ElementData {
                electronegativity: 1.23695041,
                hardness: -0.35015861,
                cn_scaling: 0.04916110,
                charge_width: 0.55159092,
            },
        );
        elements.insert(
            26,
            ElementData {
                electronegativity: 1.04025281,
                hardness: -0.15270393,
                cn_scaling: -0.04163215,
                charge_width: 1.02766713,
            },
        );
        elements.insert(
            8,
            ElementData {
                electronegativity: 1.56866440,
                hardness: 0.03151644,
                cn_scaling: 0.11689703,
                charge_width: 1.23166285,
            },
        );
        Parameters { elements }
    }

    #[test]
    fn test_load_from_str_valid() {
        let params = Parameters::load_from_str(&create_test_toml_string()).unwrap();
        assert_eq!(params, get_expected_parameters());
    }

    #[test]
    fn test_load_from_str_invalid_toml() {
        let result = Parameters::load_from_str("this is not valid toml");
        assert!(matches!(result, Err(EeqError::DeserializationError(_))));
    }

    #[test]
    fn test_load_from_str_invalid_element_key() {
        let toml_str = r#"
        [elements]
        "InvalidKey" = { chi = 1.0, eta = 1.0, kcn = 0.0, rad = 1.0 }
        "#;
        let error_string = Parameters::load_from_str(toml_str)
            .unwrap_err()
            .to_string();
        assert!(error_string.contains("invalid element key: 'InvalidKey'"));
    }

    #[test]
    fn test_load_from_str_rejects_padding_key() {
        let toml_str = r#"
        [elements]
        "0" = { chi = 1.0, eta = 1.0, kcn = 0.0, rad = 1.0 }
        "#;
        let error_string = Parameters::load_from_str(toml_str)
            .unwrap_err()
            .to_string();
        assert!(error_string.contains("reserved for padding"));
    }

    #[test]
    fn test_load_from_str_rejects_nonpositive_width() {
        let toml_str = r#"
        [elements]
        "C" = { chi = 1.0, eta = 1.0, kcn = 0.0, rad = 0.0 }
        "#;
        let result = Parameters::load_from_str(toml_str);
        assert!(matches!(result, Err(EeqError::DeserializationError(_))));
    }

    #[test]
    fn test_load_from_str_missing_field() {
        let toml_str = r#"
        [elements]
        "1" = { chi = 1.2, eta = -0.35, rad = 0.55 } # Missing 'kcn'
        "#;
        let result = Parameters::load_from_str(toml_str);
        assert!(matches!(result, Err(EeqError::DeserializationError(_))));
    }

    #[test]
    fn test_load_from_str_unknown_field() {
        let toml_str = r#"
        [elements]
        "H" = { chi = 1.2, eta = -0.35, kcn = 0.05, rad = 0.55, gamma = 1.0 }
        "#;
        let result = Parameters::load_from_str(toml_str);
        assert!(matches!(result, Err(EeqError::DeserializationError(_))));
    }

    #[test]
    fn test_load_from_file_valid() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", create_test_toml_string()).unwrap();

        let params = Parameters::load_from_file(temp_file.path()).unwrap();
        assert_eq!(params, get_expected_parameters());
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = Parameters::load_from_file(Path::new("non_existent_file.toml"));
        assert!(matches!(result, Err(EeqError::IoError { .. })));
    }

    #[test]
    fn test_get_and_columns() {
        let params = get_expected_parameters();
        assert!(matches!(params.get(2), Err(EeqError::ParameterNotFound(2))));
        assert_eq!(params.max_atomic_number(), 26);

        let [chi, kcn, eta, rad] = params.to_columns();
        assert_eq!(chi.len(), 27);
        assert_eq!(chi[0], 0.0);
        assert_eq!(chi[8], 1.56866440);
        assert_eq!(kcn[1], 0.04916110);
        assert_eq!(eta[26], -0.15270393);
        assert_eq!(rad[2], 0.0);
    }

    #[test]
    fn test_new_and_default() {
        assert_eq!(Parameters::new(), Parameters::default());
        assert_eq!(Parameters::new().max_atomic_number(), 0);
    }
}
