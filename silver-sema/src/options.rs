use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::PrimitiveKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckOptions {
    /// Diagnostics kept before the rest are only counted.
    pub max_diagnostics: usize,
    /// Lower units and resolve composition components on the rayon pool.
    pub parallel: bool,
    /// Treat warnings as blocking when deciding codegen eligibility.
    pub warnings_as_errors: bool,
    pub default_integer: PrimitiveKind,
    pub default_float: PrimitiveKind,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            max_diagnostics: 256,
            parallel: true,
            warnings_as_errors: false,
            default_integer: PrimitiveKind::Int64,
            default_float: PrimitiveKind::Float64,
        }
    }
}

impl CheckOptions {
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let options: CheckOptions =
            serde_yaml::from_str(source).context("invalid check options")?;
        options.validate()?;
        Ok(options)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read options from '{}'", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("failed to load options from '{}'", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if !self.default_integer.is_integer() {
            anyhow::bail!(
                "default_integer must be an integer kind, found {}",
                self.default_integer
            );
        }
        if !self.default_float.is_float() {
            anyhow::bail!(
                "default_float must be a float kind, found {}",
                self.default_float
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let options = CheckOptions::from_yaml_str("{}").unwrap();
        assert_eq!(options, CheckOptions::default());
    }

    #[test]
    fn overrides_individual_fields() {
        let options =
            CheckOptions::from_yaml_str("parallel: false\ndefault_integer: int32\n").unwrap();
        assert!(!options.parallel);
        assert_eq!(options.default_integer, PrimitiveKind::Int32);
        assert_eq!(options.max_diagnostics, 256);
    }

    #[test]
    fn rejects_float_as_default_integer() {
        let error = CheckOptions::from_yaml_str("default_integer: float64").unwrap_err();
        assert!(error.to_string().contains("default_integer"));
    }
}
