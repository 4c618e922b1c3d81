use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::Declaration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceId(pub u32);

/// Dotted module path that prefixes every declaration name of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ModulePath {
    segments: Vec<String>,
}

impl ModulePath {
    pub fn new(path: &str) -> Self {
        let segments = path
            .split(['.', '/'])
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn qualify(&self, name: &str) -> String {
        if self.is_root() {
            name.to_string()
        } else {
            format!("{self}.{name}")
        }
    }

    /// Names tried, in order, when `name` is referenced from inside this module.
    pub fn candidates(&self, name: &str) -> Vec<String> {
        if self.is_root() {
            vec![name.to_string()]
        } else {
            vec![self.qualify(name), name.to_string()]
        }
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<String> for ModulePath {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<ModulePath> for String {
    fn from(value: ModulePath) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid declaration table: {0}")]
    Json(#[from] serde_json::Error),
}

/// One unit's worth of declarations, already flattened by import resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub id: SourceId,
    #[serde(default)]
    pub module: ModulePath,
    #[serde(default)]
    pub path: Option<PathBuf>,
    pub declarations: Vec<Declaration>,
}

impl CompilationUnit {
    pub fn new(id: SourceId, module: ModulePath, declarations: Vec<Declaration>) -> Self {
        Self {
            id,
            module,
            path: None,
            declarations,
        }
    }

    pub fn from_json_str(source: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut unit = Self::from_json_str(&contents)?;
        if unit.path.is_none() {
            unit.path = Some(path.to_path_buf());
        }
        Ok(unit)
    }
}
