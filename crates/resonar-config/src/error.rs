//! Configuration and preset errors.

use std::fmt;
use std::path::PathBuf;

use resonar_synth::PortError;
use thiserror::Error;

use crate::validation::ValidationError;

/// File-system step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    /// Reading a config or preset file
    Read,
    /// Writing a config or preset file
    Write,
    /// Creating the parent directory of a file being saved
    CreateDir,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileOp::Read => "cannot read",
            FileOp::Write => "cannot write",
            FileOp::CreateDir => "cannot create directory",
        })
    }
}

/// Errors from loading, saving, validating or applying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file-system operation on `path` failed.
    #[error("{op} '{path}': {source}")]
    Io {
        /// What was attempted
        op: FileOp,
        /// File or directory involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The TOML text is malformed or does not fit the schema.
    #[error("invalid TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The value could not be written as TOML.
    #[error("cannot encode TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// No factory preset has this id.
    #[error("no factory preset named '{0}'")]
    PresetNotFound(String),

    /// The port store refused a value.
    #[error(transparent)]
    Port(#[from] PortError),

    /// Port names, ranges or engine fields are invalid.
    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),
}

impl ConfigError {
    fn io(op: FileOp, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Reading `path` failed.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::io(FileOp::Read, path, source)
    }

    /// Writing `path` failed.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::io(FileOp::Write, path, source)
    }

    /// Creating directory `path` failed.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::io(FileOp::CreateDir, path, source)
    }

    /// The file operation that failed, if this is an I/O error.
    pub fn file_op(&self) -> Option<FileOp> {
        match self {
            ConfigError::Io { op, .. } => Some(*op),
            _ => None,
        }
    }
}
