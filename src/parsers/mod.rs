//! Parsers for Go import declarations (`import ( ... )` blocks)

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod captures;
pub mod go;

pub use go::{GoImportParser, extract_import_block, parse_packages};

/// A versioned package imported by a Go source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageReference {
    /// Import alias (empty when the default package name is used)
    pub alias: String,
    /// Full import path (prefix + api version + suffix)
    pub path: String,
    /// API version segment taken from the middle of the path (e.g., "2021-01-01", "v1beta1")
    pub api_version: String,
}

/// How import lines that cannot be decomposed are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Any quoted import line without prefix, api version and suffix fails the file
    #[default]
    Strict,
    /// Such lines are skipped (standard library and unversioned imports)
    Lenient,
}

/// Component of an import path that failed to capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageField {
    Prefix,
    ApiVersion,
    Suffix,
}

impl PackageField {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageField::Prefix => "package prefix",
            PackageField::ApiVersion => "api version",
            PackageField::Suffix => "package suffix",
        }
    }
}

impl fmt::Display for PackageField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while decomposing import text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("pattern did not match")]
    NoMatch,

    #[error("cannot parse Go imports content")]
    MissingImports,

    #[error("cannot parse Go {field} in {line:?}")]
    MissingField { field: PackageField, line: String },
}

/// Per-file failure, always carrying the path of the file
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to parse Go packages in \"{}\": {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse Go packages in \"{}\": {}", .path.display(), .source)]
    Parse { path: PathBuf, source: ParseError },
}

impl Error {
    /// Path of the file that failed
    pub fn path(&self) -> &Path {
        match self {
            Error::Io { path, .. } | Error::Parse { path, .. } => path,
        }
    }
}

/// Trait for parsing the imports of a source file
pub trait Parser: Send + Sync {
    /// Parse the given file content and extract versioned package references
    fn parse(&self, content: &str) -> Result<Vec<PackageReference>, ParseError>;
}
