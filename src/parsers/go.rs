//! Parser for Go source imports
//!
//! Locates the grouped `import ( ... )` block of a Go file and decomposes
//! every quoted import path of the form `prefix/<api version>/suffix`,
//! as used by versioned SDK packages such as
//! `github.com/Azure/azure-sdk-for-go/services/compute/mgmt/2018-06-01/compute`.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::captures::NamedCaptures;
use super::{Error, PackageField, PackageReference, ParseError, ParseMode, Parser};

/// Grouped import declaration; ungreedy so the first `)` closes the block
static IMPORT_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?sU)import\s+\((?P<imports>.+)\)").expect("valid import block regex")
});

/// One `[alias] "path"` line of an import block
static IMPORT_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(?P<alias>[a-zA-Z0-9]+)?\s*"(?P<path>.+)"\s*$"#)
        .expect("valid import line regex")
});

/// Versioned import path. The prefix is greedy, so the version is the
/// rightmost segment that still leaves a suffix.
static PACKAGE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<packageprefix>.+/)(?P<apiversion>[-0-9.vV]+[a-zA-Z0-9]+)(?P<packagesuffix>/.+)$",
    )
    .expect("valid package path regex")
});

/// Some segment of the path is version-shaped
static VERSION_SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|/)[-0-9.vV]+[a-zA-Z0-9]+").expect("valid version segment regex")
});

/// A version-shaped segment follows a non-empty prefix
static PREFIXED_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.+/[-0-9.vV]+[a-zA-Z0-9]+").expect("valid prefixed version regex")
});

/// Parser for the import block of Go source files
#[derive(Debug, Default, Clone, Copy)]
pub struct GoImportParser {
    mode: ParseMode,
}

impl GoImportParser {
    /// Strict parser: every quoted import line must carry an api version
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: ParseMode) -> Self {
        Self { mode }
    }

    /// Parse the inner text of an import block into package references,
    /// in the order the lines appear.
    pub fn parse_import_block(&self, imports: &str) -> Result<Vec<PackageReference>, ParseError> {
        let mut packages = Vec::with_capacity(16);

        for captures in IMPORT_LINE_RE.captures_iter(imports) {
            let line = NamedCaptures::from_match(&IMPORT_LINE_RE, Some(captures))?;
            if let Some(package) = self.parse_import_line(&line)? {
                packages.push(package);
            }
        }

        Ok(packages)
    }

    fn parse_import_line(
        &self,
        line: &NamedCaptures<'_, '_>,
    ) -> Result<Option<PackageReference>, ParseError> {
        let alias = line.get("alias").unwrap_or_default();
        let quoted = line.get("path").unwrap_or_default();

        let parts = match NamedCaptures::from_match(
            &PACKAGE_PATH_RE,
            PACKAGE_PATH_RE.captures(quoted),
        ) {
            Ok(parts) => parts,
            Err(_) => return self.reject(missing_field(quoted), line.matched()),
        };

        let Some(prefix) = parts.non_empty("packageprefix") else {
            return self.reject(PackageField::Prefix, line.matched());
        };
        let Some(api_version) = parts.non_empty("apiversion") else {
            return self.reject(PackageField::ApiVersion, line.matched());
        };
        let Some(suffix) = parts.non_empty("packagesuffix") else {
            return self.reject(PackageField::Suffix, line.matched());
        };

        Ok(Some(PackageReference {
            alias: alias.to_string(),
            path: format!("{prefix}{api_version}{suffix}"),
            api_version: api_version.to_string(),
        }))
    }

    fn reject(
        &self,
        field: PackageField,
        line: &str,
    ) -> Result<Option<PackageReference>, ParseError> {
        match self.mode {
            ParseMode::Strict => Err(ParseError::MissingField {
                field,
                line: line.to_string(),
            }),
            ParseMode::Lenient => {
                tracing::debug!("Skipping import without {}: {:?}", field, line.trim());
                Ok(None)
            }
        }
    }
}

impl Parser for GoImportParser {
    fn parse(&self, content: &str) -> Result<Vec<PackageReference>, ParseError> {
        let imports = extract_import_block(content)?;
        self.parse_import_block(imports)
    }
}

/// First component of `path` that keeps it from decomposing.
///
/// A path without any version-shaped segment (`"fmt"`, `"github.com/foo/bar"`)
/// always reports the api version.
fn missing_field(path: &str) -> PackageField {
    if !VERSION_SEGMENT_RE.is_match(path) {
        PackageField::ApiVersion
    } else if !PREFIXED_VERSION_RE.is_match(path) {
        PackageField::Prefix
    } else {
        PackageField::Suffix
    }
}

/// Return the inner text of the grouped import block of `content`.
///
/// Fails with [`ParseError::MissingImports`] if there is no block or it is empty.
pub fn extract_import_block(content: &str) -> Result<&str, ParseError> {
    let captures = NamedCaptures::from_match(&IMPORT_BLOCK_RE, IMPORT_BLOCK_RE.captures(content))
        .map_err(|_| ParseError::MissingImports)?;

    captures
        .non_empty("imports")
        .ok_or(ParseError::MissingImports)
}

/// Read the Go file at `path` and parse the package references of its import block.
pub fn parse_packages(path: &Path, mode: ParseMode) -> Result<Vec<PackageReference>, Error> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let packages = GoImportParser::with_mode(mode)
        .parse(&content)
        .map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!(
        "Parsed {} versioned packages from {}",
        packages.len(),
        path.display()
    );

    Ok(packages)
}
