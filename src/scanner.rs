//! Provider tree scanning
//!
//! Walks a provider source tree, parses the imports of every matching file
//! on the blocking pool and collects the results. A file that fails to
//! parse is recorded as a failure and never stops the scan.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinError;
use walkdir::{DirEntry, WalkDir};

use crate::config::ScanConfig;
use crate::parsers::{Error, PackageReference, ParseError, ParseMode, parse_packages};

/// Package references of one parsed file
#[derive(Debug, Clone, Serialize)]
pub struct FileImports {
    pub path: PathBuf,
    pub packages: Vec<PackageReference>,
}

/// Why a file could not be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The file could not be read
    Io,
    /// No import block, or an import line that does not decompose
    Parse,
    /// A quoted import line without the versioned shape (strict mode only)
    UnversionedImport,
    /// The parse task panicked or was cancelled
    Task,
}

impl From<&Error> for FailureKind {
    fn from(error: &Error) -> Self {
        match error {
            Error::Io { .. } => FailureKind::Io,
            Error::Parse {
                source: ParseError::MissingField { .. },
                ..
            } => FailureKind::UnversionedImport,
            Error::Parse { .. } => FailureKind::Parse,
        }
    }
}

/// A file whose imports could not be parsed
#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

/// Files importing one versioned package
#[derive(Debug, Clone, Serialize)]
pub struct ApiVersionUsage {
    pub path: String,
    pub api_version: String,
    pub files: BTreeSet<PathBuf>,
}

/// Outcome of a scan, sorted by file path
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    pub files: Vec<FileImports>,
    pub failures: Vec<ScanFailure>,
}

impl ScanResult {
    /// All package references, file by file
    pub fn packages(&self) -> impl Iterator<Item = &PackageReference> {
        self.files.iter().flat_map(|f| f.packages.iter())
    }

    /// Versioned packages with the files importing them, keyed by path
    pub fn api_versions(&self) -> Vec<ApiVersionUsage> {
        let mut usages: BTreeMap<(&str, &str), BTreeSet<PathBuf>> = BTreeMap::new();

        for file in &self.files {
            for package in &file.packages {
                usages
                    .entry((package.path.as_str(), package.api_version.as_str()))
                    .or_default()
                    .insert(file.path.clone());
            }
        }

        usages
            .into_iter()
            .map(|((path, api_version), files)| ApiVersionUsage {
                path: path.to_string(),
                api_version: api_version.to_string(),
                files,
            })
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Whether every failure is an unversioned import rejected in strict mode
    pub fn only_unversioned_failures(&self) -> bool {
        self.has_failures()
            && self
                .failures
                .iter()
                .all(|f| f.kind == FailureKind::UnversionedImport)
    }

    /// Record the outcome of parsing `path` on the blocking pool
    fn record(
        &mut self,
        path: PathBuf,
        outcome: Result<Result<Vec<PackageReference>, Error>, JoinError>,
    ) {
        match outcome {
            Ok(Ok(packages)) => self.files.push(FileImports { path, packages }),
            Ok(Err(e)) => {
                tracing::warn!("{}", e);
                self.failures.push(ScanFailure {
                    path,
                    kind: FailureKind::from(&e),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!("Parse task for {} failed: {}", path.display(), e);
                self.failures.push(ScanFailure {
                    message: format!("parse task for \"{}\" failed: {}", path.display(), e),
                    path,
                    kind: FailureKind::Task,
                });
            }
        }
    }
}

/// List the source files under `root` selected by `config`, sorted
pub fn collect_files(root: &Path, config: &ScanConfig) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_excluded_dir(entry, config))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_selected_file(entry.path(), config))
        .map(DirEntry::into_path)
        .collect();

    files.sort();
    files
}

fn is_excluded_dir(entry: &DirEntry, config: &ScanConfig) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| config.exclude_dirs.iter().any(|d| d == name))
}

fn is_selected_file(path: &Path, config: &ScanConfig) -> bool {
    let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if !config.extensions.iter().any(|e| e == extension) {
        return false;
    }

    let is_test = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with("_test.go"));

    !(config.skip_tests && is_test)
}

/// Parse the imports of every selected file under `root`
pub async fn scan_dir(root: &Path, config: &ScanConfig, mode: ParseMode) -> ScanResult {
    let files = collect_files(root, config);
    tracing::info!("Scanning {} files under {}", files.len(), root.display());

    let semaphore = Arc::new(tokio::sync::Semaphore::new(config.concurrency()));
    let (paths, handles): (Vec<_>, Vec<_>) = files
        .into_iter()
        .map(|path| {
            let permit = Arc::clone(&semaphore);
            let task_path = path.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit.acquire().await;
                tokio::task::spawn_blocking(move || parse_packages(&task_path, mode)).await
            });
            (path, handle)
        })
        .unzip();

    let mut scan = ScanResult::default();

    for (path, joined) in paths
        .into_iter()
        .zip(futures::future::join_all(handles).await)
    {
        scan.record(path, joined.and_then(|outcome| outcome));
    }

    scan.files.sort_by(|a, b| a.path.cmp(&b.path));
    scan.failures.sort_by(|a, b| a.path.cmp(&b.path));

    tracing::info!(
        "Parsed {} files ({} failed)",
        scan.files.len(),
        scan.failures.len()
    );

    scan
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    const COMPUTE: &str = r#"package azurerm

import (
	"fmt"

	"github.com/Azure/azure-sdk-for-go/services/compute/mgmt/2018-06-01/compute"
)
"#;

    const NETWORK: &str = r#"package azurerm

import (
	"github.com/Azure/azure-sdk-for-go/services/compute/mgmt/2018-06-01/compute"
	"github.com/Azure/azure-sdk-for-go/services/network/mgmt/2018-12-01/network"
)
"#;

    #[test]
    fn test_collect_files_filters() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "azurerm/compute.go", COMPUTE);
        write(dir.path(), "azurerm/compute_test.go", COMPUTE);
        write(dir.path(), "azurerm/README.md", "# docs");
        write(dir.path(), "vendor/github.com/x/y.go", COMPUTE);

        let files = collect_files(dir.path(), &ScanConfig::default());
        assert_eq!(files, vec![dir.path().join("azurerm/compute.go")]);
    }

    #[test]
    fn test_collect_files_with_tests() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.go", COMPUTE);
        write(dir.path(), "a_test.go", COMPUTE);

        let config = ScanConfig {
            skip_tests: false,
            ..ScanConfig::default()
        };
        let files = collect_files(dir.path(), &config);
        assert_eq!(files.len(), 2);
    }

    #[tokio::test]
    async fn test_scan_dir_records_failures() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "compute.go", COMPUTE);
        write(dir.path(), "network.go", NETWORK);
        write(dir.path(), "main.go", "package main\n\nimport \"fmt\"\n");

        let scan = scan_dir(dir.path(), &ScanConfig::default(), ParseMode::Lenient).await;

        assert_eq!(scan.files.len(), 2);
        assert_eq!(scan.files[0].path, dir.path().join("compute.go"));
        assert_eq!(scan.files[1].path, dir.path().join("network.go"));
        assert_eq!(scan.failures.len(), 1);
        assert_eq!(scan.failures[0].path, dir.path().join("main.go"));
        assert!(scan.failures[0].message.contains("cannot parse Go imports content"));
        assert_eq!(scan.failures[0].kind, FailureKind::Parse);
        assert!(scan.has_failures());
        assert!(!scan.only_unversioned_failures());
    }

    #[tokio::test]
    async fn test_scan_dir_strict_mode_fails_unversioned_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "compute.go", COMPUTE);
        write(dir.path(), "network.go", NETWORK);

        let scan = scan_dir(dir.path(), &ScanConfig::default(), ParseMode::Strict).await;

        assert_eq!(scan.files.len(), 1);
        assert_eq!(scan.failures.len(), 1);
        assert!(scan.failures[0].message.contains("api version"));
        assert_eq!(scan.failures[0].kind, FailureKind::UnversionedImport);
        assert!(scan.only_unversioned_failures());
    }

    #[tokio::test]
    async fn test_api_versions_grouped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "compute.go", COMPUTE);
        write(dir.path(), "network.go", NETWORK);

        let scan = scan_dir(dir.path(), &ScanConfig::default(), ParseMode::Lenient).await;
        let usages = scan.api_versions();

        assert_eq!(usages.len(), 2);
        assert_eq!(usages[0].api_version, "2018-06-01");
        assert_eq!(usages[0].files.len(), 2);
        assert_eq!(usages[1].api_version, "2018-12-01");
        assert_eq!(usages[1].files.len(), 1);
        assert_eq!(scan.packages().count(), 3);
    }

    #[tokio::test]
    async fn test_failed_task_is_recorded() {
        let handle: tokio::task::JoinHandle<()> = tokio::spawn(async { panic!("parser crashed") });
        let join_error = handle.await.unwrap_err();

        let mut scan = ScanResult::default();
        scan.record(PathBuf::from("azurerm/crashed.go"), Err(join_error));

        assert!(scan.files.is_empty());
        assert_eq!(scan.failures.len(), 1);
        assert_eq!(scan.failures[0].path, PathBuf::from("azurerm/crashed.go"));
        assert_eq!(scan.failures[0].kind, FailureKind::Task);
        assert!(scan.failures[0].message.contains("azurerm/crashed.go"));
    }

    #[test]
    fn test_failure_kind_from_error() {
        let io = Error::Io {
            path: PathBuf::from("a.go"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(FailureKind::from(&io), FailureKind::Io);

        let unversioned = Error::Parse {
            path: PathBuf::from("a.go"),
            source: ParseError::MissingField {
                field: crate::parsers::PackageField::ApiVersion,
                line: "\t\"fmt\"".to_string(),
            },
        };
        assert_eq!(FailureKind::from(&unversioned), FailureKind::UnversionedImport);

        let no_block = Error::Parse {
            path: PathBuf::from("a.go"),
            source: ParseError::MissingImports,
        };
        assert_eq!(FailureKind::from(&no_block), FailureKind::Parse);
    }
}
