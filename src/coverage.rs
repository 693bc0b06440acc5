//! Coverage inventory and correlation with imported SDK packages
//!
//! An inventory lists the resources of each provider namespace at a given
//! API version. An entry is considered wired into Terraform when some
//! imported package carries the same API version and names the provider
//! in one of its path segments.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::parsers::PackageReference;

/// Known resource of an API surface and whether the provider uses it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageEntry {
    /// Namespace of the resource provider (e.g., "Microsoft.Compute")
    pub namespace: String,
    /// Provider name within the namespace (e.g., "compute")
    pub provider_name: String,
    /// API version of the provider definition (e.g., "2018-06-01")
    pub api_version: String,
    /// Resource type name (e.g., "virtualMachines")
    pub resource_name: String,
    /// Whether an imported package matches this entry
    #[serde(default)]
    pub in_terraform: bool,
}

pub type ResourceCoverage = Vec<CoverageEntry>;

impl CoverageEntry {
    /// Short provider name used in SDK package paths
    ///
    /// Falls back to the last dotted component of the namespace when
    /// `provider_name` is empty.
    pub fn short_name(&self) -> &str {
        if !self.provider_name.is_empty() {
            return &self.provider_name;
        }
        self.namespace
            .rsplit('.')
            .next()
            .unwrap_or(&self.namespace)
    }

    /// Whether `package` provides this entry's provider at this API version
    pub fn matches(&self, package: &PackageReference) -> bool {
        let short_name = self.short_name();
        package.api_version == self.api_version
            && !short_name.is_empty()
            && package
                .path
                .split('/')
                .any(|segment| segment.eq_ignore_ascii_case(short_name))
    }
}

/// Totals of a correlated inventory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub total: usize,
    pub covered: usize,
}

impl CoverageSummary {
    pub fn from_entries(entries: &[CoverageEntry]) -> Self {
        Self {
            total: entries.len(),
            covered: entries.iter().filter(|e| e.in_terraform).count(),
        }
    }

    /// Covered share in percent (0 for an empty inventory)
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.covered as f64 * 100.0 / self.total as f64
    }
}

/// Set `in_terraform` on every entry matched by one of `packages`.
///
/// Entries already marked stay marked.
pub fn mark_in_terraform(entries: &mut [CoverageEntry], packages: &[PackageReference]) {
    for entry in entries.iter_mut() {
        if !entry.in_terraform && packages.iter().any(|p| entry.matches(p)) {
            entry.in_terraform = true;
        }
    }
}

/// Load an inventory from a JSON array of entries
pub fn load_inventory(path: &Path) -> anyhow::Result<ResourceCoverage> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read inventory {}", path.display()))?;
    let entries: ResourceCoverage = serde_json::from_str(&content)
        .with_context(|| format!("invalid inventory {}", path.display()))?;

    tracing::debug!(
        "Loaded {} inventory entries from {}",
        entries.len(),
        path.display()
    );

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(namespace: &str, provider: &str, version: &str, resource: &str) -> CoverageEntry {
        CoverageEntry {
            namespace: namespace.to_string(),
            provider_name: provider.to_string(),
            api_version: version.to_string(),
            resource_name: resource.to_string(),
            in_terraform: false,
        }
    }

    fn package(path: &str, version: &str) -> PackageReference {
        PackageReference {
            alias: String::new(),
            path: path.to_string(),
            api_version: version.to_string(),
        }
    }

    #[test]
    fn test_short_name_fallback() {
        let e = entry("Microsoft.Compute", "", "2018-06-01", "virtualMachines");
        assert_eq!(e.short_name(), "Compute");

        let e = entry("Microsoft.Compute", "compute", "2018-06-01", "virtualMachines");
        assert_eq!(e.short_name(), "compute");
    }

    #[test]
    fn test_matches_version_and_segment() {
        let e = entry("Microsoft.Compute", "", "2018-06-01", "virtualMachines");
        let p = package(
            "github.com/Azure/azure-sdk-for-go/services/compute/mgmt/2018-06-01/compute",
            "2018-06-01",
        );
        assert!(e.matches(&p));

        let older = package(
            "github.com/Azure/azure-sdk-for-go/services/compute/mgmt/2017-12-01/compute",
            "2017-12-01",
        );
        assert!(!e.matches(&older));

        let other = package(
            "github.com/Azure/azure-sdk-for-go/services/network/mgmt/2018-06-01/network",
            "2018-06-01",
        );
        assert!(!e.matches(&other));
    }

    #[test]
    fn test_mark_in_terraform() {
        let mut entries = vec![
            entry("Microsoft.Compute", "compute", "2018-06-01", "virtualMachines"),
            entry("Microsoft.Compute", "compute", "2019-03-01", "virtualMachines"),
            entry("Microsoft.Network", "network", "2018-12-01", "virtualNetworks"),
        ];
        let packages = vec![
            package("example.com/services/compute/mgmt/2018-06-01/compute", "2018-06-01"),
            package("example.com/services/network/mgmt/2018-12-01/network", "2018-12-01"),
        ];

        mark_in_terraform(&mut entries, &packages);

        let covered: Vec<bool> = entries.iter().map(|e| e.in_terraform).collect();
        assert_eq!(covered, vec![true, false, true]);

        let summary = CoverageSummary::from_entries(&entries);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.covered, 2);
    }

    #[test]
    fn test_empty_summary_percentage() {
        assert_eq!(CoverageSummary::default().percentage(), 0.0);
        let summary = CoverageSummary {
            total: 4,
            covered: 1,
        };
        assert_eq!(summary.percentage(), 25.0);
    }

    #[test]
    fn test_load_inventory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(
            &path,
            r#"[
  {
    "namespace": "Microsoft.Compute",
    "provider_name": "compute",
    "api_version": "2018-06-01",
    "resource_name": "virtualMachines"
  }
]"#,
        )
        .unwrap();

        let entries = load_inventory(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].in_terraform);
        assert_eq!(entries[0].resource_name, "virtualMachines");
    }

    #[test]
    fn test_load_invalid_inventory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_inventory(&path).unwrap_err();
        assert!(err.to_string().contains("invalid inventory"));
    }
}
