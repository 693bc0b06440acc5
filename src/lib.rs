//! Resource coverage - versioned SDK imports of Go providers
//!
//! This crate extracts the versioned package imports of Go source files
//! (e.g., `github.com/Azure/azure-sdk-for-go/services/compute/mgmt/2018-06-01/compute`)
//! and correlates them with an API inventory to report which API versions
//! a provider actually wires in.

pub mod config;
pub mod coverage;
pub mod parsers;
pub mod reports;
pub mod scanner;
