//! Shared utilities for the Roster workspace.
//!
//! Holds build and version information that the service reports in its
//! health responses.

pub mod version_info;
