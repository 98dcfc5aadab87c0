//! Version information for the service, populated at build time.
//!
//! Display format per runtime environment:
//! - Prod: `stable:{version}`
//! - Test: `test:{commit}`
//! - Local: `main:{commit}`

/// Environment the service was started in, resolved from configuration at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnv {
    /// Local development
    Local,
    /// Shared test deployment
    Test,
    /// Production
    Prod,
}

/// Get the build date in RFC3339 format
pub fn build_date() -> &'static str {
    env!("BUILD_DATE")
}

/// Get the git commit hash (short)
pub fn build_commit() -> &'static str {
    env!("BUILD_COMMIT")
}

/// Get the package version
pub fn build_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Format the version string reported for `env`.
///
/// Production reports the crate version; every other environment reports the
/// commit it was built from, since those builds are not released.
pub fn format_version_for_runtime_env(env: RuntimeEnv) -> String {
    match env {
        RuntimeEnv::Prod => format!("stable:{}", build_version()),
        RuntimeEnv::Test => format!("test:{}", build_commit()),
        RuntimeEnv::Local => format!("main:{}", build_commit()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_constants_not_empty() {
        assert!(!build_date().is_empty());
        assert!(!build_commit().is_empty());
        assert!(!build_version().is_empty());
    }

    #[test]
    fn test_format_version_for_runtime_env_local() {
        let version = format_version_for_runtime_env(RuntimeEnv::Local);
        assert_eq!(version, format!("main:{}", build_commit()));
    }

    #[test]
    fn test_format_version_for_runtime_env_test() {
        let version = format_version_for_runtime_env(RuntimeEnv::Test);
        assert!(version.starts_with("test:"));
    }

    #[test]
    fn test_format_version_for_runtime_env_prod() {
        let version = format_version_for_runtime_env(RuntimeEnv::Prod);
        assert_eq!(version, format!("stable:{}", env!("CARGO_PKG_VERSION")));
    }
}
