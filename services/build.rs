use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rustc-env=BUILD_DATE={}", chrono::Utc::now().to_rfc3339());

    let commit = stamp("ROSTER_BUILD_COMMIT", &["rev-parse", "--short", "HEAD"]);
    println!("cargo:rustc-env=BUILD_COMMIT={commit}");

    let branch = stamp("ROSTER_BUILD_BRANCH", &["rev-parse", "--abbrev-ref", "HEAD"]);
    println!("cargo:rustc-env=BUILD_BRANCH={branch}");

    println!("cargo:rerun-if-env-changed=ROSTER_BUILD_COMMIT");
    println!("cargo:rerun-if-env-changed=ROSTER_BUILD_BRANCH");
    println!("cargo:rerun-if-changed=../.git/HEAD");
    // Templates are embedded with include_str!.
    println!("cargo:rerun-if-changed=templates");
}

/// The override variable if set, otherwise git's answer, otherwise "unknown".
fn stamp(var: &str, git_args: &[&str]) -> String {
    env::var(var)
        .ok()
        .filter(|value| !value.is_empty())
        .or_else(|| git(git_args))
        .unwrap_or_else(|| "unknown".to_owned())
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8(output.stdout).ok()?;
    Some(value.trim().to_owned())
}
