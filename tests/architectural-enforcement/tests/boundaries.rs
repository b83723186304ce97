//! Integration Test: Architectural Boundaries
//!
//! **Policy**:
//! - Production code never sleeps. Waiting happens on I/O or on a cancellation token.
//! - `docent-core` propagates errors; `unwrap()`/`expect()` are for tests only.
//! - `docent-core` has no terminal, TUI or argument-parsing dependencies. Those belong
//!   to surfaces such as `docent-cli`.

use std::fs;

use architectural_enforcement::{
    find_violations, is_sleep_call, is_unwrap_call, scan_source, workspace_root, Violation,
    PRODUCTION_DIRS,
};

fn report(kind: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ {kind} found in production code:\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!("\nFound {} {kind} violation(s).", violations.len());
}

#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_violations(&PRODUCTION_DIRS, is_sleep_call);
    report("sleep calls", &violations);
}

#[test]
fn test_no_unwrap_in_core() {
    let violations = find_violations(&["docent/core/src"], is_unwrap_call);
    report("unwrap/expect calls", &violations);
}

#[test]
fn test_no_blocking_http_client() {
    let violations = find_violations(&PRODUCTION_DIRS, |code| code.contains("reqwest::blocking"));
    report("blocking HTTP clients", &violations);
}

#[test]
fn test_core_has_no_surface_dependencies() {
    let manifest = fs::read_to_string(workspace_root().join("docent/core/Cargo.toml"))
        .expect("read docent/core/Cargo.toml");

    let forbidden = ["ratatui", "crossterm", "clap", "tracing-subscriber"];
    let found: Vec<_> = forbidden
        .iter()
        .filter(|name| {
            manifest
                .lines()
                .any(|line| line.trim_start().starts_with(&format!("{name} ")) || line.trim_start().starts_with(&format!("{name}=")))
        })
        .collect();

    assert!(
        found.is_empty(),
        "docent-core must not depend on surface crates, found: {found:?}"
    );
}

/// Source with one real call, one commented-out call and one call in tests
const SYNTHETIC_SOURCE: &str = "\
async fn wait_for_answer() {
    tokio::time::sleep(Duration::from_millis(10)).await;
    let body = response.bytes().await.unwrap();
    // std::thread::sleep(Duration::from_secs(1)); body.unwrap()
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    async fn waits() {
        tokio::time::sleep(Duration::from_millis(1)).await;
        value.unwrap();
    }
}
";

#[test]
fn test_sleep_detector_flags_production_calls_only() {
    let found = scan_source(SYNTHETIC_SOURCE, is_sleep_call);
    assert_eq!(
        found,
        vec![(2, "tokio::time::sleep(Duration::from_millis(10)).await;".to_string())]
    );
}

#[test]
fn test_unwrap_detector_flags_production_calls_only() {
    let found = scan_source(SYNTHETIC_SOURCE, is_unwrap_call);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].0, 3);
}
