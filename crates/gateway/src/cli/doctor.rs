use crowd_credentials::LoadOrigin;
use crowd_domain::config::{Config, ConfigSeverity};
use crowd_domain::Error;
use crowd_quota::UsageFile;
use crowd_sessions::SessionContext;

use crate::state::AppState;

/// Run all diagnostic checks and print a summary.
///
/// Returns `Ok(true)` when every check passes, `Ok(false)` when at least
/// one check failed.
pub fn run(state: &AppState, config_path: &str) -> anyhow::Result<bool> {
    println!("crowdcount doctor");
    println!("=================\n");

    let mut all_passed = true;

    // 1. Config file
    check_config_file(config_path);

    // 2. Config validation
    check_config_validation(&state.config, &mut all_passed);

    // 3. Usage file
    check_usage_file(&state.config, &mut all_passed);

    // 4. Operator credentials
    check_credentials(state, &mut all_passed);

    // Summary
    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    Ok(all_passed)
}

// ── Individual checks ─────────────────────────────────────────────────

fn check_config_file(config_path: &str) {
    let exists = std::path::Path::new(config_path).exists();
    // A missing file means defaults; never a failure.
    print_check(
        "Config file",
        true,
        if exists {
            config_path.to_owned()
        } else {
            format!("{config_path} not found (using defaults)")
        },
    );
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();

    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
        return;
    }

    print_check(
        "Config validation",
        error_count == 0,
        format!("{} issue(s) ({} error(s))", issues.len(), error_count),
    );
    for issue in &issues {
        println!("      {issue}");
    }
    if error_count > 0 {
        *all_passed = false;
    }
}

fn check_usage_file(config: &Config, all_passed: &mut bool) {
    let file = UsageFile::new(&config.limits.usage_path);
    let path = file.path().display().to_string();
    match file.read() {
        Ok(Some(record)) => print_check(
            "Usage file",
            true,
            format!("{path} ({} call(s) on {})", record.total_calls, record.date),
        ),
        Ok(None) => print_check(
            "Usage file",
            true,
            format!("{path} not found (created on first call)"),
        ),
        Err(e) => {
            // The limiter starts a fresh count when this happens.
            print_check("Usage file", false, format!("{path} unreadable: {e}"));
            *all_passed = false;
        }
    }
}

fn check_credentials(state: &AppState, all_passed: &mut bool) {
    let mut probe = SessionContext::new("doctor");
    match state.loader.load(&mut probe) {
        Ok(origin) => {
            let detail = match origin {
                LoadOrigin::EnvFile(p) => format!("loaded from {}", p.display()),
                LoadOrigin::SecretsFile(p) => format!("loaded from {}", p.display()),
                LoadOrigin::ProcessEnv | LoadOrigin::AlreadyLoaded => {
                    "present in process environment".into()
                }
            };
            print_check("Operator credentials", true, detail);
        }
        Err(Error::MissingCredentials(missing)) => {
            print_check(
                "Operator credentials",
                false,
                format!("missing {}", missing.join(", ")),
            );
            *all_passed = false;
        }
        Err(e) => {
            print_check("Operator credentials", false, e.to_string());
            *all_passed = false;
        }
    }
}

// ── Formatting helper ─────────────────────────────────────────────────

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
