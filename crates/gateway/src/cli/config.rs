use crowd_domain::config::{Config, ConfigSeverity};

/// Print every limit and credential-source issue found in the config.
///
/// Warnings (such as a total limit below the per-session limit) are
/// reported but still pass; the command fails only on errors.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();
    let (errors, warnings): (Vec<_>, Vec<_>) = issues
        .iter()
        .partition(|issue| issue.severity == ConfigSeverity::Error);

    for issue in errors.iter().chain(&warnings) {
        println!("{issue}");
    }

    if issues.is_empty() {
        println!("Config OK ({config_path})");
    } else {
        println!(
            "\n{} error(s), {} warning(s) in {config_path}",
            errors.len(),
            warnings.len(),
        );
    }

    errors.is_empty()
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("serializing config: {e}"))?;
    print!("{output}");
    Ok(())
}
