use mcp_domain::config::{Config, ConfigSeverity};

/// Runs all diagnostic checks and prints a summary.
///
/// Returns `Ok(true)` when every check passes, `Ok(false)` when at least one
/// check failed. Unlike the teacher's `doctor`, there is no remote memory
/// backend to probe — the store is always in-memory (§9 decision) — so the
/// connectivity checks here are about the vault and breaker config instead.
pub fn run(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    println!("mcp-server doctor");
    println!("=================\n");

    let mut all_passed = true;

    check_config_file(config_path, &mut all_passed);
    check_config_validation(config, &mut all_passed);
    check_vault(config, &mut all_passed);

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    Ok(all_passed)
}

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    print_check(
        "Config file exists",
        exists,
        if exists {
            config_path.to_owned()
        } else {
            format!("{config_path} not found (using defaults)")
        },
    );
    if !exists {
        *all_passed = false;
    }
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues.iter().filter(|e| e.severity == ConfigSeverity::Error).count();

    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
    } else {
        print_check(
            "Config validation",
            error_count == 0,
            format!("{} issue(s) ({error_count} error(s))", issues.len()),
        );
        for issue in &issues {
            println!("      {issue}");
        }
        if error_count > 0 {
            *all_passed = false;
        }
    }
}

fn check_vault(config: &Config, all_passed: &mut bool) {
    let reachable = mcp_vault::Vault::from_env(&config.vault.master_secret_env, config.vault.key_version).is_ok();
    print_check(
        "Vault master secret present",
        reachable,
        if reachable {
            format!("{} set", config.vault.master_secret_env)
        } else {
            format!("{} not set or empty", config.vault.master_secret_env)
        },
    );
    if !reachable {
        *all_passed = false;
    }
}

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
