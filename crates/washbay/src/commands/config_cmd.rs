//! Config subcommand handlers.

use std::fmt::Write as _;
use std::io::IsTerminal;

use dialoguer::{Confirm, Input};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display as TOML-like text.
fn format_config(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out);
    let _ = writeln!(out, "[query]");
    let _ = writeln!(out, "retry_attempts = {}", cfg.query.retry_attempts);
    let _ = writeln!(out, "retry_delay_base_ms = {}", cfg.query.retry_delay_base_ms);
    let _ = writeln!(out, "stale_time_ms = {}", cfg.query.stale_time_ms);
    let _ = writeln!(out, "gc_time_ms = {}", cfg.query.gc_time_ms);
    let _ = writeln!(out);
    let _ = writeln!(out, "[mock]");
    let _ = writeln!(out, "latency_ms = {}", cfg.mock.latency_ms);
    let _ = writeln!(out, "seed_appointments = {}", cfg.mock.seed_appointments);

    for name in cfg.profile_names() {
        let p = &cfg.profiles[&name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        if let Some(v) = p.query.retry_attempts {
            let _ = writeln!(out, "query.retry_attempts = {v}");
        }
        if let Some(v) = p.query.retry_delay_base_ms {
            let _ = writeln!(out, "query.retry_delay_base_ms = {v}");
        }
        if let Some(v) = p.query.stale_time_ms {
            let _ = writeln!(out, "query.stale_time_ms = {v}");
        }
        if let Some(v) = p.query.gc_time_ms {
            let _ = writeln!(out, "query.gc_time_ms = {v}");
        }
        if let Some(v) = p.mock.latency_ms {
            let _ = writeln!(out, "mock.latency_ms = {v}");
        }
        if let Some(v) = p.mock.seed_appointments {
            let _ = writeln!(out, "mock.seed_appointments = {v}");
        }
    }

    out.trim_end().to_owned()
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Ask for the handful of values worth changing on day one.
fn prompt_config() -> Result<Config, CliError> {
    let mut cfg = Config::default();

    cfg.default_profile = Some(
        Input::new()
            .with_prompt("Default profile name")
            .default("default".to_string())
            .interact_text()
            .map_err(prompt_err)?,
    );

    cfg.query.retry_attempts = Input::new()
        .with_prompt("Retry attempts per query")
        .default(cfg.query.retry_attempts)
        .interact_text()
        .map_err(prompt_err)?;

    cfg.mock.latency_ms = Input::new()
        .with_prompt("Simulated backend latency (ms)")
        .default(cfg.mock.latency_ms)
        .interact_text()
        .map_err(prompt_err)?;

    cfg.mock.seed_appointments = Confirm::new()
        .with_prompt("Start with sample appointments?")
        .default(true)
        .interact()
        .map_err(prompt_err)?;

    Ok(cfg)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out =
                output::render_single(global.output(), &cfg, format_config, |_| "config".into())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Init ────────────────────────────────────────────────────
        ConfigCommand::Init { force, defaults } => {
            let path = config::config_path();
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let interactive = !defaults && std::io::stdin().is_terminal();
            let cfg = if interactive {
                eprintln!("washbay configuration");
                eprintln!("   Config path: {}\n", path.display());
                prompt_config()?
            } else {
                Config::default()
            };

            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Configuration written to {}", path.display());
            }
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile_name();
            let names = cfg.profile_names();
            if names.is_empty() {
                eprintln!(
                    "No profiles configured. Add [profiles.<name>] to {}",
                    config::config_path().display()
                );
            } else {
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }
    }
}
