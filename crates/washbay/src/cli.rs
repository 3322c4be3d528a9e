//! Clap derive structures for the `washbay` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

use washbay_core::{AppointmentStatus, FailureKind, ServiceCategory};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// washbay -- car-wash operations from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "washbay",
    version,
    about = "Browse car-wash services, book appointments and watch the dashboard",
    long_about = "Browse car-wash services, book appointments and watch the dashboard.\n\n\
        Every view goes through a cached query layer with retry and backoff.\n\
        Use --fail-first to inject backend failures and watch it recover.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "WASHBAY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "WASHBAY_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Simulated backend latency per call, in milliseconds (overrides profile)
    #[arg(long, global = true)]
    pub latency_ms: Option<u64>,

    /// Fail the first N backend calls to exercise retries
    #[arg(long, default_value = "0", global = true)]
    pub fail_first: u32,

    /// Kind of failure injected by --fail-first
    #[arg(long, default_value = "unavailable", global = true)]
    pub fail_kind: FailureKind,
}

impl GlobalOpts {
    pub fn output(&self) -> OutputFormat {
        self.output.unwrap_or(OutputFormat::Table)
    }

    pub fn color(&self) -> ColorMode {
        self.color.unwrap_or(ColorMode::Auto)
    }

    /// Fill unset output and color flags from the config file's `[defaults]`.
    pub fn apply_defaults(&mut self, defaults: &washbay_config::Defaults) {
        if self.output.is_none() {
            self.output = OutputFormat::from_str(&defaults.output, true).ok();
        }
        if self.color.is_none() {
            self.color = ColorMode::from_str(&defaults.color, true).ok();
        }
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Browse the service catalog
    #[command(alias = "svc")]
    Services(ServicesArgs),

    /// List wash locations
    #[command(alias = "loc")]
    Locations(LocationsArgs),

    /// List, book and cancel appointments
    #[command(alias = "appt")]
    Appointments(AppointmentsArgs),

    /// Show dashboard metrics and their cache state
    #[command(alias = "dash")]
    Dashboard(DashboardArgs),

    /// View and change display preferences
    Settings(SettingsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Services ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ServicesArgs {
    #[command(subcommand)]
    pub command: ServicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ServicesCommand {
    /// List services, cheapest first
    #[command(alias = "ls")]
    List {
        /// Only show one category (exterior, interior, full-service, detailing, addon)
        #[arg(long)]
        category: Option<ServiceCategory>,

        /// Only show popular services
        #[arg(long)]
        popular: bool,
    },

    /// Show a single service
    Get {
        /// Service ID (e.g. svc-premium)
        id: String,
    },
}

// ── Locations ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LocationsArgs {
    #[command(subcommand)]
    pub command: LocationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum LocationsCommand {
    /// List locations
    #[command(alias = "ls")]
    List,
}

// ── Appointments ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AppointmentsArgs {
    #[command(subcommand)]
    pub command: AppointmentsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AppointmentsCommand {
    /// List appointments by scheduled time
    #[command(alias = "ls")]
    List {
        /// Filter by status (scheduled, in-progress, completed, cancelled)
        #[arg(long, short = 's')]
        status: Option<AppointmentStatus>,

        /// Filter by location ID
        #[arg(long, short = 'l')]
        location: Option<String>,
    },

    /// Book a new appointment
    Book(BookArgs),

    /// Cancel an appointment
    Cancel {
        /// Appointment ID
        id: String,
    },
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("when").required(true).args(["at", "in_"])))]
pub struct BookArgs {
    /// Customer name
    #[arg(long)]
    pub customer: String,

    /// Vehicle description
    #[arg(long)]
    pub vehicle: String,

    /// Service ID
    #[arg(long)]
    pub service: String,

    /// Location ID
    #[arg(long)]
    pub location: String,

    /// Start time (RFC 3339, e.g. 2026-05-01T14:00:00Z)
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,

    /// Start time relative to now (e.g. 2h, 1day 3h)
    #[arg(long = "in", id = "in_", value_parser = humantime::parse_duration)]
    pub in_: Option<Duration>,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,
}

// ── Dashboard ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DashboardArgs {
    /// Keep refreshing until interrupted
    #[arg(long, short = 'w')]
    pub watch: bool,

    /// Refresh interval for --watch
    #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
    pub interval: Duration,
}

// ── Settings ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show current display preferences
    Show,

    /// Change a preference (theme, layout, density)
    Set {
        /// Preference name
        key: String,
        /// New value
        value: String,
    },

    /// Restore every preference to its default
    Reset,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,

        /// Skip prompts and write the defaults
        #[arg(long)]
        defaults: bool,
    },

    /// List configured profiles
    Profiles,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_defaults_fill_unset_flags() {
        let mut global = Cli::parse_from(["washbay", "locations", "list"]).global;
        global.apply_defaults(&washbay_config::Defaults {
            output: "json".into(),
            color: "never".into(),
        });
        assert_eq!(global.output(), OutputFormat::Json);
        assert_eq!(global.color(), ColorMode::Never);
    }

    #[test]
    fn explicit_flags_beat_config_defaults() {
        let mut global = Cli::parse_from(["washbay", "-o", "yaml", "locations", "list"]).global;
        global.apply_defaults(&washbay_config::Defaults::default());
        assert_eq!(global.output(), OutputFormat::Yaml);
    }
}
