//! Command dispatch: bridges CLI args -> dashboard queries -> output formatting.

pub mod appointments;
pub mod config_cmd;
pub mod dashboard;
pub mod locations;
pub mod services;
pub mod settings;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config::Dashboard;
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    queries: &Dashboard,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Services(args) => services::handle(queries, args, global).await,
        Command::Locations(args) => locations::handle(queries, args, global).await,
        Command::Appointments(args) => appointments::handle(queries, args, global).await,
        Command::Dashboard(args) => dashboard::handle(queries, args, global).await,
        // Config, Settings and Completions are handled before dispatch
        Command::Config(_) | Command::Settings(_) | Command::Completions(_) => unreachable!(),
    }
}
