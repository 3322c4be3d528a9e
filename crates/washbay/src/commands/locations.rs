//! Location handlers.

use tabled::Tabled;
use washbay_core::Location;

use crate::cli::{GlobalOpts, LocationsArgs, LocationsCommand};
use crate::config::Dashboard;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LocationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Bays")]
    bays: u32,
}

impl From<&Location> for LocationRow {
    fn from(l: &Location) -> Self {
        Self {
            id: l.id.clone(),
            name: l.name.clone(),
            address: l.address.clone(),
            bays: l.bays,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    queries: &Dashboard,
    args: LocationsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        LocationsCommand::List => {
            let query = queries.locations();
            let locations = util::settled_data(&query).await?;
            let out = output::render_list(
                global.output(),
                locations.as_slice(),
                |l| LocationRow::from(l),
                |l| l.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
