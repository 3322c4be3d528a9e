//! Service catalog handlers.

use tabled::Tabled;
use washbay_core::{IconRegistry, Service};

use crate::cli::{GlobalOpts, ServicesArgs, ServicesCommand};
use crate::config::Dashboard;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "")]
    icon: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Minutes")]
    minutes: u32,
    #[tabled(rename = "Popular")]
    popular: String,
}

impl ServiceRow {
    fn new(s: &Service, icons: &IconRegistry) -> Self {
        Self {
            icon: icons.resolve(&s.icon).glyph.clone(),
            id: s.id.clone(),
            name: s.name.clone(),
            category: s.category.to_string(),
            price: s.price_display(),
            minutes: s.duration_minutes,
            popular: if s.popular { "★".into() } else { String::new() },
        }
    }
}

fn detail(s: &Service, icons: &IconRegistry) -> String {
    let icon = icons.resolve(&s.icon);
    output::detail_lines(&[
        ("ID", s.id.clone()),
        ("Name", format!("{} {}", icon.glyph, s.name)),
        ("Category", s.category.to_string()),
        ("Price", s.price_display()),
        ("Duration", format!("{} min", s.duration_minutes)),
        ("Popular", if s.popular { "yes" } else { "no" }.into()),
        ("Description", s.description.clone()),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    queries: &Dashboard,
    args: ServicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let icons = IconRegistry::builtin();

    match args.command {
        ServicesCommand::List { category, popular } => {
            let query = queries.services();
            let all = util::settled_data(&query).await?;
            let shown: Vec<Service> = all
                .iter()
                .filter(|s| category.is_none_or(|c| s.category == c))
                .filter(|s| !popular || s.popular)
                .cloned()
                .collect();

            let out = output::render_list(
                global.output(),
                &shown,
                |s| ServiceRow::new(s, &icons),
                |s| s.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServicesCommand::Get { id } => {
            let query = queries.service(&id);
            let service = util::settled_data(&query)
                .await
                .map_err(|e| util::not_found_as(e, "service", &id, "services list"))?;

            let out = output::render_single(
                global.output(),
                service.as_ref(),
                |s| detail(s, &icons),
                |s| s.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
