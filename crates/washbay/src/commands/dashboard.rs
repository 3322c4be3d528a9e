//! Dashboard metrics handler.
//!
//! One-shot mode waits for the metrics query to settle and prints it with
//! its cache state. `--watch` keeps the query observed, invalidates it on
//! every tick and reprints whenever a refresh settles, until Ctrl-C.

use chrono::Utc;
use tabled::{Table, Tabled, settings::Style};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use washbay_core::{DashboardMetrics, DataState, LocationWashCount};

use crate::cli::{DashboardArgs, GlobalOpts};
use crate::config::Dashboard;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Rendering ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LocationRow {
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Washes")]
    washes: u32,
}

impl From<&LocationWashCount> for LocationRow {
    fn from(l: &LocationWashCount) -> Self {
        Self {
            location: l.location_name.clone(),
            washes: l.count,
        }
    }
}

fn detail(state: &DataState<DashboardMetrics>, color: bool) -> String {
    let mut out = Vec::new();

    if let Some(m) = state.data.as_deref().filter(|_| !state.is_empty) {
        out.push(output::heading("Metrics", color));
        out.push(output::detail_lines(&[
            ("Washes", m.total_washes.to_string()),
            ("Revenue", m.revenue_display()),
            ("Active customers", m.active_customers.to_string()),
            ("Average rating", format!("{:.1} / 5", m.average_rating)),
        ]));
        let rows: Vec<LocationRow> = m
            .washes_by_location
            .iter()
            .map(|l| LocationRow::from(l))
            .collect();
        out.push(Table::new(rows).with(Style::rounded()).to_string());
    } else if state.is_loading {
        out.push("Loading…".into());
    } else if !state.is_error {
        out.push("No washes recorded yet.".into());
    }

    if let Some(err) = state.error.as_ref().filter(|_| state.is_error) {
        out.push(format!("Error: {err}"));
    }

    let now = Utc::now();
    out.push(output::heading("Cache", color));
    out.push(output::detail_lines(&[
        ("Fetching", output::flag(state.is_fetching, false, color)),
        ("Stale", output::flag(state.is_stale, true, color)),
        ("Error", output::flag(state.is_error, true, color)),
        ("Empty", output::flag(state.is_empty, false, color)),
        (
            "Updated",
            state
                .last_updated
                .map_or_else(|| "never".into(), |at| format!("{} ago", util::fmt_age(at, now))),
        ),
    ]));

    out.join("\n")
}

fn render(state: &DataState<DashboardMetrics>, global: &GlobalOpts) -> Result<String, CliError> {
    let color = output::should_color(global.color());
    output::render_single(
        global.output(),
        state,
        |s| detail(s, color),
        |s| {
            s.data
                .as_ref()
                .map_or_else(String::new, |m| m.total_washes.to_string())
        },
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    queries: &Dashboard,
    args: DashboardArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if args.watch {
        return watch(queries, &args, global).await;
    }

    let query = queries.metrics();
    let state = query.settled().await;
    if let Some(err) = state.error.clone().filter(|_| state.is_error) {
        return Err(err.into());
    }
    output::print_output(&render(&state, global)?, global.quiet);
    Ok(())
}

async fn watch(
    queries: &Dashboard,
    args: &DashboardArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let mut query = queries.metrics();
    let mut last_shown = None;
    let mut show = |state: &DataState<DashboardMetrics>| -> Result<(), CliError> {
        // `changed()` can replay the state `settled()` already returned.
        let mark = (state.last_updated, state.is_error);
        if last_shown != Some(mark) {
            last_shown = Some(mark);
            output::print_output(&render(state, global)?, global.quiet);
        }
        Ok(())
    };
    show(&query.settled().await)?;

    let mut ticker = tokio::time::interval(args.interval);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            () = token.cancelled() => {
                debug!("watch interrupted");
                break;
            }
            _ = ticker.tick() => {
                let refreshed = queries.client().invalidate(Dashboard::metrics_key());
                debug!(refreshed, "refresh tick");
            }
            changed = query.changed() => match changed {
                Some(state) if !state.is_fetching => {
                    info!(stale = state.is_stale, error = state.is_error, "metrics settled");
                    show(&state)?;
                }
                Some(_) => {}
                None => break,
            },
        }
    }
    Ok(())
}
