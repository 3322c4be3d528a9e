//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};

use washbay_core::{DataState, Query};

use crate::error::CliError;

/// Wait for `query` to settle and hand back its data, or the error that
/// ended its retries.
pub async fn settled_data<T: Send + Sync + 'static>(query: &Query<T>) -> Result<Arc<T>, CliError> {
    into_data(query.settled().await)
}

/// Data of a settled state. An error wins over stale data.
pub fn into_data<T>(state: DataState<T>) -> Result<Arc<T>, CliError> {
    if let Some(err) = state.error.filter(|_| state.is_error) {
        return Err(err.into());
    }
    state.data.ok_or_else(|| CliError::Backend {
        message: "query settled without data".into(),
    })
}

/// Turn a 404 from a single-resource query into a `NotFound` that points
/// at the right listing command.
pub fn not_found_as(
    err: CliError,
    resource_type: &str,
    identifier: &str,
    list_command: &str,
) -> CliError {
    match err {
        CliError::Query {
            status: Some(404), ..
        } => CliError::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            list_command: list_command.into(),
        },
        other => other,
    }
}

/// Prompt the user for confirmation. Returns `true` if `--yes` was passed.
///
/// Without a terminal to prompt on, `--yes` is required.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Local wall-clock rendering for tables.
pub fn fmt_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Human age like `3m 12s`, rounded to whole seconds.
pub fn fmt_age(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - since).num_seconds().max(0).unsigned_abs();
    humantime::format_duration(std::time::Duration::from_secs(secs)).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use washbay_core::FetchError;

    use super::*;

    fn failed<T>(err: FetchError) -> DataState<T> {
        DataState {
            data: None,
            error: Some(err),
            is_loading: false,
            is_error: true,
            is_fetching: false,
            is_empty: false,
            is_stale: false,
            last_updated: None,
        }
    }

    #[test]
    fn error_wins_over_stale_data() {
        let mut state: DataState<u32> = failed(FetchError::with_status("down", 503));
        state.data = Some(Arc::new(7));

        assert!(matches!(into_data(state), Err(CliError::Unavailable { .. })));
    }

    #[test]
    fn not_found_points_at_listing() {
        let err: CliError = FetchError::with_status("service not found: svc-x", 404).into();
        let err = not_found_as(err, "service", "svc-x", "services list");

        assert_eq!(err.to_string(), "service 'svc-x' not found");
    }

    #[test]
    fn age_rounds_to_seconds() {
        let now = Utc::now();
        let since = now - chrono::Duration::milliseconds(192_400);
        assert_eq!(fmt_age(since, now), "3m 12s");
    }
}
