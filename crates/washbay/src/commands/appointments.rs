//! Appointment handlers.

use chrono::Utc;
use tabled::Tabled;
use washbay_core::{Appointment, AppointmentFilter, BookingRequest};

use crate::cli::{AppointmentsArgs, AppointmentsCommand, BookArgs, GlobalOpts};
use crate::config::Dashboard;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AppointmentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Customer")]
    customer: String,
    #[tabled(rename = "Vehicle")]
    vehicle: String,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Appointment> for AppointmentRow {
    fn from(a: &Appointment) -> Self {
        Self {
            id: a.id.clone(),
            when: util::fmt_time(a.scheduled_at),
            customer: a.customer_name.clone(),
            vehicle: a.vehicle.clone(),
            service: a.service_id.clone(),
            location: a.location_name.clone(),
            status: a.status.to_string(),
        }
    }
}

fn detail(a: &Appointment) -> String {
    let mut lines = vec![
        ("ID", a.id.clone()),
        ("When", util::fmt_time(a.scheduled_at)),
        ("Customer", a.customer_name.clone()),
        ("Vehicle", a.vehicle.clone()),
        ("Service", a.service_id.clone()),
        ("Location", a.location_name.clone()),
        ("Status", a.status.to_string()),
    ];
    if let Some(notes) = &a.notes {
        lines.push(("Notes", notes.clone()));
    }
    output::detail_lines(&lines)
}

fn booking_request(args: BookArgs) -> Result<BookingRequest, CliError> {
    let scheduled_at = match (args.at, args.in_) {
        (Some(at), _) => at,
        (None, Some(offset)) => {
            let offset = chrono::Duration::from_std(offset).map_err(|_| CliError::Validation {
                field: "in".into(),
                reason: "offset is too large".into(),
            })?;
            Utc::now() + offset
        }
        // clap's `when` group requires one of the two
        (None, None) => {
            return Err(CliError::Validation {
                field: "at".into(),
                reason: "either --at or --in is required".into(),
            });
        }
    };

    Ok(BookingRequest {
        customer_name: args.customer,
        vehicle: args.vehicle,
        service_id: args.service,
        location_id: args.location,
        scheduled_at,
        notes: args.notes,
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    queries: &Dashboard,
    args: AppointmentsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        AppointmentsCommand::List { status, location } => {
            let filter = AppointmentFilter {
                status,
                location_id: location,
            };
            let query = queries.appointments(filter);
            let appointments = util::settled_data(&query).await?;
            let out = output::render_list(
                global.output(),
                appointments.as_slice(),
                |a| AppointmentRow::from(a),
                |a| a.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AppointmentsCommand::Book(book) => {
            let request = booking_request(book)?;
            let appointment = queries.book(request).await?;
            if !global.quiet {
                eprintln!("✓ Booked {}", appointment.id);
            }
            let out = output::render_single(global.output(), &appointment, detail, |a| {
                a.id.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AppointmentsCommand::Cancel { id } => {
            if !util::confirm(
                &format!("Cancel appointment '{id}'?"),
                "appointments cancel",
                global.yes,
            )? {
                return Ok(());
            }
            let appointment = queries.cancel(&id).await?;
            if !global.quiet {
                eprintln!("✓ Cancelled {}", appointment.id);
            }
            Ok(())
        }
    }
}
