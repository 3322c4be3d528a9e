// Seed catalog for the mock backend. Appointment times are relative to
// the repository clock so "yesterday" and "tomorrow" stay meaningful.

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::model::{Appointment, AppointmentStatus, Location, Service, ServiceCategory};

pub(super) const RATINGS: [u8; 10] = [5, 5, 4, 5, 4, 5, 5, 3, 5, 4];

#[allow(clippy::too_many_arguments)]
fn service(
    id: &str,
    name: &str,
    description: &str,
    category: ServiceCategory,
    price_cents: u32,
    duration_minutes: u32,
    icon: &str,
    popular: bool,
) -> Service {
    Service {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        category,
        price_cents,
        duration_minutes,
        icon: icon.into(),
        popular,
    }
}

pub(super) fn services() -> Vec<Service> {
    vec![
        service(
            "svc-express",
            "Express Exterior",
            "Touchless wash, spot-free rinse and blow dry.",
            ServiceCategory::Exterior,
            1299,
            15,
            "droplet",
            false,
        ),
        service(
            "svc-premium",
            "Premium Shine",
            "Foam bath, undercarriage flush and spray wax.",
            ServiceCategory::Exterior,
            2499,
            25,
            "sparkles",
            true,
        ),
        service(
            "svc-interior",
            "Interior Refresh",
            "Vacuum, wipe-down of all surfaces and window cleaning.",
            ServiceCategory::Interior,
            2999,
            30,
            "brush",
            false,
        ),
        service(
            "svc-full",
            "Full Service",
            "Premium Shine outside plus Interior Refresh inside.",
            ServiceCategory::FullService,
            4999,
            50,
            "car",
            true,
        ),
        service(
            "svc-ceramic",
            "Ceramic Shield",
            "Hand-applied ceramic coating with clay bar prep.",
            ServiceCategory::Detailing,
            14999,
            120,
            "shield",
            false,
        ),
        service(
            "svc-tires",
            "Tire Shine",
            "Wheel scrub and long-lasting tire dressing.",
            ServiceCategory::Addon,
            599,
            10,
            "wind",
            false,
        ),
    ]
}

pub(super) fn locations() -> Vec<Location> {
    vec![
        Location {
            id: "loc-downtown".into(),
            name: "Downtown".into(),
            address: "120 Main St".into(),
            bays: 4,
        },
        Location {
            id: "loc-westside".into(),
            name: "Westside".into(),
            address: "4410 Sunset Blvd".into(),
            bays: 3,
        },
        Location {
            id: "loc-airport".into(),
            name: "Airport".into(),
            address: "7 Terminal Loop".into(),
            bays: 2,
        },
    ]
}

/// Appointments spread around `now`: finished ones yesterday, one in the
/// bay right now, and a few booked for tomorrow.
pub(super) fn appointments(now: DateTime<Utc>, locations: &[Location]) -> Vec<Appointment> {
    let hour = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    let yesterday = hour - Duration::days(1);
    let tomorrow = hour + Duration::days(1);

    #[rustfmt::skip]
    let rows: [(&str, &str, &str, &str, &str, DateTime<Utc>, AppointmentStatus); 8] = [
        ("apt-0001", "Dana Whitfield", "2019 Subaru Outback", "svc-full", "loc-downtown", yesterday, AppointmentStatus::Completed),
        ("apt-0002", "Marcus Lee", "2022 Tesla Model 3", "svc-premium", "loc-downtown", yesterday + Duration::hours(1), AppointmentStatus::Completed),
        ("apt-0003", "Priya Nair", "2017 Honda Civic", "svc-express", "loc-westside", yesterday + Duration::hours(2), AppointmentStatus::Completed),
        ("apt-0004", "Tom Alvarez", "2020 Ford F-150", "svc-ceramic", "loc-airport", yesterday + Duration::hours(3), AppointmentStatus::Completed),
        ("apt-0005", "Jess Moreau", "2015 Mazda 3", "svc-interior", "loc-westside", yesterday + Duration::hours(4), AppointmentStatus::Cancelled),
        ("apt-0006", "Ken Obi", "2021 Kia Telluride", "svc-premium", "loc-downtown", hour, AppointmentStatus::InProgress),
        ("apt-0007", "Ana Souza", "2018 Toyota RAV4", "svc-full", "loc-westside", tomorrow, AppointmentStatus::Scheduled),
        ("apt-0008", "Dana Whitfield", "2019 Subaru Outback", "svc-tires", "loc-airport", tomorrow + Duration::hours(2), AppointmentStatus::Scheduled),
    ];

    rows.into_iter()
        .map(
            |(id, customer, vehicle, service_id, location_id, scheduled_at, status)| Appointment {
                id: id.into(),
                customer_name: customer.into(),
                vehicle: vehicle.into(),
                service_id: service_id.into(),
                location_id: location_id.into(),
                location_name: locations
                    .iter()
                    .find(|l| l.id == location_id)
                    .map(|l| l.name.clone())
                    .unwrap_or_default(),
                scheduled_at,
                status,
                notes: None,
            },
        )
        .collect()
}
