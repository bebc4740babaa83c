/// Timezones offered when adding a clock, in display order.
const TIMEZONES: &[&str] = &[
    "America/New_York",
    "Europe/London",
    "Asia/Tokyo",
    "Australia/Sydney",
    "Europe/Paris",
    "Asia/Shanghai",
    "Asia/Dubai",
    "America/Los_Angeles",
    "America/Chicago",
    "America/Sao_Paulo",
    "Europe/Berlin",
    "Europe/Moscow",
    "Africa/Cairo",
    "Africa/Johannesburg",
    "Asia/Kolkata",
    "Asia/Singapore",
    "Asia/Seoul",
    "Pacific/Auckland",
    "UTC",
];

pub struct TimezoneCatalog;

impl TimezoneCatalog {
    pub fn list(filter: &str) -> Vec<&'static str> {
        let needle = filter.to_lowercase();
        TIMEZONES
            .iter()
            .copied()
            .filter(|zone| zone.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn contains(timezone: &str) -> bool {
        TIMEZONES.contains(&timezone)
    }
}
