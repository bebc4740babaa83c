use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::clock::catalog::TimezoneCatalog;
use crate::clock::store::{ClockEntry, ClockEntryStore};
use crate::error::{ClockError, ClockResult};
use crate::render_loop::HandAngles;
use crate::services::geolocation::Position;
use crate::services::weather::{WeatherDispatcher, WeatherReport, WeatherUpdate};

pub const LOCAL_CLOCK_NAME: &str = "Local Time";

#[derive(Debug, Clone)]
pub struct ClockWidget {
    pub name: String,
    pub timezone: String,
    pub hands: HandAngles,
    pub local_time: Option<NaiveDateTime>,
    pub weather: Option<WeatherReport>,
    pub fallback_logged: bool,
}

impl ClockWidget {
    fn new(entry: &ClockEntry) -> Self {
        Self {
            name: entry.name.clone(),
            timezone: entry.timezone.clone(),
            hands: HandAngles::default(),
            local_time: None,
            weather: None,
            fallback_logged: false,
        }
    }
}

/// Live clocks in insertion order, backed by the entry store it owns.
pub struct ClockRegistry {
    store: ClockEntryStore,
    widgets: Vec<ClockWidget>,
    weather: Option<WeatherDispatcher>,
}

impl ClockRegistry {
    pub fn from_store(store: ClockEntryStore, weather: Option<WeatherDispatcher>) -> Self {
        let widgets = store.entries().iter().map(ClockWidget::new).collect();
        let registry = Self {
            store,
            widgets,
            weather,
        };
        for widget in &registry.widgets {
            registry.request_weather(&widget.name);
        }
        registry
    }

    /// Only catalog zones are accepted. Persists first; the widget only
    /// appears once the store accepted it.
    pub fn add_clock(&mut self, name: &str, timezone: &str) -> ClockResult<()> {
        if !TimezoneCatalog::contains(timezone) {
            return Err(ClockError::UnsupportedTimezone(timezone.to_string()));
        }
        self.insert_clock(name, timezone)
    }

    fn insert_clock(&mut self, name: &str, timezone: &str) -> ClockResult<()> {
        let entry = ClockEntry::new(name, timezone);
        self.store.add(entry.clone())?;
        self.widgets.push(ClockWidget::new(&entry));
        info!(name = %name, timezone = %timezone, "clock added");
        self.request_weather(name);
        Ok(())
    }

    /// Adds the clock for the host's own zone unless one by that name exists.
    pub fn add_local_clock(&mut self, timezone: &str) -> ClockResult<bool> {
        if self.contains(LOCAL_CLOCK_NAME) {
            return Ok(false);
        }
        self.insert_clock(LOCAL_CLOCK_NAME, timezone)?;
        Ok(true)
    }

    /// Handles the outcome of a position lookup. A declined or failed lookup
    /// adds nothing; a position adds the local clock in `local_timezone`.
    pub fn apply_location(
        &mut self,
        result: ClockResult<Position>,
        local_timezone: &str,
    ) -> ClockResult<bool> {
        let position = match result {
            Ok(position) => position,
            Err(err) => {
                warn!(error = %err, "no local clock added");
                return Ok(false);
            }
        };
        info!(
            latitude = position.latitude,
            longitude = position.longitude,
            timezone = %local_timezone,
            "located host"
        );
        self.add_local_clock(local_timezone)
    }

    pub fn remove_clock(&mut self, name: &str) -> ClockResult<bool> {
        let removed = self.store.remove(name)?;
        self.widgets.retain(|widget| widget.name != name);
        if removed {
            info!(name = %name, "clock removed");
        }
        Ok(removed)
    }

    pub fn all(&self) -> &[ClockWidget] {
        &self.widgets
    }

    pub(crate) fn widgets_mut(&mut self) -> &mut [ClockWidget] {
        &mut self.widgets
    }

    pub fn get(&self, name: &str) -> Option<&ClockWidget> {
        self.widgets.iter().find(|widget| widget.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn timezone_of(&self, name: &str) -> Option<&str> {
        self.store.get(name).map(|entry| entry.timezone.as_str())
    }

    pub fn store(&self) -> &ClockEntryStore {
        &self.store
    }

    /// Returns whether the update landed on a widget.
    pub fn apply_weather(&mut self, update: WeatherUpdate) -> bool {
        let Some(widget) = self
            .widgets
            .iter_mut()
            .find(|widget| widget.name == update.name)
        else {
            return false;
        };
        match update.result {
            Ok(report) => {
                widget.weather = Some(report);
                true
            }
            Err(err) => {
                warn!(name = %update.name, error = %err, "weather unavailable");
                widget.weather = None;
                false
            }
        }
    }

    pub fn poll_weather(&mut self) -> usize {
        let updates = match &self.weather {
            Some(dispatcher) => dispatcher.drain(),
            None => return 0,
        };
        let mut applied = 0;
        for update in updates {
            if self.apply_weather(update) {
                applied += 1;
            }
        }
        applied
    }

    /// Swaps the weather source and asks it about every live clock.
    pub fn set_weather_dispatcher(&mut self, weather: Option<WeatherDispatcher>) {
        self.weather = weather;
        for widget in &mut self.widgets {
            widget.weather = None;
        }
        for widget in &self.widgets {
            self.request_weather(&widget.name);
        }
    }

    fn request_weather(&self, name: &str) {
        if let Some(dispatcher) = &self.weather {
            dispatcher.request(name);
        }
    }
}
