use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ClockError, ClockResult};

const OPENWEATHERMAP_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub description: String,
    pub temperature_celsius: f64,
}

impl WeatherReport {
    pub fn label(&self) -> String {
        format!("{:.1}°C, {}", self.temperature_celsius, self.description)
    }
}

pub trait WeatherProvider: Send + Sync {
    fn fetch_weather(&self, city: &str) -> ClockResult<WeatherReport>;
}

pub struct OpenWeatherMap {
    agent: ureq::Agent,
    api_key: String,
    language: String,
}

impl OpenWeatherMap {
    pub fn new(api_key: impl Into<String>, language_tag: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(concat!("worldclock/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            api_key: api_key.into(),
            language: openweathermap_language(language_tag),
        }
    }
}

impl WeatherProvider for OpenWeatherMap {
    fn fetch_weather(&self, city: &str) -> ClockResult<WeatherReport> {
        let response = self
            .agent
            .get(OPENWEATHERMAP_URL)
            .query("q", city)
            .query("appid", &self.api_key)
            .query("units", "metric")
            .query("lang", &self.language)
            .call()
            .map_err(|err| ClockError::ExternalFetch(format!("weather for '{city}': {err}")))?;
        let body = response.into_string().map_err(|err| {
            ClockError::ExternalFetch(format!("weather body for '{city}': {err}"))
        })?;
        parse_weather_body(&body)
    }
}

#[derive(Debug, Deserialize)]
struct WeatherBody {
    weather: Vec<WeatherCondition>,
    main: WeatherMain,
}

#[derive(Debug, Deserialize)]
struct WeatherCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct WeatherMain {
    temp: f64,
}

fn parse_weather_body(body: &str) -> ClockResult<WeatherReport> {
    let parsed = serde_json::from_str::<WeatherBody>(body)
        .map_err(|err| ClockError::ExternalFetch(format!("unexpected weather payload: {err}")))?;
    let condition = parsed
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| ClockError::ExternalFetch("weather payload has no conditions".into()))?;
    Ok(WeatherReport {
        description: condition.description,
        temperature_celsius: parsed.main.temp,
    })
}

/// OpenWeatherMap takes `zh_cn`/`zh_tw` style codes for Chinese and the
/// primary subtag for everything else.
fn openweathermap_language(tag: &str) -> String {
    let lowered = tag.trim().to_ascii_lowercase().replace('-', "_");
    if lowered.starts_with("zh") || lowered.starts_with("pt_br") {
        return lowered;
    }
    let primary = lowered.split('_').next().unwrap_or_default();
    if primary.is_empty() {
        "en".to_string()
    } else {
        primary.to_string()
    }
}

#[derive(Debug)]
pub struct WeatherUpdate {
    pub name: String,
    pub result: ClockResult<WeatherReport>,
}

/// Runs each lookup on its own worker thread; completions are collected by
/// whoever owns the dispatcher, on their own schedule.
pub struct WeatherDispatcher {
    provider: Arc<dyn WeatherProvider>,
    sender: Sender<WeatherUpdate>,
    receiver: Receiver<WeatherUpdate>,
}

impl WeatherDispatcher {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            provider,
            sender,
            receiver,
        }
    }

    pub fn request(&self, name: &str) {
        let provider = Arc::clone(&self.provider);
        let sender = self.sender.clone();
        let city = name.to_string();
        let spawned = thread::Builder::new()
            .name("weather-lookup".to_string())
            .spawn(move || {
                let result = provider.fetch_weather(&city);
                debug!(name = %city, ok = result.is_ok(), "weather lookup finished");
                let _ = sender.send(WeatherUpdate { name: city, result });
            });
        if let Err(err) = spawned {
            warn!(name = %name, error = %err, "could not start weather lookup");
        }
    }

    pub fn drain(&self) -> Vec<WeatherUpdate> {
        let mut updates = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(update) => updates.push(update),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        updates
    }

    #[cfg(test)]
    pub fn wait_for_update(&self, timeout: std::time::Duration) -> Option<WeatherUpdate> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

/// No key, no lookups.
pub fn dispatcher_for(api_key: Option<&str>, language_tag: &str) -> Option<WeatherDispatcher> {
    let key = api_key.map(str::trim).filter(|key| !key.is_empty())?;
    Some(WeatherDispatcher::new(Arc::new(OpenWeatherMap::new(
        key,
        language_tag,
    ))))
}
