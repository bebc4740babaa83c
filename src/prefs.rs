use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{ClockError, ClockResult};
use crate::locale;
use crate::storage::KeyValueStore;

pub const THEME_KEY: &str = "theme";
pub const DIAL_STYLE_KEY: &str = "dialStyle";
pub const TIME_FORMAT_KEY: &str = "timeFormat";
pub const LANGUAGE_KEY: &str = "language";

pub const DIAL_STYLES: [&str; 3] = ["classic", "modern", "minimal"];
pub const DEFAULT_DIAL_STYLE: &str = "classic";

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum TimeFormat {
    #[serde(rename = "12h")]
    H12,
    #[default]
    #[serde(rename = "24h")]
    H24,
}

impl TimeFormat {
    pub fn pattern(self) -> &'static str {
        match self {
            TimeFormat::H12 => "%I:%M:%S %p",
            TimeFormat::H24 => "%H:%M:%S",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Preferences {
    pub theme: Theme,
    pub dial_style: String,
    pub time_format: TimeFormat,
    pub language: String,
}

impl Preferences {
    pub fn defaults() -> Self {
        Self {
            theme: Theme::default(),
            dial_style: DEFAULT_DIAL_STYLE.to_string(),
            time_format: TimeFormat::default(),
            language: locale::system_language(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PreferencesPatch {
    pub theme: Option<Theme>,
    pub dial_style: Option<String>,
    pub time_format: Option<TimeFormat>,
    pub language: Option<String>,
}

pub struct PreferencesStore {
    storage: Box<dyn KeyValueStore>,
}

impl PreferencesStore {
    pub fn new(storage: Box<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Each field is read on its own; a missing or malformed one takes its default.
    pub fn get(&self) -> Preferences {
        let defaults = Preferences::defaults();
        Preferences {
            theme: self.read_field(THEME_KEY).unwrap_or(defaults.theme),
            dial_style: self
                .read_field::<String>(DIAL_STYLE_KEY)
                .filter(|style| !style.trim().is_empty())
                .unwrap_or(defaults.dial_style),
            time_format: self
                .read_field(TIME_FORMAT_KEY)
                .unwrap_or(defaults.time_format),
            language: self
                .read_field::<String>(LANGUAGE_KEY)
                .filter(|language| !language.trim().is_empty())
                .unwrap_or(defaults.language),
        }
    }

    /// All fields of the patch are written together, or none are.
    pub fn set(&mut self, patch: PreferencesPatch) -> ClockResult<Preferences> {
        let mut values = Vec::new();
        if let Some(theme) = patch.theme {
            values.push(field_value(THEME_KEY, &theme)?);
        }
        if let Some(style) = patch.dial_style {
            values.push(field_value(DIAL_STYLE_KEY, &style)?);
        }
        if let Some(format) = patch.time_format {
            values.push(field_value(TIME_FORMAT_KEY, &format)?);
        }
        if let Some(language) = patch.language {
            values.push(field_value(LANGUAGE_KEY, &language)?);
        }
        if !values.is_empty() {
            self.storage.set_many(values)?;
        }
        Ok(self.get())
    }

    fn read_field<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.storage.get(key)?;
        match serde_json::from_value::<T>(raw) {
            Ok(value) => Some(value),
            Err(err) => {
                let err = ClockError::PersistDataCorrupt {
                    key: key.to_string(),
                    reason: err.to_string(),
                };
                warn!(error = %err, "using default preference");
                None
            }
        }
    }
}

fn field_value<T: Serialize>(key: &str, value: &T) -> ClockResult<(String, Value)> {
    let value = serde_json::to_value(value).map_err(|err| ClockError::PersistDataCorrupt {
        key: key.to_string(),
        reason: err.to_string(),
    })?;
    Ok((key.to_string(), value))
}

/// Styles the renderer does not know are drawn as `classic`.
pub fn effective_dial_style(style: &str) -> &'static str {
    DIAL_STYLES
        .iter()
        .copied()
        .find(|known| *known == style)
        .unwrap_or(DEFAULT_DIAL_STYLE)
}
