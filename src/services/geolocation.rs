use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use serde::Deserialize;
use tracing::warn;

use crate::error::{ClockError, ClockResult};

const IP_LOOKUP_URL: &str = "http://ip-api.com/json/";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

pub trait GeolocationProvider: Send + Sync {
    fn request_position(&self) -> ClockResult<Position>;
}

/// Coarse position from the public address of the host.
pub struct IpGeolocation {
    agent: ureq::Agent,
}

impl IpGeolocation {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .user_agent(concat!("worldclock/", env!("CARGO_PKG_VERSION")))
                .build(),
        }
    }
}

impl Default for IpGeolocation {
    fn default() -> Self {
        Self::new()
    }
}

impl GeolocationProvider for IpGeolocation {
    fn request_position(&self) -> ClockResult<Position> {
        let body = self
            .agent
            .get(IP_LOOKUP_URL)
            .query("fields", "status,message,lat,lon")
            .call()
            .map_err(|err| ClockError::ExternalFetch(format!("geolocation: {err}")))?
            .into_string()
            .map_err(|err| ClockError::ExternalFetch(format!("geolocation body: {err}")))?;
        parse_position_body(&body)
    }
}

#[derive(Debug, Deserialize)]
struct LookupBody {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

fn parse_position_body(body: &str) -> ClockResult<Position> {
    let parsed = serde_json::from_str::<LookupBody>(body).map_err(|err| {
        ClockError::ExternalFetch(format!("unexpected geolocation payload: {err}"))
    })?;
    if parsed.status != "success" {
        let reason = parsed.message.unwrap_or_else(|| parsed.status.clone());
        return Err(ClockError::ExternalFetch(format!(
            "geolocation declined: {reason}"
        )));
    }
    match (parsed.lat, parsed.lon) {
        (Some(latitude), Some(longitude)) => Ok(Position {
            latitude,
            longitude,
        }),
        _ => Err(ClockError::ExternalFetch(
            "geolocation payload has no coordinates".into(),
        )),
    }
}

/// Starts one lookup on a worker thread; the receiver yields exactly one result.
pub fn locate_in_background(
    provider: Arc<dyn GeolocationProvider>,
) -> Receiver<ClockResult<Position>> {
    let (sender, receiver) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("geolocation".to_string())
        .spawn(move || {
            let _ = sender.send(provider.request_position());
        });
    if let Err(err) = spawned {
        warn!(error = %err, "could not start geolocation lookup");
    }
    receiver
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    struct Declined;

    impl GeolocationProvider for Declined {
        fn request_position(&self) -> ClockResult<Position> {
            Err(ClockError::ExternalFetch("permission denied".into()))
        }
    }

    #[test]
    fn parses_successful_lookup() {
        let position =
            parse_position_body(r#"{ "status": "success", "lat": 35.69, "lon": 139.69 }"#)
                .expect("position");
        assert_eq!(
            position,
            Position {
                latitude: 35.69,
                longitude: 139.69
            }
        );
    }

    #[test]
    fn failed_lookup_carries_provider_message() {
        let err = parse_position_body(r#"{ "status": "fail", "message": "reserved range" }"#)
            .expect_err("declined");
        assert!(err.to_string().contains("reserved range"));
    }

    #[test]
    fn background_lookup_delivers_failure() {
        let receiver = locate_in_background(Arc::new(Declined));
        let result = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("one result");
        assert!(matches!(result, Err(ClockError::ExternalFetch(_))));
    }
}
