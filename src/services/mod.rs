pub mod chime;
pub mod clipboard;
pub mod geolocation;
pub mod weather;
