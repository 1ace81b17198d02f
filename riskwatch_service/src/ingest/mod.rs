/// Weather data ingestion.
///
/// Submodules:
/// - `openweather` — OpenWeatherMap current conditions per zone.

pub mod openweather;
