//! Turns a raw OpenWeather current-weather payload into a
//! [`WeatherSnapshot`] and renders it as localized text.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    ExplorerError,
    background::classify,
    error::Result,
    localize::{capitalize_first, city_name, summary_labels},
    model::{Language, WeatherSnapshot, WeatherSummary},
};

const MISSING_DESCRIPTION: &str = "—";

// Every field is optional: the provider omits values it did not measure.
// A field of the wrong JSON type fails deserialization and is reported as
// a malformed payload.
#[derive(Debug, Deserialize)]
struct OwPayload {
    weather: Option<Vec<OwWeather>>,
    main: Option<OwMain>,
    wind: Option<OwWind>,
    name: Option<String>,
    sys: Option<OwSys>,
    dt: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: Option<String>,
}

/// Normalizes `raw` without a fallback location label.
pub fn normalize(raw: &serde_json::Value, language: Language) -> Result<WeatherSnapshot> {
    normalize_with_fallback(raw, language, None)
}

/// Normalizes `raw`; `fallback_label` names the place when the payload
/// does not.
pub fn normalize_with_fallback(
    raw: &serde_json::Value,
    language: Language,
    fallback_label: Option<&str>,
) -> Result<WeatherSnapshot> {
    if !raw.is_object() {
        tracing::error!("Weather payload is not a JSON object: {raw}");
        return Err(ExplorerError::malformed("weather payload is not a JSON object"));
    }

    let payload = OwPayload::deserialize(raw).map_err(|e| {
        tracing::error!("Weather payload has unexpected shape: {e}");
        ExplorerError::malformed(format!("unexpected weather payload shape: {e}"))
    })?;

    let description = payload
        .weather
        .as_deref()
        .and_then(|w| w.first())
        .and_then(|w| w.description.as_deref())
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(capitalize_first)
        .unwrap_or_else(|| MISSING_DESCRIPTION.to_string());

    let main = payload.main.as_ref();
    let observed_at_utc = match payload.dt {
        Some(ts) => Some(DateTime::<Utc>::from_timestamp(ts, 0).ok_or_else(|| {
            ExplorerError::malformed(format!("observation timestamp out of range: {ts}"))
        })?),
        None => None,
    };

    Ok(WeatherSnapshot {
        description,
        temp_c: main.and_then(|m| m.temp),
        feels_like_c: main.and_then(|m| m.feels_like),
        humidity_pct: main.and_then(|m| m.humidity),
        pressure_hpa: main.and_then(|m| m.pressure),
        wind_ms: payload.wind.as_ref().and_then(|w| w.speed),
        observed_at_utc,
        location_label: location_label(&payload, language, fallback_label),
        language,
    })
}

fn location_label(payload: &OwPayload, language: Language, fallback: Option<&str>) -> String {
    let name = payload.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let country = payload
        .sys
        .as_ref()
        .and_then(|s| s.country.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty());

    match (name, country) {
        (Some(name), Some(country)) => format!("{}, {country}", city_name(name, language)),
        (Some(name), None) => city_name(name, language),
        (None, _) => fallback
            .map(str::to_string)
            .unwrap_or_else(|| summary_labels(language).unknown_place.to_string()),
    }
}

/// Renders `snapshot` line by line. Line order is the same in every
/// language and fields that were not reported produce no line.
pub fn render_summary(snapshot: &WeatherSnapshot, language: Language) -> String {
    let labels = summary_labels(language);
    let mut lines = vec![
        format!("📍 {}", snapshot.location_label),
        format!("🌤 {}", snapshot.description),
    ];

    if let Some(temp) = snapshot.temp_c {
        match snapshot.feels_like_c {
            Some(feels) => lines.push(format!(
                "🌡 {temp:.1} °C ({} {feels:.1} °C)",
                labels.feels_like
            )),
            None => lines.push(format!("🌡 {temp:.1} °C")),
        }
    }
    if let Some(humidity) = snapshot.humidity_pct {
        lines.push(format!("💧 {}: {humidity}%", labels.humidity));
    }
    if let Some(pressure) = snapshot.pressure_hpa {
        lines.push(format!("🔽 {}: {pressure} hPa", labels.pressure));
    }
    if let Some(wind) = snapshot.wind_ms {
        lines.push(format!("💨 {}: {wind:.1} {}", labels.wind, labels.wind_unit));
    }
    if let Some(observed) = snapshot.observed_at_utc {
        lines.push(format!(
            "⏰ {}: {}",
            labels.updated,
            observed.format("%Y-%m-%d %H:%M UTC")
        ));
    }

    lines.join("\n")
}

/// Text, background category and raw temperature for the presentation layer.
pub fn summarize(snapshot: &WeatherSnapshot, language: Language) -> WeatherSummary {
    WeatherSummary {
        text: render_summary(snapshot, language),
        category: classify(&snapshot.description),
        temp_c: snapshot.temp_c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::BackgroundCategory;
    use serde_json::json;

    fn full_payload() -> serde_json::Value {
        json!({
            "weather": [{"description": "light rain"}],
            "main": {"temp": 12.34, "feels_like": 11.0, "humidity": 81, "pressure": 1012},
            "wind": {"speed": 4.3},
            "name": "Lviv",
            "sys": {"country": "UA"},
            "dt": 1_700_000_000
        })
    }

    #[test]
    fn full_payload_renders_all_lines_in_order() {
        let snapshot = normalize(&full_payload(), Language::En).unwrap();
        let text = render_summary(&snapshot, Language::En);

        assert_eq!(
            text,
            "📍 Lviv, UA\n\
             🌤 Light rain\n\
             🌡 12.3 °C (feels like 11.0 °C)\n\
             💧 Humidity: 81%\n\
             🔽 Pressure: 1012 hPa\n\
             💨 Wind: 4.3 m/s\n\
             ⏰ Updated: 2023-11-14 22:13 UTC"
        );
    }

    #[test]
    fn line_order_is_language_independent() {
        let snapshot = normalize(&full_payload(), Language::Uk).unwrap();
        let text = render_summary(&snapshot, Language::Uk);
        let icons: Vec<&str> = text.lines().map(|l| l.split(' ').next().unwrap()).collect();

        assert_eq!(icons, ["📍", "🌤", "🌡", "💧", "🔽", "💨", "⏰"]);
        assert!(text.contains("відчувається як"));
        assert!(text.contains("Вологість: 81%"));
    }

    #[cfg(feature = "city-translations")]
    #[test]
    fn ukrainian_label_uses_translated_city() {
        let snapshot = normalize(&full_payload(), Language::Uk).unwrap();
        assert_eq!(snapshot.location_label, "Львів, UA");
    }

    #[test]
    fn missing_humidity_is_omitted_in_every_language() {
        let mut payload = full_payload();
        payload["main"].as_object_mut().unwrap().remove("humidity");

        for lang in Language::all() {
            let snapshot = normalize(&payload, *lang).unwrap();
            assert_eq!(snapshot.humidity_pct, None);

            let text = render_summary(&snapshot, *lang);
            assert!(!text.contains("💧"), "{lang}: {text}");
            assert_eq!(text.lines().count(), 6);
        }
    }

    #[test]
    fn null_fields_are_absent_not_zero() {
        let payload = json!({
            "weather": [],
            "main": {"temp": null, "pressure": 990},
            "wind": null
        });
        let snapshot = normalize(&payload, Language::En).unwrap();

        assert_eq!(snapshot.description, "—");
        assert_eq!(snapshot.temp_c, None);
        assert_eq!(snapshot.wind_ms, None);
        assert_eq!(snapshot.pressure_hpa, Some(990.0));
        assert_eq!(snapshot.observed_at_utc, None);
        assert_eq!(snapshot.location_label, "Unknown place");

        let text = render_summary(&snapshot, Language::En);
        assert_eq!(text, "📍 Unknown place\n🌤 —\n🔽 Pressure: 990 hPa");
    }

    #[test]
    fn temperature_without_feels_like_has_no_suffix() {
        let payload = json!({"main": {"temp": -3.0}});
        let snapshot = normalize(&payload, Language::En).unwrap();

        let text = render_summary(&snapshot, Language::En);
        assert!(text.ends_with("\n🌡 -3.0 °C"), "{text}");
        assert!(!text.contains("feels like"));
    }

    #[test]
    fn fallback_label_used_only_without_name() {
        let payload = json!({"weather": [{"description": "clear sky"}]});
        let snapshot =
            normalize_with_fallback(&payload, Language::En, Some("Kyiv, Ukraine")).unwrap();
        assert_eq!(snapshot.location_label, "Kyiv, Ukraine");

        let snapshot =
            normalize_with_fallback(&full_payload(), Language::En, Some("elsewhere")).unwrap();
        assert_eq!(snapshot.location_label, "Lviv, UA");
    }

    #[test]
    fn non_object_payload_is_malformed() {
        for payload in [json!([1, 2]), json!("text"), json!(null)] {
            assert!(matches!(
                normalize(&payload, Language::En),
                Err(ExplorerError::MalformedPayload(_))
            ));
        }
    }

    #[test]
    fn wrongly_typed_field_is_malformed() {
        let payload = json!({"main": {"temp": "warm"}});
        assert!(matches!(
            normalize(&payload, Language::En),
            Err(ExplorerError::MalformedPayload(_))
        ));
    }

    #[test]
    fn summary_carries_category_and_raw_temperature() {
        let payload = json!({
            "weather": [{"description": "thunderstorm with rain"}],
            "main": {"temp": 21.5}
        });
        let snapshot = normalize(&payload, Language::En).unwrap();
        let summary = summarize(&snapshot, Language::En);

        assert_eq!(summary.category, BackgroundCategory::Storm);
        assert_eq!(summary.temp_c, Some(21.5));
    }
}
