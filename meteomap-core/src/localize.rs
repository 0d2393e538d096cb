//! Language-dependent phrasing. Only wording lives here; which lines appear
//! and in which order is decided by the callers.

use crate::model::Language;

pub(crate) struct SummaryLabels {
    pub feels_like: &'static str,
    pub humidity: &'static str,
    pub pressure: &'static str,
    pub wind: &'static str,
    pub wind_unit: &'static str,
    pub updated: &'static str,
    pub unknown_place: &'static str,
}

const EN_LABELS: SummaryLabels = SummaryLabels {
    feels_like: "feels like",
    humidity: "Humidity",
    pressure: "Pressure",
    wind: "Wind",
    wind_unit: "m/s",
    updated: "Updated",
    unknown_place: "Unknown place",
};

const UK_LABELS: SummaryLabels = SummaryLabels {
    feels_like: "відчувається як",
    humidity: "Вологість",
    pressure: "Тиск",
    wind: "Вітер",
    wind_unit: "м/с",
    updated: "Оновлено",
    unknown_place: "Невідоме місце",
};

pub(crate) fn summary_labels(language: Language) -> &'static SummaryLabels {
    match language {
        Language::En => &EN_LABELS,
        Language::Uk => &UK_LABELS,
    }
}

#[cfg(feature = "city-translations")]
const CITY_NAMES: &[(&str, &str)] = &[
    ("Kyiv", "Київ"),
    ("Lviv", "Львів"),
    ("London", "Лондон"),
    ("New York", "Нью-Йорк"),
    ("Pushcha-Vodytsya", "Пуща-Водиця"),
];

/// City name as it should be shown in `language`. Unknown names pass through.
#[cfg(feature = "city-translations")]
pub fn city_name(name: &str, language: Language) -> String {
    match language {
        Language::En => name.to_string(),
        Language::Uk => CITY_NAMES
            .iter()
            .find(|(en, _)| *en == name)
            .map(|(_, uk)| uk.to_string())
            .unwrap_or_else(|| name.to_string()),
    }
}

#[cfg(not(feature = "city-translations"))]
pub fn city_name(name: &str, _language: Language) -> String {
    name.to_string()
}

/// Upper-cases the first character, leaving the rest untouched.
pub(crate) fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Capitalizes every whitespace-separated word.
pub(crate) fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            capitalize_first(&lower)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalize_handles_cyrillic() {
        assert_eq!(capitalize_first("хмарно"), "Хмарно");
        assert_eq!(capitalize_first(""), "");
    }

    #[test]
    fn title_case_normalizes_words() {
        assert_eq!(title_case("  new   YORK "), "New York");
        assert_eq!(title_case("івано-франківськ"), "Івано-франківськ");
    }

    #[cfg(feature = "city-translations")]
    #[test]
    fn city_names_translate_to_ukrainian_only() {
        assert_eq!(city_name("Lviv", Language::Uk), "Львів");
        assert_eq!(city_name("Lviv", Language::En), "Lviv");
        assert_eq!(city_name("Odesa", Language::Uk), "Odesa");
    }
}
