//! Place knowledge assistant.
//!
//! Answers free-text questions about countries and cities from a built-in
//! table. Queries run on a background task and at most one may be
//! outstanding at a time; a second submission is rejected, not queued.

use std::{
    collections::HashMap,
    sync::{
        Arc, LazyLock,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::sync::oneshot;

use crate::{
    ExplorerError,
    error::Result,
    localize::title_case,
    location::LocationResolver,
    model::Language,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Country,
    City,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnowledgeEntry {
    pub key: &'static str,
    pub body: &'static str,
    pub kind: EntryKind,
}

const BUILTIN_ENTRIES: &[KnowledgeEntry] = &[
    // Countries
    KnowledgeEntry {
        key: "грузія",
        body: "**Країна:** Грузія (Сакартвело)\n**Столиця:** Тбілісі\n**Населення:** ~3.7 млн\n**Історія:** Країна з тисячолітньою історією на перехресті Європи та Азії. Відома виноробством та стародавніми храмами.",
        kind: EntryKind::Country,
    },
    KnowledgeEntry {
        key: "georgia",
        body: "**Country:** Georgia (Sakartvelo)\n**Capital:** Tbilisi\n**Population:** ~3.7 million\n**History:** A country with a thousand-year history at the crossroads of Europe and Asia. Known for its winemaking and ancient churches.",
        kind: EntryKind::Country,
    },
    KnowledgeEntry {
        key: "україна",
        body: "**Країна:** Україна\n**Столиця:** Київ\n**Населення:** ~41 млн (до 2022)\n**Особливості:** Друга за площею країна в Європі, відома своєю культурою та родючими чорноземами.",
        kind: EntryKind::Country,
    },
    KnowledgeEntry {
        key: "ukraine",
        body: "**Country:** Ukraine\n**Capital:** Kyiv\n**Population:** ~41 million (before 2022)\n**Features:** The second largest country in Europe by area, known for its culture and fertile black soil.",
        kind: EntryKind::Country,
    },
    KnowledgeEntry {
        key: "казахстан",
        body: "**Країна:** Казахстан\n**Столиця:** Астана\n**Населення:** ~20 млн\n**Особливості:** Дев'ята за площею країна світу. Відома космодромом Байконур та величезними степами.",
        kind: EntryKind::Country,
    },
    KnowledgeEntry {
        key: "kazakhstan",
        body: "**Country:** Kazakhstan\n**Capital:** Astana\n**Population:** ~20 million\n**Features:** Ninth largest country by area. Known for the Baikonur Cosmodrome and vast steppes.",
        kind: EntryKind::Country,
    },
    KnowledgeEntry {
        key: "hungary",
        body: "**Country:** Hungary\n**Capital:** Budapest\n**Population:** ~9.6 million\n**Features:** Known for its thermal waters, vibrant culture and historical role in Central Europe.",
        kind: EntryKind::Country,
    },
    // Cities
    KnowledgeEntry {
        key: "львів",
        body: "**Місто:** Львів\n**Область:** Львівська\n**Історія:** Заснований у **13 столітті**. Головний культурний та освітній центр Західної України. Історичний центр внесений до списку Світової спадщини ЮНЕСКО.",
        kind: EntryKind::City,
    },
    KnowledgeEntry {
        key: "lviv",
        body: "**City:** Lviv\n**Region:** Lviv Oblast\n**History:** Founded in the **13th century**. The main cultural and educational center of Western Ukraine. Its historic center is a UNESCO World Heritage Site.",
        kind: EntryKind::City,
    },
    KnowledgeEntry {
        key: "вінниця",
        body: "**Місто:** Вінниця\n**Область:** Вінницька\n**Історія:** Перша згадка датується **1363 роком**. Назва, ймовірно, походить від слова 'віно'. Відома фонтаном Roshen.",
        kind: EntryKind::City,
    },
    KnowledgeEntry {
        key: "vinnytsia",
        body: "**City:** Vinnytsia\n**Region:** Vinnytsia Oblast\n**History:** First mentioned in **1363**. Known for the Roshen fountain on the Southern Bug river.",
        kind: EntryKind::City,
    },
    KnowledgeEntry {
        key: "київ",
        body: "**Місто:** Київ\n**Розташування:** Столиця України, на річці Дніпро.\n**Історія:** Одне з найдавніших міст Східної Європи, засноване у **V столітті**. Був центром Київської Русі.",
        kind: EntryKind::City,
    },
    KnowledgeEntry {
        key: "kyiv",
        body: "**City:** Kyiv\n**Location:** Capital of Ukraine, on the Dnieper River.\n**History:** One of the oldest cities in Eastern Europe, founded in the **5th century**. It was the center of Kyivan Rus'.",
        kind: EntryKind::City,
    },
    KnowledgeEntry {
        key: "paris",
        body: "**City:** Paris\n**Location:** Capital of France, on the River Seine.\n**History:** A global center for art and fashion since the **10th century**.",
        kind: EntryKind::City,
    },
    KnowledgeEntry {
        key: "париж",
        body: "**Місто:** Париж\n**Розташування:** Столиця Франції, на річці Сена.\n**Історія:** Відомий як 'Місто кохання' та світовий центр мистецтва і моди. Тут знаходяться Ейфелева вежа та Лувр.",
        kind: EntryKind::City,
    },
];

static BUILTIN: LazyLock<Arc<KnowledgeBase>> =
    LazyLock::new(|| Arc::new(KnowledgeBase::from_entries(BUILTIN_ENTRIES.iter().copied())));

/// Immutable key → entry table.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    entries: HashMap<String, KnowledgeEntry>,
}

impl KnowledgeBase {
    /// The built-in table, constructed on first use and shared afterwards.
    pub fn builtin() -> Arc<Self> {
        Arc::clone(&BUILTIN)
    }

    pub fn from_entries(entries: impl IntoIterator<Item = KnowledgeEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (normalize_key(entry.key), entry))
            .collect();
        Self { entries }
    }

    pub fn lookup(&self, text: &str) -> Option<&KnowledgeEntry> {
        self.entries.get(&normalize_key(text))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn normalize_key(text: &str) -> String {
    text.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeQuery {
    pub raw_text: String,
    pub language: Language,
}

impl KnowledgeQuery {
    pub fn new(raw_text: impl Into<String>, language: Language) -> Self {
        Self { raw_text: raw_text.into(), language }
    }
}

/// What the map data suggested about a place missing from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackHint {
    Capital,
    Place,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeResult {
    Found { entry: KnowledgeEntry, text: String },
    Fallback { hint: FallbackHint, text: String },
}

impl KnowledgeResult {
    pub fn text(&self) -> &str {
        match self {
            Self::Found { text, .. } | Self::Fallback { text, .. } => text,
        }
    }
}

struct AssistantPhrases {
    country_header: &'static str,
    city_header: &'static str,
    not_found_header: &'static str,
    not_in_base: &'static str,
    capital_hint: &'static str,
    place_hint: &'static str,
}

const EN_PHRASES: AssistantPhrases = AssistantPhrases {
    country_header: "🌍 Country assistant:",
    city_header: "🏙️ City assistant:",
    not_found_header: "⚠️ Not found:",
    not_in_base: "I could not find detailed information about **{place}** in my current knowledge base.",
    capital_hint: "However, according to map data, this is an important capital.",
    place_hint: "However, according to map data, this is an important place.",
};

const UK_PHRASES: AssistantPhrases = AssistantPhrases {
    country_header: "🌍 Країна-Асистент:",
    city_header: "🏙️ Місто-Асистент:",
    not_found_header: "⚠️ Не знайдено:",
    not_in_base: "Я не знайшов детальної інформації про **{place}** у своїй поточній базі.",
    capital_hint: "Проте, згідно з картографічними даними, це важлива столиця.",
    place_hint: "Проте, згідно з картографічними даними, це важливе місце.",
};

fn phrases(language: Language) -> &'static AssistantPhrases {
    match language {
        Language::En => &EN_PHRASES,
        Language::Uk => &UK_PHRASES,
    }
}

fn suggests_capital(display_name: &str) -> bool {
    let lower = display_name.to_lowercase();
    lower.contains("capital") || lower.contains("столиц")
}

#[derive(Debug, Clone)]
pub struct KnowledgeAssistant {
    base: Arc<KnowledgeBase>,
    resolver: LocationResolver,
    thinking_delay: Duration,
    in_flight: Arc<AtomicBool>,
}

impl KnowledgeAssistant {
    pub fn new(base: Arc<KnowledgeBase>, resolver: LocationResolver, thinking_delay: Duration) -> Self {
        Self {
            base,
            resolver,
            thinking_delay,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a submitted query has not yet delivered its result.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Answers `query` directly. A miss is a normal [`KnowledgeResult::Fallback`].
    pub async fn answer(&self, query: &KnowledgeQuery) -> KnowledgeResult {
        let phrases = phrases(query.language);

        if let Some(entry) = self.base.lookup(&query.raw_text) {
            tracing::info!("Knowledge hit for '{}'", entry.key);
            let header = match entry.kind {
                EntryKind::Country => phrases.country_header,
                EntryKind::City => phrases.city_header,
            };
            return KnowledgeResult::Found {
                entry: *entry,
                text: format!("{header}\n{}", entry.body),
            };
        }

        tracing::warn!("No knowledge entry for '{}', asking the geocoder", query.raw_text);

        let hint = match self.resolver.resolve_by_address(&query.raw_text).await {
            Ok(resolved) if suggests_capital(&resolved.display_name) => FallbackHint::Capital,
            Ok(_) => FallbackHint::Place,
            Err(e) => {
                tracing::debug!("Geocoder gave no hint for '{}': {e}", query.raw_text);
                FallbackHint::None
            }
        };

        let place = title_case(&query.raw_text);
        let mut text = format!(
            "{}\n{}",
            phrases.not_found_header,
            phrases.not_in_base.replace("{place}", &place)
        );
        match hint {
            FallbackHint::Capital => {
                text.push(' ');
                text.push_str(phrases.capital_hint);
            }
            FallbackHint::Place => {
                text.push(' ');
                text.push_str(phrases.place_hint);
            }
            FallbackHint::None => {}
        }

        KnowledgeResult::Fallback { hint, text }
    }

    /// Starts answering `query` on a background task.
    ///
    /// Returns [`ExplorerError::ConcurrentRequestRejected`] while an earlier
    /// query is still outstanding.
    pub fn submit(&self, query: KnowledgeQuery) -> Result<PendingAnswer> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ExplorerError::Internal(format!("no async runtime: {e}")))?;

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!("Rejected knowledge query '{}': another is in flight", query.raw_text);
            return Err(ExplorerError::ConcurrentRequestRejected);
        }
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        let (tx, rx) = oneshot::channel();
        let worker = self.clone();
        runtime.spawn(async move {
            if !worker.thinking_delay.is_zero() {
                tokio::time::sleep(worker.thinking_delay).await;
            }
            let result = worker.answer(&query).await;

            // Free the slot before delivering, so the receiver may submit again at once.
            drop(guard);
            if tx.send(result).is_err() {
                tracing::debug!("Knowledge result for '{}' had no receiver", query.raw_text);
            }
        });

        Ok(PendingAnswer { rx })
    }
}

/// Clears the in-flight flag when the worker finishes, even by panicking.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Result of a submitted query, delivered exactly once.
#[derive(Debug)]
pub struct PendingAnswer {
    rx: oneshot::Receiver<KnowledgeResult>,
}

impl PendingAnswer {
    pub async fn wait(self) -> Result<KnowledgeResult> {
        self.rx
            .await
            .map_err(|_| ExplorerError::Internal("knowledge worker stopped without an answer".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::fakes::{FailingGeocoder, TableGeocoder, kyiv_ip};

    fn assistant_with(geocoder: impl crate::location::Geocoder + 'static, delay: Duration) -> KnowledgeAssistant {
        let resolver = LocationResolver::new(Arc::new(geocoder), Arc::new(kyiv_ip()));
        KnowledgeAssistant::new(KnowledgeBase::builtin(), resolver, delay)
    }

    #[tokio::test]
    async fn lviv_is_a_city_founded_in_13th_century() {
        let assistant = assistant_with(FailingGeocoder, Duration::ZERO);
        let result = assistant.answer(&KnowledgeQuery::new("  LVIV ", Language::En)).await;

        let KnowledgeResult::Found { entry, text } = result else {
            panic!("expected a hit");
        };
        assert_eq!(entry.kind, EntryKind::City);
        assert!(text.starts_with("🏙️ City assistant:"));
        assert!(text.contains("13th century"));
    }

    #[tokio::test]
    async fn country_entry_gets_country_header() {
        let assistant = assistant_with(FailingGeocoder, Duration::ZERO);
        let result = assistant.answer(&KnowledgeQuery::new("Грузія", Language::Uk)).await;

        assert!(result.text().starts_with("🌍 Країна-Асистент:"));
        assert!(result.text().contains("Тбілісі"));
    }

    #[tokio::test]
    async fn miss_with_capital_hint() {
        let geo = TableGeocoder::default().with("Warsaw", 52.23, 21.01, "Warsaw, capital of Poland");
        let assistant = assistant_with(geo, Duration::ZERO);

        let result = assistant.answer(&KnowledgeQuery::new("warsaw", Language::En)).await;
        assert!(matches!(result, KnowledgeResult::Fallback { hint: FallbackHint::Capital, .. }));
        assert!(result.text().contains("**Warsaw**"));
        assert!(result.text().contains("important capital"));
    }

    #[tokio::test]
    async fn miss_with_place_hint() {
        let geo = TableGeocoder::default().with("Odesa", 46.48, 30.72, "Odesa, Ukraine");
        let assistant = assistant_with(geo, Duration::ZERO);

        let result = assistant.answer(&KnowledgeQuery::new("Odesa", Language::Uk)).await;
        assert!(matches!(result, KnowledgeResult::Fallback { hint: FallbackHint::Place, .. }));
        assert!(result.text().contains("важливе місце"));
    }

    #[tokio::test]
    async fn miss_without_geocode_omits_hint() {
        let assistant = assistant_with(FailingGeocoder, Duration::ZERO);

        let result = assistant.answer(&KnowledgeQuery::new("narnia", Language::En)).await;
        assert!(matches!(result, KnowledgeResult::Fallback { hint: FallbackHint::None, .. }));
        assert!(!result.text().contains("However"));
        assert!(result.text().contains("**Narnia**"));
    }

    #[tokio::test]
    async fn second_submission_is_rejected_while_first_completes() {
        let assistant = assistant_with(FailingGeocoder, Duration::from_millis(200));

        let first = assistant.submit(KnowledgeQuery::new("lviv", Language::En)).unwrap();
        assert!(assistant.is_busy());

        let second = assistant.submit(KnowledgeQuery::new("kyiv", Language::En));
        assert_eq!(second.unwrap_err(), ExplorerError::ConcurrentRequestRejected);

        let result = first.wait().await.unwrap();
        assert!(result.text().contains("Lviv"));
        assert!(!assistant.is_busy());

        // The slot is free again once the first answer arrived.
        let third = assistant.submit(KnowledgeQuery::new("kyiv", Language::En)).unwrap();
        assert!(third.wait().await.unwrap().text().contains("Kyiv"));
    }

    #[test]
    fn submit_outside_runtime_is_internal_error() {
        let assistant = assistant_with(FailingGeocoder, Duration::ZERO);
        let err = assistant.submit(KnowledgeQuery::new("lviv", Language::En)).unwrap_err();

        assert!(matches!(err, ExplorerError::Internal(_)));
        assert!(!assistant.is_busy());
    }

    #[test]
    fn builtin_keys_are_normalized() {
        let base = KnowledgeBase::builtin();
        assert_eq!(base.len(), BUILTIN_ENTRIES.len());
        assert!(!base.is_empty());
        assert!(base.lookup("Kyiv").is_some());
        assert!(base.lookup("Київ").is_some());
        assert!(base.lookup("atlantis").is_none());
    }
}
