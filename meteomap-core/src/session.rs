//! Owner of the current location and weather.
//!
//! Every action that fetches weather takes a new epoch. Work finishing under
//! an older epoch is dropped instead of overwriting what a newer action
//! produced, which stands in for cancelling the older network requests.
//! A refresh or language switch never cancels a location resolve in
//! progress; the resolve fetches in whatever language is current when its
//! weather arrives.

use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};

use crate::{
    Config, ExplorerError,
    error::Result,
    location::LocationResolver,
    model::{Language, LocationRequest, ResolvedLocation, WeatherSnapshot, WeatherSummary},
    normalize::{normalize_with_fallback, summarize},
    provider::{UnconfiguredProvider, WeatherProvider, provider_from_config},
};

#[cfg(feature = "assistant")]
use crate::knowledge::{KnowledgeAssistant, KnowledgeBase, KnowledgeQuery, PendingAnswer};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    Idle,
    Resolving,
    FetchingWeather,
    Ready,
    Error(ExplorerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnowledgePhase {
    Idle,
    Querying,
}

/// The location and the weather observed there, always replaced together.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentState {
    pub location: ResolvedLocation,
    /// `None` between a language change and the re-fetch completing.
    pub snapshot: Option<WeatherSnapshot>,
}

/// How an action ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Applied(T),
    /// A newer action started meanwhile; this result was discarded.
    Superseded,
}

#[derive(Debug)]
struct SessionState {
    epoch: u64,
    phase: SessionPhase,
    language: Language,
    current: Option<Arc<CurrentState>>,
    /// The action owning `epoch` is a location resolve still in progress.
    resolving: bool,
}

#[derive(Debug)]
struct Inner {
    resolver: LocationResolver,
    weather: Arc<dyn WeatherProvider>,
    #[cfg(feature = "assistant")]
    assistant: KnowledgeAssistant,
    state: Mutex<SessionState>,
}

#[derive(Debug, Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

impl SessionCoordinator {
    #[cfg_attr(not(feature = "assistant"), allow(unused_variables))]
    pub fn new(
        resolver: LocationResolver,
        weather: Arc<dyn WeatherProvider>,
        language: Language,
        thinking_delay: Duration,
    ) -> Self {
        #[cfg(feature = "assistant")]
        let assistant =
            KnowledgeAssistant::new(KnowledgeBase::builtin(), resolver.clone(), thinking_delay);

        Self {
            inner: Arc::new(Inner {
                resolver,
                weather,
                #[cfg(feature = "assistant")]
                assistant,
                state: Mutex::new(SessionState {
                    epoch: 0,
                    phase: SessionPhase::Idle,
                    language,
                    current: None,
                    resolving: false,
                }),
            }),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let resolver = LocationResolver::from_config(config)?;
        let weather = provider_from_config(config)?;

        Ok(Self::new(
            resolver,
            weather,
            config.language,
            config.assistant.thinking_delay(),
        ))
    }

    /// Coordinator that needs no API key, for knowledge queries. Weather
    /// requests fail with [`ExplorerError::Credential`].
    pub fn without_weather(config: &Config) -> anyhow::Result<Self> {
        let resolver = LocationResolver::from_config(config)?;

        Ok(Self::new(
            resolver,
            Arc::new(UnconfiguredProvider),
            config.language,
            config.assistant.thinking_delay(),
        ))
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.state.lock().phase.clone()
    }

    pub fn language(&self) -> Language {
        self.inner.state.lock().language
    }

    pub fn epoch(&self) -> u64 {
        self.inner.state.lock().epoch
    }

    pub fn current(&self) -> Option<Arc<CurrentState>> {
        self.inner.state.lock().current.clone()
    }

    /// Resolves a new location and fetches its weather.
    pub async fn resolve_location(
        &self,
        request: LocationRequest,
    ) -> Result<Outcome<ResolvedLocation>> {
        let epoch = {
            let mut state = self.inner.state.lock();
            let epoch = Self::start_epoch(&mut state, SessionPhase::Resolving);
            state.resolving = true;
            epoch
        };

        let resolved = match &request {
            LocationRequest::Address(text) => self.inner.resolver.resolve_by_address(text).await,
            LocationRequest::Ip => self.inner.resolver.resolve_by_ip().await,
        };
        let location = match resolved {
            Ok(location) => location,
            Err(e) => {
                self.fail(epoch, &e);
                return Err(e);
            }
        };

        // Read the language only now: it may have changed while resolving.
        let language = {
            let mut state = self.inner.state.lock();
            if state.epoch != epoch {
                tracing::info!("Location from epoch {epoch} superseded before weather fetch");
                return Ok(Outcome::Superseded);
            }
            state.phase = SessionPhase::FetchingWeather;
            state.language
        };

        match self.fetch_and_apply(epoch, location.clone(), language).await? {
            Outcome::Applied(_) => Ok(Outcome::Applied(location)),
            Outcome::Superseded => Ok(Outcome::Superseded),
        }
    }

    /// Re-fetches weather for the current location without resolving it again.
    ///
    /// While a new location is still being resolved there is nothing to
    /// refresh yet; the call returns [`Outcome::Superseded`] and leaves that
    /// resolve running.
    pub async fn refresh(&self) -> Result<Outcome<WeatherSnapshot>> {
        let (epoch, location, language) = {
            let mut state = self.inner.state.lock();
            if state.resolving {
                tracing::info!("Refresh skipped: a location resolve is in progress");
                return Ok(Outcome::Superseded);
            }
            let location = state
                .current
                .as_ref()
                .map(|current| current.location.clone())
                .ok_or(ExplorerError::NoLocation)?;
            let epoch = Self::start_epoch(&mut state, SessionPhase::FetchingWeather);
            (epoch, location, state.language)
        };
        tracing::info!("Refreshing weather for {}", location.display_name);

        self.fetch_and_apply(epoch, location, language).await
    }

    /// Switches the language and re-fetches, since descriptions are
    /// localized by the provider.
    ///
    /// Returns `None` when no fetch was started here: the language is
    /// unchanged, no location is selected yet, or a location resolve in
    /// progress will fetch in the new language itself.
    pub async fn set_language(
        &self,
        language: Language,
    ) -> Result<Option<Outcome<WeatherSnapshot>>> {
        let (epoch, location) = {
            let mut state = self.inner.state.lock();
            if state.language == language {
                return Ok(None);
            }
            state.language = language;
            tracing::info!("Language switched to '{language}'");

            // Cached text is in the old language; drop it until a re-fetch lands.
            let Some(location) = state.current.as_ref().map(|c| c.location.clone()) else {
                return Ok(None);
            };
            state.current = Some(Arc::new(CurrentState {
                location: location.clone(),
                snapshot: None,
            }));

            if state.resolving {
                tracing::debug!("Resolve in progress will fetch in '{language}'");
                return Ok(None);
            }
            (Self::start_epoch(&mut state, SessionPhase::FetchingWeather), location)
        };

        self.fetch_and_apply(epoch, location, language).await.map(Some)
    }

    /// Summary of the current snapshot with labels in `language`.
    pub fn weather_summary(&self, language: Language) -> Option<WeatherSummary> {
        let current = self.current()?;
        current.snapshot.as_ref().map(|snapshot| summarize(snapshot, language))
    }

    #[cfg(feature = "assistant")]
    pub fn knowledge_phase(&self) -> KnowledgePhase {
        if self.inner.assistant.is_busy() {
            KnowledgePhase::Querying
        } else {
            KnowledgePhase::Idle
        }
    }

    /// Hands `text` to the knowledge assistant. The answer arrives through
    /// the returned [`PendingAnswer`]; a query submitted while another is
    /// outstanding is rejected.
    #[cfg(feature = "assistant")]
    pub fn submit_knowledge_query(&self, text: &str, language: Language) -> Result<PendingAnswer> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ExplorerError::EmptyQuery);
        }

        self.inner.assistant.submit(KnowledgeQuery::new(text, language))
    }

    /// Starts a new action under the caller's lock: bumps the epoch and
    /// sets `phase`.
    fn start_epoch(state: &mut SessionState, phase: SessionPhase) -> u64 {
        if matches!(state.phase, SessionPhase::Error(_)) {
            tracing::debug!("Leaving error state");
            state.phase = SessionPhase::Idle;
        }
        state.epoch += 1;
        state.phase = phase;
        state.resolving = false;

        tracing::debug!("Epoch {} started: {:?}", state.epoch, state.phase);
        state.epoch
    }

    fn fail(&self, epoch: u64, error: &ExplorerError) {
        let mut state = self.inner.state.lock();
        if state.epoch == epoch {
            tracing::warn!("Epoch {epoch} failed: {error}");
            state.phase = SessionPhase::Error(error.clone());
            state.resolving = false;
        } else {
            tracing::debug!("Ignoring failure of superseded epoch {epoch}: {error}");
        }
    }

    /// Fetches and installs weather for `location` unless a newer action
    /// started meanwhile. A snapshot in a language the session no longer
    /// uses is fetched again in the current one.
    async fn fetch_and_apply(
        &self,
        epoch: u64,
        location: ResolvedLocation,
        mut language: Language,
    ) -> Result<Outcome<WeatherSnapshot>> {
        loop {
            let snapshot = match self.fetch_snapshot(&location, language).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    self.fail(epoch, &e);
                    return Err(e);
                }
            };

            let mut state = self.inner.state.lock();
            if state.epoch != epoch {
                tracing::info!(
                    "Discarding weather from epoch {epoch}; epoch {} is current",
                    state.epoch
                );
                return Ok(Outcome::Superseded);
            }

            if state.language != snapshot.language {
                tracing::info!(
                    "Weather arrived in '{}', re-fetching in '{}'",
                    snapshot.language,
                    state.language
                );
                language = state.language;
                continue;
            }

            state.current = Some(Arc::new(CurrentState {
                location,
                snapshot: Some(snapshot.clone()),
            }));
            state.phase = SessionPhase::Ready;
            state.resolving = false;
            tracing::info!("Weather ready for {}", snapshot.location_label);

            return Ok(Outcome::Applied(snapshot));
        }
    }

    async fn fetch_snapshot(
        &self,
        location: &ResolvedLocation,
        language: Language,
    ) -> Result<WeatherSnapshot> {
        let raw = self
            .inner
            .weather
            .fetch_current(location.coordinate, language)
            .await?;

        normalize_with_fallback(&raw, language, Some(&location.display_name))
    }
}
