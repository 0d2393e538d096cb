//! Core library for the `meteomap` explorer.
//!
//! This crate defines:
//! - Location resolution by address or IP address
//! - Weather payload normalization and localized summaries
//! - Background category classification with asset fallback
//! - The place knowledge assistant (feature `assistant`)
//! - The session coordinator tying them together
//!
//! It is used by `meteomap-cli`, but can also back other front ends.

pub mod background;
pub mod config;
pub mod error;
#[cfg(feature = "assistant")]
pub mod knowledge;
pub mod localize;
pub mod location;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod session;

pub use background::{AssetCatalog, BackgroundCategory, DirectoryCatalog, classify, resolve_asset};
pub use config::Config;
pub use error::ExplorerError;
#[cfg(feature = "assistant")]
pub use knowledge::{KnowledgeAssistant, KnowledgeQuery, KnowledgeResult};
pub use location::LocationResolver;
pub use model::{
    Coordinate, Language, LocationRequest, LocationSource, ResolvedLocation, WeatherSnapshot,
    WeatherSummary,
};
pub use normalize::{normalize, render_summary};
pub use provider::WeatherProvider;
pub use session::{Outcome, SessionCoordinator, SessionPhase};
