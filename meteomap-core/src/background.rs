//! Maps weather descriptions to background categories and picks an
//! available asset for a category.

use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundCategory {
    Clear,
    Clouds,
    Rain,
    Storm,
    Snow,
    Default,
}

/// Ordered rules; the first rule with a matching keyword wins.
const RULES: &[(BackgroundCategory, &[&str])] = &[
    (BackgroundCategory::Storm, &["thunder", "storm"]),
    (BackgroundCategory::Rain, &["rain", "drizzle", "shower"]),
    (BackgroundCategory::Snow, &["snow", "sleet", "ice"]),
    (
        BackgroundCategory::Clouds,
        &["cloud", "overcast", "broken", "scattered", "mist", "fog", "haze"],
    ),
    (BackgroundCategory::Clear, &["clear", "sun"]),
];

impl BackgroundCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Clouds => "clouds",
            Self::Rain => "rain",
            Self::Storm => "storm",
            Self::Snow => "snow",
            Self::Default => "default",
        }
    }

    pub const fn all() -> &'static [BackgroundCategory] {
        &[
            Self::Clear,
            Self::Clouds,
            Self::Rain,
            Self::Storm,
            Self::Snow,
            Self::Default,
        ]
    }

    /// Categories to try, in order, when looking up an asset for `self`.
    pub fn fallback_chain(&self) -> &'static [BackgroundCategory] {
        match self {
            Self::Storm => &[Self::Storm, Self::Rain, Self::Default],
            Self::Clear => &[Self::Clear, Self::Default],
            Self::Clouds => &[Self::Clouds, Self::Default],
            Self::Rain => &[Self::Rain, Self::Default],
            Self::Snow => &[Self::Snow, Self::Default],
            Self::Default => &[Self::Default],
        }
    }
}

impl fmt::Display for BackgroundCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category for a weather description. Matching is case-insensitive and
/// works on substrings, so "Thundery rain showers" is a storm.
pub fn classify(description: &str) -> BackgroundCategory {
    let text = description.to_lowercase();

    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(BackgroundCategory::Default)
}

/// Lookup of concrete background assets.
pub trait AssetCatalog {
    fn asset(&self, category: BackgroundCategory) -> Option<PathBuf>;
}

impl AssetCatalog for HashMap<BackgroundCategory, PathBuf> {
    fn asset(&self, category: BackgroundCategory) -> Option<PathBuf> {
        self.get(&category).cloned()
    }
}

/// First asset available along the category's fallback chain.
pub fn resolve_asset(catalog: &dyn AssetCatalog, category: BackgroundCategory) -> Option<PathBuf> {
    let found = category
        .fallback_chain()
        .iter()
        .find_map(|candidate| catalog.asset(*candidate));

    if found.is_none() {
        tracing::warn!("No background asset available for '{category}'");
    }
    found
}

pub const SUPPORTED_EXTS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp", "gif"];

/// Catalog of images in one directory, matched by file name prefix
/// (`rain_1.jpg` serves the rain category).
#[derive(Debug, Clone, Default)]
pub struct DirectoryCatalog {
    assets: HashMap<BackgroundCategory, PathBuf>,
}

impl DirectoryCatalog {
    /// Scans `dir` once. A missing or unreadable directory gives an empty catalog.
    pub fn scan(dir: &Path) -> Self {
        let mut files: Vec<PathBuf> = match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file())
                .collect(),
            Err(e) => {
                tracing::warn!("Cannot read backgrounds directory {}: {e}", dir.display());
                Vec::new()
            }
        };
        files.sort();

        let mut assets = HashMap::new();
        for category in BackgroundCategory::all() {
            if let Some(path) = find_for_key(&files, category.as_str()) {
                tracing::debug!("Background for '{category}': {}", path.display());
                assets.insert(*category, path);
            }
        }

        if !assets.contains_key(&BackgroundCategory::Default) {
            let fallback = assets
                .get(&BackgroundCategory::Clear)
                .cloned()
                .or_else(|| {
                    BackgroundCategory::all()
                        .iter()
                        .find_map(|category| assets.get(category).cloned())
                });
            match fallback {
                Some(path) => {
                    assets.insert(BackgroundCategory::Default, path);
                }
                None => tracing::warn!("No background images found in {}", dir.display()),
            }
        }

        Self { assets }
    }
}

impl AssetCatalog for DirectoryCatalog {
    fn asset(&self, category: BackgroundCategory) -> Option<PathBuf> {
        self.assets.get(&category).cloned()
    }
}

fn find_for_key(files: &[PathBuf], key: &str) -> Option<PathBuf> {
    SUPPORTED_EXTS.iter().find_map(|ext| {
        files
            .iter()
            .find(|path| {
                let name_matches = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|stem| stem.to_lowercase().starts_with(key));
                let ext_matches = path
                    .extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(ext));
                name_matches && ext_matches
            })
            .cloned()
    })
}
