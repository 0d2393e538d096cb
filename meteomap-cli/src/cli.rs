use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::{Password, Select, Text};
use std::path::PathBuf;

use meteomap_core::{
    BackgroundCategory, Config, DirectoryCatalog, ExplorerError, Language, LocationRequest,
    Outcome, SessionCoordinator, classify, model::DEFAULT_ZOOM, resolve_asset,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteomap", version, about = "Map & weather explorer")]
pub struct Cli {
    /// Print debug logs to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the OpenWeather API key, language and backgrounds directory.
    Configure,

    /// Show weather for an address.
    Show {
        /// Address or place name.
        address: String,

        /// Summary language ("en" or "uk"); defaults to the configured one.
        #[arg(long)]
        lang: Option<String>,
    },

    /// Show weather at your approximate location, detected from your IP address.
    Here {
        #[arg(long)]
        lang: Option<String>,
    },

    /// Ask the assistant about a country or city.
    Ask {
        query: String,

        #[arg(long)]
        lang: Option<String>,
    },

    /// Print the background category for a weather description.
    Classify { description: String },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;

        match self.command {
            Command::Configure => configure(&mut config),
            Command::Show { address, lang } => {
                apply_language(&mut config, lang.as_deref())?;
                show_weather(&config, LocationRequest::Address(address)).await
            }
            Command::Here { lang } => {
                apply_language(&mut config, lang.as_deref())?;
                show_weather(&config, LocationRequest::Ip).await
            }
            Command::Ask { query, lang } => {
                apply_language(&mut config, lang.as_deref())?;
                ask(&config, &query).await
            }
            Command::Classify { description } => {
                let category = classify(&description);
                println!("Category: {category}");
                print_background(&config, category);
                Ok(())
            }
        }
    }
}

fn apply_language(config: &mut Config, lang: Option<&str>) -> anyhow::Result<()> {
    if let Some(lang) = lang {
        config.language = Language::try_from(lang)?;
    }
    Ok(())
}

fn configure(config: &mut Config) -> anyhow::Result<()> {
    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_help_message("Get one at https://openweathermap.org/api")
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key);
    }

    config.language = Select::new("Language:", Language::all().to_vec())
        .prompt()
        .context("Failed to read language")?;

    let current_dir = config
        .backgrounds_dir
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let dir = Text::new("Backgrounds directory (empty to skip):")
        .with_default(&current_dir)
        .prompt()
        .context("Failed to read backgrounds directory")?;
    config.backgrounds_dir = Some(dir.trim()).filter(|d| !d.is_empty()).map(PathBuf::from);

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show_weather(config: &Config, request: LocationRequest) -> anyhow::Result<()> {
    let session = SessionCoordinator::from_config(config)?;

    let location = match session.resolve_location(request).await.map_err(explain)? {
        Outcome::Applied(location) => location,
        Outcome::Superseded => return Err(anyhow!("Request was superseded")),
    };

    let summary = session
        .weather_summary(config.language)
        .ok_or_else(|| anyhow!("No weather available for {}", location.display_name))?;

    println!("{}", summary.text);
    println!();
    println!("Category: {}", summary.category);
    print_background(config, summary.category);
    println!("Map: {}", location.coordinate.osm_url(DEFAULT_ZOOM));
    Ok(())
}

async fn ask(config: &Config, query: &str) -> anyhow::Result<()> {
    // Answering needs no weather, so no API key either.
    let session = SessionCoordinator::without_weather(config)?;

    let pending = session
        .submit_knowledge_query(query, config.language)
        .map_err(explain)?;
    eprintln!("Thinking...");

    let answer = pending.wait().await.map_err(explain)?;
    println!("{}", answer.text());
    Ok(())
}

fn print_background(config: &Config, category: BackgroundCategory) {
    let Some(dir) = &config.backgrounds_dir else {
        return;
    };

    let catalog = DirectoryCatalog::scan(dir);
    match resolve_asset(&catalog, category) {
        Some(path) => println!("Background: {}", path.display()),
        None => println!("Background: none found in {}", dir.display()),
    }
}

fn explain(err: ExplorerError) -> anyhow::Error {
    anyhow!("{}\n({err})", err.user_message())
}
