mod app;
mod handler;
mod tui;
mod ui;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use groundwater_core::{ChatSession, Config, HttpBackend, Services};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use app::App;
use handler::handle_event;
use tui::EventHandler;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LocationArg {
    /// Look the position up from the network
    Auto,
    /// Skip the automatic location flow
    Off,
    /// Behave as if permission was refused
    Deny,
}

impl LocationArg {
    fn as_str(self) -> &'static str {
        match self {
            LocationArg::Auto => "auto",
            LocationArg::Off => "off",
            LocationArg::Deny => "deny",
        }
    }
}

#[derive(Parser)]
#[command(name = "groundwater")]
#[command(version, about = "Chat about groundwater level, quality, and irrigation status")]
struct Cli {
    /// Base URL of the groundwater service
    #[arg(long)]
    backend_url: Option<String>,

    /// Reply language: en, ta or te
    #[arg(short, long)]
    language: Option<String>,

    /// Fixed latitude used instead of a network lookup
    #[arg(long, requires = "longitude", allow_hyphen_values = true)]
    latitude: Option<f64>,

    /// Fixed longitude used instead of a network lookup
    #[arg(long, requires = "latitude", allow_hyphen_values = true)]
    longitude: Option<f64>,

    /// How the startup position is obtained
    #[arg(long, value_enum)]
    location: Option<LocationArg>,

    /// Path to a JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Apply command line flags on top of the file and environment settings
fn apply_cli(mut config: Config, cli: &Cli) -> Config {
    config = config.override_backend_url(cli.backend_url.clone());
    if let Some(language) = &cli.language {
        config.language = Some(language.clone());
    }
    if let (Some(latitude), Some(longitude)) = (cli.latitude, cli.longitude) {
        config.latitude = Some(latitude);
        config.longitude = Some(longitude);
        config.location = Some("auto".to_string());
    }
    if let Some(location) = cli.location {
        config.location = Some(location.as_str().to_string());
    }
    config
}

/// Log to a file, the terminal belongs to the UI
fn init_tracing(config: &Config) {
    let Some(dir) = dirs::data_dir().map(|d| d.join("groundwater-chat")) else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_deref().unwrap_or("info")));

    let file_appender = tracing_appender::rolling::never(dir, "groundwater.log");
    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_env_filter(filter)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A bad config file is reported once tracing is up
    let (loaded, load_error) = match load_config(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(err) => (Config::new(), Some(err)),
    };
    let config = apply_cli(loaded.apply_env(), &cli);
    init_tracing(&config);
    if let Some(err) = load_error {
        warn!(error = %err, "could not load config, using defaults");
    }

    let language = config.language();
    let backend = HttpBackend::new(config.backend_url())?;
    info!(backend = %backend.base_url(), language = language.code(), "starting");

    let services = Services::new(Arc::new(backend), config.geolocator());
    let session = ChatSession::new(language, services.has_geolocation());

    let download_dir = dirs::download_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let mut app = App::new(session, services, download_dir, events.sender());
    app.start();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    if let Err(err) = &result {
        warn!(error = %err, "exited with error");
    }
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        app.follow_conversation();
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}
