mod app;
mod components;
mod config;
mod error;
mod event;
mod handler;
mod logging;
mod service;
mod theme;
mod tree;
mod tui;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::info;

use crate::app::App;
use crate::config::{AppConfig, GeneralConfig, LoggingConfig};
use crate::event::{Event, EventHandler};
use crate::service::LocalDocumentStore;
use crate::tui::{install_panic_hook, Tui};

/// A terminal browser for document trees.
#[derive(Parser, Debug)]
#[command(name = "docb", version, about)]
struct Cli {
    /// Directory served as the document store (defaults to the current directory)
    store_root: Option<PathBuf>,

    /// Store path to open at startup, e.g. /queries
    #[arg(long)]
    start: Option<String>,

    /// Path to a config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Delete without asking for confirmation
    #[arg(long)]
    no_confirm: bool,

    /// Disable mouse capture
    #[arg(long)]
    no_mouse: bool,

    /// Log level: off, error, warn, info, debug, trace
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Flags as a partial config that wins over every file.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                store_root: self
                    .store_root
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
                start_path: self.start.clone(),
                confirm_delete: self.no_confirm.then_some(false),
                mouse: self.no_mouse.then_some(false),
                open_links: None,
            },
            logging: LoggingConfig {
                level: self.log_level.clone(),
                file: None,
            },
            ..AppConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));

    logging::init(logging::parse_level(config.log_level())?, &config.log_file())?;

    let root = config.store_root();
    let store = LocalDocumentStore::new(&root, config.store_options()).map_err(|e| {
        error::AppError::InvalidPath(format!("{}: {}", root.display(), e))
    })?;
    info!(
        "serving {} from {} ({} theme)",
        config.start_path(),
        store.root().display(),
        config.theme_scheme()
    );
    let theme = theme::resolve_theme(&config.theme);

    install_panic_hook();

    let mut tui = Tui::new(config.mouse_enabled())?;
    let mut events = EventHandler::new(Duration::from_millis(16));
    let mut app = App::new(Arc::new(store), &config, events.sender());
    app.start();

    loop {
        tui.draw(|frame| ui::render(&mut app, &theme, frame))?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key),
            Event::Mouse(mouse) => handler::handle_mouse_event(&mut app, mouse),
            Event::Tick => app.clear_expired_status(),
            Event::Resize(_, _) => {}
            Event::Service(event) => app.handle_service_event(event),
        }

        if app.should_quit {
            break;
        }
    }

    tui.restore()?;
    info!("bye");
    Ok(())
}
