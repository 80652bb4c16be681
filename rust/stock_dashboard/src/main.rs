// src/main.rs

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use ratatui::crossterm::terminal;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use stock_dashboard::client::HttpBackend;
use stock_dashboard::config::AppConfig;
use stock_dashboard::controller::{FetchController, FetchState, Settlement};
use stock_dashboard::form::SymbolForm;
use stock_dashboard::render::Dashboard;
use stock_dashboard::ui;

#[derive(Parser, Debug)]
#[command(version, about = "Terminal dashboard for stock analysis reports")]
struct Cli {
    /// Path to a JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Analysis service origin, overriding the config file.
    #[arg(long)]
    backend_url: Option<String>,

    /// Symbols to analyze in turn; without any, symbols are read from stdin.
    symbols: Vec<String>,
}

// Whatever woke the interactive loop
enum Event {
    Line(Option<String>),
    Settled(Settlement),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));
    match AppConfig::locate(cli.config.as_deref()) {
        Some(path) => log::info!("Loaded config from {}", path.display()),
        None => log::info!("Using default config"),
    }

    if let Some(url) = cli.backend_url {
        config.backend.base_url = url;
    }
    let backend = HttpBackend::from_config(&config.backend)?;
    log::info!("Analysis endpoint: {}", backend.endpoint());

    let mut controller = FetchController::new(backend);
    let mut form = SymbolForm::new();

    if !cli.symbols.is_empty() {
        for symbol in cli.symbols {
            form.set_symbol(symbol);
            match form.submit(&mut controller) {
                Ok(_) => {
                    let state = controller.wait().await;
                    show(state);
                }
                Err(e) => eprintln!("{e}"),
            }
        }
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    loop {
        let event = tokio::select! {
            line = lines.next_line() => Event::Line(line?),
            Some(settlement) = controller.settle(), if controller.in_flight() > 0 => {
                Event::Settled(settlement)
            }
        };

        match event {
            Event::Line(None) => break,
            Event::Line(Some(line)) => {
                form.set_symbol(line);
                match form.submit(&mut controller) {
                    Ok(_) => show(controller.state()),
                    Err(e) => {
                        println!("{e}");
                        prompt()?;
                    }
                }
            }
            Event::Settled(Settlement::Applied(_)) => {
                show(controller.state());
                prompt()?;
            }
            Event::Settled(_) => {}
        }
    }

    Ok(())
}

fn show(state: &FetchState) {
    let width = terminal::size()
        .map(|(columns, _)| columns)
        .unwrap_or(ui::DEFAULT_WIDTH);
    let buf = ui::render_dashboard(&Dashboard::project(state), width);
    print!("{}", ui::to_text(&buf));
}

fn prompt() -> Result<()> {
    print!("Enter stock symbol (e.g., NVDA): ");
    std::io::stdout().flush()?;
    Ok(())
}
