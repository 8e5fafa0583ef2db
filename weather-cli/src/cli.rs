use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use weather_core::{
    Config, ControllerHandle, ControllerSettings, DashboardState, QueryController,
    provider_from_config,
};

use crate::view;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the OpenWeather API key and default city.
    Configure,

    /// Print current conditions for a city and exit.
    Show {
        /// City name; falls back to the configured default city.
        city: Option<String>,
    },

    /// Interactive dashboard: type a city to search, `:h N` to reopen a
    /// recent search, `:d` to dismiss an error, `:q` to quit.
    Dashboard {
        /// City loaded at startup; falls back to the configured default city.
        city: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { city } => show(city).await,
            Command::Dashboard { city } => dashboard(city).await,
        }
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    let default_city = inquire::Text::new("Default city:")
        .with_default(config.default_city())
        .prompt()
        .context("Failed to read default city")?;

    config.api_key = Some(api_key.trim().to_string());
    config.default_city = Some(default_city.trim().to_string());
    config.save()?;

    println!(
        "Saved configuration to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

/// Load config, build the provider and start a controller for `city`.
fn start_session(city: Option<String>) -> Result<ControllerHandle> {
    let config = Config::load()?;
    let provider = provider_from_config(&config)?;
    let city = city.unwrap_or_else(|| config.default_city().to_string());

    if city.trim().is_empty() {
        bail!("City name must not be empty");
    }

    info!(%city, "starting weather session");
    let handle = QueryController::spawn(provider, ControllerSettings::default());
    handle.initialize(city);
    Ok(handle)
}

async fn show(city: Option<String>) -> Result<()> {
    let handle = start_session(city)?;
    let mut rx = handle.subscribe();

    let state = rx
        .wait_for(is_settled)
        .await
        .context("Query controller stopped unexpectedly")?
        .clone();

    print!("{}", view::render(&state));

    match state.error {
        Some(error) => bail!(error.message),
        None => Ok(()),
    }
}

fn is_settled(state: &DashboardState) -> bool {
    !state.in_flight && (state.result.is_some() || state.error.is_some())
}

async fn dashboard(city: Option<String>) -> Result<()> {
    let handle = start_session(city)?;
    let mut rx = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    redraw(&rx.borrow_and_update().clone(), None);

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                redraw(&state, None);
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                match Input::parse(&line) {
                    Input::Quit => break,
                    Input::Dismiss => handle.dismiss_error(),
                    Input::Query(query) => handle.submit(query),
                    Input::History(position) => {
                        let state = handle.state();
                        match position.checked_sub(1).and_then(|idx| state.history.get(idx)) {
                            Some(entry) => handle.select_from_history(entry),
                            None => redraw(&state, Some(format!("No recent search #{position}"))),
                        }
                    }
                    Input::Invalid(reason) => redraw(&handle.state(), Some(reason)),
                }
            }
        }
    }

    Ok(())
}

fn redraw(state: &DashboardState, notice: Option<String>) {
    print!("{CLEAR_SCREEN}{}", view::render(state));
    if let Some(notice) = notice {
        println!("{notice}");
    }
    println!("Search city (:h N recent, :d dismiss, :q quit):");
}

/// One line typed into the dashboard.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Query(String),
    History(usize),
    Dismiss,
    Quit,
    Invalid(String),
}

impl Input {
    fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Input::Invalid("Enter a city name".to_string());
        }
        let Some(command) = trimmed.strip_prefix(':') else {
            // Queries go to the provider as typed.
            return Input::Query(line.trim_end_matches(['\r', '\n']).to_string());
        };

        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("q"), None) => Input::Quit,
            (Some("d"), None) => Input::Dismiss,
            (Some("h"), Some(n)) => match n.parse() {
                Ok(position) => Input::History(position),
                Err(_) => Input::Invalid(format!("Not a history position: {n}")),
            },
            _ => Input::Invalid(format!("Unknown command: {trimmed}")),
        }
    }
}
