use std::{sync::Arc, time::Duration};

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select, Text};
use sunshine_core::{
    Config, DetailScreen, FetchTask, ForecastListScreen, ForecastUri, ListItem, ScreenState,
    Units, WeatherStore, map_uri, provider_from_config,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "sunshine", version, about = "Daily weather forecasts in your terminal")]
pub struct Cli {
    /// Location to use instead of the configured one, e.g. "94043" or "Berlin,de".
    #[arg(long, short, global = true)]
    pub location: Option<String>,

    /// Display units for this run: metric or imperial.
    #[arg(long, global = true)]
    pub units: Option<Units>,

    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set API key, preferred location and units.
    Configure,

    /// Fetch the forecast and store it.
    Refresh,

    /// Show the daily forecast list.
    List {
        /// Show stored data without fetching.
        #[arg(long)]
        offline: bool,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show full detail for one day (YYYY-MM-DD).
    Detail {
        date: NaiveDate,

        /// Show stored data without fetching.
        #[arg(long)]
        offline: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print the share text for one day (YYYY-MM-DD).
    Share {
        date: NaiveDate,

        /// Show stored data without fetching.
        #[arg(long)]
        offline: bool,
    },

    /// Print a map link for the location.
    Map,

    /// Keep the list on screen, refreshing periodically.
    Watch {
        /// Seconds between refreshes.
        #[arg(long, default_value_t = 1800)]
        interval: u64,
    },
}

/// Settings resolved for one invocation.
struct Session {
    config: Config,
    location: String,
    units: Units,
    store: Arc<WeatherStore>,
}

impl Session {
    fn open(config: Config, location: Option<String>, units: Option<Units>) -> anyhow::Result<Self> {
        let location = location.unwrap_or_else(|| config.location.clone());
        if location.trim().is_empty() {
            bail!("No location given.\nHint: pass --location or run `sunshine configure`.");
        }

        let db_path = config.database_path()?;
        let store = WeatherStore::open(&db_path)
            .with_context(|| format!("Failed to open forecast database: {}", db_path.display()))?;

        Ok(Self {
            units: units.unwrap_or(config.units),
            location: location.trim().to_string(),
            store: Arc::new(store),
            config,
        })
    }

    fn fetcher(&self) -> anyhow::Result<FetchTask> {
        let provider = provider_from_config(&self.config)?;
        Ok(FetchTask::new(provider, self.store.clone()))
    }

    fn day_uri(&self, date: NaiveDate) -> ForecastUri {
        ForecastUri::for_location_and_date(self.location.clone(), date)
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Map => map(self.location, &Config::load()?),
            command => {
                let session = Session::open(Config::load()?, self.location, self.units)?;
                session.execute(command).await
            }
        }
    }
}

impl Session {
    async fn execute(&self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Configure => configure(),
            Command::Map => map(Some(self.location.clone()), &self.config),
            Command::Refresh => refresh(self).await,
            Command::List { offline, json } => list(self, offline, json).await,
            Command::Detail {
                date,
                offline,
                json,
            } => {
                let screen = load_detail(self, date, offline).await?;
                match screen.view() {
                    Some(view) if json => output::print_json(view),
                    Some(view) => {
                        output::print_detail(view);
                        Ok(())
                    }
                    None => bail!(detail_error(&screen)),
                }
            }
            Command::Share { date, offline } => {
                let screen = load_detail(self, date, offline).await?;
                match screen.share_text() {
                    Some(text) => {
                        println!("{text}");
                        Ok(())
                    }
                    None => bail!(detail_error(&screen)),
                }
            }
            Command::Watch { interval } => watch(self, interval).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeatherMap API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("API key prompt cancelled")?;
    config.set_api_key(api_key);

    let location = Text::new("Preferred location (city name or postal code):")
        .with_default(&config.location)
        .prompt()
        .context("Location prompt cancelled")?;
    config.set_location(&location)?;

    let current = config.units;
    let units = Select::new("Units:", vec![Units::Metric, Units::Imperial])
        .with_starting_cursor(if current == Units::Imperial { 1 } else { 0 })
        .prompt()
        .context("Units prompt cancelled")?;
    config.units = units;

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}

fn map(location: Option<String>, config: &Config) -> anyhow::Result<()> {
    let location = location.unwrap_or_else(|| config.location.clone());
    let Some(uri) = map_uri(&location) else {
        bail!("No location given.\nHint: pass --location or run `sunshine configure`.");
    };

    println!("{uri}");
    Ok(())
}

async fn refresh(session: &Session) -> anyhow::Result<()> {
    let fetcher = session.fetcher()?;

    match fetcher.run(Some(session.location.as_str())).await {
        Some(outcome) => {
            println!("Stored {} days for {}", outcome.rows_written, session.location);
        }
        None => {
            println!(
                "No forecast retrieved for {} (run with -v for details)",
                session.location
            );
        }
    }

    Ok(())
}

async fn list(session: &Session, offline: bool, json: bool) -> anyhow::Result<()> {
    let items: Vec<ListItem> = if offline {
        let today = chrono::Utc::now().date_naive();
        session
            .store
            .query_forecast(&session.location, today)?
            .iter()
            .map(|row| ListItem::from_row(row, session.units, today))
            .collect()
    } else {
        let mut screen =
            ForecastListScreen::new(session.store.clone(), session.fetcher()?, &session.location);
        screen.refresh().await;

        if let ScreenState::Error(message) = screen.state() {
            bail!("Failed to load forecast: {message}");
        }
        screen.items(session.units)
    };

    if json {
        return output::print_json(&items);
    }

    let city = session.store.location(&session.location)?.map(|l| l.city_name);
    output::print_list(&session.location, city.as_deref(), &items);
    Ok(())
}

async fn load_detail(
    session: &Session,
    date: NaiveDate,
    offline: bool,
) -> anyhow::Result<DetailScreen> {
    let mut screen = DetailScreen::new(session.store.clone(), session.day_uri(date), session.units)?;
    screen.load();

    if screen.view().is_none() && !offline {
        session.fetcher()?.run(Some(session.location.as_str())).await;
        screen.load();
    }

    Ok(screen)
}

fn detail_error(screen: &DetailScreen) -> String {
    screen
        .state()
        .error()
        .map(str::to_string)
        .unwrap_or_else(|| format!("No forecast for {}", screen.uri()))
}

async fn watch(session: &Session, interval: u64) -> anyhow::Result<()> {
    let fetcher = session.fetcher()?;
    let mut changes = session.store.subscribe();

    let mut screen =
        ForecastListScreen::new(session.store.clone(), fetcher.clone(), &session.location);
    screen.refresh().await;

    let city = |session: &Session| -> anyhow::Result<Option<String>> {
        Ok(session.store.location(&session.location)?.map(|l| l.city_name))
    };

    let mut shown = screen.rows().to_vec();
    output::print_list(&session.location, city(session)?.as_deref(), &screen.items(session.units));

    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
    // The first tick completes immediately; the screen was just refreshed.
    ticker.tick().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Rows arrive through the change subscription below.
                drop(fetcher.spawn(session.location.clone()));
            }
            change = changes.recv() => {
                match change {
                    Ok(change) => {
                        if !screen.handle_change(&change) {
                            continue;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Missed store changes, re-querying");
                        screen.requery();
                    }
                    Err(RecvError::Closed) => break,
                }

                if screen.rows() != shown.as_slice() {
                    shown = screen.rows().to_vec();
                    output::print_list(
                        &session.location,
                        city(session)?.as_deref(),
                        &screen.items(session.units),
                    );
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_location_applies_to_subcommands() {
        let cli = Cli::try_parse_from(["sunshine", "list", "--offline", "--location", "Berlin"])
            .expect("arguments should parse");

        assert_eq!(cli.location.as_deref(), Some("Berlin"));
        assert!(matches!(cli.command, Command::List { offline: true, json: false }));
    }

    #[test]
    fn detail_takes_an_iso_date() {
        let cli = Cli::try_parse_from(["sunshine", "detail", "2017-10-06", "--units", "imperial"])
            .expect("arguments should parse");

        assert_eq!(cli.units, Some(Units::Imperial));
        match cli.command {
            Command::Detail { date, .. } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2017, 10, 6).unwrap());
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Cli::try_parse_from(["sunshine", "detail", "tomorrow"]).is_err());
    }

    #[test]
    fn map_takes_the_global_location() {
        let cli = Cli::try_parse_from(["sunshine", "map", "-l", "Berlin,de"])
            .expect("arguments should parse");

        assert!(matches!(cli.command, Command::Map));
        assert_eq!(cli.location.as_deref(), Some("Berlin,de"));
    }

    #[test]
    fn map_uses_the_configured_location_by_default() {
        let mut config = Config::default();
        config.set_location("Mountain View").unwrap();

        assert!(map(None, &config).is_ok());
        assert!(map(Some("  ".into()), &config).is_err());
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::try_parse_from(["sunshine", "-vv", "refresh"]).expect("arguments should parse");
        assert_eq!(cli.verbose, 2);
    }
}
