//! InsightBites CLI
//!
//! Browse Delaware restaurant inspection violations from the terminal.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use inspection_core::{
    filter::ZIP_CODE_LEN, BasePredicate, County, DataFetcher, FetcherConfig, FilterMode,
    FilterState, FilterStrategy, HttpTransport,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use insight_cli::browse;
use insight_cli::render::{render, render_counties, ViewFormat};

#[derive(Parser, Debug)]
#[command(name = "insight")]
#[command(version, about = "Delaware restaurant inspection violations")]
struct Args {
    /// Filter on the server (remote) or in memory (local)
    #[arg(long, global = true)]
    strategy: Option<FilterStrategy>,

    /// Maximum number of rows to display
    #[arg(long, global = true)]
    limit: Option<usize>,

    /// Restrict to complaint and follow-up inspections
    #[arg(long, global = true, overrides_with = "no_base_filter")]
    base_filter: bool,

    /// Include every inspection type
    #[arg(long, global = true, overrides_with = "base_filter")]
    no_base_filter: bool,

    /// SODA dataset endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Result view
    #[arg(long, global = true, value_enum, default_value_t = ViewFormat::Auto)]
    view: ViewFormat,

    /// Print results as JSON (same as --view json)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and print the most recent matching violations
    Violations {
        #[arg(long, group = "filter")]
        county: Option<County>,

        #[arg(long, group = "filter")]
        city: Option<String>,

        #[arg(long, group = "filter", value_parser = parse_zip_arg)]
        zip: Option<String>,

        /// Restaurant name, at least three characters
        #[arg(long, group = "filter")]
        restaurant: Option<String>,
    },
    /// List the distinct cities in the dataset
    Cities,
    /// Print the county to city map
    Counties,
    /// Interactive filtering from stdin
    Browse,
}

impl Args {
    /// Environment configuration with command-line overrides applied
    fn fetcher_config(&self) -> Result<FetcherConfig> {
        let mut config = FetcherConfig::from_env()?;

        if let Some(strategy) = self.strategy {
            if strategy != config.strategy {
                // Switching strategy switches to that strategy's presets
                config = FetcherConfig {
                    endpoint: config.endpoint,
                    app_token: config.app_token,
                    timeout: config.timeout,
                    dataset_limit: config.dataset_limit,
                    ..FetcherConfig::for_strategy(strategy)
                };
            }
        }
        if let Some(endpoint) = &self.endpoint {
            config = config.with_endpoint(endpoint.clone());
        }
        if let Some(limit) = self.limit {
            anyhow::ensure!(limit > 0, "--limit must be at least 1");
            config = config.with_row_limit(limit);
        }
        if self.base_filter {
            config = config.with_base_predicate(BasePredicate::ComplaintFollowUp);
        } else if self.no_base_filter {
            config = config.with_base_predicate(BasePredicate::None);
        }
        Ok(config)
    }

    fn view_format(&self) -> ViewFormat {
        if self.json {
            ViewFormat::Json
        } else {
            self.view
        }
    }
}

/// Zip codes from the command line are never truncated
fn parse_zip_arg(raw: &str) -> Result<String, String> {
    let zip = raw.trim();
    if zip.chars().count() > ZIP_CODE_LEN {
        return Err(format!(
            "zip code '{}' is longer than {} characters",
            zip, ZIP_CODE_LEN
        ));
    }
    Ok(zip.to_string())
}

/// Filter state for a one-shot `violations` run
fn one_shot_filter(
    county: Option<County>,
    city: Option<String>,
    zip: Option<String>,
    restaurant: Option<String>,
) -> FilterState {
    let mut state = FilterState::new();
    if let Some(county) = county {
        state.set_mode(FilterMode::County);
        state.select_county(county);
    } else if let Some(city) = city {
        state.set_mode(FilterMode::City);
        state.select_city(city);
    } else if let Some(zip) = zip {
        state.set_mode(FilterMode::Zipcode);
        state.set_zip_code(&zip);
    } else if let Some(text) = restaurant {
        // Nothing to debounce: the text is already final
        state.set_mode(FilterMode::Restaurant);
        state.set_search_text(text.clone());
        state.set_debounced_search_text(text);
    }
    state
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Logs go to stderr so stdout stays clean for results
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("insight=info".parse()?)
                .add_directive("inspection_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let format = args.view_format();

    if let Command::Counties = args.command {
        print!("{}", render_counties()?);
        return Ok(());
    }

    let config = args.fetcher_config()?;
    tracing::info!(
        "Starting InsightBites v{} ({} filtering, {} rows)",
        env!("CARGO_PKG_VERSION"),
        config.strategy,
        config.row_limit
    );
    tracing::debug!(?config, "Fetcher configuration");

    let transport = Arc::new(HttpTransport::new(&config.endpoint, config.timeout)?);
    let fetcher = Arc::new(DataFetcher::new(transport, config));

    match args.command {
        Command::Violations {
            county,
            city,
            zip,
            restaurant,
        } => {
            let state = one_shot_filter(county, city, zip, restaurant);
            let predicate = fetcher.query_builder().build(&state);

            let (_, refreshed) = tokio::join!(fetcher.load_cities(), fetcher.refresh(&predicate));
            print!("{}", render(&fetcher.snapshot(), format)?);
            if let Err(err) = refreshed {
                tracing::debug!(kind = ?err.kind(), "Fetch failed: {}", err);
                std::process::exit(1);
            }
        }
        Command::Cities => {
            let cities = fetcher.load_cities().await;
            if format == ViewFormat::Json {
                println!("{}", serde_json::to_string_pretty(&cities)?);
            } else {
                for city in cities {
                    println!("{}", city);
                }
            }
        }
        Command::Browse => {
            browse::run(fetcher, format).await?;
        }
        Command::Counties => {}
    }

    Ok(())
}
