//! cis - LIGO Channel Information System query CLI.

/// Application configuration (TOML).
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
#[cfg(not(feature = "otel"))]
use tracing_subscriber::fmt;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{AppConfig, resolve_config_path, resolve_cookie_jar_path};
use cis_api::util::validate_url;
use cis_api::{Channel, ChannelList, CisClient, QueryOptions, Session, SieveParams};

/// User-Agent sent when the config does not set one.
const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// CLI argument parser.
#[derive(Parser)]
#[command(about, version)]
struct Cli {
    /// Override config/data directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Search the CIS and list every matching channel.
    Query(QueryArgs),
    /// Show the single channel matching a name.
    Show(ShowArgs),
}

/// Arguments for the `query` subcommand.
#[derive(clap::Args)]
struct QueryArgs {
    /// Search term; `*` and spaces act as wildcards (e.g. "H1:PSL-ISS*").
    term: String,

    /// Keep only channels whose name matches this regular expression.
    #[arg(long)]
    name: Option<String>,

    /// Require --name to match the whole channel name.
    #[arg(long, requires = "name")]
    exact: bool,

    /// Keep only channels with exactly this sample rate (Hz).
    #[arg(long, value_name = "HZ")]
    sample_rate: Option<f64>,

    /// Lower bound of the sample-rate range (Hz, inclusive).
    #[arg(long, value_name = "HZ", requires = "max_rate")]
    min_rate: Option<f64>,

    /// Upper bound of the sample-rate range (Hz, inclusive).
    #[arg(long, value_name = "HZ", requires = "min_rate")]
    max_rate: Option<f64>,

    /// Skip fetching the description of each channel.
    #[arg(long)]
    no_descriptions: bool,

    /// Log request and response headers.
    #[arg(long)]
    debug: bool,
}

/// Arguments for the `show` subcommand.
#[derive(clap::Args)]
struct ShowArgs {
    /// Channel name (e.g. "H1:PSL-ISS_PDA_OUT_DQ").
    name: String,

    /// Skip fetching the channel descriptions.
    #[arg(long)]
    no_descriptions: bool,

    /// Log request and response headers.
    #[arg(long)]
    debug: bool,
}

impl QueryArgs {
    /// Converts the filter flags into sieve criteria.
    fn sieve_params(&self) -> SieveParams {
        let mut params = SieveParams::default().exact_match(self.exact);
        if let Some(pattern) = &self.name {
            params = params.name(pattern.as_str());
        }
        if let Some(rate) = self.sample_rate {
            params = params.sample_rate(rate);
        }
        if let (Some(low), Some(high)) = (self.min_rate, self.max_rate) {
            params = params.sample_range(low, high);
        }
        params
    }

    /// Options forwarded to the remote query.
    const fn query_options(&self) -> QueryOptions {
        QueryOptions {
            descriptions: !self.no_descriptions,
            debug: self.debug,
        }
    }
}

/// Builds the CIS client from config, loading the cookie jar.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded, `base_url` is invalid,
/// or the cookie jar cannot be read.
#[instrument(skip_all)]
fn build_client(dir: Option<&PathBuf>) -> Result<CisClient> {
    let config_path = resolve_config_path(dir).context("failed to resolve config path")?;
    let config = AppConfig::load(&config_path).context("failed to load config")?;

    let jar_path = resolve_cookie_jar_path(config.session.cookie_jar.as_ref(), dir)
        .context("failed to resolve cookie jar path")?;
    let session = Session::load(jar_path).context("failed to load cookie jar")?;

    let user_agent = config
        .api
        .user_agent
        .unwrap_or_else(|| String::from(DEFAULT_USER_AGENT));
    let mut builder = CisClient::builder().user_agent(user_agent).session(session);

    if let Some(raw) = config.api.base_url {
        let raw = if raw.ends_with('/') {
            raw
        } else {
            format!("{raw}/")
        };
        let url = validate_url("base", &raw).context("invalid [api] base_url")?;
        builder = builder.base_url(url);
    }

    builder.build().context("failed to build CIS client")
}

/// Logs one line per channel followed by a total.
fn render_channel_table(list: &ChannelList) {
    tracing::info!("Name\tRate\tUnit\tType\tModel");
    for channel in list {
        tracing::info!(
            "{}\t{}\t{}\t{}\t{}",
            channel.name(),
            channel
                .sample_rate()
                .map_or_else(|| String::from("-"), |r| r.to_string()),
            channel.unit().unwrap_or("-"),
            channel
                .dtype()
                .map_or_else(|| String::from("-"), |d| d.to_string()),
            channel.model().unwrap_or("-"),
        );
    }
    tracing::info!("Total: {} channels", list.len());
}

/// Logs the details of a single channel.
fn render_channel(channel: &Channel) {
    tracing::info!("Name:        {}", channel.name());
    tracing::info!(
        "Description: {}",
        channel
            .description()
            .and_then(cis_api::Description::description)
            .unwrap_or("-")
    );
    tracing::info!(
        "Sample rate: {}",
        channel
            .sample_rate()
            .map_or_else(|| String::from("-"), |r| format!("{r} Hz"))
    );
    tracing::info!("Unit:        {}", channel.unit().unwrap_or("-"));
    tracing::info!(
        "Data type:   {}",
        channel
            .dtype()
            .map_or_else(|| String::from("-"), |d| d.to_string())
    );
    tracing::info!("Model:       {}", channel.model().unwrap_or("-"));
    tracing::info!("Frame type:  {}", channel.frametype().unwrap_or("-"));
    tracing::info!(
        "URL:         {}",
        channel
            .url()
            .map_or_else(|| String::from("-"), ToString::to_string)
    );
    if let Some(descriptions) = channel.descriptions().filter(|d| !d.is_empty()) {
        tracing::info!("Descriptions:");
        for line in descriptions.to_string().lines() {
            tracing::info!("  {}", line);
        }
    }
}

/// Runs the `query` subcommand.
///
/// # Errors
///
/// Returns an error if the client fails to build, the search fails, or the
/// name pattern is invalid.
#[instrument(skip_all)]
async fn run_query(args: &QueryArgs, dir: Option<&PathBuf>) -> Result<()> {
    let client = build_client(dir)?;

    let found = ChannelList::query(&client, &args.term, args.query_options())
        .await
        .with_context(|| format!("failed to query channels matching '{}'", args.term))?;
    let channels = found
        .sieve(&args.sieve_params())
        .context("failed to filter channels")?;
    client
        .save_session()
        .context("failed to save cookie jar")?;

    if channels.len() < found.len() {
        tracing::debug!(
            before = found.len(),
            after = channels.len(),
            "Filtered channel list"
        );
    }
    render_channel_table(&channels);

    Ok(())
}

/// Runs the `show` subcommand.
///
/// # Errors
///
/// Returns an error if the client fails to build or the name does not
/// match exactly one channel.
#[instrument(skip_all)]
async fn run_show(args: &ShowArgs, dir: Option<&PathBuf>) -> Result<()> {
    let client = build_client(dir)?;

    let options = QueryOptions {
        descriptions: !args.no_descriptions,
        debug: args.debug,
    };
    let channel = Channel::query(&client, &args.name, options)
        .await
        .with_context(|| format!("failed to look up channel '{}'", args.name))?;
    client
        .save_session()
        .context("failed to save cookie jar")?;

    render_channel(&channel);

    Ok(())
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if subcommand execution fails.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    #[cfg(not(feature = "otel"))]
    {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .init();
    }

    #[cfg(feature = "otel")]
    {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

        let otel_layer = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .and_then(|_| {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .build()
                    .ok()?;

                let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                    .with_simple_exporter(exporter)
                    .build();

                let tracer = opentelemetry::trace::TracerProvider::tracer(
                    &tracer_provider,
                    env!("CARGO_PKG_NAME"),
                );
                opentelemetry::global::set_tracer_provider(tracer_provider);

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    }

    let cli = Cli::parse();
    match cli.command {
        Commands::Query(args) => run_query(&args, cli.dir.as_ref()).await,
        Commands::Show(args) => run_show(&args, cli.dir.as_ref()).await,
    }
}
