use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use configuration::{AnnualizationBasis, Config, ReturnKind};
use core_types::{Event, PeriodStats, Revision};
use correlator::EventMatch;
use query::{AnalyzeRequest, ChangePointQuery, QueryFacade};
use series_store::SeriesStore;
use std::path::PathBuf;
use std::sync::Arc;

/// The main entry point for the Breakpoint application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; it only supplies optional overrides.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = configuration::load_config_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(prices) = cli.prices {
        config.data.prices_path = prices;
    }
    if let Some(events) = cli.events {
        config.data.events_path = Some(events);
    }

    let _guard = configuration::init_tracing(&config.logging)?;

    match cli.command {
        Commands::Serve(args) => handle_serve(args, config).await,
        Commands::Detect(args) => handle_detect(args, config),
        Commands::Analyze(args) => handle_analyze(args, config),
        Commands::Events(args) => handle_events(args, config),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Change-point and period analytics for daily price series.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path of the TOML configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Price CSV to use instead of the configured one.
    #[arg(long, global = true)]
    prices: Option<PathBuf>,

    /// Event CSV to use instead of the configured one.
    #[arg(long, global = true)]
    events: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard API over HTTP.
    Serve(ServeArgs),
    /// Detect change points in the price series.
    Detect(DetectArgs),
    /// Compute period statistics for a date range or an event window.
    Analyze(AnalyzeArgs),
    /// List the event catalog.
    Events(OutputArgs),
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args)]
struct OutputArgs {
    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DetectArgs {
    /// Keep at most this many change points, the most confident ones.
    #[arg(long)]
    max_points: Option<usize>,

    /// Drop change points below this confidence (0 to 1).
    #[arg(long)]
    min_confidence: Option<f64>,

    /// Minimum number of observations on each side of a change point.
    #[arg(long)]
    min_segment_length: Option<usize>,

    /// Confidence a split needs before the series is divided further.
    #[arg(long)]
    significance: Option<f64>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Start of the range (format: YYYY-MM-DD).
    #[arg(long, requires = "end", conflicts_with = "event")]
    start: Option<String>,

    /// End of the range (format: YYYY-MM-DD).
    #[arg(long, requires = "start")]
    end: Option<String>,

    /// Analyze the window around this catalog event instead of a range.
    #[arg(long)]
    event: Option<String>,

    #[arg(long, value_enum)]
    annualization: Option<AnnualizationBasis>,

    #[arg(long, value_enum)]
    returns: Option<ReturnKind>,

    #[command(flatten)]
    output: OutputArgs,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_serve(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    web_server::run_server(config).await
}

fn handle_detect(args: DetectArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(length) = args.min_segment_length {
        config.detection.min_segment_length = length;
    }
    if let Some(significance) = args.significance {
        config.detection.significance = significance;
    }
    config.validate()?;

    let facade = open_facade(&config)?;
    let query = ChangePointQuery {
        max_points: args.max_points,
        min_confidence: args.min_confidence,
        ..Default::default()
    };
    let result = facade.change_point_matches(&query)?;

    if args.output.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_change_points(result.revision, &result.value);
    }
    Ok(())
}

fn handle_analyze(args: AnalyzeArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(annualization) = args.annualization {
        config.analysis.annualization = annualization;
    }
    if let Some(returns) = args.returns {
        config.analysis.returns = returns;
    }

    let facade = open_facade(&config)?;
    let request = AnalyzeRequest {
        start_date: args.start,
        end_date: args.end,
        event: args.event,
    };
    let result = facade.analyze(&request)?;

    if args.output.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_period_stats(result.revision, &result.value);
    }
    Ok(())
}

fn handle_events(args: OutputArgs, config: Config) -> anyhow::Result<()> {
    let facade = open_facade(&config)?;
    let events = facade.events().map(|events| events.to_vec());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else {
        print_events(&events.value);
    }
    Ok(())
}

/// Loads the configured dataset into a fresh store and wraps it in a façade.
fn open_facade(config: &Config) -> anyhow::Result<QueryFacade> {
    let dataset = data_loader::load_dataset(&config.data).with_context(|| {
        format!(
            "Failed to load prices from {}",
            config.data.prices_path.display()
        )
    })?;

    let facade = QueryFacade::from_config(Arc::new(SeriesStore::new()), config)?;
    facade.load_dataset(dataset.prices, dataset.events)?;
    Ok(facade)
}

// ==============================================================================
// Output
// ==============================================================================

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn print_change_points(revision: Revision, matches: &[EventMatch]) {
    if matches.is_empty() {
        println!("No change points detected at {revision}.");
        return;
    }

    let mut table = new_table(vec![
        "Date",
        "Mean before",
        "Mean after",
        "Change %",
        "Confidence",
        "Nearest event",
    ]);
    for m in matches {
        let cp = &m.change_point;
        let event = m
            .event
            .as_ref()
            .map(|e| format!("{} ({})", e.name, e.date))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            cp.date.to_string(),
            format!("{:.2}", cp.mean_before),
            format!("{:.2}", cp.mean_after),
            format!("{:+.2}", cp.pct_change),
            format!("{:.4}", cp.confidence),
            event,
        ]);
    }
    println!("Change points at {revision}");
    println!("{table}");
}

fn print_period_stats(revision: Revision, stats: &PeriodStats) {
    let mut table = new_table(vec!["Metric", "Value"]);
    let rows = [
        ("Range", format!("{} to {}", stats.start_date, stats.end_date)),
        ("Observations", stats.observations.to_string()),
        ("Start price", format!("{:.2}", stats.start_price)),
        ("End price", format!("{:.2}", stats.end_price)),
        ("Price change", format!("{:+.2}", stats.price_change)),
        ("Change %", format!("{:+.2}", stats.pct_change)),
        ("Volatility", format!("{:.4}", stats.volatility)),
    ];
    for (metric, value) in rows {
        table.add_row(vec![metric.to_string(), value]);
    }
    println!("Period statistics at {revision}");
    println!("{table}");
}

fn print_events(events: &[Event]) {
    let mut table = new_table(vec!["Date", "Event", "Category", "Description"]);
    for event in events {
        table.add_row(vec![
            event.date.to_string(),
            event.name.clone(),
            event.category.to_string(),
            event.description.clone(),
        ]);
    }
    println!("{table}");
}
