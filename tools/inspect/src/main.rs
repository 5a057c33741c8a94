//! Console front-end stand-in: loads the atlas, prints views and cache
//! behaviour. Exercises every service operation the interactive UI would.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use atlas_core::cache::CacheConfig;
use atlas_core::service::{AtlasService, View};
use atlas_core::store::rules::Spacing;
use atlas_core::store::DataPaths;

#[derive(Parser, Debug)]
#[command(name = "inspect", about = "Query the altitude atlas engine from the console")]
struct Args {
    /// Directory holding regions.geojson, zones.json, rules.json, details.json.
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// List selectable configurations and spacings, then exit.
    #[arg(long)]
    list: bool,

    /// Configuration to display (defaults to the first selectable one).
    #[arg(short, long)]
    config: Option<String>,

    /// Post spacing: "wide" (3.00 m) or "narrow" (2.50 m).
    #[arg(short, long, default_value = "wide")]
    spacing: String,

    /// Fetch the view this many times (shows cache hits on repeats).
    #[arg(long, default_value = "1")]
    repeat: usize,

    /// Trigger a full reload between the first and second fetch.
    #[arg(long)]
    reload: bool,

    /// Disable all caching (every request rebuilds).
    #[arg(long)]
    no_cache: bool,

    /// Maximum palette cache entries.
    #[arg(long, default_value = "16")]
    palette_entries: usize,

    /// Maximum choropleth cache entries.
    #[arg(long, default_value = "50")]
    choropleth_entries: usize,

    /// Maximum detail panel cache entries.
    #[arg(long, default_value = "100")]
    detail_entries: usize,

    /// Maximum summary panel cache entries.
    #[arg(long, default_value = "10")]
    summary_entries: usize,

    /// Diagnostic verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_view(view: &View) {
    let stats = view.statistics();
    println!("── {} ──", view.choropleth.combination);
    println!("Coverage: {}", view.summary.coverage_line);
    if view.summary.no_rule_banner {
        println!("  !! no rule matches this configuration");
    }
    for bucket in &stats.buckets {
        let pct = (bucket.admissible_share * 100.0).round();
        println!("  {:>6} m  {:>3} regions ({pct}%)", bucket.altitude, bucket.count);
    }
    println!(
        "  not admissible: {}   no applicable rule: {}",
        stats.not_admissible, stats.unresolvable
    );

    println!("Legend:");
    for entry in &view.choropleth.legend {
        println!("  {}  {}", entry.color.hex(), entry.label);
    }

    println!("Details:");
    for row in &view.details.rows {
        println!("  {:<16} {}", row.label, row.value);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let cache_config = CacheConfig {
        enabled: !args.no_cache,
        palette_entries: args.palette_entries,
        choropleth_entries: args.choropleth_entries,
        detail_entries: args.detail_entries,
        summary_entries: args.summary_entries,
    };

    let paths = DataPaths::in_dir(&args.data_dir);
    let service = AtlasService::open(paths, cache_config)
        .with_context(|| format!("cannot open atlas data in {}", args.data_dir.display()))?;

    if args.list {
        println!("Configurations:");
        for config in service.list_configurations() {
            println!("  {config}");
        }
        println!("Spacings:");
        for spacing in service.list_spacings() {
            println!("  {spacing}");
        }
        return Ok(());
    }

    let config = match args.config {
        Some(c) => c,
        None => service
            .list_configurations()
            .into_iter()
            .next()
            .context("no selectable configurations")?,
    };
    let spacing: Spacing = args
        .spacing
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    for round in 0..args.repeat.max(1) {
        if args.reload && round == 1 {
            let report = service.reload().context("reload failed")?;
            eprintln!(
                "[inspect] reloaded: {} regions, {} combinations",
                report.regions, report.combinations
            );
        }
        let view = service
            .get_view(&config, spacing)
            .with_context(|| format!("no view for {config} at {spacing}"))?;
        print_view(&view);
    }

    eprintln!("[inspect] cache counters:");
    for stats in service.cache_stats() {
        eprintln!(
            "  {:<11} hits {:>4}  builds {:>4}  entries {:>3}",
            stats.name, stats.hits, stats.builds, stats.entries
        );
    }
    Ok(())
}
