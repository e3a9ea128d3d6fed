mod db;
mod districts;
mod error;
mod fetch;
mod hierarchy;
mod parser;
mod pipeline;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::db::Store;
use crate::fetch::HttpFetcher;
use crate::pipeline::Pipeline;
use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "geoadm_scraper",
    about = "Russian administrative divisions scraper (geoadm.com)"
)]
struct Cli {
    /// SQLite database path (overrides GEOADM_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the schema and seed federal districts
    Init,
    /// Full re-scrape: districts, regions, areas, localities
    Run {
        /// Listing page URL
        #[arg(long)]
        base_url: Option<String>,
        /// Max concurrent sub-page requests
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
    /// Show row counts
    Stats,
    /// Regions overview table
    Overview {
        /// Filter by federal district abbreviation (e.g. "сзфо")
        #[arg(short, long)]
        district: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }

    let result = match cli.command {
        Commands::Init => {
            let store = Store::open(&settings.db_path)?;
            store.init_schema()?;
            let n = store.seed_federal_districts(&districts::FEDERAL_DISTRICTS)?;
            for d in store.federal_districts()? {
                println!(
                    "{:>2} | {:<5} | {:<10} | {}",
                    d.id, d.name_short_en, d.name_short_ru, d.name
                );
            }
            println!("\nSeeded {} federal districts into {:?}", n, settings.db_path);
            Ok(())
        }
        Commands::Run {
            base_url,
            concurrency,
        } => {
            let base_url = base_url.unwrap_or_else(|| settings.base_url.clone());
            let concurrency = concurrency.unwrap_or(settings.concurrency);
            info!(
                "Scraping {} into {:?} ({} concurrent requests)",
                base_url, settings.db_path, concurrency
            );

            let store = Store::open(&settings.db_path)?;
            let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout())?;
            let stats = Pipeline::new(fetcher, &store, &base_url, concurrency)?
                .run()
                .await?;
            println!(
                "Saved {} federal districts, {} regions, {} areas, {} localities.",
                stats.federal_districts, stats.regions, stats.areas, stats.localities
            );
            Ok(())
        }
        Commands::Stats => {
            let store = Store::open(&settings.db_path)?;
            store.init_schema()?;
            let s = store.stats()?;
            println!("Federal districts: {}", s.federal_districts);
            println!("Regions:           {}", s.regions);
            println!("Areas:             {}", s.areas);
            println!("Localities:        {}", s.localities);
            Ok(())
        }
        Commands::Overview { district, limit } => {
            let store = Store::open(&settings.db_path)?;
            store.init_schema()?;
            let rows = store.fetch_overview(district.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No regions found. Run 'run' first.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<28} | {:<10} | {:>10} | {:>4} | {:<14} | {:>5} | {:>6}",
                "#", "Region", "District", "Population", "Code", "Phone", "Areas", "Places"
            );
            println!("{}", "-".repeat(100));

            for (i, r) in rows.iter().enumerate() {
                let population = r
                    .population
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".into());
                let code = r
                    .subject_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:>3} | {:<28} | {:<10} | {:>10} | {:>4} | {:<14} | {:>5} | {:>6}",
                    i + 1,
                    truncate(&r.name, 28),
                    truncate(&r.district, 10),
                    population,
                    code,
                    truncate(&r.phone_code, 14),
                    r.areas,
                    r.localities
                );
            }

            println!("\n{} regions", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate("Мурманская", 20), "Мурманская");
        assert_eq!(truncate("Мурманская", 4), "Мурм...");
    }

    #[test]
    fn durations_are_human_readable() {
        use std::time::Duration;
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn cli_parses_global_db_after_subcommand() {
        let cli = Cli::try_parse_from(["geoadm_scraper", "overview", "--db", "x.sqlite", "-d", "сзфо"])
            .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("x.sqlite")));
        assert!(matches!(
            cli.command,
            Commands::Overview { district: Some(ref d), limit: 50 } if d == "сзфо"
        ));
    }
}
