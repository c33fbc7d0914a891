//! GloFAS Flood Trigger Pipeline - Batch Entry Point
//!
//! A scheduled batch job that, once per forecast cycle:
//! 1. Retrieves ensemble river-discharge forecasts (archive or grid)
//! 2. Extracts them into per-station ensemble records
//! 3. Aggregates exceedance probabilities against trigger thresholds
//! 4. Classifies alert levels and resolves return periods
//! 5. Persists the per-station trigger artifacts as flat JSON
//!
//! One country and one lead time per invocation; exactly one run per
//! country/lead-time combination may execute at a time.
//!
//! Usage:
//!   cargo run --release -- --country ZMB --lead-time 7
//!   cargo run --release -- --country ETH --lead-time 5 --date 20260801
//!
//! Environment:
//!   GLOFAS_USER / GLOFAS_PW - dissemination server credentials
//!   RUST_LOG                - log filter (default: info)

use chrono::{NaiveDate, Utc};
use std::env;
use std::path::Path;
use std::process;

use floodcast_service::config;
use floodcast_service::fetch::SystemClock;
use floodcast_service::fetch::ftp::HttpTransport;
use floodcast_service::model::{FetchError, LeadTime, PipelineError};
use floodcast_service::pipeline::Pipeline;
use floodcast_service::stations;

fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("🌊 GloFAS Flood Trigger Pipeline");
    println!("=================================\n");

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut country: Option<String> = None;
    let mut lead_time_days: u32 = 7;
    let mut date_override: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--country" => {
                if i + 1 < args.len() {
                    country = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    eprintln!("Error: --country requires an ISO3 code");
                    process::exit(1);
                }
            }
            "--lead-time" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse() {
                        Ok(days) => lead_time_days = days,
                        Err(_) => {
                            eprintln!("Error: --lead-time requires a number of days (1-7)");
                            process::exit(1);
                        }
                    }
                    i += 2;
                } else {
                    eprintln!("Error: --lead-time requires a number of days");
                    process::exit(1);
                }
            }
            "--date" => {
                if i + 1 < args.len() {
                    date_override = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    eprintln!("Error: --date requires YYYYMMDD");
                    process::exit(1);
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!(
                    "Usage: {} --country ISO3 [--lead-time DAYS] [--date YYYYMMDD]",
                    args[0]
                );
                process::exit(1);
            }
        }
    }

    let Some(iso3) = country else {
        eprintln!("Error: --country is required");
        process::exit(1);
    };

    let lead_time = match LeadTime::new(lead_time_days) {
        Ok(lt) => lt,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let run_date = match date_override {
        Some(ref stamp) => match NaiveDate::parse_from_str(stamp, "%Y%m%d") {
            Ok(date) => date,
            Err(_) => {
                eprintln!("Error: --date must be YYYYMMDD, got '{}'", stamp);
                process::exit(1);
            }
        },
        None => Utc::now().date_naive(),
    };

    // Load configuration (panics on structural problems — intentional)
    println!("📋 Loading configuration...");
    let settings = config::load_settings();
    let country_settings = match settings.country(&iso3) {
        Ok(cs) => cs.clone(),
        Err(e) => {
            eprintln!("\n❌ {}\n", e);
            process::exit(1);
        }
    };
    let registry = stations::load_registry(&iso3);
    if registry.is_empty() {
        eprintln!("\n❌ No stations configured for {} in stations.toml\n", iso3);
        process::exit(1);
    }
    println!(
        "   {} stations, {} extraction, mock={}\n",
        registry.len(),
        match country_settings.extraction {
            config::ExtractionStrategy::Report => "report",
            config::ExtractionStrategy::Grid => "grid",
        },
        country_settings.mock
    );

    let paths = config::RunPaths::new(Path::new(&settings.data_dir), &iso3, &lead_time.label());
    let pipeline = Pipeline::new(
        &iso3,
        country_settings,
        registry,
        lead_time,
        run_date,
        paths,
    );

    println!(
        "🔄 Running {} pipeline for {} at {} lead time...",
        iso3,
        run_date.format("%Y-%m-%d"),
        lead_time.label()
    );

    match pipeline.run(&HttpTransport::new(), &SystemClock) {
        Ok(outcome) => {
            println!(
                "✓ Run complete: {} station rows written, any trigger: {}",
                outcome.stations_reported,
                outcome.trigger_per_day.any()
            );
        }
        Err(PipelineError::Fetch(FetchError::DeadlineExceeded { hours })) => {
            eprintln!(
                "\n❌ Download failed for {} hours, no new dataset was found. Aborting run.\n",
                hours
            );
            process::exit(1);
        }
        Err(e) => {
            eprintln!("\n❌ Pipeline error: {}\n", e);
            process::exit(1);
        }
    }
}
