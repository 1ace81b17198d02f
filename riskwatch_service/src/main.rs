/// riskwatch: command-line entry point.
///
///   riskwatch predict [--zone ID]    print predictions as JSON
///   riskwatch train                  fit and save a model, report the result
///   riskwatch ingest                 fetch one weather reading per zone
///   riskwatch notify                 alert subscribers of breaching zones
///   riskwatch run [--interval-minutes N]
///                                    ingest + notify on a fixed interval
///
/// All commands read `riskwatch.toml` (or `--config PATH`) and `.env`.

use std::error::Error;
use std::path::PathBuf;
use std::thread;

use clap::{Parser, Subcommand};

use riskwatch_service::alert::{notify_subscribers, LogDispatch};
use riskwatch_service::config::ServiceConfig;
use riskwatch_service::ingest::openweather;
use riskwatch_service::logging::{self, Component};
use riskwatch_service::model::ZoneId;
use riskwatch_service::store::PostgresStore;
use riskwatch_service::{ModelStore, RiskPredictor};

#[derive(Debug, Parser)]
#[command(name = "riskwatch", version, about = "Zone disaster-risk prediction and alerting")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print risk predictions for one zone or all zones
    Predict {
        #[arg(long)]
        zone: Option<i32>,
    },
    /// Train a model on all stored readings and reload it
    Train,
    /// Fetch current weather for every zone
    Ingest,
    /// Notify subscribers of zones at or above the threshold
    Notify,
    /// Poll weather and notify subscribers until interrupted
    Run {
        #[arg(long)]
        interval_minutes: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = ServiceConfig::load(cli.config.as_deref())?;
    logging::init_logging(&config.logging.level, config.logging.file.as_deref())?;

    let store = PostgresStore::connect_and_verify(config.database_url()?)?;
    let predictor = RiskPredictor::new(store, ModelStore::new(&config.model.dir));

    match cli.command {
        Command::Predict { zone } => {
            let predictions = predictor.predict(zone.map(ZoneId))?;
            if let (Some(id), true) = (zone, predictions.is_empty()) {
                return Err(format!("zone {} not found", id).into());
            }
            println!("{}", serde_json::to_string_pretty(&predictions)?);
        }
        Command::Train => {
            let report = predictor.train_and_reload(&config.training)?;
            println!(
                "model trained on {} readings from {} zone(s), loss {:.4}, saved to {}",
                report.sample_count,
                report.zone_count,
                report.final_loss,
                report.bundle_path.display()
            );
        }
        Command::Ingest => {
            let client = openweather::build_client(&config.weather)?;
            let api_key = config.weather_api_key()?;
            openweather::ingest_all_zones(&client, predictor.store(), &config.weather, api_key)?;
        }
        Command::Notify => {
            let report = notify_subscribers(&predictor, predictor.store(), config.threshold()?, &LogDispatch)?;
            println!(
                "{} zone(s) at risk, {} message(s) sent, {} failed",
                report.zones_breached, report.messages_sent, report.deliveries_failed
            );
        }
        Command::Run { interval_minutes } => {
            let interval = config.weather.poll_interval(interval_minutes);
            let threshold = config.threshold()?;
            let client = openweather::build_client(&config.weather)?;
            let api_key = config.weather.api_key.as_deref();
            if api_key.is_none() {
                logging::warn(Component::System, None, "OPENWEATHER_API_KEY not set; weather ingest disabled");
            }

            let strategy = predictor.warm_up();
            logging::info(
                Component::System,
                None,
                &format!("daemon started, scoring with {}, polling every {:?}", strategy, interval),
            );

            loop {
                if let Some(key) = api_key {
                    if let Err(e) = openweather::ingest_all_zones(&client, predictor.store(), &config.weather, key) {
                        logging::error(Component::Ingest, None, &format!("ingest pass failed: {}", e));
                    }
                }
                if let Err(e) = notify_subscribers(&predictor, predictor.store(), threshold, &LogDispatch) {
                    logging::error(Component::Notifier, None, &format!("notification pass failed: {}", e));
                }
                thread::sleep(interval);
            }
        }
    }

    Ok(())
}
