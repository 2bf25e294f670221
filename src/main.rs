use std::path::PathBuf;
use storm_season::cleaner::Cleaner;
use storm_season::config::Config;
use storm_season::loader::Loader;
use storm_season::query::StormTable;
use storm_season::report::SeasonReport;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,storm_season=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Storm season report starting...");

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = Config::load(&config_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration from {}: {}\n\n\
             Make sure:\n\
             1. The config file exists (pass a path as the first argument to override)\n\
             2. All referenced environment variables are set (check .env.example)\n\
             3. Create a .env file if needed",
            config_path.display(),
            e
        )
    })?;
    info!("Configuration loaded");

    let loader = Loader::new(config.dataset.skip_unit_row);
    let (raw, load_stats) = loader.load_path(&config.dataset.path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load storm tracks: {}\n\n\
             Path: {}\n\n\
             The file must be an IBTrACS-style CSV whose first 16 columns are\n\
             SID, SEASON, NUMBER, BASIN, SUBBASIN, NAME, ISO_TIME, NATURE, LAT, LON,\n\
             WMO_WIND, WMO_PRES, WMO_AGENCY, TRACK_TYPE, DIST2LAND, LANDFALL",
            e,
            config.dataset.path.display()
        )
    })?;

    let cleaner = Cleaner::new(config.cleaning.min_season);
    let (observations, clean_stats) = cleaner.clean(raw)?;
    info!(
        "Kept {} of {} observations from season {} onward",
        clean_stats.retained, load_stats.observations, config.cleaning.min_season
    );

    let table = StormTable::new(observations);

    for aggregate in table.view().seasonal_aggregates(&config.thresholds) {
        tracing::debug!(
            "Season {}: {} storms, {} named, {} hurricanes, {} major",
            aggregate.season,
            aggregate.storms,
            aggregate.named_storms,
            aggregate.hurricanes,
            aggregate.major_hurricanes
        );
    }

    let report = SeasonReport::build(
        &table,
        config.report.season,
        &config.thresholds,
        &config.report.filter,
    )?;
    report.log();

    info!("Storm season report finished");
    Ok(())
}
