mod settings;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use catalog_logging::{catalog_error, catalog_info, LogDestination};
use chrono::Utc;
use harvest_engine::{flatten, ApiPageFetcher, Clock, Harvester, LogProgressSink};
use log::LevelFilter;

use crate::settings::{AppSettings, SETTINGS_FILENAME};

fn main() -> anyhow::Result<()> {
    catalog_logging::initialize(LogDestination::default(), LevelFilter::Info);
    let result = run();
    if let Err(err) = &result {
        catalog_error!("run failed: {:#}", err);
    }
    result
}

fn run() -> anyhow::Result<()> {
    let settings = AppSettings::load(Path::new(SETTINGS_FILENAME))?;
    let config = settings.harvest;
    config.validate().context("invalid harvest settings")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let fetcher = ApiPageFetcher::from_config(&config).context("failed to build HTTP client")?;
    let sink = LogProgressSink::new(config.log_every_pages);
    let clock: Clock = Arc::new(|| Utc::now().to_rfc3339());
    let harvester = Harvester::new(&config, &fetcher, &sink).with_clock(clock);

    let report = runtime.block_on(harvester.run())?;
    catalog_info!(
        "harvest complete | {} records in {} files | {} pages | {:.2} min",
        report.summary.total_records,
        report.summary.files_written,
        report.summary.pages_fetched,
        report.elapsed.as_secs_f64() / 60.0
    );

    if let Some(flatten_settings) = &settings.flatten {
        let summary = flatten(flatten_settings)?;
        catalog_info!(
            "csv stage complete | {} rows, {} skipped | {} files failed",
            summary.rows_written,
            summary.rows_skipped,
            summary.files_failed
        );
    }
    Ok(())
}
