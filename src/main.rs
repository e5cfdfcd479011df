// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::{ArgGroup, Parser};
use pricecrawl::config::settings::Settings;
use pricecrawl::domain::services::run_state_store::RunStateStore;
use pricecrawl::engines::chromium_engine::ChromiumEngine;
use pricecrawl::engines::traits::RenderEngine;
use pricecrawl::infrastructure::backend_client::HttpBackendClient;
use pricecrawl::infrastructure::observability::metrics::describe_metrics;
use pricecrawl::infrastructure::storage::JsonFileRunStateRepository;
use pricecrawl::scheduler::clock::{Clock, SystemClock};
use pricecrawl::scheduler::daily_scheduler::{DailyScheduler, ScheduleConfig};
use pricecrawl::utils::telemetry;
use pricecrawl::workers::manager::{CycleReport, RunOrchestrator, RunStatus};
use pricecrawl::workers::site_worker::SiteWorker;
use pricecrawl::workers::SiteScraper;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "pricecrawl",
    version,
    about = "Daily e-commerce price scraper that forwards listings to a storage backend"
)]
#[command(group(ArgGroup::new("mode").required(true).args(["now", "schedule"])))]
struct Cli {
    /// Run one check cycle immediately and exit
    #[arg(long)]
    now: bool,

    /// Run every day at HH:MM local time (defaults to the configured time)
    #[arg(long, value_name = "HH:MM", num_args = 0..=1)]
    schedule: Option<Option<String>>,

    /// With --now, ignore the last-run record
    #[arg(long, requires = "now")]
    force: bool,

    /// Extra configuration file layered over config/default
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only log warnings and errors (RUST_LOG still takes precedence)
    #[arg(long)]
    silent: bool,
}

/// 主函数
///
/// 加载配置、组装组件并按命令行选择的方式运行调度器
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let mut settings = Settings::new(cli.config.as_deref())?;
    if let Some(Some(time)) = &cli.schedule {
        settings.schedule.daily_time = time.clone();
    }
    if cli.silent {
        settings.logging.filter = "warn".to_string();
    }

    // 2. Initialize logging
    telemetry::init_telemetry(&settings.logging);
    if let Err(e) = settings.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }
    describe_metrics();
    info!(scrapers = settings.scrapers.len(), "Configuration loaded");

    // 3. Initialize components
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let repository = Arc::new(JsonFileRunStateRepository::new(&settings.run_state.path));
    info!(path = %repository.path().display(), "Using run state file");
    let store = Arc::new(RunStateStore::new(
        repository,
        clock.clone(),
        settings.schedule.run_interval_days,
    ));
    let engine: Arc<dyn RenderEngine> = Arc::new(ChromiumEngine::new(settings.browser.clone()));
    let retry = settings.retry.policy();

    let scrapers = settings
        .scrapers
        .iter()
        .map(|s| {
            Arc::new(SiteWorker::from_settings(
                s,
                engine.clone(),
                store.clone(),
                retry.clone(),
            )) as Arc<dyn SiteScraper>
        })
        .collect();
    let sink = Arc::new(HttpBackendClient::new(&settings.backend)?);
    info!(endpoint = %sink.endpoint(), "Submitting batches to backend");
    let orchestrator = Arc::new(RunOrchestrator::new(
        scrapers,
        sink,
        retry,
        settings.schedule.completion_policy,
    ));

    let mode = if cli.now {
        ScheduleConfig::Immediate { force: cli.force }
    } else {
        ScheduleConfig::DailyAt(settings.schedule.target_time()?)
    };

    // 4. Wire Ctrl-C to the scheduler stop signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, stopping at the next idle point");
                let _ = shutdown_tx.send(true);
            }
            Err(err) => {
                error!("Unable to listen for shutdown signal: {}", err);
                shutdown_tx.closed().await;
            }
        }
    });

    // 5. Run
    info!(?mode, engine = engine.name(), "Starting pricecrawl");
    let reports = DailyScheduler::new(orchestrator, clock, mode)
        .run(shutdown_rx)
        .await;
    reports.iter().for_each(log_summary);

    info!("pricecrawl stopped");
    Ok(())
}

fn log_summary(report: &CycleReport) {
    for scraper in &report.scrapers {
        match scraper.status {
            RunStatus::Skipped => info!(
                run_id = %report.run_id,
                scraper = %scraper.identity,
                "skipped: already ran today"
            ),
            RunStatus::Completed => info!(
                run_id = %report.run_id,
                scraper = %scraper.identity,
                records = scraper.records,
                batches = scraper.submissions.len(),
                failed_batches = scraper.submissions.iter().filter(|s| !s.succeeded()).count(),
                marked_complete = scraper.marked_complete,
                "completed"
            ),
        }
    }
}
