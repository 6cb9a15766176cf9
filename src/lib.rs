pub mod api;
pub mod cli;
pub mod error;
pub mod location;
pub mod models;
pub mod sampler;
pub mod settings;
pub mod store;
pub mod tracking;
mod utils;
pub mod visit;

use std::{path::Path, sync::Arc};

use anyhow::{anyhow, Context};
use log::{info, warn};

use api::{ApiClient, TrackingApi};
use cli::{Cli, Command};
use location::{LocationProvider, ReplayProvider};
use sampler::LocationSampler;
use settings::{AgentSettings, LocationSettings};
use store::{ActiveTaskPointer, KeyValueStore, SqliteStore};
use visit::{commands, VisitController};

pub struct AgentState {
    pub(crate) store: Arc<dyn KeyValueStore>,
    pub(crate) api: ApiClient,
    pub(crate) visits: VisitController,
}

impl AgentState {
    pub fn bootstrap(data_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let config = AgentSettings::load(&data_dir.join("settings.json"))?.with_env_overrides();

        let store: Arc<dyn KeyValueStore> =
            Arc::new(SqliteStore::open(data_dir.join("fieldtrack.sqlite3"))?);
        let api = ApiClient::new(&config.api_url, Arc::clone(&store))?;
        let provider = build_provider(&config.location)?;

        let visits = VisitController::new(
            ActiveTaskPointer::new(Arc::clone(&store)),
            Arc::new(api.clone()) as Arc<dyn TrackingApi>,
            provider,
            LocationSampler::new(),
            config.tracking.sampler_config(),
        );

        info!("Agent ready (api {})", config.api_url);
        Ok(Self {
            store,
            api,
            visits,
        })
    }

    pub fn visits(&self) -> &VisitController {
        &self.visits
    }
}

fn build_provider(location: &LocationSettings) -> anyhow::Result<Arc<dyn LocationProvider>> {
    let provider = match &location.track_file {
        Some(path) => ReplayProvider::from_file(path, location.permission)?,
        None => {
            warn!("No track file configured; positions will be unavailable");
            ReplayProvider::new(Vec::new(), location.permission)
        }
    };
    Ok(Arc::new(provider))
}

/// Keeps this process sampling until Ctrl-C or until the sampler disarms
/// itself because another process ended the visit.
async fn track_until_done(state: &AgentState) -> anyhow::Result<()> {
    let sampler = state.visits.sampler();
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            info!("Interrupted; the visit stays active, run `fieldtrack resume` to continue tracking");
            sampler.stop().await?;
        }
        _ = sampler.disarmed() => {
            info!("Tracking ended");
        }
    }
    Ok(())
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    // Reads RUST_LOG; info by default.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    log::info!("fieldtrack starting up...");

    let data_dir = cli.resolve_data_dir();
    let state = AgentState::bootstrap(&data_dir)?;

    match cli.command {
        Command::Token { value } => {
            commands::save_token(&state, value).await.map_err(|e| anyhow!(e))?;
            println!("Token saved");
        }
        Command::Tasks => {
            let tasks = commands::list_tasks(&state).await.map_err(|e| anyhow!(e))?;
            if tasks.is_empty() {
                println!("No tasks assigned");
            }
            for task in tasks {
                println!(
                    "{}\t{}\t{}\t{} @ {}",
                    task.id,
                    task.status.as_str(),
                    task.title,
                    task.crop.as_deref().unwrap_or("-"),
                    task.location_name.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Start { task_id } => {
            let visit = commands::start_visit(&state, task_id)
                .await
                .map_err(|e| anyhow!(e))?;
            println!(
                "Tracking task {}",
                visit.task_id.as_deref().unwrap_or_default()
            );
            track_until_done(&state).await?;
        }
        Command::Resume => match commands::resume_visit(&state).await.map_err(|e| anyhow!(e))? {
            Some(task_id) => {
                println!("Tracking task {task_id}");
                track_until_done(&state).await?;
            }
            None => println!("No active visit"),
        },
        Command::Stop => match commands::stop_visit(&state).await.map_err(|e| anyhow!(e))? {
            Some(receipt) => println!(
                "Stop location saved for {} at {:.6},{:.6}",
                receipt.task_id, receipt.latitude, receipt.longitude
            ),
            None => println!("No active visit"),
        },
        Command::Complete { task_id } => {
            let done = commands::complete_visit(&state, task_id)
                .await
                .map_err(|e| anyhow!(e))?;
            println!("Task {} completed", done.task_id);
        }
        Command::Status => {
            let snapshot = commands::get_visit_state(&state)
                .await
                .map_err(|e| anyhow!(e))?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }

    Ok(())
}
