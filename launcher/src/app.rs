use chrono::{DateTime, Utc};
use log::{debug, info};
use std::ops::Deref;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tokio::sync::Notify;

use crate::config::AppConfig;
use crate::management::stats::HostSampler;
use crate::management::{LifecycleCoordinator, ServerRegistry};
use crate::storage::scanner;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
static START_TIME: LazyLock<DateTime<Utc>> = LazyLock::new(Utc::now);

pub struct ApplicationState {
    pub config: AppConfig,
    pub registry: Arc<ServerRegistry>,
    pub coordinator: Arc<LifecycleCoordinator>,
    pub stop_notify: Arc<Notify>,
}
pub type AppState = Arc<ApplicationState>;

pub fn get_start_time() -> &'static DateTime<Utc> {
    START_TIME.deref()
}

pub fn init_app_state(config: AppConfig) -> AppState {
    let registry = Arc::new(ServerRegistry::new());
    let coordinator = Arc::new(LifecycleCoordinator::with_timings(
        Arc::clone(&registry),
        config.supervisor_timings(),
    ));
    Arc::new(ApplicationState {
        config,
        registry,
        coordinator,
        stop_notify: Arc::new(Notify::new()),
    })
}

pub async fn run_app() -> anyhow::Result<()> {
    let _ = get_start_time();

    let config = AppConfig::load(Path::new("config.json"))?;
    debug!("config loaded: {}", serde_json::to_string_pretty(&config)?);

    let state = init_app_state(config);
    info!("launcher v{} started", VERSION);

    let servers = scanner::scan_servers(&state.config.servers_dir)?;
    for server in &servers {
        info!(
            "found server: {} ({} {}) at {}",
            server.name,
            server.flavor,
            server.version,
            server.path.display()
        );
    }

    let sampler = HostSampler::new(state.config.host_sample_interval());
    let sampler_task = tokio::spawn(sampler.run(
        Arc::clone(&state.registry),
        Arc::clone(&state.stop_notify),
    ));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupt received, shutting down"),
        _ = state.stop_notify.notified() => {}
    }

    state.coordinator.stop_all().await;
    state.stop_notify.notify_waiters();
    let _ = sampler_task.await;

    info!("Bye.");
    Ok(())
}
