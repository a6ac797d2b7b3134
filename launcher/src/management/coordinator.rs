use crate::management::launch::{find_server_jar, ServerConfigExt};
use crate::management::process::{CommandError, ServerProcess, StartError, SupervisorTimings};
use crate::management::registry::ServerRegistry;
use log::{info, warn};
use mcl_protocol::management::server::{ServerConfig, ServerId, ServerState};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};

#[derive(Debug, Error)]
pub enum StartFailure {
    #[error("server is already running")]
    AlreadyRunning,
    #[error("EULA not accepted, see {}", .eula_path.display())]
    EulaNotAccepted { eula_path: PathBuf },
    #[error("no server jar found in {}", .dir.display())]
    NoJarFound { dir: PathBuf },
    #[error(transparent)]
    Start(#[from] StartError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Front door for the server lifecycle: owns the live-process table
/// and enforces at most one process per server id. All state reporting
/// goes through the shared [`ServerRegistry`].
pub struct LifecycleCoordinator {
    registry: Arc<ServerRegistry>,
    processes: scc::HashMap<ServerId, Arc<ServerProcess>>,
    // serializes start_server; scc entries cannot be held across the
    // spawn await
    start_lock: Mutex<()>,
    timings: SupervisorTimings,
}

impl LifecycleCoordinator {
    pub fn new(registry: Arc<ServerRegistry>) -> Self {
        Self::with_timings(registry, SupervisorTimings::default())
    }

    pub fn with_timings(registry: Arc<ServerRegistry>, timings: SupervisorTimings) -> Self {
        LifecycleCoordinator {
            registry,
            processes: scc::HashMap::new(),
            start_lock: Mutex::new(()),
            timings,
        }
    }

    pub fn registry(&self) -> &Arc<ServerRegistry> {
        &self.registry
    }

    /// Launches the server installed at `dir`. Fails with
    /// [`StartFailure::EulaNotAccepted`] until the EULA marker is in
    /// place; call [`accept_eula`](Self::accept_eula) and start again.
    pub async fn start_server(
        &self,
        id: &ServerId,
        dir: &Path,
        config: &ServerConfig,
    ) -> Result<(), StartFailure> {
        let _guard = self.start_lock.lock().await;

        if let Some(process) = self.process(id).await {
            if process.is_running() {
                return Err(StartFailure::AlreadyRunning);
            }
            // exited but never restarted; drop the stale handle
            self.processes.remove_async(id).await;
        }

        if !eula_accepted(dir).await? {
            return Err(StartFailure::EulaNotAccepted {
                eula_path: dir.join("eula.txt"),
            });
        }

        let jar = find_server_jar(dir).ok_or_else(|| StartFailure::NoJarFound {
            dir: dir.to_path_buf(),
        })?;
        // the process runs with dir as cwd, the jar token stays bare
        let jar_name = jar
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| jar.to_string_lossy().into_owned());
        let command = config.launch_command(&jar_name);
        info!("starting server {}: {}", id, config.command_string(&jar_name));

        let process = ServerProcess::spawn(
            id.clone(),
            &command,
            dir,
            Arc::clone(&self.registry),
            self.timings,
        )?;
        if self
            .processes
            .insert_async(id.clone(), process)
            .await
            .is_err()
        {
            // cannot happen under start_lock, but never leak a spawn
            warn!("server {}: process table slot was occupied", id);
        }
        Ok(())
    }

    /// Accepts the EULA and immediately starts the server.
    pub async fn accept_eula_then_start(
        &self,
        id: &ServerId,
        dir: &Path,
        config: &ServerConfig,
    ) -> Result<(), StartFailure> {
        accept_eula(dir).await?;
        self.start_server(id, dir, config).await
    }

    /// Requests a graceful in-band shutdown.
    pub async fn stop_server(&self, id: &ServerId) -> Result<(), CommandError> {
        self.live_process(id).await?.request_stop()
    }

    /// Terminates the process at the OS level; lands on `Stopped` from
    /// any state, including a hung `Stopping`.
    pub async fn force_kill_server(&self, id: &ServerId) -> Result<(), CommandError> {
        self.live_process(id).await?.kill();
        Ok(())
    }

    pub async fn send_command(&self, id: &ServerId, text: &str) -> Result<(), CommandError> {
        self.live_process(id).await?.send_command(text)
    }

    /// OS-level ground truth for the given id, independent of the
    /// registry's cached state.
    pub async fn is_server_running(&self, id: &ServerId) -> bool {
        match self.process(id).await {
            Some(process) => process.is_running(),
            None => false,
        }
    }

    /// Acknowledges a terminal `Error` (or stale `Stopped`) record and
    /// returns the server to a clean `Stopped` slate. Refused while the
    /// process is alive.
    pub async fn reset_server(&self, id: &ServerId) -> bool {
        if self.is_server_running(id).await {
            return false;
        }
        self.processes.remove_async(id).await;
        self.registry.reset(id);
        true
    }

    /// Live console tail for the given id, if a process exists.
    pub async fn subscribe_logs(&self, id: &ServerId) -> Option<broadcast::Receiver<String>> {
        self.process(id).await.map(|p| p.subscribe_logs())
    }

    /// Requests a graceful stop of every live server. Used on launcher
    /// shutdown; completion is observed through the registry.
    pub async fn stop_all(&self) {
        let mut ids = Vec::new();
        self.processes
            .scan_async(|id, process| {
                if process.is_running() {
                    ids.push(id.clone());
                }
            })
            .await;
        for id in ids {
            if let Err(err) = self.stop_server(&id).await {
                warn!("server {}: stop on shutdown failed: {}", id, err);
            }
        }
    }

    pub fn transitioning(&self, id: &ServerId) -> bool {
        self.registry.state(id).is_transitioning()
    }

    async fn process(&self, id: &ServerId) -> Option<Arc<ServerProcess>> {
        self.processes.read_async(id, |_, p| Arc::clone(p)).await
    }

    async fn live_process(&self, id: &ServerId) -> Result<Arc<ServerProcess>, CommandError> {
        match self.process(id).await {
            Some(process) if process.is_running() => Ok(process),
            _ => Err(CommandError::NotRunning),
        }
    }
}

/// Whether `dir/eula.txt` carries an uncommented `eula=true`.
pub async fn eula_accepted(dir: &Path) -> io::Result<bool> {
    let path = dir.join("eula.txt");
    if !path.exists() {
        return Ok(false);
    }
    let content = tokio::fs::read_to_string(&path).await?;
    Ok(content.lines().any(|line| {
        let line = line.trim();
        match line.strip_prefix("eula") {
            Some(rest) => rest
                .trim_start()
                .strip_prefix('=')
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
            None => false,
        }
    }))
}

/// Writes `eula=true` into `dir/eula.txt`, rewriting an existing file
/// in place or generating a fresh one. Idempotent.
pub async fn accept_eula(dir: &Path) -> io::Result<()> {
    let path = dir.join("eula.txt");
    if path.exists() {
        let content = tokio::fs::read_to_string(&path).await?;
        let mut fixed = false;
        let mut lines = content
            .lines()
            .map(|l| {
                if l.trim_start().starts_with("eula") {
                    fixed = true;
                    "eula=true"
                } else {
                    l
                }
            })
            .collect::<Vec<_>>();
        if !fixed {
            lines.push("eula=true");
        }
        tokio::fs::write(&path, lines.join("\n").as_bytes()).await
    } else {
        let content = format!(
            "#By changing the setting below to TRUE you are indicating your agreement to our EULA (https://aka.ms/MinecraftEULA).\n#{}\neula=true\n",
            chrono::Local::now().format("%a %b %d %H:%M:%S %Z %Y")
        );
        tokio::fs::write(&path, content.as_bytes()).await
    }
}
