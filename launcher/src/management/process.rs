use crate::console::{classify, ConsoleEvent};
use crate::management::launch::unquote_executable;
use crate::management::process_helper;
use crate::management::registry::ServerRegistry;
use crate::management::stats::fold_event;
use log::{debug, info, warn};
use mcl_protocol::console::strip_codes;
use mcl_protocol::management::server::{ServerId, ServerState};
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::select;
use tokio::sync::{broadcast, mpsc, Notify};

#[derive(Debug, Error)]
pub enum StartError {
    #[error("launch command is empty")]
    EmptyCommand,
    #[error("failed to spawn server process: {0}")]
    Spawn(#[from] io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("server is not running")]
    NotRunning,
}

/// Delays of the supervision side paths, injectable so tests do not
/// sit through real waits.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorTimings {
    /// Window after a graceful stop request before a hung shutdown is
    /// reported. Reported only: escalation to a kill is the caller's
    /// decision.
    pub stop_grace: Duration,
    /// Period of the bounded post-stop liveness re-check.
    pub recheck_interval: Duration,
    pub recheck_limit: u32,
}

impl Default for SupervisorTimings {
    fn default() -> Self {
        SupervisorTimings {
            stop_grace: Duration::from_secs(30),
            recheck_interval: Duration::from_secs(10),
            recheck_limit: 12,
        }
    }
}

enum PipeMsg {
    Line(String),
    Failed(String),
}

/// Supervisor for one server's OS child process.
///
/// The child handle lives inside a sequential event loop task: the
/// single writer of this server's state transitions. Everything else
/// talks to the loop through channels (stdin lines, kill notify), so
/// concurrent requests for the same id serialize instead of racing.
pub struct ServerProcess {
    id: ServerId,
    pid: u32,
    stdin_tx: mpsc::UnboundedSender<String>,
    log_tx: broadcast::Sender<String>,
    kill_notify: Arc<Notify>,
    exited: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
    registry: Arc<ServerRegistry>,
    timings: SupervisorTimings,
}

impl ServerProcess {
    /// Spawns the process and starts supervision. On success the
    /// server is in `Starting`; on a spawn failure the state is left
    /// untouched at `Stopped`.
    pub fn spawn(
        id: ServerId,
        command: &[String],
        working_dir: &Path,
        registry: Arc<ServerRegistry>,
        timings: SupervisorTimings,
    ) -> Result<Arc<Self>, StartError> {
        let (target, args) = command.split_first().ok_or(StartError::EmptyCommand)?;

        let mut cmd = Command::new(unquote_executable(target));
        cmd.args(args)
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let pid = child.id().unwrap_or(0);
        info!("server {} spawned (pid={})", id, pid);

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("child stderr not captured"))?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("child stdin not captured"))?;

        registry.set_state(&id, ServerState::Starting);

        let (log_tx, _) = broadcast::channel::<String>(1024);
        let kill_notify = Arc::new(Notify::new());
        let exited = Arc::new(AtomicBool::new(false));
        let stop_requested = Arc::new(AtomicBool::new(false));

        // stdin writer: held open for the whole run
        let (stdin_tx, mut stdin_rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn({
            let id = id.clone();
            async move {
                while let Some(line) = stdin_rx.recv().await {
                    if let Err(err) = stdin.write_all(line.as_bytes()).await {
                        warn!("server {}: stdin write failed: {}", id, err);
                        break;
                    }
                    if let Err(err) = stdin.write_all(b"\n").await {
                        warn!("server {}: stdin write failed: {}", id, err);
                        break;
                    }
                    let _ = stdin.flush().await;
                }
            }
        });

        // stdout and stderr merge into one ordered line stream
        let (line_tx, mut line_rx) = mpsc::channel::<PipeMsg>(256);
        tokio::spawn({
            let line_tx = line_tx.clone();
            async move {
                let mut lines = BufReader::new(stdout).lines();
                loop {
                    match lines.next_line().await {
                        Ok(Some(line)) => {
                            if line_tx.send(PipeMsg::Line(line)).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(err) => {
                            let _ = line_tx.send(PipeMsg::Failed(err.to_string())).await;
                            break;
                        }
                    }
                }
            }
        });
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = format!("[STDERR] {}", line);
                        if line_tx.send(PipeMsg::Line(line)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        let _ = line_tx.send(PipeMsg::Failed(err.to_string())).await;
                        break;
                    }
                }
            }
        });

        // the supervision loop: sole writer of this id's transitions
        let events = EventSink {
            id: id.clone(),
            registry: Arc::clone(&registry),
            log_tx: log_tx.clone(),
            stop_requested: Arc::clone(&stop_requested),
        };
        tokio::spawn({
            let kill_notify = Arc::clone(&kill_notify);
            let exited = Arc::clone(&exited);
            async move {
                let mut crash_reason: Option<String> = None;
                let mut pipes_open = true;
                loop {
                    select! {
                        msg = line_rx.recv(), if pipes_open => match msg {
                            Some(PipeMsg::Line(line)) => {
                                events.on_line(line, &mut crash_reason);
                            }
                            Some(PipeMsg::Failed(err)) => {
                                // cannot tell a pipe failure from death,
                                // so treat it as a crash signal
                                warn!("server {}: console stream failed: {}", events.id, err);
                                crash_reason
                                    .get_or_insert(format!("console stream failed: {}", err));
                                let _ = child.start_kill();
                                pipes_open = false;
                            }
                            None => pipes_open = false,
                        },
                        status = child.wait() => {
                            exited.store(true, Ordering::SeqCst);
                            // flush lines the pipes still buffered
                            while let Ok(PipeMsg::Line(line)) = line_rx.try_recv() {
                                events.on_line(line, &mut crash_reason);
                            }
                            events.on_exit(status, crash_reason.take());
                            break;
                        }
                        _ = kill_notify.notified() => {
                            if let Err(err) = child.kill().await {
                                warn!(
                                    "server {}: could not kill process (pid={}): {}",
                                    events.id, pid, err
                                );
                            }
                            exited.store(true, Ordering::SeqCst);
                            // hard kill bypasses Stopping entirely
                            events.registry.set_state(&events.id, ServerState::Stopped);
                            info!("server {} killed", events.id);
                            break;
                        }
                    }
                }
            }
        });

        Ok(Arc::new(ServerProcess {
            id,
            pid,
            stdin_tx,
            log_tx,
            kill_notify,
            exited,
            stop_requested,
            registry,
            timings,
        }))
    }

    pub fn id(&self) -> &ServerId {
        &self.id
    }

    /// Point-in-time OS liveness, not the cached state enum.
    pub fn is_running(&self) -> bool {
        !self.exited.load(Ordering::SeqCst) && process_helper::alive(self.pid)
    }

    /// Writes one command line to the server console. Checked against
    /// OS liveness, so a process killed behind our back is refused as
    /// soon as the pid is gone, not only once the exit is reaped.
    pub fn send_command(&self, text: &str) -> Result<(), CommandError> {
        if !self.is_running() {
            return Err(CommandError::NotRunning);
        }
        self.stdin_tx
            .send(text.to_owned())
            .map_err(|_| CommandError::NotRunning)
    }

    /// Requests a graceful shutdown via the in-band `stop` command and
    /// moves the server to `Stopping`. Completion is detected
    /// asynchronously when the exit is observed; a shutdown that blows
    /// through the grace window is reported, never escalated here.
    ///
    /// Deliberately accepted while still `Starting`: the early `stop`
    /// line waits in the console pipe and takes effect as soon as the
    /// server begins reading stdin.
    pub fn request_stop(&self) -> Result<(), CommandError> {
        if !self.is_running() {
            return Err(CommandError::NotRunning);
        }
        self.stop_requested.store(true, Ordering::SeqCst);
        self.registry.set_state(&self.id, ServerState::Stopping);
        self.stdin_tx
            .send("stop".to_owned())
            .map_err(|_| CommandError::NotRunning)?;

        tokio::spawn({
            let id = self.id.clone();
            let pid = self.pid;
            let exited = Arc::clone(&self.exited);
            let registry = Arc::clone(&self.registry);
            let timings = self.timings;
            async move {
                tokio::time::sleep(timings.stop_grace).await;
                if exited.load(Ordering::SeqCst) {
                    return;
                }
                warn!(
                    "server {} did not exit within {:?} after stop",
                    id, timings.stop_grace
                );
                registry.append_log(
                    &id,
                    format!(
                        "[launcher] server did not exit within {}s after stop; force kill to terminate",
                        timings.stop_grace.as_secs()
                    ),
                );
                // convenience re-check, bounded; correctness lives in
                // is_running(), not here
                for _ in 0..timings.recheck_limit {
                    tokio::time::sleep(timings.recheck_interval).await;
                    if exited.load(Ordering::SeqCst) || !process_helper::alive(pid) {
                        return;
                    }
                    debug!("server {} still alive after stop request", id);
                }
            }
        });
        Ok(())
    }

    /// Unconditional OS-level termination; lands on `Stopped`,
    /// effective even while a graceful stop is in flight. When the
    /// supervision loop has already wound down but the OS still
    /// reports the pid, falls back to a pid-level kill.
    pub fn kill(&self) {
        if self.exited.load(Ordering::SeqCst) {
            if process_helper::alive(self.pid) {
                if let Err(err) = process_helper::kill(self.pid) {
                    warn!("server {}: pid-level kill failed: {}", self.id, err);
                }
            }
            return;
        }
        self.kill_notify.notify_one();
    }

    /// Live tail of the raw (uncolor-stripped) console stream.
    pub fn subscribe_logs(&self) -> broadcast::Receiver<String> {
        self.log_tx.subscribe()
    }
}

/// Registry-facing half of the supervision loop.
struct EventSink {
    id: ServerId,
    registry: Arc<ServerRegistry>,
    log_tx: broadcast::Sender<String>,
    stop_requested: Arc<AtomicBool>,
}

impl EventSink {
    fn on_line(&self, line: String, crash_reason: &mut Option<String>) {
        let _ = self.log_tx.send(line.clone());
        self.registry.append_log(&self.id, line.clone());

        let stripped = strip_codes(&line);
        let Some(event) = classify(&stripped) else {
            return;
        };

        match event {
            ConsoleEvent::Ready => {
                if self.registry.state(&self.id) == ServerState::Starting {
                    info!("server {} is ready", self.id);
                    self.registry.set_state(&self.id, ServerState::Running);
                }
            }
            ConsoleEvent::Stopping => {
                if self.registry.state(&self.id) == ServerState::Running {
                    self.registry.set_state(&self.id, ServerState::Stopping);
                }
            }
            ConsoleEvent::CrashMarker(marker) => {
                warn!("server {}: crash marker: {}", self.id, marker);
                let reason = crash_reason.get_or_insert(marker).clone();
                if self.registry.state(&self.id) == ServerState::Starting {
                    self.registry.set_error(&self.id, reason);
                }
            }
            ConsoleEvent::EulaPrompt => {
                warn!("server {} refuses to start: EULA not accepted", self.id);
                crash_reason.get_or_insert("EULA not accepted".to_owned());
            }
            event @ (ConsoleEvent::PlayerJoined(_)
            | ConsoleEvent::PlayerLeft(_)
            | ConsoleEvent::TpsSample(_)
            | ConsoleEvent::MemorySample { .. }) => {
                self.registry.update(&self.id, |record| {
                    record.stats = fold_event(&record.stats, &event);
                });
            }
        }
    }

    /// Terminal transition for the observed process exit, the one
    /// signal that must never be dropped.
    fn on_exit(&self, status: io::Result<ExitStatus>, crash_reason: Option<String>) {
        let state = self.registry.state(&self.id);
        match status {
            Ok(status) => match state {
                ServerState::Stopping => {
                    info!("server {} stopped ({})", self.id, status);
                    self.registry.set_state(&self.id, ServerState::Stopped);
                }
                ServerState::Starting => {
                    let reason = crash_reason
                        .unwrap_or_else(|| format!("server exited during startup ({})", status));
                    warn!("server {}: {}", self.id, reason);
                    self.registry.set_error(&self.id, reason);
                }
                ServerState::Running => {
                    if self.stop_requested.load(Ordering::SeqCst) {
                        // stop raced the Stopping write; still a
                        // requested shutdown
                        self.registry.set_state(&self.id, ServerState::Stopped);
                        return;
                    }
                    let reason = crash_reason
                        .unwrap_or_else(|| format!("server exited unexpectedly ({})", status));
                    warn!("server {}: {}", self.id, reason);
                    self.registry.set_error(&self.id, reason);
                }
                // kill path or a crash marker already drove the state
                ServerState::Stopped | ServerState::Error => {}
            },
            Err(err) => {
                if state != ServerState::Stopped {
                    self.registry
                        .set_error(&self.id, format!("failed to observe server exit: {}", err));
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> Vec<String> {
        vec!["/bin/sh".to_owned(), "-c".to_owned(), script.to_owned()]
    }

    fn test_timings() -> SupervisorTimings {
        SupervisorTimings {
            stop_grace: Duration::from_millis(200),
            recheck_interval: Duration::from_millis(50),
            recheck_limit: 3,
        }
    }

    async fn wait_for_state(
        registry: &ServerRegistry,
        id: &ServerId,
        state: ServerState,
    ) -> Result<(), ServerState> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if registry.state(id) == state {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Err(registry.state(id))
    }

    #[tokio::test]
    async fn ready_marker_moves_starting_to_running() {
        let registry = Arc::new(ServerRegistry::new());
        let dir = tempfile::tempdir().unwrap();
        let id = ServerId::from_path(dir.path());

        let process = ServerProcess::spawn(
            id.clone(),
            &sh("echo 'Done (1.203s)! For help, type \"help\"'; sleep 30"),
            dir.path(),
            Arc::clone(&registry),
            test_timings(),
        )
        .unwrap();

        assert_eq!(registry.state(&id), ServerState::Starting);
        wait_for_state(&registry, &id, ServerState::Running)
            .await
            .unwrap();
        assert!(process.is_running());
        let record = registry.get(&id).unwrap();
        assert!(record.stats.uptime_seconds < 2);

        process.kill();
        wait_for_state(&registry, &id, ServerState::Stopped)
            .await
            .unwrap();
        assert!(!process.is_running());
    }

    #[tokio::test]
    async fn graceful_stop_lands_on_stopped() {
        let registry = Arc::new(ServerRegistry::new());
        let dir = tempfile::tempdir().unwrap();
        let id = ServerId::from_path(dir.path());

        let script = "echo 'Done (0.5s)! For help'; \
                      while read line; do \
                        if [ \"$line\" = stop ]; then echo 'Stopping the server'; exit 0; fi; \
                      done";
        let process = ServerProcess::spawn(
            id.clone(),
            &sh(script),
            dir.path(),
            Arc::clone(&registry),
            test_timings(),
        )
        .unwrap();

        wait_for_state(&registry, &id, ServerState::Running)
            .await
            .unwrap();
        process.request_stop().unwrap();
        wait_for_state(&registry, &id, ServerState::Stopped)
            .await
            .unwrap();
        assert!(!process.is_running());
        assert!(registry.get(&id).unwrap().last_error.is_none());
    }

    #[tokio::test]
    async fn exit_before_ready_is_an_error_with_reason() {
        let registry = Arc::new(ServerRegistry::new());
        let dir = tempfile::tempdir().unwrap();
        let id = ServerId::from_path(dir.path());

        ServerProcess::spawn(
            id.clone(),
            &sh("echo booting; exit 3"),
            dir.path(),
            Arc::clone(&registry),
            test_timings(),
        )
        .unwrap();

        wait_for_state(&registry, &id, ServerState::Error)
            .await
            .unwrap();
        let record = registry.get(&id).unwrap();
        assert!(!record.last_error.as_deref().unwrap_or("").is_empty());
    }

    #[tokio::test]
    async fn unexpected_exit_while_running_is_an_error() {
        let registry = Arc::new(ServerRegistry::new());
        let dir = tempfile::tempdir().unwrap();
        let id = ServerId::from_path(dir.path());

        ServerProcess::spawn(
            id.clone(),
            &sh("echo 'Done (0.1s)! For help'; sleep 0.2; exit 1"),
            dir.path(),
            Arc::clone(&registry),
            test_timings(),
        )
        .unwrap();

        wait_for_state(&registry, &id, ServerState::Running)
            .await
            .unwrap();
        wait_for_state(&registry, &id, ServerState::Error)
            .await
            .unwrap();
        assert!(registry.get(&id).unwrap().last_error.is_some());
    }

    #[tokio::test]
    async fn kill_interrupts_a_hung_graceful_stop() {
        let registry = Arc::new(ServerRegistry::new());
        let dir = tempfile::tempdir().unwrap();
        let id = ServerId::from_path(dir.path());

        // reads nothing, never exits on its own
        let process = ServerProcess::spawn(
            id.clone(),
            &sh("echo 'Done (0.1s)! For help'; exec sleep 60"),
            dir.path(),
            Arc::clone(&registry),
            test_timings(),
        )
        .unwrap();

        wait_for_state(&registry, &id, ServerState::Running)
            .await
            .unwrap();
        process.request_stop().unwrap();
        assert_eq!(registry.state(&id), ServerState::Stopping);

        process.kill();
        wait_for_state(&registry, &id, ServerState::Stopped)
            .await
            .unwrap();
        // killed, never Error
        assert!(registry.get(&id).unwrap().last_error.is_none());
    }

    #[tokio::test]
    async fn crash_marker_during_startup_drives_error() {
        let registry = Arc::new(ServerRegistry::new());
        let dir = tempfile::tempdir().unwrap();
        let id = ServerId::from_path(dir.path());

        ServerProcess::spawn(
            id.clone(),
            &sh("echo 'Exception in server tick loop'; sleep 30"),
            dir.path(),
            Arc::clone(&registry),
            test_timings(),
        )
        .unwrap();

        wait_for_state(&registry, &id, ServerState::Error)
            .await
            .unwrap();
        assert_eq!(
            registry.get(&id).unwrap().last_error.as_deref(),
            Some("Exception in server tick loop")
        );
    }

    #[tokio::test]
    async fn send_command_after_exit_is_rejected() {
        let registry = Arc::new(ServerRegistry::new());
        let dir = tempfile::tempdir().unwrap();
        let id = ServerId::from_path(dir.path());

        let process = ServerProcess::spawn(
            id.clone(),
            &sh("exit 0"),
            dir.path(),
            Arc::clone(&registry),
            test_timings(),
        )
        .unwrap();

        wait_for_state(&registry, &id, ServerState::Error)
            .await
            .unwrap();
        assert_eq!(
            process.send_command("list"),
            Err(CommandError::NotRunning)
        );
    }

    #[tokio::test]
    async fn stderr_lines_are_merged_into_the_log() {
        let registry = Arc::new(ServerRegistry::new());
        let dir = tempfile::tempdir().unwrap();
        let id = ServerId::from_path(dir.path());

        ServerProcess::spawn(
            id.clone(),
            &sh("echo out; echo err >&2; exit 0"),
            dir.path(),
            Arc::clone(&registry),
            test_timings(),
        )
        .unwrap();

        wait_for_state(&registry, &id, ServerState::Error)
            .await
            .unwrap();
        let logs = registry.get(&id).unwrap().logs;
        assert!(logs.iter().any(|line| line == "out"));
        assert!(logs.iter().any(|line| line == "[STDERR] err"));
    }

    #[tokio::test]
    async fn player_events_update_stats() {
        let registry = Arc::new(ServerRegistry::new());
        let dir = tempfile::tempdir().unwrap();
        let id = ServerId::from_path(dir.path());

        let script = "echo 'Done (0.1s)! For help'; \
                      echo 'Steve joined the game'; \
                      echo 'Alex joined the game'; \
                      echo 'Steve left the game'; \
                      sleep 30";
        let process = ServerProcess::spawn(
            id.clone(),
            &sh(script),
            dir.path(),
            Arc::clone(&registry),
            test_timings(),
        )
        .unwrap();

        wait_for_state(&registry, &id, ServerState::Running)
            .await
            .unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while registry.get(&id).unwrap().stats.online_players != 1
            && Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(registry.get(&id).unwrap().stats.online_players, 1);
        process.kill();
    }

    #[tokio::test]
    async fn spawn_failure_leaves_state_stopped() {
        let registry = Arc::new(ServerRegistry::new());
        let dir = tempfile::tempdir().unwrap();
        let id = ServerId::from_path(dir.path());

        let result = ServerProcess::spawn(
            id.clone(),
            &["/nonexistent/java".to_owned()].to_vec(),
            dir.path(),
            Arc::clone(&registry),
            test_timings(),
        );
        assert!(matches!(result, Err(StartError::Spawn(_))));
        assert_eq!(registry.state(&id), ServerState::Stopped);
    }

    #[tokio::test]
    async fn blown_stop_grace_is_reported_not_escalated() {
        let registry = Arc::new(ServerRegistry::new());
        let dir = tempfile::tempdir().unwrap();
        let id = ServerId::from_path(dir.path());

        // never reads stdin, never exits on its own
        let process = ServerProcess::spawn(
            id.clone(),
            &sh("echo 'Done (0.1s)! For help'; exec sleep 60"),
            dir.path(),
            Arc::clone(&registry),
            test_timings(),
        )
        .unwrap();

        wait_for_state(&registry, &id, ServerState::Running)
            .await
            .unwrap();
        process.request_stop().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let reported = |registry: &Arc<ServerRegistry>| {
            registry
                .get(&id)
                .map(|r| r.logs.iter().any(|l| l.contains("did not exit within")))
                .unwrap_or(false)
        };
        while !reported(&registry) && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(reported(&registry));
        // reported only: the server is still up, the state still Stopping
        assert_eq!(registry.state(&id), ServerState::Stopping);
        assert!(process.is_running());

        process.kill();
        wait_for_state(&registry, &id, ServerState::Stopped)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stop_during_startup_is_honored_once_stdin_is_read() {
        let registry = Arc::new(ServerRegistry::new());
        let dir = tempfile::tempdir().unwrap();
        let id = ServerId::from_path(dir.path());

        // reads commands from the first moment, never prints the
        // ready marker
        let script = "while read line; do \
                        if [ \"$line\" = stop ]; then exit 0; fi; \
                      done";
        ServerProcess::spawn(
            id.clone(),
            &sh(script),
            dir.path(),
            Arc::clone(&registry),
            test_timings(),
        )
        .unwrap()
        .request_stop()
        .unwrap();

        assert_eq!(registry.state(&id), ServerState::Stopping);
        wait_for_state(&registry, &id, ServerState::Stopped)
            .await
            .unwrap();
        assert!(registry.get(&id).unwrap().last_error.is_none());
    }

    #[tokio::test]
    async fn external_kill_refuses_further_commands() {
        let registry = Arc::new(ServerRegistry::new());
        let dir = tempfile::tempdir().unwrap();
        let id = ServerId::from_path(dir.path());

        let process = ServerProcess::spawn(
            id.clone(),
            &sh("echo 'Done (0.1s)! For help'; exec sleep 60"),
            dir.path(),
            Arc::clone(&registry),
            test_timings(),
        )
        .unwrap();

        wait_for_state(&registry, &id, ServerState::Running)
            .await
            .unwrap();
        process_helper::kill(process.pid).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while process.send_command("list").is_ok() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(
            process.send_command("list"),
            Err(CommandError::NotRunning)
        );
        wait_for_state(&registry, &id, ServerState::Error)
            .await
            .unwrap();

        // kill on a wound-down supervisor is a no-op, not a panic
        process.kill();
        assert!(!process.is_running());
    }
}
