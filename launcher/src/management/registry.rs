use chrono::{DateTime, Utc};
use mcl_protocol::management::server::{ServerId, ServerState, ServerStats};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::watch;

/// Log ring capacity per server, oldest lines evicted first.
pub const LOG_CAPACITY: usize = 1000;

/// Immutable snapshot of every known server, published on each
/// registry mutation. Consumers never observe a partially updated
/// record.
pub type ServerMap = Arc<HashMap<ServerId, ServerRuntimeRecord>>;

/// Live bookkeeping for one server id. Owned by [`ServerRegistry`];
/// mutated only through [`ServerRegistry::update`], so readers always
/// see a whole record.
#[derive(Debug, Clone)]
pub struct ServerRuntimeRecord {
    pub state: ServerState,
    pub logs: VecDeque<String>,
    pub stats: ServerStats,
    pub last_update: DateTime<Utc>,
    /// Derived from `state`, recomputed on every write.
    pub transitioning: bool,
    /// Reason attached to the last transition into `Error`.
    pub last_error: Option<String>,
    /// Wall-clock instant of the last transition into `Running`;
    /// uptime is recomputed from it on every write, never counted.
    running_since: Option<Instant>,
}

impl Default for ServerRuntimeRecord {
    fn default() -> Self {
        ServerRuntimeRecord {
            state: ServerState::Stopped,
            logs: VecDeque::new(),
            stats: ServerStats::default(),
            last_update: Utc::now(),
            transitioning: false,
            last_error: None,
            running_since: None,
        }
    }
}

/// Concurrent map of server id to runtime record: the single shared
/// mutable resource of the core. Writers go through the atomic
/// [`update`](Self::update); readers subscribe to copy-on-write
/// snapshots or take point-in-time clones.
pub struct ServerRegistry {
    records: Mutex<HashMap<ServerId, ServerRuntimeRecord>>,
    snapshot_tx: watch::Sender<ServerMap>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(HashMap::new()));
        ServerRegistry {
            records: Mutex::new(HashMap::new()),
            snapshot_tx,
        }
    }

    /// Atomic read-modify-write of one record. The record is created
    /// on first touch. Derived fields (`transitioning`, uptime,
    /// `last_update`) are recomputed after the closure, and a fresh
    /// snapshot is published.
    pub fn update<F>(&self, id: &ServerId, f: F)
    where
        F: FnOnce(&mut ServerRuntimeRecord),
    {
        let mut records = self.records.lock().unwrap();
        let record = records.entry(id.clone()).or_default();
        let prev_state = record.state;

        f(record);

        if record.state != prev_state {
            match record.state {
                ServerState::Starting => {
                    // a new run: stats start over, host-level figures
                    // are carried until the sampler refreshes them
                    let previous = record.stats.clone();
                    record.stats = ServerStats {
                        host_memory_used_mb: previous.host_memory_used_mb,
                        host_memory_total_mb: previous.host_memory_total_mb,
                        host_cpu_percent: previous.host_cpu_percent,
                        running_servers: previous.running_servers,
                        ..ServerStats::default()
                    };
                    record.running_since = None;
                    record.last_error = None;
                }
                ServerState::Running => {
                    record.running_since = Some(Instant::now());
                }
                ServerState::Stopped | ServerState::Error => {
                    record.running_since = None;
                }
                ServerState::Stopping => {}
            }
        }

        if let Some(since) = record.running_since {
            record.stats.uptime_seconds = since.elapsed().as_secs();
        }
        record.transitioning = record.state.is_transitioning();
        record.last_update = Utc::now();

        self.publish(&records);
    }

    pub fn set_state(&self, id: &ServerId, state: ServerState) {
        self.update(id, |record| record.state = state);
    }

    /// Drives a server into `Error`, keeping the reason for callers.
    pub fn set_error(&self, id: &ServerId, reason: impl Into<String>) {
        let reason = reason.into();
        self.update(id, |record| {
            record.state = ServerState::Error;
            record.last_error = Some(reason);
        });
    }

    /// Appends one console line, evicting the oldest beyond
    /// [`LOG_CAPACITY`].
    pub fn append_log(&self, id: &ServerId, line: String) {
        self.update(id, |record| {
            record.logs.push_back(line);
            while record.logs.len() > LOG_CAPACITY {
                record.logs.pop_front();
            }
        });
    }

    pub fn get(&self, id: &ServerId) -> Option<ServerRuntimeRecord> {
        self.records.lock().unwrap().get(id).map(|record| {
            let mut record = record.clone();
            // uptime is derived at read time, not only on writes, so
            // a pull between mutations never reads a stale figure
            if let Some(since) = record.running_since {
                record.stats.uptime_seconds = since.elapsed().as_secs();
            }
            record
        })
    }

    /// Cached state; `Stopped` for unknown ids.
    pub fn state(&self, id: &ServerId) -> ServerState {
        self.records
            .lock()
            .unwrap()
            .get(id)
            .map(|record| record.state)
            .unwrap_or_default()
    }

    /// Replaces the record with a fresh `Stopped` one (explicit reset,
    /// the only way out of `Error`).
    pub fn reset(&self, id: &ServerId) {
        let mut records = self.records.lock().unwrap();
        records.insert(id.clone(), ServerRuntimeRecord::default());
        self.publish(&records);
    }

    /// Deletes the record entirely (server removed from disk).
    pub fn remove(&self, id: &ServerId) -> Option<ServerRuntimeRecord> {
        let mut records = self.records.lock().unwrap();
        let removed = records.remove(id);
        if removed.is_some() {
            self.publish(&records);
        }
        removed
    }

    pub fn running_count(&self) -> u32 {
        self.records
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.state == ServerState::Running)
            .count() as u32
    }

    pub fn server_ids(&self) -> Vec<ServerId> {
        self.records.lock().unwrap().keys().cloned().collect()
    }

    /// Push-based stream of full-map snapshots for external observers.
    pub fn subscribe(&self) -> watch::Receiver<ServerMap> {
        self.snapshot_tx.subscribe()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> ServerMap {
        self.snapshot_tx.borrow().clone()
    }

    fn publish(&self, records: &HashMap<ServerId, ServerRuntimeRecord>) {
        self.snapshot_tx.send_replace(Arc::new(records.clone()));
    }
}

impl Default for ServerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
