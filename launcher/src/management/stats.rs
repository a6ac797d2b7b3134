use crate::console::ConsoleEvent;
use crate::management::registry::ServerRegistry;
use log::trace;
use mcl_protocol::management::server::ServerStats;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;
use tokio::sync::Notify;

/// Folds one classified console event into a stats value. Pure: the
/// input is left untouched, the result replaces it wholesale.
///
/// Policy: the player counter clamps at zero, TPS and memory samples
/// are last-sample-wins (no smoothing).
pub fn fold_event(stats: &ServerStats, event: &ConsoleEvent) -> ServerStats {
    let mut next = stats.clone();
    match event {
        ConsoleEvent::PlayerJoined(_) => next.online_players += 1,
        ConsoleEvent::PlayerLeft(_) => {
            next.online_players = next.online_players.saturating_sub(1);
        }
        ConsoleEvent::TpsSample(tps) => next.tps = *tps,
        ConsoleEvent::MemorySample { used_mb, max_mb } => {
            next.used_memory_mb = *used_mb;
            next.max_memory_mb = *max_mb;
        }
        _ => {}
    }
    next
}

/// Point-in-time host-level figures.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostMetrics {
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub cpu_percent: f64,
}

/// Periodic host sampler: fills host memory/CPU and the
/// running-server count into every known record on a fixed interval.
/// When the platform reports nothing, zeros are published instead of
/// an error.
pub struct HostSampler {
    interval: Duration,
    system: System,
}

impl HostSampler {
    pub fn new(interval: Duration) -> Self {
        HostSampler {
            interval,
            system: System::new(),
        }
    }

    /// One sample. CPU percentages need two refreshes to be
    /// meaningful; the persistent [`System`] keeps the previous one.
    pub fn sample(&mut self) -> HostMetrics {
        self.system.refresh_memory();
        self.system.refresh_cpu_usage();

        HostMetrics {
            memory_used_mb: self.system.used_memory() / 1024 / 1024,
            memory_total_mb: self.system.total_memory() / 1024 / 1024,
            cpu_percent: f64::from(self.system.global_cpu_usage()).clamp(0.0, 100.0),
        }
    }

    /// Sampling loop, one per application. Stops when `shutdown` is
    /// notified.
    pub async fn run(mut self, registry: Arc<ServerRegistry>, shutdown: Arc<Notify>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let metrics = self.sample();
                    let running = registry.running_count();
                    trace!(
                        "host sample: {}/{} MB, cpu {:.1}%, {} running",
                        metrics.memory_used_mb,
                        metrics.memory_total_mb,
                        metrics.cpu_percent,
                        running
                    );
                    for id in registry.server_ids() {
                        registry.update(&id, |record| {
                            record.stats.host_memory_used_mb = metrics.memory_used_mb;
                            record.stats.host_memory_total_mb = metrics.memory_total_mb;
                            record.stats.host_cpu_percent = metrics.cpu_percent;
                            record.stats.running_servers = running;
                        });
                    }
                }
                _ = shutdown.notified() => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn player_count_clamps_at_zero() {
        let mut stats = ServerStats::default();
        for _ in 0..3 {
            stats = fold_event(&stats, &ConsoleEvent::PlayerJoined("p".to_owned()));
        }
        for _ in 0..5 {
            stats = fold_event(&stats, &ConsoleEvent::PlayerLeft("p".to_owned()));
        }
        assert_eq!(stats.online_players, 0);
    }

    #[test]
    fn tps_is_last_sample_wins() {
        let stats = ServerStats::default();
        let stats = fold_event(&stats, &ConsoleEvent::TpsSample(12.5));
        let stats = fold_event(&stats, &ConsoleEvent::TpsSample(19.2));
        assert_eq!(stats.tps, 19.2);
    }

    #[test]
    fn memory_sample_replaces_both_figures() {
        let stats = fold_event(
            &ServerStats::default(),
            &ConsoleEvent::MemorySample {
                used_mb: 900,
                max_mb: 4096,
            },
        );
        assert_eq!(stats.used_memory_mb, 900);
        assert_eq!(stats.max_memory_mb, 4096);
    }

    #[test]
    fn unrelated_events_change_nothing() {
        let stats = ServerStats::default();
        assert_eq!(fold_event(&stats, &ConsoleEvent::Ready), stats);
    }

    #[test]
    fn fold_does_not_mutate_input() {
        let stats = ServerStats::default();
        let _ = fold_event(&stats, &ConsoleEvent::PlayerJoined("p".to_owned()));
        assert_eq!(stats.online_players, 0);
    }

    #[test]
    fn host_sample_reports_some_memory() {
        let mut sampler = HostSampler::new(Duration::from_secs(5));
        let metrics = sampler.sample();
        assert!(metrics.memory_total_mb > 0);
        assert!(metrics.memory_used_mb <= metrics.memory_total_mb);
    }
}
