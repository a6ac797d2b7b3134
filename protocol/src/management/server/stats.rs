use serde::{Deserialize, Serialize};

/// Runtime statistics for one server, replaced wholesale on each
/// update (value semantics).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStats {
    pub online_players: u32,
    pub max_players: u32,
    /// Ticks per second, nominal ceiling 20.0.
    pub tps: f64,
    pub used_memory_mb: u64,
    pub max_memory_mb: u64,
    pub uptime_seconds: u64,
    pub host_memory_used_mb: u64,
    pub host_memory_total_mb: u64,
    pub host_cpu_percent: f64,
    pub running_servers: u32,
}

impl Default for ServerStats {
    fn default() -> Self {
        ServerStats {
            online_players: 0,
            max_players: 20,
            tps: 20.0,
            used_memory_mb: 0,
            max_memory_mb: 0,
            uptime_seconds: 0,
            host_memory_used_mb: 0,
            host_memory_total_mb: 0,
            host_cpu_percent: 0.0,
            running_servers: 0,
        }
    }
}

impl ServerStats {
    /// `HH:MM:SS` rendering of the uptime.
    pub fn uptime_formatted(&self) -> String {
        let hours = self.uptime_seconds / 3600;
        let minutes = (self.uptime_seconds % 3600) / 60;
        let seconds = self.uptime_seconds % 60;
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }

    pub fn memory_usage_percent(&self) -> f32 {
        if self.max_memory_mb > 0 {
            self.used_memory_mb as f32 / self.max_memory_mb as f32
        } else {
            0.0
        }
    }

    pub fn host_memory_usage_percent(&self) -> f32 {
        if self.host_memory_total_mb > 0 {
            self.host_memory_used_mb as f32 / self.host_memory_total_mb as f32
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn uptime_formats_as_hms() {
        let stats = ServerStats {
            uptime_seconds: 3 * 3600 + 25 * 60 + 7,
            ..ServerStats::default()
        };
        assert_eq!(stats.uptime_formatted(), "03:25:07");
    }

    #[test]
    fn memory_percent_handles_zero_max() {
        let stats = ServerStats::default();
        assert_eq!(stats.memory_usage_percent(), 0.0);
    }

    #[test]
    fn fresh_stats_report_full_tps() {
        assert_eq!(ServerStats::default().tps, 20.0);
    }
}
