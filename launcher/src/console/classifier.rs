use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // "Done (3.214s)! For help, type "help"" — the trailing help hint
    // varies per flavor, the timing parenthetical does not.
    static ref DONE_PATTERN: Regex =
        Regex::new(r"Done \(\d+(?:\.\d+)?s\)!").expect("Failed to compile DONE_PATTERN regex");
    static ref JOINED_PATTERN: Regex =
        Regex::new(r"(\w+) joined the game").expect("Failed to compile JOINED_PATTERN regex");
    static ref LEFT_PATTERN: Regex =
        Regex::new(r"(\w+) left the game").expect("Failed to compile LEFT_PATTERN regex");
    // Covers both "Current TPS = 19.87" (Spigot) and
    // "TPS from last 1m, 5m, 15m: 20.0, 20.0, 20.0" (Paper).
    static ref TPS_PATTERN: Regex =
        Regex::new(r"TPS(?: from last [\w, ]+)?\s*[:=]\s*\*?(\d+(?:\.\d+)?)")
            .expect("Failed to compile TPS_PATTERN regex");
    static ref MEMORY_PATTERN: Regex =
        Regex::new(r"(?i)mem(?:ory)?(?: usage)?\s*:?\s*(\d+)\s*/\s*(\d+)\s*MB")
            .expect("Failed to compile MEMORY_PATTERN regex");
}

// Phrases emitted near fatal failures across the supported flavors.
// Best-effort: the authoritative crash signal stays the process exit.
const CRASH_MARKERS: &[&str] = &[
    "Minecraft has crashed",
    "---- Minecraft Crash Report ----",
    "Exception in server tick loop",
    "Failed to start the minecraft server",
    "Encountered an unexpected exception",
];

const EULA_MARKERS: &[&str] = &[
    "You need to agree to the EULA",
    "agree to the EULA in order to run the server",
];

/// Semantic event recognized in one console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEvent {
    /// Startup finished, the server accepts connections.
    Ready,
    PlayerJoined(String),
    PlayerLeft(String),
    TpsSample(f64),
    MemorySample { used_mb: u64, max_mb: u64 },
    /// The server echoed its own shutdown ("Stopping the server").
    Stopping,
    CrashMarker(String),
    EulaPrompt,
}

/// Classifies one already-stripped console line. Total: unrecognized
/// or malformed lines yield `None`, never an error.
pub fn classify(line: &str) -> Option<ConsoleEvent> {
    let line = line.trim_end();

    if DONE_PATTERN.is_match(line) {
        return Some(ConsoleEvent::Ready);
    }

    if EULA_MARKERS.iter().any(|marker| line.contains(marker)) {
        return Some(ConsoleEvent::EulaPrompt);
    }

    if let Some(marker) = CRASH_MARKERS.iter().find(|marker| line.contains(*marker)) {
        return Some(ConsoleEvent::CrashMarker((*marker).to_owned()));
    }

    if line.contains("Stopping the server") || line.contains("Stopping server") {
        return Some(ConsoleEvent::Stopping);
    }

    if let Some(caps) = JOINED_PATTERN.captures(line) {
        return Some(ConsoleEvent::PlayerJoined(caps[1].to_owned()));
    }
    if let Some(caps) = LEFT_PATTERN.captures(line) {
        return Some(ConsoleEvent::PlayerLeft(caps[1].to_owned()));
    }

    if let Some(caps) = TPS_PATTERN.captures(line) {
        // malformed numbers are skipped, not propagated
        if let Ok(tps) = caps[1].parse::<f64>() {
            return Some(ConsoleEvent::TpsSample(tps));
        }
    }

    if let Some(caps) = MEMORY_PATTERN.captures(line) {
        if let (Ok(used_mb), Ok(max_mb)) = (caps[1].parse(), caps[2].parse()) {
            return Some(ConsoleEvent::MemorySample { used_mb, max_mb });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn detects_ready_marker_across_flavors() {
        let lines = [
            r#"[12:00:01] [Server thread/INFO]: Done (3.214s)! For help, type "help""#,
            r#"[Server thread/INFO]: Done (12s)! For help, type "help" or "?""#,
        ];
        for line in lines {
            assert_eq!(classify(line), Some(ConsoleEvent::Ready), "{line}");
        }
    }

    #[test]
    fn done_without_timing_is_not_ready() {
        assert_eq!(classify("Done loading plugins"), None);
    }

    #[test]
    fn detects_player_join_and_leave() {
        assert_eq!(
            classify("[12:00:05] [Server thread/INFO]: Steve joined the game"),
            Some(ConsoleEvent::PlayerJoined("Steve".to_owned()))
        );
        assert_eq!(
            classify("[12:07:11] [Server thread/INFO]: Alex_99 left the game"),
            Some(ConsoleEvent::PlayerLeft("Alex_99".to_owned()))
        );
    }

    #[test]
    fn detects_spigot_tps() {
        assert_eq!(
            classify("[INFO]: Current TPS = 19.87"),
            Some(ConsoleEvent::TpsSample(19.87))
        );
    }

    #[test]
    fn detects_paper_tps_first_window() {
        assert_eq!(
            classify("TPS from last 1m, 5m, 15m: 20.0, 19.9, 19.8"),
            Some(ConsoleEvent::TpsSample(20.0))
        );
    }

    #[test]
    fn detects_memory_sample() {
        assert_eq!(
            classify("[INFO]: Memory: 812/2048 MB"),
            Some(ConsoleEvent::MemorySample {
                used_mb: 812,
                max_mb: 2048
            })
        );
    }

    #[test]
    fn detects_crash_markers() {
        let event = classify("[Server thread/ERROR]: Exception in server tick loop");
        assert!(matches!(event, Some(ConsoleEvent::CrashMarker(_))));
    }

    #[test]
    fn detects_eula_prompt() {
        let line = "[INFO]: You need to agree to the EULA in order to run the server.";
        assert_eq!(classify(line), Some(ConsoleEvent::EulaPrompt));
    }

    #[test]
    fn detects_stop_echo() {
        assert_eq!(
            classify("[Server thread/INFO]: Stopping the server"),
            Some(ConsoleEvent::Stopping)
        );
    }

    #[test]
    fn ordinary_lines_yield_no_event() {
        let lines = [
            "",
            "[12:00:00] [Server thread/INFO]: Preparing level \"world\"",
            "random garbage \u{1}\u{2}",
            "TPS = not-a-number",
        ];
        for line in lines {
            assert_eq!(classify(line), None, "{line:?}");
        }
    }

    #[test]
    fn chat_mentioning_phrases_is_still_matched_literally() {
        // Adversarial chat can fake events; classification is
        // best-effort by design and must simply not panic.
        let line = "<griefer> Done (0.0s)!";
        assert_eq!(classify(line), Some(ConsoleEvent::Ready));
    }
}
