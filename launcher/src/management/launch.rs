use mcl_protocol::management::server::ServerConfig;
use std::path::Path;

/// Launch-command composition for a [`ServerConfig`].
///
/// The token order is a contract external tooling asserts on:
/// java path (quoted if it contains whitespace), `-Xms`/`-Xmx`, custom
/// JVM args, `-jar <path>`, then `--nogui`/`--safeMode`/custom server
/// args behind the jar.
pub trait ServerConfigExt {
    fn launch_command(&self, jar_path: &str) -> Vec<String>;
    fn command_string(&self, jar_path: &str) -> String;
}

impl ServerConfigExt for ServerConfig {
    fn launch_command(&self, jar_path: &str) -> Vec<String> {
        let mut command = Vec::new();

        if self.java_path.contains(' ') {
            command.push(format!("\"{}\"", self.java_path));
        } else {
            command.push(self.java_path.clone());
        }

        command.push(format!("-Xms{}M", self.min_memory_mb));
        command.push(format!("-Xmx{}M", self.max_memory_mb));

        command.extend(
            self.custom_jvm_args
                .split_whitespace()
                .map(str::to_owned),
        );

        command.push("-jar".to_owned());
        command.push(jar_path.to_owned());

        if self.no_gui {
            command.push("--nogui".to_owned());
        }
        if self.safe_mode {
            command.push("--safeMode".to_owned());
        }

        command.extend(
            self.custom_server_args
                .split_whitespace()
                .map(str::to_owned),
        );

        command
    }

    fn command_string(&self, jar_path: &str) -> String {
        self.launch_command(jar_path).join(" ")
    }
}

/// Strips the display quoting from the executable token before it is
/// handed to the OS. [`launch_command`](ServerConfigExt::launch_command)
/// quotes a java path containing whitespace for the benefit of tools
/// that assert on the literal command string; `Command::new` wants the
/// bare path.
pub fn unquote_executable(token: &str) -> &str {
    token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token)
}

/// Picks the runnable jar inside an install directory: `server.jar`
/// when present, otherwise the first jar found.
pub fn find_server_jar(dir: &Path) -> Option<std::path::PathBuf> {
    let canonical = dir.join("server.jar");
    if canonical.is_file() {
        return Some(canonical);
    }

    let mut jars: Vec<_> = std::fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"))
        })
        .collect();
    jars.sort();
    jars.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base_config() -> ServerConfig {
        ServerConfig {
            min_memory_mb: 1024,
            max_memory_mb: 2048,
            java_path: "java".to_owned(),
            no_gui: true,
            safe_mode: false,
            ..ServerConfig::default()
        }
    }

    #[test]
    fn exact_token_order_for_defaults() {
        let command = base_config().launch_command("server.jar");
        assert_eq!(
            command,
            vec!["java", "-Xms1024M", "-Xmx2048M", "-jar", "server.jar", "--nogui"]
        );
    }

    #[test]
    fn jvm_args_sit_between_memory_and_jar() {
        let config = ServerConfig {
            custom_jvm_args: "-XX:+UseG1GC  -XX:MaxGCPauseMillis=200".to_owned(),
            ..base_config()
        };
        assert_eq!(
            config.launch_command("server.jar"),
            vec![
                "java",
                "-Xms1024M",
                "-Xmx2048M",
                "-XX:+UseG1GC",
                "-XX:MaxGCPauseMillis=200",
                "-jar",
                "server.jar",
                "--nogui"
            ]
        );
    }

    #[test]
    fn server_args_come_after_flags() {
        let config = ServerConfig {
            safe_mode: true,
            custom_server_args: "--port 25566".to_owned(),
            ..base_config()
        };
        assert_eq!(
            config.launch_command("paper.jar"),
            vec![
                "java",
                "-Xms1024M",
                "-Xmx2048M",
                "-jar",
                "paper.jar",
                "--nogui",
                "--safeMode",
                "--port",
                "25566"
            ]
        );
    }

    #[test]
    fn java_path_with_space_is_quoted() {
        let config = ServerConfig {
            java_path: "/opt/java runtime/bin/java".to_owned(),
            ..base_config()
        };
        let command = config.launch_command("server.jar");
        assert_eq!(command[0], "\"/opt/java runtime/bin/java\"");
        assert_eq!(
            unquote_executable(&command[0]),
            "/opt/java runtime/bin/java"
        );
    }

    #[test]
    fn no_gui_disabled_omits_flag() {
        let config = ServerConfig {
            no_gui: false,
            ..base_config()
        };
        assert!(!config.launch_command("server.jar").contains(&"--nogui".to_owned()));
    }

    #[test]
    fn blank_custom_args_add_nothing() {
        let config = ServerConfig {
            custom_jvm_args: "   ".to_owned(),
            custom_server_args: String::new(),
            ..base_config()
        };
        assert_eq!(config.launch_command("server.jar").len(), 6);
    }

    #[test]
    fn command_string_joins_tokens() {
        assert_eq!(
            base_config().command_string("server.jar"),
            "java -Xms1024M -Xmx2048M -jar server.jar --nogui"
        );
    }

    #[test]
    fn finds_canonical_server_jar_first() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jar"), b"x").unwrap();
        std::fs::write(dir.path().join("server.jar"), b"x").unwrap();
        assert_eq!(
            find_server_jar(dir.path()).unwrap(),
            dir.path().join("server.jar")
        );
    }

    #[test]
    fn falls_back_to_any_jar() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("paper-1.20.1.jar"), b"x").unwrap();
        std::fs::write(dir.path().join("eula.txt"), b"eula=false").unwrap();
        assert_eq!(
            find_server_jar(dir.path()).unwrap(),
            dir.path().join("paper-1.20.1.jar")
        );
    }

    #[test]
    fn empty_dir_has_no_jar() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_server_jar(dir.path()).is_none());
    }
}
