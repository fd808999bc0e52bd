use crate::Result;
use crate::BackupError;
use crate::transport::Bridge;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

#[derive(Clone, Debug)]
pub struct AdbConfig {
    /// Path to the adb executable
    pub program: PathBuf,
    /// Device serial, passed as `-s`
    pub serial: Option<String>,
}

pub struct AdbBridge {
    config: AdbConfig,
}

impl AdbBridge {
    pub fn new(config: AdbConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.program);
        if let Some(serial) = &self.config.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd
    }

    fn spawn(&self, args: &[&str]) -> Result<Output> {
        debug!("adb {}", args.join(" "));
        let mut cmd = self.command();
        cmd.args(args);
        cmd.output().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                BackupError::BridgeUnavailable(format!(
                    "'{}' not found, is adb installed and in PATH?",
                    self.config.program.display()
                ))
            } else {
                BackupError::Io(e)
            }
        })
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = self.spawn(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackupError::RemoteCommand(format!(
                "'adb {}' exited with {}. Output: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }

    fn shell(&self, command: &str) -> Result<String> {
        let out = self.run(&["shell", command])?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

impl Bridge for AdbBridge {
    fn check(&self) -> Result<()> {
        let output = self.spawn(&["get-state"])?;
        let state = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() && state == "device" {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let reason = if !stderr.is_empty() {
            stderr
        } else if !state.is_empty() {
            format!("device state is '{}'", state)
        } else {
            "no device connected".to_string()
        };
        Err(BackupError::BridgeUnavailable(reason))
    }

    fn list_directories(&self, path: &str) -> Result<Vec<String>> {
        let cmd = format!(
            "find '{}' -mindepth 1 -maxdepth 1 -type d 2>/dev/null",
            escape_posix_literal(path)
        );
        Ok(parse_directory_listing(path, &self.shell(&cmd)?))
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        // Older devices fold stderr into stdout and always exit 0.
        let quoted = format!("'{}'", escape_posix_literal(path));
        self.run(&["exec-out", "cat", &quoted, "2>/dev/null"])
    }

    fn stat_access_time(&self, path: &str) -> Result<i64> {
        let cmd = format!("stat -c %X '{}' 2>/dev/null", escape_posix_literal(path));
        let out = self.shell(&cmd)?;
        parse_access_time(&out)
            .ok_or_else(|| BackupError::RemoteCommand(format!("Unexpected stat output for {}: {:?}", path, out.trim())))
    }

    fn pull_dir(&self, remote: &str, local: &Path) -> Result<()> {
        let local_str = local.to_string_lossy();
        self.run(&["pull", remote, &local_str])?;
        Ok(())
    }
}

/// Names of the children of `parent` printed one per line by `find`.
/// Lines outside `parent` (error text on old adb) are dropped.
fn parse_directory_listing(parent: &str, output: &str) -> Vec<String> {
    let prefix = format!("{}/", parent.trim_end_matches('/'));
    output
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| line.strip_prefix(&prefix))
        .map(|name| name.trim_end_matches('/'))
        .filter(|name| !name.is_empty() && !name.contains('/'))
        .map(str::to_string)
        .collect()
}

fn parse_access_time(output: &str) -> Option<i64> {
    output.trim().parse().ok()
}

fn escape_posix_literal(value: &str) -> String {
    value.replace('\'', "'\\''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directory_listing() {
        let out = "/sdcard/worlds/abc\r\n/sdcard/worlds/def\n\n/sdcard/worlds/with space/\n";
        assert_eq!(parse_directory_listing("/sdcard/worlds", out), vec!["abc", "def", "with space"]);
        assert_eq!(parse_directory_listing("/sdcard/worlds/", out), vec!["abc", "def", "with space"]);
        assert!(parse_directory_listing("/sdcard/worlds", "").is_empty());
    }

    #[test]
    fn test_parse_directory_listing_ignores_error_text() {
        let out = "find: '/sdcard/games/com.mojang/minecraftWorlds': No such file or directory\n";
        assert!(parse_directory_listing("/sdcard/games/com.mojang/minecraftWorlds", out).is_empty());

        let mixed = "find: '/sdcard/worlds/locked': Permission denied\n/sdcard/worlds/abc\n/sdcard/other/x\n";
        assert_eq!(parse_directory_listing("/sdcard/worlds", mixed), vec!["abc"]);
    }

    #[test]
    fn test_parse_access_time() {
        assert_eq!(parse_access_time("1700000000\n"), Some(1_700_000_000));
        assert_eq!(parse_access_time("stat: permission denied"), None);
        assert_eq!(parse_access_time(""), None);
    }

    #[test]
    fn test_escape_posix_literal() {
        assert_eq!(escape_posix_literal("it's"), "it'\\''s");
        assert_eq!(escape_posix_literal("plain"), "plain");
    }

    #[test]
    fn test_missing_program_is_bridge_unavailable() {
        let bridge = AdbBridge::new(AdbConfig {
            program: PathBuf::from("/nonexistent/mcbackup-test-adb"),
            serial: None,
        });
        assert!(matches!(bridge.check(), Err(BackupError::BridgeUnavailable(_))));
    }
}
