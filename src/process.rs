//! Process enumeration and launch-command profile matching.
//!
//! Associates a running game with a stored per-game profile. The process
//! table is re-read on every call; the launch record comes from the log the
//! wrapper script leaves behind.

use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::paths::PATH_LAUNCH_LOG;

#[derive(Serialize, Clone, Debug)]
pub struct ProcessInfo {
    pub pid: u32,
    pub ppid: u32,
    pub comm: String,
    pub args: String,
}

/// Fresh point-in-time snapshot of the process table.
pub fn list_processes() -> Result<Vec<ProcessInfo>> {
    let mut processes = Vec::new();

    for entry in fs::read_dir("/proc")?.flatten() {
        let name = entry.file_name();
        let Ok(pid) = name.to_string_lossy().parse::<u32>() else {
            continue;
        };
        // Processes can vanish between readdir and the reads below
        if let Some(info) = read_process(pid) {
            processes.push(info);
        }
    }

    Ok(processes)
}

fn read_process(pid: u32) -> Option<ProcessInfo> {
    let comm = fs::read_to_string(format!("/proc/{pid}/comm")).ok()?;
    let cmdline = fs::read_to_string(format!("/proc/{pid}/cmdline")).ok()?;
    let stat = fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;

    Some(ProcessInfo {
        pid,
        ppid: parse_ppid(&stat)?,
        comm: comm.trim().to_string(),
        // cmdline uses null bytes as separators
        args: cmdline.replace('\0', " ").trim().to_string(),
    })
}

/// Parse the parent pid out of `/proc/<pid>/stat`. The comm field is wrapped
/// in parentheses and may itself contain spaces or parentheses, so split
/// after the last ')'.
pub fn parse_ppid(stat: &str) -> Option<u32> {
    let after_comm = &stat[stat.rfind(')')? + 1..];
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    // fields[0] is state, fields[1] is ppid
    fields.get(1)?.parse().ok()
}

/// Keep wrapper-launched processes plus game-like ones.
pub fn filter_relevant(processes: &[ProcessInfo]) -> Vec<ProcessInfo> {
    processes
        .iter()
        .filter(|p| is_wrapper_process(p) || is_game_process(p))
        .cloned()
        .collect()
}

pub fn is_wrapper_process(process: &ProcessInfo) -> bool {
    process.args.to_lowercase().contains("lsfg") || process.args.contains("LSFG_PROCESS")
}

pub fn is_game_process(process: &ProcessInfo) -> bool {
    let lower = process.args.to_lowercase();
    [".exe", "proton", "steam"].iter().any(|m| lower.contains(m))
}

/// The most recent launch the wrapper script recorded.
#[derive(Serialize, Clone, Debug)]
pub struct LastLaunch {
    pub command: String,
    /// `None` when the command has no recognizable executable; callers fall
    /// back to the global configuration.
    pub basename: Option<String>,
}

pub fn last_launch() -> Result<Option<LastLaunch>> {
    last_launch_from(&PATH_LAUNCH_LOG)
}

pub fn last_launch_from(path: &Path) -> Result<Option<LastLaunch>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|e| Error::io_at(e, path))?;
    let Some(command) = content
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix("launch: "))
    else {
        return Ok(None);
    };

    let command = command.trim().to_string();
    let basename = parse_basename(&command).ok();
    Ok(Some(LastLaunch { command, basename }))
}

static EXE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)([^/\s"']+\.exe)\b"#).unwrap());

static LSFG_PROCESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"LSFG_PROCESS=([^\s"']+)"#).unwrap());

/// Derive the profile key from a raw launch command: the target executable's
/// basename, directories and argument tokens stripped.
///
/// A `*.exe` token anywhere in the command wins, which also handles commands
/// wrapped by loader scripts (`sh -c '... exec /path/Game.exe ...'`).
/// Otherwise the last path-like token whose final component carries an
/// extension is taken, skipping launcher and shell tokens. Parsing a
/// previous result yields the same key.
pub fn parse_basename(command: &str) -> Result<String> {
    if let Some(caps) = EXE_RE.captures(command) {
        return Ok(caps[1].to_string());
    }

    const WRAPPER_MARKS: [&str; 4] = ["steam", "proton", "reaper", "wrapper"];
    const SHELLS: [&str; 3] = ["sh", "bash", "env"];

    for token in command.split_whitespace().rev() {
        let token = token.trim_matches(|c| c == '"' || c == '\'');
        if token.is_empty() || token.starts_with('-') {
            continue;
        }

        let file = token.rsplit('/').next().unwrap_or(token);
        let lower = file.to_lowercase();
        if WRAPPER_MARKS.iter().any(|mark| lower.contains(mark)) {
            continue;
        }
        if SHELLS.contains(&lower.as_str()) {
            continue;
        }

        if file.contains('.') && !file.starts_with('-') {
            return Ok(file.to_string());
        }
    }

    Err(Error::UnparsableLaunchCommand(command.to_string()))
}

/// Match the running relevant processes against the stored profile keys.
/// Pure over the snapshot passed in; returns the first key found.
pub fn active_profile(cfg: &Config, processes: &[ProcessInfo]) -> Option<String> {
    let keys = cfg.profile_keys();
    if keys.is_empty() {
        return None;
    }

    for process in filter_relevant(processes) {
        if let Some(caps) = LSFG_PROCESS_RE.captures(&process.args) {
            let name = caps[1].to_string();
            if keys.contains(&name) {
                return Some(name);
            }
        }

        if let Ok(basename) = parse_basename(&process.args)
            && keys.contains(&basename)
        {
            return Some(basename);
        }
    }

    None
}
