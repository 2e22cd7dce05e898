//! flatpak CLI plumbing.
//!
//! Every call shells out to `flatpak` with a scrubbed environment; library
//! paths inherited from a game session can break the CLI.

use std::process::Command;

use crate::error::{Error, Result};

fn flatpak_cmd() -> Command {
    let mut cmd = Command::new("flatpak");
    cmd.env_remove("LD_LIBRARY_PATH").env_remove("LD_PRELOAD");
    cmd
}

pub fn available() -> bool {
    flatpak_cmd()
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Installed application ids.
pub fn installed_apps() -> Result<Vec<String>> {
    let output = flatpak_cmd()
        .args(["list", "--app", "--columns=application"])
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Io(std::io::Error::other(format!(
            "flatpak list failed: {}",
            stderr.trim()
        ))));
    }

    Ok(parse_app_list(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `flatpak list --columns=application` output. Some flatpak versions
/// print a header line; skip it.
pub fn parse_app_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != "Application ID")
        .map(String::from)
        .collect()
}

/// The app's current user override file, or `None` when it has none.
pub fn show_overrides(app_id: &str) -> Option<String> {
    let output = flatpak_cmd()
        .args(["override", "--user", "--show", app_id])
        .output()
        .ok()?;

    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Apply override arguments to one app's user override file. A refusal by
/// the permission store is a `Permission` error.
pub fn override_app(app_id: &str, args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let output = flatpak_cmd()
        .args(["override", "--user"])
        .args(args)
        .arg(app_id)
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Permission(format!(
            "flatpak override {app_id}: {}",
            stderr.trim()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_list_skips_header_and_blank_lines() {
        let stdout = "Application ID\ncom.valvesoftware.Steam\n\nnet.lutris.Lutris\n";
        assert_eq!(
            parse_app_list(stdout),
            vec!["com.valvesoftware.Steam", "net.lutris.Lutris"]
        );
    }

    #[test]
    fn app_list_without_header() {
        assert_eq!(parse_app_list("org.polymc.PolyMC\n"), vec!["org.polymc.PolyMC"]);
        assert!(parse_app_list("").is_empty());
    }
}
