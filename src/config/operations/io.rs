//! Configuration document I/O.
//!
//! The document lives at `~/.config/lsfg-vk/conf.toml` and is only ever
//! mutated by rewriting the whole validated document. Script-carried fields
//! are merged in from the launch wrapper on load and written back to it on
//! save.

use std::fs;
use std::path::Path;

use crate::config::types::Config;
use crate::error::{Error, Result};
use crate::install;
use crate::paths::{PATH_CONF_TOML, PATH_SCRIPT};
use crate::util::atomic_write;

pub fn load() -> Result<Config> {
    load_from(&PATH_CONF_TOML, &PATH_SCRIPT)
}

/// Parse the document at `path`, or return schema defaults when it does not
/// exist. A file that exists but does not parse is a hard error: silently
/// substituting defaults would lose the user's settings on the next save.
pub fn load_from(path: &Path, script_path: &Path) -> Result<Config> {
    let mut cfg = if path.exists() {
        let content = fs::read_to_string(path).map_err(|e| Error::io_at(e, path))?;
        toml::from_str(&content).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
    } else {
        Config::default()
    };

    if let Some(fields) = install::read_script_fields(script_path) {
        cfg.script = fields;
    }

    Ok(cfg)
}

/// Validate, then rewrite the document atomically. The wrapper script is
/// regenerated alongside when one is installed, so the script-carried fields
/// stay in sync.
pub fn save(cfg: &Config) -> Result<()> {
    save_to(cfg, &PATH_CONF_TOML)?;

    if PATH_SCRIPT.exists() {
        install::write_launch_script(cfg)?;
    }

    Ok(())
}

pub fn save_to(cfg: &Config, path: &Path) -> Result<()> {
    cfg.validate()?;

    let content = toml::to_string_pretty(cfg).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    atomic_write(path, &content, 0o644)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::GameProfile;
    use std::path::PathBuf;

    fn no_script() -> PathBuf {
        PathBuf::from("/nonexistent/lsfg")
    }

    #[test]
    fn absent_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_from(&dir.path().join("conf.toml"), &no_script()).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.toml");

        let mut cfg = Config::default();
        cfg.global.dll = "/games/Lossless Scaling/Lossless.dll".to_string();
        cfg.global.multiplier = 3;
        cfg.global.hdr_mode = true;
        cfg.set_profile(GameProfile {
            exe: "Game.exe".to_string(),
            flow_scale: Some(0.5),
            performance_mode: Some(false),
            ..Default::default()
        });

        save_to(&cfg, &path).unwrap();
        let loaded = load_from(&path, &no_script()).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn script_fields_round_trip_via_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.toml");
        let script = dir.path().join("lsfg");

        let mut cfg = Config::default();
        cfg.script.dxvk_frame_rate = 30;
        cfg.script.enable_wow64 = true;

        save_to(&cfg, &path).unwrap();
        install::write_launch_script_to(&cfg, &script).unwrap();

        let loaded = load_from(&path, &script).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.toml");
        fs::write(&path, "version = \"not a number\"").unwrap();

        let err = load_from(&path, &no_script()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.toml");
        fs::write(&path, "version = 1\n\n[global]\nturbo_mode = true\n").unwrap();

        let err = load_from(&path, &no_script()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn invalid_config_is_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.toml");

        let mut cfg = Config::default();
        cfg.global.multiplier = 9;

        assert!(save_to(&cfg, &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn partial_profile_omits_unset_fields_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.toml");

        let mut cfg = Config::default();
        cfg.set_profile(GameProfile {
            exe: "Game.exe".to_string(),
            multiplier: Some(2),
            ..Default::default()
        });
        save_to(&cfg, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let (_, game_section) = content.split_once("[[game]]").unwrap();
        assert!(game_section.contains("exe = \"Game.exe\""));
        assert!(game_section.contains("multiplier = 2"));
        assert!(
            !game_section.contains("flow_scale"),
            "unset fields must not be stored:\n{game_section}"
        );
    }
}
