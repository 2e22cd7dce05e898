use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Accepted values for the experimental present-mode override.
pub const PRESENT_MODES: [&str; 3] = ["fifo", "mailbox", "immediate"];

/// Accepted values for the layer's log level.
pub const LOG_LEVELS: [&str; 3] = ["quiet", "info", "debug"];

pub const MULTIPLIER_MIN: u32 = 1;
pub const MULTIPLIER_MAX: u32 = 4;
pub const FLOW_SCALE_MIN: f32 = 0.25;
pub const FLOW_SCALE_MAX: f32 = 1.0;

/// Global layer settings, the `[global]` table of conf.toml.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct Global {
    /// Where the Lossless Scaling DLL is stored. Empty until detected or set.
    #[serde(default)]
    pub dll: String,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
    #[serde(default = "default_flow_scale")]
    pub flow_scale: f32,
    #[serde(default = "default_true")]
    pub performance_mode: bool,
    #[serde(default)]
    pub hdr_mode: bool,
    #[serde(default = "default_present_mode")]
    pub experimental_present_mode: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// When false, every game resolves to the global values and per-game
    /// entries are kept but dormant.
    #[serde(default)]
    pub per_game_profiles: bool,
}

fn default_multiplier() -> u32 {
    1
}

fn default_flow_scale() -> f32 {
    0.8
}

fn default_true() -> bool {
    true
}

fn default_present_mode() -> String {
    "fifo".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Global {
    fn default() -> Self {
        Global {
            dll: String::new(),
            multiplier: default_multiplier(),
            flow_scale: default_flow_scale(),
            performance_mode: true,
            hdr_mode: false,
            experimental_present_mode: default_present_mode(),
            log_level: default_log_level(),
            per_game_profiles: false,
        }
    }
}

/// A per-game override entry, one `[[game]]` table. Unset fields inherit the
/// global value.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct GameProfile {
    /// Profile key: the executable basename from the launch command.
    pub exe: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hdr_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimental_present_mode: Option<String>,
}

/// Settings carried by the launch wrapper script as environment exports
/// rather than the TOML document. Merged back in on load.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct ScriptFields {
    /// Base framerate cap for DXVK games, applied before the multiplier.
    /// 0 means uncapped.
    pub dxvk_frame_rate: u32,
    pub enable_wow64: bool,
    pub disable_steamdeck_mode: bool,
}

/// The whole configuration document plus the script-carried fields.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub global: Global,
    #[serde(default, rename = "game", skip_serializing_if = "Vec::is_empty")]
    pub games: Vec<GameProfile>,
    #[serde(skip)]
    pub script: ScriptFields,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version: 1,
            global: Global::default(),
            games: Vec::new(),
            script: ScriptFields::default(),
        }
    }
}

/// Fully resolved settings for one game: every field has a value.
#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct Effective {
    pub dll: String,
    pub multiplier: u32,
    pub flow_scale: f32,
    pub performance_mode: bool,
    pub hdr_mode: bool,
    pub experimental_present_mode: String,
}

impl Config {
    pub fn profile(&self, key: &str) -> Option<&GameProfile> {
        self.games.iter().find(|g| g.exe == key)
    }

    /// Insert or replace the profile with the same key.
    pub fn set_profile(&mut self, profile: GameProfile) {
        if let Some(existing) = self.games.iter_mut().find(|g| g.exe == profile.exe) {
            *existing = profile;
        } else {
            self.games.push(profile);
        }
    }

    /// Returns true when a profile was actually removed.
    pub fn remove_profile(&mut self, key: &str) -> bool {
        let before = self.games.len();
        self.games.retain(|g| g.exe != key);
        self.games.len() != before
    }

    pub fn profile_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.games.iter().map(|g| g.exe.clone()).collect();
        keys.sort();
        keys
    }

    /// Merge the global settings with the profile stored under `key`.
    ///
    /// Total: an unknown key, or a profile with every field unset, resolves
    /// to the global values exactly.
    pub fn resolve(&self, key: &str) -> Effective {
        let profile = self.profile(key);

        Effective {
            dll: self.global.dll.clone(),
            multiplier: profile
                .and_then(|p| p.multiplier)
                .unwrap_or(self.global.multiplier),
            flow_scale: profile
                .and_then(|p| p.flow_scale)
                .unwrap_or(self.global.flow_scale),
            performance_mode: profile
                .and_then(|p| p.performance_mode)
                .unwrap_or(self.global.performance_mode),
            hdr_mode: profile.and_then(|p| p.hdr_mode).unwrap_or(self.global.hdr_mode),
            experimental_present_mode: profile
                .and_then(|p| p.experimental_present_mode.clone())
                .unwrap_or_else(|| self.global.experimental_present_mode.clone()),
        }
    }

    /// Validate every field against the schema before anything is written.
    pub fn validate(&self) -> Result<()> {
        check_multiplier(self.global.multiplier, "global")?;
        check_flow_scale(self.global.flow_scale, "global")?;
        check_present_mode(&self.global.experimental_present_mode, "global")?;

        if !LOG_LEVELS.contains(&self.global.log_level.as_str()) {
            return Err(Error::InvalidConfig(format!(
                "log_level must be one of {LOG_LEVELS:?}, got {:?}",
                self.global.log_level
            )));
        }

        let mut seen = Vec::new();
        for game in &self.games {
            if game.exe.is_empty() {
                return Err(Error::InvalidConfig(
                    "game profile with empty exe key".to_string(),
                ));
            }
            if seen.contains(&game.exe.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate game profile key {:?}",
                    game.exe
                )));
            }
            seen.push(game.exe.as_str());

            if let Some(m) = game.multiplier {
                check_multiplier(m, &game.exe)?;
            }
            if let Some(f) = game.flow_scale {
                check_flow_scale(f, &game.exe)?;
            }
            if let Some(ref mode) = game.experimental_present_mode {
                check_present_mode(mode, &game.exe)?;
            }
        }

        Ok(())
    }
}

fn check_multiplier(value: u32, scope: &str) -> Result<()> {
    if !(MULTIPLIER_MIN..=MULTIPLIER_MAX).contains(&value) {
        return Err(Error::InvalidConfig(format!(
            "{scope}: multiplier must be {MULTIPLIER_MIN}..={MULTIPLIER_MAX}, got {value}"
        )));
    }
    Ok(())
}

fn check_flow_scale(value: f32, scope: &str) -> Result<()> {
    if !(FLOW_SCALE_MIN..=FLOW_SCALE_MAX).contains(&value) {
        return Err(Error::InvalidConfig(format!(
            "{scope}: flow_scale must be {FLOW_SCALE_MIN}..={FLOW_SCALE_MAX}, got {value}"
        )));
    }
    Ok(())
}

fn check_present_mode(value: &str, scope: &str) -> Result<()> {
    if !PRESENT_MODES.contains(&value) {
        return Err(Error::InvalidConfig(format!(
            "{scope}: experimental_present_mode must be one of {PRESENT_MODES:?}, got {value:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── resolve ──

    #[test]
    fn resolve_unknown_key_equals_global() {
        let cfg = Config::default();
        let eff = cfg.resolve("Nothing.exe");

        assert_eq!(eff.multiplier, cfg.global.multiplier);
        assert_eq!(eff.flow_scale, cfg.global.flow_scale);
        assert_eq!(eff.performance_mode, cfg.global.performance_mode);
        assert_eq!(eff.hdr_mode, cfg.global.hdr_mode);
        assert_eq!(
            eff.experimental_present_mode,
            cfg.global.experimental_present_mode
        );
    }

    #[test]
    fn resolve_all_unset_override_equals_global() {
        let mut cfg = Config::default();
        cfg.set_profile(GameProfile {
            exe: "Game.exe".to_string(),
            ..Default::default()
        });

        assert_eq!(cfg.resolve("Game.exe"), cfg.resolve("Other.exe"));
    }

    #[test]
    fn resolve_set_fields_win_over_global() {
        let mut cfg = Config::default();
        cfg.set_profile(GameProfile {
            exe: "Game.exe".to_string(),
            multiplier: Some(3),
            hdr_mode: Some(true),
            ..Default::default()
        });

        let eff = cfg.resolve("Game.exe");
        assert_eq!(eff.multiplier, 3);
        assert!(eff.hdr_mode);
        // Unset fields still come from global
        assert_eq!(eff.flow_scale, cfg.global.flow_scale);
    }

    // ── profiles ──

    #[test]
    fn set_profile_replaces_existing_key() {
        let mut cfg = Config::default();
        cfg.set_profile(GameProfile {
            exe: "Game.exe".to_string(),
            multiplier: Some(2),
            ..Default::default()
        });
        cfg.set_profile(GameProfile {
            exe: "Game.exe".to_string(),
            multiplier: Some(4),
            ..Default::default()
        });

        assert_eq!(cfg.games.len(), 1);
        assert_eq!(cfg.profile("Game.exe").unwrap().multiplier, Some(4));
    }

    #[test]
    fn profile_keys_are_sorted() {
        let mut cfg = Config::default();
        for exe in ["b.exe", "a.exe", "c.exe"] {
            cfg.set_profile(GameProfile {
                exe: exe.to_string(),
                ..Default::default()
            });
        }
        assert_eq!(cfg.profile_keys(), vec!["a.exe", "b.exe", "c.exe"]);
    }

    #[test]
    fn remove_profile_reports_whether_removed() {
        let mut cfg = Config::default();
        cfg.set_profile(GameProfile {
            exe: "Game.exe".to_string(),
            ..Default::default()
        });

        assert!(cfg.remove_profile("Game.exe"));
        assert!(!cfg.remove_profile("Game.exe"));
    }

    // ── validate ──

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn multiplier_out_of_range_rejected() {
        let mut cfg = Config::default();
        cfg.global.multiplier = 5;
        assert!(matches!(
            cfg.validate(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn profile_flow_scale_out_of_range_rejected() {
        let mut cfg = Config::default();
        cfg.set_profile(GameProfile {
            exe: "Game.exe".to_string(),
            flow_scale: Some(1.5),
            ..Default::default()
        });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_present_mode_rejected() {
        let mut cfg = Config::default();
        cfg.global.experimental_present_mode = "vsync".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn duplicate_profile_keys_rejected() {
        let mut cfg = Config::default();
        cfg.games.push(GameProfile {
            exe: "Game.exe".to_string(),
            ..Default::default()
        });
        cfg.games.push(GameProfile {
            exe: "Game.exe".to_string(),
            ..Default::default()
        });
        assert!(cfg.validate().is_err());
    }
}
