use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::MutationOutcome;
use crate::paths::{
    NATIVE_LIB, NATIVE_MANIFEST, PATH_FLATPAK_APPS, PATH_LOCAL_LIB, PATH_LOCAL_MANIFEST,
};

/// A supported sandboxed launcher.
///
/// The registry is data; the only special case is the `needs_dll_override`
/// flag. Steam ships with broad access to its own library folders, so the
/// payload DLL is already visible inside its sandbox and the extra override
/// is off for that one entry.
pub struct SandboxApp {
    pub id: &'static str,
    pub name: &'static str,
    pub needs_dll_override: bool,
}

pub static SUPPORTED_APPS: [SandboxApp; 7] = [
    SandboxApp {
        id: "com.heroicgameslauncher.hgl",
        name: "Heroic Games Launcher",
        needs_dll_override: true,
    },
    SandboxApp {
        id: "com.valvesoftware.Steam",
        name: "Steam",
        needs_dll_override: false,
    },
    SandboxApp {
        id: "net.lutris.Lutris",
        name: "Lutris",
        needs_dll_override: true,
    },
    SandboxApp {
        id: "org.prismlauncher.PrismLauncher",
        name: "Prism Launcher",
        needs_dll_override: true,
    },
    SandboxApp {
        id: "com.atlauncher.ATLauncher",
        name: "ATLauncher",
        needs_dll_override: true,
    },
    SandboxApp {
        id: "org.polymc.PolyMC",
        name: "PolyMC",
        needs_dll_override: true,
    },
    SandboxApp {
        id: "com.mojang.Minecraft",
        name: "Minecraft",
        needs_dll_override: true,
    },
];

pub fn find_app(id: &str) -> Option<&'static SandboxApp> {
    SUPPORTED_APPS.iter().find(|a| a.id == id)
}

/// The app's private Flatpak data directory.
pub fn app_data_dir(app_id: &str) -> PathBuf {
    PATH_FLATPAK_APPS.join(app_id)
}

/// Which installation method currently owns the layer artifacts.
///
/// Mutually exclusive by construction: every override target and symlink
/// target is derived from the one resolved variant, never mixed.
#[derive(Serialize, Clone, Copy, PartialEq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    NativePackage,
    LocalScript,
}

impl Provenance {
    /// Resolve from the filesystem. The native package owns the system
    /// paths and wins when both sets of artifacts are present.
    pub fn detect() -> Option<Provenance> {
        Provenance::from_presence(
            Path::new(NATIVE_LIB).is_file() && Path::new(NATIVE_MANIFEST).is_file(),
            PATH_LOCAL_LIB.is_file() && PATH_LOCAL_MANIFEST.is_file(),
        )
    }

    pub fn from_presence(native: bool, local: bool) -> Option<Provenance> {
        if native {
            Some(Provenance::NativePackage)
        } else if local {
            Some(Provenance::LocalScript)
        } else {
            None
        }
    }

    pub fn lib_path(&self) -> PathBuf {
        match self {
            Provenance::NativePackage => PathBuf::from(NATIVE_LIB),
            Provenance::LocalScript => PATH_LOCAL_LIB.clone(),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        match self {
            Provenance::NativePackage => PathBuf::from(NATIVE_MANIFEST),
            Provenance::LocalScript => PATH_LOCAL_MANIFEST.clone(),
        }
    }

    pub fn other(&self) -> Provenance {
        match self {
            Provenance::NativePackage => Provenance::LocalScript,
            Provenance::LocalScript => Provenance::NativePackage,
        }
    }
}

/// Derived presentation state: overrides and symlinks all present, none of
/// them, or something in between that the user should repair.
#[derive(Serialize, Clone, Copy, PartialEq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum ConfigState {
    NotConfigured,
    Partial,
    Configured,
}

pub fn config_state(has_fs: bool, has_env: bool, symlinks_exist: bool) -> ConfigState {
    match (has_fs, has_env, symlinks_exist) {
        (true, true, true) => ConfigState::Configured,
        (false, false, false) => ConfigState::NotConfigured,
        _ => ConfigState::Partial,
    }
}

/// Point-in-time snapshot for one app.
#[derive(Serialize, Clone, Debug)]
pub struct SandboxAppStatus {
    pub id: String,
    pub name: String,
    pub installed: bool,
    pub has_filesystem_override: bool,
    pub has_env_override: bool,
    pub symlinks_exist: bool,
    pub state: ConfigState,
}

impl SandboxAppStatus {
    pub fn not_installed(app: &SandboxApp) -> Self {
        SandboxAppStatus {
            id: app.id.to_string(),
            name: app.name.to_string(),
            installed: false,
            has_filesystem_override: false,
            has_env_override: false,
            symlinks_exist: false,
            state: ConfigState::NotConfigured,
        }
    }
}

/// Per-application outcome of a batch operation. A batch never collapses
/// into a single boolean; the caller always sees which app failed.
#[derive(Serialize, Clone, Debug)]
pub struct AppOutcome {
    pub id: String,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_files: Vec<PathBuf>,
}

impl AppOutcome {
    pub fn from_outcome(id: &str, outcome: MutationOutcome) -> Self {
        AppOutcome {
            id: id.to_string(),
            success: outcome.success,
            message: outcome.message,
            removed_files: outcome.removed_files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provenance_native_wins_when_both_present() {
        assert_eq!(
            Provenance::from_presence(true, true),
            Some(Provenance::NativePackage)
        );
        assert_eq!(
            Provenance::from_presence(false, true),
            Some(Provenance::LocalScript)
        );
        assert_eq!(Provenance::from_presence(true, false), Some(Provenance::NativePackage));
        assert_eq!(Provenance::from_presence(false, false), None);
    }

    #[test]
    fn provenance_paths_never_mix() {
        let native = Provenance::NativePackage;
        assert_eq!(native.lib_path(), PathBuf::from(NATIVE_LIB));
        assert_eq!(native.manifest_path(), PathBuf::from(NATIVE_MANIFEST));

        let local = Provenance::LocalScript;
        assert_eq!(local.lib_path(), *PATH_LOCAL_LIB);
        assert_eq!(local.manifest_path(), *PATH_LOCAL_MANIFEST);
    }

    #[test]
    fn config_state_tri_state_derivation() {
        assert_eq!(config_state(true, true, true), ConfigState::Configured);
        assert_eq!(config_state(false, false, false), ConfigState::NotConfigured);
        // Any mixed combination is repairable, not re-appliable blindly
        assert_eq!(config_state(true, false, false), ConfigState::Partial);
        assert_eq!(config_state(true, true, false), ConfigState::Partial);
        assert_eq!(config_state(false, false, true), ConfigState::Partial);
    }

    #[test]
    fn registry_flags_steam_as_the_broad_access_launcher() {
        let steam = find_app("com.valvesoftware.Steam").unwrap();
        assert!(!steam.needs_dll_override);

        let flagged = SUPPORTED_APPS.iter().filter(|a| !a.needs_dll_override).count();
        assert_eq!(flagged, 1, "exactly one registry entry skips the DLL override");
    }
}
