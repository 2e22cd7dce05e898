//! Payload DLL discovery and verification.
//!
//! Finds the Lossless Scaling DLL the layer feeds from, across every Steam
//! library the machine knows about. The search is a fixed candidate list,
//! never a whole-filesystem scan.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::paths::{PATH_HOME, PATH_STEAM};

/// Steam app id of Lossless Scaling.
pub const LOSSLESS_APPID: u32 = 993090;

pub const DLL_NAME: &str = "Lossless.dll";

const DEFAULT_APP_DIR: &str = "steamapps/common/Lossless Scaling";

#[derive(Serialize, Clone, Copy, PartialEq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum DllSource {
    SteamLibrary,
    FlatpakSteam,
    LibrarySweep,
}

#[derive(Serialize, Clone, Debug)]
pub struct DllLocation {
    pub found: bool,
    pub path: Option<PathBuf>,
    pub source: Option<DllSource>,
}

impl DllLocation {
    fn hit(path: PathBuf, source: DllSource) -> Self {
        DllLocation {
            found: true,
            path: Some(path),
            source: Some(source),
        }
    }

    fn miss() -> Self {
        DllLocation {
            found: false,
            path: None,
            source: None,
        }
    }
}

/// Stats for the shell's DLL panel. Absence is reported in-band, never as a
/// failure.
#[derive(Serialize, Clone, Debug)]
pub struct DllStats {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<DllSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Locate the payload DLL across the known Steam roots.
///
/// Candidates, in order: the default library path, every library folder
/// steamlocate reports (resolving the app's actual install dir), Flatpak
/// Steam's private data dir, and finally a depth-bounded sweep of each
/// library's common/ directory for a stray copy.
pub fn locate() -> DllLocation {
    let default = PATH_STEAM.join(DEFAULT_APP_DIR).join(DLL_NAME);
    if default.is_file() {
        return DllLocation::hit(default, DllSource::SteamLibrary);
    }

    if let Ok(steam_dir) = steamlocate::SteamDir::locate() {
        if let Ok(Some((app, library))) = steam_dir.find_app(LOSSLESS_APPID) {
            let candidate = library.resolve_app_dir(&app).join(DLL_NAME);
            if candidate.is_file() {
                return DllLocation::hit(candidate, DllSource::SteamLibrary);
            }
        }
    }

    let flatpak = PATH_HOME
        .join(".var/app/com.valvesoftware.Steam/.local/share/Steam")
        .join(DEFAULT_APP_DIR)
        .join(DLL_NAME);
    if flatpak.is_file() {
        return DllLocation::hit(flatpak, DllSource::FlatpakSteam);
    }

    for root in sweep_roots() {
        if let Some(path) = sweep_common_dir(&root) {
            return DllLocation::hit(path, DllSource::LibrarySweep);
        }
    }

    DllLocation::miss()
}

fn sweep_roots() -> Vec<PathBuf> {
    let mut roots = vec![PATH_STEAM.join("steamapps/common")];

    if let Ok(steam_dir) = steamlocate::SteamDir::locate()
        && let Ok(libraries) = steam_dir.libraries()
    {
        for library in libraries.flatten() {
            let common = library.path().join("steamapps/common");
            if !roots.contains(&common) {
                roots.push(common);
            }
        }
    }

    roots
}

/// Look for the DLL two levels below a library's common/ directory
/// (app dir, or app dir plus one subdirectory).
fn sweep_common_dir(common: &Path) -> Option<PathBuf> {
    if !common.is_dir() {
        return None;
    }

    for entry in WalkDir::new(common)
        .min_depth(2)
        .max_depth(3)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() && entry.file_name() == DLL_NAME {
            return Some(entry.path().to_path_buf());
        }
    }

    None
}

/// SHA-256 content digest of the file at `path`, as lowercase hex.
pub fn hash(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| Error::io_at(e, path))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(|e| Error::io_at(e, path))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Compose location, size and digest for the shell.
pub fn stats() -> DllStats {
    let location = locate();

    let Some(path) = location.path else {
        return DllStats {
            exists: false,
            path: None,
            source: None,
            sha256: None,
            size: None,
            error: Some(format!("{DLL_NAME} not found in any known Steam library")),
        };
    };

    let size = std::fs::metadata(&path).map(|m| m.len()).ok();
    match hash(&path) {
        Ok(digest) => DllStats {
            exists: true,
            path: Some(path),
            source: location.source,
            sha256: Some(digest),
            size,
            error: None,
        },
        Err(e) => DllStats {
            exists: true,
            path: Some(path),
            source: location.source,
            sha256: None,
            size,
            error: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn hash_matches_known_digest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();

        let digest = hash(file.path()).unwrap();
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn hash_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = hash(&dir.path().join("nope.dll")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn sweep_finds_dll_in_app_subdir() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("Lossless Scaling 2");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(app.join(DLL_NAME), b"payload").unwrap();

        let found = sweep_common_dir(dir.path()).unwrap();
        assert_eq!(found, app.join(DLL_NAME));
    }

    #[test]
    fn sweep_missing_dir_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(sweep_common_dir(&dir.path().join("absent")).is_none());
    }
}
