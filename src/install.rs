//! User-local installation of the layer.
//!
//! Probes the three artifacts the script install owns (library, Vulkan
//! implicit-layer manifest, launch wrapper script), installs them
//! atomically, and generates the wrapper script from the current
//! configuration.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Config, ScriptFields};
use crate::error::{Error, MutationOutcome, Result};
use crate::paths::{PATH_LOCAL_LIB, PATH_LOCAL_MANIFEST, PATH_SCRIPT};
use crate::util::{atomic_write, tmp_path};

/// LSFG_PROCESS value exported when per-game profiles are off, or when the
/// launched executable has no usable basename.
pub const DEFAULT_PROCESS: &str = "lsfg-default";

/// Snapshot of the user-local install. Recomputed on every call, never
/// persisted.
#[derive(Serialize, Clone, Debug)]
pub struct InstallationStatus {
    pub installed: bool,
    pub lib: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub script: Option<PathBuf>,
}

pub fn probe() -> InstallationStatus {
    probe_at(&PATH_LOCAL_LIB, &PATH_LOCAL_MANIFEST, &PATH_SCRIPT)
}

pub fn probe_at(lib: &Path, manifest: &Path, script: &Path) -> InstallationStatus {
    let present = |p: &Path| p.is_file().then(|| p.to_path_buf());

    let lib = present(lib);
    let manifest = present(manifest);
    let script = present(script);

    InstallationStatus {
        installed: lib.is_some() && manifest.is_some() && script.is_some(),
        lib,
        manifest,
        script,
    }
}

/// Install the layer from an externally-built library file.
///
/// All three artifacts are staged as `.tmp` siblings first and only then
/// renamed into place. A failure anywhere rolls back every file this call
/// created; the outcome lists what the rollback removed.
pub fn install(source_lib: &Path, cfg: &Config) -> Result<MutationOutcome> {
    install_at(
        source_lib,
        cfg,
        &PATH_LOCAL_LIB,
        &PATH_LOCAL_MANIFEST,
        &PATH_SCRIPT,
    )
}

pub fn install_at(
    source_lib: &Path,
    cfg: &Config,
    lib_dest: &Path,
    manifest_dest: &Path,
    script_dest: &Path,
) -> Result<MutationOutcome> {
    if !source_lib.is_file() {
        return Err(Error::NotFound(format!(
            "layer library not found at {}",
            source_lib.display()
        )));
    }

    let mut created: Vec<PathBuf> = Vec::new();
    match install_steps(source_lib, cfg, lib_dest, manifest_dest, script_dest, &mut created) {
        Ok(()) => {
            println!("[lsfgctl] installed layer to {}", lib_dest.display());
            Ok(MutationOutcome::ok(format!(
                "installed lsfg-vk ({}, {}, {})",
                lib_dest.display(),
                manifest_dest.display(),
                script_dest.display()
            )))
        }
        Err(e) => {
            let removed = rollback(&created);
            println!("[lsfgctl] install failed, rolled back {} file(s)", removed.len());
            Ok(MutationOutcome::failed(format!("install failed: {e}")).with_removed(removed))
        }
    }
}

fn install_steps(
    source_lib: &Path,
    cfg: &Config,
    lib_dest: &Path,
    manifest_dest: &Path,
    script_dest: &Path,
    created: &mut Vec<PathBuf>,
) -> Result<()> {
    // Stage everything before committing anything.
    for dest in [lib_dest, manifest_dest, script_dest] {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io_at(e, parent))?;
        }
    }

    let lib_tmp = tmp_path(lib_dest);
    fs::copy(source_lib, &lib_tmp).map_err(|e| Error::io_at(e, &lib_tmp))?;
    created.push(lib_tmp.clone());

    let manifest_tmp = tmp_path(manifest_dest);
    fs::write(&manifest_tmp, manifest_content(lib_dest))
        .map_err(|e| Error::io_at(e, &manifest_tmp))?;
    created.push(manifest_tmp.clone());

    let script_tmp = tmp_path(script_dest);
    fs::write(&script_tmp, script_content(cfg)).map_err(|e| Error::io_at(e, &script_tmp))?;
    set_executable(&script_tmp)?;
    created.push(script_tmp.clone());

    // Commit by renaming each staged file into place.
    for (tmp, dest) in [
        (lib_tmp, lib_dest),
        (manifest_tmp, manifest_dest),
        (script_tmp, script_dest),
    ] {
        fs::rename(&tmp, dest).map_err(|e| Error::io_at(e, dest))?;
        created.retain(|p| p != &tmp);
        created.push(dest.to_path_buf());
    }

    Ok(())
}

fn rollback(created: &[PathBuf]) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    for path in created {
        if fs::remove_file(path).is_ok() {
            removed.push(path.clone());
        }
    }
    removed
}

fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|e| Error::io_at(e, path))
}

/// Remove whichever of the three artifacts exist. Missing files are fine;
/// the outcome lists what was actually removed.
pub fn uninstall() -> MutationOutcome {
    uninstall_at(&PATH_LOCAL_LIB, &PATH_LOCAL_MANIFEST, &PATH_SCRIPT)
}

pub fn uninstall_at(lib: &Path, manifest: &Path, script: &Path) -> MutationOutcome {
    let mut removed = Vec::new();
    let mut failures = Vec::new();

    for path in [lib, manifest, script] {
        if !path.exists() {
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => removed.push(path.to_path_buf()),
            Err(e) => failures.push(format!("{}: {}", path.display(), Error::io_at(e, path))),
        }
    }

    if failures.is_empty() {
        let message = if removed.is_empty() {
            "nothing to remove".to_string()
        } else {
            format!("removed {} file(s)", removed.len())
        };
        println!("[lsfgctl] uninstall: {message}");
        MutationOutcome::ok(message).with_removed(removed)
    } else {
        MutationOutcome::failed(failures.join("; ")).with_removed(removed)
    }
}

/// Vulkan implicit-layer manifest pointing back at the installed library.
fn manifest_content(lib_path: &Path) -> String {
    let manifest = serde_json::json!({
        "file_format_version": "1.0.0",
        "layer": {
            "name": "VK_LAYER_LS_frame_generation",
            "type": "GLOBAL",
            "library_path": lib_path,
            "api_version": "1.3.296",
            "implementation_version": "1",
            "description": "Lossless Scaling frame generation",
            "disable_environment": {
                "DISABLE_LSFG": "1"
            }
        }
    });
    let mut content = serde_json::to_string_pretty(&manifest).unwrap();
    content.push('\n');
    content
}

/// Rewrite the launch wrapper script from the current configuration.
pub fn write_launch_script(cfg: &Config) -> Result<()> {
    write_launch_script_to(cfg, &PATH_SCRIPT)
}

pub fn write_launch_script_to(cfg: &Config, path: &Path) -> Result<()> {
    atomic_write(path, &script_content(cfg), 0o755)
}

/// Generate the wrapper script. The script records its invocation (for
/// profile matching later), exports the layer's process selector plus the
/// optional Proton/DXVK tweaks, then execs the real command.
pub fn script_content(cfg: &Config) -> String {
    let mut lines = vec![
        "#!/bin/bash".to_string(),
        "# lsfg-vk launch wrapper, generated by lsfgctl. Use as: ~/lsfg %command%".to_string(),
        "launch_command=\"$@\"".to_string(),
        "logger \"lsfg-vk-launch: game launch command is: $launch_command\"".to_string(),
        "mkdir -p \"$HOME/.config/lsfg-vk\"".to_string(),
        "echo \"launch: $launch_command\" >> \"$HOME/.config/lsfg-vk/launch.log\"".to_string(),
    ];

    if cfg.global.per_game_profiles {
        lines.push("game_exe=\"$(basename \"$launch_command\")\"".to_string());
        lines.push("if [[ \"$game_exe\" == *.exe ]]; then".to_string());
        lines.push("    export LSFG_PROCESS=\"$game_exe\"".to_string());
        lines.push("else".to_string());
        lines.push(format!("    export LSFG_PROCESS={DEFAULT_PROCESS}"));
        lines.push("fi".to_string());
    } else {
        lines.push(format!("export LSFG_PROCESS={DEFAULT_PROCESS}"));
    }

    if cfg.script.enable_wow64 {
        lines.push("export PROTON_USE_WOW64=1".to_string());
    }
    if cfg.script.disable_steamdeck_mode {
        lines.push("export SteamDeck=0".to_string());
    }
    if cfg.script.dxvk_frame_rate > 0 {
        lines.push(format!("export DXVK_FRAME_RATE={}", cfg.script.dxvk_frame_rate));
    }

    lines.push("exec \"$@\"".to_string());
    lines.join("\n") + "\n"
}

/// Parse the script-carried settings back out of a wrapper script.
pub fn parse_script_fields(content: &str) -> ScriptFields {
    let mut fields = ScriptFields::default();

    for line in content.lines() {
        let Some(export) = line.trim().strip_prefix("export ") else {
            continue;
        };
        let Some((key, value)) = export.split_once('=') else {
            continue;
        };

        match key.trim() {
            "DXVK_FRAME_RATE" => {
                if let Ok(rate) = value.trim().parse() {
                    fields.dxvk_frame_rate = rate;
                }
            }
            "PROTON_USE_WOW64" => fields.enable_wow64 = value.trim() == "1",
            "SteamDeck" => fields.disable_steamdeck_mode = value.trim() == "0",
            _ => {}
        }
    }

    fields
}

/// Script-carried settings from the installed wrapper, or `None` when no
/// script exists.
pub fn read_script_fields(path: &Path) -> Option<ScriptFields> {
    let content = fs::read_to_string(path).ok()?;
    Some(parse_script_fields(&content))
}
