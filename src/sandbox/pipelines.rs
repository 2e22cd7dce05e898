//! Reconciliation pipelines: status, apply, remove, and their batch forms.

use std::path::{Path, PathBuf};

use super::operations::{flatpak, symlinks};
use super::pure;
use super::types::{AppOutcome, Provenance, SUPPORTED_APPS, SandboxApp, SandboxAppStatus, app_data_dir, config_state};
use crate::error::{Error, MutationOutcome, Result};
use crate::paths::PATH_CONF_TOML;
use crate::{config, dll};

fn is_installed(app: &SandboxApp) -> Result<bool> {
    Ok(flatpak::installed_apps()?.iter().any(|id| id == app.id))
}

/// Parent directory of the payload DLL: the configured path when one is
/// set, otherwise whatever discovery turns up.
fn dll_parent_dir() -> Option<PathBuf> {
    if let Ok(cfg) = config::load()
        && !cfg.global.dll.is_empty()
    {
        let path = PathBuf::from(&cfg.global.dll);
        if let Some(parent) = path.parent() {
            return Some(parent.to_path_buf());
        }
    }

    dll::locate()
        .path
        .and_then(|p| p.parent().map(Path::to_path_buf))
}

/// Snapshot one app's sandbox state, re-derived from the permission store
/// and the filesystem on every call.
pub fn status(app: &SandboxApp) -> SandboxAppStatus {
    if !flatpak::available() || !is_installed(app).unwrap_or(false) {
        return SandboxAppStatus::not_installed(app);
    }

    let show = flatpak::show_overrides(app.id).unwrap_or_default();
    let has_fs = pure::filesystem_override_present(&show);
    let has_env = pure::env_override_present(&show);

    let symlinks_exist = match Provenance::detect() {
        Some(prov) => {
            let plans = symlinks::plan_links(
                &app_data_dir(app.id),
                &prov.lib_path(),
                &prov.manifest_path(),
                &PATH_CONF_TOML,
            );
            symlinks::links_exist(&plans)
        }
        None => false,
    };

    SandboxAppStatus {
        id: app.id.to_string(),
        name: app.name.to_string(),
        installed: true,
        has_filesystem_override: has_fs,
        has_env_override: has_env,
        symlinks_exist,
        state: config_state(has_fs, has_env, symlinks_exist),
    }
}

pub fn status_all() -> Vec<SandboxAppStatus> {
    SUPPORTED_APPS.iter().map(status).collect()
}

/// Configure one app: grant overrides and converge the symlink farm.
///
/// Stale grants from the inactive provenance are revoked first, so applying
/// after an install-method switch converges to a clean state. Re-applying
/// is idempotent.
pub fn apply(app: &SandboxApp) -> Result<MutationOutcome> {
    if !flatpak::available() {
        return Err(Error::NotFound(
            "flatpak is not available on this system".to_string(),
        ));
    }

    if !is_installed(app)? {
        return Ok(MutationOutcome::ok(format!(
            "{} is not installed; nothing to do",
            app.name
        )));
    }

    let prov = Provenance::detect().ok_or(Error::NoProvenance)?;

    flatpak::override_app(app.id, &pure::stale_revoke_args(prov))?;

    let dll_dir = if app.needs_dll_override {
        let dir = dll_parent_dir();
        if dir.is_none() {
            println!(
                "[lsfgctl] payload DLL not found; skipping DLL directory override for {}",
                app.id
            );
        }
        dir
    } else {
        None
    };

    let args = pure::grant_args(
        &pure::override_targets(prov),
        dll_dir.as_deref(),
        &PATH_CONF_TOML,
    );
    flatpak::override_app(app.id, &args)?;

    let plans = symlinks::plan_links(
        &app_data_dir(app.id),
        &prov.lib_path(),
        &prov.manifest_path(),
        &PATH_CONF_TOML,
    );
    symlinks::create_links(&plans)?;

    println!("[lsfgctl] configured {} for lsfg-vk", app.name);
    Ok(MutationOutcome::ok(format!(
        "configured {} for lsfg-vk",
        app.name
    )))
}

/// Undo everything `apply` sets up: revoke the grants of either provenance
/// and delete the farm's symlinks. User data reachable through those paths
/// is never touched.
pub fn remove(app: &SandboxApp) -> Result<MutationOutcome> {
    if !flatpak::available() {
        return Err(Error::NotFound(
            "flatpak is not available on this system".to_string(),
        ));
    }

    if !is_installed(app)? {
        return Ok(MutationOutcome::ok(format!(
            "{} is not installed; nothing to do",
            app.name
        )));
    }

    flatpak::override_app(app.id, &pure::remove_revoke_args(dll_parent_dir().as_deref()))?;

    let removed = symlinks::remove_links(&symlinks::link_paths(&app_data_dir(app.id)));

    println!("[lsfgctl] removed lsfg-vk configuration from {}", app.name);
    Ok(MutationOutcome::ok(format!(
        "removed lsfg-vk configuration from {}",
        app.name
    ))
    .with_removed(removed))
}

/// Apply across the whole registry. One app failing never aborts the rest;
/// the caller gets one outcome per app.
pub fn apply_all() -> Vec<AppOutcome> {
    SUPPORTED_APPS
        .iter()
        .map(|app| collect(app.id, apply(app)))
        .collect()
}

pub fn remove_all() -> Vec<AppOutcome> {
    SUPPORTED_APPS
        .iter()
        .map(|app| collect(app.id, remove(app)))
        .collect()
}

fn collect(id: &str, result: Result<MutationOutcome>) -> AppOutcome {
    match result {
        Ok(outcome) => AppOutcome::from_outcome(id, outcome),
        Err(e) => {
            println!("[lsfgctl] {id}: {e}");
            AppOutcome {
                id: id.to_string(),
                success: false,
                message: e.to_string(),
                removed_files: Vec::new(),
            }
        }
    }
}
