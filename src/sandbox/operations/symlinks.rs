//! Symlink farm inside each app's private data directory.
//!
//! Flatpak points the sandbox's XDG dirs at `~/.var/app/<id>/`, so links
//! placed there appear to the app at its normal library/config locations.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths::{LIB_NAME, MANIFEST_NAME};

#[derive(Clone, Debug)]
pub struct LinkPlan {
    pub link: PathBuf,
    pub target: PathBuf,
}

/// Sandbox-visible locations the loader and the layer expect, in the same
/// order as the targets handed to [`plan_links`].
pub fn link_paths(app_dir: &Path) -> [PathBuf; 3] {
    [
        app_dir.join("lib").join(LIB_NAME),
        app_dir.join("config/vulkan/implicit_layer.d").join(MANIFEST_NAME),
        app_dir.join("config/lsfg-vk/conf.toml"),
    ]
}

/// Map the farm's link locations to the real artifacts of the active
/// provenance plus the shared config document.
pub fn plan_links(
    app_dir: &Path,
    lib_target: &Path,
    manifest_target: &Path,
    conf_target: &Path,
) -> Vec<LinkPlan> {
    let [lib_link, manifest_link, conf_link] = link_paths(app_dir);

    vec![
        LinkPlan {
            link: lib_link,
            target: lib_target.to_path_buf(),
        },
        LinkPlan {
            link: manifest_link,
            target: manifest_target.to_path_buf(),
        },
        LinkPlan {
            link: conf_link,
            target: conf_target.to_path_buf(),
        },
    ]
}

/// Create every planned link. Stale links (wrong target, or dangling) are
/// replaced, so re-applying converges instead of erroring.
pub fn create_links(plans: &[LinkPlan]) -> Result<()> {
    for plan in plans {
        if let Some(parent) = plan.link.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io_at(e, parent))?;
        }

        if plan.link.exists() || plan.link.is_symlink() {
            fs::remove_file(&plan.link).map_err(|e| Error::io_at(e, &plan.link))?;
        }

        symlink(&plan.target, &plan.link).map_err(|e| Error::io_at(e, &plan.link))?;
        println!(
            "[lsfgctl] {} -> {}",
            plan.link.display(),
            plan.target.display()
        );
    }

    Ok(())
}

/// True when every link is present and resolves to an existing target.
pub fn links_exist(plans: &[LinkPlan]) -> bool {
    plans.iter().all(|p| p.link.exists())
}

/// Delete only paths that are actually symlinks. Regular files reachable
/// through the farm are user data and stay untouched.
pub fn remove_links(links: &[PathBuf]) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    for link in links {
        if link.is_symlink() && fs::remove_file(link).is_ok() {
            removed.push(link.clone());
        }
    }
    removed
}
