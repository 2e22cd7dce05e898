//! Pure override-set computation and `flatpak override --show` parsing.

use std::path::{Path, PathBuf};

use super::types::Provenance;
use crate::paths::{
    LIB_NAME, NATIVE_LIB, NATIVE_MANIFEST, PATH_CONFIG_DIR, PATH_LOCAL_LIB, PATH_LOCAL_MANIFEST,
};

/// Environment variable pointing the layer at the host config file from
/// inside the sandbox.
pub const CONFIG_ENV: &str = "LSFG_CONFIG";

/// The three path grants every supported app receives: the user config
/// directory plus the active provenance's library and manifest.
pub fn override_targets(prov: Provenance) -> [PathBuf; 3] {
    [
        PATH_CONFIG_DIR.clone(),
        prov.lib_path(),
        prov.manifest_path(),
    ]
}

/// `flatpak override` arguments granting the read-only path set and the
/// config environment variable. `dll_dir` is the extra grant for apps that
/// cannot otherwise see the payload DLL.
pub fn grant_args(targets: &[PathBuf], dll_dir: Option<&Path>, conf_path: &Path) -> Vec<String> {
    let mut args: Vec<String> = targets
        .iter()
        .map(|t| format!("--filesystem={}:ro", t.display()))
        .collect();

    if let Some(dir) = dll_dir {
        args.push(format!("--filesystem={}:ro", dir.display()));
    }

    args.push(format!("--env={}={}", CONFIG_ENV, conf_path.display()));
    args
}

/// Arguments revoking the grants of the provenance that is *not* active,
/// so re-applying after an install-method switch converges instead of
/// accumulating stale grants.
pub fn stale_revoke_args(active: Provenance) -> Vec<String> {
    let other = active.other();
    [other.lib_path(), other.manifest_path()]
        .iter()
        .map(|p| format!("--nofilesystem={}", p.display()))
        .collect()
}

/// Arguments revoking everything `apply` could ever have granted, for
/// either provenance. Used by `remove`, which must work even when no
/// provenance is currently detectable.
pub fn remove_revoke_args(dll_dir: Option<&Path>) -> Vec<String> {
    let mut paths = vec![
        PATH_CONFIG_DIR.clone(),
        PathBuf::from(NATIVE_LIB),
        PathBuf::from(NATIVE_MANIFEST),
        PATH_LOCAL_LIB.clone(),
        PATH_LOCAL_MANIFEST.clone(),
    ];
    if let Some(dir) = dll_dir {
        paths.push(dir.to_path_buf());
    }

    let mut args: Vec<String> = paths
        .iter()
        .map(|p| format!("--nofilesystem={}", p.display()))
        .collect();
    args.push(format!("--unset-env={CONFIG_ENV}"));
    args
}

/// Whether `--show` output carries the full filesystem grant set. The
/// markers match both provenances' target paths.
///
/// Only positive read-only entries in the `[Context]` filesystems list
/// count. Revoking with `--nofilesystem` leaves a negated `!<path>` entry
/// behind that still contains the path text, so a bare substring match
/// would keep reporting a removed app as configured.
pub fn filesystem_override_present(show: &str) -> bool {
    let grants = filesystem_grants(show);
    [".config/lsfg-vk", LIB_NAME, "vulkan/implicit_layer.d"]
        .iter()
        .all(|marker| {
            grants
                .iter()
                .any(|grant| grant.contains(marker) && grant.ends_with(":ro"))
        })
}

/// Positive entries of the `[Context]` `filesystems=` list. `!`-prefixed
/// entries record a revocation, not a grant.
fn filesystem_grants(show: &str) -> Vec<String> {
    let mut in_context = false;

    for line in show.lines() {
        let line = line.trim();
        if line.starts_with('[') && line.ends_with(']') {
            in_context = line == "[Context]";
            continue;
        }
        if in_context && let Some(list) = line.strip_prefix("filesystems=") {
            return list
                .split(';')
                .map(str::trim)
                .filter(|entry| !entry.is_empty() && !entry.starts_with('!'))
                .map(String::from)
                .collect();
        }
    }

    Vec::new()
}

/// Whether the `[Environment]` section actually assigns the config
/// variable. `--unset-env` is recorded as `unset-environment=LSFG_CONFIG`
/// under `[Context]`, which also contains the variable name, so only a
/// real `LSFG_CONFIG=<value>` line counts.
pub fn env_override_present(show: &str) -> bool {
    let prefix = format!("{CONFIG_ENV}=");
    let mut in_environment = false;

    for line in show.lines() {
        let line = line.trim();
        if line.starts_with('[') && line.ends_with(']') {
            in_environment = line == "[Environment]";
            continue;
        }
        if in_environment
            && let Some(value) = line.strip_prefix(prefix.as_str())
            && !value.is_empty()
        {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_args_include_dll_dir_only_when_given() {
        let targets = override_targets(Provenance::NativePackage);
        let conf = PathBuf::from("/home/deck/.config/lsfg-vk/conf.toml");

        let without = grant_args(&targets, None, &conf);
        assert_eq!(without.len(), 4);
        assert!(without.iter().all(|a| !a.contains("Lossless Scaling")));

        let dll_dir = PathBuf::from("/games/Lossless Scaling");
        let with = grant_args(&targets, Some(&dll_dir), &conf);
        assert_eq!(with.len(), 5);
        assert!(with.contains(&"--filesystem=/games/Lossless Scaling:ro".to_string()));
    }

    #[test]
    fn grant_args_are_read_only_and_set_config_env() {
        let targets = override_targets(Provenance::LocalScript);
        let conf = PathBuf::from("/home/deck/.config/lsfg-vk/conf.toml");
        let args = grant_args(&targets, None, &conf);

        assert!(args.iter().filter(|a| a.starts_with("--filesystem=")).all(|a| a.ends_with(":ro")));
        assert_eq!(
            args.last().unwrap(),
            "--env=LSFG_CONFIG=/home/deck/.config/lsfg-vk/conf.toml"
        );
    }

    #[test]
    fn stale_revoke_targets_the_inactive_provenance() {
        let args = stale_revoke_args(Provenance::LocalScript);
        assert!(args.contains(&format!("--nofilesystem={NATIVE_LIB}")));
        assert!(args.contains(&format!("--nofilesystem={NATIVE_MANIFEST}")));

        let args = stale_revoke_args(Provenance::NativePackage);
        assert!(args.iter().any(|a| a.contains(".local/lib")));
    }

    #[test]
    fn remove_revoke_covers_both_provenances_and_the_env() {
        let args = remove_revoke_args(None);
        assert!(args.contains(&format!("--nofilesystem={NATIVE_LIB}")));
        assert!(args.iter().any(|a| a.contains(".local/lib")));
        assert_eq!(args.last().unwrap(), "--unset-env=LSFG_CONFIG");
    }

    #[test]
    fn show_output_parsing_requires_all_markers() {
        let full = "\
[Context]
filesystems=/home/deck/.config/lsfg-vk:ro;/usr/lib/liblsfg-vk.so:ro;/etc/vulkan/implicit_layer.d/VkLayer_LS_frame_generation.json:ro;

[Environment]
LSFG_CONFIG=/home/deck/.config/lsfg-vk/conf.toml
";
        assert!(filesystem_override_present(full));
        assert!(env_override_present(full));

        let partial = "[Context]\nfilesystems=/home/deck/.config/lsfg-vk:ro;\n";
        assert!(!filesystem_override_present(partial));
        assert!(!env_override_present(partial));
        assert!(!filesystem_override_present(""));
    }

    #[test]
    fn show_output_parsing_accepts_local_provenance_paths() {
        let local = "\
[Context]
filesystems=/home/deck/.config/lsfg-vk:ro;/home/deck/.local/lib/liblsfg-vk.so:ro;/home/deck/.local/share/vulkan/implicit_layer.d/VkLayer_LS_frame_generation.json:ro;
";
        assert!(filesystem_override_present(local));
    }

    #[test]
    fn post_remove_show_output_reports_nothing_configured() {
        // What --show prints after remove(): every grant revoked to a
        // negated entry, the env var recorded only as an unset.
        let show = "\
[Context]
filesystems=!/home/deck/.config/lsfg-vk;!/usr/lib/liblsfg-vk.so;!/etc/vulkan/implicit_layer.d/VkLayer_LS_frame_generation.json;!/home/deck/.local/lib/liblsfg-vk.so;!/home/deck/.local/share/vulkan/implicit_layer.d/VkLayer_LS_frame_generation.json;
unset-environment=LSFG_CONFIG;
";
        assert!(!filesystem_override_present(show));
        assert!(!env_override_present(show));
    }

    #[test]
    fn mixed_entries_count_only_positive_grants() {
        // After a provenance switch: fresh grants for the local paths,
        // revocation records left for the native ones.
        let show = "\
[Context]
filesystems=/home/deck/.config/lsfg-vk:ro;/home/deck/.local/lib/liblsfg-vk.so:ro;/home/deck/.local/share/vulkan/implicit_layer.d/VkLayer_LS_frame_generation.json:ro;!/usr/lib/liblsfg-vk.so;!/etc/vulkan/implicit_layer.d/VkLayer_LS_frame_generation.json;

[Environment]
LSFG_CONFIG=/home/deck/.config/lsfg-vk/conf.toml
";
        assert!(filesystem_override_present(show));
        assert!(env_override_present(show));
    }

    #[test]
    fn writable_grants_do_not_satisfy_the_read_only_set() {
        let show = "\
[Context]
filesystems=/home/deck/.config/lsfg-vk;/usr/lib/liblsfg-vk.so;/etc/vulkan/implicit_layer.d/VkLayer_LS_frame_generation.json;
";
        assert!(!filesystem_override_present(show));
    }

    #[test]
    fn env_mention_outside_environment_section_is_not_a_grant() {
        assert!(!env_override_present("[Context]\nunset-environment=LSFG_CONFIG;\n"));
        assert!(!env_override_present("[Environment]\nLSFG_CONFIG=\n"));
        assert!(!env_override_present("LSFG_CONFIG=/somewhere/conf.toml\n"));
    }

    #[test]
    fn apply_then_remove_round_trips_through_show_parsing() {
        // Feed the real arg builders through the override-file format
        // flatpak persists them in, then read the result back with the
        // same predicates status() uses.
        let conf = PathBuf::from("/home/deck/.config/lsfg-vk/conf.toml");
        let dll_dir = PathBuf::from("/games/Lossless Scaling");

        for prov in [Provenance::NativePackage, Provenance::LocalScript] {
            let granted = grant_args(&override_targets(prov), Some(&dll_dir), &conf);
            let fs_entries: Vec<&str> = granted
                .iter()
                .filter_map(|a| a.strip_prefix("--filesystem="))
                .collect();
            let env_line = granted.last().unwrap().strip_prefix("--env=").unwrap();

            let applied = format!(
                "[Context]\nfilesystems={};\n\n[Environment]\n{}\n",
                fs_entries.join(";"),
                env_line
            );
            assert!(filesystem_override_present(&applied));
            assert!(env_override_present(&applied));

            let negated: Vec<String> = remove_revoke_args(Some(&dll_dir))
                .iter()
                .filter_map(|a| a.strip_prefix("--nofilesystem="))
                .map(|p| format!("!{p}"))
                .collect();

            let removed = format!(
                "[Context]\nfilesystems={};\nunset-environment={CONFIG_ENV};\n",
                negated.join(";")
            );
            assert!(!filesystem_override_present(&removed));
            assert!(!env_override_present(&removed));
        }
    }
}
