use std::env;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Filename of the frame-generation layer library.
pub const LIB_NAME: &str = "liblsfg-vk.so";

/// Filename of the Vulkan implicit-layer manifest.
pub const MANIFEST_NAME: &str = "VkLayer_LS_frame_generation.json";

/// Paths owned by the native package install.
pub const NATIVE_LIB: &str = "/usr/lib/liblsfg-vk.so";
pub const NATIVE_MANIFEST: &str = "/etc/vulkan/implicit_layer.d/VkLayer_LS_frame_generation.json";

pub static PATH_HOME: LazyLock<PathBuf> =
    LazyLock::new(|| PathBuf::from(env::var("HOME").unwrap()));

pub static PATH_LOCAL_SHARE: LazyLock<PathBuf> = LazyLock::new(|| PATH_HOME.join(".local/share"));

/// User configuration directory read by the layer itself.
pub static PATH_CONFIG_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg_config_home).join("lsfg-vk");
    }
    PATH_HOME.join(".config/lsfg-vk")
});

pub static PATH_CONF_TOML: LazyLock<PathBuf> =
    LazyLock::new(|| PATH_CONFIG_DIR.join("conf.toml"));

/// Launch record appended to by the wrapper script, read back for
/// per-game profile matching.
pub static PATH_LAUNCH_LOG: LazyLock<PathBuf> =
    LazyLock::new(|| PATH_CONFIG_DIR.join("launch.log"));

/// User-local install locations (the script-install provenance).
pub static PATH_LOCAL_LIB: LazyLock<PathBuf> =
    LazyLock::new(|| PATH_HOME.join(".local/lib").join(LIB_NAME));

pub static PATH_LOCAL_MANIFEST: LazyLock<PathBuf> = LazyLock::new(|| {
    PATH_LOCAL_SHARE
        .join("vulkan/implicit_layer.d")
        .join(MANIFEST_NAME)
});

/// Launch wrapper script installed into the user's home directory so it can
/// be used as a Steam launch option (`~/lsfg %command%`).
pub static PATH_SCRIPT: LazyLock<PathBuf> = LazyLock::new(|| PATH_HOME.join("lsfg"));

/// Per-application Flatpak data directories live under here.
pub static PATH_FLATPAK_APPS: LazyLock<PathBuf> =
    LazyLock::new(|| PATH_HOME.join(".var/app"));

pub static PATH_STEAM: LazyLock<PathBuf> = LazyLock::new(|| {
    // Check for native Steam installation first
    if PATH_LOCAL_SHARE.join("Steam").exists() {
        PATH_LOCAL_SHARE.join("Steam")
    } else if PATH_HOME.join(".steam/steam").exists() {
        // Follow the symlink at ~/.steam/steam
        PATH_HOME.join(".steam/steam")
    } else if PATH_HOME
        .join(".var/app/com.valvesoftware.Steam/.local/share/Steam")
        .exists()
    {
        // Flatpak Steam
        PATH_HOME.join(".var/app/com.valvesoftware.Steam/.local/share/Steam")
    } else {
        PATH_LOCAL_SHARE.join("Steam")
    }
});
