pub mod flatpak;
pub mod symlinks;
