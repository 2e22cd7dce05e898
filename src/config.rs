pub mod operations;
pub mod types;

// Re-export types
pub use types::{Config, Effective, GameProfile, Global, ScriptFields};

// Re-export operations
pub use operations::io::{load, load_from, save, save_to};
