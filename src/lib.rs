// Prefix-bucketed partition and merge engine - the main implementation
pub mod partition;

// Line acceptance rules
pub mod classifier;

// Input directory listing
pub mod discovery;

pub mod config;
pub mod constants;
pub mod utils;

// Re-export main types for convenience
pub use config::SiftConfig;
pub use partition::{sift_directory, SiftProcessor, SiftStats};
