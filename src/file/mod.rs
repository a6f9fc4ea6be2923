//! File management and output naming
//!
//! - [`paths`] turns book titles into safe, collision-numbered file names
//! - [`manager`] writes decrypted books into the output directory

pub mod manager;
pub mod paths;

// Re-export commonly used types
pub use manager::FileManager;
pub use paths::{output_file_name, sanitize_filename, DEFAULT_MAX_LEN};
