//! Infrastructure layer - external I/O adapters
//!
//! This module contains all code that touches storage:
//! - Manifest backends (filesystem, in-memory)
//! - Cross-process lock files

pub mod backend;
pub mod lock;

// Re-export commonly used types
pub use backend::{FsBackend, ManifestBackend, ManifestLocation, MemoryBackend};
pub use lock::FileLock;
