//! File loading for stylesheets.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  File Access Flow                    │
//! ├──────────────────────────────────────────────────────┤
//! │                                                      │
//! │  reference ──► FileId::join(importer) ──► FileId     │
//! │                                              │       │
//! │                         read_source(loader, id)      │
//! │                                              │       │
//! │                    ├─► MemoryLoader (in-memory map)  │
//! │                    └─► DiskLoader (tokio::fs)        │
//! │                                                      │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Loaders never cache: every import of a file reads it again.

mod memory;
mod path;
mod read;

pub use memory::MemoryLoader;
pub use path::{normalize_path, FileId};
pub use read::{decode_utf8, read_source, DiskLoader, FileLoader};
