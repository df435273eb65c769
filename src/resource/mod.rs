//! Resources shared by every transform (file access).

pub mod file;
