//! Core data model: text buffers, directory listings and the filesystem seam.

pub mod buffer;
pub mod filesystem;
pub mod listing;
