//! Services: the file sync engine, the embedded terminal and the process
//! plumbing around them (logging, clocks).

pub mod file_sync;
pub mod log_dirs;
pub mod terminal;
pub mod time_source;
pub mod tracing_setup;
