//! Low-level primitives and utilities
//!
//! This module contains content fingerprinting and the cleanup applied to
//! raw shell output before it reaches the transcript.

pub mod fingerprint;
pub mod stream_filter;
