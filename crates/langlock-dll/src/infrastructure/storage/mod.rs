//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module reads the optional TOML file that tunes logging
//! and the set of detection channels.  Nothing is ever written back; the
//! locked layout itself is deliberately not persisted across restarts.

pub mod config;
