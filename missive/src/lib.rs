//! The missive notification service: configuration, wiring and shutdown.

pub mod controller;

pub use controller::{Missive, SHUTDOWN_BROADCAST, find_config_file};
