//! Shared plumbing for the missive workspace: logging, audit events and
//! recipient address handling.

pub mod address;
pub mod audit;
pub mod logging;

pub use tracing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
}
