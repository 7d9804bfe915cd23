//! exploders: momentum-continuation backtester for crypto market charts.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. The [`cli`] module wires them
//! into the `exploders` binary.

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
