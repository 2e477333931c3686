//! Scrapes bank-account transaction histories by driving a real browser
//! through each bank's login and pagination UI, normalizing the rows into
//! typed records.
//!
//! The pieces, leaves first: [`core`] holds the record model, [`wait`]
//! the bounded-polling primitive every component blocks through,
//! [`browser`] the capability the providers consume, and [`provider`] the
//! per-bank adapters plus the shared pagination/harvest engine.

pub mod browser;
pub mod core;
pub mod display;
mod error;
pub mod provider;
pub mod settings;
pub mod wait;

pub use error::{Error, Result};

pub static CLIENT_NAME: &str = "latigo";
