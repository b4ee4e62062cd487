//! # swisscut-engine
//!
//! Runs the progression of a tournament against a persistent [`Store`](store::Store): Swiss
//! round generation, top cut seeding, bracket advancement, result recording and drops.
//!
//! The algorithms live in `swisscut_core`; this crate loads the records, applies them and
//! writes the outcome back.
pub mod config;
pub mod engine;
pub mod logger;
pub mod store;

pub use config::Config;
pub use engine::{Engine, SwissRound};

use store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Tournament(#[from] swisscut_core::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
