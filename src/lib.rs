#![warn(clippy::pedantic, clippy::nursery)]
pub mod cli;
pub mod core;
pub mod error;
pub mod logging;
pub mod vis;


pub use crate::error::{Error, Result};
