//! Command implementations that sit behind the CLI surface.

pub mod setup;
