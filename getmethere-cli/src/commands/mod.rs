//! CLI subcommands.

pub mod common;
pub mod compass;
pub mod config;
pub mod geodesy;
pub mod locate;
pub mod map;
