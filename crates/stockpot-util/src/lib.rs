#![forbid(unsafe_code)]
//! Filesystem, path and process helpers for stockpot.

pub mod error;
pub mod fs;
pub mod process;
