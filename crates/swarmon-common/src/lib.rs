//! Domain types shared by the swarmon crates.

pub mod types;
