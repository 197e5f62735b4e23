//! squill CLI building blocks.
//!
//! The binary in `main.rs` is a thin driver over these modules; keeping
//! them in a library crate makes them testable in isolation.

pub mod cli;
pub mod input;
pub mod output;
pub mod reporter;
pub mod worker;
