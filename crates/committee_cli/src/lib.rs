//! Dump and load a committee's Merkle trees independent of a running node: reads and writes leaf
//! facts through a JSON snapshot file standing in for the committee's persistent fact store.

pub mod commands;
pub mod errors;
pub mod snapshot;

pub use commands::{dump, load, TreeArgs};
pub use errors::{CliError, CliResult};
