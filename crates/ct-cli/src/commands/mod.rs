//! CLI subcommand implementations.

pub mod dump;
pub mod estimate;
pub mod plan;
pub mod times;
mod util;

pub use util::open_input;
