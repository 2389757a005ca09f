pub mod cli;

pub use cli::{BuildArgs, Cli, Commands, ModelArgs, SolveArgs};
