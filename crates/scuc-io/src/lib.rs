//! # scuc-io: Unit Commitment Documents
//!
//! JSON input and output for the SCUC workspace.
//!
//! | Function | Direction | Content |
//! |----------|-----------|---------|
//! | [`read_instance`] / [`write_instance`] | in / out | instance document |
//! | [`read_factors`] / [`write_factors`] | in / out | precomputed ISF and LODF |
//! | [`SolutionExport`] | out | schedule as JSON or CSV |
//!
//! Reading an instance always validates it; the returned [`ImportResult`]
//! carries the warnings that did not prevent construction. Writing an instance
//! and reading it back yields an equal [`scuc_core::Instance`].
//!
//! ```rust,no_run
//! use std::path::Path;
//! use scuc_io::read_instance;
//!
//! fn main() -> anyhow::Result<()> {
//!     let result = read_instance(Path::new("case.json"))?;
//!     println!("{} periods, {}", result.instance.time_horizon(), result.diagnostics.summary());
//!     Ok(())
//! }
//! ```

pub mod document;
pub mod factors;
pub mod instance;
pub mod solution;

pub use document::{DocumentError, InstanceDocument, Series};
pub use factors::{read_factors, write_factors};
pub use instance::{instance_to_string, parse_instance_str, read_instance, write_instance, ImportResult};
pub use solution::SolutionExport;
