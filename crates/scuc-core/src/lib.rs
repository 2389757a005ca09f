//! # scuc-core: Unit Commitment Instance Model
//!
//! Validated, read-only records describing one security-constrained unit
//! commitment problem: buses with load series, generators with limits and cost
//! curves, transmission lines, reserve products, contingencies and
//! price-sensitive loads over a horizon of `T` periods.
//!
//! ## Design
//!
//! - Every entity is keyed by a string newtype ID ([`BusId`], [`GenId`], ...).
//!   Cross references (generator → bus, line → bus pair, reserve → generators)
//!   are stored as IDs and resolved through the owning [`Instance`], which keeps
//!   a hash index per collection for O(1) expected lookup.
//! - Collections are stored sorted by ID. Everything downstream iterates them in
//!   that order, then by ascending period, which makes model construction
//!   reproducible.
//! - An [`Instance`] only exists after [`InstanceBuilder::build`] has validated
//!   it; there is no way to mutate it afterwards.
//!
//! ## Quick Start
//!
//! ```
//! use scuc_core::*;
//!
//! let instance = InstanceBuilder::new(2)
//!     .bus(Bus::new("b1", vec![10.0, 20.0]))
//!     .generator(
//!         Generator::new("g1", "b1", 2)
//!             .with_limits(0.0, 30.0)
//!             .with_cost_curve(CostCurve::piecewise(vec![(0.0, 0.0), (30.0, 150.0)])),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(instance.time_horizon(), 2);
//! assert!(instance.generator(&GenId::new("g1")).is_some());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod diagnostics;
pub mod error;
pub mod generator;
pub mod instance;
pub mod market;
pub mod network;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{ScucError, ScucResult};
pub use generator::{
    first_non_convex_segment, slope_decreases, CostCurve, CostPoint, Generator, InitialState,
    StartupCategory,
};
pub use instance::{Instance, InstanceBuilder, InstanceStats};
pub use market::{PriceSensitiveLoad, ReserveProduct};
pub use network::{Bus, Contingency, FlowLimit, Line};

/// Default relative tolerance when checking that marginal costs never decrease.
pub const DEFAULT_CONVEXITY_TOLERANCE: f64 = 1e-6;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[inline]
            pub fn new(value: impl Into<String>) -> Self {
                $name(value.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value)
            }
        }
    };
}

string_id!(
    /// Bus identifier
    BusId
);
string_id!(
    /// Generator identifier
    GenId
);
string_id!(
    /// Transmission line identifier
    LineId
);
string_id!(
    /// Reserve product identifier
    ReserveId
);
string_id!(
    /// Contingency identifier
    ContingencyId
);
string_id!(
    /// Price-sensitive load identifier
    LoadId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_lexicographically() {
        let mut ids = vec![GenId::new("g10"), GenId::new("g2"), GenId::new("g1")];
        ids.sort();
        let names: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(names, vec!["g1", "g10", "g2"]);
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = BusId::new("b7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"b7\"");
        let back: BusId = serde_json::from_str("\"b7\"").unwrap();
        assert_eq!(back, id);
    }
}
