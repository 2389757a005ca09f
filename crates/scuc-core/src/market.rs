//! Reserve products and price-sensitive demand.

use crate::{BusId, GenId, LoadId, ReserveId};

/// Spinning reserve requirement.
///
/// Eligibility: the explicit `eligible` list when non-empty, otherwise every
/// generator located at one of the `zone` buses, otherwise every generator.
#[derive(Debug, Clone, PartialEq)]
pub struct ReserveProduct {
    pub id: ReserveId,
    /// Per-period requirement (MW)
    pub requirement: Vec<f64>,
    pub eligible: Vec<GenId>,
    pub zone: Vec<BusId>,
    /// Price of each unserved MW ($/MW)
    pub shortfall_penalty: f64,
}

impl ReserveProduct {
    pub fn new(id: impl Into<ReserveId>, requirement: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            requirement,
            eligible: Vec::new(),
            zone: Vec::new(),
            shortfall_penalty: 1000.0,
        }
    }

    pub fn with_eligible(mut self, eligible: Vec<GenId>) -> Self {
        self.eligible = eligible;
        self
    }

    pub fn with_zone(mut self, zone: Vec<BusId>) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_shortfall_penalty(mut self, penalty: f64) -> Self {
        self.shortfall_penalty = penalty;
        self
    }
}

/// Flexible demand served only when its revenue covers the energy price.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSensitiveLoad {
    pub id: LoadId,
    pub bus: BusId,
    /// Maximum servable demand per period (MW)
    pub demand: Vec<f64>,
    /// Revenue per served MW ($/MW)
    pub revenue: Vec<f64>,
}

impl PriceSensitiveLoad {
    pub fn new(
        id: impl Into<LoadId>,
        bus: impl Into<BusId>,
        demand: Vec<f64>,
        revenue: Vec<f64>,
    ) -> Self {
        Self {
            id: id.into(),
            bus: bus.into(),
            demand,
            revenue,
        }
    }
}
