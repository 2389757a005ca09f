//! Buses, transmission lines and outage definitions.

use crate::{BusId, ContingencyId, LineId};

/// Network node carrying a fixed load series.
#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    pub id: BusId,
    /// Per-period fixed demand (MW); may be negative for net-injecting buses
    pub load: Vec<f64>,
    /// Angle reference for the DC power flow
    pub is_reference: bool,
    /// Nominal voltage, informational only
    pub base_kv: Option<f64>,
}

impl Bus {
    pub fn new(id: impl Into<BusId>, load: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            load,
            is_reference: false,
            base_kv: None,
        }
    }

    pub fn with_reference(mut self, is_reference: bool) -> Self {
        self.is_reference = is_reference;
        self
    }

    pub fn with_base_kv(mut self, base_kv: f64) -> Self {
        self.base_kv = Some(base_kv);
        self
    }
}

/// Directional thermal limit series.
///
/// `forward` caps flow from the source bus towards the target bus, `reverse`
/// caps the opposite direction. `f64::INFINITY` entries mean unlimited.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowLimit {
    pub forward: Vec<f64>,
    pub reverse: Vec<f64>,
}

impl FlowLimit {
    pub fn symmetric(limit: Vec<f64>) -> Self {
        Self {
            reverse: limit.clone(),
            forward: limit,
        }
    }

    pub fn unlimited(periods: usize) -> Self {
        Self::symmetric(vec![f64::INFINITY; periods])
    }

    pub fn is_symmetric(&self) -> bool {
        self.forward == self.reverse
    }

    pub fn is_unlimited(&self, t: usize) -> bool {
        self.forward[t].is_infinite() && self.reverse[t].is_infinite()
    }
}

/// Transmission element between two buses.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub id: LineId,
    pub source: BusId,
    pub target: BusId,
    pub reactance: f64,
    /// Series susceptance used by the DC power flow (1/reactance unless given)
    pub susceptance: f64,
    pub normal_limit: FlowLimit,
    /// Post-contingency limit
    pub emergency_limit: FlowLimit,
    /// Overflow price ($/MW); `None` makes the limits hard
    pub flow_penalty: Option<f64>,
}

impl Line {
    /// Unlimited line; the susceptance defaults to `1 / reactance`.
    pub fn new(
        id: impl Into<LineId>,
        source: impl Into<BusId>,
        target: impl Into<BusId>,
        reactance: f64,
        periods: usize,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            reactance,
            susceptance: 1.0 / reactance,
            normal_limit: FlowLimit::unlimited(periods),
            emergency_limit: FlowLimit::unlimited(periods),
            flow_penalty: Some(5000.0),
        }
    }

    /// Same normal and emergency limit in both directions for every period.
    pub fn with_limit(mut self, limit: f64) -> Self {
        let periods = self.normal_limit.forward.len();
        self.normal_limit = FlowLimit::symmetric(vec![limit; periods]);
        self.emergency_limit = self.normal_limit.clone();
        self
    }

    pub fn with_limits(mut self, normal: FlowLimit, emergency: FlowLimit) -> Self {
        self.normal_limit = normal;
        self.emergency_limit = emergency;
        self
    }

    pub fn with_susceptance(mut self, susceptance: f64) -> Self {
        self.susceptance = susceptance;
        self
    }

    pub fn with_flow_penalty(mut self, penalty: Option<f64>) -> Self {
        self.flow_penalty = penalty;
        self
    }
}

/// Simultaneous outage of one or more lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Contingency {
    pub id: ContingencyId,
    pub lines: Vec<LineId>,
}

impl Contingency {
    pub fn new(id: impl Into<ContingencyId>, lines: Vec<LineId>) -> Self {
        Self {
            id: id.into(),
            lines,
        }
    }

    /// Single-line outage named after the line.
    pub fn single(line: impl Into<LineId>) -> Self {
        let line = line.into();
        Self {
            id: ContingencyId::new(line.as_str()),
            lines: vec![line],
        }
    }
}
