//! Unit commitment model construction.
//!
//! A single deterministic pass over the instance emits a solver-neutral
//! [`Model`]. Entities are visited in instance order (ascending ID) and, within
//! an entity, by ascending period, so identical inputs give identical models.
//!
//! ```text
//! precheck ──► commitment ──► startup costs ──► production ──► reserves
//!                                                                  │
//!        transmission limits ◄── bus balance ◄── ramping ◄─────────┘
//! ```

mod index;
mod network;
pub mod precheck;
mod ramping;
mod reserves;
mod units;

use scuc_core::{Instance, ScucResult};
use scuc_solver_common::Model;
use tracing::info;

use crate::config::ScucConfig;
use crate::cost::CostTable;
use crate::sensitivity::{screen, InjectionBounds, ScreeningResult, SensitivityFactors};

pub use index::{Decision, UnitColumns, VarIndex};

/// Mutable state threaded through the construction steps.
pub(crate) struct BuildContext<'a> {
    pub instance: &'a Instance,
    pub costs: &'a CostTable,
    /// Fixed commitment per generator and period
    pub fixed: &'a [Vec<Option<bool>>],
    pub model: Model,
    pub index: VarIndex,
}

/// Built model plus everything needed to interpret its solution.
#[derive(Debug, Clone)]
pub struct UcModel {
    pub model: Model,
    pub index: VarIndex,
    pub costs: CostTable,
    /// Raw factors; `None` without transmission lines
    pub factors: Option<SensitivityFactors>,
    pub screening: ScreeningResult,
}

pub struct ModelBuilder<'a> {
    instance: &'a Instance,
    config: &'a ScucConfig,
    factors: Option<SensitivityFactors>,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(instance: &'a Instance, config: &'a ScucConfig) -> Self {
        Self {
            instance,
            config,
            factors: None,
        }
    }

    /// Use precomputed factors instead of deriving them from the topology.
    pub fn with_factors(mut self, factors: SensitivityFactors) -> Self {
        self.factors = Some(factors);
        self
    }

    pub fn build(&self) -> ScucResult<UcModel> {
        self.config.validate()?;
        let instance = self.instance;
        let formulation = &self.config.formulation;

        let fixed = precheck::check_instance(instance)?;
        let costs = CostTable::build(instance, formulation)?;

        let factors = if instance.lines().is_empty() {
            None
        } else {
            match &self.factors {
                Some(factors) => Some(SensitivityFactors::from_precomputed(
                    instance,
                    factors.isf.clone(),
                    factors.lodf.clone(),
                )?),
                None => Some(SensitivityFactors::compute(instance, &self.config.parallel)?),
            }
        };
        let screening = match &factors {
            Some(factors) => {
                let bounds = InjectionBounds::from_instance(instance);
                screen(instance, factors, &bounds, formulation)
            }
            None => ScreeningResult::default(),
        };

        let mut ctx = BuildContext {
            instance,
            costs: &costs,
            fixed: &fixed,
            model: Model::new("scuc"),
            index: VarIndex::default(),
        };
        units::add_commitment(&mut ctx);
        units::add_startup_costs(&mut ctx);
        units::add_production(&mut ctx);
        reserves::add_reserves(&mut ctx);
        ramping::add_ramping(&mut ctx);
        network::add_balance(&mut ctx);
        if let Some(factors) = &factors {
            let sparse = factors.sparsified(formulation.isf_cutoff, formulation.lodf_cutoff);
            network::add_transmission(&mut ctx, &sparse, &screening);
        }

        let BuildContext { model, index, .. } = ctx;
        let stats = model.stats();
        info!(
            variables = stats.variables,
            binaries = stats.binaries,
            constraints = stats.constraints,
            nonzeros = stats.nonzeros,
            "built unit commitment model"
        );
        Ok(UcModel {
            model,
            index,
            costs,
            factors,
            screening,
        })
    }
}
