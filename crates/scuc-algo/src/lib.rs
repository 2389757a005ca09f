//! # scuc-algo: Security-Constrained Unit Commitment
//!
//! Turns a validated [`scuc_core::Instance`] into a mixed-integer model, solves
//! it through a [`scuc_solver_common::MilpSolver`] and maps the answer back
//! onto generators, buses and lines.
//!
//! ```text
//! Instance ──► CostTable ───────────────┐
//!    │                                  ▼
//!    └──► SensitivityFactors ──► screen ──► ModelBuilder ──► Model
//!                                                              │
//!                         SolveOutcome ◄── extract ◄── MilpSolver
//! ```
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Cost linearization | [`cost`] | convex piecewise segments per unit and period |
//! | Sensitivity factors | [`sensitivity`] | ISF, LODF, screened security pairs |
//! | Model construction | [`builder`] | solver-neutral [`scuc_solver_common::Model`] |
//! | Backend | [`backend`] | `good_lp` translation (microlp, HiGHS) |
//! | Extraction | [`schedule`] | [`Schedule`] or [`SolveFailure`] |
//!
//! ## Example
//!
//! ```
//! use scuc_algo::{pipeline, ScucConfig};
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
//! let config = ScucConfig::default();
//! let solver = pipeline::solver_for(&config).unwrap();
//! let outcome = pipeline::solve(&instance, &config, &solver).unwrap();
//! let schedule = outcome.schedule().unwrap();
//! assert!((schedule.objective - 150.0).abs() < 1e-4);
//! ```

pub mod backend;
pub mod builder;
pub mod config;
pub mod cost;
pub mod pipeline;
pub mod schedule;
pub mod sensitivity;

pub use backend::GoodLpSolver;
pub use builder::{ModelBuilder, UcModel};
pub use config::{
    FormulationConfig, ParallelConfig, ScucConfig, SolverBackend, SolverConfig, ToleranceConfig,
};
pub use cost::{linearize, CostSegment, CostTable, Linearization};
pub use schedule::{
    extract, BusPeriod, ClassReport, CostBreakdown, LineFlow, ReserveShortfall, Schedule,
    ScheduleEntry, ServedLoad, SolveFailure, SolveOutcome, ToleranceViolation,
};
pub use sensitivity::{
    screen, screen_exhaustive, InjectionBounds, IsfMatrix, LodfMatrix, ScreeningResult,
    SecurityPair, SensitivityFactors,
};
