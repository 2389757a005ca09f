//! DC sensitivity factors and transmission limit screening.
//!
//! ```text
//! Instance ──► SparseSusceptance (B') ──► X = B'⁻¹ ──► ISF ──► LODF
//!                                                        │
//!                     InjectionBounds ──► screen() ◄─────┘
//!                                            │
//!                                            ▼
//!                                     SecurityPair rows
//! ```

pub mod factors;
pub mod screening;
pub mod susceptance;

pub use factors::{IsfMatrix, LodfMatrix, OutageFactors, SensitivityFactors};
pub use screening::{screen, screen_exhaustive, InjectionBounds, ScreeningResult, SecurityPair};
pub use susceptance::{SparseSusceptance, SusceptanceError};
