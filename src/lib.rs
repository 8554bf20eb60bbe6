//! Intercooperative Network General Assembly governance
//!
//! Re-exports the workspace crates so embedders can depend on a single
//! package:
//!
//! - [`icn_core`]: storage and time utilities
//! - [`icn_config`]: assembly configuration and timing rules
//! - [`icn_governance`]: GA scheduling, slot allocation and delegate elections

pub use icn_config;
pub use icn_core;
pub use icn_governance;

pub use icn_config::{AssemblyConfig, TimingConfig};
pub use icn_governance::{AssemblyManager, GovernanceError, GovernanceResult, TallyOutcome};
