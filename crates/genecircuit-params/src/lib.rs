// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Parameters
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Part registry, dial ranges and three-tier parameter overrides.

pub mod overrides;
pub mod ranges;
pub mod registry;

pub use overrides::{
    entry_address, parse_instance_key, resolve_parameters, EffectiveRegistry, GlobalMultiplier,
    InstanceKey, OverrideRequest,
};
pub use ranges::{dial_range, DialRange};
pub use registry::{PartRegistry, RegistryEntry};
