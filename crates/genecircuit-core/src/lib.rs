// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Core Pipeline
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Circuit assembly, regulation resolution and the end-to-end
//! simulation pipeline.
//!
//! # Invariants
//!
//! 1. **The default registry is never mutated**: each request resolves
//!    its own effective registry, so concurrent requests with different
//!    overrides cannot observe each other.
//!
//! 2. **Every finalized part sits in exactly one block**: blocks are
//!    closed only at explicit gaps, sorted by `sequence_index`, and never
//!    merged or split afterwards.
//!
//! 3. **Every simulated protein has a regulatory input**: a CDS that no
//!    regulator reaches gets one synthesized constitutive record.
//!
//! 4. **`simulate` does not fail**: structural, regulatory and numerical
//!    problems become result warnings; empty input yields an explicit
//!    nothing-to-simulate status.

pub mod assembler;
pub mod pipeline;
pub mod regulation;

pub use assembler::{assemble, AssemblyReport};
pub use pipeline::{simulate, simulate_batch, CircuitSimulator, SimulationRequest};
pub use regulation::{resolve, RegulationReport};
