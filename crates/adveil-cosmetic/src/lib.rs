//! adveil cosmetic filtering
//!
//! Hides advertising UI that survives network-level blocking by injecting
//! hide-rules (CSS plus a small script guard) into rendered page contexts.
//! Injection is idempotent per context and degrades softly: a destroyed
//! or unavailable context never produces an error for the host.

mod filter;

pub use filter::{CosmeticFilter, CosmeticInjectionResult, InjectionContext, InjectionFailure};
