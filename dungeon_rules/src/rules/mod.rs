//! Combat rules: to-hit, damage and mitigation.
//!
//! These are pure functions. They own no state, and all randomness comes in
//! through the `rng` argument, so the same inputs and stream always give the
//! same outcome.

mod attack;
mod damage;

pub use attack::*;
pub use damage::*;
