//! Key switching.
//!
//! Rotation keys for the LinPIR evaluation are key-switching matrices from
//! τ_g(s) to s; applying an automorphism and then [`key_switch`] realizes a
//! slot rotation under the original key.

mod setup;
mod switch;

pub use setup::{generate_automorphism_ks_matrix, generate_ks_matrix, KeySwitchingMatrix};
pub use switch::key_switch;
