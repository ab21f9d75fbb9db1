//! Mathematical primitives for the PIR protocol.
//!
//! This module provides the core mathematical operations required for the
//! lattice arithmetic of both sub-protocols:
//!
//! - **Modular arithmetic** over Z_q, plus primality testing for parameter
//!   validation
//! - **Number-Theoretic Transform (NTT)** for fast negacyclic polynomial
//!   multiplication, RNS (multi-limb) aware
//! - **Polynomial operations** over R_Q = Z_Q[X]/(X^d + 1) in residue
//!   number system layout
//! - **Discrete Gaussian sampling** for error term generation
//! - **CRT composition** across RNS limbs and plaintext moduli

pub mod crt;
pub mod gaussian;
pub mod modular;
pub mod ntt;
pub mod poly;

pub use crt::{mod_inverse, CrtContext};
pub use gaussian::GaussianSampler;
pub use modular::{is_prime, ModQ};
pub use ntt::NttContext;
pub use poly::Poly;
