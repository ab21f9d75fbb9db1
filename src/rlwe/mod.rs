//! RLWE primitives for the LinPIR sub-protocol.
//!
//! Ring-LWE over R_Q = Z_Q[X]/(X^d + 1) with Q an RNS product: secret keys,
//! ciphertexts, encryption/decryption, Galois automorphisms and gadget
//! decomposition.

mod enc;
mod gadget;
mod galois;
mod types;

pub use enc::{delta_rns, scale_plaintext};
pub use gadget::{gadget_decompose, GadgetVector};
pub use galois::{apply_automorphism, automorphism_ciphertext};
pub use types::{RlweCiphertext, RlweSecretKey};
