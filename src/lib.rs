//! Hintless two-phase Private Information Retrieval.
//!
//! A client fetches one record from a server-held database without
//! revealing which index was requested. The online phase is matrix-based
//! PIR over plain LWE (SimplePIR); the classic per-database hint download
//! is replaced by a homomorphic prepare phase (LinPIR) in which the server
//! evaluates (hint matrix) × (encrypted secret) under RLWE and returns the
//! product `w = H·s` in compact encrypted form.
//!
//! Key components:
//! - SimplePIR online queries: `u = A·s + e + Δ·e_col`, answered by `D·u`
//! - LinPIR prepare phase: diagonal-packed hint plaintexts, gadget-digit
//!   secret ciphertexts, and a single-rotation-key rotate-and-accumulate
//! - Two equivalent recovery paths: prepare-then-skip, or a direct query
//!   with the LinPIR exchange embedded in the same round trip

pub mod client;
pub mod database;
pub mod error;
pub mod ks;
pub mod linpir;
pub mod lwe;
pub mod math;
pub mod messages;
pub mod params;
pub mod rlwe;
pub mod server;

pub use client::{Client, LweSecretState};
pub use database::{Database, HintMatrix};
pub use error::{Error, Result};
pub use messages::{PrepareRequest, PrepareResponse, Request, Response, WireMessage};
pub use params::{Parameters, PrngType, RlweParameters};
pub use server::{PublicParams, Server};
