//! Protocol messages.
//!
//! The four messages exchanged between client and server, as immutable
//! serde value objects with exact byte-size introspection for bandwidth
//! accounting.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ks::KeySwitchingMatrix;
use crate::rlwe::RlweCiphertext;

/// Wire encoding for protocol messages: bincode round-trip plus exact byte
/// size (`byte_size(m) == to_bytes(m).len()`).
pub trait WireMessage: Serialize + DeserializeOwned + Sized {
    /// Serialize to bytes.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Exact size of the wire encoding in bytes.
    fn byte_size(&self) -> Result<u64> {
        Ok(bincode::serialized_size(self)?)
    }
}

/// Digit ciphertexts of one LinPIR branch: encryptions of
/// `encode(z^i · s mod t)` for each gadget digit `i`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchRequest {
    /// One RLWE ciphertext per plaintext gadget digit.
    pub digit_cts: Vec<RlweCiphertext>,
}

/// Prepare-phase request: the client's encrypted LWE secret plus the
/// rotation key the homomorphic evaluation needs. The rotation key is
/// shared by all branches (they run over the same ring modulus).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrepareRequest {
    /// Key-switching matrix for the slot-rotation automorphism, rows in
    /// NTT domain.
    pub rotation_key: KeySwitchingMatrix,
    /// Per-branch digit ciphertexts.
    pub branches: Vec<BranchRequest>,
}

/// Ciphertexts of one LinPIR branch of the prepare response, ordered
/// `[shard-major, limb-minor]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchResponse {
    /// `num_shards * num_hint_limbs` RLWE ciphertexts; slot `r` of
    /// ciphertext `(sh, l)` encrypts row `r` of `H_sh` limb `l` times `s`,
    /// modulo the branch plaintext modulus.
    pub shard_limb_cts: Vec<RlweCiphertext>,
}

/// Prepare-phase response: RLWE ciphertexts encoding `H·s`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrepareResponse {
    /// Per-branch result ciphertexts.
    pub branches: Vec<BranchResponse>,
}

/// Online request: the LWE query vector `u` of length `db_cols`, plus, on
/// the direct (non-prepared) path, an embedded prepare request serviced in
/// the same round trip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Masked one-hot query vector, entries modulo the LWE modulus.
    pub query: Vec<u64>,
    /// Present only on the direct path.
    pub linpir: Option<PrepareRequest>,
}

/// Online response: `D·u` over the LWE modulus, plus the serviced LinPIR
/// response when the request embedded one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// `D·u`, one entry per database row.
    pub du: Vec<u64>,
    /// Present only on the direct path.
    pub linpir: Option<PrepareResponse>,
}

impl WireMessage for PrepareRequest {}
impl WireMessage for PrepareResponse {}
impl WireMessage for Request {}
impl WireMessage for Response {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_roundtrip_and_size() {
        let msg = Request {
            query: (0..64u64).collect(),
            linpir: None,
        };

        let bytes = msg.to_bytes().unwrap();
        assert_eq!(msg.byte_size().unwrap(), bytes.len() as u64);

        let back = Request::from_bytes(&bytes).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_response_roundtrip_and_size() {
        let msg = Response {
            du: vec![1, 2, 3, u64::MAX >> 32],
            linpir: None,
        };

        let bytes = msg.to_bytes().unwrap();
        assert_eq!(msg.byte_size().unwrap(), bytes.len() as u64);
        assert_eq!(Response::from_bytes(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_malformed_bytes_rejected() {
        let msg = Request {
            query: vec![1, 2, 3],
            linpir: None,
        };
        let mut bytes = msg.to_bytes().unwrap();
        bytes.truncate(bytes.len() - 1);
        assert!(Request::from_bytes(&bytes).is_err());
    }
}
