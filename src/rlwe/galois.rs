//! Galois automorphisms for RLWE
//!
//! Galois automorphisms τ_g: R → R are ring automorphisms defined by
//! τ_g(X) = X^g for g ∈ Z_{2d}^*.
//!
//! Applying τ_g to a ciphertext leaves it encrypted under τ_g(s); a
//! key-switch with a rotation key brings it back under s.

use crate::math::Poly;

use super::types::RlweCiphertext;

/// Apply Galois automorphism τ_g to a polynomial
///
/// τ_g(p(X)) = p(X^g) mod (X^d + 1)
///
/// For X^d + 1, we have X^d = -1, so X^i maps to X^(g·i mod 2d) with a sign
/// flip when the reduced exponent crosses d.
///
/// # Arguments
/// * `poly` - Input polynomial in coefficient domain
/// * `g` - Galois element (must be odd, so it is coprime to 2d)
pub fn apply_automorphism(poly: &Poly, g: usize) -> Poly {
    assert!(!poly.is_ntt(), "automorphism requires coefficient domain");
    assert!(g % 2 == 1, "Galois element must be odd");

    let d = poly.dimension();
    let two_d = 2 * d;
    let moduli = poly.moduli().to_vec();

    let mut result = Poly::zero(d, &moduli);

    for (l, &q) in moduli.iter().enumerate() {
        let src = poly.limb(l);
        let dst = result.limb_mut(l);

        for i in 0..d {
            let coeff = src[i];
            if coeff == 0 {
                continue;
            }

            let new_idx = (g * i) % two_d;
            if new_idx < d {
                dst[new_idx] = coeff;
            } else {
                // X^(d+k) = -X^k in the ring X^d + 1
                dst[new_idx - d] = q - coeff;
            }
        }
    }

    result
}

/// Apply automorphism to an RLWE ciphertext: τ_g((a, b)) = (τ_g(a), τ_g(b)).
///
/// The result is encrypted under τ_g(s); key-switching is required to get a
/// valid ciphertext under the original key.
pub fn automorphism_ciphertext(ct: &RlweCiphertext, g: usize) -> RlweCiphertext {
    RlweCiphertext {
        a: apply_automorphism(&ct.a, g),
        b: apply_automorphism(&ct.b, g),
    }
}
