/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Digital signatures over the curves the JOSE layer accepts for JWS.
//! ECDSA signatures use the fixed-width `r || s` encoding JWS requires
//! (IEEE P1363), not ASN.1 DER. `verify` returns `Ok(false)` for a
//! well-formed input whose signature simply does not check out, and an
//! error only when the public key itself is unusable.

use crate::error::*;
use ecdsa::signature::{Signer, Verifier};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use zeroize::Zeroizing;

/// The signature curves this backend implements. Each curve pins its
/// canonical JWS algorithm: the digest is not negotiable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Curve {
    P256,
    P384,
    P521,
    Secp256k1,
    Ed25519,
}

impl Curve {
    pub fn name(&self) -> &'static str {
        match self {
            Curve::P256 => "P-256",
            Curve::P384 => "P-384",
            Curve::P521 => "P-521",
            Curve::Secp256k1 => "secp256k1",
            Curve::Ed25519 => "Ed25519",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "P-256" => Some(Curve::P256),
            "P-384" => Some(Curve::P384),
            "P-521" => Some(Curve::P521),
            "secp256k1" => Some(Curve::Secp256k1),
            "Ed25519" => Some(Curve::Ed25519),
            _ => None,
        }
    }

    /// The JWS `alg` value signatures made with this curve carry.
    pub fn algorithm_name(&self) -> &'static str {
        match self {
            Curve::P256 => "ES256",
            Curve::P384 => "ES384",
            Curve::P521 => "ES512",
            Curve::Secp256k1 => "ES256K",
            Curve::Ed25519 => "EdDSA",
        }
    }

    pub fn scalar_len(&self) -> usize {
        match self {
            Curve::P256 | Curve::Secp256k1 | Curve::Ed25519 => 32,
            Curve::P384 => 48,
            Curve::P521 => 66,
        }
    }

    /// Whether public keys on this curve are a single raw coordinate
    /// (an RFC 8037 "OKP" key) rather than an x/y point.
    pub fn is_octet_key_pair(&self) -> bool {
        matches!(self, Curve::Ed25519)
    }

    pub fn public_key_len(&self) -> usize {
        if self.is_octet_key_pair() {
            self.scalar_len()
        } else {
            1 + 2 * self.scalar_len()
        }
    }

    pub fn generate_private_key(&self) -> Result<Zeroizing<Vec<u8>>> {
        let bytes = match self {
            Curve::P256 => p256::SecretKey::random(&mut rand_core::OsRng)
                .to_bytes()
                .to_vec(),
            Curve::P384 => p384::SecretKey::random(&mut rand_core::OsRng)
                .to_bytes()
                .to_vec(),
            Curve::P521 => p521::SecretKey::random(&mut rand_core::OsRng)
                .to_bytes()
                .to_vec(),
            Curve::Secp256k1 => k256::SecretKey::random(&mut rand_core::OsRng)
                .to_bytes()
                .to_vec(),
            Curve::Ed25519 => {
                let mut seed = [0u8; 32];
                crate::rand::fill(&mut seed)?;
                seed.to_vec()
            }
        };
        Ok(Zeroizing::new(bytes))
    }

    /// Derive the wire-form public key for a raw private key.
    pub fn compute_public_key(&self, private_key: &[u8]) -> Result<Vec<u8>> {
        if private_key.len() != self.scalar_len() {
            return Err(Error::InvalidKeyLength {
                expected: self.scalar_len(),
                got: private_key.len(),
            });
        }
        Ok(match self {
            Curve::P256 => p256::SecretKey::from_slice(private_key)
                .map_err(|_| Error::InvalidPrivateKey)?
                .public_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
            Curve::P384 => p384::SecretKey::from_slice(private_key)
                .map_err(|_| Error::InvalidPrivateKey)?
                .public_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
            Curve::P521 => p521::SecretKey::from_slice(private_key)
                .map_err(|_| Error::InvalidPrivateKey)?
                .public_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
            Curve::Secp256k1 => k256::SecretKey::from_slice(private_key)
                .map_err(|_| Error::InvalidPrivateKey)?
                .public_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
            Curve::Ed25519 => {
                let seed: [u8; 32] = private_key
                    .try_into()
                    .map_err(|_| Error::InvalidPrivateKey)?;
                ed25519_dalek::SigningKey::from_bytes(&seed)
                    .verifying_key()
                    .to_bytes()
                    .to_vec()
            }
        })
    }

    pub fn sign(&self, private_key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
        if private_key.len() != self.scalar_len() {
            return Err(Error::InvalidKeyLength {
                expected: self.scalar_len(),
                got: private_key.len(),
            });
        }
        Ok(match self {
            Curve::P256 => {
                let key = p256::ecdsa::SigningKey::from(
                    p256::SecretKey::from_slice(private_key).map_err(|_| Error::InvalidPrivateKey)?,
                );
                let signature: p256::ecdsa::Signature =
                    key.try_sign(message).map_err(|_| Error::SigningFailed)?;
                signature.to_bytes().to_vec()
            }
            Curve::P384 => {
                let key = p384::ecdsa::SigningKey::from(
                    p384::SecretKey::from_slice(private_key).map_err(|_| Error::InvalidPrivateKey)?,
                );
                let signature: p384::ecdsa::Signature =
                    key.try_sign(message).map_err(|_| Error::SigningFailed)?;
                signature.to_bytes().to_vec()
            }
            Curve::P521 => {
                let key = p521::ecdsa::SigningKey::from(ecdsa::SigningKey::<p521::NistP521>::from(
                    p521::SecretKey::from_slice(private_key).map_err(|_| Error::InvalidPrivateKey)?,
                ));
                let signature: p521::ecdsa::Signature =
                    key.try_sign(message).map_err(|_| Error::SigningFailed)?;
                signature.to_bytes().to_vec()
            }
            Curve::Secp256k1 => {
                let key = k256::ecdsa::SigningKey::from(
                    k256::SecretKey::from_slice(private_key).map_err(|_| Error::InvalidPrivateKey)?,
                );
                let signature: k256::ecdsa::Signature =
                    key.try_sign(message).map_err(|_| Error::SigningFailed)?;
                signature.to_bytes().to_vec()
            }
            Curve::Ed25519 => {
                use ed25519_dalek::Signer as _;
                let seed: [u8; 32] = private_key
                    .try_into()
                    .map_err(|_| Error::InvalidPrivateKey)?;
                ed25519_dalek::SigningKey::from_bytes(&seed)
                    .sign(message)
                    .to_bytes()
                    .to_vec()
            }
        })
    }

    pub fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool> {
        match self {
            Curve::P256 => {
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(public_key)
                    .map_err(|_| Error::InvalidPublicKey("point is not on P-256"))?;
                let Ok(signature) = p256::ecdsa::Signature::from_slice(signature) else {
                    return Ok(false);
                };
                Ok(key.verify(message, &signature).is_ok())
            }
            Curve::P384 => {
                let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(public_key)
                    .map_err(|_| Error::InvalidPublicKey("point is not on P-384"))?;
                let Ok(signature) = p384::ecdsa::Signature::from_slice(signature) else {
                    return Ok(false);
                };
                Ok(key.verify(message, &signature).is_ok())
            }
            Curve::P521 => {
                let key = p521::ecdsa::VerifyingKey::from_sec1_bytes(public_key)
                    .map_err(|_| Error::InvalidPublicKey("point is not on P-521"))?;
                let Ok(signature) = p521::ecdsa::Signature::from_slice(signature) else {
                    return Ok(false);
                };
                Ok(key.verify(message, &signature).is_ok())
            }
            Curve::Secp256k1 => {
                let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(public_key)
                    .map_err(|_| Error::InvalidPublicKey("point is not on secp256k1"))?;
                let Ok(signature) = k256::ecdsa::Signature::from_slice(signature) else {
                    return Ok(false);
                };
                Ok(key.verify(message, &signature).is_ok())
            }
            Curve::Ed25519 => {
                use ed25519_dalek::Verifier as _;
                let public: [u8; 32] = public_key
                    .try_into()
                    .map_err(|_| Error::InvalidPublicKey("Ed25519 keys are 32 bytes"))?;
                let key = ed25519_dalek::VerifyingKey::from_bytes(&public)
                    .map_err(|_| Error::InvalidPublicKey("not a valid Ed25519 point"))?;
                let Ok(signature_bytes) = <[u8; 64]>::try_from(signature) else {
                    return Ok(false);
                };
                let signature = ed25519_dalek::Signature::from_bytes(&signature_bytes);
                Ok(key.verify(message, &signature).is_ok())
            }
        }
    }
}
