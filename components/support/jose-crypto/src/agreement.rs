/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Elliptic-curve Diffie-Hellman key agreement over the curves the JOSE
//! layer accepts for ECDH-ES. Public keys travel as uncompressed SEC1
//! points (see SECG SEC1 section 2.3.3) for the NIST curves and as the
//! raw u-coordinate for X25519; private keys are the raw scalar bytes.

use crate::error::*;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use zeroize::Zeroizing;

/// The key-agreement curves this backend implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Curve {
    P256,
    P384,
    P521,
    X25519,
}

impl Curve {
    pub fn name(&self) -> &'static str {
        match self {
            Curve::P256 => "P-256",
            Curve::P384 => "P-384",
            Curve::P521 => "P-521",
            Curve::X25519 => "X25519",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "P-256" => Some(Curve::P256),
            "P-384" => Some(Curve::P384),
            "P-521" => Some(Curve::P521),
            "X25519" => Some(Curve::X25519),
            _ => None,
        }
    }

    /// The byte length of a private scalar, which equals the byte length
    /// of a public coordinate on all supported curves.
    pub fn scalar_len(&self) -> usize {
        match self {
            Curve::P256 | Curve::X25519 => 32,
            Curve::P384 => 48,
            Curve::P521 => 66,
        }
    }

    /// Whether public keys on this curve are a single raw coordinate
    /// (an RFC 8037 "OKP" key) rather than an x/y point.
    pub fn is_octet_key_pair(&self) -> bool {
        matches!(self, Curve::X25519)
    }

    /// The byte length of the public key wire form: `0x04 || x || y` for
    /// the NIST curves, the raw u-coordinate for X25519.
    pub fn public_key_len(&self) -> usize {
        if self.is_octet_key_pair() {
            self.scalar_len()
        } else {
            1 + 2 * self.scalar_len()
        }
    }
}

/// A private agreement key. The scalar bytes are wiped on drop.
pub struct PrivateKey {
    curve: Curve,
    bytes: Zeroizing<Vec<u8>>,
}

/// A public agreement key, in wire form.
#[derive(Clone, Debug)]
pub struct PublicKey {
    curve: Curve,
    bytes: Vec<u8>,
}

/// A peer public key that has not yet been checked to be on the curve.
/// Validation happens inside [PrivateKey::agree].
pub struct UnparsedPublicKey<'a> {
    curve: Curve,
    bytes: &'a [u8],
}

impl<'a> UnparsedPublicKey<'a> {
    pub fn new(curve: Curve, bytes: &'a [u8]) -> Self {
        Self { curve, bytes }
    }
}

/// The raw output of the Diffie-Hellman operation (the x-coordinate for
/// the NIST curves). Wiped on drop; consumers are expected to feed this
/// through a KDF rather than use it directly.
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl AsRef<[u8]> for SharedSecret {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// An ephemeral key pair for ECDH-ES style agreement. Nothing prevents
/// the caller from using it more than once, but the JOSE layer never
/// does.
pub struct EphemeralKeyPair {
    private_key: PrivateKey,
    public_key: PublicKey,
}

impl EphemeralKeyPair {
    pub fn generate(curve: Curve) -> Result<Self> {
        let private_key = PrivateKey::generate(curve)?;
        let public_key = private_key.compute_public_key()?;
        Ok(Self {
            private_key,
            public_key,
        })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn split(self) -> (PrivateKey, PublicKey) {
        (self.private_key, self.public_key)
    }
}

impl PrivateKey {
    pub fn generate(curve: Curve) -> Result<Self> {
        let bytes = match curve {
            Curve::P256 => p256::SecretKey::random(&mut rand_core::OsRng)
                .to_bytes()
                .to_vec(),
            Curve::P384 => p384::SecretKey::random(&mut rand_core::OsRng)
                .to_bytes()
                .to_vec(),
            Curve::P521 => p521::SecretKey::random(&mut rand_core::OsRng)
                .to_bytes()
                .to_vec(),
            Curve::X25519 => {
                let mut scalar = [0u8; 32];
                crate::rand::fill(&mut scalar)?;
                scalar.to_vec()
            }
        };
        Ok(Self {
            curve,
            bytes: Zeroizing::new(bytes),
        })
    }

    /// Import a scalar. The length must match the curve exactly and, for
    /// the NIST curves, the scalar must be in range.
    pub fn from_bytes(curve: Curve, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != curve.scalar_len() {
            return Err(Error::InvalidKeyLength {
                expected: curve.scalar_len(),
                got: bytes.len(),
            });
        }
        match curve {
            Curve::P256 => {
                p256::SecretKey::from_slice(bytes).map_err(|_| Error::InvalidPrivateKey)?;
            }
            Curve::P384 => {
                p384::SecretKey::from_slice(bytes).map_err(|_| Error::InvalidPrivateKey)?;
            }
            Curve::P521 => {
                p521::SecretKey::from_slice(bytes).map_err(|_| Error::InvalidPrivateKey)?;
            }
            Curve::X25519 => {}
        }
        Ok(Self {
            curve,
            bytes: Zeroizing::new(bytes.to_vec()),
        })
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        self.bytes.clone()
    }

    pub fn compute_public_key(&self) -> Result<PublicKey> {
        let bytes = match self.curve {
            Curve::P256 => {
                let secret =
                    p256::SecretKey::from_slice(&self.bytes).map_err(|_| Error::InvalidPrivateKey)?;
                secret.public_key().to_encoded_point(false).as_bytes().to_vec()
            }
            Curve::P384 => {
                let secret =
                    p384::SecretKey::from_slice(&self.bytes).map_err(|_| Error::InvalidPrivateKey)?;
                secret.public_key().to_encoded_point(false).as_bytes().to_vec()
            }
            Curve::P521 => {
                let secret =
                    p521::SecretKey::from_slice(&self.bytes).map_err(|_| Error::InvalidPrivateKey)?;
                secret.public_key().to_encoded_point(false).as_bytes().to_vec()
            }
            Curve::X25519 => {
                let scalar: [u8; 32] = self.bytes[..]
                    .try_into()
                    .map_err(|_| Error::InvalidPrivateKey)?;
                let secret = x25519_dalek::StaticSecret::from(scalar);
                x25519_dalek::PublicKey::from(&secret).to_bytes().to_vec()
            }
        };
        Ok(PublicKey {
            curve: self.curve,
            bytes,
        })
    }

    /// Perform the Diffie-Hellman operation against `peer`, which must be
    /// on the same curve as this key.
    pub fn agree(&self, peer: &UnparsedPublicKey<'_>) -> Result<SharedSecret> {
        if peer.curve != self.curve {
            return Err(Error::InvalidPublicKey("curve mismatch"));
        }
        let secret = match self.curve {
            Curve::P256 => {
                let private =
                    p256::SecretKey::from_slice(&self.bytes).map_err(|_| Error::InvalidPrivateKey)?;
                let public = p256::PublicKey::from_sec1_bytes(peer.bytes)
                    .map_err(|_| Error::InvalidPublicKey("point is not on P-256"))?;
                p256::ecdh::diffie_hellman(private.to_nonzero_scalar(), public.as_affine())
                    .raw_secret_bytes()
                    .to_vec()
            }
            Curve::P384 => {
                let private =
                    p384::SecretKey::from_slice(&self.bytes).map_err(|_| Error::InvalidPrivateKey)?;
                let public = p384::PublicKey::from_sec1_bytes(peer.bytes)
                    .map_err(|_| Error::InvalidPublicKey("point is not on P-384"))?;
                p384::ecdh::diffie_hellman(private.to_nonzero_scalar(), public.as_affine())
                    .raw_secret_bytes()
                    .to_vec()
            }
            Curve::P521 => {
                let private =
                    p521::SecretKey::from_slice(&self.bytes).map_err(|_| Error::InvalidPrivateKey)?;
                let public = p521::PublicKey::from_sec1_bytes(peer.bytes)
                    .map_err(|_| Error::InvalidPublicKey("point is not on P-521"))?;
                p521::ecdh::diffie_hellman(private.to_nonzero_scalar(), public.as_affine())
                    .raw_secret_bytes()
                    .to_vec()
            }
            Curve::X25519 => {
                let scalar: [u8; 32] = self.bytes[..]
                    .try_into()
                    .map_err(|_| Error::InvalidPrivateKey)?;
                let public: [u8; 32] = peer
                    .bytes
                    .try_into()
                    .map_err(|_| Error::InvalidPublicKey("X25519 keys are 32 bytes"))?;
                let private = x25519_dalek::StaticSecret::from(scalar);
                private
                    .diffie_hellman(&x25519_dalek::PublicKey::from(public))
                    .to_bytes()
                    .to_vec()
            }
        };
        Ok(SharedSecret(Zeroizing::new(secret)))
    }
}

impl PublicKey {
    pub fn curve(&self) -> Curve {
        self.curve
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}
