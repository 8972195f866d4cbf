/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The algorithm registry: the one key-management algorithm, the six
//! content-encryption algorithms and the five signature algorithms this
//! crate handles.

use serde_derive::{Deserialize, Serialize};

/// The JWE key-management algorithms supported by this crate. ECDH-ES in
/// Direct Key Agreement mode is the only one; there is deliberately no
/// key wrapping.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    #[serde(rename = "ECDH-ES")]
    #[allow(non_camel_case_types)]
    ECDH_ES,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ECDH_ES => "ECDH-ES",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ECDH-ES" => Some(Self::ECDH_ES),
            _ => None,
        }
    }
}

/// The content-encryption (`enc`) algorithms supported by this crate.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionAlgorithm {
    A128GCM,
    A192GCM,
    A256GCM,
    #[serde(rename = "A128CBC-HS256")]
    #[allow(non_camel_case_types)]
    A128CBC_HS256,
    #[serde(rename = "A192CBC-HS384")]
    #[allow(non_camel_case_types)]
    A192CBC_HS384,
    #[serde(rename = "A256CBC-HS512")]
    #[allow(non_camel_case_types)]
    A256CBC_HS512,
}

impl EncryptionAlgorithm {
    pub(crate) const ALL: [Self; 6] = [
        Self::A128GCM,
        Self::A192GCM,
        Self::A256GCM,
        Self::A128CBC_HS256,
        Self::A192CBC_HS384,
        Self::A256CBC_HS512,
    ];

    /// The registered name, as used for the Concat-KDF AlgorithmID.
    pub fn algorithm_id(&self) -> &'static str {
        match self {
            Self::A128GCM => "A128GCM",
            Self::A192GCM => "A192GCM",
            Self::A256GCM => "A256GCM",
            Self::A128CBC_HS256 => "A128CBC-HS256",
            Self::A192CBC_HS384 => "A192CBC-HS384",
            Self::A256CBC_HS512 => "A256CBC-HS512",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.algorithm_id() == name)
    }

    /// The CEK size this algorithm consumes. For the CBC composites this
    /// covers both the MAC key and the AES key.
    pub fn key_bit_length(&self) -> usize {
        match self {
            Self::A128GCM => 128,
            Self::A192GCM => 192,
            Self::A256GCM | Self::A128CBC_HS256 => 256,
            Self::A192CBC_HS384 => 384,
            Self::A256CBC_HS512 => 512,
        }
    }

    pub(crate) fn aead_algorithm(&self) -> jose_crypto::aead::AeadAlgorithm {
        use jose_crypto::aead::AeadAlgorithm;
        match self {
            Self::A128GCM => AeadAlgorithm::Aes128Gcm,
            Self::A192GCM => AeadAlgorithm::Aes192Gcm,
            Self::A256GCM => AeadAlgorithm::Aes256Gcm,
            Self::A128CBC_HS256 => AeadAlgorithm::Aes128CbcHmacSha256,
            Self::A192CBC_HS384 => AeadAlgorithm::Aes192CbcHmacSha384,
            Self::A256CBC_HS512 => AeadAlgorithm::Aes256CbcHmacSha512,
        }
    }
}

/// The JWS signature algorithms supported by this crate. Each one is
/// pinned to a single curve, so a key's `crv` fully determines the `alg`
/// it may be used with.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    ES256,
    ES384,
    ES512,
    ES256K,
    EdDSA,
}

impl SignatureAlgorithm {
    pub(crate) const ALL: [Self; 5] = [
        Self::ES256,
        Self::ES384,
        Self::ES512,
        Self::ES256K,
        Self::EdDSA,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
            Self::ES256K => "ES256K",
            Self::EdDSA => "EdDSA",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.name() == name)
    }
}

#[test]
fn test_serde_names() {
    assert_eq!(
        serde_json::to_string(&Algorithm::ECDH_ES).unwrap(),
        "\"ECDH-ES\""
    );
    assert_eq!(
        serde_json::to_string(&EncryptionAlgorithm::A128CBC_HS256).unwrap(),
        "\"A128CBC-HS256\""
    );
    assert_eq!(
        serde_json::from_str::<EncryptionAlgorithm>("\"A256GCM\"").unwrap(),
        EncryptionAlgorithm::A256GCM
    );
    assert_eq!(
        serde_json::to_string(&SignatureAlgorithm::EdDSA).unwrap(),
        "\"EdDSA\""
    );
}

#[test]
fn test_cek_bit_lengths() {
    let expected = [128, 192, 256, 256, 384, 512];
    for (alg, bits) in EncryptionAlgorithm::ALL.iter().zip(expected) {
        assert_eq!(alg.key_bit_length(), bits);
        assert_eq!(alg.aead_algorithm().key_len() * 8, bits);
    }
}

#[test]
fn test_from_name() {
    for alg in EncryptionAlgorithm::ALL {
        assert_eq!(EncryptionAlgorithm::from_name(alg.algorithm_id()), Some(alg));
    }
    assert_eq!(EncryptionAlgorithm::from_name("A512GCM"), None);
    assert_eq!(Algorithm::from_name("ECDH-ES"), Some(Algorithm::ECDH_ES));
    assert_eq!(Algorithm::from_name("ECDH-ES+A256KW"), None);
    for alg in SignatureAlgorithm::ALL {
        assert_eq!(SignatureAlgorithm::from_name(alg.name()), Some(alg));
    }
    assert_eq!(SignatureAlgorithm::from_name("HS256"), None);
}
