/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The flattened JWE JSON serialization (RFC7516 section 7.2.2):
//! a single-recipient JSON object carrying the five binary segments as
//! base64url strings plus up to three header positions.

use super::{DecryptOptions, EncryptOptions, KeyManagementParameters};
use crate::alg::{Algorithm, EncryptionAlgorithm};
use crate::codec;
use crate::ecdh;
use crate::error::{Container, JwCryptoError, Result};
use crate::header;
use crate::jwk::{self, Jwk};
use crate::kdf;
use crate::JsonObject;
use serde_derive::{Deserialize, Serialize};
use std::str::FromStr;

/// A flattened JWE, ready for the wire. Optional members are omitted
/// from the JSON entirely rather than serialized as null.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlattenedJwe {
    pub protected: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_key: Option<String>,
    pub iv: String,
    pub ciphertext: String,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aad: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unprotected: Option<JsonObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<JsonObject>,
}

impl FromStr for FlattenedJwe {
    type Err = JwCryptoError;
    fn from_str(value: &str) -> Result<Self> {
        serde_json::from_str(value)
            .map_err(|_| Container::Jwe.invalid("not a valid flattened JWE"))
    }
}

/// What a successful decryption hands back: the plaintext plus every
/// header position and the additional authenticated data the sender
/// included.
#[derive(Debug)]
pub struct DecryptedJwe {
    pub plaintext: Vec<u8>,
    pub protected_header: JsonObject,
    pub additional_authenticated_data: Option<Vec<u8>>,
    pub shared_unprotected_header: Option<JsonObject>,
    pub unprotected_header: Option<JsonObject>,
}

/// Builds up a flattened JWE encryption. Every setter may be called at
/// most once - the builder is a single-use snapshot, consumed by
/// [FlattenedEncrypter::encrypt].
#[derive(Debug, Default)]
pub struct FlattenedEncrypter {
    protected_header: Option<JsonObject>,
    shared_unprotected_header: Option<JsonObject>,
    unprotected_header: Option<JsonObject>,
    key_management_parameters: Option<KeyManagementParameters>,
    aad: Option<Vec<u8>>,
}

impl FlattenedEncrypter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the integrity-protected header. It must at least carry `alg`
    /// and `enc`.
    pub fn protected_header(mut self, header: JsonObject) -> Result<Self> {
        if self.protected_header.is_some() {
            return Err(Container::Jwe.invalid("protected header may only be set once"));
        }
        self.protected_header = Some(header);
        Ok(self)
    }

    /// Set the shared unprotected header.
    pub fn shared_unprotected_header(mut self, header: JsonObject) -> Result<Self> {
        if self.shared_unprotected_header.is_some() {
            return Err(Container::Jwe.invalid("shared unprotected header may only be set once"));
        }
        self.shared_unprotected_header = Some(header);
        Ok(self)
    }

    /// Set the per-recipient unprotected header.
    pub fn unprotected_header(mut self, header: JsonObject) -> Result<Self> {
        if self.unprotected_header.is_some() {
            return Err(Container::Jwe.invalid("unprotected header may only be set once"));
        }
        self.unprotected_header = Some(header);
        Ok(self)
    }

    /// Set the ECDH-ES party info values. At most 32 bytes each.
    pub fn key_management_parameters(
        mut self,
        parameters: KeyManagementParameters,
    ) -> Result<Self> {
        if self.key_management_parameters.is_some() {
            return Err(Container::Jwe.invalid("key management parameters may only be set once"));
        }
        for (value, label) in [(&parameters.apu, "apu"), (&parameters.apv, "apv")] {
            if let Some(value) = value {
                if value.len() > kdf::MAX_PARTY_INFO_LEN {
                    return Err(Container::Jwe.invalid(format!(
                        "{label} must be {} bytes or fewer",
                        kdf::MAX_PARTY_INFO_LEN
                    )));
                }
            }
        }
        self.key_management_parameters = Some(parameters);
        Ok(self)
    }

    /// Set additional data to authenticate but not encrypt. Unlike the
    /// other setters this one may be repeated; the last value wins.
    pub fn additional_authenticated_data(mut self, aad: Vec<u8>) -> Self {
        self.aad = Some(aad);
        self
    }

    /// Encrypt `plaintext` to the holder of `recipient` (a public JWK on
    /// one of the ECDH-ES curves), producing a flattened JWE.
    pub fn encrypt(
        self,
        plaintext: &[u8],
        recipient: &Jwk,
        options: &EncryptOptions,
    ) -> Result<FlattenedJwe> {
        let container = Container::Jwe;
        // Input validation, which is allowed to fail loudly. First the
        // recipient key...
        let curve = ecdh::agreement_curve(container, recipient.crv())?;
        jwk::to_raw_public_key(
            container,
            recipient,
            curve.is_octet_key_pair(),
            curve.scalar_len(),
        )?;
        // ... then the headers.
        let positions = [
            self.protected_header.as_ref(),
            self.shared_unprotected_header.as_ref(),
            self.unprotected_header.as_ref(),
        ];
        header::reject_zip(&positions)?;
        let merged = header::merge_headers(
            container,
            self.protected_header.as_ref(),
            self.shared_unprotected_header.as_ref(),
            self.unprotected_header.as_ref(),
        )?;
        let mut protected = self.protected_header.clone().unwrap_or_default();
        header::validate_crit(container, &[], &options.crit, &protected, &merged)?;
        let alg = required_string_parameter(&merged, "alg")?;
        if Algorithm::from_name(&alg).is_none() {
            return Err(JwCryptoError::not_supported(format!("alg '{alg}'")));
        }
        let enc_name = required_string_parameter(&merged, "enc")?;
        let enc = EncryptionAlgorithm::from_name(&enc_name)
            .ok_or_else(|| JwCryptoError::not_supported(format!("enc '{enc_name}'")))?;

        // From here on every failure collapses into one uniform error so
        // callers cannot probe the internals (rfc7516 section 11.5
        // spirit); the cause is only logged.
        let key_management = self.key_management_parameters.unwrap_or_default();
        self::encrypt_validated(
            plaintext,
            recipient,
            enc,
            key_management,
            &mut protected,
            self.shared_unprotected_header,
            self.unprotected_header,
            self.aad,
        )
        .map_err(|error| {
            log::warn!("JWE encryption failed: {error}");
            container.invalid("failed to encrypt JWE")
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn encrypt_validated(
    plaintext: &[u8],
    recipient: &Jwk,
    enc: EncryptionAlgorithm,
    key_management: KeyManagementParameters,
    protected: &mut JsonObject,
    shared_unprotected_header: Option<JsonObject>,
    unprotected_header: Option<JsonObject>,
    aad: Option<Vec<u8>>,
) -> Result<FlattenedJwe> {
    let derived = ecdh::derive_encryption_key(
        recipient,
        enc,
        key_management.apu.as_deref(),
        key_management.apv.as_deref(),
    )?;
    // Extend the protected header with the agreement parameters. A name
    // the caller already set is left alone.
    for (name, value) in derived.parameters {
        protected.entry(name).or_insert(value);
    }

    let protected_b64 = codec::encode_protected_header(Container::Jwe, protected)?;
    let aead_aad = match &aad {
        Some(aad) => format!("{}.{}", protected_b64, codec::b64_encode(aad)),
        None => protected_b64.clone(),
    };

    let aead_algorithm = enc.aead_algorithm();
    let mut iv = vec![0u8; aead_algorithm.iv_len()];
    jose_crypto::rand::fill(&mut iv)?;
    let mut sealed = jose_crypto::aead::seal(
        aead_algorithm,
        &derived.cek,
        Some(&iv),
        plaintext,
        aead_aad.as_bytes(),
    )?;
    let tag = sealed.split_off(sealed.len() - aead_algorithm.tag_len());
    let ciphertext = sealed;

    Ok(FlattenedJwe {
        protected: protected_b64,
        // ECDH-ES direct key agreement never wraps a key.
        encrypted_key: None,
        iv: codec::b64_encode(iv),
        ciphertext: codec::b64_encode(ciphertext),
        tag: codec::b64_encode(tag),
        aad: aad.map(codec::b64_encode),
        unprotected: shared_unprotected_header,
        header: unprotected_header,
    })
}

/// Decrypt a flattened JWE with the recipient's private JWK.
///
/// Apart from shape problems in `jwe` itself, every failure - a bad
/// `epk`, a filtered algorithm, a forged tag - surfaces as the same
/// "failed to decrypt JWE" error, with CEK-derivation failures additionally
/// padded by the RFC7516 section 11.5 random delay.
pub fn decrypt(jwe: &FlattenedJwe, recipient: &Jwk, options: &DecryptOptions) -> Result<DecryptedJwe> {
    let container = Container::Jwe;
    // Recipient key validation fails loudly...
    let curve = ecdh::agreement_curve(container, recipient.crv())?;
    jwk::to_raw_private_key(
        container,
        recipient,
        curve.is_octet_key_pair(),
        curve.scalar_len(),
    )?;

    // ... as does decomposing the container itself.
    let iv = codec::b64_decode_required(container, Some(&jwe.iv), "iv")?;
    let ciphertext = codec::b64_decode_required(container, Some(&jwe.ciphertext), "ciphertext")?;
    let tag = codec::b64_decode_required(container, Some(&jwe.tag), "tag")?;
    let encrypted_key =
        codec::b64_decode_optional(container, jwe.encrypted_key.as_deref(), "encrypted_key")?;
    let aad = codec::b64_decode_optional(container, jwe.aad.as_deref(), "aad")?;
    let protected_bytes =
        codec::b64_decode_required(container, Some(&jwe.protected), "protected header")?;
    let protected = codec::parse_json_object(container, &protected_bytes, "protected header")?;
    let positions = [
        Some(&protected),
        jwe.unprotected.as_ref(),
        jwe.header.as_ref(),
    ];
    header::reject_zip(&positions)?;
    let merged = header::merge_headers(
        container,
        Some(&protected),
        jwe.unprotected.as_ref(),
        jwe.header.as_ref(),
    )?;
    header::validate_crit(container, &[], &options.crit, &protected, &merged)?;

    // Everything else collapses into the single uniform error, built at
    // this one site so no shape difference can leak what went wrong.
    decrypt_validated(jwe, recipient, options, &merged, iv, ciphertext, tag, encrypted_key)
        .map(|plaintext| DecryptedJwe {
            plaintext,
            protected_header: protected,
            additional_authenticated_data: aad,
            shared_unprotected_header: jwe.unprotected.clone(),
            unprotected_header: jwe.header.clone(),
        })
        .map_err(|error| {
            log::warn!("JWE decryption failed: {error}");
            container.invalid("failed to decrypt JWE")
        })
}

#[allow(clippy::too_many_arguments)]
fn decrypt_validated(
    jwe: &FlattenedJwe,
    recipient: &Jwk,
    options: &DecryptOptions,
    merged: &JsonObject,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
    encrypted_key: Option<Vec<u8>>,
) -> Result<Vec<u8>> {
    let container = Container::Jwe;
    let alg = required_string_parameter(merged, "alg")?;
    check_key_management_algorithm(&alg, options.key_management_algorithms.as_deref())?;
    if Algorithm::from_name(&alg).is_none() {
        return Err(JwCryptoError::not_supported(format!("alg '{alg}'")));
    }
    let enc_name = required_string_parameter(merged, "enc")?;
    if let Some(allowed) = options.content_encryption_algorithms.as_deref() {
        if !allowed.iter().any(|name| name == &enc_name) {
            return Err(container.invalid(format!(
                "content encryption algorithm '{enc_name}' is not allowed"
            )));
        }
    }
    let enc = EncryptionAlgorithm::from_name(&enc_name)
        .ok_or_else(|| JwCryptoError::not_supported(format!("enc '{enc_name}'")))?;

    // `alg="ECDH-ES"` mandates no encrypted key.
    if encrypted_key.map_or(false, |k| !k.is_empty()) {
        return Err(container.invalid("the Encrypted Key must be empty"));
    }

    let cek = ecdh::derive_decryption_key_with_mitigation(recipient, merged, enc)?;

    // The AEAD additional data is rebuilt from the raw base64url
    // segments, exactly as the encryption side computed it.
    let aead_aad = match &jwe.aad {
        Some(aad_b64) => format!("{}.{}", jwe.protected, aad_b64),
        None => jwe.protected.clone(),
    };

    let ciphertext_and_tag = [ciphertext, tag].concat();
    let plaintext = jose_crypto::aead::open(
        enc.aead_algorithm(),
        &cek,
        Some(&iv),
        &ciphertext_and_tag,
        aead_aad.as_bytes(),
    )?;
    Ok(plaintext)
}

fn required_string_parameter(header: &JsonObject, name: &str) -> Result<String> {
    header
        .get(name)
        .and_then(|value| value.as_str())
        .map(str::to_owned)
        .ok_or_else(|| Container::Jwe.invalid(format!("{name} is missing from the JOSE header")))
}

fn check_key_management_algorithm(name: &str, allow_list: Option<&[String]>) -> Result<()> {
    match allow_list {
        Some(allowed) => {
            if !allowed.iter().any(|a| a == name) {
                return Err(Container::Jwe.invalid(format!(
                    "key management algorithm '{name}' is not allowed"
                )));
            }
        }
        // With no allow-list, the PBES2 family is blocked outright so a
        // forged header can never steer a caller onto a password-derived
        // key, whatever this crate grows to support.
        None => {
            if name.starts_with("PBES2") {
                return Err(Container::Jwe.invalid(format!(
                    "key management algorithm '{name}' is not allowed"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(json: &str) -> JsonObject {
        serde_json::from_str(json).unwrap()
    }

    fn protected_header(enc: &str) -> JsonObject {
        obj(&format!(r#"{{"alg":"ECDH-ES","enc":"{enc}"}}"#))
    }

    const BOB_JWK: &str = r#"{
        "kty": "EC", "crv": "P-256",
        "x": "weNJy2HscCSM6AEDTDg04biOvhFhyyWvOHQfeF_PxMQ",
        "y": "e8lnCO-AlStT-NJVX-crhB7QRYhiix03illJOVAOyck",
        "d": "VEmDZpDXXK8p8N0Cndsxs924q6nS1RXFASRl6BfUqdw"
    }"#;

    // Computed against an independent implementation: ECDH-ES with the
    // rfc7518 appendix C keys (the Alice pair plays the ephemeral key),
    // A128GCM, apu "Alice", apv "Bob", fixed IV 000102...0b.
    const KNOWN_PROTECTED: &str = "eyJhbGciOiJFQ0RILUVTIiwiZW5jIjoiQTEyOEdDTSIsImFwdSI6IlFXeHBZMlUiLCJhcHYiOiJRbTlpIiwiZXBrIjp7Imt0eSI6IkVDIiwiY3J2IjoiUC0yNTYiLCJ4IjoiZ0kwR0FJTEJkdTdUNTNha3JGbU15R2NzRjNuNWRPN01td05CSEtXNVNWMCIsInkiOiJTTFdfeFNmZnpsUFdySEVWSTMwREhNXzRlZ1Z3dDNOUXFlVUQ3bk1GcHBzIn19";

    fn bob() -> Jwk {
        serde_json::from_str(BOB_JWK).unwrap()
    }

    #[test]
    fn test_round_trip_every_curve_and_enc() {
        for crv in ["P-256", "P-384", "P-521", "X25519"] {
            for enc in EncryptionAlgorithm::ALL {
                let recipient = Jwk::new_ecdh_key(crv, None).unwrap();
                let jwe = FlattenedEncrypter::new()
                    .protected_header(protected_header(enc.algorithm_id()))
                    .unwrap()
                    .encrypt(b"Hello, World!", &recipient.to_public(), &Default::default())
                    .unwrap();
                let decrypted = decrypt(&jwe, &recipient, &Default::default()).unwrap();
                assert_eq!(decrypted.plaintext, b"Hello, World!");
                let epk = decrypted.protected_header.get("epk").unwrap();
                assert_eq!(epk.get("crv").unwrap(), crv);
            }
        }
    }

    #[test]
    fn test_scenario_no_party_info() {
        // The minimal ECDH-ES + A256GCM flow: exactly four members on
        // the wire, epk emitted into the protected header.
        let recipient = Jwk::new_ecdh_key("P-256", None).unwrap();
        let jwe = FlattenedEncrypter::new()
            .protected_header(protected_header("A256GCM"))
            .unwrap()
            .encrypt(b"Hello, World!", &recipient.to_public(), &Default::default())
            .unwrap();
        let value = serde_json::to_value(&jwe).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["protected", "iv", "ciphertext", "tag"]);

        let decrypted = decrypt(&jwe, &recipient, &Default::default()).unwrap();
        assert_eq!(decrypted.plaintext, b"Hello, World!");
        assert_eq!(decrypted.protected_header.get("alg").unwrap(), "ECDH-ES");
        assert_eq!(decrypted.protected_header.get("enc").unwrap(), "A256GCM");
        let epk = decrypted.protected_header.get("epk").unwrap();
        assert_eq!(epk.get("crv").unwrap(), "P-256");
        assert_eq!(epk.get("kty").unwrap(), "EC");
        assert!(decrypted.additional_authenticated_data.is_none());
        assert!(decrypted.shared_unprotected_header.is_none());
        assert!(decrypted.unprotected_header.is_none());
    }

    #[test]
    fn test_scenario_party_info() {
        let recipient = Jwk::new_ecdh_key("P-256", None).unwrap();
        let jwe = FlattenedEncrypter::new()
            .protected_header(protected_header("A256GCM"))
            .unwrap()
            .key_management_parameters(KeyManagementParameters {
                apu: Some(b"Alice".to_vec()),
                apv: Some(b"Bob".to_vec()),
            })
            .unwrap()
            .encrypt(b"Hello, World!", &recipient.to_public(), &Default::default())
            .unwrap();
        let decrypted = decrypt(&jwe, &recipient, &Default::default()).unwrap();
        assert_eq!(decrypted.plaintext, b"Hello, World!");
        assert_eq!(decrypted.protected_header.get("apu").unwrap(), "QWxpY2U");
        assert_eq!(decrypted.protected_header.get("apv").unwrap(), "Qm9i");
    }

    #[test]
    fn test_known_answer_decrypt() {
        let jwe = FlattenedJwe {
            protected: KNOWN_PROTECTED.to_owned(),
            encrypted_key: None,
            iv: "AAECAwQFBgcICQoL".to_owned(),
            ciphertext: "PO5uiCL9iufVcFF1Dg".to_owned(),
            tag: "bbeM8n7EdTsWIbMAEXPT3g".to_owned(),
            aad: None,
            unprotected: None,
            header: None,
        };
        let decrypted = decrypt(&jwe, &bob(), &Default::default()).unwrap();
        assert_eq!(decrypted.plaintext, b"Hello, World!");
        assert_eq!(decrypted.protected_header.get("apu").unwrap(), "QWxpY2U");
    }

    #[test]
    fn test_known_answer_decrypt_with_aad() {
        let jwe = FlattenedJwe {
            protected: KNOWN_PROTECTED.to_owned(),
            encrypted_key: None,
            iv: "AQIDBAUGBwgJCgsM".to_owned(),
            ciphertext: "wCYNg0JLbPfhIuYIsQ".to_owned(),
            tag: "u3YSY7kWUeijLfoLpnra1g".to_owned(),
            aad: Some("VGhlIEZlbGxvd3NoaXAgb2YgdGhlIFJpbmc".to_owned()),
            unprotected: None,
            header: None,
        };
        let decrypted = decrypt(&jwe, &bob(), &Default::default()).unwrap();
        assert_eq!(decrypted.plaintext, b"Hello, World!");
        assert_eq!(
            decrypted.additional_authenticated_data.as_deref(),
            Some(&b"The Fellowship of the Ring"[..])
        );
    }

    #[test]
    fn test_caller_aad_round_trips() {
        let recipient = Jwk::new_ecdh_key("X25519", None).unwrap();
        let jwe = FlattenedEncrypter::new()
            .protected_header(protected_header("A128CBC-HS256"))
            .unwrap()
            .additional_authenticated_data(b"first write".to_vec())
            .additional_authenticated_data(b"last write wins".to_vec())
            .encrypt(b"sealed", &recipient.to_public(), &Default::default())
            .unwrap();
        assert_eq!(jwe.aad.as_deref(), Some("bGFzdCB3cml0ZSB3aW5z"));
        let decrypted = decrypt(&jwe, &recipient, &Default::default()).unwrap();
        assert_eq!(decrypted.plaintext, b"sealed");
        assert_eq!(
            decrypted.additional_authenticated_data.as_deref(),
            Some(&b"last write wins"[..])
        );
    }

    #[test]
    fn test_unprotected_headers_round_trip() {
        let recipient = Jwk::new_ecdh_key("P-256", None).unwrap();
        let jwe = FlattenedEncrypter::new()
            .protected_header(protected_header("A256GCM"))
            .unwrap()
            .shared_unprotected_header(obj(r#"{"jku":"https://example.com/keys"}"#))
            .unwrap()
            .unprotected_header(obj(r#"{"kid":"bob-1"}"#))
            .unwrap()
            .encrypt(b"hi", &recipient.to_public(), &Default::default())
            .unwrap();
        assert!(jwe.unprotected.is_some());
        assert!(jwe.header.is_some());
        let decrypted = decrypt(&jwe, &recipient, &Default::default()).unwrap();
        assert_eq!(
            decrypted
                .shared_unprotected_header
                .unwrap()
                .get("jku")
                .unwrap(),
            "https://example.com/keys"
        );
        assert_eq!(decrypted.unprotected_header.unwrap().get("kid").unwrap(), "bob-1");
    }

    #[test]
    fn test_builder_setters_are_single_use() {
        let encrypter = FlattenedEncrypter::new()
            .protected_header(protected_header("A256GCM"))
            .unwrap();
        assert_eq!(
            encrypter
                .protected_header(protected_header("A256GCM"))
                .unwrap_err()
                .to_string(),
            "Invalid JWE: protected header may only be set once"
        );
        let encrypter = FlattenedEncrypter::new()
            .key_management_parameters(Default::default())
            .unwrap();
        assert!(encrypter
            .key_management_parameters(Default::default())
            .is_err());
    }

    #[test]
    fn test_party_info_boundary_in_builder() {
        let ok = FlattenedEncrypter::new().key_management_parameters(KeyManagementParameters {
            apu: Some(vec![0x61; 32]),
            apv: None,
        });
        assert!(ok.is_ok());
        let err = FlattenedEncrypter::new()
            .key_management_parameters(KeyManagementParameters {
                apu: Some(vec![0x61; 33]),
                apv: None,
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid JWE: apu must be 32 bytes or fewer");
    }

    #[test]
    fn test_disjointness_fails_before_any_crypto() {
        let recipient = Jwk::new_ecdh_key("P-256", None).unwrap().to_public();
        let err = FlattenedEncrypter::new()
            .protected_header(protected_header("A256GCM"))
            .unwrap()
            .shared_unprotected_header(obj(r#"{"enc":"A128GCM"}"#))
            .unwrap()
            .encrypt(b"hi", &recipient, &Default::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid JWE: header parameter 'enc' appears in more than one position"
        );
    }

    #[test]
    fn test_zip_is_rejected_everywhere() {
        let recipient = Jwk::new_ecdh_key("P-256", None).unwrap();
        for build in [
            FlattenedEncrypter::new()
                .protected_header(obj(r#"{"alg":"ECDH-ES","enc":"A256GCM","zip":"DEF"}"#)),
            FlattenedEncrypter::new()
                .protected_header(protected_header("A256GCM"))
                .unwrap()
                .shared_unprotected_header(obj(r#"{"zip":"DEF"}"#)),
        ] {
            let err = build
                .unwrap()
                .encrypt(b"hi", &recipient.to_public(), &Default::default())
                .unwrap_err();
            assert!(matches!(err, JwCryptoError::NotSupported(_)));
        }

        // And on the decryption side.
        let mut jwe = FlattenedEncrypter::new()
            .protected_header(protected_header("A256GCM"))
            .unwrap()
            .encrypt(b"hi", &recipient.to_public(), &Default::default())
            .unwrap();
        jwe.unprotected = Some(obj(r#"{"zip":"DEF"}"#));
        assert!(matches!(
            decrypt(&jwe, &recipient, &Default::default()),
            Err(JwCryptoError::NotSupported(_))
        ));
    }

    #[test]
    fn test_crit_must_be_protected_on_both_sides() {
        let recipient = Jwk::new_ecdh_key("P-256", None).unwrap();
        let err = FlattenedEncrypter::new()
            .protected_header(protected_header("A256GCM"))
            .unwrap()
            .shared_unprotected_header(obj(r#"{"crit":["exp"],"exp":123}"#))
            .unwrap()
            .encrypt(b"hi", &recipient.to_public(), &Default::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid JWE: the crit header parameter MUST be integrity protected"
        );

        let mut jwe = FlattenedEncrypter::new()
            .protected_header(protected_header("A256GCM"))
            .unwrap()
            .encrypt(b"hi", &recipient.to_public(), &Default::default())
            .unwrap();
        jwe.unprotected = Some(obj(r#"{"crit":["exp"],"exp":123}"#));
        assert!(matches!(
            decrypt(&jwe, &recipient, &Default::default()),
            Err(JwCryptoError::InvalidJwe(_))
        ));
    }

    #[test]
    fn test_crit_extension_parameter_opt_in() {
        let recipient = Jwk::new_ecdh_key("P-256", None).unwrap();
        let protected = obj(
            r#"{"alg":"ECDH-ES","enc":"A256GCM","crit":["exp"],"exp":2524608000}"#,
        );
        // Unrecognized without the option...
        let err = FlattenedEncrypter::new()
            .protected_header(protected.clone())
            .unwrap()
            .encrypt(b"hi", &recipient.to_public(), &Default::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid JWE: critical header parameter 'exp' is not recognized"
        );
        // ... accepted with it, on both sides.
        let mut options = EncryptOptions::default();
        options.crit.insert("exp".to_owned(), true);
        let jwe = FlattenedEncrypter::new()
            .protected_header(protected)
            .unwrap()
            .encrypt(b"hi", &recipient.to_public(), &options)
            .unwrap();
        assert!(matches!(
            decrypt(&jwe, &recipient, &Default::default()),
            Err(JwCryptoError::InvalidJwe(_))
        ));
        let mut options = DecryptOptions::default();
        options.crit.insert("exp".to_owned(), true);
        let decrypted = decrypt(&jwe, &recipient, &options).unwrap();
        assert_eq!(decrypted.plaintext, b"hi");
    }

    #[test]
    fn test_unknown_alg_and_enc() {
        let recipient = Jwk::new_ecdh_key("P-256", None).unwrap().to_public();
        let err = FlattenedEncrypter::new()
            .protected_header(obj(r#"{"alg":"ECDH-ES+A256KW","enc":"A256GCM"}"#))
            .unwrap()
            .encrypt(b"hi", &recipient, &Default::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Not supported: alg 'ECDH-ES+A256KW'");
        let err = FlattenedEncrypter::new()
            .protected_header(obj(r#"{"alg":"ECDH-ES","enc":"A512GCM"}"#))
            .unwrap()
            .encrypt(b"hi", &recipient, &Default::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Not supported: enc 'A512GCM'");
    }

    #[test]
    fn test_decrypt_algorithm_allow_lists() {
        let recipient = Jwk::new_ecdh_key("P-256", None).unwrap();
        let jwe = FlattenedEncrypter::new()
            .protected_header(protected_header("A256GCM"))
            .unwrap()
            .encrypt(b"hi", &recipient.to_public(), &Default::default())
            .unwrap();

        let options = DecryptOptions {
            key_management_algorithms: Some(vec!["ECDH-ES".to_owned()]),
            content_encryption_algorithms: Some(vec!["A256GCM".to_owned()]),
            ..Default::default()
        };
        assert!(decrypt(&jwe, &recipient, &options).is_ok());

        // A filtered algorithm is indistinguishable from any other
        // decryption failure.
        let options = DecryptOptions {
            key_management_algorithms: Some(vec!["ECDH-ES+A256KW".to_owned()]),
            ..Default::default()
        };
        assert_eq!(
            decrypt(&jwe, &recipient, &options).unwrap_err().to_string(),
            "Invalid JWE: failed to decrypt JWE"
        );
        let options = DecryptOptions {
            content_encryption_algorithms: Some(vec!["A128GCM".to_owned()]),
            ..Default::default()
        };
        assert_eq!(
            decrypt(&jwe, &recipient, &options).unwrap_err().to_string(),
            "Invalid JWE: failed to decrypt JWE"
        );
    }

    #[test]
    fn test_tampering_yields_the_uniform_error() {
        let recipient = Jwk::new_ecdh_key("P-256", None).unwrap();
        let jwe = FlattenedEncrypter::new()
            .protected_header(protected_header("A256GCM"))
            .unwrap()
            .encrypt(b"hi", &recipient.to_public(), &Default::default())
            .unwrap();

        // Flip a ciphertext byte.
        let mut tampered = jwe.clone();
        let mut ciphertext = codec::b64_decode_required(
            Container::Jwe,
            Some(&tampered.ciphertext),
            "ciphertext",
        )
        .unwrap();
        ciphertext[0] ^= 0xff;
        tampered.ciphertext = codec::b64_encode(ciphertext);
        assert_eq!(
            decrypt(&tampered, &recipient, &Default::default())
                .unwrap_err()
                .to_string(),
            "Invalid JWE: failed to decrypt JWE"
        );

        // A spurious encrypted_key is collapsed the same way.
        let mut tampered = jwe.clone();
        tampered.encrypted_key = Some(codec::b64_encode(b"bogus"));
        assert_eq!(
            decrypt(&tampered, &recipient, &Default::default())
                .unwrap_err()
                .to_string(),
            "Invalid JWE: failed to decrypt JWE"
        );

        // An empty encrypted_key slot is what ECDH-ES produces.
        let mut untampered = jwe.clone();
        untampered.encrypted_key = Some(String::new());
        assert!(decrypt(&untampered, &recipient, &Default::default()).is_ok());
    }

    #[test]
    fn test_mitigated_derivation_failure_matches_tag_failure_shape() {
        // Encrypt to a P-256 key but decrypt with a P-384 key: the epk
        // no longer matches the recipient curve, so CEK derivation fails
        // and the mitigation path runs.
        let recipient = Jwk::new_ecdh_key("P-256", None).unwrap();
        let other = Jwk::new_ecdh_key("P-384", None).unwrap();
        let jwe = FlattenedEncrypter::new()
            .protected_header(protected_header("A256GCM"))
            .unwrap()
            .encrypt(b"hi", &recipient.to_public(), &Default::default())
            .unwrap();
        let start = std::time::Instant::now();
        let err = decrypt(&jwe, &other, &Default::default()).unwrap_err();
        let elapsed = start.elapsed();
        assert_eq!(err.to_string(), "Invalid JWE: failed to decrypt JWE");
        assert!(elapsed >= std::time::Duration::from_millis(200), "{elapsed:?}");
    }

    #[test]
    fn test_decompose_shape_errors_are_labeled() {
        let recipient = Jwk::new_ecdh_key("P-256", None).unwrap();
        let jwe = FlattenedEncrypter::new()
            .protected_header(protected_header("A256GCM"))
            .unwrap()
            .encrypt(b"hi", &recipient.to_public(), &Default::default())
            .unwrap();

        let mut bad = jwe.clone();
        bad.iv = "not base64url!".to_owned();
        assert_eq!(
            decrypt(&bad, &recipient, &Default::default())
                .unwrap_err()
                .to_string(),
            "Invalid JWE: iv is not valid base64url"
        );

        let mut bad = jwe.clone();
        bad.protected = codec::b64_encode(b"[]");
        assert_eq!(
            decrypt(&bad, &recipient, &Default::default())
                .unwrap_err()
                .to_string(),
            "Invalid JWE: protected header is not a JSON object"
        );

        // Parsing a flattened JWE from JSON text.
        assert!(FlattenedJwe::from_str("{}").is_err());
        let round_tripped: FlattenedJwe =
            serde_json::to_string(&jwe).unwrap().parse().unwrap();
        assert_eq!(round_tripped, jwe);
    }

    #[test]
    fn test_encrypting_to_a_signature_curve_fails() {
        let recipient = Jwk::new_signing_key("secp256k1", None).unwrap().to_public();
        assert!(matches!(
            FlattenedEncrypter::new()
                .protected_header(protected_header("A256GCM"))
                .unwrap()
                .encrypt(b"hi", &recipient, &Default::default()),
            Err(JwCryptoError::NotSupported(_))
        ));
    }

    #[test]
    fn test_large_plaintext_round_trips() {
        let mut plaintext = vec![0u8; 1 << 20];
        jose_crypto::rand::fill(&mut plaintext).unwrap();
        let recipient = Jwk::new_ecdh_key("P-256", None).unwrap();
        let jwe = FlattenedEncrypter::new()
            .protected_header(protected_header("A256CBC-HS512"))
            .unwrap()
            .encrypt(&plaintext, &recipient.to_public(), &Default::default())
            .unwrap();
        let decrypted = decrypt(&jwe, &recipient, &Default::default()).unwrap();
        assert_eq!(decrypted.plaintext, plaintext);
    }
}
