/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The compact JWE serialization (RFC7516 section 7.1): five base64url
//! segments joined by dots, in the order
//! `protected.encrypted_key.iv.ciphertext.tag`. The second segment is
//! empty for ECDH-ES direct key agreement. The compact form is a
//! projection of the flattened form, so it cannot carry unprotected
//! headers or standalone AAD.

use super::flattened::{self, DecryptedJwe, FlattenedEncrypter, FlattenedJwe};
use super::{DecryptOptions, EncryptOptions, KeyManagementParameters};
use crate::error::{Container, Result};
use crate::jwk::Jwk;
use crate::JsonObject;

/// Builds up a compact JWE encryption. Wraps [FlattenedEncrypter],
/// exposing only the setters the compact form has a channel for.
#[derive(Debug, Default)]
pub struct CompactEncrypter {
    inner: FlattenedEncrypter,
}

impl CompactEncrypter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the integrity-protected header. It must at least carry `alg`
    /// and `enc`.
    pub fn protected_header(self, header: JsonObject) -> Result<Self> {
        Ok(Self {
            inner: self.inner.protected_header(header)?,
        })
    }

    /// Set the ECDH-ES party info values. At most 32 bytes each.
    pub fn key_management_parameters(self, parameters: KeyManagementParameters) -> Result<Self> {
        Ok(Self {
            inner: self.inner.key_management_parameters(parameters)?,
        })
    }

    /// Encrypt `plaintext` to the holder of `recipient`, producing the
    /// five-segment compact serialization.
    pub fn encrypt(
        self,
        plaintext: &[u8],
        recipient: &Jwk,
        options: &EncryptOptions,
    ) -> Result<String> {
        let jwe = self.inner.encrypt(plaintext, recipient, options)?;
        Ok(format!(
            "{}.{}.{}.{}.{}",
            jwe.protected,
            jwe.encrypted_key.unwrap_or_default(),
            jwe.iv,
            jwe.ciphertext,
            jwe.tag
        ))
    }
}

/// Decrypt a compact JWE with the recipient's private JWK.
pub fn decrypt(compact: &str, recipient: &Jwk, options: &DecryptOptions) -> Result<DecryptedJwe> {
    let container = Container::Jwe;
    let segments: Vec<&str> = compact.split('.').collect();
    if segments.len() != 5 {
        return Err(container.invalid(format!(
            "a compact JWE must have 5 parts, got {}",
            segments.len()
        )));
    }
    for (segment, label) in [
        (segments[0], "protected header"),
        (segments[2], "iv"),
        (segments[3], "ciphertext"),
        (segments[4], "tag"),
    ] {
        if segment.is_empty() {
            return Err(container.invalid(format!("{label} must not be empty")));
        }
    }
    let jwe = FlattenedJwe {
        protected: segments[0].to_owned(),
        encrypted_key: (!segments[1].is_empty()).then(|| segments[1].to_owned()),
        iv: segments[2].to_owned(),
        ciphertext: segments[3].to_owned(),
        tag: segments[4].to_owned(),
        aad: None,
        unprotected: None,
        header: None,
    };
    flattened::decrypt(&jwe, recipient, options)
}
