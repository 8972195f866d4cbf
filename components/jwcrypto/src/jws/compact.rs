/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The compact JWS serialization (RFC7515 section 7.1): three base64url
//! segments joined by dots, `protected.payload.signature`. A projection
//! of the flattened form; since the middle segment IS the payload, the
//! RFC7797 `b64=false` detached mode cannot be expressed here.

use super::flattened::{self, FlattenedJws, FlattenedSigner, VerifiedJws};
use super::{SignOptions, VerifyOptions};
use crate::codec;
use crate::error::{Container, Result};
use crate::jwk::Jwk;
use crate::JsonObject;

/// Builds up a compact JWS signature. Wraps [FlattenedSigner]; the
/// compact form has no channel for an unprotected header.
#[derive(Debug, Default)]
pub struct CompactSigner {
    inner: FlattenedSigner,
}

impl CompactSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the integrity-protected header. It must at least carry `alg`.
    pub fn protected_header(self, header: JsonObject) -> Result<Self> {
        Ok(Self {
            inner: self.inner.protected_header(header)?,
        })
    }

    /// Sign `payload`, producing the three-segment compact
    /// serialization.
    pub fn sign(self, payload: &[u8], signer: &Jwk, options: &SignOptions) -> Result<String> {
        let container = Container::Jws;
        let jws = self.inner.sign(payload, signer, options)?;
        if jws.payload.is_empty() {
            // Distinguish an empty payload (fine) from a detached one.
            let protected_bytes = codec::b64_decode_required(
                container,
                Some(&jws.protected),
                "protected header",
            )?;
            let protected =
                codec::parse_json_object(container, &protected_bytes, "protected header")?;
            if protected.get("b64") == Some(&serde_json::Value::Bool(false)) {
                return Err(container.invalid(
                    "use the flattened serialization for JWS with b64: false",
                ));
            }
        }
        Ok(format!("{}.{}.{}", jws.protected, jws.payload, jws.signature))
    }
}

/// Verify a compact JWS against `verifier` (a public JWK).
pub fn verify(compact: &str, verifier: &Jwk, options: &VerifyOptions) -> Result<VerifiedJws> {
    let container = Container::Jws;
    if compact.is_empty() {
        return Err(container.invalid("a compact JWS must not be empty"));
    }
    let segments: Vec<&str> = compact.split('.').collect();
    if segments.len() != 3 {
        return Err(container.invalid(format!(
            "a compact JWS must have 3 parts, got {}",
            segments.len()
        )));
    }
    let jws = FlattenedJws {
        protected: segments[0].to_owned(),
        payload: segments[1].to_owned(),
        signature: segments[2].to_owned(),
        header: None,
    };
    flattened::verify(&jws, verifier, None, options)
}
