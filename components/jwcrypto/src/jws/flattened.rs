/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The flattened JWS JSON serialization (RFC7515 section 7.2.2). The
//! signing input is `BASE64URL(protected) || '.' || payload`, where the
//! payload contribution is its base64url form under the default
//! `b64=true` and the raw bytes under RFC7797 `b64=false`. In the latter
//! case the `payload` member stays empty and the bytes travel out of
//! band.

use super::{SignOptions, VerifyOptions};
use crate::alg::SignatureAlgorithm;
use crate::codec;
use crate::error::{Container, JwCryptoError, Result};
use crate::header;
use crate::jwk::{self, Jwk};
use crate::JsonObject;
use jose_crypto::signature::Curve;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// The default recognized critical parameters for JWS: RFC7797's `b64`,
/// which must always be integrity protected.
const DEFAULT_CRIT: &[(&str, bool)] = &[("b64", true)];

/// A flattened JWS, ready for the wire.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlattenedJws {
    pub protected: String,
    pub payload: String,
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<JsonObject>,
}

impl FromStr for FlattenedJws {
    type Err = JwCryptoError;
    fn from_str(value: &str) -> Result<Self> {
        serde_json::from_str(value)
            .map_err(|_| Container::Jws.invalid("not a valid flattened JWS"))
    }
}

/// What a successful verification hands back.
#[derive(Debug)]
pub struct VerifiedJws {
    pub payload: Vec<u8>,
    pub protected_header: JsonObject,
    pub unprotected_header: Option<JsonObject>,
}

/// Builds up a flattened JWS signature. Both setters may be called at
/// most once - the builder is a single-use snapshot, consumed by
/// [FlattenedSigner::sign].
#[derive(Debug, Default)]
pub struct FlattenedSigner {
    protected_header: Option<JsonObject>,
    unprotected_header: Option<JsonObject>,
}

impl FlattenedSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the integrity-protected header. It must at least carry `alg`.
    pub fn protected_header(mut self, header: JsonObject) -> Result<Self> {
        if self.protected_header.is_some() {
            return Err(Container::Jws.invalid("protected header may only be set once"));
        }
        self.protected_header = Some(header);
        Ok(self)
    }

    /// Set the unprotected header.
    pub fn unprotected_header(mut self, header: JsonObject) -> Result<Self> {
        if self.unprotected_header.is_some() {
            return Err(Container::Jws.invalid("unprotected header may only be set once"));
        }
        self.unprotected_header = Some(header);
        Ok(self)
    }

    /// Sign `payload` with `signer` (a private JWK on one of the
    /// signature curves), producing a flattened JWS.
    pub fn sign(self, payload: &[u8], signer: &Jwk, options: &SignOptions) -> Result<FlattenedJws> {
        let container = Container::Jws;
        let curve = signature_curve(signer.crv())?;
        let private_key = jwk::to_raw_private_key(
            container,
            signer,
            curve.is_octet_key_pair(),
            curve.scalar_len(),
        )?;

        let merged = header::merge_headers(
            container,
            self.protected_header.as_ref(),
            self.unprotected_header.as_ref(),
            None,
        )?;
        let protected = self.protected_header.unwrap_or_default();
        let recognized =
            header::validate_crit(container, DEFAULT_CRIT, &options.crit, &protected, &merged)?;
        let b64 = resolve_b64(&protected, &recognized)?;
        let alg = required_string_parameter(&merged, "alg")?;
        check_key_algorithm_agreement(&alg, curve, None)?;

        // Everything below is past input validation; failures collapse
        // into one uniform error with the cause only logged.
        sign_validated(payload, &private_key, curve, b64, &protected)
            .map(|(payload_field, signature, protected_b64)| FlattenedJws {
                protected: protected_b64,
                payload: payload_field,
                signature,
                header: self.unprotected_header,
            })
            .map_err(|error| {
                log::warn!("JWS signing failed: {error}");
                container.invalid("failed to sign payload")
            })
    }
}

fn sign_validated(
    payload: &[u8],
    private_key: &[u8],
    curve: Curve,
    b64: bool,
    protected: &JsonObject,
) -> Result<(String, String, String)> {
    let protected_b64 = codec::encode_protected_header(Container::Jws, protected)?;
    let mut target = Vec::with_capacity(protected_b64.len() + 1 + payload.len() * 2);
    target.extend_from_slice(protected_b64.as_bytes());
    target.push(b'.');
    let payload_field = if b64 {
        let encoded = codec::b64_encode(payload);
        target.extend_from_slice(encoded.as_bytes());
        encoded
    } else {
        target.extend_from_slice(payload);
        String::new()
    };
    let signature = curve.sign(private_key, &target)?;
    Ok((payload_field, codec::b64_encode(signature), protected_b64))
}

/// Verify a flattened JWS against `verifier` (a public JWK).
///
/// With `b64=false` the payload is not part of the container; pass the
/// bytes as `detached_payload`. A well-formed token whose signature does
/// not check out fails with the distinct
/// [JwCryptoError::SignatureVerificationFailed], never the generic
/// invalid error - callers get to tell a forgery from a shape problem.
pub fn verify(
    jws: &FlattenedJws,
    verifier: &Jwk,
    detached_payload: Option<&[u8]>,
    options: &VerifyOptions,
) -> Result<VerifiedJws> {
    let container = Container::Jws;
    let curve = signature_curve(verifier.crv())?;
    let public_key = jwk::to_raw_public_key(
        container,
        verifier,
        curve.is_octet_key_pair(),
        curve.scalar_len(),
    )?;

    let signature = codec::b64_decode_required(container, Some(&jws.signature), "signature")?;
    let protected_bytes =
        codec::b64_decode_required(container, Some(&jws.protected), "protected header")?;
    let protected = codec::parse_json_object(container, &protected_bytes, "protected header")?;
    let merged = header::merge_headers(container, Some(&protected), jws.header.as_ref(), None)?;
    let recognized =
        header::validate_crit(container, DEFAULT_CRIT, &options.crit, &protected, &merged)?;
    let b64 = resolve_b64(&protected, &recognized)?;
    let alg = required_string_parameter(&merged, "alg")?;
    check_key_algorithm_agreement(&alg, curve, options.algorithms.as_deref())?;

    // Build the verify target exactly the way the signing side built its
    // sign target.
    let decoded_payload = match (b64, detached_payload) {
        (true, None) => codec::b64_decode_required(container, Some(&jws.payload), "payload")?,
        (true, Some(_)) => {
            return Err(
                container.invalid("the payload must be a base64url string when b64 is true")
            );
        }
        (false, Some(payload)) => {
            if !jws.payload.is_empty() {
                return Err(container.invalid("the payload must travel detached when b64 is false"));
            }
            payload.to_vec()
        }
        (false, None) => {
            return Err(container.invalid("a detached payload is required when b64 is false"));
        }
    };
    let mut target = Vec::with_capacity(jws.protected.len() + 1 + decoded_payload.len() * 2);
    target.extend_from_slice(jws.protected.as_bytes());
    target.push(b'.');
    if b64 {
        target.extend_from_slice(jws.payload.as_bytes());
    } else {
        target.extend_from_slice(&decoded_payload);
    }

    let verified = curve
        .verify(&public_key, &target, &signature)
        .map_err(|_| container.invalid("the verification key is not a valid point"))?;
    if !verified {
        return Err(JwCryptoError::SignatureVerificationFailed);
    }
    Ok(VerifiedJws {
        payload: decoded_payload,
        protected_header: protected,
        unprotected_header: jws.header.clone(),
    })
}

pub(crate) fn signature_curve(crv: &str) -> Result<Curve> {
    Curve::from_name(crv).ok_or_else(|| JwCryptoError::not_supported(format!("crv '{crv}'")))
}

/// RFC7797: `b64` only takes effect when the token critically declares
/// it, and then it must come from the protected header, defaulting to
/// true. Everything else signs the ordinary way.
fn resolve_b64(protected: &JsonObject, recognized_crit: &BTreeSet<String>) -> Result<bool> {
    if !recognized_crit.contains("b64") {
        return Ok(true);
    }
    match protected.get("b64") {
        None => Ok(true),
        Some(serde_json::Value::Bool(value)) => Ok(*value),
        Some(_) => Err(Container::Jws.invalid("b64 must be a boolean")),
    }
}

fn check_key_algorithm_agreement(
    alg: &str,
    curve: Curve,
    allow_list: Option<&[String]>,
) -> Result<()> {
    if let Some(allowed) = allow_list {
        if !allowed.iter().any(|a| a == alg) {
            return Err(Container::Jws.invalid(format!("algorithm '{alg}' is not allowed")));
        }
    }
    if SignatureAlgorithm::from_name(alg).is_none() {
        return Err(JwCryptoError::not_supported(format!("alg '{alg}'")));
    }
    if alg != curve.algorithm_name() {
        return Err(Container::Jws.invalid(format!(
            "alg '{alg}' does not match the key's curve (expected '{}')",
            curve.algorithm_name()
        )));
    }
    Ok(())
}

fn required_string_parameter(header: &JsonObject, name: &str) -> Result<String> {
    header
        .get(name)
        .and_then(|value| value.as_str())
        .map(str::to_owned)
        .ok_or_else(|| Container::Jws.invalid(format!("{name} is missing from the JOSE header")))
}
