/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Base64url and header-JSON plumbing shared by every pipeline. The
//! decode helpers carry a field label so shape errors name the part of
//! the container that was wrong.

use crate::error::{Container, Result};
use crate::JsonObject;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

pub(crate) fn b64_encode(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode a field that must be present.
pub(crate) fn b64_decode_required(
    container: Container,
    value: Option<&str>,
    label: &str,
) -> Result<Vec<u8>> {
    let value = value.ok_or_else(|| container.invalid(format!("{label} is missing")))?;
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| container.invalid(format!("{label} is not valid base64url")))
}

/// Decode a field that may be absent. An absent field is `None`, a
/// present-but-undecodable one is an error.
pub(crate) fn b64_decode_optional(
    container: Container,
    value: Option<&str>,
    label: &str,
) -> Result<Option<Vec<u8>>> {
    value
        .map(|v| {
            URL_SAFE_NO_PAD
                .decode(v)
                .map_err(|_| container.invalid(format!("{label} is not valid base64url")))
        })
        .transpose()
}

/// Parse decoded bytes as a JSON object (and nothing but an object).
pub(crate) fn parse_json_object(
    container: Container,
    data: &[u8],
    label: &str,
) -> Result<JsonObject> {
    let value: serde_json::Value = serde_json::from_slice(data)
        .map_err(|_| container.invalid(format!("{label} is not valid JSON")))?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(container.invalid(format!("{label} is not a JSON object"))),
    }
}

/// Serialize a header object and base64url it, yielding the wire form of
/// a protected header.
pub(crate) fn encode_protected_header(
    container: Container,
    header: &JsonObject,
) -> Result<String> {
    let json = serde_json::to_vec(header)
        .map_err(|_| container.invalid("could not serialize the protected header"))?;
    Ok(b64_encode(json))
}

#[test]
fn test_required_decode() {
    assert_eq!(
        b64_decode_required(Container::Jwe, Some("aGVsbG8"), "iv").unwrap(),
        b"hello"
    );
    assert_eq!(
        b64_decode_required(Container::Jwe, None, "iv")
            .unwrap_err()
            .to_string(),
        "Invalid JWE: iv is missing"
    );
    assert_eq!(
        b64_decode_required(Container::Jws, Some("a?b"), "signature")
            .unwrap_err()
            .to_string(),
        "Invalid JWS: signature is not valid base64url"
    );
    // Standard-alphabet padding is not valid base64url here.
    assert!(b64_decode_required(Container::Jwe, Some("aGVsbG8="), "iv").is_err());
}

#[test]
fn test_optional_decode() {
    assert_eq!(
        b64_decode_optional(Container::Jwe, None, "aad").unwrap(),
        None
    );
    assert_eq!(
        b64_decode_optional(Container::Jwe, Some("aGVsbG8"), "aad").unwrap(),
        Some(b"hello".to_vec())
    );
    assert!(b64_decode_optional(Container::Jwe, Some("!!"), "aad").is_err());
}

#[test]
fn test_parse_json_object() {
    assert_eq!(
        parse_json_object(Container::Jwe, br#"{"alg":"ECDH-ES"}"#, "protected header")
            .unwrap()
            .get("alg")
            .unwrap(),
        "ECDH-ES"
    );
    assert_eq!(
        parse_json_object(Container::Jwe, b"[1,2]", "protected header")
            .unwrap_err()
            .to_string(),
        "Invalid JWE: protected header is not a JSON object"
    );
    assert!(parse_json_object(Container::Jwe, b"{", "protected header").is_err());
}
