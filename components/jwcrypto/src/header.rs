/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! JOSE header composition. A token carries up to three header
//! positions (protected, shared unprotected, per-recipient unprotected
//! for JWE; two for JWS); they merge into a single JOSE header with the
//! parameter names required to be pairwise disjoint, which makes merge
//! precedence a layout detail. The `crit` rule from RFC7515 section 4.1.11
//! is enforced here as well.

use crate::error::{Container, JwCryptoError, Result};
use crate::JsonObject;
use std::collections::{BTreeMap, BTreeSet};

/// Merge the header positions into the JOSE header. The protected
/// header must be present and non-empty; no parameter name may appear in
/// more than one position.
pub(crate) fn merge_headers(
    container: Container,
    protected: Option<&JsonObject>,
    shared_unprotected: Option<&JsonObject>,
    per_recipient_unprotected: Option<&JsonObject>,
) -> Result<JsonObject> {
    let protected = match protected {
        Some(header) if !header.is_empty() => header,
        _ => {
            return Err(container.invalid("the protected header must be present and non-empty"));
        }
    };
    let positions = [
        Some(protected),
        shared_unprotected,
        per_recipient_unprotected,
    ];
    for (index, position) in positions.iter().enumerate() {
        for other in positions.iter().skip(index + 1) {
            if let (Some(position), Some(other)) = (position, other) {
                if let Some(name) = position.keys().find(|name| other.contains_key(*name)) {
                    return Err(container.invalid(format!(
                        "header parameter '{name}' appears in more than one position"
                    )));
                }
            }
        }
    }
    let mut merged = JsonObject::new();
    // Lowest precedence first, though disjointness means nothing is ever
    // actually overwritten.
    for position in [per_recipient_unprotected, shared_unprotected, Some(protected)]
        .into_iter()
        .flatten()
    {
        for (name, value) in position {
            merged.insert(name.clone(), value.clone());
        }
    }
    Ok(merged)
}

/// The `zip` parameter (compressed plaintext) is rejected wholesale, in
/// whichever position it shows up.
pub(crate) fn reject_zip(positions: &[Option<&JsonObject>]) -> Result<()> {
    if positions.iter().flatten().any(|h| h.contains_key("zip")) {
        return Err(JwCryptoError::not_supported("the zip header parameter"));
    }
    Ok(())
}

/// Enforce the `crit` rule and return the set of recognized critical
/// parameter names. `defaults` is the library's built-in recognized set,
/// `recognized_options` the caller-supplied extension set; both map a
/// parameter name to whether it must live in the protected header.
pub(crate) fn validate_crit(
    container: Container,
    defaults: &[(&str, bool)],
    recognized_options: &BTreeMap<String, bool>,
    protected: &JsonObject,
    merged: &JsonObject,
) -> Result<BTreeSet<String>> {
    if !merged.contains_key("crit") {
        return Ok(BTreeSet::new());
    }
    let crit = protected
        .get("crit")
        .ok_or_else(|| container.invalid("the crit header parameter MUST be integrity protected"))?;
    let names: Vec<&str> = crit
        .as_array()
        .filter(|list| !list.is_empty())
        .and_then(|list| {
            list.iter()
                .map(|v| v.as_str().filter(|s| !s.is_empty()))
                .collect()
        })
        .ok_or_else(|| {
            container.invalid("crit must be a non-empty array of non-empty strings")
        })?;
    let mut recognized: BTreeMap<&str, bool> = defaults.iter().copied().collect();
    for (name, integrity_protected) in recognized_options {
        recognized.insert(name.as_str(), *integrity_protected);
    }
    let mut result = BTreeSet::new();
    for name in names {
        let integrity_protected = *recognized.get(name).ok_or_else(|| {
            container.invalid(format!("critical header parameter '{name}' is not recognized"))
        })?;
        if !merged.contains_key(name) {
            return Err(container.invalid(format!(
                "critical header parameter '{name}' is missing from the JOSE header"
            )));
        }
        if integrity_protected && !protected.contains_key(name) {
            return Err(container.invalid(format!(
                "critical header parameter '{name}' MUST be integrity protected"
            )));
        }
        result.insert(name.to_owned());
    }
    Ok(result)
}

#[cfg(test)]
fn obj(json: &str) -> JsonObject {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_merge_requires_nonempty_protected() {
    assert!(merge_headers(Container::Jwe, None, None, None).is_err());
    assert!(merge_headers(Container::Jwe, Some(&JsonObject::new()), None, None).is_err());
    let merged = merge_headers(Container::Jwe, Some(&obj(r#"{"alg":"ECDH-ES"}"#)), None, None)
        .unwrap();
    assert_eq!(merged.get("alg").unwrap(), "ECDH-ES");
}

#[test]
fn test_merge_disjointness() {
    let protected = obj(r#"{"alg":"ECDH-ES","enc":"A256GCM"}"#);
    let shared = obj(r#"{"kid":"k1"}"#);
    let per_recipient = obj(r#"{"cty":"text/plain"}"#);
    let merged = merge_headers(
        Container::Jwe,
        Some(&protected),
        Some(&shared),
        Some(&per_recipient),
    )
    .unwrap();
    assert_eq!(merged.len(), 4);

    // The same name anywhere twice is an error, whichever pair collides.
    let clash = obj(r#"{"kid":"k2"}"#);
    assert!(merge_headers(Container::Jwe, Some(&protected), Some(&shared), Some(&clash)).is_err());
    let clash = obj(r#"{"enc":"A128GCM"}"#);
    let err = merge_headers(Container::Jwe, Some(&protected), Some(&clash), None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid JWE: header parameter 'enc' appears in more than one position"
    );
}

#[test]
fn test_reject_zip() {
    let ok = obj(r#"{"alg":"ECDH-ES"}"#);
    let zipped = obj(r#"{"zip":"DEF"}"#);
    assert!(reject_zip(&[Some(&ok), None, None]).is_ok());
    assert!(matches!(
        reject_zip(&[Some(&ok), Some(&zipped), None]),
        Err(JwCryptoError::NotSupported(_))
    ));
}

#[test]
fn test_crit_absent_is_fine() {
    let protected = obj(r#"{"alg":"ES256"}"#);
    let recognized = validate_crit(
        Container::Jws,
        &[("b64", true)],
        &BTreeMap::new(),
        &protected,
        &protected,
    )
    .unwrap();
    assert!(recognized.is_empty());
}

#[test]
fn test_crit_must_be_protected() {
    let protected = obj(r#"{"alg":"ES256","b64":false}"#);
    let merged = obj(r#"{"alg":"ES256","b64":false,"crit":["b64"]}"#);
    let err = validate_crit(
        Container::Jws,
        &[("b64", true)],
        &BTreeMap::new(),
        &protected,
        &merged,
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid JWS: the crit header parameter MUST be integrity protected"
    );
}

#[test]
fn test_crit_shape() {
    let merged = obj(r#"{"alg":"ES256","b64":false,"crit":["b64"]}"#);
    for bad in [r#"{"crit":[]}"#, r#"{"crit":"b64"}"#, r#"{"crit":[""]}"#, r#"{"crit":[1]}"#] {
        let protected = obj(bad);
        assert!(validate_crit(
            Container::Jws,
            &[("b64", true)],
            &BTreeMap::new(),
            &protected,
            &merged,
        )
        .is_err());
    }
}

#[test]
fn test_crit_recognition() {
    let protected = obj(r#"{"alg":"ES256","b64":false,"crit":["b64"]}"#);
    let recognized = validate_crit(
        Container::Jws,
        &[("b64", true)],
        &BTreeMap::new(),
        &protected,
        &protected,
    )
    .unwrap();
    assert!(recognized.contains("b64"));

    // A JWE has an empty default set, so the same header fails there.
    assert!(matches!(
        validate_crit(Container::Jwe, &[], &BTreeMap::new(), &protected, &protected),
        Err(JwCryptoError::InvalidJwe(_))
    ));

    // ... unless the caller opts the name in.
    let mut options = BTreeMap::new();
    options.insert("b64".to_string(), true);
    assert!(validate_crit(Container::Jwe, &[], &options, &protected, &protected).is_ok());
}

#[test]
fn test_crit_name_must_be_in_header() {
    let protected = obj(r#"{"alg":"ES256","crit":["b64"]}"#);
    let err = validate_crit(
        Container::Jws,
        &[("b64", true)],
        &BTreeMap::new(),
        &protected,
        &protected,
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid JWS: critical header parameter 'b64' is missing from the JOSE header"
    );
}

#[test]
fn test_crit_integrity_protection_flag() {
    // "exp" recognized but not integrity-protected: may live unprotected.
    let mut options = BTreeMap::new();
    options.insert("exp".to_string(), false);
    let protected = obj(r#"{"alg":"ES256","crit":["exp"]}"#);
    let merged = obj(r#"{"alg":"ES256","crit":["exp"],"exp":123}"#);
    assert!(validate_crit(Container::Jws, &[], &options, &protected, &merged).is_ok());

    // Flip the flag and the same layout is rejected.
    options.insert("exp".to_string(), true);
    let err = validate_crit(Container::Jws, &[], &options, &protected, &merged).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid JWS: critical header parameter 'exp' MUST be integrity protected"
    );
}
