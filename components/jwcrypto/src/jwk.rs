/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The subset of JSON Web Key (RFC7517) this crate deals in: elliptic
//! curve keys ("EC") and octet key pairs ("OKP", RFC8037). Conversion to
//! and from the raw byte forms the crypto backend consumes lives here
//! too - the backend itself knows nothing about JWKs.

use crate::codec;
use crate::error::{Container, JwCryptoError, Result};
use serde_derive::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Defines a key used by the encryption and signature operations in this
/// crate.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Jwk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(flatten)]
    pub key_parameters: JwkKeyParameters,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kty")]
pub enum JwkKeyParameters {
    /// A point on one of the NIST curves or secp256k1.
    EC(EcKeyParameters),
    /// An RFC8037 octet key pair (Ed25519 or X25519) - a single
    /// coordinate rather than an x/y pair.
    OKP(OkpKeyParameters),
}

/// Key params specific to EC keys.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EcKeyParameters {
    pub crv: String,
    pub x: String,
    pub y: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

/// Key params specific to OKP keys.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct OkpKeyParameters {
    pub crv: String,
    pub x: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

impl Jwk {
    /// Create a fresh private key on one of the ECDH-ES curves
    /// (P-256, P-384, P-521 or X25519).
    pub fn new_ecdh_key(crv: &str, kid: Option<String>) -> std::result::Result<Self, JwCryptoError> {
        let curve = jose_crypto::agreement::Curve::from_name(crv)
            .ok_or_else(|| JwCryptoError::not_supported(format!("crv '{crv}'")))?;
        let key_pair = jose_crypto::agreement::EphemeralKeyPair::generate(curve)?;
        let public_key = key_pair.public_key().to_bytes()?;
        let (private_key, _) = key_pair.split();
        let mut jwk = from_raw_public_key(crv, curve.is_octet_key_pair(), &public_key, kid);
        jwk.set_private_scalar(&private_key.to_bytes());
        Ok(jwk)
    }

    /// Create a fresh private key on one of the signature curves
    /// (P-256, P-384, P-521, secp256k1 or Ed25519).
    pub fn new_signing_key(
        crv: &str,
        kid: Option<String>,
    ) -> std::result::Result<Self, JwCryptoError> {
        let curve = jose_crypto::signature::Curve::from_name(crv)
            .ok_or_else(|| JwCryptoError::not_supported(format!("crv '{crv}'")))?;
        let private_key = curve.generate_private_key()?;
        let public_key = curve.compute_public_key(&private_key)?;
        let mut jwk = from_raw_public_key(crv, curve.is_octet_key_pair(), &public_key, kid);
        jwk.set_private_scalar(&private_key);
        Ok(jwk)
    }

    /// The public half of this key - the same JWK with the private
    /// scalar stripped.
    pub fn to_public(&self) -> Jwk {
        let mut public = self.clone();
        match &mut public.key_parameters {
            JwkKeyParameters::EC(params) => params.d = None,
            JwkKeyParameters::OKP(params) => params.d = None,
        }
        public
    }

    pub fn crv(&self) -> &str {
        match &self.key_parameters {
            JwkKeyParameters::EC(params) => &params.crv,
            JwkKeyParameters::OKP(params) => &params.crv,
        }
    }

    pub fn is_private(&self) -> bool {
        match &self.key_parameters {
            JwkKeyParameters::EC(params) => params.d.is_some(),
            JwkKeyParameters::OKP(params) => params.d.is_some(),
        }
    }

    fn set_private_scalar(&mut self, scalar: &[u8]) {
        let d = Some(codec::b64_encode(scalar));
        match &mut self.key_parameters {
            JwkKeyParameters::EC(params) => params.d = d,
            JwkKeyParameters::OKP(params) => params.d = d,
        }
    }
}

/// Extract the wire-form public key: `0x04 || x || y` for EC keys, the
/// raw coordinate for OKP keys. Coordinate lengths are checked against
/// the curve.
pub(crate) fn to_raw_public_key(
    container: Container,
    jwk: &Jwk,
    octet_key_pair: bool,
    coordinate_len: usize,
) -> Result<Vec<u8>> {
    match (&jwk.key_parameters, octet_key_pair) {
        (JwkKeyParameters::EC(params), false) => {
            let x = decode_coordinate(container, &params.x, "x", coordinate_len)?;
            let y = decode_coordinate(container, &params.y, "y", coordinate_len)?;
            let mut public_key = Vec::with_capacity(1 + 2 * coordinate_len);
            public_key.push(0x04);
            public_key.extend_from_slice(&x);
            public_key.extend_from_slice(&y);
            Ok(public_key)
        }
        (JwkKeyParameters::OKP(params), true) => {
            decode_coordinate(container, &params.x, "x", coordinate_len)
        }
        (JwkKeyParameters::EC(_), true) => Err(container.invalid("not an OKP key")),
        (JwkKeyParameters::OKP(_), false) => Err(container.invalid("not an EC key")),
    }
}

/// Extract the raw private scalar, checking its length against the
/// curve. The scalar is wiped when the result is dropped.
pub(crate) fn to_raw_private_key(
    container: Container,
    jwk: &Jwk,
    octet_key_pair: bool,
    scalar_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    match (&jwk.key_parameters, octet_key_pair) {
        (JwkKeyParameters::EC(params), false) => {
            let d = params
                .d
                .as_deref()
                .ok_or_else(|| container.invalid("the JWK has no private key parameter d"))?;
            Ok(Zeroizing::new(decode_coordinate(container, d, "d", scalar_len)?))
        }
        (JwkKeyParameters::OKP(params), true) => {
            let d = params
                .d
                .as_deref()
                .ok_or_else(|| container.invalid("the JWK has no private key parameter d"))?;
            Ok(Zeroizing::new(decode_coordinate(container, d, "d", scalar_len)?))
        }
        (JwkKeyParameters::EC(_), true) => Err(container.invalid("not an OKP key")),
        (JwkKeyParameters::OKP(_), false) => Err(container.invalid("not an EC key")),
    }
}

/// Build a public JWK from the wire-form public key bytes.
pub(crate) fn from_raw_public_key(
    crv: &str,
    octet_key_pair: bool,
    public_key: &[u8],
    kid: Option<String>,
) -> Jwk {
    let key_parameters = if octet_key_pair {
        JwkKeyParameters::OKP(OkpKeyParameters {
            crv: crv.to_owned(),
            x: codec::b64_encode(public_key),
            d: None,
        })
    } else {
        // Uncompressed form (see SECG SEC1 section 2.3.3): first byte is
        // 4, then the two equal-length coordinates.
        assert_eq!(public_key[0], 0x04);
        let coordinate_len = (public_key.len() - 1) / 2;
        let x = &public_key[1..1 + coordinate_len];
        let y = &public_key[1 + coordinate_len..];
        JwkKeyParameters::EC(EcKeyParameters {
            crv: crv.to_owned(),
            x: codec::b64_encode(x),
            y: codec::b64_encode(y),
            d: None,
        })
    };
    Jwk {
        kid,
        key_parameters,
    }
}

fn decode_coordinate(
    container: Container,
    value: &str,
    label: &str,
    expected_len: usize,
) -> Result<Vec<u8>> {
    let bytes = codec::b64_decode_required(container, Some(value), label)?;
    if bytes.len() != expected_len {
        return Err(container.invalid(format!("{label} must be {expected_len} bytes long")));
    }
    Ok(bytes)
}

#[test]
fn test_jwk_ec_deser_with_kid() {
    let jwk = Jwk {
        kid: Some("the-key-id".to_string()),
        key_parameters: JwkKeyParameters::EC(EcKeyParameters {
            crv: "CRV".to_string(),
            x: "X".to_string(),
            y: "Y".to_string(),
            d: None,
        }),
    };
    let jstr = serde_json::to_string(&jwk).unwrap();
    // Make sure all the tags get the right info by checking the literal string.
    assert_eq!(
        jstr,
        r#"{"kid":"the-key-id","kty":"EC","crv":"CRV","x":"X","y":"Y"}"#
    );
    // And check it round-trips.
    assert_eq!(jwk, serde_json::from_str(&jstr).unwrap());
}

#[test]
fn test_jwk_okp_deser_no_kid() {
    let jwk = Jwk {
        kid: None,
        key_parameters: JwkKeyParameters::OKP(OkpKeyParameters {
            crv: "Ed25519".to_string(),
            x: "X".to_string(),
            d: None,
        }),
    };
    let jstr = serde_json::to_string(&jwk).unwrap();
    assert_eq!(jstr, r#"{"kty":"OKP","crv":"Ed25519","x":"X"}"#);
    assert_eq!(jwk, serde_json::from_str(&jstr).unwrap());
}

#[test]
fn test_jwk_rejects_unknown_kty() {
    assert!(serde_json::from_str::<Jwk>(r#"{"kty":"oct","k":"AAECAw"}"#).is_err());
}

#[test]
fn test_new_ecdh_key() {
    for crv in ["P-256", "P-384", "P-521", "X25519"] {
        let jwk = Jwk::new_ecdh_key(crv, Some("enc-key".into())).unwrap();
        assert_eq!(jwk.crv(), crv);
        assert_eq!(jwk.kid.as_deref(), Some("enc-key"));
        assert!(jwk.is_private());
        let public = jwk.to_public();
        assert!(!public.is_private());
        assert_eq!(public.crv(), crv);
    }
    assert!(matches!(
        Jwk::new_ecdh_key("secp256k1", None),
        Err(JwCryptoError::NotSupported(_))
    ));
}

#[test]
fn test_new_signing_key() {
    for crv in ["P-256", "P-384", "P-521", "secp256k1", "Ed25519"] {
        let jwk = Jwk::new_signing_key(crv, None).unwrap();
        assert_eq!(jwk.crv(), crv);
        assert!(jwk.is_private());
    }
    assert!(matches!(
        Jwk::new_signing_key("X25519", None),
        Err(JwCryptoError::NotSupported(_))
    ));
}

#[test]
fn test_raw_round_trip() {
    let jwk = Jwk::new_ecdh_key("P-256", None).unwrap();
    let public_key = to_raw_public_key(Container::Jwe, &jwk, false, 32).unwrap();
    assert_eq!(public_key.len(), 65);
    assert_eq!(public_key[0], 0x04);
    let rebuilt = from_raw_public_key("P-256", false, &public_key, None);
    assert_eq!(rebuilt, jwk.to_public());
    let private_key = to_raw_private_key(Container::Jwe, &jwk, false, 32).unwrap();
    assert_eq!(private_key.len(), 32);
}

#[test]
fn test_coordinate_length_is_checked() {
    let mut jwk = Jwk::new_ecdh_key("P-256", None).unwrap();
    if let JwkKeyParameters::EC(params) = &mut jwk.key_parameters {
        params.x = codec::b64_encode([0u8; 31]);
    }
    let err = to_raw_public_key(Container::Jwe, &jwk, false, 32).unwrap_err();
    assert_eq!(err.to_string(), "Invalid JWE: x must be 32 bytes long");
}

#[test]
fn test_public_key_has_no_private_scalar() {
    let jwk = Jwk::new_signing_key("Ed25519", None).unwrap();
    let public = jwk.to_public();
    assert!(matches!(
        to_raw_private_key(Container::Jws, &public, true, 32),
        Err(JwCryptoError::InvalidJws(_))
    ));
}
