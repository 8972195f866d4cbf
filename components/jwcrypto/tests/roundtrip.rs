/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! End-to-end exercises of the public API, the way an embedding
//! application would drive it: JSON in, JSON out.

use jwcrypto::jwe::{
    CompactEncrypter, FlattenedEncrypter, FlattenedJwe, KeyManagementParameters,
};
use jwcrypto::jws::{CompactSigner, FlattenedJws, FlattenedSigner};
use jwcrypto::{JsonObject, Jwk, JwCryptoError};

fn obj(json: &str) -> JsonObject {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_jwe_wire_format_round_trips_through_json() {
    let recipient = Jwk::new_ecdh_key("P-256", Some("door-key".into())).unwrap();
    let jwe = FlattenedEncrypter::new()
        .protected_header(obj(r#"{"alg":"ECDH-ES","enc":"A128CBC-HS256"}"#))
        .unwrap()
        .key_management_parameters(KeyManagementParameters {
            apu: Some(b"Alice".to_vec()),
            apv: Some(b"Bob".to_vec()),
        })
        .unwrap()
        .additional_authenticated_data(b"route: stage".to_vec())
        .encrypt(b"the plan", &recipient.to_public(), &Default::default())
        .unwrap();

    // Over the wire and back.
    let wire = serde_json::to_string(&jwe).unwrap();
    let parsed: FlattenedJwe = wire.parse().unwrap();
    let decrypted = jwcrypto::jwe::decrypt(&parsed, &recipient, &Default::default()).unwrap();
    assert_eq!(decrypted.plaintext, b"the plan");
    assert_eq!(
        decrypted.additional_authenticated_data.as_deref(),
        Some(&b"route: stage"[..])
    );
}

#[test]
fn test_jws_wire_format_round_trips_through_json() {
    let signer = Jwk::new_signing_key("Ed25519", None).unwrap();
    let jws = FlattenedSigner::new()
        .protected_header(obj(r#"{"alg":"EdDSA"}"#))
        .unwrap()
        .sign(b"attest this", &signer, &Default::default())
        .unwrap();
    let wire = serde_json::to_string(&jws).unwrap();
    let parsed: FlattenedJws = wire.parse().unwrap();
    let verified =
        jwcrypto::jws::verify(&parsed, &signer.to_public(), None, &Default::default()).unwrap();
    assert_eq!(verified.payload, b"attest this");
}

#[test]
fn test_compact_jwe_and_jws_interoperate_with_flattened() {
    let recipient = Jwk::new_ecdh_key("X25519", None).unwrap();
    let compact = CompactEncrypter::new()
        .protected_header(obj(r#"{"alg":"ECDH-ES","enc":"A256GCM"}"#))
        .unwrap()
        .encrypt(b"projected", &recipient.to_public(), &Default::default())
        .unwrap();
    // Recast the compact token as a flattened object by hand.
    let segments: Vec<&str> = compact.split('.').collect();
    let flattened = FlattenedJwe {
        protected: segments[0].to_owned(),
        encrypted_key: None,
        iv: segments[2].to_owned(),
        ciphertext: segments[3].to_owned(),
        tag: segments[4].to_owned(),
        aad: None,
        unprotected: None,
        header: None,
    };
    let decrypted =
        jwcrypto::jwe::decrypt(&flattened, &recipient, &Default::default()).unwrap();
    assert_eq!(decrypted.plaintext, b"projected");

    let signer = Jwk::new_signing_key("P-521", None).unwrap();
    let compact = CompactSigner::new()
        .protected_header(obj(r#"{"alg":"ES512"}"#))
        .unwrap()
        .sign(b"projected", &signer, &Default::default())
        .unwrap();
    let verified =
        jwcrypto::jws::compact::verify(&compact, &signer.to_public(), &Default::default())
            .unwrap();
    assert_eq!(verified.payload, b"projected");
}

#[test]
fn test_decrypting_a_signature_is_a_type_error_not_a_panic() {
    let recipient = Jwk::new_ecdh_key("P-256", None).unwrap();
    let signer = Jwk::new_signing_key("P-256", None).unwrap();
    let jws = FlattenedSigner::new()
        .protected_header(obj(r#"{"alg":"ES256"}"#))
        .unwrap()
        .sign(b"not a jwe", &signer, &Default::default())
        .unwrap();
    // Shove the JWS segments into a JWE-shaped container; decryption
    // must fail cleanly.
    let hoax = FlattenedJwe {
        protected: jws.protected,
        encrypted_key: None,
        iv: jws.payload,
        ciphertext: jws.signature,
        tag: "AAAAAAAAAAAAAAAAAAAAAA".to_owned(),
        aad: None,
        unprotected: None,
        header: None,
    };
    assert!(matches!(
        jwcrypto::jwe::decrypt(&hoax, &recipient, &Default::default()),
        Err(JwCryptoError::InvalidJwe(_) | JwCryptoError::NotSupported(_))
    ));
}

#[test]
fn test_builders_are_consumed_by_the_terminal_operation() {
    // A builder is a single-use snapshot: the terminal operation takes
    // it by value, so reuse does not compile - which is the point. This
    // test just pins the behavior that two fresh builders with the same
    // inputs produce independently decryptable tokens.
    let recipient = Jwk::new_ecdh_key("P-256", None).unwrap();
    let header = obj(r#"{"alg":"ECDH-ES","enc":"A256GCM"}"#);
    let first = FlattenedEncrypter::new()
        .protected_header(header.clone())
        .unwrap()
        .encrypt(b"one", &recipient.to_public(), &Default::default())
        .unwrap();
    let second = FlattenedEncrypter::new()
        .protected_header(header)
        .unwrap()
        .encrypt(b"one", &recipient.to_public(), &Default::default())
        .unwrap();
    // Fresh ephemeral keys and IVs every time.
    assert_ne!(first.protected, second.protected);
    assert_ne!(first.ciphertext, second.ciphertext);
    assert_eq!(
        jwcrypto::jwe::decrypt(&first, &recipient, &Default::default())
            .unwrap()
            .plaintext,
        b"one"
    );
    assert_eq!(
        jwcrypto::jwe::decrypt(&second, &recipient, &Default::default())
            .unwrap()
            .plaintext,
        b"one"
    );
}
