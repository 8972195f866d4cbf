/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! A library for using JSON Object Signing and Encryption (JOSE) data
//! formats - JWE (https://tools.ietf.org/html/rfc7516), JWS
//! (https://tools.ietf.org/html/rfc7515) and the JWK subset they need -
//! in both the flattened JSON serialization and the compact one. The
//! encryption and signature primitives are done by [jose_crypto]; this
//! crate is the protocol state machine around them: header merging and
//! the `crit` rule, ECDH-ES with the Concat KDF, AAD construction, the
//! RFC7797 `b64` option, and the RFC7516 section 11.5 posture that a
//! decryption failure never tells an attacker why.

// Theoretically, everything done in this crate could and should be done
// by an existing JOSE library. However, none of the rust ones we could
// find handle ECDH-ES direct key agreement together with the flattened
// serialization and RFC7797, and the API choices made by their authors
// make those hard to add from outside. So this *is* our JOSE library.

pub use crate::alg::{Algorithm, EncryptionAlgorithm, SignatureAlgorithm};
pub use crate::error::JwCryptoError;
pub use crate::jwk::{EcKeyParameters, Jwk, JwkKeyParameters, OkpKeyParameters};

mod alg;
mod codec;
mod ecdh;
mod error;
mod header;
pub mod jwe;
mod jwk;
pub mod jws;
mod kdf;

/// A JSON object, as used for every header position. Arbitrary
/// extension parameters ride along unmodeled.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;
