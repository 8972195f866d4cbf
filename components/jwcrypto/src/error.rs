/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, JwCryptoError>;

/// The failures a caller of this crate can observe. There are three
/// categories: invalid input (flavored by container so a JWS problem is
/// never reported as a JWE one), inputs naming an algorithm or parameter
/// we do not handle, and - for JWS verification only - a well-formed
/// token whose signature simply does not check out. Decryption collapses
/// everything after shape validation into a single invalid error; see
/// the `jwe` module.
#[derive(Error, Debug)]
pub enum JwCryptoError {
    #[error("Invalid JWE: {0}")]
    InvalidJwe(String),
    #[error("Invalid JWS: {0}")]
    InvalidJws(String),
    #[error("Not supported: {0}")]
    NotSupported(String),
    #[error("Signature verification failed")]
    SignatureVerificationFailed,
    /// Raised by the key-generation helpers on [crate::Jwk]. The four
    /// container operations never let this escape; their pipelines remap
    /// every backend failure to the uniform errors described above.
    #[error("Crypto error: {0}")]
    CryptoError(#[from] jose_crypto::Error),
}

impl JwCryptoError {
    pub(crate) fn not_supported(what: impl std::fmt::Display) -> Self {
        JwCryptoError::NotSupported(what.to_string())
    }
}

/// Which container an operation is working on. Shared validation helpers
/// (codec, header merging, `crit`) take this so they raise the correctly
/// flavored invalid error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Container {
    Jwe,
    Jws,
}

impl Container {
    pub(crate) fn invalid(self, msg: impl std::fmt::Display) -> JwCryptoError {
        match self {
            Container::Jwe => JwCryptoError::InvalidJwe(msg.to_string()),
            Container::Jws => JwCryptoError::InvalidJws(msg.to_string()),
        }
    }
}

#[test]
fn test_error_flavors() {
    assert_eq!(
        Container::Jwe.invalid("nope").to_string(),
        "Invalid JWE: nope"
    );
    assert_eq!(
        Container::Jws.invalid("nope").to_string(),
        "Invalid JWS: nope"
    );
    assert_eq!(
        JwCryptoError::not_supported("zip").to_string(),
        "Not supported: zip"
    );
}
