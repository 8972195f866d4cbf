/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
    #[error("Invalid IV length: expected {expected} bytes, got {got}")]
    InvalidIvLength { expected: usize, got: usize },
    #[error("Invalid private key scalar")]
    InvalidPrivateKey,
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(&'static str),
    #[error("Ciphertext too short")]
    CiphertextTooShort,
    #[error("AEAD open failed")]
    OpenFailed,
    #[error("AEAD seal failed")]
    SealFailed,
    #[error("Signing failed")]
    SigningFailed,
    #[error("Slices are not equal")]
    SlicesNotEqual,
    #[error("Random number generator failure")]
    RngFailure,
}
