/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! JSON Web Encryption (RFC7516) with ECDH-ES direct key agreement, in
//! the flattened JSON serialization and the compact serialization. The
//! compact form is a thin projection over the flattened one.

pub mod compact;
pub mod flattened;

pub use compact::CompactEncrypter;
pub use flattened::{decrypt, DecryptedJwe, FlattenedEncrypter, FlattenedJwe};

use std::collections::BTreeMap;

/// Caller-requested key-agreement inputs: the PartyUInfo/PartyVInfo
/// values fed to the Concat KDF, at most 32 bytes each. They end up
/// base64url-encoded in the protected header.
#[derive(Debug, Default, Clone)]
pub struct KeyManagementParameters {
    pub apu: Option<Vec<u8>>,
    pub apv: Option<Vec<u8>>,
}

/// Options for [flattened::FlattenedEncrypter::encrypt] and
/// [compact::CompactEncrypter::encrypt].
#[derive(Debug, Default, Clone)]
pub struct EncryptOptions {
    /// Extension critical header parameters the caller understands,
    /// mapped to whether each must live in the protected header.
    pub crit: BTreeMap<String, bool>,
}

/// Options for [flattened::decrypt] and [compact::decrypt].
#[derive(Debug, Default, Clone)]
pub struct DecryptOptions {
    /// Extension critical header parameters the caller understands,
    /// mapped to whether each must live in the protected header.
    pub crit: BTreeMap<String, bool>,
    /// Allow-list for the key management algorithm. Without one, every
    /// supported algorithm is accepted but the PBES2 family is blocked.
    pub key_management_algorithms: Option<Vec<String>>,
    /// Allow-list for the content encryption algorithm. Without one,
    /// every supported algorithm is accepted.
    pub content_encryption_algorithms: Option<Vec<String>>,
}
