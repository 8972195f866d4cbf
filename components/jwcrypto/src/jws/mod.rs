/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! JSON Web Signature (RFC7515) in the flattened JSON serialization and
//! the compact serialization, including the RFC7797 `b64` unencoded
//! payload option (flattened only - the compact form has no channel for
//! a detached binary payload).

pub mod compact;
pub mod flattened;

pub use compact::CompactSigner;
pub use flattened::{verify, FlattenedJws, FlattenedSigner, VerifiedJws};

use std::collections::BTreeMap;

/// Options for [flattened::FlattenedSigner::sign] and
/// [compact::CompactSigner::sign].
#[derive(Debug, Default, Clone)]
pub struct SignOptions {
    /// Extension critical header parameters the caller understands,
    /// mapped to whether each must live in the protected header. The
    /// library always recognizes `b64` (integrity protected).
    pub crit: BTreeMap<String, bool>,
}

/// Options for [flattened::verify] and [compact::verify].
#[derive(Debug, Default, Clone)]
pub struct VerifyOptions {
    /// Extension critical header parameters the caller understands,
    /// mapped to whether each must live in the protected header. The
    /// library always recognizes `b64` (integrity protected).
    pub crit: BTreeMap<String, bool>,
    /// Allow-list for the signature algorithm. Without one, every
    /// supported algorithm is accepted.
    pub algorithms: Option<Vec<String>>,
}
