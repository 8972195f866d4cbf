/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::error::*;
use sha2::Digest as _;

pub enum Algorithm {
    SHA256,
}
pub use Algorithm::*;

impl Algorithm {
    pub fn result_len(&self) -> usize {
        match self {
            Algorithm::SHA256 => 32,
        }
    }
}

/// A calculated digest value.
#[derive(Clone)]
pub struct Digest {
    pub(crate) value: Vec<u8>,
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        self.value.as_ref()
    }
}

/// Returns the digest of data using the given digest algorithm.
pub fn digest(algorithm: &'static Algorithm, data: &[u8]) -> Result<Digest> {
    let value = match algorithm {
        Algorithm::SHA256 => sha2::Sha256::digest(data).to_vec(),
    };
    Ok(Digest { value })
}
