/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::error::*;

/// Fill a buffer with cryptographically secure pseudo-random data.
pub fn fill(dest: &mut [u8]) -> Result<()> {
    getrandom::getrandom(dest).map_err(|_| Error::RngFailure)
}
