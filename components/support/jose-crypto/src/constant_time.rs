/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::error::*;
use subtle::ConstantTimeEq;

/// Returns `Ok(())` if the two slices are equal, `Err(_)` otherwise.
/// The comparison time does not depend on the contents of either slice.
pub fn verify_slices_are_equal(a: &[u8], b: &[u8]) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::SlicesNotEqual);
    }
    if a.ct_eq(b).into() {
        Ok(())
    } else {
        Err(Error::SlicesNotEqual)
    }
}
