/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! This crate provides all the cryptographic primitives required by the
//! JOSE layer of this workspace, backed by pure-Rust implementations
//! from the RustCrypto project and the dalek ecosystem.
//! The exposed API deliberately deals in raw byte strings only - JWK
//! parsing, header handling and every other JOSE concern live in the
//! `jwcrypto` crate. Keeping this boundary means the primitives can be
//! swapped for a platform backend without touching protocol code.

pub mod aead;
pub mod agreement;
pub mod constant_time;
pub mod digest;
mod error;
pub mod rand;
pub mod signature;

pub use crate::error::{Error, Result};
