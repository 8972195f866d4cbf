/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The Concat KDF (NIST SP 800-56A section 5.8.1) with SHA-256, as JWE
//! uses it for ECDH-ES - see rfc7518 section 4.6 for reference. The
//! OtherInfo string binds the content-encryption algorithm, both party
//! info values and the CEK length into the derivation.

use crate::alg::EncryptionAlgorithm;
use crate::error::{Container, JwCryptoError, Result};
use jose_crypto::digest;
use zeroize::Zeroizing;

/// RFC7518 section 4.6.1 caps PartyUInfo/PartyVInfo at 32 bytes.
pub(crate) const MAX_PARTY_INFO_LEN: usize = 32;

const ALLOWED_KEY_BIT_LENGTHS: [usize; 5] = [128, 192, 256, 384, 512];

/// Build the OtherInfo string:
/// `len(algID) || algID || len(apu) || apu || len(apv) || apv || keyBitLen`
/// with every length a 32-bit big-endian byte count and keyBitLen the
/// 32-bit big-endian CEK size in bits.
pub(crate) fn build_other_info(
    algorithm_id: &str,
    apu: Option<&[u8]>,
    apv: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let enc = EncryptionAlgorithm::from_name(algorithm_id)
        .ok_or_else(|| JwCryptoError::not_supported(format!("enc '{algorithm_id}'")))?;
    let apu = apu.unwrap_or_default();
    let apv = apv.unwrap_or_default();
    if apu.len() > MAX_PARTY_INFO_LEN {
        return Err(Container::Jwe.invalid(format!(
            "apu must be {MAX_PARTY_INFO_LEN} bytes or fewer"
        )));
    }
    if apv.len() > MAX_PARTY_INFO_LEN {
        return Err(Container::Jwe.invalid(format!(
            "apv must be {MAX_PARTY_INFO_LEN} bytes or fewer"
        )));
    }
    let algorithm_id = algorithm_id.as_bytes();
    let mut other_info =
        Vec::with_capacity(3 * 4 + algorithm_id.len() + apu.len() + apv.len() + 4);
    other_info.extend_from_slice(&(algorithm_id.len() as u32).to_be_bytes());
    other_info.extend_from_slice(algorithm_id);
    other_info.extend_from_slice(&(apu.len() as u32).to_be_bytes());
    other_info.extend_from_slice(apu);
    other_info.extend_from_slice(&(apv.len() as u32).to_be_bytes());
    other_info.extend_from_slice(apv);
    other_info.extend_from_slice(&(enc.key_bit_length() as u32).to_be_bytes());
    Ok(other_info)
}

/// Derive `key_bit_length` bits of key material from the shared secret
/// `z`. Round `i` hashes `u32be(i) || z || other_info`; the CBC-HS
/// algorithms need more than one round since their CEKs are longer than
/// a SHA-256 output.
pub(crate) fn concat_kdf(
    z: &[u8],
    key_bit_length: usize,
    other_info: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    if !ALLOWED_KEY_BIT_LENGTHS.contains(&key_bit_length) {
        return Err(Container::Jwe.invalid(format!(
            "cannot derive a {key_bit_length} bit key"
        )));
    }
    let key_len = key_bit_length / 8;
    let rounds = (key_len + 31) / 32;
    let mut derived = Zeroizing::new(Vec::with_capacity(rounds * 32));
    for round in 1..=(rounds as u32) {
        let mut input = Zeroizing::new(Vec::with_capacity(4 + z.len() + other_info.len()));
        input.extend_from_slice(&round.to_be_bytes());
        input.extend_from_slice(z);
        input.extend_from_slice(other_info);
        derived.extend_from_slice(digest::digest(&digest::SHA256, &input)?.as_ref());
    }
    derived.truncate(key_len);
    Ok(derived)
}

#[test]
fn test_other_info_layout() {
    // A128GCM with no party info.
    let other_info = build_other_info("A128GCM", None, None).unwrap();
    assert_eq!(
        hex::encode(&other_info),
        "000000074131323847434d000000000000000000000080"
    );
    // Party info values are length-prefixed raw bytes.
    let other_info = build_other_info("A128GCM", Some(&b"Alice"[..]), Some(&b"Bob"[..])).unwrap();
    assert_eq!(
        hex::encode(&other_info),
        "000000074131323847434d00000005416c69636500000003426f6200000080"
    );
}

#[test]
fn test_other_info_rejects_unknown_enc() {
    assert!(matches!(
        build_other_info("A512GCM", None, None),
        Err(JwCryptoError::NotSupported(_))
    ));
}

#[test]
fn test_party_info_length_boundary() {
    let exactly_32 = [0x61u8; 32];
    assert!(build_other_info("A256GCM", Some(&exactly_32[..]), None).is_ok());
    assert!(build_other_info("A256GCM", None, Some(&exactly_32[..])).is_ok());
    let too_long = [0x61u8; 33];
    assert!(matches!(
        build_other_info("A256GCM", Some(&too_long[..]), None),
        Err(JwCryptoError::InvalidJwe(_))
    ));
    assert!(matches!(
        build_other_info("A256GCM", None, Some(&too_long[..])),
        Err(JwCryptoError::InvalidJwe(_))
    ));
}

#[test]
fn test_concat_kdf_zero_z_vector() {
    // SHA256(00000001 || 0^32 || OtherInfo(A128GCM)) truncated to 16 bytes.
    let other_info = build_other_info("A128GCM", None, None).unwrap();
    let derived = concat_kdf(&[0u8; 32], 128, &other_info).unwrap();
    assert_eq!(hex::encode(&*derived), "c73f3e70e285b8e63a78432f82e676b1");
}

#[test]
fn test_concat_kdf_matches_rfc7518_appendix_c() {
    let z = hex::decode("9e56d91d817135d372834283bf84269cfb316ea3da806a48f6daa7798cfe90c4")
        .unwrap();
    let other_info = build_other_info("A128GCM", Some(&b"Alice"[..]), Some(&b"Bob"[..])).unwrap();
    let derived = concat_kdf(&z, 128, &other_info).unwrap();
    assert_eq!(
        crate::codec::b64_encode(&*derived),
        "VqqN6vgjbSBcIijNcacQGg"
    );
}

#[test]
fn test_concat_kdf_output_lengths() {
    let other_info = build_other_info("A256CBC-HS512", None, None).unwrap();
    for bits in ALLOWED_KEY_BIT_LENGTHS {
        let derived = concat_kdf(&[7u8; 32], bits, &other_info).unwrap();
        assert_eq!(derived.len(), bits / 8);
    }
    assert!(concat_kdf(&[7u8; 32], 0, &other_info).is_err());
    assert!(concat_kdf(&[7u8; 32], 160, &other_info).is_err());
}

#[test]
fn test_concat_kdf_multi_round() {
    // 512 bits needs two SHA-256 rounds; check against a fixed vector.
    let other_info = build_other_info("A256CBC-HS512", None, None).unwrap();
    let derived = concat_kdf(&[0u8; 32], 512, &other_info).unwrap();
    assert_eq!(
        hex::encode(&*derived),
        "369a7a016789dd021c16b2ade789db1e76520e868f8efc867a747eb10a6288d0\
         5f2d3b797f176ac2776f38ab1d6810185cf1495900454feeac3d2a70a74c39f3"
    );
}

#[test]
fn test_concat_kdf_is_deterministic() {
    let other_info = build_other_info("A256GCM", Some(&b"u"[..]), Some(&b"v"[..])).unwrap();
    let first = concat_kdf(&[42u8; 32], 256, &other_info).unwrap();
    let second = concat_kdf(&[42u8; 32], 256, &other_info).unwrap();
    assert_eq!(first, second);
}
