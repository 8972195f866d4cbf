/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Authenticated encryption for the JWE content-encryption algorithms
//! from RFC7518: the three AES-GCM variants (section 5.3) and the three
//! AES-CBC-plus-HMAC composites (section 5.2). `seal` returns the
//! ciphertext with the authentication tag appended; callers split the
//! tag off with [AeadAlgorithm::tag_len].

use crate::constant_time;
use crate::error::*;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes_gcm::aead::{Aead, Nonce, Payload};
use aes_gcm::KeyInit;
use hmac::{Hmac, Mac};

// aes-gcm only names the 128 and 256 bit variants.
type Aes192Gcm = aes_gcm::AesGcm<aes::Aes192, aes_gcm::aead::consts::U12>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AeadAlgorithm {
    Aes128Gcm,
    Aes192Gcm,
    Aes256Gcm,
    Aes128CbcHmacSha256,
    Aes192CbcHmacSha384,
    Aes256CbcHmacSha512,
}

impl AeadAlgorithm {
    pub fn key_len(&self) -> usize {
        match self {
            AeadAlgorithm::Aes128Gcm => 16,
            AeadAlgorithm::Aes192Gcm => 24,
            AeadAlgorithm::Aes256Gcm | AeadAlgorithm::Aes128CbcHmacSha256 => 32,
            AeadAlgorithm::Aes192CbcHmacSha384 => 48,
            AeadAlgorithm::Aes256CbcHmacSha512 => 64,
        }
    }

    /// GCM takes the 96-bit IV from RFC7518 section 5.3; the CBC
    /// composites take a full 128-bit AES block.
    pub fn iv_len(&self) -> usize {
        match self {
            AeadAlgorithm::Aes128Gcm | AeadAlgorithm::Aes192Gcm | AeadAlgorithm::Aes256Gcm => 12,
            _ => 16,
        }
    }

    /// GCM tags are a full 128 bits; the CBC composites truncate the
    /// HMAC to half its output.
    pub fn tag_len(&self) -> usize {
        match self {
            AeadAlgorithm::Aes128Gcm
            | AeadAlgorithm::Aes192Gcm
            | AeadAlgorithm::Aes256Gcm
            | AeadAlgorithm::Aes128CbcHmacSha256 => 16,
            AeadAlgorithm::Aes192CbcHmacSha384 => 24,
            AeadAlgorithm::Aes256CbcHmacSha512 => 32,
        }
    }
}

/// Encrypt `data`, authenticating `aad` alongside it. Returns
/// `ciphertext || tag`.
pub fn seal(
    algorithm: AeadAlgorithm,
    key: &[u8],
    iv: Option<&[u8]>,
    data: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let iv = check_parameters(algorithm, key, iv)?;
    match algorithm {
        AeadAlgorithm::Aes128Gcm => gcm_seal::<aes_gcm::Aes128Gcm>(key, iv, data, aad),
        AeadAlgorithm::Aes192Gcm => gcm_seal::<Aes192Gcm>(key, iv, data, aad),
        AeadAlgorithm::Aes256Gcm => gcm_seal::<aes_gcm::Aes256Gcm>(key, iv, data, aad),
        AeadAlgorithm::Aes128CbcHmacSha256 => {
            cbc_hmac_seal::<cbc::Encryptor<aes::Aes128>, Hmac<sha2::Sha256>>(
                key,
                iv,
                data,
                aad,
                algorithm.tag_len(),
            )
        }
        AeadAlgorithm::Aes192CbcHmacSha384 => {
            cbc_hmac_seal::<cbc::Encryptor<aes::Aes192>, Hmac<sha2::Sha384>>(
                key,
                iv,
                data,
                aad,
                algorithm.tag_len(),
            )
        }
        AeadAlgorithm::Aes256CbcHmacSha512 => {
            cbc_hmac_seal::<cbc::Encryptor<aes::Aes256>, Hmac<sha2::Sha512>>(
                key,
                iv,
                data,
                aad,
                algorithm.tag_len(),
            )
        }
    }
}

/// Authenticate and decrypt `ciphertext_and_tag` (the `seal` output
/// shape). Fails with [Error::OpenFailed] when the tag does not verify.
pub fn open(
    algorithm: AeadAlgorithm,
    key: &[u8],
    iv: Option<&[u8]>,
    ciphertext_and_tag: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let iv = check_parameters(algorithm, key, iv)?;
    if ciphertext_and_tag.len() < algorithm.tag_len() {
        return Err(Error::CiphertextTooShort);
    }
    match algorithm {
        AeadAlgorithm::Aes128Gcm => gcm_open::<aes_gcm::Aes128Gcm>(key, iv, ciphertext_and_tag, aad),
        AeadAlgorithm::Aes192Gcm => gcm_open::<Aes192Gcm>(key, iv, ciphertext_and_tag, aad),
        AeadAlgorithm::Aes256Gcm => gcm_open::<aes_gcm::Aes256Gcm>(key, iv, ciphertext_and_tag, aad),
        AeadAlgorithm::Aes128CbcHmacSha256 => {
            cbc_hmac_open::<cbc::Decryptor<aes::Aes128>, Hmac<sha2::Sha256>>(
                key,
                iv,
                ciphertext_and_tag,
                aad,
                algorithm.tag_len(),
            )
        }
        AeadAlgorithm::Aes192CbcHmacSha384 => {
            cbc_hmac_open::<cbc::Decryptor<aes::Aes192>, Hmac<sha2::Sha384>>(
                key,
                iv,
                ciphertext_and_tag,
                aad,
                algorithm.tag_len(),
            )
        }
        AeadAlgorithm::Aes256CbcHmacSha512 => {
            cbc_hmac_open::<cbc::Decryptor<aes::Aes256>, Hmac<sha2::Sha512>>(
                key,
                iv,
                ciphertext_and_tag,
                aad,
                algorithm.tag_len(),
            )
        }
    }
}

fn check_parameters<'a>(
    algorithm: AeadAlgorithm,
    key: &[u8],
    iv: Option<&'a [u8]>,
) -> Result<&'a [u8]> {
    if key.len() != algorithm.key_len() {
        return Err(Error::InvalidKeyLength {
            expected: algorithm.key_len(),
            got: key.len(),
        });
    }
    let iv = iv.ok_or(Error::InvalidIvLength {
        expected: algorithm.iv_len(),
        got: 0,
    })?;
    if iv.len() != algorithm.iv_len() {
        return Err(Error::InvalidIvLength {
            expected: algorithm.iv_len(),
            got: iv.len(),
        });
    }
    Ok(iv)
}

fn gcm_seal<C: Aead + KeyInit>(key: &[u8], iv: &[u8], data: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = C::new_from_slice(key).map_err(|_| Error::SealFailed)?;
    cipher
        .encrypt(Nonce::<C>::from_slice(iv), Payload { msg: data, aad })
        .map_err(|_| Error::SealFailed)
}

fn gcm_open<C: Aead + KeyInit>(
    key: &[u8],
    iv: &[u8],
    ciphertext_and_tag: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = C::new_from_slice(key).map_err(|_| Error::OpenFailed)?;
    cipher
        .decrypt(
            Nonce::<C>::from_slice(iv),
            Payload {
                msg: ciphertext_and_tag,
                aad,
            },
        )
        .map_err(|_| Error::OpenFailed)
}

fn cbc_hmac_seal<C, M>(
    key: &[u8],
    iv: &[u8],
    data: &[u8],
    aad: &[u8],
    tag_len: usize,
) -> Result<Vec<u8>>
where
    C: BlockEncryptMut + KeyIvInit,
    M: Mac + KeyInit,
{
    // RFC7518 section 5.2.2.1: the first half of the key is the MAC key,
    // the second half the AES key.
    let (mac_key, enc_key) = key.split_at(key.len() / 2);
    let mut out = C::new_from_slices(enc_key, iv)
        .map_err(|_| Error::SealFailed)?
        .encrypt_padded_vec_mut::<Pkcs7>(data);
    let tag = cbc_hmac_tag::<M>(mac_key, iv, &out, aad, tag_len)?;
    out.extend_from_slice(&tag);
    Ok(out)
}

fn cbc_hmac_open<C, M>(
    key: &[u8],
    iv: &[u8],
    ciphertext_and_tag: &[u8],
    aad: &[u8],
    tag_len: usize,
) -> Result<Vec<u8>>
where
    C: BlockDecryptMut + KeyIvInit,
    M: Mac + KeyInit,
{
    let (mac_key, enc_key) = key.split_at(key.len() / 2);
    let (ciphertext, tag) = ciphertext_and_tag.split_at(ciphertext_and_tag.len() - tag_len);
    let expected = cbc_hmac_tag::<M>(mac_key, iv, ciphertext, aad, tag_len)?;
    constant_time::verify_slices_are_equal(&expected, tag).map_err(|_| Error::OpenFailed)?;
    C::new_from_slices(enc_key, iv)
        .map_err(|_| Error::OpenFailed)?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| Error::OpenFailed)
}

// HMAC input per RFC7518 section 5.2.2.1:
// A || IV || E || AL, with AL the bit length of A as a 64-bit big-endian
// integer. The tag is the left half of the HMAC output.
fn cbc_hmac_tag<M: Mac + KeyInit>(
    mac_key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
    tag_len: usize,
) -> Result<Vec<u8>> {
    let mut mac = <M as Mac>::new_from_slice(mac_key).map_err(|_| Error::SealFailed)?;
    mac.update(aad);
    mac.update(iv);
    mac.update(ciphertext);
    mac.update(&((aad.len() as u64) * 8).to_be_bytes());
    Ok(mac.finalize().into_bytes()[..tag_len].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AeadAlgorithm; 6] = [
        AeadAlgorithm::Aes128Gcm,
        AeadAlgorithm::Aes192Gcm,
        AeadAlgorithm::Aes256Gcm,
        AeadAlgorithm::Aes128CbcHmacSha256,
        AeadAlgorithm::Aes192CbcHmacSha384,
        AeadAlgorithm::Aes256CbcHmacSha512,
    ];

    #[test]
    fn seal_open_round_trips() {
        let data = b"Encrypt me, I'm famous!";
        let aad = b"seen but not encrypted";
        for algorithm in ALL {
            let mut key = vec![0u8; algorithm.key_len()];
            crate::rand::fill(&mut key).unwrap();
            let mut iv = vec![0u8; algorithm.iv_len()];
            crate::rand::fill(&mut iv).unwrap();
            let sealed = seal(algorithm, &key, Some(&iv), data, aad).unwrap();
            assert!(sealed.len() >= data.len() + algorithm.tag_len());
            let opened = open(algorithm, &key, Some(&iv), &sealed, aad).unwrap();
            assert_eq!(opened, data);
        }
    }

    #[test]
    fn tampering_is_detected() {
        let data = b"untouchable";
        for algorithm in ALL {
            let key = vec![0xa5u8; algorithm.key_len()];
            let iv = vec![0x5au8; algorithm.iv_len()];
            let sealed = seal(algorithm, &key, Some(&iv), data, b"aad").unwrap();
            for index in [0, sealed.len() - 1] {
                let mut tampered = sealed.clone();
                tampered[index] ^= 0x01;
                assert!(matches!(
                    open(algorithm, &key, Some(&iv), &tampered, b"aad"),
                    Err(Error::OpenFailed)
                ));
            }
            // And a different aad.
            assert!(matches!(
                open(algorithm, &key, Some(&iv), &sealed, b"daa"),
                Err(Error::OpenFailed)
            ));
        }
    }

    #[test]
    fn rejects_wrong_key_and_iv_lengths() {
        assert!(matches!(
            seal(AeadAlgorithm::Aes256Gcm, &[0; 16], Some(&[0; 12]), b"", b""),
            Err(Error::InvalidKeyLength {
                expected: 32,
                got: 16
            })
        ));
        assert!(matches!(
            seal(AeadAlgorithm::Aes256Gcm, &[0; 32], Some(&[0; 16]), b"", b""),
            Err(Error::InvalidIvLength {
                expected: 12,
                got: 16
            })
        ));
        assert!(matches!(
            seal(AeadAlgorithm::Aes256Gcm, &[0; 32], None, b"", b""),
            Err(Error::InvalidIvLength { .. })
        ));
    }

    #[test]
    fn aes_128_cbc_hmac_sha_256_matches_rfc7518_appendix_b1() {
        let key =
            hex::decode("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f")
                .unwrap();
        let plaintext = hex::decode(concat!(
            "41206369706865722073797374656d206d757374206e6f7420626520726571",
            "756972656420746f206265207365637265742c20616e64206974206d757374",
            "2062652061626c6520746f2066616c6c20696e746f207468652068616e6473",
            "206f662074686520656e656d7920776974686f757420696e636f6e76656e69",
            "656e6365"
        ))
        .unwrap();
        let iv = hex::decode("1af38c2dc2b96ffdd86694092341bc04").unwrap();
        let aad = hex::decode(concat!(
            "546865207365636f6e64207072696e6369706c65206f66204175677573746520",
            "4b6572636b686f666673"
        ))
        .unwrap();
        let expected_ciphertext = concat!(
            "c80edfa32ddf39d5ef00c0b468834279a2e46a1b8049f792f76bfe54b903a9c9",
            "a94ac9b47ad2655c5f10f9aef71427e2fc6f9b3f399a221489f16362c7032336",
            "09d45ac69864e3321cf82935ac4096c86e133314c54019e8ca7980dfa4b9cf1b",
            "384c486f3a54c51078158ee5d79de59fbd34d848b3d69550a67646344427ade5",
            "4b8851ffb598f7f80074b9473c82e2db"
        );
        let expected_tag = "652c3fa36b0a7c5b3219fab3a30bc1c4";

        let sealed = seal(
            AeadAlgorithm::Aes128CbcHmacSha256,
            &key,
            Some(&iv),
            &plaintext,
            &aad,
        )
        .unwrap();
        let (ciphertext, tag) = sealed.split_at(sealed.len() - 16);
        assert_eq!(hex::encode(ciphertext), expected_ciphertext);
        assert_eq!(hex::encode(tag), expected_tag);

        let opened = open(
            AeadAlgorithm::Aes128CbcHmacSha256,
            &key,
            Some(&iv),
            &sealed,
            &aad,
        )
        .unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn aes_gcm_matches_nist_test_case_4() {
        let key = hex::decode("feffe9928665731c6d6a8f9467308308").unwrap();
        let iv = hex::decode("cafebabefacedbaddecaf888").unwrap();
        let plaintext = hex::decode(concat!(
            "d9313225f88406e5a55909c5aff5269a86a7a9531534f7da2e4c303d8a318a72",
            "1c3c0c95956809532fcf0e2449a6b525b16aedf5aa0de657ba637b39"
        ))
        .unwrap();
        let aad = hex::decode("feedfacedeadbeeffeedfacedeadbeefabaddad2").unwrap();
        let sealed = seal(AeadAlgorithm::Aes128Gcm, &key, Some(&iv), &plaintext, &aad).unwrap();
        let (ciphertext, tag) = sealed.split_at(sealed.len() - 16);
        assert_eq!(
            hex::encode(ciphertext),
            concat!(
                "42831ec2217774244b7221b784d0d49ce3aa212f2c02a4e035c17e2329aca12e",
                "21d514b25466931c7d8f6a5aac84aa051ba30b396a0aac973d58e091"
            )
        );
        assert_eq!(hex::encode(tag), "5bc94fbc3221a5db94fae95ae7121a47");
    }
}
