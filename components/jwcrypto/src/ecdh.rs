/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Implements Elliptic-Curve Diffie-Hellman for JWE - specifically, the
//! "Ephemeral-Static direct key agreement" mode described in
//! https://tools.ietf.org/html/rfc7518#section-4.6. The derived key IS
//! the content-encryption key; no key wrapping is involved, so the JWE
//! Encrypted Key slot stays empty.

use crate::alg::EncryptionAlgorithm;
use crate::codec;
use crate::error::{Container, Result};
use crate::jwk::{self, Jwk};
use crate::kdf;
use crate::JsonObject;
use jose_crypto::agreement::{Curve, EphemeralKeyPair, PrivateKey, UnparsedPublicKey};
use zeroize::Zeroizing;

/// What the encryption side of the agreement hands back: the CEK and the
/// header parameters that must be integrity protected for the recipient
/// to derive the same CEK.
pub(crate) struct DerivedEncryptionKey {
    pub(crate) cek: Zeroizing<Vec<u8>>,
    pub(crate) parameters: JsonObject,
}

pub(crate) fn agreement_curve(container: Container, crv: &str) -> Result<Curve> {
    Curve::from_name(crv)
        .ok_or_else(|| crate::error::JwCryptoError::not_supported(format!("crv '{crv}'")))
}

/// The encryption side: generate an ephemeral key pair on the
/// recipient's curve, run the agreement against the recipient public key
/// and feed the result through the Concat KDF. The ephemeral scalar is
/// wiped as soon as it drops.
pub(crate) fn derive_encryption_key(
    recipient: &Jwk,
    enc: EncryptionAlgorithm,
    apu: Option<&[u8]>,
    apv: Option<&[u8]>,
) -> Result<DerivedEncryptionKey> {
    let curve = agreement_curve(Container::Jwe, recipient.crv())?;
    let recipient_public = jwk::to_raw_public_key(
        Container::Jwe,
        recipient,
        curve.is_octet_key_pair(),
        curve.scalar_len(),
    )?;
    let key_pair = EphemeralKeyPair::generate(curve)?;
    let epk = jwk::from_raw_public_key(
        curve.name(),
        curve.is_octet_key_pair(),
        &key_pair.public_key().to_bytes()?,
        None,
    );
    let (private_key, _) = key_pair.split();
    let z = private_key.agree(&UnparsedPublicKey::new(curve, &recipient_public))?;
    let other_info = kdf::build_other_info(enc.algorithm_id(), apu, apv)?;
    let cek = kdf::concat_kdf(z.as_ref(), enc.key_bit_length(), &other_info)?;

    let mut parameters = JsonObject::new();
    parameters.insert(
        "epk".to_owned(),
        serde_json::to_value(&epk)
            .map_err(|_| Container::Jwe.invalid("could not serialize epk"))?,
    );
    if let Some(apu) = apu {
        parameters.insert("apu".to_owned(), codec::b64_encode(apu).into());
    }
    if let Some(apv) = apv {
        parameters.insert("apv".to_owned(), codec::b64_encode(apv).into());
    }
    Ok(DerivedEncryptionKey { cek, parameters })
}

/// The decryption side: validate the `epk` the sender put in the header,
/// run the agreement against it with the recipient private key and
/// derive the CEK exactly as the encryption side did.
pub(crate) fn derive_decryption_key(
    recipient: &Jwk,
    jose_header: &JsonObject,
    enc: EncryptionAlgorithm,
) -> Result<Zeroizing<Vec<u8>>> {
    let container = Container::Jwe;
    let curve = agreement_curve(container, recipient.crv())?;
    let recipient_private = jwk::to_raw_private_key(
        container,
        recipient,
        curve.is_octet_key_pair(),
        curve.scalar_len(),
    )?;

    let epk = match jose_header.get("epk") {
        Some(value) if value.is_object() => serde_json::from_value::<Jwk>(value.clone())
            .map_err(|_| container.invalid("epk is not a valid JWK"))?,
        Some(_) => return Err(container.invalid("epk is not a JSON object")),
        None => return Err(container.invalid("epk is missing")),
    };
    if epk.crv() != curve.name() {
        return Err(container.invalid("epk crv does not match the recipient key"));
    }
    let epk_public = jwk::to_raw_public_key(
        container,
        &epk,
        curve.is_octet_key_pair(),
        curve.scalar_len(),
    )?;

    let apu = decode_party_info(jose_header, "apu")?;
    let apv = decode_party_info(jose_header, "apv")?;

    let private_key = PrivateKey::from_bytes(curve, &recipient_private)?;
    let z = private_key.agree(&UnparsedPublicKey::new(curve, &epk_public))?;
    let other_info = kdf::build_other_info(enc.algorithm_id(), apu.as_deref(), apv.as_deref())?;
    kdf::concat_kdf(z.as_ref(), enc.key_bit_length(), &other_info)
}

/// The RFC7516 section 11.5 mitigation: when CEK derivation fails for
/// any reason, wait out a random 200-500ms delay and hand back a random
/// key of the right size instead of an error. The AEAD then fails
/// authentication the same way it would for tampered ciphertext, so an
/// attacker cannot tell a bad `epk` from a bad tag. The real error is
/// only logged.
pub(crate) fn derive_decryption_key_with_mitigation(
    recipient: &Jwk,
    jose_header: &JsonObject,
    enc: EncryptionAlgorithm,
) -> Result<Zeroizing<Vec<u8>>> {
    match derive_decryption_key(recipient, jose_header, enc) {
        Ok(cek) => Ok(cek),
        Err(error) => {
            log::warn!("CEK derivation failed, substituting a random CEK: {error}");
            let mut noise = [0u8; 4];
            jose_crypto::rand::fill(&mut noise)?;
            let delay_ms = 200 + u32::from_be_bytes(noise) % 300;
            std::thread::sleep(std::time::Duration::from_millis(delay_ms.into()));
            let mut cek = Zeroizing::new(vec![0u8; enc.key_bit_length() / 8]);
            jose_crypto::rand::fill(&mut cek)?;
            Ok(cek)
        }
    }
}

fn decode_party_info(jose_header: &JsonObject, label: &str) -> Result<Option<Vec<u8>>> {
    let container = Container::Jwe;
    match jose_header.get(label) {
        None => Ok(None),
        Some(value) => {
            let value = value
                .as_str()
                .ok_or_else(|| container.invalid(format!("{label} must be a string")))?;
            let bytes = codec::b64_decode_required(container, Some(value), label)?;
            if bytes.len() > kdf::MAX_PARTY_INFO_LEN {
                return Err(container.invalid(format!(
                    "{label} must be {} bytes or fewer",
                    kdf::MAX_PARTY_INFO_LEN
                )));
            }
            Ok(Some(bytes))
        }
    }
}
