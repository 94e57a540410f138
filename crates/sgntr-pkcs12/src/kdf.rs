#![forbid(unsafe_code)]

//! Key derivation, MAC and bag decryption for PKCS#12.
//!
//! The PKCS#12 KDF (RFC 7292 Appendix B) derives the MAC key and the
//! legacy 3DES key/IV from a BMP password. PBES2 derives the AES key with
//! PBKDF2 from the UTF-8 password instead.

use cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use digest::core_api::BlockSizeUser;
use digest::{Digest, FixedOutputReset};
use hmac::Mac;
use sgntr_core::Error;
use sha1::Sha1;
use sha2::Sha256;

/// Diversifier byte of the PKCS#12 KDF.
#[derive(Debug, Clone, Copy)]
#[repr(u8)]
pub(crate) enum Purpose {
    Key = 1,
    Iv = 2,
    Mac = 3,
}

/// PBKDF2 pseudo-random function of a PBES2 bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Prf {
    HmacSha1,
    HmacSha256,
}

/// PKCS#12 KDF over digest `D` (u = output size, v = block size).
pub(crate) fn derive<D>(
    purpose: Purpose,
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
    len: usize,
) -> Vec<u8>
where
    D: Digest + FixedOutputReset + BlockSizeUser,
{
    let v = D::block_size();
    let diversifier = vec![purpose as u8; v];
    let mut input = [fill_blocks(salt, v), fill_blocks(bmp_password, v)].concat();

    let mut out = Vec::with_capacity(len + <D as Digest>::output_size());
    let mut hasher = D::new();
    while out.len() < len {
        Digest::update(&mut hasher, &diversifier);
        Digest::update(&mut hasher, &input);
        let mut a = hasher.finalize_reset();
        for _ in 1..iterations {
            Digest::update(&mut hasher, &a);
            a = hasher.finalize_reset();
        }
        out.extend_from_slice(&a);

        if out.len() < len {
            let b = fill_blocks(&a, v);
            for block in input.chunks_mut(v) {
                add_plus_one(block, &b);
            }
        }
    }
    out.truncate(len);
    out
}

/// Repeat `data` up to the next multiple of `v` bytes. Empty stays empty.
fn fill_blocks(data: &[u8], v: usize) -> Vec<u8> {
    let len = data.len().div_ceil(v) * v;
    data.iter().copied().cycle().take(len).collect()
}

/// `block = (block + b + 1) mod 2^(8 * block.len())`, big-endian.
fn add_plus_one(block: &mut [u8], b: &[u8]) {
    let mut carry = 1u16;
    for (x, y) in block.iter_mut().zip(b).rev() {
        let sum = u16::from(*x) + u16::from(*y) + carry;
        *x = sum as u8;
        carry = sum >> 8;
    }
}

/// UTF-16BE with a two-byte terminator, as the PKCS#12 KDF expects.
pub(crate) fn bmp_password(password: &str) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    let mut bmp: Vec<u8> = password.encode_utf16().flat_map(u16::to_be_bytes).collect();
    bmp.extend_from_slice(&[0, 0]);
    bmp
}

/// Constant-time check of `expected` against the MAC of `data`.
pub(crate) fn mac_matches<M>(key: &[u8], data: &[u8], expected: &[u8]) -> Result<bool, Error>
where
    M: Mac + hmac::digest::KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|e| Error::Credential(format!("invalid PKCS#12 MAC key: {e}")))?;
    mac.update(data);
    Ok(mac.verify_slice(expected).is_ok())
}

/// pbeWithSHAAnd3-KeyTripleDES-CBC.
pub(crate) fn decrypt_pbe_sha1_3des(
    ciphertext: &[u8],
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<Vec<u8>, Error> {
    let key = derive::<Sha1>(Purpose::Key, bmp_password, salt, iterations, 24);
    let iv = derive::<Sha1>(Purpose::Iv, bmp_password, salt, iterations, 8);
    cbc_decrypt::<cbc::Decryptor<des::TdesEde3>>(&key, &iv, ciphertext)
}

/// PBES2 with PBKDF2 and AES-256-CBC.
pub(crate) fn decrypt_pbes2_aes256(
    ciphertext: &[u8],
    password: &str,
    prf: Prf,
    salt: &[u8],
    iterations: u32,
    iv: &[u8],
) -> Result<Vec<u8>, Error> {
    let mut key = [0u8; 32];
    match prf {
        Prf::HmacSha1 => pbkdf2::pbkdf2_hmac::<Sha1>(password.as_bytes(), salt, iterations, &mut key),
        Prf::HmacSha256 => {
            pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key)
        }
    }
    cbc_decrypt::<cbc::Decryptor<aes::Aes256>>(&key, iv, ciphertext)
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error>
where
    C: KeyIvInit + BlockDecryptMut,
{
    let decryptor = C::new_from_slices(key, iv)
        .map_err(|e| Error::Credential(format!("PKCS#12 cipher init failed: {e}")))?;
    let mut buf = ciphertext.to_vec();
    let len = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| Error::Credential("PKCS#12 bag decryption failed (wrong password?)".into()))?
        .len();
    buf.truncate(len);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn test_kdf_sha1_known_vectors() {
        let password = bmp_password("smeg");
        let salt = hex("0A58CF64530D823F");
        assert_eq!(
            derive::<Sha1>(Purpose::Key, &password, &salt, 1, 24),
            hex("8AAAE6297B6CB04642AB5B077851284EB7128F1A2A7FBCA3")
        );
        assert_eq!(
            derive::<Sha1>(Purpose::Iv, &password, &salt, 1, 8),
            hex("79993DFE048D3B76")
        );
    }

    #[test]
    fn test_kdf_sha1_iterated() {
        let key = derive::<Sha1>(Purpose::Key, &bmp_password("sesame"), &[0xff; 8], 2048, 24);
        assert_eq!(key, hex("7cd9fd3e2b3be7691a44e3bef0f9ea0fb9b897d4e325d9d1"));
    }

    #[test]
    fn test_kdf_sha256_mac_key() {
        let key = derive::<Sha256>(Purpose::Mac, &bmp_password("1234567890"), b"saltsalt", 2048, 32);
        assert_eq!(
            key,
            hex("4289a541aaa737563d1d7675063042486cf5ad0908be6a591b0a10824221bb61")
        );
    }

    #[test]
    fn test_bmp_password() {
        assert!(bmp_password("").is_empty());
        assert_eq!(bmp_password("A"), vec![0x00, 0x41, 0x00, 0x00]);
        assert_eq!(bmp_password("é"), vec![0x00, 0xe9, 0x00, 0x00]);
    }

    #[test]
    fn test_mac_mismatch() {
        let ok = mac_matches::<hmac::Hmac<Sha1>>(b"k", b"data", &[0u8; 20]).unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_bad_padding_is_credential_error() {
        let err = decrypt_pbes2_aes256(&[0u8; 15], "pw", Prf::HmacSha256, b"salt", 1, &[0u8; 16])
            .unwrap_err();
        assert!(matches!(err, Error::Credential(_)));
    }
}
