#![forbid(unsafe_code)]

//! BER parsing of the PFX structure (RFC 7292).
//!
//! PFX files are BER, not strict DER, so everything goes through
//! `yasna::parse_ber`.

use hmac::Hmac;
use sgntr_core::Error;
use sha1::Sha1;
use sha2::Sha256;
use yasna::models::ObjectIdentifier;
use yasna::{ASN1Error, ASN1ErrorKind, BERReader, BERReaderSeq, Tag};

use crate::kdf::{self, Prf, Purpose};
use crate::Pkcs12Contents;

mod oid {
    pub const DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
    pub const ENCRYPTED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 6];
    pub const SHROUDED_KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 2];
    pub const CERT_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 3];
    pub const X509_CERTIFICATE: &[u64] = &[1, 2, 840, 113549, 1, 9, 22, 1];
    pub const PBE_SHA1_3DES: &[u64] = &[1, 2, 840, 113549, 1, 12, 1, 3];
    pub const PBES2: &[u64] = &[1, 2, 840, 113549, 1, 5, 13];
    pub const PBKDF2: &[u64] = &[1, 2, 840, 113549, 1, 5, 12];
    pub const AES_256_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 42];
    pub const SHA1: &[u64] = &[1, 3, 14, 3, 2, 26];
    pub const SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
    pub const HMAC_SHA1: &[u64] = &[1, 2, 840, 113549, 2, 7];
    pub const HMAC_SHA256: &[u64] = &[1, 2, 840, 113549, 2, 9];
}

fn is(found: &ObjectIdentifier, expected: &[u64]) -> bool {
    found.components().as_slice() == expected
}

fn invalid() -> ASN1Error {
    ASN1Error::new(ASN1ErrorKind::Invalid)
}

/// How a bag or an encrypted ContentInfo is protected.
#[derive(Debug)]
enum Protection {
    Pbe3Des {
        salt: Vec<u8>,
        iterations: u32,
    },
    Pbes2 {
        prf: Prf,
        salt: Vec<u8>,
        iterations: u32,
        iv: Vec<u8>,
    },
}

#[derive(Debug, Clone, Copy)]
enum MacDigest {
    Sha1,
    Sha256,
}

struct MacData {
    digest: MacDigest,
    expected: Vec<u8>,
    salt: Vec<u8>,
    iterations: u32,
}

struct Encrypted {
    protection: Protection,
    ciphertext: Vec<u8>,
}

enum AuthenticatedSafe {
    Plain(Vec<u8>),
    Encrypted(Encrypted),
}

enum SafeBag {
    Key(Encrypted),
    Certificate(Vec<u8>),
    Other,
}

pub(crate) fn parse_pfx(data: &[u8], password: &str) -> Result<Pkcs12Contents, Error> {
    let (auth_safe, mac) = yasna::parse_ber(data, |r| {
        r.read_sequence(|r| {
            if r.next().read_u32()? != 3 {
                return Err(invalid());
            }
            let auth_safe = read_data_content_info(r.next())?;
            let mac = r.read_optional(read_mac_data)?;
            Ok((auth_safe, mac))
        })
    })
    .map_err(|e| Error::Credential(format!("malformed PKCS#12 PFX: {e}")))?;

    let bmp_password = kdf::bmp_password(password);
    match mac {
        Some(mac) => check_mac(&mac, &auth_safe, &bmp_password)?,
        None => tracing::debug!("PKCS#12 file carries no MAC"),
    }

    let safes = yasna::parse_ber(&auth_safe, |r| r.collect_sequence_of(read_authenticated_safe))
        .map_err(|e| Error::Credential(format!("malformed PKCS#12 authSafe: {e}")))?;

    let mut contents = Pkcs12Contents::default();
    for safe in safes {
        let bags_der = match safe {
            AuthenticatedSafe::Plain(der) => der,
            AuthenticatedSafe::Encrypted(enc) => decrypt(&enc, password, &bmp_password)?,
        };
        let bags = yasna::parse_ber(&bags_der, |r| r.collect_sequence_of(read_safe_bag))
            .map_err(|e| Error::Credential(format!("malformed PKCS#12 SafeContents: {e}")))?;
        for bag in bags {
            match bag {
                SafeBag::Key(enc) => contents
                    .private_keys
                    .push(decrypt(&enc, password, &bmp_password)?),
                SafeBag::Certificate(der) => contents.certificates.push(der),
                SafeBag::Other => {}
            }
        }
    }

    tracing::debug!(
        keys = contents.private_keys.len(),
        certificates = contents.certificates.len(),
        "PKCS#12 file decrypted"
    );
    Ok(contents)
}

/// ContentInfo of type `data`: `[0] EXPLICIT OCTET STRING`.
fn read_data_content_info(r: BERReader) -> Result<Vec<u8>, ASN1Error> {
    r.read_sequence(|r| {
        if !is(&r.next().read_oid()?, oid::DATA) {
            return Err(invalid());
        }
        r.next().read_tagged(Tag::context(0), |r| r.read_bytes())
    })
}

fn read_authenticated_safe(r: BERReader) -> Result<AuthenticatedSafe, ASN1Error> {
    r.read_sequence(|r| {
        let content_type = r.next().read_oid()?;
        if is(&content_type, oid::DATA) {
            let der = r.next().read_tagged(Tag::context(0), |r| r.read_bytes())?;
            return Ok(AuthenticatedSafe::Plain(der));
        }
        if !is(&content_type, oid::ENCRYPTED_DATA) {
            return Err(invalid());
        }
        // EncryptedData { version, EncryptedContentInfo { type, alg, [0] IMPLICIT } }
        r.next().read_tagged(Tag::context(0), |r| {
            r.read_sequence(|r| {
                r.next().read_u32()?;
                r.next().read_sequence(|r| {
                    r.next().read_oid()?;
                    let protection = read_protection(r.next())?;
                    let ciphertext = r
                        .next()
                        .read_tagged_implicit(Tag::context(0), |r| r.read_bytes())?;
                    Ok(AuthenticatedSafe::Encrypted(Encrypted {
                        protection,
                        ciphertext,
                    }))
                })
            })
        })
    })
}

fn read_safe_bag(r: BERReader) -> Result<SafeBag, ASN1Error> {
    r.read_sequence(|r| {
        let bag_type = r.next().read_oid()?;
        let bag = if is(&bag_type, oid::SHROUDED_KEY_BAG) {
            r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let protection = read_protection(r.next())?;
                    let ciphertext = r.next().read_bytes()?;
                    Ok(SafeBag::Key(Encrypted {
                        protection,
                        ciphertext,
                    }))
                })
            })?
        } else if is(&bag_type, oid::CERT_BAG) {
            r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    if !is(&r.next().read_oid()?, oid::X509_CERTIFICATE) {
                        return Err(invalid());
                    }
                    let der = r.next().read_tagged(Tag::context(0), |r| r.read_bytes())?;
                    Ok(SafeBag::Certificate(der))
                })
            })?
        } else {
            r.next().read_der()?;
            SafeBag::Other
        };
        skip_attributes(r)?;
        Ok(bag)
    })
}

/// Discard the optional bag attributes.
fn skip_attributes(r: &mut BERReaderSeq) -> Result<(), ASN1Error> {
    r.read_optional(|r| r.read_der())?;
    Ok(())
}

fn read_protection(r: BERReader) -> Result<Protection, ASN1Error> {
    r.read_sequence(|r| {
        let algorithm = r.next().read_oid()?;
        if is(&algorithm, oid::PBE_SHA1_3DES) {
            return r.next().read_sequence(|r| {
                let salt = r.next().read_bytes()?;
                let iterations = r.next().read_u32()?;
                Ok(Protection::Pbe3Des { salt, iterations })
            });
        }
        if !is(&algorithm, oid::PBES2) {
            return Err(invalid());
        }
        r.next().read_sequence(|r| {
            let (prf, salt, iterations) = r.next().read_sequence(|r| {
                if !is(&r.next().read_oid()?, oid::PBKDF2) {
                    return Err(invalid());
                }
                r.next().read_sequence(read_pbkdf2_params)
            })?;
            let iv = r.next().read_sequence(|r| {
                if !is(&r.next().read_oid()?, oid::AES_256_CBC) {
                    return Err(invalid());
                }
                r.next().read_bytes()
            })?;
            Ok(Protection::Pbes2 {
                prf,
                salt,
                iterations,
                iv,
            })
        })
    })
}

/// `{ salt, iterationCount, keyLength OPTIONAL, prf DEFAULT hmacWithSHA1 }`
fn read_pbkdf2_params(r: &mut BERReaderSeq) -> Result<(Prf, Vec<u8>, u32), ASN1Error> {
    let salt = r.next().read_bytes()?;
    let iterations = r.next().read_u32()?;
    let mut prf = Prf::HmacSha1;
    while let Some(der) = r.read_optional(|r| r.read_der())? {
        // keyLength is an INTEGER; the PRF is an AlgorithmIdentifier SEQUENCE.
        if der.first() == Some(&0x30) {
            prf = yasna::parse_der(&der, |r| {
                r.read_sequence(|r| {
                    let id = r.next().read_oid()?;
                    r.read_optional(|r| r.read_null())?;
                    if is(&id, oid::HMAC_SHA256) {
                        Ok(Prf::HmacSha256)
                    } else if is(&id, oid::HMAC_SHA1) {
                        Ok(Prf::HmacSha1)
                    } else {
                        Err(invalid())
                    }
                })
            })?;
        }
    }
    Ok((prf, salt, iterations))
}

/// `MacData { DigestInfo { alg, digest }, macSalt, iterations DEFAULT 1 }`
fn read_mac_data(r: BERReader) -> Result<MacData, ASN1Error> {
    r.read_sequence(|r| {
        let (digest, expected) = r.next().read_sequence(|r| {
            let digest = r.next().read_sequence(|r| {
                let id = r.next().read_oid()?;
                r.read_optional(|r| r.read_null())?;
                if is(&id, oid::SHA256) {
                    Ok(MacDigest::Sha256)
                } else if is(&id, oid::SHA1) {
                    Ok(MacDigest::Sha1)
                } else {
                    Err(invalid())
                }
            })?;
            Ok((digest, r.next().read_bytes()?))
        })?;
        let salt = r.next().read_bytes()?;
        let iterations = r.read_optional(|r| r.read_u32())?.unwrap_or(1);
        Ok(MacData {
            digest,
            expected,
            salt,
            iterations,
        })
    })
}

fn check_mac(mac: &MacData, auth_safe: &[u8], bmp_password: &[u8]) -> Result<(), Error> {
    let matches = match mac.digest {
        MacDigest::Sha1 => {
            let key = kdf::derive::<Sha1>(Purpose::Mac, bmp_password, &mac.salt, mac.iterations, 20);
            kdf::mac_matches::<Hmac<Sha1>>(&key, auth_safe, &mac.expected)?
        }
        MacDigest::Sha256 => {
            let key =
                kdf::derive::<Sha256>(Purpose::Mac, bmp_password, &mac.salt, mac.iterations, 32);
            kdf::mac_matches::<Hmac<Sha256>>(&key, auth_safe, &mac.expected)?
        }
    };
    if !matches {
        return Err(Error::Credential(
            "PKCS#12 MAC verification failed (wrong password?)".into(),
        ));
    }
    Ok(())
}

fn decrypt(enc: &Encrypted, password: &str, bmp_password: &[u8]) -> Result<Vec<u8>, Error> {
    match &enc.protection {
        Protection::Pbe3Des { salt, iterations } => {
            kdf::decrypt_pbe_sha1_3des(&enc.ciphertext, bmp_password, salt, *iterations)
        }
        Protection::Pbes2 {
            prf,
            salt,
            iterations,
            iv,
        } => kdf::decrypt_pbes2_aes256(&enc.ciphertext, password, *prf, salt, *iterations, iv),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const PASSWORD: &str = "1234567890";

    fn read(name: &str) -> Vec<u8> {
        std::fs::read(Path::new("../../test-data/keys").join(name)).unwrap()
    }

    #[test]
    fn test_parse_pbes2_aes() {
        let contents = parse_pfx(&read("signer.p12"), PASSWORD).unwrap();
        assert_eq!(contents.private_keys.len(), 1);
        // Signer certificate plus the CA added with -certfile.
        assert_eq!(contents.certificates.len(), 2);
        assert_eq!(contents.private_keys[0][0], 0x30);
    }

    #[test]
    fn test_parse_legacy_3des() {
        let contents = parse_pfx(&read("signer-3des.p12"), PASSWORD).unwrap();
        assert_eq!(contents.private_keys.len(), 1);
        assert_eq!(contents.certificates.len(), 1);
    }

    #[test]
    fn test_both_encodings_hold_the_same_certificate() {
        let a = parse_pfx(&read("signer.p12"), PASSWORD).unwrap();
        let b = parse_pfx(&read("signer-3des.p12"), PASSWORD).unwrap();
        assert!(a.certificates.contains(&b.certificates[0]));
    }

    #[test]
    fn test_wrong_password() {
        for name in ["signer.p12", "signer-3des.p12"] {
            let err = parse_pfx(&read(name), "wrong").unwrap_err();
            assert!(
                matches!(err, Error::Credential(ref msg) if msg.contains("MAC verification failed")),
                "{name}: {err}"
            );
        }
    }

    #[test]
    fn test_not_a_pfx() {
        assert!(matches!(
            parse_pfx(&read("signer-cert.der"), PASSWORD),
            Err(Error::Credential(_))
        ));
    }
}
