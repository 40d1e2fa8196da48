//! Request-signing helpers shared by the exchange adapters.

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha2::{Sha256, Sha512};

/// Lowercase hex HMAC-SHA512, as used by the Poloniex and Bittrex schemes.
pub fn hmac_sha512_hex(secret: &[u8], message: &[u8]) -> Result<String> {
    let mut mac = Hmac::<Sha512>::new_from_slice(secret)
        .map_err(|_| anyhow!("invalid HMAC key length"))?;
    mac.update(message);
    Ok(to_hex(&mac.finalize().into_bytes()))
}

/// Base64 HMAC-SHA256 with a base64-encoded secret, the Coinbase Exchange
/// scheme.
pub fn hmac_sha256_base64(secret_b64: &str, message: &[u8]) -> Result<String> {
    let secret = STANDARD
        .decode(secret_b64)
        .map_err(|e| anyhow!("API secret is not valid base64: {e}"))?;
    let mut mac = Hmac::<Sha256>::new_from_slice(&secret)
        .map_err(|_| anyhow!("invalid HMAC key length"))?;
    mac.update(message);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Lowercase hex HMAC-SHA256 with a plain-text secret, the Coinbase wallet
/// API scheme.
pub fn hmac_sha256_hex(secret: &[u8], message: &[u8]) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .map_err(|_| anyhow!("invalid HMAC key length"))?;
    mac.update(message);
    Ok(to_hex(&mac.finalize().into_bytes()))
}

/// Uppercase hex MD5 digest, the CoinEx parameter-signature scheme.
pub fn md5_hex_upper(message: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(message);
    to_hex(&hasher.finalize()).to_uppercase()
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    bytes.iter().fold(
        String::with_capacity(bytes.len() * 2),
        |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha512_hex_is_stable() {
        // RFC 4231 test case 2 (key "Jefe").
        let sig = hmac_sha512_hex(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            sig,
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea250554\
             9758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
    }

    #[test]
    fn sha256_base64_round_trips() {
        // Secret is base64("secret").
        let sig = hmac_sha256_base64("c2VjcmV0", b"1700000000GET/accounts").unwrap();
        assert!(!sig.is_empty());
        assert!(STANDARD.decode(&sig).is_ok());
    }

    #[test]
    fn sha256_base64_rejects_bad_secret() {
        assert!(hmac_sha256_base64("not-base64!!!", b"message").is_err());
    }

    #[test]
    fn sha256_hex_is_stable() {
        // RFC 4231 test case 2 (key "Jefe").
        let sig = hmac_sha256_hex(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn md5_digest_is_uppercase_hex() {
        // RFC 1321 test suite: md5("abc").
        assert_eq!(
            md5_hex_upper(b"abc"),
            "900150983CD24FB0D6963F7D28E17F72"
        );
    }
}
