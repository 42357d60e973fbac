//! Callback authentication strategies shared by the adapters.
//!
//! Three schemes cover the provider protocols seen in the wild: HMAC over
//! the raw request body compared against a header, a keyed hash over a
//! canonical sorted concatenation of selected fields compared against an
//! embedded field, and an IP allow-list as a supplementary control.

use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// Constant-time byte comparison.
pub fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0_u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

pub fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

pub fn hmac_sha256_hex(payload: &[u8], secret: &str) -> String {
    hex::encode(hmac_sha256(payload, secret))
}

pub fn hmac_sha256_base64(payload: &[u8], secret: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(hmac_sha256(payload, secret))
}

fn hmac_sha256(payload: &[u8], secret: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("hmac accepts keys of any length");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

pub fn verify_hmac_sha256_hex(payload: &[u8], secret: &str, signature: &str) -> bool {
    secure_eq(
        hmac_sha256_hex(payload, secret).as_bytes(),
        signature.trim().as_bytes(),
    )
}

pub fn verify_hmac_sha256_base64(payload: &[u8], secret: &str, signature: &str) -> bool {
    secure_eq(
        hmac_sha256_base64(payload, secret).as_bytes(),
        signature.trim().as_bytes(),
    )
}

/// Keyed hash over a canonical field concatenation: take the allowed keys
/// present in `params` in sorted key order, join their values with
/// `separator`, append the secret, SHA-256 the result. Field-embedded
/// signature schemes (signed forms) use this on both sides of the wire.
pub fn sign_sorted_fields(
    params: &BTreeMap<String, String>,
    allowed_keys: &[&str],
    separator: &str,
    secret: &str,
) -> String {
    // BTreeMap iteration is already in sorted key order.
    let mut values: Vec<&str> = params
        .iter()
        .filter(|(k, _)| allowed_keys.contains(&k.as_str()))
        .map(|(_, v)| v.as_str())
        .collect();
    values.push(secret);

    let joined = values.join(separator);
    hex::encode(Sha256::digest(joined.as_bytes()))
}

pub fn verify_sorted_fields(
    params: &BTreeMap<String, String>,
    allowed_keys: &[&str],
    separator: &str,
    secret: &str,
    signature: &str,
) -> bool {
    secure_eq(
        sign_sorted_fields(params, allowed_keys, separator, secret).as_bytes(),
        signature.trim().as_bytes(),
    )
}

/// Supplementary (never sole) source-address control. An empty list allows
/// everything, so adapters can leave it unconfigured.
#[derive(Debug, Clone, Default)]
pub struct IpAllowList {
    ips: Vec<String>,
}

impl IpAllowList {
    pub fn new(ips: Vec<String>) -> Self {
        Self { ips }
    }

    pub fn is_empty(&self) -> bool {
        self.ips.is_empty()
    }

    pub fn allows(&self, remote_ip: Option<&str>) -> bool {
        if self.ips.is_empty() {
            return true;
        }
        match remote_ip {
            Some(ip) => self.ips.iter().any(|allowed| allowed == ip),
            None => false,
        }
    }
}
