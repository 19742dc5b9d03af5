//! Signature verification for the local payment gateway (VNPay).
//!
//! The gateway delivers callbacks as query strings carrying an HMAC-SHA512
//! `vnp_SecureHash` over the remaining parameters, sorted by name and
//! form-urlencoded. Both the client-redirect return and the server-to-server
//! IPN use the same scheme.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::collections::BTreeMap;
use url::form_urlencoded;

type HmacSha512 = Hmac<Sha512>;

pub const PARAM_SECURE_HASH: &str = "vnp_SecureHash";
pub const PARAM_SECURE_HASH_TYPE: &str = "vnp_SecureHashType";
pub const PARAM_TXN_REF: &str = "vnp_TxnRef";
pub const PARAM_RESPONSE_CODE: &str = "vnp_ResponseCode";
/// Gateway response code for a completed payment.
pub const RESPONSE_CODE_SUCCESS: &str = "00";

#[derive(Clone)]
pub struct VnpayGateway {
    hash_secret: String,
}

impl VnpayGateway {
    pub fn new(hash_secret: impl Into<String>) -> Self {
        Self {
            hash_secret: hash_secret.into(),
        }
    }

    /// Computes the signature over the sorted, form-urlencoded parameters,
    /// excluding the hash fields themselves.
    pub fn sign(&self, params: &BTreeMap<String, String>) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            if key == PARAM_SECURE_HASH || key == PARAM_SECURE_HASH_TYPE {
                continue;
            }
            serializer.append_pair(key, value);
        }
        let signed_data = serializer.finish();

        let mut mac = HmacSha512::new_from_slice(self.hash_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(signed_data.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verifies the `vnp_SecureHash` carried by a callback.
    pub fn verify_signature(&self, params: &BTreeMap<String, String>) -> bool {
        let Some(received) = params.get(PARAM_SECURE_HASH) else {
            return false;
        };
        let expected = self.sign(params);
        constant_time_eq(&expected, &received.to_ascii_lowercase())
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}
