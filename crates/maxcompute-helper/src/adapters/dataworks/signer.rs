//! Alibaba Cloud RPC signature, version 1.0 with HMAC-SHA1.
//!
//! The canonical query is every parameter except `Signature`, sorted by key,
//! percent-encoded per RFC 3986 and joined with `&`. The string to sign is
//! `{METHOD}&%2F&{encoded canonical query}`, keyed with `{access_key}&`.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use url::form_urlencoded;

use super::http::RequestSigner;
use crate::error::{AppError, AppResult};

type HmacSha1 = Hmac<Sha1>;

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const SIGNATURE_VERSION: &str = "1.0";

/// Signs with a fresh nonce and the current UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcSigner;

impl RequestSigner for RpcSigner {
    fn sign(
        &self,
        method: &str,
        params: &mut BTreeMap<String, String>,
        access_id: &str,
        access_key: &str,
    ) -> AppResult<()> {
        params.insert("AccessKeyId".into(), access_id.into());
        params.insert("SignatureMethod".into(), SIGNATURE_METHOD.into());
        params.insert("SignatureVersion".into(), SIGNATURE_VERSION.into());
        params.insert("SignatureNonce".into(), uuid::Uuid::new_v4().to_string());
        params.insert(
            "Timestamp".into(),
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        );
        params.remove("Signature");
        let signature = signature(method, params, access_key)?;
        params.insert("Signature".into(), signature);
        Ok(())
    }
}

/// RFC 3986 encoding: space is `%20`, `*` is `%2A`, `~` stays literal.
pub(crate) fn percent_encode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace('*', "%2A")
        .replace("%7E", "~")
}

pub(crate) fn string_to_sign(method: &str, params: &BTreeMap<String, String>) -> String {
    let canonical = params
        .iter()
        .filter(|(k, _)| k.as_str() != "Signature")
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{method}&{}&{}", percent_encode("/"), percent_encode(&canonical))
}

pub(crate) fn signature(method: &str, params: &BTreeMap<String, String>, access_key: &str) -> AppResult<String> {
    let mut mac = HmacSha1::new_from_slice(format!("{access_key}&").as_bytes())
        .map_err(|e| AppError::Internal(format!("signing key: {e}")))?;
    mac.update(string_to_sign(method, params).as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
