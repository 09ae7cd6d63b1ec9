//! Signed connection URLs for the Xunfei IAT WebSocket API.
//!
//! Xunfei authenticates WebSocket upgrades through query parameters: an
//! HMAC-SHA256 signature over `host`, `date`, and the HTTP request line,
//! wrapped in a base64 authorization token. The signature is a pure function
//! of the credentials and the supplied timestamp; callers pass `now`
//! explicitly so signing stays deterministic under test.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::OffsetDateTime;
use time::macros::format_description;
use url::Url;

use crate::core::stt::base::{RecognitionConfig, SttError};

type HmacSha256 = Hmac<Sha256>;

/// Format `now` as an IMF-fixdate HTTP date, e.g.
/// `Tue, 07 Jun 2022 10:00:00 GMT`.
///
/// This matches JavaScript's `Date.toUTCString()`, which the service verifies
/// the signature against; the same string must appear in both the canonical
/// string and the `date` query parameter.
pub fn http_date(now: OffsetDateTime) -> Result<String, SttError> {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] \
         [hour]:[minute]:[second] GMT"
    );
    now.to_offset(time::UtcOffset::UTC)
        .format(&format)
        .map_err(|e| SttError::ConfigurationError(format!("failed to format date: {e}")))
}

/// Compute the base64 `authorization` token for one upgrade request.
///
/// Canonical string: `host: {host}\ndate: {date}\n{request_line}`, signed with
/// HMAC-SHA256 keyed by the API secret.
pub fn authorization_token(
    config: &RecognitionConfig,
    host: &str,
    request_line: &str,
    date: &str,
) -> Result<String, SttError> {
    config.validate()?;

    let canonical = format!("host: {host}\ndate: {date}\n{request_line}");

    let mut mac = HmacSha256::new_from_slice(config.api_secret.as_bytes())
        .map_err(|e| SttError::ConfigurationError(format!("invalid api_secret: {e}")))?;
    mac.update(canonical.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    let authorization_origin = format!(
        "api_key=\"{}\", algorithm=\"hmac-sha256\", headers=\"host date request-line\", \
         signature=\"{signature}\"",
        config.api_key
    );
    Ok(BASE64.encode(authorization_origin.as_bytes()))
}

/// Build the full signed connection URL.
///
/// Appends `authorization`, `date`, and `host` as query parameters to
/// `base_url` (the fixed service URL). Signing before the credentials
/// validate fails with [`SttError::ConfigurationError`].
pub fn signed_url(
    config: &RecognitionConfig,
    base_url: &str,
    host: &str,
    request_line: &str,
    now: OffsetDateTime,
) -> Result<Url, SttError> {
    let date = http_date(now)?;
    let authorization = authorization_token(config, host, request_line, &date)?;

    let mut url = Url::parse(base_url)
        .map_err(|e| SttError::ConfigurationError(format!("invalid service URL: {e}")))?;
    url.query_pairs_mut()
        .append_pair("authorization", &authorization)
        .append_pair("date", &date)
        .append_pair("host", host);
    Ok(url)
}
