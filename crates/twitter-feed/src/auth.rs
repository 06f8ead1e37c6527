//! OAuth 1.0a request signing. The provider requires HMAC-SHA1 signatures
//! on every user-context call, bearer tokens only cover app-only reads.

use crate::{Credentials, FeedError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

/// Everything outside the RFC 3986 unreserved set
/// (ALPHA / DIGIT / "-" / "." / "_" / "~") must be percent-encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'!')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

pub(crate) struct OAuthSigner {
    consumer_key: String,
    consumer_secret: String,
    access_token: String,
    access_token_secret: String,
}

impl OAuthSigner {
    /// Builds a signer from the loaded credentials.
    ///
    /// The full OAuth token pair is required: a bearer token alone is not a
    /// substitute, and a half-present pair is treated the same as an absent
    /// one instead of guessing which half to trust.
    pub(crate) fn new(credentials: &Credentials) -> Result<Self> {
        let (access_token, access_token_secret) = match (
            &credentials.access_token,
            &credentials.access_token_secret,
        ) {
            (Some(token), Some(secret)) => (token.clone(), secret.clone()),
            (None, Some(_)) => {
                return Err(FeedError::MissingCredentials {
                    missing: "TWITTER_ACCESS_TOKEN".to_owned(),
                })
            }
            (Some(_), None) => {
                return Err(FeedError::MissingCredentials {
                    missing: "TWITTER_ACCESS_TOKEN_SECRET".to_owned(),
                })
            }
            (None, None) => {
                return Err(FeedError::MissingCredentials {
                    missing: "TWITTER_ACCESS_TOKEN, TWITTER_ACCESS_TOKEN_SECRET".to_owned(),
                })
            }
        };

        Ok(Self {
            consumer_key: credentials.api_key.clone(),
            consumer_secret: credentials.api_secret.clone(),
            access_token,
            access_token_secret,
        })
    }

    /// Produces the `Authorization` header value for a request.
    ///
    /// `url` is the endpoint without query parameters; `params` carries the
    /// query pairs so they participate in the signature base string.
    pub(crate) fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
    ) -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("BUG: system clock is set before the unix epoch")
            .as_secs()
            .to_string();

        let mut oauth_params = vec![
            ("oauth_consumer_key".to_owned(), self.consumer_key.clone()),
            ("oauth_nonce".to_owned(), generate_nonce()),
            ("oauth_signature_method".to_owned(), "HMAC-SHA1".to_owned()),
            ("oauth_timestamp".to_owned(), timestamp),
            ("oauth_token".to_owned(), self.access_token.clone()),
            ("oauth_version".to_owned(), "1.0".to_owned()),
        ];

        let mut all_params = oauth_params.clone();
        all_params.extend(params.iter().cloned());
        all_params.sort();

        let param_string = all_params
            .iter()
            .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.to_uppercase(),
            percent_encode(url),
            percent_encode(&param_string)
        );

        let signing_key = format!(
            "{}&{}",
            percent_encode(&self.consumer_secret),
            percent_encode(&self.access_token_secret)
        );

        oauth_params.push(("oauth_signature".to_owned(), hmac_sha1(&signing_key, &base_string)));

        let header = oauth_params
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", percent_encode(key), percent_encode(value)))
            .collect::<Vec<_>>()
            .join(", ");

        format!("OAuth {header}")
    }
}

fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

fn generate_nonce() -> String {
    use rand::RngCore as _;

    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);

    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn hmac_sha1(key: &str, data: &str) -> String {
    type HmacSha1 = Hmac<Sha1>;

    // HMAC accepts keys of any length
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .expect("BUG: HMAC key of unsupported length");

    mac.update(data.as_bytes());

    BASE64.encode(mac.finalize().into_bytes())
}
