//! Telegram Web App init data verification
//!
//! `secret_key = HMAC_SHA256(key = "WebAppData", msg = bot_token)` and the
//! expected `hash` is `hex(HMAC_SHA256(key = secret_key, msg = check_string))`,
//! where the check string is every other field as `key=value`, sorted by
//! key and joined with `\n`.

use hmac::{Hmac, Mac};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use shared::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// Init data is a bare query string; this base turns it into a URL
const QUERY_BASE: &str = "http://init.data/";

/// Init data accepted as the test user when test mode is on
pub const TEST_TOKEN: &str = "test";
pub const TEST_USER_ID: i64 = 123_456_789;

/// The `user` field of init data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

impl TelegramUser {
    pub fn test_user() -> Self {
        Self {
            id: TEST_USER_ID,
            first_name: "Test".into(),
            last_name: Some("User".into()),
            username: Some("testuser".into()),
            language_code: Some("en".into()),
        }
    }

    pub fn is_test_user(&self) -> bool {
        self.id == TEST_USER_ID
    }
}

/// Decode `application/x-www-form-urlencoded` init data into pairs
pub fn parse_fields(init_data: &str) -> Vec<(String, String)> {
    match Url::parse(&format!("{QUERY_BASE}?{init_data}")) {
        Ok(url) => url.query_pairs().into_owned().collect(),
        Err(_) => Vec::new(),
    }
}

/// Encode pairs the way the Telegram client sends them
pub fn encode_fields(fields: &[(String, String)]) -> String {
    let Ok(mut url) = Url::parse(QUERY_BASE) else {
        return String::new();
    };
    url.query_pairs_mut().extend_pairs(fields);
    url.query().unwrap_or_default().to_string()
}

/// Canonical check string over every field except `hash`
pub fn data_check_string(fields: &[(String, String)]) -> String {
    let mut pairs: Vec<&(String, String)> = fields.iter().filter(|(k, _)| k != "hash").collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lowercase hex signature of a check string for `bot_token`
pub fn sign(check_string: &str, bot_token: &str) -> Option<String> {
    let mut key_mac = HmacSha256::new_from_slice(WEB_APP_DATA_KEY).ok()?;
    key_mac.update(bot_token.as_bytes());
    let secret_key = key_mac.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret_key).ok()?;
    mac.update(check_string.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Whether `init_data` carries a valid signature for `bot_token`
///
/// Malformed input is simply invalid.
pub fn verify(init_data: &str, bot_token: &str) -> bool {
    let fields = parse_fields(init_data);
    let Some(hash) = fields.iter().find(|(k, _)| k == "hash").map(|(_, v)| v.as_str()) else {
        return false;
    };
    sign(&data_check_string(&fields), bot_token).is_some_and(|expected| expected == hash)
}

/// Verifies init data and extracts the Telegram user
#[derive(Debug, Clone)]
pub struct InitDataVerifier {
    bot_token: String,
    test_mode: bool,
}

impl InitDataVerifier {
    pub fn new(bot_token: impl Into<String>, test_mode: bool) -> Self {
        Self {
            bot_token: bot_token.into(),
            test_mode,
        }
    }

    /// Authenticate a request's init data
    ///
    /// Fails with `InitDataInvalid` on a bad signature or a missing or
    /// unparseable `user` field.
    pub fn authenticate(&self, init_data: &str) -> Result<TelegramUser, AppError> {
        if self.test_mode && init_data == TEST_TOKEN {
            return Ok(TelegramUser::test_user());
        }
        if !verify(init_data, &self.bot_token) {
            tracing::debug!("Init data signature mismatch");
            return Err(AppError::invalid_init_data());
        }

        let fields = parse_fields(init_data);
        let raw_user = fields
            .iter()
            .find(|(k, _)| k == "user")
            .map(|(_, v)| v.as_str())
            .ok_or_else(AppError::invalid_init_data)?;
        serde_json::from_str(raw_user).map_err(|e| {
            tracing::debug!(error = %e, "Init data user field is not valid JSON");
            AppError::invalid_init_data()
        })
    }
}
