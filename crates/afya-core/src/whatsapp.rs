//! WhatsApp click-to-chat deep links

use anyhow::{Context, Result, bail};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://wa.me/";
pub const DEFAULT_SUPPORT_NUMBER: &str = "254700000000";

/// Characters `encodeURIComponent` leaves alone
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a query component; spaces become `%20`
pub fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, URI_COMPONENT).to_string()
}

/// Builds `https://wa.me/<number>?text=<message>` links for one support number
#[derive(Debug, Clone)]
pub struct WhatsAppLink {
    base: String,
    number: String,
}

impl WhatsAppLink {
    /// `number` is E.164 with or without the leading `+`
    pub fn new(base_url: &str, number: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .with_context(|| format!("Invalid WhatsApp base URL: {}", base_url))?;
        if !matches!(base.scheme(), "http" | "https") {
            bail!("WhatsApp base URL must be http(s): {}", base_url);
        }
        // The number and `?text=` are appended to the root
        if base.path() != "/" || base.query().is_some() || base.fragment().is_some() {
            bail!("WhatsApp base URL must be a bare origin like https://wa.me/: {}", base_url);
        }

        let number = number.trim().trim_start_matches('+');
        if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
            bail!("WhatsApp number must be digits only: {:?}", number);
        }

        Ok(Self {
            base: base.to_string(),
            number: number.to_string(),
        })
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    /// Deep link that opens a chat prefilled with `message`
    pub fn url_for(&self, message: &str) -> String {
        format!("{}{}?text={}", self.base, self.number, encode_component(message))
    }
}

impl Default for WhatsAppLink {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_URL.to_string(),
            number: DEFAULT_SUPPORT_NUMBER.to_string(),
        }
    }
}
