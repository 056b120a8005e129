use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::warn;

/// International dialing prefix every destination identifier starts with.
pub const COUNTRY_PREFIX: &str = "972";

/// Local mobile numbers are dialed with a trunk zero: `05X-XXXXXXX`.
const TRUNK_MOBILE_PREFIX: &str = "05";

const MOBILE_PREFIX: char = '5';
const BARE_MOBILE_LEN: usize = 9;

static NON_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").expect("valid regex"));

/// Missing and unrecognized phones share this single failure kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneError {
    #[error("phone number is missing or not in a recognized format")]
    InvalidPhone,
}

/// Canonical destination identifier accepted by the dispatch backend
/// (country prefix followed by the subscriber number, digits only).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination(String);

impl Destination {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Convert a phone as typed by an operator into a [`Destination`].
///
/// Separators are ignored. Numbers already carrying the country prefix are
/// kept, `05…` loses its trunk zero and gains the prefix, and a bare nine
/// digit `5…` mobile gains the prefix. Anything else is rejected.
pub fn normalize_phone(raw: Option<&str>) -> Result<Destination, PhoneError> {
    let raw = match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(PhoneError::InvalidPhone),
    };

    let digits = NON_DIGITS.replace_all(raw, "");

    if digits.starts_with(COUNTRY_PREFIX) {
        return Ok(Destination(digits.into_owned()));
    }
    if digits.starts_with(TRUNK_MOBILE_PREFIX) {
        return Ok(Destination(format!("{COUNTRY_PREFIX}{}", &digits[1..])));
    }
    if digits.len() == BARE_MOBILE_LEN && digits.starts_with(MOBILE_PREFIX) {
        return Ok(Destination(format!("{COUNTRY_PREFIX}{digits}")));
    }

    warn!(phone = raw, "could not normalize phone number");
    Err(PhoneError::InvalidPhone)
}
