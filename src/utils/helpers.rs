//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use rand::Rng;
use regex::Regex;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

/// Validate email format (RFC-light)
pub fn is_valid_email(email: &str) -> bool {
    let re = EMAIL_RE.get_or_init(|| {
        Regex::new(r"(?i)^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}$").expect("email pattern compiles")
    });
    re.is_match(email)
}

/// Validate phone number format (basic validation)
pub fn is_valid_phone(phone: &str) -> bool {
    phone
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == ' ' || c == '(' || c == ')')
        && phone.chars().filter(|c| c.is_ascii_digit()).count() >= 7
}

/// Parse a free-text recipient list into (valid, invalid) addresses.
///
/// Addresses are separated by commas, semicolons or newlines, lower-cased
/// and deduplicated preserving first-seen order.
pub fn parse_email_list(text: &str) -> (Vec<String>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut valid = Vec::new();
    let mut invalid = Vec::new();

    for raw in text.split(|c| c == ',' || c == ';' || c == '\n') {
        let addr = raw.trim().to_lowercase();
        if addr.is_empty() {
            continue;
        }
        if !seen.insert(addr.clone()) {
            continue;
        }
        if is_valid_email(&addr) {
            valid.push(addr);
        } else {
            invalid.push(addr);
        }
    }

    (valid, invalid)
}

/// Generate a random alphanumeric string
pub fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                            abcdefghijklmnopqrstuvwxyz\
                            0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Generate a single-use invite token (hex-encoded random bytes)
pub fn generate_invite_token() -> String {
    let mut rng = rand::thread_rng();
    (0..32).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

/// Generate a QR code payload for a registration.
///
/// Bound to the (user, event) pair, salted for uniqueness across
/// re-invites. The result is URL-safe.
pub fn generate_qr_code(user_id: i64, event_id: i64) -> String {
    format!(
        "RC-{:x}-{:x}-{}",
        event_id,
        user_id,
        generate_random_string(10)
    )
}

/// Build the third-party QR image URL embedding the given payload
pub fn qr_image_url(image_base: &str, payload: &str) -> String {
    format!(
        "{}?size=300x300&data={}",
        image_base,
        urlencoding::encode(payload)
    )
}

/// Format a timestamp for display
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Calculate pagination offset
pub fn calculate_offset(page: usize, page_size: usize) -> usize {
    page.saturating_sub(1) * page_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_email_list_dedupes_and_lowercases() {
        let (valid, invalid) = parse_email_list("a@x.com, a@x.com; B@X.com\nc@x.com");
        assert_eq!(valid, vec!["a@x.com", "b@x.com", "c@x.com"]);
        assert!(invalid.is_empty());
    }

    #[test]
    fn test_parse_email_list_collects_invalid() {
        let (valid, invalid) = parse_email_list("good@x.com, not-an-email; also bad");
        assert_eq!(valid, vec!["good@x.com"]);
        assert_eq!(invalid.len(), 2);
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("User.Name+tag@sub.example.org"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("no-at-sign"));
    }

    #[test]
    fn test_is_valid_phone() {
        assert!(is_valid_phone("+7 (912) 345-67-89"));
        assert!(!is_valid_phone("call me"));
        assert!(!is_valid_phone("12345"));
    }

    #[test]
    fn test_invite_token_is_hex() {
        let token = generate_invite_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_qr_codes_are_unique_for_same_pair() {
        let a = generate_qr_code(7, 42);
        let b = generate_qr_code(7, 42);
        assert_ne!(a, b);
        assert!(a.starts_with("RC-2a-7-"));
    }

    #[test]
    fn test_qr_image_url_escapes_payload() {
        let url = qr_image_url("https://api.qrserver.com/v1/create-qr-code/", "RC 1/2");
        assert!(url.contains("data=RC%201%2F2"));
    }

    #[test]
    fn test_calculate_offset() {
        assert_eq!(calculate_offset(1, 20), 0);
        assert_eq!(calculate_offset(3, 20), 40);
        assert_eq!(calculate_offset(0, 20), 0);
    }
}
