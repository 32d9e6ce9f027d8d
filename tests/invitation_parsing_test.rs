//! Tests for invitation email parsing and the token/QR helpers.

use std::collections::HashSet;

use proptest::prelude::*;

use rollcall::utils::helpers::{
    generate_invite_token, generate_qr_code, parse_email_list, qr_image_url,
};

#[test]
fn parsing_lowercases_dedupes_and_preserves_first_seen_order() {
    let (valid, invalid) = parse_email_list("a@x.com, a@x.com; B@X.com\nc@x.com");
    assert_eq!(valid, vec!["a@x.com", "b@x.com", "c@x.com"]);
    assert!(invalid.is_empty());
}

#[test]
fn mixed_separators_and_whitespace_are_tolerated() {
    let (valid, invalid) =
        parse_email_list("  one@x.com ;two@x.com\n three@x.com,\n\nfour@x.com  ");
    assert_eq!(
        valid,
        vec!["one@x.com", "two@x.com", "three@x.com", "four@x.com"]
    );
    assert!(invalid.is_empty());
}

#[test]
fn invalid_entries_are_collected_not_dropped() {
    let (valid, invalid) = parse_email_list("ok@x.com, garbage, also@bad");
    assert_eq!(valid, vec!["ok@x.com"]);
    assert_eq!(invalid, vec!["garbage", "also@bad"]);
}

#[test]
fn invite_tokens_are_distinct_hex_strings() {
    let mut seen = HashSet::new();
    for _ in 0..100 {
        let token = generate_invite_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(seen.insert(token), "invite tokens must not repeat");
    }
}

#[test]
fn qr_codes_stay_unique_across_the_same_user_event_pair() {
    let mut seen = HashSet::new();
    for _ in 0..100 {
        let code = generate_qr_code(7, 42);
        assert!(seen.insert(code), "QR codes must not repeat");
    }
}

#[test]
fn qr_codes_are_url_safe() {
    let code = generate_qr_code(123, 456);
    assert!(code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-'));

    let url = qr_image_url("https://api.qrserver.com/v1/create-qr-code/", &code);
    assert!(url.contains(&code));
}

proptest! {
    /// Re-parsing the joined output of a parse yields the same list:
    /// parsing is idempotent over its own output.
    #[test]
    fn parsing_is_idempotent(input in "[a-zA-Z0-9@. ,;\n]{0,200}") {
        let (first, _) = parse_email_list(&input);
        let rejoined = first.join(", ");
        let (second, invalid) = parse_email_list(&rejoined);
        prop_assert_eq!(first, second);
        prop_assert!(invalid.is_empty());
    }

    /// Every parsed address is lower-cased and contains exactly one '@'.
    #[test]
    fn parsed_addresses_are_normalized(input in "[a-zA-Z0-9@. ,;\n+_-]{0,200}") {
        let (valid, _) = parse_email_list(&input);
        for addr in valid {
            prop_assert_eq!(addr.clone(), addr.to_lowercase());
            prop_assert_eq!(addr.matches('@').count(), 1);
        }
    }
}
