use std::sync::LazyLock;

use email_address::EmailAddress;
use regex::Regex;
use url::Url;
use uuid::Uuid;

static USERNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9_.]{3,30}$").expect("username pattern is valid")
});

/// Returns `true` if the provided string is a syntactically valid email address.
pub fn is_valid_email(value: &str) -> bool {
    EmailAddress::is_valid(value)
}

/// Returns `true` if the provided string parses as a URL with a scheme.
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}

/// Returns `true` if the provided string parses as a UUID.
pub fn is_valid_uuid(value: &str) -> bool {
    Uuid::parse_str(value).is_ok()
}

/// Lowercase letters, digits, `_` and `.`, 3 to 30 characters.
pub fn is_valid_username(value: &str) -> bool {
    USERNAME.is_match(value)
}

/// Derives a username candidate from the local part of an email address.
pub fn username_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut candidate: String = local
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
        .take(30)
        .collect();
    while candidate.len() < 3 {
        candidate.push('_');
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("test@example.com"));
        assert!(!is_valid_email("invalid"));
    }

    #[test]
    fn url_validation() {
        assert!(is_valid_url("https://example.com"));
        assert!(!is_valid_url("not-a-url"));
    }

    #[test]
    fn uuid_validation() {
        assert!(is_valid_uuid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_valid_uuid("not-a-uuid"));
    }

    #[test]
    fn username_rules() {
        assert!(is_valid_username("jane.doe_1"));
        assert!(!is_valid_username("Jane"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("has space"));
    }

    #[test]
    fn username_from_email_is_valid() {
        assert_eq!(username_from_email("Jane.Doe+tag@example.com"), "jane.doetag");
        assert_eq!(username_from_email("a@example.com"), "a__");
        assert!(is_valid_username(&username_from_email("x-y@example.com")));
    }
}
