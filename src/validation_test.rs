use super::*;
use crate::error::ErrorKind;

#[test]
fn normalize_email_accepts_basic_address() {
    assert_eq!(normalize_email("  Alice@Example.com "), Some("alice@example.com".to_owned()));
}

#[test]
fn normalize_email_rejects_invalid_values() {
    assert_eq!(normalize_email(""), None);
    assert_eq!(normalize_email("alice"), None);
    assert_eq!(normalize_email("@example.com"), None);
    assert_eq!(normalize_email("alice@"), None);
    assert_eq!(normalize_email("a@b@c"), None);
    assert_eq!(normalize_email("al ice@example.com"), None);
}

#[test]
fn normalize_phone_strips_formatting() {
    assert_eq!(normalize_phone("+1 (555) 010-0199"), Some("+15550100199".to_owned()));
    assert_eq!(normalize_phone("8613800138000"), Some("+8613800138000".to_owned()));
}

#[test]
fn normalize_phone_rejects_bad_shapes() {
    assert_eq!(normalize_phone("12345"), None);
    assert_eq!(normalize_phone("+1234567890123456"), None);
    assert_eq!(normalize_phone("555-CALL-NOW"), None);
    assert_eq!(normalize_phone("++15550100199"), None);
}

#[test]
fn parse_identifier_picks_email_or_phone() {
    assert_eq!(parse_identifier("alice@example.com").unwrap(), Identifier::Email("alice@example.com".into()));
    assert_eq!(parse_identifier("+15550100199").unwrap(), Identifier::Phone("+15550100199".into()));
    let parsed: Identifier = "bob@example.com".parse().unwrap();
    assert_eq!(parsed.field(), "email");
}

#[test]
fn parse_identifier_rejects_malformed() {
    let err = parse_identifier("not-a-phone").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedIdentifier);
    let err = parse_identifier("alice@").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedIdentifier);
}

#[test]
fn validate_password_checks_match_then_length() {
    assert_eq!(
        validate_password("secret1", "secret2"),
        Err(AuthError::Validation("Passwords do not match".into()))
    );
    assert_eq!(
        validate_password("abc", "abc"),
        Err(AuthError::Validation("Password must be at least 6 characters".into()))
    );
    assert_eq!(validate_password("secret1", "secret1"), Ok(()));
}

#[test]
fn validate_title_trims_and_requires_value() {
    assert_eq!(validate_title("  Buy milk "), Ok("Buy milk".to_owned()));
    assert!(matches!(validate_title(""), Err(DataError::Validation(_))));
    assert!(matches!(validate_title("   "), Err(DataError::Validation(_))));
}

#[test]
fn validate_otp_code_requires_six_digits() {
    assert_eq!(validate_otp_code(" 123456 "), Ok("123456".to_owned()));
    assert!(validate_otp_code("12345").is_err());
    assert!(validate_otp_code("1234567").is_err());
    assert!(validate_otp_code("12a456").is_err());
}
