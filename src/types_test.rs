use super::*;

fn user_json() -> Value {
    serde_json::json!({
        "id": "8f6b0c3e-2f7a-4f5e-9a51-1f6a2a2b9c11",
        "aud": "authenticated",
        "role": "authenticated",
        "email": "alice@example.com",
        "phone": "",
        "email_confirmed_at": "2025-03-09T12:00:00.123456Z",
        "app_metadata": { "provider": "email" },
        "user_metadata": { "display_name": "Alice" },
        "identities": [],
        "created_at": "2025-03-09T12:00:00.123456Z",
        "updated_at": "2025-03-09T12:00:00.123456Z",
        "is_anonymous": false
    })
}

#[test]
fn user_parses_gotrue_shape_and_blank_phone() {
    let user: User = serde_json::from_value(user_json()).unwrap();
    assert_eq!(user.email.as_deref(), Some("alice@example.com"));
    assert_eq!(user.phone, None);
    assert!(user.is_confirmed());
    assert!(user.created_at.is_some());
    assert_eq!(user.identifier(), Some("alice@example.com"));
    assert_eq!(user.display_name(), "Alice");
}

#[test]
fn user_display_name_falls_back_to_email_local_part() {
    let mut raw = user_json();
    raw["user_metadata"] = serde_json::json!({});
    let user: User = serde_json::from_value(raw).unwrap();
    assert_eq!(user.display_name(), "alice");
}

#[test]
fn anonymous_user_has_no_identifier() {
    let user: User = serde_json::from_value(serde_json::json!({
        "id": "8f6b0c3e-2f7a-4f5e-9a51-1f6a2a2b9c11",
        "email": "",
        "is_anonymous": true
    }))
    .unwrap();
    assert!(user.is_anonymous);
    assert_eq!(user.identifier(), None);
    assert_eq!(user.display_name(), "anonymous");
}

#[test]
fn session_expiry_uses_margin() {
    let user: User = serde_json::from_value(user_json()).unwrap();
    let session = Session {
        access_token: "a".into(),
        refresh_token: "r".into(),
        token_type: "bearer".into(),
        expires_in: 3600,
        expires_at: 10_000,
        user,
    };
    assert_eq!(session.issued_at(), 6_400);
    assert!(!session.is_expired_at(9_000));
    assert!(session.is_expired_at(10_000 - EXPIRY_MARGIN_SECS));
    assert!(session.is_expired_at(20_000));
}

#[test]
fn session_debug_redacts_tokens() {
    let user: User = serde_json::from_value(user_json()).unwrap();
    let session = Session {
        access_token: "secret-access".into(),
        refresh_token: "secret-refresh".into(),
        token_type: "bearer".into(),
        expires_in: 3600,
        expires_at: 10_000,
        user,
    };
    let printed = format!("{session:?}");
    assert!(!printed.contains("secret-access"));
    assert!(!printed.contains("secret-refresh"));
    assert!(printed.contains("<redacted>"));
}

#[test]
fn todo_parses_postgrest_row() {
    let todo: Todo = serde_json::from_value(serde_json::json!({
        "id": 3,
        "title": "Buy milk",
        "completed": false,
        "created_at": "2025-03-09T12:00:00.123456+00:00",
        "user_id": "8f6b0c3e-2f7a-4f5e-9a51-1f6a2a2b9c11"
    }))
    .unwrap();
    assert_eq!(todo.id, 3);
    assert!(!todo.completed);
    assert_eq!(todo.created_at.year(), 2025);
}

#[test]
fn identifier_field_names() {
    assert_eq!(Identifier::Email("a@b.c".into()).field(), "email");
    assert_eq!(Identifier::Phone("+15550100".into()).field(), "phone");
    assert_eq!(Identifier::Phone("+15550100".into()).to_string(), "+15550100");
}
