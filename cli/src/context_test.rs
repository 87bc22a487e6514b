use super::*;
use supadash::Metadata;
use uuid::Uuid;

#[test]
fn session_path_under_home() {
    assert_eq!(
        default_session_path(Some(Path::new("/home/alice"))),
        PathBuf::from("/home/alice/.supadash/session.json")
    );
    assert_eq!(default_session_path(None), PathBuf::from(".supadash/session.json"));
}

#[test]
fn flags_override_env_but_keep_other_fields() {
    let env = BackendConfig::new("http://env:8000", "env-key")
        .with_service_role_key("service-key")
        .with_site_url("http://site");

    let config = resolve_config(Some("http://flag:9000/".into()), None, env.clone());
    assert_eq!(config.url, "http://flag:9000");
    assert_eq!(config.anon_key, "env-key");
    assert_eq!(config.service_role_key.as_deref(), Some("service-key"));
    assert_eq!(config.site_url.as_deref(), Some("http://site"));

    assert_eq!(resolve_config(None, None, env.clone()), env);
}

#[test]
fn verbosity_maps_to_filter() {
    assert_eq!(log_filter(0), "warn");
    assert_eq!(log_filter(1), "info");
    assert_eq!(log_filter(5), "debug");
}

#[test]
fn user_json_includes_display_name() {
    let mut metadata = Metadata::new();
    metadata.insert("display_name".into(), "Alice".into());
    let user = User {
        id: Uuid::nil(),
        email: Some("alice@example.com".into()),
        phone: None,
        is_anonymous: false,
        user_metadata: metadata,
        email_confirmed_at: Some("2025-03-09T12:00:00Z".into()),
        phone_confirmed_at: None,
        created_at: None,
    };
    let value = user_json(&user);
    assert_eq!(value["display_name"], "Alice");
    assert_eq!(value["email"], "alice@example.com");
    assert_eq!(value["confirmed"], true);
    assert!(value["phone"].is_null());
}
