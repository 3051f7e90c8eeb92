mod common;

use anyhow::Result;
use schoolops_console::session::KeyValueStore;
use schoolops_console::SessionError;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, Request, ResponseTemplate};

#[tokio::test]
async fn set_credential_is_visible_immediately_and_persisted() -> Result<()> {
    let h = common::Harness::start("").await?;
    let session = &h.console.session;

    assert!(!session.is_authenticated());
    session.set_credential("t1");
    assert_eq!(session.credential().as_deref(), Some("t1"));
    assert_eq!(h.store.get("auth_token").as_deref(), Some("t1"));
    assert!(session.is_authenticated());
    Ok(())
}

#[tokio::test]
async fn repeated_credential_write_only_touches_the_store() -> Result<()> {
    let h = common::Harness::start("").await?;
    let session = &h.console.session;
    let mut profile_updates = session.subscribe();

    session.set_credential("t1");
    let writes_after_first = h.store.write_count();
    session.set_credential("t1");

    assert_eq!(session.credential().as_deref(), Some("t1"));
    assert_eq!(h.store.write_count(), writes_after_first + 1);
    assert!(!profile_updates.has_changed()?);
    assert!(h.notifier.messages().is_empty());
    assert!(h.location.redirects().is_empty());
    Ok(())
}

#[tokio::test]
async fn clear_session_is_idempotent() -> Result<()> {
    let h = common::Harness::start("").await?;
    let session = &h.console.session;
    session.set_credential("t1");
    h.store.set("auth_role", "admin")?;

    session.clear_session();
    session.clear_session();

    assert_eq!(session.credential(), None);
    assert_eq!(h.store.get("auth_token"), None);
    assert_eq!(h.store.get("auth_role"), None);
    assert!(session.profile().is_none());
    Ok(())
}

#[tokio::test]
async fn hydrate_without_credential_fails_fast() -> Result<()> {
    let h = common::Harness::start("").await?;

    let result = h.console.hydrate().await;
    assert!(matches!(result, Err(SessionError::NoCredential)));
    assert!(h.server.received_requests().await.unwrap_or_default().is_empty());
    Ok(())
}

#[tokio::test]
async fn hydrate_uses_first_endpoint_that_answers() -> Result<()> {
    let h = common::Harness::start("").await?;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/whoami"))
        .and(header("authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "id": 12,
                "name": "Grace Okafor",
                "role": "registrar",
                "permissions": ["students.read", "students.write"]
            }
        })))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let session = &h.console.session;
    let mut profile_updates = session.subscribe();
    session.set_credential("t1");

    let profile = h.console.hydrate().await?;
    assert_eq!(profile.role.as_deref(), Some("registrar"));
    assert!(profile.has_permission("students.write"));
    assert!(profile_updates.has_changed()?);
    assert_eq!(profile_updates.borrow_and_update().as_ref(), Some(&profile));
    assert_eq!(h.store.get("auth_role").as_deref(), Some("registrar"));
    assert_eq!(
        h.store.get("auth_permissions").as_deref(),
        Some("[\"students.read\",\"students.write\"]")
    );
    Ok(())
}

#[tokio::test]
async fn hydrate_failure_keeps_credential_and_reports_last_error() -> Result<()> {
    let h = common::Harness::start("#/students").await?;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "expired"})))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/whoami"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "maintenance"})))
        .mount(&h.server)
        .await;

    h.console.session.set_credential("t1");
    h.store.set("auth_role", "registrar")?;
    match h.console.hydrate().await {
        Err(SessionError::Hydration(e)) => {
            assert_eq!(e.status, 503);
            assert_eq!(e.message, "maintenance");
        }
        other => panic!("unexpected hydration result: {:?}", other),
    }

    // Identity calls are background calls: no sign-out, no redirect, no toast
    assert_eq!(h.console.session.credential().as_deref(), Some("t1"));
    assert!(h.console.session.profile().is_none());
    assert_eq!(h.store.get("auth_role"), None);
    assert!(h.location.redirects().is_empty());
    assert!(h.notifier.messages().is_empty());
    Ok(())
}

#[tokio::test]
async fn hydrate_skips_payloads_that_are_not_profiles() -> Result<()> {
    let h = common::Harness::start("").await?;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/whoami"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "ops"})))
        .mount(&h.server)
        .await;

    h.console.session.set_credential("t1");
    let profile = h.console.hydrate().await?;
    assert_eq!(profile.display_name.as_deref(), Some("ops"));
    Ok(())
}

#[tokio::test]
async fn identity_arriving_after_logout_is_discarded() -> Result<()> {
    let h = common::Harness::start("#/dashboard").await?;
    let session = h.console.session.clone();
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(move |_: &Request| {
            // Logout lands while the identity call is in flight
            session.clear_session();
            ResponseTemplate::new(200).set_body_json(json!({"name": "Ops", "role": "admin"}))
        })
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/whoami"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    h.console.session.set_credential("t1");
    let result = h.console.hydrate().await;

    assert!(matches!(result, Err(SessionError::Superseded)));
    assert!(!h.console.session.is_authenticated());
    assert!(h.console.session.profile().is_none());
    assert_eq!(h.store.get("auth_role"), None);
    assert_eq!(h.store.get("auth_profile"), None);
    Ok(())
}
