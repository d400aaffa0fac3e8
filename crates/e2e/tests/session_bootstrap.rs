//! Login and bootstrap behaviour against a scripted page

mod common;

use std::time::Duration;

use common::{init_tracing, Change, FakePage, BASE_URL};
use pos_e2e::artifacts::Artifacts;
use pos_e2e::session::{is_login_url, LoginSelectors};
use pos_e2e::{BootstrapConfig, E2eError, SessionBootstrapper};
use pos_e2e_common::{Settings, UI_STORAGE_KEY};
use tokio::time::Instant;

fn settings() -> Settings {
    Settings {
        base_url: BASE_URL.to_string(),
        api_url: "http://localhost:8081".to_string(),
        username: "admin".to_string(),
        password: "admin".to_string(),
        tenant_id: None,
        translations_file: None,
    }
}

fn navigates_after_submit(page: &FakePage, after: Duration) {
    let selectors = LoginSelectors::default();
    page.on(
        "click",
        &selectors.submit.describe(),
        after,
        vec![Change::url("/"), Change::show(&selectors.root_ready)],
    );
}

#[tokio::test(start_paused = true)]
async fn test_valid_login_leaves_login_page() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let artifacts = Artifacts::new(dir.path());
    let config = BootstrapConfig::default();
    let selectors = LoginSelectors::default();

    let page = FakePage::new();
    page.set_storage(UI_STORAGE_KEY, r#"{"state":{"language":"es"},"version":0}"#);
    navigates_after_submit(&page, Duration::from_millis(500));

    SessionBootstrapper::new(&page, &config, &artifacts)
        .login(&settings())
        .await
        .unwrap();

    assert!(!is_login_url(&page.current_url()));
    assert_eq!(page.count("goto", "/login?lng=es"), 1);
    assert_eq!(page.count("click", &selectors.submit.describe()), 1);
    assert_eq!(page.filled(&selectors.username).as_deref(), Some("admin"));
    assert_eq!(page.filled(&selectors.password).as_deref(), Some("admin"));
    assert!(page.screenshots().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_client_state_seeded_before_navigation() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = Artifacts::new(dir.path());
    let config = BootstrapConfig::default();

    let page = FakePage::new();
    navigates_after_submit(&page, Duration::from_millis(200));

    SessionBootstrapper::new(&page, &config, &artifacts)
        .login(&settings())
        .await
        .unwrap();

    let scripts = page.init_scripts();
    assert_eq!(scripts.len(), 1);
    assert!(scripts[0].contains(r#""language":"es""#));
    assert!(scripts[0].contains(r#""tenantId":null"#));

    let cookies = page.cookies();
    let names: Vec<&str> = cookies.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["i18next", "i18nextLng"]);
    for cookie in &cookies {
        assert_eq!(cookie.value, "es");
        assert_eq!(cookie.domain, "localhost");
        assert_eq!(cookie.path, "/");
    }

    // Seeding happens before the first navigation
    assert_eq!(page.actions()[0].kind, "goto");
}

#[tokio::test(start_paused = true)]
async fn test_waits_for_cold_start_loader() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = Artifacts::new(dir.path());
    let config = BootstrapConfig::default();
    let selectors = LoginSelectors::default();

    let page = FakePage::new();
    page.on(
        "click",
        &selectors.submit.describe(),
        Duration::from_millis(500),
        vec![Change::url("/"), Change::show(&selectors.loader)],
    );
    page.schedule(
        Duration::from_secs(8),
        vec![Change::hide(&selectors.loader), Change::show(&selectors.root_ready)],
    );

    let start = Instant::now();
    SessionBootstrapper::new(&page, &config, &artifacts)
        .login(&settings())
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_secs(8));
    assert!(start.elapsed() < Duration::from_secs(9));
}

#[tokio::test(start_paused = true)]
async fn test_stuck_loader_fails() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = Artifacts::new(dir.path());
    let config = BootstrapConfig {
        ui_timeout: Duration::from_secs(10),
        ..Default::default()
    };
    let selectors = LoginSelectors::default();

    let page = FakePage::new();
    page.on(
        "click",
        &selectors.submit.describe(),
        Duration::from_millis(500),
        vec![Change::url("/"), Change::show(&selectors.loader)],
    );

    let err = SessionBootstrapper::new(&page, &config, &artifacts)
        .login(&settings())
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::Timeout(ref what) if what.contains("cold-start loader")), "{}", err);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_credentials_fail_without_retry() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = Artifacts::new(dir.path());
    let config = BootstrapConfig::default();
    let selectors = LoginSelectors::default();

    let page = FakePage::new();
    page.on(
        "click",
        &selectors.submit.describe(),
        Duration::from_millis(300),
        vec![
            Change::show(&selectors.error),
            Change::text(&selectors.error, "  Credenciales inválidas  "),
        ],
    );

    let start = Instant::now();
    let err = SessionBootstrapper::new(&page, &config, &artifacts)
        .login(&Settings {
            username: "invaliduser".to_string(),
            password: "wrongpassword".to_string(),
            ..settings()
        })
        .await
        .unwrap_err();

    match err {
        E2eError::CredentialRejected {
            message,
            url,
            screenshot,
        } => {
            assert_eq!(message, "Credenciales inválidas");
            assert!(is_login_url(&url), "{}", url);
            assert_eq!(screenshot.as_ref(), page.screenshots().first());
        }
        other => panic!("expected CredentialRejected, got {}", other),
    }

    assert_eq!(page.count("click", &selectors.submit.describe()), 1);
    assert!(is_login_url(&page.current_url()));
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(page.screenshots().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_error_banner_reports_no_detail() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = Artifacts::new(dir.path());
    let config = BootstrapConfig::default();
    let selectors = LoginSelectors::default();

    let page = FakePage::new();
    page.on(
        "click",
        &selectors.submit.describe(),
        Duration::from_millis(300),
        vec![Change::show(&selectors.error)],
    );

    let err = SessionBootstrapper::new(&page, &config, &artifacts)
        .login(&settings())
        .await
        .unwrap_err();

    assert!(
        matches!(err, E2eError::CredentialRejected { ref message, .. } if message == "no detail"),
        "{}",
        err
    );
}

#[tokio::test(start_paused = true)]
async fn test_timeout_retries_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = Artifacts::new(dir.path());
    let config = BootstrapConfig::default();
    let selectors = LoginSelectors::default();

    let page = FakePage::new();

    let start = Instant::now();
    let err = SessionBootstrapper::new(&page, &config, &artifacts)
        .login(&settings())
        .await
        .unwrap_err();

    match &err {
        E2eError::LoginTimedOut {
            attempts,
            url,
            screenshot,
        } => {
            assert_eq!(*attempts, 2);
            assert!(is_login_url(url));
            let screenshot = screenshot.as_ref().unwrap();
            assert!(screenshot.starts_with(dir.path()));
            assert_eq!(err.screenshot(), Some(screenshot));
        }
        other => panic!("expected LoginTimedOut, got {}", other),
    }
    let message = err.to_string();
    assert!(message.contains("TEST_USERNAME/TEST_PASSWORD"), "{}", message);
    assert!(message.contains("backend"), "{}", message);

    assert_eq!(page.count("click", &selectors.submit.describe()), 2);
    assert_eq!(page.count("goto", "/login?lng=es"), 2);
    assert!(start.elapsed() >= Duration::from_secs(120));
}

#[tokio::test(start_paused = true)]
async fn test_second_attempt_can_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = Artifacts::new(dir.path());
    let config = BootstrapConfig::default();
    let selectors = LoginSelectors::default();

    let page = FakePage::new();
    page.on_nth(
        "click",
        &selectors.submit.describe(),
        2,
        Duration::from_millis(500),
        vec![Change::url("/dashboard"), Change::show(&selectors.root_ready)],
    );

    SessionBootstrapper::new(&page, &config, &artifacts)
        .login(&settings())
        .await
        .unwrap();

    assert_eq!(page.count("click", &selectors.submit.describe()), 2);
    assert!(page.current_url().ends_with("/dashboard"));
}

#[tokio::test(start_paused = true)]
async fn test_lost_browser_ends_login_race() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = Artifacts::new(dir.path());
    let config = BootstrapConfig::default();
    let selectors = LoginSelectors::default();

    let page = FakePage::new();
    page.on(
        "click",
        &selectors.submit.describe(),
        Duration::from_millis(300),
        vec![Change::close()],
    );

    let start = Instant::now();
    let err = SessionBootstrapper::new(&page, &config, &artifacts)
        .login(&settings())
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::BridgeClosed), "{}", err);
    assert!(!err.is_timeout());
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(page.count("click", &selectors.submit.describe()), 1);
}

#[tokio::test(start_paused = true)]
async fn test_tenant_hint_in_seed_payload() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = Artifacts::new(dir.path());
    let config = BootstrapConfig::default();

    let page = FakePage::new();
    SessionBootstrapper::new(&page, &config, &artifacts)
        .seed_client_state(&Settings {
            tenant_id: Some("t-2".to_string()),
            ..settings()
        })
        .await
        .unwrap();

    assert!(page.init_scripts()[0].contains(r#""tenantId":"t-2""#));
    assert!(page.actions().is_empty());
}
