//! HTTP-level tests against a local mock server
//!
//! Exercises the reqwest fetcher's fault classification, session
//! verification and a complete harvest over real HTTP.

use attendee_harvest::config::ClientConfig;
use attendee_harvest::crawler::{
    harvest, CookieSession, HarvestOptions, HttpFetcher, PageFetcher, SessionHandle,
    SessionProvider,
};
use attendee_harvest::storage::{HistoryStore, JsonHistoryStore, RunStatus};
use attendee_harvest::testutil::{profile_page, test_config};
use attendee_harvest::{AuthError, ChildId, ParentId};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> HttpFetcher {
    HttpFetcher::open(&ClientConfig::default(), &SessionHandle::anonymous()).unwrap()
}

fn at(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

#[tokio::test]
async fn test_fetch_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let page = fetcher().fetch(&at(&server, "/search")).await.unwrap();
    assert_eq!(page.body, "<html>ok</html>");
    assert_eq!(page.locator.path(), "/search");
}

#[tokio::test]
async fn test_fetch_classifies_status_codes() {
    let server = MockServer::start().await;
    for (route, status) in [("/missing", 404), ("/busy", 503), ("/slow-down", 429)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
    }

    let fetcher = fetcher();
    let missing = fetcher.fetch(&at(&server, "/missing")).await.unwrap_err();
    assert!(!missing.is_transient());

    let busy = fetcher.fetch(&at(&server, "/busy")).await.unwrap_err();
    assert!(busy.is_transient());

    let throttled = fetcher.fetch(&at(&server, "/slow-down")).await.unwrap_err();
    assert!(throttled.is_transient());
}

#[tokio::test]
async fn test_fetch_login_redirect_is_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/login"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Sign in"))
        .mount(&server)
        .await;

    let err = fetcher().fetch(&at(&server, "/search")).await.unwrap_err();
    assert!(!err.is_transient());
    assert!(err.to_string().contains("login wall"));
}

#[tokio::test]
async fn test_session_sends_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed/"))
        .and(header("cookie", "li_at=abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let session = CookieSession::new(at(&server, "/feed/"), "li_at=abc", ClientConfig::default())
        .with_retries(3, Duration::ZERO);
    let handle = session.ensure_authenticated().await.unwrap();
    assert_eq!(handle.cookie_header(), Some("li_at=abc"));
}

#[tokio::test]
async fn test_session_rejected_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed/"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/authwall"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/authwall"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let session = CookieSession::new(at(&server, "/feed/"), "li_at=stale", ClientConfig::default())
        .with_retries(2, Duration::ZERO);
    let err = session.ensure_authenticated().await.unwrap_err();

    match err {
        AuthError::Rejected { attempts, reason } => {
            assert_eq!(attempts, 2);
            assert!(reason.contains("authwall"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_harvest_over_http() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let mut config = test_config(dir.path());
    config.session.check_url = format!("{}/feed/", server.uri());
    config.source.listing_url = format!("{}/search?event={{id}}&page={{page}}", server.uri());
    config.crawler.parents = vec![format!("{}/events/42/", server.uri())];

    Mock::given(method("GET"))
        .and(path("/feed/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("event", "42"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(profile_page(&["ada", "grace"])))
        .expect(1)
        .mount(&server)
        .await;
    for page in ["2", "3", "4"] {
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("event", "42"))
            .and(query_param("page", page))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
            .expect(1)
            .mount(&server)
            .await;
    }

    let session = CookieSession::new(
        Url::parse(&config.session.check_url).unwrap(),
        "li_at=abc",
        ClientConfig::default(),
    )
    .with_retries(1, Duration::ZERO);

    let options = HarvestOptions {
        config_hash: "http-test".to_string(),
        ..HarvestOptions::default()
    };
    let report = harvest(config.clone(), &session, options).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.processed_this_run, 1);
    assert_eq!(report.new_children, 2);

    let history = JsonHistoryStore::new(&config.output.history_path)
        .load()
        .unwrap();
    let event = ParentId::parse(&format!("{}/events/42", server.uri())).unwrap();
    assert!(history.is_processed(&event));
    assert_eq!(
        history.children_of(&event),
        &[
            ChildId::parse(&format!("{}/in/ada", server.uri())).unwrap(),
            ChildId::parse(&format!("{}/in/grace", server.uri())).unwrap(),
        ]
    );

    let csv = std::fs::read_to_string(&config.output.csv_path).unwrap();
    assert!(csv.starts_with("Event URL,Profile URL"));
    assert_eq!(csv.lines().count(), 3);
}

#[tokio::test]
async fn test_harvest_stops_when_session_rejected() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let mut config = test_config(dir.path());
    config.session.check_url = format!("{}/feed/", server.uri());
    config.crawler.parents = vec![format!("{}/events/42", server.uri())];

    Mock::given(method("GET"))
        .and(path("/feed/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = CookieSession::new(
        Url::parse(&config.session.check_url).unwrap(),
        "li_at=abc",
        ClientConfig::default(),
    )
    .with_retries(1, Duration::ZERO);

    let result = harvest(config, &session, HarvestOptions::default()).await;
    assert!(matches!(
        result,
        Err(attendee_harvest::HarvestError::Auth(AuthError::Rejected { .. }))
    ));
}
