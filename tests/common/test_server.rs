use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::task::JoinHandle;

use fpsos::auth::hash_password;
use fpsos::config::ServerConfig;
use fpsos::rate_limit::RateLimitConfig;
use fpsos::server::{AppState, create_router};
use fpsos::store::{SqliteStore, Store};

pub const ADMIN_PASSWORD: &str = "correct-horse-battery";
pub const ADMIN_EMAIL: &str = "owner@fpsos.gg";
pub const USER_PASSWORD: &str = "dashboard-pass";

pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: Arc<AppState>,
    server: JoinHandle<()>,
    bot: JoinHandle<()>,
}

/// Stand-in for the bot control API.
fn mock_bot() -> Router {
    Router::new()
        .route("/api/status", get(|| async { Json(json!({"online": true, "guilds": 1})) }))
        .route(
            "/api/trigger-diagnostic",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "diagnostic crashed") }),
        )
        .route(
            "/api/create-ticket",
            post(|Json(body): Json<Value>| async move {
                Json(json!({"success": true, "ticket_for": body["username"]}))
            }),
        )
}

async fn spawn(router: Router) -> (SocketAddr, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    (addr, handle)
}

fn generous_limits(config: &mut ServerConfig) {
    let generous = RateLimitConfig::new(1000, 60);
    config.rate_limits.booking_create = generous;
    config.rate_limits.leaderboard_submit = generous;
    config.rate_limits.contact_form = generous;
    config.rate_limits.news_fetch = generous;
    config.rate_limits.general_api = generous;
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Starts a server with a running mock bot. `configure` runs last and
    /// may override anything.
    pub async fn start_with(configure: impl FnOnce(&mut ServerConfig)) -> Self {
        let (bot_addr, bot) = spawn(mock_bot()).await;

        let temp_dir = TempDir::new().expect("create temp dir");
        let mut config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            admin_secret: Some("test-signing-secret".to_string()),
            admin_password: Some(ADMIN_PASSWORD.to_string()),
            bot_api_url: format!("http://{bot_addr}/api"),
            news_rss_url: "http://127.0.0.1:1/rss".to_string(),
            ..ServerConfig::default()
        };
        generous_limits(&mut config);
        configure(&mut config);

        let store = SqliteStore::new(config.db_path()).expect("open store");
        store.initialize().expect("initialize store");
        store
            .create_user(
                ADMIN_EMAIL,
                &hash_password(USER_PASSWORD).expect("hash"),
                "Owner",
                Some("owner"),
            )
            .expect("create user");

        let state = Arc::new(AppState::new(config, Arc::new(store)).expect("app state"));
        let (addr, server) = spawn(create_router(state.clone())).await;

        Self {
            temp_dir,
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            state,
            server,
            bot,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Logs in with the admin password and returns the `Cookie` header value.
    pub async fn admin_cookie(&self) -> String {
        let resp = self
            .client
            .post(self.url("/api/admin/login"))
            .json(&json!({"password": ADMIN_PASSWORD}))
            .send()
            .await
            .expect("admin login");
        assert_eq!(resp.status(), 200);
        session_cookie(&resp).expect("session cookie")
    }
}

/// `name=value` of the session cookie set by a response.
pub fn session_cookie(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find(|c| c.starts_with("session="))
        .and_then(|c| c.split(';').next())
        .map(str::to_string)
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.abort();
        self.bot.abort();
    }
}
