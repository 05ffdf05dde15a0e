use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use serde_json::{Value, json};
use studentdesk_auth::{CreateUserRequest, USER_ROLE};
use studentdesk_db_memory::InMemoryStudentRepository;
use studentdesk_server::config::{AdminUserConfig, BootstrapConfig};
use studentdesk_server::{AppConfig, AppState, Backends, StorageBackend, build_app, seed_identity};
use studentdesk_storage::{NewStudent, StorageError, Student, StudentRepository};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const ADMIN_EMAIL: &str = "admin@example.com";
const USER_EMAIL: &str = "user@example.com";
const PASSWORD: &str = "Passw0rd!";

// =============================================================================
// Harness
// =============================================================================

/// Student repository that counts every call it receives.
#[derive(Default)]
struct CountingRepository {
    inner: InMemoryStudentRepository,
    calls: AtomicUsize,
    lists: AtomicUsize,
}

impl CountingRepository {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StudentRepository for CountingRepository {
    async fn get_all(&self) -> Result<Vec<Student>, StorageError> {
        self.touch();
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.get_all().await
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<Student>, StorageError> {
        self.touch();
        self.inner.get_by_id(id).await
    }

    async fn add(&self, student: NewStudent) -> Result<Student, StorageError> {
        self.touch();
        self.inner.add(student).await
    }

    async fn update(&self, student: &Student) -> Result<(), StorageError> {
        self.touch();
        self.inner.update(student).await
    }

    async fn delete(&self, id: i32) -> Result<bool, StorageError> {
        self.touch();
        self.inner.delete(id).await
    }
}

struct TestApp {
    base: String,
    client: reqwest::Client,
    repo: Arc<CountingRepository>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn get(&self, path: &str, cookie: Option<&str>) -> reqwest::Response {
        let mut req = self.client.get(self.url(path));
        if let Some(cookie) = cookie {
            req = req.header(COOKIE, cookie);
        }
        req.send().await.expect("GET")
    }

    async fn post_form(
        &self,
        path: &str,
        cookie: Option<&str>,
        form: &[(&str, &str)],
    ) -> reqwest::Response {
        let mut req = self.client.post(self.url(path)).form(form);
        if let Some(cookie) = cookie {
            req = req.header(COOKIE, cookie);
        }
        req.send().await.expect("POST")
    }

    /// Signs in and returns the `name=value` pair of the session cookie.
    async fn sign_in(&self, email: &str, password: &str) -> String {
        let resp = self
            .post_form(
                "/Account/Login",
                None,
                &[("Email", email), ("Password", password)],
            )
            .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "sign-in of {email}");
        session_pair(&resp)
    }

    async fn students(&self, cookie: &str) -> Vec<Value> {
        let resp = self.get("/Student/Index", Some(cookie)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        resp.json::<Vec<Value>>().await.expect("student list")
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

fn session_pair(resp: &reqwest::Response) -> String {
    resp.headers()
        .get(SET_COOKIE)
        .expect("set-cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

fn location(resp: &reqwest::Response) -> &str {
    resp.headers()
        .get(LOCATION)
        .expect("location header")
        .to_str()
        .unwrap()
}

fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.storage.backend = StorageBackend::Memory;
    cfg.server.https_redirect = false;
    cfg.auth.cookie.secure = false;
    cfg.bootstrap = BootstrapConfig {
        admin_user: Some(AdminUserConfig {
            email: ADMIN_EMAIL.into(),
            password: PASSWORD.into(),
        }),
    };
    cfg
}

async fn spawn_app_with(cfg: AppConfig) -> TestApp {
    let repo = Arc::new(CountingRepository::default());
    let backends = Backends {
        students: repo.clone(),
        ..Backends::in_memory()
    };
    let state = AppState::new(cfg.clone(), backends);
    seed_identity(&state.identity, &cfg.bootstrap)
        .await
        .expect("seed identity");
    state
        .identity
        .create_user(&CreateUserRequest::new(USER_EMAIL, PASSWORD, USER_ROLE))
        .await
        .expect("create user account");

    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("client");

    TestApp {
        base: format!("http://{addr}"),
        client,
        repo,
        shutdown: Some(tx),
        handle: Some(handle),
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

fn student_form<'a>(name: &'a str, email: &'a str, age: &'a str, course: &'a str) -> [(&'a str, &'a str); 4] {
    [("Name", name), ("Email", email), ("Age", age), ("Course", course)]
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn health_and_unknown_routes() {
    let app = spawn_app().await;

    let resp = app.get("/healthz", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"status": "ok"}));

    let resp = app.get("/no/such/page", None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/Account/Login");

    let resp = app.get("/Account/AccessDenied", None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    app.stop().await;
}

#[tokio::test]
async fn request_id_is_preserved() {
    let app = spawn_app().await;

    let resp = app
        .client
        .get(app.url("/healthz"))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "trace-me");

    app.stop().await;
}

#[tokio::test]
async fn anonymous_requests_redirect_to_login_without_touching_store() {
    let app = spawn_app().await;

    let resp = app.get("/Student/Index", None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/Account/Login?ReturnUrl=%2FStudent%2FIndex");

    for path in ["/Student/StudentDashboard", "/Student/Edit/1", "/Users/UserLists"] {
        let resp = app.get(path, None).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{path}");
        assert!(location(&resp).starts_with("/Account/Login?ReturnUrl="), "{path}");
    }

    let form = student_form("Ada", "ada@example.com", "20", "Math");
    let resp = app.post_form("/Student/Create", None, &form).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let resp = app.post_form("/Student/Delete/1", None, &[]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    assert_eq!(app.repo.calls(), 0);
    app.stop().await;
}

#[tokio::test]
async fn user_role_is_forbidden_from_admin_actions() {
    let app = spawn_app().await;
    let admin = app.sign_in(ADMIN_EMAIL, PASSWORD).await;
    let user = app.sign_in(USER_EMAIL, PASSWORD).await;

    let form = student_form("Ada", "ada@example.com", "20", "Math");
    let resp = app.post_form("/Student/Create", Some(&admin), &form).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let id = app.students(&admin).await[0]["id"].as_i64().unwrap().to_string();
    let calls_before = app.repo.calls();

    let resp = app.get("/Student/Create", Some(&user)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = app.post_form("/Student/Create", Some(&user), &form).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = app
        .post_form(&format!("/Student/Delete/{id}"), Some(&user), &[])
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = app.get("/Users/UserLists", Some(&user)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], 403);

    assert_eq!(app.repo.calls(), calls_before);

    // The User role may still read, edit and see the dashboard.
    assert_eq!(app.students(&user).await.len(), 1);
    let resp = app.get("/Student/StudentDashboard", Some(&user)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = app.get(&format!("/Student/Edit/{id}"), Some(&user)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    app.stop().await;
}

#[tokio::test]
async fn student_crud_flow() {
    let app = spawn_app().await;
    let admin = app.sign_in(ADMIN_EMAIL, PASSWORD).await;

    let resp = app.get("/Student/Create", Some(&admin)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let form = student_form("Ada", "ada@example.com", "20", "Math");
    let resp = app.post_form("/Student/Create", Some(&admin), &form).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/Student/Index");

    let students = app.students(&admin).await;
    assert_eq!(students.len(), 1);
    let id = students[0]["id"].as_i64().unwrap().to_string();
    assert_eq!(students[0]["name"], "Ada");
    assert_eq!(students[0]["course"], "Math");

    let resp = app.get(&format!("/Student/Edit/{id}"), Some(&admin)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Value = resp.json().await.unwrap();
    assert_eq!(fetched["email"], "ada@example.com");
    assert_eq!(fetched["age"], 20);

    let resp = app
        .post_form(
            "/Student/Edit",
            Some(&admin),
            &[
                ("Id", id.as_str()),
                ("Name", "Ada King"),
                ("Email", "ada.king@example.com"),
                ("Age", "21"),
                ("Course", ""),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let students = app.students(&admin).await;
    assert_eq!(students[0]["name"], "Ada King");
    assert_eq!(students[0]["age"], 21);
    assert!(students[0].get("course").is_none());

    // GET only confirms.
    let resp = app.get(&format!("/Student/Delete/{id}"), Some(&admin)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(app.students(&admin).await.len(), 1);

    let resp = app
        .post_form(&format!("/Student/Delete/{id}"), Some(&admin), &[])
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/Student/Index");
    assert!(app.students(&admin).await.is_empty());

    // Absent ids are silent no-ops.
    let resp = app
        .post_form(&format!("/Student/Delete/{id}"), Some(&admin), &[])
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let resp = app.get(&format!("/Student/Edit/{id}"), Some(&admin)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/Student/Index");

    app.stop().await;
}

#[tokio::test]
async fn invalid_student_form_is_returned_with_errors() {
    let app = spawn_app().await;
    let admin = app.sign_in(ADMIN_EMAIL, PASSWORD).await;

    let form = student_form("", "ada@example.com", "abc", "Math");
    let resp = app.post_form("/Student/Create", Some(&admin), &form).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["errors"]["Name"][0], "The Name field is required.");
    assert_eq!(body["errors"]["Age"][0], "The value 'abc' is not valid for Age.");
    assert_eq!(body["form"]["email"], "ada@example.com");
    assert_eq!(body["form"]["age"], "abc");

    assert_eq!(app.repo.calls(), 0);
    app.stop().await;
}

#[tokio::test]
async fn mutations_invalidate_cached_list() {
    let app = spawn_app().await;
    let admin = app.sign_in(ADMIN_EMAIL, PASSWORD).await;

    assert!(app.students(&admin).await.is_empty());
    assert!(app.students(&admin).await.is_empty());
    let resp = app.get("/Student/StudentDashboard", Some(&admin)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(app.repo.lists(), 1, "list and dashboard share one cached read");

    for (name, course) in [("Ada", "Math"), ("Brian", "Math"), ("Cleo", "CS")] {
        let email = format!("{}@example.com", name.to_lowercase());
        let form = student_form(name, &email, "20", course);
        let resp = app.post_form("/Student/Create", Some(&admin), &form).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    }

    let resp = app.get("/Student/StudentDashboard", Some(&admin)).await;
    let dashboard: Value = resp.json().await.unwrap();
    assert_eq!(dashboard, json!({"studentCount": 3, "courseCount": 2}));
    assert_eq!(app.students(&admin).await.len(), 3);
    assert_eq!(app.repo.lists(), 2);

    let id = app.students(&admin).await[0]["id"].as_i64().unwrap();
    let resp = app
        .post_form(&format!("/Student/Delete/{id}"), Some(&admin), &[])
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = app.get("/Student/StudentDashboard", Some(&admin)).await;
    let dashboard: Value = resp.json().await.unwrap();
    assert_eq!(dashboard, json!({"studentCount": 2, "courseCount": 2}));
    assert_eq!(app.repo.lists(), 3);

    app.stop().await;
}

#[tokio::test]
async fn admin_creates_users() {
    let app = spawn_app().await;
    let admin = app.sign_in(ADMIN_EMAIL, PASSWORD).await;

    let resp = app.get("/Users/Create", Some(&admin)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["roles"], json!(["Admin", "User"]));

    let cases: [(&[(&str, &str)], &str); 4] = [
        (
            &[("Email", ""), ("Password", PASSWORD), ("Role", "User")],
            "All fields are required!",
        ),
        (
            &[("Email", "new@example.com"), ("Password", PASSWORD), ("Role", "Registrar")],
            "Role does not exist!",
        ),
        (
            &[("Email", USER_EMAIL), ("Password", PASSWORD), ("Role", "User")],
            "User already exists!",
        ),
        (
            &[("Email", "new@example.com"), ("Password", "password"), ("Role", "User")],
            "",
        ),
    ];
    for (form, message) in cases {
        let resp = app.post_form("/Users/Create", Some(&admin), form).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = resp.json().await.unwrap();
        if !message.is_empty() {
            assert_eq!(body["message"], message);
        }
        assert!(body["form"].get("password").is_none());
    }

    let users: Vec<Value> = app
        .get("/Users/UserLists", Some(&admin))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(users.len(), 2);

    let resp = app
        .post_form(
            "/Users/Create",
            Some(&admin),
            &[("Email", "new@example.com"), ("Password", PASSWORD), ("Role", "User")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/Users/UserLists");

    let users: Vec<Value> = app
        .get("/Users/UserLists", Some(&admin))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(users.len(), 3);
    let created = users
        .iter()
        .find(|u| u["email"] == "new@example.com")
        .expect("new user listed");
    assert_eq!(created["roles"], json!(["User"]));
    assert!(created.get("passwordHash").is_none());

    let session = app.sign_in("new@example.com", PASSWORD).await;
    assert_eq!(app.students(&session).await.len(), 0);

    app.stop().await;
}

#[tokio::test]
async fn login_and_logout() {
    let app = spawn_app().await;

    let resp = app
        .post_form(
            "/Account/Login",
            None,
            &[("Email", ADMIN_EMAIL), ("Password", "wrong")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid login attempt.");
    assert_eq!(body["form"]["email"], ADMIN_EMAIL);

    let resp = app
        .post_form(
            "/Account/Login?ReturnUrl=%2FStudent%2FStudentDashboard",
            None,
            &[("Email", ADMIN_EMAIL), ("Password", PASSWORD)],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/Student/StudentDashboard");
    let set_cookie = resp.headers()[SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    let cookie = session_pair(&resp);

    let resp = app
        .post_form(
            "/Account/Login",
            None,
            &[
                ("Email", ADMIN_EMAIL),
                ("Password", PASSWORD),
                ("ReturnUrl", "https://evil.example/"),
            ],
        )
        .await;
    assert_eq!(location(&resp), "/Student/Index");

    assert_eq!(app.students(&cookie).await.len(), 0);

    let resp = app.post_form("/Account/Logout", Some(&cookie), &[]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/Account/Login");
    assert!(resp.headers()[SET_COOKIE].to_str().unwrap().contains("Max-Age=0"));

    let resp = app.get("/Student/Index", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    app.stop().await;
}

#[tokio::test]
async fn sliding_session_cookie_is_renewed_past_half_lifetime() {
    let mut cfg = test_config();
    cfg.auth.cookie.expire_time = Duration::from_secs(2);
    let app = spawn_app_with(cfg).await;
    let cookie = app.sign_in(ADMIN_EMAIL, PASSWORD).await;

    let resp = app.get("/Student/Index", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(SET_COOKIE).is_none());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let resp = app.get("/Student/Index", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let renewed = resp
        .headers()
        .get(SET_COOKIE)
        .expect("renewed session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(session_pair(&resp), cookie);
    assert!(renewed.contains("Max-Age=2"));
    assert!(renewed.contains("HttpOnly"));

    // Past the original cookie's lifetime, the session is still alive.
    tokio::time::sleep(Duration::from_millis(1000)).await;
    let resp = app.get("/Student/Index", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Sign-out clears the cookie without a renewal alongside it.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let resp = app.post_form("/Account/Logout", Some(&cookie), &[]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let cookies: Vec<_> = resp.headers().get_all(SET_COOKIE).iter().collect();
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].to_str().unwrap().contains("Max-Age=0"));

    app.stop().await;
}

#[tokio::test]
async fn plain_http_behind_proxy_is_redirected() {
    let mut cfg = test_config();
    cfg.server.https_redirect = true;
    let app = spawn_app_with(cfg).await;

    let resp = app
        .client
        .get(app.url("/healthz?probe=1"))
        .header("x-forwarded-proto", "http")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "https://127.0.0.1/healthz?probe=1");

    let resp = app.get("/healthz", None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    app.stop().await;
}

#[tokio::test]
async fn container_mode_disables_https_redirect() {
    let mut cfg = test_config();
    cfg.server.https_redirect = true;
    cfg.server.in_container = true;
    let app = spawn_app_with(cfg).await;

    let resp = app
        .client
        .get(app.url("/healthz"))
        .header("x-forwarded-proto", "http")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    app.stop().await;
}
