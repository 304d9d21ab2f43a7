use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use student_portal::{
    AppConfig, AppState, create_router,
    auth::hash_password,
    models::{LoginResponse, RosterPayload, Student},
    repository::{PostgresRepository, RepositoryState},
};
use tokio::net::TcpListener;
use uuid::Uuid;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub pool: sqlx::PgPool,
}

/// Boots the full application against the configured database, or returns
/// None so the black-box tests skip cleanly without infrastructure.
async fn spawn_app() -> Option<TestApp> {
    dotenv::dotenv().ok();

    let Ok(db_url) = std::env::var("DATABASE_URL") else {
        eprintln!("skipping: DATABASE_URL not set");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .expect("Failed to connect to Postgres in tests");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations in tests");

    let repo = Arc::new(PostgresRepository::new(pool.clone())) as RepositoryState;
    let mut config = AppConfig::default();
    config.db_url = db_url;

    let state = AppState { repo, config };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    Some(TestApp { address, pool })
}

/// A client that does not chase redirects, so the 303 degradations are
/// observable as such.
fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Seeds an admin account directly (roles are never reachable through the
/// HTTP surface) and returns its id for the local bypass header.
async fn seed_admin(pool: &sqlx::PgPool) -> Uuid {
    let username = format!("api-admin-{}", Uuid::new_v4().simple());
    let hash = hash_password("admin-test-password").unwrap();
    let id = Uuid::new_v4();

    sqlx::query("INSERT INTO users (id, username, password_hash, role) VALUES ($1, $2, $3, 'admin')")
        .bind(id)
        .bind(&username)
        .bind(&hash)
        .execute(pool)
        .await
        .expect("failed to seed admin");

    id
}

fn student_payload(student_id: i32, name: &str, major_id: Option<i32>) -> serde_json::Value {
    serde_json::json!({
        "student_id": student_id,
        "name": name,
        "gender": "female",
        "birthday": "2004-05-17",
        "age": 21,
        "major_id": major_id,
    })
}

fn unique_student_id() -> i32 {
    2_000_000 + (Uuid::new_v4().as_u128() % 900_000) as i32
}

#[tokio::test]
async fn test_health_check() {
    let Some(app) = spawn_app().await else { return };
    let response = client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_student_lifecycle_as_admin() {
    let Some(app) = spawn_app().await else { return };
    let client = client();
    let admin_id = seed_admin(&app.pool).await;

    let old_id = unique_student_id();
    let new_id = unique_student_id();

    // Create (local bypass header stands in for a full login in Env::Local).
    let response = client
        .post(format!("{}/new", app.address))
        .header("x-user-id", admin_id.to_string())
        .json(&student_payload(old_id, "Ada", None))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let created: Student = response.json().await.unwrap();
    assert_eq!(created.student_id, old_id);

    // Immediately visible on the public roster.
    let roster: RosterPayload = client
        .get(format!("{}/", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        roster
            .students
            .iter()
            .filter(|s| s.student_id == old_id)
            .count(),
        1
    );

    // Edit, renaming the primary key in the same call.
    let response = client
        .post(format!("{}/edit/{}", app.address, old_id))
        .header("x-user-id", admin_id.to_string())
        .json(&student_payload(new_id, "Ada Lovelace", None))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let roster: RosterPayload = client
        .get(format!("{}/", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(roster.students.iter().all(|s| s.student_id != old_id));
    assert!(roster.students.iter().any(|s| s.student_id == new_id));

    // Delete via GET, as the roster links do.
    let response = client
        .get(format!("{}/delete/{}", app.address, new_id))
        .header("x-user-id", admin_id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    // Deleting again stays a soft no-op.
    let response = client
        .get(format!("{}/delete/{}", app.address, new_id))
        .header("x-user-id", admin_id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn test_anonymous_mutation_is_unauthorized_and_browsers_get_redirected() {
    let Some(app) = spawn_app().await else { return };
    let client = client();

    // JSON client: bare 401 with the taxonomy body.
    let response = client
        .post(format!("{}/new", app.address))
        .json(&student_payload(unique_student_id(), "Ada", None))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], 401);
    assert_eq!(body["error"], "Unauthorized");

    // Browser client: degraded to a redirect toward the login page.
    let response = client
        .post(format!("{}/new", app.address))
        .header("accept", "text/html")
        .json(&student_payload(unique_student_id(), "Ada", None))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);
    assert_eq!(response.headers()["location"], "/login");
}

#[tokio::test]
async fn test_guest_account_cannot_mutate_and_logout_revokes_the_session() {
    let Some(app) = spawn_app().await else { return };
    let client = client();
    let username = format!("guest-{}", Uuid::new_v4().simple());

    // Register through the public surface.
    let response = client
        .post(format!("{}/register", app.address))
        .json(&serde_json::json!({
            "username": username,
            "password": "a-long-password",
            "confirm_password": "a-long-password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    // Duplicate registration is rejected.
    let response = client
        .post(format!("{}/register", app.address))
        .json(&serde_json::json!({
            "username": username,
            "password": "another-long-password",
            "confirm_password": "another-long-password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Login and obtain the bearer token.
    let response = client
        .post(format!("{}/login", app.address))
        .json(&serde_json::json!({
            "username": username,
            "password": "a-long-password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let login: LoginResponse = response.json().await.unwrap();

    // A guest session is authenticated but not authorized to mutate.
    let response = client
        .post(format!("{}/new", app.address))
        .bearer_auth(&login.token)
        .json(&student_payload(unique_student_id(), "Ada", None))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // Logout destroys the session...
    let response = client
        .get(format!("{}/logout", app.address))
        .bearer_auth(&login.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);

    // ...so the same token now fails authentication, not authorization.
    let response = client
        .post(format!("{}/new", app.address))
        .bearer_auth(&login.token)
        .json(&student_payload(unique_student_id(), "Ada", None))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_major_filter_and_unknown_major() {
    let Some(app) = spawn_app().await else { return };
    let client = client();

    // The seeded catalog is listed on the landing payload.
    let roster: RosterPayload = client
        .get(format!("{}/", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!roster.majors.is_empty());

    let major_id = roster.majors[0].id;
    let response = client
        .get(format!("{}/major/{}", app.address, major_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // A major id that does not exist at all is a 404, not an empty roster.
    let response = client
        .get(format!("{}/major/999999", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}
