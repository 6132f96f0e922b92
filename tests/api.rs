use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use lead_analyzer::auth::{AuthConfig, Claims};
use lead_analyzer::core::config_manager::ServiceConfig;
use lead_analyzer::core::database::{AnalysisRepository, DatabaseConfig};
use lead_analyzer::linkedin_analysis::ProfileAnalyzer;
use lead_analyzer::sections::SectionPolicy;
use lead_analyzer::web::{build_rocket, ServerConfig};
use rocket::http::{ContentType, Header as HttpHeader, Status};
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const SECRET: &str = "integration-secret";
const ADMIN_EMAIL: &str = "admin@example.com";
const UPSTREAM_KEY: &str = "upstream-key";
const PROFILE_TEXT: &str =
    "Profile Info\n- Jane Doe\n- CTO\n- Acme Corp\n\nSummary\nJane is a leader.";

fn bearer(sub: &str, email: &str) -> HttpHeader<'static> {
    let claims = Claims {
        sub: sub.to_string(),
        email: Some(email.to_string()),
        aud: None,
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("token encodes");

    HttpHeader::new("Authorization", format!("Bearer {}", token))
}

async fn client(trial_credits: i64) -> Client {
    // Nothing listens on the discard port, so analysis calls fail fast
    client_with_upstream(trial_credits, "http://127.0.0.1:9/analyze".to_string(), None).await
}

async fn client_with_upstream(
    trial_credits: i64,
    analysis_api_url: String,
    analysis_api_key: Option<String>,
) -> Client {
    let db_config = DatabaseConfig::in_memory().await.expect("in-memory database");
    let auth_config = AuthConfig::new(SECRET.to_string())
        .with_trial_credits(trial_credits)
        .with_admin_emails(vec![ADMIN_EMAIL.to_string()]);

    let analyzer = ProfileAnalyzer::new(&ServiceConfig {
        analysis_api_url,
        analysis_api_key,
        timeout_seconds: 5,
    })
    .expect("analyzer builds");

    let server_config = ServerConfig {
        section_policy: SectionPolicy::Blocks,
    };

    Client::tracked(build_rocket(server_config, auth_config, db_config, analyzer))
        .await
        .expect("valid rocket instance")
}

/// What the stub analysis API received
struct UpstreamRequest {
    head: String,
    body: String,
}

impl UpstreamRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim())
        })
    }
}

/// Serve exactly one request on a local port and answer with `status` and `body`
async fn stub_analysis_api(
    status: &'static str,
    body: String,
) -> (String, oneshot::Receiver<UpstreamRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let url = format!(
        "http://{}/api/v1/analyze-profile",
        listener.local_addr().expect("stub address")
    );
    let (sender, receiver) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("upstream connection");
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];

        let header_end = loop {
            let read = socket.read(&mut chunk).await.expect("read request");
            assert!(read > 0, "connection closed before headers");
            buffer.extend_from_slice(&chunk[..read]);
            if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                if key.trim().eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);

        while buffer.len() < header_end + content_length {
            let read = socket.read(&mut chunk).await.expect("read body");
            assert!(read > 0, "connection closed before body");
            buffer.extend_from_slice(&chunk[..read]);
        }
        let request_body =
            String::from_utf8_lossy(&buffer[header_end..header_end + content_length]).to_string();

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket
            .write_all(response.as_bytes())
            .await
            .expect("write response");
        let _ = socket.shutdown().await;

        let _ = sender.send(UpstreamRequest {
            head,
            body: request_body,
        });
    });

    (url, receiver)
}

async fn credits_of(client: &Client, sub: &str, email: &str) -> i64 {
    let response = client.get("/api/me").header(bearer(sub, email)).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.expect("json body");
    body["data"]["credits"].as_i64().expect("credits field")
}

#[rocket::async_test]
async fn health_is_public() {
    let client = client(1).await;
    let response = client.get("/api/health").dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Origin"),
        Some("*")
    );
    assert!(response
        .headers()
        .get_one("Access-Control-Allow-Credentials")
        .is_none());
    assert_eq!(response.into_json::<String>().await.as_deref(), Some("OK"));
}

#[rocket::async_test]
async fn me_requires_a_valid_token() {
    let client = client(3).await;

    let response = client.get("/api/me").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error_code"], "AUTHENTICATION_ERROR");
    assert_eq!(body["success"], false);

    let response = client
        .get("/api/me")
        .header(HttpHeader::new("Authorization", "Bearer garbage"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client
        .get("/api/me")
        .header(bearer("uid-1", "jane@example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["type"], "data");
    assert_eq!(body["data"]["email"], "jane@example.com");
    assert_eq!(body["data"]["role"], "user");
    assert_eq!(body["data"]["plan"], "trial");
    assert_eq!(body["data"]["credits"], 3);
}

#[rocket::async_test]
async fn analyze_rejects_non_profile_urls() {
    let client = client(1).await;

    let response = client
        .post("/api/analyze")
        .header(bearer("uid-1", "jane@example.com"))
        .header(ContentType::JSON)
        .body(json!({ "linkedin_url": "https://www.linkedin.com/company/acme" }).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error_code"], "INVALID_PROFILE_URL");
    assert_eq!(credits_of(&client, "uid-1", "jane@example.com").await, 1);
}

#[rocket::async_test]
async fn analyze_requires_credits() {
    let client = client(0).await;

    let response = client
        .post("/api/analyze")
        .header(bearer("uid-1", "jane@example.com"))
        .header(ContentType::JSON)
        .body(json!({ "linkedin_url": "https://www.linkedin.com/in/jane" }).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::PaymentRequired);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error_code"], "INSUFFICIENT_CREDITS");
}

#[rocket::async_test]
async fn failed_upstream_call_does_not_charge() {
    let client = client(1).await;

    let response = client
        .post("/api/analyze")
        .header(bearer("uid-1", "jane@example.com"))
        .header(ContentType::JSON)
        .body(json!({ "linkedin_url": "linkedin.com/in/jane" }).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadGateway);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error_code"], "API_UNAVAILABLE");
    assert_eq!(credits_of(&client, "uid-1", "jane@example.com").await, 1);
}

#[rocket::async_test]
async fn analyze_stores_upstream_profile_and_charges_one_credit() {
    let (url, upstream) = stub_analysis_api(
        "200 OK",
        json!({ "profile_data": PROFILE_TEXT, "model": "stub" }).to_string(),
    )
    .await;
    let client = client_with_upstream(2, url, Some(UPSTREAM_KEY.to_string())).await;

    let response = client
        .post("/api/analyze")
        .header(bearer("uid-1", "jane@example.com"))
        .header(ContentType::JSON)
        .body(json!({ "linkedin_url": "www.linkedin.com/in/jane/?trk=feed" }).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["linkedin_url"], "https://www.linkedin.com/in/jane");
    assert_eq!(body["data"]["credits_remaining"], 1);
    assert_eq!(body["data"]["summary"]["identity"]["name"], "Jane Doe");
    assert_eq!(body["data"]["summary"]["identity"]["company"], "Acme Corp");
    assert_eq!(body["data"]["summary"]["full_text"], PROFILE_TEXT);
    assert_eq!(body["display_format"]["type"], "lead_summary");
    assert_eq!(body["display_format"]["sections"][0]["content"], "CTO at Acme Corp");

    let received = upstream.await.expect("upstream was called");
    assert!(received.head.starts_with("POST /api/v1/analyze-profile "));
    assert_eq!(
        received.header("authorization"),
        Some(format!("Bearer {}", UPSTREAM_KEY).as_str())
    );
    let sent: Value = serde_json::from_str(&received.body).expect("json request body");
    assert_eq!(sent, json!({ "linkedin_url": "https://www.linkedin.com/in/jane" }));

    assert_eq!(credits_of(&client, "uid-1", "jane@example.com").await, 1);

    let db_config = client
        .rocket()
        .state::<DatabaseConfig>()
        .expect("managed database");
    let stored = AnalysisRepository::new(db_config.pool().unwrap())
        .list_for_user("uid-1")
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].profile_data, PROFILE_TEXT);
    assert_eq!(body["data"]["id"], stored[0].id.as_str());
}

#[rocket::async_test]
async fn upstream_error_is_reported_without_charging() {
    let (url, upstream) = stub_analysis_api(
        "503 Service Unavailable",
        json!({ "error": "profile is private" }).to_string(),
    )
    .await;
    let client = client_with_upstream(1, url, None).await;

    let response = client
        .post("/api/analyze")
        .header(bearer("uid-1", "jane@example.com"))
        .header(ContentType::JSON)
        .body(json!({ "linkedin_url": "https://linkedin.com/in/jane" }).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadGateway);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error_code"], "API_ERROR");

    let received = upstream.await.expect("upstream was called");
    assert!(received.header("authorization").is_none());
    assert_eq!(credits_of(&client, "uid-1", "jane@example.com").await, 1);
}

#[rocket::async_test]
async fn stored_analyses_are_rendered_per_owner() {
    let client = client(2).await;
    credits_of(&client, "uid-1", "jane@example.com").await;

    let db_config = client
        .rocket()
        .state::<DatabaseConfig>()
        .expect("managed database");
    let record = AnalysisRepository::new(db_config.pool().unwrap())
        .insert_charging_credit(
            "uid-1",
            "https://www.linkedin.com/in/jane",
            PROFILE_TEXT,
        )
        .await
        .unwrap()
        .expect("credit available")
        .record;

    let response = client
        .get("/api/analyses")
        .header(bearer("uid-1", "jane@example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["data"][0]["id"], record.id.as_str());
    assert_eq!(body["data"][0]["identity"]["company"], "Acme Corp");

    let response = client
        .get(format!("/api/analyses/{}", record.id))
        .header(bearer("uid-1", "jane@example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["data"]["summary"]["identity"]["name"], "Jane Doe");
    assert_eq!(body["data"]["summary"]["sections"][1]["title"], "Summary");
    assert_eq!(body["display_format"]["type"], "lead_summary");

    let response = client
        .get(format!("/api/analyses/{}/summary", record.id))
        .header(bearer("uid-1", "jane@example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.into_string().await.as_deref(), Some(PROFILE_TEXT));

    let response = client
        .get(format!("/api/analyses/{}", record.id))
        .header(bearer("uid-2", "john@example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    let response = client
        .delete(format!("/api/analyses/{}", record.id))
        .header(bearer("uid-1", "jane@example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .get(format!("/api/analyses/{}", record.id))
        .header(bearer("uid-1", "jane@example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
}

#[rocket::async_test]
async fn admin_routes_require_admin_role() {
    let client = client(1).await;
    credits_of(&client, "uid-1", "jane@example.com").await;

    let response = client
        .get("/api/admin/users")
        .header(bearer("uid-1", "jane@example.com"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error_code"], "AUTHORIZATION_ERROR");

    let response = client
        .get("/api/admin/users")
        .header(bearer("uid-admin", ADMIN_EMAIL))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
}

#[rocket::async_test]
async fn admin_manages_credits_role_and_plan() {
    let client = client(1).await;
    credits_of(&client, "uid-1", "jane@example.com").await;
    let admin = || bearer("uid-admin", ADMIN_EMAIL);

    let response = client
        .post("/api/admin/credits")
        .header(admin())
        .header(ContentType::JSON)
        .body(json!({ "user_id": "uid-1", "credits": 10 }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(credits_of(&client, "uid-1", "jane@example.com").await, 10);

    let response = client
        .post("/api/admin/credits")
        .header(admin())
        .header(ContentType::JSON)
        .body(json!({ "user_id": "uid-1", "credits": -1 }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let response = client
        .post("/api/admin/credits")
        .header(admin())
        .header(ContentType::JSON)
        .body(json!({ "user_id": "nobody", "credits": 1 }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    let response = client
        .post("/api/admin/role")
        .header(admin())
        .header(ContentType::JSON)
        .body(json!({ "user_id": "uid-1", "role": "superuser" }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let response = client
        .post("/api/admin/role")
        .header(admin())
        .header(ContentType::JSON)
        .body(json!({ "user_id": "uid-1", "role": "admin" }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["data"]["role"], "admin");

    let response = client
        .post("/api/admin/plan")
        .header(admin())
        .header(ContentType::JSON)
        .body(json!({ "user_id": "uid-1", "plan": "subscribed" }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["data"]["plan"], "subscribed");
}
