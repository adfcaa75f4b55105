use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/oauth2/token";
pub const HELIX_PATH: &str = "/helix";

/// Token endpoint issuing `token`, verified to be hit `expected` times.
#[allow(dead_code)]
pub async fn mount_token_endpoint(server: &MockServer, token: &str, expected: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "expires_in": 5_000_000,
            "token_type": "bearer"
        })))
        .expect(expected)
        .mount(server)
        .await;
}

/// A minimal stream record.
#[allow(dead_code)]
pub fn stream_record(user_id: &str, title: &str, viewers: u64) -> Value {
    json!({
        "id": format!("s-{user_id}"),
        "user_id": user_id,
        "user_login": format!("user{user_id}"),
        "user_name": format!("User{user_id}"),
        "game_id": "1",
        "title": title,
        "viewer_count": viewers,
        "started_at": "2024-05-01T10:00:00Z"
    })
}

/// `count` numbered records, ids starting at `offset`.
#[allow(dead_code)]
pub fn numbered_records(offset: usize, count: usize) -> Vec<Value> {
    (offset..offset + count)
        .map(|i| stream_record(&i.to_string(), "mxl", 1))
        .collect()
}

/// Response envelope with an optional cursor.
#[allow(dead_code)]
pub fn page(records: Vec<Value>, cursor: Option<&str>) -> Value {
    match cursor {
        Some(c) => json!({ "data": records, "pagination": { "cursor": c } }),
        None => json!({ "data": records, "pagination": {} }),
    }
}

/// Serve `body` for `resource`, on the page reached with cursor `after`
/// (`None` for the first page).
#[allow(dead_code)]
pub async fn mount_page(
    server: &MockServer,
    resource: &str,
    after: Option<&str>,
    body: Value,
    expected: u64,
) {
    let builder = Mock::given(method("GET"))
        .and(path(format!("{HELIX_PATH}/{resource}")))
        .and(query_param("first", "100"));
    let builder = match after {
        Some(cursor) => builder.and(query_param("after", cursor)),
        None => builder.and(query_param_is_missing("after")),
    };
    builder
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected)
        .mount(server)
        .await;
}
