//! REST surface exercised through the router against in-memory SQLite

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use bibstore_common::{auth::hash_password, AppConfig, DbPool};
use bibstore_gateway::{create_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        let mut config = AppConfig::in_memory();
        config.rate_limit.enabled = false;

        let db = DbPool::new(&config.database).await.unwrap();
        db.create_schema().await.unwrap();

        let state = AppState::new(config, db);
        for name in ["alice", "bob"] {
            state
                .repo
                .create_user(name, &format!("{}@example.org", name), hash_password("pw").unwrap())
                .await
                .unwrap();
        }

        Self {
            router: create_router(state),
        }
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn token(&self, username: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/v2/auth/token",
                None,
                Some(json!({"username": username, "password": "pw"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn create(&self, token: &str, path: &str, body: Value) -> Value {
        let (status, created) = self
            .send("POST", &format!("/v2/{}", path), Some(token), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", created);
        created
    }

    async fn corpus(&self, token: &str, label: &str) -> i64 {
        self.create(token, "corpus", json!({"source": "wos", "label": label}))
            .await["id"]
            .as_i64()
            .unwrap()
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.send("GET", "/v2/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send("GET", "/v2/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["database"]["status"], "up");
}

#[tokio::test]
async fn test_resources_require_a_token() {
    let app = TestApp::new().await;
    let (status, body) = app.send("GET", "/v2/corpus", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = app.send("GET", "/v2/corpus", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            "POST",
            "/v2/auth/token",
            None,
            Some(json!({"username": "alice", "password": "wrong"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_corpus_lifecycle_and_owner_scoping() {
    let app = TestApp::new().await;
    let alice = app.token("alice").await;
    let bob = app.token("bob").await;

    let created = app
        .create(&alice, "corpus", json!({"source": "wos", "label": "Evolution"}))
        .await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["source"], "WOS");
    assert_eq!(created["url"], format!("/v2/corpus/{}", id));

    let (status, page) = app.send("GET", "/v2/corpus?label=evol", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 1);

    let (status, page) = app.send("GET", "/v2/corpus", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 0);
    let (status, _) = app
        .send("GET", &format!("/v2/corpus/{}", id), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = app
        .send(
            "PUT",
            &format!("/v2/corpus/{}", id),
            Some(&alice),
            Some(json!({"label": "Evolution 2"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["label"], "Evolution 2");

    let (status, _) = app
        .send(
            "PUT",
            &format!("/v2/corpus/{}", id),
            Some(&alice),
            Some(json!({"source": "JSTOR"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send("DELETE", &format!("/v2/corpus/{}", id), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .send("DELETE", &format!("/v2/corpus/{}", id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .send("GET", &format!("/v2/corpus/{}", id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_create_resolves_forward_references() {
    let app = TestApp::new().await;
    let alice = app.token("alice").await;
    let corpus = app.corpus(&alice, "bulk").await;

    let (status, body) = app
        .send(
            "POST",
            "/v2/paper_instance/bulk",
            Some(&alice),
            Some(json!({"data": [
                {"id": -1, "corpus_id": corpus, "title": "Cited later", "concrete": false, "cited_by_id": -3},
                {"id": -2, "corpus_id": corpus, "title": "Also cited", "concrete": false, "cited_by_id": -3},
                {"id": -3, "corpus_id": corpus, "title": "Citing paper"}
            ]})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let id_map = body["id_map"].as_object().unwrap();
    assert_eq!(id_map.len(), 3);
    let parent = id_map["-3"].as_i64().unwrap();
    assert_ne!(id_map["-1"], id_map["-2"]);

    let (_, stubs) = app
        .send(
            "GET",
            &format!("/v2/paper_instance?cited_by={}", parent),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(stubs["count"], 2);
    assert!(stubs["results"]
        .as_array()
        .unwrap()
        .iter()
        .all(|row| row["concrete"] == false));
}

#[tokio::test]
async fn test_bulk_create_rejects_bad_payloads() {
    let app = TestApp::new().await;
    let alice = app.token("alice").await;
    let corpus = app.corpus(&alice, "bad bulk").await;

    let (status, body) = app
        .send(
            "POST",
            "/v2/paper_instance/bulk",
            Some(&alice),
            Some(json!({"data": [
                {"id": -1, "corpus_id": corpus, "cited_by_id": -2},
                {"id": -2, "corpus_id": corpus, "cited_by_id": -1}
            ]})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .send(
            "POST",
            "/v2/paper_instance/bulk",
            Some(&alice),
            Some(json!({"data": [
                {"id": "a", "corpus_id": corpus},
                {"id": "a", "corpus_id": corpus}
            ]})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "DUPLICATE_TEMPORARY_ID");

    let (status, _) = app
        .send("POST", "/v2/paper_instance/bulk", Some(&alice), Some(json!({"data": []})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, page) = app.send("GET", "/v2/paper_instance", Some(&alice), None).await;
    assert_eq!(page["count"], 0);
}

#[tokio::test]
async fn test_citations_stay_inside_owned_corpus() {
    let app = TestApp::new().await;
    let alice = app.token("alice").await;
    let bob = app.token("bob").await;
    let first = app.corpus(&alice, "first").await;
    let second = app.corpus(&alice, "second").await;

    let paper = app
        .create(&alice, "paper_instance", json!({"corpus_id": first, "title": "Root"}))
        .await;

    let (status, _) = app
        .send(
            "POST",
            "/v2/paper_instance",
            Some(&alice),
            Some(json!({"corpus_id": second, "title": "Elsewhere", "cited_by_id": paper["id"]})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            "/v2/paper_instance",
            Some(&bob),
            Some(json!({"corpus_id": first, "title": "Intruder"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_filters_and_links() {
    let app = TestApp::new().await;
    let alice = app.token("alice").await;
    let corpus = app.corpus(&alice, "filters").await;

    let paper = app
        .create(
            &alice,
            "paper_instance",
            json!({"corpus_id": corpus, "title": "Citation NETWORKS", "publication_date": 2001}),
        )
        .await;
    app.create(&alice, "paper_instance", json!({"corpus_id": corpus, "title": "Other"}))
        .await;
    let id = paper["id"].as_i64().unwrap();
    assert_eq!(paper["authors"], format!("/v2/author_instance?paper={}", id));

    let (_, page) = app
        .send("GET", "/v2/paper_instance?title=networks", Some(&alice), None)
        .await;
    assert_eq!(page["count"], 1);

    let (_, page) = app
        .send("GET", "/v2/paper_instance?limit=1", Some(&alice), None)
        .await;
    assert_eq!(page["count"], 2);
    assert_eq!(page["results"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .send("GET", "/v2/paper_instance?corpus=abc", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_FILTER");
}

#[tokio::test]
async fn test_checksum_lookup() {
    let app = TestApp::new().await;
    let alice = app.token("alice").await;
    let corpus = app.corpus(&alice, "checksums").await;
    app.create(
        &alice,
        "paper_instance",
        json!({"corpus_id": corpus, "title": "Known", "checksum": "abc123"}),
    )
    .await;

    let (status, body) = app
        .send(
            "GET",
            &format!("/v2/paper_instance/checksum?checksum=abc123&corpus={}", corpus),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], true);

    let (status, body) = app
        .send(
            "POST",
            "/v2/paper_instance/checksum",
            Some(&alice),
            Some(json!({"corpus": corpus, "checksums": ["abc123", "missing"]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"]["abc123"], true);
    assert_eq!(body["results"]["missing"], false);
}

#[tokio::test]
async fn test_affiliation_confidence_is_validated() {
    let app = TestApp::new().await;
    let alice = app.token("alice").await;
    let corpus = app.corpus(&alice, "affiliations").await;
    let paper = app
        .create(&alice, "paper_instance", json!({"corpus_id": corpus}))
        .await["id"]
        .clone();
    let author = app
        .create(
            &alice,
            "author_instance",
            json!({"corpus_id": corpus, "paper_id": paper, "last_name": "SMITH"}),
        )
        .await["id"]
        .clone();
    let institution = app
        .create(
            &alice,
            "institution_instance",
            json!({"corpus_id": corpus, "paper_id": paper, "name": "UNIV A"}),
        )
        .await["id"]
        .clone();

    let row = json!({
        "corpus_id": corpus,
        "paper_id": paper,
        "author_id": author,
        "institution_id": institution,
    });

    let mut too_high = row.clone();
    too_high["confidence"] = json!(1.5);
    let (status, _) = app
        .send("POST", "/v2/affiliation_instance", Some(&alice), Some(too_high))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let created = app.create(&alice, "affiliation_instance", row).await;
    assert_eq!(created["confidence"], 0.0);

    let (_, page) = app
        .send("GET", "/v2/affiliation_instance?confidence=0.5", Some(&alice), None)
        .await;
    assert_eq!(page["count"], 0);
}

#[tokio::test]
async fn test_identity_assertions_are_append_only() {
    let app = TestApp::new().await;
    let alice = app.token("alice").await;
    let corpus = app.corpus(&alice, "identities").await;
    let paper = app
        .create(&alice, "paper_instance", json!({"corpus_id": corpus}))
        .await["id"]
        .clone();
    let instance = app
        .create(
            &alice,
            "author_instance",
            json!({"corpus_id": corpus, "paper_id": paper, "last_name": "SMITH"}),
        )
        .await["id"]
        .as_i64()
        .unwrap();
    let author = app
        .create(&alice, "author", json!({"first_name": "JOHN", "last_name": "SMITH"}))
        .await["id"]
        .as_i64()
        .unwrap();

    let mut runs = Vec::new();
    for (label, confidence) in [("first run", 0.9), ("second run", 0.4)] {
        let (status, body) = app
            .send(
                "POST",
                "/v2/disambiguation",
                Some(&alice),
                Some(json!({
                    "label": label,
                    "kind": "author",
                    "assertions": [{"instance_id": instance, "entity_id": author, "confidence": confidence}]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        runs.push((body["model"]["id"].clone(), body["ids"][0].as_i64().unwrap()));
    }

    let (status, body) = app
        .send(
            "GET",
            &format!("/v2/resolve/author/{}", instance),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["identity"]["model_id"], runs[0].0);

    let (_, body) = app
        .send(
            "GET",
            &format!("/v2/resolve/author/{}?policy=most_recent_model", instance),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(body["identity"]["model_id"], runs[1].0);

    let assertion = runs[0].1;
    let (status, body) = app
        .send(
            "PUT",
            &format!("/v2/author_identity/{}", assertion),
            Some(&alice),
            Some(json!({"confidence": 0.1})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "IMMUTABLE_RESOURCE");

    let (status, _) = app
        .send("DELETE", &format!("/v2/author_identity/{}", assertion), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send("GET", "/v2/resolve/author/9999", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_instances_cannot_change_corpus() {
    let app = TestApp::new().await;
    let alice = app.token("alice").await;
    let home = app.corpus(&alice, "home").await;
    let away = app.corpus(&alice, "away").await;

    let parent = app
        .create(&alice, "paper_instance", json!({"corpus_id": home, "title": "Parent"}))
        .await["id"]
        .as_i64()
        .unwrap();
    app.create(
        &alice,
        "paper_instance",
        json!({"corpus_id": home, "title": "Stub", "concrete": false, "cited_by_id": parent}),
    )
    .await;

    let (status, body) = app
        .send(
            "PUT",
            &format!("/v2/paper_instance/{}", parent),
            Some(&alice),
            Some(json!({"corpus_id": away})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (_, row) = app
        .send("GET", &format!("/v2/paper_instance/{}", parent), Some(&alice), None)
        .await;
    assert_eq!(row["corpus_id"], home);

    let (status, _) = app
        .send(
            "PUT",
            &format!("/v2/paper_instance/{}", parent),
            Some(&alice),
            Some(json!({"corpus_id": home, "title": "Renamed"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_instance_links_stay_inside_corpus() {
    let app = TestApp::new().await;
    let alice = app.token("alice").await;
    let bob = app.token("bob").await;
    let first = app.corpus(&alice, "first").await;
    let second = app.corpus(&alice, "second").await;
    let bobs = app.corpus(&bob, "bob's").await;

    let paper = app
        .create(&alice, "paper_instance", json!({"corpus_id": second}))
        .await["id"]
        .clone();
    let (status, _) = app
        .send(
            "POST",
            "/v2/author_instance",
            Some(&alice),
            Some(json!({"corpus_id": first, "paper_id": paper, "last_name": "SMITH"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let foreign = app
        .create(&bob, "paper_instance", json!({"corpus_id": bobs}))
        .await["id"]
        .clone();
    let (status, _) = app
        .send(
            "POST",
            "/v2/instance_metadatum",
            Some(&alice),
            Some(json!({"corpus_id": first, "paper_id": foreign, "name": "k", "value": "v"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let local = app
        .create(&alice, "paper_instance", json!({"corpus_id": first}))
        .await["id"]
        .clone();
    let author = app
        .create(
            &alice,
            "author_instance",
            json!({"corpus_id": first, "paper_id": local, "last_name": "DOE"}),
        )
        .await["id"]
        .clone();
    let elsewhere = app
        .create(
            &alice,
            "institution_instance",
            json!({"corpus_id": second, "paper_id": paper, "name": "UNIV B"}),
        )
        .await["id"]
        .clone();
    let (status, _) = app
        .send(
            "POST",
            "/v2/affiliation_instance/bulk",
            Some(&alice),
            Some(json!({"data": [{
                "corpus_id": first,
                "paper_id": local,
                "author_id": author,
                "institution_id": elsewhere,
            }]})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "PUT",
            &format!("/v2/author_instance/{}", author),
            Some(&alice),
            Some(json!({"paper_id": paper})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_disambiguation_runs_cannot_be_rewritten() {
    let app = TestApp::new().await;
    let alice = app.token("alice").await;
    let corpus = app.corpus(&alice, "runs").await;
    let paper = app
        .create(&alice, "paper_instance", json!({"corpus_id": corpus}))
        .await["id"]
        .clone();
    let instance = app
        .create(
            &alice,
            "author_instance",
            json!({"corpus_id": corpus, "paper_id": paper, "last_name": "SMITH"}),
        )
        .await["id"]
        .clone();
    let author = app
        .create(&alice, "author", json!({"first_name": "JOHN", "last_name": "SMITH"}))
        .await["id"]
        .clone();

    let (status, run) = app
        .send(
            "POST",
            "/v2/disambiguation",
            Some(&alice),
            Some(json!({
                "label": "names",
                "kind": "author",
                "assertions": [{"instance_id": instance, "entity_id": author, "confidence": 0.7}]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", run);
    let model = run["model"]["id"].as_i64().unwrap();

    let (status, body) = app
        .send("DELETE", &format!("/v2/disambiguation_model/{}", model), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "IMMUTABLE_RESOURCE");

    let (status, _) = app
        .send(
            "PUT",
            &format!("/v2/disambiguation_model/{}", model),
            Some(&alice),
            Some(json!({"label": "renamed"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, page) = app
        .send(
            "GET",
            &format!("/v2/author_identity?model={}", model),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(page["count"], 1);
    let (_, row) = app
        .send("GET", &format!("/v2/disambiguation_model/{}", model), Some(&alice), None)
        .await;
    assert_eq!(row["label"], "names");
}

#[tokio::test]
async fn test_users_hide_password_hash() {
    let app = TestApp::new().await;
    let alice = app.token("alice").await;

    let (status, page) = app.send("GET", "/v2/user", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 2);
    let first = &page["results"][0];
    assert_eq!(first["username"], "alice");
    assert!(first.get("password_hash").is_none());
    assert_eq!(first["url"], "/v2/user/1");
}
