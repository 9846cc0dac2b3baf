mod common;

use axum_test::multipart::{MultipartForm, Part};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use common::{
    BLOB_BASE_URL, FakeDetector, FakeEmbedder, FakeFetcher, Harness, UnavailableRecordStore,
    record,
};
use recall_server::cache::EmbeddingCache;

fn scan_form(user_id: &str, location: &str, manual_tags: &str, image: &[u8]) -> MultipartForm {
    MultipartForm::new()
        .add_text("user_id", user_id.to_string())
        .add_text("location", location.to_string())
        .add_text("manual_tags", manual_tags.to_string())
        .add_part(
            "file",
            Part::bytes(image.to_vec())
                .file_name("cat.jpg")
                .mime_type("image/jpeg"),
        )
}

fn scratch_entries(h: &Harness) -> usize {
    std::fs::read_dir(h.scratch_dir.path())
        .expect("scratch dir")
        .count()
}

fn tags_of(value: &Value) -> Vec<String> {
    value["tags"]
        .as_array()
        .expect("tags array")
        .iter()
        .map(|t| t.as_str().expect("tag string").to_string())
        .collect()
}

#[tokio::test]
async fn test_health() {
    let h = Harness::builder().build();
    let response = h.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_scan_saves_record_and_embedding() {
    let h = Harness::builder()
        .detector(FakeDetector(Some(vec!["Dog".to_string(), "person".to_string()])))
        .build();

    let response = h
        .server
        .post("/scan")
        .multipart(scan_form("alice", "Lisbon", "Cat, Dog,cat", b"cat-photo"))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "saved");
    assert_eq!(tags_of(&body), vec!["cat", "dog", "person"]);

    let url = body["url"].as_str().expect("url").to_string();
    assert!(url.starts_with(BLOB_BASE_URL));
    assert!(url.ends_with("_cat.jpg"));

    // Blob written under the object name embedded in the URL.
    let object_name = url.rsplit('/').next().expect("object name");
    assert!(h.blob_dir.path().join(object_name).exists());

    assert_eq!(h.cache.get(&url).await.expect("cache"), Some(vec![1.0, 0.0]));
    assert_eq!(h.embedder.image_calls(), 1);

    // Scratch copy is gone once the request finishes.
    assert_eq!(scratch_entries(&h), 0);

    let listed = h
        .server
        .get("/memories")
        .add_query_param("user_id", "alice")
        .await
        .json::<Vec<Value>>();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["image_url"], url.as_str());
    assert_eq!(listed[0]["location"], "Lisbon");
}

#[tokio::test]
async fn test_scan_survives_detector_failure() {
    let h = Harness::builder().detector(FakeDetector(None)).build();

    let response = h
        .server
        .post("/scan")
        .multipart(scan_form("alice", "Porto", "beach", b"cat-photo"))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "saved");
    assert_eq!(tags_of(&body), vec!["beach"]);
    assert_eq!(scratch_entries(&h), 0);
}

#[tokio::test]
async fn test_scan_survives_embedding_failure() {
    let h = Harness::builder().embedder(FakeEmbedder::failing()).build();

    let response = h
        .server
        .post("/scan")
        .multipart(scan_form("alice", "Porto", "beach", b"cat-photo"))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "saved");
    assert!(h.cache.load().await.expect("cache").is_empty());
}

#[tokio::test]
async fn test_scan_missing_field_is_rejected() {
    let h = Harness::builder().build();

    let form = MultipartForm::new()
        .add_text("location", "Lisbon")
        .add_text("manual_tags", "")
        .add_part(
            "file",
            Part::bytes(b"cat-photo".to_vec())
                .file_name("cat.jpg")
                .mime_type("image/jpeg"),
        );
    let response = h.server.post("/scan").multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "failed");
    assert_eq!(body["kind"], "validation");
    assert_eq!(body["url"], "");
    assert!(tags_of(&body).is_empty());
}

#[tokio::test]
async fn test_scan_rejects_non_image_upload() {
    let h = Harness::builder().build();

    let form = MultipartForm::new()
        .add_text("user_id", "alice")
        .add_text("location", "Lisbon")
        .add_text("manual_tags", "")
        .add_part(
            "file",
            Part::bytes(b"hello".to_vec())
                .file_name("notes.txt")
                .mime_type("text/plain"),
        );
    let response = h.server.post("/scan").multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "failed");
    assert_eq!(body["kind"], "validation");
    assert_eq!(scratch_entries(&h), 0);
}

#[tokio::test]
async fn test_scan_store_outage_reports_failure() {
    let h = Harness::builder()
        .records(Arc::new(UnavailableRecordStore))
        .build();

    let response = h
        .server
        .post("/scan")
        .multipart(scan_form("alice", "Lisbon", "cat", b"cat-photo"))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "failed");
    assert_eq!(body["kind"], "store");
    assert_eq!(body["url"], "");
    assert!(tags_of(&body).is_empty());

    // Scratch copy is removed on the failure path too.
    assert_eq!(scratch_entries(&h), 0);
    assert_eq!(h.embedder.image_calls(), 0);
}

#[tokio::test]
async fn test_list_memories_is_scoped_to_user() {
    let h = Harness::with_records(vec![
        record("1", "alice", "http://img/a.jpg", &["cat"]),
        record("2", "bob", "http://img/b.jpg", &["dog"]),
        record("3", "alice", "http://img/c.jpg", &[]),
    ])
    .build();

    let listed = h
        .server
        .get("/memories")
        .add_query_param("user_id", "alice")
        .await
        .json::<Vec<Value>>();
    let ids: Vec<&str> = listed.iter().filter_map(|m| m["id"].as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);

    let nobody = h
        .server
        .get("/memories")
        .add_query_param("user_id", "carol")
        .await
        .json::<Vec<Value>>();
    assert!(nobody.is_empty());
}

#[tokio::test]
async fn test_list_memories_store_outage_returns_empty_list() {
    let h = Harness::builder()
        .records(Arc::new(UnavailableRecordStore))
        .build();

    let response = h
        .server
        .get("/memories")
        .add_query_param("user_id", "alice")
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!([]));
}

#[tokio::test]
async fn test_delete_removes_memory() {
    let h = Harness::with_records(vec![
        record("1", "alice", "http://img/a.jpg", &["cat"]),
        record("2", "alice", "http://img/b.jpg", &["dog"]),
    ])
    .build();

    let response = h.server.delete("/memories/1").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "status": "deleted" }));

    let listed = h
        .server
        .get("/memories")
        .add_query_param("user_id", "alice")
        .await
        .json::<Vec<Value>>();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], "2");

    let again = h.server.delete("/memories/1").await;
    again.assert_status_ok();
    let body: Value = again.json();
    assert_eq!(body["status"], "failed");
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_update_with_urlencoded_form() {
    let h = Harness::with_records(vec![record("1", "alice", "http://img/a.jpg", &["cat"])]).build();

    let form: HashMap<&str, &str> =
        HashMap::from([("location", "Paris"), ("manual_tags", "Cat, Dog,cat")]);
    let response = h.server.put("/memories/1").form(&form).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "updated");
    assert_eq!(body["data"]["location"], "Paris");
    assert_eq!(body["data"]["tags"], json!(["cat", "dog"]));

    let listed = h
        .server
        .get("/memories")
        .add_query_param("user_id", "alice")
        .await
        .json::<Vec<Value>>();
    assert_eq!(listed[0]["location"], "Paris");
    assert_eq!(listed[0]["tags"], json!(["cat", "dog"]));
}

#[tokio::test]
async fn test_update_with_multipart_form() {
    let h = Harness::with_records(vec![record("1", "alice", "http://img/a.jpg", &["cat"])]).build();

    let form = MultipartForm::new()
        .add_text("location", "Rome")
        .add_text("manual_tags", "");
    let response = h.server.put("/memories/1").multipart(form).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["data"]["location"], "Rome");
    assert_eq!(body["data"]["tags"], json!([]));
}

#[tokio::test]
async fn test_update_unknown_or_incomplete() {
    let h = Harness::with_records(vec![record("1", "alice", "http://img/a.jpg", &["cat"])]).build();

    let form: HashMap<&str, &str> = HashMap::from([("location", "Paris"), ("manual_tags", "x")]);
    let missing: Value = h.server.put("/memories/42").form(&form).await.json();
    assert_eq!(missing["status"], "failed");
    assert_eq!(missing["kind"], "not_found");

    let partial: HashMap<&str, &str> = HashMap::from([("location", "Paris")]);
    let incomplete: Value = h.server.put("/memories/1").form(&partial).await.json();
    assert_eq!(incomplete["status"], "failed");
    assert_eq!(incomplete["kind"], "validation");
}

async fn seeded_search_harness() -> Harness {
    let h = Harness::with_records(vec![
        record("1", "alice", "http://img/cat.jpg", &["cat"]),
        record("2", "alice", "http://img/dog.jpg", &["dog"]),
        record("3", "alice", "http://img/bird.jpg", &["bird"]),
        record("4", "alice", "http://img/kitten.jpg", &["kitten"]),
        record("5", "bob", "http://img/bob-cat.jpg", &["cat"]),
    ])
    .build();

    h.cache.save("http://img/cat.jpg", vec![1.0, 0.0]).await.expect("cache");
    h.cache.save("http://img/dog.jpg", vec![0.0, 1.0]).await.expect("cache");
    h.cache.save("http://img/kitten.jpg", vec![0.6, 0.8]).await.expect("cache");
    h.cache.save("http://img/bob-cat.jpg", vec![1.0, 0.0]).await.expect("cache");
    h
}

async fn search(h: &Harness, q: &str, user_id: &str) -> Vec<Value> {
    let response = h
        .server
        .get("/search")
        .add_query_param("q", q)
        .add_query_param("user_id", user_id)
        .await;
    response.assert_status_ok();
    response.json::<Vec<Value>>()
}

fn ids_and_scores(results: &[Value]) -> Vec<(String, f64)> {
    results
        .iter()
        .map(|r| {
            (
                r["id"].as_str().expect("id").to_string(),
                r["score"].as_f64().expect("score"),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_search_ranks_by_tag_and_similarity() {
    let h = seeded_search_harness().await;

    // kitten: tag bonus 0.5 + similarity 0.6 beats pure similarity 1.0.
    let results = ids_and_scores(&search(&h, "kitten", "alice").await);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "4");
    assert!((results[0].1 - 1.1).abs() < 1e-5);
    assert_eq!(results[1].0, "1");
    assert!((results[1].1 - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_search_tag_match_without_similarity() {
    let h = seeded_search_harness().await;

    // The query vector is zero, so only the tag bonus counts.
    let results = ids_and_scores(&search(&h, "cat", "alice").await);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "1");
    assert!((results[0].1 - 0.5).abs() < 1e-5);

    // Substring of a tag also earns the bonus.
    let partial = ids_and_scores(&search(&h, "bir", "alice").await);
    assert_eq!(partial.len(), 1);
    assert_eq!(partial[0].0, "3");
}

#[tokio::test]
async fn test_search_drops_scores_at_or_below_threshold() {
    let h = seeded_search_harness().await;

    let results = search(&h, "nothing matches", "alice").await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_search_empty_query_earns_no_tag_bonus() {
    let h = seeded_search_harness().await;

    // Every seeded record is tagged, yet none may match on tags alone.
    let results = search(&h, "", "alice").await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_search_is_scoped_to_user() {
    let h = seeded_search_harness().await;

    let results = ids_and_scores(&search(&h, "cat", "bob").await);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "5");

    assert!(search(&h, "cat", "carol").await.is_empty());
}

#[tokio::test]
async fn test_search_store_outage_returns_empty_list() {
    let h = Harness::builder()
        .records(Arc::new(UnavailableRecordStore))
        .build();

    let response = h
        .server
        .get("/search")
        .add_query_param("q", "cat")
        .add_query_param("user_id", "alice")
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!([]));
}

#[tokio::test]
async fn test_reindex_embeds_missing_images_once() {
    let fetcher = FakeFetcher(HashMap::from([
        ("http://img/cat.jpg".to_string(), b"cat-photo".to_vec()),
        ("http://img/dog.jpg".to_string(), b"dog-photo".to_vec()),
    ]));
    let h = Harness::with_records(vec![
        record("1", "alice", "http://img/cat.jpg", &[]),
        record("2", "bob", "http://img/dog.jpg", &[]),
        record("3", "alice", "http://img/gone.jpg", &[]),
    ])
    .fetcher(fetcher)
    .build();

    let first: Value = h.server.post("/reindex").await.json();
    assert_eq!(first["status"], "success");
    assert_eq!(first["scanned"], 3);
    assert_eq!(first["updated"], 2);
    assert_eq!(first["failed"], 1);
    assert_eq!(h.embedder.image_calls(), 2);

    let cached = h.cache.load().await.expect("cache");
    assert_eq!(cached.get("http://img/cat.jpg"), Some(&vec![1.0, 0.0]));
    assert_eq!(cached.get("http://img/dog.jpg"), Some(&vec![0.0, 1.0]));

    let second: Value = h.server.post("/reindex").await.json();
    assert_eq!(second["updated"], 0);
    assert_eq!(second["failed"], 1);
    // Only the missing download is retried; nothing is re-embedded.
    assert_eq!(h.embedder.image_calls(), 2);
}

#[tokio::test]
async fn test_reindex_store_outage() {
    let h = Harness::builder()
        .records(Arc::new(UnavailableRecordStore))
        .build();

    let response = h.server.post("/reindex").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "failed");
    assert_eq!(body["kind"], "store");
}
