/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use likeshelf_core::api::{CollectionApi, HttpCollectionApi};
use likeshelf_core::error::SyncError;
use likeshelf_core::feed::{FeedSnapshot, FeedState};
use likeshelf_core::feed_worker::{FeedHandle, FeedSettings};
use likeshelf_core::net_metrics::NetMetrics;
use likeshelf_core::query::QuerySpec;
use likeshelf_protocol::{
    Item, ItemCreate, ItemId, ItemPayload, ListParams, SortDirection, Tag, TagsUpdate,
};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Default)]
struct Shelf {
    items: Vec<Item>,
    queries: Vec<HashMap<String, String>>,
    tag_failures_left: u32,
}

type Shared = Arc<Mutex<Shelf>>;

fn tag_of(name: &str) -> Tag {
    Tag {
        id: name.bytes().map(i64::from).sum(),
        name: name.to_string(),
    }
}

fn item(id: i64, tags: &[&str]) -> Item {
    Item {
        id: ItemId(id),
        url: format!("https://x.com/u/status/{id}"),
        folder_id: None,
        folder: None,
        tags: tags.iter().map(|t| tag_of(t)).collect(),
        created_at: format!("2025-01-01T00:{:02}:00", id),
        posted_at: None,
        payload: ItemPayload {
            text: Some(format!("post {id}")),
            ..ItemPayload::default()
        },
    }
}

async fn list_posts(
    State(shelf): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Vec<Item>> {
    let mut g = shelf.lock().unwrap();
    g.queries.push(q.clone());
    let wanted: Vec<&str> = q
        .get("tag_names")
        .map(|s| s.split(',').filter(|t| !t.is_empty()).collect())
        .unwrap_or_default();
    let mut out: Vec<Item> = g
        .items
        .iter()
        .filter(|i| wanted.iter().all(|t| i.has_tag(t)))
        .cloned()
        .collect();
    out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    if q.get("sort_order").map(String::as_str) != Some("asc") {
        out.reverse();
    }
    let skip: usize = q.get("skip").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit: usize = q.get("limit").and_then(|v| v.parse().ok()).unwrap_or(100);
    Json(out.into_iter().skip(skip).take(limit).collect())
}

async fn get_post(
    State(shelf): State<Shared>,
    Path(id): Path<i64>,
) -> Result<Json<Item>, StatusCode> {
    let g = shelf.lock().unwrap();
    g.items
        .iter()
        .find(|i| i.id.0 == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn put_tags(
    State(shelf): State<Shared>,
    Path(id): Path<i64>,
    Json(body): Json<TagsUpdate>,
) -> Result<Json<Item>, StatusCode> {
    let mut g = shelf.lock().unwrap();
    let it = g
        .items
        .iter_mut()
        .find(|i| i.id.0 == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    it.tags = body.tags.iter().map(|t| tag_of(t)).collect();
    Ok(Json(it.clone()))
}

async fn list_tags(State(shelf): State<Shared>) -> Result<Json<Vec<Tag>>, StatusCode> {
    let mut g = shelf.lock().unwrap();
    if g.tag_failures_left > 0 {
        g.tag_failures_left -= 1;
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    let mut tags: Vec<Tag> = Vec::new();
    for t in g.items.iter().flat_map(|i| i.tags.iter()) {
        if !tags.iter().any(|x| x.name == t.name) {
            tags.push(t.clone());
        }
    }
    Ok(Json(tags))
}

async fn create_post(State(shelf): State<Shared>, Json(body): Json<ItemCreate>) -> Json<Item> {
    let mut g = shelf.lock().unwrap();
    let id = g.items.iter().map(|i| i.id.0).max().unwrap_or(0) + 1;
    let names: Vec<&str> = body.tags.iter().map(String::as_str).collect();
    let mut it = item(id, &names);
    it.url = body.url.clone();
    g.items.push(it.clone());
    Json(it)
}

async fn serve(shelf: Shared) -> String {
    let router = Router::new()
        .route("/api/posts/", get(list_posts).post(create_post))
        .route("/api/posts/:id", get(get_post))
        .route("/api/posts/:id/tags", put(put_tags))
        .route("/api/tags/", get(list_tags))
        .with_state(shelf);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service()).await.unwrap();
    });
    format!("http://{addr}/api/")
}

fn seeded(n: i64) -> Shared {
    let items = (1..=n)
        .map(|i| {
            if i % 2 == 0 {
                item(i, &["even", "all"])
            } else {
                item(i, &["odd", "all"])
            }
        })
        .collect();
    Arc::new(Mutex::new(Shelf {
        items,
        ..Shelf::default()
    }))
}

fn client(base: &str, metrics: Arc<NetMetrics>) -> HttpCollectionApi {
    HttpCollectionApi::new(
        reqwest::Client::new(),
        base,
        3,
        Duration::from_secs(5),
        metrics,
    )
}

#[tokio::test]
async fn list_sends_canonical_query() {
    let shelf = seeded(6);
    let api = client(&serve(shelf.clone()).await, Arc::new(NetMetrics::new()));

    let spec = QuerySpec::new(["all", "even"], SortDirection::Asc);
    let q = spec.to_params();
    let items = api
        .list(&ListParams {
            skip: 1,
            limit: 2,
            tag_names: q.tag_names,
            sort_order: q.sort_order,
        })
        .await
        .unwrap();
    let ids: Vec<i64> = items.iter().map(|i| i.id.0).collect();
    assert_eq!(ids, vec![4, 6]);
    assert_eq!(items[0].payload.text.as_deref(), Some("post 4"));

    let g = shelf.lock().unwrap();
    let sent = g.queries.last().unwrap();
    assert_eq!(sent.get("tag_names").map(String::as_str), Some("all,even"));
    assert_eq!(sent.get("sort_order").map(String::as_str), Some("asc"));
    assert_eq!(sent.get("skip").map(String::as_str), Some("1"));
    assert_eq!(sent.get("limit").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn unfiltered_list_omits_tag_names() {
    let shelf = seeded(3);
    let api = client(&serve(shelf.clone()).await, Arc::new(NetMetrics::new()));
    let items = api
        .list(&ListParams {
            skip: 0,
            limit: 10,
            tag_names: None,
            sort_order: SortDirection::Desc,
        })
        .await
        .unwrap();
    assert_eq!(items.first().map(|i| i.id.0), Some(3));
    assert!(!shelf.lock().unwrap().queries[0].contains_key("tag_names"));
}

#[tokio::test]
async fn get_and_update_tags() {
    let shelf = seeded(2);
    let api = client(&serve(shelf).await, Arc::new(NetMetrics::new()));

    let it = api.get(ItemId(1)).await.unwrap();
    assert!(it.has_tag("odd"));

    let updated = api
        .update_tags(ItemId(1), &["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(
        updated.tag_names().into_iter().collect::<Vec<_>>(),
        vec!["a", "b"]
    );

    assert_eq!(api.get(ItemId(99)).await.unwrap_err(), SyncError::NotFound(ItemId(99)));
    assert_eq!(
        api.update_tags(ItemId(99), &[]).await.unwrap_err(),
        SyncError::NotFound(ItemId(99))
    );
}

#[tokio::test]
async fn tag_vocabulary_retries_unavailable_server() {
    let shelf = seeded(4);
    shelf.lock().unwrap().tag_failures_left = 2;
    let metrics = Arc::new(NetMetrics::new());
    let api = client(&serve(shelf).await, metrics.clone());

    let tags = api.list_tags().await.unwrap();
    let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["all", "even", "odd"]);
    assert_eq!(metrics.http_requests.load(Ordering::Relaxed), 3);
    assert_eq!(metrics.http_errors.load(Ordering::Relaxed), 2);
}

#[tokio::test]
async fn create_validates_before_sending() {
    let shelf = seeded(1);
    let metrics = Arc::new(NetMetrics::new());
    let api = client(&serve(shelf).await, metrics.clone());

    let err = api
        .create(&ItemCreate {
            url: "   ".to_string(),
            ..ItemCreate::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Validation(_)));
    assert_eq!(metrics.http_requests.load(Ordering::Relaxed), 0);

    let it = api
        .create(&ItemCreate {
            url: "https://x.com/z/status/5".to_string(),
            folder_id: None,
            tags: vec!["fresh".to_string()],
        })
        .await
        .unwrap();
    assert_eq!(it.id, ItemId(2));
    assert!(it.has_tag("fresh"));
}

#[tokio::test]
async fn unreachable_remote_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let api = HttpCollectionApi::new(
        reqwest::Client::new(),
        &format!("http://{addr}/api"),
        1,
        Duration::from_secs(5),
        Arc::new(NetMetrics::new()),
    );
    let err = api.list_tags().await.unwrap_err();
    assert!(err.is_network());
}

async fn settled(rx: &mut watch::Receiver<FeedSnapshot>, min_page: u32) -> FeedSnapshot {
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| matches!(s.state, FeedState::Loaded { .. }) && s.page_index >= min_page),
    )
    .await
    .expect("feed did not settle")
    .expect("feed worker stopped")
    .clone()
}

#[tokio::test]
async fn feed_pages_through_http_remote() {
    let shelf = seeded(23);
    let metrics = Arc::new(NetMetrics::new());
    let api = Arc::new(client(&serve(shelf).await, metrics.clone()));
    let feed = FeedHandle::spawn(
        api,
        FeedSettings::new(NonZeroU32::new(10).unwrap()),
        QuerySpec::default(),
        metrics,
    );
    let mut rx = feed.subscribe();

    let s = settled(&mut rx, 1).await;
    assert_eq!(s.items.len(), 10);
    assert_eq!(s.items[0].id, ItemId(23));
    feed.near_end();
    let s = settled(&mut rx, 2).await;
    assert_eq!(s.items.len(), 20);
    feed.near_end();
    let s = settled(&mut rx, 3).await;
    assert_eq!(s.items.len(), 23);
    assert!(s.exhausted);

    feed.toggle_tag("even");
    let s = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| matches!(s.state, FeedState::Loaded { .. }) && s.spec.is_selected("even")),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    assert_eq!(s.items.len(), 10);
    assert!(s.items.iter().all(|i| i.has_tag("even")));
    assert_eq!(s.page_index, 1);
    feed.shutdown().await;
}
