//! End-to-end tests for the fetch client over the in-memory engine.
//!
//! Each test stands up one or more [`MemoryEngine`] servers and drives them
//! through the public API only.
//!
//! # Coverage
//!
//! | Test | Behaviour |
//! |------|-----------|
//! | `shorthand_address_reaches_handler` | normalisation, status details, sentinel predicate |
//! | `error_statuses_are_responses` | status/transport split |
//! | `unreachable_server_fails_at_connect` | connect stage, nothing pooled |
//! | `malformed_address_fails_at_parse` | parse stage, no dial |
//! | `broken_connection_is_evicted_and_redialed` | fetch stage eviction |
//! | `parallel_requests_share_one_dial` | pool under concurrency |
//! | `identity_reaches_the_server` | handshake identity |
//! | `lent_keypair_survives_close` | identity ownership |
//! | `json_round_trip` | json helpers |
//! | `message_size_limit_fails_at_fetch` | settings |
//! | `error_for_status_with_question_mark` | `Error` conversions |

use std::sync::{Arc, Mutex};

use nwfetch::{
    is_not_found, is_rate_limited, Client, Error, Keypair, MemoryEngine, Method, Reply, Request,
    Settings, Stage, Status,
};
use serde::{Deserialize, Serialize};

fn greeter() -> MemoryEngine {
    let engine = MemoryEngine::new();
    engine.serve("node1", 6937, |ex, _| match (ex.method, ex.path) {
        (Method::Read, "/greet") => Reply::new("ok")
            .header("content-type", "text/plain")
            .body("hello"),
        (_, "/busy") => Reply::new("rate_limited")
            .status_details("slow down")
            .header("retry-after", "2"),
        _ => Reply::new("not_found").status_details("no such path"),
    });
    engine
}

#[test]
fn shorthand_address_reaches_handler() {
    let engine = greeter();
    let client = Client::new(Arc::new(engine.clone())).unwrap();

    let resp = client.get("web://node1/greet").unwrap();
    assert_eq!(resp.status, "ok");
    assert_eq!(resp.header("content-type"), Some("text/plain"));
    assert_eq!(resp.text(), "hello");

    let resp = client.get("web://node1/nope").unwrap();
    assert_eq!(resp.status_kind(), Some(Status::NotFound));
    assert_eq!(resp.status_details.as_deref(), Some("no such path"));
    let err = resp.status_error().unwrap();
    assert!(is_not_found(&err));
    assert_eq!(err.to_string(), "nwfetch: server returned not_found: no such path");

    assert_eq!(engine.dial_count(), 1);
}

#[test]
fn error_statuses_are_responses() {
    let client = Client::new(Arc::new(greeter())).unwrap();
    let resp = client.post("web://[node1]:6937/busy", "x").unwrap();
    assert!(resp.is_error());
    assert_eq!(resp.retry_after(), Some(std::time::Duration::from_secs(2)));
    assert!(is_rate_limited(&resp.error_for_status().unwrap_err()));
}

#[test]
fn unreachable_server_fails_at_connect() {
    let client = Client::new(Arc::new(greeter())).unwrap();
    let err = client.get("web://elsewhere/greet").unwrap_err();
    assert_eq!(err.stage, Stage::Connect);
    assert_eq!(err.url, "web://elsewhere/greet");
    assert!(err.to_string().starts_with("nwfetch: connect web://elsewhere/greet: "));
    assert!(client.pool().is_empty());
}

#[test]
fn malformed_address_fails_at_parse() {
    let engine = greeter();
    let client = Client::new(Arc::new(engine.clone())).unwrap();
    let err = client.get("web://node1:notaport/greet").unwrap_err();
    assert_eq!(err.stage, Stage::Parse);
    assert_eq!(engine.dial_count(), 0);
}

#[test]
fn broken_connection_is_evicted_and_redialed() {
    let engine = greeter();
    let client = Client::new(Arc::new(engine.clone())).unwrap();
    client.get("web://node1/greet").unwrap();

    engine.stop("node1", 6937);
    let err = client.get("web://node1/greet").unwrap_err();
    assert_eq!(err.stage, Stage::Fetch);
    assert!(client.pool().is_empty());

    engine.serve("node1", 6937, |_, _| Reply::new("ok").body("back"));
    assert_eq!(client.get("web://node1/greet").unwrap().text(), "back");
    assert_eq!(engine.dial_count(), 2);
}

#[test]
fn parallel_requests_share_one_dial() {
    let engine = MemoryEngine::new();
    engine.serve("node1", 6937, |_, _| Reply::new("ok"));
    engine.serve("node2", 7000, |_, _| Reply::new("ok"));
    let client = Client::new(Arc::new(engine.clone())).unwrap();

    std::thread::scope(|s| {
        for i in 0..32 {
            let client = &client;
            s.spawn(move || {
                let url = if i % 2 == 0 {
                    "web://node1/x"
                } else {
                    "web://[node2]:7000/y"
                };
                assert!(client.get(url).unwrap().is_ok());
            });
        }
    });

    assert_eq!(client.pool().len(), 2);
    assert_eq!(engine.open_connections(), 2);
}

#[test]
fn identity_reaches_the_server() {
    let engine = MemoryEngine::new();
    let seen = Arc::new(Mutex::new(None));
    let record = Arc::clone(&seen);
    engine.serve("node1", 6937, move |_, node_id| {
        *record.lock().unwrap() = Some(node_id.to_string());
        Reply::new("no_content")
    });

    let client = Client::builder(Arc::new(engine))
        .seed([42u8; 32])
        .build()
        .unwrap();
    client.get("web://node1/").unwrap();

    let expected = Keypair::from_seed(&[42u8; 32]).node_id();
    assert_eq!(seen.lock().unwrap().as_deref(), Some(expected.as_str()));
    assert_eq!(client.identity().node_id(), expected);
}

#[test]
fn lent_keypair_survives_close() {
    let engine = greeter();
    let keypair = Arc::new(Keypair::generate().unwrap());
    let node_id = keypair.node_id();

    let client = Client::builder(Arc::new(engine.clone()))
        .keypair(Arc::clone(&keypair))
        .build()
        .unwrap();
    client.get("web://node1/greet").unwrap();
    client.close();

    assert!(!keypair.is_cleared());
    assert_eq!(keypair.node_id(), node_id);
    assert_eq!(engine.open_connections(), 0);
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Item {
    name: String,
    qty: u32,
}

#[test]
fn json_round_trip() {
    let engine = MemoryEngine::new();
    engine.serve("node1", 6937, |ex, _| {
        assert_eq!(ex.method, Method::Write);
        let ct = ex
            .headers
            .iter()
            .find(|h| h.name == "content-type")
            .map(|h| h.value.as_str());
        assert_eq!(ct, Some("application/json"));
        Reply::new("created").body(ex.body.unwrap_or_default().to_vec())
    });
    let client = Client::new(Arc::new(engine)).unwrap();

    let item = Item {
        name: "bolt".into(),
        qty: 3,
    };
    let resp = Request::new("web://node1/items")
        .method(Method::Write)
        .json(&item)
        .unwrap()
        .send_with(&client)
        .unwrap();
    assert!(resp.is_success());
    assert_eq!(resp.json::<Item>().unwrap(), item);
}

#[test]
fn message_size_limit_fails_at_fetch() {
    let engine = greeter();
    let client = Client::builder(Arc::new(engine))
        .settings(Settings {
            max_message_size: Some(8),
            ..Settings::default()
        })
        .build()
        .unwrap();
    let err = client.post("web://node1/greet", vec![0u8; 64]).unwrap_err();
    assert_eq!(err.stage, Stage::Fetch);
}

fn fetch_greeting(client: &Client, path: &str) -> Result<String, Error> {
    let resp = client
        .get(&format!("web://node1{path}"))?
        .error_for_status()?;
    Ok(resp.text().into_owned())
}

#[test]
fn error_for_status_with_question_mark() {
    let client = Client::new(Arc::new(greeter())).unwrap();
    assert_eq!(fetch_greeting(&client, "/greet").unwrap(), "hello");

    let err = fetch_greeting(&client, "/missing").unwrap_err();
    assert!(matches!(err, Error::Status(_)));
    assert!(is_not_found(&err));
}
