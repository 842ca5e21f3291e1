//! Integration tests for the A3S scheduler
//!
//! These tests build engines from HCL settings, schedule against an
//! in-memory datastore and talk to a fake KV-cache index over real TCP.

use a3s_scheduler::config::SchedulerSettings;
use a3s_scheduler::scheduling::scorer::SessionAffinity;
use a3s_scheduler::{
    build_engine, InMemoryDatastore, InferencePool, LlmRequest, Metrics, NamespacedName, Pod,
    PodMetrics, PodRole, SchedulerError, SchedulingEngine, DESTINATION_ENDPOINT_HEADER,
    PREFILL_URL_HEADER, SESSION_HEADER,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Find a free port on localhost
async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Read one HTTP/1.1 request and return its body
async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                return String::from_utf8_lossy(&buf[header_end + 4..]).to_string();
            }
        }
    }
    String::new()
}

/// Spawn a fake KV-cache index answering every request with `scores`.
/// Request bodies are forwarded on the returned channel.
async fn spawn_index(scores: &[(&str, f64)]) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    let entries: Vec<serde_json::Value> = scores
        .iter()
        .map(|(name, score)| serde_json::json!({ "name": name, "score": score }))
        .collect();
    let body = serde_json::json!({ "scores": entries }).to_string();

    tokio::spawn(async move {
        loop {
            let (mut stream, _) = match listener.accept().await {
                Ok(s) => s,
                Err(_) => break,
            };
            let body = body.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let request = read_request(&mut stream).await;
                let _ = tx.send(request);
                let resp = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    (addr, rx)
}

fn pod(name: &str, address: &str, role: PodRole, queue: usize) -> PodMetrics {
    PodMetrics::new(
        Pod::new(NamespacedName::new("default", name), address, role),
        Metrics {
            waiting_queue_size: queue,
            ..Default::default()
        },
    )
}

fn datastore(pods: Vec<PodMetrics>) -> Arc<InMemoryDatastore> {
    let ds = Arc::new(InMemoryDatastore::new());
    ds.pool_set(InferencePool::new("vllm-pool", 8000));
    for pm in pods {
        ds.pod_set(pm);
    }
    ds
}

fn target_name(result: &a3s_scheduler::SchedulingResult) -> String {
    result
        .target_pod
        .as_ref()
        .map(|pm| pm.pod.namespaced_name.name.clone())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Single-phase scheduling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_session_affinity_round_trip() {
    let settings = SchedulerSettings::from_hcl(
        r#"
        default {
            filter = "none"
            scorers {
                session_affinity {
                    enabled = true
                    weight  = 2
                }
                load_aware {
                    enabled = true
                }
            }
        }
        "#,
    )
    .unwrap();

    let ds = datastore(vec![
        pod("idle", "10.0.0.1", PodRole::Both, 0),
        pod("busy", "10.0.0.2", PodRole::Both, 100),
    ]);
    let engine = build_engine(&settings, ds, None).unwrap();

    // No session yet: load decides
    let first = engine
        .schedule(CancellationToken::new(), LlmRequest::new("llama", "hi"))
        .await
        .unwrap();
    assert_eq!(target_name(&first), "idle");
    assert_eq!(
        first.outbound_headers()[DESTINATION_ENDPOINT_HEADER],
        "10.0.0.1:8000"
    );

    // The response came from "busy"; bind the session there
    let bound = engine
        .run_post_response_plugins(
            CancellationToken::new(),
            LlmRequest::new("llama", "hi"),
            "default/busy",
        )
        .await
        .unwrap();
    let token = bound.mutated_headers[SESSION_HEADER].clone();
    assert_eq!(SessionAffinity::decode(&token).as_deref(), Some("default/busy"));

    // Affinity (weight 2) outweighs the load difference (at most 0.5)
    for _ in 0..10 {
        let request = LlmRequest::new("llama", "again").with_header("session-id", token.clone());
        let result = engine.schedule(CancellationToken::new(), request).await.unwrap();
        assert_eq!(target_name(&result), "busy");
    }
}

#[tokio::test]
async fn test_no_pool_rejected() {
    let ds = Arc::new(InMemoryDatastore::new());
    ds.pod_set(pod("a", "10.0.0.1", PodRole::Both, 0));
    let engine = build_engine(&SchedulerSettings::default(), ds, None).unwrap();

    let result = engine
        .schedule(CancellationToken::new(), LlmRequest::new("llama", "hi"))
        .await;
    assert!(matches!(result, Err(SchedulerError::PoolUnavailable(_))));
}

#[tokio::test]
async fn test_concurrent_scheduling_with_datastore_churn() {
    let settings = SchedulerSettings::from_hcl(
        r#"
        default {
            scorers {
                load_aware {
                    enabled = true
                }
            }
        }
        "#,
    )
    .unwrap();
    let ds = datastore(
        (0..8)
            .map(|i| pod(&format!("pod-{}", i), &format!("10.0.0.{}", i + 1), PodRole::Both, i))
            .collect(),
    );
    let engine = build_engine(&settings, ds.clone(), None).unwrap();

    let churn = {
        let ds = ds.clone();
        tokio::spawn(async move {
            for round in 0..200usize {
                let name = NamespacedName::new("default", format!("pod-{}", round % 8));
                ds.pod_update_metrics(
                    &name,
                    Metrics {
                        waiting_queue_size: round % 17,
                        ..Default::default()
                    },
                );
                tokio::task::yield_now().await;
            }
        })
    };

    let mut handles = Vec::new();
    for i in 0..64 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .schedule(
                    CancellationToken::new(),
                    LlmRequest::new("llama", format!("request {}", i)),
                )
                .await
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert!(result.target_pod.is_some());
    }
    churn.await.unwrap();
}

// ---------------------------------------------------------------------------
// Prefill/decode scheduling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_pd_split_from_labels() {
    let settings = SchedulerSettings::from_hcl(
        r#"
        pd {
            enabled                 = true
            prompt_length_threshold = 32
        }
        decode {
            scorers {
                load_aware {
                    enabled = true
                }
            }
        }
        "#,
    )
    .unwrap();

    let ds = Arc::new(InMemoryDatastore::new());
    ds.pool_set(InferencePool::new("vllm-pool", 8200));
    let label = |role: &str| {
        HashMap::from([("llmd.org/role".to_string(), role.to_string())])
    };
    ds.pod_update_or_add(Pod::from_labels(
        NamespacedName::new("default", "prefill-0"),
        "10.1.0.1",
        &label("prefill"),
    ));
    ds.pod_update_or_add(Pod::from_labels(
        NamespacedName::new("default", "decode-0"),
        "10.2.0.1",
        &label("decode"),
    ));

    let engine = build_engine(&settings, ds, None).unwrap();

    let long = LlmRequest::new("llama", "x".repeat(64));
    let result = engine.schedule(CancellationToken::new(), long).await.unwrap();
    assert_eq!(result.mutated_headers[PREFILL_URL_HEADER], "http://10.1.0.1:8200");
    assert_eq!(target_name(&result), "decode-0");

    let headers = result.outbound_headers();
    assert_eq!(headers[DESTINATION_ENDPOINT_HEADER], "10.2.0.1:8200");
    assert_eq!(headers[PREFILL_URL_HEADER], "http://10.1.0.1:8200");

    let short = LlmRequest::new("llama", "short");
    let result = engine.schedule(CancellationToken::new(), short).await.unwrap();
    assert!(!result.mutated_headers.contains_key(PREFILL_URL_HEADER));
    assert_eq!(target_name(&result), "decode-0");
}

#[tokio::test]
async fn test_pd_cancelled_call_returns_error() {
    let mut settings = SchedulerSettings::default();
    settings.pd.enabled = true;
    let ds = datastore(vec![
        pod("prefill-0", "10.1.0.1", PodRole::Prefill, 0),
        pod("decode-0", "10.2.0.1", PodRole::Decode, 0),
    ]);
    let engine = build_engine(&settings, ds, None).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = engine
        .schedule(cancel, LlmRequest::new("llama", "x".repeat(500)))
        .await;
    assert!(matches!(result, Err(SchedulerError::Cancelled)));
}

// ---------------------------------------------------------------------------
// KV-cache index
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_kvcache_scores_from_http_index() {
    let (index_addr, mut requests) = spawn_index(&[("10.0.0.2", 10.0), ("10.9.9.9", 99.0)]).await;
    let settings = SchedulerSettings::from_hcl(&format!(
        r#"
        kvcache_indexer {{
            url = "http://{}"
        }}
        default {{
            filter = "none"
            scorers {{
                kvcache_aware {{
                    enabled = true
                }}
            }}
        }}
        "#,
        index_addr
    ))
    .unwrap();

    let ds = datastore(vec![
        pod("a", "10.0.0.1", PodRole::Both, 0),
        pod("b", "10.0.0.2", PodRole::Both, 0),
    ]);
    let engine = build_engine(&settings, ds, None).unwrap();

    let result = engine
        .schedule(
            CancellationToken::new(),
            LlmRequest::new("llama", "what is the capital of France?"),
        )
        .await
        .unwrap();
    assert_eq!(target_name(&result), "b");

    let body: serde_json::Value = serde_json::from_str(&requests.recv().await.unwrap()).unwrap();
    assert_eq!(body["model"], "llama");
    assert_eq!(body["prompt"], "what is the capital of France?");
    let ids: Vec<&str> = body["pod_identifiers"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(ids, vec!["10.0.0.1", "10.0.0.2"]);
}

#[tokio::test]
async fn test_unreachable_index_does_not_fail_scheduling() {
    let port = free_port().await;
    let settings = SchedulerSettings::from_hcl(&format!(
        r#"
        kvcache_indexer {{
            url          = "http://127.0.0.1:{}"
            timeout_secs = 1
        }}
        default {{
            filter = "none"
            scorers {{
                kvcache_aware {{
                    enabled = true
                    weight  = 5
                }}
                load_aware {{
                    enabled = true
                }}
            }}
        }}
        "#,
        port
    ))
    .unwrap();

    let ds = datastore(vec![
        pod("busy", "10.0.0.1", PodRole::Both, 90),
        pod("idle", "10.0.0.2", PodRole::Both, 0),
    ]);
    let engine = build_engine(&settings, ds, None).unwrap();

    let result = engine
        .schedule(CancellationToken::new(), LlmRequest::new("llama", "hi"))
        .await
        .unwrap();
    assert_eq!(target_name(&result), "idle");
}

#[tokio::test]
async fn test_invalid_settings_rejected() {
    let settings = SchedulerSettings::from_hcl(
        r#"
        default {
            scorers {
                kvcache_aware {
                    enabled = true
                }
            }
        }
        "#,
    )
    .unwrap();
    let result = build_engine(&settings, datastore(vec![]), None);
    let err = match result {
        Ok(_) => panic!("settings without kvcache_indexer must be rejected"),
        Err(e) => e,
    };
    assert!(matches!(err, SchedulerError::Config(_)));
}
