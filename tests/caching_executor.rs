use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pathcache::executor::{CachingError, CachingExecutor, Executor, executor_fn};
use pathcache::http::{Method, Request, Response, StatusCode};

#[derive(Debug, thiserror::Error)]
#[error("connection reset")]
struct Reset;

fn upstream(calls: Arc<AtomicUsize>) -> impl Executor<Error = Reset> {
    executor_fn(move |request: Request| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, Reset>(
                Response::new(StatusCode::OK)
                    .header("Content-Type", "text/plain")
                    .with_body(format!("payload for {}", request.path())),
            )
        }
    })
}

fn get(path: &str) -> Request {
    Request::get(format!("http://example.com{path}")).unwrap()
}

#[tokio::test]
async fn hit_miss_scenario() {
    let calls = Arc::new(AtomicUsize::new(0));
    let client = CachingExecutor::new(upstream(Arc::clone(&calls)));

    let a1 = client.execute(get("/a")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.store().len(), 1);

    let a2 = client.execute(get("/a")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.store().len(), 1);
    assert_eq!(a1, a2);

    let b = client.execute(get("/b")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(client.store().len(), 2);
    assert_eq!(b.text().unwrap(), "payload for /b");
}

#[tokio::test]
async fn cached_response_matches_fresh_one() {
    let calls = Arc::new(AtomicUsize::new(0));
    let client = CachingExecutor::new(upstream(Arc::clone(&calls)));

    let fresh = client.execute(get("/report")).await.unwrap();
    let cached = client.execute(get("/report")).await.unwrap();

    assert_eq!(cached.status(), fresh.status());
    assert_eq!(cached.headers(), fresh.headers());
    assert_eq!(cached.body(), fresh.body());
    assert_eq!(fresh.text().unwrap(), "payload for /report");
}

#[tokio::test]
async fn failure_leaves_store_untouched() {
    let client = CachingExecutor::new(executor_fn(|_request: Request| async {
        Err::<Response, _>(Reset)
    }));

    let err = client.execute(get("/a")).await.unwrap_err();

    assert!(matches!(err, CachingError::Upstream(Reset)));
    assert_eq!(err.to_string(), "connection reset");
    assert!(client.store().is_empty());
    assert!(!client.store().contains("/a"));
}

#[tokio::test]
async fn post_after_get_reuses_entry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let client = CachingExecutor::new(upstream(Arc::clone(&calls)));

    client.execute(get("/orders")).await.unwrap();
    let request = Request::parse(Method::Post, "http://example.com/orders")
        .unwrap()
        .body("{\"item\":1}");
    let response = client.execute(request).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(response.text().unwrap(), "payload for /orders");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_entry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let client = Arc::new(CachingExecutor::new(upstream(Arc::clone(&calls))));

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.execute(get("/hot")).await })
        })
        .collect();

    for task in tasks {
        let response = task.await.unwrap().unwrap();
        assert_eq!(response.text().unwrap(), "payload for /hot");
    }

    let fetched = calls.load(Ordering::SeqCst);
    assert!((1..=32).contains(&fetched));
    assert_eq!(client.store().len(), 1);

    let stats = client.stats();
    assert_eq!(stats.hits + stats.misses, 32);
    assert_eq!(stats.misses as usize, fetched);

    client.execute(get("/hot")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), fetched);
}

#[tokio::test]
async fn shared_inner_executor_through_arc() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inner = Arc::new(upstream(Arc::clone(&calls)));
    let cached = CachingExecutor::new(Arc::clone(&inner));

    cached.execute(get("/x")).await.unwrap();
    cached.execute(get("/x")).await.unwrap();
    inner.execute(get("/x")).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
