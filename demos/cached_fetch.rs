//! Fetches three employee paths twice each through a caching client.
//!
//! A throwaway JSON server is started on a random local port so the demo is
//! self-contained. Run with:
//!
//! ```text
//! RUST_LOG=debug cargo run --example cached_fetch
//! ```

use pathcache::{CachingExecutor, Executor, HttpExecutor, Request};
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct ResponseBody {
    data: String,
}

async fn spawn_employee_api() -> std::io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let head = String::from_utf8_lossy(&buf[..n]);
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_owned();
                let body = format!(r#"{{"data":"employee record for {path}"}}"#);
                let reply = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
            });
        }
    });

    Ok(format!("http://{addr}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pathcache=debug".parse()?))
        .init();

    let base = spawn_employee_api().await?;
    let client = CachingExecutor::new(HttpExecutor::new());

    for path in [
        "/api/v1/employee/",
        "/api/v1/employee/",
        "/api/v1/employee/1",
        "/api/v1/employee/1",
        "/api/v1/employee/2",
        "/api/v1/employee/2",
    ] {
        let request = Request::get(format!("{base}{path}"))?;
        match client.execute(request).await {
            Ok(response) => {
                println!("status: {}", response.status());
                let body: ResponseBody = response.json()?;
                println!("data:   {}", body.data);
            }
            Err(e) => println!("request failed: {e}"),
        }
    }

    let stats = client.stats();
    println!(
        "{} hits, {} misses, {} entries",
        stats.hits,
        stats.misses,
        client.store().len()
    );
    Ok(())
}
