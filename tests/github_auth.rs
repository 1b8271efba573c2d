use std::sync::{Arc, Mutex};

use prradar::{Config, Forge, GitHub, parse_args};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpListener,
};

/// A request as seen by the server: path and `Authorization` header.
type Seen = Arc<Mutex<Vec<(String, Option<String>)>>>;

fn body_for(path: &str) -> Option<&'static str> {
    match path {
        "/api/v3/repos/acme/widgets" => Some(r#"{"name":"widgets"}"#),
        "/api/v3/repos/acme/widgets/pulls/1/reviews" => Some("[]"),
        "/api/v3/users/bob" => Some(r#"{"login":"bob","name":"Bob"}"#),
        _ => None,
    }
}

/// Serves one JSON response per connection and records every request.
async fn serve() -> (String, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/api/v3", listener.local_addr().unwrap());
    let seen: Seen = Arc::default();

    let log = Arc::clone(&seen);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let (read, mut write) = socket.split();
                let mut reader = BufReader::new(read);

                let mut request_line = String::new();
                reader.read_line(&mut request_line).await.unwrap();
                let path = request_line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or_default()
                    .to_string();

                let mut authorization = None;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).await.unwrap() == 0 || line == "\r\n" {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        if name.trim().eq_ignore_ascii_case("authorization") {
                            authorization = Some(value.trim().to_string());
                        }
                    }
                }

                let (status, body) = match body_for(&path) {
                    Some(body) => ("200 OK", body),
                    None => ("404 Not Found", r#"{"message":"Not Found"}"#),
                };
                log.lock().unwrap().push((path, authorization));

                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                write.write_all(response.as_bytes()).await.unwrap();
                write.shutdown().await.unwrap();
            });
        }
    });

    (base, seen)
}

fn config(api_url: &str) -> Config {
    parse_args([
        "prradar",
        "--org",
        "acme",
        "--user",
        "alice",
        "--password",
        "s3cret",
        "--api-url",
        api_url,
    ])
    .unwrap()
}

// "alice:s3cret"
const BASIC_AUTH: &str = "Basic YWxpY2U6czNjcmV0";

#[tokio::test]
async fn test_payload_urls_are_fetched_with_credentials() {
    let (base, seen) = serve().await;
    let forge = GitHub::from_config(&config(&base)).unwrap();

    let repository = forge
        .repository(&format!("{base}/repos/acme/widgets"))
        .await
        .unwrap();
    let author = forge.user(&format!("{base}/users/bob")).await.unwrap();
    let reviews = forge
        .reviews(&format!("{base}/repos/acme/widgets/pulls/1"))
        .await
        .unwrap();

    assert_eq!(repository.name, "widgets");
    assert_eq!(author.login, "bob");
    assert!(reviews.is_empty());

    let seen = seen.lock().unwrap().clone();
    let paths: Vec<&str> = seen.iter().map(|(path, _)| path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "/api/v3/repos/acme/widgets",
            "/api/v3/users/bob",
            "/api/v3/repos/acme/widgets/pulls/1/reviews",
        ]
    );
    for (path, authorization) in &seen {
        assert_eq!(authorization.as_deref(), Some(BASIC_AUTH), "{path}");
    }
}

#[tokio::test]
async fn test_foreign_urls_are_not_fetched() {
    let (base, seen) = serve().await;
    let forge = GitHub::from_config(&config(&base)).unwrap();

    let result = forge
        .repository("https://api.github.com/repos/acme/widgets")
        .await;

    assert!(result.is_err());
    assert!(seen.lock().unwrap().is_empty());
}
