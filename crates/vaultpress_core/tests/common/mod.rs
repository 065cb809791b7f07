//! A scripted local CMS for integration tests.

#![allow(dead_code)]

use std::io::Read;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tiny_http::{Response, Server};
use vaultpress_core::Credentials;
use vaultpress_core::api::HttpCmsApi;

/// A request as the server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub url: String,
    pub api_key: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

/// Server answering the given `(status, body)` pairs in order, one per
/// request, then shutting down.
pub struct MockCms {
    pub base_url: String,
    handle: JoinHandle<Vec<Recorded>>,
}

impl MockCms {
    pub fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let server = Server::http("127.0.0.1:0").expect("bind test server");
        let port = server
            .server_addr()
            .to_ip()
            .expect("test server listens on IP")
            .port();

        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let mut request = match server.recv_timeout(Duration::from_secs(10)) {
                    Ok(Some(request)) => request,
                    _ => break,
                };
                let header = |name: &'static str| {
                    request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv(name))
                        .map(|h| h.value.as_str().to_string())
                };
                let api_key = header("X-API-Key");
                let content_type = header("Content-Type");
                let mut request_body = String::new();
                request
                    .as_reader()
                    .read_to_string(&mut request_body)
                    .expect("read request body");
                seen.push(Recorded {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    api_key,
                    content_type,
                    body: request_body,
                });

                let response = Response::from_string(body).with_status_code(status);
                request.respond(response).expect("send response");
            }
            seen
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            handle,
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            base_url: self.base_url.clone(),
            api_key: "test-key".to_string(),
        }
    }

    pub fn client(&self) -> HttpCmsApi {
        HttpCmsApi::with_proxy(&self.credentials(), Duration::from_secs(5), None)
    }

    /// Wait for the scripted responses to be consumed and return what was
    /// received.
    pub fn finish(self) -> Vec<Recorded> {
        self.handle.join().expect("server thread")
    }
}
