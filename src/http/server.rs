//! `may_minihttp` service wrapping `InventoryApi`.

use super::response::{reason, ApiResponse};
use super::router::InventoryApi;
use crate::config::ServerConfig;
use crate::metrics::record_response;
use crate::store::InventoryStore;
use may_minihttp::{HttpServer, HttpService, Request, Response};
use std::io::{self, Read};
use std::sync::Arc;

pub struct InventoryService<S> {
    api: Arc<InventoryApi<S>>,
    max_body_bytes: usize,
}

impl<S> Clone for InventoryService<S> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

impl<S: InventoryStore> InventoryService<S> {
    pub fn new(api: InventoryApi<S>, max_body_bytes: usize) -> Self {
        Self {
            api: Arc::new(api),
            max_body_bytes,
        }
    }
}

fn content_length(req: &Request) -> Option<usize> {
    req.headers()
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case("content-length"))
        .and_then(|h| std::str::from_utf8(h.value).ok())
        .and_then(|v| v.trim().parse().ok())
}

fn content_type_header(content_type: &'static str) -> &'static str {
    match content_type {
        super::response::PROMETHEUS_TEXT => {
            "Content-Type: text/plain; version=0.0.4; charset=utf-8"
        }
        _ => "Content-Type: application/json",
    }
}

impl<S: InventoryStore> HttpService for InventoryService<S> {
    fn call(&mut self, req: Request, rsp: &mut Response) -> io::Result<()> {
        let method = req.method().to_string();
        let target = req.path().to_string();
        #[cfg(feature = "tracing")]
        let _span = crate::metrics::tracing_helpers::http_request_span(&method, &target).entered();

        let limit = self.max_body_bytes;
        let response = if content_length(&req).is_some_and(|len| len > limit) {
            ApiResponse::payload_too_large(limit)
        } else {
            let mut body = Vec::new();
            req.body()
                .take(limit as u64 + 1)
                .read_to_end(&mut body)?;
            if body.len() > limit {
                ApiResponse::payload_too_large(limit)
            } else {
                self.api.handle(&method, &target, &body)
            }
        };

        log::debug!("{} {} -> {}", method, target, response.status);
        record_response(response.status);

        rsp.status_code(usize::from(response.status), reason(response.status));
        rsp.header(content_type_header(response.content_type));
        rsp.body_vec(response.body);
        Ok(())
    }
}

/// Bind `config.host_port` and serve the API on `may` coroutines.
pub fn serve<S: InventoryStore>(
    api: InventoryApi<S>,
    config: &ServerConfig,
) -> io::Result<may::coroutine::JoinHandle<()>> {
    let service = InventoryService::new(api, config.max_body_bytes);
    let handle = HttpServer(service).start(&config.host_port)?;
    log::info!("Stockguard API listening on {}", config.host_port);
    Ok(handle)
}
