// Copyright 2023 The Skene Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tracing::{error, info};

/// Serves the liveness and readiness probes of a long-running process.
///
/// Liveness answers `200 OK` for as long as the serve loop is up. Readiness
/// starts out negative and follows whatever [`Server::set_ready`] last stored.
pub struct Server {
    listen_address: SocketAddr,
    ready: Arc<AtomicBool>,
}

impl Server {
    /// Creates a server that reports not ready until told otherwise.
    pub fn new(listen_address: SocketAddr) -> Self {
        Self { listen_address, ready: Arc::new(AtomicBool::new(false)) }
    }

    /// Flips the readiness probe. Safe to call from any task, any number of
    /// times, in either direction.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// The probe routes as a plain router, for serving or for tests.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthz/live", get(live))
            .route("/healthz/ready", get(ready))
            .with_state(self.ready.clone())
    }

    /// Binds and serves the probes on a background task and returns
    /// immediately. Bind and serve failures are logged, never returned: the
    /// process keeps running, just without a probe endpoint.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let address = self.listen_address;
        let router = self.router();

        info!("Starting healthz server on {}", address);
        tokio::spawn(async move {
            let serve = async {
                axum::Server::try_bind(&address)?.serve(router.into_make_service()).await
            };
            if let Err(err) = serve.await {
                error!("Healthz server failed: {}", err);
            }
        });
    }
}

async fn live() -> StatusCode {
    StatusCode::OK
}

// Last writer wins; liveness never depends on this flag.
async fn ready(State(ready): State<Arc<AtomicBool>>) -> StatusCode {
    if ready.load(Ordering::SeqCst) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
