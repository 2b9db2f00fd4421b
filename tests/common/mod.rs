//! Test utilities and relay harness for sqlrelay tests.
//!
//! Provides:
//! - In-process router with an isolated engine runtime
//! - In-memory duplex transport driving the stdio server loop
//! - Request builders

#![allow(dead_code)]

use serde_json::{json, Value};
use sqlrelay::config::Config;
use sqlrelay::engine::SharedRuntime;
use sqlrelay::protocol::{Action, Params, Request, Response};
use sqlrelay::router::{Router, RouterHandle};
use sqlrelay::server::{serve, ServeStats};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Router with its own engine runtime, shut down on [`TestRouter::shutdown`].
pub struct TestRouter {
    pub router: Router,
}

impl TestRouter {
    pub fn start() -> Self {
        sqlrelay::observability::tracing::init_test_tracing();
        let config = Config::test_config();
        let router = Router::spawn_with_runtime(SharedRuntime::new(), config.channel_size)
            .expect("failed to spawn router");
        Self { router }
    }

    pub fn handle(&self) -> RouterHandle {
        self.router.handle()
    }

    pub async fn shutdown(self) {
        self.router
            .handle()
            .shutdown()
            .await
            .expect("router already stopped");
        tokio::task::spawn_blocking(move || self.router.join())
            .await
            .expect("join task failed")
            .expect("router thread panicked");
    }
}

/// Stdio server running over an in-memory duplex pipe.
pub struct TestRelay {
    input: DuplexStream,
    output: Lines<BufReader<DuplexStream>>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<ServeStats>,
}

impl TestRelay {
    pub fn start() -> Self {
        let config = Config::test_config();
        let router = TestRouter::start();
        let (input, server_in) = tokio::io::duplex(64 * 1024);
        let (server_out, output) = tokio::io::duplex(64 * 1024);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let stats = serve(server_in, server_out, router.handle(), config.max_line_bytes, shutdown_rx)
                .await
                .expect("serve failed");
            router.shutdown().await;
            stats
        });

        Self {
            input,
            output: BufReader::new(output).lines(),
            shutdown_tx,
            task,
        }
    }

    /// Write one raw line to the relay.
    pub async fn send_line(&mut self, line: &str) {
        self.input
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("failed to write request");
    }

    /// Write one request to the relay.
    pub async fn send(&mut self, request: &Request) {
        let line = serde_json::to_string(request).expect("failed to encode request");
        self.send_line(&line).await;
    }

    /// Read the next response line as raw JSON.
    pub async fn recv_value(&mut self) -> Value {
        let line = self
            .output
            .next_line()
            .await
            .expect("failed to read response")
            .expect("relay closed output");
        serde_json::from_str(&line).expect("response is not JSON")
    }

    /// Read the next response.
    pub async fn recv(&mut self) -> Response {
        serde_json::from_value(self.recv_value().await).expect("malformed response")
    }

    /// Send a request and wait for its response.
    pub async fn call(&mut self, request: &Request) -> Response {
        self.send(request).await;
        self.recv().await
    }

    /// Close the input and wait for the server loop to finish.
    pub async fn finish(self) -> ServeStats {
        drop(self.input);
        self.task.await.expect("serve task panicked")
    }

    /// Signal shutdown without closing the input.
    pub async fn shutdown(self) -> ServeStats {
        self.shutdown_tx.send(true).expect("serve loop already gone");
        self.task.await.expect("serve task panicked")
    }
}

pub fn open(id: impl Into<Value>) -> Request {
    Request::new(id, Action::Open)
}

pub fn close(id: impl Into<Value>) -> Request {
    Request::new(id, Action::Close)
}

pub fn execute(id: impl Into<Value>, sql: &str, params: Vec<Value>) -> Request {
    Request::statement(id, Action::Execute, sql, Some(Params::Positional(params)))
}

pub fn query(id: impl Into<Value>, sql: &str, params: Vec<Value>) -> Request {
    Request::statement(id, Action::Query, sql, Some(Params::Positional(params)))
}

pub fn raw(id: impl Into<Value>, action: &str) -> Request {
    Request {
        id: id.into(),
        action: action.to_string(),
        args: Some(json!({})),
    }
}
