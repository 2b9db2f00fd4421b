//! Router thread and its async handle.
//!
//! The session lives on a dedicated OS thread. Requests reach it through a
//! bounded channel and are processed one at a time in arrival order; each
//! carries a oneshot sender for its response.
//!
//! Engine initialization for `open` is awaited on the caller's task before
//! the request is queued, so the router thread itself never blocks on it.

use std::sync::Arc;
use std::thread::JoinHandle;

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};

use crate::engine::{EngineRuntime, Session, SharedRuntime};
use crate::error::RouterError;
use crate::protocol::{Action, Request, Response};

/// Commands accepted by the router thread.
enum Command {
    Dispatch {
        request: Request,
        runtime: Option<Arc<EngineRuntime>>,
        reply: oneshot::Sender<Response>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Owner of the router thread.
pub struct Router {
    thread: JoinHandle<()>,
    handle: RouterHandle,
}

impl Router {
    /// Spawn a router backed by the process-wide engine runtime.
    ///
    /// # Arguments
    ///
    /// * `channel_size` - Number of requests that may queue before senders wait
    pub fn spawn(channel_size: usize) -> Result<Self, RouterError> {
        Self::spawn_with_runtime(SharedRuntime::global(), channel_size)
    }

    /// Spawn a router using the given runtime cell.
    pub fn spawn_with_runtime(
        runtime: SharedRuntime,
        channel_size: usize,
    ) -> Result<Self, RouterError> {
        let (tx, rx) = mpsc::channel(channel_size.max(1));

        let thread = std::thread::Builder::new()
            .name("sqlrelay-router".into())
            .spawn(move || run(rx))
            .map_err(RouterError::Spawn)?;

        tracing::debug!(channel_size, "Router thread started");

        Ok(Self {
            thread,
            handle: RouterHandle { tx, runtime },
        })
    }

    /// A cloneable handle for submitting requests.
    pub fn handle(&self) -> RouterHandle {
        self.handle.clone()
    }

    /// Wait for the router thread to exit.
    ///
    /// The thread exits after [`RouterHandle::shutdown`] or once every
    /// handle has been dropped.
    pub fn join(self) -> Result<(), RouterError> {
        let Self { thread, handle } = self;
        drop(handle);
        thread.join().map_err(|_| RouterError::ThreadPanic)
    }
}

/// Handle for submitting requests to the router thread.
#[derive(Clone)]
pub struct RouterHandle {
    tx: mpsc::Sender<Command>,
    runtime: SharedRuntime,
}

impl RouterHandle {
    /// Dispatch a request and wait for its response.
    ///
    /// Never fails: every error becomes an error response carrying the
    /// request's id.
    #[tracing::instrument(skip(self, request), fields(id = %request.id, action = %request.action))]
    pub async fn dispatch(&self, request: Request) -> Response {
        let id = request.id.clone();
        match self.submit(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(error = %err, "Request not processed");
                Response::failure(id, &err)
            }
        }
    }

    async fn submit(&self, request: Request) -> Result<Response, RouterError> {
        let runtime = match request.action() {
            Ok(Action::Open) => Some(self.runtime.get().await?),
            _ => None,
        };

        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Dispatch {
                request,
                runtime,
                reply,
            })
            .await
            .map_err(|_| RouterError::Unavailable)?;

        rx.await.map_err(|_| RouterError::Unavailable)
    }

    /// Ask the router thread to close the session and exit.
    ///
    /// Requests queued behind the shutdown are answered with an
    /// unavailable error.
    pub async fn shutdown(&self) -> Result<(), RouterError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Shutdown { reply })
            .await
            .map_err(|_| RouterError::Unavailable)?;
        rx.await.map_err(|_| RouterError::Unavailable)
    }

    /// The engine runtime cell used for `open`.
    pub fn runtime(&self) -> &SharedRuntime {
        &self.runtime
    }
}

/// Router thread main loop.
fn run(mut rx: mpsc::Receiver<Command>) {
    let mut session = Session::new();

    while let Some(command) = rx.blocking_recv() {
        match command {
            Command::Dispatch {
                request,
                runtime,
                reply,
            } => {
                let response = handle_request(&mut session, &request, runtime.as_deref());
                // The caller may have stopped waiting
                let _ = reply.send(response);
            }
            Command::Shutdown { reply } => {
                close_session(&mut session);
                let _ = reply.send(());
                break;
            }
        }
    }

    close_session(&mut session);
    tracing::debug!("Router thread stopped");
}

fn close_session(session: &mut Session) {
    if let Err(err) = session.close() {
        tracing::warn!(error = %err, "Failed to close database on shutdown");
    }
}

fn handle_request(
    session: &mut Session,
    request: &Request,
    runtime: Option<&EngineRuntime>,
) -> Response {
    let id = request.id.clone();
    match execute_request(session, request, runtime) {
        Ok(result) => Response::success(id, result),
        Err(err) => {
            tracing::debug!(id = %request.id, error = %err, "Request failed");
            Response::failure(id, &err)
        }
    }
}

fn execute_request(
    session: &mut Session,
    request: &Request,
    runtime: Option<&EngineRuntime>,
) -> Result<Value, RouterError> {
    match request.action()? {
        Action::Open => {
            let runtime = runtime
                .ok_or_else(|| RouterError::EngineInit("engine runtime not loaded".into()))?;
            session.open(runtime)?;
            Ok(Value::Bool(true))
        }
        Action::Execute => {
            if !session.is_open() {
                return Err(RouterError::NotOpened);
            }
            let args = request.statement_args()?;
            let changes = session.execute(&args.sql, args.params.as_ref())?;
            Ok(json!({ "changes": changes }))
        }
        Action::Query => {
            if !session.is_open() {
                return Err(RouterError::NotOpened);
            }
            let args = request.statement_args()?;
            let rows = session.query(&args.sql, args.params.as_ref())?;
            Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
        }
        Action::Close => {
            session.close()?;
            Ok(Value::Bool(true))
        }
    }
}
