//! Single-writer front end for the [`Coordinator`]
//!
//! Requests, commands and navigation signals are queued and handled one at a
//! time by a local task, so no two transitions ever interleave.

use crate::coordinator::Coordinator;
use async_trait::async_trait;
use pagelock_core::{CoordinatorLink, LinkError, Request, Response, Sender, TabInfo, TabStatus};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

enum Envelope {
    Request {
        request: Request,
        sender: Sender,
        reply: oneshot::Sender<Response>,
    },
    Command {
        name: String,
        done: oneshot::Sender<()>,
    },
    TabUpdated {
        tab: TabInfo,
        status: Option<TabStatus>,
        done: oneshot::Sender<()>,
    },
    Installed {
        done: oneshot::Sender<()>,
    },
}

/// Cloneable handle to a running coordinator
#[derive(Clone)]
pub struct CoordinatorHandle {
    queue: mpsc::UnboundedSender<Envelope>,
}

impl CoordinatorHandle {
    /// Start the coordinator task.
    ///
    /// Uses `spawn_local`, so this must be called from within a
    /// `tokio::task::LocalSet`. The task ends once every handle is dropped.
    pub fn spawn(coordinator: Coordinator) -> Self {
        let (queue, inbox) = mpsc::unbounded_channel();
        tokio::task::spawn_local(run(coordinator, inbox));
        Self { queue }
    }

    /// Send a request and wait for its response.
    ///
    /// A request whose handling fails is dropped without a response, which
    /// the caller sees as [`LinkError::Closed`].
    pub async fn request(&self, request: Request, sender: Sender) -> Result<Response, LinkError> {
        let (reply, response) = oneshot::channel();
        self.queue
            .send(Envelope::Request {
                request,
                sender,
                reply,
            })
            .map_err(|_| LinkError::NoReceiver)?;
        response.await.map_err(|_| LinkError::Closed)
    }

    /// Handle an untyped message. Returns `Ok(None)` when the message is not
    /// part of the protocol.
    pub async fn handle_raw(
        &self,
        message: &Value,
        sender: Sender,
    ) -> Result<Option<Value>, LinkError> {
        let Some(request) = Request::parse(message) else {
            debug!("Unhandled message");
            return Ok(None);
        };
        let response = self.request(request, sender).await?;
        Ok(Some(response.to_value()))
    }

    /// Deliver a named command and wait until it has been processed.
    pub async fn command(&self, name: &str) -> Result<(), LinkError> {
        self.submit(|done| Envelope::Command {
            name: name.to_string(),
            done,
        })
        .await
    }

    /// Report a tab update and wait until it has been processed.
    pub async fn tab_updated(
        &self,
        tab: TabInfo,
        status: Option<TabStatus>,
    ) -> Result<(), LinkError> {
        self.submit(|done| Envelope::TabUpdated { tab, status, done }).await
    }

    /// Run the install hook and wait until it has been processed.
    pub async fn installed(&self) -> Result<(), LinkError> {
        self.submit(|done| Envelope::Installed { done }).await
    }

    /// A [`CoordinatorLink`] that sends on behalf of `sender`.
    pub fn link(&self, sender: Sender) -> ActorLink {
        ActorLink {
            handle: self.clone(),
            sender,
        }
    }

    async fn submit<F>(&self, envelope: F) -> Result<(), LinkError>
    where
        F: FnOnce(oneshot::Sender<()>) -> Envelope,
    {
        let (done, finished) = oneshot::channel();
        self.queue
            .send(envelope(done))
            .map_err(|_| LinkError::NoReceiver)?;
        finished.await.map_err(|_| LinkError::Closed)
    }
}

async fn run(coordinator: Coordinator, mut inbox: mpsc::UnboundedReceiver<Envelope>) {
    debug!("Coordinator started");
    while let Some(envelope) = inbox.recv().await {
        match envelope {
            Envelope::Request {
                request,
                sender,
                reply,
            } => match coordinator.handle(request, &sender).await {
                Ok(response) => {
                    let _ = reply.send(response);
                }
                Err(e) => error!(error = %e, "Request failed"),
            },
            Envelope::Command { name, done } => {
                if let Err(e) = coordinator.on_command(&name).await {
                    error!(command = %name, error = %e, "Command failed");
                }
                let _ = done.send(());
            }
            Envelope::TabUpdated { tab, status, done } => {
                if let Err(e) = coordinator.on_tab_updated(&tab, status).await {
                    error!(tab = %tab.id, error = %e, "Navigation hook failed");
                }
                let _ = done.send(());
            }
            Envelope::Installed { done } => {
                if let Err(e) = coordinator.on_installed().await {
                    error!(error = %e, "Install hook failed");
                }
                let _ = done.send(());
            }
        }
    }
    debug!("Coordinator stopped");
}

/// Client link bound to one sender
#[derive(Clone)]
pub struct ActorLink {
    handle: CoordinatorHandle,
    sender: Sender,
}

#[async_trait(?Send)]
impl CoordinatorLink for ActorLink {
    async fn request(&self, request: Request) -> Result<Response, LinkError> {
        self.handle.request(request, self.sender.clone()).await
    }
}
