// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! The pipeline dispatcher.
//!
//! Propagates inbound messages up and outbound messages down an ordered chain
//! of processing stages. All dispatch happens on a single task: one message is
//! fully propagated before the next is taken, so sequence stamping and the
//! socket write cannot interleave between two sends.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{
    sync::{mpsc, watch},
    time::timeout,
};

use crate::{
    error::{SessionError, StageError},
    message::{Message, admin},
};

/// The unit travelling through the pipeline: raw frame bytes below the codec
/// stage, decoded messages above it.
#[derive(Clone, Debug)]
pub enum Payload {
    Raw(Bytes),
    Message(Message),
}

/// A processing stage in the pipeline.
///
/// Stages are invoked in order on a single dispatcher task; `on_receive` runs
/// low→high for inbound traffic and `on_send` high→low for outbound. A stage
/// may pass the payload through, transform it, or halt propagation via
/// [`StageError`].
#[async_trait]
pub trait Stage: Send {
    /// The stage identifier used in logs and timeout reports.
    fn name(&self) -> &'static str;

    /// One-time resource acquisition before the session starts.
    async fn initialize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Begins active operation (spawning any long-lived tasks).
    async fn start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stops active operation and releases resources.
    async fn stop(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Handles an inbound payload travelling towards the application.
    async fn on_receive(&mut self, payload: Payload) -> Result<Payload, StageError> {
        Ok(payload)
    }

    /// Handles an outbound payload travelling towards the transport.
    async fn on_send(&mut self, payload: Payload) -> Result<Payload, StageError> {
        Ok(payload)
    }
}

/// A unit of work submitted to the dispatcher.
#[derive(Debug)]
pub enum Command {
    /// An inbound payload to propagate up the chain.
    Receive(Payload),
    /// An outbound message to propagate down the chain.
    Send(Message),
    /// A graceful stop request.
    Stop,
    /// A fatal session error.
    Fatal(SessionError),
}

/// A cloneable handle for feeding the pipeline from stages, spawned tasks,
/// and the application.
#[derive(Clone, Debug)]
pub struct PipelineHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl PipelineHandle {
    /// Creates a handle together with the command receiver it feeds.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Submits an outbound message for processing down the stage chain.
    pub fn send(&self, message: Message) {
        let _ = self.tx.send(Command::Send(message));
    }

    /// Submits a raw inbound frame for processing up the stage chain.
    pub fn receive_raw(&self, frame: Bytes) {
        let _ = self.tx.send(Command::Receive(Payload::Raw(frame)));
    }

    /// Re-injects a decoded inbound message at the bottom of the chain.
    pub fn receive_message(&self, message: Message) {
        let _ = self.tx.send(Command::Receive(Payload::Message(message)));
    }

    /// Requests a graceful pipeline stop.
    pub fn stop(&self) {
        let _ = self.tx.send(Command::Stop);
    }

    /// Reports a fatal session error, tearing the pipeline down.
    pub fn fatal(&self, error: SessionError) {
        let _ = self.tx.send(Command::Fatal(error));
    }
}

/// Session lifecycle events shared between stages and the dispatcher.
#[derive(Debug)]
pub struct SessionEvents {
    pub(crate) logged_in: watch::Sender<bool>,
    pub(crate) logged_out: watch::Sender<bool>,
}

impl SessionEvents {
    /// Creates a new [`SessionEvents`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            logged_in: watch::Sender::new(false),
            logged_out: watch::Sender::new(false),
        }
    }

    /// Whether the logon handshake has completed.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        *self.logged_in.borrow()
    }

    /// Whether the session has been logged out.
    #[must_use]
    pub fn is_logged_out(&self) -> bool {
        *self.logged_out.borrow()
    }

    /// Marks the logon handshake as completed.
    pub fn set_logged_in(&self) {
        self.logged_in.send_replace(true);
    }

    /// Marks the session as logged out.
    pub fn set_logged_out(&self) {
        self.logged_out.send_replace(true);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-phase stage timeouts.
#[derive(Clone, Copy, Debug)]
pub struct PipelineTimeouts {
    pub init: Duration,
    pub start: Duration,
    pub stop: Duration,
}

impl Default for PipelineTimeouts {
    fn default() -> Self {
        Self {
            init: Duration::from_secs(crate::consts::DEFAULT_INIT_TIMEOUT_SECS),
            start: Duration::from_secs(crate::consts::DEFAULT_START_TIMEOUT_SECS),
            stop: Duration::from_secs(crate::consts::DEFAULT_STOP_TIMEOUT_SECS),
        }
    }
}

enum Flow {
    Continue,
    Stop,
    Fatal(SessionError),
}

/// Owns the ordered stage chain and runs the dispatch loop.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    rx: Option<mpsc::UnboundedReceiver<Command>>,
    handle: PipelineHandle,
    events: Arc<SessionEvents>,
    inbound_tx: mpsc::UnboundedSender<Message>,
    timeouts: PipelineTimeouts,
}

impl Pipeline {
    /// Assembles a pipeline from stages ordered bottom (transport) to top.
    ///
    /// Returns the pipeline together with the receiver delivering inbound
    /// messages that propagated all the way to the application boundary.
    #[must_use]
    pub fn new(
        stages: Vec<Box<dyn Stage>>,
        rx: mpsc::UnboundedReceiver<Command>,
        handle: PipelineHandle,
        events: Arc<SessionEvents>,
        timeouts: PipelineTimeouts,
    ) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let pipeline = Self {
            stages,
            rx: Some(rx),
            handle,
            events,
            inbound_tx,
            timeouts,
        };
        (pipeline, inbound_rx)
    }

    /// The handle for feeding this pipeline.
    #[must_use]
    pub fn handle(&self) -> PipelineHandle {
        self.handle.clone()
    }

    /// Runs the session to completion: initializes and starts every stage,
    /// dispatches messages until stopped, then performs an orderly shutdown.
    ///
    /// # Errors
    ///
    /// Returns the fatal [`SessionError`] that terminated the session, if any.
    pub async fn run(mut self) -> Result<(), SessionError> {
        let Some(mut rx) = self.rx.take() else {
            return Ok(());
        };

        tracing::info!("Initializing stages...");
        self.run_phase("initialize").await?;

        tracing::info!("Starting stages...");
        if let Err(e) = self.run_phase("start").await {
            self.stop_stages().await;
            return Err(e);
        }

        let fatal = self.dispatch_loop(&mut rx).await;
        self.shutdown(&mut rx).await;

        match fatal {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn run_phase(&mut self, phase: &'static str) -> Result<(), SessionError> {
        let limit = if phase == "initialize" {
            self.timeouts.init
        } else {
            self.timeouts.start
        };

        for stage in &mut self.stages {
            let name = stage.name();
            let result = if phase == "initialize" {
                timeout(limit, stage.initialize()).await
            } else {
                timeout(limit, stage.start()).await
            };
            match result {
                Err(_) => {
                    return Err(SessionError::StageTimeout { stage: name, phase });
                }
                Ok(Err(source)) => {
                    return Err(SessionError::StageFailed {
                        stage: name,
                        phase,
                        source,
                    });
                }
                Ok(Ok(())) => {}
            }
        }
        Ok(())
    }

    async fn dispatch_loop(
        &mut self,
        rx: &mut mpsc::UnboundedReceiver<Command>,
    ) -> Option<SessionError> {
        let mut logged_in_rx = self.events.logged_in.subscribe();
        let mut logged_out_rx = self.events.logged_out.subscribe();
        let startup_deadline = tokio::time::Instant::now() + self.timeouts.start;

        // Startup: pump messages while waiting for the logon handshake.
        while !*logged_in_rx.borrow() {
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(cmd) => match self.dispatch(cmd).await {
                        Flow::Continue => {}
                        Flow::Stop => return None,
                        Flow::Fatal(error) => return Some(error),
                    },
                    None => return None,
                },
                _ = logged_in_rx.changed() => {}
                _ = tokio::time::sleep_until(startup_deadline) => {
                    return Some(SessionError::LogonTimeout);
                }
            }
        }

        // Steady state: pump until a stop, fatal error, or logout. The
        // logout check runs after every dispatch so that a transport EOF
        // queued behind the counterparty's logout does not turn a clean
        // shutdown into a fatal one.
        loop {
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(cmd) => match self.dispatch(cmd).await {
                        Flow::Continue => {
                            if *logged_out_rx.borrow() {
                                tracing::info!("Session logged out");
                                return None;
                            }
                        }
                        Flow::Stop => return None,
                        Flow::Fatal(error) => return Some(error),
                    },
                    None => return None,
                },
                _ = logged_out_rx.changed() => {
                    if *logged_out_rx.borrow() {
                        tracing::info!("Session logged out");
                        return None;
                    }
                }
            }
        }
    }

    async fn dispatch(&mut self, cmd: Command) -> Flow {
        match cmd {
            Command::Receive(payload) => self.process_receive(payload).await,
            Command::Send(message) => self.process_send(Payload::Message(message)).await,
            Command::Stop => Flow::Stop,
            Command::Fatal(error) => Flow::Fatal(error),
        }
    }

    async fn process_receive(&mut self, mut payload: Payload) -> Flow {
        for i in 0..self.stages.len() {
            let name = self.stages[i].name();
            match self.stages[i].on_receive(payload).await {
                Ok(next) => payload = next,
                Err(StageError::Stop) => {
                    tracing::info!("Processing of message stopped at '{name}'");
                    return Flow::Continue;
                }
                Err(StageError::Processing(e)) => {
                    tracing::error!("Processing of message failed at '{name}': {e:#}");
                    return Flow::Continue;
                }
                Err(StageError::Fatal(error)) => {
                    tracing::error!("Fatal session error at '{name}': {error}");
                    return Flow::Fatal(error);
                }
            }
        }

        // The message propagated all the way to the top.
        if let Payload::Message(message) = payload {
            let _ = self.inbound_tx.send(message);
        }
        Flow::Continue
    }

    async fn process_send(&mut self, mut payload: Payload) -> Flow {
        for i in (0..self.stages.len()).rev() {
            let name = self.stages[i].name();
            match self.stages[i].on_send(payload).await {
                Ok(next) => payload = next,
                Err(StageError::Stop) => {
                    tracing::info!("Processing of message stopped at '{name}'");
                    return Flow::Continue;
                }
                Err(StageError::Processing(e)) => {
                    tracing::error!("Processing of message failed at '{name}': {e:#}");
                    return Flow::Continue;
                }
                Err(StageError::Fatal(error)) => {
                    tracing::error!("Fatal session error at '{name}': {error}");
                    return Flow::Fatal(error);
                }
            }
        }
        Flow::Continue
    }

    async fn shutdown(&mut self, rx: &mut mpsc::UnboundedReceiver<Command>) {
        if self.events.is_logged_in() {
            tracing::info!("Logging out...");
            let _ = self.process_send(Payload::Message(admin::logout(None))).await;
            if !self.events.is_logged_out() {
                self.await_logout_ack(rx).await;
            }
        }

        tracing::info!("Stopping stages...");
        self.stop_stages().await;
    }

    /// Pumps inbound traffic until the counterparty acknowledges the logout
    /// or the stop timeout expires.
    async fn await_logout_ack(&mut self, rx: &mut mpsc::UnboundedReceiver<Command>) {
        let mut logged_out_rx = self.events.logged_out.subscribe();
        if *logged_out_rx.borrow() {
            return;
        }
        let deadline = tokio::time::sleep(self.timeouts.stop);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                () = &mut deadline => {
                    tracing::warn!("Timed out waiting for logout acknowledgement");
                    return;
                }
                res = logged_out_rx.changed() => {
                    if res.is_err() || *logged_out_rx.borrow() {
                        tracing::info!("Logout completed");
                        return;
                    }
                }
                cmd = rx.recv() => match cmd {
                    Some(Command::Receive(payload)) => {
                        let _ = self.process_receive(payload).await;
                    }
                    Some(_) => {}
                    None => return,
                },
            }
        }
    }

    async fn stop_stages(&mut self) {
        for stage in self.stages.iter_mut().rev() {
            let name = stage.name();
            match timeout(self.timeouts.stop, stage.stop()).await {
                Err(_) => tracing::warn!("Stage '{name}' exceeded the stop timeout"),
                Ok(Err(e)) => tracing::warn!("Stage '{name}' failed during stop: {e:#}"),
                Ok(Ok(())) => {}
            }
        }
    }
}
