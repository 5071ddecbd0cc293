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

//! Heartbeat liveness monitoring.
//!
//! A single long-lived monitor task probes the counterparty with a
//! TestRequest once the line has been idle for a heartbeat interval, then
//! waits `2 * interval + 4` seconds for the echoed response. An unanswered
//! probe stops the pipeline. The stage also answers every inbound
//! TestRequest with an echoing Heartbeat.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use tokio::{task::JoinHandle, time::{Duration, Instant}};
use uuid::Uuid;

use crate::{
    dictionary::{MsgType, Tag},
    error::{SessionError, StageError},
    message::admin,
    pipeline::{Payload, PipelineHandle, Stage},
};

/// Liveness state shared between the stage and its monitor task.
#[derive(Debug)]
pub(crate) struct HeartbeatState {
    last_receive: Mutex<Instant>,
    pending_probe: Mutex<Option<String>>,
}

impl HeartbeatState {
    fn new() -> Self {
        Self {
            last_receive: Mutex::new(Instant::now()),
            pending_probe: Mutex::new(None),
        }
    }

    fn touch(&self) {
        *self.last_receive.lock().unwrap() = Instant::now();
    }

    fn idle(&self) -> Duration {
        self.last_receive.lock().unwrap().elapsed()
    }

    fn set_pending(&self, probe_id: String) {
        *self.pending_probe.lock().unwrap() = Some(probe_id);
    }

    fn is_waiting(&self) -> bool {
        self.pending_probe.lock().unwrap().is_some()
    }

    /// Clears the pending probe if `probe_id` matches it.
    fn resolve(&self, probe_id: &str) -> bool {
        let mut pending = self.pending_probe.lock().unwrap();
        if pending.as_deref() == Some(probe_id) {
            *pending = None;
            true
        } else {
            false
        }
    }
}

/// The heartbeat monitor stage.
pub struct HeartbeatStage {
    handle: PipelineHandle,
    state: Arc<HeartbeatState>,
    interval_secs: Arc<AtomicU64>,
    monitor_task: Option<JoinHandle<()>>,
}

impl HeartbeatStage {
    /// Creates a new [`HeartbeatStage`] instance.
    #[must_use]
    pub fn new(handle: PipelineHandle, interval_secs: u64) -> Self {
        Self {
            handle,
            state: Arc::new(HeartbeatState::new()),
            interval_secs: Arc::new(AtomicU64::new(interval_secs)),
            monitor_task: None,
        }
    }
}

#[async_trait]
impl Stage for HeartbeatStage {
    fn name(&self) -> &'static str {
        "heartbeat"
    }

    async fn start(&mut self) -> anyhow::Result<()> {
        let state = self.state.clone();
        let interval_secs = self.interval_secs.clone();
        let handle = self.handle.clone();

        self.state.touch();
        self.monitor_task = Some(tokio::spawn(async move {
            tracing::debug!("Started task 'heartbeat-monitor'");
            monitor_heartbeat(&state, &interval_secs, &handle).await;
            tracing::debug!("Stopped task 'heartbeat-monitor'");
        }));
        tracing::info!(
            "Started heartbeat monitor with {} second interval",
            self.interval_secs.load(Ordering::Relaxed),
        );
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        if let Some(task) = self.monitor_task.take() {
            task.abort();
            let _ = task.await;
        }
        Ok(())
    }

    async fn on_receive(&mut self, payload: Payload) -> Result<Payload, StageError> {
        let Payload::Message(message) = payload else {
            return Ok(payload);
        };

        self.state.touch();

        if message.is_type(MsgType::Logon) {
            // The acknowledged HeartBtInt is the negotiated interval.
            if let Some(field) = message.get(Tag::HeartBtInt.code())
                && let Ok(interval) = field.as_u64()
            {
                tracing::debug!("Heartbeat interval set to {interval}s");
                self.interval_secs.store(interval, Ordering::Relaxed);
            }
        } else if message.is_type(MsgType::TestRequest) {
            let probe_id = message.field(Tag::TestReqID.code())?.as_str()?.to_string();
            tracing::debug!("Answering test request '{probe_id}'");
            self.handle.send(admin::heartbeat(Some(&probe_id)));
        } else if message.is_type(MsgType::Heartbeat)
            && let Some(field) = message.get(Tag::TestReqID.code())
        {
            let probe_id = field.as_str()?;
            if !self.state.resolve(probe_id) {
                return Err(StageError::Processing(anyhow::anyhow!(
                    "received an unexpected heartbeat for test request '{probe_id}'"
                )));
            }
        }

        Ok(Payload::Message(message))
    }
}

/// The probe loop: idle detection, test-request issuance, and grace-window
/// failure detection.
async fn monitor_heartbeat(
    state: &HeartbeatState,
    interval_secs: &AtomicU64,
    handle: &PipelineHandle,
) {
    loop {
        let interval = Duration::from_secs(interval_secs.load(Ordering::Relaxed).max(1));
        let idle = state.idle();
        if idle < interval {
            tokio::time::sleep(interval - idle).await;
            continue;
        }

        let probe_id = Uuid::new_v4().simple().to_string();
        state.set_pending(probe_id.clone());
        tracing::warn!("Heartbeat exceeded, sending test request '{probe_id}'...");
        handle.send(admin::test_request(&probe_id));

        // The grace window for a probe response.
        tokio::time::sleep(2 * interval + Duration::from_secs(4)).await;

        if state.is_waiting() {
            break;
        }
    }

    tracing::error!("No response received for test request, initiating shutdown...");
    handle.fatal(SessionError::HeartbeatTimeout);
}
