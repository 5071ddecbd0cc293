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

//! The message store: a keyed archive of sent and received messages used for
//! resend requests and replay.
//!
//! Entries are keyed `(session_id, originator, seq_num)`. The store
//! participates in the pipeline: inbound messages are archived under the
//! target comp id, outbound under the sender comp id.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::{StageError, StoreError},
    message::Message,
    pipeline::{Payload, Stage},
    session::SessionId,
};

pub use memory::MemoryStore;

/// Renders the store key for `(session_id, originator, seq_num)`.
#[must_use]
pub fn store_key(session_id: &str, originator: &str, seq_num: u64) -> String {
    format!("{session_id}:{originator}:{seq_num}")
}

/// The abstract message store contract.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Acquires backend resources.
    async fn initialize(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Releases backend resources before the pipeline stops.
    async fn finalize(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Archives a message under its sequence number.
    async fn set(
        &self,
        session_id: &str,
        originator: &str,
        message: Message,
    ) -> Result<(), StoreError>;

    /// Retrieves an archived message, if present.
    async fn get(
        &self,
        session_id: &str,
        originator: &str,
        seq_num: u64,
    ) -> Result<Option<Message>, StoreError>;

    /// Deletes an archived message, returning the number removed (0 or 1).
    async fn delete(
        &self,
        session_id: &str,
        originator: &str,
        seq_num: u64,
    ) -> Result<u64, StoreError>;

    /// Returns the sorted sequence numbers matching the optional filters.
    async fn filter(
        &self,
        session_id: Option<&str>,
        originator: Option<&str>,
    ) -> Result<Vec<u64>, StoreError>;
}

/// The store stage: archives inbound and outbound traffic as it passes.
pub struct StoreStage {
    store: Arc<dyn MessageStore>,
    session: SessionId,
}

impl StoreStage {
    /// Creates a new [`StoreStage`] instance.
    #[must_use]
    pub fn new(store: Arc<dyn MessageStore>, session: SessionId) -> Self {
        Self { store, session }
    }
}

#[async_trait]
impl Stage for StoreStage {
    fn name(&self) -> &'static str {
        "store"
    }

    async fn initialize(&mut self) -> anyhow::Result<()> {
        self.store.initialize().await?;
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        self.store.finalize().await?;
        Ok(())
    }

    async fn on_receive(&mut self, payload: Payload) -> Result<Payload, StageError> {
        if let Payload::Message(message) = &payload
            && message.seq_num().is_ok()
        {
            self.store
                .set(
                    &self.session.id(),
                    self.session.target_comp_id.as_str(),
                    message.clone(),
                )
                .await?;
        }
        Ok(payload)
    }

    async fn on_send(&mut self, payload: Payload) -> Result<Payload, StageError> {
        // Replays carry PossDupFlag and are already archived.
        if let Payload::Message(message) = &payload
            && !message.is_poss_dup()
            && message.seq_num().is_ok()
        {
            self.store
                .set(
                    &self.session.id(),
                    self.session.sender_comp_id.as_str(),
                    message.clone(),
                )
                .await?;
        }
        Ok(payload)
    }
}
