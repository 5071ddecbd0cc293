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

//! The engine façade: wires configuration, session identity, store backend,
//! and the stage chain into a runnable pipeline.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    auth::AuthStage,
    codec::{CodecStage, Decoder, Encoder},
    config::{Encoding, FixConfig, StageId, StoreBackend},
    error::{ConfigError, SessionError},
    heartbeat::HeartbeatStage,
    logging::LoggingStage,
    message::Message,
    pipeline::{Pipeline, PipelineHandle, SessionEvents, Stage},
    sequence::SequenceStage,
    session::SessionId,
    store::{MemoryStore, MessageStore, StoreStage},
    transport::TransportStage,
};

/// A configured FIX client engine for one session.
pub struct FixEngine {
    pipeline: Pipeline,
    handle: PipelineHandle,
    inbound: Option<mpsc::UnboundedReceiver<Message>>,
    session: SessionId,
}

impl FixEngine {
    /// Creates a new [`FixEngine`] instance, loading (or creating) the
    /// persisted session identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the session id file or store backend
    /// configuration is invalid.
    pub fn new(config: FixConfig) -> Result<Self, ConfigError> {
        let (session, resumed) = SessionId::load_or_create(
            &config.session_id_path,
            &config.sender_comp_id,
            &config.target_comp_id,
        )?;
        Self::with_session(config, session, resumed)
    }

    /// Creates an engine with an explicit session identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the store backend configuration is invalid.
    pub fn with_session(
        config: FixConfig,
        session: SessionId,
        resumed: bool,
    ) -> Result<Self, ConfigError> {
        let store = build_store(&config)?;
        let events = Arc::new(SessionEvents::new());
        let (handle, rx) = PipelineHandle::channel();

        let mut stages: Vec<Box<dyn Stage>> = Vec::with_capacity(config.stages.len());
        for id in &config.stages {
            stages.push(build_stage(
                *id, &config, &session, resumed, &store, &events, &handle,
            ));
        }

        let (pipeline, inbound) =
            Pipeline::new(stages, rx, handle.clone(), events, config.timeouts());

        Ok(Self {
            pipeline,
            handle,
            inbound: Some(inbound),
            session,
        })
    }

    /// The session identity.
    #[must_use]
    pub const fn session(&self) -> &SessionId {
        &self.session
    }

    /// A handle for sending messages and stopping the session.
    #[must_use]
    pub fn handle(&self) -> PipelineHandle {
        self.handle.clone()
    }

    /// Takes the receiver delivering fully-propagated inbound messages.
    pub fn take_inbound(&mut self) -> Option<mpsc::UnboundedReceiver<Message>> {
        self.inbound.take()
    }

    /// Runs the session to completion.
    ///
    /// # Errors
    ///
    /// Returns the fatal [`SessionError`] that terminated the session, if any.
    pub async fn run(self) -> Result<(), SessionError> {
        tracing::info!("Starting session {}", self.session);
        self.pipeline.run().await
    }
}

fn build_store(config: &FixConfig) -> Result<Arc<dyn MessageStore>, ConfigError> {
    match &config.store_backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Redis(url) => {
            #[cfg(feature = "redis")]
            {
                Ok(Arc::new(crate::store::redis::RedisStore::new(url)))
            }
            #[cfg(not(feature = "redis"))]
            {
                let _ = url;
                Err(ConfigError::Invalid {
                    key: "message_store".to_string(),
                    reason: "redis support not compiled in (enable the 'redis' feature)"
                        .to_string(),
                })
            }
        }
    }
}

fn build_stage(
    id: StageId,
    config: &FixConfig,
    session: &SessionId,
    resumed: bool,
    store: &Arc<dyn MessageStore>,
    events: &Arc<SessionEvents>,
    handle: &PipelineHandle,
) -> Box<dyn Stage> {
    match id {
        StageId::Transport => Box::new(TransportStage::new(
            &config.host,
            config.port,
            &config.begin_string,
            config.settle_delay,
            handle.clone(),
        )),
        StageId::Codec => {
            let mut encoder = Encoder::new(
                &config.begin_string,
                &config.sender_comp_id,
                &config.target_comp_id,
            );
            if config.encoding == Encoding::Cp1252 {
                encoder = encoder.with_lenient_encoding();
            }
            let mut decoder = Decoder::new(config.group_templates.clone());
            if config.strict_decode {
                decoder = decoder.strict();
            }
            Box::new(CodecStage::new(encoder, decoder))
        }
        StageId::Logging => Box::new(LoggingStage),
        StageId::Store => Box::new(StoreStage::new(store.clone(), session.clone())),
        StageId::Sequence => Box::new(SequenceStage::new(
            handle.clone(),
            store.clone(),
            session.clone(),
            resumed,
            config.reset_seq_nums,
        )),
        StageId::Auth => Box::new(AuthStage::new(
            handle.clone(),
            events.clone(),
            config.heartbeat_interval,
            &config.username,
            &config.password,
            config.reset_seq_nums,
            config.test_mode,
        )),
        StageId::Heartbeat => Box::new(HeartbeatStage::new(
            handle.clone(),
            config.heartbeat_interval,
        )),
    }
}
