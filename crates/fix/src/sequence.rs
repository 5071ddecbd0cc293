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

//! Sequence number management.
//!
//! Stamps outbound messages, detects inbound gaps (buffering the early
//! arrivals and emitting a resend request), drops already-processed
//! duplicates, and serves the counterparty's resend requests from the
//! message store. Runs of archived administrative messages are never
//! retransmitted; they coalesce into a single SequenceReset-GapFill.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;

use crate::{
    consts::TIMESTAMP_FORMAT,
    dictionary::{MsgType, Tag},
    error::{SessionError, StageError},
    message::{Message, admin},
    pipeline::{Payload, PipelineHandle, Stage},
    session::SessionId,
    store::MessageStore,
};

/// The sequence manager stage.
pub struct SequenceStage {
    handle: PipelineHandle,
    store: Arc<dyn MessageStore>,
    session: SessionId,
    resume: bool,
    reset_on_logon: bool,
    send_seq: u64,
    recv_seq: u64,
    buffer: BTreeMap<u64, Message>,
    pending_resend_end: Option<u64>,
}

impl SequenceStage {
    /// Creates a new [`SequenceStage`] instance.
    ///
    /// With `resume` set (an existing session id file and a durable store),
    /// the counters are initialized from the store instead of 1.
    #[must_use]
    pub fn new(
        handle: PipelineHandle,
        store: Arc<dyn MessageStore>,
        session: SessionId,
        resume: bool,
        reset_on_logon: bool,
    ) -> Self {
        Self {
            handle,
            store,
            session,
            resume,
            reset_on_logon,
            send_seq: 1,
            recv_seq: 0,
            buffer: BTreeMap::new(),
            pending_resend_end: None,
        }
    }

    /// The next outbound sequence number.
    #[must_use]
    pub const fn send_seq_num(&self) -> u64 {
        self.send_seq
    }

    /// The last accepted inbound sequence number.
    #[must_use]
    pub const fn recv_seq_num(&self) -> u64 {
        self.recv_seq
    }

    fn accept(&mut self, seq_num: u64) {
        self.recv_seq = seq_num;
        if self.pending_resend_end.is_some_and(|end| self.recv_seq >= end) {
            self.pending_resend_end = None;
        }
    }

    /// Re-injects buffered early arrivals that are now in order, and requests
    /// any further gap left behind them.
    fn flush_buffer(&mut self) {
        while let Some((&seq, _)) = self.buffer.first_key_value() {
            if seq <= self.recv_seq {
                self.buffer.pop_first();
            } else if seq == self.recv_seq + 1 {
                if let Some((_, message)) = self.buffer.pop_first() {
                    self.handle.receive_message(message);
                }
                // The re-injected message advances recv_seq when it comes
                // back through this stage; stop for now.
                break;
            } else {
                self.request_resend(seq);
                break;
            }
        }
    }

    /// Emits one resend request covering `[expected, ahead - 1]` unless one
    /// is already outstanding.
    fn request_resend(&mut self, ahead: u64) {
        if self.pending_resend_end.is_some() {
            return;
        }
        let expected = self.recv_seq + 1;
        let end = ahead - 1;
        tracing::warn!("Detected inbound sequence gap, requesting resend of [{expected}, {end}]");
        self.pending_resend_end = Some(end);
        self.handle.send(admin::resend_request(expected, end));
    }

    /// Serves an inbound ResendRequest from the archive.
    async fn serve_resend(&self, request: &Message) -> Result<(), StageError> {
        let begin = request.field(Tag::BeginSeqNo.code())?.as_u64()?;
        let end = request.field(Tag::EndSeqNo.code())?.as_u64()?;
        let session_id = self.session.id();
        let sender = self.session.sender_comp_id.as_str();

        let (begin, end) = if begin == 0 && end == 0 {
            let known = self.store.filter(Some(&session_id), Some(sender)).await?;
            let oldest = known.first().copied().unwrap_or(1);
            (oldest, self.send_seq.saturating_sub(1))
        } else if end == 0 {
            (begin, self.send_seq.saturating_sub(1))
        } else {
            (begin, end)
        };
        if end < begin {
            return Ok(());
        }
        tracing::info!("Counterparty requested resend of [{begin}, {end}]");

        let mut admin_run_start: Option<u64> = None;
        for seq in begin..=end {
            match self.store.get(&session_id, sender, seq).await? {
                Some(archived) if !archived.is_admin() => {
                    if let Some(start) = admin_run_start.take() {
                        self.handle.send(admin::gap_fill(start, seq));
                    }
                    let mut replay = archived;
                    if let Some(sending_time) = replay.get(Tag::SendingTime.code()) {
                        let original = sending_time.value().clone();
                        replay.set(Tag::OrigSendingTime.code(), original);
                    }
                    replay.set(Tag::PossDupFlag.code(), "Y");
                    self.handle.send(replay);
                }
                // Admin messages and unarchived slots are gap-filled.
                _ => {
                    admin_run_start.get_or_insert(seq);
                }
            }
        }
        if let Some(start) = admin_run_start.take() {
            self.handle.send(admin::gap_fill(start, end + 1));
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for SequenceStage {
    fn name(&self) -> &'static str {
        "sequence"
    }

    async fn initialize(&mut self) -> anyhow::Result<()> {
        if self.resume && !self.reset_on_logon {
            let session_id = self.session.id();
            let sent = self
                .store
                .filter(Some(&session_id), Some(self.session.sender_comp_id.as_str()))
                .await?;
            if let Some(max) = sent.last() {
                self.send_seq = max + 1;
            }
            let received = self
                .store
                .filter(Some(&session_id), Some(self.session.target_comp_id.as_str()))
                .await?;
            if let Some(max) = received.last() {
                self.recv_seq = *max;
            }
            tracing::info!(
                "Resumed sequence numbers: next outbound {}, last inbound {}",
                self.send_seq,
                self.recv_seq,
            );
        }
        Ok(())
    }

    async fn on_send(&mut self, payload: Payload) -> Result<Payload, StageError> {
        let Payload::Message(mut message) = payload else {
            return Ok(payload);
        };

        // Replays keep their original sequence number and sending time.
        if message.is_poss_dup() {
            return Ok(Payload::Message(message));
        }

        if message.is_type(MsgType::Logon)
            && message
                .get(Tag::ResetSeqNumFlag.code())
                .is_some_and(|f| f.as_bool().unwrap_or(false))
        {
            tracing::info!("Resetting outbound sequence numbers");
            self.send_seq = 1;
        }

        message.set(Tag::MsgSeqNum.code(), self.send_seq);
        message.set(
            Tag::SendingTime.code(),
            chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string(),
        );
        self.send_seq += 1;

        Ok(Payload::Message(message))
    }

    async fn on_receive(&mut self, payload: Payload) -> Result<Payload, StageError> {
        let Payload::Message(message) = payload else {
            return Ok(payload);
        };

        if message.is_type(MsgType::Logon)
            && message
                .get(Tag::ResetSeqNumFlag.code())
                .is_some_and(|f| f.as_bool().unwrap_or(false))
        {
            tracing::info!("Resetting inbound sequence numbers");
            self.recv_seq = 0;
        }

        // A SequenceReset advances the expected number without resends.
        if message.is_type(MsgType::SequenceReset) {
            let new_seq_no = message.field(Tag::NewSeqNo.code())?.as_u64()?;
            tracing::debug!("SequenceReset: advancing expected sequence number to {new_seq_no}");
            self.recv_seq = new_seq_no.saturating_sub(1);
            self.flush_buffer();
            return Ok(Payload::Message(message));
        }

        let seq_num = message.seq_num()?;
        let expected = self.recv_seq + 1;

        if seq_num == expected {
            self.accept(seq_num);
            if message.is_type(MsgType::ResendRequest) {
                self.serve_resend(&message).await?;
            }
            self.flush_buffer();
            return Ok(Payload::Message(message));
        }

        if seq_num > expected {
            self.buffer.insert(seq_num, message);
            self.request_resend(seq_num);
            return Err(StageError::Stop);
        }

        // seq_num < expected
        if message.is_poss_dup() {
            tracing::debug!("Dropping already-processed duplicate with sequence number {seq_num}");
            return Err(StageError::Stop);
        }

        Err(StageError::Fatal(SessionError::UnexpectedSeqNum {
            received: seq_num,
            expected,
        }))
    }
}
