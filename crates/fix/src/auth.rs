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

//! Logon and logout handling.
//!
//! Dispatches the Logon on start and validates that the counterparty's
//! acknowledgement echoes the session parameters that were sent; any
//! mismatch is fatal. A received Logout transitions the session towards
//! shutdown via the logged-out event.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    dictionary::{MsgType, Tag},
    error::{SessionError, StageError},
    message::{Message, admin, field::Field},
    pipeline::{Payload, PipelineHandle, SessionEvents, Stage},
};

/// The session authentication stage.
pub struct AuthStage {
    handle: PipelineHandle,
    events: Arc<SessionEvents>,
    heartbeat_interval: u64,
    username: String,
    password: String,
    reset_seq_nums: bool,
    test_mode: bool,
}

impl AuthStage {
    /// Creates a new [`AuthStage`] instance.
    #[must_use]
    pub fn new(
        handle: PipelineHandle,
        events: Arc<SessionEvents>,
        heartbeat_interval: u64,
        username: &str,
        password: &str,
        reset_seq_nums: bool,
        test_mode: bool,
    ) -> Self {
        Self {
            handle,
            events,
            heartbeat_interval,
            username: username.to_string(),
            password: password.to_string(),
            reset_seq_nums,
            test_mode,
        }
    }

    /// Validates that the logon acknowledgement echoes the values this side
    /// sent.
    fn validate_logon_ack(&self, message: &Message) -> Result<(), StageError> {
        let heartbeat = message.field(Tag::HeartBtInt.code())?.as_u64()?;
        if heartbeat != self.heartbeat_interval {
            return Err(StageError::Fatal(SessionError::LogonMismatch {
                field: "HeartBtInt",
                expected: self.heartbeat_interval.to_string(),
                received: heartbeat.to_string(),
            }));
        }

        let test_mode = flag(message, Tag::TestMessageIndicator)?;
        if test_mode != self.test_mode {
            return Err(StageError::Fatal(SessionError::LogonMismatch {
                field: "TestMessageIndicator",
                expected: self.test_mode.to_string(),
                received: test_mode.to_string(),
            }));
        }

        let reset_seq_nums = flag(message, Tag::ResetSeqNumFlag)?;
        if reset_seq_nums != self.reset_seq_nums {
            return Err(StageError::Fatal(SessionError::LogonMismatch {
                field: "ResetSeqNumFlag",
                expected: self.reset_seq_nums.to_string(),
                received: reset_seq_nums.to_string(),
            }));
        }

        Ok(())
    }
}

/// Reads a boolean flag, defaulting to `N` when the tag is absent.
fn flag(message: &Message, tag: Tag) -> Result<bool, StageError> {
    Ok(message
        .get(tag.code())
        .map(Field::as_bool)
        .transpose()?
        .unwrap_or(false))
}

#[async_trait]
impl Stage for AuthStage {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn start(&mut self) -> anyhow::Result<()> {
        tracing::info!("Logging in...");
        self.handle.send(admin::logon(
            self.heartbeat_interval,
            &self.username,
            &self.password,
            self.reset_seq_nums,
            self.test_mode,
        ));
        Ok(())
    }

    async fn on_receive(&mut self, payload: Payload) -> Result<Payload, StageError> {
        let Payload::Message(message) = payload else {
            return Ok(payload);
        };

        if message.is_type(MsgType::Logon) {
            self.validate_logon_ack(&message)?;
            tracing::info!("Successfully logged on");
            self.events.set_logged_in();
        } else if message.is_type(MsgType::Logout) {
            tracing::info!("Received logout");
            self.events.set_logged_out();
        }

        Ok(Payload::Message(message))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::pipeline::Command;

    fn stage() -> (AuthStage, Arc<SessionEvents>, UnboundedReceiver<Command>) {
        let (handle, rx) = PipelineHandle::channel();
        let events = Arc::new(SessionEvents::new());
        let stage = AuthStage::new(handle, events.clone(), 30, "user", "pass", true, false);
        (stage, events, rx)
    }

    fn logon_ack(heartbeat: u64, reset: bool, test_mode: Option<bool>) -> Message {
        let mut message = Message::of_type(MsgType::Logon);
        message.set(34, 1u64);
        message.set(108, heartbeat);
        message.set(141, reset);
        if let Some(test_mode) = test_mode {
            message.set(464, test_mode);
        }
        message
    }

    #[rstest]
    #[tokio::test]
    async fn test_start_dispatches_logon() {
        let (mut stage, _events, mut rx) = stage();
        stage.start().await.unwrap();

        match rx.try_recv().unwrap() {
            Command::Send(message) => {
                assert!(message.is_type(MsgType::Logon));
                assert_eq!(message.field(98).unwrap().as_str().unwrap(), "0");
                assert_eq!(message.field(108).unwrap().as_u64().unwrap(), 30);
            }
            other => panic!("expected logon send, got {other:?}"),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_matching_ack_sets_logged_in() {
        let (mut stage, events, _rx) = stage();

        stage
            .on_receive(Payload::Message(logon_ack(30, true, None)))
            .await
            .unwrap();

        assert!(events.is_logged_in());
    }

    #[rstest]
    #[tokio::test]
    async fn test_absent_test_indicator_defaults_to_no() {
        let (mut stage, events, _rx) = stage();

        // Configured test_mode = false; the ack omits tag 464.
        stage
            .on_receive(Payload::Message(logon_ack(30, true, None)))
            .await
            .unwrap();
        assert!(events.is_logged_in());
    }

    #[rstest]
    #[case(10, true, None, "HeartBtInt")]
    #[case(30, false, None, "ResetSeqNumFlag")]
    #[case(30, true, Some(true), "TestMessageIndicator")]
    #[tokio::test]
    async fn test_mismatched_ack_is_fatal(
        #[case] heartbeat: u64,
        #[case] reset: bool,
        #[case] test_mode: Option<bool>,
        #[case] expected_field: &'static str,
    ) {
        let (mut stage, events, _rx) = stage();

        let result = stage
            .on_receive(Payload::Message(logon_ack(heartbeat, reset, test_mode)))
            .await;

        match result {
            Err(StageError::Fatal(SessionError::LogonMismatch { field, .. })) => {
                assert_eq!(field, expected_field);
            }
            other => panic!("expected logon mismatch, got {other:?}"),
        }
        assert!(!events.is_logged_in());
    }

    #[rstest]
    #[tokio::test]
    async fn test_logout_sets_logged_out() {
        let (mut stage, events, _rx) = stage();

        stage
            .on_receive(Payload::Message(Message::of_type(MsgType::Logout)))
            .await
            .unwrap();

        assert!(events.is_logged_out());
    }
}
