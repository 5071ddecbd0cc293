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

//! Message traffic logging stage.

use async_trait::async_trait;

use crate::{
    error::StageError,
    pipeline::{Payload, Stage},
};

/// Logs every decoded inbound and stamped outbound message.
#[derive(Debug, Default)]
pub struct LoggingStage;

#[async_trait]
impl Stage for LoggingStage {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn on_receive(&mut self, payload: Payload) -> Result<Payload, StageError> {
        if let Payload::Message(message) = &payload {
            tracing::info!(" <-- {message}");
        }
        Ok(payload)
    }

    async fn on_send(&mut self, payload: Payload) -> Result<Payload, StageError> {
        if let Payload::Message(message) = &payload {
            tracing::info!(" --> {message}");
        }
        Ok(payload)
    }
}
