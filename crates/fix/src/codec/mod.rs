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

//! The wire codec: framing, field parsing (including nested repeating
//! groups), checksum, length, and validation.

pub mod decode;
pub mod encode;
pub mod templates;

use async_trait::async_trait;

use crate::{
    error::StageError,
    pipeline::{Payload, Stage},
};

pub use decode::Decoder;
pub use encode::Encoder;
pub use templates::GroupTemplates;

/// Computes the FIX checksum: the byte sum modulo 256.
#[must_use]
pub fn checksum(data: &[u8]) -> u32 {
    data.iter().map(|&b| u32::from(b)).sum::<u32>() % 256
}

/// The codec stage: decodes raw inbound frames into messages and encodes
/// outbound messages into frames.
#[derive(Debug)]
pub struct CodecStage {
    encoder: Encoder,
    decoder: Decoder,
}

impl CodecStage {
    /// Creates a new [`CodecStage`] instance.
    #[must_use]
    pub const fn new(encoder: Encoder, decoder: Decoder) -> Self {
        Self { encoder, decoder }
    }
}

#[async_trait]
impl Stage for CodecStage {
    fn name(&self) -> &'static str {
        "codec"
    }

    async fn on_receive(&mut self, payload: Payload) -> Result<Payload, StageError> {
        match payload {
            Payload::Raw(frame) => {
                let message = self.decoder.decode(&frame)?;
                Ok(Payload::Message(message))
            }
            // Re-injected messages arrive already decoded.
            Payload::Message(_) => Ok(payload),
        }
    }

    async fn on_send(&mut self, payload: Payload) -> Result<Payload, StageError> {
        match payload {
            Payload::Message(message) => {
                let frame = self.encoder.encode(&message, chrono::Utc::now())?;
                Ok(Payload::Raw(frame))
            }
            Payload::Raw(_) => Ok(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_checksum_sample() {
        // Reference frame with a known checksum.
        let data = b"8=FIXT.1.1\x019=75\x0135=A\x0134=1\x0149=ROFX\x01\
            52=20170417-18:29:09.599\x0156=eco\x0198=0\x01108=20\x01141=Y\x011137=9\x01";
        assert_eq!(checksum(data), 79);
    }

    #[rstest]
    #[tokio::test]
    async fn test_stage_round_trip() {
        let mut stage = CodecStage::new(
            Encoder::new("FIX.4.4", "SENDER", "TARGET"),
            Decoder::default(),
        );

        let message =
            crate::message::Message::from_pairs([(35, "D"), (34, "1"), (55, "EURUSD")]).unwrap();
        let encoded = stage.on_send(Payload::Message(message)).await.unwrap();

        let Payload::Raw(frame) = encoded else {
            panic!("expected raw frame");
        };
        let decoded = stage.on_receive(Payload::Raw(frame)).await.unwrap();

        let Payload::Message(message) = decoded else {
            panic!("expected message");
        };
        assert_eq!(message.msg_type().unwrap(), "D");
        assert_eq!(message.field(55).unwrap().as_str().unwrap(), "EURUSD");
        assert_eq!(message.sender_id().unwrap(), "SENDER");
    }
}
