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

//! The TCP transport stage.
//!
//! Connects to the counterparty, extracts complete message frames from the
//! byte stream on a long-lived reader task, and writes encoded frames on
//! `on_send`. Frame extraction locates the begin-string marker, the start of
//! the checksum field, and the final SOH, delivering the concatenation (any
//! bytes preceding the begin string included) as one frame.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use memchr::memmem;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    task::JoinHandle,
};

use crate::{
    consts::{MAX_READ_BUFFER, SOH},
    error::{SessionError, StageError},
    pipeline::{Payload, PipelineHandle, Stage},
};

/// The TCP transport stage (lowest in the pipeline).
pub struct TransportStage {
    host: String,
    port: u16,
    begin_string: String,
    settle_delay: Duration,
    handle: PipelineHandle,
    reader: Option<OwnedReadHalf>,
    writer: Option<OwnedWriteHalf>,
    reader_task: Option<JoinHandle<()>>,
}

impl TransportStage {
    /// Creates a new [`TransportStage`] instance.
    #[must_use]
    pub fn new(
        host: &str,
        port: u16,
        begin_string: &str,
        settle_delay: Duration,
        handle: PipelineHandle,
    ) -> Self {
        Self {
            host: host.to_string(),
            port,
            begin_string: begin_string.to_string(),
            settle_delay,
            handle,
            reader: None,
            writer: None,
            reader_task: None,
        }
    }
}

#[async_trait]
impl Stage for TransportStage {
    fn name(&self) -> &'static str {
        "transport"
    }

    async fn initialize(&mut self) -> anyhow::Result<()> {
        tracing::info!("Establishing connection to {}:{}...", self.host, self.port);
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        self.reader = Some(reader);
        self.writer = Some(writer);
        tracing::info!("Connected");
        Ok(())
    }

    async fn start(&mut self) -> anyhow::Result<()> {
        let reader = self
            .reader
            .take()
            .ok_or_else(|| anyhow::anyhow!("transport not connected"))?;
        let handle = self.handle.clone();
        let begin_string = self.begin_string.clone();

        self.reader_task = Some(tokio::spawn(async move {
            tracing::debug!("Started task 'transport-reader'");
            reader_loop(reader, &begin_string, &handle).await;
            tracing::debug!("Stopped task 'transport-reader'");
        }));

        // Let the reader establish before any logon is transmitted, so that
        // rejection frames are not missed.
        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }
        if let Some(task) = self.reader_task.take() {
            task.abort();
            // Cancellation during teardown is expected.
            if let Err(e) = task.await
                && !e.is_cancelled()
            {
                tracing::warn!("Reader task terminated abnormally: {e}");
            }
        }
        tracing::info!("Session closed");
        Ok(())
    }

    async fn on_send(&mut self, payload: Payload) -> Result<Payload, StageError> {
        match payload {
            Payload::Raw(frame) => {
                let writer = self.writer.as_mut().ok_or_else(|| {
                    StageError::Fatal(SessionError::TransportEof)
                })?;
                writer
                    .write_all(&frame)
                    .await
                    .map_err(|e| StageError::Fatal(SessionError::Io(e)))?;
                writer
                    .flush()
                    .await
                    .map_err(|e| StageError::Fatal(SessionError::Io(e)))?;
                Ok(Payload::Raw(frame))
            }
            // An unencoded message reaching the transport is a wiring fault.
            Payload::Message(_) => Err(StageError::Processing(anyhow::anyhow!(
                "transport received an unencoded message"
            ))),
        }
    }
}

async fn reader_loop(mut reader: OwnedReadHalf, begin_string: &str, handle: &PipelineHandle) {
    let begin_marker = format!("8={begin_string}");
    let begin_finder = memmem::Finder::new(begin_marker.as_bytes());
    let checksum_finder = memmem::Finder::new(b"\x0110=");
    let mut buf = BytesMut::with_capacity(8 * 1024);

    loop {
        while let Some(frame) = extract_frame(&mut buf, &begin_finder, &checksum_finder) {
            handle.receive_raw(frame);
        }

        if buf.len() > MAX_READ_BUFFER {
            tracing::error!("Stream reader buffer limit exceeded, initiating shutdown...");
            handle.fatal(SessionError::BufferOverrun {
                limit: MAX_READ_BUFFER,
            });
            return;
        }

        match reader.read_buf(&mut buf).await {
            Ok(0) => {
                if !buf.is_empty() && memmem::find(&buf, b"35=5\x01").is_some() {
                    // Partial logout frame: deliver it so the session can
                    // complete its logout semantics.
                    handle.receive_raw(buf.split().freeze());
                } else if buf.is_empty() {
                    tracing::debug!("Transport EOF");
                    handle.fatal(SessionError::TransportEof);
                } else {
                    tracing::error!(
                        "Unexpected EOF waiting for next chunk of partial data '{}', initiating shutdown...",
                        String::from_utf8_lossy(&buf),
                    );
                    handle.fatal(SessionError::TransportEof);
                }
                return;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("Transport read failed: {e}");
                handle.fatal(SessionError::Io(e));
                return;
            }
        }
    }
}

/// Extracts one complete frame from `buf`, if present.
///
/// A frame spans from the start of the buffer (bytes preceding the begin
/// string included) through the SOH terminating the checksum field.
fn extract_frame(
    buf: &mut BytesMut,
    begin_finder: &memmem::Finder<'_>,
    checksum_finder: &memmem::Finder<'_>,
) -> Option<Bytes> {
    let begin = begin_finder.find(buf)?;
    let checksum = begin + checksum_finder.find(&buf[begin..])?;
    let end = buf[checksum + 1..]
        .iter()
        .position(|&b| b == SOH)
        .map(|p| checksum + 1 + p)?;
    Some(buf.split_to(end + 1).freeze())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn finders() -> (memmem::Finder<'static>, memmem::Finder<'static>) {
        (
            memmem::Finder::new(b"8=FIX.4.4"),
            memmem::Finder::new(b"\x0110="),
        )
    }

    #[rstest]
    fn test_extract_single_frame() {
        let (begin, checksum) = finders();
        let mut buf = BytesMut::from(&b"8=FIX.4.4\x019=5\x0135=0\x0110=161\x01"[..]);

        let frame = extract_frame(&mut buf, &begin, &checksum).unwrap();
        assert_eq!(&frame[..], b"8=FIX.4.4\x019=5\x0135=0\x0110=161\x01");
        assert!(buf.is_empty());
    }

    #[rstest]
    fn test_extract_keeps_partial_tail() {
        let (begin, checksum) = finders();
        let mut buf =
            BytesMut::from(&b"8=FIX.4.4\x019=5\x0135=0\x0110=161\x018=FIX.4.4\x019=5\x01"[..]);

        let frame = extract_frame(&mut buf, &begin, &checksum).unwrap();
        assert_eq!(&frame[..], b"8=FIX.4.4\x019=5\x0135=0\x0110=161\x01");
        assert_eq!(&buf[..], b"8=FIX.4.4\x019=5\x01");
        assert!(extract_frame(&mut buf, &begin, &checksum).is_none());
    }

    #[rstest]
    fn test_extract_includes_leading_junk() {
        let (begin, checksum) = finders();
        let mut buf = BytesMut::from(&b"1=2\x018=FIX.4.4\x019=5\x0135=0\x0110=161\x01"[..]);

        let frame = extract_frame(&mut buf, &begin, &checksum).unwrap();
        assert_eq!(&frame[..], b"1=2\x018=FIX.4.4\x019=5\x0135=0\x0110=161\x01");
    }

    #[rstest]
    fn test_extract_waits_for_checksum_terminator() {
        let (begin, checksum) = finders();
        let mut buf = BytesMut::from(&b"8=FIX.4.4\x019=5\x0135=0\x0110=16"[..]);
        assert!(extract_frame(&mut buf, &begin, &checksum).is_none());

        buf.extend_from_slice(b"1\x01");
        assert!(extract_frame(&mut buf, &begin, &checksum).is_some());
    }

    #[rstest]
    fn test_extract_multiple_frames_in_order() {
        let (begin, checksum) = finders();
        let mut buf = BytesMut::from(
            &b"8=FIX.4.4\x019=5\x0135=0\x0110=161\x018=FIX.4.4\x019=5\x0135=1\x0110=162\x01"[..],
        );

        let first = extract_frame(&mut buf, &begin, &checksum).unwrap();
        let second = extract_frame(&mut buf, &begin, &checksum).unwrap();
        assert!(first.ends_with(b"10=161\x01"));
        assert!(second.ends_with(b"10=162\x01"));
        assert!(buf.is_empty());
    }
}
