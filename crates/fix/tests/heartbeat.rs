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

//! Heartbeat liveness behavior against a scripted counterparty.
//!
//! These tests run with a one-second heartbeat interval, so the probe grace
//! window (2 * interval + 4) keeps the wall-clock time bounded.

use std::time::Duration;

use chrono::Utc;
use marlin_fix::{
    FixConfig, FixEngine, Message, SessionError, SessionId,
    codec::{Decoder, Encoder},
    dictionary::MsgType,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

fn take_frame(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let checksum = buf
        .windows(4)
        .position(|window| window == b"\x0110=")?;
    let end = buf[checksum + 1..].iter().position(|&b| b == 0x01)? + checksum + 1;
    Some(buf.drain(..=end).collect())
}

async fn read_message(stream: &mut TcpStream, buf: &mut Vec<u8>) -> Option<Message> {
    loop {
        if let Some(frame) = take_frame(buf) {
            return Decoder::default().decode(&frame).ok();
        }
        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

async fn write_message(stream: &mut TcpStream, encoder: &Encoder, message: &Message) {
    let frame = encoder.encode(message, Utc::now()).unwrap();
    stream.write_all(&frame).await.unwrap();
}

/// A counterparty that acknowledges the logon but never answers any test
/// request: the session must terminate with a heartbeat timeout after the
/// probe's grace window.
#[tokio::test]
async fn test_unresponsive_counterparty_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let encoder = Encoder::new("FIX.4.4", "TARGET", "SENDER");

        let logon = read_message(&mut stream, &mut buf).await.unwrap();
        assert!(logon.is_type(MsgType::Logon));
        assert_eq!(logon.field(108).unwrap().as_u64().unwrap(), 1);

        let mut ack = Message::of_type(MsgType::Logon);
        ack.set(34, 1u64);
        ack.set(98, "0");
        ack.set(108, 1u64);
        ack.set(141, "Y");
        write_message(&mut stream, &encoder, &ack).await;

        // Read everything the client sends without ever responding.
        let mut test_requests = 0usize;
        while let Some(message) = read_message(&mut stream, &mut buf).await {
            if message.is_type(MsgType::TestRequest) {
                assert!(message.contains(112));
                test_requests += 1;
            }
        }
        test_requests
    });

    let mut config = FixConfig::new("127.0.0.1", port, "SENDER", "TARGET");
    config.username = "user".to_string();
    config.password = "pass".to_string();
    config.heartbeat_interval = 1;
    config.settle_delay = Duration::from_millis(10);
    config.stop_timeout = Duration::from_millis(300);

    let engine =
        FixEngine::with_session(config, SessionId::new("SENDER", "TARGET"), false).unwrap();
    let result = engine.run().await;

    assert!(matches!(result, Err(SessionError::HeartbeatTimeout)));
    assert!(server.await.unwrap() >= 1);
}
