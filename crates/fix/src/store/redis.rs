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

//! The durable Redis-backed message store.
//!
//! Messages are persisted in their JSON structural form under
//! `{session}:{originator}:{seq}` keys, so a resumed process can continue a
//! session with consistent sequence numbers and replay state.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::Mutex;

use crate::{
    error::StoreError,
    message::Message,
    store::{MessageStore, store_key},
};

const SCAN_COUNT: u64 = 1000;

/// A message store persisted in Redis.
pub struct RedisStore {
    url: String,
    con: Mutex<Option<ConnectionManager>>,
}

impl RedisStore {
    /// Creates a new [`RedisStore`] instance for the given connection URL.
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            con: Mutex::new(None),
        }
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        self.con
            .lock()
            .await
            .clone()
            .ok_or_else(|| StoreError::Backend("store not initialized".to_string()))
    }
}

fn backend_err(error: redis::RedisError) -> StoreError {
    StoreError::Backend(error.to_string())
}

#[async_trait]
impl MessageStore for RedisStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        let client = redis::Client::open(self.url.as_str()).map_err(backend_err)?;
        let con = ConnectionManager::new(client).await.map_err(backend_err)?;
        *self.con.lock().await = Some(con);
        tracing::debug!("Connected to Redis message store");
        Ok(())
    }

    async fn finalize(&self) -> Result<(), StoreError> {
        self.con.lock().await.take();
        Ok(())
    }

    async fn set(
        &self,
        session_id: &str,
        originator: &str,
        message: Message,
    ) -> Result<(), StoreError> {
        let seq_num = message
            .seq_num()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let payload = serde_json::to_string(&message)?;
        let mut con = self.connection().await?;
        redis::cmd("SET")
            .arg(store_key(session_id, originator, seq_num))
            .arg(payload)
            .query_async::<()>(&mut con)
            .await
            .map_err(backend_err)
    }

    async fn get(
        &self,
        session_id: &str,
        originator: &str,
        seq_num: u64,
    ) -> Result<Option<Message>, StoreError> {
        let mut con = self.connection().await?;
        let payload: Option<String> = redis::cmd("GET")
            .arg(store_key(session_id, originator, seq_num))
            .query_async(&mut con)
            .await
            .map_err(backend_err)?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn delete(
        &self,
        session_id: &str,
        originator: &str,
        seq_num: u64,
    ) -> Result<u64, StoreError> {
        let mut con = self.connection().await?;
        redis::cmd("DEL")
            .arg(store_key(session_id, originator, seq_num))
            .query_async(&mut con)
            .await
            .map_err(backend_err)
    }

    async fn filter(
        &self,
        session_id: Option<&str>,
        originator: Option<&str>,
    ) -> Result<Vec<u64>, StoreError> {
        let pattern = format!(
            "{}:{}:*",
            session_id.unwrap_or("*"),
            originator.unwrap_or("*"),
        );

        let mut con = self.connection().await?;
        let mut matches = Vec::new();
        let mut cursor = 0u64;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut con)
                .await
                .map_err(backend_err)?;

            for key in keys {
                if let Some(seq) = key.rsplit(':').next().and_then(|s| s.parse().ok()) {
                    matches.push(seq);
                }
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        matches.sort_unstable();
        Ok(matches)
    }
}
