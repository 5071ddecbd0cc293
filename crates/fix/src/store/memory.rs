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

//! The default transient in-memory message store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    error::StoreError,
    message::Message,
    store::MessageStore,
};

type Key = (String, String, u64);

/// An ordered in-memory message store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<Key, Message>>,
}

impl MemoryStore {
    /// Creates a new [`MemoryStore`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn set(
        &self,
        session_id: &str,
        originator: &str,
        message: Message,
    ) -> Result<(), StoreError> {
        let seq_num = message
            .seq_num()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.entries.lock().await.insert(
            (session_id.to_string(), originator.to_string(), seq_num),
            message,
        );
        Ok(())
    }

    async fn get(
        &self,
        session_id: &str,
        originator: &str,
        seq_num: u64,
    ) -> Result<Option<Message>, StoreError> {
        Ok(self
            .entries
            .lock()
            .await
            .get(&(session_id.to_string(), originator.to_string(), seq_num))
            .cloned())
    }

    async fn delete(
        &self,
        session_id: &str,
        originator: &str,
        seq_num: u64,
    ) -> Result<u64, StoreError> {
        let removed = self
            .entries
            .lock()
            .await
            .remove(&(session_id.to_string(), originator.to_string(), seq_num));
        Ok(u64::from(removed.is_some()))
    }

    async fn filter(
        &self,
        session_id: Option<&str>,
        originator: Option<&str>,
    ) -> Result<Vec<u64>, StoreError> {
        let entries = self.entries.lock().await;
        let mut matches: Vec<u64> = entries
            .keys()
            .filter(|(session, origin, _)| {
                session_id.is_none_or(|s| s == session)
                    && originator.is_none_or(|o| o == origin)
            })
            .map(|(_, _, seq)| *seq)
            .collect();
        matches.sort_unstable();
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::dictionary::MsgType;

    fn message(seq: u64) -> Message {
        let mut message = Message::of_type(MsgType::ExecutionReport);
        message.set(34, seq);
        message
    }

    #[rstest]
    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        store.set("sess", "SENDER", message(1)).await.unwrap();

        let archived = store.get("sess", "SENDER", 1).await.unwrap().unwrap();
        assert_eq!(archived.seq_num().unwrap(), 1);

        assert_eq!(store.delete("sess", "SENDER", 1).await.unwrap(), 1);
        assert_eq!(store.delete("sess", "SENDER", 1).await.unwrap(), 0);
        assert!(store.get("sess", "SENDER", 1).await.unwrap().is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn test_set_overwrites_same_key() {
        let store = MemoryStore::new();
        store.set("sess", "SENDER", message(1)).await.unwrap();

        let mut replacement = message(1);
        replacement.set(58, "updated");
        store.set("sess", "SENDER", replacement).await.unwrap();

        let archived = store.get("sess", "SENDER", 1).await.unwrap().unwrap();
        assert_eq!(archived.field(58).unwrap().as_str().unwrap(), "updated");
    }

    #[rstest]
    #[tokio::test]
    async fn test_filter_sorted_and_scoped() {
        let store = MemoryStore::new();
        for seq in [3, 1, 2] {
            store.set("sess", "SENDER", message(seq)).await.unwrap();
        }
        store.set("sess", "TARGET", message(9)).await.unwrap();
        store.set("other", "SENDER", message(7)).await.unwrap();

        assert_eq!(
            store.filter(Some("sess"), Some("SENDER")).await.unwrap(),
            vec![1, 2, 3]
        );
        assert_eq!(
            store.filter(Some("sess"), None).await.unwrap(),
            vec![1, 2, 3, 9]
        );
        let all = store.filter(None, None).await.unwrap();
        assert_eq!(all, vec![1, 2, 3, 7, 9]);
    }
}
