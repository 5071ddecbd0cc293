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

//! Session identity: `(session_uuid, sender_comp_id, target_comp_id)`.
//!
//! The UUID is generated fresh on first logon and persisted to a session-id
//! file so that a resumed process continues with the same sequence numbers
//! and store keys. The file is created exclusively; a conflicting concurrent
//! creation is an error rather than a silently split session.

use std::{fmt, io::Write, path::Path};

use ustr::Ustr;
use uuid::Uuid;

use crate::error::ConfigError;

/// The identity of one logon-to-logout session lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionId {
    pub uuid: Uuid,
    pub sender_comp_id: Ustr,
    pub target_comp_id: Ustr,
}

impl SessionId {
    /// Creates a new [`SessionId`] instance with a fresh UUID.
    #[must_use]
    pub fn new(sender_comp_id: &str, target_comp_id: &str) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            sender_comp_id: Ustr::from(sender_comp_id),
            target_comp_id: Ustr::from(target_comp_id),
        }
    }

    /// Loads the session UUID from `path`, or generates a fresh one and
    /// writes it with exclusive creation.
    ///
    /// Returns the identity and whether an existing session was resumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, holds an invalid UUID, or
    /// already exists at (exclusive) creation time.
    pub fn load_or_create(
        path: &Path,
        sender_comp_id: &str,
        target_comp_id: &str,
    ) -> Result<(Self, bool), ConfigError> {
        let file_error = |e: String| ConfigError::SessionIdFile(e);

        if path.exists() {
            let contents =
                std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
            let uuid = Uuid::parse_str(contents.trim()).map_err(|e| {
                file_error(format!("'{}' holds an invalid UUID: {e}", path.display()))
            })?;
            tracing::info!("Resuming session {uuid}");
            return Ok((
                Self {
                    uuid,
                    sender_comp_id: Ustr::from(sender_comp_id),
                    target_comp_id: Ustr::from(target_comp_id),
                },
                true,
            ));
        }

        let session = Self::new(sender_comp_id, target_comp_id);
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| file_error(format!("cannot create '{}': {e}", path.display())))?;
        file.write_all(session.uuid.to_string().as_bytes())
            .map_err(|e| file_error(e.to_string()))?;
        tracing::info!("Started new session {}", session.uuid);
        Ok((session, false))
    }

    /// The session UUID in its store-key form.
    #[must_use]
    pub fn id(&self) -> String {
        self.uuid.to_string()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} -> {})",
            self.uuid, self.sender_comp_id, self.target_comp_id
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_fresh_session_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session-id");

        let (session, resumed) = SessionId::load_or_create(&path, "SENDER", "TARGET").unwrap();
        assert!(!resumed);
        assert!(path.exists());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, session.uuid.to_string());
    }

    #[rstest]
    fn test_existing_file_resumes_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session-id");

        let (first, _) = SessionId::load_or_create(&path, "SENDER", "TARGET").unwrap();
        let (second, resumed) = SessionId::load_or_create(&path, "SENDER", "TARGET").unwrap();

        assert!(resumed);
        assert_eq!(first.uuid, second.uuid);
    }

    #[rstest]
    fn test_invalid_uuid_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session-id");
        std::fs::write(&path, "not-a-uuid").unwrap();

        assert!(SessionId::load_or_create(&path, "S", "T").is_err());
    }
}
