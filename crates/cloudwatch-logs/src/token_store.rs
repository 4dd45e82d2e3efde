// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Best-effort persistence of the last sequence token of a stream.
//!
//! The token lives in `<state_file>_<stream>` where every `/` of the stream
//! name is replaced with `-`. The file holds the raw token and is fully
//! rewritten after each successful append, through `tokio::fs` so the
//! runtime's workers never block on the disk. Read and write failures are
//! logged and otherwise ignored: the in-memory registry stays authoritative
//! and only restart recovery degrades.

use crate::registry::SequenceToken;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, error};

#[must_use]
pub fn state_file_for(state_file: &str, stream: &str) -> String {
    format!("{}_{}", state_file, stream.replace('/', "-"))
}

#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    state_file: String,
}

impl TokenStore {
    /// An empty `state_file` yields a store that never touches the disk.
    #[must_use]
    pub fn new(state_file: &str) -> Self {
        TokenStore {
            state_file: state_file.to_string(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.state_file.is_empty()
    }

    #[must_use]
    pub fn path_for(&self, stream: &str) -> PathBuf {
        PathBuf::from(state_file_for(&self.state_file, stream))
    }

    pub async fn load(&self, stream: &str) -> SequenceToken {
        if !self.is_enabled() {
            return SequenceToken::empty();
        }
        let path = self.path_for(stream);
        match fs::read_to_string(&path).await {
            Ok(content) => {
                let token = SequenceToken::new(content.trim_matches(|c| c == '\r' || c == '\n'));
                debug!(
                    "CLOUDWATCH | Loaded sequence token for {stream} from {}",
                    path.display()
                );
                token
            }
            Err(e) if e.kind() == ErrorKind::NotFound => SequenceToken::empty(),
            Err(e) => {
                error!(
                    "CLOUDWATCH | Failed to read state file {}: {e}",
                    path.display()
                );
                SequenceToken::empty()
            }
        }
    }

    pub async fn store(&self, stream: &str, token: &SequenceToken) {
        if !self.is_enabled() {
            return;
        }
        let path = self.path_for(stream);
        if let Err(e) = fs::write(&path, token.as_str()).await {
            error!(
                "CLOUDWATCH | Failed to write state file {}: {e}",
                path.display()
            );
        }
    }
}
