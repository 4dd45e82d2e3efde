// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory sequence tokens, one per destination.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as TokioMutex;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DestinationIdentity {
    pub group: String,
    pub stream: String,
}

impl DestinationIdentity {
    #[must_use]
    pub fn new(group: &str, stream: &str) -> Self {
        DestinationIdentity {
            group: group.to_string(),
            stream: stream.to_string(),
        }
    }
}

impl fmt::Display for DestinationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.stream)
    }
}

/// Opaque token issued by the service. The empty token means nothing has
/// been appended to the stream yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SequenceToken(String);

impl SequenceToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        SequenceToken(token.into())
    }

    #[must_use]
    pub fn empty() -> Self {
        SequenceToken(String::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `None` for the empty token, which must be left out of the request.
    #[must_use]
    pub fn as_request_field(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.0.clone())
    }
}

impl fmt::Display for SequenceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SequenceToken {
    fn from(token: &str) -> Self {
        SequenceToken::new(token)
    }
}

pub type TokenSlot = Arc<TokioMutex<SequenceToken>>;

/// Maps each destination to its current sequence token.
///
/// Each destination gets its own async lock. Holding it across an append
/// keeps appends to one stream strictly ordered while other streams proceed
/// independently. Entries are never evicted.
#[derive(Debug, Default)]
pub struct SequenceRegistry {
    slots: Mutex<HashMap<DestinationIdentity, TokenSlot>>,
}

impl SequenceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `identity`'s token, created empty on first use.
    #[must_use]
    pub fn entry(&self, identity: &DestinationIdentity) -> TokenSlot {
        let mut slots = match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(
            slots
                .entry(identity.clone())
                .or_insert_with(|| Arc::new(TokioMutex::new(SequenceToken::empty()))),
        )
    }

    pub async fn get(&self, identity: &DestinationIdentity) -> SequenceToken {
        self.entry(identity).lock().await.clone()
    }

    pub async fn set(&self, identity: &DestinationIdentity, token: SequenceToken) {
        *self.entry(identity).lock().await = token;
    }

    /// Records `token` only when nothing is known for `identity` yet.
    /// Returns whether the token was taken.
    pub async fn seed(&self, identity: &DestinationIdentity, token: SequenceToken) -> bool {
        if token.is_empty() {
            return false;
        }
        let slot = self.entry(identity);
        let mut current = slot.lock().await;
        if current.is_empty() {
            *current = token;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self.slots.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
