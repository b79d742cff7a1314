//! Key reservations: client claims on named input keys.
//!
//! Exclusivity rule: for any key, either one exclusive reservation exists
//! and nothing else, or any number of shared reservations exist. Requests
//! violating this are refused; nothing is partially granted.

use crate::ClientKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyReservation {
    pub key: String,
    pub exclusive: bool,
    pub client: ClientKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReserveError {
    #[error("key is reserved exclusively by another client")]
    HeldExclusively,
    #[error("key already has shared reservations")]
    SharedExists,
}

#[derive(Default)]
pub struct KeyTable {
    entries: Vec<KeyReservation>,
}

impl KeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a reservation, or explain why it cannot be granted. A client
    /// re-reserving its own key is a no-op success (the mode is unchanged).
    pub fn reserve(
        &mut self,
        key: &str,
        exclusive: bool,
        client: ClientKey,
    ) -> Result<(), ReserveError> {
        if self
            .entries
            .iter()
            .any(|r| r.key == key && r.client == client)
        {
            return Ok(());
        }
        let existing = self.entries.iter().filter(|r| r.key == key);
        for r in existing {
            if r.exclusive {
                return Err(ReserveError::HeldExclusively);
            }
            if exclusive {
                return Err(ReserveError::SharedExists);
            }
        }
        tracing::debug!(target: "input", key, exclusive, "key reserved");
        self.entries.push(KeyReservation {
            key: key.to_string(),
            exclusive,
            client,
        });
        Ok(())
    }

    /// Drop one client's reservation of one key. Returns whether anything
    /// was released.
    pub fn release(&mut self, key: &str, client: ClientKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|r| !(r.key == key && r.client == client));
        before != self.entries.len()
    }

    /// Drop everything a client holds (client teardown).
    pub fn release_client(&mut self, client: ClientKey) {
        self.entries.retain(|r| r.client != client);
    }

    /// Reservations for a key, in grant order.
    pub fn holders(&self, key: &str) -> impl Iterator<Item = &KeyReservation> + '_ {
        let key = key.to_string();
        self.entries.iter().filter(move |r| r.key == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check the exclusivity invariant over the whole table (test support).
    pub fn invariant_holds(&self) -> bool {
        for r in &self.entries {
            if r.exclusive {
                let others = self
                    .entries
                    .iter()
                    .filter(|o| o.key == r.key)
                    .count();
                if others != 1 {
                    return false;
                }
            }
        }
        true
    }
}
