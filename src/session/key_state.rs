// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::crypto::SymmetricKey;

/// Current key plus the key being negotiated, if any
///
/// Only ever accessed under the engine's key lock, together with the
/// encrypt/decrypt call that uses it.
#[derive(Debug)]
pub struct KeyState {
    current: SymmetricKey,
    next: Option<SymmetricKey>,
}

impl KeyState {
    pub fn new(initial: SymmetricKey) -> Self {
        Self {
            current: initial,
            next: None,
        }
    }

    /// Key used for every encryption and decryption right now
    pub fn current(&self) -> &SymmetricKey {
        &self.current
    }

    #[cfg(test)]
    fn next(&self) -> Option<&SymmetricKey> {
        self.next.as_ref()
    }

    pub fn is_rotating(&self) -> bool {
        self.next.is_some()
    }

    pub fn begin_rotation(&mut self, next: SymmetricKey) {
        self.next = Some(next);
    }

    /// Drop the proposed key, keeping the current one
    pub fn abort_rotation(&mut self) -> Option<SymmetricKey> {
        self.next.take()
    }

    /// Promote `new_key`, or the pending key when `None`, to current.
    ///
    /// Any pending key is discarded. Returns `false` when there was nothing
    /// to promote.
    pub fn swap(&mut self, new_key: Option<SymmetricKey>) -> bool {
        match new_key.or(self.next) {
            Some(key) => {
                self.current = key;
                self.next = None;
                true
            }
            None => false,
        }
    }
}
