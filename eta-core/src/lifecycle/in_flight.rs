use dashmap::DashSet;

use crate::models::DocumentKind;

type DocumentKey = (DocumentKind, String);

/// Set of documents with a lifecycle operation currently running.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    keys: DashSet<DocumentKey>,
}

/// Held for the duration of one operation; releases the document on drop.
#[derive(Debug)]
pub(crate) struct InFlightGuard<'a> {
    keys: &'a DashSet<DocumentKey>,
    key: DocumentKey,
}

impl InFlight {
    /// Claim `key`, or `None` if another operation already holds it.
    pub(crate) fn try_acquire(&self, key: DocumentKey) -> Option<InFlightGuard<'_>> {
        if self.keys.insert(key.clone()) {
            Some(InFlightGuard {
                keys: &self.keys,
                key,
            })
        } else {
            None
        }
    }

    pub(crate) fn contains(&self, key: &DocumentKey) -> bool {
        self.keys.contains(key)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.keys.remove(&self.key);
    }
}
