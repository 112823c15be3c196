//! Handle registry for live tag connections.

use std::collections::HashMap;

use tagbridge_core::types::{TagFamily, TagHandle};
use tagbridge_hardware::tags::{
    AnyFeliCaTag, AnyIso7816Tag, AnyIso15693Tag, AnyMiFareTag, TagConnection,
};

/// Maps opaque handles to live tag connections.
///
/// The registry is the only holder of tag connections after detection.
/// Handles are generated here, never accepted from outside, so a lookup
/// miss means the tag's session has ended or the caller guessed. Typed
/// lookups also return `None` when the handle resolves to a different
/// technology family; callers cannot tell the two cases apart.
///
/// In-memory only. The session manager inserts and clears; the command
/// dispatcher reads.
#[derive(Debug, Default)]
pub struct TagRegistry {
    tags: HashMap<TagHandle, TagConnection>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under a freshly generated handle.
    pub fn insert(&mut self, tag: TagConnection) -> TagHandle {
        let handle = TagHandle::generate();
        tracing::debug!(handle = %handle, family = %tag.family(), "tag registered");
        self.tags.insert(handle.clone(), tag);
        handle
    }

    /// Look up a connection regardless of technology family.
    pub fn get_mut(&mut self, handle: &TagHandle) -> Option<&mut TagConnection> {
        self.tags.get_mut(handle)
    }

    /// Look up a MiFare connection.
    pub fn mifare_mut(&mut self, handle: &TagHandle) -> Option<&mut AnyMiFareTag> {
        match self.tags.get_mut(handle) {
            Some(TagConnection::MiFare(tag)) => Some(tag),
            _ => None,
        }
    }

    /// Look up an ISO 15693 connection.
    pub fn iso15693_mut(&mut self, handle: &TagHandle) -> Option<&mut AnyIso15693Tag> {
        match self.tags.get_mut(handle) {
            Some(TagConnection::Iso15693(tag)) => Some(tag),
            _ => None,
        }
    }

    /// Look up an ISO 7816 connection.
    pub fn iso7816_mut(&mut self, handle: &TagHandle) -> Option<&mut AnyIso7816Tag> {
        match self.tags.get_mut(handle) {
            Some(TagConnection::Iso7816(tag)) => Some(tag),
            _ => None,
        }
    }

    /// Look up a FeliCa connection.
    pub fn felica_mut(&mut self, handle: &TagHandle) -> Option<&mut AnyFeliCaTag> {
        match self.tags.get_mut(handle) {
            Some(TagConnection::FeliCa(tag)) => Some(tag),
            _ => None,
        }
    }

    /// Drop every registered connection. Outstanding handles become stale.
    pub fn clear(&mut self) {
        if !self.tags.is_empty() {
            tracing::debug!(count = self.tags.len(), "tag registry cleared");
        }
        self.tags.clear();
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Family of the tag behind a handle, if registered.
    pub fn family(&self, handle: &TagHandle) -> Option<TagFamily> {
        self.tags.get(handle).map(TagConnection::family)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagbridge_core::types::MiFareFamily;
    use tagbridge_hardware::mock::{MockFeliCaTag, MockMiFareTag};

    fn mifare() -> TagConnection {
        let tag = MockMiFareTag::new(MiFareFamily::Ultralight, vec![0x04; 4]);
        TagConnection::MiFare(AnyMiFareTag::Mock(tag))
    }

    fn felica() -> TagConnection {
        let tag = MockFeliCaTag::new(vec![0x88, 0xB4], vec![0x01; 8]);
        TagConnection::FeliCa(AnyFeliCaTag::Mock(tag))
    }

    #[test]
    fn insert_generates_distinct_handles() {
        let mut registry = TagRegistry::new();
        let a = registry.insert(mifare());
        let b = registry.insert(mifare());
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn typed_lookup_hides_family_mismatch() {
        let mut registry = TagRegistry::new();
        let handle = registry.insert(felica());

        assert!(registry.felica_mut(&handle).is_some());
        // Wrong family looks identical to an unknown handle
        assert!(registry.mifare_mut(&handle).is_none());
        assert!(registry.mifare_mut(&TagHandle::generate()).is_none());
    }

    #[test]
    fn clear_invalidates_outstanding_handles() {
        let mut registry = TagRegistry::new();
        let handle = registry.insert(mifare());

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.get_mut(&handle).is_none());
    }
}
