//! The immutable, size-reporting payload stored in the cache.

use std::fmt;
use std::sync::Arc;

/// An immutable byte sequence cached on behalf of a group.
///
/// Backed by `Arc<[u8]>` so that handing a copy to a caller, or moving a
/// cache entry to the front of the LRU list, never re-copies the underlying
/// bytes; the only real copy happens once, on ingress from a `Getter` or a
/// peer response, per the defensive-cloning rule in the core design.
#[derive(Clone, Eq, PartialEq)]
pub struct ByteView {
    bytes: Arc<[u8]>,
}

impl ByteView {
    /// Takes ownership of `bytes` without copying.
    ///
    /// Use this when the caller already holds a uniquely-owned buffer (e.g.
    /// freshly read off the wire) and no other reference can mutate it.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        ByteView {
            bytes: Arc::from(bytes.into_boxed_slice()),
        }
    }

    /// Copies `bytes` into a new, independently-owned view.
    ///
    /// This is the defensive copy referenced throughout the core design:
    /// call it on data borrowed from a getter or peer response whose buffer
    /// the caller might later mutate.
    pub fn copy_from(bytes: &[u8]) -> Self {
        ByteView {
            bytes: Arc::from(bytes),
        }
    }

    /// Bytes occupied by this value, for LRU byte accounting.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// A read-only view of the underlying bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Convenience accessor for values that are known to be UTF-8, mirroring
    /// how most `Getter` implementations in practice store text.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(bytes: Vec<u8>) -> Self {
        ByteView::from_vec(bytes)
    }
}

impl From<&[u8]> for ByteView {
    fn from(bytes: &[u8]) -> Self {
        ByteView::copy_from(bytes)
    }
}

impl From<String> for ByteView {
    fn from(value: String) -> Self {
        ByteView::from_vec(value.into_bytes())
    }
}

impl From<&str> for ByteView {
    fn from(value: &str) -> Self {
        ByteView::copy_from(value.as_bytes())
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(text) => write!(f, "ByteView({text:?})"),
            None => write!(f, "ByteView({} bytes)", self.bytes.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_matches_byte_length() {
        let v = ByteView::from("630");
        assert_eq!(v.size(), 3);
        assert_eq!(v.bytes(), b"630");
    }

    #[test]
    fn copy_from_is_independent_of_the_source_buffer() {
        let mut source = vec![1u8, 2, 3];
        let view = ByteView::copy_from(&source);
        source[0] = 0xFF;
        assert_eq!(view.bytes(), &[1, 2, 3]);
    }

    #[test]
    fn clone_is_cheap_and_shares_storage() {
        let a = ByteView::from("hello");
        let b = a.clone();
        assert_eq!(a, b);
    }
}
