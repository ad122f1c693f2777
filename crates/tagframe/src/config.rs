//! Runtime options for a serialization [`Context`](crate::Context).

use crate::limits::{
    DEFAULT_MAX_BINARY_LEN, DEFAULT_MAX_COLLECTION_LEN, DEFAULT_MAX_DEPTH, DEFAULT_MAX_IDENTIFIER,
    DEFAULT_MAX_STRING_LEN, DEFAULT_MIN_IDENTIFIER,
};

/// Options controlling identifier registration and decode limits.
///
/// ```rust
/// use tagframe::Options;
///
/// let options = Options::default()
///     .identifier_range(1_000, 2_000)
///     .max_depth(16);
/// assert_eq!(options.min_identifier, 1_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Lowest valid type identifier (inclusive).
    pub min_identifier: i16,
    /// Upper bound for type identifiers (exclusive).
    pub max_identifier: i16,
    /// Maximum nesting of objects and collections.
    pub max_depth: usize,
    /// Maximum UTF-8 length of a decoded string.
    pub max_string_len: usize,
    /// Maximum length of a decoded binary blob.
    pub max_binary_len: usize,
    /// Maximum element count of a decoded collection or map.
    pub max_collection_len: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            min_identifier: DEFAULT_MIN_IDENTIFIER,
            max_identifier: DEFAULT_MAX_IDENTIFIER,
            max_depth: DEFAULT_MAX_DEPTH,
            max_string_len: DEFAULT_MAX_STRING_LEN,
            max_binary_len: DEFAULT_MAX_BINARY_LEN,
            max_collection_len: DEFAULT_MAX_COLLECTION_LEN,
        }
    }
}

impl Options {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the valid identifier window `[min, max)`.
    pub fn identifier_range(mut self, min: i16, max: i16) -> Self {
        self.min_identifier = min;
        self.max_identifier = max;
        self
    }

    /// Sets the maximum nesting depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the maximum decoded string length.
    pub fn max_string_len(mut self, len: usize) -> Self {
        self.max_string_len = len;
        self
    }

    /// Sets the maximum decoded binary length.
    pub fn max_binary_len(mut self, len: usize) -> Self {
        self.max_binary_len = len;
        self
    }

    /// Sets the maximum decoded collection length.
    pub fn max_collection_len(mut self, len: usize) -> Self {
        self.max_collection_len = len;
        self
    }

    /// Returns true if `identifier` lies inside the configured window.
    pub fn accepts_identifier(&self, identifier: i32) -> bool {
        identifier >= self.min_identifier as i32 && identifier < self.max_identifier as i32
    }
}
