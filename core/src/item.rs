//! The unit of transfer between producers and consumers.

use std::fmt;
use uuid::Uuid;

/// Size of an item token on the wire
pub const ITEM_TOKEN_LEN: usize = 16;

/// An immutable value identified by a random 128-bit token.
///
/// The broker never inspects an item beyond moving it from a producer
/// connection, through the queue, to a consumer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Item {
    id: Uuid,
}

impl Item {
    /// Create an item with a freshly generated token
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    /// Rebuild an item from its wire token
    pub fn from_bytes(bytes: [u8; ITEM_TOKEN_LEN]) -> Self {
        Self {
            id: Uuid::from_bytes(bytes),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn as_bytes(&self) -> &[u8; ITEM_TOKEN_LEN] {
        self.id.as_bytes()
    }
}

impl Default for Item {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Item [{}]", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_items_are_unique() {
        let ids: HashSet<Item> = (0..1000).map(|_| Item::new()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_equality_follows_token() {
        let item = Item::new();
        let copy = Item::from_bytes(*item.as_bytes());
        assert_eq!(item, copy);
        assert_ne!(item, Item::new());
    }

    #[test]
    fn test_display() {
        let item = Item::from_bytes([0u8; ITEM_TOKEN_LEN]);
        assert_eq!(
            item.to_string(),
            "Item [00000000-0000-0000-0000-000000000000]"
        );
    }
}
