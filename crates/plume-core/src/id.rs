//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a transported chemical component.
///
/// Components are registered when the field store is created and assigned
/// sequential IDs. `ComponentId(n)` is the n-th registered component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u32);

impl ComponentId {
    /// The id as a slice index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ComponentId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_id_display_and_index() {
        let id = ComponentId::from(3);
        assert_eq!(id.to_string(), "3");
        assert_eq!(id.index(), 3);
        assert!(ComponentId(1) < ComponentId(2));
    }
}
