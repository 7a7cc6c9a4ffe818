use serde::{Deserialize, Serialize};
use std::fmt;

/// A `(row, col)` cell coordinate on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub row: usize,
    pub col: usize,
}

impl Location {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Returns true if both coordinates are below `size`.
    pub fn within(&self, size: usize) -> bool {
        self.row < size && self.col < size
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// What a character does in the village.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Villager,
    Merchant,
    Knight,
    Mage,
}

impl Role {
    pub const ALL: [Role; 4] = [Self::Villager, Self::Merchant, Self::Knight, Self::Mage];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Villager => "Villager",
            Self::Merchant => "Merchant",
            Self::Knight => "Knight",
            Self::Mage => "Mage",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A generated character. Immutable once the generation pass is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub role: Role,
    pub backstory: String,
    pub location: Location,
}
