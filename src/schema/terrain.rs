use serde::{Deserialize, Serialize};
use std::fmt;

/// Terrain label for a single map cell.
///
/// Purely cosmetic: nothing in the generator reads terrain back, and
/// characters or quests may sit on any cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Forest,
    Mountain,
    Desert,
    Plains,
    Lake,
}

impl Terrain {
    /// Every terrain label, in display order.
    pub const ALL: [Terrain; 5] = [
        Self::Forest,
        Self::Mountain,
        Self::Desert,
        Self::Plains,
        Self::Lake,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Forest => "Forest",
            Self::Mountain => "Mountain",
            Self::Desert => "Desert",
            Self::Plains => "Plains",
            Self::Lake => "Lake",
        }
    }
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A square matrix of terrain cells, stored row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: Vec<Vec<Terrain>>,
}

impl Grid {
    /// Side length of the grid (0 for an empty grid).
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render one row as space-joined labels, e.g. `"Forest Lake Desert"`.
    pub fn row_line(row: &[Terrain]) -> String {
        row.iter()
            .map(Terrain::label)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
