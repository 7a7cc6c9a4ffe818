use serde::{Deserialize, Serialize};
use std::fmt;

use super::character::Location;

/// The fixed set of quest objectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Objective {
    FindLostArtifact,
    DefeatMonster,
    EscortMerchant,
    ExploreRuins,
    DeliverMessage,
}

impl Objective {
    pub const ALL: [Objective; 5] = [
        Self::FindLostArtifact,
        Self::DefeatMonster,
        Self::EscortMerchant,
        Self::ExploreRuins,
        Self::DeliverMessage,
    ];

    /// Human-readable objective text as printed on the quest page.
    pub fn text(&self) -> &'static str {
        match self {
            Self::FindLostArtifact => "Find the lost artifact",
            Self::DefeatMonster => "Defeat the monster",
            Self::EscortMerchant => "Escort the merchant",
            Self::ExploreRuins => "Explore the ancient ruins",
            Self::DeliverMessage => "Deliver a secret message",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// A quest handed out by one of the generated characters.
///
/// `quest_giver` is a copy of the character's name, not a link: the same
/// character may hand out any number of quests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub quest_giver: String,
    pub objective: Objective,
    pub location: Location,
    pub details: String,
}
