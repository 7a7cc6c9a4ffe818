use serde::{Deserialize, Serialize};

use super::character::Character;
use super::quest::Quest;
use super::terrain::Grid;

/// One generated scenario: the map, its inhabitants, and their quests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub grid: Grid,
    pub characters: Vec<Character>,
    pub quests: Vec<Quest>,
}

impl Scenario {
    /// Returns true if a character with this name exists.
    pub fn has_character(&self, name: &str) -> bool {
        self.characters.iter().any(|c| c.name == name)
    }

    /// Quests handed out by the named character.
    pub fn quests_from<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Quest> + 'a {
        self.quests.iter().filter(move |q| q.quest_giver == name)
    }

    /// Serialize the scenario as pretty-printed RON.
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}
