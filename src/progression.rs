//! Lifetime progression: cumulative score and cosmetic unlocks
//!
//! The core only computes; an external collaborator persists the snapshot
//! wherever it likes (the whole struct serializes to JSON). Unlocks are
//! keyed off cumulative lifetime score reported at game over.

use serde::{Deserialize, Serialize};

/// One unlockable cosmetic skin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Lifetime score required
    pub required: u64,
}

/// Unlock table, in ascending requirement order
pub const UNLOCKS: &[UnlockDef] = &[
    UnlockDef {
        id: "default",
        name: "Standard Issue",
        description: "Regulation materials.",
        required: 0,
    },
    UnlockDef {
        id: "neon",
        name: "Cyber Neon",
        description: "Glow in the dark.",
        required: 2000,
    },
    UnlockDef {
        id: "gold",
        name: "Midas Touch",
        description: "Solid gold everything.",
        required: 10_000,
    },
    UnlockDef {
        id: "matrix",
        name: "The Code",
        description: "See the simulation.",
        required: 25_000,
    },
];

/// Persistent progression snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progression {
    pub lifetime_score: u64,
    pub high_score: u64,
    pub unlocked: Vec<String>,
    pub active_skin: String,
}

impl Default for Progression {
    fn default() -> Self {
        Self::new()
    }
}

impl Progression {
    pub fn new() -> Self {
        Self {
            lifetime_score: 0,
            high_score: 0,
            unlocked: vec!["default".to_string()],
            active_skin: "default".to_string(),
        }
    }

    /// Fold one finished run into the lifetime totals. Returns any skins
    /// newly unlocked by the updated lifetime score.
    pub fn register_game_end(&mut self, final_score: u64) -> Vec<&'static UnlockDef> {
        self.lifetime_score += final_score;
        if final_score > self.high_score {
            self.high_score = final_score;
        }

        let mut newly_unlocked = Vec::new();
        for def in UNLOCKS {
            if self.lifetime_score >= def.required && !self.unlocked.iter().any(|u| u == def.id) {
                self.unlocked.push(def.id.to_string());
                newly_unlocked.push(def);
            }
        }
        if !newly_unlocked.is_empty() {
            log::info!(
                "unlocked {} new skin(s) at {} lifetime points",
                newly_unlocked.len(),
                self.lifetime_score
            );
        }
        newly_unlocked
    }

    /// Switch the active skin; only unlocked ids are accepted.
    pub fn set_active_skin(&mut self, id: &str) -> bool {
        if self.unlocked.iter().any(|u| u == id) {
            self.active_skin = id.to_string();
            true
        } else {
            false
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_skin_unlocked() {
        let progression = Progression::new();
        assert_eq!(progression.unlocked, vec!["default"]);
        assert_eq!(progression.active_skin, "default");
    }

    #[test]
    fn test_unlocks_accumulate_across_runs() {
        let mut progression = Progression::new();

        let unlocked = progression.register_game_end(1500);
        assert!(unlocked.is_empty());

        // Crosses the 2000 threshold cumulatively
        let unlocked = progression.register_game_end(800);
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].id, "neon");
        assert_eq!(progression.lifetime_score, 2300);

        // One big run can unlock several tiers at once
        let unlocked = progression.register_game_end(40_000);
        let ids: Vec<_> = unlocked.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec!["gold", "matrix"]);
        assert_eq!(progression.high_score, 40_000);
    }

    #[test]
    fn test_active_skin_requires_unlock() {
        let mut progression = Progression::new();
        assert!(!progression.set_active_skin("gold"));
        progression.register_game_end(10_000);
        assert!(progression.set_active_skin("gold"));
        assert_eq!(progression.active_skin, "gold");
    }

    #[test]
    fn test_snapshot_round_trips() {
        let mut progression = Progression::new();
        progression.register_game_end(2500);
        let json = progression.to_json().unwrap();
        let restored = Progression::from_json(&json).unwrap();
        assert_eq!(restored.lifetime_score, 2500);
        assert!(restored.unlocked.iter().any(|u| u == "neon"));
    }
}
