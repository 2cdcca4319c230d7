//! Stat slots, base stats and nature modifiers.

use serde::{Deserialize, Serialize};

/// One of the six stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatSlot {
    Hp,
    Atk,
    Def,
    Spa,
    Spd,
    Spe,
}

impl StatSlot {
    pub const ALL: [StatSlot; 6] = [
        StatSlot::Hp,
        StatSlot::Atk,
        StatSlot::Def,
        StatSlot::Spa,
        StatSlot::Spd,
        StatSlot::Spe,
    ];

    /// Position of this stat's EV in a spread string.
    pub fn ev_index(self) -> usize {
        match self {
            StatSlot::Hp => 0,
            StatSlot::Atk => 1,
            StatSlot::Def => 2,
            StatSlot::Spa => 3,
            StatSlot::Spd => 4,
            StatSlot::Spe => 5,
        }
    }

    /// Natures that raise and lower this stat, in that order.
    fn modifiers(self) -> (&'static [&'static str], &'static [&'static str]) {
        match self {
            StatSlot::Hp => (&[], &[]),
            StatSlot::Atk => (
                &["Lonely", "Adamant", "Naughty", "Brave"],
                &["Bold", "Modest", "Calm", "Timid"],
            ),
            StatSlot::Def => (
                &["Bold", "Impish", "Lax", "Relaxed"],
                &["Lonely", "Mild", "Gentle", "Hasty"],
            ),
            StatSlot::Spa => (
                &["Modest", "Mild", "Rash", "Quiet"],
                &["Adamant", "Impish", "Careful", "Jolly"],
            ),
            StatSlot::Spd => (
                &["Calm", "Gentle", "Careful", "Sassy"],
                &["Naughty", "Lax", "Rash", "Naive"],
            ),
            StatSlot::Spe => (
                &["Timid", "Hasty", "Jolly", "Naive"],
                &["Brave", "Relaxed", "Quiet", "Sassy"],
            ),
        }
    }

    /// How `nature` affects this stat. Unknown natures are neutral.
    pub fn nature_effect(self, nature: &str) -> NatureEffect {
        let (up, down) = self.modifiers();
        if up.contains(&nature) {
            NatureEffect::Raises
        } else if down.contains(&nature) {
            NatureEffect::Lowers
        } else {
            NatureEffect::Neutral
        }
    }
}

impl std::fmt::Display for StatSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatSlot::Hp => write!(f, "hp"),
            StatSlot::Atk => write!(f, "atk"),
            StatSlot::Def => write!(f, "def"),
            StatSlot::Spa => write!(f, "spa"),
            StatSlot::Spd => write!(f, "spd"),
            StatSlot::Spe => write!(f, "spe"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NatureEffect {
    Raises,
    Lowers,
    Neutral,
}

impl NatureEffect {
    pub fn multiplier(self) -> f64 {
        match self {
            NatureEffect::Raises => 1.1,
            NatureEffect::Lowers => 0.9,
            NatureEffect::Neutral => 1.0,
        }
    }
}

/// Base stats for one species.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    pub hp: u32,
    pub atk: u32,
    pub def: u32,
    pub spa: u32,
    pub spd: u32,
    pub spe: u32,
}

impl BaseStats {
    pub fn get(&self, slot: StatSlot) -> u32 {
        match slot {
            StatSlot::Hp => self.hp,
            StatSlot::Atk => self.atk,
            StatSlot::Def => self.def,
            StatSlot::Spa => self.spa,
            StatSlot::Spd => self.spd,
            StatSlot::Spe => self.spe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NATURES: [&str; 25] = [
        "Hardy", "Lonely", "Brave", "Adamant", "Naughty", "Bold", "Docile", "Relaxed", "Impish",
        "Lax", "Timid", "Hasty", "Serious", "Jolly", "Naive", "Modest", "Mild", "Quiet",
        "Bashful", "Rash", "Calm", "Gentle", "Sassy", "Careful", "Quirky",
    ];

    #[test]
    fn test_each_stat_has_four_up_four_down() {
        for slot in StatSlot::ALL.into_iter().skip(1) {
            let up = NATURES
                .iter()
                .filter(|n| slot.nature_effect(n) == NatureEffect::Raises)
                .count();
            let down = NATURES
                .iter()
                .filter(|n| slot.nature_effect(n) == NatureEffect::Lowers)
                .count();
            assert_eq!((up, down), (4, 4), "slot {}", slot);
        }
    }

    #[test]
    fn test_hp_is_never_affected() {
        for nature in NATURES {
            assert_eq!(StatSlot::Hp.nature_effect(nature), NatureEffect::Neutral);
        }
    }

    #[test]
    fn test_known_natures() {
        assert_eq!(StatSlot::Spe.nature_effect("Timid"), NatureEffect::Raises);
        assert_eq!(StatSlot::Atk.nature_effect("Timid"), NatureEffect::Lowers);
        assert_eq!(StatSlot::Spa.nature_effect("Adamant"), NatureEffect::Lowers);
        assert_eq!(StatSlot::Spe.nature_effect("Serious"), NatureEffect::Neutral);
        assert_eq!(StatSlot::Spe.nature_effect("timid"), NatureEffect::Neutral);
    }

    #[test]
    fn test_base_stats_get() {
        let stats = BaseStats {
            hp: 55,
            atk: 55,
            def: 55,
            spa: 135,
            spd: 135,
            spe: 135,
        };
        assert_eq!(stats.get(StatSlot::Spa), 135);
        assert_eq!(stats.get(StatSlot::Hp), 55);
    }
}
