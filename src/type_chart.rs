use serde::{Deserialize, Serialize};
use std::fmt;

/// Elemental types as they appear in the roster file (lowercase on disk,
/// matching the upstream catalog format).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PokemonType {
    Normal,
    Fire,
    Water,
    Electric,
    Grass,
    Ice,
    Fighting,
    Poison,
    Ground,
    Flying,
    Psychic,
    Bug,
    Rock,
    Ghost,
    Dragon,
    Dark,
    Steel,
    Fairy,
}

impl fmt::Display for PokemonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Calculate the effectiveness multiplier for one attacking type against one
/// defending type. Any pairing without an entry in the chart is neutral.
/// Returns: 2.0 = Super Effective, 1.0 = Normal, 0.5 = Not Very Effective,
/// 0.0 = No Effect
pub fn type_effectiveness(attacking: PokemonType, defending: PokemonType) -> f64 {
    use PokemonType::*;

    match (attacking, defending) {
        // Normal
        (Normal, Rock) | (Normal, Steel) => 0.5,
        (Normal, Ghost) => 0.0,
        (Normal, _) => 1.0,

        // Fire
        (Fire, Fire) | (Fire, Water) | (Fire, Rock) | (Fire, Dragon) => 0.5,
        (Fire, Grass) | (Fire, Ice) | (Fire, Bug) | (Fire, Steel) => 2.0,
        (Fire, _) => 1.0,

        // Water
        (Water, Water) | (Water, Grass) | (Water, Dragon) => 0.5,
        (Water, Fire) | (Water, Ground) | (Water, Rock) => 2.0,
        (Water, _) => 1.0,

        // Electric
        (Electric, Electric) | (Electric, Grass) | (Electric, Dragon) => 0.5,
        (Electric, Ground) => 0.0,
        (Electric, Water) | (Electric, Flying) => 2.0,
        (Electric, _) => 1.0,

        // Grass
        (Grass, Fire)
        | (Grass, Grass)
        | (Grass, Poison)
        | (Grass, Flying)
        | (Grass, Bug)
        | (Grass, Dragon)
        | (Grass, Steel) => 0.5,
        (Grass, Water) | (Grass, Ground) | (Grass, Rock) => 2.0,
        (Grass, _) => 1.0,

        // Ice
        (Ice, Fire) | (Ice, Water) | (Ice, Ice) | (Ice, Steel) => 0.5,
        (Ice, Grass) | (Ice, Ground) | (Ice, Flying) | (Ice, Dragon) => 2.0,
        (Ice, _) => 1.0,

        // Fighting
        (Fighting, Poison)
        | (Fighting, Flying)
        | (Fighting, Psychic)
        | (Fighting, Bug)
        | (Fighting, Fairy) => 0.5,
        (Fighting, Ghost) => 0.0,
        (Fighting, Normal)
        | (Fighting, Ice)
        | (Fighting, Rock)
        | (Fighting, Dark)
        | (Fighting, Steel) => 2.0,
        (Fighting, _) => 1.0,

        // Poison
        (Poison, Poison) | (Poison, Ground) | (Poison, Rock) | (Poison, Ghost) => 0.5,
        (Poison, Steel) => 0.0,
        (Poison, Grass) | (Poison, Fairy) => 2.0,
        (Poison, _) => 1.0,

        // Ground
        (Ground, Grass) | (Ground, Bug) => 0.5,
        (Ground, Flying) => 0.0,
        (Ground, Fire) | (Ground, Electric) | (Ground, Poison) | (Ground, Rock)
        | (Ground, Steel) => 2.0,
        (Ground, _) => 1.0,

        // Flying
        (Flying, Electric) | (Flying, Rock) | (Flying, Steel) => 0.5,
        (Flying, Grass) | (Flying, Fighting) | (Flying, Bug) => 2.0,
        (Flying, _) => 1.0,

        // Psychic
        (Psychic, Psychic) | (Psychic, Steel) => 0.5,
        (Psychic, Dark) => 0.0,
        (Psychic, Fighting) | (Psychic, Poison) => 2.0,
        (Psychic, _) => 1.0,

        // Bug
        (Bug, Fire)
        | (Bug, Fighting)
        | (Bug, Poison)
        | (Bug, Flying)
        | (Bug, Ghost)
        | (Bug, Steel)
        | (Bug, Fairy) => 0.5,
        (Bug, Grass) | (Bug, Psychic) | (Bug, Dark) => 2.0,
        (Bug, _) => 1.0,

        // Rock
        (Rock, Fighting) | (Rock, Ground) | (Rock, Steel) => 0.5,
        (Rock, Fire) | (Rock, Ice) | (Rock, Flying) | (Rock, Bug) => 2.0,
        (Rock, _) => 1.0,

        // Ghost
        (Ghost, Normal) => 0.0,
        (Ghost, Dark) => 0.5,
        (Ghost, Psychic) | (Ghost, Ghost) => 2.0,
        (Ghost, _) => 1.0,

        // Dragon
        (Dragon, Steel) => 0.5,
        (Dragon, Fairy) => 0.0,
        (Dragon, Dragon) => 2.0,
        (Dragon, _) => 1.0,

        // Dark
        (Dark, Fighting) | (Dark, Dark) | (Dark, Fairy) => 0.5,
        (Dark, Psychic) | (Dark, Ghost) => 2.0,
        (Dark, _) => 1.0,

        // Steel
        (Steel, Fire) | (Steel, Water) | (Steel, Electric) | (Steel, Steel) => 0.5,
        (Steel, Ice) | (Steel, Rock) | (Steel, Fairy) => 2.0,
        (Steel, _) => 1.0,

        // Fairy
        (Fairy, Fire) | (Fairy, Poison) | (Fairy, Steel) => 0.5,
        (Fairy, Fighting) | (Fairy, Dragon) | (Fairy, Dark) => 2.0,
        (Fairy, _) => 1.0,
    }
}

/// Resolve effectiveness between multi-typed combatants: the maximum
/// multiplier over the cross product of attacker types and defender types.
/// Best matchup wins; multipliers do not stack. Typeless pairings are
/// neutral.
pub fn max_effectiveness(attacking: &[PokemonType], defending: &[PokemonType]) -> f64 {
    let mut best: Option<f64> = None;

    for &attack_type in attacking {
        for &defend_type in defending {
            let multiplier = type_effectiveness(attack_type, defend_type);
            best = Some(match best {
                Some(current) => current.max(multiplier),
                None => multiplier,
            });
        }
    }

    best.unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn absent_pair_defaults_to_neutral() {
        assert_eq!(type_effectiveness(PokemonType::Normal, PokemonType::Water), 1.0);
        assert_eq!(type_effectiveness(PokemonType::Ghost, PokemonType::Fire), 1.0);
    }

    #[test]
    fn chart_spot_checks() {
        assert_eq!(type_effectiveness(PokemonType::Fire, PokemonType::Grass), 2.0);
        assert_eq!(type_effectiveness(PokemonType::Water, PokemonType::Water), 0.5);
        assert_eq!(type_effectiveness(PokemonType::Electric, PokemonType::Ground), 0.0);
        assert_eq!(type_effectiveness(PokemonType::Dragon, PokemonType::Fairy), 0.0);
        assert_eq!(type_effectiveness(PokemonType::Steel, PokemonType::Fairy), 2.0);
    }

    #[test]
    fn multi_type_defender_takes_best_matchup() {
        // Fire vs Water is 0.5, Fire vs Grass is 2.0: best matchup wins.
        let result = max_effectiveness(
            &[PokemonType::Fire],
            &[PokemonType::Water, PokemonType::Grass],
        );
        assert_eq!(result, 2.0);
    }

    #[test]
    fn single_resisted_pair_stays_resisted() {
        let result = max_effectiveness(&[PokemonType::Fire], &[PokemonType::Water]);
        assert_eq!(result, 0.5);
    }

    #[test]
    fn empty_type_list_is_neutral() {
        assert_eq!(max_effectiveness(&[], &[PokemonType::Water]), 1.0);
        assert_eq!(max_effectiveness(&[PokemonType::Fire], &[]), 1.0);
    }
}
