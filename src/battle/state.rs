use crate::pokemon::PokemonInst;
use std::collections::VecDeque;

/// The two attack kinds a combatant can select on its turn. Parsed from the
/// numeric selector the client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackKind {
    Normal,
    Special,
}

impl AttackKind {
    /// Parse the wire selector: `1` = normal, `2` = special. Anything else
    /// is invalid input and re-prompts without advancing the battle.
    pub fn parse(token: &str) -> Option<AttackKind> {
        match token.trim() {
            "1" => Some(AttackKind::Normal),
            "2" => Some(AttackKind::Special),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    Winner(usize),
    NoContest,
}

/// Why the battle resolved; drives the end-of-battle messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    TeamExhausted,
    Forfeit,
    NoCombatants,
}

/// Battle lifecycle. `Turn::attacker` indexes into `BattleState::sides`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattlePhase {
    AwaitingCombatants,
    Turn { attacker: usize },
    Resolved(BattleOutcome),
}

/// One side of a battle: a label for messages and an ordered team whose
/// front creature is active. A wild encounter is a combatant with a
/// one-creature team.
#[derive(Debug, Clone)]
pub struct Combatant {
    pub label: String,
    pub team: VecDeque<PokemonInst>,
}

impl Combatant {
    pub fn new(label: String, team: Vec<PokemonInst>) -> Self {
        Combatant {
            label,
            team: team.into(),
        }
    }

    /// The creature currently fighting for this side.
    pub fn active(&self) -> Option<&PokemonInst> {
        self.team.front()
    }

    pub fn active_mut(&mut self) -> Option<&mut PokemonInst> {
        self.team.front_mut()
    }

    pub fn is_exhausted(&self) -> bool {
        self.team.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct BattleState {
    pub battle_id: String,
    pub sides: [Combatant; 2],
    pub phase: BattlePhase,
    pub turn_number: u32,
}

impl BattleState {
    pub fn new(battle_id: String, side_a: Combatant, side_b: Combatant) -> Self {
        BattleState {
            battle_id,
            sides: [side_a, side_b],
            phase: BattlePhase::AwaitingCombatants,
            turn_number: 0,
        }
    }

    pub fn opponent_of(side: usize) -> usize {
        1 - side
    }

    /// The side that owns the current turn, if the battle is in progress.
    pub fn current_attacker(&self) -> Option<usize> {
        match self.phase {
            BattlePhase::Turn { attacker } => Some(attacker),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<BattleOutcome> {
        match self.phase {
            BattlePhase::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.phase, BattlePhase::Resolved(_))
    }

    /// Drain a side's remaining team, for handing survivors back to their
    /// owner once the battle has resolved.
    pub fn take_team(&mut self, side: usize) -> Vec<PokemonInst> {
        self.sides[side].team.drain(..).collect()
    }
}

/// Everything observable that happens inside a battle. The transport formats
/// each event once per viewer, so messages can differ between the two sides.
#[derive(Debug, Clone, PartialEq)]
pub enum BattleEvent {
    BattleStarted {
        first_attacker: usize,
        speed_tie: bool,
    },
    AttackLanded {
        attacker: usize,
        attacker_name: String,
        defender_name: String,
        kind: AttackKind,
        damage: u16,
        remaining_hp: u16,
        effectiveness: f64,
    },
    PokemonFainted {
        side: usize,
        name: String,
    },
    BattleEnded {
        outcome: BattleOutcome,
        reason: EndReason,
    },
}

impl BattleEvent {
    /// Format the event as the given side should see it.
    pub fn format(&self, viewer: usize) -> String {
        match self {
            BattleEvent::BattleStarted {
                first_attacker,
                speed_tie,
            } => match (*first_attacker == viewer, *speed_tie) {
                (true, false) => "Your pokemon is faster, you go first!".to_string(),
                (false, false) => "Opponent's pokemon is faster. They go first!".to_string(),
                (true, true) => "Speed tie! You won the toss and go first!".to_string(),
                (false, true) => "Speed tie! Opponent won the toss and goes first!".to_string(),
            },
            BattleEvent::AttackLanded {
                attacker_name,
                defender_name,
                kind,
                damage,
                remaining_hp,
                effectiveness,
                ..
            } => {
                let mut line = format!(
                    "{} attacks {} for {} damage! ({} HP left)",
                    attacker_name, defender_name, damage, remaining_hp
                );
                if *kind == AttackKind::Special {
                    if *effectiveness > 1.0 {
                        line.push_str(" It's super effective!");
                    } else if *effectiveness < 1.0 {
                        line.push_str(" It's not very effective...");
                    }
                }
                line
            }
            BattleEvent::PokemonFainted { name, .. } => format!("{} fainted!", name),
            BattleEvent::BattleEnded { outcome, reason } => match (outcome, reason) {
                (BattleOutcome::Winner(winner), EndReason::TeamExhausted) => {
                    if *winner == viewer {
                        "All opponent's pokemon have fainted. You win!".to_string()
                    } else {
                        "All your pokemon have fainted. You lose!".to_string()
                    }
                }
                (BattleOutcome::Winner(winner), EndReason::Forfeit) => {
                    if *winner == viewer {
                        "Opponent left the battle. You win!".to_string()
                    } else {
                        "You left the battle. You lose!".to_string()
                    }
                }
                (BattleOutcome::Winner(winner), EndReason::NoCombatants) => {
                    if *winner == viewer {
                        "Opponent has no pokemon to battle with. You win by default!".to_string()
                    } else {
                        "You have no pokemon to battle with. You lose by default!".to_string()
                    }
                }
                (BattleOutcome::NoContest, _) => {
                    "Neither side has a pokemon able to battle. No contest.".to_string()
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::calculators::effectiveness_multiplier;
    use crate::pokedex::PokemonTemplate;
    use crate::type_chart::PokemonType;
    use pretty_assertions::assert_eq;

    fn one_creature_team(name: &str) -> Vec<PokemonInst> {
        let template =
            PokemonTemplate::new_for_test(name, vec![PokemonType::Normal], 20, 10, 5, 50, 10, 5);
        vec![PokemonInst::new_for_test(&template)]
    }

    #[test]
    fn attack_kind_parses_wire_selectors() {
        assert_eq!(AttackKind::parse("1"), Some(AttackKind::Normal));
        assert_eq!(AttackKind::parse(" 2 "), Some(AttackKind::Special));
        assert_eq!(AttackKind::parse("3"), None);
        assert_eq!(AttackKind::parse("special"), None);
    }

    #[test]
    fn active_is_team_front() {
        let combatant = Combatant::new("p1".to_string(), one_creature_team("rattata"));
        assert_eq!(combatant.active().map(|p| p.name()), Some("rattata"));
        assert!(!combatant.is_exhausted());
    }

    #[test]
    fn new_battle_awaits_combatants() {
        let state = BattleState::new(
            "b1".to_string(),
            Combatant::new("p1".to_string(), one_creature_team("a")),
            Combatant::new("p2".to_string(), one_creature_team("b")),
        );
        assert_eq!(state.phase, BattlePhase::AwaitingCombatants);
        assert_eq!(state.current_attacker(), None);
        assert_eq!(state.outcome(), None);
    }

    #[test]
    fn end_messages_depend_on_viewer() {
        let event = BattleEvent::BattleEnded {
            outcome: BattleOutcome::Winner(0),
            reason: EndReason::TeamExhausted,
        };
        assert_eq!(event.format(0), "All opponent's pokemon have fainted. You win!");
        assert_eq!(event.format(1), "All your pokemon have fainted. You lose!");
    }

    #[test]
    fn super_effective_suffix_only_for_special_attacks() {
        let template_a =
            PokemonTemplate::new_for_test("fire", vec![PokemonType::Fire], 20, 10, 5, 50, 10, 5);
        let template_b =
            PokemonTemplate::new_for_test("grass", vec![PokemonType::Grass], 20, 10, 5, 50, 10, 5);
        let a = PokemonInst::new_for_test(&template_a);
        let b = PokemonInst::new_for_test(&template_b);
        let effectiveness = effectiveness_multiplier(&a, &b);

        let special = BattleEvent::AttackLanded {
            attacker: 0,
            attacker_name: "fire".to_string(),
            defender_name: "grass".to_string(),
            kind: AttackKind::Special,
            damage: 15,
            remaining_hp: 5,
            effectiveness,
        };
        assert!(special.format(0).ends_with("It's super effective!"));

        let normal = BattleEvent::AttackLanded {
            attacker: 0,
            attacker_name: "fire".to_string(),
            defender_name: "grass".to_string(),
            kind: AttackKind::Normal,
            damage: 5,
            remaining_hp: 15,
            effectiveness: 1.0,
        };
        assert!(normal.format(0).ends_with("HP left)"));
    }
}
