use crate::battle::calculators::{
    calculate_normal_damage, calculate_special_damage, effectiveness_multiplier,
};
use crate::battle::state::{
    AttackKind, BattleEvent, BattleOutcome, BattlePhase, BattleState, Combatant, EndReason,
};
use crate::errors::{BattleError, BattleResult};
use rand::Rng;

/// Move the battle out of `AwaitingCombatants`: elect the first attacker by
/// comparing active-creature Speed (strictly higher goes first, exact tie is
/// a coin toss), or resolve immediately with no contest when a side has
/// nothing to send out. No damage is computed on the no-contest path.
pub fn begin_battle<R: Rng + ?Sized>(state: &mut BattleState, rng: &mut R) -> Vec<BattleEvent> {
    if state.phase != BattlePhase::AwaitingCombatants {
        return Vec::new();
    }

    let speeds = match (state.sides[0].active(), state.sides[1].active()) {
        (Some(a), Some(b)) => (a.speed(), b.speed()),
        _ => {
            let outcome = no_contest_outcome(&state.sides);
            state.phase = BattlePhase::Resolved(outcome);
            return vec![BattleEvent::BattleEnded {
                outcome,
                reason: EndReason::NoCombatants,
            }];
        }
    };

    let (first_attacker, speed_tie) = if speeds.0 > speeds.1 {
        (0, false)
    } else if speeds.1 > speeds.0 {
        (1, false)
    } else if rng.random_bool(0.5) {
        (0, true)
    } else {
        (1, true)
    };

    state.phase = BattlePhase::Turn {
        attacker: first_attacker,
    };
    state.turn_number = 1;

    vec![BattleEvent::BattleStarted {
        first_attacker,
        speed_tie,
    }]
}

// One side empty means the other wins by default; both empty is no contest.
fn no_contest_outcome(sides: &[Combatant; 2]) -> BattleOutcome {
    match (sides[0].is_exhausted(), sides[1].is_exhausted()) {
        (true, false) => BattleOutcome::Winner(1),
        (false, true) => BattleOutcome::Winner(0),
        _ => BattleOutcome::NoContest,
    }
}

/// Execute one attack for `side`. Damage is subtracted from the defender's
/// active creature; a faint removes it from its team, and an emptied team
/// resolves the battle on the spot. In every other case the turn flips to
/// the defending side; a faint ends the turn and never grants the
/// replacement a retaliation within it.
pub fn execute_attack(
    state: &mut BattleState,
    side: usize,
    kind: AttackKind,
) -> BattleResult<Vec<BattleEvent>> {
    if side >= 2 {
        return Err(BattleError::InvalidSide(side));
    }
    match state.phase {
        BattlePhase::Turn { attacker } if attacker == side => {}
        BattlePhase::Turn { .. } => return Err(BattleError::NotYourTurn(side)),
        _ => return Err(BattleError::NotInProgress),
    }

    let defender_side = BattleState::opponent_of(side);

    let (attacker_name, damage, effectiveness) = {
        let attacker = state.sides[side]
            .active()
            .ok_or(BattleError::NotInProgress)?;
        let defender = state.sides[defender_side]
            .active()
            .ok_or(BattleError::NotInProgress)?;

        let damage = match kind {
            AttackKind::Normal => calculate_normal_damage(attacker, defender),
            AttackKind::Special => calculate_special_damage(attacker, defender),
        };
        let effectiveness = match kind {
            AttackKind::Normal => 1.0,
            AttackKind::Special => effectiveness_multiplier(attacker, defender),
        };

        (attacker.name().to_string(), damage, effectiveness)
    };

    let mut events = Vec::new();

    let (defender_name, remaining_hp, fainted) = {
        let defender = state.sides[defender_side]
            .active_mut()
            .ok_or(BattleError::NotInProgress)?;
        let remaining = defender.take_damage(damage);
        (defender.name().to_string(), remaining, defender.is_fainted())
    };

    events.push(BattleEvent::AttackLanded {
        attacker: side,
        attacker_name,
        defender_name: defender_name.clone(),
        kind,
        damage,
        remaining_hp,
        effectiveness,
    });

    if fainted {
        state.sides[defender_side].team.pop_front();
        events.push(BattleEvent::PokemonFainted {
            side: defender_side,
            name: defender_name,
        });

        if state.sides[defender_side].is_exhausted() {
            let outcome = BattleOutcome::Winner(side);
            state.phase = BattlePhase::Resolved(outcome);
            events.push(BattleEvent::BattleEnded {
                outcome,
                reason: EndReason::TeamExhausted,
            });
            return Ok(events);
        }
    }

    state.phase = BattlePhase::Turn {
        attacker: defender_side,
    };
    state.turn_number += 1;

    Ok(events)
}

/// Resolve the battle in favor of the remaining side, used when a combatant
/// disconnects mid-battle. A no-op on an already-resolved battle.
pub fn forfeit(state: &mut BattleState, side: usize) -> Vec<BattleEvent> {
    if state.is_resolved() || side >= 2 {
        return Vec::new();
    }

    let outcome = BattleOutcome::Winner(BattleState::opponent_of(side));
    state.phase = BattlePhase::Resolved(outcome);

    vec![BattleEvent::BattleEnded {
        outcome,
        reason: EndReason::Forfeit,
    }]
}
