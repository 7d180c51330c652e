//! Cross-module scenarios: movement-driven capture with persistence and
//! despawn cancellation, and full battles driven to resolution.

use pokeworld::{
    begin_battle, execute_attack, resolve_move, AttackKind, BattleOutcome, BattlePhase,
    BattleState, Combatant, Coord, Direction, JsonRecordWriter, Pokedex, PokemonInst,
    PokemonTemplate, PokemonType, SessionManager, World, WorldConfig,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

fn creature(name: &str, hp: u16, attack: u16, defense: u16, speed: u16) -> PokemonInst {
    let template = PokemonTemplate::new_for_test(
        name,
        vec![PokemonType::Normal],
        hp,
        attack,
        defense,
        speed,
        attack,
        defense,
    );
    PokemonInst::new_for_test(&template)
}

fn single_cell_world() -> Arc<World> {
    let templates = vec![PokemonTemplate::new_for_test(
        "weedle",
        vec![PokemonType::Bug, PokemonType::Poison],
        40,
        35,
        30,
        50,
        20,
        20,
    )];
    let pokedex = Arc::new(Pokedex::new(templates).unwrap());
    let config = WorldConfig {
        width: 1,
        height: 1,
        ..WorldConfig::default()
    };
    Arc::new(World::new(config, pokedex))
}

#[test]
fn capture_through_movement_persists_and_cancels_despawn() {
    let world = single_cell_world();
    let manager = SessionManager::new(1, 1);
    let records_dir = tempfile::tempdir().unwrap();
    let records = JsonRecordWriter::new(records_dir.path().to_path_buf());

    let (tx, _rx) = mpsc::unbounded_channel();
    let session = manager.create_session(Vec::new(), tx);

    let spawn_time = Instant::now();
    assert_eq!(world.spawn_wave_at(1, spawn_time), 1);

    // In a 1x1 world every direction wraps back onto the only cell.
    let outcome = resolve_move(&session, Direction::Up, &world, &manager, &records, 200);

    assert!(outcome.moved);
    assert_eq!(outcome.destination, Coord { x: 0, y: 0 });
    assert_eq!(outcome.captured.as_deref(), Some("weedle"));
    assert_eq!(world.live_count(), 0);

    // The record sink received the full updated collection.
    let record_path = records_dir
        .path()
        .join(format!("player{}_data.json", session.id.raw()));
    let contents = std::fs::read_to_string(record_path).unwrap();
    assert!(contents.contains("weedle"));

    // Letting the original despawn deadline elapse must not decrement the
    // live counter a second time.
    let after_deadline = spawn_time + world.config().despawn_after + Duration::from_secs(1);
    assert_eq!(world.process_due_despawns(after_deadline), 0);
    assert_eq!(world.live_count(), 0);
}

#[test]
fn battle_runs_to_team_exhaustion() {
    // Side 0 one-shots side 1's creatures and always moves first.
    let strong = || creature("machamp", 100, 100, 40, 90);
    let weak = || creature("metapod", 50, 45, 40, 10);

    let mut state = BattleState::new(
        "integration".to_string(),
        Combatant::new("p1".to_string(), vec![strong(), strong()]),
        Combatant::new("p2".to_string(), vec![weak(), weak()]),
    );
    let mut rng = rand::rng();

    begin_battle(&mut state, &mut rng);
    assert_eq!(state.current_attacker(), Some(0));

    let mut turns = 0;
    while !state.is_resolved() {
        let attacker = state.current_attacker().unwrap();
        execute_attack(&mut state, attacker, AttackKind::Normal).unwrap();
        turns += 1;
        assert!(turns < 20, "battle failed to terminate");
    }

    // Turn 1: p1 faints metapod #1. Turn 2: replacement chips p1. Turn 3:
    // p1 faints metapod #2 and the battle resolves immediately.
    assert_eq!(turns, 3);
    assert_eq!(state.outcome(), Some(BattleOutcome::Winner(0)));
    assert!(state.sides[1].is_exhausted());
    assert_eq!(state.sides[0].team.len(), 2);
}

#[test]
fn player_versus_wild_side_uses_the_same_machine() {
    let mut state = BattleState::new(
        "wild".to_string(),
        Combatant::new("p1".to_string(), vec![creature("pidgeot", 80, 80, 40, 91)]),
        Combatant::new("wild".to_string(), vec![creature("rattata", 30, 56, 35, 72)]),
    );
    let mut rng = rand::rng();

    begin_battle(&mut state, &mut rng);
    assert_eq!(state.current_attacker(), Some(0));

    execute_attack(&mut state, 0, AttackKind::Normal).unwrap();

    assert_eq!(state.outcome(), Some(BattleOutcome::Winner(0)));
}

#[test]
fn battle_with_no_combatants_aborts_without_damage() {
    let mut state = BattleState::new(
        "empty".to_string(),
        Combatant::new("p1".to_string(), Vec::new()),
        Combatant::new("p2".to_string(), Vec::new()),
    );
    let mut rng = rand::rng();

    let events = begin_battle(&mut state, &mut rng);

    assert_eq!(state.outcome(), Some(BattleOutcome::NoContest));
    assert_eq!(events.len(), 1);
    assert_eq!(state.phase, BattlePhase::Resolved(BattleOutcome::NoContest));
}
