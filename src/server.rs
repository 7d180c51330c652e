use crate::battle::engine;
use crate::battle::state::{AttackKind, BattleEvent, BattlePhase, BattleState, Combatant};
use crate::config::ServerConfig;
use crate::movement::{resolve_move, Direction};
use crate::persistence::PlayerRecordWriter;
use crate::pokedex::Pokedex;
use crate::pokemon::PokemonInst;
use crate::session::{Session, SessionId, SessionManager};
use crate::world::World;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

type LineReader = Lines<BufReader<OwnedReadHalf>>;

/// Coordination record for one battle between two sessions. The state lives
/// behind a mutex shared by both connection workers; every mutation also
/// publishes the resulting phase on a watch channel, which is what wakes the
/// waiting side on turn hand-off (no polling).
pub struct BattleHandle {
    pub sides: [SessionId; 2],
    state: Mutex<BattleState>,
    phase_tx: watch::Sender<BattlePhase>,
}

impl BattleHandle {
    fn new(sides: [SessionId; 2], state: BattleState) -> Arc<Self> {
        let (phase_tx, _) = watch::channel(state.phase);
        Arc::new(BattleHandle {
            sides,
            state: Mutex::new(state),
            phase_tx,
        })
    }

    pub fn side_of(&self, id: SessionId) -> Option<usize> {
        self.sides.iter().position(|side| *side == id)
    }

    pub fn subscribe(&self) -> watch::Receiver<BattlePhase> {
        self.phase_tx.subscribe()
    }

    /// Run a closure against the battle state, then publish the phase it
    /// left behind.
    pub fn with_state<T>(&self, f: impl FnOnce(&mut BattleState) -> T) -> T {
        let (result, phase) = {
            let mut state = self.lock_state();
            let result = f(&mut state);
            let phase = state.phase;
            (result, phase)
        };
        self.phase_tx.send_replace(phase);
        result
    }

    fn lock_state(&self) -> MutexGuard<'_, BattleState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl std::fmt::Debug for BattleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BattleHandle").field("sides", &self.sides).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoamStatus {
    Active,
    Suspended,
    Expired,
    Disabled,
}

/// The server: shared world, session set, roster and record sink, plus the
/// accept loop and per-connection protocol.
pub struct GameServer {
    pokedex: Arc<Pokedex>,
    world: Arc<World>,
    sessions: Arc<SessionManager>,
    records: Arc<dyn PlayerRecordWriter>,
    config: ServerConfig,
    next_battle_id: AtomicU64,
}

impl GameServer {
    pub fn new(
        pokedex: Arc<Pokedex>,
        world: Arc<World>,
        records: Arc<dyn PlayerRecordWriter>,
        config: ServerConfig,
    ) -> Arc<Self> {
        let sessions = Arc::new(SessionManager::new(world.width(), world.height()));
        Arc::new(GameServer {
            pokedex,
            world,
            sessions,
            records,
            config,
            next_battle_id: AtomicU64::new(0),
        })
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Accept connections forever. The spawn cycle and despawn sweeper run
    /// as independent tasks and never touch connection I/O.
    pub async fn run(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        tokio::spawn(self.world.clone().run_spawn_cycle());
        tokio::spawn(self.world.clone().run_despawn_sweeper());
        let addr = listener.local_addr()?;
        info!(%addr, "server listening");

        loop {
            let (stream, addr) = listener.accept().await?;
            info!(%addr, "connection accepted");
            let server = self.clone();
            tokio::spawn(async move {
                server.handle_connection(stream).await;
            });
        }
    }

    /// One worker per connection: writer task for outbound lines, then the
    /// draft dialogue, then the command loop until disconnect.
    async fn handle_connection(self: Arc<Self>, stream: TcpStream) {
        let (read_half, write_half) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(write_lines(write_half, outbound_rx));
        let mut lines = BufReader::new(read_half).lines();

        let Some(team) = self.draft_team(&outbound_tx, &mut lines).await else {
            debug!("client left during team draft");
            return;
        };

        let session = self.sessions.create_session(team, outbound_tx);
        session.send_line(format!(
            "You enter the world at ({}, {}).",
            session.position().x,
            session.position().y
        ));
        session.send_line("Commands: up, down, left, right, auto <seconds>.");

        self.clone().command_loop(&session, &mut lines).await;
        self.teardown(&session);
    }

    /// Connection-start dialogue: list the roster and collect the numeric
    /// draft picks. Out-of-range or non-numeric input re-prompts without
    /// advancing. Returns `None` when the client disconnects.
    async fn draft_team(
        &self,
        outbound: &mpsc::UnboundedSender<String>,
        lines: &mut LineReader,
    ) -> Option<Vec<PokemonInst>> {
        let send = |line: String| {
            let _ = outbound.send(line);
        };

        send("Welcome to the pokemon world!".to_string());
        send(format!(
            "Choose {} pokemon for your team:",
            self.config.draft_size
        ));
        for (index, template) in self.pokedex.iter().enumerate() {
            let types = template
                .types
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join("/");
            send(format!("{}. {} ({})", index + 1, template.name, types));
        }

        let mut team = Vec::with_capacity(self.config.draft_size);
        while team.len() < self.config.draft_size {
            send("Enter number for pokemon:".to_string());
            let line = lines.next_line().await.ok().flatten()?;
            match line.trim().parse::<usize>() {
                Ok(choice) if (1..=self.pokedex.len()).contains(&choice) => {
                    let template = self.pokedex.get(choice - 1)?;
                    team.push(PokemonInst::drafted(template));
                    send(format!("{} joined your team.", template.name));
                }
                _ => send("Invalid choice. Try again.".to_string()),
            }
        }
        Some(team)
    }

    /// Process this session's commands strictly in order, switching into the
    /// battle loop whenever the session is pulled into a battle (by its own
    /// move, a roam tick, or another player walking into it).
    async fn command_loop(self: Arc<Self>, session: &Arc<Session>, lines: &mut LineReader) {
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => self.clone().dispatch_command(session, line.trim()).await,
                        Ok(None) => break,
                        Err(err) => {
                            debug!(id = %session.id, %err, "read failed");
                            break;
                        }
                    }
                }
                _ = session.battle_started.notified() => {
                    self.run_battle(session, lines).await;
                }
            }
        }
    }

    async fn dispatch_command(self: Arc<Self>, session: &Arc<Session>, line: &str) {
        if line.is_empty() {
            return;
        }
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return;
        };

        if let Some(direction) = Direction::parse(command) {
            self.perform_move(session, direction);
            return;
        }

        match command {
            "auto" => match parts.next() {
                None => {
                    let duration = self.config.default_auto_duration;
                    self.toggle_auto(session, duration);
                }
                Some(token) => match token.parse::<u64>() {
                    Ok(seconds) => self.toggle_auto(session, Duration::from_secs(seconds)),
                    Err(_) => session.send_line("Invalid duration. Usage: auto <seconds>."),
                },
            },
            _ => session.send_line("Unknown command. Try: up, down, left, right, auto <seconds>."),
        }
    }

    /// Apply one move and report it, then resolve any battle trigger.
    fn perform_move(&self, session: &Arc<Session>, direction: Direction) {
        let outcome = resolve_move(
            session,
            direction,
            &self.world,
            &self.sessions,
            self.records.as_ref(),
            self.config.team_capacity,
        );
        if !outcome.moved {
            return;
        }

        session.send_line(format!(
            "You are at ({}, {}).",
            outcome.destination.x, outcome.destination.y
        ));
        if let Some(name) = &outcome.captured {
            session.send_line(format!("You caught a {}!", name));
            info!(id = %session.id, creature = %name, "capture");
        }
        if let Some(opponent) = outcome.opponent {
            self.start_battle(session.clone(), opponent);
        }
    }

    /// Pull two sessions into a battle: move their drafted teams into a
    /// shared battle state, elect the first turn, and wake both connection
    /// workers. Session locks are acquired in id order; if either session
    /// is already fighting, nothing happens.
    fn start_battle(&self, challenger: Arc<Session>, defender: Arc<Session>) {
        let battle_id = self.next_battle_id.fetch_add(1, Ordering::Relaxed) + 1;

        let (handle, events) = {
            let (mut challenger_state, mut defender_state) = if challenger.id < defender.id {
                let c = challenger.state();
                let d = defender.state();
                (c, d)
            } else {
                let d = defender.state();
                let c = challenger.state();
                (c, d)
            };

            if challenger_state.battle.is_some() || defender_state.battle.is_some() {
                return;
            }

            let challenger_team = std::mem::take(&mut challenger_state.battle_team);
            let defender_team = std::mem::take(&mut defender_state.battle_team);

            let mut state = BattleState::new(
                format!("battle-{}", battle_id),
                Combatant::new(challenger.id.to_string(), challenger_team),
                Combatant::new(defender.id.to_string(), defender_team),
            );
            let events = engine::begin_battle(&mut state, &mut rand::rng());

            let handle = BattleHandle::new([challenger.id, defender.id], state);
            challenger_state.battle = Some(handle.clone());
            defender_state.battle = Some(handle.clone());
            (handle, events)
        };

        info!(
            battle = battle_id,
            challenger = %challenger.id,
            defender = %defender.id,
            "battle started"
        );
        for session in [&challenger, &defender] {
            session.send_line("You ran into another trainer!");
        }
        self.broadcast_battle_events(&handle, &events);

        challenger.battle_started.notify_one();
        defender.battle_started.notify_one();
    }

    /// Battle loop for one side: wait for the turn on the phase channel,
    /// read an attack selection, apply it, and broadcast what happened.
    /// Ends when the battle resolves; survivors go back to the session.
    async fn run_battle(&self, session: &Arc<Session>, lines: &mut LineReader) {
        let Some(handle) = session.current_battle() else {
            return;
        };
        let Some(my_side) = handle.side_of(session.id) else {
            return;
        };
        let mut phase_rx = handle.subscribe();
        let mut announced_waiting = false;

        loop {
            let phase = *phase_rx.borrow_and_update();
            match phase {
                BattlePhase::Resolved(_) => break,
                BattlePhase::Turn { attacker } if attacker == my_side => {
                    announced_waiting = false;
                    if !self.take_battle_turn(session, &handle, my_side, lines).await {
                        let events = handle.with_state(|state| engine::forfeit(state, my_side));
                        self.broadcast_battle_events(&handle, &events);
                        break;
                    }
                }
                _ => {
                    if !announced_waiting {
                        session.send_line("Waiting for your turn...");
                        announced_waiting = true;
                    }
                    if phase_rx.changed().await.is_err() {
                        break;
                    }
                }
            }
        }

        let survivors = handle.with_state(|state| state.take_team(my_side));
        {
            let mut state = session.state();
            state.battle_team = survivors;
            state.battle = None;
        }
        debug!(id = %session.id, "battle finished");
    }

    /// Prompt for and execute one attack. Invalid selections re-prompt
    /// without advancing the battle. Returns false when the client
    /// disconnected mid-turn.
    async fn take_battle_turn(
        &self,
        session: &Arc<Session>,
        handle: &Arc<BattleHandle>,
        my_side: usize,
        lines: &mut LineReader,
    ) -> bool {
        let active_name =
            handle.with_state(|state| state.sides[my_side].active().map(|p| p.name().to_string()));
        let Some(active_name) = active_name else {
            return true;
        };

        session.send_line("Your turn!");
        session.send_line(format!("Available attacks for {}:", active_name));
        session.send_line("1. Normal Attack");
        session.send_line("2. Special Attack");

        loop {
            session.send_line("Enter attack number:");
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                _ => return false,
            };
            let Some(kind) = AttackKind::parse(&line) else {
                session.send_line("Invalid attack choice. Try again.");
                continue;
            };

            match handle.with_state(|state| engine::execute_attack(state, my_side, kind)) {
                Ok(events) => {
                    self.broadcast_battle_events(handle, &events);
                    return true;
                }
                Err(err) => {
                    debug!(id = %session.id, %err, "attack rejected");
                    session.send_line("You can't attack right now.");
                    return true;
                }
            }
        }
    }

    /// Send each event to both participants, formatted from that side's
    /// point of view.
    fn broadcast_battle_events(&self, handle: &BattleHandle, events: &[BattleEvent]) {
        for side in 0..2 {
            if let Some(session) = self.sessions.get(handle.sides[side]) {
                for event in events {
                    session.send_line(event.format(side));
                }
            }
        }
    }

    /// Toggle auto-roam: off if currently on, otherwise on for `duration`
    /// with a fresh roam task.
    fn toggle_auto(self: Arc<Self>, session: &Arc<Session>, duration: Duration) {
        let generation = {
            let mut state = session.state();
            if state.auto_until.is_some() {
                state.auto_until = None;
                None
            } else {
                state.auto_until = Some(Instant::now() + duration);
                state.auto_generation += 1;
                Some(state.auto_generation)
            }
        };

        match generation {
            Some(generation) => {
                session.send_line(format!(
                    "Auto-roam enabled for {} seconds.",
                    duration.as_secs()
                ));
                let session = session.clone();
                tokio::spawn(async move {
                    self.run_auto_roam(session, generation).await;
                });
            }
            None => session.send_line("Auto-roam disabled."),
        }
    }

    /// Issue synthetic random moves on the player's behalf until the roam
    /// window closes. A battle suspends roaming without cancelling it;
    /// toggling off or re-enabling retires this task via the generation
    /// counter.
    async fn run_auto_roam(self: Arc<Self>, session: Arc<Session>, generation: u64) {
        let mut interval = tokio::time::interval(self.config.roam_tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await;

        loop {
            interval.tick().await;

            let status = {
                let state = session.state();
                if state.auto_generation != generation {
                    RoamStatus::Disabled
                } else {
                    match state.auto_until {
                        None => RoamStatus::Disabled,
                        Some(until) if Instant::now() >= until => RoamStatus::Expired,
                        Some(_) if state.battle.is_some() => RoamStatus::Suspended,
                        Some(_) => RoamStatus::Active,
                    }
                }
            };

            match status {
                RoamStatus::Disabled => return,
                RoamStatus::Expired => {
                    session.state().auto_until = None;
                    session.send_line("Auto-roam ended.");
                    return;
                }
                RoamStatus::Suspended => continue,
                RoamStatus::Active => {
                    let direction = Direction::random(&mut rand::rng());
                    self.perform_move(&session, direction);
                }
            }
        }
    }

    /// Tear a session down on disconnect: forfeit any battle it was party
    /// to in favor of the remaining combatant, then unregister it. A single
    /// session's failure never touches other sessions or the spawn cycle.
    fn teardown(&self, session: &Arc<Session>) {
        let battle = {
            let mut state = session.state();
            state.auto_until = None;
            state.battle.take()
        };

        if let Some(handle) = battle {
            if let Some(side) = handle.side_of(session.id) {
                let events = handle.with_state(|state| engine::forfeit(state, side));
                if !events.is_empty() {
                    warn!(id = %session.id, "battle forfeited by disconnect");
                    self.broadcast_battle_events(&handle, &events);
                }
            }
        }

        self.sessions.remove_session(session.id);
        info!(id = %session.id, "connection closed");
    }
}

async fn write_lines(mut write_half: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = rx.recv().await {
        let mut data = line.into_bytes();
        data.push(b'\n');
        if write_half.write_all(&data).await.is_err() {
            break;
        }
    }
}
