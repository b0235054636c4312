//! Turn scheduler: the single-threaded loop that advances the simulation.
//!
//! [`Simulation`] owns the world, the current level, the combat tracker and
//! the random stream, and runs every turn through the same five phases:
//!
//! 1. player intents, resolved through movement and combat
//! 2. one AI decision per living AI entity, each resolved before the next
//! 3. field-of-view refresh
//! 4. status upkeep, deaths, stairs and messages
//! 5. queue cleanup
//!
//! Each phase drains the event queue until it is empty before the next one
//! starts. Every drained event lands in the [`TurnReport`].

use dungeon_rules::{Direction, EntityId, GameRng, Point, Position, RollSource};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::combat::CombatTracker;
use crate::config::SimConfig;
use crate::error::SimError;
use crate::events::GameEvent;
use crate::map::{DungeonGenerator, DungeonMap};
use crate::systems::{self, SystemContext};
use crate::world::{ComponentKind, World};

/// Borrow the simulation's parts as a [`SystemContext`], leaving the
/// generator and intent queue free.
macro_rules! context {
    ($sim:expr) => {
        SystemContext {
            world: &mut $sim.world,
            map: &$sim.map,
            combat: &mut $sim.combat,
            rng: &mut *$sim.rng,
            config: &$sim.config,
            player: $sim.player,
        }
    };
}

/// What the player asked to do this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerIntent {
    Move(Direction),
    Attack(EntityId),
    Wait,
    Descend,
}

/// The phases of a turn, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnPhase {
    PlayerIntents,
    Ai,
    Vision,
    Aftermath,
    Cleanup,
}

impl TurnPhase {
    pub const ORDER: [TurnPhase; 5] = [
        TurnPhase::PlayerIntents,
        TurnPhase::Ai,
        TurnPhase::Vision,
        TurnPhase::Aftermath,
        TurnPhase::Cleanup,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TurnPhase::PlayerIntents => "player_intents",
            TurnPhase::Ai => "ai",
            TurnPhase::Vision => "vision",
            TurnPhase::Aftermath => "aftermath",
            TurnPhase::Cleanup => "cleanup",
        }
    }
}

/// Everything that happened during one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    /// The turn number this report covers.
    pub turn: u64,
    /// Every drained event, in drain order.
    pub events: Vec<GameEvent>,
    pub player_dead: bool,
    /// Depth of the level the turn ended on.
    pub depth: i32,
}

impl TurnReport {
    /// The text of every `Message` event, in order.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|event| match event {
            GameEvent::Message { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Position of the first event with the given [`kind`](GameEvent::kind).
    pub fn position_of(&self, kind: &str) -> Option<usize> {
        self.events.iter().position(|e| e.kind() == kind)
    }
}

/// The simulation core.
pub struct Simulation {
    world: World,
    map: DungeonMap,
    combat: CombatTracker,
    rng: Box<dyn RollSource>,
    config: SimConfig,
    generator: DungeonGenerator,
    player: Option<EntityId>,
    intents: VecDeque<PlayerIntent>,
    turn: u64,
    game_over: bool,
}

impl Simulation {
    /// A simulation on `map`, drawing from a stream seeded with
    /// `config.seed`.
    pub fn new(config: SimConfig, map: DungeonMap) -> Self {
        let rng = GameRng::from_seed(config.seed);
        Self::with_rolls(config, map, rng)
    }

    /// A simulation drawing from `rolls` instead of the seeded stream.
    pub fn with_rolls(
        config: SimConfig,
        map: DungeonMap,
        rolls: impl RollSource + 'static,
    ) -> Self {
        let generator = DungeonGenerator::new(config.dungeon);
        Self {
            world: World::new(),
            map,
            combat: CombatTracker::new(),
            rng: Box::new(rolls),
            config,
            generator,
            player: None,
            intents: VecDeque::new(),
            turn: 0,
            game_over: false,
        }
    }

    /// A simulation on a freshly generated first level. Returns the level's
    /// entry point alongside.
    pub fn generate(config: SimConfig) -> (Self, Point) {
        let mut rng = GameRng::from_seed(config.seed);
        let level = DungeonGenerator::new(config.dungeon).generate(0, &mut rng);
        (Self::with_rolls(config, level.map, rng), level.entry)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The level currently simulated.
    pub fn map(&self) -> &DungeonMap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut DungeonMap {
        &mut self.map
    }

    pub fn combat(&self) -> &CombatTracker {
        &self.combat
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn player(&self) -> Option<EntityId> {
        self.player
    }

    pub fn set_player(&mut self, player: EntityId) {
        self.player = Some(player);
    }

    /// Number of turns completed.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Queue a player intent for the next turn.
    pub fn submit(&mut self, intent: PlayerIntent) {
        self.intents.push_back(intent);
    }

    /// Run one full turn.
    ///
    /// Once the player has died no further turns run; the returned report
    /// is empty apart from `player_dead`.
    pub fn advance_turn(&mut self) -> TurnReport {
        let mut report = TurnReport {
            turn: self.turn,
            depth: self.map.depth(),
            ..TurnReport::default()
        };
        if self.game_over {
            tracing::debug!("Turn {} skipped: game over", self.turn);
            self.intents.clear();
            report.player_dead = true;
            return report;
        }

        for phase in TurnPhase::ORDER {
            let span = tracing::debug_span!("turn_phase", turn = self.turn, phase = phase.name());
            let _guard = span.enter();
            self.run_phase(phase, &mut report);
        }

        report.player_dead = self.game_over;
        report.depth = self.map.depth();
        tracing::info!("Turn {} complete: {} events", self.turn, report.events.len());
        self.turn += 1;
        report
    }

    fn run_phase(&mut self, phase: TurnPhase, report: &mut TurnReport) {
        match phase {
            TurnPhase::PlayerIntents => {
                while let Some(intent) = self.intents.pop_front() {
                    self.post_intent(intent);
                }
                self.run_cascade(phase, report);
            }
            TurnPhase::Ai => {
                for entity in systems::ai_actors(&self.world, self.map.depth()) {
                    // Killed earlier this phase.
                    if !self.world.is_alive(entity) {
                        continue;
                    }
                    let mut ctx = context!(self);
                    if let Err(err) = systems::decide(&mut ctx, entity) {
                        tracing::warn!("AI of {} skipped: {}", entity, err);
                    }
                    self.run_cascade(phase, report);
                }
            }
            TurnPhase::Vision => {
                let mut ctx = context!(self);
                let recomputed = systems::refresh_fov(&mut ctx);
                tracing::debug!("FOV recomputed for {} entities", recomputed);
            }
            TurnPhase::Aftermath => {
                let mut ctx = context!(self);
                systems::tick_status_effects(&mut ctx);
                self.run_cascade(phase, report);
            }
            TurnPhase::Cleanup => {
                let leftover = self.world.pending_events();
                if leftover > 0 {
                    tracing::warn!("Discarding {} undrained events", leftover);
                }
                self.world.clear_events();
                let swept = self.combat.sweep_ended();
                if swept > 0 {
                    tracing::debug!("Swept {} ended encounters", swept);
                }
            }
        }
    }

    /// Turn a player intent into the event that requests it.
    fn post_intent(&mut self, intent: PlayerIntent) {
        let Some(player) = self.player else {
            tracing::warn!("Intent {:?} dropped: no player", intent);
            return;
        };
        let position = match context!(self).active_position(player) {
            Ok(position) => position,
            Err(err) => {
                tracing::warn!("Intent {:?} dropped: {}", intent, err);
                return;
            }
        };
        if systems::is_incapacitated(&context!(self), player) {
            tracing::debug!("Player {} is incapacitated; {:?} lost", player, intent);
            return;
        }

        let event = match intent {
            PlayerIntent::Move(direction) => GameEvent::MoveRequested {
                entity: player,
                target: position.point().step(direction),
            },
            PlayerIntent::Attack(target) => GameEvent::AttackRequested {
                attacker: player,
                target,
            },
            PlayerIntent::Wait => GameEvent::Waited { entity: player },
            PlayerIntent::Descend => GameEvent::DescendRequested { entity: player },
        };
        self.world.post(event);
    }

    /// Drain the queue until it stays empty, dispatching each event. Each
    /// round sees only what earlier rounds posted.
    fn run_cascade(&mut self, phase: TurnPhase, report: &mut TurnReport) {
        for _ in 0..self.config.events.max_cascade {
            let events = self.world.drain_events();
            if events.is_empty() {
                return;
            }
            for event in events {
                self.dispatch(&event, report);
                report.events.push(event);
            }
        }
        let pending = self.world.pending_events();
        if pending > 0 {
            tracing::warn!(
                "Phase {} hit the cascade limit of {} rounds with {} events queued",
                phase.name(),
                self.config.events.max_cascade,
                pending
            );
        }
    }

    fn dispatch(&mut self, event: &GameEvent, report: &mut TurnReport) {
        tracing::debug!("Dispatching {}", event.kind());
        let result = match *event {
            GameEvent::MoveRequested { entity, target } => {
                systems::handle_move(&mut context!(self), entity, target)
            }
            GameEvent::MoveResolved { entity, to, .. } => {
                systems::pick_up_items(&mut context!(self), entity, to)
            }
            GameEvent::AttackRequested { attacker, target } => self.attack(attacker, target),
            GameEvent::DamageApplied { target, source, .. } => {
                self.combat.on_damage(&mut self.world, target, source);
                Ok(())
            }
            GameEvent::EntityDied { entity, .. } => {
                if systems::handle_death(&mut context!(self), entity) {
                    self.game_over = true;
                    report.player_dead = true;
                }
                Ok(())
            }
            GameEvent::DescendRequested { entity } => self.descend(entity),
            GameEvent::Bump { .. }
            | GameEvent::CombatStarted { .. }
            | GameEvent::CombatEnded { .. }
            | GameEvent::ItemPicked { .. }
            | GameEvent::LevelChanged { .. }
            | GameEvent::Waited { .. }
            | GameEvent::Message { .. } => Ok(()),
        };
        if let Err(err) = result {
            tracing::warn!("Skipped {}: {}", event.kind(), err);
        }
    }

    /// Engage both sides before the swing so `CombatStarted` precedes any
    /// damage from it.
    fn attack(&mut self, attacker: EntityId, target: EntityId) -> Result<(), SimError> {
        let mut ctx = context!(self);
        ctx.active_position(attacker)?;
        if attacker == target || !ctx.world.is_alive(target) {
            return Ok(());
        }
        if !ctx.world.has(attacker, ComponentKind::Stats) {
            return Err(SimError::MissingComponent {
                entity: attacker,
                component: ComponentKind::Stats,
            });
        }
        if systems::in_reach(&ctx, attacker, target) {
            ctx.combat.engage(ctx.world, attacker, target);
        }
        systems::resolve_attack(&mut ctx, attacker, target)
    }

    fn descend(&mut self, entity: EntityId) -> Result<(), SimError> {
        let level = systems::descend(&mut context!(self), entity, &self.generator)?;
        if let Some(level) = level {
            tracing::info!(
                "Level {} replaced by level {}",
                self.map.depth(),
                level.map.depth()
            );
            self.map = level.map;
        }
        Ok(())
    }

    /// Where `entity` stands, if it exists and has a position.
    pub fn position_of(&self, entity: EntityId) -> Option<Position> {
        self.world.get::<Position>(entity).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dungeon_rules::{
        ActorTemplate, Ai, AiBehavior, Health, ScriptedRolls, Stats, Vision, VisibleTiles,
    };

    fn spawn(sim: &mut Simulation, name: &str, hp: i32, x: i32, y: i32) -> EntityId {
        let template = ActorTemplate::new(name, hp);
        sim.world_mut()
            .spawn_actor(&template, Position::new(x, y, 0))
    }

    #[test]
    fn test_move_intent() {
        let mut sim = Simulation::new(SimConfig::default(), DungeonMap::open(5, 5, 0));
        let hero = spawn(&mut sim, "Hero", 10, 1, 1);
        sim.set_player(hero);

        sim.submit(PlayerIntent::Move(Direction::East));
        let report = sim.advance_turn();

        assert_eq!(report.turn, 0);
        assert_eq!(sim.turn(), 1);
        assert_eq!(sim.position_of(hero), Some(Position::new(2, 1, 0)));
        assert_eq!(
            report.events,
            vec![
                GameEvent::MoveRequested {
                    entity: hero,
                    target: Point::new(2, 1)
                },
                GameEvent::MoveResolved {
                    entity: hero,
                    from: Point::new(1, 1),
                    to: Point::new(2, 1)
                },
            ]
        );
        assert_eq!(sim.world().pending_events(), 0);
    }

    #[test]
    fn test_wait_and_empty_turns() {
        let mut sim = Simulation::new(SimConfig::default(), DungeonMap::open(3, 3, 0));
        let hero = spawn(&mut sim, "Hero", 10, 1, 1);
        sim.set_player(hero);

        sim.submit(PlayerIntent::Wait);
        let report = sim.advance_turn();
        assert_eq!(report.events, vec![GameEvent::Waited { entity: hero }]);

        let report = sim.advance_turn();
        assert!(report.events.is_empty());
        assert_eq!(sim.turn(), 2);
    }

    #[test]
    fn test_ai_acts_after_player() {
        let mut sim = Simulation::with_rolls(
            SimConfig::default(),
            DungeonMap::open(7, 3, 0),
            ScriptedRolls::default(),
        );
        let hero = spawn(&mut sim, "Hero", 10, 0, 1);
        let orc = spawn(&mut sim, "Orc", 10, 4, 1);
        sim.world_mut()
            .attach(orc, Ai::new(AiBehavior::Chase))
            .unwrap();
        sim.set_player(hero);

        sim.submit(PlayerIntent::Move(Direction::East));
        sim.advance_turn();

        assert_eq!(sim.position_of(hero), Some(Position::new(1, 1, 0)));
        assert_eq!(sim.position_of(orc), Some(Position::new(3, 1, 0)));
    }

    #[test]
    fn test_vision_refreshed_every_turn() {
        let mut sim = Simulation::new(SimConfig::default(), DungeonMap::open(9, 9, 0));
        let hero = spawn(&mut sim, "Hero", 10, 4, 4);
        sim.world_mut().attach(hero, Vision { radius: 3 }).unwrap();
        sim.set_player(hero);

        sim.advance_turn();
        let cache = sim.world().get::<VisibleTiles>(hero).unwrap();
        assert!(cache.can_see(Position::new(4, 1, 0)));
    }

    #[test]
    fn test_player_death_ends_the_game() {
        let mut sim = Simulation::with_rolls(
            SimConfig::default(),
            DungeonMap::open(5, 5, 0),
            ScriptedRolls::new([20, 99, 4]),
        );
        let hero = spawn(&mut sim, "Hero", 2, 1, 1);
        let orc = spawn(&mut sim, "Orc", 10, 2, 1);
        sim.world_mut().attach(orc, Ai::new(AiBehavior::Idle)).unwrap();
        sim.set_player(hero);

        let report = sim.advance_turn();
        assert!(report.player_dead);
        assert!(sim.is_game_over());
        assert!(sim.world().get::<Health>(hero).unwrap().dead);
        assert!(report.messages().any(|m| m == systems::PLAYER_DIED));

        sim.submit(PlayerIntent::Wait);
        let report = sim.advance_turn();
        assert!(report.player_dead);
        assert!(report.events.is_empty());
        assert_eq!(sim.turn(), 1);
    }

    #[test]
    fn test_attacker_without_stats_starts_no_fight() {
        let mut sim = Simulation::new(SimConfig::default(), DungeonMap::open(5, 5, 0));
        let hero = spawn(&mut sim, "Hero", 10, 1, 1);
        let rat = spawn(&mut sim, "Rat", 3, 2, 1);
        sim.world_mut().detach::<Stats>(hero);
        sim.set_player(hero);

        sim.submit(PlayerIntent::Attack(rat));
        let report = sim.advance_turn();

        assert_eq!(report.position_of("combat_started"), None);
        assert!(!sim.combat().in_combat(hero));
        assert!(!sim.combat().in_combat(rat));
        assert_eq!(sim.world().get::<Health>(rat).unwrap().hp, 3);
    }

    #[test]
    fn test_intent_without_player_is_dropped() {
        let mut sim = Simulation::new(SimConfig::default(), DungeonMap::open(3, 3, 0));
        sim.submit(PlayerIntent::Wait);
        let report = sim.advance_turn();
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_cascade_limit_discards_overflow() {
        let mut config = SimConfig::default();
        config.events.max_cascade = 1;
        let mut sim = Simulation::new(config, DungeonMap::open(5, 5, 0));
        let hero = spawn(&mut sim, "Hero", 10, 1, 1);
        sim.set_player(hero);

        sim.submit(PlayerIntent::Move(Direction::East));
        let report = sim.advance_turn();
        // Only the request fits in the player phase's single round; the
        // resolution waits for the aftermath phase.
        assert_eq!(report.position_of("move_requested"), Some(0));
        assert_eq!(report.position_of("move_resolved"), Some(1));
        assert_eq!(sim.position_of(hero), Some(Position::new(2, 1, 0)));
        assert_eq!(sim.world().pending_events(), 0);
    }

    #[test]
    fn test_generated_start() {
        let config = SimConfig::default();
        let (mut sim, entry) = Simulation::generate(config);
        assert!(sim.map().is_walkable(entry));
        let hero = sim
            .world_mut()
            .spawn_actor(&ActorTemplate::new("Hero", 10), Position::at(entry, 0));
        sim.set_player(hero);
        sim.submit(PlayerIntent::Wait);
        assert_eq!(sim.advance_turn().depth, 0);
    }
}
