//! Combat engine.
//!
//! An adventure runs through these phases:
//!
//! ```text
//! Idle -> PartyBuffed -> InBattle -> BattleWon -> InBattle -> ... -> Idle
//!                                 \-> PartyDefeated / Stalemate ---> Idle
//! ```
//!
//! Each round the knights act in party order, then the monsters. A combatant
//! brought to 0 HP stops acting and stops being a target at once, but it only
//! leaves its side at the end of the round. Knights are removed before
//! monsters, so a party that falls in the same round as the last monster has
//! lost. Every monster removed grants each surviving knight
//! [`XP_PER_DEFEAT`] experience.
//!
//! The engine never formats text; it reports [`CombatEvent`]s.

use crate::combatant::{Combatant, KnightId, Monster};
use crate::dice::{Dice, DiceRoller, DiceType};
use crate::roster::{CatalogKind, Roster, RosterError};
use crate::stats::{Attributes, Fortune};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Experience each surviving knight earns per monster removed.
pub const XP_PER_DEFEAT: u32 = 1;

/// Default cap on rounds in a single battle.
pub const DEFAULT_MAX_ROUNDS: u32 = 1000;

/// Errors from the combat engine. An error never leaves fortunes attached:
/// either nothing changed or the roster has been cleared.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CombatError {
    #[error("No knights in the active party")]
    EmptyParty,

    #[error("Cannot {action} while the adventure is {phase}")]
    InvalidPhase { action: &'static str, phase: Phase },

    #[error(transparent)]
    Roster(#[from] RosterError),
}

/// How fortunes are handed out when an adventure begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FortunePolicy {
    /// One independent draw per active knight.
    #[default]
    PerKnight,
    /// One draw for the whole party.
    Shared,
}

/// Engine tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub fortune_policy: FortunePolicy,
    /// A battle still undecided after this many rounds ends in a stalemate.
    pub max_rounds: u32,
}

impl EngineConfig {
    pub fn with_fortune_policy(mut self, policy: FortunePolicy) -> Self {
        self.fortune_policy = policy;
        self
    }

    /// Set the stalemate limit. At least one round is always fought.
    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fortune_policy: FortunePolicy::default(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

/// Where the engine is in an adventure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    PartyBuffed,
    InBattle,
    BattleWon,
    PartyDefeated,
    Stalemate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::PartyBuffed => "buffed",
            Phase::InBattle => "in battle",
            Phase::BattleWon => "between battles",
            Phase::PartyDefeated => "lost",
            Phase::Stalemate => "stalemated",
        };
        f.write_str(name)
    }
}

/// Which side made an attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Knights,
    Monsters,
}

/// The dice behind one attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRoll {
    /// The natural d20.
    pub roll: i32,
    /// `roll` plus the attacker's accuracy.
    pub total: i32,
    pub target_armor: i32,
    pub hit: bool,
    /// Damage rolled; 0 on a miss or with no damage die.
    pub damage: i32,
}

/// Roll to hit and, on a hit, roll damage.
///
/// Hits when `d20 + accuracy > armor`; a tie misses. A miss does not roll
/// damage, and neither does a hit with no damage die.
pub fn resolve_attack(
    dice: &mut impl DiceRoller,
    attacker: &impl Attributes,
    defender: &impl Attributes,
) -> AttackRoll {
    let roll = dice.roll(DiceType::D20);
    let total = roll.saturating_add(attacker.accuracy());
    let target_armor = defender.armor();
    let hit = total > target_armor;

    let damage = match (hit, attacker.damage_die()) {
        (false, _) | (true, DiceType::None) => 0,
        (true, die) => dice.roll(die),
    };

    AttackRoll {
        roll,
        total,
        target_armor,
        hit,
        damage,
    }
}

/// Resolve an attack and apply its damage to the defender.
pub fn strike(
    dice: &mut impl DiceRoller,
    attacker: &impl Attributes,
    defender: &mut impl Combatant,
) -> AttackRoll {
    let attack = resolve_attack(dice, attacker, defender);
    defender.add_damage(attack.damage);
    attack
}

/// Something that happened during an adventure, for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatEvent {
    FortuneAssigned {
        knight_id: KnightId,
        knight: String,
        fortune: Fortune,
    },
    BattleStarted {
        party: Vec<String>,
        monsters: Vec<String>,
    },
    /// Nothing to fight; the party keeps exploring.
    EncounterEmpty,
    AttackResolved {
        round: u32,
        side: Side,
        attacker: String,
        target: String,
        attack: AttackRoll,
        target_hp: i32,
    },
    KnightDefeated {
        round: u32,
        knight_id: KnightId,
        knight: String,
    },
    MonsterDefeated {
        round: u32,
        monster: String,
    },
    ExperienceAwarded {
        round: u32,
        knight_id: KnightId,
        knight: String,
        amount: u32,
        total: u32,
    },
    RoundEnded {
        round: u32,
        knights_left: usize,
        monsters_left: usize,
    },
    BattleWon {
        rounds: u32,
    },
    PartyDefeated {
        rounds: u32,
    },
    Stalemate {
        rounds: u32,
    },
}

/// How a single battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleOutcome {
    Won,
    PartyDefeated,
    Stalemate,
}

/// Everything that happened in one battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleReport {
    pub outcome: BattleOutcome,
    pub rounds: u32,
    /// The encounter as drawn, before any damage.
    pub encounter: Vec<Monster>,
    pub events: Vec<CombatEvent>,
}

/// How an adventure ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdventureOutcome {
    /// The party won its last battle and chose to go home.
    Returned,
    PartyDefeated,
    Stalemate,
}

/// Everything that happened in one adventure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdventureReport {
    /// The `FortuneAssigned` events from the start of the adventure.
    pub fortunes: Vec<CombatEvent>,
    pub battles: Vec<BattleReport>,
    pub outcome: AdventureOutcome,
}

/// Decide a round's result after defeated combatants are removed.
/// The knight side is checked first.
fn terminal_outcome(knights_left: usize, monsters_left: usize) -> Option<BattleOutcome> {
    if knights_left == 0 {
        Some(BattleOutcome::PartyDefeated)
    } else if monsters_left == 0 {
        Some(BattleOutcome::Won)
    } else {
        None
    }
}

/// Live state of one battle.
struct Battle {
    knights: Vec<KnightId>,
    monsters: Vec<Monster>,
    round: u32,
    events: Vec<CombatEvent>,
}

impl Battle {
    fn knight_phase(&mut self, dice: &mut impl DiceRoller, roster: &Roster) {
        for id in &self.knights {
            let Some(knight) = roster.knight(*id) else {
                continue;
            };
            if knight.is_defeated() {
                continue;
            }

            let living: Vec<usize> = self
                .monsters
                .iter()
                .enumerate()
                .filter(|(_, m)| !m.is_defeated())
                .map(|(index, _)| index)
                .collect();
            if living.is_empty() {
                break;
            }

            let target = &mut self.monsters[living[dice.pick(living.len())]];
            let attack = strike(dice, knight, target);
            self.events.push(CombatEvent::AttackResolved {
                round: self.round,
                side: Side::Knights,
                attacker: knight.name().to_string(),
                target: target.name().to_string(),
                attack,
                target_hp: target.hp(),
            });
        }
    }

    fn monster_phase(&mut self, dice: &mut impl DiceRoller, roster: &mut Roster) {
        for monster in &self.monsters {
            if monster.is_defeated() {
                continue;
            }

            let living: Vec<KnightId> = self
                .knights
                .iter()
                .copied()
                .filter(|id| roster.knight(*id).is_some_and(|k| !k.is_defeated()))
                .collect();
            if living.is_empty() {
                break;
            }

            let target_id = living[dice.pick(living.len())];
            let Some(target) = roster.knight_mut(target_id) else {
                continue;
            };
            let attack = strike(dice, monster, target);
            self.events.push(CombatEvent::AttackResolved {
                round: self.round,
                side: Side::Monsters,
                attacker: monster.name().to_string(),
                target: target.name().to_string(),
                attack,
                target_hp: target.hp(),
            });
        }
    }

    /// Batch removal and rewards. Returns the battle result if decided.
    fn end_round(&mut self, roster: &mut Roster) -> Option<BattleOutcome> {
        let round = self.round;

        let mut survivors = Vec::with_capacity(self.knights.len());
        for id in self.knights.drain(..) {
            match roster.knight(id) {
                Some(knight) if !knight.is_defeated() => survivors.push(id),
                Some(knight) => self.events.push(CombatEvent::KnightDefeated {
                    round,
                    knight_id: id,
                    knight: knight.name().to_string(),
                }),
                None => {}
            }
        }
        self.knights = survivors;

        let (slain, standing): (Vec<Monster>, Vec<Monster>) =
            self.monsters.drain(..).partition(|m| m.is_defeated());
        self.monsters = standing;
        for monster in &slain {
            self.events.push(CombatEvent::MonsterDefeated {
                round,
                monster: monster.name().to_string(),
            });
        }

        let reward = slain.len() as u32 * XP_PER_DEFEAT;
        if reward > 0 {
            for id in &self.knights {
                if let Some(knight) = roster.knight_mut(*id) {
                    knight.add_xp(reward);
                    self.events.push(CombatEvent::ExperienceAwarded {
                        round,
                        knight_id: *id,
                        knight: knight.name().to_string(),
                        amount: reward,
                        total: knight.xp(),
                    });
                }
            }
        }

        self.events.push(CombatEvent::RoundEnded {
            round,
            knights_left: self.knights.len(),
            monsters_left: self.monsters.len(),
        });

        terminal_outcome(self.knights.len(), self.monsters.len())
    }
}

/// Runs adventures for the active party of a [`Roster`].
#[derive(Debug, Clone)]
pub struct CombatEngine<D = Dice> {
    dice: D,
    config: EngineConfig,
    phase: Phase,
}

impl<D: DiceRoller> CombatEngine<D> {
    pub fn new(dice: D) -> Self {
        Self::with_config(dice, EngineConfig::default())
    }

    pub fn with_config(dice: D, config: EngineConfig) -> Self {
        Self {
            dice,
            config,
            phase: Phase::Idle,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn dice_mut(&mut self) -> &mut D {
        &mut self.dice
    }

    /// Attach fortunes to the active party.
    ///
    /// Checks every precondition before touching the roster: a non-empty
    /// party and non-empty fortune and monster catalogs.
    pub fn initialize(&mut self, roster: &mut Roster) -> Result<Vec<CombatEvent>, CombatError> {
        if self.phase != Phase::Idle {
            return Err(CombatError::InvalidPhase {
                action: "begin an adventure",
                phase: self.phase,
            });
        }
        if roster.active_len() == 0 {
            return Err(CombatError::EmptyParty);
        }
        if roster.fortunes().is_empty() {
            return Err(RosterError::EmptyCatalog(CatalogKind::Fortunes).into());
        }
        if roster.monsters().is_empty() {
            return Err(RosterError::EmptyCatalog(CatalogKind::Monsters).into());
        }

        let shared = match self.config.fortune_policy {
            FortunePolicy::Shared => Some(roster.random_fortune(&mut self.dice)?),
            FortunePolicy::PerKnight => None,
        };

        let party = roster.active_ids().to_vec();
        let mut events = Vec::with_capacity(party.len());
        for id in party {
            let fortune = match &shared {
                Some(fortune) => fortune.clone(),
                None => roster.random_fortune(&mut self.dice)?,
            };
            let Some(knight) = roster.knight_mut(id) else {
                continue;
            };
            knight.set_fortune(fortune.clone());
            events.push(CombatEvent::FortuneAssigned {
                knight_id: id,
                knight: knight.name().to_string(),
                fortune,
            });
        }

        tracing::info!(
            party = events.len(),
            policy = ?self.config.fortune_policy,
            "adventure begins"
        );
        self.phase = Phase::PartyBuffed;
        Ok(events)
    }

    /// Fight one encounter sized to the standing party.
    pub fn battle(&mut self, roster: &mut Roster) -> Result<BattleReport, CombatError> {
        if !matches!(self.phase, Phase::PartyBuffed | Phase::BattleWon) {
            return Err(CombatError::InvalidPhase {
                action: "start a battle",
                phase: self.phase,
            });
        }

        let knights: Vec<KnightId> = roster
            .active_knights()
            .filter(|k| !k.is_defeated())
            .map(|k| k.id())
            .collect();
        let encounter = roster.draw_encounter(&mut self.dice, knights.len())?;
        self.phase = Phase::InBattle;

        let mut battle = Battle {
            events: vec![CombatEvent::BattleStarted {
                party: knights
                    .iter()
                    .filter_map(|id| roster.knight(*id))
                    .map(|k| k.name().to_string())
                    .collect(),
                monsters: encounter.iter().map(|m| m.name().to_string()).collect(),
            }],
            knights,
            monsters: encounter.clone(),
            round: 0,
        };

        if battle.monsters.is_empty() {
            battle.events.push(CombatEvent::EncounterEmpty);
        }

        let outcome = loop {
            if let Some(outcome) =
                terminal_outcome(battle.knights.len(), battle.monsters.len())
            {
                break outcome;
            }
            if battle.round >= self.config.max_rounds {
                break BattleOutcome::Stalemate;
            }

            battle.round += 1;
            battle.knight_phase(&mut self.dice, roster);
            battle.monster_phase(&mut self.dice, roster);
            if let Some(outcome) = battle.end_round(roster) {
                break outcome;
            }
            tracing::debug!(
                round = battle.round,
                knights = battle.knights.len(),
                monsters = battle.monsters.len(),
                "round ended"
            );
        };

        let rounds = battle.round;
        let (phase, event) = match outcome {
            BattleOutcome::Won => (Phase::BattleWon, CombatEvent::BattleWon { rounds }),
            BattleOutcome::PartyDefeated => {
                (Phase::PartyDefeated, CombatEvent::PartyDefeated { rounds })
            }
            BattleOutcome::Stalemate => (Phase::Stalemate, CombatEvent::Stalemate { rounds }),
        };
        battle.events.push(event);
        self.phase = phase;
        tracing::debug!(?outcome, rounds, "battle over");

        Ok(BattleReport {
            outcome,
            rounds,
            encounter,
            events: battle.events,
        })
    }

    /// End the adventure: strip every fortune and heal every knight in the
    /// roster, active or not.
    pub fn clear(&mut self, roster: &mut Roster) {
        roster.reset_knights();
        self.phase = Phase::Idle;
    }

    /// Run a whole adventure.
    ///
    /// After every won battle `keep_exploring` decides whether another
    /// encounter follows. The roster is always cleared before returning,
    /// unless the adventure could not start at all.
    pub fn run_adventure<F>(
        &mut self,
        roster: &mut Roster,
        mut keep_exploring: F,
    ) -> Result<AdventureReport, CombatError>
    where
        F: FnMut(&BattleReport) -> bool,
    {
        let fortunes = self.initialize(roster)?;
        let explored = self.explore(roster, &mut keep_exploring);
        self.clear(roster);

        let (battles, outcome) = explored?;
        tracing::info!(battles = battles.len(), ?outcome, "adventure over");
        Ok(AdventureReport {
            fortunes,
            battles,
            outcome,
        })
    }

    fn explore<F>(
        &mut self,
        roster: &mut Roster,
        keep_exploring: &mut F,
    ) -> Result<(Vec<BattleReport>, AdventureOutcome), CombatError>
    where
        F: FnMut(&BattleReport) -> bool,
    {
        let mut battles = Vec::new();
        loop {
            let report = self.battle(roster)?;
            let outcome = report.outcome;
            let carry_on = outcome == BattleOutcome::Won && keep_exploring(&report);
            battles.push(report);

            match outcome {
                BattleOutcome::PartyDefeated => {
                    return Ok((battles, AdventureOutcome::PartyDefeated))
                }
                BattleOutcome::Stalemate => return Ok((battles, AdventureOutcome::Stalemate)),
                BattleOutcome::Won if !carry_on => return Ok((battles, AdventureOutcome::Returned)),
                BattleOutcome::Won => {}
            }
        }
    }
}
