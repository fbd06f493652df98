//! End-to-end adventures through the public API.
//!
//! Dice are scripted or seeded so every run is deterministic.

use knights_core::combat::{AdventureOutcome, BattleOutcome, CombatEvent, Side};
use knights_core::testing::{assert_hp, assert_party, assert_roster_reset, assert_xp, TestHarness};
use knights_core::{
    CombatEngine, Dice, DiceType, EngineConfig, FortunePolicy, Fortune, Monster,
    Phase, ScriptedDice, Stats,
};

fn veteran() -> Stats {
    Stats::new(40, 15, 5, DiceType::D12)
}

// =============================================================================
// Scripted battles
// =============================================================================

#[test]
fn test_two_round_victory() {
    let mut harness = TestHarness::new();
    harness.roster.add_fortune(Fortune::new("Stoneskin", 0, 3, 0, DiceType::None));
    harness
        .roster
        .add_monster(Monster::new("Orc", Stats::new(12, 10, 2, DiceType::D8)));
    let arthur = harness.add_active_knight("Arthur", Stats::new(20, 8, 1, DiceType::D10));

    // Picks: fortune, encounter size 1, archetype, then targets.
    // Round 1: Arthur hits for 7, the orc rolls 5 + 2 against armor 11 and misses.
    // Round 2: Arthur hits for 6 and the orc drops.
    let dice = ScriptedDice::new()
        .with_picks([0, 1, 0, 0, 0, 0])
        .with_rolls([14, 7, 5, 12, 6]);
    let mut engine = CombatEngine::new(dice);

    let mut battles = Vec::new();
    let report = engine
        .run_adventure(&mut harness.roster, |battle| {
            battles.push(battle.outcome);
            false
        })
        .unwrap();

    assert_eq!(battles, vec![BattleOutcome::Won]);
    assert_eq!(report.outcome, AdventureOutcome::Returned);
    let battle = &report.battles[0];
    assert_eq!(battle.rounds, 2);
    assert_eq!(battle.encounter.len(), 1);

    let misses: Vec<_> = battle
        .events
        .iter()
        .filter_map(|event| match event {
            CombatEvent::AttackResolved {
                side: Side::Monsters,
                attack,
                ..
            } => Some(attack),
            _ => None,
        })
        .collect();
    assert_eq!(misses.len(), 1);
    assert_eq!(misses[0].target_armor, 11);
    assert!(!misses[0].hit);

    // Fortune gone and wounds healed, experience kept.
    assert_xp(&harness, arthur, 1);
    assert_hp(&harness, arthur, 20);
    assert_roster_reset(&harness);
    assert_party(&harness, &[arthur]);
}

#[test]
fn test_fallen_knight_sits_out_next_battle() {
    let mut harness = TestHarness::new();
    harness.roster.add_fortune(Fortune::none());
    harness
        .roster
        .add_monster(Monster::new("Wolf", Stats::new(4, 5, 0, DiceType::D6)));
    let frail = harness.add_active_knight("Frail", Stats::new(2, 0, 0, DiceType::D4));
    let stout = harness.add_active_knight("Stout", Stats::new(30, 0, 0, DiceType::D6));

    // Battle 1: two wolves. Frail misses wolf 0, Stout kills it, wolf 1
    // mauls Frail. Round 2: Stout kills wolf 1.
    // Battle 2: only Stout stands and meets a single wolf.
    let dice = ScriptedDice::new()
        .with_picks([0, 0, 2, 0, 0, 0, 0, 0, 0, 1, 0, 0])
        .with_rolls([1, 20, 6, 20, 4, 20, 6, 20, 6]);
    let mut engine = CombatEngine::new(dice);

    let mut seen = 0;
    let report = engine
        .run_adventure(&mut harness.roster, |_| {
            seen += 1;
            seen < 2
        })
        .unwrap();

    assert_eq!(report.battles.len(), 2);
    let first = &report.battles[0];
    assert!(first.events.iter().any(|e| matches!(
        e,
        CombatEvent::KnightDefeated { knight_id, .. } if *knight_id == frail
    )));
    // Frail is removed before the wolves, so only Stout is paid.
    let second = &report.battles[1];
    match &second.events[0] {
        CombatEvent::BattleStarted { party, .. } => assert_eq!(party, &vec!["Stout".to_string()]),
        other => panic!("expected BattleStarted, got {other:?}"),
    }
    assert_eq!(second.encounter.len(), 1);
    assert_xp(&harness, stout, 3);
    assert_xp(&harness, frail, 0);
    assert_roster_reset(&harness);
}

#[test]
fn test_engine_rejects_out_of_order_calls() {
    let mut harness = TestHarness::with_catalogs();
    harness.add_active_knight("Kay", veteran());
    let mut engine = CombatEngine::new(ScriptedDice::new());

    engine.initialize(&mut harness.roster).unwrap();
    assert!(engine.initialize(&mut harness.roster).is_err());
    assert_eq!(engine.phase(), Phase::PartyBuffed);

    engine.clear(&mut harness.roster);
    assert_eq!(engine.phase(), Phase::Idle);
    assert_roster_reset(&harness);
}

// =============================================================================
// Seeded battles
// =============================================================================

#[test]
fn test_seeded_adventures_replay() {
    fn run(seed: u64) -> (Vec<CombatEvent>, Vec<u32>) {
        let mut harness = TestHarness::with_catalogs();
        for name in ["Arthur", "Bedivere", "Cai"] {
            harness.add_active_knight(name, veteran());
        }
        let mut engine = CombatEngine::new(Dice::seeded(seed));
        let mut battles = 0;
        let report = engine
            .run_adventure(&mut harness.roster, |_| {
                battles += 1;
                battles < 5
            })
            .unwrap();
        let events = report.battles.into_iter().flat_map(|b| b.events).collect();
        let xp = harness.roster.knights().iter().map(|k| k.xp()).collect();
        (events, xp)
    }

    assert_eq!(run(2024), run(2024));
}

#[test]
fn test_many_seeded_adventures_keep_invariants() {
    for seed in 0..50 {
        let mut harness = TestHarness::with_catalogs();
        for name in ["A", "B", "C", "D"] {
            harness.add_active_knight(name, Stats::new(15, 11, 2, DiceType::D8));
        }
        let reserve = harness.add_knight("Reserve", Stats::new(15, 11, 2, DiceType::D8));

        let config = EngineConfig::default().with_fortune_policy(if seed % 2 == 0 {
            FortunePolicy::PerKnight
        } else {
            FortunePolicy::Shared
        });
        let mut engine = CombatEngine::with_config(Dice::seeded(seed), config);
        let report = engine
            .run_adventure(&mut harness.roster, |_| true)
            .unwrap();

        // With no retreat, the adventure ends only in defeat or stalemate.
        assert_ne!(report.outcome, AdventureOutcome::Returned, "seed {seed}");
        for battle in &report.battles {
            let defeats = battle
                .events
                .iter()
                .filter(|e| matches!(e, CombatEvent::MonsterDefeated { .. }))
                .count();
            assert!(defeats <= battle.encounter.len(), "seed {seed}");
        }
        assert_roster_reset(&harness);
        assert_xp(&harness, reserve, 0);
        assert_eq!(engine.phase(), Phase::Idle);
    }
}
