//! Property checks for the dice, stat and record rules.

use knights_core::combat::resolve_attack;
use knights_core::persist::{knight_record, parse_knight};
use knights_core::{
    Attributes, Combatant, Dice, DiceRoller, DiceType, Fortune, Knight, KnightId, Monster, Roster,
    ScriptedDice, Stats, MAX_ACTIVE,
};
use proptest::prelude::*;

fn any_die() -> impl Strategy<Value = DiceType> {
    prop_oneof![
        Just(DiceType::D4),
        Just(DiceType::D6),
        Just(DiceType::D8),
        Just(DiceType::D10),
        Just(DiceType::D12),
        Just(DiceType::D20),
        Just(DiceType::None),
    ]
}

fn rollable_die() -> impl Strategy<Value = DiceType> {
    proptest::sample::select(DiceType::ROLLABLE.to_vec())
}

fn any_stats() -> impl Strategy<Value = Stats> {
    (-50..200i32, -20..40i32, -10..20i32, any_die())
        .prop_map(|(hp, armor, accuracy, die)| Stats::new(hp, armor, accuracy, die))
}

proptest! {
    #[test]
    fn roll_stays_on_the_die(seed in any::<u64>(), die in rollable_die()) {
        let mut dice = Dice::seeded(seed);
        let faces = die.faces().unwrap() as i32;
        for _ in 0..50 {
            let value = dice.roll(die);
            prop_assert!((1..=faces).contains(&value));
        }
    }

    #[test]
    fn damage_stays_clamped(
        stats in any_stats(),
        hits in proptest::collection::vec(-30..60i32, 0..40),
    ) {
        let mut mob = Monster::new("Target", stats);
        for amount in hits {
            mob.add_damage(amount);
            prop_assert!(mob.damage() >= 0);
            prop_assert!(mob.damage() <= stats.max_hp.max(0));
        }
    }

    #[test]
    fn hit_iff_total_beats_armor(
        roll in 1..=20i32,
        accuracy in -10..15i32,
        armor in -5..30i32,
        die in any_die(),
    ) {
        let attacker = Stats::new(10, 0, accuracy, die);
        let defender = Stats::new(10, armor, 0, DiceType::D6);
        let mut dice = ScriptedDice::new().with_rolls([roll, 1]);

        let attack = resolve_attack(&mut dice, &attacker, &defender);
        prop_assert_eq!(attack.hit, roll + accuracy > armor);
        prop_assert_eq!(attack.total, roll + accuracy);
        if !attack.hit || die.is_none() {
            prop_assert_eq!(attack.damage, 0);
        } else {
            prop_assert!(attack.damage >= 1);
        }
    }

    #[test]
    fn fortune_overlay(base in any_stats(), delta in any_stats()) {
        let fortune = Fortune::new("Overlay", delta.max_hp, delta.armor, delta.accuracy, delta.damage_die);
        let merged = base.with_fortune(&fortune);

        prop_assert_eq!(merged.max_hp, base.max_hp + delta.max_hp);
        prop_assert_eq!(merged.armor, base.armor + delta.armor);
        prop_assert_eq!(merged.accuracy, base.accuracy + delta.accuracy);
        let expected_die = if delta.damage_die.is_none() { base.damage_die } else { delta.damage_die };
        prop_assert_eq!(merged.damage_die, expected_die);
    }

    #[test]
    fn encounter_never_outnumbers_party(seed in any::<u64>(), party in 0..=MAX_ACTIVE) {
        let mut roster = Roster::new();
        roster.add_monster(Monster::new("Rat", Stats::new(3, 0, 0, DiceType::D4)));
        let mut dice = Dice::seeded(seed);
        let encounter = roster.draw_encounter(&mut dice, party).unwrap();
        prop_assert!(encounter.len() <= party);
    }

    #[test]
    fn knight_record_round_trip(
        name in "[A-Za-z][A-Za-z ]{0,20}[A-Za-z]",
        stats in any_stats(),
        xp in any::<u32>(),
    ) {
        let knight = Knight::new(KnightId(7), name.clone(), stats, xp);
        let parsed = parse_knight(KnightId(7), &knight_record(&knight)).unwrap();

        prop_assert_eq!(parsed.name(), name.as_str());
        prop_assert_eq!(parsed.base_stats(), stats);
        prop_assert_eq!(parsed.xp(), xp);
        prop_assert_eq!(parsed.stats(), knight.stats());
    }
}
