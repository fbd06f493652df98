//! Text rendering for knights, fortunes and combat events.
//!
//! Everything here returns strings; the command loop decides where they go.

use knights_core::combat::{BattleOutcome, CombatEvent, Side};
use knights_core::{Attributes, BattleReport, Combatant, Fortune, Knight};

pub const SPLASH: &str = "Round Table Games: Knights of Legend\nloading...";

pub const FAREWELL: &str = "Enjoy your rest! Until another adventure.";

pub const HELP: &str = "\
Unsure what to do, here are some options:
    ls or list all              - list the knights
    list active                 - list the active knights only
    show <name or id>           - show the knight details card
    set active <name or id>     - set knight as active (only 4 knights can be active)
    remove active <name or id>  - remove a knight from active status (heals knight)
    explore or adventure or quest - find random monsters to fight
    save [filename]             - save the knights (.json for a full snapshot)
    exit or goodbye             - leave the game

Game rules: You can have four active knights. As long as they are active,
they won't heal, but they can gain XP by going on adventures. When you make
a knight inactive, they will heal. How many monsters can you defeat before
you have to heal?";

const CARD_WIDTH: usize = 28;

/// A knight's details card.
pub fn knight_card(knight: &Knight) -> String {
    let border = format!("+{}+", "=".repeat(CARD_WIDTH));
    let blank = format!("|{}|", " ".repeat(CARD_WIDTH));
    let mut lines = vec![border.clone()];
    lines.push(format!("| {:<27}|", knight.name()));
    lines.push(format!("| id: {:<23}|", knight.id().0));
    lines.push(blank.clone());
    lines.push(format!("| Health: {:<6}  XP: {:<7}|", knight.hp(), knight.xp()));
    lines.push(format!(
        "|  Power: {:<6}  Armor: {:<4}|",
        knight.damage_die().to_string(),
        knight.armor()
    ));
    lines.push(blank);
    lines.push(border);
    lines.join("\n")
}

/// A fortune's details card.
pub fn fortune_card(fortune: &Fortune) -> String {
    let border = "+======================+";
    [
        border.to_string(),
        format!("|{:<22}|", fortune.name()),
        format!("|    HP Bonus: {:>+8}|", fortune.max_hp()),
        format!("|    AC Bonus: {:>+8}|", fortune.armor()),
        format!("|    Accuracy: {:>+8}|", fortune.accuracy()),
        format!("|  Damage Die: {:>8}|", fortune.damage_die().to_string()),
        border.to_string(),
    ]
    .join("\n")
}

/// `id: name` lines, or a placeholder when empty.
pub fn knight_list(knights: &[&Knight]) -> String {
    if knights.is_empty() {
        return "No knights to list".to_string();
    }
    knights
        .iter()
        .map(|k| format!("{}: {}", k.id(), k.name()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Party and foes side by side.
fn lineup(party: &[String], monsters: &[String]) -> String {
    let mut out = String::from(
        "Our heroes come across the following monsters. Prepare for battle!\nKnights                     Foes",
    );
    for row in 0..party.len().max(monsters.len()) {
        let knight = party.get(row).map(String::as_str).unwrap_or("");
        let foe = monsters.get(row).map(String::as_str).unwrap_or("");
        out.push('\n');
        out.push_str(format!("{knight:<28}{foe}").trim_end());
    }
    out
}

/// Narrative line for an event, if it gets one.
///
/// Attack rolls and round bookkeeping are only shown when `verbose`.
pub fn event_line(event: &CombatEvent, verbose: bool) -> Option<String> {
    match event {
        CombatEvent::FortuneAssigned {
            knight, fortune, ..
        } => Some(format!("{knight} drew\n{}", fortune_card(fortune))),
        CombatEvent::BattleStarted { party, monsters } => Some(lineup(party, monsters)),
        CombatEvent::EncounterEmpty => Some("The road is quiet. No monsters this time.".to_string()),
        CombatEvent::AttackResolved {
            side,
            attacker,
            target,
            attack,
            target_hp,
            ..
        } if verbose => {
            let verb = match side {
                Side::Knights => "strikes at",
                Side::Monsters => "lunges at",
            };
            let result = if attack.hit {
                format!("hits for {} ({target} has {target_hp} HP)", attack.damage)
            } else {
                "misses".to_string()
            };
            Some(format!(
                "  {attacker} {verb} {target}: {} vs armor {}, {result}",
                attack.total, attack.target_armor
            ))
        }
        CombatEvent::KnightDefeated { knight, .. } => Some(format!("{knight} has fallen!")),
        CombatEvent::MonsterDefeated { monster, .. } => Some(format!("{monster} was defeated!")),
        CombatEvent::ExperienceAwarded {
            knight,
            amount,
            total,
            ..
        } if verbose => Some(format!("  {knight} gains {amount} XP ({total} total)")),
        CombatEvent::RoundEnded {
            round,
            knights_left,
            monsters_left,
        } if verbose => Some(format!(
            "  -- end of round {round}: {knights_left} knights, {monsters_left} foes --"
        )),
        CombatEvent::BattleWon { .. } => Some("Victory! The foes lie defeated.".to_string()),
        CombatEvent::PartyDefeated { .. } => {
            Some("All active knights have been defeated!".to_string())
        }
        CombatEvent::Stalemate { rounds } => Some(format!(
            "After {rounds} rounds neither side can prevail. The party withdraws."
        )),
        _ => None,
    }
}

/// All narrative lines of a battle.
pub fn battle_text(report: &BattleReport, verbose: bool) -> String {
    report
        .events
        .iter()
        .filter_map(|event| event_line(event, verbose))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Opening text of an adventure.
pub fn fortunes_text(events: &[CombatEvent]) -> String {
    let mut lines = vec!["For this quest, our knights drew the following fortunes!".to_string()];
    lines.extend(events.iter().filter_map(|event| event_line(event, false)));
    lines.join("\n")
}

/// Closing line of an adventure, from how its last battle went.
pub fn adventure_end(last: BattleOutcome) -> &'static str {
    match last {
        BattleOutcome::Won => "The party returns home to rest.",
        BattleOutcome::PartyDefeated => "The fallen are carried home to heal.",
        BattleOutcome::Stalemate => "The party returns home, weary but alive.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knights_core::combat::AttackRoll;
    use knights_core::{DiceType, KnightId, Stats};

    #[test]
    fn test_knight_card() {
        let knight = Knight::new(KnightId(2), "Lancelot", Stats::new(28, 9, 4, DiceType::D10), 12);
        let card = knight_card(&knight);
        let lines: Vec<_> = card.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(lines.iter().all(|line| line.chars().count() == CARD_WIDTH + 2));
        assert!(card.contains("| Lancelot"));
        assert!(card.contains("| id: 2 "));
        assert!(card.contains("Health: 28"));
        assert!(card.contains("Power: D10"));
    }

    #[test]
    fn test_fortune_card_signs() {
        let card = fortune_card(&Fortune::new("Curse of Horus", -5, 0, -2, DiceType::None));
        assert!(card.contains("HP Bonus:       -5"));
        assert!(card.contains("AC Bonus:       +0"));
        assert!(card.contains("Damage Die:        -"));
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(knight_list(&[]), "No knights to list");
    }

    #[test]
    fn test_lineup_pads_shorter_side() {
        let text = lineup(
            &["Arthur".to_string(), "Kay".to_string()],
            &["Goblin".to_string()],
        );
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[2], format!("{:<28}Goblin", "Arthur"));
        assert_eq!(lines[3], "Kay");
    }

    #[test]
    fn test_attack_lines_only_when_verbose() {
        let event = CombatEvent::AttackResolved {
            round: 1,
            side: Side::Knights,
            attacker: "Arthur".to_string(),
            target: "Goblin".to_string(),
            attack: AttackRoll {
                roll: 15,
                total: 18,
                target_armor: 11,
                hit: true,
                damage: 7,
            },
            target_hp: 0,
        };
        assert_eq!(event_line(&event, false), None);
        let line = event_line(&event, true).unwrap();
        assert!(line.contains("18 vs armor 11"));
        assert!(line.contains("hits for 7"));
    }
}
