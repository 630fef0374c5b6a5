#[cfg(test)]
mod tests {
    use crate::config::ResolverConfig;
    use crate::declaration::BattleDeclaration;
    use crate::dex::Dex;
    use crate::errors::ResolveError;
    use crate::player::StoredPlayer;
    use crate::resolver::{Resolver, TrainerKind};
    use crate::tests::common::predictable_rng;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn member(name: &str, levels: &[u8]) -> Value {
        let party: Vec<Value> = levels
            .iter()
            .map(|lv| json!({"name": "Pidgey", "lv": lv, "moves": ["Tackle"]}))
            .collect();
        json!({"name": name, "party": party})
    }

    fn levels_of(roster: &[crate::roster::RosterEntry], trainer: &str) -> Vec<u8> {
        let mut levels: Vec<u8> = roster
            .iter()
            .filter(|e| e.trainer.as_deref() == Some(trainer))
            .map(|e| e.level)
            .collect();
        levels.sort_unstable_by(|a, b| b.cmp(a));
        levels
    }

    #[test]
    fn test_over_capacity_alliance_keeps_highest_levels() {
        let config = ResolverConfig::default();
        let stored = StoredPlayer::default();
        let declaration = BattleDeclaration::parse(
            &json!({
                "enemy": {
                    "entrants": [
                        member("Team A", &[10, 40, 30, 20]),
                        member("Team B", &[11, 12, 50, 13, 14]),
                    ]
                }
            }),
            &config.identity,
        )
        .unwrap();

        let battle = Resolver::new(Dex::compiled(), &config, &stored)
            .resolve(&declaration, &mut predictable_rng())
            .unwrap();

        let roster = &battle.side_b.roster;
        assert_eq!(roster.len(), 6);
        assert_eq!(levels_of(roster, "Team A"), vec![40, 30, 20]);
        assert_eq!(levels_of(roster, "Team B"), vec![50, 14, 13]);
        assert_eq!(battle.side_b.name, "Team A & Team B");
        assert_eq!(battle.side_b.kind, TrainerKind::Generated);
    }

    #[test]
    fn test_member_declaring_more_than_capacity_keeps_its_strongest() {
        let config = ResolverConfig::default();
        let stored = StoredPlayer::default();
        let rising: Vec<u8> = (10..=17).collect();
        let declaration = BattleDeclaration::parse(
            &json!({
                "enemy": {"entrants": [member("Team A", &rising), member("Team B", &[9])]}
            }),
            &config.identity,
        )
        .unwrap();

        let battle = Resolver::new(Dex::compiled(), &config, &stored)
            .resolve(&declaration, &mut predictable_rng())
            .unwrap();

        let roster = &battle.side_b.roster;
        assert_eq!(roster.len(), 6);
        assert_eq!(levels_of(roster, "Team A"), vec![17, 16, 15, 14, 13]);
        assert_eq!(levels_of(roster, "Team B"), vec![9]);
    }

    #[test]
    fn test_under_capacity_alliance_keeps_everything() {
        let config = ResolverConfig::default();
        let stored = StoredPlayer::default();
        let declaration = BattleDeclaration::parse(
            &json!({
                "enemy": {
                    "name": "Rocket Duo",
                    "entrants": [member("Jessie", &[20, 22]), member("James", &[21])],
                    "unlocks": {"enable_mega": false}
                }
            }),
            &config.identity,
        )
        .unwrap();

        let battle = Resolver::new(Dex::compiled(), &config, &stored)
            .resolve(&declaration, &mut predictable_rng())
            .unwrap();

        assert_eq!(battle.side_b.name, "Rocket Duo");
        assert_eq!(battle.side_b.roster.len(), 3);
        assert_eq!(levels_of(&battle.side_b.roster, "Jessie"), vec![22, 20]);
        assert_eq!(levels_of(&battle.side_b.roster, "James"), vec![21]);
    }

    #[test]
    fn test_too_many_contributing_members_is_refused() {
        let config = ResolverConfig::default();
        let stored = StoredPlayer::default();
        let entrants: Vec<Value> = (1..=7).map(|i| member(&format!("Grunt {}", i), &[10])).collect();
        let declaration =
            BattleDeclaration::parse(&json!({"enemy": {"entrants": entrants}}), &config.identity).unwrap();

        assert_matches!(
            Resolver::new(Dex::compiled(), &config, &stored).resolve(&declaration, &mut predictable_rng()),
            Err(ResolveError::AllianceOverCapacity { members: 7, capacity: 6, .. })
        );
    }
}
