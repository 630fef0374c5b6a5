#[cfg(test)]
mod tests {
    use crate::config::ResolverConfig;
    use crate::pipeline::{process_message, MessageOutcome};
    use crate::roster::{IndividualValues, MAX_MOVES};
    use crate::tests::common::{declaration_message, inputs, predictable_rng, TestStoreBuilder};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::rstest;
    use serde_json::Value;

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(42)]
    fn test_bare_wild_rattata_is_completed(#[case] seed: u64) {
        let config = ResolverConfig::default();
        let stored = TestStoreBuilder::new().player();
        let text = declaration_message(r#"{"enemy": {"type": "wild", "party": [{"name": "Rattata"}]}}"#);

        let Ok(MessageOutcome::Rendered { payload, .. }) =
            process_message(&text, inputs(&config, &stored), &mut StdRng::seed_from_u64(seed))
        else {
            panic!("expected a rendered payload");
        };

        assert_eq!(payload.enemy.kind, "wild");
        assert_eq!(payload.party.len(), 1);
        let rattata = &payload.party[0];
        assert_eq!(rattata["name"], "Rattata");
        assert_eq!(rattata["lv"], 5);
        assert_eq!(rattata["stats_meta"]["ev_level"], 0);

        let ivs: IndividualValues = match serde_json::from_value(rattata["stats_meta"]["ivs"].clone()) {
            Ok(ivs) => ivs,
            Err(e) => panic!("generated ivs did not parse: {}", e),
        };
        assert!(ivs.is_valid());

        let moves = rattata["moves"].as_array().map(Vec::len).unwrap_or(0);
        assert!((1..=MAX_MOVES).contains(&moves), "got {} moves", moves);
    }

    #[test]
    fn test_wild_keyword_name_with_empty_party() {
        let config = ResolverConfig::default();
        let stored = TestStoreBuilder::new().player();
        let text = declaration_message(r#"{"enemy": {"name": "Wild Pokemon"}}"#);

        let Ok(MessageOutcome::Rendered { payload, .. }) =
            process_message(&text, inputs(&config, &stored), &mut predictable_rng())
        else {
            panic!("expected a rendered payload");
        };
        assert_eq!(payload.enemy.kind, "wild");
        assert_eq!(payload.party.len(), 1);
        assert_eq!(payload.party[0]["name"], config.roster.npc_fallback_species.as_str());
    }

    #[test]
    fn test_trainer_name_that_is_a_species_becomes_the_party() {
        let config = ResolverConfig::default();
        let stored = TestStoreBuilder::new().player();
        let text = declaration_message(r#"{"enemy": {"type": "wild", "name": "Snorlax"}}"#);

        let Ok(MessageOutcome::Rendered { payload, .. }) =
            process_message(&text, inputs(&config, &stored), &mut predictable_rng())
        else {
            panic!("expected a rendered payload");
        };
        assert_eq!(payload.party[0]["name"], "Snorlax");
        assert_eq!(payload.party[0]["lv"], 5);
    }

    #[test]
    fn test_tier_sets_generated_level() {
        let config = ResolverConfig::default();
        let stored = TestStoreBuilder::new().player();
        let text = declaration_message(
            r#"{"tier": 2, "enemy": {"name": "Ace Trainer Kim", "party": ["Eevee", {"name": "Lapras", "lv": 61}]}}"#,
        );

        let Ok(MessageOutcome::Rendered { payload, .. }) =
            process_message(&text, inputs(&config, &stored), &mut predictable_rng())
        else {
            panic!("expected a rendered payload");
        };
        let levels: Vec<&Value> = payload.party.iter().map(|e| &e["lv"]).collect();
        assert_eq!(levels, vec![&Value::from(50), &Value::from(61)]);
        assert_eq!(payload.enemy.kind, "trainer");
    }
}
