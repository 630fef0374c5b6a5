#[cfg(test)]
mod tests {
    use crate::config::ResolverConfig;
    use crate::pipeline::{process_message, MessageOutcome};
    use crate::tests::common::{inputs, predictable_rng, TestStoreBuilder};
    use pretty_assertions::assert_eq;

    fn render(text: &str) -> (String, Box<crate::payload::BattlePayload>) {
        let config = ResolverConfig::default();
        let stored = TestStoreBuilder::new().with_name("Red").player();
        match process_message(text, inputs(&config, &stored), &mut predictable_rng()) {
            Ok(MessageOutcome::Rendered { message, payload }) => (message, payload),
            other => panic!("expected a rendered message, got {:?}", other),
        }
    }

    #[test]
    fn test_commented_declaration_with_surrounding_prose() {
        let text = r#"Gym Leader Misty steps forward!
<PKM_BATTLE>
Here is the battle:
{
  /* the gym battle */
  "enemy": {
    "name": "Misty", // leader
    "id": "misty",
    "lines": {"start": "My policy is an all-out offensive with water-type Pokemon!"},
    "party": [
      {"name": "Staryu", "lv": 18, "moves": ["Water Gun", "Tackle"]},
      {"name": "Starmie", "lv": 21, "moves": ["Water Pulse", "Swift"], "item": "http://not-a-comment"}
    ]
  }
}
Good luck!
</PKM_BATTLE>"#;

        let (message, payload) = render(text);
        assert_eq!(payload.enemy.name, "Misty");
        assert_eq!(payload.enemy.id.as_deref(), Some("misty"));
        assert_eq!(payload.party.len(), 2);
        assert_eq!(payload.party[1]["item"], "http://not-a-comment");
        assert!(message.starts_with("Gym Leader Misty steps forward!"));
        assert!(message.trim_end().ends_with("</PKM_FRONTEND>"));
    }

    #[test]
    fn test_declarations_inside_thinking_are_ignored() {
        let text = "<think>maybe <PKM_BATTLE>{\"enemy\": {\"name\": \"Brock\"}}</PKM_BATTLE></think>\
                    Final answer: <PKM_BATTLE>{\"enemy\": {\"name\": \"Erika\", \"party\": [\"Gloom\"]}}</PKM_BATTLE>";
        let (_, payload) = render(text);
        assert_eq!(payload.enemy.name, "Erika");
    }

    #[test]
    fn test_last_of_several_blocks_wins() {
        let text = "<PKM_BATTLE>{\"enemy\": {\"name\": \"Lt. Surge\"}}</PKM_BATTLE>\n\
                    Actually, a rematch:\n\
                    <PKM_BATTLE>{\"enemy\": {\"name\": \"Sabrina\"}}</PKM_BATTLE>";
        let (_, payload) = render(text);
        assert_eq!(payload.enemy.name, "Sabrina");
    }
}
