use std::collections::BTreeMap;

use cmdrun::exec::parse_command;
use cmdrun::text::{patch_string, placeholders};
use cmdrun::types::CommandLine;
use proptest::prelude::*;

fn word() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_./=-]{1,12}"
}

proptest! {
    #[test]
    fn text_command_splits_into_words(words in prop::collection::vec(word(), 1..8)) {
        let line = words.join(" ");
        let parsed = parse_command(&CommandLine::Text(line.clone())).unwrap();

        prop_assert_eq!(&parsed.program, &words[0]);
        prop_assert_eq!(&parsed.args[..], &words[1..]);
        prop_assert_eq!(parsed.display, line);
    }

    #[test]
    fn token_command_is_passed_through(tokens in prop::collection::vec("[a-zA-Z0-9 _-]{1,10}", 1..6)) {
        let parsed = parse_command(&CommandLine::Tokens(tokens.clone())).unwrap();

        prop_assert_eq!(&parsed.program, &tokens[0]);
        prop_assert_eq!(&parsed.args[..], &tokens[1..]);
    }

    #[test]
    fn patch_string_replaces_every_known_placeholder(
        vars in prop::collection::btree_map("[a-z]{1,6}", "[a-zA-Z0-9 ]{0,8}", 1..5),
        filler in "[a-z ]{0,10}",
    ) {
        let template: String = vars
            .keys()
            .map(|k| format!("{filler}${{{k}}}"))
            .collect();
        let expected: String = vars.values().map(|v| format!("{filler}{v}")).collect();

        prop_assert_eq!(patch_string(&template, &vars), expected);
    }

    #[test]
    fn patch_string_without_values_is_identity(input in "[a-z${} ]{0,30}") {
        let empty = BTreeMap::new();
        prop_assert_eq!(patch_string(&input, &empty), input.clone());
        for name in placeholders(&input) {
            let placeholder = format!("${{{name}}}");
            prop_assert!(input.contains(&placeholder));
        }
    }
}
