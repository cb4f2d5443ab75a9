//! Property-based tests with proptest.

use proptest::prelude::*;
use serde_json::Value as Json;
use tfscope::token::TokenId;
use tfscope::tree::{Position, TokenTree};
use tfscope::value::coerce;

/// Text built from the characters that drive the lexer's decisions, plus some multi-byte ones
fn arb_source() -> impl Strategy<Value = String> {
    prop_oneof![
        ".{0,80}",
        "[a-z0-9_ \t\n\"{}\\[\\]().=,:$%<>#/*!?+\\-\\\\é€]{0,120}",
        prop::collection::vec(
            prop_oneof![
                Just("resource \"a\" \"b\" {\n"),
                Just("}\n"),
                Just("x = "),
                Just("\"${var.a}\""),
                Just("\"${"),
                Just("\"%{ if a }b%{ endif }\""),
                Just("\"%%{"),
                Just("\u{feff}"),
                Just("<<EOT\n"),
                Just("<<-EOT\n"),
                Just("EOT\n"),
                Just("f("),
                Just(")"),
                Just("[1, 2]"),
                Just("/* c"),
                Just("# c\n"),
                Just("a.b[0].c"),
                Just("\n"),
            ],
            0..24
        )
        .prop_map(|parts| parts.concat()),
    ]
}

fn arb_json() -> impl Strategy<Value = Json> {
    let leaf = prop_oneof![
        Just(Json::Null),
        any::<bool>().prop_map(Json::from),
        any::<i64>().prop_map(Json::from),
        (-1e9f64..1e9).prop_map(Json::from),
        "[a-z0-9 .-]{0,12}".prop_map(Json::from),
    ];

    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Json::from),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|entries| Json::Object(entries.into_iter().collect())),
        ]
    })
}

fn arb_known_type() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "string", "number", "bool", "list", "tuple", "set", "map", "object",
    ])
}

fn assert_contained(tree: &TokenTree, id: TokenId) -> Result<(), TestCaseError> {
    let token = tree.get(id);
    let mut previous_end = token.location.start.offset;

    for child in &token.children {
        let child_token = tree.get(*child);
        prop_assert!(
            token.location.contains_location(&child_token.location),
            "{} {:?} not inside {} {:?}",
            child_token.kind,
            child_token.location,
            token.kind,
            token.location
        );
        prop_assert!(
            previous_end <= child_token.location.start.offset,
            "{} at {:?} overlaps its previous sibling",
            child_token.kind,
            child_token.location
        );
        prop_assert_eq!(child_token.parent, Some(id));
        previous_end = child_token.location.end.offset;

        assert_contained(tree, *child)?;
    }

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Concatenating the flat token stream reproduces the input
    #[test]
    fn prop_lexer_is_total_and_gap_free(source in arb_source()) {
        let tree = tfscope::lexer::tokenize(&source);
        let concatenated: String = tree
            .children(tree.root())
            .map(|token| tree.text(token.id))
            .collect();
        prop_assert_eq!(concatenated, source);
    }

    #[test]
    fn prop_tree_children_are_contained(source in arb_source()) {
        let tree = tfscope::tree::parse(&source);
        assert_contained(&tree, tree.root())?;
    }

    #[test]
    fn prop_ids_follow_creation_order(source in arb_source()) {
        let tree = tfscope::tree::parse(&source);
        for (index, token) in tree.iter().enumerate() {
            prop_assert_eq!(token.id, TokenId(index));
        }
    }

    #[test]
    fn prop_decorators_do_not_overlap(source in arb_source()) {
        let tree = tfscope::lexer::tokenize(&source);
        for token in tree.iter() {
            let text_len = tree.text(token.id).len();
            for pair in token.decorators.windows(2) {
                prop_assert!(pair[0].start_index < pair[1].start_index);
                prop_assert!(pair[0].end_index <= pair[1].start_index);
            }
            for decorator in &token.decorators {
                prop_assert!(decorator.start_index < decorator.end_index);
                prop_assert!(decorator.end_index <= text_len);
            }
        }
    }

    /// Any position, even outside the document, yields a context
    #[test]
    fn prop_position_context_is_total(
        source in arb_source(),
        line in 0usize..12,
        character in 0usize..48,
    ) {
        let tree = tfscope::tree::parse(&source);
        let position = Position::new(line, character);
        let _ = tfscope::tree::position_context(&tree, position);

        let point = tree.point_at(position);
        prop_assert!(point.offset <= source.len());
        prop_assert!(source.is_char_boundary(point.offset));
    }

    /// Up to the re-typing of elements, coercing the JSON form again changes nothing
    #[test]
    fn prop_coercion_is_stable(raw in arb_json(), declared_type in arb_known_type()) {
        let json = coerce(&raw, declared_type).to_json();
        prop_assert_eq!(coerce(&json, declared_type).to_json(), json);
    }

    #[test]
    fn prop_unknown_types_fall_back_to_json_text(raw in arb_json(), declared_type in "[a-z]{0,8}") {
        let known = ["string", "number", "bool", "list", "tuple", "set", "map", "object"];
        prop_assume!(!known.contains(&declared_type.as_str()));
        prop_assert_eq!(coerce(&raw, &declared_type).to_json(), Json::String(raw.to_string()));
    }
}
