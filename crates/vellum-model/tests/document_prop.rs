
use proptest::prelude::*;

use vellum_model::Node;

mod common;
use common::{doc, marked, p, schema, text};

fn two_paragraphs(a: &str, b: &str) -> Node {
    doc(vec![p(vec![text(a)]), p(vec![text(b)])])
}

proptest! {
    #[test]
    fn every_position_resolves_consistently(
        a in "[a-z]{1,8}",
        b in "[a-z]{1,8}",
        seed in 0usize..1000,
    ) {
        let d = two_paragraphs(&a, &b);
        let size = d.content().size();
        let pos = seed % (size + 1);
        let resolved = d.resolve(pos).unwrap();
        prop_assert!(resolved.parent_offset() <= resolved.parent().content().size());
        prop_assert_eq!(resolved.start(resolved.depth()) + resolved.parent_offset(), pos);
        // One past the end must be the only refusal.
        prop_assert!(d.resolve(size + 1).is_err());
    }

    #[test]
    fn built_documents_pass_their_own_check(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
        let d = two_paragraphs(&a, &b);
        prop_assert!(d.check().is_ok());
    }

    #[test]
    fn json_round_trip_preserves_marked_text(
        s in "[a-z]{1,8}",
        use_em in any::<bool>(),
        use_strong in any::<bool>(),
    ) {
        let mut names: Vec<&str> = Vec::new();
        if use_em {
            names.push("em");
        }
        if use_strong {
            names.push("strong");
        }
        let d = doc(vec![p(vec![marked(&s, &names)])]);
        let decoded = Node::from_json(schema(), &d.to_json()).unwrap();
        prop_assert_eq!(decoded, d);
    }
}
