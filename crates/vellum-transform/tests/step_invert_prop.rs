
use proptest::prelude::*;

use vellum_model::{Fragment, Node, Slice};
use vellum_transform::replace_step;

mod common;
use common::{doc, p, text};

fn two_paragraphs() -> Node {
    doc(vec![p(vec![text("ab")]), p(vec![text("cd")])])
}

proptest! {
    #[test]
    fn fitted_deletion_inverts_cleanly(from in 0usize..=8, to in 0usize..=8) {
        prop_assume!(from <= to);

        let before = two_paragraphs();
        let step = replace_step(&before, from, to, Slice::default()).unwrap();
        if let Some(step) = step {
            let after = step.apply(&before).into_doc().unwrap();
            let inverse = step.invert(&before).unwrap();
            let restored = inverse.apply(&after).into_doc().unwrap();
            prop_assert_eq!(restored, before);
        }
    }

    #[test]
    fn fitted_text_insertion_inverts_cleanly(pos in 0usize..=8, s in "[a-z]{1,4}") {
        let before = two_paragraphs();
        let slice = Slice::new(Fragment::from_node(text(&s)), 0, 0);
        let step = replace_step(&before, pos, pos, slice).unwrap();
        if let Some(step) = step {
            let after = step.apply(&before).into_doc().unwrap();
            let inverse = step.invert(&before).unwrap();
            let restored = inverse.apply(&after).into_doc().unwrap();
            prop_assert_eq!(restored, before);
        }
    }

    #[test]
    fn step_map_tracks_document_size(from in 0usize..=8, to in 0usize..=8) {
        prop_assume!(from <= to);

        let before = two_paragraphs();
        if let Some(step) = replace_step(&before, from, to, Slice::default()).unwrap() {
            let after = step.apply(&before).into_doc().unwrap();
            let mut growth: i64 = 0;
            step.get_map().for_each(|old_start, old_end, new_start, new_end| {
                growth += (new_end - new_start) as i64 - (old_end - old_start) as i64;
            });
            let expected = after.content().size() as i64 - before.content().size() as i64;
            prop_assert_eq!(growth, expected);
        }
    }
}
