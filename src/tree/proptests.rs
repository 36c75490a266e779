//! Property-based tests for the route trie

use super::*;
use crate::error::ErrorKind;
use crate::handler::{handler_fn, Response};
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

/// One route segment: a literal or a parameter
#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Param(String),
}

impl Segment {
    fn route_text(&self) -> String {
        match self {
            Segment::Literal(text) => text.clone(),
            Segment::Param(name) => format!(":{name}"),
        }
    }
}

fn arb_segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        "[a-z]{1,6}".prop_map(Segment::Literal),
        "[a-z]{1,4}".prop_map(Segment::Param),
    ]
}

/// A route whose parameter names are unique along the path
fn arb_route() -> impl Strategy<Value = Vec<Segment>> {
    proptest::collection::vec(arb_segment(), 0..6).prop_map(|segments| {
        segments
            .into_iter()
            .enumerate()
            .map(|(i, segment)| match segment {
                Segment::Param(name) => Segment::Param(format!("{name}{i}")),
                literal @ Segment::Literal(_) => literal,
            })
            .collect()
    })
}

fn join(route: &[Segment]) -> String {
    route
        .iter()
        .map(Segment::route_text)
        .collect::<Vec<_>>()
        .join("/")
}

fn noop() -> BoxHandler {
    handler_fn(|_ctx| async move { Ok(Response::new()) })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// A compatible input resolves and captures the value at every parameter position
    #[test]
    fn prop_compatible_input_matches(
        route in arb_route(),
        values in proptest::collection::vec("[0-9A-Z]{1,5}", 6),
    ) {
        let mut tree = RouteTree::new();
        tree.insert(&join(&route), noop()).unwrap();

        let input: Vec<String> = route
            .iter()
            .zip(&values)
            .map(|(segment, value)| match segment {
                Segment::Literal(text) => text.clone(),
                Segment::Param(_) => value.clone(),
            })
            .collect();
        let input: Vec<&str> = input.iter().map(String::as_str).collect();

        let found = tree.find(&input);
        prop_assert!(found.is_some(), "no match for {:?}", input);
        let params = found.unwrap().params;

        let expected: HashMap<String, String> = route
            .iter()
            .zip(&values)
            .filter_map(|(segment, value)| match segment {
                Segment::Param(name) => Some((name.clone(), value.clone())),
                Segment::Literal(_) => None,
            })
            .collect();
        prop_assert_eq!(params, expected);
    }

    /// Inputs with a different segment count never match a single registered route
    #[test]
    fn prop_segment_count_must_be_exact(
        route in arb_route(),
        extra in "[a-z]{1,6}",
        drop_last in any::<bool>(),
    ) {
        let mut tree = RouteTree::new();
        tree.insert(&join(&route), noop()).unwrap();

        let mut input: Vec<String> = route
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.clone(),
                Segment::Param(_) => "v".to_string(),
            })
            .collect();
        if drop_last && !input.is_empty() {
            input.pop();
        } else {
            input.push(extra);
        }
        let input: Vec<&str> = input.iter().map(String::as_str).collect();

        prop_assert!(tree.find(&input).is_none());
    }

    /// Registering the same route twice fails whatever else was registered in between
    #[test]
    fn prop_duplicate_always_rejected(
        route in arb_route(),
        others in proptest::collection::vec(arb_route(), 0..4),
    ) {
        let mut tree = RouteTree::new();
        let path = join(&route);
        tree.insert(&path, noop()).unwrap();
        for other in &others {
            let other = join(other);
            if other != path {
                // Other routes may collide with each other; only the first one wins.
                let _ = tree.insert(&other, noop());
            }
        }

        let err = tree.insert(&path, noop()).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Duplicate);
    }
}
