//! Property-based tests for model types.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use crate::model::{relations_allow, Action, ClaimSet, Relation};

    fn relation_strategy() -> impl Strategy<Value = Relation> {
        prop::sample::select(Relation::ALL.to_vec())
    }

    fn action_strategy() -> impl Strategy<Value = Action> {
        prop::sample::select(Action::ALL.to_vec())
    }

    /// Claim names in the dotted `feature.verb` format used by tokens
    fn claim_strategy() -> impl Strategy<Value = String> {
        ("[a-z]{1,10}", "[a-z]{1,10}").prop_map(|(f, v)| format!("{f}.{v}"))
    }

    proptest! {
        #[test]
        fn test_owner_dominates_every_relation(
            rel in relation_strategy(),
            action in action_strategy(),
        ) {
            // Anything another relation grants, owner grants too
            if rel.allows(action) {
                prop_assert!(Relation::Owner.allows(action));
            }
        }

        #[test]
        fn test_union_matches_any(
            rels in prop::collection::vec(relation_strategy(), 0..4),
            action in action_strategy()
        ) {
            let expected = rels.iter().any(|r| r.allowed_actions().contains(&action));
            prop_assert_eq!(relations_allow(&rels, action), expected);
        }

        #[test]
        fn test_non_owner_never_deletes(rel in relation_strategy()) {
            if rel != Relation::Owner {
                prop_assert!(!rel.allows(Action::Delete));
                prop_assert!(!rel.allows(Action::Share));
            }
        }

        #[test]
        fn test_action_name_roundtrip(action in action_strategy()) {
            prop_assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }

        #[test]
        fn test_unknown_action_names_rejected(s in "[a-z]{1,12}") {
            let known = ["read", "write", "delete", "share"];
            prop_assert_eq!(s.parse::<Action>().is_ok(), known.contains(&s.as_str()));
        }

        #[test]
        fn test_claim_flattening_is_union(
            flat in prop::collection::vec(claim_strategy(), 0..5),
            nested in prop::collection::vec(claim_strategy(), 0..5)
        ) {
            let claims = ClaimSet::from_token_claims(&json!({
                "permissions": flat,
                "roles": [{"permissions": nested}]
            }));
            for c in flat.iter().chain(nested.iter()) {
                prop_assert!(claims.contains(c));
            }
            let distinct: std::collections::BTreeSet<_> =
                flat.iter().chain(nested.iter()).collect();
            prop_assert_eq!(claims.len(), distinct.len());
        }
    }
}
