use std::collections::BTreeMap;

use proptest::prelude::*;
use storagrid_policy::{
    Conditions, Effect, PolicyDocument, Principal, Statement, decode, encode,
};

fn name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9:/*._-]{1,24}"
}

fn names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(name(), 1..4)
}

fn identifier() -> impl Strategy<Value = String> {
    prop_oneof![
        1 => Just("*".to_string()),
        4 => "arn:aws:iam::[0-9]{12}:user/[a-z]{1,8}",
    ]
}

fn principal() -> impl Strategy<Value = Principal> {
    prop_oneof![
        Just(Principal::Wildcard),
        prop::collection::vec(identifier(), 0..4).prop_map(Principal::Aws),
    ]
}

fn conditions() -> impl Strategy<Value = Option<Conditions>> {
    prop::option::of(prop::collection::btree_map(
        "String[A-Z][a-z]{2,8}",
        prop::collection::btree_map("[a-z]{1,4}:[a-zA-Z]{1,8}", name(), 1..3),
        1..3,
    ))
}

prop_compose! {
    fn statement()(
        sid in prop::option::of(name()),
        allow in any::<bool>(),
        excluded_actions in any::<bool>(),
        excluded_resources in any::<bool>(),
        actions in names(),
        resources in names(),
        conditions in conditions(),
        principal in prop::option::of(principal()),
        not_principal in prop::option::of(principal()),
    ) -> Statement {
        let (actions, not_actions) = if excluded_actions {
            (Vec::new(), actions)
        } else {
            (actions, Vec::new())
        };
        let (resources, not_resources) = if excluded_resources {
            (Vec::new(), resources)
        } else {
            (resources, Vec::new())
        };

        Statement {
            sid,
            effect: if allow { Effect::Allow } else { Effect::Deny },
            actions,
            not_actions,
            resources,
            not_resources,
            conditions,
            principal,
            not_principal,
        }
    }
}

prop_compose! {
    fn document()(
        id in name(),
        version in "20[0-9]{2}-[0-9]{2}-[0-9]{2}",
        statements in prop::collection::vec(statement(), 0..5),
    ) -> PolicyDocument {
        PolicyDocument { id, version, statements }
    }
}

proptest! {
    #[test]
    fn decoding_an_encoded_document_yields_the_same_document(document in document()) {
        let bytes = encode(&document).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), document);
    }

    #[test]
    fn encoding_is_stable_across_a_round_trip(document in document()) {
        let once = encode(&document).unwrap();
        let twice = encode(&decode(&once).unwrap()).unwrap();
        prop_assert_eq!(once, twice);
    }
}

#[test]
fn single_identifier_principals_survive_the_collapse() -> anyhow::Result<()> {
    let document = PolicyDocument::new("id", "2012-10-17").with_statement(
        Statement::allow()
            .action("s3:GetObject")
            .resource("arn:aws:s3:::bucket/*")
            .principal(Principal::aws(["arn:aws:iam::123456789012:root"]))
            .not_principal(Principal::Aws(vec![]))
            .build(),
    );

    let bytes = encode(&document)?;
    let wire: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(
        wire["policy"]["Statement"][0]["Principal"],
        serde_json::json!({"AWS": "arn:aws:iam::123456789012:root"})
    );
    assert_eq!(
        wire["policy"]["Statement"][0]["NotPrincipal"],
        serde_json::json!({"AWS": "*"})
    );
    assert_eq!(decode(&bytes)?, document);
    Ok(())
}

#[test]
fn it_decodes_a_document_as_returned_by_the_api() -> anyhow::Result<()> {
    let bytes = br#"{
        "policy": {
            "Id": "test-id",
            "Version": "test-version",
            "Statement": [{
                "Sid": "test-sid",
                "Effect": "Deny",
                "Action": "test-action",
                "NotResource": ["test-not-resource", "other"],
                "Condition": {
                    "StringLike": {"s3:prefix": "test-bucket"}
                },
                "Principal": "*",
                "NotPrincipal": {
                    "AWS": [
                        "arn:aws:iam::123456789012:user/test-user",
                        "arn:aws:iam::123456789012:user/test-user2"
                    ]
                }
            }]
        }
    }"#;

    let document = decode(bytes)?;
    let statement = &document.statements[0];

    let mut expected_conditions = BTreeMap::new();
    expected_conditions.insert(
        "StringLike".to_string(),
        BTreeMap::from([("s3:prefix".to_string(), "test-bucket".to_string())]),
    );

    assert_eq!(document.id, "test-id");
    assert_eq!(document.version, "test-version");
    assert_eq!(statement.sid.as_deref(), Some("test-sid"));
    assert_eq!(statement.effect, Effect::Deny);
    assert_eq!(statement.actions, ["test-action"]);
    assert!(statement.not_actions.is_empty());
    assert!(statement.resources.is_empty());
    assert_eq!(statement.not_resources, ["test-not-resource", "other"]);
    assert_eq!(statement.conditions, Some(expected_conditions));
    assert_eq!(statement.principal, Some(Principal::Wildcard));
    assert_eq!(
        statement.not_principal,
        Some(Principal::aws([
            "arn:aws:iam::123456789012:user/test-user",
            "arn:aws:iam::123456789012:user/test-user2",
        ]))
    );
    Ok(())
}
