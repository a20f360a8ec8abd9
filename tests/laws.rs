// tests/laws.rs

use proptest::prelude::*;
use serde_json::json;
use validif_lang::{validate_sync, RemoteRegistry, Rule, Value};

const COMPARISONS: [&str; 6] = ["eq", "neq", "lt", "lte", "gt", "gte"];

fn model() -> serde_json::Value {
    json!({
        "Zero": 0,
        "Two": 2,
        "Empty": "",
        "Ex": "x",
        "No": "false",
        "Nothing": null,
        "Tags": ["a", "b"],
        "NoTags": [],
        "Agree": true,
        "Today": "2024-05-17",
    })
}

fn check(rule: &str, value: &Value) -> bool {
    let rule = Rule::parse(rule).unwrap();
    validate_sync(&rule, value, &model(), &RemoteRegistry::empty()).unwrap()
}

/// Rule text for an operand that never evaluates to null.
fn operand() -> impl Strategy<Value = String> {
    prop_oneof![
        (-1.0e6f64..1.0e6).prop_map(|n| n.to_string()),
        any::<bool>().prop_map(|b| b.to_string()),
        "[a-zA-Z0-9 ]{0,8}".prop_map(|s| format!("['str','{}']", s)),
        prop::sample::select(vec!["'Zero'", "'Two'", "'Empty'", "'Ex'", "'Tags'", "'Agree'", "'Today'"])
            .prop_map(str::to_string),
    ]
}

fn field() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "Zero", "Two", "Empty", "Ex", "No", "Nothing", "Tags", "NoTags", "Agree", "Missing",
    ])
}

proptest! {
    #[test]
    fn test_null_operand_passes_every_comparison(
        op in prop::sample::select(COMPARISONS.to_vec()),
        other in operand(),
    ) {
        let left_null = format!("['{}','Nothing',{}]", op, other);
        let right_null = format!("['{}',{},'Missing']", op, other);
        let one_operand = format!("['{}',{}]", op, other);
        prop_assert!(check(&left_null, &Value::Null));
        prop_assert!(check(&right_null, &Value::Null));
        prop_assert!(check(&one_operand, &Value::Null));
    }

    #[test]
    fn test_eq_and_neq_are_complementary(a in operand(), b in operand()) {
        let eq = check(&format!("['eq',{},{}]", a, b), &Value::Null);
        let neq = check(&format!("['neq',{},{}]", a, b), &Value::Null);
        prop_assert_ne!(eq, neq);
    }

    #[test]
    fn test_orderings_mirror(a in operand(), b in operand()) {
        prop_assert_eq!(
            check(&format!("['lt',{},{}]", a, b), &Value::Null),
            check(&format!("['gt',{},{}]", b, a), &Value::Null)
        );
        prop_assert_eq!(
            check(&format!("['lte',{},{}]", a, b), &Value::Null),
            check(&format!("['gte',{},{}]", b, a), &Value::Null)
        );
    }

    #[test]
    fn test_absent_negates_present(name in field()) {
        let present = check(&format!("['present','{}']", name), &Value::Null);
        let absent = check(&format!("['absent','{}']", name), &Value::Null);
        prop_assert_ne!(present, absent);
    }

    #[test]
    fn test_nor_negates_and(a in field(), b in field()) {
        let all = check(&format!("['and','{}','{}']", a, b), &Value::Null);
        let any_absent = check(&format!("['nor','{}','{}']", a, b), &Value::Null);
        prop_assert_ne!(all, any_absent);
    }

    #[test]
    fn test_number_text_infers_back(n in -1.0e9f64..1.0e9) {
        prop_assert_eq!(Value::infer(&Value::Number(n).to_text()), Value::Number(n));
    }

    #[test]
    fn test_canonical_text_reparses(op in prop::sample::select(COMPARISONS.to_vec()), a in operand(), b in operand()) {
        let rule = Rule::parse(&format!("['{}',{},{}]", op, a, b)).unwrap();
        let again = Rule::parse(&rule.canonical_text()).unwrap();
        prop_assert_eq!(rule.root(), again.root());
    }
}
