// tests/expr_properties.rs
// Behavioural checks for the keyword expression compiler through the public API.

use qaly_curator::expr::{compile, parse, Expr, Op};
use qaly_curator::{Clause, ExprError};

fn clauses(list: &[&[&str]]) -> Vec<Clause> {
    list.iter().map(|c| Clause::new(c.iter().copied())).collect()
}

#[test]
fn one_operator_at_depth_one() {
    let leaves = ["hiv", "tuberculosis", "malaria", "\"heart disease\""];
    let or = compile(&leaves.join(" OR ")).unwrap();
    assert_eq!(or.len(), leaves.len());
    assert!(or.iter().all(|c| c.len() == 1));

    let and = compile(&leaves.join(" AND ")).unwrap();
    assert_eq!(
        and,
        clauses(&[&["hiv", "tuberculosis", "malaria", "heart disease"]])
    );
}

#[test]
fn distribution_law() {
    assert_eq!(
        compile("A AND (B OR C)").unwrap(),
        clauses(&[&["A", "B"], &["A", "C"]])
    );
    // OR on the left distributes the same way.
    assert_eq!(
        compile("(B OR C) AND A").unwrap(),
        clauses(&[&["B", "A"], &["C", "A"]])
    );
}

#[test]
fn mixed_operators_rejected_not_guessed() {
    let err = compile("A AND B OR C").unwrap_err();
    assert!(matches!(err, ExprError::MixedOperators { .. }));
    assert!(err.to_string().contains("A AND B OR C"));
}

#[test]
fn unbalanced_rejected_as_parse_error() {
    for bad in ["A AND (B OR C", "(A", "A)", "((A OR B)"] {
        let err = compile(bad).unwrap_err();
        assert!(err.is_parse_error(), "{bad}: {err:?}");
        assert!(err.to_string().contains("unbalanced"), "{bad}: {err}");
    }
}

#[test]
fn quoted_phrase_preserved() {
    assert_eq!(
        compile(r#"A AND "multi word phrase""#).unwrap(),
        clauses(&[&["A", "multi word phrase"]])
    );
}

#[test]
fn parse_tree_shape() {
    assert_eq!(
        parse("a AND (b OR c)").unwrap(),
        Expr::Group(
            Op::And,
            vec![
                Expr::Leaf("a".into()),
                Expr::Group(Op::Or, vec![Expr::Leaf("b".into()), Expr::Leaf("c".into())]),
            ]
        )
    );
    assert_eq!(parse("((solo))").unwrap(), Expr::Leaf("solo".into()));
}

#[test]
fn idempotent() {
    let e = r#"cancer AND (lung OR breast OR "colorectal cancer") AND (screening OR treatment)"#;
    let first = compile(e).unwrap();
    assert_eq!(first.len(), 6);
    assert_eq!(first, compile(e).unwrap());
}
