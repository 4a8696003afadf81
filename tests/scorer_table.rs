// tests/scorer_table.rs
// Table loading from disk and scoring semantics end to end.

use qaly_curator::{
    load_scorer, score, score_batch, Article, ArticleMap, CollisionPolicy, ScoreResult,
    ScoringTable, TableError,
};
use std::fs;

const TABLE_CSV: &str = "topic,score,keywords,reference
Poverty,5,poverty,https://example.org/gbd
Climate,3,climate AND (change OR crisis),https://example.org/ipcc
Mental health,4,\"mental health\" OR depression,https://example.org/who
";

fn write_table(name: &str, body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join(name);
    fs::write(&p, body).unwrap();
    (dir, p)
}

#[test]
fn poverty_substring_semantics() {
    let (_d, p) = write_table("qaly.csv", TABLE_CSV);
    let s = load_scorer(&p, CollisionPolicy::Overwrite).unwrap();
    assert_eq!(
        score("an article about poverty today", &s),
        ScoreResult {
            score: 5.0,
            topics: vec!["Poverty".into()]
        }
    );
    assert_eq!(score("an article about wealth", &s), ScoreResult::default());
}

#[test]
fn climate_counted_once_when_both_clauses_match() {
    let (_d, p) = write_table("qaly.csv", TABLE_CSV);
    let s = load_scorer(&p, CollisionPolicy::Overwrite).unwrap();
    let r = score(
        "Scientists say climate change has become a climate crisis.",
        &s,
    );
    assert_eq!(r.score, 3.0);
    assert_eq!(r.topics, vec!["Climate".to_string()]);
}

#[test]
fn case_sensitivity_is_exact() {
    let (_d, p) = write_table("qaly.csv", TABLE_CSV);
    let s = load_scorer(&p, CollisionPolicy::Overwrite).unwrap();
    assert_eq!(score("Poverty in capitals", &s).score, 0.0);
    assert_eq!(score("Climate Change", &s).score, 0.0);
}

#[test]
fn toml_table_loads_from_path() {
    let (_d, p) = write_table(
        "qaly.toml",
        r#"
[[topics]]
topic = "Smoking"
score = 2
expression = 'smoking OR "tobacco use"'
reference = "WHO"
"#,
    );
    let s = load_scorer(&p, CollisionPolicy::Reject).unwrap();
    assert_eq!(s.len(), 2);
    assert_eq!(score("rates of tobacco use fell", &s).topics, vec!["Smoking"]);
}

#[test]
fn malformed_row_fails_whole_load() {
    let (_d, p) = write_table(
        "qaly.csv",
        "topic,score,keywords,reference\nPoverty,5,poverty,ref\nBroken,2,broken AND (x OR y,ref\n",
    );
    let err = ScoringTable::from_path(&p)
        .and_then(|t| qaly_curator::Scorer::from_table(&t, CollisionPolicy::Overwrite))
        .unwrap_err();
    assert!(matches!(err, TableError::Expression { line: 3, .. }), "{err:?}");

    let err = load_scorer(&p, CollisionPolicy::Overwrite).unwrap_err();
    assert!(err.to_string().contains("Broken"));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ScoringTable::from_path(&dir.path().join("nope.csv")).unwrap_err();
    assert!(matches!(err, TableError::Io { .. }));
}

#[test]
fn batch_attaches_fields() {
    let (_d, p) = write_table("qaly.csv", TABLE_CSV);
    let s = load_scorer(&p, CollisionPolicy::Overwrite).unwrap();
    let mut m = ArticleMap::new();
    m.insert(
        "https://news/1".into(),
        Article::new("depression and poverty are linked"),
    );
    m.insert("https://news/2".into(), Article::new("football"));
    let out = score_batch(m, &s);
    assert_eq!(out["https://news/1"].score, 9.0);
    assert_eq!(out["https://news/1"].topics, vec!["Poverty", "Mental health"]);
    assert_eq!(out["https://news/2"].score, 0.0);
}
