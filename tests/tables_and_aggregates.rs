use setl::{badge_counts, comment_counts, record, vote_counts, PipelineError, SourceKind, Table};

fn votes(rows: &[(&str, &str)]) -> Table {
    Table::new(
        SourceKind::Votes,
        rows.iter().map(|(post, ty)| record([("PostId", *post), ("VoteTypeId", *ty)])).collect(),
    )
}

/// Projection on the mandatory posts table refuses a column nobody carries;
/// optional tables just leave it missing.
#[test]
fn select_is_strict_only_for_posts() {
    let posts = Table::new(SourceKind::Posts, vec![record([("Id", "1"), ("Body", "x")])]);
    let err = posts.select(&["Id", "OwnerUserId"]).unwrap_err();
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::MissingColumn { table, column }) => {
            assert_eq!(*table, "posts");
            assert_eq!(column, "OwnerUserId");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let users = Table::new(SourceKind::Users, vec![record([("Id", "1"), ("AboutMe", "hi")])]);
    let users = users.select(&["Id", "Reputation"]).unwrap();
    assert_eq!(users.columns(), vec!["Id".to_string()]);

    // Nothing to violate in an empty posts table.
    assert!(Table::empty(SourceKind::Posts).select(&["Id"]).unwrap().is_empty());
}

/// One record carrying a column is enough for the projection to pass.
#[test]
fn select_accepts_sparse_columns() {
    let posts = Table::new(
        SourceKind::Posts,
        vec![record([("Id", "1")]), record([("Id", "2"), ("ParentId", "1")])],
    );
    let posts = posts.select(&["Id", "ParentId"]).unwrap();
    assert!(!posts.records()[0].contains_key("ParentId"));
    assert_eq!(posts.records()[1]["ParentId"], "1");
}

#[test]
fn rename_is_applied_at_once() {
    let t = Table::new(SourceKind::Users, vec![record([("A", "a"), ("B", "b"), ("C", "c")])]);
    let t = t.rename(&[("A", "B"), ("B", "A"), ("Missing", "Z")]);
    let r = &t.records()[0];
    assert_eq!(r["A"], "b");
    assert_eq!(r["B"], "a");
    assert_eq!(r["C"], "c");
    assert!(!r.contains_key("Z"));
}

/// Groups come out in first-appearance order; keyless records are not grouped.
#[test]
fn group_by_keeps_first_appearance_order() {
    let t = Table::new(
        SourceKind::Comments,
        vec![
            record([("PostId", "9")]),
            record([("PostId", "3")]),
            record([("Text", "orphan")]),
            record([("PostId", "9")]),
        ],
    );
    let groups = t.group_by("PostId");
    let shape: Vec<(&str, usize)> = groups.iter().map(|g| (g.key, g.records.len())).collect();
    assert_eq!(shape, vec![("9", 2), ("3", 1)]);
}

/// The three vote categories are counted independently per post; a post with
/// only other vote types is present with zeros; posts without votes are absent.
#[test]
fn vote_counts_per_post() {
    let agg = vote_counts(&votes(&[
        ("10", "2"), ("10", "2"), ("10", "3"),
        ("11", "1"), ("11", "2"),
        ("12", "5"), ("12", "16"),
    ]));
    assert_eq!(agg.columns(), &["Acceptance", "Upvotes", "Downvotes"]);
    assert_eq!(agg.len(), 3);
    assert_eq!(agg.get("10"), Some(&[0, 2, 1][..]));
    assert_eq!(agg.get("11"), Some(&[1, 1, 0][..]));
    assert_eq!(agg.get("12"), Some(&[0, 0, 0][..]));
    assert_eq!(agg.get("13"), None);
}

#[test]
fn comment_and_badge_counts() {
    let comments = Table::new(
        SourceKind::Comments,
        vec![
            record([("Id", "1"), ("PostId", "4")]),
            record([("Id", "2"), ("PostId", "4")]),
            record([("Id", "3"), ("PostId", "5")]),
        ],
    );
    let agg = comment_counts(&comments);
    assert_eq!(agg.key_column(), "PostId");
    assert_eq!(agg.get("4"), Some(&[2][..]));
    assert_eq!(agg.get("5"), Some(&[1][..]));

    let badges = Table::new(
        SourceKind::Badges,
        vec![record([("Id", "1"), ("UserId", "7")]), record([("Id", "2"), ("UserId", "7")])],
    );
    let agg = badge_counts(&badges);
    assert_eq!(agg.key_column(), "UserId");
    assert_eq!(agg.iter().collect::<Vec<_>>(), vec![("7", &[2u64][..])]);

    assert!(badge_counts(&Table::empty(SourceKind::Badges)).is_empty());
}
