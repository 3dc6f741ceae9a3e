use chrono::{DateTime, TimeZone, Utc};
use pagoda_model::{Comment, CommentId, PostId};
use pagoda_query::{build_comment_forest, CommentNode};

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

fn comment(id: i64, parent: Option<i64>, seconds: i64) -> Comment {
    Comment {
        id: CommentId::from_row(id),
        post_id: PostId::from_row(1),
        parent_id: parent.map(CommentId::from_row),
        fingerprint: format!("fp-{id}"),
        author_name: format!("author-{id}"),
        author_email: None,
        content: format!("comment {id}"),
        is_author: false,
        created_at: at(seconds),
    }
}

fn ids(nodes: &[CommentNode]) -> Vec<i64> {
    nodes.iter().map(|n| n.comment.id.get()).collect()
}

#[test]
fn worked_example_from_the_thread_model() {
    // [{id:1,parent:null},{id:2,parent:1},{id:3,parent:2},{id:4,parent:99}]
    let forest = build_comment_forest(vec![
        comment(1, None, 0),
        comment(2, Some(1), 1),
        comment(3, Some(2), 2),
        comment(4, Some(99), 3),
    ]);
    let roots = forest.to_nodes();
    assert_eq!(ids(&roots), vec![1, 4]);
    assert_eq!(ids(&roots[0].replies), vec![2]);
    assert_eq!(ids(&roots[0].replies[0].replies), vec![3]);
    assert!(roots[1].replies.is_empty());
}

#[test]
fn node_count_equals_input_count() {
    let input = vec![
        comment(1, None, 0),
        comment(2, Some(1), 1),
        comment(3, Some(1), 2),
        comment(4, Some(3), 3),
        comment(5, None, 4),
        comment(6, Some(5), 5),
    ];
    let n = input.len();
    let forest = build_comment_forest(input);
    assert_eq!(forest.len(), n);

    fn count(nodes: &[CommentNode]) -> usize {
        nodes.iter().map(|n| 1 + count(&n.replies)).sum()
    }
    assert_eq!(count(&forest.to_nodes()), n);
}

#[test]
fn children_preserve_creation_order() {
    let forest = build_comment_forest(vec![
        comment(1, None, 0),
        comment(5, Some(1), 1),
        comment(2, Some(1), 2),
        comment(9, Some(1), 3),
    ]);
    let roots = forest.to_nodes();
    assert_eq!(ids(&roots[0].replies), vec![5, 2, 9]);
}

#[test]
fn orphans_are_promoted_to_roots() {
    let forest = build_comment_forest(vec![
        comment(10, Some(999), 0),
        comment(11, None, 1),
        comment(12, Some(10), 2),
    ]);
    let roots = forest.to_nodes();
    assert_eq!(ids(&roots), vec![10, 11]);
    // the orphan still keeps its own subtree
    assert_eq!(ids(&roots[0].replies), vec![12]);
}

#[test]
fn depth_is_unbounded() {
    let mut input = vec![comment(1, None, 0)];
    for i in 2..=50 {
        input.push(comment(i, Some(i - 1), i));
    }
    let forest = build_comment_forest(input);
    let mut max_depth = 0;
    forest.walk(|_, depth| max_depth = max_depth.max(depth));
    assert_eq!(max_depth, 49);
}

#[test]
fn walk_visits_every_node_depth_first() {
    let forest = build_comment_forest(vec![
        comment(1, None, 0),
        comment(2, Some(1), 1),
        comment(3, None, 2),
        comment(4, Some(3), 3),
        comment(5, Some(4), 4),
    ]);
    let mut seen = Vec::new();
    forest.walk(|c, depth| seen.push((c.id.get(), depth)));
    assert_eq!(seen, vec![(1, 0), (2, 1), (3, 0), (4, 1), (5, 2)]);
}

#[test]
fn empty_input_builds_an_empty_forest() {
    let forest = build_comment_forest(Vec::new());
    assert!(forest.is_empty());
    assert!(forest.to_nodes().is_empty());
    assert!(forest.roots().is_empty());
}

#[test]
fn serialized_nodes_nest_replies() {
    let forest = build_comment_forest(vec![comment(1, None, 0), comment(2, Some(1), 1)]);
    let value = serde_json::to_value(forest.to_nodes()).expect("serialize");
    assert_eq!(value[0]["id"], serde_json::json!(1));
    assert_eq!(value[0]["replies"][0]["id"], serde_json::json!(2));
    assert_eq!(value[0]["replies"][0]["replies"], serde_json::json!([]));
}
