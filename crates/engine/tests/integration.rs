//! End-to-end pipeline runs against small hand-checked datasets.

use reclink_core::{Dataset, LinkError, Record, Value};
use reclink_engine::{run, run_with_cancel, CancelToken, Decision, LinkConfig};

fn named(id: &str, name: &str) -> Record {
    Record::new(id)
        .with_field("name", Value::text(name))
        .with_field("blk", Value::text("x"))
}

#[test]
fn near_duplicate_names_link_as_a_match() {
    let config = LinkConfig::from_toml(
        r#"
        name = "near-duplicates"
        mode = "link"

        [[index]]
        name = "initial"
        fields = ["name"]
        method = "prefix"
        len = 1

        [[comparator]]
        field = "name"
        method = "jaro_winkler"

        [classifier]
        strategy = "threshold_sum"

        [classifier.threshold_sum]
        lower = 0.0
        upper = 0.9
        agree_band = 0.9

        [[classifier.threshold_sum.weights]]
        field = "name"
        agreement = 1.0
        disagreement = -1.0
        "#,
    )
    .unwrap();

    let left = Dataset::new("a", vec![named("a1", "John Smith")]);
    let right = Dataset::new("b", vec![named("b1", "Jon Smith")]);
    let out = run(&config, &left, Some(&right)).unwrap();

    assert_eq!(out.summary.candidate_pairs, 1);
    assert_eq!(out.summary.matches, 1);
    assert_eq!(out.pairs.len(), 1);
    assert_eq!(out.pairs[0].decision, Decision::Match);
    assert_eq!(out.pairs[0].left_id, "a1");
    assert_eq!(out.pairs[0].right_id, "b1");
    assert!(out.pairs[0].weight > 0.9);
}

#[test]
fn pair_surfaced_by_one_index_only_is_compared_once() {
    // smith/smyth never share an exact key but collide under soundex; the
    // pair must come out exactly once despite two indexes.
    let config = LinkConfig::from_toml(
        r#"
        name = "dedup-phonetic"
        mode = "dedup"

        [[index]]
        name = "surname-exact"
        fields = ["name"]
        method = "exact"

        [[index]]
        name = "surname-soundex"
        fields = ["name"]
        method = "phonetic"
        code = "soundex"

        [[comparator]]
        field = "name"
        method = "jaro_winkler"

        [classifier]
        strategy = "threshold_sum"

        [classifier.threshold_sum]
        lower = 0.0
        upper = 0.8
        agree_band = 0.85
        "#,
    )
    .unwrap();

    let records = vec![
        named("r1", "smith"),
        named("r2", "smyth"),
        named("r3", "zhang"),
    ];
    let dataset = Dataset::new("a", records);
    let out = run(&config, &dataset, None).unwrap();

    assert_eq!(out.summary.candidate_pairs, 1);
    assert_eq!(out.pairs.len(), 1);
    assert_eq!((out.pairs[0].left, out.pairs[0].right), (0, 1));
    assert_eq!(out.pairs[0].decision, Decision::Match);
}

#[test]
fn assignment_prefers_total_weight_over_greedy() {
    // Pair weights: (L0,R0)=10, (L0,R1)=7.5, (L1,R0)=7.5, (L1,R1)=5.
    // Greedy takes the 10 and strands L1; the optimum crosses for 15.
    let config = LinkConfig::from_toml(
        r#"
        name = "crossing"
        mode = "link"

        [[index]]
        name = "all"
        fields = ["blk"]
        method = "exact"

        [[comparator]]
        field = "name"
        method = "edit_distance"

        [classifier]
        strategy = "supervised"

        [classifier.supervised]
        weights = [10.0]
        lower = 6.0
        upper = 7.0

        [assignment]
        enabled = true
        threshold = 7.0
        "#,
    )
    .unwrap();

    let left = Dataset::new("a", vec![named("l1", "aaaa"), named("l2", "aaba")]);
    let right = Dataset::new("b", vec![named("r1", "aaaa"), named("r2", "aaab")]);
    let out = run(&config, &left, Some(&right)).unwrap();

    assert_eq!(out.summary.candidate_pairs, 4);
    assert_eq!(out.summary.matches, 3);
    assert_eq!(out.summary.non_matches, 1);

    let assignment = out.assignment.unwrap();
    assert_eq!(assignment.pairs, vec![(0, 1), (1, 0)]);
    assert!((assignment.total_weight - 15.0).abs() < 1e-9);
    assert!(assignment.unmatched_left.is_empty());
    assert!(assignment.unmatched_right.is_empty());
    assert_eq!(out.summary.assigned, 2);
}

#[test]
fn empty_datasets_produce_an_empty_result() {
    let config = LinkConfig::from_toml(
        r#"
        name = "empty"
        mode = "link"

        [[index]]
        name = "all"
        fields = ["blk"]
        method = "exact"

        [[comparator]]
        field = "name"
        method = "exact"

        [classifier]
        strategy = "threshold_sum"

        [classifier.threshold_sum]
        lower = 0.0
        upper = 1.0

        [assignment]
        enabled = true
        "#,
    )
    .unwrap();

    let left = Dataset::new("a", Vec::new());
    let right = Dataset::new("b", Vec::new());
    let out = run(&config, &left, Some(&right)).unwrap();

    assert_eq!(out.summary.candidate_pairs, 0);
    assert!(out.pairs.is_empty());
    let assignment = out.assignment.unwrap();
    assert!(assignment.pairs.is_empty());
    assert!(assignment.unmatched_left.is_empty());
    assert!(assignment.unmatched_right.is_empty());
}

#[test]
fn one_empty_side_leaves_the_other_unmatched() {
    let config = LinkConfig::from_toml(
        r#"
        name = "half-empty"
        mode = "link"

        [[index]]
        name = "all"
        fields = ["blk"]
        method = "exact"

        [[comparator]]
        field = "name"
        method = "exact"

        [classifier]
        strategy = "threshold_sum"

        [classifier.threshold_sum]
        lower = 0.0
        upper = 1.0

        [assignment]
        enabled = true
        "#,
    )
    .unwrap();

    let left = Dataset::new("a", vec![named("l1", "smith"), named("l2", "jones")]);
    let right = Dataset::new("b", Vec::new());
    let out = run(&config, &left, Some(&right)).unwrap();

    assert_eq!(out.summary.candidate_pairs, 0);
    let assignment = out.assignment.unwrap();
    assert!(assignment.pairs.is_empty());
    assert_eq!(assignment.unmatched_left, vec![0, 1]);
    assert!(assignment.unmatched_right.is_empty());
}

#[test]
fn kmeans_strategy_separates_duplicates_from_distinct_records() {
    let config = LinkConfig::from_toml(
        r#"
        name = "kmeans-dedup"
        mode = "dedup"

        [[index]]
        name = "all"
        fields = ["blk"]
        method = "exact"

        [[comparator]]
        field = "name"
        method = "jaro_winkler"

        [classifier]
        strategy = "kmeans"

        [classifier.kmeans]
        clusters = 2
        "#,
    )
    .unwrap();

    let dataset = Dataset::new(
        "a",
        vec![
            named("r1", "christine"),
            named("r2", "christina"),
            named("r3", "xu"),
        ],
    );
    let out = run(&config, &dataset, None).unwrap();

    // christine/christina cluster with the agreement seed, both records
    // against "xu" with the disagreement seed.
    assert_eq!(out.summary.candidate_pairs, 3);
    assert_eq!(out.summary.matches, 1);
    assert_eq!(out.summary.non_matches, 2);
    assert_eq!((out.pairs[0].left, out.pairs[0].right), (0, 1));
}

#[test]
fn worker_count_does_not_change_the_result() {
    let base = r#"
        name = "invariance"
        mode = "dedup"

        [[index]]
        name = "surname-soundex"
        fields = ["name"]
        method = "phonetic"
        code = "soundex"

        [[comparator]]
        field = "name"
        method = "jaro_winkler"

        [classifier]
        strategy = "threshold_sum"

        [classifier.threshold_sum]
        lower = -0.5
        upper = 0.5
        agree_band = 0.9

        [parallel]
        workers = WORKERS
        "#;
    let surnames = [
        "smith", "smyth", "smithe", "jones", "john", "jon", "miller", "muller", "brown", "braun",
        "zhang", "chang", "nguyen", "ngyuen", "taylor", "tailor",
    ];
    let records: Vec<Record> = surnames
        .iter()
        .enumerate()
        .map(|(i, s)| named(&format!("r{i}"), s))
        .collect();
    let dataset = Dataset::new("a", records);

    let run_with = |workers: &str| {
        let config = LinkConfig::from_toml(&base.replace("WORKERS", workers)).unwrap();
        run(&config, &dataset, None).unwrap()
    };
    let one = run_with("1");
    let eight = run_with("8");

    assert_eq!(one.summary, eight.summary);
    assert_eq!(one.pairs, eight.pairs);
    assert_eq!(one.diagnostics, eight.diagnostics);
}

#[test]
fn cancelled_run_reports_cancellation() {
    let config = LinkConfig::from_toml(
        r#"
        name = "cancelled"
        mode = "dedup"

        [[index]]
        name = "all"
        fields = ["blk"]
        method = "exact"

        [[comparator]]
        field = "name"
        method = "exact"

        [classifier]
        strategy = "threshold_sum"

        [classifier.threshold_sum]
        lower = 0.0
        upper = 1.0
        "#,
    )
    .unwrap();
    let dataset = Dataset::new("a", vec![named("r1", "smith"), named("r2", "smith")]);

    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(matches!(
        run_with_cancel(&config, &dataset, None, &cancel),
        Err(LinkError::Cancelled)
    ));
}

#[test]
fn comparator_on_absent_field_is_rejected_up_front() {
    let config = LinkConfig::from_toml(
        r#"
        name = "typo"
        mode = "dedup"

        [[index]]
        name = "all"
        fields = ["blk"]
        method = "exact"

        [[comparator]]
        field = "surnme"
        method = "exact"

        [classifier]
        strategy = "threshold_sum"

        [classifier.threshold_sum]
        lower = 0.0
        upper = 1.0
        "#,
    )
    .unwrap();
    let dataset = Dataset::new("a", vec![named("r1", "smith")]);

    assert!(matches!(
        run(&config, &dataset, None),
        Err(LinkError::UnknownField { field, .. }) if field == "surnme"
    ));
}

#[test]
fn mode_and_dataset_arity_must_agree() {
    let config = LinkConfig::from_toml(
        r#"
        name = "arity"
        mode = "link"

        [[index]]
        name = "all"
        fields = ["blk"]
        method = "exact"

        [[comparator]]
        field = "name"
        method = "exact"

        [classifier]
        strategy = "threshold_sum"

        [classifier.threshold_sum]
        lower = 0.0
        upper = 1.0
        "#,
    )
    .unwrap();
    let dataset = Dataset::new("a", vec![named("r1", "smith")]);

    assert!(matches!(
        run(&config, &dataset, None),
        Err(LinkError::ConfigValidation(_))
    ));
}

#[test]
fn output_serializes_to_json() {
    let config = LinkConfig::from_toml(
        r#"
        name = "serialize"
        mode = "dedup"

        [[index]]
        name = "all"
        fields = ["blk"]
        method = "exact"

        [[comparator]]
        field = "name"
        method = "exact"

        [classifier]
        strategy = "threshold_sum"

        [classifier.threshold_sum]
        lower = 0.0
        upper = 1.0
        "#,
    )
    .unwrap();
    let dataset = Dataset::new("a", vec![named("r1", "smith"), named("r2", "smith")]);
    let out = run(&config, &dataset, None).unwrap();

    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["meta"]["config_name"], "serialize");
    assert_eq!(json["meta"]["mode"], "dedup");
    assert_eq!(json["summary"]["matches"], 1);
    assert_eq!(json["pairs"][0]["decision"], "match");
}
