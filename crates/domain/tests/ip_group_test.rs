use edge_bouncer_domain::IpGroupPartitioner;

fn seq(prefix: &str, range: std::ops::RangeInclusive<u32>) -> Vec<String> {
    range.map(|i| format!("{prefix}.{}.{}", i / 256, i % 256)).collect()
}

#[test]
fn growth_spills_into_a_new_bin() {
    let mut partitioner = IpGroupPartitioner::new(2000);
    partitioner.load(vec![seq("192.168", 1..=1500)]);

    let stats = partitioner.update(&seq("192.168", 1..=2500));
    assert_eq!(stats.added, 1000);
    assert_eq!(stats.removed, 0);
    assert_eq!(stats.bin_count, 2);
    assert_eq!(stats.total_ips, 2500);

    let bins = partitioner.bins();
    assert_eq!(bins[0].len(), 2000);
    assert_eq!(bins[1].len(), 500);
}

#[test]
fn removals_then_additions_rebalance() {
    let mut partitioner = IpGroupPartitioner::new(2000);
    partitioner.load(vec![seq("192.168", 1..=1500)]);
    partitioner.update(&seq("192.168", 1..=2500));

    // drop the first 500, add 500 fresh ones
    let mut desired = seq("192.168", 501..=2500);
    desired.extend(seq("10.0", 1..=500));
    let stats = partitioner.update(&desired);
    assert_eq!(stats.removed, 500);
    assert_eq!(stats.added, 500);
    assert_eq!(stats.bin_count, 2);

    let bins = partitioner.bins();
    assert_eq!(bins[0].len(), 1500);
    assert_eq!(bins[1].len(), 1000);
}

#[test]
fn surviving_entries_never_move_bins() {
    let mut partitioner = IpGroupPartitioner::new(5);
    partitioner.load(vec![vec![
        "a".to_string(),
        "b".to_string(),
        "c".to_string(),
        "d".to_string(),
        "e".to_string(),
    ]]);

    let desired: Vec<String> = ["a", "b", "c", "d", "e", "f"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let stats = partitioner.update(&desired);
    assert_eq!(stats.added, 1);
    assert_eq!(stats.removed, 0);

    let bins = partitioner.bins();
    assert_eq!(bins.len(), 2);
    assert_eq!(bins[0], vec!["a", "b", "c", "d", "e"]);
    assert_eq!(bins[1], vec!["f"]);
}

#[test]
fn exact_fill_does_not_open_a_bin() {
    let mut partitioner = IpGroupPartitioner::new(5);
    partitioner.load(vec![vec![
        "ip1".to_string(),
        "ip2".to_string(),
        "ip3".to_string(),
    ]]);

    let desired: Vec<String> = (1..=5).map(|i| format!("ip{i}")).collect();
    let stats = partitioner.update(&desired);
    assert_eq!(stats.added, 2);
    assert_eq!(stats.removed, 0);
    assert_eq!(stats.bin_count, 1);
    assert_eq!(partitioner.bins()[0].len(), 5);
}

#[test]
fn bins_respect_capacity_and_cover_all_ips() {
    let mut partitioner = IpGroupPartitioner::new(100);
    let desired = seq("10.1", 1..=321);
    partitioner.update(&desired);

    let bins = partitioner.bins();
    assert!(bins.iter().all(|bin| bin.len() <= 100));
    let mut union: Vec<String> = bins.into_iter().flatten().collect();
    union.sort();
    let mut expected = desired.clone();
    expected.sort();
    assert_eq!(union, expected);
}
