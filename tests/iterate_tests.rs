use pooltab::{Pool, Table};

fn sample_table(pool: &mut Pool) -> Table {
    let mut table = Table::new();
    table.add(pool, "alpha", "1").unwrap();
    table.add(pool, "alpha", "2").unwrap();
    table.add(pool, "beta", "x").unwrap();
    table.add(pool, "beta", "y").unwrap();
    table
}

#[test]
fn test_full_walk_visits_every_entry_in_order() {
    let mut pool = Pool::new();
    let table = sample_table(&mut pool);

    let mut seen = Vec::new();
    let complete = table.iterate(&pool, &[], |k, v| {
        seen.push(format!("{k}={v}"));
        true
    });

    assert!(complete);
    assert_eq!(seen, vec!["alpha=1", "alpha=2", "beta=x", "beta=y"]);
}

#[test]
fn test_full_walk_stops_on_false() {
    let mut pool = Pool::new();
    let table = sample_table(&mut pool);

    let mut seen = Vec::new();
    let complete = table.iterate(&pool, &[], |k, v| {
        seen.push(format!("{k}={v}"));
        seen.len() < 2
    });

    // Without key arguments, a stop signal ends the whole walk.
    assert!(!complete);
    assert_eq!(seen, vec!["alpha=1", "alpha=2"]);
}

#[test]
fn test_keyed_walk_visits_matches_per_key() {
    let mut pool = Pool::new();
    let table = sample_table(&mut pool);

    let mut seen = Vec::new();
    let complete = table.iterate(&pool, &["beta", "alpha"], |k, v| {
        seen.push(format!("{k}={v}"));
        true
    });

    assert!(complete);
    // Keys are walked in argument order, matches in table order.
    assert_eq!(seen, vec!["beta=x", "beta=y", "alpha=1", "alpha=2"]);
}

#[test]
fn test_keyed_walk_stop_only_ends_that_key() {
    let mut pool = Pool::new();
    let table = sample_table(&mut pool);

    let mut seen = Vec::new();
    let complete = table.iterate(&pool, &["alpha", "beta"], |k, v| {
        seen.push(format!("{k}={v}"));
        // Ask to stop immediately.
        false
    });

    // The stop signal ends the scan for each key, not the whole walk:
    // "beta" still gets its first match visited.
    assert!(!complete);
    assert_eq!(seen, vec!["alpha=1", "beta=x"]);
}

#[test]
fn test_keyed_walk_repeated_key_restarts_the_scan() {
    let mut pool = Pool::new();
    let table = sample_table(&mut pool);

    let mut seen = Vec::new();
    table.iterate(&pool, &["alpha", "alpha"], |k, v| {
        seen.push(format!("{k}={v}"));
        true
    });

    assert_eq!(seen, vec!["alpha=1", "alpha=2", "alpha=1", "alpha=2"]);
}

#[test]
fn test_keyed_walk_skips_absent_keys() {
    let mut pool = Pool::new();
    let table = sample_table(&mut pool);

    let mut seen = Vec::new();
    let complete = table.iterate(&pool, &["missing", "beta", ""], |k, v| {
        seen.push(format!("{k}={v}"));
        true
    });

    assert!(complete);
    assert_eq!(seen, vec!["beta=x", "beta=y"]);
}

#[test]
fn test_keyed_walk_is_case_insensitive() {
    let mut pool = Pool::new();
    let table = sample_table(&mut pool);

    let mut seen = Vec::new();
    table.iterate(&pool, &["ALPHA"], |_, v| {
        seen.push(v.to_string());
        true
    });

    assert_eq!(seen, vec!["1", "2"]);
}

#[test]
fn test_iterate_until_stops_everything() {
    let mut pool = Pool::new();
    let table = sample_table(&mut pool);

    let mut seen = Vec::new();
    let complete = table.iterate_until(&pool, &["alpha", "beta"], |k, v| {
        seen.push(format!("{k}={v}"));
        false
    });

    // The strict variant ends the entire walk on the first stop signal.
    assert!(!complete);
    assert_eq!(seen, vec!["alpha=1"]);
}

#[test]
fn test_iterate_until_completes_without_stop() {
    let mut pool = Pool::new();
    let table = sample_table(&mut pool);

    let mut count = 0;
    let complete = table.iterate_until(&pool, &[], |_, _| {
        count += 1;
        true
    });

    assert!(complete);
    assert_eq!(count, 4);
}

#[test]
fn test_iterate_empty_table() {
    let pool = Pool::new();
    let table = Table::new();

    let complete = table.iterate(&pool, &[], |_, _| false);
    assert!(complete);
}
