use pooltab::{Pool, PoolTabError};

#[test]
fn test_push_str_round_trip() {
    let mut pool = Pool::new();

    let hello = pool.push_str("hello").unwrap();
    let world = pool.push_str("world").unwrap();

    assert_eq!(pool.get(hello), "hello");
    assert_eq!(pool.get(world), "world");
    assert_eq!(pool.len(), 10);
}

#[test]
fn test_alloc_is_zero_filled() {
    let mut pool = Pool::new();

    pool.push_str("noise").unwrap();
    let span = pool.alloc(4).unwrap();

    assert_eq!(span.len(), 4);
    assert_eq!(pool.bytes(span), &[0, 0, 0, 0]);
}

#[test]
fn test_spans_stay_valid_across_growth() {
    let mut pool = Pool::with_capacity(8);

    let first = pool.push_str("first").unwrap();
    // Force the buffer to grow several times.
    for i in 0..100 {
        pool.push_str(&format!("filler-{i}")).unwrap();
    }

    assert_eq!(pool.get(first), "first");
}

#[test]
fn test_join_with_separator() {
    let mut pool = Pool::new();

    let a = pool.push_str("a").unwrap();
    let b = pool.push_str("b").unwrap();
    let c = pool.push_str("c").unwrap();

    let joined = pool.join(&[a, b, c], ", ").unwrap();
    assert_eq!(pool.get(joined), "a, b, c");

    let plain = pool.join(&[a, b, c], "").unwrap();
    assert_eq!(pool.get(plain), "abc");
}

#[test]
fn test_join_empty_and_single() {
    let mut pool = Pool::new();

    let empty = pool.join(&[], ", ").unwrap();
    assert_eq!(pool.get(empty), "");

    let one = pool.push_str("only").unwrap();
    let joined = pool.join(&[one], ", ").unwrap();
    assert_eq!(pool.get(joined), "only");
}

#[test]
fn test_concat() {
    let mut pool = Pool::new();

    let head = pool.push_str("gzip").unwrap();
    let merged = pool.concat(head, ", ", "deflate").unwrap();

    assert_eq!(pool.get(merged), "gzip, deflate");
    // The original string is untouched.
    assert_eq!(pool.get(head), "gzip");
}

#[test]
fn test_reset_keeps_capacity() {
    let mut pool = Pool::with_capacity(64);

    pool.push_str("some content").unwrap();
    let cap_before = pool.capacity();
    pool.reset();

    assert_eq!(pool.len(), 0);
    assert!(pool.is_empty());
    assert_eq!(pool.capacity(), cap_before);

    // New allocations start at offset zero again.
    let span = pool.push_str("fresh").unwrap();
    assert_eq!(span.offset(), 0);
    assert_eq!(pool.get(span), "fresh");
}

#[test]
fn test_limit_is_enforced() {
    let mut pool = Pool::with_limit(16, 10);

    pool.push_str("hello").unwrap();
    let err = pool.push_str("world!").unwrap_err();

    assert_eq!(
        err,
        PoolTabError::PoolExhausted {
            requested: 6,
            available: 5,
        }
    );
    // The failed allocation left the pool unchanged.
    assert_eq!(pool.len(), 5);

    // A fitting allocation still succeeds.
    pool.push_str("world").unwrap();
    assert_eq!(pool.len(), 10);
}

#[test]
fn test_limit_applies_to_join() {
    let mut pool = Pool::with_limit(0, 8);

    let a = pool.push_str("abc").unwrap();
    let b = pool.push_str("def").unwrap();

    // 3 + 2 + 3 bytes would exceed the remaining 2.
    assert!(matches!(
        pool.join(&[a, b], ", "),
        Err(PoolTabError::PoolExhausted { .. })
    ));
}

#[test]
fn test_reset_restores_limited_pool() {
    let mut pool = Pool::with_limit(0, 6);

    pool.push_str("abcdef").unwrap();
    assert!(pool.push_str("x").is_err());

    pool.reset();
    assert!(pool.push_str("xyz").is_ok());
}
