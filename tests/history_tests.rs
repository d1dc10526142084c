use boiler_state::{BoilerError, MAX_ENTRIES, ReadingHistory};

#[test]
fn test_history_default_capacity_is_one_week_of_minutes() {
    assert_eq!(MAX_ENTRIES, 10080);
}

#[test]
fn test_history_rejects_zero_capacity() {
    assert!(matches!(
        ReadingHistory::<u64>::new(0),
        Err(BoilerError::InvalidConfig(_))
    ));
}

#[test]
fn test_history_evicts_oldest_first() {
    let mut history = ReadingHistory::<u64>::new(4).unwrap();
    for i in 0..10u64 {
        history.append(i);
        assert!(history.len() <= 4);
    }

    assert_eq!(history.len(), 4);
    assert_eq!(history.window(None), vec![6, 7, 8, 9]);
    assert_eq!(history.last(), Some(&9));
}

#[test]
fn test_history_window_clamps_and_orders() {
    let mut history = ReadingHistory::<u64>::new(16).unwrap();
    for i in 1..=5u64 {
        history.append(i * 10);
    }

    assert_eq!(history.window(Some(2)), vec![40, 50]);
    assert_eq!(history.window(Some(5)), vec![10, 20, 30, 40, 50]);
    assert_eq!(history.window(Some(99)), vec![10, 20, 30, 40, 50]);
    assert_eq!(history.window(Some(0)), Vec::<u64>::new());
    assert_eq!(history.window(None), vec![10, 20, 30, 40, 50]);
}

#[test]
fn test_history_window_at_exact_capacity() {
    let mut history = ReadingHistory::<u64>::new(3).unwrap();
    history.extend([1, 2, 3]);

    // Asking for exactly `len` entries must return all of them.
    assert_eq!(history.window(Some(3)), vec![1, 2, 3]);
    assert_eq!(history.window(Some(2)), vec![2, 3]);
}

#[test]
fn test_history_empty_reads() {
    let history = ReadingHistory::<u64>::new(8).unwrap();
    assert!(history.is_empty());
    assert!(history.window(None).is_empty());
    assert!(history.window(Some(3)).is_empty());
    assert_eq!(history.tail(3).count(), 0);
    assert_eq!(history.last(), None);
}

#[test]
fn test_history_window_is_a_copy() {
    let mut history = ReadingHistory::<u64>::new(8).unwrap();
    history.extend([1, 2, 3]);
    let window = history.window(None);

    history.append(4);
    assert_eq!(window, vec![1, 2, 3]);
    assert_eq!(history.window(None), vec![1, 2, 3, 4]);
}

#[test]
fn test_history_tail_after_wraparound() {
    let mut history = ReadingHistory::<u64>::new(5).unwrap();
    history.extend(0..12u64);

    let tail: Vec<u64> = history.tail(3).copied().collect();
    assert_eq!(tail, vec![9, 10, 11]);
    assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![7, 8, 9, 10, 11]);
}
