use std::ops::RangeInclusive;

/// Splits `start..=end` into `parts` contiguous, non-overlapping ranges.
///
/// Every range but the last holds `(end - start + 1) / parts` values, the last
/// one also takes the remainder up to and including `end`. When there are
/// fewer values than parts the leading ranges are empty. An empty input
/// (`end < start`) yields no ranges, and `parts == 0` is treated as one.
pub fn partition_range(start: i64, end: i64, parts: usize) -> Vec<RangeInclusive<i64>> {
  if end < start {
    return Vec::new();
  }
  let parts = parts.max(1) as i128;
  let (start, end) = (start as i128, end as i128);
  let chunk = (end - start + 1) / parts;
  (0..parts)
    .map(|i| {
      let low = start + i * chunk;
      let high = if i == parts - 1 { end } else { low + chunk - 1 };
      // Both bounds stay within the input, except for an empty range's
      // `high`, which can sit one below `start`.
      clamp(low)..=clamp(high)
    })
    .collect()
}

fn clamp(value: i128) -> i64 {
  value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}
