//! Typed intervals and the set/list algebra they support.
//!
//! All intervals are half-open `[start, end)` in integer milliseconds
//! unless noted otherwise. `IntervalSet`s are sorted and pairwise disjoint;
//! `IntervalList`s are sorted by start only and may overlap.

/// A plain `[start, end)` millisecond interval, as stored in an ISetMap.
pub type Interval = (u32, u32);

/// An interval carrying a payload byte, as stored in an IListMap.
pub type PayloadInterval = (u32, u32, u8);

/// Classic two-pointer merge of two sorted, disjoint interval lists.
///
/// Emits `(max(a0, b0), min(a1, b1))` whenever that range is non-empty,
/// advancing whichever list has the smaller start.
pub fn intersect(a: &[Interval], b: &[Interval]) -> Vec<Interval> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        let (a0, a1) = a[i];
        let (b0, b1) = b[j];
        let lo = a0.max(b0);
        let hi = a1.min(b1);
        if hi > lo {
            out.push((lo, hi));
        }
        if a0 < b0 {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Standard disjoint-set difference: `a` minus everything covered by `b`.
pub fn subtract(a: &[Interval], b: &[Interval]) -> Vec<Interval> {
    let mut out = Vec::new();
    let mut j = 0usize;
    for &(mut start, end) in a {
        while j < b.len() && b[j].1 <= start {
            j += 1;
        }
        let mut k = j;
        while start < end {
            match b.get(k) {
                Some(&(b0, b1)) if b0 < end => {
                    if b0 > start {
                        out.push((start, b0.min(end)));
                    }
                    start = b1.max(start);
                    k += 1;
                }
                _ => {
                    out.push((start, end));
                    break;
                }
            }
        }
    }
    out
}

/// Coalesce a sorted-by-start stream of (possibly overlapping) intervals
/// into a disjoint list, merging any two consecutive intervals whose gap
/// is `< fuzz_ms`.
///
/// Default runtime fuzz is 100ms; the derivation pipeline uses 250ms
/// (see [`crate::derive`]).
pub fn deoverlap<I: IntoIterator<Item = Interval>>(stream: I, fuzz_ms: u32) -> Vec<Interval> {
    let mut out: Vec<Interval> = Vec::new();
    for (start, end) in stream {
        match out.last_mut() {
            Some(last) if start < last.1.saturating_add(fuzz_ms) => {
                last.1 = last.1.max(end);
            }
            _ => out.push((start, end)),
        }
    }
    out
}

/// Presentational variant of [`deoverlap`] operating on float-second
/// intervals, used when smoothing output for human consumption.
/// Default fuzz is 0.25s.
pub fn merge_close<I: IntoIterator<Item = (f64, f64)>>(
    stream: I,
    fuzz_sec: f64,
) -> Vec<(f64, f64)> {
    let mut curr: Option<(f64, f64)> = None;
    let mut out = Vec::new();
    for i in stream {
        curr = match curr {
            None => Some(i),
            Some(c) => {
                if c.0.max(i.0) - c.1.min(i.1) < fuzz_sec {
                    Some((c.0.min(i.0), c.1.max(i.1)))
                } else {
                    out.push(c);
                    Some(i)
                }
            }
        };
    }
    if let Some(c) = curr {
        out.push(c);
    }
    out
}
