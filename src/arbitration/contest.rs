//! The shared "highest draw yields" rule.
//!
//! Used with two contenders by the crash arbitrator (the peer with the lower
//! draw keeps serving) and with N contenders by the load-balancer cycler (the
//! worker with the greatest draw is taken down).

/// Which contender(s) hold the strictly highest draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Yielding {
    /// Exactly one contender holds the highest draw.
    Single(usize),
    /// Several contenders share the highest draw (indices in input order).
    Tied(Vec<usize>),
}

/// Find the contender(s) that must yield. `None` for an empty slice.
pub fn highest(draws: &[u8]) -> Option<Yielding> {
    let max = *draws.iter().max()?;
    let tied: Vec<usize> = draws
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == max)
        .map(|(i, _)| i)
        .collect();

    match tied.as_slice() {
        [single] => Some(Yielding::Single(*single)),
        _ => Some(Yielding::Tied(tied)),
    }
}
