//! Random draws for arbitration and worker selection.

use std::collections::VecDeque;

use parking_lot::Mutex;
use rand::Rng;

/// Smallest value a draw can take.
pub const DRAW_MIN: u8 = 1;
/// Largest value a draw can take.
pub const DRAW_MAX: u8 = 5;

/// Source of draws and tie-break picks.
pub trait DrawSource: Send + Sync {
    /// A draw in `[DRAW_MIN, DRAW_MAX]`.
    fn draw(&self) -> u8;

    /// A uniform index in `[0, len)`. `len` is at least 1.
    fn pick(&self, len: usize) -> usize;
}

/// Thread-local RNG backed draws.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomDraws;

impl DrawSource for RandomDraws {
    fn draw(&self) -> u8 {
        rand::thread_rng().gen_range(DRAW_MIN..=DRAW_MAX)
    }

    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len.max(1))
    }
}

/// Replays fixed draws and picks, for deterministic runs.
///
/// Once a script runs dry, draws return `DRAW_MIN` and picks return 0.
#[derive(Debug, Default)]
pub struct ScriptedDraws {
    draws: Mutex<VecDeque<u8>>,
    picks: Mutex<VecDeque<usize>>,
}

impl ScriptedDraws {
    pub fn new(draws: impl IntoIterator<Item = u8>) -> Self {
        Self {
            draws: Mutex::new(draws.into_iter().collect()),
            picks: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_picks(self, picks: impl IntoIterator<Item = usize>) -> Self {
        self.picks.lock().extend(picks);
        self
    }
}

impl DrawSource for ScriptedDraws {
    fn draw(&self) -> u8 {
        self.draws.lock().pop_front().unwrap_or(DRAW_MIN)
    }

    fn pick(&self, len: usize) -> usize {
        self.picks.lock().pop_front().unwrap_or(0).min(len.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_draws_stay_in_range() {
        let source = RandomDraws;
        for _ in 0..1000 {
            let d = source.draw();
            assert!((DRAW_MIN..=DRAW_MAX).contains(&d));
            assert!(source.pick(2) < 2);
        }
    }

    #[test]
    fn test_scripted_draws_replay_then_fall_back() {
        let source = ScriptedDraws::new([4, 2]).with_picks([1]);
        assert_eq!(source.draw(), 4);
        assert_eq!(source.draw(), 2);
        assert_eq!(source.draw(), DRAW_MIN);
        assert_eq!(source.pick(3), 1);
        assert_eq!(source.pick(3), 0);
    }
}
