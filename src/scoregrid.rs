//! Scoreline probability grid. Cell `(h, a)` holds the probability of the
//! match finishing `h`-`a`.

use std::ops::{Index, IndexMut};

use crate::records::Score;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreGrid {
    size: usize,
    cells: Vec<f64>,
}

impl ScoreGrid {
    /// A zeroed grid covering 0..=max_goals for each side.
    pub fn allocate(max_goals: u8) -> Self {
        let size = max_goals as usize + 1;
        Self {
            size,
            cells: vec![0.0; size * size],
        }
    }

    /// Outer product of two independent Poisson marginals.
    pub fn from_univariate_poisson(home_rate: f64, away_rate: f64, max_goals: u8) -> Self {
        let home = poisson_pmf(home_rate, max_goals);
        let away = poisson_pmf(away_rate, max_goals);
        let mut grid = Self::allocate(max_goals);
        for (h, ph) in home.iter().enumerate() {
            for (a, pa) in away.iter().enumerate() {
                grid[(h, a)] = ph * pa;
            }
        }
        grid
    }

    pub fn max_goals(&self) -> u8 {
        (self.size - 1) as u8
    }

    pub fn total(&self) -> f64 {
        self.cells.iter().sum()
    }

    /// Rescale so the cells sum to 1. Returns false if the grid holds no mass.
    pub fn normalize(&mut self) -> bool {
        let total = self.total();
        if !(total > 0.0) || !total.is_finite() {
            return false;
        }
        for cell in &mut self.cells {
            *cell /= total;
        }
        true
    }

    fn gather(&self, pred: impl Fn(usize, usize) -> bool) -> f64 {
        let mut prob = 0.0;
        for h in 0..self.size {
            for a in 0..self.size {
                if pred(h, a) {
                    prob += self[(h, a)];
                }
            }
        }
        prob
    }

    pub fn gather_home_win(&self) -> f64 {
        self.gather(|h, a| h > a)
    }

    pub fn gather_draw(&self) -> f64 {
        self.gather(|h, a| h == a)
    }

    pub fn gather_away_win(&self) -> f64 {
        self.gather(|h, a| h < a)
    }

    /// Probability that total goals exceed `line` (e.g. 2.5).
    pub fn gather_goals_over(&self, line: f64) -> f64 {
        self.gather(|h, a| (h + a) as f64 > line)
    }

    /// Most probable cell. Ties go to the lowest home score, then lowest away.
    pub fn most_likely(&self) -> (Score, f64) {
        let mut best = (Score::new(0, 0), f64::MIN);
        for h in 0..self.size {
            for a in 0..self.size {
                let p = self[(h, a)];
                if p > best.1 {
                    best = (Score::new(h as u8, a as u8), p);
                }
            }
        }
        best
    }

    pub fn home_away_expectations(&self) -> (f64, f64) {
        let (mut home, mut away) = (0.0, 0.0);
        for h in 0..self.size {
            for a in 0..self.size {
                let p = self[(h, a)];
                home += h as f64 * p;
                away += a as f64 * p;
            }
        }
        (home, away)
    }
}

impl Index<(usize, usize)> for ScoreGrid {
    type Output = f64;

    fn index(&self, (h, a): (usize, usize)) -> &f64 {
        &self.cells[h * self.size + a]
    }
}

impl IndexMut<(usize, usize)> for ScoreGrid {
    fn index_mut(&mut self, (h, a): (usize, usize)) -> &mut f64 {
        &mut self.cells[h * self.size + a]
    }
}

/// Poisson probabilities for 0..=max_k. The tail beyond `max_k` is left out;
/// callers renormalize the grid instead.
pub fn poisson_pmf(lambda: f64, max_k: u8) -> Vec<f64> {
    let lambda = lambda.max(0.0);
    let mut out = vec![0.0; max_k as usize + 1];
    out[0] = (-lambda).exp();
    for k in 1..out.len() {
        out[k] = out[k - 1] * lambda / k as f64;
    }
    out
}
