use super::{mean, median, round2, std_dev};
use crate::models::{Counter, CounterStats, CounterSummary, PlayerRecord};

impl CounterStats {
    /// Mean, median and standard deviation of every 3-day counter.
    ///
    /// Missing counters were already read as 0 at ingestion, so every player
    /// contributes to every counter. An empty subset yields all zeros.
    pub fn from_players(players: &[PlayerRecord]) -> Self {
        let mut stats = CounterStats::default();

        for counter in Counter::ALL {
            let values: Vec<f64> = players.iter().map(|p| counter.value(p) as f64).collect();
            stats.set(
                counter,
                CounterSummary {
                    mean: mean(&values),
                    median: median(&values),
                    std_dev: std_dev(&values),
                },
            );
        }

        stats
    }
}

/// Rounded means of the four score dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreMeans {
    pub login: f64,
    pub engajamento: f64,
    pub compras: f64,
    pub geral: f64,
}

impl ScoreMeans {
    pub fn from_players(players: &[PlayerRecord]) -> Self {
        let avg = |f: fn(&PlayerRecord) -> f64| {
            let values: Vec<f64> = players.iter().map(f).collect();
            round2(mean(&values))
        };

        Self {
            login: avg(|p| p.score_login),
            engajamento: avg(|p| p.score_engajamento),
            compras: avg(|p| p.score_compras),
            geral: avg(|p| p.score_geral),
        }
    }
}
