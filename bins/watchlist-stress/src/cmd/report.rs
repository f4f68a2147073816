use std::collections::BTreeMap;
use std::time::Duration;

use watchlist_api::OutcomeClass;

/// Outcome counts and per-call latency for one run.
#[derive(Debug, Default)]
pub struct Tally {
    counts: BTreeMap<OutcomeClass, usize>,
    latencies: Vec<Duration>,
    /// Conflicts absorbed by client-side retry (only with `--retry`).
    pub retried_conflicts: u64,
    /// Retry loops that stopped without writing.
    declined: usize,
}

impl Tally {
    pub fn record(&mut self, class: OutcomeClass, latency: Duration) {
        *self.counts.entry(class).or_insert(0) += 1;
        self.latencies.push(latency);
    }

    pub fn record_declined(&mut self, latency: Duration) {
        self.declined += 1;
        self.latencies.push(latency);
    }

    pub fn declined(&self) -> usize {
        self.declined
    }

    pub fn merge(&mut self, other: Tally) {
        for (class, n) in other.counts {
            *self.counts.entry(class).or_insert(0) += n;
        }
        self.latencies.extend(other.latencies);
        self.retried_conflicts += other.retried_conflicts;
        self.declined += other.declined;
    }

    pub fn count(&self, class: OutcomeClass) -> usize {
        self.counts.get(&class).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum::<usize>() + self.declined
    }

    pub fn min_latency(&self) -> Duration {
        self.latencies.iter().min().copied().unwrap_or_default()
    }

    pub fn max_latency(&self) -> Duration {
        self.latencies.iter().max().copied().unwrap_or_default()
    }

    pub fn avg_latency(&self) -> Duration {
        if self.latencies.is_empty() {
            return Duration::ZERO;
        }
        self.latencies.iter().sum::<Duration>() / self.latencies.len() as u32
    }

    pub fn print(&self, elapsed: Duration) {
        let total = self.total();
        println!("\n======= RESULTS =======");
        println!("Total calls: {total}");
        println!("Total time: {}ms", elapsed.as_millis());
        println!("\nOutcomes:");
        for class in OutcomeClass::ALL {
            let n = self.count(class);
            println!("  {:<18} {n:>6} ({:.2}%)", class.to_string(), percent(n, total));
        }
        if self.declined > 0 {
            println!("  {:<18} {:>6} ({:.2}%)", "declined", self.declined, percent(self.declined, total));
        }
        if self.retried_conflicts > 0 {
            println!("  retried conflicts  {:>6}", self.retried_conflicts);
        }
        println!("\nPerformance:");
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            println!("  Calls per second: {:.2}", total as f64 / secs);
        }
        println!("  Avg latency: {:.3}ms", ms(self.avg_latency()));
        println!("  Min latency: {:.3}ms", ms(self.min_latency()));
        println!("  Max latency: {:.3}ms", ms(self.max_latency()));
    }
}

fn percent(n: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { n as f64 * 100.0 / total as f64 }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_counts_and_latencies() {
        let mut a = Tally::default();
        a.record(OutcomeClass::Applied, Duration::from_millis(2));
        a.record(OutcomeClass::Conflict, Duration::from_millis(4));

        let mut b = Tally::default();
        b.record(OutcomeClass::Conflict, Duration::from_millis(6));
        b.retried_conflicts = 3;

        a.merge(b);
        assert_eq!(a.total(), 3);
        assert_eq!(a.count(OutcomeClass::Conflict), 2);
        assert_eq!(a.count(OutcomeClass::NotFound), 0);
        assert_eq!(a.retried_conflicts, 3);
        assert_eq!(a.min_latency(), Duration::from_millis(2));
        assert_eq!(a.max_latency(), Duration::from_millis(6));
        assert_eq!(a.avg_latency(), Duration::from_millis(4));
    }

    #[test]
    fn declined_counts_toward_total_but_not_applied() {
        let mut a = Tally::default();
        a.record(OutcomeClass::Applied, Duration::from_millis(1));
        let mut b = Tally::default();
        b.record_declined(Duration::from_millis(3));

        a.merge(b);
        assert_eq!(a.total(), 2);
        assert_eq!(a.declined(), 1);
        assert_eq!(a.count(OutcomeClass::Applied), 1);
        assert_eq!(a.max_latency(), Duration::from_millis(3));
    }

    #[test]
    fn empty_tally_is_zero() {
        let t = Tally::default();
        assert_eq!(t.total(), 0);
        assert_eq!(t.avg_latency(), Duration::ZERO);
        assert_eq!(percent(0, 0), 0.0);
    }
}
