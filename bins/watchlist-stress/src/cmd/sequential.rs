use std::time::Instant;

use watchlist_api::{MoviePatch, Outcome};

use super::config::Effective;
use super::error::StressError;
use super::report::Tally;
use super::setup;

/// `updates` back-to-back updates by one caller. With no concurrency every
/// call must apply and the record must end up holding the last write.
pub async fn run(eff: &Effective, updates: usize) -> Result<(), StressError> {
    if updates == 0 {
        return Err(StressError::Config("--updates must be greater than zero".into()));
    }

    let list = setup::watchlist(eff)?;
    let record = setup::seed(&list, "Sequential Test Movie").await?;
    let owner = setup::test_owner();

    let mut tally = Tally::default();
    let mut last = None;
    let started = Instant::now();
    for i in 0..updates {
        let patch = MoviePatch::title(format!("Sequential Update {i}")).with_watched(i % 2 == 0);
        let call = Instant::now();
        let outcome = list.update(&record.id, &owner, None, &patch).await;
        tally.record(outcome.class(), call.elapsed());

        match outcome {
            Outcome::Applied(updated) => last = Some((patch, updated.version)),
            other => {
                tally.print(started.elapsed());
                return Err(StressError::Violation(format!(
                    "sequential update {i} returned {}",
                    other.class()
                )));
            }
        }
    }
    tally.print(started.elapsed());

    let stored = list
        .fetch(&record.id, &owner)
        .await
        .into_applied()
        .ok_or_else(|| StressError::Violation("test record vanished".into()))?;
    let Some((patch, version)) = last else {
        return Err(StressError::Violation("no update recorded".into()));
    };

    if stored.version != version || stored.version != record.version + updates as u64 {
        return Err(StressError::Violation(format!(
            "final version {} after {updates} sequential updates",
            stored.version
        )));
    }
    if patch.title.as_deref() != Some(stored.payload.title.as_str()) || patch.watched != Some(stored.payload.watched) {
        return Err(StressError::Violation(format!(
            "final state {:?} does not match the last write {:?}",
            stored.payload, patch
        )));
    }

    println!("\nFinal state matches the last write (version {})", stored.version);
    let removed = list.delete(&record.id, &owner, None).await;
    tracing::debug!(outcome = %removed.class(), "test record removed");
    Ok(())
}
