use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use tokio::task::JoinSet;

use watchlist_api::{MovieEntry, MoviePatch, OutcomeClass, RecordId, VersionedRecord};
use watchlist_engine::{RetryPolicy, Watchlist};

use super::config::Effective;
use super::error::StressError;
use super::report::Tally;
use super::setup;

#[derive(Args, Clone, Debug)]
pub struct StressArgs {
    /// Total update calls
    #[arg(long, default_value_t = 1000)]
    pub requests: usize,

    /// Concurrently running batches the calls are split into
    #[arg(long, default_value_t = 10)]
    pub batches: usize,

    /// Re-read and retry on conflict (policy from `[retry]`)
    #[arg(long)]
    pub retry: bool,
}

fn replacement(request: usize) -> MovieEntry {
    MovieEntry::new(format!("Stress Test Update {request}"), 2023).with_watched(request % 2 == 0)
}

async fn run_batch(
    list: Arc<Watchlist<MovieEntry>>,
    id: RecordId,
    requests: std::ops::Range<usize>,
    policy: Option<RetryPolicy>,
) -> Tally {
    let mut calls = JoinSet::new();
    for request in requests {
        let list = list.clone();
        let id = id.clone();
        calls.spawn(async move {
            let owner = setup::test_owner();
            let patch = MoviePatch::replace(replacement(request));
            let started = Instant::now();
            match policy {
                None => {
                    let class = list.update(&id, &owner, None, &patch).await.class();
                    (Some(class), started.elapsed(), 0)
                }
                Some(policy) => {
                    let report = policy
                        .update(&list, &id, &owner, |_: &VersionedRecord<MovieEntry>| Some(patch.clone()))
                        .await;
                    let retried = u64::from(report.conflicts);
                    // `None`: derive declined, which the run treats as unaccounted
                    let class = report.into_outcome().map(|o| o.class());
                    (class, started.elapsed(), retried)
                }
            }
        });
    }

    let mut tally = Tally::default();
    while let Some(joined) = calls.join_next().await {
        match joined {
            Ok((Some(class), latency, retried)) => {
                tally.record(class, latency);
                tally.retried_conflicts += retried;
            }
            Ok((None, latency, retried)) => {
                tracing::warn!("retry declined without writing");
                tally.record_declined(latency);
                tally.retried_conflicts += retried;
            }
            Err(e) => tracing::error!(error = %e, "update task failed"),
        }
    }
    tally
}

pub async fn run(eff: &Effective, args: &StressArgs) -> Result<(), StressError> {
    if args.batches == 0 || args.requests < args.batches {
        return Err(StressError::Config(format!(
            "--requests ({}) must be at least --batches ({}) and batches non-zero",
            args.requests, args.batches
        )));
    }

    let list = setup::watchlist(eff)?;
    let record = setup::seed(&list, "Stress Test Movie").await?;
    let policy = args.retry.then(|| RetryPolicy::from_config(&eff.engine.retry));

    println!(
        "Starting stress run: {} updates in {} concurrent batches{}",
        args.requests,
        args.batches,
        if args.retry { " (with retry)" } else { "" }
    );

    let per_batch = args.requests.div_ceil(args.batches);
    let started = Instant::now();
    let mut batches = JoinSet::new();
    for batch in 0..args.batches {
        let from = batch * per_batch;
        let to = ((batch + 1) * per_batch).min(args.requests);
        if from >= to {
            break;
        }
        batches.spawn(run_batch(list.clone(), record.id.clone(), from..to, policy));
    }

    let mut tally = Tally::default();
    while let Some(joined) = batches.join_next().await {
        match joined {
            Ok(batch) => tally.merge(batch),
            Err(e) => tracing::error!(error = %e, "batch task failed"),
        }
    }
    let elapsed = started.elapsed();
    tally.print(elapsed);

    verify(&list, &record, &tally, args).await?;

    // Leave the store as we found it.
    let removed = list.delete(&record.id, &setup::test_owner(), None).await;
    tracing::debug!(outcome = %removed.class(), "test record removed");
    Ok(())
}

async fn verify(
    list: &Watchlist<MovieEntry>,
    seeded: &VersionedRecord<MovieEntry>,
    tally: &Tally,
    args: &StressArgs,
) -> Result<(), StressError> {
    let final_record = list
        .fetch(&seeded.id, &setup::test_owner())
        .await
        .into_applied()
        .ok_or_else(|| StressError::Violation("test record vanished".into()))?;

    let applied = tally.count(OutcomeClass::Applied) as u64;
    let accounted = tally.count(OutcomeClass::Applied) + tally.count(OutcomeClass::Conflict);

    println!("\nConsistency:");
    println!("  Final version: {}", final_record.version);
    println!("  Applied calls: {applied}");

    if tally.total() != args.requests {
        return Err(StressError::Violation(format!(
            "{} of {} calls reported an outcome",
            tally.total(),
            args.requests
        )));
    }
    if final_record.version != seeded.version + applied {
        return Err(StressError::Violation(format!(
            "lost update: final version {} but {applied} calls applied",
            final_record.version
        )));
    }
    if tally.declined() > 0 {
        return Err(StressError::Violation(format!(
            "{} retry loops declined without writing",
            tally.declined()
        )));
    }
    if accounted != args.requests {
        return Err(StressError::Violation(format!(
            "{} calls ended in neither applied nor conflict",
            args.requests - accounted
        )));
    }
    if args.retry && tally.count(OutcomeClass::Conflict) > 0 {
        println!(
            "  {} calls exhausted their retry budget",
            tally.count(OutcomeClass::Conflict)
        );
    }

    println!("  No lost updates");
    Ok(())
}
