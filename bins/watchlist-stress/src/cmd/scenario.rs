use watchlist_api::{Conflict, MovieEntry, MoviePatch, Outcome, OwnerId, RecordId, Version, VersionedRecord};
use watchlist_engine::Watchlist;

use super::config::Effective;
use super::error::StressError;
use super::setup;

fn check(step: &str, ok: bool, detail: impl std::fmt::Display) -> Result<(), StressError> {
    if ok {
        println!("  [ok]   {step}: {detail}");
        Ok(())
    } else {
        println!("  [FAIL] {step}: {detail}");
        Err(StressError::Violation(format!("{step}: {detail}")))
    }
}

async fn read(
    list: &Watchlist<MovieEntry>,
    id: &RecordId,
    owner: &OwnerId,
) -> Result<VersionedRecord<MovieEntry>, StressError> {
    list.fetch(id, owner)
        .await
        .into_applied()
        .ok_or_else(|| StressError::Violation("record not readable".into()))
}

async fn write(
    list: &Watchlist<MovieEntry>,
    id: &RecordId,
    owner: &OwnerId,
    expected: Version,
    title: &str,
) -> Outcome<VersionedRecord<MovieEntry>> {
    list.update(id, owner, Some(expected), &MoviePatch::title(title)).await
}

/// Two writers read the same version; the first write wins, the second gets
/// a conflict naming both versions, re-reads and succeeds.
pub async fn run(eff: &Effective) -> Result<(), StressError> {
    let list = setup::watchlist(eff)?;
    let owner = setup::test_owner();
    let record = setup::seed(&list, "A").await?;

    // Walk the record up to version 3 with title "A".
    for title in ["A1", "A2", "A"] {
        let current = read(&list, &record.id, &owner).await?;
        write(&list, &record.id, &owner, current.version, title)
            .await
            .into_applied()
            .ok_or_else(|| StressError::Violation("setup write failed".into()))?;
    }

    println!("Two-writer scenario on record {}", record.id);

    let x_view = read(&list, &record.id, &owner).await?;
    let y_view = read(&list, &record.id, &owner).await?;
    check(
        "both read",
        x_view.version == 3 && y_view.version == 3 && x_view.payload.title == "A",
        format!("version {} title {:?}", x_view.version, x_view.payload.title),
    )?;

    let x = write(&list, &record.id, &owner, x_view.version, "B").await;
    check(
        "X writes B",
        x.applied().is_some_and(|r| r.version == 4),
        format!("{} {:?}", x.class(), x.applied().map(|r| r.version)),
    )?;

    let y = write(&list, &record.id, &owner, y_view.version, "C").await;
    check(
        "Y writes C from version 3",
        y == Outcome::Conflict(Conflict { expected: 3, actual: 4 }),
        y.class(),
    )?;

    let y_view = read(&list, &record.id, &owner).await?;
    check(
        "Y re-reads",
        y_view.version == 4 && y_view.payload.title == "B",
        format!("version {} title {:?}", y_view.version, y_view.payload.title),
    )?;

    let y = write(&list, &record.id, &owner, y_view.version, "C").await;
    check(
        "Y writes C from version 4",
        y.applied().is_some_and(|r| r.version == 5 && r.payload.title == "C"),
        format!("{} {:?}", y.class(), y.applied().map(|r| r.version)),
    )?;

    let intruder = OwnerId::new("someone-else");
    let z = write(&list, &record.id, &intruder, 5, "D").await;
    check("non-owner write", z == Outcome::Forbidden, z.class())?;

    let final_record = read(&list, &record.id, &owner).await?;
    check(
        "final state",
        final_record.version == 5 && final_record.payload.title == "C",
        format!("version {} title {:?}", final_record.version, final_record.payload.title),
    )?;

    let removed = list.delete(&record.id, &owner, None).await;
    tracing::debug!(outcome = %removed.class(), "test record removed");
    Ok(())
}
