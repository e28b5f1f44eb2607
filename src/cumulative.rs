use crate::match_record::{MatchRecord, StatLine};

/// Rewrites each fighter's statistics as career totals including the current
/// bout. Input must already be in ascending date order; every record looks
/// back over the records finalized before it.
pub fn accumulate_career_totals(records: &[MatchRecord]) -> Vec<MatchRecord> {
    let mut finalized: Vec<MatchRecord> = Vec::with_capacity(records.len());
    for record in records {
        let (prior1, prior2) = latest_totals(&finalized, record.fighter1.id, record.fighter2.id);

        let mut out = record.clone();
        if let Some(prior) = prior1 {
            out.fighter1.stats = prior;
            out.fighter1.stats.accumulate(&record.fighter1.stats);
        }
        if let Some(prior) = prior2 {
            out.fighter2.stats = prior;
            out.fighter2.stats.accumulate(&record.fighter2.stats);
        }
        finalized.push(out);
    }
    finalized
}

/// Most recent totals for two fighters, scanning newest first and stopping
/// once both are found. A fighter may appear in either slot of a prior bout.
fn latest_totals(
    finalized: &[MatchRecord],
    fighter1: i64,
    fighter2: i64,
) -> (Option<StatLine>, Option<StatLine>) {
    let mut found1 = None;
    let mut found2 = None;
    for prev in finalized.iter().rev() {
        if found1.is_none() {
            found1 = slot_stats(prev, fighter1);
        }
        if found2.is_none() {
            found2 = slot_stats(prev, fighter2);
        }
        if found1.is_some() && found2.is_some() {
            break;
        }
    }
    (found1, found2)
}

fn slot_stats(record: &MatchRecord, fighter: i64) -> Option<StatLine> {
    if record.fighter1.id == fighter {
        Some(record.fighter1.stats)
    } else if record.fighter2.id == fighter {
        Some(record.fighter2.stats)
    } else {
        None
    }
}
