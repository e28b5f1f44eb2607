use crate::match_record::{FighterSlot, MatchRecord, StatLine};
use crate::stats_store::{MatchSeed, StatsStore};

/// Builds the two-sided record for one seed row. `None` means the opponent
/// could not be resolved to a stored fighter; the caller keeps it as a
/// placeholder so positional counts stay aligned.
pub fn reconstruct_match(store: &StatsStore, seed: &MatchSeed) -> Option<MatchRecord> {
    let date = seed.match_date.trim().to_string();

    let fighter1 = FighterSlot {
        id: seed.fighter_id,
        name: seed.name.trim().to_string(),
        height: seed.height.clone(),
        reach: seed.reach.clone(),
        age: seed.age,
        stats: stats_for(store, seed.fighter_id, &date, seed.opp_url.as_deref()),
    };

    let Some(opponent) = store.query_opponent_fighter(&seed.opponent, seed.opp_url.as_deref())
    else {
        tracing::debug!(
            fighter = %fighter1.name,
            opponent = %seed.opponent.trim(),
            %date,
            "opponent not resolvable, match discarded"
        );
        return None;
    };

    // From the opponent's side the "opponent" of the bout is fighter 1.
    let fighter2 = FighterSlot {
        id: opponent.id,
        stats: stats_for(store, opponent.id, &date, Some(seed.url.as_str())),
        name: opponent.name.trim().to_string(),
        height: opponent.height,
        reach: opponent.reach,
        age: opponent.age,
    };

    Some(MatchRecord {
        winner: winner_name(&seed.result, &fighter1.name, &seed.opponent),
        date,
        weight_class: seed.weight_class.clone(),
        decision_type: seed.decision.trim().to_string(),
        rounds: seed.rounds,
        time: seed.match_time.trim().to_string(),
        is_title: seed.event.trim().to_string(),
        fighter1,
        fighter2,
    })
}

/// `Win` names fighter 1, `Loss` the opponent; draws and no-contests have no
/// winner.
pub fn winner_name(result: &str, fighter: &str, opponent: &str) -> String {
    match result.trim() {
        "Win" => fighter.trim().to_string(),
        "Loss" => opponent.trim().to_string(),
        _ => String::new(),
    }
}

fn stats_for(store: &StatsStore, id: i64, date: &str, opp_url: Option<&str>) -> StatLine {
    store
        .query_stats_for_fighter_on_date(id, date, opp_url)
        .map(|row| row.to_stat_line())
        .unwrap_or_default()
}
