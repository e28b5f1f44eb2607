use std::collections::HashSet;

use crate::match_record::MatchRecord;

/// Every bout is reconstructed once per participant. The first record seen
/// for a dedup key is kept, later ones become placeholders so the collection
/// keeps its length.
pub fn dedup_records(records: Vec<Option<MatchRecord>>) -> Vec<Option<MatchRecord>> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .map(|record| record.filter(|r| seen.insert(r.dedup_key())))
        .collect()
}

/// Drops placeholders and sorts by (date, winner, title) with a stable sort,
/// so equal keys keep their seed order.
pub fn order_records(records: Vec<Option<MatchRecord>>) -> Vec<MatchRecord> {
    let mut kept: Vec<MatchRecord> = records.into_iter().flatten().collect();
    kept.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.winner.cmp(&b.winner))
            .then_with(|| a.is_title.cmp(&b.is_title))
    });
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_record::FighterSlot;

    fn record(date: &str, winner: &str, f1: i64, f2: i64) -> MatchRecord {
        MatchRecord {
            date: date.to_string(),
            winner: winner.to_string(),
            time: "5:00".to_string(),
            decision_type: "U Dec".to_string(),
            is_title: "UFC".to_string(),
            fighter1: FighterSlot {
                id: f1,
                ..FighterSlot::default()
            },
            fighter2: FighterSlot {
                id: f2,
                ..FighterSlot::default()
            },
            ..MatchRecord::default()
        }
    }

    #[test]
    fn mirrored_records_collapse_to_first_seen() {
        let records = vec![
            Some(record("2020-01-01", "A", 1, 2)),
            None,
            Some(record("2020-01-01", "A", 2, 1)),
        ];
        let out = dedup_records(records);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].as_ref().map(|r| r.fighter1.id), Some(1));
        assert!(out[1].is_none());
        assert!(out[2].is_none());
    }

    #[test]
    fn dedup_is_idempotent() {
        let records = vec![
            Some(record("2020-01-01", "A", 1, 2)),
            Some(record("2020-01-01", "A", 2, 1)),
            Some(record("2019-01-01", "C", 3, 4)),
        ];
        let once = dedup_records(records);
        let twice = dedup_records(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn title_and_decision_are_part_of_the_key() {
        let mut title_bout = record("2020-01-01", "A", 1, 2);
        title_bout.is_title = "UFC 250 (Title)".to_string();
        let records = vec![Some(record("2020-01-01", "A", 1, 3)), Some(title_bout)];
        let out = dedup_records(records);
        assert!(out.iter().all(|r| r.is_some()));
    }

    #[test]
    fn ordering_sorts_by_date_then_winner() {
        let records = vec![
            Some(record("2021-03-01", "B", 1, 2)),
            None,
            Some(record("2020-01-01", "Z", 3, 4)),
            Some(record("2020-01-01", "C", 5, 6)),
        ];
        let ordered = order_records(records);
        let keys: Vec<(&str, &str)> = ordered
            .iter()
            .map(|r| (r.date.as_str(), r.winner.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("2020-01-01", "C"), ("2020-01-01", "Z"), ("2021-03-01", "B")]
        );
    }
}
