use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, params_from_iter, types::Value};

use crate::match_record::{FighterSlot, MatchRecord, StatLine};

const GENERAL_COLUMNS: &[&str] = &[
    "match_date",
    "weight_class",
    "winner",
    "decision_type",
    "rounds",
    "match_time",
    "is_title",
];
const IDENTITY_COLUMNS: &[&str] = &["id", "name", "height", "reach", "age"];

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir {}", parent.display()))?;
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Column names after `match_id`, in insert order.
pub fn column_names() -> Vec<String> {
    let mut cols: Vec<String> = GENERAL_COLUMNS.iter().map(|c| c.to_string()).collect();
    for prefix in ["f1", "f2"] {
        cols.extend(IDENTITY_COLUMNS.iter().map(|c| format!("{prefix}_{c}")));
        cols.extend(
            StatLine::LABELS
                .iter()
                .map(|c| format!("{prefix}_{}", c.to_ascii_lowercase())),
        );
    }
    cols
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    let columns: Vec<String> = column_names()
        .into_iter()
        .map(|col| {
            let ty = column_type(&col);
            format!("{col} {ty}")
        })
        .collect();
    let ddl = format!(
        "CREATE TABLE IF NOT EXISTS MatchHistory (
            match_id INTEGER PRIMARY KEY AUTOINCREMENT,
            {}
        );
        CREATE INDEX IF NOT EXISTS index_match_history_date ON MatchHistory(match_date);",
        columns.join(",\n            ")
    );
    conn.execute_batch(&ddl)
        .context("create MatchHistory schema")?;
    Ok(())
}

/// Replaces the table contents with `records` in one transaction.
pub fn write_match_history(conn: &mut Connection, records: &[MatchRecord]) -> Result<usize> {
    let cols = column_names();
    let placeholders: Vec<String> = (1..=cols.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO MatchHistory ({}) VALUES ({})",
        cols.join(", "),
        placeholders.join(", ")
    );

    let tx = conn.transaction().context("begin MatchHistory transaction")?;
    tx.execute("DELETE FROM MatchHistory", [])
        .context("clear MatchHistory")?;
    let mut written = 0usize;
    {
        let mut stmt = tx.prepare(&sql).context("prepare MatchHistory insert")?;
        for record in records {
            stmt.execute(params_from_iter(row_values(record)))
                .with_context(|| format!("insert match {} {}", record.date, record.winner))?;
            written += 1;
        }
    }
    tx.commit().context("commit MatchHistory")?;
    Ok(written)
}

pub fn load_match_history(conn: &Connection) -> Result<Vec<MatchRecord>> {
    let sql = format!(
        "SELECT {} FROM MatchHistory ORDER BY match_id ASC",
        column_names().join(", ")
    );
    let mut stmt = conn.prepare(&sql).context("prepare MatchHistory load")?;
    let slot_width = IDENTITY_COLUMNS.len() + StatLine::LEN;
    let rows = stmt
        .query_map([], |row| {
            let read_slot = |first: usize| -> rusqlite::Result<FighterSlot> {
                let mut values = Vec::with_capacity(StatLine::LEN);
                for idx in 0..StatLine::LEN {
                    values.push(row.get::<_, i64>(first + IDENTITY_COLUMNS.len() + idx)?);
                }
                Ok(FighterSlot {
                    id: row.get(first)?,
                    name: row.get(first + 1)?,
                    height: row.get(first + 2)?,
                    reach: row.get(first + 3)?,
                    age: row.get(first + 4)?,
                    stats: StatLine::from_values(&values),
                })
            };
            let first = GENERAL_COLUMNS.len();
            Ok(MatchRecord {
                date: row.get(0)?,
                weight_class: row.get(1)?,
                winner: row.get(2)?,
                decision_type: row.get(3)?,
                rounds: row.get(4)?,
                time: row.get(5)?,
                is_title: row.get(6)?,
                fighter1: read_slot(first)?,
                fighter2: read_slot(first + slot_width)?,
            })
        })
        .context("query MatchHistory")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode MatchHistory row")?);
    }
    Ok(out)
}

fn column_type(col: &str) -> &'static str {
    let Some(field) = col.strip_prefix("f1_").or_else(|| col.strip_prefix("f2_")) else {
        return if col == "rounds" { "INTEGER" } else { "TEXT" };
    };
    match field {
        "name" | "height" | "reach" => "TEXT",
        _ => "INTEGER",
    }
}

fn row_values(record: &MatchRecord) -> Vec<Value> {
    let mut values = vec![
        Value::Text(record.date.clone()),
        Value::Text(record.weight_class.clone()),
        Value::Text(record.winner.clone()),
        Value::Text(record.decision_type.clone()),
        Value::Integer(record.rounds),
        Value::Text(record.time.clone()),
        Value::Text(record.is_title.clone()),
    ];
    for slot in [&record.fighter1, &record.fighter2] {
        values.push(Value::Integer(slot.id));
        values.push(Value::Text(slot.name.clone()));
        values.push(Value::Text(slot.height.clone()));
        values.push(Value::Text(slot.reach.clone()));
        values.push(slot.age.map(Value::Integer).unwrap_or(Value::Null));
        values.extend(slot.stats.values().into_iter().map(Value::Integer));
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(date: &str, winner: &str) -> MatchRecord {
        MatchRecord {
            date: date.to_string(),
            winner: winner.to_string(),
            rounds: 3,
            fighter1: FighterSlot {
                id: 1,
                name: winner.to_string(),
                age: Some(29),
                stats: StatLine {
                    sdbl: 3,
                    sdba: 5,
                    sm: 2,
                    ..StatLine::default()
                },
                ..FighterSlot::default()
            },
            fighter2: FighterSlot {
                id: 2,
                name: "Other".to_string(),
                ..FighterSlot::default()
            },
            ..MatchRecord::default()
        }
    }

    #[test]
    fn column_count_matches_record_shape() {
        assert_eq!(column_names().len(), 7 + 2 * (5 + StatLine::LEN));
        assert!(column_names().contains(&"f2_sdbl".to_string()));
    }

    #[test]
    fn write_replaces_previous_run() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        write_match_history(&mut conn, &[sample("2019-01-01", "X")]).unwrap();
        let records = vec![sample("2020-01-01", "A"), sample("2020-02-01", "B")];
        assert_eq!(write_match_history(&mut conn, &records).unwrap(), 2);

        let loaded = load_match_history(&conn).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn unusable_output_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let err = open_db(&blocker.join("history.db")).expect_err("parent is a file");
        assert!(format!("{err:#}").contains("create output dir"), "{err:#}");
    }
}
