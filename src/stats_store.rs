use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

use crate::fighter_page::{ClinchRow, FighterPage, GeneralInfo, GroundRow, HistoryRow, StandingRow};
use crate::match_record::RawStatRow;

/// One Fighters × History row: fighter 1's view of a bout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSeed {
    pub match_date: String,
    pub weight_class: String,
    pub decision: String,
    pub rounds: i64,
    pub match_time: String,
    pub event: String,
    pub fighter_id: i64,
    pub name: String,
    pub height: String,
    pub reach: String,
    pub age: Option<i64>,
    pub url: String,
    pub opponent: String,
    pub result: String,
    pub opp_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FighterBio {
    pub id: i64,
    pub name: String,
    pub height: String,
    pub reach: String,
    pub age: Option<i64>,
}

pub enum StatCategory<'a> {
    Standing(&'a [StandingRow]),
    Clinch(&'a [ClinchRow]),
    Ground(&'a [GroundRow]),
}

impl StatCategory<'_> {
    pub fn table(&self) -> &'static str {
        match self {
            StatCategory::Standing(_) => "StandingStatistics",
            StatCategory::Clinch(_) => "ClinchStatistics",
            StatCategory::Ground(_) => "GroundStatistics",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub fighter: bool,
    pub history: usize,
    pub standing: usize,
    pub clinch: usize,
    pub ground: usize,
}

const STATS_COLUMNS: &str = "s.sdbl_a, s.sdhl_a, s.sdll_a, s.tsl, s.tsa, s.ssl, s.ssa, s.sa, s.kd,
                 c.scbl, c.scba, c.schl, c.scha, c.scll, c.scla, c.rv, c.sr, c.tdl, c.tda, c.tds,
                 g.sgbl, g.sgba, g.sghl, g.sgha, g.sgll, g.sgla, g.ad, g.adtb, g.adhg, g.adtm, g.adts, g.sm";

pub struct StatsStore {
    conn: Connection,
}

impl StatsStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create store dir {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open sqlite db {}", path.display()))?;
        Ok(Self { conn })
    }

    /// Opens a store that must already exist; a missing file is an error
    /// instead of a fresh empty store.
    pub fn open_existing(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("open existing sqlite db {}", path.display()))?;
        Ok(Self { conn })
    }

    /// Read-only connection for a worker's private copy of the store.
    pub fn open_snapshot(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("open snapshot {}", path.display()))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn create_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS Fighters (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                age INTEGER,
                url TEXT NOT NULL,
                height TEXT,
                weight TEXT,
                weight_class TEXT,
                reach TEXT,
                group_name TEXT
            );
            CREATE INDEX IF NOT EXISTS index_name ON Fighters(name);
            CREATE UNIQUE INDEX IF NOT EXISTS index_url ON Fighters(url);

            CREATE TABLE IF NOT EXISTS History (
                id INTEGER NOT NULL,
                match_date TEXT NOT NULL,
                event TEXT NOT NULL,
                opponent TEXT NOT NULL,
                opp_url TEXT,
                result TEXT NOT NULL,
                decision TEXT NOT NULL,
                rnd INTEGER NOT NULL,
                match_time TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS index_history_id ON History(id);

            CREATE TABLE IF NOT EXISTS StandingStatistics (
                id INTEGER NOT NULL,
                match_date TEXT NOT NULL,
                opponent TEXT NOT NULL,
                opp_url TEXT,
                sdbl_a TEXT,
                sdhl_a TEXT,
                sdll_a TEXT,
                tsl TEXT,
                tsa TEXT,
                ssl TEXT,
                ssa TEXT,
                sa TEXT,
                kd TEXT,
                percent_body TEXT,
                percent_head TEXT,
                percent_leg TEXT
            );
            CREATE INDEX IF NOT EXISTS index_standing_key ON StandingStatistics(id, match_date);

            CREATE TABLE IF NOT EXISTS ClinchStatistics (
                id INTEGER NOT NULL,
                match_date TEXT NOT NULL,
                opponent TEXT NOT NULL,
                opp_url TEXT,
                scbl TEXT,
                scba TEXT,
                schl TEXT,
                scha TEXT,
                scll TEXT,
                scla TEXT,
                rv TEXT,
                sr TEXT,
                tdl TEXT,
                tda TEXT,
                tds TEXT,
                td_percent TEXT
            );
            CREATE INDEX IF NOT EXISTS index_clinch_key ON ClinchStatistics(id, match_date);

            CREATE TABLE IF NOT EXISTS GroundStatistics (
                id INTEGER NOT NULL,
                match_date TEXT NOT NULL,
                opponent TEXT NOT NULL,
                opp_url TEXT,
                sgbl TEXT,
                sgba TEXT,
                sghl TEXT,
                sgha TEXT,
                sgll TEXT,
                sgla TEXT,
                ad TEXT,
                adtb TEXT,
                adhg TEXT,
                adtm TEXT,
                adts TEXT,
                sm TEXT
            );
            CREATE INDEX IF NOT EXISTS index_ground_key ON GroundStatistics(id, match_date);
            "#,
            )
            .context("create sqlite schema")?;
        Ok(())
    }

    /// Drops every raw table and recreates the schema. Each scrape starts
    /// from an empty store since ids are reassigned per run.
    pub fn reset(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "DROP TABLE IF EXISTS Fighters;
                 DROP TABLE IF EXISTS History;
                 DROP TABLE IF EXISTS StandingStatistics;
                 DROP TABLE IF EXISTS ClinchStatistics;
                 DROP TABLE IF EXISTS GroundStatistics;",
            )
            .context("drop raw tables")?;
        self.create_schema()
    }

    /// Writes the Fighters row. Returns false (and logs) when the page lacks a
    /// name or url, or the insert fails.
    pub fn insert_fighter(&self, id: i64, url: &str, info: &GeneralInfo) -> bool {
        let Some(name) = info.name.as_deref().filter(|n| !n.trim().is_empty()) else {
            tracing::warn!(id, %url, "fighter skipped: missing name");
            return false;
        };
        if url.trim().is_empty() {
            tracing::warn!(id, %name, "fighter skipped: missing url");
            return false;
        }
        let res = self.conn.execute(
            "INSERT INTO Fighters (id, name, age, url, height, weight, weight_class, reach, group_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                name.trim(),
                info.age,
                url,
                info.height,
                info.weight,
                info.weight_class,
                info.reach,
                info.group,
            ],
        );
        match res {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(id, %url, "insert into Fighters failed: {err}");
                false
            }
        }
    }

    pub fn insert_history(&self, id: i64, rows: &[HistoryRow]) -> usize {
        let mut written = 0usize;
        for row in rows {
            let res = self.conn.execute(
                "INSERT INTO History (id, match_date, event, opponent, opp_url, result, decision, rnd, match_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id,
                    row.date,
                    row.event,
                    row.opponent,
                    row.opp_url,
                    row.result,
                    row.decision,
                    row.round,
                    row.time,
                ],
            );
            match res {
                Ok(_) => written += 1,
                Err(err) => tracing::warn!(id, date = %row.date, "insert into History failed: {err}"),
            }
        }
        written
    }

    pub fn insert_stat_category(&self, id: i64, category: StatCategory<'_>) -> usize {
        let table = category.table();
        let results: Vec<rusqlite::Result<usize>> = match category {
            StatCategory::Standing(rows) => rows
                .iter()
                .map(|r| {
                    self.conn.execute(
                        "INSERT INTO StandingStatistics (id, match_date, opponent, opp_url, sdbl_a, sdhl_a, sdll_a,
                             tsl, tsa, ssl, ssa, sa, kd, percent_body, percent_head, percent_leg)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                        params![
                            id, r.date, r.opponent, r.opp_url, r.sdbl_a, r.sdhl_a, r.sdll_a, r.tsl,
                            r.tsa, r.ssl, r.ssa, r.sa, r.kd, r.percent_body, r.percent_head,
                            r.percent_leg,
                        ],
                    )
                })
                .collect(),
            StatCategory::Clinch(rows) => rows
                .iter()
                .map(|r| {
                    self.conn.execute(
                        "INSERT INTO ClinchStatistics (id, match_date, opponent, opp_url, scbl, scba, schl,
                             scha, scll, scla, rv, sr, tdl, tda, tds, td_percent)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                        params![
                            id, r.date, r.opponent, r.opp_url, r.scbl, r.scba, r.schl, r.scha,
                            r.scll, r.scla, r.rv, r.sr, r.tdl, r.tda, r.tds, r.td_percent,
                        ],
                    )
                })
                .collect(),
            StatCategory::Ground(rows) => rows
                .iter()
                .map(|r| {
                    self.conn.execute(
                        "INSERT INTO GroundStatistics (id, match_date, opponent, opp_url, sgbl, sgba, sghl,
                             sgha, sgll, sgla, ad, adtb, adhg, adtm, adts, sm)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                        params![
                            id, r.date, r.opponent, r.opp_url, r.sgbl, r.sgba, r.sghl, r.sgha,
                            r.sgll, r.sgla, r.ad, r.adtb, r.adhg, r.adtm, r.adts, r.sm,
                        ],
                    )
                })
                .collect(),
        };

        let mut written = 0usize;
        for res in results {
            match res {
                Ok(_) => written += 1,
                Err(err) => tracing::warn!(id, table, "insert failed: {err}"),
            }
        }
        written
    }

    /// Stores one scraped fighter inside a single transaction. History and
    /// statistics are only written when the Fighters row made it in.
    pub fn persist_page(&self, id: i64, page: &FighterPage) -> Result<PersistSummary> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin persist transaction")?;
        let mut summary = PersistSummary {
            fighter: self.insert_fighter(id, &page.url, &page.info),
            ..PersistSummary::default()
        };
        if summary.fighter {
            summary.history = self.insert_history(id, &page.history);
            summary.standing =
                self.insert_stat_category(id, StatCategory::Standing(&page.stats.standing));
            summary.clinch = self.insert_stat_category(id, StatCategory::Clinch(&page.stats.clinch));
            summary.ground = self.insert_stat_category(id, StatCategory::Ground(&page.stats.ground));
        }
        tx.commit().context("commit persist transaction")?;
        Ok(summary)
    }

    pub fn query_match_seeds(&self) -> Result<Vec<MatchSeed>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT
                    h.match_date, f.weight_class, h.decision, h.rnd, h.match_time,
                    h.event, f.id, f.name, f.height, f.reach, f.age, f.url,
                    h.opponent, h.result, h.opp_url
                FROM Fighters f
                JOIN History h ON f.id = h.id
                ORDER BY h.match_date ASC, f.id ASC, h.rowid ASC
                "#,
            )
            .context("prepare match seed query")?;

        let rows = stmt
            .query_map([], |row| {
                Ok(MatchSeed {
                    match_date: row.get(0)?,
                    weight_class: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    decision: row.get(2)?,
                    rounds: row.get(3)?,
                    match_time: row.get(4)?,
                    event: row.get(5)?,
                    fighter_id: row.get(6)?,
                    name: row.get(7)?,
                    height: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
                    reach: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
                    age: row.get(10)?,
                    url: row.get(11)?,
                    opponent: row.get(12)?,
                    result: row.get(13)?,
                    opp_url: row.get(14)?,
                })
            })
            .context("query match seeds")?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode match seed row")?);
        }
        Ok(out)
    }

    /// Exact name + profile url lookup. No name-only fallback: common names
    /// collide.
    pub fn query_opponent_fighter(&self, name: &str, url: Option<&str>) -> Option<FighterBio> {
        let url = url?;
        let res = self
            .conn
            .query_row(
                "SELECT id, name, height, reach, age FROM Fighters WHERE name = ?1 AND url = ?2",
                params![name.trim(), url],
                |row| {
                    Ok(FighterBio {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        height: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        reach: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                        age: row.get(4)?,
                    })
                },
            )
            .optional();
        match res {
            Ok(bio) => bio,
            Err(err) => {
                tracing::warn!(%name, "opponent lookup failed: {err}");
                None
            }
        }
    }

    /// Standing + clinch + ground for one fighter on one date. `None` when any
    /// category is missing. A known opponent url narrows every category to
    /// that bout.
    pub fn query_stats_for_fighter_on_date(
        &self,
        id: i64,
        date: &str,
        opp_url: Option<&str>,
    ) -> Option<RawStatRow> {
        let sql = format!(
            "SELECT {STATS_COLUMNS}
             FROM StandingStatistics s
             JOIN ClinchStatistics c ON c.id = s.id AND c.match_date = s.match_date
             JOIN GroundStatistics g ON g.id = s.id AND g.match_date = s.match_date
             WHERE s.id = ?1 AND s.match_date = ?2
               AND (?3 IS NULL OR (s.opp_url = ?3 AND c.opp_url = ?3 AND g.opp_url = ?3))
             LIMIT 1"
        );
        let res = self
            .conn
            .query_row(&sql, params![id, date, opp_url], |row| {
                let text = |idx: usize| -> rusqlite::Result<String> {
                    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
                };
                Ok(RawStatRow {
                    sdbl_a: text(0)?,
                    sdhl_a: text(1)?,
                    sdll_a: text(2)?,
                    tsl: text(3)?,
                    tsa: text(4)?,
                    ssl: text(5)?,
                    ssa: text(6)?,
                    sa: text(7)?,
                    kd: text(8)?,
                    scbl: text(9)?,
                    scba: text(10)?,
                    schl: text(11)?,
                    scha: text(12)?,
                    scll: text(13)?,
                    scla: text(14)?,
                    rv: text(15)?,
                    sr: text(16)?,
                    tdl: text(17)?,
                    tda: text(18)?,
                    tds: text(19)?,
                    sgbl: text(20)?,
                    sgba: text(21)?,
                    sghl: text(22)?,
                    sgha: text(23)?,
                    sgll: text(24)?,
                    sgla: text(25)?,
                    ad: text(26)?,
                    adtb: text(27)?,
                    adhg: text(28)?,
                    adtm: text(29)?,
                    adts: text(30)?,
                    sm: text(31)?,
                })
            })
            .optional();
        match res {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!(id, %date, "statistics lookup failed: {err}");
                None
            }
        }
    }

    pub fn fighter_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM Fighters", [], |row| row.get(0))
            .context("count fighters")?;
        Ok(n as usize)
    }

    pub fn history_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM History", [], |row| row.get(0))
            .context("count history rows")?;
        Ok(n as usize)
    }
}
