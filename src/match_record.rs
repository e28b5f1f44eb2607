use serde::{Deserialize, Serialize};

macro_rules! stat_line {
    ($($field:ident => $label:literal),+ $(,)?) => {
        /// Per-fighter statistic block as laid out in the report: 12 striking,
        /// 11 clinch and 12 ground counters.
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct StatLine {
            $(pub $field: i64,)+
        }

        impl StatLine {
            /// Report column suffixes, in column order.
            pub const LABELS: &'static [&'static str] = &[$($label),+];
            pub const LEN: usize = Self::LABELS.len();

            pub fn values(&self) -> Vec<i64> {
                vec![$(self.$field),+]
            }

            /// Missing trailing values are 0.
            pub fn from_values(values: &[i64]) -> Self {
                let mut iter = values.iter().copied();
                StatLine {
                    $($field: iter.next().unwrap_or(0),)+
                }
            }

            pub fn accumulate(&mut self, other: &StatLine) {
                $(self.$field = self.$field.saturating_add(other.$field);)+
            }

            pub fn is_zero(&self) -> bool {
                true $(&& self.$field == 0)+
            }
        }
    };
}

stat_line! {
    sdbl => "SDBL",
    sdba => "SDBA",
    sdhl => "SDHL",
    sdha => "SDHA",
    sdll => "SDLL",
    sdla => "SDLA",
    tsl => "TSL",
    tsa => "TSA",
    ssl => "SSL",
    ssa => "SSA",
    sa => "SA",
    kd => "KD",
    scbl => "SCBL",
    scba => "SCBA",
    schl => "SCHL",
    scha => "SCHA",
    scll => "SCLL",
    scla => "SCLA",
    rv => "RV",
    sr => "SR",
    tdl => "TDL",
    tda => "TDA",
    tds => "TDS",
    sgbl => "SGBL",
    sgba => "SGBA",
    sghl => "SGHL",
    sgha => "SGHA",
    sgll => "SGLL",
    sgla => "SGLA",
    ad => "AD",
    adtb => "ADTB",
    adhg => "ADHG",
    adtm => "ADTM",
    adts => "ADTS",
    sm => "SM",
}

pub const STRIKING_FIELDS: usize = 12;
pub const CLINCH_FIELDS: usize = 11;
pub const GROUND_FIELDS: usize = 12;

/// Raw text columns of the standing + clinch + ground join, as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStatRow {
    pub sdbl_a: String,
    pub sdhl_a: String,
    pub sdll_a: String,
    pub tsl: String,
    pub tsa: String,
    pub ssl: String,
    pub ssa: String,
    pub sa: String,
    pub kd: String,
    pub scbl: String,
    pub scba: String,
    pub schl: String,
    pub scha: String,
    pub scll: String,
    pub scla: String,
    pub rv: String,
    pub sr: String,
    pub tdl: String,
    pub tda: String,
    pub tds: String,
    pub sgbl: String,
    pub sgba: String,
    pub sghl: String,
    pub sgha: String,
    pub sgll: String,
    pub sgla: String,
    pub ad: String,
    pub adtb: String,
    pub adhg: String,
    pub adtm: String,
    pub adts: String,
    pub sm: String,
}

impl RawStatRow {
    pub fn to_stat_line(&self) -> StatLine {
        let (sdbl, sdba) = split_landed_attempted(&self.sdbl_a);
        let (sdhl, sdha) = split_landed_attempted(&self.sdhl_a);
        let (sdll, sdla) = split_landed_attempted(&self.sdll_a);
        StatLine {
            sdbl,
            sdba,
            sdhl,
            sdha,
            sdll,
            sdla,
            tsl: parse_or_zero(&self.tsl),
            tsa: parse_or_zero(&self.tsa),
            ssl: parse_or_zero(&self.ssl),
            ssa: parse_or_zero(&self.ssa),
            sa: parse_or_zero(&self.sa),
            kd: parse_or_zero(&self.kd),
            scbl: parse_or_zero(&self.scbl),
            scba: parse_or_zero(&self.scba),
            schl: parse_or_zero(&self.schl),
            scha: parse_or_zero(&self.scha),
            scll: parse_or_zero(&self.scll),
            scla: parse_or_zero(&self.scla),
            rv: parse_or_zero(&self.rv),
            sr: parse_or_zero(&self.sr),
            tdl: parse_or_zero(&self.tdl),
            tda: parse_or_zero(&self.tda),
            tds: parse_or_zero(&self.tds),
            sgbl: parse_or_zero(&self.sgbl),
            sgba: parse_or_zero(&self.sgba),
            sghl: parse_or_zero(&self.sghl),
            sgha: parse_or_zero(&self.sgha),
            sgll: parse_or_zero(&self.sgll),
            sgla: parse_or_zero(&self.sgla),
            ad: parse_or_zero(&self.ad),
            adtb: parse_or_zero(&self.adtb),
            adhg: parse_or_zero(&self.adhg),
            adtm: parse_or_zero(&self.adtm),
            adts: parse_or_zero(&self.adts),
            sm: parse_or_zero(&self.sm),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FighterSlot {
    pub id: i64,
    pub name: String,
    pub height: String,
    pub reach: String,
    pub age: Option<i64>,
    pub stats: StatLine,
}

/// One bout with both participants. Built by the reconstructor, collapsed by
/// dedup and optionally rewritten with career totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: String,
    pub weight_class: String,
    pub winner: String,
    pub decision_type: String,
    pub rounds: i64,
    pub time: String,
    /// Event column of the history row ("IsTitle?" in the report).
    pub is_title: String,
    pub fighter1: FighterSlot,
    pub fighter2: FighterSlot,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub date: String,
    pub winner: String,
    pub time: String,
    pub is_title: String,
    pub decision_type: String,
}

impl MatchRecord {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            date: self.date.clone(),
            winner: self.winner.clone(),
            time: self.time.clone(),
            is_title: self.is_title.clone(),
            decision_type: self.decision_type.clone(),
        }
    }
}

/// Lenient count parse for scraped cells: empty, unparsable or negative
/// input is 0.
pub fn parse_or_zero(raw: &str) -> i64 {
    raw.trim().parse::<i64>().map(|v| v.max(0)).unwrap_or(0)
}

/// Splits a "landed/attempted" cell. Without a `/` both halves are 0.
pub fn split_landed_attempted(raw: &str) -> (i64, i64) {
    match raw.split_once('/') {
        Some((landed, attempted)) => (parse_or_zero(landed), parse_or_zero(attempted)),
        None => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_zero_is_lenient() {
        assert_eq!(parse_or_zero("12"), 12);
        assert_eq!(parse_or_zero(" 7 "), 7);
        assert_eq!(parse_or_zero(""), 0);
        assert_eq!(parse_or_zero("-"), 0);
        assert_eq!(parse_or_zero("45%"), 0);
        assert_eq!(parse_or_zero("-3"), 0);
        assert_eq!(parse_or_zero(" -0 "), 0);
    }

    #[test]
    fn split_landed_attempted_cases() {
        assert_eq!(split_landed_attempted("3/5"), (3, 5));
        assert_eq!(split_landed_attempted(" 10 / 22 "), (10, 22));
        assert_eq!(split_landed_attempted("-"), (0, 0));
        assert_eq!(split_landed_attempted(""), (0, 0));
        assert_eq!(split_landed_attempted("4/"), (4, 0));
        assert_eq!(split_landed_attempted("-3/5"), (0, 5));
    }

    #[test]
    fn stat_line_layout_matches_report_groups() {
        assert_eq!(StatLine::LEN, STRIKING_FIELDS + CLINCH_FIELDS + GROUND_FIELDS);
        assert_eq!(StatLine::LABELS[0], "SDBL");
        assert_eq!(StatLine::LABELS[STRIKING_FIELDS], "SCBL");
        assert_eq!(StatLine::LABELS[STRIKING_FIELDS + CLINCH_FIELDS], "SGBL");
        assert_eq!(StatLine::default().values().len(), StatLine::LEN);
    }

    #[test]
    fn raw_row_converts_compound_and_plain_fields() {
        let raw = RawStatRow {
            sdbl_a: "3/5".to_string(),
            sdhl_a: "--".to_string(),
            tsl: "10".to_string(),
            kd: "".to_string(),
            sm: "2".to_string(),
            ..RawStatRow::default()
        };
        let line = raw.to_stat_line();
        assert_eq!((line.sdbl, line.sdba), (3, 5));
        assert_eq!((line.sdhl, line.sdha), (0, 0));
        assert_eq!(line.tsl, 10);
        assert_eq!(line.kd, 0);
        assert_eq!(line.sm, 2);
    }

    #[test]
    fn accumulate_adds_every_field() {
        let mut total = StatLine {
            tsl: 10,
            sgbl: 1,
            ..StatLine::default()
        };
        total.accumulate(&StatLine {
            tsl: 7,
            sm: 3,
            ..StatLine::default()
        });
        assert_eq!(total.tsl, 17);
        assert_eq!(total.sgbl, 1);
        assert_eq!(total.sm, 3);
        assert!(!total.is_zero());
        assert!(StatLine::default().is_zero());
    }
}
