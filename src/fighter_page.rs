use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::http_cache::fetch_html_cached;
use crate::match_record::parse_or_zero;

pub const ESPN_BASE_URL: &str = "http://www.espn.com";

const DATE_FORMATS: &[&str] = &["%b %d, %Y", "%B %d, %Y", "%m/%d/%Y", "%Y-%m-%d", "%d %b %Y"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralInfo {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub weight_class: Option<String>,
    pub reach: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub date: String,
    pub event: String,
    pub opponent: String,
    pub opp_url: Option<String>,
    pub result: String,
    pub decision: String,
    pub round: i64,
    pub time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingRow {
    pub date: String,
    pub opponent: String,
    pub opp_url: Option<String>,
    pub sdbl_a: String,
    pub sdhl_a: String,
    pub sdll_a: String,
    pub tsl: String,
    pub tsa: String,
    pub ssl: String,
    pub ssa: String,
    pub sa: String,
    pub kd: String,
    pub percent_body: String,
    pub percent_head: String,
    pub percent_leg: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinchRow {
    pub date: String,
    pub opponent: String,
    pub opp_url: Option<String>,
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
    pub td_percent: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundRow {
    pub date: String,
    pub opponent: String,
    pub opp_url: Option<String>,
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

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageStats {
    pub standing: Vec<StandingRow>,
    pub clinch: Vec<ClinchRow>,
    pub ground: Vec<GroundRow>,
}

/// Everything scraped for one fighter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FighterPage {
    pub url: String,
    pub info: GeneralInfo,
    pub history: Vec<HistoryRow>,
    pub stats: PageStats,
}

pub fn fighter_index_url(letter: char) -> String {
    format!("{ESPN_BASE_URL}/mma/fighters?search={letter}")
}

/// Inserts a page name after the `/mma/fighter` prefix of a profile URL:
/// `.../mma/fighter/_/id/1/x` becomes `.../mma/fighter/history/_/id/1/x`.
pub fn page_url(profile_url: &str, page: &str) -> Option<String> {
    let parts: Vec<&str> = profile_url.split('/').collect();
    if parts.len() <= 5 {
        return None;
    }
    let prefix = parts[..5].join("/");
    let suffix = parts[5..].join("/");
    Some(format!("{prefix}/{page}/{suffix}"))
}

pub fn fetch_fighter_index(client: &Client, letter: char) -> Result<Vec<String>> {
    let html = fetch_html_cached(client, &fighter_index_url(letter))
        .with_context(|| format!("fighter index '{letter}'"))?;
    parse_fighter_index(&html)
}

/// Fetches the history page (bio + fight list) and the stats page. A missing
/// stats page is tolerated; the fighter is then stored without statistics.
pub fn fetch_fighter_page(client: &Client, profile_url: &str) -> Result<FighterPage> {
    let history_url = page_url(profile_url, "history")
        .ok_or_else(|| anyhow!("unexpected profile url {profile_url}"))?;
    let history_html = fetch_html_cached(client, &history_url)?;
    let (info, history) = parse_history_page(&history_html)?;

    let stats = match page_url(profile_url, "stats") {
        Some(stats_url) => match fetch_html_cached(client, &stats_url)
            .and_then(|html| parse_stats_page(&html))
        {
            Ok(stats) => stats,
            Err(err) => {
                tracing::warn!(url = %profile_url, "stats page unavailable: {err:#}");
                PageStats::default()
            }
        },
        None => PageStats::default(),
    };

    Ok(FighterPage {
        url: profile_url.to_string(),
        info,
        history,
        stats,
    })
}

pub fn parse_fighter_index(html: &str) -> Result<Vec<String>> {
    let doc = Html::parse_document(html);
    let row_sel = selector("table tr")?;
    let link_sel = selector("a[href]")?;

    let mut urls = Vec::new();
    for row in doc.select(&row_sel) {
        if !is_data_row(&row) {
            continue;
        }
        let Some(href) = row
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        urls.push(absolute_url(href));
    }
    Ok(urls)
}

pub fn parse_history_page(html: &str) -> Result<(GeneralInfo, Vec<HistoryRow>)> {
    let doc = Html::parse_document(html);
    let info = parse_general_info(&doc)?;

    let table_sel = selector("table.tablehead")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let link_sel = selector("a[href]")?;

    let mut history = Vec::new();
    let Some(table) = doc.select(&table_sel).next() else {
        tracing::debug!("history table not found");
        return Ok((info, history));
    };

    for row in table.select(&row_sel) {
        if !is_data_row(&row) {
            continue;
        }
        let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
        if cells.len() < 7 {
            continue;
        }
        let opp_url = cells[2]
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(absolute_url);
        history.push(HistoryRow {
            date: normalize_match_date(&cell_text(&cells[0])),
            event: cell_text(&cells[1]),
            opponent: cell_text(&cells[2]),
            opp_url,
            result: cell_text(&cells[3]),
            decision: cell_text(&cells[4]),
            round: parse_or_zero(&cell_text(&cells[5])),
            time: cell_text(&cells[6]),
        });
    }
    Ok((info, history))
}

/// The stats page carries three tables; each is recognised by its header
/// columns rather than its position.
pub fn parse_stats_page(html: &str) -> Result<PageStats> {
    let doc = Html::parse_document(html);
    let table_sel = selector("table.tablehead")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td, th")?;
    let link_sel = selector("a[href]")?;

    let mut stats = PageStats::default();
    for table in doc.select(&table_sel) {
        let mut headers: Vec<String> = Vec::new();
        let mut rows: Vec<HashMap<String, String>> = Vec::new();
        let mut opp_urls: Vec<Option<String>> = Vec::new();

        for row in table.select(&row_sel) {
            let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
            if has_class(&row, "colhead") {
                headers = cells.iter().map(|c| normalize_header(&cell_text(c))).collect();
                continue;
            }
            if !is_data_row(&row) || headers.is_empty() {
                continue;
            }
            let mut values = HashMap::new();
            let mut opp_url = None;
            for (header, cell) in headers.iter().zip(cells.iter()) {
                if header == "OPP" || header == "OPPONENT" {
                    opp_url = cell
                        .select(&link_sel)
                        .next()
                        .and_then(|a| a.value().attr("href"))
                        .map(absolute_url);
                }
                values.insert(header.clone(), cell_text(cell));
            }
            rows.push(values);
            opp_urls.push(opp_url);
        }

        if headers.iter().any(|h| h == "SDBL/A") {
            stats.standing.extend(
                rows.iter()
                    .zip(opp_urls)
                    .map(|(values, opp_url)| standing_row(values, opp_url)),
            );
        } else if headers.iter().any(|h| h == "SCBL") {
            stats.clinch.extend(
                rows.iter()
                    .zip(opp_urls)
                    .map(|(values, opp_url)| clinch_row(values, opp_url)),
            );
        } else if headers.iter().any(|h| h == "SGBL") {
            stats.ground.extend(
                rows.iter()
                    .zip(opp_urls)
                    .map(|(values, opp_url)| ground_row(values, opp_url)),
            );
        }
    }
    Ok(stats)
}

/// ISO `YYYY-MM-DD` when the text matches a known page format, otherwise the
/// trimmed input.
pub fn normalize_match_date(raw: &str) -> String {
    let trimmed = raw.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    trimmed.to_string()
}

fn parse_general_info(doc: &Html) -> Result<GeneralInfo> {
    let name_sel = selector("div.player-bio h1")?;
    let info_sel = selector("ul.general-info li")?;
    let meta_sel = selector("ul.player-metadata li")?;

    let mut info = GeneralInfo {
        name: doc
            .select(&name_sel)
            .next()
            .map(|h1| cell_text(&h1))
            .filter(|name| !name.is_empty()),
        ..GeneralInfo::default()
    };

    for li in doc.select(&info_sel) {
        let text = cell_text(&li);
        if text.is_empty() {
            continue;
        }
        if text.contains('"') || text.contains("lbs") {
            let (height, weight) = split_height_weight(&text);
            info.height = height.or(info.height);
            info.weight = weight.or(info.weight);
        } else if has_class(&li, "first") {
            info.weight_class = Some(text);
        } else if has_class(&li, "last") {
            info.group = Some(text);
        }
    }

    for li in doc.select(&meta_sel) {
        let text = cell_text(&li);
        if text.contains("Birth Date") {
            info.age = parse_age(&text);
        } else if let Some((_, reach)) = text.split_once("Reach") {
            let reach = reach.trim();
            if !reach.is_empty() {
                info.reach = Some(reach.to_string());
            }
        }
    }

    Ok(info)
}

fn split_height_weight(text: &str) -> (Option<String>, Option<String>) {
    if let Some((height, weight)) = text.split_once(',') {
        return (
            Some(height.trim().to_string()),
            Some(weight.trim().to_string()),
        );
    }
    if text.contains("lbs") {
        (None, Some(text.to_string()))
    } else {
        (Some(text.to_string()), None)
    }
}

/// `Birth Date5/25/1987 (Age: 33)` → `33`.
fn parse_age(text: &str) -> Option<i64> {
    let (_, tail) = text.rsplit_once(':')?;
    let digits = tail.split(')').next()?.trim();
    digits.parse::<i64>().ok()
}

fn normalize_header(raw: &str) -> String {
    let upper: String = raw
        .trim()
        .to_ascii_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if let Some(rest) = upper.strip_prefix('%') {
        return format!("PERCENT{rest}");
    }
    if let Some(rest) = upper.strip_suffix('%') {
        return format!("{rest}PERCENT");
    }
    upper
}

fn standing_row(values: &HashMap<String, String>, opp_url: Option<String>) -> StandingRow {
    StandingRow {
        date: normalize_match_date(&value(values, "DATE")),
        opponent: value(values, "OPP"),
        opp_url,
        sdbl_a: value(values, "SDBL/A"),
        sdhl_a: value(values, "SDHL/A"),
        sdll_a: value(values, "SDLL/A"),
        tsl: value(values, "TSL"),
        tsa: value(values, "TSA"),
        ssl: value(values, "SSL"),
        ssa: value(values, "SSA"),
        sa: value(values, "SA"),
        kd: value(values, "KD"),
        percent_body: value(values, "PERCENTBODY"),
        percent_head: value(values, "PERCENTHEAD"),
        percent_leg: value(values, "PERCENTLEG"),
    }
}

fn clinch_row(values: &HashMap<String, String>, opp_url: Option<String>) -> ClinchRow {
    ClinchRow {
        date: normalize_match_date(&value(values, "DATE")),
        opponent: value(values, "OPP"),
        opp_url,
        scbl: value(values, "SCBL"),
        scba: value(values, "SCBA"),
        schl: value(values, "SCHL"),
        scha: value(values, "SCHA"),
        scll: value(values, "SCLL"),
        scla: value(values, "SCLA"),
        rv: value(values, "RV"),
        sr: value(values, "SR"),
        tdl: value(values, "TDL"),
        tda: value(values, "TDA"),
        tds: value(values, "TDS"),
        td_percent: value(values, "TDPERCENT"),
    }
}

fn ground_row(values: &HashMap<String, String>, opp_url: Option<String>) -> GroundRow {
    GroundRow {
        date: normalize_match_date(&value(values, "DATE")),
        opponent: value(values, "OPP"),
        opp_url,
        sgbl: value(values, "SGBL"),
        sgba: value(values, "SGBA"),
        sghl: value(values, "SGHL"),
        sgha: value(values, "SGHA"),
        sgll: value(values, "SGLL"),
        sgla: value(values, "SGLA"),
        ad: value(values, "AD"),
        adtb: value(values, "ADTB"),
        adhg: value(values, "ADHG"),
        adtm: value(values, "ADTM"),
        adts: value(values, "ADTS"),
        sm: value(values, "SM"),
    }
}

fn value(values: &HashMap<String, String>, key: &str) -> String {
    values.get(key).cloned().unwrap_or_default()
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow!("invalid selector {css}: {err:?}"))
}

fn cell_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn has_class(el: &ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

fn is_data_row(row: &ElementRef<'_>) -> bool {
    has_class(row, "oddrow") || has_class(row, "evenrow")
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{ESPN_BASE_URL}{href}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_inserts_page_name() {
        assert_eq!(
            page_url("http://www.espn.com/mma/fighter/_/id/2335639/jon-jones", "history")
                .as_deref(),
            Some("http://www.espn.com/mma/fighter/history/_/id/2335639/jon-jones")
        );
        assert_eq!(page_url("http://www.espn.com/mma", "stats"), None);
    }

    #[test]
    fn normalize_match_date_handles_page_formats() {
        assert_eq!(normalize_match_date("Dec 29, 2018"), "2018-12-29");
        assert_eq!(normalize_match_date("July 6, 2019"), "2019-07-06");
        assert_eq!(normalize_match_date(" 3/2/2019 "), "2019-03-02");
        assert_eq!(normalize_match_date("2020-01-01"), "2020-01-01");
        assert_eq!(normalize_match_date(" TBD "), "TBD");
    }

    #[test]
    fn header_percent_markers_are_spelled_out() {
        assert_eq!(normalize_header("%Body"), "PERCENTBODY");
        assert_eq!(normalize_header("TD%"), "TDPERCENT");
        assert_eq!(normalize_header(" sdbl/a "), "SDBL/A");
    }

    #[test]
    fn age_and_height_weight_parsing() {
        assert_eq!(parse_age("Birth Date5/25/1987 (Age: 33)"), Some(33));
        assert_eq!(parse_age("Birth Date unknown"), None);
        assert_eq!(
            split_height_weight("6' 4\", 205 lbs"),
            (Some("6' 4\"".to_string()), Some("205 lbs".to_string()))
        );
        assert_eq!(split_height_weight("205 lbs"), (None, Some("205 lbs".to_string())));
    }
}
