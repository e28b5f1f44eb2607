use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet};

use crate::match_record::{
    CLINCH_FIELDS, FighterSlot, GROUND_FIELDS, MatchRecord, STRIKING_FIELDS, StatLine,
};

pub const BANNER_ROW: u32 = 2;
pub const HEADER_ROW: u32 = 3;
pub const FIRST_DATA_ROW: u32 = 4;

const GENERAL_HEADERS: &[&str] = &[
    "Date",
    "WeightClass",
    "Winner",
    "DecisionType",
    "Rounds",
    "Time",
    "IsTitle?",
];
const IDENTITY_HEADERS: &[&str] = &["Name", "Height", "Reach", "Age"];

pub const COLUMN_COUNT: usize =
    GENERAL_HEADERS.len() + 2 * (IDENTITY_HEADERS.len() + StatLine::LEN);

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportSummary {
    pub rows: usize,
}

/// Per-column header labels: general columns, then `F1…`, then `F2…`.
pub fn header_list() -> Vec<String> {
    let mut headers: Vec<String> = GENERAL_HEADERS.iter().map(|h| h.to_string()).collect();
    for prefix in ["F1", "F2"] {
        headers.extend(IDENTITY_HEADERS.iter().map(|h| format!("{prefix}{h}")));
        headers.extend(StatLine::LABELS.iter().map(|h| format!("{prefix}{h}")));
    }
    headers
}

/// Banner groups as (first column, last column, title).
pub fn banner_groups() -> Vec<(u16, u16, String)> {
    let mut groups = Vec::new();
    let mut col = 0u16;
    let mut push = |len: usize, title: String| {
        let last = col + len as u16 - 1;
        groups.push((col, last, title));
        col = last + 1;
    };
    push(
        GENERAL_HEADERS.len(),
        "General Info (From Fight History Page)".to_string(),
    );
    for prefix in ["F1", "F2"] {
        push(IDENTITY_HEADERS.len(), format!("{prefix} Fighter Info"));
        push(STRIKING_FIELDS, format!("{prefix} Striking Stats"));
        push(CLINCH_FIELDS, format!("{prefix} Clinch Stats"));
        push(GROUND_FIELDS, format!("{prefix} Ground Stats"));
    }
    groups
}

pub fn write_report(path: &Path, records: &[MatchRecord]) -> Result<ReportSummary> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Sheet 1")?;
        write_header(sheet)?;
        for (idx, record) in records.iter().enumerate() {
            write_record(sheet, FIRST_DATA_ROW + idx as u32, record)?;
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create report dir {}", parent.display()))?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ReportSummary {
        rows: records.len(),
    })
}

fn write_header(sheet: &mut Worksheet) -> Result<()> {
    let merge_format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    for (first, last, title) in banner_groups() {
        sheet.merge_range(BANNER_ROW, first, BANNER_ROW, last, &title, &merge_format)?;
    }
    for (col, label) in header_list().iter().enumerate() {
        sheet.write_string(HEADER_ROW, col as u16, label)?;
    }
    Ok(())
}

fn write_record(sheet: &mut Worksheet, row: u32, record: &MatchRecord) -> Result<()> {
    sheet.write_string(row, 0, &record.date)?;
    sheet.write_string(row, 1, &record.weight_class)?;
    sheet.write_string(row, 2, &record.winner)?;
    sheet.write_string(row, 3, &record.decision_type)?;
    sheet.write_number(row, 4, record.rounds as f64)?;
    sheet.write_string(row, 5, &record.time)?;
    sheet.write_string(row, 6, &record.is_title)?;

    let slot_width = (IDENTITY_HEADERS.len() + StatLine::LEN) as u16;
    let first = GENERAL_HEADERS.len() as u16;
    write_slot(sheet, row, first, &record.fighter1)?;
    write_slot(sheet, row, first + slot_width, &record.fighter2)?;
    Ok(())
}

fn write_slot(sheet: &mut Worksheet, row: u32, first_col: u16, slot: &FighterSlot) -> Result<()> {
    sheet.write_string(row, first_col, &slot.name)?;
    sheet.write_string(row, first_col + 1, &slot.height)?;
    sheet.write_string(row, first_col + 2, &slot.reach)?;
    if let Some(age) = slot.age {
        sheet.write_number(row, first_col + 3, age as f64)?;
    }
    let stats_col = first_col + IDENTITY_HEADERS.len() as u16;
    for (offset, value) in slot.stats.values().into_iter().enumerate() {
        sheet.write_number(row, stats_col + offset as u16, value as f64)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_has_85_columns() {
        let headers = header_list();
        assert_eq!(COLUMN_COUNT, 85);
        assert_eq!(headers.len(), COLUMN_COUNT);
        assert_eq!(headers[7], "F1Name");
        assert_eq!(headers[11], "F1SDBL");
        assert_eq!(headers[46], "F2Name");
        assert_eq!(headers[84], "F2SM");
    }

    #[test]
    fn banner_groups_match_column_letters() {
        let groups = banner_groups();
        let spans: Vec<(u16, u16)> = groups.iter().map(|(a, b, _)| (*a, *b)).collect();
        // A3:G3, H3:K3, L3:W3, X3:AH3, AI3:AT3, AU3:AX3, AY3:BJ3, BK3:BU3, BV3:CG3
        assert_eq!(
            spans,
            vec![
                (0, 6),
                (7, 10),
                (11, 22),
                (23, 33),
                (34, 45),
                (46, 49),
                (50, 61),
                (62, 72),
                (73, 84),
            ]
        );
        assert_eq!(groups[2].2, "F1 Striking Stats");
    }

    #[test]
    fn writes_workbook_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let summary = write_report(&path, &[MatchRecord::default(), MatchRecord::default()])
            .expect("report written");
        assert_eq!(summary.rows, 2);
        assert!(path.exists());
    }

    #[test]
    fn unusable_report_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let err = write_report(&blocker.join("report.xlsx"), &[MatchRecord::default()])
            .expect_err("parent is a file");
        assert!(format!("{err:#}").contains("create report dir"), "{err:#}");
    }
}
