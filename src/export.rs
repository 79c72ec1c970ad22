//! Result sinks: CSV file, styled Excel workbook and the console summary.

use anyhow::Context;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_xlsxwriter::{
    Color, DocProperties, Format, FormatAlign, FormatBorder, FormatUnderline, Url as Hyperlink,
    Workbook, Worksheet, XlsxError,
};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::models::{Lead, RunReport, SearchQuery};
use crate::scoring::{ScoreTier, MAX_SCORE};

pub const CSV_HEADER: &str = "Business Name,Owner Name,Phone,Email,Website,LinkedIn,Registered,Score";

static SLUG_SEPARATORS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-z0-9]+").expect("Failed to compile slug pattern - this is a bug")
});

/// `plumbers` + `Chester` -> `plumbers_chester`.
pub fn file_slug(query: &SearchQuery) -> String {
    let raw = format!("{}_{}", query.business_type, query.location).to_lowercase();
    SLUG_SEPARATORS.replace_all(&raw, "_").into_owned()
}

pub fn csv_file_name(query: &SearchQuery, date: NaiveDate) -> String {
    format!("leads_{}_{}.csv", file_slug(query), date.format("%Y-%m-%d"))
}

/// Quotes every cell and doubles embedded quotes.
fn csv_cell(value: Option<&str>) -> String {
    format!("\"{}\"", value.unwrap_or_default().replace('"', "\"\""))
}

fn csv_row(lead: &Lead) -> String {
    let score = lead.score().to_string();
    [
        Some(lead.name()),
        lead.owner_name(),
        lead.phone(),
        lead.email(),
        lead.website(),
        lead.linkedin_url(),
        lead.registration_date(),
        Some(score.as_str()),
    ]
    .into_iter()
    .map(csv_cell)
    .collect::<Vec<_>>()
    .join(",")
}

/// Header plus one row per lead, in discovery order.
pub fn render_csv(leads: &[Lead]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    out.push_str(&leads.iter().map(csv_row).collect::<Vec<_>>().join("\n"));
    out
}

/// Writes the report's leads to `dir/leads_{slug}_{date}.csv`, creating `dir` if needed.
pub fn write_csv(report: &RunReport, dir: &Path, date: NaiveDate) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let path = dir.join(csv_file_name(&report.query, date));
    std::fs::write(&path, render_csv(&report.leads))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!("📄 Saved {} lead(s) to {}", report.leads.len(), path.display());
    Ok(path)
}

// ============ Workbook ============

const FONT: &str = "Calibri";
const LEADS_COLUMNS: [(&str, f64); 10] = [
    ("#", 5.0),
    ("Business Name", 30.0),
    ("Owner Name", 22.0),
    ("Phone", 17.0),
    ("Email", 32.0),
    ("Website", 28.0),
    ("LinkedIn", 16.0),
    ("Reg. Date", 13.0),
    ("Status", 8.0),
    ("Score", 14.0),
];
const LAST_COL: u16 = 9;
const HEADER_ROW: u32 = 7;
const FIRST_DATA_ROW: u32 = 8;

const ACCENT: u32 = 0x16A34A;
const ACCENT_DARK: u32 = 0x134E22;
const ACCENT_LIGHT: u32 = 0x4ADE80;
const HEADER_BG: u32 = 0x134E22;
const HEADER_BG_DARK: u32 = 0x0F3D1A;
const ROW_EVEN: u32 = 0xF7FBF7;
const ROW_ODD: u32 = 0xECF5EC;
const TEXT: u32 = 0x111827;
const TEXT_MID: u32 = 0x374151;
const TEXT_MUTED: u32 = 0x6B7280;
const BORDER_INNER: u32 = 0xD1FAE5;

pub fn xlsx_file_name(query: &SearchQuery, date: NaiveDate) -> String {
    format!("LeadSeeds_{}_{}.xlsx", file_slug(query), date.format("%Y-%m-%d"))
}

/// Background and text colour of a tier's status and score cells.
pub fn tier_colors(tier: ScoreTier) -> (u32, u32) {
    match tier {
        ScoreTier::Hot => (0xECFDF5, 0x065F46),
        ScoreTier::Warm => (0xFEFCE8, 0x92400E),
        ScoreTier::Cold => (0xFFF1F2, 0x9F1239),
    }
}

/// Five-dot bar, one filled dot per two points rounded up: `7` -> `●●●●○`.
pub fn score_dots(score: u8) -> String {
    let filled = usize::from(score.min(MAX_SCORE).div_ceil(2));
    format!("{}{}", "●".repeat(filled), "○".repeat(5 - filled))
}

fn display_host(website: &str) -> String {
    url::Url::parse(website)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| website.to_string())
}

fn banner_format(size: u8, font: u32, background: u32) -> Format {
    Format::new()
        .set_font_name(FONT)
        .set_font_size(size)
        .set_font_color(Color::RGB(font))
        .set_background_color(Color::RGB(background))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
}

fn body_format(size: u8, font: u32, background: u32) -> Format {
    Format::new()
        .set_font_name(FONT)
        .set_font_size(size)
        .set_font_color(Color::RGB(font))
        .set_background_color(Color::RGB(background))
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Hair)
        .set_border_color(Color::RGB(BORDER_INNER))
}

fn leads_sheet(report: &RunReport, date: NaiveDate) -> Result<Worksheet, XlsxError> {
    let leads = &report.leads;
    let query = &report.query;
    let summary = RunSummary::from_report(report);
    let with_phone = leads.iter().filter(|l| l.phone().is_some()).count();

    let mut sheet = Worksheet::new();
    sheet.set_name("Leads")?;
    sheet.set_tab_color(Color::RGB(ACCENT));
    for (col, (_, width)) in (0u16..).zip(LEADS_COLUMNS) {
        sheet.set_column_width(col, width)?;
    }

    // Banner, title and stats bar
    sheet.set_row_height(0, 48)?;
    sheet.merge_range(
        0,
        0,
        0,
        LAST_COL,
        "LEADSEEDS",
        &banner_format(26, 0xFFFFFF, ACCENT_DARK).set_bold(),
    )?;
    sheet.set_row_height(1, 22)?;
    sheet.merge_range(
        1,
        0,
        1,
        LAST_COL,
        &format!(
            "Verified Lead Report  |  {}  |  {}",
            query.business_type.to_uppercase(),
            query.location.to_uppercase()
        ),
        &banner_format(11, ACCENT_LIGHT, HEADER_BG).set_italic(),
    )?;

    sheet.set_row_height(2, 28)?;
    let stats_format = banner_format(10, ACCENT_LIGHT, HEADER_BG_DARK).set_bold();
    let stats = [
        (0, 1, format!("{} Leads", summary.lead_count)),
        (
            2,
            4,
            format!(
                "{} Hot  |  Avg Score {:.1}/{}",
                summary.hot_count, summary.average_score, MAX_SCORE
            ),
        ),
        (
            5,
            7,
            format!(
                "{} Phone  |  {} Email  |  {} Owner  |  {} LinkedIn",
                with_phone, summary.with_email, summary.with_owner, summary.with_linkedin
            ),
        ),
        (8, LAST_COL, format!("Generated {}", date.format("%d %b %Y"))),
    ];
    for (first, last, text) in stats {
        sheet.merge_range(2, first, 2, last, &text, &stats_format)?;
    }

    // Divider then padding rows down to the header
    sheet.set_row_height(3, 3)?;
    sheet.merge_range(3, 0, 3, LAST_COL, "", &Format::new().set_background_color(Color::RGB(ACCENT)))?;
    for row in 4..HEADER_ROW {
        sheet.set_row_height(row, 6)?;
        sheet.merge_range(row, 0, row, LAST_COL, "", &Format::new().set_background_color(Color::RGB(ROW_EVEN)))?;
    }

    sheet.set_row_height(HEADER_ROW, 30)?;
    let header = Format::new()
        .set_font_name(FONT)
        .set_font_size(10)
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(ACCENT_DARK))
        .set_align(FormatAlign::VerticalCenter)
        .set_border_bottom(FormatBorder::Medium)
        .set_border_bottom_color(Color::RGB(ACCENT));
    for (col, (title, _)) in (0u16..).zip(LEADS_COLUMNS) {
        let format = if col == 0 || col >= 8 {
            header.clone().set_align(FormatAlign::Center)
        } else {
            header.clone().set_indent(1)
        };
        sheet.write_string_with_format(HEADER_ROW, col, title, &format)?;
    }

    for (i, lead) in leads.iter().enumerate() {
        let row = FIRST_DATA_ROW + i as u32;
        let background = if i % 2 == 0 { ROW_EVEN } else { ROW_ODD };
        let (tier_bg, tier_text) = tier_colors(lead.tier());
        let plain = body_format(10, TEXT_MID, background).set_indent(1);
        let centered = body_format(10, TEXT_MUTED, background).set_align(FormatAlign::Center);
        let link = body_format(10, ACCENT, background).set_underline(FormatUnderline::Single);

        sheet.set_row_height(row, 24)?;
        sheet.write_number_with_format(
            row,
            0,
            (i + 1) as f64,
            &body_format(9, TEXT_MUTED, background).set_bold().set_align(FormatAlign::Center),
        )?;
        sheet.write_string_with_format(
            row,
            1,
            lead.name(),
            &body_format(11, TEXT, background).set_bold().set_indent(1),
        )?;
        sheet.write_string_with_format(row, 2, lead.owner_name().unwrap_or_default(), &plain)?;
        sheet.write_string_with_format(row, 3, lead.phone().unwrap_or_default(), &plain)?;
        sheet.write_string_with_format(row, 4, lead.email().unwrap_or_default(), &plain)?;

        match lead.website() {
            Some(website) => {
                let target = Hyperlink::new(website).set_text(display_host(website));
                sheet.write_url_with_format(row, 5, target, &link.clone().set_indent(1))?;
            }
            None => {
                sheet.write_blank(row, 5, &plain)?;
            }
        }
        match lead.linkedin_url() {
            Some(profile) => {
                let target = Hyperlink::new(profile).set_text("View Profile");
                sheet.write_url_with_format(row, 6, target, &link.set_align(FormatAlign::Center))?;
            }
            None => {
                sheet.write_blank(row, 6, &centered)?;
            }
        }
        sheet.write_string_with_format(
            row,
            7,
            lead.registration_date().unwrap_or_default(),
            &centered,
        )?;

        let tier_format = body_format(10, tier_text, tier_bg)
            .set_bold()
            .set_align(FormatAlign::Center);
        sheet.write_string_with_format(row, 8, lead.tier().label(), &tier_format)?;
        sheet.write_string_with_format(
            row,
            9,
            format!("{}  {}/{}", score_dots(lead.score()), lead.score(), MAX_SCORE),
            &tier_format.set_font_size(9),
        )?;
    }

    let last_row = HEADER_ROW + leads.len() as u32;
    sheet.set_freeze_panes(FIRST_DATA_ROW, 0)?;
    sheet.autofilter(HEADER_ROW, 0, last_row, LAST_COL)?;

    let footer_row = last_row + 2;
    sheet.set_row_height(footer_row, 20)?;
    sheet.merge_range(
        footer_row,
        1,
        footer_row,
        LAST_COL,
        "LeadSeeds: we find your first customers so you can focus on your business",
        &Format::new()
            .set_font_name(FONT)
            .set_font_size(9)
            .set_italic()
            .set_font_color(Color::RGB(TEXT_MUTED))
            .set_background_color(Color::RGB(ROW_EVEN))
            .set_align(FormatAlign::VerticalCenter),
    )?;

    Ok(sheet)
}

fn summary_sheet(report: &RunReport, date: NaiveDate) -> Result<Worksheet, XlsxError> {
    let summary = RunSummary::from_report(report);
    let n = summary.lead_count;
    let with_phone = report.leads.iter().filter(|l| l.phone().is_some()).count();

    let mut sheet = Worksheet::new();
    sheet.set_name("Summary")?;
    sheet.set_tab_color(Color::RGB(ACCENT_DARK));
    sheet.set_column_width(0, 28)?;
    sheet.set_column_width(1, 20)?;

    sheet.set_row_height(0, 36)?;
    sheet.merge_range(
        0,
        0,
        0,
        1,
        "LEADSEEDS SUMMARY",
        &banner_format(14, 0xFFFFFF, ACCENT_DARK).set_bold(),
    )?;

    // An empty value marks a section heading
    let rows: Vec<(&str, String)> = vec![
        ("Report", String::new()),
        ("Business Type", report.query.business_type.clone()),
        ("Location", report.query.location.clone()),
        ("Generated", date.format("%d %B %Y").to_string()),
        ("Lead Stats", String::new()),
        ("Total Leads", n.to_string()),
        ("Hot Leads (8-10)", summary.hot_count.to_string()),
        ("Warm Leads (5-7)", summary.warm_count.to_string()),
        ("Average Score", format!("{:.1}/{}", summary.average_score, MAX_SCORE)),
        ("Data Coverage", String::new()),
        ("With Phone", format!("{} / {}", with_phone, n)),
        ("With Email", format!("{} / {}", summary.with_email, n)),
        ("With Owner Name", format!("{} / {}", summary.with_owner, n)),
        ("With LinkedIn", format!("{} / {}", summary.with_linkedin, n)),
    ];

    for (i, (label, value)) in rows.iter().enumerate() {
        let row = 1 + i as u32;
        sheet.set_row_height(row, 22)?;
        let (label_format, value_format) = if value.is_empty() {
            let heading = Format::new()
                .set_font_name(FONT)
                .set_font_size(10)
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(HEADER_BG));
            (heading.clone(), heading)
        } else {
            let background = if i % 2 == 0 { ROW_EVEN } else { ROW_ODD };
            (
                body_format(10, TEXT_MID, background),
                body_format(10, TEXT, background).set_bold(),
            )
        };
        sheet.write_string_with_format(row, 0, *label, &label_format)?;
        sheet.write_string_with_format(row, 1, value.as_str(), &value_format)?;
    }

    Ok(sheet)
}

/// Writes the report to `dir/LeadSeeds_{slug}_{date}.xlsx`: a styled Leads sheet with
/// tier-shaded status and score cells, plus a Summary sheet.
pub fn write_xlsx(report: &RunReport, dir: &Path, date: NaiveDate) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut workbook = Workbook::new();
    workbook.set_properties(&DocProperties::new().set_author("LeadSeeds"));
    workbook.push_worksheet(leads_sheet(report, date).context("Failed to build Leads sheet")?);
    workbook.push_worksheet(summary_sheet(report, date).context("Failed to build Summary sheet")?);

    let path = dir.join(xlsx_file_name(&report.query, date));
    workbook
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!("📊 Saved {} lead(s) to {}", report.leads.len(), path.display());
    Ok(path)
}

// ============ Summary ============

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub lead_count: usize,
    pub hot_count: usize,
    pub warm_count: usize,
    pub average_score: f64,
    pub with_owner: usize,
    pub with_linkedin: usize,
    pub with_email: usize,
}

impl RunSummary {
    pub fn from_report(report: &RunReport) -> Self {
        let count = |has: fn(&Lead) -> bool| report.leads.iter().filter(|l| has(l)).count();
        Self {
            lead_count: report.leads.len(),
            hot_count: report.hot_count(),
            warm_count: report.warm_count(),
            average_score: report.average_score(),
            with_owner: count(|l| l.owner_name().is_some()),
            with_linkedin: count(|l| l.linkedin_url().is_some()),
            with_email: count(|l| l.email().is_some()),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.lead_count;
        writeln!(f, "  Average lead score: {:.1}/{}", self.average_score, MAX_SCORE)?;
        writeln!(f, "  Hot / warm leads:      {}/{}", self.hot_count, self.warm_count)?;
        writeln!(f, "  Leads with owner name: {}/{}", self.with_owner, n)?;
        writeln!(f, "  Leads with LinkedIn:   {}/{}", self.with_linkedin, n)?;
        write!(f, "  Leads with email:      {}/{}", self.with_email, n)
    }
}

const TABLE_WIDTHS: [usize; 5] = [24, 18, 14, 28, 6];

fn table_row(cells: [&str; 5]) -> String {
    cells
        .iter()
        .zip(TABLE_WIDTHS)
        .map(|(cell, width)| {
            let clipped: String = cell.chars().take(width).collect();
            format!("{:<width$}", clipped, width = width)
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Fixed-width console table of the admitted leads.
pub fn render_table(leads: &[Lead]) -> String {
    let mut lines = vec![
        table_row(["Business", "Owner", "Phone", "Email", "Score"]),
        "─".repeat(96),
    ];
    for lead in leads {
        let score = format!("{}/{}", lead.score(), MAX_SCORE);
        lines.push(table_row([
            lead.name(),
            lead.owner_name().unwrap_or("—"),
            lead.phone().unwrap_or("—"),
            lead.email().unwrap_or("—"),
            &score,
        ]));
    }
    lines.join("\n")
}
