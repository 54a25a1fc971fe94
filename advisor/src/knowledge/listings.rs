//! Internship listing document parsing.
//!
//! The source is the SimplifyJobs README: a markdown pipe table where each
//! row is one internship posting. Rows use a few in-band conventions:
//!
//! - `↳` in the company cell means "same company as the nearest prior row
//!   with a real name"
//! - `🔒` in the status cell marks a closed posting
//! - `🛂` in the title marks restricted work authorization
//! - `</br>` separates multiple locations inside one cell
//!
//! The table body is located tolerantly (any dash separator row with enough
//! columns; the `TABLE_END` marker comment or the first non-table line ends
//! it) and each row is validated against the expected cell schema. A document
//! with no recognizable table at all is a [`KnowledgeError::Format`]; a
//! malformed row is skipped without aborting the parse.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::knowledge::KnowledgeError;

const ARROW_GLYPH: &str = "↳";
const CLOSED_GLYPH: &str = "🔒";
const RESTRICTED_GLYPH: &str = "🛂";
const LOCATION_BREAK: &str = "</br>";
const TABLE_END_NEEDLE: &str = "TABLE_END";

/// Cells a row must provide, in order.
const COMPANY: usize = 0;
const TITLE: usize = 1;
const LOCATION: usize = 2;
const STATUS: usize = 3;
const POSTED: usize = 4;
const ROW_CELLS: usize = 5;

/// One open internship posting parsed from a table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub company: String,
    pub title: String,
    pub location: String,
    pub posted: String,
}

impl ListingRow {
    /// The sentence form fed to the embedder and stored as record text.
    pub fn to_sentence(&self) -> String {
        format!(
            "{} offered an internship titled '{}' in {} on {}",
            self.company, self.title, self.location, self.posted
        )
    }
}

/// `**[NAME](URL)**` company cells carry the name inside the link.
fn link_wrapper() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\*\*\[(.*?)\]\(.*?\)\*\*$").expect("valid literal pattern"))
}

/// A header separator row: pipe-delimited cells of 3+ dashes (alignment
/// colons allowed), at least as many as the listing schema needs.
fn is_separator_row(line: &str) -> bool {
    let cells = split_cells(line);
    if cells.len() < ROW_CELLS {
        return false;
    }
    cells.iter().all(|cell| {
        cell.len() >= 3
            && cell.chars().all(|c| c == '-' || c == ':')
            && cell.chars().filter(|c| *c == '-').count() >= 3
    })
}

/// Split a table line into trimmed cells, tolerating optional leading and
/// trailing pipes.
fn split_cells(line: &str) -> Vec<String> {
    let inner = line.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|c| c.trim().to_string()).collect()
}

/// Parse the listing document into one normalized sentence per open row.
///
/// Row order mirrors document order. Parsing the same text twice yields the
/// same sentence list.
pub fn parse_listing_document(markdown: &str) -> Result<Vec<String>, KnowledgeError> {
    Ok(parse_listing_rows(markdown)?
        .iter()
        .map(ListingRow::to_sentence)
        .collect())
}

/// Parse the listing document into structured rows.
pub fn parse_listing_rows(markdown: &str) -> Result<Vec<ListingRow>, KnowledgeError> {
    let lines: Vec<&str> = markdown.lines().collect();

    let separator = lines
        .iter()
        .position(|line| is_separator_row(line))
        .ok_or_else(|| {
            KnowledgeError::Format("no table header separator row found".to_string())
        })?;

    let body = &lines[separator + 1..];
    let terminator = body
        .iter()
        .position(|line| line.contains(TABLE_END_NEEDLE));

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    // Raw company cell of the nearest prior row carrying a real name. Arrow
    // resolution reads raw cells, so closed or otherwise-skipped rows still
    // anchor the rows beneath them.
    let mut last_company: Option<String> = None;

    for (i, line) in body.iter().enumerate() {
        if terminator == Some(i) {
            break;
        }
        // Without a terminator, the table ends at the first non-table line.
        if terminator.is_none() && !line.contains('|') {
            break;
        }

        let cells = split_cells(line);
        if cells.len() < ROW_CELLS {
            skipped += 1;
            continue;
        }

        let raw_company = cells[COMPANY].as_str();
        if !raw_company.is_empty() && raw_company != ARROW_GLYPH {
            last_company = Some(raw_company.to_string());
        }

        if cells[COMPANY].is_empty()
            || cells[TITLE].is_empty()
            || cells[LOCATION].is_empty()
            || cells[STATUS] == CLOSED_GLYPH
            || cells[POSTED].is_empty()
        {
            skipped += 1;
            continue;
        }

        let company = if raw_company == ARROW_GLYPH {
            match &last_company {
                Some(name) => name.clone(),
                None => {
                    skipped += 1;
                    continue;
                }
            }
        } else {
            raw_company.to_string()
        };
        let company = match link_wrapper().captures(&company) {
            Some(captures) => captures[1].to_string(),
            None => company,
        };

        rows.push(ListingRow {
            company,
            title: cells[TITLE].replace(RESTRICTED_GLYPH, "").trim().to_string(),
            location: cells[LOCATION].replace(LOCATION_BREAK, " and "),
            posted: cells[POSTED].clone(),
        });
    }

    if skipped > 0 {
        tracing::debug!(skipped, kept = rows.len(), "listing rows filtered");
    }

    Ok(rows)
}

/// Fetch the raw listing document. Non-2xx statuses are transport failures.
pub async fn fetch_listing_document(
    http: &reqwest::Client,
    url: &str,
) -> Result<String, KnowledgeError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| KnowledgeError::from_reqwest("listing fetch", e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(KnowledgeError::Transport {
            service: "listing fetch",
            detail: format!("status {status}"),
        });
    }

    response
        .text()
        .await
        .map_err(|e| KnowledgeError::from_reqwest("listing fetch", e))
}

/// HTTP client for listing fetches with the configured deadline applied.
pub fn listing_http_client(timeout: Duration) -> Result<reqwest::Client, KnowledgeError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| KnowledgeError::Transport {
            service: "listing fetch",
            detail: format!("client build: {e}"),
        })
}
