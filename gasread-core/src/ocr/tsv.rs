//! Tesseract TSV output parsing.
//!
//! Columns: level, page_num, block_num, par_num, line_num, word_num, left,
//! top, width, height, conf, text. Only level-5 rows are words.

use super::{BoundingBox, LineKey, RawWord};

const WORD_LEVEL: u32 = 5;
const COLUMNS: usize = 12;

/// Parse the word rows of a TSV document; malformed rows are skipped
pub(crate) fn parse_tsv(tsv: &str) -> Vec<RawWord> {
    tsv.lines()
        .filter(|line| !line.starts_with("level"))
        .filter_map(parse_row)
        .collect()
}

fn parse_row(row: &str) -> Option<RawWord> {
    let fields: Vec<&str> = row.splitn(COLUMNS, '\t').collect();
    // An empty text column may be dropped entirely
    if fields.len() < COLUMNS - 1 {
        return None;
    }

    let number = |idx: usize| fields[idx].trim().parse::<u32>().ok();
    if number(0)? != WORD_LEVEL {
        return None;
    }

    Some(RawWord {
        text: fields.get(11).map(|t| t.trim().to_string()).unwrap_or_default(),
        confidence: fields[10].trim().parse::<f32>().ok()?,
        bbox: BoundingBox::new(number(6)?, number(7)?, number(8)?, number(9)?),
        line: LineKey {
            block: number(2)?,
            paragraph: number(3)?,
            line: number(4)?,
        },
    })
}
