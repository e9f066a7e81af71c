use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{document_xml, xml_err, DocxError, Table, TableDocument};

/// Read every top-level table of a `.docx` package.
pub fn read_tables(docx: &[u8]) -> Result<TableDocument, DocxError> {
    let xml = document_xml(docx)?;
    parse_tables(&xml)
}

/// Word's limit on the grid columns of one table.
pub(super) const MAX_GRID_COLUMNS: usize = 63;

/// Text collected for one `w:tc`.
#[derive(Default)]
struct CellText {
    paragraphs: Vec<String>,
    current: Option<String>,
    span: usize,
    /// `w:vMerge` without `restart`: the cell continues the one above.
    continues: bool,
}

impl CellText {
    fn push(&mut self, ch: char) {
        if let Some(p) = self.current.as_mut() {
            p.push(ch);
        }
    }

    fn push_str(&mut self, s: &str) {
        if let Some(p) = self.current.as_mut() {
            p.push_str(s);
        }
    }

    fn finish(self) -> (String, usize, bool) {
        (self.paragraphs.join("\n"), self.span.max(1), self.continues)
    }
}

/// Columns covered by a cell, from its `w:gridSpan`.
pub(super) fn grid_span(e: &BytesStart<'_>) -> Result<usize, DocxError> {
    let Some(value) = attribute(e, b"w:val") else {
        return Ok(1);
    };
    match value.trim().parse::<usize>() {
        Ok(span) if span <= MAX_GRID_COLUMNS => Ok(span.max(1)),
        _ => Err(DocxError::Xml(format!(
            "gridSpan {value:?} is not a column count of at most {MAX_GRID_COLUMNS}"
        ))),
    }
}

fn continues_merge(e: &BytesStart<'_>) -> bool {
    attribute(e, b"w:val").as_deref() != Some("restart")
}

pub(super) fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| String::from_utf8(a.value.into_owned()).ok())
}

fn parse_tables(xml: &str) -> Result<TableDocument, DocxError> {
    let mut reader = Reader::from_str(xml);

    let mut tables = Vec::new();
    // Table nesting depth; only depth 1 is collected.
    let mut depth = 0usize;
    let mut rows: Vec<Vec<String>> = Vec::new();
    // Previous row of the current table, for vertically merged cells.
    let mut above: Vec<String> = Vec::new();
    let mut row: Option<Vec<String>> = None;
    let mut cell: Option<CellText> = None;
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:tbl" => {
                    depth += 1;
                    if depth == 1 {
                        rows = Vec::new();
                        above = Vec::new();
                    }
                }
                b"w:tr" if depth == 1 => row = Some(Vec::new()),
                b"w:tc" if depth == 1 => cell = Some(CellText::default()),
                b"w:p" if depth == 1 => {
                    if let Some(c) = cell.as_mut() {
                        c.current = Some(String::new());
                    }
                }
                b"w:r" if depth == 1 => in_run = true,
                b"w:t" if depth == 1 => {
                    in_text = in_run && cell.as_ref().is_some_and(|c| c.current.is_some());
                }
                _ => {}
            },
            Event::Empty(e) if depth == 1 => {
                if let Some(c) = cell.as_mut() {
                    match e.name().as_ref() {
                        b"w:p" => c.paragraphs.push(String::new()),
                        // tab stops in `w:pPr` are not text
                        b"w:tab" if in_run => c.push('\t'),
                        b"w:br" | b"w:cr" if in_run => c.push('\n'),
                        b"w:gridSpan" => c.span = grid_span(&e)?,
                        b"w:vMerge" => c.continues = continues_merge(&e),
                        _ => {}
                    }
                }
            }
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(xml_err)?;
                if let Some(c) = cell.as_mut() {
                    c.push_str(&text);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:tbl" => {
                    if depth == 1 {
                        tables.push(Table {
                            rows: std::mem::take(&mut rows),
                        });
                    }
                    depth = depth.saturating_sub(1);
                }
                b"w:tr" if depth == 1 => {
                    if let Some(r) = row.take() {
                        above = r.clone();
                        rows.push(r);
                    }
                }
                b"w:tc" if depth == 1 => {
                    if let (Some(c), Some(r)) = (cell.take(), row.as_mut()) {
                        let (text, span, continues) = c.finish();
                        let text = match above.get(r.len()) {
                            Some(merged) if continues => merged.clone(),
                            _ => text,
                        };
                        r.extend(std::iter::repeat(text).take(span));
                    }
                }
                b"w:p" if depth == 1 => {
                    if let Some(c) = cell.as_mut() {
                        if let Some(p) = c.current.take() {
                            c.paragraphs.push(p);
                        }
                    }
                }
                b"w:r" if depth == 1 => in_run = false,
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(TableDocument { tables })
}
