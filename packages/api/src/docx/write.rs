use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::read::{attribute, grid_span, MAX_GRID_COLUMNS};
use super::{document_xml, xml_err, DocxError, DOCUMENT_PART};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Usable text width of an A4 page with default margins, in twentieths of a point.
const PAGE_WIDTH_DXA: usize = 9000;

/// Where a top-level table ends and how wide it is.
struct TableLayout {
    /// Byte offset of the table's `</w:tbl>`.
    end_tag: usize,
    /// One entry per grid column, carrying its `w:w` width when present.
    columns: Vec<Option<String>>,
}

/// Append one row to the top-level table `table_index` and return the new
/// package bytes.
///
/// The row gets one cell per grid column: `cells[i]` goes to column `i`, extra
/// values are dropped and missing ones stay blank. A table with fewer than
/// `required_columns` columns is refused.
pub fn append_row(
    docx: &[u8],
    table_index: usize,
    cells: &[&str],
    required_columns: usize,
) -> Result<Vec<u8>, DocxError> {
    let xml = document_xml(docx)?;
    let layout = locate_table(&xml, table_index)?;
    if layout.columns.len() < required_columns {
        return Err(DocxError::TooNarrow {
            columns: layout.columns.len(),
            required: required_columns,
        });
    }

    let mut updated = String::with_capacity(xml.len() + 512);
    updated.push_str(&xml[..layout.end_tag]);
    updated.push_str(&render_row(&layout.columns, cells));
    updated.push_str(&xml[layout.end_tag..]);

    replace_part(docx, DOCUMENT_PART, updated.as_bytes())
}

/// Build a minimal `.docx` whose body is the given tables, each followed by an
/// empty paragraph.
pub fn build(tables: &[Vec<Vec<String>>]) -> Result<Vec<u8>, DocxError> {
    let mut body = String::new();
    for rows in tables {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let column = (PAGE_WIDTH_DXA / width).to_string();
        let columns = vec![Some(column); width];

        body.push_str("<w:tbl><w:tblPr><w:tblW w:w=\"0\" w:type=\"auto\"/><w:tblBorders>");
        for edge in ["top", "left", "bottom", "right", "insideH", "insideV"] {
            body.push_str(&format!(
                "<w:{edge} w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>"
            ));
        }
        body.push_str("</w:tblBorders></w:tblPr><w:tblGrid>");
        for w in columns.iter().flatten() {
            body.push_str(&format!("<w:gridCol w:w=\"{w}\"/>"));
        }
        body.push_str("</w:tblGrid>");
        for row in rows {
            let cells: Vec<&str> = row.iter().map(String::as_str).collect();
            body.push_str(&render_row(&columns, &cells));
        }
        body.push_str("</w:tbl><w:p/>");
    }

    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    );

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", PACKAGE_RELS),
        (DOCUMENT_PART, document.as_str()),
    ] {
        zip.start_file(name, opts)?;
        zip.write_all(content.as_bytes())?;
    }
    Ok(zip.finish()?.into_inner())
}

fn locate_table(xml: &str, table_index: usize) -> Result<TableLayout, DocxError> {
    let mut reader = Reader::from_str(xml);

    let mut depth = 0usize;
    let mut seen = 0usize;
    let mut grid: Vec<Option<String>> = Vec::new();
    let mut row_width = 0usize;
    let mut last_row_width = 0usize;

    loop {
        let event = reader.read_event().map_err(xml_err)?;
        let in_target = depth == 1 && seen == table_index + 1;
        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:tbl" => {
                    depth += 1;
                    if depth == 1 {
                        seen += 1;
                    }
                }
                b"w:tr" if in_target => row_width = 0,
                b"w:tc" if in_target => row_width = widen(row_width, 1)?,
                _ => {}
            },
            Event::Empty(e) if in_target => match e.name().as_ref() {
                b"w:gridCol" => grid.push(attribute(&e, b"w:w")),
                // a spanning cell already counted once
                b"w:gridSpan" => row_width = widen(row_width, grid_span(&e)? - 1)?,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:tbl" => {
                    if in_target {
                        // the reader stands just past `</w:tbl>`
                        let after = reader.buffer_position() as usize;
                        let end_tag = xml[..after].rfind("</").ok_or_else(|| {
                            DocxError::Xml("end of table not found".to_string())
                        })?;
                        let columns = if grid.is_empty() {
                            vec![None; last_row_width]
                        } else {
                            grid
                        };
                        return Ok(TableLayout {
                            end_tag,
                            columns,
                        });
                    }
                    depth = depth.saturating_sub(1);
                }
                b"w:tr" if in_target => last_row_width = row_width,
                _ => {}
            },
            Event::Eof => {
                return Err(DocxError::NoTable {
                    index: table_index,
                    found: seen,
                })
            }
            _ => {}
        }
    }
}

/// Grow a row's column count, refusing rows wider than Word allows.
fn widen(width: usize, by: usize) -> Result<usize, DocxError> {
    width
        .checked_add(by)
        .filter(|w| *w <= MAX_GRID_COLUMNS)
        .ok_or_else(|| DocxError::Xml(format!("row wider than {MAX_GRID_COLUMNS} columns")))
}

fn render_row(columns: &[Option<String>], cells: &[&str]) -> String {
    let mut xml = String::from("<w:tr>");
    for (i, width) in columns.iter().enumerate() {
        xml.push_str("<w:tc>");
        if let Some(w) = width {
            xml.push_str(&format!(
                r#"<w:tcPr><w:tcW w:w="{}" w:type="dxa"/></w:tcPr>"#,
                escape(w.as_str())
            ));
        }
        match cells.get(i).copied().unwrap_or("") {
            "" => xml.push_str("<w:p/>"),
            text => {
                for line in text.split('\n') {
                    xml.push_str(&format!(
                        r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                        escape(line)
                    ));
                }
            }
        }
        xml.push_str("</w:tc>");
    }
    xml.push_str("</w:tr>");
    xml
}

/// Rewrite the package with `part` replaced by `content`; every other entry is
/// copied in its original order.
fn replace_part(docx: &[u8], part: &str, content: &[u8]) -> Result<Vec<u8>, DocxError> {
    let mut archive = ZipArchive::new(Cursor::new(docx))?;
    let mut out = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if entry.is_dir() {
            out.add_directory(name, opts)?;
            continue;
        }
        out.start_file(name.as_str(), opts)?;
        if name == part {
            out.write_all(content)?;
        } else {
            std::io::copy(&mut entry, &mut out)?;
        }
    }

    Ok(out.finish()?.into_inner())
}
