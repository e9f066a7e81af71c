//! # `.docx` tables as a row store
//!
//! The student lists are Word documents whose tables are used as plain
//! row/column storage. This module reads those tables out of the
//! WordprocessingML package and appends rows back into it, without touching
//! anything else in the file.
//!
//! A `.docx` is a zip container; everything here lives in its
//! `word/document.xml` part.
//!
//! | Function | Purpose |
//! |----------|---------|
//! | [`read_tables`] | Every top-level table as rows of cell text, in document order. |
//! | [`append_row`] | New last row for one top-level table; every other zip entry is copied verbatim. |
//! | [`build`] | A minimal, valid `.docx` holding the given tables. |
//!
//! ## Cell text
//!
//! A cell reads as its paragraphs joined with `\n`; inside a run, `w:tab` reads
//! as `\t` and `w:br`/`w:cr` as `\n`. A cell spanning several grid columns
//! (`w:gridSpan`, at most 63) is repeated once per column so that column
//! positions line up across rows. A vertically merged continuation cell
//! (`w:vMerge` without `restart`) reads as the cell above it. Tables nested
//! inside a cell belong to neither the outer cell's text nor the list of
//! tables.

mod read;
mod write;

pub use read::read_tables;
pub use write::{append_row, build};

use std::io::{Cursor, Read};

use zip::result::ZipError;
use zip::ZipArchive;

/// The main document part inside the package.
pub const DOCUMENT_PART: &str = "word/document.xml";

/// All top-level tables of a document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableDocument {
    pub tables: Vec<Table>,
}

/// One table: rows of cell text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum DocxError {
    #[error("not a readable .docx package: {0}")]
    Zip(#[from] ZipError),

    #[error("package has no {0} part")]
    MissingPart(&'static str),

    #[error("malformed document XML: {0}")]
    Xml(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document has no table at index {index} ({found} found)")]
    NoTable { index: usize, found: usize },

    #[error("table has {columns} column(s), at least {required} needed")]
    TooNarrow { columns: usize, required: usize },
}

fn xml_err(e: impl std::fmt::Display) -> DocxError {
    DocxError::Xml(e.to_string())
}

/// Extract `word/document.xml` as text.
fn document_xml(docx: &[u8]) -> Result<String, DocxError> {
    let mut archive = ZipArchive::new(Cursor::new(docx))?;
    let mut part = match archive.by_name(DOCUMENT_PART) {
        Ok(part) => part,
        Err(ZipError::FileNotFound) => return Err(DocxError::MissingPart(DOCUMENT_PART)),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// Package a hand-written `<w:body>` into a `.docx`.
    pub(crate) fn docx_from_body(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file("[Content_Types].xml", opts).unwrap();
        zip.write_all(b"<Types/>").unwrap();
        zip.start_file("word/styles.xml", opts).unwrap();
        zip.write_all(b"<w:styles/>").unwrap();
        zip.start_file(DOCUMENT_PART, opts).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    fn rows(doc: &TableDocument, table: usize) -> Vec<Vec<&str>> {
        doc.tables[table]
            .rows
            .iter()
            .map(|r| r.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_reads_tables_in_document_order() {
        let docx = docx_from_body(
            "<w:p><w:r><w:t>Lista</w:t></w:r></w:p>\
             <w:tbl><w:tr><w:tc><w:p><w:r><w:t>1</w:t></w:r></w:p></w:tc>\
             <w:tc><w:p><w:r><w:t xml:space=\"preserve\"> Ana </w:t></w:r></w:p></w:tc></w:tr></w:tbl>\
             <w:p/>\
             <w:tbl><w:tr><w:tc><w:p><w:r><w:t>2</w:t></w:r></w:p></w:tc>\
             <w:tc><w:p><w:r><w:t>Bruno</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
        );

        let doc = read_tables(&docx).unwrap();
        assert_eq!(doc.tables.len(), 2);
        assert_eq!(rows(&doc, 0), vec![vec!["1", " Ana "]]);
        assert_eq!(rows(&doc, 1), vec![vec!["2", "Bruno"]]);
    }

    #[test]
    fn test_cell_text_joins_runs_paragraphs_and_entities() {
        let docx = docx_from_body(
            "<w:tbl><w:tr><w:tc>\
               <w:p><w:r><w:t>MARIA </w:t></w:r><w:r><w:t>DA SILVA</w:t></w:r></w:p>\
               <w:p><w:r><w:t>Pais &amp; Filhos</w:t><w:tab/><w:t>x</w:t></w:r></w:p>\
               <w:p/>\
             </w:tc></w:tr></w:tbl>",
        );

        let doc = read_tables(&docx).unwrap();
        assert_eq!(doc.tables[0].rows[0][0], "MARIA DA SILVA\nPais & Filhos\tx\n");
    }

    #[test]
    fn test_grid_span_repeats_cell_and_nested_tables_are_skipped() {
        let docx = docx_from_body(
            "<w:tbl>\
               <w:tr><w:tc><w:tcPr><w:gridSpan w:val=\"2\"/></w:tcPr><w:p><w:r><w:t>Turma A</w:t></w:r></w:p></w:tc>\
                     <w:tc><w:p><w:r><w:t>obs</w:t></w:r></w:p></w:tc></w:tr>\
               <w:tr><w:tc><w:p><w:r><w:t>3</w:t></w:r></w:p></w:tc>\
                     <w:tc><w:p><w:r><w:t>Carla</w:t></w:r></w:p>\
                       <w:tbl><w:tr><w:tc><w:p><w:r><w:t>inner</w:t></w:r></w:p></w:tc></w:tr></w:tbl>\
                       <w:p/></w:tc>\
                     <w:tc><w:p><w:r><w:t>ok</w:t></w:r></w:p></w:tc></w:tr>\
             </w:tbl>",
        );

        let doc = read_tables(&docx).unwrap();
        assert_eq!(doc.tables.len(), 1);
        assert_eq!(
            rows(&doc, 0),
            vec![vec!["Turma A", "Turma A", "obs"], vec!["3", "Carla\n", "ok"]]
        );
    }

    #[test]
    fn test_oversized_grid_span_is_an_error() {
        let docx = docx_from_body(
            "<w:tbl><w:tr>\
               <w:tc><w:p><w:r><w:t>1</w:t></w:r></w:p></w:tc>\
               <w:tc><w:tcPr><w:gridSpan w:val=\"4000000000\"/></w:tcPr><w:p/></w:tc>\
             </w:tr></w:tbl>",
        );

        assert!(matches!(read_tables(&docx).unwrap_err(), DocxError::Xml(_)));
        assert!(matches!(
            append_row(&docx, 0, &["2", "Ana"], 2).unwrap_err(),
            DocxError::Xml(_)
        ));

        let garbage = docx_from_body(
            "<w:tbl><w:tr><w:tc><w:tcPr><w:gridSpan w:val=\"x\"/></w:tcPr><w:p/></w:tc></w:tr></w:tbl>",
        );
        assert!(matches!(read_tables(&garbage).unwrap_err(), DocxError::Xml(_)));
    }

    #[test]
    fn test_tab_stops_in_paragraph_properties_are_not_text() {
        let docx = docx_from_body(
            "<w:tbl><w:tr><w:tc>\
               <w:p><w:r><w:t>pasta</w:t></w:r></w:p>\
               <w:p><w:pPr><w:tabs><w:tab w:val=\"left\" w:pos=\"720\"/></w:tabs></w:pPr>\
                 <w:r><w:t>3</w:t><w:tab/><w:t>b</w:t><w:br/></w:r></w:p>\
             </w:tc></w:tr></w:tbl>",
        );

        let doc = read_tables(&docx).unwrap();
        assert_eq!(doc.tables[0].rows[0][0], "pasta\n3\tb\n");
    }

    #[test]
    fn test_vertical_merge_continuation_reads_cell_above() {
        let docx = docx_from_body(
            "<w:tbl>\
               <w:tr><w:tc><w:p><w:r><w:t>1</w:t></w:r></w:p></w:tc>\
                     <w:tc><w:p><w:r><w:t>Ana Clara</w:t></w:r></w:p></w:tc>\
                     <w:tc><w:tcPr><w:vMerge w:val=\"restart\"/></w:tcPr><w:p><w:r><w:t>Turma 2010</w:t></w:r></w:p></w:tc></w:tr>\
               <w:tr><w:tc><w:p><w:r><w:t>2</w:t></w:r></w:p></w:tc>\
                     <w:tc><w:p><w:r><w:t>Bruno Lima</w:t></w:r></w:p></w:tc>\
                     <w:tc><w:tcPr><w:vMerge/></w:tcPr><w:p/></w:tc></w:tr>\
               <w:tr><w:tc><w:p><w:r><w:t>3</w:t></w:r></w:p></w:tc>\
                     <w:tc><w:p><w:r><w:t>Carla Dias</w:t></w:r></w:p></w:tc>\
                     <w:tc><w:tcPr><w:vMerge w:val=\"continue\"/></w:tcPr><w:p/></w:tc></w:tr>\
               <w:tr><w:tc><w:p><w:r><w:t>4</w:t></w:r></w:p></w:tc>\
                     <w:tc><w:p><w:r><w:t>Davi Reis</w:t></w:r></w:p></w:tc>\
                     <w:tc><w:p/></w:tc></w:tr>\
             </w:tbl>",
        );

        let doc = read_tables(&docx).unwrap();
        let notes: Vec<&str> = doc.tables[0].rows.iter().map(|r| r[2].as_str()).collect();
        assert_eq!(notes, vec!["Turma 2010", "Turma 2010", "Turma 2010", ""]);
    }

    #[test]
    fn test_corrupt_bytes_and_missing_part() {
        assert!(matches!(
            read_tables(b"definitely not a zip").unwrap_err(),
            DocxError::Zip(_)
        ));

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("readme.txt", FileOptions::default()).unwrap();
        zip.write_all(b"hi").unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        assert!(matches!(
            read_tables(&bytes).unwrap_err(),
            DocxError::MissingPart(DOCUMENT_PART)
        ));
    }

    #[test]
    fn test_append_row_uses_grid_and_keeps_other_parts() {
        let docx = docx_from_body(
            "<w:tbl><w:tblPr/><w:tblGrid><w:gridCol w:w=\"800\"/><w:gridCol w:w=\"5000\"/><w:gridCol w:w=\"3000\"/></w:tblGrid>\
               <w:tr><w:tc><w:p><w:r><w:t>Nº</w:t></w:r></w:p></w:tc>\
                     <w:tc><w:p><w:r><w:t>NOME</w:t></w:r></w:p></w:tc>\
                     <w:tc><w:p><w:r><w:t>OBS</w:t></w:r></w:p></w:tc></w:tr>\
             </w:tbl><w:p/>\
             <w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>",
        );

        let updated = append_row(&docx, 0, &["S/N", "João & Cia <3>", "linha 1\nlinha 2"], 2).unwrap();

        let doc = read_tables(&updated).unwrap();
        assert_eq!(
            rows(&doc, 0),
            vec![
                vec!["Nº", "NOME", "OBS"],
                vec!["S/N", "João & Cia <3>", "linha 1\nlinha 2"],
            ]
        );
        assert_eq!(doc.tables[1].rows.len(), 1);

        let xml = document_xml(&updated).unwrap();
        assert!(xml.contains(r#"<w:tcW w:w="5000" w:type="dxa"/>"#));

        let mut archive = ZipArchive::new(Cursor::new(&updated[..])).unwrap();
        let mut styles = String::new();
        archive
            .by_name("word/styles.xml")
            .unwrap()
            .read_to_string(&mut styles)
            .unwrap();
        assert_eq!(styles, "<w:styles/>");
    }

    #[test]
    fn test_append_row_without_grid_follows_last_row() {
        let docx = docx_from_body(
            "<w:tbl><w:tr><w:tc><w:p/></w:tc><w:tc><w:p/></w:tc></w:tr></w:tbl>",
        );

        let updated = append_row(&docx, 0, &["1", "Daniela", "dropped"], 2).unwrap();
        let doc = read_tables(&updated).unwrap();
        assert_eq!(rows(&doc, 0)[1], vec!["1", "Daniela"]);
    }

    #[test]
    fn test_append_row_structural_failures() {
        let no_tables = docx_from_body("<w:p><w:r><w:t>vazio</w:t></w:r></w:p>");
        assert!(matches!(
            append_row(&no_tables, 0, &["1", "Ana"], 2).unwrap_err(),
            DocxError::NoTable { index: 0, found: 0 }
        ));

        let narrow = docx_from_body("<w:tbl><w:tblGrid><w:gridCol w:w=\"900\"/></w:tblGrid><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>");
        assert!(matches!(
            append_row(&narrow, 0, &["1", "Ana"], 2).unwrap_err(),
            DocxError::TooNarrow {
                columns: 1,
                required: 2
            }
        ));
    }

    #[test]
    fn test_build_produces_readable_package() {
        let docx = build(&[vec![
            vec!["Nº".to_string(), "NOME".to_string(), "OBSERVAÇÃO".to_string()],
            vec!["1".to_string(), "Eduarda".to_string(), String::new()],
        ]])
        .unwrap();

        let doc = read_tables(&docx).unwrap();
        assert_eq!(
            rows(&doc, 0),
            vec![vec!["Nº", "NOME", "OBSERVAÇÃO"], vec!["1", "Eduarda", ""]]
        );

        let appended = append_row(&docx, 0, &["2", "Fabio"], 2).unwrap();
        assert_eq!(read_tables(&appended).unwrap().tables[0].rows.len(), 3);
    }
}
