//! XML parsing utilities for extracting merge metadata from XLSX files
//!
//! calamine's value range carries no merge information, so the worksheet
//! XML is read directly from the zip archive.

use crate::error::ImportError;
use crate::reader::grid::MergedRange;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::BufReader;
use zip::ZipArchive;

/// Extract merged cell ranges for a worksheet (0-based sheet index, in
/// workbook declaration order). A missing sheet part yields an empty
/// list, not an error.
pub fn extract_merged_cells(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
    sheet_index: usize,
) -> Result<Vec<MergedRange>, ImportError> {
    let mut merged_cells = Vec::new();

    let sheet_path = worksheet_part(archive, sheet_index);
    let sheet_xml = match archive.by_name(&sheet_path) {
        Ok(file) => file,
        Err(_) => return Ok(merged_cells),
    };

    let buf_reader = BufReader::new(sheet_xml);
    let mut reader = Reader::from_reader(buf_reader);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"mergeCell" {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"ref" {
                            let ref_str = String::from_utf8_lossy(&attr.value);
                            if let Some(merge) = parse_cell_range(&ref_str) {
                                merged_cells.push(merge);
                            }
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ImportError::Io(std::io::Error::other(format!(
                    "XML parsing error: {e}"
                ))));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(merged_cells)
}

/// Zip part holding a worksheet, resolved through the workbook
/// relationships so the part name matches whatever calamine reads values
/// from. Falls back to the conventional `sheetN.xml` name when the
/// workbook or rels parts are unreadable.
fn worksheet_part(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
    sheet_index: usize,
) -> String {
    sheet_relationship_id(archive, sheet_index)
        .and_then(|rid| relationship_target(archive, &rid))
        .map(|target| {
            let target = target.trim_start_matches('/');
            if target.starts_with("xl/") {
                target.to_string()
            } else {
                format!("xl/{target}")
            }
        })
        .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", sheet_index + 1))
}

/// `r:id` of the n-th `<sheet>` entry in xl/workbook.xml
fn sheet_relationship_id(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
    sheet_index: usize,
) -> Option<String> {
    let file = archive.by_name("xl/workbook.xml").ok()?;
    let mut reader = Reader::from_reader(BufReader::new(file));
    let mut buf = Vec::new();
    let mut seen = 0usize;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"sheet" => {
                if seen == sheet_index {
                    return e.attributes().flatten().find_map(|attr| {
                        // the id attribute carries a namespace prefix
                        attr.key
                            .as_ref()
                            .ends_with(b":id")
                            .then(|| String::from_utf8_lossy(&attr.value).into_owned())
                    });
                }
                seen += 1;
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// Target of a relationship id in xl/_rels/workbook.xml.rels
fn relationship_target(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
    rid: &str,
) -> Option<String> {
    let file = archive.by_name("xl/_rels/workbook.xml.rels").ok()?;
    let mut reader = Reader::from_reader(BufReader::new(file));
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = Some(String::from_utf8_lossy(&attr.value).into_owned()),
                        b"Target" => {
                            target = Some(String::from_utf8_lossy(&attr.value).into_owned());
                        }
                        _ => {}
                    }
                }
                if id.as_deref() == Some(rid) {
                    return target;
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// Parse a range like "A1:B2" into a 1-indexed merge rectangle
fn parse_cell_range(range: &str) -> Option<MergedRange> {
    let (start, end) = range.split_once(':')?;
    let (start_row, start_col) = parse_cell_ref(start)?;
    let (end_row, end_col) = parse_cell_ref(end)?;
    Some(MergedRange {
        start_row,
        start_col,
        end_row,
        end_col,
    })
}

/// Parse a reference like "A1" into 1-indexed (row, col)
fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let mut col = 0u32;
    let mut row_str = String::new();

    for ch in cell_ref.chars() {
        if ch.is_ascii_alphabetic() {
            col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        } else if ch.is_ascii_digit() {
            row_str.push(ch);
        }
    }

    if row_str.is_empty() || col == 0 {
        return None;
    }
    let row = row_str.parse::<u32>().ok()?;
    Some((row, col))
}
