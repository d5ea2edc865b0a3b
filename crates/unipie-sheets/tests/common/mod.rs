//! Builds small `.xlsx` fixtures with inline-string cells.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub struct SheetSpec<'a> {
    pub name: &'a str,
    pub rows: Vec<Vec<&'a str>>,
}

pub fn sheet<'a>(name: &'a str, rows: &[&[&'a str]]) -> SheetSpec<'a> {
    SheetSpec {
        name,
        rows: rows.iter().map(|r| r.to_vec()).collect(),
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn column_letters(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + u8::try_from(col % 26).unwrap());
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap()
}

fn worksheet_xml(rows: &[Vec<&str>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            xml.push_str(&format!(
                r#"<c r="{}{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                column_letters(c),
                r + 1,
                escape(value)
            ));
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

pub fn xlsx_bytes(sheets: &[SheetSpec<'_>]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let mut workbook = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (idx, spec) in sheets.iter().enumerate() {
        let n = idx + 1;
        workbook.push_str(&format!(
            r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#,
            escape(spec.name)
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        ));
    }
    workbook.push_str("</sheets></workbook>");
    rels.push_str("</Relationships>");

    zip.start_file("xl/workbook.xml", options).unwrap();
    zip.write_all(workbook.as_bytes()).unwrap();
    zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
    zip.write_all(rels.as_bytes()).unwrap();
    for (idx, spec) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", idx + 1), options)
            .unwrap();
        zip.write_all(worksheet_xml(&spec.rows).as_bytes()).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

pub fn write_xlsx(dir: &Path, file_name: &str, sheets: &[SheetSpec<'_>]) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, xlsx_bytes(sheets)).unwrap();
    path
}

/// A complete workbook for one university with one programme.
pub fn university_workbook(dir: &Path, file_name: &str, uni: &str, programme: &str) -> PathBuf {
    write_xlsx(
        dir,
        file_name,
        &[
            sheet(
                "University",
                &[&["uni_name", uni], &["Location", "Somewhere"], &["founded", "1900"]],
            ),
            sheet(
                "Programme",
                &[
                    &["programme_name", "duration", "description", "fees (annual)", "admission_requirements", "degree_awarded"],
                    &[programme, "4 years", "", "", "", "BSc"],
                ],
            ),
            sheet(
                "ProgrammeDescription",
                &[&[programme, "An overview", "https://example.edu"]],
            ),
            sheet(
                "CourseDescription",
                &[
                    &[programme, "Intro", "Basics"],
                    &["", "Advanced", "More"],
                ],
            ),
            sheet("TestType", &[&[programme, "IELTS", "7", "6.5"]]),
        ],
    )
}
