mod common;

use std::fs;
use std::path::Path;

use docsift::extract::{ExtractConfig, Extractor};
use docsift::format::DocumentFormat;
use docsift::storage::{FileStorage, SqliteStorage, SqliteStore, Storage};
use docsift::{DocumentInfo, ExtractionResult, Link, SourceLocation};
use proptest::prelude::*;

fn extract(path: &Path) -> ExtractionResult {
    let handle = docsift::open(path).unwrap();
    Extractor::new(&handle, &ExtractConfig::default()).extract_all()
}

fn read_links(path: &Path) -> Vec<(u32, String, String)> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            (r[0].parse().unwrap(), r[1].to_string(), r[2].to_string())
        })
        .collect()
}

fn read_table(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[test]
fn test_file_backend_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = common::write(dir.path(), "plain.docx", &common::plain_docx());
    let result = extract(&input);
    let out = dir.path().join("out");
    FileStorage.save(&result, &out).unwrap();

    assert_eq!(fs::read_to_string(out.join("text.txt")).unwrap(), result.render_text());
    assert_eq!(
        fs::read_to_string(out.join("text.txt")).unwrap(),
        "Page 1\nOverview\nFirst paragraph.\nSecond, with a comma.\n\n"
    );
    assert_eq!(fs::read_to_string(out.join("headings.txt")).unwrap(), "Page 1\nOverview\n\n");
    assert_eq!(fs::read_to_string(out.join("links.csv")).unwrap(), "page,url,text\n");
    assert_eq!(read_table(&out.join("tables/table_000.csv")), result.tables[0].rows);
    assert!(!out.join("images").exists());
}

#[test]
fn test_pdf_file_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = common::write(dir.path(), "hello.pdf", &common::hello_pdf());
    let result = extract(&input);
    let out = dir.path().join("hello_pdf");
    FileStorage.save(&result, &out).unwrap();

    let links = read_links(&out.join("links.csv"));
    let expected: Vec<(u32, String, String)> = result
        .links
        .iter()
        .map(|l| (l.location.page, l.url.clone(), l.text.clone()))
        .collect();
    assert_eq!(links, expected);
    assert_eq!(read_table(&out.join("tables/table_000.csv")), [["a", "b"], ["c", "d"]]);
    assert_eq!(fs::read(out.join("images/page_1_img_0.jpg")).unwrap(), common::JPEG);
}

#[test]
fn test_resave_leaves_only_new_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = common::write(dir.path(), "hello.pdf", &common::hello_pdf());
    let out = dir.path().join("hello_pdf");
    let mut result = extract(&input);
    FileStorage.save(&result, &out).unwrap();

    result.images.clear();
    result.text.truncate(1);
    FileStorage.save(&result, &out).unwrap();

    assert!(!out.join("images").exists());
    assert_eq!(fs::read_to_string(out.join("text.txt")).unwrap(), result.render_text());
    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("metadata.json")).unwrap()).unwrap();
    assert_eq!(metadata["counts"]["images"], 0);
    assert_eq!(metadata["counts"]["text_segments"], 1);
}

#[test]
fn test_sqlite_row_counts() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = extract(&common::write(dir.path(), "hello.pdf", &common::hello_pdf()));
    let docx = extract(&common::write(dir.path(), "plain.docx", &common::plain_docx()));
    let db = dir.path().join("document_data.db");
    SqliteStorage.save(&pdf, &db).unwrap();
    SqliteStorage.save(&docx, &db).unwrap();

    let store = SqliteStore::open(&db).unwrap();
    let docs = store.list_documents().unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].info, pdf.document);
    assert_eq!(docs[0].text_count, pdf.text.len());
    assert_eq!(docs[0].link_count, 1);
    assert_eq!(docs[0].image_count, 1);
    assert_eq!(docs[0].table_count, 1);
    assert_eq!(docs[1].info.format, DocumentFormat::Docx);
    assert_eq!(docs[1].link_count, 0);

    let stored = store.query_document(docs[1].id).unwrap().unwrap();
    assert_eq!(stored.tables, docx.tables);
    assert_eq!(stored.text, docx.text);
}

fn links_result(links: Vec<Link>) -> ExtractionResult {
    let mut result = ExtractionResult::empty(DocumentInfo {
        file_name: "links.pdf".to_string(),
        file_path: "links.pdf".to_string(),
        file_size: 0,
        file_type: ".pdf".to_string(),
        format: DocumentFormat::Pdf,
        sha256: String::new(),
        page_count: 1,
    });
    result.links = links;
    result
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn links_csv_preserves_text(texts in proptest::collection::vec("[ -~]{0,24}", 0..6)) {
        let links: Vec<Link> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Link {
                url: format!("https://example.com/{i}?q=a,b"),
                text: text.clone(),
                location: SourceLocation::page(i as u32 + 1),
            })
            .collect();
        let result = links_result(links);
        let dir = tempfile::tempdir().unwrap();
        FileStorage.save(&result, dir.path()).unwrap();

        let read = read_links(&dir.path().join("links.csv"));
        prop_assert_eq!(read.len(), result.links.len());
        for ((page, url, text), link) in read.iter().zip(&result.links) {
            prop_assert_eq!(*page, link.location.page);
            prop_assert_eq!(url, &link.url);
            prop_assert_eq!(text, &link.text);
        }
    }
}
