use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::model::{DocumentInfo, ExtractionResult, ImageFormat};
use crate::storage::Storage;

pub const TEXT_FILE: &str = "text.txt";
pub const HEADINGS_FILE: &str = "headings.txt";
pub const LINKS_FILE: &str = "links.csv";
pub const FONT_STYLES_FILE: &str = "font_styles.csv";
pub const METADATA_FILE: &str = "metadata.json";
pub const TABLES_DIR: &str = "tables";
pub const IMAGES_DIR: &str = "images";

/// Writes one directory per document.
///
/// ```text
/// <destination>/
///   text.txt  headings.txt  links.csv  font_styles.csv  metadata.json
///   tables/table_000.csv ...
///   images/page_1_img_0.png ...
/// ```
///
/// Saving again replaces the previous output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStorage;

#[derive(Debug, Serialize)]
struct Counts {
    text_segments: usize,
    headings: usize,
    links: usize,
    images: usize,
    tables: usize,
}

#[derive(Debug, Serialize)]
struct ImageEntry<'a> {
    file: String,
    page: u32,
    format: ImageFormat,
    name: Option<&'a str>,
    alt_text: Option<&'a str>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    document: &'a DocumentInfo,
    extracted_at: DateTime<Utc>,
    counts: Counts,
    images: Vec<ImageEntry<'a>>,
}

/// File name of the image at `index` in the result.
pub fn image_file_name(page: u32, index: usize, format: ImageFormat) -> String {
    format!("page_{page}_img_{index}.{}", format.extension())
}

/// File name of the table at `index`.
pub fn table_file_name(index: usize) -> String {
    format!("table_{index:03}.csv")
}

impl FileStorage {
    fn write_links(data: &ExtractionResult, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["page", "url", "text"])?;
        for link in &data.links {
            let page = link.location.page.to_string();
            writer.write_record([page.as_str(), link.url.as_str(), link.text.as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_font_styles(data: &ExtractionResult, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["page", "text", "font", "size", "bold", "italic"])?;
        for segment in &data.text {
            let Some(style) = &segment.style else {
                continue;
            };
            let page = segment.location.page.to_string();
            let size = style.size.map(|s| s.to_string()).unwrap_or_default();
            writer.write_record([
                page.as_str(),
                segment.text.as_str(),
                style.font.as_deref().unwrap_or_default(),
                size.as_str(),
                if style.bold { "true" } else { "false" },
                if style.italic { "true" } else { "false" },
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_tables(data: &ExtractionResult, dir: &Path) -> Result<()> {
        if data.tables.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(dir)?;
        for table in &data.tables {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_path(dir.join(table_file_name(table.index)))?;
            for row in &table.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        Ok(())
    }

    fn write_images<'a>(data: &'a ExtractionResult, dir: &Path) -> Result<Vec<ImageEntry<'a>>> {
        let mut entries = Vec::with_capacity(data.images.len());
        if data.images.is_empty() {
            return Ok(entries);
        }
        fs::create_dir_all(dir)?;
        for (index, image) in data.images.iter().enumerate() {
            let file = image_file_name(image.location.page, index, image.format);
            fs::write(dir.join(&file), &image.data)?;
            entries.push(ImageEntry {
                file,
                page: image.location.page,
                format: image.format,
                name: image.name.as_deref(),
                alt_text: image.alt_text.as_deref(),
                width: image.width,
                height: image.height,
            });
        }
        Ok(entries)
    }
}

impl Storage for FileStorage {
    fn name(&self) -> &str {
        "file"
    }

    fn save(&self, data: &ExtractionResult, destination: &Path) -> Result<()> {
        fs::create_dir_all(destination)?;
        for dir in [TABLES_DIR, IMAGES_DIR] {
            let path = destination.join(dir);
            if path.exists() {
                debug!(path = %path.display(), "removing previous output");
                fs::remove_dir_all(&path)?;
            }
        }

        fs::write(destination.join(TEXT_FILE), data.render_text())?;
        fs::write(destination.join(HEADINGS_FILE), data.render_headings())?;
        Self::write_links(data, &destination.join(LINKS_FILE))?;
        Self::write_font_styles(data, &destination.join(FONT_STYLES_FILE))?;
        Self::write_tables(data, &destination.join(TABLES_DIR))?;
        let images = Self::write_images(data, &destination.join(IMAGES_DIR))?;

        let metadata = Metadata {
            document: &data.document,
            extracted_at: Utc::now(),
            counts: Counts {
                text_segments: data.text.len(),
                headings: data.headings().count(),
                links: data.links.len(),
                images: data.images.len(),
                tables: data.tables.len(),
            },
            images,
        };
        let writer = BufWriter::new(File::create(destination.join(METADATA_FILE))?);
        serde_json::to_writer_pretty(writer, &metadata)?;

        info!(
            backend = self.name(),
            destination = %destination.display(),
            file = %data.document.file_name,
            "saved extraction"
        );
        Ok(())
    }
}
