use anyhow::{anyhow, Context, Result};
use encoding_rs::UTF_8;
use lopdf::Document as PdfDocument;
use std::io::{Cursor, Read};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone)]
pub struct DocumentMetadata {
    pub file_type: String,
    pub pages: Option<usize>,
    pub char_count: usize,
}

pub struct DocumentParser;

impl DocumentParser {
    /// Parse an uploaded document into plain text. Accepted formats are the
    /// ones the translation feature supports: PDF, DOCX and plain text.
    pub fn parse(file_name: &str, data: &[u8]) -> Result<ParsedDocument> {
        let extension = file_name
            .rsplit('.')
            .next()
            .filter(|ext| *ext != file_name)
            .ok_or_else(|| anyhow!("No file extension on {}", file_name))?
            .to_lowercase();

        debug!("Parsing upload {} (type: {})", file_name, extension);

        let (content, metadata) = match extension.as_str() {
            "pdf" => Self::parse_pdf(data)?,
            "docx" => Self::parse_docx(data)?,
            "txt" | "md" => Self::parse_text(data)?,
            other => return Err(anyhow!("Unsupported document type: {}", other)),
        };

        debug!("Parsed {} characters from {}", content.len(), file_name);

        Ok(ParsedDocument { content, metadata })
    }

    /// Parse PDF using lopdf
    fn parse_pdf(data: &[u8]) -> Result<(String, DocumentMetadata)> {
        let doc = PdfDocument::load_mem(data).context("Failed to load PDF file")?;
        let pages = doc.get_pages();
        let page_count = pages.len();

        let mut content = String::new();

        for (page_num, _) in pages.iter() {
            match doc.extract_text(&[*page_num]) {
                Ok(text) => {
                    content.push_str(&text);
                    content.push('\n');
                }
                Err(e) => {
                    warn!("Failed to extract text from page {}: {}", page_num, e);
                }
            }
        }

        let metadata = DocumentMetadata {
            file_type: "application/pdf".to_string(),
            pages: Some(page_count),
            char_count: content.len(),
        };

        Ok((content, metadata))
    }

    /// Parse DOCX by pulling word/document.xml out of the zip container and
    /// stripping the markup. Crude, but all the translator needs is the text.
    fn parse_docx(data: &[u8]) -> Result<(String, DocumentMetadata)> {
        let mut archive =
            zip::ZipArchive::new(Cursor::new(data)).context("Failed to open DOCX container")?;

        let mut xml_file = archive
            .by_name("word/document.xml")
            .context("DOCX missing word/document.xml")?;
        let mut xml_content = String::new();
        xml_file.read_to_string(&mut xml_content)?;

        let text = Self::strip_xml_tags(&xml_content);

        let metadata = DocumentMetadata {
            file_type:
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                    .to_string(),
            pages: None,
            char_count: text.len(),
        };

        Ok((text, metadata))
    }

    fn parse_text(data: &[u8]) -> Result<(String, DocumentMetadata)> {
        let (decoded, _, had_errors) = UTF_8.decode(data);
        if had_errors {
            warn!("Text upload contained invalid UTF-8, lossy-decoded");
        }
        let content = decoded.into_owned();

        let metadata = DocumentMetadata {
            file_type: "text/plain".to_string(),
            pages: None,
            char_count: content.len(),
        };

        Ok((content, metadata))
    }

    /// Strip XML tags to recover the raw text. Each tag becomes a space so
    /// adjacent runs don't glue together, then whitespace is collapsed.
    fn strip_xml_tags(xml: &str) -> String {
        let mut text = String::new();
        let mut inside_tag = false;

        for c in xml.chars() {
            match c {
                '<' => {
                    inside_tag = true;
                    text.push(' ');
                }
                '>' => inside_tag = false,
                _ if !inside_tag => text.push(c),
                _ => {}
            }
        }

        let collapsed: Vec<&str> = text.split_whitespace().collect();
        collapsed.join(" ")
    }
}
