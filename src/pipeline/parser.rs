//! Document parsing behind a small per-extension trait.
//!
//! The core depends on [`DocumentParser`], not on a specific PDF/DOCX
//! parsing crate — document-format libraries are an external concern; this
//! module only wires the extraction calls.

use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unsupported extension: {0}")]
    UnsupportedExtension(String),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait DocumentParser: Send + Sync {
    /// File extensions this parser handles, lowercase, without the dot.
    fn extensions(&self) -> &[&'static str];

    /// Extracts plain text from the raw file bytes.
    fn parse(&self, bytes: &[u8]) -> Result<String, ParseError>;
}

/// Returns the built-in parser for `extension` (case-insensitive, dot
/// optional), or `None` if unsupported.
pub fn parser_for_extension(extension: &str) -> Option<Box<dyn DocumentParser>> {
    match extension.trim_start_matches('.').to_lowercase().as_str() {
        "pdf" => Some(Box::new(PdfParser)),
        "docx" => Some(Box::new(DocxParser)),
        "doc" => Some(Box::new(LegacyDocParser)),
        _ => None,
    }
}

pub fn is_supported_extension(extension: &str) -> bool {
    matches!(
        extension.trim_start_matches('.').to_lowercase().as_str(),
        "pdf" | "docx" | "doc"
    )
}

/// Extracts the lowercase extension (without the dot) from a filename.
pub fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
}

struct PdfParser;

impl DocumentParser for PdfParser {
    fn extensions(&self) -> &[&'static str] {
        &["pdf"]
    }

    fn parse(&self, bytes: &[u8]) -> Result<String, ParseError> {
        pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ParseError::Malformed(e.to_string()))
    }
}

/// OOXML is a zip archive of XML parts; `word/document.xml` holds the body
/// text. We walk `w:t` text-run elements and join them, inserting
/// paragraph breaks at `w:p` boundaries.
struct DocxParser;

impl DocumentParser for DocxParser {
    fn extensions(&self) -> &[&'static str] {
        &["docx"]
    }

    fn parse(&self, bytes: &[u8]) -> Result<String, ParseError> {
        let cursor = std::io::Cursor::new(bytes);
        let mut archive =
            zip::ZipArchive::new(cursor).map_err(|e| ParseError::Malformed(e.to_string()))?;

        let mut document_xml = String::new();
        {
            let mut entry = archive
                .by_name("word/document.xml")
                .map_err(|_| ParseError::Malformed("missing word/document.xml".to_string()))?;
            entry
                .read_to_string(&mut document_xml)
                .map_err(|e| ParseError::Malformed(e.to_string()))?;
        }

        extract_docx_body_text(&document_xml)
    }
}

fn extract_docx_body_text(xml: &str) -> Result<String, ParseError> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;
    let mut buf = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| ParseError::Malformed(e.to_string()))?
        {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text_run = true,
            Event::End(e) if e.local_name().as_ref() == b"t" => in_text_run = false,
            Event::End(e) if e.local_name().as_ref() == b"p" => {
                paragraphs.push(std::mem::take(&mut current));
            }
            Event::Text(t) if in_text_run => {
                current.push_str(
                    &t.unescape()
                        .map_err(|e| ParseError::Malformed(e.to_string()))?,
                );
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs.join("\n\n"))
}

/// Legacy binary `.doc`: no viable pure-Rust parser exists for the OLE2
/// compound-file format, so this falls back to a best-effort scan for
/// printable ASCII runs, which recovers most body text but loses layout
/// and some formatting-adjacent characters.
struct LegacyDocParser;

impl DocumentParser for LegacyDocParser {
    fn extensions(&self) -> &[&'static str] {
        &["doc"]
    }

    fn parse(&self, bytes: &[u8]) -> Result<String, ParseError> {
        let mut text = String::new();
        let mut run = String::new();

        for &byte in bytes {
            let ch = byte as char;
            if ch.is_ascii_graphic() || ch == ' ' {
                run.push(ch);
            } else {
                if run.len() >= 4 {
                    text.push_str(&run);
                    text.push('\n');
                }
                run.clear();
            }
        }
        if run.len() >= 4 {
            text.push_str(&run);
        }

        if text.trim().is_empty() {
            return Err(ParseError::Malformed(
                "no recoverable text in legacy .doc file".to_string(),
            ));
        }

        Ok(text)
    }
}

/// One entry extracted from a `.zip` upload, for archive fan-out.
pub struct ZipEntry {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Reads a zip archive's central directory and returns every entry whose
/// extension is supported, skipping the rest.
pub fn expand_zip(bytes: &[u8]) -> Result<Vec<ZipEntry>, ParseError> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor).map_err(|e| ParseError::Malformed(e.to_string()))?;

    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| ParseError::Malformed(e.to_string()))?;

        if file.is_dir() {
            continue;
        }

        let filename = file.name().to_string();
        let Some(extension) = extension_of(&filename) else {
            continue;
        };
        if !is_supported_extension(&extension) {
            continue;
        }

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        entries.push(ZipEntry { filename, bytes });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_of_extracts_lowercase_suffix() {
        assert_eq!(extension_of("resume.PDF"), Some("pdf".to_string()));
        assert_eq!(extension_of("resume.docx"), Some("docx".to_string()));
        assert_eq!(extension_of("noext"), None);
    }

    #[test]
    fn is_supported_extension_covers_pdf_docx_doc_only() {
        assert!(is_supported_extension("pdf"));
        assert!(is_supported_extension(".DOCX"));
        assert!(is_supported_extension("doc"));
        assert!(!is_supported_extension("txt"));
        assert!(!is_supported_extension("zip"));
    }

    #[test]
    fn parser_for_extension_returns_none_for_unknown() {
        assert!(parser_for_extension("txt").is_none());
        assert!(parser_for_extension("pdf").is_some());
    }

    #[test]
    fn docx_body_text_extracts_paragraphs_and_joins_runs() {
        let xml = r#"<w:document xmlns:w="ns"><w:body>
            <w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t> world</w:t></w:r></w:p>
            <w:p><w:r><w:t>Second paragraph</w:t></w:r></w:p>
        </w:body></w:document>"#;

        let text = extract_docx_body_text(xml).unwrap();
        assert_eq!(text, "Hello world\n\nSecond paragraph");
    }

    #[test]
    fn legacy_doc_parser_recovers_printable_runs() {
        let mut bytes = vec![0u8, 1, 2];
        bytes.extend_from_slice(b"Jane Doe Software Engineer");
        bytes.extend_from_slice(&[0, 0, 0]);

        let parser = LegacyDocParser;
        let text = parser.parse(&bytes).unwrap();
        assert!(text.contains("Jane Doe Software Engineer"));
    }

    #[test]
    fn legacy_doc_parser_errors_on_no_recoverable_text() {
        let bytes = vec![0u8; 16];
        let parser = LegacyDocParser;
        assert!(parser.parse(&bytes).is_err());
    }

    /// Writes a minimal OOXML `.docx` archive to a temp file, rereads it from
    /// disk, and runs it through the real parser lookup path.
    fn write_docx_to_tempfile(document_xml: &str) -> tempfile::NamedTempFile {
        use std::io::Write as _;
        use zip::write::SimpleFileOptions;

        let file = tempfile::NamedTempFile::new().expect("create temp file");
        {
            let mut writer = zip::ZipWriter::new(file.reopen().expect("reopen temp file for writing"));
            writer
                .start_file("word/document.xml", SimpleFileOptions::default())
                .expect("start document.xml entry");
            writer.write_all(document_xml.as_bytes()).expect("write document.xml");
            writer.finish().expect("finish zip archive");
        }
        file
    }

    #[test]
    fn docx_parser_extracts_text_from_an_on_disk_docx_file() {
        let xml = r#"<w:document xmlns:w="ns"><w:body>
            <w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>
            <w:p><w:r><w:t>Senior Engineer</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let file = write_docx_to_tempfile(xml);

        let bytes = std::fs::read(file.path()).expect("read temp docx back from disk");
        let parser = DocxParser;
        let text = parser.parse(&bytes).expect("docx should parse");

        assert_eq!(text, "Jane Doe\n\nSenior Engineer");
    }

    #[test]
    fn expand_zip_reads_an_archive_written_to_a_temp_file() {
        use std::io::Write as _;
        use zip::write::SimpleFileOptions;

        let file = tempfile::NamedTempFile::new().expect("create temp file");
        {
            let mut writer = zip::ZipWriter::new(file.reopen().expect("reopen temp file for writing"));
            let options = SimpleFileOptions::default();

            writer.start_file("alice.pdf", options).expect("start alice.pdf entry");
            writer.write_all(b"pdf bytes").expect("write alice.pdf");

            writer.start_file("bob.docx", options).expect("start bob.docx entry");
            writer.write_all(b"docx bytes").expect("write bob.docx");

            writer.start_file("notes.txt", options).expect("start notes.txt entry");
            writer.write_all(b"unsupported").expect("write notes.txt");

            writer.finish().expect("finish zip archive");
        }

        let bytes = std::fs::read(file.path()).expect("read temp archive back from disk");
        let entries = expand_zip(&bytes).expect("archive should expand");

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.filename == "alice.pdf"));
        assert!(entries.iter().any(|e| e.filename == "bob.docx"));
        assert!(!entries.iter().any(|e| e.filename == "notes.txt"));
    }
}
