//! # File Content Reader
//!
//! Turns a downloaded file into text for the prompt. Dispatch is purely on
//! the lower-cased extension:
//!
//! - empty files give a fixed placeholder
//! - HTML is run back through the [extractor](crate::extractor) once
//! - plain-text-like files are returned verbatim (lossy UTF-8)
//! - known binary formats give a placeholder naming the file and the format
//! - anything else is sampled and returned if it decodes as text
//!
//! Reading never fails; errors become placeholder text.

use std::fmt;
use std::path::Path;

use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument, warn};

use crate::extractor;
use crate::fetcher::filename::extension;

/// Extensions returned verbatim
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "py", "js", "json", "xml", "css", "csv", "rtf", "c", "cpp", "java", "log",
];

/// Bytes sampled from files of unknown type
pub const SAMPLE_SIZE: u64 = 8 * 1024;

/// Binary formats whose content is not extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKind {
    Pdf,
    Word,
    PowerPoint,
    Excel,
    Image,
    Audio,
    Video,
    Archive,
}

impl BinaryKind {
    fn from_extension(ext: &str) -> Option<Self> {
        let kind = match ext {
            "pdf" => Self::Pdf,
            "doc" | "docx" | "odt" => Self::Word,
            "ppt" | "pptx" | "odp" => Self::PowerPoint,
            "xls" | "xlsx" | "ods" => Self::Excel,
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "svg" | "webp" | "tiff" => Self::Image,
            "mp3" | "wav" | "ogg" | "flac" | "m4a" | "aac" => Self::Audio,
            "mp4" | "mov" | "avi" | "mkv" | "webm" | "wmv" => Self::Video,
            "zip" | "tar" | "gz" | "rar" | "7z" | "bz2" => Self::Archive,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for BinaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pdf => "PDF",
            Self::Word => "Word",
            Self::PowerPoint => "PowerPoint",
            Self::Excel => "Excel",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Archive => "archive",
        };
        f.write_str(label)
    }
}

/// How a file is read, decided by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Html,
    Text,
    Binary(BinaryKind),
    Unknown,
}

impl FileKind {
    /// Classify a path by its lower-cased extension
    pub fn of(path: &Path) -> Self {
        let ext = path
            .file_name()
            .and_then(|name| extension(&name.to_string_lossy()))
            .unwrap_or_default();

        match ext.as_str() {
            "html" | "htm" => Self::Html,
            ext if TEXT_EXTENSIONS.contains(&ext) => Self::Text,
            ext => BinaryKind::from_extension(ext).map_or(Self::Unknown, Self::Binary),
        }
    }
}

/// Placeholder for a zero-byte file
pub fn empty_file_placeholder(name: &str) -> String {
    format!("[Empty file: {}]", name)
}

/// Placeholder for a known binary format
pub fn binary_placeholder(kind: BinaryKind, name: &str) -> String {
    format!(
        "[{kind} file '{name}': content extraction for {kind} files is not implemented]"
    )
}

/// Placeholder for an unknown file that does not decode as text
pub fn unsupported_placeholder(name: &str) -> String {
    format!("[Unsupported binary file: {}]", name)
}

/// Name shown in placeholders: the file name without the download timestamp prefix
pub fn display_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    match name.split_once('_') {
        Some((prefix, rest))
            if !prefix.is_empty()
                && !rest.is_empty()
                && prefix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            rest.to_string()
        }
        _ => name,
    }
}

/// Read a downloaded file as prompt text
///
/// # Arguments
///
/// * `path` - The downloaded file
/// * `original_url` - Where it came from; the base for links inside HTML
///
/// # Returns
///
/// The file's text or a descriptive placeholder
#[instrument(skip(path), fields(path = %path.display()))]
pub async fn read_file(path: &Path, original_url: &str) -> String {
    let name = display_name(path);

    let size = match fs::metadata(path).await {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            warn!("Failed to stat {}: {}", path.display(), e);
            return format!("[Error reading {}: {}]", name, e);
        }
    };
    if size == 0 {
        return empty_file_placeholder(&name);
    }

    let kind = FileKind::of(path);
    debug!("Reading {} as {:?}", name, kind);

    let result = match kind {
        FileKind::Binary(kind) => return binary_placeholder(kind, &name),
        FileKind::Html => read_html(path, original_url, &name).await,
        FileKind::Text => fs::read(path)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
        FileKind::Unknown => read_sample(path, &name).await,
    };

    result.unwrap_or_else(|e| {
        warn!("Failed to read {}: {}", path.display(), e);
        format!("[Error reading {}: {}]", name, e)
    })
}

async fn read_html(path: &Path, original_url: &str, name: &str) -> std::io::Result<String> {
    let bytes = fs::read(path).await?;
    let html = String::from_utf8_lossy(&bytes);
    let extracted = extractor::extract(&html, original_url);
    if extracted.text.is_empty() {
        Ok(format!("[No readable text extracted from {}]", name))
    } else {
        Ok(extracted.text)
    }
}

async fn read_sample(path: &Path, name: &str) -> std::io::Result<String> {
    let file = fs::File::open(path).await?;
    let mut sample = Vec::new();
    file.take(SAMPLE_SIZE).read_to_end(&mut sample).await?;

    Ok(decode_sample(&sample).unwrap_or_else(|| unsupported_placeholder(name)))
}

/// Decode a sample as UTF-8, tolerating a character cut at the end
fn decode_sample(sample: &[u8]) -> Option<String> {
    if sample.contains(&0) {
        return None;
    }
    match std::str::from_utf8(sample) {
        Ok(text) => Some(text.to_string()),
        Err(e) if e.error_len().is_none() => {
            std::str::from_utf8(&sample[..e.valid_up_to()]).ok().map(str::to_string)
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_file_kind() {
        assert_eq!(FileKind::of(Path::new("a.HTML")), FileKind::Html);
        assert_eq!(FileKind::of(Path::new("1_notes.md")), FileKind::Text);
        assert_eq!(FileKind::of(Path::new("x.pdf")), FileKind::Binary(BinaryKind::Pdf));
        assert_eq!(FileKind::of(Path::new("x.PPTX")), FileKind::Binary(BinaryKind::PowerPoint));
        assert_eq!(FileKind::of(Path::new("x.weird")), FileKind::Unknown);
        assert_eq!(FileKind::of(Path::new("noext")), FileKind::Unknown);
    }

    #[test]
    fn test_display_name_strips_timestamp() {
        assert_eq!(display_name(Path::new("/tmp/1718000000123_a.pdf")), "a.pdf");
        assert_eq!(display_name(Path::new("/tmp/my_notes.txt")), "my_notes.txt");
        assert_eq!(display_name(Path::new("/tmp/a.pdf")), "a.pdf");
    }

    #[tokio::test]
    async fn test_zero_byte_file_regardless_of_extension() {
        let dir = tempdir().unwrap();
        for name in ["1_empty.txt", "1_empty.pdf", "1_empty.html", "1_empty.xyz"] {
            let path = write(&dir, name, b"");
            let text = read_file(&path, "https://example.test/").await;
            assert_eq!(text, empty_file_placeholder(&name[2..]));
        }
    }

    #[tokio::test]
    async fn test_text_file_verbatim_with_lossy_decoding() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "notes.md", b"# Title\nline \xff two\n");
        let text = read_file(&path, "https://example.test/").await;
        assert_eq!(text, "# Title\nline \u{fffd} two\n");
    }

    #[tokio::test]
    async fn test_binary_placeholder() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "1700000000_a.pdf", b"%PDF-1.7 ...");
        let text = read_file(&path, "https://example.test/").await;
        assert_eq!(
            text,
            "[PDF file 'a.pdf': content extraction for PDF files is not implemented]"
        );
    }

    #[tokio::test]
    async fn test_html_file_extracted_once() {
        let dir = tempdir().unwrap();
        let path = write(
            &dir,
            "page.html",
            br#"<html><body><p>Read <a href="next.html">next</a></p></body></html>"#,
        );
        let text = read_file(&path, "https://example.test/course/").await;
        assert_eq!(text, "Read next");

        // Feeding the extracted text back as an .html artifact terminates with plain text.
        let again = write(&dir, "again.html", text.as_bytes());
        let text = read_file(&again, "https://example.test/course/").await;
        assert_eq!(text, "[No readable text extracted from again.html]");
    }

    #[tokio::test]
    async fn test_unknown_extension_sampled() {
        let dir = tempdir().unwrap();
        let text_path = write(&dir, "config.toml", b"key = \"value\"\n");
        assert_eq!(
            read_file(&text_path, "https://example.test/").await,
            "key = \"value\"\n"
        );

        let bin_path = write(&dir, "blob.bin", &[0u8, 159, 146, 150, 1, 2]);
        assert_eq!(
            read_file(&bin_path, "https://example.test/").await,
            unsupported_placeholder("blob.bin")
        );
    }

    #[tokio::test]
    async fn test_missing_file_placeholder() {
        let text = read_file(Path::new("/definitely/not/here.txt"), "https://example.test/").await;
        assert!(text.starts_with("[Error reading here.txt:"));
    }

    #[test]
    fn test_decode_sample_tolerates_cut_character() {
        let mut sample = "héllo".as_bytes().to_vec();
        sample.extend_from_slice(&"é".as_bytes()[..1]);
        assert_eq!(decode_sample(&sample).as_deref(), Some("héllo"));
        assert_eq!(decode_sample(&[0xff, 0xfe, b'a']), None);
    }
}
