use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ExtractError;

/// Anything a document can be read from.
pub trait DocumentSource {
    fn name(&self) -> &str;

    fn content_type(&self) -> &str;

    fn read_bytes(&self) -> Result<Vec<u8>, ExtractError>;
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("hwp") => "application/x-hwp",
        _ => "application/octet-stream",
    }
}

/// A file on disk.
#[derive(Debug, Clone)]
pub struct PathSource {
    path: PathBuf,
    name: String,
}

impl PathSource {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ExtractError> {
        let path = path.into();
        if !path.exists() {
            return Err(ExtractError::MissingInput(path));
        }

        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
        Ok(Self { path, name })
    }
}

impl DocumentSource for PathSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn content_type(&self) -> &str {
        content_type_for(&self.path)
    }

    fn read_bytes(&self) -> Result<Vec<u8>, ExtractError> {
        Ok(fs::read(&self.path)?)
    }
}

/// Bytes already in memory, such as an upload.
#[derive(Debug, Clone)]
pub struct MemorySource {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MemorySource {
    #[must_use]
    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: "application/pdf".to_string(),
            bytes,
        }
    }
}

impl DocumentSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn read_bytes(&self) -> Result<Vec<u8>, ExtractError> {
        Ok(self.bytes.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{DocumentSource, MemorySource, PathSource};
    use crate::error::ExtractError;

    #[test]
    fn missing_path_is_rejected_up_front() {
        let error = PathSource::open("/definitely/not/here.pdf").expect_err("path is missing");
        assert!(matches!(error, ExtractError::MissingInput(_)));
    }

    #[test]
    fn path_source_reports_file_name_and_type() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("Report.PDF");
        fs::write(&path, b"%PDF-1.5").expect("fixture should be written");

        let source = PathSource::open(&path).expect("file exists");
        assert_eq!(source.name(), "Report.PDF");
        assert_eq!(source.content_type(), "application/pdf");
        assert_eq!(source.read_bytes().expect("readable"), b"%PDF-1.5");
    }

    #[test]
    fn memory_source_hands_back_its_bytes() {
        let source = MemorySource::pdf("upload.pdf", vec![1, 2, 3]);
        assert_eq!(source.name(), "upload.pdf");
        assert_eq!(source.content_type(), "application/pdf");
        assert_eq!(source.read_bytes().expect("in memory"), vec![1, 2, 3]);
    }
}
