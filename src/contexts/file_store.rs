use super::patch_run::{LineStore, SourceLines, StoreError};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Line store backed by the real filesystem.
///
/// Writes go through a temp file in the target's directory followed by a
/// rename, so a failed write leaves the original file intact.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLineStore;

impl FileLineStore {
    pub fn new() -> Self {
        Self
    }
}

impl LineStore for FileLineStore {
    fn read_lines(&self, path: &str) -> Result<SourceLines, StoreError> {
        let content = fs::read_to_string(path).map_err(|e| StoreError::Unreadable {
            path: path.to_string(),
            details: e.to_string(),
        })?;
        Ok(SourceLines::parse(&content))
    }

    fn write_lines(&self, path: &str, lines: &SourceLines) -> Result<(), StoreError> {
        let unwritable = |details: String| StoreError::Unwritable {
            path: path.to_string(),
            details,
        };

        let target = Path::new(path);
        // parent() yields "" for a bare relative filename.
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| unwritable(e.to_string()))?;
        tmp.write_all(lines.render().as_bytes())
            .map_err(|e| unwritable(e.to_string()))?;
        tmp.persist(target).map_err(|e| unwritable(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_modify_write_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.cpp");
        fs::write(&path, "int main() {\n    return 0;\n}\n").unwrap();
        let path = path.to_string_lossy().to_string();

        let store = FileLineStore::new();
        let mut lines = store.read_lines(&path).unwrap();
        assert_eq!(lines.len(), 3);

        lines.splice(1, 1, &["    return 1;".to_string()]);
        store.write_lines(&path, &lines).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "int main() {\n    return 1;\n}\n"
        );
    }

    #[test]
    fn test_write_preserves_crlf_separators() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("win.cpp");
        fs::write(&path, "a\r\nb\r\n").unwrap();
        let path = path.to_string_lossy().to_string();

        let store = FileLineStore::new();
        let mut lines = store.read_lines(&path).unwrap();
        lines.splice(0, 1, &["A".to_string()]);
        store.write_lines(&path, &lines).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "A\r\nb\r\n");
    }

    #[test]
    fn test_read_missing_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.cpp").to_string_lossy().to_string();

        let err = FileLineStore::new().read_lines(&path).unwrap_err();
        assert!(matches!(err, StoreError::Unreadable { .. }));
    }

    #[test]
    fn test_write_into_missing_directory_is_unwritable() {
        let dir = TempDir::new().unwrap();
        let path = dir
            .path()
            .join("no_such_dir")
            .join("out.cpp")
            .to_string_lossy()
            .to_string();

        let lines = SourceLines::parse("x\n");
        let err = FileLineStore::new().write_lines(&path, &lines).unwrap_err();
        assert!(matches!(err, StoreError::Unwritable { .. }));
    }
}
