//! Source files materialized in transient storage.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

/// Env variable overriding where transient files are created.
pub const TMP_ROOT_ENV: &str = "CHUNKMILL_TMP_ROOT";

/// A file materialized in transient storage for the duration of one request.
///
/// Exclusively owned by the handler that created it; the owner must delete it
/// on every exit path.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: String,
    pub path: PathBuf,
    pub mime_type: String,
    pub file_name: String,
}

fn tmp_root() -> PathBuf {
    std::env::var_os(TMP_ROOT_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

/// Resolve a transient file path for the given name, rejecting anything that
/// would escape the temp root.
fn transient_path(file_name: &str) -> io::Result<PathBuf> {
    if file_name.is_empty()
        || file_name.contains('/')
        || file_name.contains('\\')
        || file_name.contains("..")
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid transient file name: {file_name}"),
        ));
    }
    Ok(tmp_root().join(file_name))
}

impl SourceFile {
    pub fn new(
        id: impl Into<String>,
        path: impl Into<PathBuf>,
        mime_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            mime_type: mime_type.into(),
            file_name: file_name.into(),
        }
    }

    /// Size of the backing file in bytes.
    pub fn size(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    /// Read the whole backing file. Lazy; never cached.
    pub fn buffer(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }

    /// Reserve a fresh transient file path with the given extension.
    ///
    /// The file itself is not created; external tools write to the path.
    pub fn new_temporary(extension: Option<&str>) -> io::Result<Self> {
        let id = Uuid::new_v4().to_string();
        let file_name = match extension {
            Some(ext) => {
                let ext = ext.strip_prefix('.').unwrap_or(ext);
                format!("{id}.{ext}")
            }
            None => id.clone(),
        };
        let path = transient_path(&file_name)?;
        Ok(Self::new(id, path, "", file_name))
    }

    /// Copy the given file into transient storage, taking ownership of the
    /// copy. The original is left untouched.
    pub fn persist_from(
        source: &Path,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> io::Result<Self> {
        let id = Uuid::new_v4().to_string();
        let path = transient_path(&id)?;
        fs::copy(source, &path)?;
        Ok(Self::new(id, path, mime_type, file_name))
    }

    pub fn delete(&self) -> io::Result<()> {
        fs::remove_file(&self.path)
    }

    /// Delete the backing file, logging instead of failing. Used on cleanup
    /// paths where an error is already being propagated.
    pub fn delete_quiet(&self) {
        if let Err(e) = self.delete() {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), "failed to delete transient file: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_transient_path_rejects_traversal() {
        assert!(transient_path("../etc/passwd").is_err());
        assert!(transient_path("a/b").is_err());
        assert!(transient_path("").is_err());
        assert!(transient_path("abc123.mp3").is_ok());
    }

    #[test]
    fn test_new_temporary_extension_handling() {
        let with_dot = SourceFile::new_temporary(Some(".ogg")).unwrap();
        assert!(with_dot.file_name.ends_with(".ogg"));
        assert!(!with_dot.file_name.contains(".."));

        let without_dot = SourceFile::new_temporary(Some("ogg")).unwrap();
        assert!(without_dot.file_name.ends_with(".ogg"));

        let bare = SourceFile::new_temporary(None).unwrap();
        assert!(!bare.file_name.contains('.'));
    }

    #[test]
    fn test_persist_and_delete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("input.txt");
        let mut f = fs::File::create(&src).unwrap();
        f.write_all(b"hello").unwrap();

        let file = SourceFile::persist_from(&src, "input.txt", "text/plain").unwrap();
        assert_eq!(file.size().unwrap(), 5);
        assert_eq!(file.buffer().unwrap(), b"hello");
        assert!(src.exists());

        file.delete().unwrap();
        assert!(!file.path.exists());

        // deleting twice reports the IO error, delete_quiet swallows it
        assert!(file.delete().is_err());
        file.delete_quiet();
    }
}
