use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Evidence files copied into the upload directory, named after the
/// complaint's acknowledgment number.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    upload_dir: PathBuf,
}

impl AttachmentStore {
    pub fn open(upload_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let upload_dir = upload_dir.into();
        fs::create_dir_all(&upload_dir)?;
        Ok(Self { upload_dir })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Copy `source` into the upload directory as `<ack_no><ext>`, keeping
    /// the source's extension. Returns the stored path.
    pub fn import(&self, ack_no: &str, source: &Path) -> io::Result<PathBuf> {
        let bytes = fs::read(source)?;
        let ext = source.extension().and_then(|e| e.to_str());
        let target = self.write_unique(ack_no, ext, &bytes)?;
        tracing::debug!(source = %source.display(), target = %target.display(), "imported attachment");
        Ok(target)
    }

    /// Store `bytes` as a new version of the attachment for `ack_no`. Earlier
    /// versions stay on disk, since undo may point a record back at them.
    /// A missing extension stores as `.txt`.
    pub fn replace(&self, ack_no: &str, ext: Option<&str>, bytes: &[u8]) -> io::Result<PathBuf> {
        let target = self.write_unique(ack_no, Some(ext.unwrap_or("txt")), bytes)?;
        tracing::debug!(target = %target.display(), "replaced attachment");
        Ok(target)
    }

    /// Persist `bytes` under the first free name of `<stem>.<ext>`,
    /// `<stem>-1.<ext>`, `<stem>-2.<ext>`, ... Existing files are never
    /// overwritten.
    fn write_unique(&self, ack_no: &str, ext: Option<&str>, bytes: &[u8]) -> io::Result<PathBuf> {
        let stem = sanitize(ack_no);
        if stem.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "attachment needs an acknowledgment number",
            ));
        }
        let ext = ext.map(sanitize).filter(|e| !e.is_empty());

        let mut tmp = NamedTempFile::new_in(&self.upload_dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;

        for version in 0..MAX_VERSIONS {
            let name = match (version, &ext) {
                (0, Some(ext)) => format!("{stem}.{ext}"),
                (0, None) => stem.clone(),
                (n, Some(ext)) => format!("{stem}-{n}.{ext}"),
                (n, None) => format!("{stem}-{n}"),
            };
            let target = self.upload_dir.join(name);
            match tmp.persist_noclobber(&target) {
                Ok(_) => return Ok(target),
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => tmp = e.file,
                Err(e) => return Err(e.error),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free attachment name left for {stem}"),
        ))
    }
}

const MAX_VERSIONS: u32 = 10_000;

/// Keep ASCII letters, digits, `-` and `_`; everything else becomes `_`.
fn sanitize(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('.')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_names_file_after_acknowledgment() {
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::open(dir.path().join("uploads")).unwrap();
        let source = dir.path().join("scan.PDF");
        fs::write(&source, b"evidence").unwrap();

        let stored = store.import("ACK/2024 01", &source).unwrap();
        assert_eq!(stored, store.upload_dir().join("ACK_2024_01.PDF"));
        assert_eq!(fs::read(&stored).unwrap(), b"evidence");
        assert!(source.exists());
    }

    #[test]
    fn replace_keeps_earlier_versions() {
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::open(dir.path()).unwrap();
        let old = dir.path().join("ACK-1.png");
        fs::write(&old, b"old").unwrap();

        let new = store.replace("ACK-1", Some("jpg"), b"new").unwrap();
        assert_eq!(new, dir.path().join("ACK-1.jpg"));
        assert_eq!(fs::read(&new).unwrap(), b"new");
        assert_eq!(fs::read(&old).unwrap(), b"old");
    }

    #[test]
    fn taken_names_get_a_version_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::open(dir.path()).unwrap();
        let first = store.replace("ACK-1", None, b"one").unwrap();
        let second = store.replace("ACK-1", None, b"two").unwrap();
        let third = store.replace("ACK-1", Some("txt"), b"three").unwrap();

        assert_eq!(first, dir.path().join("ACK-1.txt"));
        assert_eq!(second, dir.path().join("ACK-1-1.txt"));
        assert_eq!(third, dir.path().join("ACK-1-2.txt"));
        assert_eq!(fs::read(&first).unwrap(), b"one");
        assert_eq!(fs::read(&second).unwrap(), b"two");
    }

    #[test]
    fn second_import_does_not_clobber_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::open(dir.path().join("uploads")).unwrap();
        let source = dir.path().join("scan.pdf");
        fs::write(&source, b"first").unwrap();
        let first = store.import("ACK-1", &source).unwrap();
        fs::write(&source, b"second").unwrap();
        let second = store.import("ACK-1", &source).unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read(&first).unwrap(), b"first");
        assert_eq!(fs::read(&second).unwrap(), b"second");
    }

    #[test]
    fn blank_acknowledgment_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::open(dir.path()).unwrap();

        let err = store.replace("  ", Some("png"), b"new").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
