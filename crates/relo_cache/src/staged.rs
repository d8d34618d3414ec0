//! Staged, atomically committed outputs.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use relo_common::ContentHash;
use tempfile::NamedTempFile;

use crate::digest::{Digester, HashAlgorithm};
use crate::error::CacheError;
use crate::stamp::{append_extension, InputStamp};

/// An output being written to a temporary file next to its target.
///
/// Bytes written through the [`Write`] impl are digested on the fly.
/// [`StagedOutput::commit`] renames the file over the target and only then
/// records the sidecar and stamp. Dropping an uncommitted output deletes the
/// temporary file and leaves the target untouched.
pub struct StagedOutput {
    target: PathBuf,
    file: NamedTempFile,
    digester: Digester,
    algorithm: HashAlgorithm,
    written: u64,
}

impl StagedOutput {
    pub(crate) fn create(target: &Path, algorithm: HashAlgorithm) -> Result<Self, CacheError> {
        let dir = parent_dir(target);
        std::fs::create_dir_all(dir).map_err(|e| CacheError::io(dir, e))?;
        let file = tempfile::Builder::new()
            .prefix(".relo-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| CacheError::io(dir, e))?;
        Ok(Self {
            target: target.to_path_buf(),
            file,
            digester: algorithm.digester(),
            algorithm,
            written: 0,
        })
    }

    /// The final path of this output.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Number of bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Moves the staged file into place and records its integrity sidecar and
    /// input stamp. Returns the hex digest of the committed file.
    pub fn commit(mut self, fingerprint: &ContentHash) -> Result<String, CacheError> {
        self.file
            .flush()
            .map_err(|e| CacheError::io(self.file.path(), e))?;
        let digest = self.digester.finish_hex();

        set_published_mode(&self.file)?;
        self.file
            .persist(&self.target)
            .map_err(|e| CacheError::Persist {
                path: self.target.clone(),
                source: e.error,
            })?;

        let sidecar = append_extension(&self.target, self.algorithm.extension());
        write_atomic(&sidecar, format!("{digest}\n").as_bytes())?;
        let stamp = InputStamp::new(fingerprint).to_json()?;
        write_atomic(&InputStamp::path_for(&self.target), stamp.as_bytes())?;

        tracing::trace!(path = %self.target.display(), bytes = self.written, "committed output");
        Ok(digest)
    }
}

impl Write for StagedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        self.digester.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Writes a small file via a temporary file and rename.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CacheError> {
    let dir = parent_dir(path);
    let mut file = NamedTempFile::new_in(dir).map_err(|e| CacheError::io(dir, e))?;
    file.write_all(contents)
        .map_err(|e| CacheError::io(file.path(), e))?;
    set_published_mode(&file)?;
    file.persist(path).map_err(|e| CacheError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Temporary files are created `0600`; committed outputs are shared, so they
/// are widened to `0644` before the rename.
#[cfg(unix)]
fn set_published_mode(file: &NamedTempFile) -> Result<(), CacheError> {
    use std::os::unix::fs::PermissionsExt;

    file.as_file()
        .set_permissions(std::fs::Permissions::from_mode(0o644))
        .map_err(|e| CacheError::io(file.path(), e))
}

#[cfg(not(unix))]
fn set_published_mode(_file: &NamedTempFile) -> Result<(), CacheError> {
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_writes_target_sidecar_and_stamp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out.jar");
        let mut staged = StagedOutput::create(&target, HashAlgorithm::Sha256).unwrap();
        staged.write_all(b"payload").unwrap();
        assert_eq!(staged.bytes_written(), 7);
        assert!(!target.exists());

        let fp = ContentHash::from_bytes(b"fp");
        let digest = staged.commit(&fp).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"payload");
        assert_eq!(digest, HashAlgorithm::Sha256.digest_bytes(b"payload"));

        let sidecar = std::fs::read_to_string(dir.path().join("nested/out.jar.sha256")).unwrap();
        assert_eq!(sidecar.trim(), digest);
        assert!(InputStamp::load(&target).unwrap().matches(&fp));
    }

    #[test]
    fn dropping_uncommitted_output_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.jar");
        {
            let mut staged = StagedOutput::create(&target, HashAlgorithm::Sha512).unwrap();
            staged.write_all(b"partial").unwrap();
        }
        assert!(!target.exists());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn committed_files_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.jar");
        let mut staged = StagedOutput::create(&target, HashAlgorithm::Sha512).unwrap();
        staged.write_all(b"shared").unwrap();
        staged.commit(&ContentHash::from_bytes(b"fp")).unwrap();

        for path in [
            target.clone(),
            dir.path().join("out.jar.sha512"),
            InputStamp::path_for(&target),
        ] {
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o644, "{}", path.display());
        }
    }

    #[test]
    fn commit_replaces_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.jar");
        std::fs::write(&target, b"old").unwrap();
        let mut staged = StagedOutput::create(&target, HashAlgorithm::Sha512).unwrap();
        staged.write_all(b"new").unwrap();
        staged.commit(&ContentHash::from_bytes(b"x")).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }
}
