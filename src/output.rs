// Copyright (c) 2014-2016 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Write-once output files that only appear once they are complete.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// A file written under a temporary name next to `path` and renamed into place by `commit`.
///
/// Dropping it uncommitted removes the temporary, so a failed or cancelled run never leaves a
/// partial file behind.
pub struct OutputFile {
    writer: BufWriter<NamedTempFile>,
    path: PathBuf,
}

impl OutputFile {
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<OutputFile> {
        let path = path.as_ref().to_path_buf();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file = tempfile::Builder::new()
            .prefix(".ethpcm-")
            .suffix(".part")
            .tempfile_in(dir)?;
        Ok(OutputFile {
            writer: BufWriter::new(file),
            path,
        })
    }

    /// Final location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush everything to disk and move the file to its final name.
    pub fn commit(self) -> io::Result<PathBuf> {
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.as_file().sync_all()?;
        file.persist(&self.path)?;
        Ok(self.path)
    }
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn nothing_is_visible_until_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.txt");

        let mut out = OutputFile::create(&path).unwrap();
        out.write_all(b"3031 \n").unwrap();
        assert!(!path.exists());

        assert_eq!(out.commit().unwrap(), path);
        assert_eq!(fs::read(&path).unwrap(), b"3031 \n");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn dropped_output_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.wav");
        {
            let mut out = OutputFile::create(&path).unwrap();
            out.write_all(b"RIFF").unwrap();
        }
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_directory_fails_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/output.wav");
        assert!(OutputFile::create(&path).is_err());
    }
}
