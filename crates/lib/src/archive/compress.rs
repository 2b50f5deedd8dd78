//! Compression of archived revisions.

use std::ffi::OsString;
use std::fmt::Debug;
use std::io::{self, Seek, SeekFrom, Write};
use std::process::{Command, Stdio};

use tracing::debug;

/// Compresses and decompresses archived revisions.
pub trait Compressor: Send + Sync + Debug {
    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>>;

    /// Fails when `data` is not something [`Compressor::compress`] produced.
    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>>;
}

/// Runs the system `gzip` binary.
///
/// `-n` keeps the name and timestamp out of the header, so compressing the
/// same text twice yields the same bytes.
#[derive(Debug, Clone)]
pub struct GzipCommand {
    program: OsString,
}

impl Default for GzipCommand {
    fn default() -> Self {
        Self::new("gzip")
    }
}

impl GzipCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&str], data: &[u8]) -> io::Result<Vec<u8>> {
        // Feed stdin from a file so a large input cannot block on a full pipe.
        let mut input = tempfile::tempfile()?;
        input.write_all(data)?;
        input.seek(SeekFrom::Start(0))?;

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::from(input))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        debug!(program = ?self.program, ?args, status = %output.status, "gzip finished");
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "gzip {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl Compressor for GzipCommand {
    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        self.run(&["-c", "-n"], data)
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        self.run(&["-d", "-c"], data)
    }
}
