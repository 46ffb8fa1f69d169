//! Pages served from a RAR (`.rar`/`.cbr`) archive.
//!
//! There is no RAR decoder in this crate. The archive is unpacked once, at
//! open time, by whichever external extraction tool is installed into a
//! private temporary directory, which is then served like a folder book.

use crate::BookType;
use crate::directory::{list_images, read_image_file};
use crate::error::{ErrorKind, Result};
use crate::open::ExtractOptions;
use crate::source::{Entry, PageSource, entry_at};
use exn::ResultExt;
use parking_lot::Mutex;
use std::ffi::OsString;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use tempfile::TempDir;
use tracing::instrument;

/// Install locations checked when a tool is not on `PATH` (package managers
/// on macOS do not always put these on a GUI application's `PATH`).
const WELL_KNOWN_DIRS: [&str; 2] = ["/usr/local/bin", "/opt/homebrew/bin"];

/// An external program able to unpack RAR archives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RarTool {
    /// `unar` from The Unarchiver (RAR4 and RAR5)
    Unar,
    /// `7z` from p7zip / 7-Zip
    SevenZip,
    /// `unrar` from RARLAB
    Unrar,
}

impl RarTool {
    /// Default preference order.
    pub const ALL: [RarTool; 3] = [RarTool::Unar, RarTool::SevenZip, RarTool::Unrar];

    /// Executable name looked up on `PATH`.
    #[must_use]
    pub fn executable(&self) -> &'static str {
        match self {
            RarTool::Unar => "unar",
            RarTool::SevenZip => "7z",
            RarTool::Unrar => "unrar",
        }
    }

    /// Command-line arguments extracting `archive` into `destination`.
    fn arguments(&self, archive: &Path, destination: &Path) -> Vec<OsString> {
        match self {
            RarTool::Unar => vec!["-o".into(), destination.into(), archive.into()],
            RarTool::SevenZip => {
                let mut output = OsString::from("-o");
                output.push(destination);
                vec!["x".into(), output, archive.into()]
            },
            RarTool::Unrar => {
                // unrar treats the destination as a directory only with a trailing separator.
                let mut output = destination.as_os_str().to_os_string();
                output.push(std::path::MAIN_SEPARATOR_STR);
                vec!["x".into(), "-o+".into(), archive.into(), output]
            },
        }
    }
}

impl Display for RarTool {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.pad(self.executable())
    }
}

impl FromStr for RarTool {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unar" => Ok(RarTool::Unar),
            "7z" | "7zip" | "7-zip" => Ok(RarTool::SevenZip),
            "unrar" => Ok(RarTool::Unrar),
            _ => exn::bail!(ErrorKind::extraction(format!("unknown RAR extraction tool: {s}"))),
        }
    }
}

/// A located, runnable extraction tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Extractor {
    pub(crate) tool: RarTool,
    pub(crate) program: PathBuf,
}

impl Extractor {
    /// Find every preferred tool that is installed, keeping preference order.
    ///
    /// Each tool is searched in the configured directories, then on `PATH`,
    /// then in [`WELL_KNOWN_DIRS`].
    pub(crate) fn discover(options: &ExtractOptions) -> Vec<Self> {
        Self::discover_with(&options.rar_tools, |tool| {
            let exe = tool.executable();
            options
                .tool_dirs
                .iter()
                .map(|dir| dir.join(exe))
                .find(|candidate| candidate.is_file())
                .or_else(|| which::which(exe).ok())
                .or_else(|| WELL_KNOWN_DIRS.iter().map(|dir| Path::new(dir).join(exe)).find(|c| c.is_file()))
        })
    }

    fn discover_with(preferences: &[RarTool], locate: impl Fn(RarTool) -> Option<PathBuf>) -> Vec<Self> {
        let mut found: Vec<Self> = Vec::new();
        for &tool in preferences {
            if found.iter().any(|e| e.tool == tool) {
                continue;
            }
            match locate(tool) {
                Some(program) => {
                    tracing::trace!(tool = %tool, program = %program.display(), "Found RAR extraction tool");
                    found.push(Self { tool, program });
                },
                None => tracing::trace!(tool = %tool, "RAR extraction tool not installed"),
            }
        }
        found
    }

    /// Run the tool; `Ok(())` only on a zero exit status.
    fn run(&self, archive: &Path, destination: &Path) -> Result<()> {
        let status = Command::new(&self.program)
            .args(self.tool.arguments(archive, destination))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .or_raise(|| ErrorKind::extraction(format!("failed to launch {}", self.program.display())))?;
        if !status.success() {
            exn::bail!(ErrorKind::extraction(format!("{} exited with {status}", self.tool)));
        }
        Ok(())
    }
}

/// Unpack `archive` with the first tool that succeeds.
///
/// Every attempt gets a fresh directory; whatever a failed tool left behind
/// is deleted with its directory and never becomes a page.
fn extract_with(extractors: &[Extractor], archive: &Path, options: &ExtractOptions) -> Result<(RarTool, TempDir)> {
    if extractors.is_empty() {
        exn::bail!(ErrorKind::extraction("no RAR extraction tool found; install one of: unar, 7z, unrar"));
    }
    let mut last_failure = None;
    for extractor in extractors {
        let workdir = options.temporary_directory()?;
        match extractor.run(archive, workdir.path()) {
            Ok(()) => return Ok((extractor.tool, workdir)),
            Err(err) => {
                tracing::info!(tool = %extractor.tool, error = %*err, "RAR extraction failed; trying next tool");
                last_failure = Some(err);
            },
        }
    }
    match last_failure {
        Some(err) => Err(err),
        None => exn::bail!(ErrorKind::extraction("RAR extraction failed")),
    }
}

/// A book stored as a RAR archive, unpacked to a temporary directory.
///
/// The temporary directory is removed by [`close`](PageSource::close) or
/// when the source is dropped, whichever happens first.
#[derive(Debug)]
pub struct RarPageSource {
    path: PathBuf,
    tool: RarTool,
    workdir: Mutex<Option<TempDir>>,
    entries: Vec<Entry>,
}

impl RarPageSource {
    /// Unpack `path` and index the extracted images.
    ///
    /// # Errors
    /// - [`ArchiveNotFound`](ErrorKind::ArchiveNotFound) if nothing exists at `path`
    /// - [`ExtractionFailed`](ErrorKind::ExtractionFailed) if no tool is installed,
    ///   every tool fails, or the archive holds no images
    #[instrument(skip_all, fields(path = %path.as_ref().display(), tool, pages))]
    pub fn open(path: impl AsRef<Path>, options: &ExtractOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            exn::bail!(ErrorKind::ArchiveNotFound(path));
        }
        let extractors = Extractor::discover(options);
        let (tool, workdir) = extract_with(&extractors, &path, options)?;
        tracing::Span::current().record("tool", tool.executable());
        let entries = list_images(workdir.path());
        if entries.is_empty() {
            exn::bail!(ErrorKind::extraction("no images"));
        }
        tracing::Span::current().record("pages", entries.len());
        Ok(Self { path, tool, workdir: Mutex::new(Some(workdir)), entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The tool that unpacked this archive.
    pub fn tool(&self) -> RarTool {
        self.tool
    }
}

impl PageSource for RarPageSource {
    fn kind(&self) -> BookType {
        BookType::Rar
    }

    fn entries(&self) -> &[Entry] {
        &self.entries
    }

    fn fetch_page(&self, index: usize) -> Result<Vec<u8>> {
        let entry = entry_at(&self.entries, index)?;
        // Held for the read so close() cannot delete the file underneath it.
        let guard = self.workdir.lock();
        if guard.is_none() {
            exn::bail!(ErrorKind::extraction(format!("{}: archive is closed", self.path.display())));
        }
        read_image_file(entry)
    }

    fn close(&self) {
        let Some(workdir) = self.workdir.lock().take() else {
            return;
        };
        let location = workdir.path().to_path_buf();
        if let Err(err) = workdir.close() {
            tracing::warn!(path = %location.display(), error = %err, "Failed to remove extracted RAR pages");
        }
    }
}
