//! Candidate list parsing.
//!
//! Input is one `host,suffix` pair per line. A first line without any `.` is
//! taken to be a header row and dropped. That check is a heuristic: a bare
//! hostname in the first row is mistaken for a header, and a header that
//! happens to contain a dot is probed as a host.

use std::fmt;
use std::io::{self, BufRead};

use tracing::warn;

/// One host and URI suffix to probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub host: String,
    /// Path after the host, exactly as given; empty means the root path.
    pub suffix: String,
}

impl Candidate {
    pub fn new(host: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            suffix: suffix.into(),
        }
    }

    /// Parse a single `host,suffix` line.
    ///
    /// Returns `None` for lines without a comma or with an empty host.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (host, suffix) = line.split_once(',')?;
        let host = host.trim();
        if host.is_empty() {
            return None;
        }

        Some(Self::new(host, suffix))
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.host, self.suffix)
    }
}

/// Lazily turns input lines into candidates.
///
/// Blank lines are ignored; malformed lines (including ones that are not
/// UTF-8) are logged and counted. An I/O error ends iteration and is kept
/// for [`CandidateReader::take_error`].
pub struct CandidateReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    skipped: usize,
    error: Option<io::Error>,
}

impl<R: BufRead> CandidateReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
            skipped: 0,
            error: None,
        }
    }

    /// Number of malformed lines skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// The I/O error that stopped iteration, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    fn skip(&mut self, reason: &str) {
        self.skipped += 1;
        warn!(
            "skipping malformed line {} ({}): {:?}",
            self.line_no,
            reason,
            String::from_utf8_lossy(&self.buf)
        );
    }
}

impl<R: BufRead> Iterator for CandidateReader<R> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        if self.error.is_some() {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("input read error after line {}: {}", self.line_no, e);
                    self.error = Some(e);
                    return None;
                }
            }
            self.line_no += 1;

            if self.line_no == 1 && !self.buf.contains(&b'.') {
                continue;
            }

            let parsed = match std::str::from_utf8(&self.buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => Candidate::parse_line(line).ok_or("expected host,suffix"),
                Err(_) => Err("not UTF-8"),
            };

            match parsed {
                Ok(candidate) => return Some(candidate),
                Err(reason) => self.skip(reason),
            }
        }
    }
}

/// Parse every candidate from `reader`, failing on the first I/O error.
pub fn read_candidates<R: BufRead>(reader: R) -> io::Result<Vec<Candidate>> {
    let mut reader = CandidateReader::new(reader);
    let candidates = reader.by_ref().collect();
    match reader.take_error() {
        Some(e) => Err(e),
        None => Ok(candidates),
    }
}
