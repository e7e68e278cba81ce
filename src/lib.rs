//! dohscan - Discover DNS-over-HTTPS resolvers across large host lists.
//!
//! Each candidate `host,suffix` is probed with an RFC 8484 POST and GET
//! request; the verdict lands in one of two output files.

pub mod candidate;
pub mod classifier;
pub mod dispatch;
pub mod dns;
pub mod error;
pub mod partition;
pub mod probe;
pub mod scan;
pub mod stats;

pub use candidate::{Candidate, CandidateReader, read_candidates};
pub use classifier::{Classifier, QuerySpec, Verdict};
pub use dispatch::{Dispatcher, VerdictStream};
pub use error::{Error, Result};
pub use scan::{ScanConfig, ScanSummary};
