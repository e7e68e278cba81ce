//! Candidate classification.
//!
//! Runs both probe encodings against a candidate and folds the outcomes
//! into a single verdict. Nothing here can fail: every problem below this
//! layer already arrives as a `false` probe outcome.

use tracing::warn;

use crate::candidate::Candidate;
use crate::dns::{DEFAULT_QUERY_NAME, DnsQuery, RecordType};
use crate::probe::{ProbeMethod, Prober};

/// Capability determination for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub domain: String,
    pub suffix: String,
    /// True iff the POST or the GET probe got a DoH response.
    pub is_doh_capable: bool,
}

impl Verdict {
    /// Output line for this verdict, without the newline.
    pub fn line(&self) -> String {
        format!("{},{}", self.domain, self.suffix)
    }
}

/// What to ask the candidate resolvers.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub name: String,
    pub record_type: RecordType,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            name: DEFAULT_QUERY_NAME.to_string(),
            record_type: RecordType::A,
        }
    }
}

/// Classifier decides whether a candidate speaks DoH.
pub struct Classifier {
    prober: Prober,
    query: QuerySpec,
}

impl Classifier {
    pub fn new(prober: Prober, query: QuerySpec) -> Self {
        Self { prober, query }
    }

    /// Probe with POST, then GET, and combine the outcomes.
    ///
    /// A successful POST short-circuits the GET probe.
    pub async fn classify(&self, candidate: &Candidate) -> Verdict {
        let is_doh_capable = match DnsQuery::new(&self.query.name, self.query.record_type) {
            Ok(query) => {
                self.probe(candidate, ProbeMethod::Post, &query).await
                    || self.probe(candidate, ProbeMethod::Get, &query).await
            }
            Err(e) => {
                warn!("{}: cannot build query: {}", candidate, e);
                false
            }
        };

        Verdict {
            domain: candidate.host.clone(),
            suffix: candidate.suffix.clone(),
            is_doh_capable,
        }
    }

    async fn probe(&self, candidate: &Candidate, method: ProbeMethod, query: &DnsQuery) -> bool {
        self.prober
            .probe(&candidate.host, &candidate.suffix, method, query)
            .await
    }
}
