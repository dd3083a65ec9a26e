//! Sinkhole detection.
//!
//! Before an endpoint takes real jobs we ask it about a handful of random
//! names that cannot exist. Whatever it answers for those is its baseline:
//! an honest resolver answers nothing, a hijacking one hands back its
//! sinkhole addresses.

use rand::Rng;
use std::net::SocketAddr;

use crate::answer::{AnswerSet, equals};
use crate::error::ProbeError;
use crate::transport::{Lookup, lookup_with_attempts};

const LABEL_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789-";
const MIN_LABEL_LEN: usize = 10;
const MAX_LABEL_LEN: usize = 19;

/// Addresses an endpoint returns for names that do not exist.
pub type Baseline = AnswerSet;

/// How probe answers are folded into a baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BaselinePolicy {
    /// The answer of the first probe that returned anything. Probes after
    /// it are ignored, even if they disagree.
    #[default]
    FirstNonEmpty,
    /// The non-empty answer seen most often; ties go to the earliest.
    Consensus,
}

impl BaselinePolicy {
    pub fn pick(self, answers: &[AnswerSet]) -> Baseline {
        let mut candidates = answers.iter().filter(|a| !a.is_empty());

        match self {
            BaselinePolicy::FirstNonEmpty => candidates.next().cloned().unwrap_or_default(),
            BaselinePolicy::Consensus => {
                let mut best: Option<(&AnswerSet, usize)> = None;
                for candidate in candidates {
                    let count = answers.iter().filter(|a| equals(a, candidate)).count();
                    if best.is_none_or(|(_, n)| count > n) {
                        best = Some((candidate, count));
                    }
                }
                best.map(|(set, _)| set.clone()).unwrap_or_default()
            }
        }
    }
}

/// A random single label, 10 to 19 characters of `[a-z0-9-]`.
pub fn random_label<R: Rng + ?Sized>(rng: &mut R) -> String {
    let len = rng.random_range(MIN_LABEL_LEN..=MAX_LABEL_LEN);
    (0..len)
        .map(|_| LABEL_CHARS[rng.random_range(0..LABEL_CHARS.len())] as char)
        .collect()
}

/// Learns the baseline of one endpoint.
pub struct BaselineProber<'a> {
    lookup: &'a dyn Lookup,
    probe_count: usize,
    attempts: usize,
    policy: BaselinePolicy,
}

impl<'a> BaselineProber<'a> {
    pub fn new(
        lookup: &'a dyn Lookup,
        probe_count: usize,
        attempts: usize,
        policy: BaselinePolicy,
    ) -> Self {
        Self {
            lookup,
            probe_count,
            attempts,
            policy,
        }
    }

    /// Query `probe_count` random names at `endpoint` and derive its
    /// baseline. The first probe that cannot be answered fails the whole
    /// probe for this endpoint.
    pub async fn probe<R: Rng + ?Sized>(
        &self,
        endpoint: SocketAddr,
        rng: &mut R,
    ) -> Result<Baseline, ProbeError> {
        let labels: Vec<String> = (0..self.probe_count).map(|_| random_label(rng)).collect();
        let mut answers = Vec::with_capacity(labels.len());

        for label in labels {
            match lookup_with_attempts(self.lookup, endpoint, &label, self.attempts).await {
                Ok(answer) => {
                    tracing::debug!(%endpoint, %label, answer = %answer, "probe answered");
                    answers.push(answer);
                }
                Err(source) => return Err(ProbeError { label, source }),
            }
        }

        Ok(self.policy.pick(&answers))
    }
}
