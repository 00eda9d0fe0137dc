pub mod candidate;
pub mod consensus;
pub mod normalize;
pub mod policy;
pub mod rules;

pub use candidate::{Candidate, CandidateError};
pub use consensus::{AcceptedIds, CandidateTally, Consensus, ConsensusReport, PrefixGroups, Selection};
pub use normalize::{LineNormalizer, Rejection};
pub use policy::{ConsensusPolicy, PolicyError, Scope, Settings, Strictness, Tier};

/// Normalize `lines` and aggregate them under the default policy.
pub fn extract_ids<I, S>(lines: I, scope: Scope, strictness: Strictness) -> AcceptedIds
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Consensus::default().aggregate_lines(lines, scope, strictness)
}
