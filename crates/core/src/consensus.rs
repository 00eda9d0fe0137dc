use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::candidate::Candidate;
use crate::normalize::LineNormalizer;
use crate::policy::{ConsensusPolicy, Scope, Strictness};

/// Occurrence count of every distinct candidate in one aggregation scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CandidateTally(BTreeMap<Candidate, usize>);

impl CandidateTally {
    pub fn count(&self, candidate: &Candidate) -> usize {
        self.0.get(candidate).copied().unwrap_or(0)
    }

    /// Number of distinct candidates.
    pub fn distinct(&self) -> usize {
        self.0.len()
    }

    /// Number of observations across all candidates.
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Candidate, usize)> {
        self.0.iter().map(|(c, n)| (c, *n))
    }

    pub fn add(&mut self, candidate: Candidate) {
        *self.0.entry(candidate).or_insert(0) += 1;
    }

    /// Distinct-candidate count per five-character prefix.
    pub fn prefix_groups(&self) -> PrefixGroups {
        let mut groups = BTreeMap::new();
        for candidate in self.0.keys() {
            *groups.entry(candidate.group_prefix().to_string()).or_insert(0) += 1;
        }
        PrefixGroups(groups)
    }
}

impl FromIterator<Candidate> for CandidateTally {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut tally = CandidateTally::default();
        for c in iter {
            tally.add(c);
        }
        tally
    }
}

/// Prefix (`NG` + three digits) to number of distinct candidates sharing it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PrefixGroups(BTreeMap<String, usize>);

impl PrefixGroups {
    pub fn get(&self, prefix: &str) -> usize {
        self.0.get(prefix).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(p, n)| (p.as_str(), *n))
    }

    /// Prefix with the most distinct candidates; ties go to the smallest prefix
    /// so the answer never depends on input order.
    pub fn largest(&self) -> Option<(&str, usize)> {
        self.iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
    }
}

/// The identifiers judged trustworthy, sorted and deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AcceptedIds(BTreeSet<Candidate>);

impl AcceptedIds {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, candidate: &Candidate) -> bool {
        self.0.contains(candidate)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.0.iter()
    }

    pub fn is_subset(&self, other: &AcceptedIds) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.0.into_iter().collect()
    }
}

impl FromIterator<Candidate> for AcceptedIds {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        AcceptedIds(iter.into_iter().collect())
    }
}

impl Extend<Candidate> for AcceptedIds {
    fn extend<I: IntoIterator<Item = Candidate>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for AcceptedIds {
    type Item = Candidate;
    type IntoIter = std::collections::btree_set::IntoIter<Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a AcceptedIds {
    type Item = &'a Candidate;
    type IntoIter = std::collections::btree_set::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Which rule produced the accepted set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Candidates of the dominant prefix seen at least `min_count` times.
    DominantPrefix,
    /// No prefix dominated; candidates seen at least `fallback_count` times.
    Fallback,
}

/// Everything the aggregator looked at, plus its decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusReport {
    pub scope: Scope,
    pub strictness: Strictness,
    pub tally: CandidateTally,
    pub prefixes: PrefixGroups,
    pub dominant_prefix: Option<String>,
    pub selection: Selection,
    pub accepted: AcceptedIds,
}

/// Frequency-based consensus over the candidates of one aggregation scope.
#[derive(Debug, Clone, Default)]
pub struct Consensus {
    policy: ConsensusPolicy,
}

impl Consensus {
    pub fn new(policy: ConsensusPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ConsensusPolicy {
        &self.policy
    }

    /// Accepted identifiers for a multiset of candidates.
    pub fn aggregate<I>(&self, candidates: I, scope: Scope, strictness: Strictness) -> AcceptedIds
    where
        I: IntoIterator<Item = Candidate>,
    {
        self.report(candidates, scope, strictness).accepted
    }

    /// Normalize raw lines, then aggregate the candidates they yield.
    pub fn aggregate_lines<I, S>(&self, lines: I, scope: Scope, strictness: Strictness) -> AcceptedIds
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.aggregate(LineNormalizer::normalize_all(lines), scope, strictness)
    }

    pub fn report<I>(&self, candidates: I, scope: Scope, strictness: Strictness) -> ConsensusReport
    where
        I: IntoIterator<Item = Candidate>,
    {
        let tally: CandidateTally = candidates.into_iter().collect();
        let prefixes = tally.prefix_groups();
        let dominant_prefix = self.dominant_prefix(&tally, &prefixes, scope);
        let tier = self.policy.tier(strictness);

        let (selection, accepted): (Selection, AcceptedIds) = match dominant_prefix.as_deref() {
            Some(prefix) => (
                Selection::DominantPrefix,
                tally
                    .iter()
                    .filter(|(c, n)| c.group_prefix() == prefix && *n >= tier.min_count)
                    .map(|(c, _)| c.clone())
                    .collect(),
            ),
            None => (
                Selection::Fallback,
                tally
                    .iter()
                    .filter(|(_, n)| *n >= tier.fallback_count)
                    .map(|(c, _)| c.clone())
                    .collect(),
            ),
        };

        ConsensusReport {
            scope,
            strictness,
            tally,
            prefixes,
            dominant_prefix,
            selection,
            accepted,
        }
    }

    fn dominant_prefix(
        &self,
        tally: &CandidateTally,
        prefixes: &PrefixGroups,
        scope: Scope,
    ) -> Option<String> {
        let total = tally.distinct();
        let (prefix, count) = prefixes.largest()?;
        let ratio = count as f64 / total as f64;
        (ratio >= self.policy.dominance_ratio(scope)).then(|| prefix.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> Candidate {
        s.parse().unwrap()
    }

    fn repeat(pairs: &[(&str, usize)]) -> Vec<Candidate> {
        pairs
            .iter()
            .flat_map(|(s, n)| std::iter::repeat(c(s)).take(*n))
            .collect()
    }

    fn ids(accepted: &AcceptedIds) -> Vec<&str> {
        accepted.iter().map(Candidate::as_str).collect()
    }

    const FLAGS: [(Scope, Strictness); 4] = [
        (Scope::PerImage, Strictness::Relaxed),
        (Scope::PerImage, Strictness::Strict),
        (Scope::Batch, Strictness::Relaxed),
        (Scope::Batch, Strictness::Strict),
    ];

    #[test]
    fn tally_counts_and_groups() {
        let tally: CandidateTally =
            repeat(&[("NG0130001", 3), ("NG0130002", 1), ("NG9990000", 2)]).into_iter().collect();
        assert_eq!(tally.distinct(), 3);
        assert_eq!(tally.total(), 6);
        assert_eq!(tally.count(&c("NG0130001")), 3);
        assert_eq!(tally.count(&c("NG1110000")), 0);

        let groups = tally.prefix_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.get("NG013"), 2);
        assert_eq!(groups.get("NG999"), 1);
        assert_eq!(groups.largest(), Some(("NG013", 2)));
    }

    #[test]
    fn empty_input_gives_empty_set_for_all_flags() {
        let consensus = Consensus::default();
        for (scope, strictness) in FLAGS {
            let report = consensus.report(Vec::new(), scope, strictness);
            assert!(report.accepted.is_empty());
            assert!(report.tally.is_empty());
            assert!(report.prefixes.is_empty());
            assert_eq!(report.dominant_prefix, None);
            assert_eq!(report.selection, Selection::Fallback);
        }
    }

    #[test]
    fn dominant_prefix_filters_minority_candidates() {
        let candidates = repeat(&[
            ("NG0130001", 3),
            ("NG0130002", 3),
            ("NG0130003", 1),
            ("NG9990000", 1),
        ]);
        let report = Consensus::default().report(candidates, Scope::PerImage, Strictness::Relaxed);
        assert_eq!(report.dominant_prefix.as_deref(), Some("NG013"));
        assert_eq!(report.selection, Selection::DominantPrefix);
        assert_eq!(ids(&report.accepted), vec!["NG0130001", "NG0130002"]);
        assert!(report.accepted.contains(&c("NG0130001")));
        assert!(!report.accepted.contains(&c("NG0130003")));
        assert!(!report.accepted.contains(&c("NG9990000")));
    }

    #[test]
    fn dominant_prefix_discards_frequent_outsiders() {
        let candidates = repeat(&[
            ("NG0130001", 2),
            ("NG0130002", 2),
            ("NG0130003", 2),
            ("NG9990000", 9),
        ]);
        let accepted = Consensus::default().aggregate(candidates, Scope::Batch, Strictness::Relaxed);
        assert_eq!(ids(&accepted), vec!["NG0130001", "NG0130002", "NG0130003"]);
    }

    #[test]
    fn strict_raises_min_count() {
        let candidates = repeat(&[("NG0130001", 3), ("NG0130002", 2)]);
        let consensus = Consensus::default();
        let relaxed = consensus.aggregate(candidates.clone(), Scope::PerImage, Strictness::Relaxed);
        let strict = consensus.aggregate(candidates, Scope::PerImage, Strictness::Strict);
        assert_eq!(ids(&relaxed), vec!["NG0130001", "NG0130002"]);
        assert_eq!(ids(&strict), vec!["NG0130001"]);
    }

    #[test]
    fn fallback_path_uses_raw_counts() {
        // Four prefixes with one distinct candidate each: 0.25 < 0.5.
        let candidates = repeat(&[
            ("NG1110000", 4),
            ("NG2220000", 3),
            ("NG3330000", 5),
            ("NG4440000", 1),
        ]);
        let consensus = Consensus::default();
        let report = consensus.report(candidates.clone(), Scope::PerImage, Strictness::Relaxed);
        assert_eq!(report.dominant_prefix, None);
        assert_eq!(report.selection, Selection::Fallback);
        assert_eq!(ids(&report.accepted), vec!["NG1110000", "NG3330000"]);

        let strict = consensus.aggregate(candidates, Scope::PerImage, Strictness::Strict);
        assert_eq!(ids(&strict), vec!["NG3330000"]);
    }

    #[test]
    fn batch_scope_needs_larger_share() {
        // NG013 holds exactly half the distinct candidates.
        let candidates = repeat(&[
            ("NG0130001", 2),
            ("NG0130002", 2),
            ("NG5550001", 4),
            ("NG7770001", 1),
        ]);
        let consensus = Consensus::default();

        let per_image = consensus.report(candidates.clone(), Scope::PerImage, Strictness::Relaxed);
        assert_eq!(per_image.dominant_prefix.as_deref(), Some("NG013"));
        assert_eq!(ids(&per_image.accepted), vec!["NG0130001", "NG0130002"]);

        let batch = consensus.report(candidates, Scope::Batch, Strictness::Relaxed);
        assert_eq!(batch.dominant_prefix, None);
        assert_eq!(ids(&batch.accepted), vec!["NG5550001"]);
    }

    #[test]
    fn ratio_exactly_at_batch_threshold_dominates() {
        // 3 of 5 distinct candidates share NG013: ratio 0.6.
        let candidates = repeat(&[
            ("NG0130001", 2),
            ("NG0130002", 2),
            ("NG0130003", 2),
            ("NG1110000", 2),
            ("NG2220000", 2),
        ]);
        let report = Consensus::default().report(candidates, Scope::Batch, Strictness::Relaxed);
        assert_eq!(report.dominant_prefix.as_deref(), Some("NG013"));
    }

    #[test]
    fn single_candidate_dominates_itself() {
        let accepted = Consensus::default().aggregate(
            repeat(&[("NG0134567", 2)]),
            Scope::Batch,
            Strictness::Relaxed,
        );
        assert_eq!(ids(&accepted), vec!["NG0134567"]);

        let once = Consensus::default().aggregate(
            repeat(&[("NG0134567", 1)]),
            Scope::Batch,
            Strictness::Relaxed,
        );
        assert!(once.is_empty());
    }

    #[test]
    fn tied_prefixes_resolve_independent_of_order() {
        // Two prefixes, one distinct candidate each: both sit at ratio 0.5.
        let forward = repeat(&[("NG9990000", 5), ("NG0130001", 5)]);
        let mut backward = forward.clone();
        backward.reverse();

        let consensus = Consensus::default();
        let a = consensus.report(forward, Scope::PerImage, Strictness::Relaxed);
        let b = consensus.report(backward, Scope::PerImage, Strictness::Relaxed);

        assert_eq!(a.dominant_prefix.as_deref(), Some("NG013"));
        assert_eq!(a.accepted, b.accepted);
        assert_eq!(ids(&a.accepted), vec!["NG0130001"]);
    }

    #[test]
    fn strict_result_is_subset_of_relaxed() {
        let pools = [
            repeat(&[("NG0130001", 3), ("NG0130002", 2), ("NG9990000", 6)]),
            repeat(&[("NG1110000", 4), ("NG2220000", 5), ("NG3330000", 7)]),
            repeat(&[("NG0130001", 1), ("NG0130002", 4), ("NG0130003", 2)]),
            repeat(&[("NG0130001", 2), ("NG5550001", 2)]),
        ];
        let consensus = Consensus::default();
        for pool in pools {
            for scope in [Scope::PerImage, Scope::Batch] {
                let relaxed = consensus.aggregate(pool.clone(), scope, Strictness::Relaxed);
                let strict = consensus.aggregate(pool.clone(), scope, Strictness::Strict);
                assert!(strict.is_subset(&relaxed), "{scope}: {strict:?} not in {relaxed:?}");
            }
        }
    }

    #[test]
    fn accepted_ids_come_from_the_tally() {
        let lines = [
            "NGOIS4567890",
            "NG0134567",
            "NG 013 4567",
            "NG0134568",
            "noise",
            "MG9990000",
        ];
        let consensus = Consensus::default();
        for (scope, strictness) in FLAGS {
            let candidates = LineNormalizer::normalize_all(lines);
            let report = consensus.report(candidates, scope, strictness);
            let tier = consensus.policy().tier(strictness);
            for id in &report.accepted {
                assert!(report.tally.count(id) >= tier.min_count);
                assert_eq!(id.as_str().len(), 9);
                assert!(id.digits().chars().all(|ch| ch.is_ascii_digit()));
            }
        }
    }

    #[test]
    fn aggregate_lines_runs_the_whole_core() {
        let lines = [
            "NGOIS4567890",
            "NG O134567",
            "ng-013-4567",
            "NG0134568",
            "W60139999",
        ];
        let accepted =
            Consensus::default().aggregate_lines(lines, Scope::PerImage, Strictness::Strict);
        assert_eq!(ids(&accepted), vec!["NG0134567"]);
    }

    #[test]
    fn report_serializes_as_plain_maps() {
        let report = Consensus::default().report(
            repeat(&[("NG0130001", 2)]),
            Scope::PerImage,
            Strictness::Relaxed,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["tally"]["NG0130001"], 2);
        assert_eq!(json["prefixes"]["NG013"], 1);
        assert_eq!(json["dominant_prefix"], "NG013");
        assert_eq!(json["selection"], "dominant_prefix");
        assert_eq!(json["scope"], "per-image");
        assert_eq!(json["accepted"][0], "NG0130001");
    }
}
