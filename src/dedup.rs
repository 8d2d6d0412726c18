//! Three-stage duplicate funnel over validated records.
//!
//! Stages run in order (ad id, then ad group, then ad text) and each keeps
//! the first record seen for a key. A record with no ad group is never
//! collapsed by the group stage.

use std::collections::HashSet;
use std::hash::Hash;

use tracing::info;

use crate::model::NormalizedAd;

/// Survivor counts after each stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DedupStats {
    pub input: usize,
    pub after_ad_id: usize,
    pub after_ad_group: usize,
    pub after_ad_text: usize,
}

fn keep_first_by<K, F>(records: Vec<NormalizedAd>, key: F) -> Vec<NormalizedAd>
where
    K: Eq + Hash,
    F: Fn(&NormalizedAd) -> Option<K>,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| match key(record) {
            Some(k) => seen.insert(k),
            None => true,
        })
        .collect()
}

pub fn deduplicate(records: Vec<NormalizedAd>) -> (Vec<NormalizedAd>, DedupStats) {
    let input = records.len();

    let by_id = keep_first_by(records, |ad| Some(ad.ad_id.clone()));
    let after_ad_id = by_id.len();

    let by_group = keep_first_by(by_id, |ad| ad.ad_group_id.clone());
    let after_ad_group = by_group.len();

    let by_text = keep_first_by(by_group, |ad| Some(ad.ad_text.clone()));
    let after_ad_text = by_text.len();

    let stats = DedupStats {
        input,
        after_ad_id,
        after_ad_group,
        after_ad_text,
    };
    info!(
        "Duplicates removed, left {} ads (by id: {}, by group: {}, by text: {})",
        stats.after_ad_text, stats.after_ad_id, stats.after_ad_group, stats.after_ad_text
    );
    (by_text, stats)
}
