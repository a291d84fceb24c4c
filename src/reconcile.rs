//! Batch reconciliation: cache hits, one backend call for the misses,
//! reassembly in input order.
//!
//! # Algorithm
//!
//! 1. Fingerprint every text and issue all store lookups concurrently.
//! 2. Hits resolve immediately. Misses form the *miss list*, kept in input
//!    order together with each miss's original index.
//! 3. A non-empty miss list goes to the backend in exactly one call.
//! 4. The backend reply is forced to the miss-list length: extra lines are
//!    dropped, missing lines fall back to the source text itself.
//! 5. Fresh translations are written back concurrently; failed writes are
//!    logged by the store and otherwise ignored.
//! 6. Pending results are laid over the resolved slots at their original
//!    indices, so `output[i]` always answers `input[i]`.
//!
//! Nothing is written to the store when the backend call fails; already
//! cached hits are simply discarded with the failed request.

use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::backend::TranslationBackend;
use crate::cache::CacheStore;
use crate::fingerprint::{CacheKey, fingerprint_in};
use crate::telemetry;
use crate::types::RequestBatch;
use crate::{BragiError, Result};

/// Translations for a batch plus hit/miss counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// One translation per input text, in input order.
    pub translations: Vec<String>,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

/// Cache behaviour for one reconciliation.
#[derive(Debug, Clone, Copy)]
pub enum CachePolicy {
    /// Read hits from the store and write fresh translations back with this TTL.
    ReadWrite { ttl: Option<Duration> },
    /// Skip the store entirely; every text is a miss.
    Bypass,
}

/// Split between cached and pending slots for one batch.
///
/// Every index is either resolved (`Some`) or pending (listed exactly once
/// in `pending`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// Per-index cached translation, `None` for pending slots.
    pub resolved: Vec<Option<String>>,
    /// Original batch index for each backend input, in backend order.
    pub pending: Vec<usize>,
    /// Fingerprint per batch index.
    pub keys: Vec<CacheKey>,
}

impl ReconciliationPlan {
    /// Build a plan from per-index lookup results.
    pub fn new(keys: Vec<CacheKey>, lookups: Vec<Option<String>>) -> Self {
        let pending = lookups
            .iter()
            .enumerate()
            .filter_map(|(i, hit)| hit.is_none().then_some(i))
            .collect();
        Self {
            resolved: lookups,
            pending,
            keys,
        }
    }

    pub fn hits(&self) -> usize {
        self.resolved.len() - self.pending.len()
    }

    pub fn misses(&self) -> usize {
        self.pending.len()
    }

    /// Texts to send to the backend, in backend order.
    pub fn miss_texts(&self, texts: &[String]) -> Vec<String> {
        self.pending.iter().map(|&i| texts[i].clone()).collect()
    }

    /// Overlay backend results onto the resolved slots.
    ///
    /// `fresh` must already be aligned to the miss list (see [`align_output`]).
    pub fn assemble(self, fresh: Vec<String>) -> Vec<String> {
        let mut out = self.resolved;
        for (&index, translation) in self.pending.iter().zip(fresh) {
            out[index] = Some(translation);
        }
        out.into_iter().map(Option::unwrap_or_default).collect()
    }
}

/// Force backend output to exactly `sources.len()` entries.
///
/// Extra lines are discarded; a short reply is padded with the source text
/// at the same position, so a slot is never empty and never borrows an
/// unrelated text.
pub fn align_output(mut output: Vec<String>, sources: &[String]) -> Vec<String> {
    if output.len() != sources.len() {
        warn!(
            expected = sources.len(),
            returned = output.len(),
            "backend output length mismatch, repairing"
        );
    }
    output.truncate(sources.len());
    let have = output.len();
    output.extend(sources[have..].iter().cloned());
    output
}

/// Translate a batch, serving what it can from `store`.
pub async fn reconcile(
    batch: &RequestBatch,
    store: &dyn CacheStore,
    backend: &dyn TranslationBackend,
    api_key: &str,
    policy: CachePolicy,
) -> Result<Reconciled> {
    if batch.is_empty() {
        return Err(BragiError::InvalidInput("No texts to translate".to_string()));
    }

    let keys: Vec<CacheKey> = batch
        .texts
        .iter()
        .map(|text| fingerprint_in(text, &batch.context))
        .collect();

    let lookups = match policy {
        CachePolicy::ReadWrite { .. } => join_all(keys.iter().map(|key| store.get(key))).await,
        CachePolicy::Bypass => vec![None; keys.len()],
    };
    let plan = ReconciliationPlan::new(keys, lookups);
    let (hits, misses) = (plan.hits(), plan.misses());
    metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(hits as u64);
    metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(misses as u64);
    debug!(total = batch.len(), hits, misses, "cache lookup complete");

    if misses == 0 {
        return Ok(Reconciled {
            translations: plan.assemble(Vec::new()),
            cache_hits: hits,
            cache_misses: 0,
        });
    }

    let miss_texts = plan.miss_texts(&batch.texts);
    let output = backend
        .translate(&miss_texts, &batch.context, api_key)
        .await?;
    let fresh = align_output(output, &miss_texts);

    if let CachePolicy::ReadWrite { ttl } = policy {
        let writes = plan
            .pending
            .iter()
            .zip(&fresh)
            .map(|(&index, translation)| store.set(&plan.keys[index], translation, ttl));
        let stored = join_all(writes).await.into_iter().filter(|ok| *ok).count();
        if stored < fresh.len() {
            debug!(stored, attempted = fresh.len(), "some cache writes were dropped");
        }
    }

    Ok(Reconciled {
        translations: plan.assemble(fresh),
        cache_hits: hits,
        cache_misses: misses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn keys(n: usize) -> Vec<CacheKey> {
        (0..n).map(|i| CacheKey::from_raw(format!("k{i}"))).collect()
    }

    #[test]
    fn plan_partitions_every_index_once() {
        let plan = ReconciliationPlan::new(
            keys(4),
            vec![Some("A".into()), None, Some("C".into()), None],
        );
        assert_eq!(plan.pending, vec![1, 3]);
        assert_eq!(plan.hits(), 2);
        assert_eq!(plan.misses(), 2);
        assert_eq!(
            plan.miss_texts(&strings(&["a", "b", "c", "d"])),
            strings(&["b", "d"])
        );
    }

    #[test]
    fn assemble_overlays_pending_in_place() {
        let plan = ReconciliationPlan::new(
            keys(4),
            vec![Some("A".into()), None, Some("C".into()), None],
        );
        let out = plan.assemble(strings(&["B", "D"]));
        assert_eq!(out, strings(&["A", "B", "C", "D"]));
    }

    #[test]
    fn align_truncates_extra_lines() {
        let out = align_output(strings(&["x", "y", "z"]), &strings(&["a", "b"]));
        assert_eq!(out, strings(&["x", "y"]));
    }

    #[test]
    fn align_pads_with_matching_source() {
        let out = align_output(strings(&["x"]), &strings(&["a", "b", "c"]));
        assert_eq!(out, strings(&["x", "b", "c"]));
    }

    #[test]
    fn align_empty_reply_returns_sources() {
        let out = align_output(Vec::new(), &strings(&["a", "b"]));
        assert_eq!(out, strings(&["a", "b"]));
    }
}
