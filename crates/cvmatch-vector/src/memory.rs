use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use cvmatch_core::types::{IndexMatch, IndexQuery, IndexRecord, Meta};
use cvmatch_core::{Result, VectorIndex};

/// Namespaced in-process index scoring by dense dot product plus sparse dot
/// product, the same hybrid scoring a dot-product hosted index applies.
///
/// Ties keep id order, so results are deterministic.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    namespaces: RwLock<HashMap<String, BTreeMap<String, IndexRecord>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces.read().get(namespace).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }
}

fn dense_dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl VectorIndex for InMemoryIndex {
    fn upsert(&self, namespace: &str, records: &[IndexRecord]) -> Result<()> {
        let mut namespaces = self.namespaces.write();
        let ns = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            ns.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    fn query(&self, namespace: &str, query: &IndexQuery) -> Result<Vec<IndexMatch>> {
        let namespaces = self.namespaces.read();
        let Some(ns) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };
        let mut scored: Vec<IndexMatch> = ns
            .values()
            .map(|record| {
                let sparse = match (&query.sparse, &record.sparse) {
                    (Some(q), Some(r)) => q.dot(r),
                    _ => 0.0,
                };
                IndexMatch {
                    id: record.id.clone(),
                    score: dense_dot(&query.dense, &record.dense) + sparse,
                    metadata: if query.include_metadata { record.metadata.clone() } else { Meta::new() },
                }
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(query.top_k);
        Ok(scored)
    }

    fn fetch(&self, namespace: &str, ids: &[String]) -> Result<Vec<IndexRecord>> {
        let namespaces = self.namespaces.read();
        let Some(ns) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| ns.get(id).cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvmatch_core::types::SparseVector;

    fn record(id: &str, dense: Vec<f32>, sparse: Option<SparseVector>) -> IndexRecord {
        let mut metadata = Meta::new();
        metadata.insert("text".into(), id.into());
        IndexRecord { id: id.into(), dense, sparse, metadata }
    }

    #[test]
    fn hybrid_score_adds_dense_and_sparse() {
        let index = InMemoryIndex::new();
        let sparse = SparseVector::new(vec![7], vec![2.0]).unwrap();
        index.upsert("ns", &[record("a", vec![1.0, 0.0], Some(sparse.clone())), record("b", vec![0.0, 1.0], None)]).unwrap();
        let hits = index
            .query("ns", &IndexQuery { dense: vec![0.5, 0.5], sparse: Some(sparse), top_k: 10, include_metadata: true })
            .unwrap();
        assert_eq!(hits[0].id, "a");
        assert!((hits[0].score - 4.5).abs() < 1e-6);
        assert!((hits[1].score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn ties_are_ordered_by_id_and_truncated() {
        let index = InMemoryIndex::new();
        index.upsert("ns", &[record("c", vec![1.0], None), record("a", vec![1.0], None), record("b", vec![1.0], None)]).unwrap();
        let hits = index.query("ns", &IndexQuery { dense: vec![1.0], sparse: None, top_k: 2, include_metadata: false }).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(hits[0].metadata.is_empty());
    }

    #[test]
    fn unknown_namespace_is_empty_not_error() {
        let index = InMemoryIndex::new();
        let q = IndexQuery { dense: vec![1.0], sparse: None, top_k: 5, include_metadata: true };
        assert!(index.query("missing", &q).unwrap().is_empty());
        assert!(index.fetch("missing", &["x".into()]).unwrap().is_empty());
    }

    #[test]
    fn upsert_replaces_by_id() {
        let index = InMemoryIndex::new();
        index.upsert("ns", &[record("a", vec![1.0], None)]).unwrap();
        index.upsert("ns", &[record("a", vec![2.0], None)]).unwrap();
        assert_eq!(index.len("ns"), 1);
        assert_eq!(index.fetch("ns", &["a".into()]).unwrap()[0].dense, vec![2.0]);
    }
}
