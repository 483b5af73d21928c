//! In-memory exact nearest-fragment index.

use crate::error::{DocQaError, Result};
use crate::models::{Fragment, FragmentId, ScoredFragment};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity; 0.0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let ma = magnitude(a);
    let mb = magnitude(b);
    if ma == 0.0 || mb == 0.0 {
        return 0.0;
    }
    dot / (ma * mb)
}

#[derive(Debug, Clone)]
struct Entry {
    fragment: Fragment,
    vector: Vec<f32>,
}

/// Fragments and their vectors in insertion order. Never mutated after
/// `build`; a new document gets a new index.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<Entry>,
    by_id: HashMap<FragmentId, usize>,
    dimension: usize,
    version: u64,
    built_at: DateTime<Utc>,
}

impl VectorIndex {
    pub fn build(fragments: Vec<Fragment>, vectors: Vec<Vec<f32>>, version: u64) -> Result<Self> {
        if fragments.len() != vectors.len() {
            return Err(DocQaError::InvalidConfig(format!(
                "{} fragments but {} vectors",
                fragments.len(),
                vectors.len()
            )));
        }
        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        let mut entries = Vec::with_capacity(fragments.len());
        let mut by_id = HashMap::with_capacity(fragments.len());
        for (fragment, vector) in fragments.into_iter().zip(vectors) {
            if vector.len() != dimension {
                return Err(DocQaError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            by_id.insert(fragment.id(), entries.len());
            entries.push(Entry { fragment, vector });
        }
        Ok(Self {
            entries,
            by_id,
            dimension,
            version,
            built_at: Utc::now(),
        })
    }

    /// Top `k` fragments by descending cosine similarity. Equal scores keep
    /// insertion order.
    pub fn query(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredFragment>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query_vector.len() != self.dimension {
            return Err(DocQaError::DimensionMismatch {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query_vector, &e.vector)))
            .collect();
        // sort_by is stable, so ties stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        Ok(scored
            .into_iter()
            .map(|(i, similarity)| ScoredFragment {
                fragment: self.entries[i].fragment.clone(),
                similarity,
            })
            .collect())
    }

    pub fn get(&self, id: FragmentId) -> Option<(&Fragment, &[f32])> {
        self.by_id
            .get(&id)
            .map(|&i| (&self.entries[i].fragment, self.entries[i].vector.as_slice()))
    }

    pub fn fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.entries.iter().map(|e| &e.fragment)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(i: usize, text: &str) -> Fragment {
        Fragment::new(FragmentId(i), text, i * 10)
    }

    fn index(vectors: Vec<Vec<f32>>) -> VectorIndex {
        let fragments = (0..vectors.len()).map(|i| frag(i, &format!("f{}", i))).collect();
        VectorIndex::build(fragments, vectors, 1).unwrap()
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn empty_index_returns_nothing() {
        let idx = VectorIndex::build(vec![], vec![], 1).unwrap();
        assert!(idx.is_empty());
        assert!(idx.query(&[1.0, 2.0], 3).unwrap().is_empty());
    }

    #[test]
    fn results_sorted_and_limited() {
        let idx = index(vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![-1.0, 0.0],
        ]);
        let hits = idx.query(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].fragment.id(), FragmentId(1));
        assert_eq!(hits[1].fragment.id(), FragmentId(2));
        for pair in hits.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
        assert_eq!(idx.query(&[1.0, 0.0], 10).unwrap().len(), 4);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let idx = index(vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.0, 2.0],
            vec![2.0, 0.0],
            vec![1.0, 0.0],
        ]);
        let ids: Vec<_> = idx
            .query(&[3.0, 0.0], 5)
            .unwrap()
            .into_iter()
            .map(|h| h.fragment.id().0)
            .collect();
        assert_eq!(ids, vec![1, 3, 4, 0, 2]);
    }

    #[test]
    fn mixed_dimensions_fail_to_build() {
        let err = VectorIndex::build(
            vec![frag(0, "a"), frag(1, "b")],
            vec![vec![1.0, 0.0], vec![1.0]],
            1,
        )
        .unwrap_err();
        assert!(matches!(err, DocQaError::DimensionMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn query_dimension_must_match() {
        let idx = index(vec![vec![1.0, 0.0]]);
        assert!(matches!(
            idx.query(&[1.0, 0.0, 0.0], 1),
            Err(DocQaError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn lookup_by_id() {
        let idx = index(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let (f, v) = idx.get(FragmentId(1)).unwrap();
        assert_eq!(f.text(), "f1");
        assert_eq!(v, &[0.0, 1.0]);
        assert!(idx.get(FragmentId(9)).is_none());
        assert_eq!(idx.fragments().count(), 2);
        assert_eq!(idx.dimension(), 2);
    }
}
