//! Seeded k-means partitioning of chunk embeddings.
//!
//! The effective cluster count is a policy ([`effective_cluster_count`]) kept apart from the
//! algorithm. Clustering uses k-means++ seeding followed by Lloyd iterations under Euclidean
//! distance, driven by a fixed-seed RNG so identical embeddings and `k` always produce identical
//! labels. Empty clusters are possible and left to the caller.

use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;

use super::types::Embedding;

const KMEANS_SEED: u64 = 0;
const MAX_ITERATIONS: usize = 300;

/// Errors raised while clustering embeddings.
#[derive(Debug, Error, PartialEq)]
pub enum ClusteringError {
    /// No embeddings were supplied.
    #[error("no embeddings to cluster")]
    Empty,
    /// An embedding contained NaN or infinity.
    #[error("embedding for chunk {chunk_index} contains non-finite values")]
    NonFinite {
        /// Offending chunk index.
        chunk_index: usize,
    },
    /// Embeddings disagree on vector length.
    #[error("embedding for chunk {chunk_index} has length {actual}, expected {expected}")]
    DimensionMismatch {
        /// Offending chunk index.
        chunk_index: usize,
        /// Length of the first embedding.
        expected: usize,
        /// Length of the offending embedding.
        actual: usize,
    },
}

/// Number of clusters actually used for `n` embeddings: `max(1, min(requested, n))`.
pub fn effective_cluster_count(requested: usize, n: usize) -> usize {
    requested.min(n).max(1)
}

/// Cluster label for every chunk, indexed by chunk position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment {
    k: usize,
    labels: Vec<usize>,
}

impl ClusterAssignment {
    /// Wrap precomputed labels; every label must be below `k`.
    pub(crate) fn from_labels(k: usize, labels: Vec<usize>) -> Self {
        debug_assert!(labels.iter().all(|label| *label < k));
        Self { k, labels }
    }

    /// Number of clusters; every label lies in `[0, k)`.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Label of each chunk in chunk-index order.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Chunk indices assigned to `cluster_id`, ascending.
    pub fn members(&self, cluster_id: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(chunk_index, label)| (*label == cluster_id).then_some(chunk_index))
            .collect()
    }

    /// Member count per cluster id.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for label in &self.labels {
            sizes[*label] += 1;
        }
        sizes
    }
}

/// Partition embeddings into `effective_cluster_count(requested_k, n)` clusters.
pub fn cluster_embeddings(
    embeddings: &[Embedding],
    requested_k: usize,
) -> Result<ClusterAssignment, ClusteringError> {
    let points = validate(embeddings)?;
    let k = effective_cluster_count(requested_k, points.len());

    let labels = if k == 1 {
        vec![0; points.len()]
    } else {
        kmeans(&points, k)
    };

    let assignment = ClusterAssignment::from_labels(k, labels);
    tracing::debug!(
        requested_k,
        k,
        sizes = ?assignment.sizes(),
        "Embeddings clustered"
    );
    Ok(assignment)
}

/// Shared vector length of a run's embeddings.
///
/// Fails when the slice is empty or any vector disagrees with the first one's length.
pub fn uniform_dimension(embeddings: &[Embedding]) -> Result<usize, ClusteringError> {
    let first = embeddings.first().ok_or(ClusteringError::Empty)?;
    let expected = first.vector.len();
    match embeddings
        .iter()
        .find(|embedding| embedding.vector.len() != expected)
    {
        Some(embedding) => Err(ClusteringError::DimensionMismatch {
            chunk_index: embedding.chunk_index,
            expected,
            actual: embedding.vector.len(),
        }),
        None => Ok(expected),
    }
}

fn validate(embeddings: &[Embedding]) -> Result<Vec<Vec<f64>>, ClusteringError> {
    uniform_dimension(embeddings)?;

    embeddings
        .iter()
        .map(|embedding| {
            if embedding.vector.iter().any(|value| !value.is_finite()) {
                return Err(ClusteringError::NonFinite {
                    chunk_index: embedding.chunk_index,
                });
            }
            Ok(embedding.vector.iter().map(|value| f64::from(*value)).collect())
        })
        .collect()
}

fn kmeans(points: &[Vec<f64>], k: usize) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(KMEANS_SEED);
    let mut centroids = seed_centroids(points, k, &mut rng);
    let mut labels = assign(points, &centroids);

    for iteration in 0..MAX_ITERATIONS {
        centroids = recompute_centroids(points, &labels, &centroids);
        let next = assign(points, &centroids);
        if next == labels {
            tracing::trace!(iterations = iteration + 1, "k-means converged");
            break;
        }
        labels = next;
    }

    labels
}

/// k-means++ seeding: each new centroid is drawn with probability proportional to its squared
/// distance from the nearest centroid chosen so far.
fn seed_centroids(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..points.len())].clone());

    while centroids.len() < k {
        let distances: Vec<f64> = points
            .iter()
            .map(|point| {
                centroids
                    .iter()
                    .map(|centroid| squared_distance(point, centroid))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = distances.iter().sum();

        let chosen = if total > 0.0 {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = points.len() - 1;
            for (index, distance) in distances.iter().enumerate() {
                if target < *distance {
                    chosen = index;
                    break;
                }
                target -= distance;
            }
            chosen
        } else {
            rng.random_range(0..points.len())
        };
        centroids.push(points[chosen].clone());
    }

    centroids
}

fn assign(points: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    points
        .iter()
        .map(|point| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (cluster_id, centroid) in centroids.iter().enumerate() {
                let distance = squared_distance(point, centroid);
                if distance < best_distance {
                    best = cluster_id;
                    best_distance = distance;
                }
            }
            best
        })
        .collect()
}

/// Mean of each cluster's members; empty clusters keep their previous centroid.
fn recompute_centroids(
    points: &[Vec<f64>],
    labels: &[usize],
    previous: &[Vec<f64>],
) -> Vec<Vec<f64>> {
    let dimension = previous.first().map(Vec::len).unwrap_or(0);
    let mut sums = vec![vec![0.0; dimension]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (point, label) in points.iter().zip(labels) {
        counts[*label] += 1;
        for (sum, value) in sums[*label].iter_mut().zip(point) {
            *sum += value;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), old)| {
            if count == 0 {
                old.clone()
            } else {
                sum.into_iter().map(|value| value / count as f64).collect()
            }
        })
        .collect()
}

fn squared_distance(left: &[f64], right: &[f64]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(a, b)| (a - b) * (a - b))
        .sum()
}
