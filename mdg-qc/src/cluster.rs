//! Fleet outlier detection
//!
//! Partition-based clustering (Lloyd's algorithm) over the fleet's
//! feature vectors, on the (mean, spread) plane. Seeding is
//! deterministic - the first k distinct points in input order - so
//! repeated calls over the same fleet produce the same assignment.
//!
//! The minority cluster is labelled the outlier cluster. On an exact
//! population tie the cluster whose centroid sits farther from the
//! origin of the clustering plane takes the outlier label: a healthy
//! fleet clusters near its calibration baseline, so the far group is the
//! suspicious one.

use mdg_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::features::FeatureVector;

/// Iteration cap for Lloyd's algorithm. Hitting the cap is not an
/// error; the current assignment is returned.
pub const MAX_ITERATIONS: usize = 100;

/// Result of clustering one fleet's feature set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    k: usize,
    /// record id → cluster label (0..k)
    labels: BTreeMap<String, usize>,
    /// Per-cluster centroid on the (mean, spread) plane
    centroids: Vec<[f64; 2]>,
    /// Per-cluster member count
    populations: Vec<usize>,
    /// Label of the cluster flagged as anomalous (None for k = 1)
    outlier_label: Option<usize>,
    /// Mean silhouette score over the clustering plane
    /// (None when undefined: k < 2 or n <= k)
    silhouette: Option<f64>,
    converged: bool,
    iterations: usize,
}

impl ClusterAssignment {
    pub fn k(&self) -> usize {
        self.k
    }

    /// Cluster label for a record id
    pub fn label_of(&self, record_id: &str) -> Option<usize> {
        self.labels.get(record_id).copied()
    }

    /// Whether a record sits in the outlier cluster
    pub fn is_outlier(&self, record_id: &str) -> bool {
        match (self.label_of(record_id), self.outlier_label) {
            (Some(label), Some(outlier)) => label == outlier,
            _ => false,
        }
    }

    /// Record ids in the outlier cluster, in id order
    pub fn outlier_ids(&self) -> Vec<&str> {
        match self.outlier_label {
            Some(outlier) => self
                .labels
                .iter()
                .filter(|(_, &label)| label == outlier)
                .map(|(id, _)| id.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn labels(&self) -> &BTreeMap<String, usize> {
        &self.labels
    }

    pub fn centroids(&self) -> &[[f64; 2]] {
        &self.centroids
    }

    pub fn populations(&self) -> &[usize] {
        &self.populations
    }

    pub fn outlier_label(&self) -> Option<usize> {
        self.outlier_label
    }

    pub fn silhouette(&self) -> Option<f64> {
        self.silhouette
    }

    pub fn converged(&self) -> bool {
        self.converged
    }
}

/// Cluster `vectors` into `k` groups and flag the outlier cluster.
///
/// # Errors
/// - `Error::InvalidInput` when `k` is zero
/// - `Error::InsufficientData` when fewer vectors than clusters
pub fn detect(vectors: &[FeatureVector], k: usize) -> Result<ClusterAssignment> {
    if k == 0 {
        return Err(Error::InvalidInput("n_clusters must be >= 1".to_string()));
    }
    if vectors.len() < k {
        return Err(Error::InsufficientData(format!(
            "{} feature vectors cannot form {} clusters",
            vectors.len(),
            k
        )));
    }

    let points: Vec<[f64; 2]> = vectors.iter().map(|v| v.clustering_point()).collect();

    // Deterministic seeding: first k distinct points in input order.
    // Degenerate fleets with fewer distinct points than k top up from the
    // front; the surplus clusters simply stay empty.
    let mut centroids: Vec<[f64; 2]> = Vec::with_capacity(k);
    for point in &points {
        if centroids.len() == k {
            break;
        }
        if !centroids.iter().any(|c| c == point) {
            centroids.push(*point);
        }
    }
    let mut fill = 0;
    while centroids.len() < k {
        centroids.push(points[fill % points.len()]);
        fill += 1;
    }

    let mut labels = vec![0usize; points.len()];
    let mut converged = false;
    let mut iterations = 0;

    for iteration in 0..MAX_ITERATIONS {
        iterations = iteration + 1;

        let mut changed = false;
        for (i, point) in points.iter().enumerate() {
            let nearest = nearest_centroid(point, &centroids);
            if labels[i] != nearest {
                labels[i] = nearest;
                changed = true;
            }
        }
        if iteration > 0 && !changed {
            converged = true;
            break;
        }

        // Update step. A cluster that lost all members keeps its previous
        // centroid rather than collapsing to NaN.
        let mut sums = vec![[0.0f64; 2]; k];
        let mut counts = vec![0usize; k];
        for (i, point) in points.iter().enumerate() {
            sums[labels[i]][0] += point[0];
            sums[labels[i]][1] += point[1];
            counts[labels[i]] += 1;
        }
        for c in 0..k {
            if counts[c] > 0 {
                centroids[c] = [
                    sums[c][0] / counts[c] as f64,
                    sums[c][1] / counts[c] as f64,
                ];
            }
        }
        debug!(iteration, changed, "Lloyd iteration");
    }

    let mut populations = vec![0usize; k];
    for &label in &labels {
        populations[label] += 1;
    }

    let outlier_label = pick_outlier(&populations, &centroids);
    let silhouette = mean_silhouette(&points, &labels, &populations, k);

    let assignment = ClusterAssignment {
        k,
        labels: vectors
            .iter()
            .zip(&labels)
            .map(|(v, &label)| (v.record_id.clone(), label))
            .collect(),
        centroids,
        populations,
        outlier_label,
        silhouette,
        converged,
        iterations,
    };

    info!(
        n = vectors.len(),
        k,
        iterations,
        converged,
        outlier_population = outlier_label.map(|l| assignment.populations[l]),
        "Fleet clustering complete"
    );
    Ok(assignment)
}

fn nearest_centroid(point: &[f64; 2], centroids: &[[f64; 2]]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best_dist {
            best = c;
            best_dist = dist;
        }
    }
    best
}

fn squared_distance(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

/// Minority cluster, ties broken by larger centroid distance-from-origin.
/// Generalizes the k = 2 rule to k > 2 by flagging the smallest cluster.
fn pick_outlier(populations: &[usize], centroids: &[[f64; 2]]) -> Option<usize> {
    if populations.len() < 2 {
        return None;
    }
    let min_population = *populations.iter().min()?;
    (0..populations.len())
        .filter(|&c| populations[c] == min_population)
        .max_by(|&a, &b| {
            let norm_a = squared_distance(&centroids[a], &[0.0, 0.0]);
            let norm_b = squared_distance(&centroids[b], &[0.0, 0.0]);
            norm_a.total_cmp(&norm_b)
        })
}

/// Mean silhouette over all points, on the clustering plane. Undefined
/// (None) when k < 2, when n <= k, or when fewer than two clusters have
/// members. Points alone in their cluster score zero.
fn mean_silhouette(
    points: &[[f64; 2]],
    labels: &[usize],
    populations: &[usize],
    k: usize,
) -> Option<f64> {
    let n = points.len();
    if k < 2 || n <= k {
        return None;
    }
    if populations.iter().filter(|&&p| p > 0).count() < 2 {
        return None;
    }

    let mut total = 0.0;
    for i in 0..n {
        let own = labels[i];
        if populations[own] <= 1 {
            continue; // scores zero
        }

        let mut sums = vec![0.0f64; k];
        for j in 0..n {
            if j != i {
                sums[labels[j]] += squared_distance(&points[i], &points[j]).sqrt();
            }
        }

        let intra = sums[own] / (populations[own] - 1) as f64;
        let nearest_other = (0..k)
            .filter(|&c| c != own && populations[c] > 0)
            .map(|c| sums[c] / populations[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = intra.max(nearest_other);
        if denom > 0.0 {
            total += (nearest_other - intra) / denom;
        }
    }
    Some(total / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(id: &str, mean: f64, spread: f64) -> FeatureVector {
        FeatureVector {
            record_id: id.to_string(),
            mean,
            spread,
            peak: 0.0,
        }
    }

    /// 8 tightly grouped vectors plus 2 far outliers
    fn synthetic_fleet() -> Vec<FeatureVector> {
        let mut vectors: Vec<FeatureVector> = (0..8)
            .map(|i| vector(&format!("normal-{}", i), 100.0 + i as f64 * 0.5, 5.0 + (i % 3) as f64 * 0.4))
            .collect();
        vectors.push(vector("hot-1", 300.0, 60.0));
        vectors.push(vector("hot-2", 305.0, 62.0));
        vectors
    }

    #[test]
    fn test_population_conservation() {
        let vectors = synthetic_fleet();
        let assignment = detect(&vectors, 2).unwrap();
        assert_eq!(
            assignment.populations().iter().sum::<usize>(),
            vectors.len()
        );
        assert_eq!(assignment.labels().len(), vectors.len());
    }

    #[test]
    fn test_outlier_cluster_contains_exactly_the_far_vectors() {
        let assignment = detect(&synthetic_fleet(), 2).unwrap();
        assert_eq!(assignment.outlier_ids(), vec!["hot-1", "hot-2"]);
        assert!(assignment.is_outlier("hot-1"));
        assert!(!assignment.is_outlier("normal-0"));
    }

    #[test]
    fn test_population_tie_breaks_on_distance_from_origin() {
        let vectors = vec![
            vector("a", 1.0, 1.0),
            vector("b", 1.0, 2.0),
            vector("c", 10.0, 10.0),
            vector("d", 10.0, 11.0),
        ];
        let assignment = detect(&vectors, 2).unwrap();
        assert_eq!(assignment.populations(), &[2, 2]);
        // The far pair takes the outlier label
        assert_eq!(assignment.outlier_ids(), vec!["c", "d"]);
    }

    #[test]
    fn test_deterministic_across_repeated_calls() {
        let vectors = synthetic_fleet();
        let first = detect(&vectors, 2).unwrap();
        let second = detect(&vectors, 2).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fewer_vectors_than_clusters() {
        let vectors = vec![vector("a", 1.0, 1.0)];
        assert!(matches!(
            detect(&vectors, 2),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn test_zero_clusters_rejected() {
        let vectors = vec![vector("a", 1.0, 1.0)];
        assert!(matches!(detect(&vectors, 0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_single_cluster_has_no_outlier() {
        let vectors = vec![vector("a", 1.0, 1.0), vector("b", 2.0, 2.0)];
        let assignment = detect(&vectors, 1).unwrap();
        assert_eq!(assignment.outlier_label(), None);
        assert!(!assignment.is_outlier("a"));
        assert_eq!(assignment.populations(), &[2]);
    }

    #[test]
    fn test_duplicate_points_do_not_break_seeding() {
        // Only one distinct point; the second centroid is topped up from
        // the front and its cluster stays empty.
        let vectors = vec![
            vector("a", 5.0, 5.0),
            vector("b", 5.0, 5.0),
            vector("c", 5.0, 5.0),
        ];
        let assignment = detect(&vectors, 2).unwrap();
        assert_eq!(assignment.populations().iter().sum::<usize>(), 3);
        assert!(assignment.populations().contains(&0));
    }

    #[test]
    fn test_silhouette_defined_and_in_range() {
        let assignment = detect(&synthetic_fleet(), 2).unwrap();
        let score = assignment.silhouette().unwrap();
        assert!((-1.0..=1.0).contains(&score));
        // Well-separated synthetic clusters score high
        assert!(score > 0.5);
    }

    #[test]
    fn test_silhouette_undefined_when_n_equals_k() {
        let vectors = vec![vector("a", 1.0, 1.0), vector("b", 9.0, 9.0)];
        let assignment = detect(&vectors, 2).unwrap();
        assert_eq!(assignment.silhouette(), None);
    }

    #[test]
    fn test_converges_on_separated_data() {
        let assignment = detect(&synthetic_fleet(), 2).unwrap();
        assert!(assignment.converged());
    }
}
