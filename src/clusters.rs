// boundary to the sense clustering step. The clustering algorithm lives outside this crate;
// this module feeds it shard matrices, reads and writes the cluster files, and classifies
// new contexts against the fitted senses.

use crate::error::{ExtractError, Result};
use crate::shards::{read_shard, SHARD_EXTENSION};

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use log::{debug, info};
use ndarray::{Array2, ArrayView1, ArrayView2};


/// Axis-aligned correlation cluster: bounds only matter on the relevant dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationCluster {
    pub relevant: Vec<bool>,
    pub min: Vec<f32>,
    pub max: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClusterModel {
    /// one centroid per row
    Centroids(Array2<f32>),
    Correlation(Vec<CorrelationCluster>),
}

impl ClusterModel {

    pub fn num_senses(&self) -> usize {
        match self {
            ClusterModel::Centroids(c) => c.nrows(),
            ClusterModel::Correlation(clusters) => clusters.len(),
        }
    }

    fn file_suffix(&self) -> &'static str {
        match self {
            ClusterModel::Centroids(_) => "centers.txt",
            ClusterModel::Correlation(_) => "halite.txt",
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        match self {
            ClusterModel::Centroids(centroids) => {
                for row in centroids.rows() {
                    writeln!(out, "{}", join(row.iter()))?;
                }
            },
            ClusterModel::Correlation(clusters) => {
                for cluster in clusters {
                    let mask: Vec<&str> = cluster.relevant.iter().map(|r| if *r { "1" } else { "0" }).collect();
                    writeln!(out, "{}", mask.join(" "))?;
                    writeln!(out, "{}", join(cluster.min.iter()))?;
                    writeln!(out, "{}", join(cluster.max.iter()))?;
                }
            },
        }
        Ok(())
    }
}

fn join<'a, I: Iterator<Item = &'a f32>>(values: I) -> String {
    values.map(|v| v.to_string()).collect::<Vec<String>>().join(" ")
}

/// Fits a small number of senses to the context vectors of one vocabulary id.
pub trait ContextClusterer {
    /// `contexts` has one context vector per row.
    fn cluster(&self, contexts: ArrayView2<'_, f32>) -> Result<ClusterModel>;
}

/// Picks the 0-based sense of a context vector given the fitted model of its word.
pub trait SenseClassifier {
    fn classify(&self, context: ArrayView1<'_, f32>, model: &ClusterModel) -> usize;
}

/// Nearest centroid by squared cosine similarity, so a centroid and its negation are equally
/// close. Ties go to the lower sense. Correlation models pick the first cluster whose bounds
/// hold the context on every relevant dimension.
pub struct NearestCentroid;

impl SenseClassifier for NearestCentroid {

    fn classify(&self, context: ArrayView1<'_, f32>, model: &ClusterModel) -> usize {
        match model {
            ClusterModel::Centroids(centroids) => {
                let mut best = 0;
                let mut best_sim = f64::NEG_INFINITY;
                for (i, centroid) in centroids.rows().into_iter().enumerate() {
                    let sim = cosine_sqr(centroid, context);
                    if sim > best_sim {
                        best = i;
                        best_sim = sim;
                    }
                }
                best
            },
            ClusterModel::Correlation(clusters) => clusters
                .iter()
                .position(|cluster| {
                    let bounds = cluster.min.iter().zip(cluster.max.iter());
                    context.iter().zip(cluster.relevant.iter()).zip(bounds)
                        .all(|((x, relevant), (lo, hi))| !*relevant || (lo <= x && x <= hi))
                })
                .unwrap_or(0),
        }
    }
}

fn cosine_sqr(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f64 {

    let dot = a.dot(&b) as f64;
    let norms = a.dot(&a) as f64 * b.dot(&b) as f64;
    if norms == 0.0 {
        return 0.0;
    }
    dot * dot / norms
}

/// Clusters every non-empty shard of `context_dir` and writes `<id>.<suffix>` files to
/// `cluster_dir`. Returns the written paths.
pub fn cluster_shards<C: ContextClusterer>(context_dir: &Path, cluster_dir: &Path, vecdim: usize, clusterer: &C) -> Result<Vec<PathBuf>> {

    let mut shards: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(context_dir).map_err(|e| ExtractError::io(context_dir, e))? {
        let path = entry.map_err(|e| ExtractError::io(context_dir, e))?.path();
        if path.extension().is_some_and(|ext| ext == SHARD_EXTENSION) {
            shards.push(path);
        }
    }
    shards.sort();

    let mut written = Vec::new();
    for shard in shards {
        let contexts = read_shard(&shard, vecdim)?;
        if contexts.nrows() == 0 {
            continue;
        }
        debug!("{}: {} points", shard.display(), contexts.nrows());

        let model = clusterer.cluster(contexts.view())?;
        let stem = shard.file_stem().unwrap_or_default().to_string_lossy();
        let out = cluster_dir.join(format!("{}.{}", stem, model.file_suffix()));

        let f = File::create(&out).map_err(|e| ExtractError::io(&out, e))?;
        let mut writer = BufWriter::new(f);
        model.write_to(&mut writer)
            .and_then(|_| writer.flush())
            .map_err(|e| ExtractError::io(&out, e))?;
        written.push(out);
    }

    info!("wrote {} cluster files to {}", written.len(), cluster_dir.display());
    Ok(written)
}

/// Reads a centers file back: one centroid per line, `vecdim` values each.
pub fn read_centroids(file_path: &Path, vecdim: usize) -> Result<ClusterModel> {

    let f = File::open(file_path).map_err(|e| ExtractError::io(file_path, e))?;
    let mut values: Vec<f32> = Vec::new();
    let mut rows = 0;
    for (i, line) in BufReader::new(f).lines().enumerate() {
        let line = line.map_err(|e| ExtractError::io(file_path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let before = values.len();
        for token in line.split_whitespace() {
            let value = token.parse::<f32>().map_err(|_| ExtractError::Parse {
                location: format!("{}:{}", file_path.display(), i + 1),
                token: token.to_string(),
            })?;
            values.push(value);
        }
        if values.len() - before != vecdim {
            return Err(ExtractError::Format(format!(
                "{}:{} holds {} values, expected {}", file_path.display(), i + 1, values.len() - before, vecdim
            )));
        }
        rows += 1;
    }

    let centroids = Array2::from_shape_vec((rows, vecdim), values)
        .map_err(|e| ExtractError::Format(e.to_string()))?;
    Ok(ClusterModel::Centroids(centroids))
}

/// Centroid models of every `<id>.centers.txt` file in `cluster_dir`, keyed by vocabulary id.
pub fn read_models(cluster_dir: &Path, vecdim: usize) -> Result<HashMap<usize, ClusterModel>> {

    let mut models = HashMap::new();
    for entry in fs::read_dir(cluster_dir).map_err(|e| ExtractError::io(cluster_dir, e))? {
        let path = entry.map_err(|e| ExtractError::io(cluster_dir, e))?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let id = match name.strip_suffix(".centers.txt").map(str::parse::<usize>) {
            Some(Ok(id)) => id,
            _ => continue,
        };
        models.insert(id, read_centroids(&path, vecdim)?);
    }
    debug!("read sense models of {} words from {}", models.len(), cluster_dir.display());
    Ok(models)
}
