use crate::error::{ExtractError, Result};
use crate::resolver::NUMERIC_PATTERN;
use crate::window::DrainPolicy;

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};


fn default_vector_dim() -> usize { 50 }
fn default_context_size() -> usize { 5 }
fn default_eod_marker() -> String { "eeeoddd".to_string() }
fn default_ss_marker() -> String { "<s>".to_string() }
fn default_es_marker() -> String { "</s>".to_string() }
fn default_oov_token() -> String { "UUUNKKK".to_string() }
fn default_preindexed() -> bool { true }
fn default_numeric_pattern() -> String { NUMERIC_PATTERN.to_string() }
fn default_corpus_extension() -> String { "txt".to_string() }

/// Parameters of one extraction run, read from the json file given on the command line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractParams {
    pub vocab_file: PathBuf,
    pub idf_file: PathBuf,
    pub vector_file: PathBuf,
    pub corpus_dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default = "default_vector_dim")]
    pub vector_dim: usize,
    #[serde(default = "default_context_size")]
    pub context_size: usize,
    #[serde(default = "default_eod_marker")]
    pub eod_marker: String,
    #[serde(default = "default_ss_marker")]
    pub ss_marker: String,
    #[serde(default = "default_es_marker")]
    pub es_marker: String,
    #[serde(default = "default_oov_token")]
    pub oov_token: String,
    #[serde(default)]
    pub digit_fallback: Option<String>,
    /// tokens matching this regex are retried with their digits replaced by `digit_fallback`
    #[serde(default = "default_numeric_pattern")]
    pub numeric_pattern: String,
    #[serde(default = "default_preindexed")]
    pub preindexed: bool,
    #[serde(default)]
    pub prune: Option<usize>,
    #[serde(default)]
    pub file_cache_size: Option<usize>,
    #[serde(default = "default_corpus_extension")]
    pub corpus_extension: String,
    #[serde(default)]
    pub drain: DrainPolicy,
}

impl ExtractParams {

    pub fn new(vocab_file: &Path, idf_file: &Path, vector_file: &Path, corpus_dir: &Path, output_dir: &Path) -> ExtractParams {
        ExtractParams {
            vocab_file: vocab_file.to_path_buf(),
            idf_file: idf_file.to_path_buf(),
            vector_file: vector_file.to_path_buf(),
            corpus_dir: corpus_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            vector_dim: default_vector_dim(),
            context_size: default_context_size(),
            eod_marker: default_eod_marker(),
            ss_marker: default_ss_marker(),
            es_marker: default_es_marker(),
            oov_token: default_oov_token(),
            digit_fallback: None,
            numeric_pattern: default_numeric_pattern(),
            preindexed: default_preindexed(),
            prune: None,
            file_cache_size: None,
            corpus_extension: default_corpus_extension(),
            drain: DrainPolicy::default(),
        }
    }

    /// Number of leading ids that get shards; 0 or a value past the vocabulary means all of them.
    pub fn shard_count(&self, vocab_size: usize) -> usize {
        match self.prune {
            Some(prune) if prune > 0 && prune < vocab_size => prune,
            _ => vocab_size,
        }
    }

    /// Open handle budget of the shard cache; 0 or absent means one per shard.
    pub fn cache_size(&self, shard_count: usize) -> usize {
        match self.file_cache_size {
            Some(size) if size > 0 => size,
            _ => shard_count,
        }
    }

    pub fn validate(&self) -> Result<()> {

        for file in [&self.vocab_file, &self.idf_file, &self.vector_file] {
            if !file.is_file() {
                return Err(ExtractError::MissingFile { path: file.clone() });
            }
        }
        for dir in [&self.corpus_dir, &self.output_dir] {
            if !dir.is_dir() {
                return Err(ExtractError::MissingDirectory { path: dir.clone() });
            }
        }
        Ok(())
    }
}

impl Display for ExtractParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "using parameters:
        vocab_file: {}
        idf_file: {}
        vector_file: {}
        corpus_dir: {}
        output_dir: {}
        vector_dim: {}
        context_size: {}
        markers (eod / start / end / oov): {} / {} / {} / {}
        digit_fallback: {:?}
        numeric_pattern: {}
        preindexed: {}
        prune: {:?}
        file_cache_size: {:?}
        corpus_extension: {}
        drain: {:?}",
        self.vocab_file.display(), self.idf_file.display(), self.vector_file.display(),
        self.corpus_dir.display(), self.output_dir.display(), self.vector_dim, self.context_size,
        self.eod_marker, self.ss_marker, self.es_marker, self.oov_token, self.digit_fallback,
        self.numeric_pattern, self.preindexed, self.prune, self.file_cache_size, self.corpus_extension, self.drain)
    }
}

pub struct Config {
    params: ExtractParams
}

impl Config {

    pub fn get_params(&self) -> ExtractParams {
        self.params.clone()
    }

    /// Expects `args` to be the program name followed by the path of a json parameter file.
    pub fn new(args: &[String]) -> Result<Config> {

        if args.len() != 2 {
            return Err(ExtractError::Usage("input should be a path to json file only".to_string()));
        }

        let path = PathBuf::from(&args[1]);
        let params = Config::read_params(&path)?;
        params.validate()?;
        Ok(Self { params })
    }

    pub fn read_params(path: &Path) -> Result<ExtractParams> {

        let f = File::open(path).map_err(|_| ExtractError::MissingFile { path: path.to_path_buf() })?;
        serde_json::from_reader(BufReader::new(f)).map_err(|source| ExtractError::Params {
            path: path.to_path_buf(),
            source,
        })
    }
}


#[cfg(test)]
mod tests {

    use super::{Config, ExtractParams};
    use crate::error::ExtractError;
    use crate::resolver::NUMERIC_PATTERN;
    use crate::window::DrainPolicy;
    use std::fs;
    use std::path::Path;

    #[test]
    fn defaults_fill_missing_keys_test() {

        let json = r#"{
            "vocab_file": "v.txt", "idf_file": "i.txt", "vector_file": "w.txt",
            "corpus_dir": "corpus", "output_dir": "out", "drain": "complete", "prune": 100
        }"#;
        let params: ExtractParams = serde_json::from_str(json).unwrap();

        assert_eq!(params.vector_dim, 50);
        assert_eq!(params.context_size, 5);
        assert_eq!(params.eod_marker, "eeeoddd");
        assert_eq!(params.ss_marker, "<s>");
        assert_eq!(params.es_marker, "</s>");
        assert!(params.preindexed);
        assert_eq!(params.drain, DrainPolicy::Complete);
        assert_eq!(params.prune, Some(100));
        assert_eq!(params.numeric_pattern, NUMERIC_PATTERN);
    }

    #[test]
    fn numeric_pattern_is_a_parameter_test() {

        let json = r#"{
            "vocab_file": "v.txt", "idf_file": "i.txt", "vector_file": "w.txt",
            "corpus_dir": "corpus", "output_dir": "out", "numeric_pattern": "^[0-9]+$"
        }"#;
        let params: ExtractParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.numeric_pattern, "^[0-9]+$");
    }

    #[test]
    fn unknown_keys_are_rejected_test() {

        let json = r#"{
            "vocab_file": "v.txt", "idf_file": "i.txt", "vector_file": "w.txt",
            "corpus_dir": "corpus", "output_dir": "out", "contextsize": 3
        }"#;
        assert!(serde_json::from_str::<ExtractParams>(json).is_err());
    }

    #[test]
    fn prune_and_cache_size_test() {

        let mut params = ExtractParams::new(Path::new("v"), Path::new("i"), Path::new("w"), Path::new("c"), Path::new("o"));
        assert_eq!(params.shard_count(10), 10);
        params.prune = Some(0);
        assert_eq!(params.shard_count(10), 10);
        params.prune = Some(4);
        assert_eq!(params.shard_count(10), 4);
        params.prune = Some(40);
        assert_eq!(params.shard_count(10), 10);

        assert_eq!(params.cache_size(4), 4);
        params.file_cache_size = Some(2);
        assert_eq!(params.cache_size(4), 2);
    }

    #[test]
    fn config_validates_paths_test() {

        let dir = tempfile::tempdir().unwrap();
        let args = vec!["context_extractor".to_string()];
        assert!(matches!(Config::new(&args), Err(ExtractError::Usage(_))));

        let missing = dir.path().join("params.json");
        let args = vec!["context_extractor".to_string(), missing.display().to_string()];
        assert!(matches!(Config::new(&args), Err(ExtractError::MissingFile { .. })));

        fs::write(&missing, "{ not json").unwrap();
        assert!(matches!(Config::new(&args), Err(ExtractError::Params { .. })));

        for name in ["v.txt", "i.txt", "w.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let params = ExtractParams::new(
            &dir.path().join("v.txt"),
            &dir.path().join("i.txt"),
            &dir.path().join("w.txt"),
            &dir.path().join("corpus"),
            dir.path(),
        );
        fs::write(&missing, serde_json::to_string(&params).unwrap()).unwrap();
        assert!(matches!(Config::new(&args), Err(ExtractError::MissingDirectory { .. })));

        fs::create_dir(dir.path().join("corpus")).unwrap();
        let config = Config::new(&args).unwrap();
        assert_eq!(config.get_params(), params);
    }

}
