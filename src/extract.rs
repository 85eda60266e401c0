// the extraction pass: corpus tokens -> ids -> sliding window -> weighted context vector -> shard
// of the centred id.

use crate::aggregate::aggregate;
use crate::config::ExtractParams;
use crate::error::{ExtractError, Result};
use crate::limits::FileLimit;
use crate::resolver::{ResolverOptions, WordResolver};
use crate::shards::ShardWriter;
use crate::vocab::{byte_lines, VocabularyIndex};
use crate::window::ContextWindow;

use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use flate2::read::GzDecoder;
use log::{debug, info};


#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub files: usize,
    pub documents: usize,
    pub tokens: usize,
    pub vectors_written: usize,
    pub skipped_degenerate: usize, // neighbour idfs summed to zero
    pub skipped_pruned: usize,
}

impl Display for ExtractionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} files, {} documents, {} tokens, {} context vectors written ({} degenerate, {} pruned)",
        self.files, self.documents, self.tokens, self.vectors_written, self.skipped_degenerate, self.skipped_pruned)
    }
}

pub struct ContextExtractor<'v> {
    vocab: &'v VocabularyIndex,
    resolver: WordResolver<'v>,
    window: ContextWindow,
    shards: ShardWriter,
    eod_marker: String,
    extension: String,
    stats: ExtractionStats,
}

impl<'v> ContextExtractor<'v> {

    /// Checks the marker tokens against the vocabulary before anything is opened.
    pub fn new(vocab: &'v VocabularyIndex, params: &ExtractParams, limit: &FileLimit) -> Result<ContextExtractor<'v>> {

        let window = document_window(vocab, params)?;
        let resolver = corpus_resolver(vocab, params)?;

        let shard_count = params.shard_count(vocab.len());
        let shards = ShardWriter::new(&params.output_dir, shard_count, params.cache_size(shard_count), limit);

        Ok(Self {
            vocab,
            resolver,
            window,
            shards,
            eod_marker: params.eod_marker.clone(),
            extension: params.corpus_extension.clone(),
            stats: ExtractionStats::default(),
        })
    }

    /// Corpus files of `corpus_dir`, plain or gzipped, in name order.
    pub fn corpus_files(&self, corpus_dir: &Path) -> Result<Vec<PathBuf>> {
        corpus_files(corpus_dir, &self.extension)
    }

    pub fn run(&mut self, corpus_dir: &Path) -> Result<ExtractionStats> {

        for path in self.corpus_files(corpus_dir)? {
            self.process_file(&path)?;
        }
        debug!("closing {} open shards", self.shards.open_handles());
        self.shards.close_all()?;
        Ok(self.stats.clone())
    }

    pub fn process_file(&mut self, path: &Path) -> Result<()> {

        info!("reading corpus file {}", path.display());
        let before = self.stats.clone();
        let reader = open_corpus(path)?;

        let vocab = self.vocab;
        let context_size = self.window.context_size();
        self.window.reset();
        let mut doc_tokens = 0;

        for (i, line) in byte_lines(reader).enumerate() {
            let token = line.map_err(|e| ExtractError::io(path, e))?;

            if token == self.eod_marker.as_bytes() {
                self.window.finish_document(|w| emit(w, vocab, context_size, &mut self.shards, &mut self.stats))?;
                if doc_tokens > 0 {
                    self.stats.documents += 1;
                }
                doc_tokens = 0;
                continue;
            }

            let id = self.resolver.resolve(&token).map_err(|e| e.at(path, i + 1))?;
            self.stats.tokens += 1;
            doc_tokens += 1;
            self.window.push(id, |w| emit(w, vocab, context_size, &mut self.shards, &mut self.stats))?;
        }

        self.window.finish_document(|w| emit(w, vocab, context_size, &mut self.shards, &mut self.stats))?;
        if doc_tokens > 0 {
            self.stats.documents += 1;
        }
        self.stats.files += 1;

        debug!("{}: {} documents, {} context vectors", path.display(),
            self.stats.documents - before.documents, self.stats.vectors_written - before.vectors_written);
        Ok(())
    }
}

// routes the context vector of the centred id to its shard
fn emit(window: &[usize], vocab: &VocabularyIndex, context_size: usize, shards: &mut ShardWriter, stats: &mut ExtractionStats) -> Result<()> {

    let centre = window[context_size];
    if centre >= shards.num_shards() {
        stats.skipped_pruned += 1;
        return Ok(());
    }

    match aggregate(window, vocab, context_size) {
        Some(vector) => {
            shards.write_vector(centre, vector.view())?;
            stats.vectors_written += 1;
        },
        None => stats.skipped_degenerate += 1,
    }
    Ok(())
}

// window padded with the sentence markers, which must be in the vocabulary
pub(crate) fn document_window(vocab: &VocabularyIndex, params: &ExtractParams) -> Result<ContextWindow> {

    let words = vocab.vocabulary();
    let start_id = words.require(&params.ss_marker, "start of sentence")?;
    let end_id = words.require(&params.es_marker, "end of sentence")?;

    if vocab.vecdim() != params.vector_dim {
        return Err(ExtractError::Format(format!(
            "vectors have dimension {}, parameters ask for {}", vocab.vecdim(), params.vector_dim
        )));
    }
    Ok(ContextWindow::new(params.context_size, start_id, end_id, params.drain))
}

pub(crate) fn corpus_resolver<'v>(vocab: &'v VocabularyIndex, params: &ExtractParams) -> Result<WordResolver<'v>> {

    let words = vocab.vocabulary();
    let oov_id = if params.preindexed { 0 } else { words.require(&params.oov_token, "out of vocabulary")? };
    let options = ResolverOptions::new(params.preindexed, oov_id)
        .with_digit_fallback(params.digit_fallback.clone())
        .with_numeric_pattern(&params.numeric_pattern);
    WordResolver::new(words, options)
}

pub(crate) fn corpus_files(corpus_dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {

    let plain = format!(".{}", extension);
    let gzipped = format!(".{}.gz", extension);

    let mut files: Vec<PathBuf> = Vec::new();
    let entries = fs::read_dir(corpus_dir).map_err(|e| ExtractError::io(corpus_dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| ExtractError::io(corpus_dir, e))?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if path.is_file() && (name.ends_with(&plain) || name.ends_with(&gzipped)) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub(crate) fn open_corpus(path: &Path) -> Result<Box<dyn BufRead>> {

    let f = File::open(path).map_err(|e| ExtractError::io(path, e))?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(f))))
    } else {
        Ok(Box::new(BufReader::new(f)))
    }
}

/// Loads the vocabulary, raises the open file limit and runs the extraction over the corpus.
pub fn run(params: &ExtractParams) -> Result<ExtractionStats> {

    let timer = Instant::now();
    let vocab = VocabularyIndex::from_files(&params.vocab_file, &params.idf_file, &params.vector_file, params.vector_dim)?;
    info!("loaded vocabulary of {} words, took {} seconds", vocab.len(), timer.elapsed().as_secs());

    let shard_count = params.shard_count(vocab.len());
    let limit = FileLimit::raise(params.cache_size(shard_count));

    let mut extractor = ContextExtractor::new(&vocab, params, &limit)?;
    let stats = extractor.run(&params.corpus_dir)?;
    info!("finished extraction: {}", stats);
    Ok(stats)
}
