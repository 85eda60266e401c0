// sense relabelling: the extraction window is run over a corpus again and every centred
// token is written back as its two digit sense followed by its word, e.g. `01bank`.
// End of document markers are copied through.

use crate::aggregate::aggregate;
use crate::clusters::{ClusterModel, SenseClassifier};
use crate::config::ExtractParams;
use crate::error::{ExtractError, Result};
use crate::extract::{corpus_files, corpus_resolver, document_window, open_corpus};
use crate::vocab::{byte_lines, VocabularyIndex};

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use log::info;


struct Labeler<'a, C> {
    vocab: &'a VocabularyIndex,
    models: &'a HashMap<usize, ClusterModel>,
    classifier: &'a C,
    context_size: usize,
}

impl<'a, C: SenseClassifier> Labeler<'a, C> {

    // words without a model, and windows whose neighbours carry no weight, get sense 0
    fn sense(&self, window: &[usize]) -> usize {
        let centre = window[self.context_size];
        match (self.models.get(&centre), aggregate(window, self.vocab, self.context_size)) {
            (Some(model), Some(context)) => self.classifier.classify(context.view(), model),
            _ => 0,
        }
    }
}

// one relabelled output file
struct LabelledFile {
    writer: BufWriter<File>,
    path: PathBuf,
    labelled: usize,
}

impl LabelledFile {

    fn create(path: PathBuf) -> Result<LabelledFile> {
        let f = File::create(&path).map_err(|e| ExtractError::io(&path, e))?;
        Ok(Self { writer: BufWriter::new(f), path, labelled: 0 })
    }

    fn write_label<C: SenseClassifier>(&mut self, window: &[usize], labeler: &Labeler<'_, C>) -> Result<()> {

        let centre = window[labeler.context_size];
        let word = labeler.vocab.vocabulary().word(centre).unwrap_or_default();
        self.labelled += 1;
        write!(self.writer, "{:02}", labeler.sense(window))
            .and_then(|_| self.writer.write_all(word))
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|e| ExtractError::io(&self.path, e))
    }

    fn write_marker(&mut self, marker: &[u8]) -> Result<()> {
        self.writer.write_all(marker)
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|e| ExtractError::io(&self.path, e))
    }

    fn finish(mut self) -> Result<usize> {
        self.writer.flush().map_err(|e| ExtractError::io(&self.path, e))?;
        Ok(self.labelled)
    }
}

/// Relabels every corpus file of `params.corpus_dir` into `output_dir` using the sense
/// `models` keyed by vocabulary id. Returns the number of labelled tokens.
///
/// The window, markers and resolver are set up exactly as for extraction, so the positions
/// that produced context vectors are the ones that get labelled.
pub fn relabel_corpus<C: SenseClassifier>(
    vocab: &VocabularyIndex,
    models: &HashMap<usize, ClusterModel>,
    classifier: &C,
    params: &ExtractParams,
    output_dir: &Path,
) -> Result<usize> {

    let mut window = document_window(vocab, params)?;
    let resolver = corpus_resolver(vocab, params)?;
    let labeler = Labeler { vocab, models, classifier, context_size: params.context_size };
    let eod_marker = params.eod_marker.as_bytes();

    let mut count = 0;
    for path in corpus_files(&params.corpus_dir, &params.corpus_extension)? {

        info!("relabelling corpus file {}", path.display());
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        let mut out = LabelledFile::create(output_dir.join(name.strip_suffix(".gz").unwrap_or(&name)))?;

        window.reset();
        for (i, line) in byte_lines(open_corpus(&path)?).enumerate() {
            let token = line.map_err(|e| ExtractError::io(&path, e))?;

            if token == eod_marker {
                window.finish_document(|w| out.write_label(w, &labeler))?;
                out.write_marker(eod_marker)?;
                continue;
            }
            let id = resolver.resolve(&token).map_err(|e| e.at(&path, i + 1))?;
            window.push(id, |w| out.write_label(w, &labeler))?;
        }
        window.finish_document(|w| out.write_label(w, &labeler))?;
        count += out.finish()?;
    }

    info!("relabelled {} tokens", count);
    Ok(count)
}
