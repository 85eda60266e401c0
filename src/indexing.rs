// conversion between word corpora and pre-indexed corpora (one vocabulary id per line).
// End of document markers are copied through unchanged in both directions.

use crate::error::{ExtractError, Result};
use crate::extract::{corpus_files, open_corpus};
use crate::resolver::{read_index, ResolverOptions, WordResolver, NUMERIC_PATTERN};
use crate::vocab::{byte_lines, Vocabulary};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use log::info;


#[derive(Clone, Debug)]
pub struct IndexingParams {
    pub eod_marker: String,
    pub oov_token: String,
    pub digit_fallback: Option<String>,
    pub numeric_pattern: String,
    pub corpus_extension: String,
}

impl Default for IndexingParams {
    fn default() -> Self {
        Self {
            eod_marker: "eeeoddd".to_string(),
            oov_token: "UUUNKKK".to_string(),
            digit_fallback: Some("DG".to_string()),
            numeric_pattern: NUMERIC_PATTERN.to_string(),
            corpus_extension: "txt".to_string(),
        }
    }
}

/// Rewrites every corpus file of `input_dir` into `output_dir` with words replaced by ids.
/// Returns the number of tokens written.
pub fn index_corpus(vocab: &Vocabulary, input_dir: &Path, output_dir: &Path, params: &IndexingParams) -> Result<usize> {

    let oov_id = vocab.require(&params.oov_token, "out of vocabulary")?;
    let options = ResolverOptions::new(false, oov_id)
        .with_digit_fallback(params.digit_fallback.clone())
        .with_numeric_pattern(&params.numeric_pattern);
    let resolver = WordResolver::new(vocab, options)?;

    let mut count = 0;
    let mut oov = 0;
    for path in corpus_files(input_dir, &params.corpus_extension)? {
        count += rewrite(&path, output_dir, &params.eod_marker, |token, out| {
            let id = resolver.resolve(token)?;
            if id == oov_id {
                oov += 1;
            }
            out.extend_from_slice(id.to_string().as_bytes());
            Ok(())
        })?;
    }
    info!("indexed {} tokens, {} out of vocabulary", count, oov);
    Ok(count)
}

/// The inverse of [`index_corpus`]: ids are replaced by their words.
pub fn deindex_corpus(vocab: &Vocabulary, input_dir: &Path, output_dir: &Path, params: &IndexingParams) -> Result<usize> {

    let mut count = 0;
    for path in corpus_files(input_dir, &params.corpus_extension)? {
        count += rewrite(&path, output_dir, &params.eod_marker, |token, out| {
            let id = read_index(token, vocab.len())?;
            out.extend_from_slice(vocab.word(id).unwrap_or_default());
            Ok(())
        })?;
    }
    info!("deindexed {} tokens", count);
    Ok(count)
}

// copies `path` into `output_dir` line by line, mapping every non-marker token.
// Gzipped input is written out decompressed, without the `.gz` suffix.
fn rewrite<F>(path: &Path, output_dir: &Path, eod_marker: &str, mut map: F) -> Result<usize>
where
    F: FnMut(&[u8], &mut Vec<u8>) -> Result<()>,
{
    info!("reading corpus file {}", path.display());
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    let out_path = output_dir.join(name.strip_suffix(".gz").unwrap_or(&name));

    let reader = open_corpus(path)?;
    let mut writer = BufWriter::new(File::create(&out_path).map_err(|e| ExtractError::io(&out_path, e))?);

    let mut count = 0;
    let mut mapped: Vec<u8> = Vec::new();
    for (i, line) in byte_lines(reader).enumerate() {
        let token = line.map_err(|e| ExtractError::io(path, e))?;
        mapped.clear();
        if token == eod_marker.as_bytes() {
            mapped.extend_from_slice(&token);
        } else {
            count += 1;
            map(&token, &mut mapped).map_err(|e| e.at(path, i + 1))?;
        }
        mapped.push(b'\n');
        writer.write_all(&mapped).map_err(|e| ExtractError::io(&out_path, e))?;
    }
    writer.flush().map_err(|e| ExtractError::io(&out_path, e))?;
    Ok(count)
}


#[cfg(test)]
mod tests {

    use super::{deindex_corpus, index_corpus, IndexingParams};
    use crate::error::ExtractError;
    use crate::vocab::Vocabulary;
    use std::fs;
    use std::io::Write;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn vocab() -> Vocabulary {
        let words = ["UUUNKKK", "<s>", "</s>", "the", "cat", "DG"];
        Vocabulary::from_words(words.iter().map(|w| w.to_string()))
    }

    #[test]
    fn index_then_deindex_test() {

        let input = tempfile::tempdir().unwrap();
        let indexed = tempfile::tempdir().unwrap();
        let restored = tempfile::tempdir().unwrap();
        fs::write(input.path().join("a.txt"), "the\ncat\n7\nzebra\neeeoddd\ncat\n").unwrap();
        fs::write(input.path().join("skip.md"), "the\n").unwrap();

        let params = IndexingParams::default();
        let count = index_corpus(&vocab(), input.path(), indexed.path(), &params).unwrap();
        assert_eq!(count, 5);
        assert_eq!(fs::read_to_string(indexed.path().join("a.txt")).unwrap(), "3\n4\n5\n0\neeeoddd\n4\n");
        assert!(!indexed.path().join("skip.md").exists());

        deindex_corpus(&vocab(), indexed.path(), restored.path(), &params).unwrap();
        assert_eq!(fs::read_to_string(restored.path().join("a.txt")).unwrap(), "the\ncat\nDG\nUUUNKKK\neeeoddd\ncat\n");
    }

    #[test]
    fn gzipped_and_undecodable_input_test() {

        let input = tempfile::tempdir().unwrap();
        let indexed = tempfile::tempdir().unwrap();

        let f = fs::File::create(input.path().join("b.txt.gz")).unwrap();
        let mut gz = GzEncoder::new(f, Compression::default());
        gz.write_all(b"cat\ncaf\xe9\n12\n").unwrap();
        gz.finish().unwrap();

        // single digits only: 12 is not digified and stays oov
        let params = IndexingParams { numeric_pattern: r"^[0-9]$".to_string(), ..IndexingParams::default() };
        let count = index_corpus(&vocab(), input.path(), indexed.path(), &params).unwrap();
        assert_eq!(count, 3);
        assert_eq!(fs::read_to_string(indexed.path().join("b.txt")).unwrap(), "4\n0\n0\n");
    }

    #[test]
    fn missing_oov_token_test() {

        let input = tempfile::tempdir().unwrap();
        let params = IndexingParams { oov_token: "<unk>".to_string(), ..IndexingParams::default() };
        let err = index_corpus(&vocab(), input.path(), input.path(), &params).unwrap_err();
        assert!(matches!(err, ExtractError::Config(_)));
    }

    #[test]
    fn deindex_rejects_bad_ids_test() {

        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("a.txt"), "1\n42\n").unwrap();

        let err = deindex_corpus(&vocab(), input.path(), output.path(), &IndexingParams::default()).unwrap_err();
        match err {
            ExtractError::Range { location, index, .. } => {
                assert!(location.ends_with("a.txt:2"));
                assert_eq!(index, 42);
            },
            other => panic!("unexpected {:?}", other),
        }
    }

}
