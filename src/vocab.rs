// vocabulary side of the pipeline: word list, idf weights and pretrained vectors,
// all aligned by line order. The id of a word is its 0-based line number.

use crate::error::{ExtractError, Result};

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use log::debug;
use ndarray::{Array2, ArrayView1};


/// Lines of `reader` as raw bytes, without the trailing `\n` or `\r\n`.
/// Words are compared byte for byte, so text in any encoding passes through.
pub(crate) fn byte_lines<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<Vec<u8>>> {
    reader.split(b'\n').map(|line| {
        line.map(|mut bytes| {
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            bytes
        })
    })
}

/// Ordered word list with exact-match lookup.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    words: Vec<Vec<u8>>,
    t2i: HashMap<Vec<u8>, usize>,
}

impl Vocabulary {

    pub fn from_words<W>(words: W) -> Vocabulary
    where
        W: IntoIterator,
        W::Item: Into<Vec<u8>>,
    {
        let mut vocab = Vocabulary::default();
        for word in words {
            let word: Vec<u8> = word.into();
            // a repeated word keeps the id of its last occurrence
            vocab.t2i.insert(word.clone(), vocab.words.len());
            vocab.words.push(word);
        }
        vocab
    }

    pub fn read(file_path: &Path) -> Result<Vocabulary> {

        let f = File::open(file_path).map_err(|e| ExtractError::io(file_path, e))?;
        let words = byte_lines(BufReader::new(f))
            .collect::<io::Result<Vec<Vec<u8>>>>()
            .map_err(|e| ExtractError::io(file_path, e))?;
        Ok(Vocabulary::from_words(words))
    }

    pub fn id_of<T: AsRef<[u8]> + ?Sized>(&self, word: &T) -> Option<usize> {
        self.t2i.get(word.as_ref()).copied()
    }

    pub fn word(&self, id: usize) -> Option<&[u8]> {
        self.words.get(id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Lookup of a marker token that has to be present for the run to make sense.
    pub fn require(&self, word: &str, role: &str) -> Result<usize> {
        self.id_of(word).ok_or_else(|| {
            ExtractError::Config(format!("{} marker {:?} is not in the vocabulary", role, word))
        })
    }
}


/// Immutable vocabulary with one idf weight and one vector per id.
#[derive(Clone, Debug)]
pub struct VocabularyIndex {
    vocab: Vocabulary,
    idfs: Vec<f32>,
    vectors: Array2<f32>, // shape (vocab_size, vecdim), row i is the vector of id i
}

impl VocabularyIndex {

    /// Builds the index from three aligned streams. The idf stream must hold exactly one
    /// value per word and the vector stream exactly `vecdim` values per word.
    pub fn load<W, I, V, S, T>(words: W, idfs: I, vectors: V, vecdim: usize) -> Result<VocabularyIndex>
    where
        W: IntoIterator,
        W::Item: Into<Vec<u8>>,
        I: IntoIterator<Item = S>,
        V: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        VocabularyIndex::load_named(words, ("idf stream", idfs), ("vector stream", vectors), vecdim)
    }

    // `idfs` and `vectors` carry the name errors are reported against
    fn load_named<W, I, V, S, T>(words: W, idfs: (&str, I), vectors: (&str, V), vecdim: usize) -> Result<VocabularyIndex>
    where
        W: IntoIterator,
        W::Item: Into<Vec<u8>>,
        I: IntoIterator<Item = S>,
        V: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let vocab = Vocabulary::from_words(words);
        let n = vocab.len();
        let (idf_name, idfs) = idfs;
        let (vec_name, vectors) = vectors;

        let mut idf_values: Vec<f32> = Vec::with_capacity(n);
        let mut idf_iter = idfs.into_iter();
        for i in 0..n {
            let token = idf_iter.next().ok_or_else(|| {
                ExtractError::Format(format!("{} holds {} values for {} words", idf_name, i, n))
            })?;
            idf_values.push(parse_f32(token.as_ref(), || format!("{} entry {}", idf_name, i + 1))?);
        }
        if idf_iter.next().is_some() {
            return Err(ExtractError::Format(format!("{} holds more than {} values", idf_name, n)));
        }

        let mut components: Vec<f32> = Vec::with_capacity(n * vecdim);
        let mut vec_iter = vectors.into_iter();
        for i in 0..n {
            for j in 0..vecdim {
                let token = vec_iter.next().ok_or_else(|| {
                    ExtractError::Format(format!("{} ends at entry {} of {} (dimension {})", vec_name, i + 1, n, vecdim))
                })?;
                components.push(parse_f32(token.as_ref(), || format!("{} entry {} component {}", vec_name, i + 1, j + 1))?);
            }
        }
        if vec_iter.next().is_some() {
            return Err(ExtractError::Format(format!("{} holds more than {} x {} values", vec_name, n, vecdim)));
        }

        let vectors = Array2::from_shape_vec((n, vecdim), components)
            .map_err(|e| ExtractError::Format(e.to_string()))?;

        Ok(VocabularyIndex { vocab, idfs: idf_values, vectors })
    }

    pub fn from_files(vocab_file: &Path, idf_file: &Path, vector_file: &Path, vecdim: usize) -> Result<VocabularyIndex> {

        let vocab = Vocabulary::read(vocab_file)?;
        let idf_text = fs::read_to_string(idf_file).map_err(|e| ExtractError::io(idf_file, e))?;
        let vector_text = fs::read_to_string(vector_file).map_err(|e| ExtractError::io(vector_file, e))?;

        let idf_name = idf_file.display().to_string();
        let vec_name = vector_file.display().to_string();
        let index = VocabularyIndex::load_named(
            vocab.words,
            (idf_name.as_str(), idf_text.split_whitespace()),
            (vec_name.as_str(), vector_text.split_whitespace()),
            vecdim,
        )?;
        debug!("loaded {} vocabulary entries of dimension {}", index.len(), vecdim);
        Ok(index)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn id_of<T: AsRef<[u8]> + ?Sized>(&self, word: &T) -> Option<usize> {
        self.vocab.id_of(word)
    }

    pub fn idf(&self, id: usize) -> f32 {
        self.idfs[id]
    }

    pub fn vector(&self, id: usize) -> ArrayView1<'_, f32> {
        self.vectors.row(id)
    }

    pub fn vecdim(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn len(&self) -> usize {
        self.vocab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocab.is_empty()
    }
}

fn parse_f32<F: FnOnce() -> String>(token: &str, location: F) -> Result<f32> {
    token.parse::<f32>().map_err(|_| ExtractError::Parse {
        location: location(),
        token: token.to_string(),
    })
}


#[cfg(test)]
mod tests {

    use super::{Vocabulary, VocabularyIndex};
    use crate::error::ExtractError;
    use std::fs;

    fn words(ws: &[&str]) -> Vec<String> {
        ws.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn ids_follow_file_order_test() {

        let index = VocabularyIndex::load(
            words(&["<s>", "</s>", "cat", "dog"]),
            ["0", "0", "1", "1.5"],
            ["0", "0", "0", "0", "2", "3", "4", "5"],
            2,
        ).unwrap();

        assert_eq!(index.len(), 4);
        assert_eq!(index.vecdim(), 2);
        assert_eq!(index.id_of("cat"), Some(2));
        assert_eq!(index.id_of("bird"), None);
        assert_eq!(index.idf(3), 1.5);
        assert_eq!(index.vector(3).to_vec(), vec![4.0, 5.0]);
        assert_eq!(index.vocabulary().word(1), Some(&b"</s>"[..]));
    }

    #[test]
    fn short_streams_are_format_errors_test() {

        let short_idf = VocabularyIndex::load(words(&["a", "b"]), ["1"], ["1", "2"], 1);
        assert!(matches!(short_idf, Err(ExtractError::Format(_))));

        let short_vec = VocabularyIndex::load(words(&["a", "b"]), ["1", "1"], ["1", "2", "3"], 2);
        assert!(matches!(short_vec, Err(ExtractError::Format(_))));

        let long_idf = VocabularyIndex::load(words(&["a"]), ["1", "2"], ["1"], 1);
        assert!(matches!(long_idf, Err(ExtractError::Format(_))));
    }

    #[test]
    fn bad_numbers_are_parse_errors_test() {

        let bad = VocabularyIndex::load(words(&["a", "b"]), ["1", "x"], ["1", "2"], 1);
        match bad {
            Err(ExtractError::Parse { location, token }) => {
                assert_eq!(token, "x");
                assert_eq!(location, "idf stream entry 2");
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn file_errors_name_the_file_test() {

        let dir = tempfile::tempdir().unwrap();
        let (vocab, idf, vectors) = (dir.path().join("vocab.txt"), dir.path().join("idf.txt"), dir.path().join("vectors.txt"));
        fs::write(&vocab, "a\nb\n").unwrap();
        fs::write(&idf, "1\nx\n").unwrap();
        fs::write(&vectors, "1 2\n3 y\n").unwrap();

        match VocabularyIndex::from_files(&vocab, &idf, &vectors, 2) {
            Err(ExtractError::Parse { location, .. }) => assert_eq!(location, format!("{} entry 2", idf.display())),
            other => panic!("unexpected {:?}", other),
        }

        fs::write(&idf, "1\n2\n").unwrap();
        match VocabularyIndex::from_files(&vocab, &idf, &vectors, 2) {
            Err(ExtractError::Parse { location, token }) => {
                assert_eq!(location, format!("{} entry 2 component 2", vectors.display()));
                assert_eq!(token, "y");
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn words_are_raw_bytes_test() {

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        fs::write(&path, b"cat\r\ncaf\xe9\n").unwrap();

        let vocab = Vocabulary::read(&path).unwrap();
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.id_of("cat"), Some(0));
        assert_eq!(vocab.id_of(&b"caf\xe9"[..]), Some(1));
        assert_eq!(vocab.word(1), Some(&b"caf\xe9"[..]));
    }

    #[test]
    fn missing_marker_is_config_error_test() {

        let vocab = Vocabulary::from_words(words(&["a", "b"]));
        assert_eq!(vocab.require("b", "end of sentence").unwrap(), 1);
        assert!(matches!(vocab.require("<s>", "start of sentence"), Err(ExtractError::Config(_))));
    }

}
