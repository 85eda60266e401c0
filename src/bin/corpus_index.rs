use context_extractor::{deindex_corpus, index_corpus, ExtractError, IndexingParams, Vocabulary};
use std::env;
use std::path::Path;
use std::process::ExitCode;
use log::error;


// converts a corpus directory between words and vocabulary ids.
// treated as binary executable so it can be ran independantly from main
//
// arguments to this executable should be:
// a selector: "index" (words -> ids) or "deindex" (ids -> words)
// path to the vocabulary file
// input corpus directory
// output corpus directory (must exist)
// optionally the digit replacement string for numbers, or "-" to disable it
// example: ... index Input/vocab.txt Input/corpus Output/corpus DG

const USAGE: &str = "corpus_index <index|deindex> <vocab> <input dir> <output dir> [digit replacement|-]";

fn main() -> ExitCode {

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Vec<String> = env::args().collect();

    match run(&args) {
        Ok(count) => {
            log::info!("rewrote {} tokens", count);
            ExitCode::SUCCESS
        },
        Err(e) => {
            error!("{}", e);
            ExitCode::from(&e)
        }
    }
}

fn run(args: &[String]) -> context_extractor::Result<usize> {

    if args.len() != 5 && args.len() != 6 {
        return Err(ExtractError::Usage(USAGE.to_string()));
    }

    let vocab = Vocabulary::read(Path::new(&args[2]))?;
    let input_dir = Path::new(&args[3]);
    let output_dir = Path::new(&args[4]);
    for dir in [input_dir, output_dir] {
        if !dir.is_dir() {
            return Err(ExtractError::MissingDirectory { path: dir.to_path_buf() });
        }
    }

    let mut params = IndexingParams::default();
    if let Some(replacement) = args.get(5) {
        params.digit_fallback = if replacement == "-" { None } else { Some(replacement.to_owned()) };
    }

    match args[1].as_str() {
        "index" => index_corpus(&vocab, input_dir, output_dir, &params),
        "deindex" => deindex_corpus(&vocab, input_dir, output_dir, &params),
        _ => Err(ExtractError::Usage(USAGE.to_string())),
    }
}
