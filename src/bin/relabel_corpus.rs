use context_extractor::clusters::{read_models, NearestCentroid};
use context_extractor::{relabel_corpus, Config, ExtractError, VocabularyIndex};
use std::env;
use std::path::Path;
use std::process::ExitCode;
use log::{error, info};


// rewrites a corpus with every token prefixed by its two digit sense.
// treated as binary executable so it can be ran after the clustering step
//
// arguments to this executable should be:
// path to the json parameter file of the extraction run (vocabulary, vectors, corpus, markers)
// directory holding the <id>.centers.txt files of the clustering step
// output corpus directory (must exist)
// example: ... Input/params.json Output/clusters Output/relabelled

const USAGE: &str = "relabel_corpus <params json> <cluster dir> <output dir>";

fn main() -> ExitCode {

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Vec<String> = env::args().collect();

    match run(&args) {
        Ok(count) => {
            info!("relabelled {} tokens", count);
            ExitCode::SUCCESS
        },
        Err(e) => {
            error!("{}", e);
            ExitCode::from(&e)
        }
    }
}

fn run(args: &[String]) -> context_extractor::Result<usize> {

    if args.len() != 4 {
        return Err(ExtractError::Usage(USAGE.to_string()));
    }

    let params = Config::read_params(Path::new(&args[1]))?;
    params.validate()?;
    let cluster_dir = Path::new(&args[2]);
    let output_dir = Path::new(&args[3]);
    for dir in [cluster_dir, output_dir] {
        if !dir.is_dir() {
            return Err(ExtractError::MissingDirectory { path: dir.to_path_buf() });
        }
    }

    let vocab = VocabularyIndex::from_files(&params.vocab_file, &params.idf_file, &params.vector_file, params.vector_dim)?;
    let models = read_models(cluster_dir, params.vector_dim)?;
    relabel_corpus(&vocab, &models, &NearestCentroid, &params, output_dir)
}
