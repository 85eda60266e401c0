// imports
use crate::config::Config;
use crate::error::Result;
use crate::extract::{self, ExtractionStats};

use std::env;
use std::process::ExitCode;
use std::time::Instant;
use log::{error, info};

pub struct Pipeline {}

impl Pipeline {

    // runs the extraction procedure in 2 steps -
    // -> configuration of arguments (json parameter file)
    // -> context extraction into per word shards

    pub fn run() -> ExitCode {

        let args: Vec<String> = env::args().collect();
        match Pipeline::run_with_args(&args) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{}", e);
                ExitCode::from(&e)
            }
        }
    }

    pub fn run_with_args(args: &[String]) -> Result<ExtractionStats> {

        info!("building parameters...");
        let params = Config::new(args)?.get_params();
        info!("{}", params);

        let timer = Instant::now();
        info!("starting context extraction...");
        let stats = extract::run(&params)?;
        info!("finished context extraction, took {} seconds ...", timer.elapsed().as_secs());

        Ok(stats)
    }

}


#[cfg(test)]
mod tests {

    use super::Pipeline;
    use crate::config::ExtractParams;
    use crate::error::ExtractError;
    use std::fs;

    #[test]
    fn pipeline_test() {

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("vocab.txt"), "<s>\n</s>\ncat\ndog\n").unwrap();
        fs::write(root.join("idf.txt"), "0 0 1 1").unwrap();
        fs::write(root.join("vectors.txt"), "0 0\n0 0\n2 1\n4 3\n").unwrap();
        fs::create_dir(root.join("corpus")).unwrap();
        fs::create_dir(root.join("out")).unwrap();
        fs::write(root.join("corpus").join("a.txt"), "2\n3\n").unwrap();

        let mut params = ExtractParams::new(
            &root.join("vocab.txt"),
            &root.join("idf.txt"),
            &root.join("vectors.txt"),
            &root.join("corpus"),
            &root.join("out"),
        );
        params.vector_dim = 2;
        params.context_size = 1;
        let json = root.join("params.json");
        fs::write(&json, serde_json::to_string_pretty(&params).unwrap()).unwrap();

        let args = vec!["context_extractor".to_string(), json.display().to_string()];
        let stats = Pipeline::run_with_args(&args).unwrap();
        assert_eq!(stats.vectors_written, 1);

        let bytes = fs::read(root.join("out").join("2.vectors")).unwrap();
        assert_eq!(bytes.len(), 2 * 4);
    }

    #[test]
    fn exit_codes_test() {

        let err = Pipeline::run_with_args(&["context_extractor".to_string()]).unwrap_err();
        assert!(matches!(err, ExtractError::Usage(_)));
        assert_eq!(err.exit_code(), 1);
    }

}
