mod aggregate;
mod config;
mod error;
mod extract;
mod indexing;
mod limits;
mod pipeline;
mod relabel;
mod resolver;
mod shards;
mod window;
mod vocab;
pub mod clusters;

pub use aggregate::aggregate;
pub use config::{Config, ExtractParams};
pub use error::{ExtractError, Result};
pub use extract::{run, ContextExtractor, ExtractionStats};
pub use indexing::{deindex_corpus, index_corpus, IndexingParams};
pub use limits::FileLimit;
pub use pipeline::Pipeline;
pub use relabel::relabel_corpus;
pub use resolver::{read_index, ResolverOptions, WordResolver};
pub use shards::{export_npy, read_shard, shard_path, ShardWriter};
pub use vocab::{Vocabulary, VocabularyIndex};
pub use window::{ContextWindow, DrainPolicy, Phase};
