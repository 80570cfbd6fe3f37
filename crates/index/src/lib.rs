mod corpus;
mod dense;
mod error;
mod jsonl;
mod lexical;
mod manifest;

pub use corpus::CorpusStore;
pub use dense::FlatIndex;
pub use error::{IndexError, Result};
pub use jsonl::{read_jsonl, JsonlWriter};
pub use lexical::{Bm25Index, Bm25Params};
pub use manifest::{
    load_snapshot, write_snapshot, IndexLayout, IndexManifest, IndexSnapshot, DENSE_FILE,
    LEXICAL_FILE, MANIFEST_FILE, META_FILE,
};
