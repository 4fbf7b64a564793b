// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Knowledge Base
//!
//! Research documents stored with their embeddings and queried by cosine
//! similarity.
//!
//! - [`embeddings`]: the embedding provider seam and the similarity engine
//! - [`repository`]: document CRUD and similarity queries over a record store
//! - [`processor`]: chunking, key information extraction and categorisation

pub mod embeddings;
pub mod processor;
pub mod repository;

pub use embeddings::{cosine_similarity, normalize_text, EmbeddingProvider, ScoredDocument};
pub use repository::{DocumentUpdate, KnowledgeBaseRepository, NewDocument};
