//! Offline semantic search over a directory of PDFs.
//!
//! Pages are extracted as plain text, split into overlapping chunks, embedded with the local
//! model and stored in SQLite. A search spec then names the query and the persona metadata
//! echoed back in the report.

mod chunking;
mod run;
mod snippet;
mod spec;
mod store;

pub use run::{run, run_index};
