use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pdfoutline",
    version,
    about = "Extract titles and heading outlines from PDFs, and search PDF collections offline"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract the title and heading outline of one PDF, or of every PDF in a directory.
    Outline(OutlineArgs),
    /// Build the semantic search index for a directory of PDFs.
    Index(IndexArgs),
    /// Answer a persona/job query against a directory of PDFs.
    Search(SearchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct OutlineArgs {
    /// PDF to process.
    #[arg(required_unless_present_any = ["pages_json", "input_dir"])]
    pub pdf_path: Option<PathBuf>,

    /// Read pre-rendered page records instead of converting a PDF.
    #[arg(long, conflicts_with_all = ["pdf_path", "input_dir"])]
    pub pages_json: Option<PathBuf>,

    /// Process every PDF in this directory.
    #[arg(long, requires = "output_dir", conflicts_with = "pdf_path")]
    pub input_dir: Option<PathBuf>,

    /// Destination for `<stem>.json` files in directory mode.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Output JSON file; the outline is printed to stdout when omitted.
    #[arg(short, long, conflicts_with = "input_dir")]
    pub output: Option<PathBuf>,

    /// Indent the JSON output.
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// Also write the rendered page records to this file.
    #[arg(long, conflicts_with = "input_dir")]
    pub emit_pages: Option<PathBuf>,

    #[arg(long)]
    pub max_pages: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    #[arg(long)]
    pub data_dir: PathBuf,

    #[arg(long, default_value = ".cache/pdfoutline")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub index_path: Option<PathBuf>,

    #[arg(long)]
    pub model_id: Option<String>,

    #[arg(long, default_value_t = 1000)]
    pub chunk_size: usize,

    #[arg(long, default_value_t = 100)]
    pub chunk_overlap: usize,

    #[arg(long)]
    pub max_pages_per_doc: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// JSON search spec with the query, persona and document list.
    pub input: PathBuf,

    #[arg(default_value = "search_results.json")]
    pub output: PathBuf,

    #[arg(long, short = 'm')]
    pub model_id: Option<String>,

    #[arg(long, default_value = ".cache/pdfoutline")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub index_path: Option<PathBuf>,

    #[arg(long, default_value_t = 5)]
    pub top_k: usize,

    #[arg(long, default_value_t = 1000)]
    pub chunk_size: usize,

    #[arg(long, default_value_t = 100)]
    pub chunk_overlap: usize,

    /// Query the existing index instead of rebuilding it first.
    #[arg(long, default_value_t = false)]
    pub reuse_index: bool,
}
