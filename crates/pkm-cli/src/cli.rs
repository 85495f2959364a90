use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pkm_rag::SearchMode;

#[derive(Debug, Parser)]
#[command(name = "pkm", version, about = "Personal knowledge management pipeline")]
pub struct Cli {
    /// Emit structured JSON logs instead of the default compact format.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the chunker over one file or the whole vault, write the chunk store.
    Chunk {
        /// A single vault file, or omitted to chunk the whole vault.
        path: Option<PathBuf>,
    },
    /// Run incremental embedding for any chunk hash missing from the active model.
    Embed {
        #[arg(long)]
        model: Option<String>,
    },
    /// Upsert new chunk hashes into the lexical index, or fully rebuild.
    Index {
        #[arg(long)]
        rebuild: bool,
    },
    /// Run the hybrid engine and print ranked hits.
    Search {
        query: String,
        #[arg(long, value_enum, default_value_t = ModeArg::Hybrid)]
        mode: ModeArg,
        #[arg(long, default_value_t = 10)]
        k: usize,
    },
    /// Recompute and print relevance scores.
    Relevance {
        #[arg(long)]
        min_score: Option<f64>,
        #[arg(long)]
        verbose: bool,
    },
    /// Rebuild the link graph.
    Link {
        /// Report every unresolved link without mutating any record.
        #[arg(long)]
        validate: bool,
    },
    /// Convenience verb chaining chunk -> embed -> index -> link -> relevance for one file.
    Update { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeArg {
    Hybrid,
    Keyword,
    Semantic,
}

impl From<ModeArg> for SearchMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Hybrid => SearchMode::Hybrid,
            ModeArg::Keyword => SearchMode::Keyword,
            ModeArg::Semantic => SearchMode::Semantic,
        }
    }
}
