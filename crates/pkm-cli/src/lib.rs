#![doc = r#"
pkm-cli — the external front-end over the pipeline: vault ingestion,
layered configuration, and one verb per pipeline stage. Still built on the
same ambient stack as every other crate in the workspace; nothing here
bypasses `pkm-error::Result` or reaches for `println!`-as-logging.
"#]

pub mod cli;
pub mod commands;
pub mod config;
pub mod tracing_init;
pub mod vault;
