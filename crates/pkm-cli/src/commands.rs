use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use pkm_chunk::HierarchicalChunker;
use pkm_core::{Chunk, DocId, DocumentRecord};
use pkm_embed::{EmbeddingProvider, HttpEmbeddingProvider, IncrementalEmbedder, NullEmbeddingProvider};
use pkm_index::{LexicalIndex, VectorIndex};
use pkm_link::rebuild_links;
use pkm_rag::{build_chunk_meta, HybridEngine, SearchParams};
use pkm_relevance::RelevanceWeights;
use pkm_store::{ChunkStore, EmbeddingStore, RecordStore};

use crate::cli::Command;
use crate::config::PkmConfig;
use crate::vault::parse_vault_file;

/// `nomic-embed-text`'s output dimension. `HttpEmbeddingProvider` needs a
/// dimension up front to build the client; a genuinely pluggable model
/// catalog is out of scope here.
const EMBEDDING_DIMENSION: usize = 768;

pub async fn dispatch(command: Command, config: &PkmConfig, root: &Path) -> pkm_error::Result<()> {
    match command {
        Command::Chunk { path } => chunk(config, root, path).await,
        Command::Embed { model } => embed(config, root, model).await,
        Command::Index { rebuild } => index(config, root, rebuild).await,
        Command::Search { query, mode, k } => search(config, root, &query, mode.into(), k).await,
        Command::Relevance { min_score, verbose } => relevance(config, root, min_score, verbose).await,
        Command::Link { validate } => link(config, root, validate).await,
        Command::Update { path } => update(config, root, path).await,
    }
}

async fn list_vault_files(vault_dir: &Path) -> pkm_error::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut stack = vec![vault_dir.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                stack.push(path);
            } else if path.extension().and_then(|e| e.to_str()) == Some("md") {
                out.push(path);
            }
        }
    }

    out.sort();
    Ok(out)
}

fn http_or_null_provider(config: &PkmConfig, model: &str) -> Arc<dyn EmbeddingProvider> {
    match HttpEmbeddingProvider::new(config.embeddings.ollama_url.clone(), model.to_string(), EMBEDDING_DIMENSION) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            tracing::warn!(error = %e, "failed to build the HTTP embedding client, falling back to a null provider");
            Arc::new(NullEmbeddingProvider::new(model.to_string(), EMBEDDING_DIMENSION))
        }
    }
}

#[tracing::instrument(skip(chunker, chunk_store, record_store))]
async fn chunk_one_file(
    path: &Path,
    chunker: &HierarchicalChunker,
    chunk_store: &ChunkStore,
    record_store: &RecordStore,
) -> pkm_error::Result<()> {
    let parsed = parse_vault_file(path).await?;
    let language = parsed.language().to_string();
    let doc_id = parsed.doc_id;
    let body = parsed.body.clone();

    let previous = record_store.read(&doc_id).await.ok();
    let record = parsed.into_record(previous.as_ref())?;

    let chunks = chunker.chunk(&doc_id, &body, &language)?;
    chunk_store.write(&doc_id, &chunks).await?;
    record_store.write(&record).await?;
    Ok(())
}

#[tracing::instrument(skip(config))]
async fn chunk(config: &PkmConfig, root: &Path, path: Option<PathBuf>) -> pkm_error::Result<()> {
    let chunker = HierarchicalChunker::new(config.chunking.chunk_size, config.chunking.overlap_tokens, config.chunking.min_chunk_tokens);
    let chunk_store = ChunkStore::new(config.paths.chunks_dir(root));
    let record_store = RecordStore::new(config.paths.metadata_dir(root));

    let files = match path {
        Some(p) => vec![p],
        None => list_vault_files(&config.paths.vault_dir(root)).await?,
    };

    let mut chunked = 0usize;
    let mut skipped = 0usize;
    for file in &files {
        match chunk_one_file(file, &chunker, &chunk_store, &record_store).await {
            Ok(()) => chunked += 1,
            Err(e) if e.is_warning() => {
                tracing::warn!(file = %file.display(), error = %e, "skipping unreadable vault file");
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(chunked, skipped, total = files.len(), "chunk run complete");
    Ok(())
}

#[tracing::instrument(skip(config))]
async fn embed(config: &PkmConfig, root: &Path, model: Option<String>) -> pkm_error::Result<()> {
    let model = model.unwrap_or_else(|| config.embeddings.model.clone());
    let chunk_store = ChunkStore::new(config.paths.chunks_dir(root));
    let embedding_store = EmbeddingStore::new(config.paths.embeddings_dir(root));
    let provider = HttpEmbeddingProvider::new(config.embeddings.ollama_url.clone(), model.clone(), EMBEDDING_DIMENSION)?;

    let embedder = IncrementalEmbedder::new(chunk_store, embedding_store, provider);
    let report = embedder.embed_missing().await?;

    tracing::info!(
        model = %report.model,
        already_present = report.already_present,
        newly_embedded = report.newly_embedded,
        provider_calls = report.provider_calls,
        "embed run complete"
    );
    Ok(())
}

fn avgdl(chunks: &[Chunk]) -> f32 {
    if chunks.is_empty() {
        return 0.0;
    }
    let total: usize = chunks.iter().map(|c| c.tokens).sum();
    total as f32 / chunks.len() as f32
}

/// Rebuilds both retrieval indexes wholesale from the chunk and embedding
/// stores. Neither index persists itself (`pkm-index`), so every CLI
/// invocation that needs one rebuilds it fresh from disk rather than reading
/// back a stale snapshot from a previous process.
async fn build_indexes(config: &PkmConfig, root: &Path, model: &str) -> pkm_error::Result<(Vec<Chunk>, LexicalIndex, VectorIndex)> {
    let chunk_store = ChunkStore::new(config.paths.chunks_dir(root));
    let embedding_store = EmbeddingStore::new(config.paths.embeddings_dir(root));

    let chunks: Vec<Chunk> = chunk_store.iter_all().await?.into_iter().map(|(_, c)| c).collect();

    let lexical = LexicalIndex::new(avgdl(&chunks));
    lexical.rebuild_from(&chunks.iter().map(|c| (c.id(), c.text.clone())).collect::<Vec<_>>());

    let loaded = embedding_store.load_all(model).await?;
    let vector = VectorIndex::build(loaded, &chunks);

    Ok((chunks, lexical, vector))
}

#[tracing::instrument(skip(config))]
async fn index(config: &PkmConfig, root: &Path, rebuild: bool) -> pkm_error::Result<()> {
    let model = &config.embeddings.model;
    let (chunks, lexical, vector) = build_indexes(config, root, model).await?;

    tracing::info!(
        rebuild,
        chunks = chunks.len(),
        lexical_entries = lexical.len(),
        vector_entries = vector.len(),
        "index built"
    );
    Ok(())
}

fn collapse_whitespace_truncated(text: &str, max_chars: usize) -> String {
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(max_chars).collect();
    format!("{truncated}…")
}

#[tracing::instrument(skip(config))]
async fn search(config: &PkmConfig, root: &Path, query: &str, mode: pkm_rag::SearchMode, k: usize) -> pkm_error::Result<()> {
    let model = &config.embeddings.model;
    let (chunks, lexical, vector) = build_indexes(config, root, model).await?;
    let chunk_meta = build_chunk_meta(&chunks);
    let provider = http_or_null_provider(config, model);

    let engine = HybridEngine::new(Arc::new(lexical), Arc::new(vector), provider, chunk_meta);
    let params = SearchParams {
        mode,
        k,
        max_keyword_hits: config.search.max_keyword_hits,
        max_semantic_hits: config.search.max_semantic_hits,
        rrf_k: config.search.rrf_k,
        group_limit: config.search.group_limit,
        ..SearchParams::default()
    };

    let hits = engine.search(query, &params).await?;
    for (rank, hit) in hits.iter().enumerate() {
        let score = hit
            .rrf_score
            .map(|s| format!("rrf={s:.4}"))
            .or_else(|| hit.bm25.map(|s| format!("bm25={s:.4}")))
            .or_else(|| hit.semantic.map(|s| format!("cos={s:.4}")))
            .unwrap_or_default();
        println!(
            "{:>2}. [{:?}] {score}  doc={} section={}",
            rank + 1,
            hit.source,
            hit.doc_id,
            hit.section.as_deref().unwrap_or("-"),
        );
        if let Some(text) = &hit.text {
            println!("    {}", collapse_whitespace_truncated(text, 160));
        }
    }
    Ok(())
}

#[tracing::instrument(skip(config))]
async fn relevance(config: &PkmConfig, root: &Path, min_score: Option<f64>, verbose: bool) -> pkm_error::Result<()> {
    let record_store = RecordStore::new(config.paths.metadata_dir(root));
    let (mut records, errors) = record_store.load_all().await?;
    for e in &errors {
        tracing::warn!(error = %e, "skipping malformed record");
    }

    let weights = RelevanceWeights::new(
        config.relevance.weight_recency,
        config.relevance.weight_links,
        config.relevance.weight_quality,
        config.relevance.weight_user,
    )
    .map_err(|e| pkm_error::Error::LogicInvariant(e.to_string()))?;

    let now = Utc::now();
    for record in &mut records {
        record.status.relevance_score = pkm_relevance::score(record, now, &weights, config.relevance.recency_half_life_days);
        record_store.write(record).await?;
    }

    records.sort_by(|a, b| {
        b.status
            .relevance_score
            .partial_cmp(&a.status.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for record in &records {
        if min_score.is_some_and(|min| record.status.relevance_score < min) {
            continue;
        }
        if verbose {
            let r = pkm_relevance::score(
                record,
                now,
                &RelevanceWeights { recency: weights.recency, links: 0.0, quality: 0.0, user: 0.0 },
                config.relevance.recency_half_life_days,
            );
            let l = pkm_relevance::score(
                record,
                now,
                &RelevanceWeights { recency: 0.0, links: weights.links, quality: 0.0, user: 0.0 },
                config.relevance.recency_half_life_days,
            );
            let q = pkm_relevance::score(
                record,
                now,
                &RelevanceWeights { recency: 0.0, links: 0.0, quality: weights.quality, user: 0.0 },
                config.relevance.recency_half_life_days,
            );
            let u = pkm_relevance::score(
                record,
                now,
                &RelevanceWeights { recency: 0.0, links: 0.0, quality: 0.0, user: weights.user },
                config.relevance.recency_half_life_days,
            );
            println!(
                "{:.4}  {}  ({})  R={r:.4} L={l:.4} Q={q:.4} U={u:.4}",
                record.status.relevance_score, record.title, record.doc_id
            );
        } else {
            println!("{:.4}  {}", record.status.relevance_score, record.title);
        }
    }
    Ok(())
}

async fn load_vault_bodies(vault_dir: &Path) -> pkm_error::Result<HashMap<DocId, String>> {
    let mut bodies = HashMap::new();
    for file in list_vault_files(vault_dir).await? {
        match parse_vault_file(&file).await {
            Ok(parsed) => {
                bodies.insert(parsed.doc_id, parsed.body);
            }
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "skipping unreadable vault file");
            }
        }
    }
    Ok(bodies)
}

#[tracing::instrument(skip(config))]
async fn link(config: &PkmConfig, root: &Path, validate: bool) -> pkm_error::Result<()> {
    let record_store = RecordStore::new(config.paths.metadata_dir(root));
    let (mut records, errors) = record_store.load_all().await?;
    for e in &errors {
        tracing::warn!(error = %e, "skipping malformed record");
    }

    let bodies_by_id = load_vault_bodies(&config.paths.vault_dir(root)).await?;
    let bodies: Vec<String> = records.iter().map(|r| bodies_by_id.get(&r.doc_id).cloned().unwrap_or_default()).collect();

    let report = rebuild_links(&mut records, &bodies);

    if validate {
        for record in &records {
            for link in record.links.iter().filter(|l| !l.resolved) {
                println!("{}: unresolved link {:?}", record.title, link.raw);
            }
        }
    } else {
        for record in &records {
            record_store.write(record).await?;
        }
    }

    tracing::info!(total_links = report.total_links, broken_links = report.broken_links, validate, "link rebuild complete");
    Ok(())
}

#[tracing::instrument(skip(config))]
async fn update(config: &PkmConfig, root: &Path, path: PathBuf) -> pkm_error::Result<()> {
    chunk(config, root, Some(path)).await?;
    embed(config, root, None).await?;
    index(config, root, false).await?;
    link(config, root, false).await?;
    relevance(config, root, None, false).await?;
    Ok(())
}
