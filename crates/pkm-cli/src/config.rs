use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Searches upward from `start` for a `.pkm/` marker directory, mirroring the
/// original tool's upward search for its own marker directory. Returns `None`
/// if no ancestor carries one, in which case the caller falls back to the
/// current directory as the project root.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(".pkm").is_dir() {
            return Some(dir);
        }
        if !dir.pop() {
            return None;
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap_tokens: usize,
    pub min_chunk_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig {
            chunk_size: 500,
            overlap_tokens: 50,
            min_chunk_tokens: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub ollama_url: String,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        EmbeddingsConfig {
            model: "nomic-embed-text".to_string(),
            ollama_url: "http://localhost:11434/api/embeddings".to_string(),
        }
    }
}

/// `bm25_weight`/`semantic_weight` are accepted and stored so a config file
/// setting them is not a parse error, but `pkm-rag`'s RRF implementation
/// never reads either — RRF has no weighting term for them.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub max_keyword_hits: usize,
    pub max_semantic_hits: usize,
    pub rrf_k: f64,
    pub group_limit: usize,
    pub bm25_weight: f64,
    pub semantic_weight: f64,
    pub min_similarity: f64,
    pub min_rrf_score: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_keyword_hits: 50,
            max_semantic_hits: 50,
            rrf_k: 60.0,
            group_limit: 3,
            bm25_weight: 1.0,
            semantic_weight: 1.0,
            min_similarity: 0.0,
            min_rrf_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RelevanceConfig {
    pub weight_recency: f64,
    pub weight_links: f64,
    pub weight_quality: f64,
    pub weight_user: f64,
    pub recency_half_life_days: f64,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        RelevanceConfig {
            weight_recency: 0.4,
            weight_links: 0.3,
            weight_quality: 0.2,
            weight_user: 0.1,
            recency_half_life_days: 90.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub vault: PathBuf,
    pub inbox: PathBuf,
    pub metadata: PathBuf,
    pub chunks: PathBuf,
    pub embeddings: PathBuf,
    pub index: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            vault: PathBuf::from("vault"),
            inbox: PathBuf::from("inbox"),
            metadata: PathBuf::from("data/metadata"),
            chunks: PathBuf::from("data/chunks"),
            embeddings: PathBuf::from("data/embeddings"),
            index: PathBuf::from("data/index"),
        }
    }
}

impl PathsConfig {
    pub fn vault_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.vault)
    }
    pub fn metadata_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.metadata)
    }
    pub fn chunks_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.chunks)
    }
    pub fn embeddings_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.embeddings)
    }
}

/// The fully resolved configuration. Built once at startup via [`PkmConfig::load`]
/// and passed down explicitly as a value — never a global/lazy-static singleton,
/// per the "process-global configuration singleton" redesign flag.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct PkmConfig {
    pub chunking: ChunkingConfig,
    pub embeddings: EmbeddingsConfig,
    pub search: SearchConfig,
    pub relevance: RelevanceConfig,
    pub paths: PathsConfig,
}

impl PkmConfig {
    /// Resolution order per value: environment variable → `.pkm/config.toml`
    /// → built-in default. `.env` files are loaded via `dotenvy` before the
    /// environment layer is read. Returns the config alongside the resolved
    /// project root (the `.pkm/` marker's parent, or the current directory if
    /// no marker is found).
    pub fn load() -> pkm_error::Result<(Self, PathBuf)> {
        dotenvy::dotenv().ok();

        let cwd = std::env::current_dir()?;
        let root = find_project_root(&cwd).unwrap_or(cwd);
        let config_path = root.join(".pkm").join("config.toml");

        let built = config::Config::builder()
            .add_source(config::File::from(config_path.clone()).required(false))
            .add_source(config::Environment::with_prefix("PKM").separator("__"))
            .build()
            .map_err(|e| pkm_error::Error::InputMalformed {
                path: config_path.display().to_string(),
                reason: e.to_string(),
            })?;

        let config: PkmConfig = built.try_deserialize().map_err(|e| pkm_error::Error::InputMalformed {
            path: config_path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok((config, root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_search_config_matches_pkm_rag_defaults() {
        let search = SearchConfig::default();
        assert_eq!(search.rrf_k, 60.0);
        assert_eq!(search.group_limit, 3);
    }

    #[test]
    fn default_relevance_weights_sum_to_one() {
        let r = RelevanceConfig::default();
        let sum = r.weight_recency + r.weight_links + r.weight_quality + r.weight_user;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn find_project_root_locates_pkm_marker_in_an_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".pkm")).unwrap();
        let nested = dir.path().join("vault").join("2026-01");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_project_root(&nested).unwrap();
        assert_eq!(found, dir.path());
    }

    #[test]
    fn find_project_root_returns_none_without_a_marker() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_project_root(dir.path()).is_none());
    }
}
