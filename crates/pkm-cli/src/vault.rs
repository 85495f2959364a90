use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use pkm_core::hash::sha256_hex;
use pkm_core::{DocId, DocumentRecord, Status};
use regex::Regex;
use serde::Deserialize;

lazy_static! {
    static ref FILENAME: Regex = Regex::new(r"^(?P<slug>[a-z0-9-]{1,60})--(?P<ulid>[0-9A-HJKMNP-TV-Z]{26})\.md$").unwrap();
}

#[derive(Debug, Deserialize, Default)]
struct Frontmatter {
    title: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    categories: Vec<String>,
    language: Option<String>,
    #[serde(default, deserialize_with = "deserialize_date_or_datetime")]
    date_created: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_date_or_datetime")]
    date_updated: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_date_or_datetime")]
    date_semantic: Option<DateTime<Utc>>,
}

/// Accepts either a full RFC3339 datetime (`2026-01-01T00:00:00Z`) or a bare
/// calendar date (`2026-01-01`, taken as midnight UTC) — ordinary PKM
/// frontmatter almost always writes the latter, and rejecting it would turn
/// every such file into an `InputMalformed` skip.
fn deserialize_date_or_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is always a valid time");
        return Ok(Some(midnight.and_utc()));
    }

    Err(serde::de::Error::custom(format!(
        "expected an RFC3339 datetime or a 'YYYY-MM-DD' date, got '{raw}'"
    )))
}

/// A vault markdown file, parsed into its identity, frontmatter, and body.
pub struct ParsedDocument {
    pub doc_id: DocId,
    pub slug: String,
    pub body: String,
    pub file_hash: String,
    pub content_hash: String,
    frontmatter: Frontmatter,
}

/// Splits `---`-delimited YAML frontmatter from the body. A file with no
/// leading `---` fence has no frontmatter at all; the whole file is the body.
fn split_frontmatter(raw: &str) -> pkm_error::Result<(Frontmatter, String)> {
    let Some(rest) = raw.strip_prefix("---\n").or_else(|| raw.strip_prefix("---\r\n")) else {
        return Ok((Frontmatter::default(), raw.to_string()));
    };

    let Some(end) = rest.find("\n---") else {
        return Err(pkm_error::Error::InputMalformed {
            path: String::new(),
            reason: "unterminated frontmatter fence".to_string(),
        });
    };

    let yaml = &rest[..end];
    let after_fence = &rest[end + "\n---".len()..];
    let body = after_fence.strip_prefix('\n').unwrap_or(after_fence).strip_prefix("\r\n").unwrap_or(after_fence);

    let frontmatter: Frontmatter = if yaml.trim().is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml::from_str(yaml).map_err(|e| pkm_error::Error::InputMalformed {
            path: String::new(),
            reason: format!("invalid frontmatter YAML: {e}"),
        })?
    };

    Ok((frontmatter, body.trim().to_string()))
}

/// Reads and parses a vault file at `path`. The filename alone is the source
/// of document identity (I4): `{slug}--{ulid}.md`, with `slug` matching
/// `[a-z0-9-]{1,60}` and `ulid` the 26-char Crockford-Base32 alphabet.
pub async fn parse_vault_file(path: &Path) -> pkm_error::Result<ParsedDocument> {
    let path_display = path.display().to_string();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| pkm_error::Error::InputMalformed {
            path: path_display.clone(),
            reason: "path has no valid UTF-8 file name".to_string(),
        })?;

    let captures = FILENAME.captures(file_name).ok_or_else(|| pkm_error::Error::InputMalformed {
        path: path_display.clone(),
        reason: format!("filename '{file_name}' does not match '{{slug}}--{{ulid}}.md'"),
    })?;
    let slug = captures["slug"].to_string();
    let doc_id: DocId = captures["ulid"].parse().map_err(|_| pkm_error::Error::IdentityConflict {
        doc_id: captures["ulid"].to_string(),
        reason: "filename ULID failed to parse".to_string(),
    })?;

    let raw_bytes = tokio::fs::read(path).await?;
    let file_hash = sha256_hex(&raw_bytes);
    let raw = std::str::from_utf8(&raw_bytes).map_err(|e| pkm_error::Error::InputMalformed {
        path: path_display.clone(),
        reason: e.to_string(),
    })?;

    let (frontmatter, body) = split_frontmatter(raw).map_err(|e| match e {
        pkm_error::Error::InputMalformed { reason, .. } => pkm_error::Error::InputMalformed {
            path: path_display.clone(),
            reason,
        },
        other => other,
    })?;

    let content_hash = sha256_hex(body.as_bytes());

    Ok(ParsedDocument {
        doc_id,
        slug,
        body,
        file_hash,
        content_hash,
        frontmatter,
    })
}

impl ParsedDocument {
    /// The document's language, falling back to `"en"` when frontmatter
    /// doesn't set one. Exposed separately from [`into_record`] because the
    /// chunker needs it before the record is built.
    pub fn language(&self) -> &str {
        self.frontmatter.language.as_deref().unwrap_or("en")
    }

    /// Builds a fresh `DocumentRecord`, carrying `status` forward from
    /// `previous` when given (so `human_edited`, `archived`,
    /// `consolidated_into`, `relevance_score`, and `agent_reviewed` survive a
    /// re-chunk). `links`/`backlinks` are always left empty here; rebuilding
    /// those is `pkm-link`'s job, run across the whole corpus at once.
    pub fn into_record(self, previous: Option<&DocumentRecord>) -> pkm_error::Result<DocumentRecord> {
        let now = Utc::now();
        let created = self.frontmatter.date_created.unwrap_or(now);
        let updated = self.frontmatter.date_updated.unwrap_or(now);
        if created > updated {
            return Err(pkm_error::Error::LogicInvariant(format!(
                "document {}: created ({created}) is after updated ({updated})",
                self.doc_id
            )));
        }

        let word_count = self.body.split_whitespace().count();
        let status = previous.map(|r| r.status).unwrap_or_default();

        Ok(DocumentRecord {
            doc_id: self.doc_id,
            title: self.frontmatter.title.unwrap_or_else(|| self.slug.clone()),
            tags: self.frontmatter.tags,
            aliases: self.frontmatter.aliases,
            categories: self.frontmatter.categories,
            language: self.frontmatter.language.unwrap_or_else(|| "en".to_string()),
            created,
            updated,
            date_semantic: self.frontmatter.date_semantic,
            content_hash: self.content_hash,
            file_hash: self.file_hash,
            status,
            links: previous.map(|r| r.links.clone()).unwrap_or_default(),
            backlinks: previous.map(|r| r.backlinks.clone()).unwrap_or_default(),
            slug: self.slug,
            word_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_filename_identity_and_frontmatter() {
        let dir = tempfile::tempdir().unwrap();
        let doc_id = DocId::generate();
        let path = dir.path().join(format!("pizza-recipe--{doc_id}.md"));
        tokio::fs::write(
            &path,
            "---\ntitle: Pizza Recipe\ntags:\n  - food\n  - italian\n---\n# Dough\n\nMix flour and water.\n",
        )
        .await
        .unwrap();

        let parsed = parse_vault_file(&path).await.unwrap();
        assert_eq!(parsed.doc_id, doc_id);
        assert_eq!(parsed.slug, "pizza-recipe");
        assert!(parsed.body.starts_with("# Dough"));

        let record = parsed.into_record(None).unwrap();
        assert_eq!(record.title, "Pizza Recipe");
        assert_eq!(record.tags, vec!["food".to_string(), "italian".to_string()]);
        assert_eq!(record.word_count, 4);
    }

    #[tokio::test]
    async fn file_with_no_frontmatter_still_parses() {
        let dir = tempfile::tempdir().unwrap();
        let doc_id = DocId::generate();
        let path = dir.path().join(format!("no-frontmatter--{doc_id}.md"));
        tokio::fs::write(&path, "just a plain body with no fences").await.unwrap();

        let parsed = parse_vault_file(&path).await.unwrap();
        let record = parsed.into_record(None).unwrap();
        assert_eq!(record.title, "no-frontmatter");
        assert_eq!(record.language, "en");
    }

    #[tokio::test]
    async fn bare_calendar_date_in_frontmatter_parses_as_midnight_utc() {
        let dir = tempfile::tempdir().unwrap();
        let doc_id = DocId::generate();
        let path = dir.path().join(format!("bare-date--{doc_id}.md"));
        tokio::fs::write(
            &path,
            "---\ntitle: Bare Date\ndate_created: 2026-01-01\ndate_updated: 2026-01-02\n---\nbody text\n",
        )
        .await
        .unwrap();

        let parsed = parse_vault_file(&path).await.unwrap();
        let record = parsed.into_record(None).unwrap();
        assert_eq!(record.created, "2026-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(record.updated, "2026-01-02T00:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[tokio::test]
    async fn malformed_filename_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Not A Valid Filename.md");
        tokio::fs::write(&path, "body").await.unwrap();

        let result = parse_vault_file(&path).await;
        assert!(matches!(result, Err(pkm_error::Error::InputMalformed { .. })));
    }

    #[tokio::test]
    async fn status_carries_forward_from_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let doc_id = DocId::generate();
        let path = dir.path().join(format!("doc--{doc_id}.md"));
        tokio::fs::write(&path, "body text").await.unwrap();

        let mut previous = parse_vault_file(&path).await.unwrap().into_record(None).unwrap();
        previous.status.human_edited = true;

        let parsed_again = parse_vault_file(&path).await.unwrap();
        let record = parsed_again.into_record(Some(&previous)).unwrap();
        assert!(record.status.human_edited);
    }
}
