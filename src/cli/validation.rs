use crate::cli::errors::{CliError, CliResult};
use url::Url;

const MAX_QUERY_CHARS: usize = 500;
const MAX_TOP_K: usize = 50;

/// An empty query is not an error here; the orchestrator reports it.
pub fn validate_query(query: &str) -> CliResult<()> {
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(CliError::validation(
            "query",
            format!("Query cannot exceed {MAX_QUERY_CHARS} characters"),
        ));
    }
    Ok(())
}

pub fn validate_top_k(top_k: Option<usize>) -> CliResult<()> {
    if let Some(k) = top_k {
        if k > MAX_TOP_K {
            return Err(CliError::validation(
                "top_k",
                format!("top_k cannot exceed {MAX_TOP_K}"),
            ));
        }
    }
    Ok(())
}

pub fn validate_url(url: &str) -> CliResult<()> {
    if url.trim().is_empty() {
        return Err(CliError::validation("url", "URL cannot be empty"));
    }

    match Url::parse(url.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        Ok(_) => Err(CliError::validation("url", "URL must use http or https")),
        Err(_) => Err(CliError::validation("url", "Invalid URL format")),
    }
}
