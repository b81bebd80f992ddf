//! Header normalization.
//!
//! Both schemas decorate names differently: the spreadsheet side carries stray
//! whitespace and commas, the database side emits names as `,[Name]` fragments
//! when a column list is concatenated. One normalization strips all of it so
//! the matcher compares bare labels from either side.

/// A raw header together with its normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderString {
    pub original: Option<String>,
    pub normalized: String,
}

impl HeaderString {
    pub fn new(original: Option<&str>) -> Self {
        Self {
            original: original.map(str::to_string),
            normalized: normalize_optional(original),
        }
    }

    /// Empty headers take no part in matching.
    pub fn is_matchable(&self) -> bool {
        !self.normalized.is_empty()
    }
}

/// Normalize a header label.
///
/// Commas are removed everywhere; whitespace and square brackets are trimmed
/// from both ends. That covers the `,[` prefix of a concatenated database
/// column list as well as a plain `[Name]`. The result never starts or ends
/// with whitespace or a bracket and contains no comma, so normalizing twice is
/// a no-op.
pub fn normalize_header(raw: &str) -> String {
    let without_commas: String = raw.chars().filter(|c| *c != ',').collect();
    without_commas.trim_matches(is_edge_artifact).to_string()
}

/// Missing headers normalize to the empty string.
pub fn normalize_optional(raw: Option<&str>) -> String {
    raw.map(normalize_header).unwrap_or_default()
}

fn is_edge_artifact(c: char) -> bool {
    c.is_whitespace() || c == '[' || c == ']'
}
