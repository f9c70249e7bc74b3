use serde::{Deserialize, Serialize};

/// File name shown for documents the backend returns without one.
pub const UNTITLED_DOCUMENT: &str = "Documento sin título";

/// A document tracked by the backend, normalized for display.
///
/// The backend has shipped several shapes for this resource; deserialization
/// accepts all of them and fills in display defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDocument")]
pub struct Document {
    /// Backend identifier.
    pub id: String,
    /// File name, or title when the backend has no file name.
    pub filename: String,
    /// Size in bytes, 0 when unknown.
    pub size: u64,
    /// Lower-cased file type.
    #[serde(rename = "type")]
    pub doc_type: String,
    /// Category (legal, hr, training, ...).
    pub category: Option<String>,
    /// Lifecycle status; `indexed` is reported as `completed`.
    pub status: Option<String>,
    /// Embedding pipeline status.
    pub embedding_status: Option<String>,
    /// Owner, `—` when unknown.
    pub owner: String,
    /// Owning department.
    pub department: Option<String>,
    /// Current version label.
    pub version: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Free-form description.
    pub description: String,
    /// Creation time as reported by the backend.
    pub created_at: Option<String>,
    /// Last modification time as reported by the backend.
    pub modified_at: Option<String>,
    /// Number of indexed chunks.
    pub chunk_count: Option<u64>,
    /// Visible to every user.
    pub public: Option<bool>,
    /// Included in retrieval.
    pub indexable: Option<bool>,
}

#[derive(Deserialize)]
struct RawDocument {
    document_id: Option<String>,
    id: Option<String>,
    filename: Option<String>,
    title: Option<String>,
    size: Option<f64>,
    #[serde(rename = "type")]
    doc_type: Option<String>,
    category: Option<String>,
    status: Option<String>,
    embedding_status: Option<String>,
    owner: Option<String>,
    owner_area: Option<String>,
    department: Option<String>,
    version: Option<String>,
    tags: Option<serde_json::Value>,
    description: Option<String>,
    created_at: Option<String>,
    effective_from: Option<String>,
    modified_at: Option<String>,
    updated_at: Option<String>,
    #[serde(rename = "createdAt")]
    created_at_camel: Option<String>,
    chunk_count: Option<u64>,
    chunks_count: Option<u64>,
    public: Option<bool>,
    indexable: Option<bool>,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        let tags = match raw.tags {
            Some(serde_json::Value::Array(values)) => values
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };
        let size = raw
            .size
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(|s| s as u64)
            .unwrap_or(0);
        let status = raw.status.map(|s| {
            if s == "indexed" {
                "completed".to_string()
            } else {
                s
            }
        });
        Document {
            id: raw.document_id.or(raw.id).unwrap_or_default(),
            filename: raw
                .filename
                .filter(|s| !s.is_empty())
                .or(raw.title.filter(|s| !s.is_empty()))
                .unwrap_or_else(|| UNTITLED_DOCUMENT.to_string()),
            size,
            doc_type: raw
                .doc_type
                .unwrap_or_else(|| "pdf".to_string())
                .to_lowercase(),
            category: raw.category,
            status,
            embedding_status: raw.embedding_status,
            owner: raw
                .owner
                .or(raw.owner_area)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "—".to_string()),
            department: raw.department,
            version: raw.version,
            tags,
            description: raw.description.unwrap_or_default(),
            created_at: raw.created_at.or(raw.effective_from),
            modified_at: raw.modified_at.or(raw.updated_at).or(raw.created_at_camel),
            chunk_count: raw.chunk_count.or(raw.chunks_count),
            public: raw.public,
            indexable: raw.indexable,
        }
    }
}

/// Metadata sent when uploading or editing a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Category; required for uploads.
    pub category: String,
    /// Owner; required for uploads.
    pub owner: String,
    /// Version label.
    pub version: String,
    /// Owning department.
    pub department: String,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Free-form description.
    pub description: String,
    /// Visible to every user.
    pub public: bool,
    /// Included in retrieval.
    pub indexable: bool,
    /// New lifecycle status; only meaningful for edits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            category: String::new(),
            owner: String::new(),
            version: "1.0".to_string(),
            department: String::new(),
            tags: Vec::new(),
            description: String::new(),
            public: false,
            indexable: true,
            status: None,
        }
    }
}

impl DocumentMetadata {
    /// Parses a comma separated tag list, dropping empty entries.
    pub fn parse_tags(tags: &str) -> Vec<String> {
        tags.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Returns the first missing required field for an upload, if any.
    pub fn missing_required_field(&self) -> Option<&'static str> {
        if self.category.trim().is_empty() {
            Some("category")
        } else if self.owner.trim().is_empty() {
            Some("owner")
        } else {
            None
        }
    }

    /// Flattens the metadata into multipart form fields.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("category", self.category.clone()),
            ("owner", self.owner.clone()),
            ("version", self.version.clone()),
            ("department", self.department.clone()),
            ("tags", self.tags.join(",")),
            ("description", self.description.clone()),
            ("public", self.public.to_string()),
            ("indexable", self.indexable.to_string()),
        ];
        if let Some(status) = &self.status {
            fields.push(("status", status.clone()));
        }
        fields
    }
}

impl From<&Document> for DocumentMetadata {
    /// The document's current metadata, as an edit starts from it.
    fn from(document: &Document) -> Self {
        let owner = if document.owner == "—" {
            String::new()
        } else {
            document.owner.clone()
        };
        Self {
            category: document.category.clone().unwrap_or_default(),
            owner,
            version: document.version.clone().unwrap_or_default(),
            department: document.department.clone().unwrap_or_default(),
            tags: document.tags.clone(),
            description: document.description.clone(),
            public: document.public.unwrap_or(false),
            indexable: document.indexable.unwrap_or(true),
            status: document.status.clone(),
        }
    }
}

/// Local filter applied to a listed document set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    /// Case-insensitive text matched against filename, description and tags.
    pub search: Option<String>,
    /// Exact category.
    pub category: Option<String>,
    /// Exact file type.
    pub doc_type: Option<String>,
    /// Exact status.
    pub status: Option<String>,
}

impl DocumentFilter {
    /// Returns true when `document` passes every configured criterion.
    pub fn matches(&self, document: &Document) -> bool {
        let matches_search = match non_empty(&self.search) {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                document.filename.to_lowercase().contains(&term)
                    || document.description.to_lowercase().contains(&term)
                    || document
                        .tags
                        .iter()
                        .any(|tag| tag.to_lowercase().contains(&term))
            }
        };
        let matches_category = non_empty(&self.category)
            .is_none_or(|c| document.category.as_deref() == Some(c));
        let matches_type = non_empty(&self.doc_type).is_none_or(|t| document.doc_type == t);
        let matches_status =
            non_empty(&self.status).is_none_or(|s| document.status.as_deref() == Some(s));
        matches_search && matches_category && matches_type && matches_status
    }

    /// Keeps the documents that match, preserving order.
    pub fn apply<'a>(&self, documents: &'a [Document]) -> Vec<&'a Document> {
        documents.iter().filter(|d| self.matches(d)).collect()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Human label for a document status.
pub fn status_label(status: &str) -> &str {
    match status {
        "active" => "Activo",
        "processing" => "Procesando",
        "error" => "Error",
        "archived" => "Archivado",
        "completed" => "Indexado",
        "not_indexed" => "No indexado",
        other => other,
    }
}

/// Single-glyph marker for a document status.
pub fn status_icon(status: &str) -> &'static str {
    match status {
        "processing" => "⟳",
        "completed" => "✔",
        "error" => "✕",
        "archived" => "📦",
        _ => "●",
    }
}

/// Formats a byte count using 1024-based units, rounded to two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: serde_json::Value) -> Document {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn normalizes_backend_shape() {
        let document = doc(serde_json::json!({
            "document_id": "d-1",
            "title": "Ley Karin",
            "category": "legal",
            "owner_area": "RRHH",
            "status": "indexed",
            "created_at": "2024-05-01T10:00:00",
            "chunk_count": 12
        }));
        assert_eq!(document.id, "d-1");
        assert_eq!(document.filename, "Ley Karin");
        assert_eq!(document.size, 0);
        assert_eq!(document.doc_type, "pdf");
        assert_eq!(document.status.as_deref(), Some("completed"));
        assert_eq!(document.owner, "RRHH");
        assert!(document.tags.is_empty());
        assert_eq!(document.chunk_count, Some(12));
    }

    #[test]
    fn normalizes_missing_names() {
        let document = doc(serde_json::json!({"id": "7", "type": "DOCX", "tags": "oops"}));
        assert_eq!(document.id, "7");
        assert_eq!(document.filename, UNTITLED_DOCUMENT);
        assert_eq!(document.doc_type, "docx");
        assert_eq!(document.owner, "—");
        assert!(document.tags.is_empty());
    }

    #[test]
    fn filter_search_covers_tags_and_description() {
        let document = doc(serde_json::json!({
            "id": "1",
            "filename": "Protocolo.pdf",
            "description": "Prevención de acoso",
            "tags": ["Ley Karin", "RRHH"],
            "category": "hr",
            "status": "active"
        }));
        let by_tag = DocumentFilter {
            search: Some("karin".to_string()),
            ..Default::default()
        };
        assert!(by_tag.matches(&document));
        let by_description = DocumentFilter {
            search: Some("ACOSO".to_string()),
            ..Default::default()
        };
        assert!(by_description.matches(&document));
        let wrong_category = DocumentFilter {
            category: Some("legal".to_string()),
            ..Default::default()
        };
        assert!(!wrong_category.matches(&document));
        let empty_is_any = DocumentFilter {
            status: Some(String::new()),
            ..Default::default()
        };
        assert!(empty_is_any.matches(&document));
    }

    #[test]
    fn form_fields_flatten_tags_and_flags() {
        let metadata = DocumentMetadata {
            category: "legal".to_string(),
            owner: "Compliance".to_string(),
            tags: DocumentMetadata::parse_tags(" ley , , karin "),
            ..Default::default()
        };
        let fields = metadata.form_fields();
        assert!(fields.contains(&("tags", "ley,karin".to_string())));
        assert!(fields.contains(&("version", "1.0".to_string())));
        assert!(fields.contains(&("public", "false".to_string())));
        assert!(fields.contains(&("indexable", "true".to_string())));
        assert!(!fields.iter().any(|(k, _)| *k == "status"));
    }

    #[test]
    fn metadata_starts_from_current_values() {
        let document = doc(serde_json::json!({
            "id": "42",
            "category": "hr",
            "owner": "RRHH",
            "department": "Personas",
            "version": "2.1",
            "tags": ["ley", "karin"],
            "description": "Protocolo",
            "status": "indexed",
            "public": true,
            "indexable": false
        }));
        let metadata = DocumentMetadata::from(&document);
        assert_eq!(metadata.category, "hr");
        assert_eq!(metadata.owner, "RRHH");
        assert_eq!(metadata.department, "Personas");
        assert_eq!(metadata.version, "2.1");
        assert_eq!(metadata.tags, vec!["ley", "karin"]);
        assert_eq!(metadata.description, "Protocolo");
        assert_eq!(metadata.status.as_deref(), Some("completed"));
        assert!(metadata.public);
        assert!(!metadata.indexable);

        let bare = DocumentMetadata::from(&doc(serde_json::json!({"id": "7"})));
        assert_eq!(bare.owner, "");
        assert!(!bare.public);
        assert!(bare.indexable);
        assert_eq!(bare.status, None);
    }

    #[test]
    fn required_fields() {
        let mut metadata = DocumentMetadata::default();
        assert_eq!(metadata.missing_required_field(), Some("category"));
        metadata.category = "hr".to_string();
        assert_eq!(metadata.missing_required_field(), Some("owner"));
        metadata.owner = "Ana".to_string();
        assert_eq!(metadata.missing_required_field(), None);
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2 MB");
    }

    #[test]
    fn status_labels() {
        assert_eq!(status_label("completed"), "Indexado");
        assert_eq!(status_label("custom"), "custom");
        assert_eq!(status_icon("archived"), "📦");
        assert_eq!(status_icon("active"), "●");
    }
}
