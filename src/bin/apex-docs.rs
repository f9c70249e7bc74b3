//! Command-line tool for managing the documents indexed by the RAG backend.
//!
//! # Usage
//!
//! ```bash
//! # List documents, optionally filtered
//! apex-docs list
//! apex-docs --search karin --category hr list
//!
//! # Upload files with metadata
//! apex-docs --category hr --owner RRHH --tags "ley,karin" upload protocolo.pdf anexo.docx
//!
//! # Edit metadata; fields not given keep their current values
//! apex-docs --status archived update 42
//! apex-docs --owner Legal --private update 42
//!
//! # Delete or download a document
//! apex-docs delete 42
//! apex-docs download 42 copia.pdf
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use tracing_subscriber::EnvFilter;

use apex_rag::documents::LIST_TIMEOUT;
use apex_rag::{
    API_URL_ENV, Document, DocumentClient, DocumentFilter, DocumentMetadata, format_file_size,
    resolve_api_base_url, status_icon, status_label,
};

/// Output format for listings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum OutputFormat {
    /// Human-readable table (default).
    #[default]
    Text,
    /// JSON array of normalized documents.
    Json,
    /// YAML sequence of normalized documents.
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            _ => Err(format!(
                "Invalid output format: {}. Valid options: text, json, yaml",
                s
            )),
        }
    }
}

/// Command-line arguments for the apex-docs tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
struct Args {
    #[arrrg(optional, "Backend base URL (default: http://<host>:8000/api)", "URL")]
    api_url: Option<String>,

    #[arrrg(optional, "Backend host when no URL is given (default: localhost)", "HOST")]
    host: Option<String>,

    #[arrrg(flag, "Use https when deriving the backend URL from the host")]
    https: bool,

    #[arrrg(optional, "Transfer timeout in seconds (default: 30)", "SECONDS")]
    timeout: Option<u64>,

    #[arrrg(optional, "Listing output format: text, json, yaml", "FORMAT")]
    format: Option<String>,

    /// Filter for `list`.
    #[arrrg(optional, "list: text matched against name, description and tags", "TEXT")]
    search: Option<String>,

    /// Filter for `list`, metadata for `upload` and `update`.
    #[arrrg(optional, "Category (legal, hr, training, technical, ...)", "CATEGORY")]
    category: Option<String>,

    #[arrrg(optional, "list: file type (pdf, docx, pptx, txt)", "TYPE")]
    doc_type: Option<String>,

    /// Filter for `list`, new status for `update`.
    #[arrrg(optional, "Status (active, processing, completed, archived, error)", "STATUS")]
    status: Option<String>,

    #[arrrg(optional, "Owner or owning area", "OWNER")]
    owner: Option<String>,

    #[arrrg(optional, "Version label (default: 1.0)", "VERSION")]
    version: Option<String>,

    #[arrrg(optional, "Owning department", "DEPARTMENT")]
    department: Option<String>,

    #[arrrg(optional, "Comma separated tags", "TAGS")]
    tags: Option<String>,

    #[arrrg(optional, "Free-form description", "TEXT")]
    description: Option<String>,

    #[arrrg(flag, "Make the document visible to every user")]
    public: bool,

    #[arrrg(flag, "update: make the document visible only to its owners")]
    private: bool,

    #[arrrg(flag, "update: include the document in retrieval again")]
    indexable: bool,

    #[arrrg(flag, "Exclude the document from retrieval")]
    not_indexable: bool,
}

impl Args {
    fn base_url(&self) -> String {
        self.api_url
            .clone()
            .or_else(|| std::env::var(API_URL_ENV).ok())
            .unwrap_or_else(|| resolve_api_base_url(self.host.as_deref(), self.https))
    }

    fn filter(&self) -> DocumentFilter {
        DocumentFilter {
            search: self.search.clone(),
            category: self.category.clone(),
            doc_type: self.doc_type.clone(),
            status: self.status.clone(),
        }
    }

    /// Overrides the fields of `base` given on the command line.
    fn metadata(&self, base: DocumentMetadata) -> DocumentMetadata {
        let mut metadata = base;
        if let Some(category) = &self.category {
            metadata.category = category.clone();
        }
        if let Some(owner) = &self.owner {
            metadata.owner = owner.clone();
        }
        if let Some(version) = &self.version {
            metadata.version = version.clone();
        }
        if let Some(department) = &self.department {
            metadata.department = department.clone();
        }
        if let Some(tags) = &self.tags {
            metadata.tags = DocumentMetadata::parse_tags(tags);
        }
        if let Some(description) = &self.description {
            metadata.description = description.clone();
        }
        if let Some(status) = &self.status {
            metadata.status = Some(status.clone());
        }
        if self.public {
            metadata.public = true;
        }
        if self.private {
            metadata.public = false;
        }
        if self.indexable {
            metadata.indexable = true;
        }
        if self.not_indexable {
            metadata.indexable = false;
        }
        metadata
    }
}

const USAGE: &str =
    "apex-docs [OPTIONS] list|upload <FILES>...|update <ID>|delete <ID>|download <ID> [OUT]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = Args::from_command_line_relaxed(USAGE);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("apex_rag=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let Some((command, rest)) = free.split_first() else {
        eprintln!("Error: Must specify a command\nUsage: {USAGE}");
        std::process::exit(1);
    };

    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(30));
    let client = DocumentClient::with_timeouts(&args.base_url(), timeout, LIST_TIMEOUT)?;

    match (command.as_str(), rest) {
        ("list", []) => {
            let format = match &args.format {
                Some(format) => format
                    .parse()
                    .map_err(|e| format!("Invalid format: {}", e))?,
                None => OutputFormat::Text,
            };
            let documents = client.list().await?;
            let filter = args.filter();
            let shown: Vec<&Document> = filter.apply(&documents);
            match format {
                OutputFormat::Text => print_documents(&shown),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&shown)?),
                OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&shown)?),
            }
        }
        ("upload", files) if !files.is_empty() => {
            let metadata = args.metadata(DocumentMetadata::default());
            for file in files {
                client.upload(Path::new(file), &metadata).await?;
                println!("Uploaded {}", file);
            }
        }
        ("update", [id]) => {
            let current = client.find(id).await?;
            let metadata = args.metadata(DocumentMetadata::from(&current));
            client.update(id, &metadata).await?;
            println!("Updated {}", id);
        }
        ("delete", [id]) => {
            client.delete(id).await?;
            println!("Deleted {}", id);
        }
        ("download", [id, out @ ..]) if out.len() <= 1 => {
            let bytes = client.download(id).await?;
            let path = match out.first() {
                Some(out) => PathBuf::from(out),
                None => download_name(&client, id).await,
            };
            tokio::fs::write(&path, &bytes).await?;
            println!(
                "Saved {} ({})",
                path.display(),
                format_file_size(bytes.len() as u64)
            );
        }
        _ => {
            eprintln!("Error: Unrecognized command\nUsage: {USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Where to save document `id`: its stored file name, or the id itself,
/// always inside the working directory.
async fn download_name(client: &DocumentClient, id: &str) -> PathBuf {
    let stored = match client.find(id).await {
        Ok(document) => Some(document.filename),
        Err(err) => {
            tracing::debug!(error = %err, "could not look up the document name");
            None
        }
    };
    local_file_name(stored.as_deref(), id)
}

/// The last component of `name`, falling back to that of `id`, then to
/// `download`.
fn local_file_name(name: Option<&str>, id: &str) -> PathBuf {
    name.into_iter()
        .chain([id])
        .find_map(|candidate| Path::new(candidate).file_name())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("download"))
}

fn print_documents(documents: &[&Document]) {
    for doc in documents {
        let status = doc.status.as_deref().unwrap_or("");
        println!(
            "{} {:<40} {:<5} {:>10}  {:<12} {:<16} {}",
            status_icon(status),
            doc.filename,
            doc.doc_type.to_uppercase(),
            format_file_size(doc.size),
            status_label(status),
            doc.owner,
            doc.id,
        );
    }
    let total: u64 = documents.iter().map(|d| d.size).sum();
    println!(
        "{} documents, {:.1} MB",
        documents.len(),
        total as f64 / (1024.0 * 1024.0)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current() -> DocumentMetadata {
        DocumentMetadata {
            category: "hr".to_string(),
            owner: "RRHH".to_string(),
            version: "2.0".to_string(),
            department: "Personas".to_string(),
            tags: vec!["ley".to_string(), "karin".to_string()],
            description: "Protocolo vigente".to_string(),
            public: true,
            indexable: false,
            status: Some("completed".to_string()),
        }
    }

    #[test]
    fn update_with_only_status_keeps_other_fields() {
        let args = Args {
            status: Some("archived".to_string()),
            ..Args::default()
        };
        let metadata = args.metadata(current());
        assert_eq!(metadata.status.as_deref(), Some("archived"));
        assert_eq!(
            metadata,
            DocumentMetadata {
                status: Some("archived".to_string()),
                ..current()
            }
        );
    }

    #[test]
    fn update_overrides_given_fields() {
        let args = Args {
            owner: Some("Legal".to_string()),
            tags: Some("norma, ".to_string()),
            private: true,
            indexable: true,
            ..Args::default()
        };
        let metadata = args.metadata(current());
        assert_eq!(metadata.owner, "Legal");
        assert_eq!(metadata.tags, vec!["norma"]);
        assert!(!metadata.public);
        assert!(metadata.indexable);
        assert_eq!(metadata.category, "hr");
        assert_eq!(metadata.description, "Protocolo vigente");
    }

    #[test]
    fn upload_metadata_starts_from_defaults() {
        let args = Args {
            category: Some("legal".to_string()),
            owner: Some("Compliance".to_string()),
            not_indexable: true,
            ..Args::default()
        };
        let metadata = args.metadata(DocumentMetadata::default());
        assert_eq!(metadata.version, "1.0");
        assert!(!metadata.public);
        assert!(!metadata.indexable);
        assert_eq!(metadata.status, None);
    }

    #[test]
    fn download_names_stay_in_working_directory() {
        assert_eq!(local_file_name(Some("protocolo.pdf"), "42"), PathBuf::from("protocolo.pdf"));
        assert_eq!(local_file_name(Some("../../.bashrc"), "42"), PathBuf::from(".bashrc"));
        assert_eq!(local_file_name(Some("/etc/cron.d/x"), "42"), PathBuf::from("x"));
        assert_eq!(local_file_name(Some(".."), "42"), PathBuf::from("42"));
        assert_eq!(local_file_name(Some(""), "42"), PathBuf::from("42"));
        assert_eq!(local_file_name(None, "a/b"), PathBuf::from("b"));
        assert_eq!(local_file_name(None, ".."), PathBuf::from("download"));
    }
}
