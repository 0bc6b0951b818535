//! Command-line arguments.
//!
//! Every flag overrides the matching environment variable read by
//! `SyncConfigBuilder::from_env`.

use clap::{Args, Parser, Subcommand};
use core_runtime::config::{FilterSpec, StorageKind, SyncConfigBuilder};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "attachment-sync",
    version,
    about = "Download table attachments to disk and upload local files as attachment rows"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub table: TableArgs,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download attachments from every configured view
    Download(DownloadArgs),
    /// Upload every eligible file under DIR as one row each
    Upload(UploadArgs),
}

#[derive(Args, Debug, Default)]
pub struct TableArgs {
    /// Base ID [env: BASE_ID]
    #[arg(long, global = true)]
    pub base_id: Option<String>,

    /// Table ID or name [env: TABLE_ID]
    #[arg(long, global = true)]
    pub table_id: Option<String>,

    /// API token [env: API_KEY]
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Views to read, comma-separated [env: VIEW_NAMES]
    #[arg(long, global = true, value_delimiter = ',')]
    pub views: Vec<String>,

    /// Request timeout in seconds [env: REQUEST_TIMEOUT_SECS]
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
}

#[derive(Args, Debug, Default)]
pub struct LoggingArgs {
    /// Log format: pretty, json or compact
    #[arg(long, global = true, env = "LOG_FORMAT", default_value = "compact")]
    pub log_format: String,

    /// Level for workspace crates
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Full filter directive, overrides --log-level
    #[arg(long, global = true, env = "LOG_FILTER")]
    pub log_filter: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct DownloadArgs {
    /// Output root [env: OUTPUT_DIRECTORY]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Attachment fields to read, comma-separated [env: ATTACHMENT_FIELDS]
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Accepted MIME types, comma-separated [env: DESIRED_FILE_TYPES]
    #[arg(long, value_delimiter = ',')]
    pub mime_types: Vec<String>,

    /// Accepted extensions, comma-separated [env: DESIRED_FILE_EXTENSIONS]
    #[arg(long, value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Write files directly under the output root
    #[arg(long)]
    pub flat: bool,
}

#[derive(Args, Debug, Default)]
pub struct UploadArgs {
    /// Directory to upload
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Fields stamped with the attachment, comma-separated [env: TARGET_FIELDS]
    #[arg(long, value_delimiter = ',')]
    pub target_fields: Vec<String>,

    /// Poll the table until uploaded attachments appear [env: VERIFY_UPLOADS]
    #[arg(long)]
    pub verify: bool,

    /// Staging storage: bucket or drive [env: STORAGE_PROVIDER]
    #[arg(long)]
    pub storage: Option<StorageKind>,

    /// Bucket name [env: STORAGE_BUCKET]
    #[arg(long)]
    pub bucket: Option<String>,

    /// Object name prefix [env: STORAGE_PREFIX]
    #[arg(long)]
    pub prefix: Option<String>,

    /// Drive folder ID [env: DRIVE_FOLDER_ID]
    #[arg(long)]
    pub drive_folder: Option<String>,

    /// JSON credentials file holding an access_token [env: CREDENTIALS_PATH]
    #[arg(long)]
    pub credentials: Option<PathBuf>,
}

impl TableArgs {
    pub fn apply(&self, mut builder: SyncConfigBuilder) -> SyncConfigBuilder {
        if let Some(base_id) = &self.base_id {
            builder = builder.base_id(base_id);
        }
        if let Some(table_id) = &self.table_id {
            builder = builder.table_id(table_id);
        }
        if let Some(api_key) = &self.api_key {
            builder = builder.api_key(api_key);
        }
        if !self.views.is_empty() {
            builder = builder.view_names(self.views.clone());
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        builder
    }
}

impl DownloadArgs {
    pub fn apply(&self, mut builder: SyncConfigBuilder) -> SyncConfigBuilder {
        if let Some(output) = &self.output {
            builder = builder.output_dir(output);
        }
        if !self.fields.is_empty() {
            builder = builder.attachment_fields(self.fields.clone());
        }
        if !self.mime_types.is_empty() || !self.extensions.is_empty() {
            builder = builder.download_filter(FilterSpec::new(
                self.mime_types.clone(),
                self.extensions.iter(),
            ));
        }
        if self.flat {
            builder = builder.organize_by_extension(false);
        }
        builder
    }
}

impl UploadArgs {
    pub fn apply(&self, mut builder: SyncConfigBuilder) -> SyncConfigBuilder {
        if !self.target_fields.is_empty() {
            builder = builder.target_fields(self.target_fields.clone());
        }
        if self.verify {
            builder = builder.verify_uploads(true);
        }
        if let Some(kind) = self.storage {
            builder = builder.storage_kind(kind);
        }
        if let Some(bucket) = &self.bucket {
            builder = builder.storage_bucket(bucket);
        }
        if let Some(prefix) = &self.prefix {
            builder = builder.storage_prefix(prefix);
        }
        if let Some(folder) = &self.drive_folder {
            builder = builder.drive_folder_id(folder);
        }
        if let Some(path) = &self.credentials {
            builder = builder.credentials_path(path);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_upload_with_global_flags() {
        let cli = Cli::parse_from([
            "attachment-sync",
            "upload",
            "./inbox",
            "--storage",
            "drive",
            "--views",
            "Grid,Pending",
            "--verify",
        ]);

        let Command::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        assert_eq!(args.dir, PathBuf::from("./inbox"));
        assert_eq!(args.storage, Some(StorageKind::Drive));
        assert!(args.verify);
        assert_eq!(cli.table.views, vec!["Grid", "Pending"]);
    }

    #[test]
    fn test_flags_override_environment() {
        let env = |key: &str| match key {
            "BASE_ID" => Some("appEnv".to_string()),
            "TABLE_ID" => Some("tblEnv".to_string()),
            "API_KEY" => Some("patEnv".to_string()),
            _ => None,
        };
        let cli = Cli::parse_from([
            "attachment-sync",
            "download",
            "--table-id",
            "tblFlag",
            "--extensions",
            "pdf,PNG",
            "--flat",
        ]);
        let Command::Download(args) = &cli.command else {
            panic!("expected download");
        };

        let builder = SyncConfigBuilder::from_lookup(env).unwrap();
        let config = args.apply(cli.table.apply(builder)).build().unwrap();

        assert_eq!(config.table.base_id, "appEnv");
        assert_eq!(config.table.table_id, "tblFlag");
        assert!(!config.download.organize_by_extension);
        assert!(config.download.filter.allowed_extensions.contains("png"));
    }
}
