use std::io;
use std::path::{Component, Path, PathBuf};

use actionhub_application::{ActionPlugin, ActionRequest};
use actionhub_core::{AppError, AppResult};
use actionhub_domain::{
    ActionDefinition, ActionForm, ActionFormField, ActionResponse, ActionType, FormFieldType,
    FormOption,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;
use tracing::info;

const FILENAME_FIELD: &str = "filename";
const OVERWRITE_FIELD: &str = "overwrite";
const DEFAULT_FILENAME: &str = "export.csv";

/// Writes payloads chunk by chunk into files under a fixed root directory.
pub struct LocalFileDestination {
    definition: ActionDefinition,
    root: PathBuf,
    chunk_bytes: usize,
}

impl LocalFileDestination {
    /// Creates the destination rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, chunk_bytes: usize) -> AppResult<Self> {
        let definition = ActionDefinition::new(
            "local_file",
            "Local file",
            vec![ActionType::Query, ActionType::Dashboard, ActionType::Cell],
        )?
        .with_description("Write the delivered data to a file on the hub host")
        .with_streaming();

        Ok(Self {
            definition,
            root: root.into(),
            chunk_bytes,
        })
    }

    fn target_path(&self, filename: &str) -> AppResult<PathBuf> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.root.join(name)),
            _ => Err(AppError::Validation(format!(
                "filename '{filename}' must be a plain file name inside the export directory"
            ))),
        }
    }
}

#[async_trait]
impl ActionPlugin for LocalFileDestination {
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn form(&self, request: &ActionRequest) -> AppResult<ActionForm> {
        let default_filename = request
            .attachment
            .as_ref()
            .and_then(|attachment| attachment.filename.as_deref())
            .unwrap_or(DEFAULT_FILENAME);

        ActionForm::new(vec![
            ActionFormField::new(FILENAME_FIELD, "File name", FormFieldType::String)?
                .required()
                .with_default(default_filename),
            ActionFormField::new(OVERWRITE_FIELD, "Overwrite existing file", FormFieldType::Select)?
                .with_options(vec![FormOption::new("no", "No")?, FormOption::new("yes", "Yes")?])
                .with_default("no"),
        ])
    }

    async fn execute(&self, request: ActionRequest) -> AppResult<ActionResponse> {
        let filename = request
            .form_value(FILENAME_FIELD)
            .ok_or_else(|| AppError::Validation("filename is required".to_owned()))?
            .trim()
            .to_owned();
        let path = self.target_path(&filename)?;
        let overwrite = request.form_value(OVERWRITE_FIELD) == Some("yes");
        let correlation_id = request.correlation_id();
        let attachment = request
            .attachment
            .ok_or_else(|| AppError::Validation("file export needs an attachment".to_owned()))?;

        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let mut file = options.open(&path).await.map_err(|error| match error.kind() {
            io::ErrorKind::AlreadyExists => {
                AppError::Validation(format!("file '{filename}' already exists"))
            }
            _ => AppError::Internal(format!("failed to open '{}': {error}", path.display())),
        })?;

        let stream = attachment
            .body
            .into_stream(self.chunk_bytes)
            .map_err(io::Error::other);
        let mut reader = StreamReader::new(stream);
        let written = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(|error| AppError::Internal(format!("failed to write '{filename}': {error}")))?;
        file.flush()
            .await
            .map_err(|error| AppError::Internal(format!("failed to flush '{filename}': {error}")))?;

        info!(
            correlation_id = %correlation_id,
            file = %path.display(),
            bytes = written,
            "wrote payload to local file"
        );
        Ok(ActionResponse::success().with_message(format!("wrote {written} bytes to {filename}")))
    }
}
