use std::collections::{BTreeMap, HashMap};

use axum::{
    extract::{Multipart, State},
    response::Json,
};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::models::{ConversionOptions, ConvertResponse, UploadedDocument};
use crate::services::{convert, encode, staging::StagingScope};

/// `POST /convert`: validate the upload, resolve options, stage the
/// document, invoke the engine, encode assets, and build the envelope.
/// The staging scope is released on every path out of the conversion step.
pub async fn convert_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<ConvertResponse>> {
    let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

    let upload = read_upload(&mut multipart).await?;
    let document = upload.document.ok_or(AppError::MissingFile)?;
    if document.filename.trim().is_empty() {
        return Err(AppError::EmptyFilename);
    }
    if !document.is_pdf() {
        warn!(
            request_id = %request_id,
            file_name = %document.filename,
            "rejected upload with disallowed extension"
        );
        return Err(AppError::UnsupportedFileType);
    }

    let options = ConversionOptions::from_fields(&upload.fields);
    info!(
        request_id = %request_id,
        file_name = %document.filename,
        file_size = document.size(),
        options = ?options,
        "conversion request accepted"
    );

    let scope = StagingScope::acquire(&state.staging_root)?;
    let outcome = stage_and_convert(&state, &scope, &document, options).await;
    scope.release();
    let (markdown, images, page_count) = outcome?;

    info!(
        request_id = %request_id,
        markdown_len = markdown.len(),
        images = images.len(),
        page_count,
        "conversion completed"
    );

    Ok(Json(ConvertResponse::success(markdown, images, page_count)))
}

/// The staged part of the request. Kept separate from the handler so that
/// every outcome, success or failure, flows back through the single
/// `scope.release()` above.
async fn stage_and_convert(
    state: &AppState,
    scope: &StagingScope,
    document: &UploadedDocument,
    options: ConversionOptions,
) -> AppResult<(String, BTreeMap<String, String>, usize)> {
    let staged = scope.stage(document)?;
    let output = convert::run(state.engine.clone(), staged, options).await?;
    let images = encode::encode_all(&output.images)?;

    if let Some(title) = &output.metadata.title {
        debug!(title = %title, "document title");
    }

    Ok((output.markdown, images, output.metadata.page_count))
}

struct Upload {
    document: Option<UploadedDocument>,
    fields: HashMap<String, String>,
}

async fn read_upload(multipart: &mut Multipart) -> AppResult<Upload> {
    let mut document = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::upload(err.to_string()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "file" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|err| AppError::upload(err.to_string()))?;
            document = Some(UploadedDocument::new(filename, bytes.to_vec()));
        } else {
            let value = field
                .text()
                .await
                .map_err(|err| AppError::upload(err.to_string()))?;
            fields.insert(name, value);
        }
    }

    Ok(Upload { document, fields })
}
