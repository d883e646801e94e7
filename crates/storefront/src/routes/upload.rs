//! Multipart image intake shared by the picture upload routes.

use axum::extract::Multipart;

use crate::error::AppError;
use crate::services::media::UploadFile;

/// Multipart field that carries the image.
const FILE_FIELD: &str = "file";

/// Read and validate the `file` field of a multipart body.
///
/// Other fields are skipped.
pub(crate) async fn read_image(mut multipart: Multipart) -> Result<UploadFile, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await?;
        return Ok(UploadFile::new(
            file_name.as_deref(),
            content_type.as_deref(),
            bytes.to_vec(),
        )?);
    }
    Err(AppError::BadRequest(format!(
        "multipart field '{FILE_FIELD}' is required"
    )))
}
