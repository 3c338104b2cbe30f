//! Decoding of the `multipart/form-data` report submission.

use axum::extract::Multipart;
use tracing::debug;

use crate::error::ValidationError;
use crate::ingest::Submission;
use crate::media::MediaUpload;

/// Read every part of the form into a [`Submission`].
///
/// Unknown fields are skipped. When a field repeats, the last value wins.
///
/// # Errors
///
/// Returns [`ValidationError::MalformedForm`] if the body cannot be decoded
/// (broken boundaries, non-UTF-8 text fields, body over the size limit).
pub async fn read_submission(mut multipart: Multipart) -> Result<Submission, ValidationError> {
    let mut submission = Submission::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "media" {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(malformed)?;
            debug!("Received media part of {} bytes", bytes.len());
            submission.media = Some(MediaUpload {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let slot = match name.as_str() {
            "userId" => &mut submission.user_id,
            "reason" => &mut submission.reason,
            "comment" => &mut submission.comment,
            "location" => &mut submission.location,
            "mediaType" => &mut submission.media_type,
            "mediaUrl" => &mut submission.media_url,
            other => {
                debug!("Ignoring unknown form field {}", other);
                continue;
            }
        };
        *slot = Some(field.text().await.map_err(malformed)?);
    }

    Ok(submission)
}

fn malformed(err: axum::extract::multipart::MultipartError) -> ValidationError {
    ValidationError::MalformedForm(err.body_text())
}
