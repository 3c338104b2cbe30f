//! Report ingestion: validate a raw submission, store its media, persist it.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::{Result, ValidationError};
use crate::geo::Location;
use crate::media::{MediaStore, MediaUpload};
use crate::report::{MediaType, NewReport, NoiseReport};
use crate::storage::ReportStore;

/// Raw form fields of a report submission, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    /// `userId` field.
    pub user_id: Option<String>,
    /// `reason` field.
    pub reason: Option<String>,
    /// `comment` field.
    pub comment: Option<String>,
    /// `location` field, a serialized JSON object.
    pub location: Option<String>,
    /// `mediaType` field.
    pub media_type: Option<String>,
    /// Uploaded `media` part.
    pub media: Option<MediaUpload>,
    /// `mediaUrl` field, for media uploaded elsewhere.
    pub media_url: Option<String>,
}

/// Where the media of a validated submission comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Bytes that still have to go to the media store.
    Upload(MediaUpload),
    /// An existing reference, used as is.
    Reference(String),
}

/// A submission that passed validation; nothing has been written yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSubmission {
    /// Submitting user.
    pub user_id: String,
    /// Media to attach.
    pub media: MediaSource,
    /// Kind of media.
    pub media_type: MediaType,
    /// Free-text classification.
    pub reason: String,
    /// Free-text comment, possibly empty.
    pub comment: String,
    /// Parsed location.
    pub location: Option<Location>,
}

impl ValidatedSubmission {
    fn into_new_report(self, media_url: String) -> NewReport {
        let report = NewReport::new(self.user_id, media_url, self.media_type, self.reason)
            .with_comment(self.comment);
        match self.location {
            Some(location) => report.with_location(location),
            None => report,
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Submission {
    /// Check the submission, in order: user, media and reason, media type,
    /// location.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(self) -> std::result::Result<ValidatedSubmission, ValidationError> {
        let user_id = present(self.user_id).ok_or(ValidationError::MissingUserId)?;

        let media = match (self.media.filter(|m| !m.is_empty()), present(self.media_url)) {
            (Some(upload), _) => Some(MediaSource::Upload(upload)),
            (None, Some(url)) => Some(MediaSource::Reference(url)),
            (None, None) => None,
        };
        let (Some(media), Some(reason)) = (media, present(self.reason)) else {
            return Err(ValidationError::MissingMediaOrReason);
        };

        let media_type = match self.media_type.as_deref() {
            Some(raw) => MediaType::parse(raw)?,
            None => return Err(ValidationError::InvalidMediaType),
        };

        let location = match self.location.as_deref() {
            Some(raw) => Location::parse(raw)?,
            None => None,
        };

        Ok(ValidatedSubmission {
            user_id,
            media,
            media_type,
            reason,
            comment: self.comment.unwrap_or_default(),
            location,
        })
    }
}

/// Turns submissions into stored reports.
///
/// Holds the injected report and media stores; cheap to clone.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn ReportStore>,
    media: Arc<dyn MediaStore>,
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor").finish_non_exhaustive()
    }
}

impl Ingestor {
    /// Create an ingestor over the given collaborators.
    #[must_use]
    pub fn new(store: Arc<dyn ReportStore>, media: Arc<dyn MediaStore>) -> Self {
        Self { store, media }
    }

    /// Validate, store the media, then persist exactly one report.
    ///
    /// Nothing is written when validation fails.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] for a rejected submission, or a
    /// media/storage error when persisting fails.
    pub async fn submit(&self, submission: Submission) -> Result<NoiseReport> {
        let validated = submission.validate().map_err(|e| {
            warn!("Rejected report submission: {}", e);
            e
        })?;

        let media_url = match validated.media.clone() {
            MediaSource::Upload(upload) => self.media.put(upload).await.map_err(|e| {
                error!("Failed to store report media: {}", e);
                e
            })?,
            MediaSource::Reference(url) => url,
        };

        let report = self
            .store
            .create(validated.into_new_report(media_url))
            .await
            .map_err(|e| {
                error!("Failed to save report: {}", e);
                e
            })?;

        info!(
            "Saved report {} for user {} (located: {})",
            report.id,
            report.user_id,
            report.location.is_some()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::storage::{SqliteReportStore, Storage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Media store that records uploads in memory.
    #[derive(Default)]
    struct RecordingMedia {
        uploads: Mutex<Vec<MediaUpload>>,
    }

    #[async_trait]
    impl MediaStore for RecordingMedia {
        async fn put(&self, upload: MediaUpload) -> Result<String> {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(upload);
            Ok(format!("mem://media/{}", uploads.len()))
        }
    }

    fn clip() -> MediaUpload {
        MediaUpload {
            file_name: Some("clip.m4a".to_string()),
            content_type: Some("audio/mp4".to_string()),
            bytes: vec![1, 2, 3],
        }
    }

    fn valid_submission() -> Submission {
        Submission {
            user_id: Some("u1".to_string()),
            reason: Some("loud music".to_string()),
            media_type: Some("audio".to_string()),
            media: Some(clip()),
            ..Submission::default()
        }
    }

    fn setup() -> (Ingestor, Arc<SqliteReportStore>, Arc<RecordingMedia>) {
        let store = Arc::new(SqliteReportStore::new(Storage::open_in_memory().unwrap()));
        let media = Arc::new(RecordingMedia::default());
        let ingestor = Ingestor::new(store.clone(), media.clone());
        (ingestor, store, media)
    }

    #[test]
    fn test_validate_minimal() {
        let validated = valid_submission().validate().unwrap();
        assert_eq!(validated.user_id, "u1");
        assert_eq!(validated.media_type, MediaType::Audio);
        assert_eq!(validated.comment, "");
        assert!(validated.location.is_none());
        assert!(matches!(validated.media, MediaSource::Upload(_)));
    }

    #[test]
    fn test_validate_order() {
        let empty = Submission::default();
        assert_eq!(empty.validate().unwrap_err(), ValidationError::MissingUserId);

        let mut sub = valid_submission();
        sub.reason = None;
        sub.media_type = None;
        assert_eq!(
            sub.validate().unwrap_err(),
            ValidationError::MissingMediaOrReason
        );
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let mut sub = valid_submission();
        sub.user_id = Some("   ".to_string());
        assert_eq!(sub.validate().unwrap_err(), ValidationError::MissingUserId);

        let mut sub = valid_submission();
        sub.reason = Some(String::new());
        assert_eq!(
            sub.validate().unwrap_err(),
            ValidationError::MissingMediaOrReason
        );

        let mut sub = valid_submission();
        sub.media = Some(MediaUpload {
            bytes: Vec::new(),
            ..clip()
        });
        assert_eq!(
            sub.validate().unwrap_err(),
            ValidationError::MissingMediaOrReason
        );
    }

    #[test]
    fn test_media_type_required() {
        let mut sub = valid_submission();
        sub.media_type = None;
        assert_eq!(sub.validate().unwrap_err(), ValidationError::InvalidMediaType);

        let mut sub = valid_submission();
        sub.media_type = Some("image".to_string());
        assert_eq!(sub.validate().unwrap_err(), ValidationError::InvalidMediaType);
    }

    #[test]
    fn test_media_url_fallback_and_precedence() {
        let mut sub = valid_submission();
        sub.media = None;
        sub.media_url = Some("https://cdn.example/a.m4a".to_string());
        assert_eq!(
            sub.validate().unwrap().media,
            MediaSource::Reference("https://cdn.example/a.m4a".to_string())
        );

        let mut sub = valid_submission();
        sub.media_url = Some("https://cdn.example/a.m4a".to_string());
        assert!(matches!(
            sub.validate().unwrap().media,
            MediaSource::Upload(_)
        ));
    }

    #[test]
    fn test_location_parsed() {
        let mut sub = valid_submission();
        sub.location = Some(r#"{"latitude": "12.9", "longitude": 77.6}"#.to_string());
        let location = sub.validate().unwrap().location.unwrap();
        assert_eq!(location.latitude, 12.9);
        assert_eq!(location.longitude, 77.6);

        let mut sub = valid_submission();
        sub.location = Some(String::new());
        assert!(sub.validate().unwrap().location.is_none());
    }

    #[tokio::test]
    async fn test_submit_stores_report() {
        let (ingestor, store, media) = setup();
        let mut sub = valid_submission();
        sub.comment = Some("every night".to_string());
        sub.location = Some(r#"{"latitude": 12.9, "longitude": 77.6}"#.to_string());

        let report = ingestor.submit(sub).await.unwrap();

        assert_eq!(report.media_url, "mem://media/1");
        assert_eq!(report.comment, "every night");
        assert_eq!(report.geo_location.unwrap().coordinates, [77.6, 12.9]);
        assert_eq!(media.uploads.lock().unwrap().len(), 1);
        assert_eq!(store.list_all().await.unwrap(), vec![report]);
    }

    #[tokio::test]
    async fn test_submit_with_reference_skips_media_store() {
        let (ingestor, _store, media) = setup();
        let mut sub = valid_submission();
        sub.media = None;
        sub.media_url = Some("https://cdn.example/v.mp4".to_string());
        sub.media_type = Some("video".to_string());

        let report = ingestor.submit(sub).await.unwrap();
        assert_eq!(report.media_url, "https://cdn.example/v.mp4");
        assert!(media.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_submission_writes_nothing() {
        let (ingestor, store, media) = setup();

        let mut missing_user = valid_submission();
        missing_user.user_id = None;
        let err = ingestor.submit(missing_user).await.unwrap_err();
        assert!(err.is_validation());

        let mut missing_longitude = valid_submission();
        missing_longitude.location = Some(r#"{"latitude": 12.9}"#.to_string());
        let err = ingestor.submit(missing_longitude).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingCoordinate("longitude"))
        ));

        assert!(store.list_all().await.unwrap().is_empty());
        assert!(media.uploads.lock().unwrap().is_empty());
    }
}
