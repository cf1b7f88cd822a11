use {
    claimguard_common::MediaRef,
    claimguard_config::ClaimguardConfig,
    futures::future::join_all,
    secrecy::{ExposeSecret, Secret},
    tracing::{info, warn},
};

use crate::{
    error::{Error, Result},
    normalize::normalize,
    retry::{RetryPolicy, with_backoff},
};

/// Stable failure kind recorded when every download attempt failed.
pub const DOWNLOAD_FAILED: &str = "download_failed";

/// Attachment bytes after download and normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    /// Zero-based position of the attachment in the inbound message.
    pub index: usize,
    /// Normalized content type essence (e.g. `image/jpeg`).
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FetchedMedia {
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    #[must_use]
    pub fn is_pdf(&self) -> bool {
        self.content_type == claimguard_common::types::PDF_CONTENT_TYPE
    }
}

/// What happened to one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaOutcome {
    Fetched(FetchedMedia),
    /// Declared type is neither an image nor a PDF; never downloaded.
    Unsupported { index: usize, content_type: String },
    /// All attempts failed.
    Failed {
        index: usize,
        kind: &'static str,
        attempts: u32,
        reason: String,
    },
}

impl MediaOutcome {
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Fetched(media) => media.index,
            Self::Unsupported { index, .. } | Self::Failed { index, .. } => *index,
        }
    }
}

/// Downloads attachments from the media host.
#[derive(Clone)]
pub struct MediaRetriever {
    client: reqwest::Client,
    credentials: Option<(String, Secret<String>)>,
    policy: RetryPolicy,
    max_bytes: usize,
    max_dimension: u32,
}

impl MediaRetriever {
    pub fn new(client: reqwest::Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            credentials: None,
            policy,
            max_bytes: 20 * 1024 * 1024,
            max_dimension: 1568,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &ClaimguardConfig) -> Self {
        Self {
            client,
            credentials: config.twilio.credentials(),
            policy: RetryPolicy::from_config(&config.media),
            max_bytes: config.media.max_bytes,
            max_dimension: config.media.max_image_dimension,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, account_sid: String, auth_token: Secret<String>) -> Self {
        self.credentials = Some((account_sid, auth_token));
        self
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Fetch every attachment concurrently. The returned outcomes are in the
    /// same order as `refs`, one per ref.
    pub async fn fetch_all(&self, refs: &[MediaRef]) -> Vec<MediaOutcome> {
        join_all(
            refs.iter()
                .enumerate()
                .map(|(index, media)| self.fetch_one(index, media)),
        )
        .await
    }

    async fn fetch_one(&self, index: usize, media: &MediaRef) -> MediaOutcome {
        let content_type = media.essence();
        if !media.is_supported() {
            info!(index, content_type = %content_type, "skipping unsupported attachment");
            return MediaOutcome::Unsupported {
                index,
                content_type,
            };
        }

        match with_backoff(&self.policy, |_| self.download(&media.url)).await {
            Ok(bytes) => {
                let normalized = normalize(bytes, &content_type, self.max_dimension).await;
                info!(
                    index,
                    content_type = %normalized.content_type,
                    bytes = normalized.bytes.len(),
                    "fetched attachment"
                );
                MediaOutcome::Fetched(FetchedMedia {
                    index,
                    content_type: normalized.content_type,
                    bytes: normalized.bytes,
                })
            },
            Err(failure) => {
                warn!(
                    index,
                    attempts = failure.attempts,
                    error = %failure.last,
                    "attachment download failed"
                );
                MediaOutcome::Failed {
                    index,
                    kind: DOWNLOAD_FAILED,
                    attempts: failure.attempts,
                    reason: failure.last.to_string(),
                }
            },
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let mut request = self.client.get(url);
        if let Some((sid, token)) = &self.credentials {
            request = request.basic_auth(sid, Some(token.expose_secret()));
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| Error::external("media request failed", e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
            });
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(Error::TooLarge {
                limit: self.max_bytes,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::external("failed to read media body", e))?
        {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(Error::TooLarge {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::image_ops::tests::encoded, image::ImageFormat, std::time::Duration};

    fn fast_retriever() -> MediaRetriever {
        MediaRetriever::new(reqwest::Client::new(), RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            attempt_timeout: Duration::from_secs(5),
        })
    }

    #[tokio::test]
    async fn fetches_with_basic_auth() {
        let mut server = mockito::Server::new_async().await;
        let png = encoded(2, 2, ImageFormat::Png);
        let mock = server
            .mock("GET", "/media/1")
            .match_header("authorization", "Basic QUMxOnRvaw==")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(png.clone())
            .create_async()
            .await;

        let retriever = fast_retriever().with_credentials("AC1".into(), Secret::new("tok".into()));
        let refs = [MediaRef::new(format!("{}/media/1", server.url()), "image/png")];
        let outcomes = retriever.fetch_all(&refs).await;

        mock.assert_async().await;
        assert_eq!(outcomes, [MediaOutcome::Fetched(FetchedMedia {
            index: 0,
            content_type: "image/png".into(),
            bytes: png,
        })]);
    }

    #[tokio::test]
    async fn retries_then_reports_download_failed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/media/flaky")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let refs = [MediaRef::new(
            format!("{}/media/flaky", server.url()),
            "application/pdf",
        )];
        let outcomes = fast_retriever().fetch_all(&refs).await;

        mock.assert_async().await;
        match &outcomes[0] {
            MediaOutcome::Failed {
                index,
                kind,
                attempts,
                ..
            } => {
                assert_eq!(*index, 0);
                assert_eq!(*kind, DOWNLOAD_FAILED);
                assert_eq!(*attempts, 3);
            },
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/media/gone")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let refs = [MediaRef::new(format!("{}/media/gone", server.url()), "image/jpeg")];
        let outcomes = fast_retriever().fetch_all(&refs).await;

        mock.assert_async().await;
        assert!(matches!(outcomes[0], MediaOutcome::Failed { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn unsupported_type_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let refs = [MediaRef::new(format!("{}/voice", server.url()), "audio/ogg")];
        let outcomes = fast_retriever().fetch_all(&refs).await;

        mock.assert_async().await;
        assert_eq!(outcomes, [MediaOutcome::Unsupported {
            index: 0,
            content_type: "audio/ogg".into(),
        }]);
    }

    #[tokio::test]
    async fn outcomes_keep_input_order() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/a.pdf")
            .with_body("%PDF-a")
            .create_async()
            .await;
        server
            .mock("GET", "/b")
            .with_status(500)
            .create_async()
            .await;

        let refs = [
            MediaRef::new(format!("{}/a.pdf", server.url()), "application/pdf"),
            MediaRef::new(format!("{}/v", server.url()), "video/mp4"),
            MediaRef::new(format!("{}/b", server.url()), "image/jpeg"),
        ];
        let outcomes = fast_retriever().fetch_all(&refs).await;

        let indices: Vec<_> = outcomes.iter().map(MediaOutcome::index).collect();
        assert_eq!(indices, [0, 1, 2]);
        assert!(matches!(&outcomes[0], MediaOutcome::Fetched(m) if m.bytes == b"%PDF-a"));
        assert!(matches!(outcomes[1], MediaOutcome::Unsupported { .. }));
        assert!(matches!(outcomes[2], MediaOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/big.pdf")
            .with_body(vec![b'x'; 64])
            .expect(1)
            .create_async()
            .await;

        let refs = [MediaRef::new(format!("{}/big.pdf", server.url()), "application/pdf")];
        let outcomes = fast_retriever().with_max_bytes(16).fetch_all(&refs).await;

        mock.assert_async().await;
        match &outcomes[0] {
            MediaOutcome::Failed { reason, .. } => assert!(reason.contains("16 bytes")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
