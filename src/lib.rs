use async_trait::async_trait;
use std::future::Future;

mod cache;
mod encoder;
mod error;
mod extractor;
mod fetcher;
mod logging;
mod orchestrator;
mod tracker;

pub use cache::PreviewCache;
pub use encoder::{decode_key, encode_key};
pub use error::PreviewError;
pub use extractor::LinkExtractor;
pub use fetcher::{FetcherConfig, HttpMetadataFetcher};
pub use logging::{log_error_card, log_preview_card, setup_logging, LogConfig};
pub use orchestrator::{
    DisplayOptions, OrchestratorConfig, PreviewOrchestrator, PreviewRequest, DEFAULT_QUERY_PARAM,
};
pub use tracker::PendingFetchTracker;

/// One previewed link as reported by the metadata endpoint.
///
/// Field names follow the endpoint's camelCase wire shape (`siteName`), so a
/// record deserializes straight out of the API response. A record is
/// immutable once received; its identity is the encoded key it was cached
/// under.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub site_name: Option<String>,
    pub image: Option<String>,
    pub url: Option<String>,
    /// Origin domain, used to resolve relative image paths.
    pub source: Option<String>,
}

impl Metadata {
    /// Normalizes the known malformed shapes of the `image` field.
    ///
    /// Values already starting with `http` or `www` pass through untouched.
    /// A protocol-relative `//www…` form gains an explicit `https:` scheme,
    /// and the `/yts/…` thumbnail path is resolved against the record's
    /// `source` domain. Any other shape (empty, unrecognized relative path,
    /// `/yts/…` without a source) yields `None`; callers must handle the
    /// absent case themselves.
    pub fn repair_image_url(&self) -> Option<String> {
        let image = self.image.as_deref()?;
        if image.starts_with("http") || image.starts_with("www") {
            return Some(image.to_owned());
        }
        if image.starts_with("//www") {
            return Some(format!("https:{image}"));
        }
        if image.starts_with("/yts/") {
            let source = self.source.as_deref()?;
            return Some(format!("https://{source}{image}"));
        }
        None
    }
}

/// The injected fetch function: resolves a fully-built request target into
/// the metadata record for one link.
///
/// The orchestrator consumes only the success value; transport, auth, and
/// timeout concerns live behind this seam. A failure makes the orchestrator
/// drop that one link (see [`PreviewError::Fetch`]) without touching its
/// siblings.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch_metadata(&self, request_url: &str) -> Result<Metadata, PreviewError>;
}

/// Adapter that lets a plain async function act as a [`MetadataFetcher`].
///
/// ```ignore
/// let fetcher = FetchFn::new(|request_url: String| async move {
///     my_client.metadata_for(&request_url).await
/// });
/// ```
pub struct FetchFn<F>(F);

impl<F> FetchFn<F> {
    pub fn new(func: F) -> Self {
        Self(func)
    }
}

#[async_trait]
impl<F, Fut> MetadataFetcher for FetchFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Metadata, PreviewError>> + Send,
{
    async fn fetch_metadata(&self, request_url: &str) -> Result<Metadata, PreviewError> {
        (self.0)(request_url.to_owned()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(image: Option<&str>, source: Option<&str>) -> Metadata {
        Metadata {
            image: image.map(String::from),
            source: source.map(String::from),
            ..Metadata::default()
        }
    }

    #[test]
    fn absolute_and_www_images_pass_through() {
        let meta = record(Some("https://cdn.example.com/a.png"), None);
        assert_eq!(
            meta.repair_image_url().as_deref(),
            Some("https://cdn.example.com/a.png")
        );

        let meta = record(Some("www.example.com/a.png"), None);
        assert_eq!(
            meta.repair_image_url().as_deref(),
            Some("www.example.com/a.png")
        );
    }

    #[test]
    fn protocol_relative_image_gains_https() {
        let meta = record(Some("//www.example.com/a.png"), None);
        assert_eq!(
            meta.repair_image_url().as_deref(),
            Some("https://www.example.com/a.png")
        );
    }

    #[test]
    fn thumbnail_path_resolves_against_source() {
        let meta = record(Some("/yts/img/thumb.jpg"), Some("youtube.com"));
        assert_eq!(
            meta.repair_image_url().as_deref(),
            Some("https://youtube.com/yts/img/thumb.jpg")
        );

        // Without a source domain there is nothing to resolve against.
        let meta = record(Some("/yts/img/thumb.jpg"), None);
        assert_eq!(meta.repair_image_url(), None);
    }

    #[test]
    fn unrecognized_shapes_yield_none() {
        assert_eq!(record(None, None).repair_image_url(), None);
        assert_eq!(record(Some(""), Some("x.com")).repair_image_url(), None);
        assert_eq!(
            record(Some("/assets/logo.svg"), Some("x.com")).repair_image_url(),
            None
        );
    }

    #[test]
    fn metadata_deserializes_camel_case_wire_shape() {
        let meta: Metadata = serde_json::from_str(
            r#"{"title":"Example","siteName":"Example Site","url":"https://example.com"}"#,
        )
        .unwrap();
        assert_eq!(meta.title.as_deref(), Some("Example"));
        assert_eq!(meta.site_name.as_deref(), Some("Example Site"));
        assert_eq!(meta.description, None);
    }
}
