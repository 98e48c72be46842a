use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};
use url::Url;

use super::request::{ClassifiedSource, SourceKind};
use crate::error::ClassificationError;

/// Watch and short links of the streaming platform. The id is always eleven
/// characters.
static STREAMABLE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/)[a-zA-Z0-9\-_]{11}")
        .expect("streamable url pattern is valid")
});

/// Title and playlist lookups for streamed sources.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn resolve_title(&self, url: &str) -> anyhow::Result<String>;

    /// Member URLs of a playlist, in playlist order, at most `limit` of them.
    async fn list_collection(&self, url: &str, limit: usize) -> anyhow::Result<Vec<String>>;
}

/// Turns submitted URLs into typed sources.
pub struct RequestClassifier {
    resolver: Arc<dyn MetadataResolver>,
    max_collection_size: usize,
}

impl RequestClassifier {
    pub fn new(resolver: Arc<dyn MetadataResolver>, max_collection_size: usize) -> Self {
        Self {
            resolver,
            max_collection_size,
        }
    }

    pub fn is_streamable(url: &str) -> bool {
        STREAMABLE_URL.is_match(url)
    }

    /// Classifies a single URL.
    ///
    /// Streamed links get their title from the resolver and their start
    /// offset from the `t` parameter. Anything else must be a direct link to
    /// a file and is titled after its file name.
    pub async fn classify(
        &self,
        raw: &str,
        duration_cap_secs: Option<u64>,
    ) -> Result<ClassifiedSource, ClassificationError> {
        if duration_cap_secs == Some(0) {
            return Err(ClassificationError::InvalidDurationCap);
        }

        let raw = raw.trim();
        let parsed = parse_web_url(raw)?;

        if Self::is_streamable(raw) {
            let title = self.resolver.resolve_title(raw).await.map_err(|e| {
                ClassificationError::TitleUnavailable {
                    url: raw.to_string(),
                    reason: e.to_string(),
                }
            })?;
            let start_offset_secs = start_offset(&parsed);
            debug!("🎬 Stream: {} (t={}s)", title, start_offset_secs);

            return Ok(ClassifiedSource {
                url: raw.to_string(),
                kind: SourceKind::Streamed,
                title,
                start_offset_secs,
                duration_cap_secs,
            });
        }

        let title = file_name(&parsed)
            .ok_or_else(|| ClassificationError::MissingFilename(raw.to_string()))?;
        debug!("🔗 Archivo directo: {}", title);

        Ok(ClassifiedSource {
            url: raw.to_string(),
            kind: SourceKind::Direct,
            title,
            start_offset_secs: 0,
            duration_cap_secs,
        })
    }

    /// Classifies every member of a playlist.
    ///
    /// Members are resolved concurrently but returned in playlist order.
    /// Members that fail classification are logged and left out.
    pub async fn classify_collection(
        &self,
        url: &str,
    ) -> Result<Vec<ClassifiedSource>, ClassificationError> {
        let url = url.trim();
        parse_web_url(url)?;

        let members = self
            .resolver
            .list_collection(url, self.max_collection_size)
            .await
            .map_err(|e| ClassificationError::CollectionUnavailable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        info!("📋 Playlist {} con {} elementos", url, members.len());

        let results = join_all(members.iter().map(|member| self.classify(member, None))).await;

        let mut classified = Vec::with_capacity(results.len());
        for (member, result) in members.iter().zip(results) {
            match result {
                Ok(source) => classified.push(source),
                Err(e) => warn!("⚠️ Saltando elemento de playlist {}: {}", member, e),
            }
        }
        Ok(classified)
    }
}

fn parse_web_url(raw: &str) -> Result<Url, ClassificationError> {
    Url::parse(raw)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .ok_or_else(|| ClassificationError::InvalidUrl(raw.to_string()))
}

/// Seconds from a `t=90` or `t=90s` query parameter. Zero when absent or
/// unparseable.
fn start_offset(url: &Url) -> u64 {
    url.query_pairs()
        .find(|(key, _)| key == "t")
        .and_then(|(_, value)| value.trim_end_matches('s').parse().ok())
        .unwrap_or(0)
}

/// Last path segment, percent-decoded, when it carries an extension.
fn file_name(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let name = urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string());

    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use pretty_assertions::assert_eq;

    fn classifier(resolver: MockMetadataResolver) -> RequestClassifier {
        RequestClassifier::new(Arc::new(resolver), 100)
    }

    #[test]
    fn streamable_url_detection() {
        assert!(RequestClassifier::is_streamable(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        ));
        assert!(RequestClassifier::is_streamable("https://youtu.be/dQw4w9WgXcQ"));
        assert!(!RequestClassifier::is_streamable("https://youtu.be/short"));
        assert!(!RequestClassifier::is_streamable(
            "https://cdn.example.com/song.mp3"
        ));
    }

    #[tokio::test]
    async fn streamed_link_uses_resolved_title_and_offset() {
        let mut resolver = MockMetadataResolver::new();
        resolver
            .expect_resolve_title()
            .withf(|url| url.contains("dQw4w9WgXcQ"))
            .times(1)
            .returning(|_| Ok("Never Gonna Give You Up".to_string()));

        let source = classifier(resolver)
            .classify("https://youtu.be/dQw4w9WgXcQ?t=90", Some(30))
            .await
            .unwrap();

        assert_eq!(
            source,
            ClassifiedSource {
                url: "https://youtu.be/dQw4w9WgXcQ?t=90".to_string(),
                kind: SourceKind::Streamed,
                title: "Never Gonna Give You Up".to_string(),
                start_offset_secs: 90,
                duration_cap_secs: Some(30),
            }
        );
    }

    #[tokio::test]
    async fn streamed_link_without_offset_starts_at_zero() {
        let mut resolver = MockMetadataResolver::new();
        resolver
            .expect_resolve_title()
            .returning(|_| Ok("Song".to_string()));

        let source = classifier(resolver)
            .classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s", None)
            .await
            .unwrap();
        assert_eq!(source.start_offset_secs, 42);

        let mut resolver = MockMetadataResolver::new();
        resolver
            .expect_resolve_title()
            .returning(|_| Ok("Song".to_string()));
        let source = classifier(resolver)
            .classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ", None)
            .await
            .unwrap();
        assert_eq!(source.start_offset_secs, 0);
    }

    #[tokio::test]
    async fn unresolvable_title_is_an_error() {
        let mut resolver = MockMetadataResolver::new();
        resolver
            .expect_resolve_title()
            .returning(|_| Err(anyhow!("Video unavailable")));

        let err = classifier(resolver)
            .classify("https://youtu.be/dQw4w9WgXcQ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClassificationError::TitleUnavailable { .. }));
    }

    #[tokio::test]
    async fn direct_link_is_titled_after_its_file() {
        let classifier = classifier(MockMetadataResolver::new());

        let source = classifier
            .classify("https://www.google.com/something.js", None)
            .await
            .unwrap();
        assert_eq!(source.title, "something.js");
        assert_eq!(source.kind, SourceKind::Direct);
        assert_eq!(source.start_offset_secs, 0);

        let source = classifier
            .classify("https://cdn.example.com/music/My%20Song.mp3?sig=abc", None)
            .await
            .unwrap();
        assert_eq!(source.title, "My Song.mp3");
    }

    #[tokio::test]
    async fn direct_link_without_file_name_is_rejected() {
        let classifier = classifier(MockMetadataResolver::new());

        for url in ["https://www.google.com", "https://www.google.com/path/"] {
            let err = classifier.classify(url, None).await.unwrap_err();
            assert_eq!(err, ClassificationError::MissingFilename(url.to_string()));
        }
    }

    #[tokio::test]
    async fn malformed_urls_are_rejected() {
        let classifier = classifier(MockMetadataResolver::new());

        for url in ["not a url", "ftp://files.example.com/a.mp3", "file:///tmp/a.mp3"] {
            let err = classifier.classify(url, None).await.unwrap_err();
            assert!(matches!(err, ClassificationError::InvalidUrl(_)), "{url}");
        }
    }

    #[tokio::test]
    async fn zero_duration_cap_is_rejected() {
        let err = classifier(MockMetadataResolver::new())
            .classify("https://cdn.example.com/a.mp3", Some(0))
            .await
            .unwrap_err();
        assert_eq!(err, ClassificationError::InvalidDurationCap);
    }

    #[tokio::test]
    async fn collection_keeps_order_and_drops_failures() {
        let mut resolver = MockMetadataResolver::new();
        resolver
            .expect_list_collection()
            .withf(|_, limit| *limit == 100)
            .returning(|_, _| {
                Ok(vec![
                    "https://www.youtube.com/watch?v=aaaaaaaaaaa".to_string(),
                    "https://www.youtube.com/watch?v=bbbbbbbbbbb".to_string(),
                    "https://www.youtube.com/watch?v=ccccccccccc".to_string(),
                ])
            });
        resolver.expect_resolve_title().returning(|url| {
            if url.contains("bbbbbbbbbbb") {
                Err(anyhow!("Private video"))
            } else if url.contains("aaaaaaaaaaa") {
                Ok("First".to_string())
            } else {
                Ok("Third".to_string())
            }
        });

        let sources = classifier(resolver)
            .classify_collection("https://www.youtube.com/playlist?list=PL123")
            .await
            .unwrap();

        let titles: Vec<&str> = sources.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Third"]);
    }

    #[tokio::test]
    async fn unavailable_collection_is_an_error() {
        let mut resolver = MockMetadataResolver::new();
        resolver
            .expect_list_collection()
            .returning(|_, _| Err(anyhow!("This playlist does not exist")));

        let err = classifier(resolver)
            .classify_collection("https://www.youtube.com/playlist?list=PLnope")
            .await
            .unwrap_err();
        assert!(matches!(err, ClassificationError::CollectionUnavailable { .. }));
    }
}
