use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// File extensions treated as directly playable video.
const VIDEO_EXTENSIONS: &[&str] = &[
    ".mp4", ".webm", ".ogg", ".avi", ".mov", ".wmv", ".flv", ".mkv",
];

static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:youtube\.com/(?:watch\?(?:.*&)?v=|embed/|shorts/)|youtu\.be/)([A-Za-z0-9_-]{11})")
        .expect("youtube pattern is valid")
});

static VIMEO_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"vimeo\.com/(\d+)").expect("vimeo pattern is valid"));

/// Hosting platform recognized from a video URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoPlatform {
    Youtube,
    Vimeo,
    Other,
}

/// Metadata derived from (or stored alongside) a video link resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub platform: VideoPlatform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl VideoMetadata {
    fn for_platform(platform: VideoPlatform) -> Self {
        Self {
            platform,
            title: None,
            duration: None,
            thumbnail: None,
        }
    }
}

/// Classify a URL into exactly one platform. Malformed or unrecognized input
/// classifies as `other`; this never fails.
pub fn classify(url: &str) -> VideoMetadata {
    if let Some(captures) = YOUTUBE_URL.captures(url) {
        let video_id = &captures[1];
        let mut metadata = VideoMetadata::for_platform(VideoPlatform::Youtube);
        metadata.thumbnail = Some(format!(
            "https://img.youtube.com/vi/{video_id}/hqdefault.jpg"
        ));
        return metadata;
    }

    if VIMEO_URL.is_match(url) {
        return VideoMetadata::for_platform(VideoPlatform::Vimeo);
    }

    VideoMetadata::for_platform(VideoPlatform::Other)
}

/// Whether a URL is acceptable as a video link: an http(s) URL on a
/// YouTube/Vimeo domain, or one pointing straight at a video file.
pub fn is_valid_video_url(url: &str) -> bool {
    let lowered = url.trim().to_ascii_lowercase();

    if !lowered.starts_with("http://") && !lowered.starts_with("https://") {
        return false;
    }

    if lowered.contains("youtube.com/")
        || lowered.contains("youtu.be/")
        || lowered.contains("vimeo.com/")
    {
        return true;
    }

    VIDEO_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_youtube_watch_urls() {
        let metadata = classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ");

        assert_eq!(metadata.platform, VideoPlatform::Youtube);
        let thumbnail = metadata.thumbnail.expect("youtube links carry a thumbnail");
        assert!(thumbnail.contains("dQw4w9WgXcQ"));
    }

    #[test]
    fn classifies_youtube_short_and_embed_forms() {
        for url in [
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/watch?list=abc&v=dQw4w9WgXcQ",
        ] {
            assert_eq!(classify(url).platform, VideoPlatform::Youtube, "{url}");
        }
    }

    #[test]
    fn classifies_vimeo_urls() {
        let metadata = classify("https://vimeo.com/12345");

        assert_eq!(metadata.platform, VideoPlatform::Vimeo);
        assert!(metadata.thumbnail.is_none());
    }

    #[test]
    fn unrecognized_urls_classify_as_other() {
        assert_eq!(
            classify("https://example.com/video.mp4").platform,
            VideoPlatform::Other
        );
        assert_eq!(classify("not-a-url").platform, VideoPlatform::Other);
    }

    #[test]
    fn direct_video_files_are_valid() {
        assert!(is_valid_video_url("https://example.com/video.mp4"));
        assert!(is_valid_video_url("https://example.com/clip.MKV"));
    }

    #[test]
    fn platform_urls_are_valid() {
        assert!(is_valid_video_url(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        ));
        assert!(is_valid_video_url("https://vimeo.com/12345"));
    }

    #[test]
    fn junk_is_invalid() {
        assert!(!is_valid_video_url("not-a-url"));
        assert!(!is_valid_video_url("ftp://example.com/video.mp4"));
        assert!(!is_valid_video_url("https://example.com/notes.pdf"));
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let metadata = classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        let value = serde_json::to_value(&metadata).expect("serializes");
        let parsed: VideoMetadata = serde_json::from_value(value).expect("deserializes");

        assert_eq!(parsed, metadata);
    }
}
