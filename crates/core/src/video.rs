use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, VidquizError};

static YOUTUBE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*")
        .expect("youtube id regex is valid")
});

const YOUTUBE_ID_LEN: usize = 11;

/// Extract the 11-character YouTube video id from a watch, short, or embed URL.
pub fn youtube_video_id(url: &str) -> Result<String> {
    let invalid = || VidquizError::InvalidVideoUrl {
        url: url.to_string(),
    };

    let captures = YOUTUBE_ID_RE.captures(url.trim()).ok_or_else(invalid)?;
    let id = captures.get(2).map(|m| m.as_str()).ok_or_else(invalid)?;

    if id.len() != YOUTUBE_ID_LEN {
        return Err(invalid());
    }
    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("https://www.youtube.com/watch?v=FQdaUv95mR8")]
    #[case("https://youtu.be/FQdaUv95mR8")]
    #[case("https://www.youtube.com/embed/FQdaUv95mR8?start=30")]
    #[case("https://www.youtube.com/watch?list=PL1&v=FQdaUv95mR8")]
    #[case("https://www.youtube.com/v/FQdaUv95mR8#t=1")]
    fn extracts_id_from_known_shapes(#[case] url: &str) {
        assert_eq!(youtube_video_id(url).unwrap(), "FQdaUv95mR8");
    }

    #[rstest]
    #[case("")]
    #[case("https://example.com/video.mp4")]
    #[case("https://www.youtube.com/watch?v=short")]
    fn rejects_other_urls(#[case] url: &str) {
        assert!(matches!(
            youtube_video_id(url),
            Err(VidquizError::InvalidVideoUrl { .. })
        ));
    }
}
