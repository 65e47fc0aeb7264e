use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::borrow::Cow;
use validator::{Validate, ValidationError};

// Pictographs plus the joiners, selectors and modifiers that build sequences
static EMOJI_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\p{Extended_Pictographic}|\p{Emoji_Component})+$")
        .expect("emoji pattern compiles")
});

pub fn validate_emoji(content: &str) -> Result<(), ValidationError> {
    if EMOJI_ONLY.is_match(content) {
        return Ok(());
    }
    Err(ValidationError::new("emoji").with_message(Cow::Borrowed("Only emojis are allowed!")))
}

#[derive(Debug, Validate, Deserialize)]
pub struct CreatePostRequest {
    #[validate(
        length(min = 1, max = 280, message = "Posts must be 1-280 characters"),
        custom(function = "validate_emoji")
    )]
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_POST_CHARS: usize = 280;

    fn request(content: &str) -> CreatePostRequest {
        CreatePostRequest {
            content: content.to_string(),
        }
    }

    #[test]
    fn accepts_emoji_sequences() {
        for ok in ["🎉", "🎉🎉🎉", "👍🏽", "👨‍👩‍👧", "🇳🇱", "❤️"] {
            assert!(request(ok).validate().is_ok(), "{ok} should be valid");
        }
    }

    #[test]
    fn rejects_text() {
        for bad in ["hello", "🎉 party", "🎉!", " "] {
            let errors = request(bad).validate().unwrap_err();
            assert!(errors.field_errors().contains_key("content"), "{bad}");
        }
    }

    #[test]
    fn length_is_counted_in_code_points() {
        let max = "😀".repeat(MAX_POST_CHARS);
        assert!(max.len() > MAX_POST_CHARS);
        assert!(request(&max).validate().is_ok());

        let over = "😀".repeat(MAX_POST_CHARS + 1);
        assert!(request(&over).validate().is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(request("").validate().is_err());
    }
}
