use captionly_shared::caption::CaptionRequest;
use serde_json::{Value, json};

/// Prompt text plus the response schema the model must follow.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSpec {
    pub prompt: String,
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Khmer "please enter a product name or topic".
pub const MISSING_PRODUCT_MESSAGE: &str = "សូម​បញ្ចូល​ឈ្មោះផលិតផល ឬ​ប្រធានបទ";

pub fn validate(request: &CaptionRequest) -> Result<CaptionRequest, ValidationError> {
    let product_name = request.product_name.trim();
    if product_name.is_empty() {
        return Err(ValidationError(MISSING_PRODUCT_MESSAGE.to_string()));
    }
    Ok(CaptionRequest {
        product_name: product_name.to_string(),
        ..request.clone()
    })
}

pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "caption": {
                "type": "STRING",
                "description": "The generated social media caption in Khmer language."
            },
            "hashtags": {
                "type": "ARRAY",
                "description": "An array of relevant hashtags in Khmer. Should be an empty array if hashtags were not requested.",
                "items": { "type": "STRING" }
            }
        },
        "required": ["caption", "hashtags"]
    })
}

pub fn build_prompt(request: &CaptionRequest) -> PromptSpec {
    let hashtag_instruction = if request.generate_hashtags {
        "After the caption, provide a list of 5-7 relevant and popular hashtags in Khmer, each starting with the # symbol."
    } else {
        "Do not generate hashtags."
    };

    let prompt = format!(
        r#"You are an expert social media marketer specializing in the Cambodian market. Your task is to generate a compelling caption in the Khmer language.

**Instructions:**
1. The entire output, including the caption and hashtags, MUST be in Khmer script.
2. Do not include any English text or translations unless it's a brand name that is commonly used in English.
3. Adapt the tone and style to the specified platform. For TikTok, use more emojis and a casual tone. For Facebook, be slightly more descriptive. For YouTube, focus on a clear and engaging description for a video.
4. Ensure the caption is natural and fluent for native Khmer speakers.

**Caption Details:**
- **Platform:** {platform}
- **Product/Service/Topic:** {product}
- **Style:** {style}
- **Target Audience:** {audience}
- **Desired Length:** {length}

**Task:**
Generate the caption based on the details above.
{hashtags}
"#,
        platform = request.platform.label(),
        product = request.product_name,
        style = request.style.label(),
        audience = request.audience.label(),
        length = request.length.label(),
        hashtags = hashtag_instruction,
    );

    PromptSpec {
        prompt,
        schema: response_schema(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use captionly_shared::caption::{Audience, Length, Platform, Style};

    fn request(hashtags: bool) -> CaptionRequest {
        CaptionRequest {
            platform: Platform::Facebook,
            product_name: "កាហ្វេរសជាតិថ្មី".to_string(),
            style: Style::Funny,
            audience: Audience::Parents,
            length: Length::Short,
            generate_hashtags: hashtags,
        }
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(build_prompt(&request(true)), build_prompt(&request(true)));
    }

    #[test]
    fn prompt_carries_khmer_labels() {
        let spec = build_prompt(&request(true));
        assert!(spec.prompt.contains("**Platform:** Facebook"));
        assert!(spec.prompt.contains("**Product/Service/Topic:** កាហ្វេរសជាតិថ្មី"));
        assert!(spec.prompt.contains(Style::Funny.label()));
        assert!(spec.prompt.contains(Audience::Parents.label()));
        assert!(spec.prompt.contains(Length::Short.label()));
    }

    #[test]
    fn hashtag_instruction_follows_flag() {
        let with = build_prompt(&request(true)).prompt;
        let without = build_prompt(&request(false)).prompt;
        assert!(with.contains("5-7 relevant and popular hashtags"));
        assert!(!with.contains("Do not generate hashtags."));
        assert!(without.contains("Do not generate hashtags."));
        assert!(!without.contains("5-7 relevant"));
    }

    #[test]
    fn every_option_combination_builds() {
        for style in Style::ALL {
            for audience in Audience::ALL {
                for length in Length::ALL {
                    let req = CaptionRequest {
                        style,
                        audience,
                        length,
                        ..request(false)
                    };
                    let spec = build_prompt(&req);
                    assert!(spec.prompt.contains(style.label()));
                    assert_eq!(spec.schema["required"], json!(["caption", "hashtags"]));
                }
            }
        }
    }

    #[test]
    fn blank_product_is_rejected() {
        let mut req = request(true);
        req.product_name = "   ".to_string();
        assert_eq!(
            validate(&req),
            Err(ValidationError(MISSING_PRODUCT_MESSAGE.to_string()))
        );
    }

    #[test]
    fn product_name_is_trimmed() {
        let mut req = request(true);
        req.product_name = "  soap  ".to_string();
        assert_eq!(validate(&req).unwrap().product_name, "soap");
    }
}
