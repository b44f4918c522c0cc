use serde::{Deserialize, Serialize};

pub mod caption {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Platform {
        #[default]
        Facebook,
    }

    impl Platform {
        pub const ALL: [Platform; 1] = [Platform::Facebook];

        pub fn label(&self) -> &'static str {
            match self {
                Platform::Facebook => "Facebook",
            }
        }

        pub fn as_str(&self) -> &'static str {
            match self {
                Platform::Facebook => "facebook",
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Style {
        #[default]
        Engaging,
        Interesting,
        Professional,
        Funny,
        Inspirational,
    }

    impl Style {
        pub const ALL: [Style; 5] = [
            Style::Engaging,
            Style::Interesting,
            Style::Professional,
            Style::Funny,
            Style::Inspirational,
        ];

        /// Khmer label, interpolated into the prompt and shown in forms.
        pub fn label(&self) -> &'static str {
            match self {
                Style::Engaging => "ទាក់ទាញ",
                Style::Interesting => "គួរឱ្យចាប់អារម្មណ៍",
                Style::Professional => "វិជ្ជាជីវៈ",
                Style::Funny => "កំប្លែង",
                Style::Inspirational => "លើកទឹកចិត្ត",
            }
        }

        pub fn as_str(&self) -> &'static str {
            match self {
                Style::Engaging => "engaging",
                Style::Interesting => "interesting",
                Style::Professional => "professional",
                Style::Funny => "funny",
                Style::Inspirational => "inspirational",
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Audience {
        #[default]
        General,
        Teenagers,
        YoungAdults,
        Parents,
        Professionals,
    }

    impl Audience {
        pub const ALL: [Audience; 5] = [
            Audience::General,
            Audience::Teenagers,
            Audience::YoungAdults,
            Audience::Parents,
            Audience::Professionals,
        ];

        pub fn label(&self) -> &'static str {
            match self {
                Audience::General => "ទូទៅ",
                Audience::Teenagers => "យុវវ័យ",
                Audience::YoungAdults => "មនុស្សពេញវ័យ",
                Audience::Parents => "ឪពុកម្តាយ",
                Audience::Professionals => "អ្នកជំនាញ",
            }
        }

        pub fn as_str(&self) -> &'static str {
            match self {
                Audience::General => "general",
                Audience::Teenagers => "teenagers",
                Audience::YoungAdults => "young_adults",
                Audience::Parents => "parents",
                Audience::Professionals => "professionals",
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Length {
        Short,
        #[default]
        Medium,
        Long,
    }

    impl Length {
        pub const ALL: [Length; 3] = [Length::Short, Length::Medium, Length::Long];

        pub fn label(&self) -> &'static str {
            match self {
                Length::Short => "ខ្លី",
                Length::Medium => "មធ្យម",
                Length::Long => "វែង",
            }
        }

        pub fn as_str(&self) -> &'static str {
            match self {
                Length::Short => "short",
                Length::Medium => "medium",
                Length::Long => "long",
            }
        }
    }

    /// Parameters collected by the generator form.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CaptionRequest {
        #[serde(default)]
        pub platform: Platform,
        pub product_name: String,
        #[serde(default)]
        pub style: Style,
        #[serde(default)]
        pub audience: Audience,
        #[serde(default)]
        pub length: Length,
        #[serde(default = "default_true")]
        pub generate_hashtags: bool,
    }

    fn default_true() -> bool {
        true
    }

    impl Default for CaptionRequest {
        fn default() -> Self {
            Self {
                platform: Platform::default(),
                product_name: String::new(),
                style: Style::default(),
                audience: Audience::default(),
                length: Length::default(),
                generate_hashtags: true,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct GenerationResult {
        pub caption: String,
        #[serde(default)]
        pub hashtags: Vec<String>,
    }

    /// Product ideas offered as one-click fillers on the generator page.
    pub const EXAMPLE_PRODUCTS: [&str; 5] = [
        "កាហ្វេរសជាតិថ្មី",
        "សម្លៀកបំពាក់បុរស",
        "ហាងកាហ្វេថ្មី",
        "សាប៊ូដុសខ្លួន",
        "កម្មវិធីសិក្សាអនឡាញ",
    ];
}

pub mod api {
    use super::*;
    use crate::caption::GenerationResult;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoginRequest {
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoginResponse {
        pub token: String,
        pub profile: ProfileView,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct QuotaView {
        pub limit: i32,
        pub remaining: i32,
        pub can_generate: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ProfileView {
        pub id: String,
        pub username: String,
        pub email: String,
        pub plan: String,
        pub is_admin: bool,
        pub generations_today: i32,
        pub last_generation_date: String,
        pub license_key: Option<String>,
        /// Unix milliseconds.
        pub pro_expires_at: Option<i64>,
        pub quota: QuotaView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GenerateResponse {
        pub result: GenerationResult,
        pub quota: QuotaView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RedeemLicenseRequest {
        pub key: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MessageResponse {
        pub ok: bool,
        pub message: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OptionEntry {
        pub value: String,
        pub label: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OptionsResponse {
        pub platforms: Vec<OptionEntry>,
        pub styles: Vec<OptionEntry>,
        pub audiences: Vec<OptionEntry>,
        pub lengths: Vec<OptionEntry>,
        pub example_products: Vec<String>,
    }
}

#[cfg(test)]
mod tests {
    use super::caption::*;

    #[test]
    fn caption_request_defaults_match_generator_form() {
        let req: CaptionRequest =
            serde_json::from_str(r#"{"product_name":"coffee"}"#).unwrap();
        assert_eq!(req.platform, Platform::Facebook);
        assert_eq!(req.style, Style::Engaging);
        assert_eq!(req.audience, Audience::General);
        assert_eq!(req.length, Length::Medium);
        assert!(req.generate_hashtags);
    }

    #[test]
    fn enum_wire_names_match_as_str() {
        for a in Audience::ALL {
            let json = serde_json::to_string(&a).unwrap();
            assert_eq!(json, format!("\"{}\"", a.as_str()));
        }
        for s in Style::ALL {
            let json = serde_json::to_string(&s).unwrap();
            assert_eq!(json, format!("\"{}\"", s.as_str()));
        }
    }

    #[test]
    fn unknown_style_is_rejected() {
        let res: Result<CaptionRequest, _> =
            serde_json::from_str(r#"{"product_name":"x","style":"sarcastic"}"#);
        assert!(res.is_err());
    }
}
