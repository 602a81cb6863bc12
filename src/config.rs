use serde::Deserialize;

/// Placeholder shipped in sample env files; treated as "no key"
const PLACEHOLDER_AI_KEY: &str = "YOUR_ACTUAL_API_KEY_HERE";

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL connection URL. Without it the catalog lives in memory.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis connection URL used to persist the signed-in profile
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Object storage base URL (e.g. `https://<project>.supabase.co`)
    #[serde(default)]
    pub storage_url: Option<String>,

    /// Object storage service key
    #[serde(default)]
    pub storage_api_key: Option<String>,

    /// Generative Language API key
    #[serde(default)]
    pub ai_api_key: Option<String>,

    /// Generative Language API base URL
    #[serde(default = "default_ai_api_url")]
    pub ai_api_url: String,

    #[serde(default = "default_ai_text_model")]
    pub ai_text_model: String,

    #[serde(default = "default_ai_speech_model")]
    pub ai_speech_model: String,

    #[serde(default = "default_ai_voice")]
    pub ai_voice: String,

    /// Email of the single catalog administrator
    pub admin_email: String,

    /// Passcode of the single catalog administrator
    pub admin_passcode: String,

    #[serde(default = "default_admin_username")]
    pub admin_username: String,

    /// Messaging number receiving checkout hand-offs (digits only)
    #[serde(default)]
    pub checkout_phone: String,

    #[serde(default = "default_seller_name")]
    pub seller_name: String,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_ai_api_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_ai_text_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_ai_speech_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_ai_voice() -> String {
    "Kore".to_string()
}

fn default_admin_username() -> String {
    "Catalog Admin".to_string()
}

fn default_seller_name() -> String {
    "the producer".to_string()
}

fn default_currency() -> String {
    "KSH".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// The AI key if it looks like a real credential
    pub fn live_ai_key(&self) -> Option<&str> {
        self.ai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| *key != PLACEHOLDER_AI_KEY && key.len() > 10)
    }
}
