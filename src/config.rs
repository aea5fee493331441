use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Default Gemini model used for quiz generation
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Large enough for a few dozen questions; a small bound truncates the JSON array
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Fixed instruction sent with every generation request.
pub const SYSTEM_INSTRUCTION: &str = "You are a specialist in writing exercises that train the user's knowledge. \
Write a quiz about the theme the user asks for. Use the number of questions the user asks for, or 10 questions if they do not say. \
Give each question 5 possible answers unless the user asks for a different number. \
Mark the correct answer of each question with its index in the answers list, starting from 0. \
Return ONLY the questions as one valid JSON array, with no extra text, no explanations and no formatting. \
Do not add any introduction or closing remarks. The response must look exactly like: \
[{\"question\": \"Question text\", \"answers\": [\"Answer 1\", \"Answer 2\", \"Answer 3\", \"Answer 4\", \"Answer 5\"], \"correctAnswer\": 0}, ...]. \
Make sure the correct answer really is accurate.";

/// Trait for types that can retrieve their configuration key from environment variables
pub trait KeyFromEnv {
    /// The environment variable name for this key
    const KEY_NAME: &'static str;

    /// Find the key by checking environment variables, loading .env first
    fn find_key() -> Option<String> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();

        Self::lookup_key(env_var)
    }

    /// Same as `find_key`, reading variables through `lookup`. Blank values count as unset.
    fn lookup_key<L: Fn(&str) -> Option<String>>(lookup: L) -> Option<String> {
        lookup(Self::KEY_NAME).filter(|v| !v.trim().is_empty())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// Ordered list of API keys tried in sequence until one works.
///
/// The pool is immutable once built; the generator only ever reads it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialPool {
    keys: Vec<String>,
}

/// Comma separated pool, e.g. `GENAI_KEYS=key-a, key-b`
pub struct PooledKeys;

impl KeyFromEnv for PooledKeys {
    const KEY_NAME: &'static str = "GENAI_KEYS";
}

/// Single-key deployments
pub struct SingleKey;

impl KeyFromEnv for SingleKey {
    const KEY_NAME: &'static str = "GENAI_KEY";
}

impl CredentialPool {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { keys: keys.into_iter().map(Into::into).collect() }
    }

    /// Split on commas, trim each entry and drop the empty ones.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(',').map(str::trim).filter(|k| !k.is_empty()))
    }

    /// Read `GENAI_KEYS`, falling back to the single `GENAI_KEY`.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(env_var)
    }

    pub fn from_lookup<L: Fn(&str) -> Option<String>>(lookup: L) -> Self {
        if let Some(raw) = PooledKeys::lookup_key(&lookup) {
            let pool = Self::parse(&raw);
            if !pool.is_empty() {
                return pool;
            }
        }
        SingleKey::lookup_key(&lookup).map(|k| Self::new([k.trim()])).unwrap_or_default()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// Keys must never end up in logs
impl fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPool").field("len", &self.keys.len()).finish()
    }
}

/// How a credential is judged usable before the generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyCheck {
    /// Use the key directly; a failed generation call moves on to the next key
    #[default]
    Direct,
    /// List models with the key first and skip it if that fails
    Probe,
}

impl FromStr for KeyCheck {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "probe" => Ok(Self::Probe),
            _ => Err(ConfigError::InvalidValue { name: "GENAI_KEY_CHECK", value: s.to_string() }),
        }
    }
}

/// What to do when the cleaned response is not a JSON array of questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseFailure {
    /// Log and return no questions
    #[default]
    Empty,
    /// Surface `GenerationError::Parse`
    Error,
}

impl FromStr for ParseFailure {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "empty" => Ok(Self::Empty),
            "error" => Ok(Self::Error),
            _ => Err(ConfigError::InvalidValue { name: "GENAI_PARSE_FAILURE", value: s.to_string() }),
        }
    }
}

/// Request and policy settings for the question generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub model: String,
    pub max_output_tokens: u32,
    pub system_instruction: String,
    pub key_check: KeyCheck,
    pub parse_failure: ParseFailure,
    pub base_url: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            key_check: KeyCheck::default(),
            parse_failure: ParseFailure::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Defaults overridden by `GENAI_MODEL`, `GENAI_MAX_OUTPUT_TOKENS`,
    /// `GENAI_KEY_CHECK`, `GENAI_PARSE_FAILURE` and `GENAI_BASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(env_var)
    }

    /// `from_env` over an arbitrary variable source.
    pub fn from_lookup<L: Fn(&str) -> Option<String>>(lookup: L) -> Result<Self, ConfigError> {
        let non_empty_var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(model) = non_empty_var("GENAI_MODEL") {
            config.model = model;
        }
        if let Some(raw) = non_empty_var("GENAI_MAX_OUTPUT_TOKENS") {
            config.max_output_tokens = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "GENAI_MAX_OUTPUT_TOKENS",
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = non_empty_var("GENAI_KEY_CHECK") {
            config.key_check = raw.parse()?;
        }
        if let Some(raw) = non_empty_var("GENAI_PARSE_FAILURE") {
            config.parse_failure = raw.parse()?;
        }
        if let Some(url) = non_empty_var("GENAI_BASE_URL") {
            config.base_url = url;
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub const fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    #[must_use]
    pub const fn with_key_check(mut self, key_check: KeyCheck) -> Self {
        self.key_check = key_check;
        self
    }

    #[must_use]
    pub const fn with_parse_failure(mut self, parse_failure: ParseFailure) -> Self {
        self.parse_failure = parse_failure;
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_parse_trims_and_drops_empties() {
        let pool = CredentialPool::parse(" a , ,b,, c ");
        assert_eq!(pool.keys(), &["a", "b", "c"]);
    }

    #[test]
    fn pool_parse_of_blank_is_empty() {
        assert!(CredentialPool::parse(" , ,").is_empty());
        assert!(CredentialPool::parse("").is_empty());
    }

    #[test]
    fn pool_debug_hides_keys() {
        let pool = CredentialPool::new(["secret-1", "secret-2"]);
        let shown = format!("{:?}", pool);
        assert!(!shown.contains("secret"));
        assert!(shown.contains('2'));
    }

    #[test]
    fn key_check_parsing() {
        assert_eq!("probe".parse::<KeyCheck>(), Ok(KeyCheck::Probe));
        assert_eq!(" DIRECT ".parse::<KeyCheck>(), Ok(KeyCheck::Direct));
        assert!("sometimes".parse::<KeyCheck>().is_err());
    }

    #[test]
    fn parse_failure_parsing() {
        assert_eq!("error".parse::<ParseFailure>(), Ok(ParseFailure::Error));
        assert_eq!("Empty".parse::<ParseFailure>(), Ok(ParseFailure::Empty));
        assert!("ignore".parse::<ParseFailure>().is_err());
    }

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| pairs.iter().find(|(k, _)| *k == name).map(|(_, v)| v.to_string())
    }

    #[test]
    fn pooled_keys_win_over_single_key() {
        let pool = CredentialPool::from_lookup(vars(&[("GENAI_KEYS", "a, b"), ("GENAI_KEY", "single")]));
        assert_eq!(pool.keys(), &["a", "b"]);
    }

    #[test]
    fn blank_pool_falls_back_to_trimmed_single_key() {
        let pool = CredentialPool::from_lookup(vars(&[("GENAI_KEYS", "  "), ("GENAI_KEY", "  single  ")]));
        assert_eq!(pool.keys(), &["single"]);

        let pool = CredentialPool::from_lookup(vars(&[("GENAI_KEYS", " , ,"), ("GENAI_KEY", "single")]));
        assert_eq!(pool.keys(), &["single"]);
    }

    #[test]
    fn no_variables_means_empty_pool() {
        assert!(CredentialPool::from_lookup(vars(&[])).is_empty());
        assert!(CredentialPool::from_lookup(vars(&[("GENAI_KEY", "")])).is_empty());
    }

    #[test]
    fn config_overrides_apply() {
        let config = GeneratorConfig::from_lookup(vars(&[
            ("GENAI_MODEL", "gemini-pro"),
            ("GENAI_MAX_OUTPUT_TOKENS", " 2048 "),
            ("GENAI_KEY_CHECK", "probe"),
            ("GENAI_PARSE_FAILURE", "error"),
            ("GENAI_BASE_URL", "http://localhost:8080"),
        ]))
        .unwrap();
        assert_eq!(config.model, "gemini-pro");
        assert_eq!(config.max_output_tokens, 2048);
        assert_eq!(config.key_check, KeyCheck::Probe);
        assert_eq!(config.parse_failure, ParseFailure::Error);
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn blank_overrides_keep_defaults() {
        let config = GeneratorConfig::from_lookup(vars(&[("GENAI_MODEL", " "), ("GENAI_MAX_OUTPUT_TOKENS", "")])).unwrap();
        assert_eq!(config, GeneratorConfig::default());
    }

    #[test]
    fn invalid_numbers_and_policies_are_config_errors() {
        let err = GeneratorConfig::from_lookup(vars(&[("GENAI_MAX_OUTPUT_TOKENS", "lots")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidValue { name: "GENAI_MAX_OUTPUT_TOKENS", value: "lots".to_string() });

        let err = GeneratorConfig::from_lookup(vars(&[("GENAI_KEY_CHECK", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "GENAI_KEY_CHECK", .. }));
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = GeneratorConfig::default()
            .with_model("gemini-pro")
            .with_max_output_tokens(1000)
            .with_key_check(KeyCheck::Probe);
        assert_eq!(config.model, "gemini-pro");
        assert_eq!(config.max_output_tokens, 1000);
        assert_eq!(config.key_check, KeyCheck::Probe);
        assert_eq!(config.parse_failure, ParseFailure::Empty);
    }
}
