use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::i18n::Locale;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub webhook: WebhookConfig,
    pub locale: LocaleConfig,
    pub transactions: TransactionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    /// Conversations untouched for this long are dropped from the session store.
    pub session_idle_secs: u64,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub path: String,
    pub auth_token: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct LocaleConfig {
    pub default: Locale,
}

/// Fixed values the sample checkout flow stamps onto orders and payment requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionConfig {
    pub order_id: String,
    pub merchant_id: String,
    pub currency: String,
    pub payment_display_name: String,
    pub supported_card_networks: Vec<String>,
    pub customer_service_url: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub default_locale: Option<String>,
    pub webhook_auth_token: Option<String>,
    pub order_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
                session_idle_secs: 1800,
            },
            webhook: WebhookConfig { path: "/transactions".to_string(), auth_token: None },
            locale: LocaleConfig { default: Locale::EnUs },
            transactions: TransactionConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            order_id: "<UNIQUE_ORDER_ID>".to_string(),
            merchant_id: "book_store_1".to_string(),
            currency: "USD".to_string(),
            payment_display_name: "VISA-1234".to_string(),
            supported_card_networks: vec!["VISA".to_string(), "AMEX".to_string()],
            customer_service_url: "http://example.com/customer-service".to_string(),
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("bookcart.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides)?;
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(session_idle_secs) = server.session_idle_secs {
                self.server.session_idle_secs = session_idle_secs;
            }
        }

        if let Some(webhook) = patch.webhook {
            if let Some(path) = webhook.path {
                self.webhook.path = path;
            }
            if let Some(webhook_auth_token_value) = webhook.auth_token {
                self.webhook.auth_token = Some(secret_value(webhook_auth_token_value));
            }
        }

        if let Some(locale) = patch.locale {
            if let Some(default) = locale.default {
                self.locale.default = parse_locale("locale.default", &default)?;
            }
        }

        if let Some(transactions) = patch.transactions {
            if let Some(order_id) = transactions.order_id {
                self.transactions.order_id = order_id;
            }
            if let Some(merchant_id) = transactions.merchant_id {
                self.transactions.merchant_id = merchant_id;
            }
            if let Some(currency) = transactions.currency {
                self.transactions.currency = currency;
            }
            if let Some(payment_display_name) = transactions.payment_display_name {
                self.transactions.payment_display_name = payment_display_name;
            }
            if let Some(supported_card_networks) = transactions.supported_card_networks {
                self.transactions.supported_card_networks = supported_card_networks;
            }
            if let Some(customer_service_url) = transactions.customer_service_url {
                self.transactions.customer_service_url = customer_service_url;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BOOKCART_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("BOOKCART_SERVER_PORT") {
            self.server.port = parse_u16("BOOKCART_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("BOOKCART_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("BOOKCART_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("BOOKCART_SERVER_SESSION_IDLE_SECS") {
            self.server.session_idle_secs =
                parse_u64("BOOKCART_SERVER_SESSION_IDLE_SECS", &value)?;
        }

        if let Some(value) = read_env("BOOKCART_WEBHOOK_PATH") {
            self.webhook.path = value;
        }
        if let Some(value) = read_env("BOOKCART_WEBHOOK_AUTH_TOKEN") {
            self.webhook.auth_token = Some(secret_value(value));
        }

        if let Some(value) = read_env("BOOKCART_LOCALE_DEFAULT") {
            self.locale.default = parse_env_locale("BOOKCART_LOCALE_DEFAULT", &value)?;
        }

        if let Some(value) = read_env("BOOKCART_TRANSACTIONS_ORDER_ID") {
            self.transactions.order_id = value;
        }
        if let Some(value) = read_env("BOOKCART_TRANSACTIONS_MERCHANT_ID") {
            self.transactions.merchant_id = value;
        }
        if let Some(value) = read_env("BOOKCART_TRANSACTIONS_CURRENCY") {
            self.transactions.currency = value;
        }
        if let Some(value) = read_env("BOOKCART_TRANSACTIONS_PAYMENT_DISPLAY_NAME") {
            self.transactions.payment_display_name = value;
        }
        if let Some(value) = read_env("BOOKCART_TRANSACTIONS_SUPPORTED_CARD_NETWORKS") {
            self.transactions.supported_card_networks = parse_list(&value);
        }
        if let Some(value) = read_env("BOOKCART_TRANSACTIONS_CUSTOMER_SERVICE_URL") {
            self.transactions.customer_service_url = value;
        }

        let log_level =
            read_env("BOOKCART_LOGGING_LEVEL").or_else(|| read_env("BOOKCART_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BOOKCART_LOGGING_FORMAT").or_else(|| read_env("BOOKCART_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(default_locale) = overrides.default_locale {
            self.locale.default = parse_locale("locale.default", &default_locale)?;
        }
        if let Some(webhook_auth_token) = overrides.webhook_auth_token {
            self.webhook.auth_token = Some(secret_value(webhook_auth_token));
        }
        if let Some(order_id) = overrides.order_id {
            self.transactions.order_id = order_id;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_webhook(&self.webhook)?;
        validate_transactions(&self.transactions)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("bookcart.toml"), PathBuf::from("config/bookcart.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if server.session_idle_secs == 0 {
        return Err(ConfigError::Validation(
            "server.session_idle_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_webhook(webhook: &WebhookConfig) -> Result<(), ConfigError> {
    if !webhook.path.starts_with('/') || webhook.path == "/health" {
        return Err(ConfigError::Validation(
            "webhook.path must start with `/` and must not shadow `/health`".to_string(),
        ));
    }

    let blank_token =
        webhook.auth_token.as_ref().map(|token| token.expose_secret().trim().is_empty());
    if blank_token == Some(true) {
        return Err(ConfigError::Validation(
            "webhook.auth_token must not be blank when set; omit it to disable the check"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_transactions(transactions: &TransactionConfig) -> Result<(), ConfigError> {
    if transactions.order_id.trim().is_empty() {
        return Err(ConfigError::Validation("transactions.order_id must not be empty".to_string()));
    }

    if transactions.merchant_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "transactions.merchant_id must not be empty".to_string(),
        ));
    }

    let currency = transactions.currency.as_str();
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(
            "transactions.currency must be a three-letter ISO 4217 code such as `USD`".to_string(),
        ));
    }

    if transactions.supported_card_networks.is_empty() {
        return Err(ConfigError::Validation(
            "transactions.supported_card_networks must list at least one network".to_string(),
        ));
    }

    let url = transactions.customer_service_url.as_str();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "transactions.customer_service_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_locale(field: &str, value: &str) -> Result<Locale, ConfigError> {
    Locale::parse(value).ok_or_else(|| {
        ConfigError::Validation(format!(
            "{field} must be a supported locale (en-US|ja-JP), got `{value}`"
        ))
    })
}

fn parse_env_locale(key: &str, value: &str) -> Result<Locale, ConfigError> {
    Locale::parse(value).ok_or_else(|| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    webhook: Option<WebhookPatch>,
    locale: Option<LocalePatch>,
    transactions: Option<TransactionsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    session_idle_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPatch {
    path: Option<String>,
    auth_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LocalePatch {
    default: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TransactionsPatch {
    order_id: Option<String>,
    merchant_id: Option<String>,
    currency: Option<String>,
    payment_display_name: Option<String>,
    supported_card_networks: Option<Vec<String>>,
    customer_service_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::i18n::Locale;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_load_without_file_or_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.locale.default == Locale::EnUs, "default locale should be en-US")?;
        ensure(config.webhook.path == "/transactions", "default webhook path")?;
        ensure(config.webhook.auth_token.is_none(), "auth check is off by default")?;
        ensure(config.transactions.order_id == "<UNIQUE_ORDER_ID>", "default order id")?;
        ensure(
            config.transactions.supported_card_networks == ["VISA", "AMEX"],
            "default card networks",
        )?;
        ensure(config.server.session_idle_secs == 1800, "sessions idle out after 30 minutes")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logs by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_BOOKCART_TOKEN", "shared-secret-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("bookcart.toml");
            fs::write(
                &path,
                r#"
[webhook]
auth_token = "${TEST_BOOKCART_TOKEN}"

[locale]
default = "ja-JP"

[transactions]
supported_card_networks = ["VISA", "MASTERCARD", "DISCOVER"]
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let token = config.webhook.auth_token.as_ref().map(|token| token.expose_secret());
            ensure(token == Some("shared-secret-from-env"), "token should be interpolated")?;
            ensure(config.locale.default == Locale::JaJp, "file should set default locale")?;
            ensure(
                config.transactions.supported_card_networks.len() == 3,
                "file should replace card networks",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_BOOKCART_TOKEN"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BOOKCART_LOG_LEVEL", "warn");
        env::set_var("BOOKCART_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["BOOKCART_LOG_LEVEL", "BOOKCART_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BOOKCART_SERVER_PORT", "9090");
        env::set_var("BOOKCART_TRANSACTIONS_ORDER_ID", "order-from-env");
        env::set_var("BOOKCART_TRANSACTIONS_SUPPORTED_CARD_NETWORKS", "VISA, JCB");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("bookcart.toml");
            fs::write(
                &path,
                r#"
[server]
port = 7070
bind_address = "0.0.0.0"

[transactions]
order_id = "order-from-file"
merchant_id = "merchant-from-file"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    order_id: Some("order-from-override".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.server.bind_address == "0.0.0.0", "file bind address should apply")?;
            ensure(config.server.port == 9090, "env port should win over file")?;
            ensure(
                config.transactions.merchant_id == "merchant-from-file",
                "file merchant should win over defaults",
            )?;
            ensure(
                config.transactions.order_id == "order-from-override",
                "override order id should win",
            )?;
            ensure(
                config.transactions.supported_card_networks == ["VISA", "JCB"],
                "env card networks should be split on commas",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            Ok(())
        })();

        clear_vars(&[
            "BOOKCART_SERVER_PORT",
            "BOOKCART_TRANSACTIONS_ORDER_ID",
            "BOOKCART_TRANSACTIONS_SUPPORTED_CARD_NETWORKS",
        ]);
        result
    }

    #[test]
    fn unsupported_default_locale_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                default_locale: Some("fr-FR".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => {
                return Err("expected validation failure but config load succeeded".to_string())
            }
            Err(error) => error,
        };

        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("locale.default")
        );
        ensure(has_message, "validation failure should mention locale.default")
    }

    #[test]
    fn invalid_env_locale_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BOOKCART_LOCALE_DEFAULT", "xx");
        let result = AppConfig::load(LoadOptions::default());
        clear_vars(&["BOOKCART_LOCALE_DEFAULT"]);

        let has_key = matches!(
            result,
            Err(ConfigError::InvalidEnvOverride { ref key, .. }) if key == "BOOKCART_LOCALE_DEFAULT"
        );
        ensure(has_key, "invalid env locale should name the variable")
    }

    #[test]
    fn webhook_path_must_not_shadow_health() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BOOKCART_WEBHOOK_PATH", "/health");
        let result = AppConfig::load(LoadOptions::default());
        clear_vars(&["BOOKCART_WEBHOOK_PATH"]);

        let rejected = matches!(
            result,
            Err(ConfigError::Validation(ref message)) if message.contains("webhook.path")
        );
        ensure(rejected, "webhook path equal to /health should be rejected")
    }

    #[test]
    fn required_file_missing_is_an_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let result = AppConfig::load(LoadOptions {
            config_path: Some(dir.path().join("absent.toml")),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should be reported",
        )
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BOOKCART_WEBHOOK_AUTH_TOKEN", "webhook-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("webhook-secret-value"),
                "debug output should not contain webhook token",
            )
        })();

        clear_vars(&["BOOKCART_WEBHOOK_AUTH_TOKEN"]);
        result
    }
}
