use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::rate_limit::RateLimitConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// HMAC key for session tokens. When unset a random key is generated
    /// at startup and sessions do not survive a restart.
    pub admin_secret: Option<String>,
    /// Shared password accepted by the admin password login.
    pub admin_password: Option<String>,
    /// Adds the `Secure` attribute to the session cookie.
    pub cookie_secure: bool,
    pub mail: MailConfig,
    pub bot_api_url: String,
    pub news_rss_url: String,
    pub gemini_api_key: Option<String>,
    pub paypal: PaypalConfig,
    pub business: BusinessHours,
    pub rate_limits: RateLimits,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("fpsos.db")
    }

    /// Applies the sections of a TOML config file on top of this config.
    /// Keys missing from the file keep their current values.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;

        if let Some(business) = file.business {
            business.validate()?;
            self.business = business;
        }
        if let Some(rate_limits) = file.rate_limits {
            self.rate_limits = rate_limits;
        }
        if let Some(mail) = file.mail {
            self.mail.from_bookings = mail.from_bookings;
            self.mail.from_alerts = mail.from_alerts;
            if mail.admin_email.is_some() {
                self.mail.admin_email = mail.admin_email;
            }
        }
        if let Some(url) = file.bot_api_url {
            self.bot_api_url = url;
        }
        if let Some(url) = file.news_rss_url {
            self.news_rss_url = url;
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            data_dir: PathBuf::from("./data"),
            admin_secret: None,
            admin_password: None,
            cookie_secure: false,
            mail: MailConfig::default(),
            bot_api_url: "http://localhost:8088/api".to_string(),
            news_rss_url: "https://www.hltv.org/rss/news".to_string(),
            gemini_api_key: None,
            paypal: PaypalConfig::default(),
            business: BusinessHours::default(),
            rate_limits: RateLimits::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    business: Option<BusinessHours>,
    rate_limits: Option<RateLimits>,
    mail: Option<MailFileSection>,
    bot_api_url: Option<String>,
    news_rss_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MailFileSection {
    #[serde(default = "default_from_bookings")]
    from_bookings: String,
    #[serde(default = "default_from_alerts")]
    from_alerts: String,
    admin_email: Option<String>,
}

fn default_from_bookings() -> String {
    "FPSOS Bookings <bookings@resend.dev>".to_string()
}

fn default_from_alerts() -> String {
    "FPSOS Alerts <alerts@resend.dev>".to_string()
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Resend API key. Email delivery is skipped when unset.
    pub api_key: Option<String>,
    pub api_url: String,
    pub from_bookings: String,
    pub from_alerts: String,
    /// Recipient of new-order, payment and contact-form alerts.
    pub admin_email: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.resend.com/emails".to_string(),
            from_bookings: default_from_bookings(),
            from_alerts: default_from_alerts(),
            admin_email: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaypalConfig {
    pub webhook_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base: String,
    /// Accept webhooks without calling PayPal's verification API.
    pub skip_verify: bool,
}

impl Default for PaypalConfig {
    fn default() -> Self {
        Self {
            webhook_id: None,
            client_id: None,
            client_secret: None,
            api_base: "https://api-m.paypal.com".to_string(),
            skip_verify: false,
        }
    }
}

/// Opening hours used to generate bookable slots.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusinessHours {
    /// Informational; dates and times are stored as local wall-clock strings.
    pub timezone: String,
    pub start_hour: u32,
    /// Exclusive.
    pub end_hour: u32,
    /// Open weekdays, 0 = Sunday.
    pub days: Vec<u32>,
    pub slot_duration_minutes: u32,
}

impl BusinessHours {
    pub fn validate(&self) -> Result<()> {
        if self.start_hour >= self.end_hour || self.end_hour > 24 {
            return Err(Error::Config(format!(
                "business hours {}..{} are not a valid range",
                self.start_hour, self.end_hour
            )));
        }
        if self.slot_duration_minutes == 0 {
            return Err(Error::Config(
                "slot_duration_minutes must be positive".to_string(),
            ));
        }
        if let Some(day) = self.days.iter().find(|d| **d > 6) {
            return Err(Error::Config(format!("invalid weekday {day}")));
        }
        Ok(())
    }
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            timezone: "Asia/Dubai".to_string(),
            start_hour: 13,
            end_hour: 23,
            days: vec![1, 2, 3, 4, 5, 6, 0],
            slot_duration_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimits {
    pub booking_create: RateLimitConfig,
    pub leaderboard_submit: RateLimitConfig,
    pub contact_form: RateLimitConfig,
    pub news_fetch: RateLimitConfig,
    pub general_api: RateLimitConfig,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            booking_create: RateLimitConfig::new(5, 60),
            leaderboard_submit: RateLimitConfig::new(10, 60),
            contact_form: RateLimitConfig::new(3, 60),
            news_fetch: RateLimitConfig::new(30, 60),
            general_api: RateLimitConfig::new(60, 60),
        }
    }
}
