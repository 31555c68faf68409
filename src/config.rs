use std::net::IpAddr;
use std::path::PathBuf;

use ipnet::IpNet;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    pub max_body_size: usize,
    pub trusted_proxies: Vec<IpNet>,
    pub log_level: String,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub user: Option<String>,
    pub pass: String,
    pub from: String,
    pub to: String,
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Implicit TLS from the first byte (usually port 465).
    Tls,
    /// STARTTLS is required; relays that don't offer it are refused.
    StartTls,
    /// Upgrade with STARTTLS when the relay offers it, plaintext otherwise.
    Opportunistic,
    /// Plaintext. Only for local relays and mail catchers.
    None,
}

impl SmtpSecurity {
    fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "tls" => Ok(SmtpSecurity::Tls),
            "starttls" => Ok(SmtpSecurity::StartTls),
            "false" | "" => Ok(SmtpSecurity::Opportunistic),
            "none" => Ok(SmtpSecurity::None),
            other => Err(format!("Invalid SMTP_SECURE: {other}")),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    ///
    /// Variables that are set but blank count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let filtered = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let env = Env { lookup: &filtered };

        let data_dir = PathBuf::from(env.or("DATA_DIR", "./data"));

        let host: IpAddr = env
            .or("HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid HOST: {e}"))?;

        let port: u16 = env
            .or("PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid PORT: {e}"))?;

        let max_body_size: usize = env
            .or("MAX_BODY_SIZE", "524288")
            .parse()
            .map_err(|e| format!("Invalid MAX_BODY_SIZE: {e}"))?;

        let trusted_proxies: Vec<IpNet> = env
            .or("TRUSTED_PROXIES", "")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|e| format!("Invalid TRUSTED_PROXIES entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let log_level = env.or("LOG_LEVEL", "info");

        let smtp = match env.opt("SMTP_HOST") {
            Some(host) => Some(smtp_from_env(&env, host)?),
            None => None,
        };

        Ok(Config {
            data_dir,
            host,
            port,
            max_body_size,
            trusted_proxies,
            log_level,
            smtp,
        })
    }
}

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    fn opt(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }
}

fn smtp_from_env(env: &Env<'_>, host: String) -> Result<SmtpConfig, String> {
    let port: u16 = env
        .or("SMTP_PORT", "587")
        .parse()
        .map_err(|e| format!("Invalid SMTP_PORT: {e}"))?;

    let security = SmtpSecurity::parse(&env.or("SMTP_SECURE", "false"))?;
    let user = env.opt("SMTP_USER");
    let pass = env.or("SMTP_PASS", "");

    let from = env
        .opt("EMAIL_FROM")
        .or_else(|| user.clone())
        .ok_or("EMAIL_FROM or SMTP_USER must be set when SMTP_HOST is set")?;
    let to = env
        .opt("ADMIN_EMAIL")
        .ok_or("ADMIN_EMAIL must be set when SMTP_HOST is set")?;

    Ok(SmtpConfig {
        host,
        port,
        security,
        user,
        pass,
        from,
        to,
    })
}
