use crate::error::Error;
use crate::store::StoreKind;
use serde_json::Value;
use std::collections::HashMap;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use trust_dns_client::rr::{LowerName, Name};

pub type SharedConfig = Arc<Config>;

const DEFAULT_DNS_PORT: u16 = 53;
const DEFAULT_API_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Immutable-after-init server identity and store selection.
///
/// Constructed once at startup and passed by reference into the DNS listener,
/// the answer logic and the challenge presenter. The name fields are always
/// dot-terminated lowercase after construction.
#[derive(Debug, Clone)]
pub struct Config {
    /// The domain this server is authoritative for.
    pub domain: LowerName,
    /// The advertised nameserver name. Defaults to `domain` when unset, and
    /// vice versa.
    pub nameserver: LowerName,
    /// SOA responsible-party name. Defaults to `hostmaster.<domain>`.
    pub rname: LowerName,
    /// The public identity of this server: either a literal IP address or a
    /// CNAME target. May be empty.
    pub public_addr: String,
    pub dns_bind_addr: SocketAddr,
    pub api_bind_addr: SocketAddr,
    pub api_timeout: Duration,
    pub store_kind: StoreKind,
    pub store_options: HashMap<String, Value>,
}

/// Raw option values as read from the process environment, before
/// normalization and defaulting.
#[derive(Debug, Default)]
pub(crate) struct RawConfig {
    pub domain: Option<String>,
    pub nameserver: Option<String>,
    pub rname: Option<String>,
    pub public_addr: Option<String>,
    pub dns_port: Option<String>,
    pub api_bind_addr: Option<String>,
    pub api_timeout: Option<String>,
    pub store_kind: Option<String>,
    pub store_options: HashMap<String, Value>,
}

impl Config {
    /// Build a `Config` from the process environment.
    ///
    /// Recognized variables: `DOMAIN_NAME`, `NAMESERVER`, `RNAME`,
    /// `PUBLIC_IP`, `DNS_PORT`, `API_BIND_ADDR`, `API_TIMEOUT`, `STORE_TYPE`
    /// and `STORE_CONFIG` (a JSON object of backend options).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if neither `DOMAIN_NAME` nor `NAMESERVER` is
    /// set, or if any value fails to parse. Returns [`Error::InvalidJSON`]
    /// for a malformed `STORE_CONFIG`.
    pub fn from_env() -> Result<Self, Error> {
        let store_options = match env_opt("STORE_CONFIG") {
            Some(raw) => serde_json::from_str(&raw)?,
            None => HashMap::default(),
        };
        Self::assemble(RawConfig {
            domain: env_opt("DOMAIN_NAME"),
            nameserver: env_opt("NAMESERVER"),
            rname: env_opt("RNAME"),
            public_addr: env_opt("PUBLIC_IP"),
            dns_port: env_opt("DNS_PORT"),
            api_bind_addr: env_opt("API_BIND_ADDR"),
            api_timeout: env_opt("API_TIMEOUT"),
            store_kind: env_opt("STORE_TYPE"),
            store_options,
        })
    }

    pub(crate) fn assemble(raw: RawConfig) -> Result<Self, Error> {
        let (domain, nameserver) = match (raw.domain, raw.nameserver) {
            (None, None) => {
                return Err(Error::Config(
                    "DOMAIN_NAME or NAMESERVER must be set".to_string(),
                ))
            }
            (Some(domain), None) => (domain.clone(), domain),
            (None, Some(nameserver)) => (nameserver.clone(), nameserver),
            (Some(domain), Some(nameserver)) => (domain, nameserver),
        };
        let domain = fqdn(&domain)?;
        let nameserver = fqdn(&nameserver)?;
        let rname = match raw.rname {
            Some(rname) => fqdn(&rname)?,
            None => fqdn(&format!("hostmaster.{domain}"))?,
        };

        let dns_port = match raw.dns_port {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("invalid DNS_PORT \"{port}\"")))?,
            None => DEFAULT_DNS_PORT,
        };
        let api_bind_addr = raw
            .api_bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_API_BIND_ADDR);
        let api_bind_addr = api_bind_addr
            .parse()
            .map_err(|_| Error::Config(format!("invalid API_BIND_ADDR \"{api_bind_addr}\"")))?;
        let api_timeout = match raw.api_timeout {
            Some(secs) => secs
                .parse::<u64>()
                .map_err(|_| Error::Config(format!("invalid API_TIMEOUT \"{secs}\"")))?,
            None => DEFAULT_API_TIMEOUT_SECS,
        };
        let store_kind = match raw.store_kind {
            Some(kind) => StoreKind::from_str(&kind)?,
            None => StoreKind::default(),
        };

        // String-valued store options are expanded against the process
        // environment before they are applied.
        let mut store_options = raw.store_options;
        for value in store_options.values_mut() {
            if let Value::String(s) = value {
                *s = expand_env(s);
            }
        }

        Ok(Config {
            domain,
            nameserver,
            rname,
            public_addr: raw.public_addr.unwrap_or_default(),
            dns_bind_addr: SocketAddr::from(([0, 0, 0, 0], dns_port)),
            api_bind_addr,
            api_timeout: Duration::from_secs(api_timeout),
            store_kind,
            store_options,
        })
    }

    /// The public identity value: the configured public IP or CNAME target,
    /// falling back to the nameserver name when unset.
    pub fn public_value(&self) -> String {
        if self.public_addr.is_empty() {
            self.nameserver.to_string()
        } else {
            self.public_addr.clone()
        }
    }

    /// Whether the public identity is a CNAME target rather than a literal
    /// IP address. A value that doesn't parse as an IP must be a CNAME.
    pub fn public_is_cname(&self) -> bool {
        let value = self.public_value();
        if value.is_empty() {
            return false;
        }
        IpAddr::from_str(&value).is_err()
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

/// Normalize a name to its dot-terminated lowercase form. All comparisons
/// against configured names use this form.
pub(crate) fn fqdn(raw: &str) -> Result<LowerName, Error> {
    let mut name = raw.trim().to_lowercase();
    if !name.ends_with('.') {
        name.push('.');
    }
    Ok(LowerName::from(Name::from_str(&name)?))
}

/// Expand `$VAR` and `${VAR}` references against the process environment.
/// Undefined variables expand to the empty string.
pub(crate) fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }
        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if next == '_' || next.is_ascii_alphanumeric() {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }
        if braced && chars.peek() == Some(&'}') {
            chars.next();
        }
        if name.is_empty() {
            out.push('$');
            continue;
        }
        out.push_str(&env::var(&name).unwrap_or_default());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(domain: Option<&str>, nameserver: Option<&str>) -> RawConfig {
        RawConfig {
            domain: domain.map(String::from),
            nameserver: nameserver.map(String::from),
            ..RawConfig::default()
        }
    }

    #[test]
    fn domain_and_nameserver_default_each_other() {
        let config = Config::assemble(raw(Some("acme.com"), None)).unwrap();
        assert_eq!(config.domain.to_string(), "acme.com.");
        assert_eq!(config.nameserver.to_string(), "acme.com.");

        let config = Config::assemble(raw(None, Some("ns1.acme.com"))).unwrap();
        assert_eq!(config.domain.to_string(), "ns1.acme.com.");
        assert_eq!(config.nameserver.to_string(), "ns1.acme.com.");
    }

    #[test]
    fn missing_identity_is_fatal() {
        assert!(matches!(
            Config::assemble(raw(None, None)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn names_are_normalized() {
        let config = Config::assemble(RawConfig {
            domain: Some("Acme.COM".to_string()),
            nameserver: Some("NS1.acme.com.".to_string()),
            rname: Some("admin.acme.com".to_string()),
            ..RawConfig::default()
        })
        .unwrap();
        assert_eq!(config.domain.to_string(), "acme.com.");
        assert_eq!(config.nameserver.to_string(), "ns1.acme.com.");
        assert_eq!(config.rname.to_string(), "admin.acme.com.");
    }

    #[test]
    fn rname_defaults_to_hostmaster() {
        let config = Config::assemble(raw(Some("acme.com"), None)).unwrap();
        assert_eq!(config.rname.to_string(), "hostmaster.acme.com.");
    }

    #[test]
    fn public_addr_cname_detection() {
        let mut config = Config::assemble(raw(Some("acme.com"), None)).unwrap();
        config.public_addr = "127.0.0.1".to_string();
        assert!(!config.public_is_cname());

        config.public_addr = "2001:db8::1".to_string();
        assert!(!config.public_is_cname());

        config.public_addr = "edge.example.net".to_string();
        assert!(config.public_is_cname());

        // Unset public address falls back to the nameserver for the test.
        config.public_addr = String::new();
        assert!(config.public_is_cname());
        assert_eq!(config.public_value(), "acme.com.");
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut bad = raw(Some("acme.com"), None);
        bad.dns_port = Some("not-a-port".to_string());
        assert!(matches!(Config::assemble(bad), Err(Error::Config(_))));
    }

    #[test]
    fn store_option_env_expansion() {
        env::set_var("ACMEMOLE_TEST_DB_HOST", "db.internal");
        let mut raw = raw(Some("acme.com"), None);
        raw.store_options.insert(
            "host".to_string(),
            Value::String("${ACMEMOLE_TEST_DB_HOST}".to_string()),
        );
        raw.store_options
            .insert("port".to_string(), Value::from(5432));
        let config = Config::assemble(raw).unwrap();
        assert_eq!(
            config.store_options.get("host"),
            Some(&Value::String("db.internal".to_string()))
        );
        assert_eq!(config.store_options.get("port"), Some(&Value::from(5432)));
    }

    #[test]
    fn expand_env_handles_bare_and_braced() {
        env::set_var("ACMEMOLE_TEST_EXPAND", "v");
        assert_eq!(expand_env("$ACMEMOLE_TEST_EXPAND"), "v");
        assert_eq!(expand_env("x-${ACMEMOLE_TEST_EXPAND}-y"), "x-v-y");
        assert_eq!(expand_env("${ACMEMOLE_TEST_UNDEFINED_VAR}"), "");
        assert_eq!(expand_env("plain"), "plain");
        assert_eq!(expand_env("$"), "$");
    }
}
