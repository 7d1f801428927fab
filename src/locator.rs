//! Service locators name a transport and its options, e.g.
//! `tcp:host=127.0.0.1,port=12246`. Several alternatives may be joined with `;`.

use std::{collections::BTreeMap, fmt, str::FromStr};

use thiserror::Error;

/// Malformed locator strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    /// Nothing but whitespace was supplied.
    #[error("empty service locator")]
    Empty,
    /// No `:` separates the transport from its options.
    #[error("service locator `{0}` has no transport prefix")]
    MissingTransport(String),
    /// An option is not of the form `key=value`.
    #[error("service locator `{locator}` has malformed option `{option}`")]
    MalformedOption {
        /// Offending locator.
        locator: String,
        /// Offending option text.
        option: String,
    },
}

/// One `transport:key=value,...` alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLocator {
    raw: String,
    transport: String,
    options: BTreeMap<String, String>,
}

impl ServiceLocator {
    /// Transport name, the part before the first `:`.
    pub fn transport(&self) -> &str {
        &self.transport
    }

    /// Value of option `key`, if present.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// All options in key order.
    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromStr for ServiceLocator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(LocatorError::Empty);
        }
        let (transport, rest) = raw
            .split_once(':')
            .filter(|(transport, _)| !transport.trim().is_empty())
            .ok_or_else(|| LocatorError::MissingTransport(raw.to_string()))?;

        let mut options = BTreeMap::new();
        for option in rest.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            let (key, value) = option
                .split_once('=')
                .filter(|(key, _)| !key.trim().is_empty())
                .ok_or_else(|| LocatorError::MalformedOption {
                    locator: raw.to_string(),
                    option: option.to_string(),
                })?;
            options.insert(key.trim().to_string(), value.trim().to_string());
        }

        Ok(ServiceLocator {
            raw: raw.to_string(),
            transport: transport.trim().to_string(),
            options,
        })
    }
}

impl fmt::Display for ServiceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parse every `;`-separated alternative of `s`, in order.
pub fn parse_all(s: &str) -> Result<Vec<ServiceLocator>, LocatorError> {
    let locators = s
        .split(';')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<ServiceLocator>, _>>()?;
    if locators.is_empty() {
        return Err(LocatorError::Empty);
    }
    Ok(locators)
}
