//! # dig IP Source
//!
//! Finds the public IP by asking OpenDNS for `myip.opendns.com`, which its
//! resolvers answer with the address the query came from:
//!
//! ```text
//! dig +short myip.opendns.com @resolver1.opendns.com [-b <bind address>]
//! ```
//!
//! Binding to a specific local address (`-b`) pins the query to one uplink on
//! multi-homed hosts.
//!
//! ## Requirements
//!
//! The `dig` binary (bind-utils / dnsutils) must be installed, or another
//! program with the same command line given via `with_program`.

use async_trait::async_trait;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use zonesync_core::traits::{IpDiscovery, IpVersion};
use zonesync_core::{Error, Result};

/// Name whose answer is the caller's own address
pub const DEFAULT_QUERY_NAME: &str = "myip.opendns.com";

/// Resolver that answers `DEFAULT_QUERY_NAME`
pub const DEFAULT_RESOLVER: &str = "resolver1.opendns.com";

/// Upper bound on a single dig invocation
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// dig-based IP discovery
#[derive(Debug, Clone)]
pub struct DigIpSource {
    program: PathBuf,
    query_name: String,
    resolver: String,
    bind_address: Option<String>,
    family: Option<IpVersion>,
    timeout: Duration,
}

impl Default for DigIpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DigIpSource {
    /// Query OpenDNS with the `dig` found on `PATH`
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("dig"),
            query_name: DEFAULT_QUERY_NAME.to_string(),
            resolver: DEFAULT_RESOLVER.to_string(),
            bind_address: None,
            family: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_program(mut self, program: impl AsRef<Path>) -> Self {
        self.program = program.as_ref().to_path_buf();
        self
    }

    pub fn with_resolver(mut self, resolver: impl Into<String>) -> Self {
        self.resolver = resolver.into();
        self
    }

    pub fn with_query_name(mut self, query_name: impl Into<String>) -> Self {
        self.query_name = query_name.into();
        self
    }

    /// Send the query from this local address (`dig -b`)
    pub fn with_bind_address(mut self, bind_address: impl Into<String>) -> Self {
        let bind_address = bind_address.into();
        self.bind_address = (!bind_address.trim().is_empty()).then_some(bind_address);
        self
    }

    /// Only accept addresses of this family; V6 also asks for AAAA
    pub fn with_family(mut self, family: IpVersion) -> Self {
        self.family = Some(family);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Command-line arguments passed to dig
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["+short".to_string()];
        if self.family == Some(IpVersion::V6) {
            args.push("AAAA".to_string());
        }
        args.push(self.query_name.clone());
        args.push(format!("@{}", self.resolver));
        if let Some(bind) = &self.bind_address {
            args.push("-b".to_string());
            args.push(bind.clone());
        }
        args
    }

    /// Validate dig's stdout and extract the address
    fn parse_output(&self, stdout: &str) -> Result<String> {
        let text = stdout.trim();
        if text.is_empty() {
            return Err(Error::discovery(format!(
                "dig returned no answer for {}",
                self.query_name
            )));
        }

        let ip: IpAddr = text
            .parse()
            .map_err(|_| Error::discovery(format!("dig returned an invalid address: {}", text)))?;

        if let Some(family) = self.family
            && !family.matches(&ip)
        {
            return Err(Error::discovery(format!("Expected {}, got: {}", family, ip)));
        }

        Ok(text.to_string())
    }
}

#[async_trait]
impl IpDiscovery for DigIpSource {
    async fn current(&self) -> Result<String> {
        let args = self.args();
        tracing::debug!("Running {} {}", self.program.display(), args.join(" "));

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args(&args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| Error::discovery(format!("dig timed out after {:?}", self.timeout)))?
        .map_err(|e| {
            Error::discovery(format!("failed to run {}: {}", self.program.display(), e))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::discovery(format!(
                "dig exited with {}: {}",
                output.status,
                format!("{}{}", stdout, stderr).trim()
            )));
        }

        self.parse_output(&stdout)
    }

    fn family(&self) -> Option<IpVersion> {
        self.family
    }
}
