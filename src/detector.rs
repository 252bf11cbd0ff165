//! Determines the address to publish.
//!
//! Either asks a public echo service (`GLESYS_USE_PUBLIC_IP`) or scans the
//! local interfaces for an IPv4 address starting with `GLESYS_IP_STARTS_WITH`.

use crate::config::IpMode;
use crate::error::{DdnsError, Result};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// A local network interface and the addresses bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    pub name: String,
    pub addresses: Vec<IpAddr>,
}

/// Source of local interfaces, in enumeration order.
pub trait InterfaceSource: Send + Sync {
    fn interfaces(&self) -> Result<Vec<NetworkInterface>>;
}

/// Interfaces reported by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

/// Resolves the single address to publish for a run.
pub struct IpResolver {
    client: reqwest::Client,
    mode: IpMode,
    interfaces: Box<dyn InterfaceSource>,
}

impl IpResolver {
    /// Create a resolver that scans the system interfaces in local mode.
    pub fn new(mode: IpMode) -> Result<Self> {
        Self::with_interfaces(mode, Box::new(SystemInterfaces))
    }

    /// Create a resolver with a custom interface source.
    pub fn with_interfaces(mode: IpMode, interfaces: Box<dyn InterfaceSource>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(crate::USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            mode,
            interfaces,
        })
    }

    /// Resolve the address for this run. No retries.
    pub async fn resolve(&self) -> Result<IpAddr> {
        match &self.mode {
            IpMode::Public { url } => self.public_ip(url).await,
            IpMode::LocalPrefix(prefix) => self.local_ip(prefix),
        }
    }

    async fn public_ip(&self, url: &str) -> Result<IpAddr> {
        tracing::debug!("Finding public IP...");

        let response = self.client.get(url).send().await.map_err(|e| {
            DdnsError::Resolution(format!("error while fetching the public IP: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(DdnsError::Resolution(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let text = response.text().await.map_err(|e| {
            DdnsError::Resolution(format!(
                "error while reading response when fetching public IP: {}",
                e
            ))
        })?;
        let ip_str = text.trim();

        ip_str
            .parse()
            .map_err(|_| DdnsError::Resolution(format!("failed to parse public IP: {}", ip_str)))
    }

    fn local_ip(&self, prefix: &str) -> Result<IpAddr> {
        let interfaces = self.interfaces.interfaces().map_err(|e| {
            DdnsError::Resolution(format!("Error while fetching interfaces: {}", e))
        })?;

        select_local_ip(&interfaces, prefix)
            .map(IpAddr::V4)
            .ok_or_else(|| {
                DdnsError::Resolution(format!("No local IP found that starts with: {}", prefix))
            })
    }
}

/// First IPv4 address, in interface then address order, whose dotted form
/// starts with `prefix`.
pub fn select_local_ip(interfaces: &[NetworkInterface], prefix: &str) -> Option<Ipv4Addr> {
    for iface in interfaces {
        tracing::debug!("  Current interface: {}", iface.name);

        for address in &iface.addresses {
            tracing::debug!("    Current address: {}", address);

            let Some(v4) = as_ipv4(address) else {
                continue;
            };

            if v4.to_string().starts_with(prefix) {
                return Some(v4);
            }
        }
    }

    None
}

/// IPv4 form of an address; IPv4-mapped IPv6 addresses count as IPv4.
fn as_ipv4(address: &IpAddr) -> Option<Ipv4Addr> {
    match address {
        IpAddr::V4(v4) => Some(*v4),
        IpAddr::V6(v6) => v6.to_ipv4_mapped(),
    }
}

#[cfg(unix)]
impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> Result<Vec<NetworkInterface>> {
        os::interfaces()
    }
}

#[cfg(not(unix))]
impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> Result<Vec<NetworkInterface>> {
        Err(DdnsError::Resolution(
            "Local interface scanning is only supported on Unix".to_string(),
        ))
    }
}

#[cfg(unix)]
mod os {
    use super::NetworkInterface;
    use crate::error::Result;
    use std::ffi::CStr;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    pub(super) fn interfaces() -> Result<Vec<NetworkInterface>> {
        let mut head: *mut libc::ifaddrs = std::ptr::null_mut();

        // SAFETY: getifaddrs only writes the list head on success.
        if unsafe { libc::getifaddrs(&mut head) } != 0 {
            return Err(std::io::Error::last_os_error().into());
        }

        let mut interfaces: Vec<NetworkInterface> = Vec::new();
        let mut current = head as *const libc::ifaddrs;

        while !current.is_null() {
            // SAFETY: nullness is checked above and the list lives until
            // freeifaddrs below.
            let entry = unsafe { &*current };

            // SAFETY: ifa_name is a null-terminated string owned by the list.
            let name = unsafe { CStr::from_ptr(entry.ifa_name) }
                .to_string_lossy()
                .into_owned();

            // SAFETY: ifa_addr is either null or points at a sockaddr whose
            // concrete type is given by sa_family.
            let address = unsafe { sockaddr_to_ip(entry.ifa_addr) };

            let index = match interfaces.iter().position(|i| i.name == name) {
                Some(index) => index,
                None => {
                    interfaces.push(NetworkInterface {
                        name,
                        addresses: Vec::new(),
                    });
                    interfaces.len() - 1
                }
            };

            if let Some(address) = address {
                interfaces[index].addresses.push(address);
            }

            current = entry.ifa_next as *const _;
        }

        // SAFETY: head came from a successful getifaddrs and is freed once.
        unsafe { libc::freeifaddrs(head) };

        Ok(interfaces)
    }

    unsafe fn sockaddr_to_ip(addr: *const libc::sockaddr) -> Option<IpAddr> {
        if addr.is_null() {
            return None;
        }

        match i32::from((*addr).sa_family) {
            libc::AF_INET => {
                let sin = &*(addr as *const libc::sockaddr_in);
                let raw = u32::from_be(sin.sin_addr.s_addr);
                Some(IpAddr::V4(Ipv4Addr::from(raw)))
            }
            libc::AF_INET6 => {
                let sin6 = &*(addr as *const libc::sockaddr_in6);
                Some(IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr)))
            }
            _ => None,
        }
    }
}
