// # IP Resolver Trait
//
// Defines the interface for discovering the host's public IPv4 address.
//
// ## Implementations
//
// - HTTP echo endpoints with retry and fallback: `iphop-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use iphop_core::IpResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* IpResolver implementation */;
//
//     let wan_ip = resolver.resolve().await?;
//     println!("WAN address: {}", wan_ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for public IP resolution
///
/// A call performs network I/O only; implementations keep no state that
/// outlives the call.
///
/// # Errors
///
/// Implementations fail with [`Error::IpFetch`](crate::Error::IpFetch) once
/// every source they know about has failed, with the per-source reasons
/// folded into the message.
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Resolve the current public IPv4 address
    async fn resolve(&self) -> Result<Ipv4Addr, crate::Error>;
}
