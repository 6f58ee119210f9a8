//! config-rs/lib.rs
//! Shared configuration utilities for consistent service configuration
//! Provides standardized functions for environment loading and port/address management

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Load a `.env` file from the working directory or one of its parents
///
/// Values already present in the process environment win over the file.
/// Returns the loaded path; this runs before logging is installed, so the
/// caller reports it.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenv::dotenv().ok()
}

/// Load a specific env file, returning its path when it was read
pub fn load_dotenv_from(path: &Path) -> Option<PathBuf> {
    dotenv::from_path(path).ok().map(|_| path.to_path_buf())
}

/// Get service port from environment variables with proper fallback
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "CONTACT_GATEWAY")
/// * `default_port` - The default port to use if not specified in environment
///
/// # Returns
/// The port number to use for the service
pub fn get_service_port(service_name: &str, default_port: u16) -> u16 {
    let var_name = format!("{}_SERVICE_PORT", service_name.to_uppercase());
    env::var(&var_name)
        .unwrap_or_else(|_| default_port.to_string())
        .parse::<u16>()
        .unwrap_or_else(|_| {
            log::warn!("Invalid port in {}, using default {}", var_name, default_port);
            default_port
        })
}

/// Create a SocketAddr for binding a service
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "CONTACT_GATEWAY")
/// * `default_port` - The default port to use if not specified in environment
///
/// # Returns
/// A SocketAddr configured with the appropriate bind address and port
pub fn get_bind_address(service_name: &str, default_port: u16) -> SocketAddr {
    let var_name = format!("{}_SERVICE_ADDR", service_name.to_uppercase());

    // Check if there's a full address override
    if let Ok(addr_str) = env::var(&var_name) {
        if let Ok(addr) = addr_str.parse::<SocketAddr>() {
            return addr;
        }

        // Accept http://host:port as well
        if let Some((_, rest)) = addr_str.split_once("://") {
            if let Ok(addr) = rest.trim_end_matches('/').parse::<SocketAddr>() {
                return addr;
            }
        }

        log::warn!("Invalid address format in {}, using default", var_name);
    }

    // Use the port from environment or default
    let port = get_service_port(service_name, default_port);
    SocketAddr::from(([0, 0, 0, 0], port))
}

/// Get service name for logging and monitoring
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "CONTACT_GATEWAY")
///
/// # Returns
/// A formatted service name suitable for logging
pub fn get_formatted_service_name(service_name: &str) -> String {
    match service_name {
        "CONTACT_GATEWAY" => "contact-gateway".to_string(),
        _ => format!("{}-service", service_name.to_lowercase().replace('_', "-")),
    }
}

/// Get default port for a specific service
pub fn get_default_port(service_name: &str) -> u16 {
    match service_name.to_uppercase().as_str() {
        "CONTACT_GATEWAY" => 8788,
        _ => 8800,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_dotenv_from_file() {
        let path = env::temp_dir().join(format!("contact-gateway-{}.env", std::process::id()));
        std::fs::write(&path, "DOTENVTEST_SERVICE_PORT=9300\n").unwrap();

        assert_eq!(load_dotenv_from(&path), Some(path.clone()));
        assert_eq!(env::var("DOTENVTEST_SERVICE_PORT").unwrap(), "9300");
        assert_eq!(load_dotenv_from(&path.with_extension("missing")), None);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_get_service_port() {
        // Test with environment variable
        std::env::set_var("PORTTEST_SERVICE_PORT", "9000");
        assert_eq!(get_service_port("PORTTEST", 8000), 9000);

        // Test with an invalid value
        std::env::set_var("BADPORT_SERVICE_PORT", "ninety");
        assert_eq!(get_service_port("BADPORT", 8000), 8000);

        // Test with default
        std::env::remove_var("UNKNOWN_SERVICE_PORT");
        assert_eq!(get_service_port("UNKNOWN", 8000), 8000);
    }

    #[test]
    fn test_get_bind_address() {
        // Test with full address override
        std::env::set_var("ADDRTEST_SERVICE_ADDR", "127.0.0.1:9100");
        assert_eq!(get_bind_address("ADDRTEST", 8000), "127.0.0.1:9100".parse().unwrap());

        // Test with URL form
        std::env::set_var("URLTEST_SERVICE_ADDR", "http://127.0.0.1:9200");
        assert_eq!(get_bind_address("URLTEST", 8000), "127.0.0.1:9200".parse().unwrap());

        // Test with default
        std::env::remove_var("NOADDR_SERVICE_ADDR");
        std::env::remove_var("NOADDR_SERVICE_PORT");
        assert_eq!(get_bind_address("NOADDR", 8788), "0.0.0.0:8788".parse().unwrap());
    }

    #[test]
    fn test_service_names_and_ports() {
        assert_eq!(get_formatted_service_name("CONTACT_GATEWAY"), "contact-gateway");
        assert_eq!(get_default_port("contact_gateway"), 8788);
    }
}
