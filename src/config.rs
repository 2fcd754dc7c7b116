//! Runtime configuration from environment variables

use {
    alloy::primitives::{address, Address},
    std::{env, net::SocketAddr, path::PathBuf, time::Duration},
};

/// Tracked mint contract on Ethereum mainnet.
const DEFAULT_CONTRACT: Address = address!("0xf8c4b0e8322ebec10580e34667210386007c4398");

/// Public endpoint; override for anything beyond casual use.
const DEFAULT_RPC_URL: &str = "https://eth.llamarpc.com";

/// Block the tracked contract was deployed in; history before it is empty.
const DEFAULT_START_BLOCK: u64 = 21_065_598;

/// Configuration loaded from environment variables, with defaults matching
/// the production deployment.
#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub contract_address: Address,
    pub start_block: u64,
    pub poll_interval: Duration,
    pub port: u16,
    pub data_dir: PathBuf,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `RPC_URL` (default: public mainnet endpoint)
    /// - `CONTRACT_ADDRESS` (default: the tracked mint contract)
    /// - `START_BLOCK` (default: contract deployment block)
    /// - `POLL_INTERVAL_SECS` (default: 15, floored at 1)
    /// - `PORT` (default: 3000)
    /// - `DATA_DIR` (default: current directory)
    /// - `RATE_LIMIT_MAX_REQUESTS` (default: 5)
    /// - `RATE_LIMIT_WINDOW_SECS` (default: 60)
    pub fn from_env() -> Self {
        Self {
            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string()),

            contract_address: env::var("CONTRACT_ADDRESS")
                .ok()
                .map(|s| {
                    s.parse()
                        .expect("CONTRACT_ADDRESS must be a 0x-prefixed address")
                })
                .unwrap_or(DEFAULT_CONTRACT),

            start_block: env::var("START_BLOCK")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_START_BLOCK),

            // A zero interval would panic the poll timer; floor at one second.
            poll_interval: Duration::from_secs(
                env::var("POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15)
                    .max(1),
            ),

            port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),

            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),

            rate_limit_max_requests: env::var("RATE_LIMIT_MAX_REQUESTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),

            rate_limit_window: Duration::from_secs(
                env::var("RATE_LIMIT_WINDOW_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }

    /// Bind address for the query service.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::sync::Mutex};

    // Env vars are process-global; serialize these tests.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_vars() {
        for var in [
            "RPC_URL",
            "CONTRACT_ADDRESS",
            "START_BLOCK",
            "POLL_INTERVAL_SECS",
            "PORT",
            "DATA_DIR",
            "RATE_LIMIT_MAX_REQUESTS",
            "RATE_LIMIT_WINDOW_SECS",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_vars();

        let config = Config::from_env();

        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.contract_address, DEFAULT_CONTRACT);
        assert_eq!(config.start_block, 21_065_598);
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.port, 3000);
        assert_eq!(config.data_dir, PathBuf::from("."));
        assert_eq!(config.rate_limit_max_requests, 5);
        assert_eq!(config.rate_limit_window, Duration::from_secs(60));
    }

    #[test]
    fn test_custom_config() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_vars();

        env::set_var("RPC_URL", "http://localhost:8545");
        env::set_var(
            "CONTRACT_ADDRESS",
            "0x0000000000000000000000000000000000000042",
        );
        env::set_var("START_BLOCK", "123");
        env::set_var("POLL_INTERVAL_SECS", "5");
        env::set_var("PORT", "8080");
        env::set_var("DATA_DIR", "/tmp/mintflow");

        let config = Config::from_env();

        assert_eq!(config.rpc_url, "http://localhost:8545");
        assert_eq!(
            config.contract_address,
            address!("0x0000000000000000000000000000000000000042")
        );
        assert_eq!(config.start_block, 123);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/mintflow"));
        assert_eq!(config.bind_addr(), SocketAddr::from(([0, 0, 0, 0], 8080)));

        clear_vars();
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_vars();

        env::set_var("POLL_INTERVAL_SECS", "0");
        let config = Config::from_env();
        assert_eq!(config.poll_interval, Duration::from_secs(1));

        clear_vars();
    }

    #[test]
    fn test_unparseable_optional_falls_back_to_default() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_vars();

        env::set_var("START_BLOCK", "not-a-number");
        let config = Config::from_env();
        assert_eq!(config.start_block, 21_065_598);

        clear_vars();
    }
}
