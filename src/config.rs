use std::collections::HashMap;
use std::env;

/// Tenderly simulation-preview credentials (external collaborator).
#[derive(Debug, Clone)]
pub struct TenderlySettings {
    pub access_key: String,
    pub account_slug: String,
    pub project_slug: String,
}

/// Process configuration, resolved once from the environment.
///
/// Recognised variables:
/// - `USE_GRAPH_ADAPTERS` — prefer the indexer path over RPC.
/// - `GRAPH_API_KEY` — required for indexer reads; absence forces RPC.
/// - `ALCHEMY_API_KEY` — prepended keyed RPC endpoints.
/// - `ETHEREUM_RPC_URL` / `OPTIMISM_RPC_URL` / `BASE_RPC_URL` /
///   `ARBITRUM_RPC_URL` — per-chain overrides, tried first.
/// - `TENDERLY_ACCESS_KEY` / `TENDERLY_ACCOUNT_SLUG` / `TENDERLY_PROJECT_SLUG`.
/// - `REDIS_URL` — reserved for an external cache backend; when unset the
///   in-process store is used.
/// - `GAS_PRICE_GWEI` — gas price assumption for USD estimates (default 20).
#[derive(Debug, Clone)]
pub struct Settings {
    pub use_graph_adapters: bool,
    pub graph_api_key: Option<String>,
    pub alchemy_api_key: Option<String>,
    pub rpc_overrides: HashMap<u64, String>,
    pub tenderly: Option<TenderlySettings>,
    pub redis_url: Option<String>,
    pub gas_price_gwei: f64,
}

impl Settings {
    pub fn from_env() -> Self {
        let mut rpc_overrides = HashMap::new();
        for (var, chain_id) in [
            ("ETHEREUM_RPC_URL", 1u64),
            ("OPTIMISM_RPC_URL", 10),
            ("BASE_RPC_URL", 8453),
            ("ARBITRUM_RPC_URL", 42161),
        ] {
            if let Ok(url) = env::var(var) {
                if !url.trim().is_empty() {
                    rpc_overrides.insert(chain_id, url.trim().to_string());
                }
            }
        }

        let tenderly = match (
            env::var("TENDERLY_ACCESS_KEY"),
            env::var("TENDERLY_ACCOUNT_SLUG"),
            env::var("TENDERLY_PROJECT_SLUG"),
        ) {
            (Ok(access_key), Ok(account_slug), Ok(project_slug)) => Some(TenderlySettings {
                access_key,
                account_slug,
                project_slug,
            }),
            _ => None,
        };

        let graph_api_key = env::var("GRAPH_API_KEY").ok().filter(|k| !k.is_empty());

        Settings {
            // Indexer reads need a key; without one the flag is moot.
            use_graph_adapters: env_flag("USE_GRAPH_ADAPTERS") && graph_api_key.is_some(),
            graph_api_key,
            alchemy_api_key: env::var("ALCHEMY_API_KEY").ok().filter(|k| !k.is_empty()),
            rpc_overrides,
            tenderly,
            redis_url: env::var("REDIS_URL").ok().filter(|u| !u.is_empty()),
            gas_price_gwei: env::var("GAS_PRICE_GWEI")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20.0),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            use_graph_adapters: false,
            graph_api_key: None,
            alchemy_api_key: None,
            rpc_overrides: HashMap::new(),
            tenderly: None,
            redis_url: None,
            gas_price_gwei: 20.0,
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}
