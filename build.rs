// Build script to generate JSON schema for configuration

use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use std::fs;
use std::path::Path;

// Re-define the Config struct with JsonSchema derive
// This is a simplified version matching the actual Config struct

/// Configuration structure
#[derive(Clone, Debug, Deserialize, JsonSchema)]
pub struct Config {
    /// Tracking and admin endpoint connection
    pub endpoint: Endpoint,
    /// Target site
    pub site: Option<SiteConf>,
    /// Fixture run parameters
    pub fixture: Option<FixtureConf>,
    /// Data pools the generator cycles through
    pub pools: Option<Pools>,
}

/// Tracking/admin endpoint connection
#[derive(Clone, Debug, Deserialize, JsonSchema)]
pub struct Endpoint {
    /// Tracking endpoint base url (serves matomo.php)
    pub tracker_url: String,
    /// Admin API base url (serves index.php)
    pub admin_url: String,
    /// API authentication token (optional)
    pub token_auth: Option<String>,
    /// Request timeout in seconds (default: 10)
    pub timeout: Option<u16>,
}

/// Target site configuration
#[derive(Clone, Debug, Deserialize, JsonSchema)]
pub struct SiteConf {
    /// Site id the data is tracked into (default: 1)
    pub id: Option<u32>,
}

/// Fixture run parameters
#[derive(Clone, Debug, Deserialize, JsonSchema)]
pub struct FixtureConf {
    /// Base datetime all visits are forced to (default: 2010-01-03 01:22:33)
    pub date_time: Option<String>,
    /// Repeat visit generation for this many prior days (default: 0)
    pub days_in_past: Option<u32>,
}

/// Named pool of page-scoped custom-variable values
#[derive(Clone, Debug, Deserialize, JsonSchema)]
pub struct CustomVarPool {
    /// Custom variable name
    pub name: String,
    /// Values drawn cyclically by action index
    pub values: Vec<String>,
}

/// Geolocation record served by the mock location provider
#[derive(Clone, Debug, Deserialize, JsonSchema)]
pub struct MockLocation {
    pub city: String,
    pub region: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub isp: Option<String>,
}

/// Data pools cycled through by the generator
#[derive(Clone, Debug, Deserialize, JsonSchema)]
pub struct Pools {
    /// User agent strings
    pub user_agents: Option<Vec<String>>,
    /// Screen resolutions as "WxH" strings
    pub resolutions: Option<Vec<String>>,
    /// Referrer urls
    pub referrers: Option<Vec<String>>,
    /// Page-scoped custom variable pools for page views
    pub page_vars: Option<Vec<CustomVarPool>>,
    /// Page-scoped custom variable pools for downloads
    pub download_vars: Option<Vec<CustomVarPool>>,
    /// Locations served cyclically by the mock location provider
    pub locations: Option<Vec<MockLocation>>,
}

fn main() {
    println!("cargo:rerun-if-changed=src/config.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    // Generate JSON schema
    let schema = schema_for!(Config);
    let schema_json = serde_json::to_string_pretty(&schema).expect("Failed to serialize schema");

    // Create doc/schemas directory if it doesn't exist
    let schemas_dir = Path::new("doc/schemas");
    if !schemas_dir.exists() {
        fs::create_dir_all(schemas_dir).expect("Failed to create doc/schemas directory");
    }

    // Write schema to file
    let schema_path = schemas_dir.join("config-schema.json");
    fs::write(&schema_path, schema_json).expect("Failed to write config-schema.json");

    println!("Generated JSON schema at: {:?}", schema_path);
}
