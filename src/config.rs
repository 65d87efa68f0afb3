//! Visit generator configuration
//!
//! # Example configuration
//! ```yaml
//! ---
//! endpoint:
//!   tracker_url: 'http://127.0.0.1:8080'
//!   admin_url: 'http://127.0.0.1:8080'
//!   token_auth: 'abc123'
//! site:
//!   id: 1
//! fixture:
//!   date_time: '2010-01-03 01:22:33'
//!   days_in_past: 0
//! ```
//!
//! The data pools (user agents, resolutions, referrers, custom-variable
//! values, mock locations) default to the canonical fixture tables and can be
//! overridden from the `pools` section for reuse with other datasets.

use glob::glob;

use serde::Deserialize;
use std::path::Path;

use config::{ConfigError, Environment, File};

use crate::types::{CustomVarPool, MockLocation};

/// A Configuration structure
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Tracking and admin endpoint connection
    pub endpoint: Endpoint,
    /// Target site
    #[serde(default)]
    pub site: SiteConf,
    /// Fixture run parameters
    #[serde(default)]
    pub fixture: FixtureConf,
    /// Data pools the generator cycles through
    #[serde(default)]
    pub pools: Pools,
}

impl Config {
    /// Returns a configuration object from a yaml config file path with merged values from
    /// environment variables prefixed with "VG". When setting values in the environment variables
    /// use "__" for sublements separator.
    pub fn new(config_file: &str) -> Result<Self, ConfigError> {
        let path = Path::new(config_file)
            .canonicalize()
            .expect("Can not resolve path to the config.yaml");
        let mut s = config::Config::builder()
            // Start off by merging in the requested configuration file
            .add_source(File::with_name(path.to_str().unwrap()));

        // Read and merge conf.d config parts
        let configs_glob = format!(
            "{}/conf.d/*.yaml",
            path.parent()
                .expect("Need parent to config.yaml")
                .to_str()
                .unwrap()
        );
        tracing::trace!("Analyzing {:?} as conf.d parts", configs_glob);
        for entry in glob(configs_glob.as_str()).unwrap() {
            tracing::debug!("Add {:?} config part file", entry);
            if let Ok(path) = entry {
                s = s.add_source(File::with_name(path.to_str().unwrap()));
            }
        }

        // merge environment variables (subelements separated by "__")
        // VG_ENDPOINT__TOKEN_AUTH goes to endpoint.token_auth
        s = s.add_source(
            Environment::with_prefix("VG")
                .prefix_separator("_")
                .separator("__"),
        );

        s.build()?.try_deserialize()
    }

    /// Returns a configuration object from a string representing configuration file
    #[allow(dead_code)]
    pub fn from_config_str(data: &str) -> Self {
        let s = config::Config::builder()
            .add_source(File::from_str(data, config::FileFormat::Yaml))
            .build()
            .unwrap();
        s.try_deserialize().unwrap()
    }
}

/// Tracking/admin endpoint connection
#[derive(Clone, Debug, Deserialize)]
pub struct Endpoint {
    /// Tracking endpoint base url (serves matomo.php)
    pub tracker_url: String,
    /// Admin API base url (serves index.php)
    pub admin_url: String,
    /// API authentication token
    pub token_auth: Option<String>,
    /// request timeout
    #[serde(default = "default_timeout")]
    pub timeout: u16,
}

/// Target site configuration
#[derive(Clone, Debug, Deserialize)]
pub struct SiteConf {
    /// Site id the data is tracked into
    #[serde(default = "default_site_id")]
    pub id: u32,
}

impl Default for SiteConf {
    fn default() -> Self {
        SiteConf {
            id: default_site_id(),
        }
    }
}

/// Fixture run parameters
#[derive(Clone, Debug, Deserialize)]
pub struct FixtureConf {
    /// Base datetime all visits are forced to
    #[serde(default = "default_date_time")]
    pub date_time: String,
    /// Repeat visit generation for this many prior days
    #[serde(default)]
    pub days_in_past: u32,
}

impl Default for FixtureConf {
    fn default() -> Self {
        FixtureConf {
            date_time: default_date_time(),
            days_in_past: 0,
        }
    }
}

/// Data pools cycled through by the generator
#[derive(Clone, Debug, Deserialize)]
pub struct Pools {
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
    /// Screen resolutions as "WxH" strings
    #[serde(default = "default_resolutions")]
    pub resolutions: Vec<String>,
    /// Referrer urls: plain websites plus search engines with keywords
    #[serde(default = "default_referrers")]
    pub referrers: Vec<String>,
    /// Page-scoped custom variable pools for page views
    #[serde(default = "default_page_vars")]
    pub page_vars: Vec<CustomVarPool>,
    /// Page-scoped custom variable pools for downloads
    #[serde(default = "default_download_vars")]
    pub download_vars: Vec<CustomVarPool>,
    /// Locations served cyclically by the mock location provider
    #[serde(default = "default_locations")]
    pub locations: Vec<MockLocation>,
}

impl Default for Pools {
    fn default() -> Self {
        Pools {
            user_agents: default_user_agents(),
            resolutions: default_resolutions(),
            referrers: default_referrers(),
            page_vars: default_page_vars(),
            download_vars: default_download_vars(),
            locations: default_locations(),
        }
    }
}

fn default_timeout() -> u16 {
    10
}

fn default_site_id() -> u32 {
    1
}

fn default_date_time() -> String {
    "2010-01-03 01:22:33".to_string()
}

fn default_user_agents() -> Vec<String> {
    let linux_firefox_a = "Mozilla/5.0 (X11; Linux i686; rv:6.0) Gecko/20100101 Firefox/6.0";
    let win7_firefox_a =
        "Mozilla/5.0 (Windows; U; Windows NT 6.1; fr; rv:1.9.1.6) Gecko/20100101 Firefox/6.0";
    let win7_chrome_a = "Mozilla/5.0 (Windows; U; Windows NT 6.1; en-US) AppleWebKit/532.0 (KHTML, like Gecko) Chrome/3.0.195.38 Safari/532.0";
    let linux_chrome_a = "Mozilla/5.0 (X11; Linux i686; rv:6.0) AppleWebKit/532.0 (KHTML, like Gecko) Chrome/3.0.195.38 Safari/532.0";
    let linux_safari_a = "Mozilla/5.0 (X11; U; Linux x86_64; en-us) AppleWebKit/531.2+ (KHTML, like Gecko) Version/5.0 Safari/531.2+";
    let ipad_safari_a = "Mozilla/5.0 (iPad; CPU OS 6_0 like Mac OS X) AppleWebKit/531.2+ (KHTML, like Gecko) Version/5.0 Safari/531.2+";
    let ipad_firefox_b = "Mozilla/5.0 (iPad; CPU OS 6_0 like Mac OS X) Gecko/20100101 Firefox/14.0.1";
    let android_firefox_b =
        "Mozilla/5.0 (Linux; U; Android 4.0.3; ko-kr; LG-L160L Build/IML74K) Gecko/20100101 Firefox/14.0.1";
    let android_chrome_b = "Mozilla/5.0 (Linux; U; Android 4.0.3; ko-kr; LG-L160L Build/IML74K) AppleWebKit/537.1 (KHTML, like Gecko) Chrome/22.0.1207.1 Safari/537.1";
    let android_ie_a = "Mozilla/5.0 (compatible; MSIE 10.6; Linux; U; Android 4.0.3; ko-kr; LG-L160L Build/IML74K; Trident/5.0; InfoPath.2; SLCC1; .NET CLR 3.0.4506.2152; .NET CLR 3.5.30729; .NET CLR 2.0.50727) 3gpp-gba UNTRUSTED/1.0";
    let iphone_opera_a =
        "Opera/9.80 (iPod; U; CPU iPhone OS 4_3_3 like Mac OS X; ja-jp) Presto/2.9.181 Version/12.00";
    let win8_ie_b = "Mozilla/5.0 (compatible; MSIE 10.0; Windows 8; Trident/5.0)";
    let winvista_ie_b = "Mozilla/5.0 (compatible; MSIE 10.0; Windows Vista; Trident/5.0)";
    let osx_opera_b =
        "Opera/9.80 (Macintosh; Intel Mac OS X 10.6.8; U; fr) Presto/2.9.168 Version/11.52";

    [
        linux_firefox_a,
        linux_firefox_a,
        win7_firefox_a,
        win7_chrome_a,
        linux_chrome_a,
        linux_safari_a,
        ipad_safari_a,
        ipad_firefox_b,
        android_firefox_b,
        android_chrome_b,
        android_ie_a,
        iphone_opera_a,
        win8_ie_b,
        winvista_ie_b,
        osx_opera_b,
    ]
    .iter()
    .map(|x| x.to_string())
    .collect()
}

fn default_resolutions() -> Vec<String> {
    [
        "1920x1080", "1920x1080", "1920x1080", "1920x1080", "1366x768", "1366x768", "1366x768",
        "1280x1024", "1280x1024", "1280x1024", "1680x1050", "1680x1050", "1024x768", "800x600",
        "320x480",
    ]
    .iter()
    .map(|x| x.to_string())
    .collect()
}

fn default_referrers() -> Vec<String> {
    [
        // website referrers (8)
        "http://whatever0.com/0",
        "http://whatever0.com/0",
        "http://whatever0.com/1",
        "http://whatever0.com/2",
        "http://whatever1.com/0",
        "http://whatever.com1/1",
        "http://whatever1.com/2",
        "http://whatever3.com/3",
        // search engines w/ keyword (12)
        "http://www.google.com/search?q=this+search+term",
        "http://www.google.com/search?q=that+search+term",
        "http://search.yahoo.com/search?p=this+search+term",
        "http://search.yahoo.com/search?p=that+search+term",
        "http://www.ask.com/web?q=this+search+term",
        "http://www.bing.com/search?q=search+term+1",
        "http://search.babylon.com/?q=search+term+2",
        "http://alexa.com/search?q=search+term+2",
        "http://www.google.com/search?q=search+term+3",
        "http://search.yahoo.com/search?p=search+term+4",
        "http://www.ask.com/web?q=search+term+3",
        "http://www.bing.com/search?q=search+term+4",
    ]
    .iter()
    .map(|x| x.to_string())
    .collect()
}

fn var_pool(name: &str, values: &[&str]) -> CustomVarPool {
    CustomVarPool {
        name: name.to_string(),
        values: values.iter().map(|x| x.to_string()).collect(),
    }
}

fn default_page_vars() -> Vec<CustomVarPool> {
    vec![
        var_pool(
            "name",
            &[
                "thing0", "thing1", "thing2", "thing3", "thing4", "thing5", "thing6", "thing7",
                "thing8", "thing9", "thing10", "thing11", "thing12", "thing13", "thing14",
                "thing15", "thing16", "thing17", "thing18", "thing19",
            ],
        ),
        var_pool(
            "rating",
            &[
                "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "1", "2", "3", "4", "5", "6",
                "7", "8", "9", "20",
            ],
        ),
        var_pool(
            "tweeted",
            &[
                "y", "n", "m", "n", "y", "n", "y", "n", "y", "n", "y", "n", "y", "n", "y", "n",
                "m", "n", "m", "n",
            ],
        ),
        var_pool(
            "liked",
            &[
                "yes", "y", "y", "no", "y", "y", "y", "y", "y", "y", "y", "y", "y", "y", "y", "y",
                "y", "y", "no", "n",
            ],
        ),
    ]
}

fn default_download_vars() -> Vec<CustomVarPool> {
    vec![var_pool(
        "size",
        &[
            "1024", "1024", "1024", "2048", "2048", "3072", "3072", "3072", "3072", "4096",
            "4096", "4096", "512", "512", "256", "128", "64", "32", "48", "48",
        ],
    )]
}

fn default_locations() -> Vec<MockLocation> {
    vec![
        MockLocation::new("Toronto", "ON", "CA").with_isp("comcast.net"),
        MockLocation::new("Nice", "PAC", "FR").with_isp("comcast.net"),
        MockLocation::new("Melbourne", "VIC", "AU").with_isp("awesomeisp.com"),
        MockLocation::new("Yokohama", "14", "JP"),
    ]
}
