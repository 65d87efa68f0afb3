//! Admin API module
//!
//! Site provisioning and custom-dimension configuration against the analytics
//! admin HTTP API (`index.php?module=API&...`).

use anyhow;
use serde_json::Value;

/// Scope a custom dimension is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DimensionScope {
    Visit,
    Action,
}

impl DimensionScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionScope::Visit => "visit",
            DimensionScope::Action => "action",
        }
    }
}

fn api_params(method: &str, token_auth: Option<&str>) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("module", "API".to_string()),
        ("method", method.to_string()),
        ("format", "json".to_string()),
    ];
    if let Some(token) = token_auth {
        params.push(("token_auth", token.to_string()));
    }
    params
}

async fn call_api(
    client: &reqwest::Client,
    base_url: &str,
    params: &[(&'static str, String)],
) -> anyhow::Result<Value> {
    let url = format!("{}/index.php", base_url);
    let response = client.get(&url).query(params).send().await?;

    if !response.status().is_success() {
        anyhow::bail!(
            "Admin API call failed: status={}, body={:?}",
            response.status(),
            response.text().await
        );
    }

    let body: Value = response.json().await?;
    Ok(body)
}

fn is_error_body(body: &Value) -> bool {
    body.get("result").and_then(Value::as_str) == Some("error")
}

/// Returns whether the site already exists.
pub async fn site_created(
    client: &reqwest::Client,
    base_url: &str,
    token_auth: Option<&str>,
    site_id: u32,
) -> anyhow::Result<bool> {
    let mut params = api_params("SitesManager.getSiteFromId", token_auth);
    params.push(("idSite", site_id.to_string()));
    let body = call_api(client, base_url, &params).await?;
    Ok(!is_error_body(&body))
}

/// Provisions the target site. Only called when `site_created` reported the
/// site as missing, which keeps provisioning idempotent end to end.
pub async fn create_website(
    client: &reqwest::Client,
    base_url: &str,
    token_auth: Option<&str>,
    start_date: &str,
    site_id: u32,
) -> anyhow::Result<()> {
    let mut params = api_params("SitesManager.addSite", token_auth);
    params.push(("siteName", format!("Site {}", site_id)));
    params.push(("urls", "http://piwik.net".to_string()));
    params.push(("ecommerce", "1".to_string()));
    params.push(("startDate", start_date.to_string()));
    let body = call_api(client, base_url, &params).await?;
    if is_error_body(&body) {
        anyhow::bail!("Site creation failed: {:?}", body);
    }
    tracing::info!("Created site {}", site_id);
    Ok(())
}

/// Configures a new custom dimension and returns its id.
pub async fn configure_new_custom_dimension(
    client: &reqwest::Client,
    base_url: &str,
    token_auth: Option<&str>,
    site_id: u32,
    name: &str,
    scope: DimensionScope,
    active: bool,
) -> anyhow::Result<u32> {
    let mut params = api_params("CustomDimensions.configureNewCustomDimension", token_auth);
    params.push(("idSite", site_id.to_string()));
    params.push(("name", name.to_string()));
    params.push(("scope", scope.as_str().to_string()));
    params.push(("active", if active { "1" } else { "0" }.to_string()));
    let body = call_api(client, base_url, &params).await?;
    if is_error_body(&body) {
        anyhow::bail!("Custom dimension configuration failed: {:?}", body);
    }
    match body.get("value").and_then(Value::as_u64) {
        Some(id) => Ok(id as u32),
        None => anyhow::bail!("No dimension id in response: {:?}", body),
    }
}

#[cfg(test)]
mod test {
    use crate::admin::*;
    use serde_json::Value;

    #[test]
    fn test_dimension_scope_str() {
        assert_eq!(DimensionScope::Visit.as_str(), "visit");
        assert_eq!(DimensionScope::Action.as_str(), "action");
    }

    #[test]
    fn test_error_body_detection() {
        let err: Value =
            serde_json::from_str(r#"{"result":"error","message":"not found"}"#).unwrap();
        assert!(is_error_body(&err));
        let ok: Value = serde_json::from_str(r#"{"value":3}"#).unwrap();
        assert!(!is_error_body(&ok));
    }
}
