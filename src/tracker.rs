//! Tracking client module
//!
//! Minimal client for the analytics tracking HTTP API. Requests are either
//! sent immediately (one GET per tracked action) or, in bulk mode, queued as
//! encoded query strings and flushed in a single POST.
//!
//! Visitor ids are derived from a shared sequence instead of random bytes so
//! a fixture run is reproducible call for call.

use reqwest::{ClientBuilder, Url};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Endpoint;
use crate::location::LocationRegistry;
use crate::types::{ActionKind, MockLocation, VisitGenError};

/// Base used only to render query strings for bulk-queued requests.
const ENCODE_BASE: &str = "http://localhost/matomo.php";

/// Outcome of a single tracking call.
pub enum TrackResponse {
    /// Request was queued into the pending bulk batch.
    Queued,
    /// Request was sent immediately.
    Live { status: u16, body: String },
}

/// Aggregate response of a bulk flush.
#[derive(Debug, Deserialize)]
pub struct BulkResponse {
    pub status: String,
    #[serde(default)]
    pub tracked: u64,
    #[serde(default)]
    pub invalid: u64,
}

/// Ensures a single tracking response reported success.
pub fn check_response(rsp: &TrackResponse) -> Result<(), VisitGenError> {
    match rsp {
        TrackResponse::Queued => Ok(()),
        TrackResponse::Live { status, body } => {
            if (200..300).contains(status) {
                Ok(())
            } else {
                Err(VisitGenError::Tracker(format!(
                    "status={}, body={}",
                    status, body
                )))
            }
        }
    }
}

/// Validates the aggregate result of a bulk flush.
pub fn check_bulk_response(rsp: &BulkResponse) -> Result<(), VisitGenError> {
    if rsp.status != "success" || rsp.invalid != 0 {
        return Err(VisitGenError::BulkTracker(format!(
            "status={}, tracked={}, invalid={}",
            rsp.status, rsp.tracked, rsp.invalid
        )));
    }
    Ok(())
}

/// Stateful tracking client bound to one site.
///
/// Visitor id, user id, IP, user agent, resolution, URL and the forced visit
/// datetime are sticky across calls; custom dimensions, custom variables, the
/// referrer and the e-commerce view apply to the next tracked action only.
pub struct Tracker {
    client: reqwest::Client,
    base_url: String,
    site_id: u32,
    token_auth: Option<String>,
    ids: Arc<AtomicU64>,
    registry: Option<Arc<Mutex<LocationRegistry>>>,

    visitor_id: Option<String>,
    user_id: Option<String>,
    ip: Option<String>,
    user_agent: Option<String>,
    resolution: Option<(u32, u32)>,
    url: Option<String>,
    forced_datetime: Option<String>,
    location: Option<MockLocation>,

    // one-shot state, cleared after every tracked action
    referrer: Option<String>,
    custom_dimensions: Vec<(u32, String)>,
    custom_vars: Vec<(u8, String, String)>,
    ecommerce_view: Option<(String, String, String, f64)>,

    bulk: Option<Vec<String>>,
}

impl Tracker {
    pub fn new(
        endpoint: &Endpoint,
        site_id: u32,
        date_time: &str,
        ids: Arc<AtomicU64>,
        registry: Option<Arc<Mutex<LocationRegistry>>>,
    ) -> Result<Self, VisitGenError> {
        let timeout = Duration::from_secs(endpoint.timeout as u64);
        let client = ClientBuilder::new().timeout(timeout).build()?;
        Ok(Tracker {
            client,
            base_url: endpoint.tracker_url.clone(),
            site_id,
            token_auth: endpoint.token_auth.clone(),
            ids,
            registry,
            visitor_id: None,
            user_id: None,
            ip: None,
            user_agent: None,
            resolution: None,
            url: None,
            forced_datetime: Some(date_time.to_string()),
            location: None,
            referrer: None,
            custom_dimensions: Vec::new(),
            custom_vars: Vec::new(),
            ecommerce_view: None,
            bulk: None,
        })
    }

    /// Assigns the next deterministic visitor id and, when a location
    /// registry with an active provider is attached, the visit location.
    pub fn set_new_visitor_id(&mut self) {
        let seq = self.ids.fetch_add(1, Ordering::Relaxed) + 1;
        self.visitor_id = Some(format!("{:016x}", seq));
        if let Some(ref registry) = self.registry {
            self.location = registry.lock().unwrap().next_location();
        }
    }

    pub fn set_user_id(&mut self, user_id: &str) {
        self.user_id = Some(user_id.to_string());
    }

    pub fn set_ip(&mut self, ip: &str) {
        self.ip = Some(ip.to_string());
    }

    pub fn set_user_agent(&mut self, ua: &str) {
        self.user_agent = Some(ua.to_string());
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.resolution = Some((width, height));
    }

    pub fn set_url(&mut self, url: &str) {
        self.url = Some(url.to_string());
    }

    /// Sets the referrer for the next action, or explicitly none.
    pub fn set_url_referrer(&mut self, referrer: Option<&str>) {
        self.referrer = referrer.map(|x| x.to_string());
    }

    pub fn force_visit_date_time(&mut self, date_time: &str) {
        self.forced_datetime = Some(date_time.to_string());
    }

    pub fn set_custom_dimension(&mut self, id: u32, value: &str) {
        self.custom_dimensions.push((id, value.to_string()));
    }

    /// Page-scoped custom variable in the given slot.
    pub fn set_custom_variable(&mut self, index: u8, name: &str, value: &str) {
        self.custom_vars
            .push((index, name.to_string(), value.to_string()));
    }

    pub fn set_ecommerce_view(&mut self, sku: &str, name: &str, category: &str, price: f64) {
        self.ecommerce_view = Some((
            sku.to_string(),
            name.to_string(),
            category.to_string(),
            price,
        ));
    }

    pub fn enable_bulk_tracking(&mut self) {
        self.bulk = Some(Vec::new());
    }

    /// Query strings queued so far in bulk mode.
    pub fn pending_requests(&self) -> &[String] {
        match self.bulk {
            Some(ref reqs) => reqs.as_slice(),
            None => &[],
        }
    }

    pub async fn track_page_view(&mut self, title: &str) -> Result<TrackResponse, VisitGenError> {
        self.track(vec![("action_name".to_string(), title.to_string())])
            .await
    }

    /// Tracks a download or outlink action for the given url.
    pub async fn track_action(
        &mut self,
        action_url: &str,
        kind: ActionKind,
    ) -> Result<TrackResponse, VisitGenError> {
        let param = match kind {
            ActionKind::Download => "download",
            ActionKind::Outlink => "link",
            _ => {
                return Err(VisitGenError::Tracker(format!(
                    "action kind {:?} is not a link action",
                    kind
                )))
            }
        };
        self.track(vec![(param.to_string(), action_url.to_string())])
            .await
    }

    pub async fn track_event(
        &mut self,
        category: &str,
        action: &str,
        name: &str,
    ) -> Result<TrackResponse, VisitGenError> {
        self.track(vec![
            ("e_c".to_string(), category.to_string()),
            ("e_a".to_string(), action.to_string()),
            ("e_n".to_string(), name.to_string()),
        ])
        .await
    }

    pub async fn track_content_impression(
        &mut self,
        name: &str,
        piece: &str,
    ) -> Result<TrackResponse, VisitGenError> {
        self.track(vec![
            ("c_n".to_string(), name.to_string()),
            ("c_p".to_string(), piece.to_string()),
        ])
        .await
    }

    pub async fn track_content_interaction(
        &mut self,
        interaction: &str,
        name: &str,
        piece: &str,
    ) -> Result<TrackResponse, VisitGenError> {
        self.track(vec![
            ("c_i".to_string(), interaction.to_string()),
            ("c_n".to_string(), name.to_string()),
            ("c_p".to_string(), piece.to_string()),
        ])
        .await
    }

    pub async fn track_site_search(
        &mut self,
        keyword: &str,
    ) -> Result<TrackResponse, VisitGenError> {
        self.track(vec![("search".to_string(), keyword.to_string())])
            .await
    }

    /// Flushes the queued batch as one POST and returns the parsed aggregate
    /// response. Bulk mode is disabled afterwards.
    pub async fn do_bulk_track(&mut self) -> Result<BulkResponse, VisitGenError> {
        let requests = match self.bulk.take() {
            Some(reqs) => reqs,
            None => {
                return Err(VisitGenError::BulkTracker(
                    "bulk tracking is not enabled".to_string(),
                ))
            }
        };
        if requests.is_empty() {
            return Err(VisitGenError::BulkTracker(
                "no requests were queued".to_string(),
            ));
        }
        tracing::debug!("Flushing bulk batch of {} requests", requests.len());
        let mut body = json!({ "requests": requests });
        if let Some(ref token) = self.token_auth {
            body["token_auth"] = json!(token);
        }
        let rsp = self
            .client
            .post(format!("{}/matomo.php", self.base_url))
            .json(&body)
            .send()
            .await?;
        if !rsp.status().is_success() {
            return Err(VisitGenError::BulkTracker(format!(
                "status={}, body={:?}",
                rsp.status(),
                rsp.text().await
            )));
        }
        let parsed: BulkResponse = rsp.json().await?;
        Ok(parsed)
    }

    async fn track(
        &mut self,
        action_params: Vec<(String, String)>,
    ) -> Result<TrackResponse, VisitGenError> {
        let params = self.build_params(action_params);
        self.reset_one_shot();

        if let Some(ref mut batch) = self.bulk {
            // Url building only serves to produce the encoded query string
            let url = Url::parse_with_params(ENCODE_BASE, &params)
                .map_err(|e| VisitGenError::Tracker(format!("query encoding failed: {}", e)))?;
            batch.push(format!("?{}", url.query().unwrap_or("")));
            return Ok(TrackResponse::Queued);
        }

        let rsp = self
            .client
            .get(format!("{}/matomo.php", self.base_url))
            .query(&params)
            .send()
            .await?;
        let status = rsp.status().as_u16();
        let body = rsp.text().await.unwrap_or_default();
        tracing::trace!("Tracking response status={}", status);
        Ok(TrackResponse::Live { status, body })
    }

    /// Renders the full parameter list for one tracking request in a fixed
    /// order, so identical generator state always yields identical queries.
    fn build_params(&self, action_params: Vec<(String, String)>) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            ("idsite".to_string(), self.site_id.to_string()),
            ("rec".to_string(), "1".to_string()),
            ("apiv".to_string(), "1".to_string()),
        ];
        if let Some(ref url) = self.url {
            params.push(("url".to_string(), url.clone()));
        }
        params.extend(action_params);
        if let Some(ref visitor_id) = self.visitor_id {
            params.push(("_id".to_string(), visitor_id.clone()));
        }
        if let Some(ref user_id) = self.user_id {
            params.push(("uid".to_string(), user_id.clone()));
        }
        if let Some(ref ip) = self.ip {
            params.push(("cip".to_string(), ip.clone()));
        }
        if let Some(ref ua) = self.user_agent {
            params.push(("ua".to_string(), ua.clone()));
        }
        if let Some((w, h)) = self.resolution {
            params.push(("res".to_string(), format!("{}x{}", w, h)));
        }
        if let Some(ref cdt) = self.forced_datetime {
            params.push(("cdt".to_string(), cdt.clone()));
        }
        if let Some(ref referrer) = self.referrer {
            params.push(("urlref".to_string(), referrer.clone()));
        }
        for (id, value) in self.custom_dimensions.iter() {
            params.push((format!("dimension{}", id), value.clone()));
        }
        if !self.custom_vars.is_empty() {
            let mut cvar = serde_json::Map::new();
            for (index, name, value) in self.custom_vars.iter() {
                cvar.insert(index.to_string(), json!([name, value]));
            }
            params.push((
                "cvar".to_string(),
                serde_json::Value::Object(cvar).to_string(),
            ));
        }
        if let Some((ref sku, ref name, ref category, price)) = self.ecommerce_view {
            params.push(("_pks".to_string(), sku.clone()));
            params.push(("_pkn".to_string(), name.clone()));
            params.push(("_pkc".to_string(), category.clone()));
            params.push(("_pkp".to_string(), price.to_string()));
        }
        if let Some(ref loc) = self.location {
            params.push(("city".to_string(), loc.city.clone()));
            params.push(("region".to_string(), loc.region.clone()));
            params.push(("country".to_string(), loc.country.to_lowercase()));
            if let Some(lat) = loc.latitude {
                params.push(("lat".to_string(), lat.to_string()));
            }
            if let Some(long) = loc.longitude {
                params.push(("long".to_string(), long.to_string()));
            }
        }
        if let Some(ref token) = self.token_auth {
            params.push(("token_auth".to_string(), token.clone()));
        }
        params
    }

    fn reset_one_shot(&mut self) {
        self.referrer = None;
        self.custom_dimensions.clear();
        self.custom_vars.clear();
        self.ecommerce_view = None;
    }
}

#[cfg(test)]
mod test {
    use crate::config::Endpoint;
    use crate::location::LocationRegistry;
    use crate::tracker::*;
    use crate::types::{ActionKind, MockLocation};
    use std::sync::atomic::AtomicU64;
    use std::sync::{Arc, Mutex};

    macro_rules! aw {
        ($e:expr) => {
            tokio_test::block_on($e)
        };
    }

    fn endpoint(url: &str) -> Endpoint {
        Endpoint {
            tracker_url: url.to_string(),
            admin_url: url.to_string(),
            token_auth: None,
            timeout: 1,
        }
    }

    fn bulk_tracker() -> Tracker {
        let mut t = Tracker::new(
            &endpoint("http://localhost"),
            1,
            "2010-01-03 01:22:33",
            Arc::new(AtomicU64::new(0)),
            None,
        )
        .unwrap();
        t.enable_bulk_tracking();
        t
    }

    #[test]
    fn test_visitor_ids_are_deterministic_and_unique() {
        let mut t = bulk_tracker();
        t.set_new_visitor_id();
        let first = t.visitor_id.clone().unwrap();
        t.set_new_visitor_id();
        let second = t.visitor_id.clone().unwrap();
        assert_eq!(first, "0000000000000001");
        assert_eq!(second, "0000000000000002");
        assert_eq!(first.len(), 16);
        assert_ne!(first, second);
    }

    #[test]
    fn test_queued_query_param_order_is_stable() {
        let mut t = bulk_tracker();
        t.set_new_visitor_id();
        t.set_user_id("user0");
        t.set_ip("156.5.3.0");
        t.set_url("http://piwik.net/0/");
        aw!(t.track_page_view("title_0")).unwrap();
        assert_eq!(
            t.pending_requests()[0],
            "?idsite=1&rec=1&apiv=1&url=http%3A%2F%2Fpiwik.net%2F0%2F&action_name=title_0\
             &_id=0000000000000001&uid=user0&cip=156.5.3.0&cdt=2010-01-03+01%3A22%3A33"
        );
    }

    #[test]
    fn test_one_shot_state_cleared_after_action() {
        let mut t = bulk_tracker();
        t.set_url("http://piwik.net/0/");
        t.set_url_referrer(Some("http://whatever0.com/0"));
        t.set_custom_dimension(2, "15");
        t.set_custom_variable(1, "name", "thing3");
        aw!(t.track_page_view("first")).unwrap();
        aw!(t.track_page_view("second")).unwrap();

        let first = &t.pending_requests()[0];
        let second = &t.pending_requests()[1];
        assert!(first.contains("urlref="));
        assert!(first.contains("dimension2=15"));
        assert!(first.contains("cvar="));
        assert!(!second.contains("urlref="));
        assert!(!second.contains("dimension2"));
        assert!(!second.contains("cvar="));
        // sticky state survives
        assert!(second.contains("url=http%3A%2F%2Fpiwik.net%2F0%2F"));
    }

    #[test]
    fn test_cvar_json_uses_slot_indexes() {
        let mut t = bulk_tracker();
        t.set_url("http://piwik.net/");
        t.set_custom_variable(1, "name", "thing0");
        t.set_custom_variable(2, "rating", "5");
        aw!(t.track_page_view("p")).unwrap();
        let req = &t.pending_requests()[0];
        let cvar = req
            .split("cvar=")
            .nth(1)
            .unwrap()
            .split('&')
            .next()
            .unwrap();
        let decoded: serde_json::Value =
            serde_json::from_str(&urldecode(cvar)).expect("cvar is json");
        assert_eq!(decoded["1"][0], "name");
        assert_eq!(decoded["1"][1], "thing0");
        assert_eq!(decoded["2"][0], "rating");
        assert_eq!(decoded["2"][1], "5");
    }

    // minimal percent-decoding for test assertions
    fn urldecode(s: &str) -> String {
        let mut out = Vec::new();
        let bytes = s.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'%' => {
                    let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap();
                    out.push(u8::from_str_radix(hex, 16).unwrap());
                    i += 3;
                }
                b'+' => {
                    out.push(b' ');
                    i += 1;
                }
                c => {
                    out.push(c);
                    i += 1;
                }
            }
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_track_action_rejects_non_link_kinds() {
        let mut t = bulk_tracker();
        t.set_url("http://piwik.net/");
        let res = aw!(t.track_action("http://cloudsite0.com/download", ActionKind::Event));
        assert!(res.is_err());
    }

    #[test]
    fn test_location_stamped_from_registry() {
        let mut registry = LocationRegistry::new();
        registry.install_mock(vec![
            MockLocation::new("Toronto", "ON", "CA"),
            MockLocation::new("Nice", "PAC", "FR"),
        ]);
        let registry = Arc::new(Mutex::new(registry));
        let mut t = Tracker::new(
            &endpoint("http://localhost"),
            1,
            "2010-01-03 01:22:33",
            Arc::new(AtomicU64::new(0)),
            Some(registry.clone()),
        )
        .unwrap();
        t.enable_bulk_tracking();
        t.set_url("http://piwik.net/");

        t.set_new_visitor_id();
        aw!(t.track_page_view("a")).unwrap();
        t.set_new_visitor_id();
        aw!(t.track_page_view("b")).unwrap();
        assert!(t.pending_requests()[0].contains("city=Toronto"));
        assert!(t.pending_requests()[0].contains("country=ca"));
        assert!(t.pending_requests()[1].contains("city=Nice"));

        // once the registry is cleared new visitors carry no location
        registry.lock().unwrap().clear();
        t.set_new_visitor_id();
        aw!(t.track_page_view("c")).unwrap();
        assert!(!t.pending_requests()[2].contains("city="));
    }

    #[test]
    fn test_check_bulk_response() {
        let ok = BulkResponse {
            status: "success".to_string(),
            tracked: 21,
            invalid: 0,
        };
        assert!(check_bulk_response(&ok).is_ok());
        let invalid = BulkResponse {
            status: "success".to_string(),
            tracked: 20,
            invalid: 1,
        };
        assert!(check_bulk_response(&invalid).is_err());
        let failed = BulkResponse {
            status: "error".to_string(),
            tracked: 0,
            invalid: 0,
        };
        assert!(check_bulk_response(&failed).is_err());
    }

    #[test]
    fn test_check_response_fails_on_server_error() {
        let ok = TrackResponse::Live {
            status: 200,
            body: "GIF".to_string(),
        };
        assert!(check_response(&ok).is_ok());
        let err = TrackResponse::Live {
            status: 500,
            body: "boom".to_string(),
        };
        assert!(check_response(&err).is_err());
        assert!(check_response(&TrackResponse::Queued).is_ok());
    }

    #[test]
    fn test_do_bulk_track_without_enable_fails() {
        let mut t = Tracker::new(
            &endpoint("http://localhost"),
            1,
            "2010-01-03 01:22:33",
            Arc::new(AtomicU64::new(0)),
            None,
        )
        .unwrap();
        assert!(aw!(t.do_bulk_track()).is_err());
    }

    #[test]
    fn test_single_track_hits_endpoint() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/matomo.php")
            .expect(1)
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("idsite".into(), "1".into()),
                mockito::Matcher::UrlEncoded("rec".into(), "1".into()),
                mockito::Matcher::UrlEncoded("action_name".into(), "title_0".into()),
                mockito::Matcher::UrlEncoded("cdt".into(), "2010-01-03 01:22:33".into()),
            ]))
            .with_status(200)
            .create();

        let mut t = Tracker::new(
            &endpoint(&server.url()),
            1,
            "2010-01-03 01:22:33",
            Arc::new(AtomicU64::new(0)),
            None,
        )
        .unwrap();
        t.set_url("http://piwik.net/0/");
        let rsp = aw!(t.track_page_view("title_0")).unwrap();
        check_response(&rsp).unwrap();
        mock.assert();
    }
}
