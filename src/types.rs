//! Visit generator types
//!
//! Internal types definitions
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of action a synthetic visitor performs.
///
/// Dispatch on the action kind is done via pattern matching in the
/// fixture generator, one handler arm per variant.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    PageView,
    Download,
    Outlink,
    Event,
    Content,
}

/// One named pool of page-scoped custom-variable values.
///
/// Values are drawn cyclically by action index, so the variable value is a
/// pure function of the loop indices driving the generator.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CustomVarPool {
    pub name: String,
    pub values: Vec<String>,
}

/// A geolocation record served by the mock location provider.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MockLocation {
    pub city: String,
    pub region: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub isp: Option<String>,
}

impl MockLocation {
    pub fn new(city: &str, region: &str, country: &str) -> Self {
        MockLocation {
            city: city.to_string(),
            region: region.to_string(),
            country: country.to_string(),
            latitude: None,
            longitude: None,
            isp: None,
        }
    }

    pub fn with_isp(mut self, isp: &str) -> Self {
        self.isp = Some(isp.to_string());
        self
    }
}

pub enum VisitGenError {
    Tracker(String),
    BulkTracker(String),
    Admin(String),
    Http(reqwest::Error),
}
impl std::error::Error for VisitGenError {}

impl fmt::Display for VisitGenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VisitGenError::Tracker(msg) => write!(f, "Unexpected tracking response: {}", msg),
            VisitGenError::BulkTracker(msg) => write!(f, "Bulk tracking failed: {}", msg),
            VisitGenError::Admin(msg) => write!(f, "Admin API error: {}", msg),
            VisitGenError::Http(err) => write!(f, "HTTP transport error: {}", err),
        }
    }
}
impl fmt::Debug for VisitGenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VisitGenError::Tracker(msg) => write!(f, "Unexpected tracking response: {}", msg),
            VisitGenError::BulkTracker(msg) => write!(f, "Bulk tracking failed: {}", msg),
            VisitGenError::Admin(msg) => write!(f, "Admin API error: {}", msg),
            VisitGenError::Http(err) => write!(f, "HTTP transport error: {}", err),
        }
    }
}

impl From<reqwest::Error> for VisitGenError {
    fn from(err: reqwest::Error) -> Self {
        VisitGenError::Http(err)
    }
}

#[cfg(test)]
mod test {
    use crate::types::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", VisitGenError::Tracker("status 500".to_string())),
            "Unexpected tracking response: status 500"
        );
        assert_eq!(
            format!("{}", VisitGenError::BulkTracker("invalid=3".to_string())),
            "Bulk tracking failed: invalid=3"
        );
        assert_eq!(
            format!("{}", VisitGenError::Admin("no value".to_string())),
            "Admin API error: no value"
        );
    }

    #[test]
    fn test_error_debug_matches_display() {
        let err = VisitGenError::Admin("boom".to_string());
        assert_eq!(format!("{}", err), format!("{:?}", err));
    }

    #[test]
    fn test_mock_location_builder() {
        let loc = MockLocation::new("Toronto", "ON", "CA").with_isp("comcast.net");
        assert_eq!(loc.city, "Toronto");
        assert_eq!(loc.region, "ON");
        assert_eq!(loc.country, "CA");
        assert_eq!(loc.isp.as_deref(), Some("comcast.net"));
        assert!(loc.latitude.is_none());
        assert!(loc.longitude.is_none());
    }

    #[test]
    fn test_action_kind_from_yaml() {
        let kind: ActionKind = serde_json::from_str("\"download\"").unwrap();
        assert_eq!(kind, ActionKind::Download);
    }
}
