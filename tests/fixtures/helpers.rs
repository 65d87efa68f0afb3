// Test helper functions
//
// Installs the admin-API mocks every full fixture run needs: site lookup and
// the two custom-dimension configuration calls.

use mockito::{Matcher, Mock, ServerGuard};

use super::responses;

pub struct AdminMocks {
    pub site_lookup: Mock,
    pub visit_dimension: Mock,
    pub action_dimension: Mock,
}

/// Mocks an already provisioned site plus the two dimension configurations
/// (`testdim` -> 1, `testdim2` -> 2).
pub async fn mock_admin_api(server: &mut ServerGuard) -> AdminMocks {
    let site_lookup = server
        .mock("GET", "/index.php")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("module".into(), "API".into()),
            Matcher::UrlEncoded("method".into(), "SitesManager.getSiteFromId".into()),
            Matcher::UrlEncoded("idSite".into(), "1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(responses::SITE_FOUND)
        .expect(1)
        .create_async()
        .await;

    let visit_dimension = server
        .mock("GET", "/index.php")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded(
                "method".into(),
                "CustomDimensions.configureNewCustomDimension".into(),
            ),
            Matcher::UrlEncoded("name".into(), "testdim".into()),
            Matcher::UrlEncoded("scope".into(), "visit".into()),
            Matcher::UrlEncoded("active".into(), "1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(responses::value_response(1))
        .expect(1)
        .create_async()
        .await;

    let action_dimension = server
        .mock("GET", "/index.php")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded(
                "method".into(),
                "CustomDimensions.configureNewCustomDimension".into(),
            ),
            Matcher::UrlEncoded("name".into(), "testdim2".into()),
            Matcher::UrlEncoded("scope".into(), "action".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(responses::value_response(2))
        .expect(1)
        .create_async()
        .await;

    AdminMocks {
        site_lookup,
        visit_dimension,
        action_dimension,
    }
}

impl AdminMocks {
    pub async fn assert_async(&self) {
        self.site_lookup.assert_async().await;
        self.visit_dimension.assert_async().await;
        self.action_dimension.assert_async().await;
    }
}
