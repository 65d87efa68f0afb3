// Canned HTTP response bodies for the mocked analytics backend

/// Admin response for an existing site.
pub const SITE_FOUND: &str = r#"{"idsite":"1","name":"Site 1","ecommerce":"1"}"#;

/// Admin error body returned for unknown objects.
pub const SITE_NOT_FOUND: &str =
    r#"{"result":"error","message":"website idSite=1 does not exist"}"#;

/// Admin response carrying a created object id.
pub fn value_response(id: u32) -> String {
    format!(r#"{{"value":{}}}"#, id)
}

/// Aggregate bulk-tracking response.
pub fn bulk_response(tracked: u64, invalid: u64) -> String {
    format!(
        r#"{{"status":"success","tracked":{},"invalid":{}}}"#,
        tracked, invalid
    )
}
