// Configuration fixtures for integration tests

/// Config pointing both the tracker and the admin API at one mock server.
pub fn config_for(server_url: &str) -> String {
    format!(
        "
endpoint:
  tracker_url: '{url}'
  admin_url: '{url}'
site:
  id: 1
fixture:
  date_time: '2010-01-03 01:22:33'
  days_in_past: 0
",
        url = server_url
    )
}

/// Same as [`config_for`] with visit generation repeated for prior days.
pub fn config_with_past_days(server_url: &str, days: u32) -> String {
    format!(
        "
endpoint:
  tracker_url: '{url}'
  admin_url: '{url}'
fixture:
  days_in_past: {days}
",
        url = server_url,
        days = days
    )
}
