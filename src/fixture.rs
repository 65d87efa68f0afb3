//! Fixture data generator
//!
//! Populates one site with a deterministic stream of synthetic visits: page
//! views, downloads, outlinks, events, content impressions, site searches,
//! e-commerce orders and two bulk batches. Every id, timestamp and value is a
//! pure function of loop indices, so repeated runs produce an identical call
//! sequence.

use chrono::{Duration, NaiveDateTime};
use reqwest::ClientBuilder;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};

use crate::admin::{self, DimensionScope};
use crate::config::Config;
use crate::location::LocationRegistry;
use crate::tracker::{check_bulk_response, check_response, Tracker};
use crate::types::{ActionKind, CustomVarPool, VisitGenError};

const DATE_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Dates carrying the anomaly batch and the two high-volume days.
const ANOMALY_BATCH_DATE: &str = "2015-02-03 00:00:00";
const VOLUME_BATCHES: [(&str, u32); 2] = [("2015-03-03 06:00:00", 700), ("2015-03-04 06:00:00", 1000)];

fn format_date_time(date_time: NaiveDateTime) -> String {
    date_time.format(DATE_FMT).to_string()
}

fn parse_resolution(res: &str) -> Result<(u32, u32), VisitGenError> {
    let mut parts = res.splitn(2, 'x');
    let parse = |x: Option<&str>| {
        x.and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| VisitGenError::Tracker(format!("bad resolution string: {}", res)))
    };
    let w = parse(parts.next())?;
    let h = parse(parts.next())?;
    Ok((w, h))
}

/// Generator producing many visits with mocked visitor locations.
///
/// `setup` provisions the site and two custom dimensions, installs the mock
/// location rotation, generates the visit dataset (optionally for prior days
/// as well), then the orders and the two bulk batches. `teardown` releases
/// the location registry.
pub struct ManyVisitsFixture {
    config: Config,
    client: reqwest::Client,
    registry: Arc<Mutex<LocationRegistry>>,
    ids: Arc<AtomicU64>,
    pub custom_dimension_id: u32,
    pub action_custom_dimension_id: u32,
    date_time: NaiveDateTime,
    next_day: NaiveDateTime,
}

impl ManyVisitsFixture {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let date_time = NaiveDateTime::parse_from_str(&config.fixture.date_time, DATE_FMT)?;
        let next_day = date_time + Duration::days(1);
        let timeout = std::time::Duration::from_secs(config.endpoint.timeout as u64);
        let client = ClientBuilder::new().timeout(timeout).build()?;
        Ok(ManyVisitsFixture {
            config,
            client,
            registry: Arc::new(Mutex::new(LocationRegistry::new())),
            ids: Arc::new(AtomicU64::new(0)),
            custom_dimension_id: 1,
            action_custom_dimension_id: 2,
            date_time,
            next_day,
        })
    }

    /// Location registry claimed by this run.
    pub fn location_registry(&self) -> Arc<Mutex<LocationRegistry>> {
        self.registry.clone()
    }

    pub async fn setup(&mut self) -> anyhow::Result<()> {
        self.set_up_website().await?;

        let endpoint = self.config.endpoint.clone();
        let token = endpoint.token_auth.as_deref();
        self.custom_dimension_id = admin::configure_new_custom_dimension(
            &self.client,
            &endpoint.admin_url,
            token,
            self.config.site.id,
            "testdim",
            DimensionScope::Visit,
            true,
        )
        .await?;
        self.action_custom_dimension_id = admin::configure_new_custom_dimension(
            &self.client,
            &endpoint.admin_url,
            token,
            self.config.site.id,
            "testdim2",
            DimensionScope::Action,
            true,
        )
        .await?;

        self.registry
            .lock()
            .unwrap()
            .install_mock(self.config.pools.locations.clone());

        tracing::info!("Tracking visits for {}", format_date_time(self.date_time));
        self.track_visits(self.date_time, 0).await?;
        for i in 0..self.config.fixture.days_in_past {
            let date_time = self.date_time - Duration::days((i + 1) as i64);
            tracing::info!("Tracking visits for past day {}", format_date_time(date_time));
            self.track_visits(date_time, (i + 1) * 20).await?;
        }

        // The mock location rotation covers visit generation only; orders and
        // the bulk batches are tracked without location overrides.
        self.registry.lock().unwrap().clear();

        self.track_orders().await?;
        self.track_anomaly_batch().await?;
        self.track_volume_batch().await?;
        Ok(())
    }

    pub fn teardown(&self) {
        self.registry.lock().unwrap().clear();
    }

    async fn set_up_website(&self) -> anyhow::Result<()> {
        let endpoint = &self.config.endpoint;
        let token = endpoint.token_auth.as_deref();
        let site_id = self.config.site.id;
        if !admin::site_created(&self.client, &endpoint.admin_url, token, site_id).await? {
            admin::create_website(
                &self.client,
                &endpoint.admin_url,
                token,
                &format_date_time(self.date_time),
                site_id,
            )
            .await?;
        }
        Ok(())
    }

    fn get_tracker(&self, date_time: &str) -> Result<Tracker, VisitGenError> {
        Tracker::new(
            &self.config.endpoint,
            self.config.site.id,
            date_time,
            self.ids.clone(),
            Some(self.registry.clone()),
        )
    }

    /// One generation pass: five visitors for each of the five action kinds,
    /// with a visitor counter shared across the kinds.
    async fn track_visits(&self, date_time: NaiveDateTime, offset: u32) -> anyhow::Result<()> {
        let mut t = self.get_tracker(&format_date_time(date_time))?;
        let mut visitor_counter = offset;
        let pools = &self.config.pools;

        // regular page views
        self.track_actions(
            &mut t,
            &mut visitor_counter,
            offset,
            date_time,
            ActionKind::PageView,
            Some(pools.referrers.as_slice()),
            Some(pools.page_vars.as_slice()),
        )
        .await?;

        // downloads
        self.track_actions(
            &mut t,
            &mut visitor_counter,
            offset,
            date_time,
            ActionKind::Download,
            None,
            Some(pools.download_vars.as_slice()),
        )
        .await?;

        // outlinks
        self.track_actions(
            &mut t,
            &mut visitor_counter,
            offset,
            date_time,
            ActionKind::Outlink,
            None,
            None,
        )
        .await?;

        // events
        self.track_actions(
            &mut t,
            &mut visitor_counter,
            offset,
            date_time,
            ActionKind::Event,
            None,
            None,
        )
        .await?;

        // content impressions
        self.track_actions(
            &mut t,
            &mut visitor_counter,
            offset,
            date_time,
            ActionKind::Content,
            None,
            None,
        )
        .await?;

        Ok(())
    }

    async fn track_actions(
        &self,
        t: &mut Tracker,
        visitor_counter: &mut u32,
        offset: u32,
        date_time: NaiveDateTime,
        kind: ActionKind,
        referrers: Option<&[String]>,
        custom_vars: Option<&[CustomVarPool]>,
    ) -> anyhow::Result<()> {
        let user_agents = &self.config.pools.user_agents;
        let resolutions = &self.config.pools.resolutions;

        for i in offset..offset + 5 {
            let counter = *visitor_counter;

            t.set_new_visitor_id();
            t.set_user_id(&format!("user{}", counter));
            t.set_ip(&format!("156.5.3.{}", counter));

            t.set_user_agent(&user_agents[counter as usize % user_agents.len()]);
            let (w, h) = parse_resolution(&resolutions[counter as usize % resolutions.len()])?;
            t.set_resolution(w, h);

            // one visit to root url
            t.set_url(&format!("http://piwik.net/{}/", counter));
            t.set_url_referrer(None);
            t.force_visit_date_time(&format_date_time(date_time));
            t.set_custom_dimension(self.custom_dimension_id, &(i * 5).to_string());
            self.track_action(t, kind, counter, None).await?;

            for j in 0..4u32 {
                // NOTE: to test referrers w/o creating too many visits, these
                // are 4 separate hour-shifted visits, not 4 actions
                let action_date = date_time + Duration::hours((j + 1) as i64);

                let action_idx = i * 4 + j;
                let action_num = counter * 4 + j;

                t.set_url(&format!("http://piwik.net/{}/{}", counter, action_num));
                t.force_visit_date_time(&format_date_time(action_date));
                t.set_custom_dimension(
                    self.action_custom_dimension_id,
                    &(i * 5 + j).to_string(),
                );

                match referrers {
                    Some(pool) => {
                        t.set_url_referrer(Some(pool[action_idx as usize % pool.len()].as_str()))
                    }
                    None => t.set_url_referrer(None),
                }

                if let Some(pools) = custom_vars {
                    for (k, pool) in pools.iter().enumerate() {
                        let value = &pool.values[action_idx as usize % pool.values.len()];
                        t.set_custom_variable((k + 1) as u8, &pool.name, value);
                    }
                }

                self.track_action(t, kind, counter, Some(action_num)).await?;
            }

            *visitor_counter += 1;
        }
        Ok(())
    }

    async fn track_action(
        &self,
        t: &mut Tracker,
        kind: ActionKind,
        counter: u32,
        action_num: Option<u32>,
    ) -> anyhow::Result<()> {
        match kind {
            ActionKind::PageView => {
                let title = match action_num {
                    Some(n) => format!("title_{} / title_{}", counter, n),
                    None => format!("title_{}", counter),
                };
                check_response(&t.track_page_view(&title).await?)?;
            }
            ActionKind::Download => {
                let root = match action_num {
                    Some(n) => format!("http://cloudsite{}.com/{}", counter, n),
                    None => format!("http://cloudsite{}.com", counter),
                };
                check_response(
                    &t.track_action(&format!("{}/download", root), ActionKind::Download)
                        .await?,
                )?;
            }
            ActionKind::Outlink => {
                let url = match action_num {
                    Some(n) => format!("http://othersite{}.com/{}/", counter, n),
                    None => format!("http://othersite{}.com/", counter),
                };
                check_response(&t.track_action(&url, ActionKind::Outlink).await?)?;
            }
            ActionKind::Event => {
                check_response(
                    &t.track_event(
                        &format!("event category {}", counter % 6),
                        &format!("event action {}", counter % 7),
                        &format!("event name{}", counter % 5),
                    )
                    .await?,
                )?;
            }
            ActionKind::Content => {
                let name = format!("content name {}", counter);
                let piece = format!("content piece {}", counter);
                check_response(&t.track_content_impression(&name, &piece).await?)?;

                if counter % 2 == 0 {
                    check_response(
                        &t.track_content_interaction("click", &name, &piece).await?,
                    )?;
                }
            }
        }

        // Add a site search to some visits
        if matches!(kind, ActionKind::Download | ActionKind::Outlink) {
            let keyword = match action_num {
                Some(n) => format!("keyword{}", n),
                None => "keyword".to_string(),
            };
            check_response(&t.track_site_search(&keyword).await?)?;
        }
        Ok(())
    }

    /// 25 e-commerce orders, one fresh visitor each, on the day after the
    /// main dataset.
    async fn track_orders(&self) -> anyhow::Result<()> {
        tracing::info!("Tracking e-commerce orders");
        let mut t = self.get_tracker(&format_date_time(self.next_day))?;
        self.queue_orders(&mut t).await?;
        Ok(())
    }

    async fn queue_orders(&self, t: &mut Tracker) -> anyhow::Result<()> {
        for i in 0..25u32 {
            let cat = i % 5;

            t.set_new_visitor_id();
            t.set_user_id(&format!("user{}", i + 10000));
            t.set_ip(&format!("155.5.4.{}", i));
            t.set_ecommerce_view(
                &format!("id_book{}", i),
                &format!("Book{}", i),
                &format!("Books Cat #{}", cat),
                7.50,
            );
            check_response(&t.track_page_view("bought book").await?)?;
        }
        Ok(())
    }

    /// One bulk batch exercising the "-1" boundary row downstream: a single
    /// all-"-1" event followed by 20 indexed events.
    async fn track_anomaly_batch(&self) -> anyhow::Result<()> {
        tracing::info!("Tracking anomaly event batch");
        let mut t = self.get_tracker(ANOMALY_BATCH_DATE)?;
        t.enable_bulk_tracking();
        self.queue_anomaly_events(&mut t).await?;
        check_bulk_response(&t.do_bulk_track().await?)?;
        Ok(())
    }

    async fn queue_anomaly_events(&self, t: &mut Tracker) -> anyhow::Result<()> {
        t.set_url("http://piwik.net/page");
        check_response(&t.track_event("-1", "-1", "-1").await?)?;

        for i in 0..20u32 {
            t.set_url("http://piwik.net/page");
            t.set_ip(&format!("120.34.5.{}", i));
            check_response(
                &t.track_event(
                    &format!("event category {}", i),
                    &format!("event action {}", i),
                    &format!("event name {}", i),
                )
                .await?,
            )?;
        }
        Ok(())
    }

    /// One bulk batch of flat page-view traffic across two days, for
    /// aggregate-statistics testing.
    async fn track_volume_batch(&self) -> anyhow::Result<()> {
        tracing::info!("Tracking page view volume batch");
        let mut t = self.get_tracker(VOLUME_BATCHES[0].0)?;
        t.enable_bulk_tracking();
        self.queue_volume_page_views(&mut t).await?;
        check_bulk_response(&t.do_bulk_track().await?)?;
        Ok(())
    }

    async fn queue_volume_page_views(&self, t: &mut Tracker) -> anyhow::Result<()> {
        for (date_time, visit_count) in VOLUME_BATCHES.iter() {
            t.force_visit_date_time(date_time);
            for i in 0..*visit_count {
                t.set_new_visitor_id();
                t.set_url(&format!("http://somesite.com/{}", i));
                check_response(&t.track_page_view(&format!("page title {}", i)).await?)?;
            }
        }
        Ok(())
    }
}
