use std::{collections::HashMap, future::Future, time::Duration};

use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use futures_util::{future::try_join_all, try_join};
use uuid::Uuid;

use crate::{
    config::DashboardConfig,
    db::{
        dao::{DaoResult, DashboardDao, PropertyScope},
        entities::{approval_action, property, property_inquiry},
    },
    domain::{
        metrics::{
            ActivityEvent, ActivityKind, DashboardMetric, MetricWindows, RangeError, TimeWindow,
            merge_recent, metric_windows, today, trailing_months,
        },
        property::ApprovalStatus,
    },
    error::AppError,
};

const MAX_TREND_MONTHS: u32 = 24;
const MAX_RANKING_LIMIT: u64 = 50;
const MAX_ACTIVITY_LIMIT: u64 = 100;

#[derive(Debug, Clone, PartialEq, SimpleObject)]
pub struct DashboardStats {
    pub total_properties: DashboardMetric,
    pub active_listings: DashboardMetric,
    pub pending_approvals: DashboardMetric,
    pub total_inquiries: DashboardMetric,
    pub total_views: DashboardMetric,
    pub total_agents: DashboardMetric,
}

#[derive(Debug, Clone, PartialEq, Eq, SimpleObject)]
pub struct TodayActivity {
    pub views: u64,
    pub inquiries: u64,
    pub new_listings: u64,
    pub approvals: u64,
    pub rejections: u64,
}

#[derive(Debug, Clone, PartialEq, SimpleObject)]
pub struct MonthlyTrend {
    /// `YYYY-MM`.
    pub month: String,
    pub properties: u64,
    pub inquiries: u64,
    pub approvals: u64,
    /// Approved listing value times the commission rate.
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, SimpleObject)]
pub struct TopCity {
    pub city: String,
    pub listings: i64,
    pub inquiries: i64,
    pub average_price: Option<f64>,
    /// Not tracked yet; always `None`.
    pub estimated_growth_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, SimpleObject)]
pub struct AgentPerformance {
    pub agent_id: Uuid,
    pub name: String,
    pub email: String,
    pub listings: i64,
    pub inquiries: i64,
    pub views: i64,
    /// Not tracked yet; always `None`.
    pub estimated_response_time_hours: Option<f64>,
    /// Not tracked yet; always `None`.
    pub estimated_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, SimpleObject)]
pub struct DashboardOverview {
    pub stats: DashboardStats,
    pub today: TodayActivity,
    pub monthly_trends: Vec<MonthlyTrend>,
    pub top_cities: Vec<TopCity>,
    pub agent_performance: Vec<AgentPerformance>,
    pub recent_activity: Vec<ActivityEvent>,
}

impl From<RangeError> for AppError {
    fn from(err: RangeError) -> Self {
        AppError::bad_request(err.to_string())
    }
}

async fn compare<F, Fut>(windows: MetricWindows, count: F) -> DaoResult<DashboardMetric>
where
    F: Fn(Option<TimeWindow>) -> Fut,
    Fut: Future<Output = DaoResult<u64>>,
{
    let current = count(windows.current).await?;
    let previous = count(Some(windows.previous)).await?;
    Ok(DashboardMetric::compare(current, previous))
}

fn bounded(limit: Option<u64>, default: u64, max: u64) -> Result<u64, AppError> {
    match limit {
        None => Ok(default),
        Some(0) => Err(AppError::bad_request("limit must be greater than zero")),
        Some(limit) if limit > max => Err(AppError::bad_request(format!(
            "limit must be at most {max}"
        ))),
        Some(limit) => Ok(limit),
    }
}

fn property_event(property: property::Model) -> ActivityEvent {
    ActivityEvent {
        kind: ActivityKind::PropertyCreated,
        subject_id: property.id,
        description: format!(
            "New {} listing in {}",
            property.property_type.to_lowercase(),
            property.city
        ),
        title: property.title,
        at: property.created_at.with_timezone(&Utc),
    }
}

fn inquiry_event(inquiry: property_inquiry::Model) -> ActivityEvent {
    ActivityEvent {
        kind: ActivityKind::InquiryReceived,
        subject_id: inquiry.property_id,
        title: format!("Inquiry from {}", inquiry.name),
        description: inquiry.message,
        at: inquiry.created_at.with_timezone(&Utc),
    }
}

fn decision_event(action: approval_action::Model) -> ActivityEvent {
    ActivityEvent {
        kind: ActivityKind::ApprovalDecision,
        subject_id: action.property_id,
        title: format!("Property {}", action.new_status.to_lowercase()),
        description: format!("{} -> {}", action.previous_status, action.new_status),
        at: action.created_at.with_timezone(&Utc),
    }
}

/// Analytics recomputed from the live store on every call.
#[derive(Clone)]
pub struct DashboardService {
    dao: DashboardDao,
    cfg: DashboardConfig,
}

impl DashboardService {
    pub fn new(dao: DashboardDao, cfg: DashboardConfig) -> Self {
        Self { dao, cfg }
    }

    pub async fn stats(
        &self,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<DashboardStats, AppError> {
        let windows = metric_windows(range, Utc::now())?;
        Ok(self.stats_over(windows).await?)
    }

    async fn stats_over(&self, windows: MetricWindows) -> DaoResult<DashboardStats> {
        let dao = &self.dao;
        let (
            total_properties,
            active_listings,
            pending_approvals,
            total_inquiries,
            total_views,
            total_agents,
        ) = try_join!(
            compare(windows, |w| dao.count_properties(PropertyScope::All, w)),
            compare(windows, |w| dao.count_properties(PropertyScope::Live, w)),
            compare(windows, |w| dao
                .count_properties(PropertyScope::PendingApproval, w)),
            compare(windows, |w| dao.count_inquiries(w)),
            compare(windows, |w| dao.count_views(w)),
            compare(windows, |w| dao.count_agents(w)),
        )?;

        Ok(DashboardStats {
            total_properties,
            active_listings,
            pending_approvals,
            total_inquiries,
            total_views,
            total_agents,
        })
    }

    pub async fn today(&self) -> Result<TodayActivity, AppError> {
        Ok(self.today_at(Utc::now()).await?)
    }

    async fn today_at(&self, now: DateTime<Utc>) -> DaoResult<TodayActivity> {
        let window = Some(today(now));
        let (views, inquiries, new_listings, approvals, rejections) = try_join!(
            self.dao.count_views(window),
            self.dao.count_inquiries(window),
            self.dao.count_properties(PropertyScope::All, window),
            self.dao
                .count_decisions(ApprovalStatus::Approved.as_str(), window),
            self.dao
                .count_decisions(ApprovalStatus::Rejected.as_str(), window),
        )?;
        Ok(TodayActivity {
            views,
            inquiries,
            new_listings,
            approvals,
            rejections,
        })
    }

    pub async fn monthly_trends(&self, months: Option<u32>) -> Result<Vec<MonthlyTrend>, AppError> {
        let months = months.unwrap_or(self.cfg.trend_months);
        if months == 0 || months > MAX_TREND_MONTHS {
            return Err(AppError::bad_request(format!(
                "months must be between 1 and {MAX_TREND_MONTHS}"
            )));
        }
        Ok(self.trends_at(Utc::now(), months).await?)
    }

    async fn trends_at(&self, now: DateTime<Utc>, months: u32) -> DaoResult<Vec<MonthlyTrend>> {
        let rate = self.cfg.commission_rate;
        try_join_all(trailing_months(now, months).into_iter().map(|bucket| async move {
            let window = Some(bucket.window);
            let (properties, inquiries, approvals, approved_total) = try_join!(
                self.dao.count_properties(PropertyScope::All, window),
                self.dao.count_inquiries(window),
                self.dao
                    .count_decisions(ApprovalStatus::Approved.as_str(), window),
                self.dao.approved_price_total(bucket.window),
            )?;
            Ok(MonthlyTrend {
                month: bucket.label,
                properties,
                inquiries,
                approvals,
                revenue: approved_total * rate,
            })
        }))
        .await
    }

    pub async fn top_cities(&self, limit: Option<u64>) -> Result<Vec<TopCity>, AppError> {
        let limit = bounded(limit, 5, MAX_RANKING_LIMIT)?;
        Ok(self.cities(limit).await?)
    }

    async fn cities(&self, limit: u64) -> DaoResult<Vec<TopCity>> {
        let rows = self.dao.top_cities(limit).await?;
        Ok(rows
            .into_iter()
            .map(|row| TopCity {
                city: row.city,
                listings: row.listings,
                inquiries: row.inquiries.unwrap_or(0),
                average_price: row.average_price,
                estimated_growth_percent: None,
            })
            .collect())
    }

    pub async fn agent_performance(
        &self,
        limit: Option<u64>,
    ) -> Result<Vec<AgentPerformance>, AppError> {
        let limit = bounded(limit, 5, MAX_RANKING_LIMIT)?;
        Ok(self.agents(limit).await?)
    }

    /// Agents ranked by listing volume.
    async fn agents(&self, limit: u64) -> DaoResult<Vec<AgentPerformance>> {
        let owners = self.dao.top_agent_owners(limit).await?;
        let ids: Vec<Uuid> = owners.iter().map(|row| row.owner_user_id).collect();
        let mut agents: HashMap<Uuid, _> = self
            .dao
            .agents_by_ids(&ids)
            .await?
            .into_iter()
            .map(|agent| (agent.id, agent))
            .collect();

        Ok(owners
            .into_iter()
            .filter_map(|row| {
                let agent = agents.remove(&row.owner_user_id)?;
                Some(AgentPerformance {
                    agent_id: agent.id,
                    name: agent.name,
                    email: agent.email,
                    listings: row.listings,
                    inquiries: row.inquiries.unwrap_or(0),
                    views: row.views.unwrap_or(0),
                    estimated_response_time_hours: None,
                    estimated_rating: None,
                })
            })
            .collect())
    }

    pub async fn recent_activity(
        &self,
        limit: Option<u64>,
    ) -> Result<Vec<ActivityEvent>, AppError> {
        let limit = bounded(limit, self.cfg.recent_activity_limit, MAX_ACTIVITY_LIMIT)?;
        Ok(self.recent(limit).await?)
    }

    async fn recent(&self, limit: u64) -> DaoResult<Vec<ActivityEvent>> {
        let (properties, inquiries, decisions) = try_join!(
            self.dao.latest_properties(limit),
            self.dao.latest_inquiries(limit),
            self.dao.latest_decisions(limit),
        )?;
        let feeds = vec![
            properties.into_iter().map(property_event).collect(),
            inquiries.into_iter().map(inquiry_event).collect(),
            decisions.into_iter().map(decision_event).collect(),
        ];
        Ok(merge_recent(feeds, limit as usize))
    }

    /// Every dashboard section in one call. Sections run concurrently under
    /// the configured deadline; any failure fails the whole overview.
    pub async fn overview(
        &self,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<DashboardOverview, AppError> {
        let now = Utc::now();
        let windows = metric_windows(range, now)?;
        let deadline = Duration::from_secs(self.cfg.query_timeout_secs);

        let sections = async {
            try_join!(
                self.stats_over(windows),
                self.today_at(now),
                self.trends_at(now, self.cfg.trend_months),
                self.cities(5),
                self.agents(5),
                self.recent(self.cfg.recent_activity_limit),
            )
        };

        match tokio::time::timeout(deadline, sections).await {
            Ok(Ok((
                stats,
                today,
                monthly_trends,
                top_cities,
                agent_performance,
                recent_activity,
            ))) => {
                Ok(DashboardOverview {
                    stats,
                    today,
                    monthly_trends,
                    top_cities,
                    agent_performance,
                    recent_activity,
                })
            }
            Ok(Err(err)) => {
                tracing::error!(error = %err, "dashboard overview failed");
                Err(AppError::internal(format!("dashboard overview failed: {err}")))
            }
            Err(_) => {
                tracing::error!(timeout_secs = deadline.as_secs(), "dashboard overview timed out");
                Err(AppError::internal("dashboard overview timed out"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, Utc};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};

    use super::DashboardService;
    use crate::{
        config::DashboardConfig,
        db::{
            dao::DashboardDao,
            entities::{approval_action, property, property_inquiry},
        },
        domain::metrics::{ActivityKind, ChangeType},
        test_helpers::{
            approval_model, count_row, inquiry_model, platform_user_model, property_model, ts,
        },
    };

    fn service(db: &DatabaseConnection) -> DashboardService {
        DashboardService::new(DashboardDao::new(db), DashboardConfig::default())
    }

    fn counts(values: &[i64]) -> MockDatabase {
        values.iter().fold(
            MockDatabase::new(DatabaseBackend::Postgres),
            |mock, value| mock.append_query_results([[count_row(*value)]]),
        )
    }

    #[tokio::test]
    async fn stats_compare_each_count_with_last_month() {
        // (current, previous) per metric, in declaration order.
        let db = counts(&[40, 10, 30, 30, 5, 0, 12, 16, 900, 300, 7, 7]).into_connection();

        let stats = service(&db).stats(None).await.expect("stats should load");

        assert_eq!(stats.total_properties.value, 40);
        assert_eq!(stats.total_properties.change, 300.0);
        assert_eq!(stats.active_listings.change_type, ChangeType::Neutral);
        assert_eq!(stats.pending_approvals.change, 0.0);
        assert_eq!(stats.total_inquiries.change, -25.0);
        assert_eq!(stats.total_inquiries.change_type, ChangeType::Decrease);
        assert_eq!(stats.total_views.previous_value, 300);
        assert_eq!(stats.total_agents.change, 0.0);
    }

    #[tokio::test]
    async fn inverted_range_is_rejected_without_querying() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let now = Utc::now();

        let err = service(&db)
            .stats(Some((now, now - Duration::days(3))))
            .await
            .expect_err("inverted range should fail");

        assert_eq!(err.code(), "BAD_USER_INPUT");
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn today_counts_every_bucket() {
        let db = counts(&[120, 8, 3, 2, 1]).into_connection();

        let today = service(&db).today().await.expect("today should load");

        assert_eq!(today.views, 120);
        assert_eq!(today.inquiries, 8);
        assert_eq!(today.new_listings, 3);
        assert_eq!(today.approvals, 2);
        assert_eq!(today.rejections, 1);
    }

    #[tokio::test]
    async fn trend_revenue_applies_commission_rate() {
        let db = counts(&[4, 9, 2])
            .append_query_results([[BTreeMap::from([(
                "total",
                Value::Double(Some(10_000_000.0)),
            )])]])
            .into_connection();
        let service = DashboardService::new(
            DashboardDao::new(&db),
            DashboardConfig {
                commission_rate: 0.02,
                ..DashboardConfig::default()
            },
        );

        let trends = service
            .monthly_trends(Some(1))
            .await
            .expect("trends should load");

        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].properties, 4);
        assert_eq!(trends[0].approvals, 2);
        assert_eq!(trends[0].revenue, 200_000.0);
    }

    #[tokio::test]
    async fn trend_window_is_bounded() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = service(&db)
            .monthly_trends(Some(25))
            .await
            .expect_err("too many months");

        assert_eq!(err.code(), "BAD_USER_INPUT");
    }

    #[tokio::test]
    async fn agent_ranking_fills_the_limit_with_agents_in_volume_order() {
        let agents: Vec<_> = ["Asha", "Ravi", "Meera"]
            .into_iter()
            .map(|name| platform_user_model(name, "AGENT"))
            .collect();
        let owner = |id: uuid::Uuid, listings: i64| {
            BTreeMap::from([
                ("owner_user_id", Value::Uuid(Some(id))),
                ("listings", Value::BigInt(Some(listings))),
                ("inquiries", Value::BigInt(Some(listings * 2))),
                ("views", Value::BigInt(None)),
            ])
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                owner(agents[0].id, 9),
                owner(agents[1].id, 6),
                owner(agents[2].id, 4),
            ]])
            .append_query_results([agents.iter().rev().cloned().collect::<Vec<_>>()])
            .into_connection();

        let ranked = service(&db)
            .agent_performance(Some(3))
            .await
            .expect("ranking should load");

        let names: Vec<&str> = ranked.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Asha", "Ravi", "Meera"]);
        assert_eq!(ranked[0].inquiries, 18);
        assert_eq!(ranked[0].views, 0);
        assert!(ranked.iter().all(|a| a.estimated_rating.is_none()));

        let log = db.into_transaction_log();
        let ranking_sql = format!("{:?}", log[0]);
        assert!(ranking_sql.contains("platform_users"), "{ranking_sql}");
        assert!(ranking_sql.contains("AGENT"), "{ranking_sql}");
        assert!(ranking_sql.contains("LIMIT"), "{ranking_sql}");
    }

    #[tokio::test]
    async fn recent_activity_interleaves_sources_newest_first() {
        let listing = property::Model {
            created_at: ts() - Duration::hours(1),
            ..property_model("Lake House", "PENDING")
        };
        let inquiry = property_inquiry::Model {
            created_at: ts(),
            ..inquiry_model(listing.id, "Meera")
        };
        let decision = approval_action::Model {
            created_at: ts() - Duration::hours(2),
            ..approval_model(listing.id, "PENDING", "APPROVED", None)
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![listing]])
            .append_query_results([vec![inquiry]])
            .append_query_results([vec![decision]])
            .into_connection();

        let events = service(&db)
            .recent_activity(Some(2))
            .await
            .expect("activity should load");

        let kinds: Vec<ActivityKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![ActivityKind::InquiryReceived, ActivityKind::PropertyCreated]
        );
    }

    #[tokio::test]
    async fn overview_failure_is_internal() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = service(&db)
            .overview(None)
            .await
            .expect_err("empty store results should fail");

        assert_eq!(err.code(), "INTERNAL_ERROR");
    }
}
