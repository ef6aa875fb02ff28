use async_graphql::{Context, Object};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    auth::catalog,
    domain::{metrics::ActivityEvent, property::UserType},
    error::AppError,
    graphql::{
        context::request,
        error::{GqlResult, IntoGql},
        types::{
            ActivityEntry, AdminUser, Page, Permission, PlatformUser, Property, Role, Viewer,
        },
    },
    services::{
        dashboard_service::{
            AgentPerformance, DashboardOverview, DashboardStats, MonthlyTrend, TodayActivity,
            TopCity,
        },
        property_service::PropertyFilterInput,
    },
};

const DEFAULT_PAGE_SIZE: u64 = 20;
const USER_READERS: &[&str] = &[catalog::USERS_VIEW, catalog::USERS_MANAGE];

/// Both ends or neither.
pub(crate) fn date_range(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, AppError> {
    match (from, to) {
        (Some(from), Some(to)) => Ok(Some((from, to))),
        (None, None) => Ok(None),
        _ => Err(AppError::bad_request(
            "Both from and to are required for a date range",
        )),
    }
}

fn paging(page: Option<u64>, page_size: Option<u64>) -> (u64, u64) {
    (page.unwrap_or(1), page_size.unwrap_or(DEFAULT_PAGE_SIZE))
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn me(&self, ctx: &Context<'_>) -> GqlResult<Viewer> {
        let rc = request(ctx)?;
        let identity = rc.admin().gql()?;
        let admin = rc.services().admin().get(identity.id).await.gql()?;
        let permissions = rc
            .effective_permissions()
            .await
            .gql()?
            .iter()
            .map(|permission| permission.name.clone())
            .collect();
        Ok(Viewer {
            admin: admin.into(),
            session_id: identity.session_id,
            permissions,
        })
    }

    async fn admins(
        &self,
        ctx: &Context<'_>,
        page: Option<u64>,
        page_size: Option<u64>,
        search: Option<String>,
    ) -> GqlResult<Page<AdminUser>> {
        let rc = request(ctx)?;
        rc.require(catalog::ADMINS_MANAGE).await.gql()?;
        let (page, page_size) = paging(page, page_size);
        let admins = rc
            .services()
            .admin()
            .list(page, page_size, search)
            .await
            .gql()?;
        Ok(Page::from_models(admins))
    }

    async fn admin(&self, ctx: &Context<'_>, id: Uuid) -> GqlResult<AdminUser> {
        let rc = request(ctx)?;
        let caller = rc.admin().gql()?;
        if caller.id != id {
            rc.require(catalog::ADMINS_MANAGE).await.gql()?;
        }
        Ok(rc.services().admin().get(id).await.gql()?.into())
    }

    async fn roles(&self, ctx: &Context<'_>) -> GqlResult<Vec<Role>> {
        let rc = request(ctx)?;
        rc.require(catalog::ROLES_MANAGE).await.gql()?;
        let roles = rc.services().role().list_roles().await.gql()?;
        Ok(roles.into_iter().map(Role::from).collect())
    }

    async fn role(&self, ctx: &Context<'_>, id: Uuid) -> GqlResult<Role> {
        let rc = request(ctx)?;
        rc.require(catalog::ROLES_MANAGE).await.gql()?;
        Ok(rc.services().role().get_role(id).await.gql()?.into())
    }

    async fn permissions(&self, ctx: &Context<'_>) -> GqlResult<Vec<Permission>> {
        let rc = request(ctx)?;
        rc.require(catalog::ROLES_MANAGE).await.gql()?;
        let permissions = rc.services().role().list_permissions().await.gql()?;
        Ok(permissions.into_iter().map(Permission::from).collect())
    }

    async fn activity_log(
        &self,
        ctx: &Context<'_>,
        page: Option<u64>,
        page_size: Option<u64>,
        admin_id: Option<Uuid>,
        resource: Option<String>,
    ) -> GqlResult<Page<ActivityEntry>> {
        let rc = request(ctx)?;
        rc.require(catalog::ACTIVITY_VIEW).await.gql()?;
        let (page, page_size) = paging(page, page_size);
        let entries = rc
            .services()
            .admin()
            .activity(page, page_size, admin_id, resource)
            .await
            .gql()?;
        Ok(Page::from_models(entries))
    }

    async fn users(
        &self,
        ctx: &Context<'_>,
        page: Option<u64>,
        page_size: Option<u64>,
        user_type: Option<UserType>,
        search: Option<String>,
    ) -> GqlResult<Page<PlatformUser>> {
        let rc = request(ctx)?;
        rc.require_any(USER_READERS).await.gql()?;
        let (page, page_size) = paging(page, page_size);
        let users = rc
            .services()
            .user()
            .list(page, page_size, user_type, search)
            .await
            .gql()?;
        Ok(Page::from_models(users))
    }

    async fn user(&self, ctx: &Context<'_>, id: Uuid) -> GqlResult<PlatformUser> {
        let rc = request(ctx)?;
        rc.require_any(USER_READERS).await.gql()?;
        Ok(rc.services().user().get(id).await.gql()?.into())
    }

    async fn properties(
        &self,
        ctx: &Context<'_>,
        filter: Option<PropertyFilterInput>,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> GqlResult<Page<Property>> {
        let rc = request(ctx)?;
        rc.require(catalog::PROPERTIES_VIEW).await.gql()?;
        let (page, page_size) = paging(page, page_size);
        let properties = rc
            .services()
            .property()
            .list(filter.unwrap_or_default(), page, page_size)
            .await
            .gql()?;
        Ok(Page::from_models(properties))
    }

    async fn property(&self, ctx: &Context<'_>, id: Uuid) -> GqlResult<Property> {
        let rc = request(ctx)?;
        rc.require(catalog::PROPERTIES_VIEW).await.gql()?;
        Ok(rc.services().property().get(id).await.gql()?.into())
    }

    /// Counts compared with the preceding window; without a range the whole
    /// store is compared with the last month.
    async fn dashboard_stats(
        &self,
        ctx: &Context<'_>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> GqlResult<DashboardStats> {
        let rc = request(ctx)?;
        rc.require(catalog::DASHBOARD_VIEW).await.gql()?;
        let range = date_range(from, to).gql()?;
        rc.services()
            .dashboard(&rc.state().config.dashboard)
            .stats(range)
            .await
            .gql()
    }

    async fn today_activity(&self, ctx: &Context<'_>) -> GqlResult<TodayActivity> {
        let rc = request(ctx)?;
        rc.require(catalog::DASHBOARD_VIEW).await.gql()?;
        rc.services()
            .dashboard(&rc.state().config.dashboard)
            .today()
            .await
            .gql()
    }

    async fn monthly_trends(
        &self,
        ctx: &Context<'_>,
        months: Option<u32>,
    ) -> GqlResult<Vec<MonthlyTrend>> {
        let rc = request(ctx)?;
        rc.require(catalog::DASHBOARD_VIEW).await.gql()?;
        rc.services()
            .dashboard(&rc.state().config.dashboard)
            .monthly_trends(months)
            .await
            .gql()
    }

    async fn top_cities(&self, ctx: &Context<'_>, limit: Option<u64>) -> GqlResult<Vec<TopCity>> {
        let rc = request(ctx)?;
        rc.require(catalog::DASHBOARD_VIEW).await.gql()?;
        rc.services()
            .dashboard(&rc.state().config.dashboard)
            .top_cities(limit)
            .await
            .gql()
    }

    async fn agent_performance(
        &self,
        ctx: &Context<'_>,
        limit: Option<u64>,
    ) -> GqlResult<Vec<AgentPerformance>> {
        let rc = request(ctx)?;
        rc.require(catalog::DASHBOARD_VIEW).await.gql()?;
        rc.services()
            .dashboard(&rc.state().config.dashboard)
            .agent_performance(limit)
            .await
            .gql()
    }

    async fn recent_activity(
        &self,
        ctx: &Context<'_>,
        limit: Option<u64>,
    ) -> GqlResult<Vec<ActivityEvent>> {
        let rc = request(ctx)?;
        rc.require(catalog::DASHBOARD_VIEW).await.gql()?;
        rc.services()
            .dashboard(&rc.state().config.dashboard)
            .recent_activity(limit)
            .await
            .gql()
    }

    async fn dashboard_overview(
        &self,
        ctx: &Context<'_>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> GqlResult<DashboardOverview> {
        let rc = request(ctx)?;
        rc.require(catalog::DASHBOARD_VIEW).await.gql()?;
        let range = date_range(from, to).gql()?;
        rc.services()
            .dashboard(&rc.state().config.dashboard)
            .overview(range)
            .await
            .gql()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::date_range;

    #[test]
    fn half_open_range_is_rejected() {
        let err = date_range(Some(Utc::now()), None).expect_err("needs both ends");
        assert_eq!(err.code(), "BAD_USER_INPUT");
    }

    #[test]
    fn missing_range_means_unbounded() {
        assert_eq!(date_range(None, None), Ok(None));
    }
}
