use async_graphql::{Context, EmptyMutation, EmptySubscription, Object, Schema};

use crate::api::rest::AppState;
use crate::domain::report::CompatibilityReport;
use crate::domain::types::DaemonHealth;

pub type NodewatchSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The most recently delivered compatibility report, if any poll has completed.
    async fn compatibility(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Option<CompatibilityReport>> {
        let state = ctx.data::<AppState>()?;
        Ok(state.latest_report())
    }

    async fn health(&self, ctx: &Context<'_>) -> async_graphql::Result<DaemonHealth> {
        let state = ctx.data::<AppState>()?;
        Ok(state.health())
    }
}

pub fn build_schema(state: AppState) -> NodewatchSchema {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(state)
        .finish()
}
