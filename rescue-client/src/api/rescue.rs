// rescue-client/src/api/rescue.rs
// 调度接口 - 救援请求列表 / 状态 / 附近队伍 / 指派

use super::admin::TEAMS_PATH;
use crate::http::{ApiRequest, SessionPipeline};
use crate::{ClientError, ClientResult};
use shared::models::{
    AssignResult, AssignTeam, DEFAULT_SEARCH_RADIUS_KM, NearbyTeam, RescueFilter, RescuePage,
    RescueStatusUpdate,
};

pub const REQUESTS_PATH: &str = "/api/requests";

/// Rescue request table and team dispatch
#[derive(Debug, Clone)]
pub struct RescueApi {
    pipeline: SessionPipeline,
}

impl RescueApi {
    pub fn new(pipeline: SessionPipeline) -> Self {
        Self { pipeline }
    }

    /// One page of the request table
    pub async fn list_requests(&self, filter: &RescueFilter) -> ClientResult<RescuePage> {
        let request = filter
            .query_pairs()
            .into_iter()
            .fold(ApiRequest::get(REQUESTS_PATH), |req, (key, value)| {
                req.query(key, value)
            });
        self.pipeline.execute_json(request).await
    }

    pub async fn update_status(&self, id: &str, status: &str) -> ClientResult<()> {
        let request = ApiRequest::patch(format!("{REQUESTS_PATH}/{id}/status"))
            .json(&RescueStatusUpdate {
                status: status.to_string(),
            })?;
        self.pipeline.execute_empty(request).await
    }

    /// Teams within `radius_km` of a point, nearest first
    ///
    /// A `None` radius uses the server default of 20 km.
    pub async fn find_nearby_teams(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: Option<f64>,
    ) -> ClientResult<Vec<NearbyTeam>> {
        let request = ApiRequest::get(format!("{TEAMS_PATH}/find-teams"))
            .query("latitude", latitude)
            .query("longitude", longitude)
            .query("radius_km", radius_km.unwrap_or(DEFAULT_SEARCH_RADIUS_KM));
        self.pipeline.execute_json(request).await
    }

    /// Dispatch a team; a `success: false` acknowledgement is an error
    pub async fn assign_team(&self, assignment: &AssignTeam) -> ClientResult<AssignResult> {
        let request = ApiRequest::post(format!("{TEAMS_PATH}/dispatch/assign")).json(assignment)?;
        let result: AssignResult = self.pipeline.execute_json(request).await?;
        if !result.success {
            return Err(ClientError::InvalidResponse(format!(
                "dispatch rejected: {}",
                result.message
            )));
        }
        tracing::info!(
            request_id = %assignment.request_id,
            team_id = %assignment.rescue_team_id,
            "Team dispatched"
        );
        Ok(result)
    }
}
