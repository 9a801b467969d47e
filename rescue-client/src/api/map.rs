//! Bounded map-points query

use crate::ClientResult;
use crate::http::{ApiRequest, SessionPipeline};
use shared::models::{GeoPoint, MapBounds};

pub const MAP_POINTS_PATH: &str = "/api/map-points";

#[derive(Debug, Clone)]
pub struct MapApi {
    pipeline: SessionPipeline,
}

impl MapApi {
    pub fn new(pipeline: SessionPipeline) -> Self {
        Self { pipeline }
    }

    /// Points inside `bounds`; the server picks detail or cluster by zoom
    pub async fn points(&self, bounds: &MapBounds) -> ClientResult<Vec<GeoPoint>> {
        let request = bounds
            .query_pairs()
            .into_iter()
            .fold(ApiRequest::get(MAP_POINTS_PATH), |req, (key, value)| {
                req.query(key, value)
            });
        self.pipeline.execute_json(request).await
    }
}
