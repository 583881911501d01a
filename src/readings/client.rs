use super::session::CookieJarSession;
use super::types::{ConsumptionRequest, ConsumptionResponse, MetersResponse};
use crate::error::ReadingsError;

pub const DASHBOARD_PATH: &str = "/mydashboard/my-meters-usage";
const GET_METERS_PATH: &str = "/ajax/waterMeter/getMeters";
const GET_CONSUMPTIONS_PATH: &str = "/ajax/waterMeter/getSmartWaterMeterConsumptions";

pub struct ReadingsClient {
    session: CookieJarSession,
}

impl ReadingsClient {
    pub fn new(session: CookieJarSession) -> Self {
        Self { session }
    }

    pub async fn get_meters(&self) -> Result<MetersResponse, ReadingsError> {
        let url = self.session.url(GET_METERS_PATH)?;
        self.session.get_json(url).await
    }

    pub async fn get_consumptions(
        &self,
        request: &ConsumptionRequest,
    ) -> Result<ConsumptionResponse, ReadingsError> {
        let mut url = self.session.url(GET_CONSUMPTIONS_PATH)?;
        url.query_pairs_mut().extend_pairs(request.query_pairs());
        self.session.get_json(url).await
    }
}
