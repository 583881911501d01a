//! Mock implementations and server helpers for testing.
//!
//! This module provides a mock server builder for the account's AJAX
//! endpoints, a scripted browser surface and an in-memory bucket.

pub mod bucket;
pub mod surface;

use crate::readings::{parse_day_marker, ConsumptionLine};
use crate::test_utils::fixtures;
use chrono::Datelike;
use mockito::{Matcher, Mock, Server, ServerGuard};

pub use bucket::*;
pub use surface::*;

const GET_METERS_PATH: &str = "/ajax/waterMeter/getMeters";
const GET_CONSUMPTIONS_PATH: &str = "/ajax/waterMeter/getSmartWaterMeterConsumptions";

/// A running mock account server and the expectations registered on it.
pub struct MockThamesWaterServer {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl MockThamesWaterServer {
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Asserts every registered mock was hit as often as expected.
    pub async fn assert_all(&self) {
        for mock in &self.mocks {
            mock.assert_async().await;
        }
    }
}

/// Builder for creating mockito server mocks for the account endpoints.
pub struct MockThamesWaterServerBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl MockThamesWaterServerBuilder {
    /// Creates a new mock server builder.
    pub async fn new() -> Self {
        Self {
            server: Server::new_async().await,
            mocks: Vec::new(),
        }
    }

    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Adds a `getMeters` mock listing `meters` and the daily periods.
    pub async fn mock_meters(mut self, meters: &[&str], daily: &[&str]) -> Self {
        let mock = self
            .server
            .mock("GET", GET_METERS_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(fixtures::meters_json(meters, daily))
            .expect_at_least(1)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Adds a consumption mock for the day formatted as `DD-MM-YYYY`,
    /// expected to be requested exactly `hits` times.
    pub async fn mock_consumption(mut self, day: &str, lines: &[ConsumptionLine], hits: usize) -> Self {
        let date = parse_day_marker(day).expect("fixture day must parse").date();
        let mock = self
            .server
            .mock("GET", GET_CONSUMPTIONS_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("startDate".into(), date.day().to_string()),
                Matcher::UrlEncoded("startMonth".into(), date.month().to_string()),
                Matcher::UrlEncoded("startYear".into(), date.year().to_string()),
                Matcher::UrlEncoded("granularity".into(), "H".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(fixtures::consumption_json_from_lines(lines))
            .expect(hits)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Adds a mock for an error response.
    pub async fn mock_error(mut self, path: &str, status: u16, body: &str) -> Self {
        let mock = self
            .server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(status as usize)
            .with_body(body)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Builds and returns the configured mock server.
    pub fn build(self) -> MockThamesWaterServer {
        MockThamesWaterServer {
            server: self.server,
            mocks: self.mocks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::builders::TestConsumptionLinesBuilder;

    #[tokio::test]
    async fn test_mock_thames_water_server_builder() {
        let server = MockThamesWaterServerBuilder::new()
            .await
            .mock_meters(&[fixtures::constants::TEST_METER], &[fixtures::dates::MAR_01])
            .await
            .mock_consumption(
                fixtures::dates::MAR_01,
                &TestConsumptionLinesBuilder::new().full_day(0.0).build(),
                0,
            )
            .await
            .build();

        assert!(server.url().starts_with("http://"));
    }
}
