//! Configuration utilities for testing.
//!
//! This module provides test configuration builders for the settings that
//! are otherwise loaded from the environment.

use crate::config::{ChromeConfig, ThamesWaterConfig, TsdbConfig};
use std::path::Path;

/// Builder for creating test Thames Water configurations.
#[derive(Debug)]
pub struct TestThamesWaterConfigBuilder {
    email: String,
    password: String,
    login_timeout_sec: u64,
    base_url: String,
}

impl TestThamesWaterConfigBuilder {
    /// Creates a new test config builder with default values.
    pub fn new() -> Self {
        Self {
            email: "test@example.com".to_string(),
            password: "test_password".to_string(),
            login_timeout_sec: 5,
            base_url: "http://test.local".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_login_timeout_sec(mut self, seconds: u64) -> Self {
        self.login_timeout_sec = seconds;
        self
    }

    pub fn build(self) -> ThamesWaterConfig {
        ThamesWaterConfig {
            email: self.email,
            password: self.password,
            login_timeout_sec: self.login_timeout_sec,
            base_url: self.base_url,
        }
    }
}

/// Builder for creating test WebDriver configurations.
#[derive(Debug)]
pub struct TestChromeConfigBuilder {
    webdriver_url: String,
    headless: bool,
    sandbox: bool,
    element_timeout_sec: u64,
}

impl TestChromeConfigBuilder {
    pub fn new() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            sandbox: true,
            element_timeout_sec: 1,
        }
    }

    pub fn with_webdriver_url(mut self, url: impl Into<String>) -> Self {
        self.webdriver_url = url.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn build(self) -> ChromeConfig {
        ChromeConfig {
            webdriver_url: self.webdriver_url,
            headless: self.headless,
            sandbox: self.sandbox,
            element_timeout_sec: self.element_timeout_sec,
        }
    }
}

/// Builder for creating test store configurations.
#[derive(Debug)]
pub struct TestTsdbConfigBuilder {
    path: String,
    block_duration_sec: u64,
    retention_days: u64,
    external_labels: String,
}

impl TestTsdbConfigBuilder {
    /// Creates a builder storing under `path`.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.display().to_string(),
            block_duration_sec: 2 * 60 * 60,
            retention_days: 90,
            external_labels: "cluster=test-cluster".to_string(),
        }
    }

    pub fn with_external_labels(mut self, labels: impl Into<String>) -> Self {
        self.external_labels = labels.into();
        self
    }

    pub fn build(self) -> TsdbConfig {
        TsdbConfig {
            path: self.path,
            block_duration_sec: self.block_duration_sec,
            retention_days: self.retention_days,
            external_labels: self.external_labels,
        }
    }
}
