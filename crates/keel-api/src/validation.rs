//! Request bodies, query parameters and their validation rules.

use serde::Deserialize;

use keel_core::Environment;

use crate::error::ApiError;

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

const MAX_APPLICATION_LEN: usize = 100;
const MAX_VERSION_LEN: usize = 50;
const MAX_DEPLOYED_BY_LEN: usize = 100;

/// Body of `POST /deployments`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeploymentRequest {
    pub application: String,
    pub version: String,
    pub environment: String,
    #[serde(default)]
    pub deployed_by: Option<String>,
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDeployment {
    pub application: String,
    pub version: String,
    pub environment: Environment,
    pub deployed_by: Option<String>,
}

impl CreateDeploymentRequest {
    pub fn validate(self) -> Result<ValidDeployment, ApiError> {
        check_len("application", &self.application, 1, MAX_APPLICATION_LEN)?;
        check_len("version", &self.version, 1, MAX_VERSION_LEN)?;
        if let Some(by) = &self.deployed_by {
            check_len("deployed_by", by, 0, MAX_DEPLOYED_BY_LEN)?;
        }
        let environment = self
            .environment
            .parse::<Environment>()
            .map_err(|e| ApiError::Validation(e.to_string()))?;

        Ok(ValidDeployment {
            application: self.application,
            version: self.version,
            environment,
            deployed_by: self.deployed_by,
        })
    }
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ApiError::Validation(format!(
            "{field} must be between {min} and {max} characters (got {len})"
        )));
    }
    Ok(())
}

/// Query of `GET /deployments`. Signed so negative input reaches validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ListQuery {
    /// Resolve to `(page, page_size)` with defaults applied.
    pub fn validate(&self) -> Result<(usize, usize), ApiError> {
        let page = match self.page {
            None => DEFAULT_PAGE,
            Some(p) if p >= 1 => usize::try_from(p)
                .map_err(|_| ApiError::Validation(format!("page {p} is out of range")))?,
            Some(p) => return Err(ApiError::Validation(format!("page must be >= 1 (got {p})"))),
        };
        let page_size = match self.page_size {
            None => DEFAULT_PAGE_SIZE,
            Some(n) if (1..=MAX_PAGE_SIZE as i64).contains(&n) => n as usize,
            Some(n) => {
                return Err(ApiError::Validation(format!(
                    "page_size must be between 1 and {MAX_PAGE_SIZE} (got {n})"
                )));
            }
        };
        Ok((page, page_size))
    }
}

/// Query of `POST /deployments/{id}/complete`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteQuery {
    pub success: Option<bool>,
    pub error: Option<String>,
}

impl CompleteQuery {
    pub fn success(&self) -> bool {
        self.success.unwrap_or(true)
    }
}
