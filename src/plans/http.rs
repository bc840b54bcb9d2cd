//! HTTP plan generator — delegates plan synthesis to a remote service.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::error::GenerationError;
use crate::onboarding::OnboardingAnswers;

use super::PlanGenerator;
use super::model::PersonalizedPlan;

const GENERATOR_NAME: &str = "http";

/// Configuration for the remote plan service.
#[derive(Debug, Clone)]
pub struct HttpGeneratorConfig {
    /// Full URL the answers are POSTed to.
    pub endpoint: String,
    /// Optional bearer token.
    pub api_key: Option<SecretString>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpGeneratorConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Sends the answers as JSON and decodes the returned [`PersonalizedPlan`].
pub struct HttpPlanGenerator {
    client: reqwest::Client,
    config: HttpGeneratorConfig,
}

impl HttpPlanGenerator {
    pub fn new(config: HttpGeneratorConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::RequestFailed {
                generator: GENERATOR_NAME.to_string(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl PlanGenerator for HttpPlanGenerator {
    fn name(&self) -> &str {
        GENERATOR_NAME
    }

    async fn generate(
        &self,
        answers: OnboardingAnswers,
    ) -> Result<PersonalizedPlan, GenerationError> {
        let mut request = self.client.post(&self.config.endpoint).json(&answers);
        if let Some(ref key) = self.config.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout {
                    generator: GENERATOR_NAME.to_string(),
                    timeout: self.config.timeout,
                }
            } else {
                GenerationError::RequestFailed {
                    generator: GENERATOR_NAME.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                endpoint = %self.config.endpoint,
                status = status.as_u16(),
                "Plan service rejected request"
            );
            return Err(GenerationError::Status {
                generator: GENERATOR_NAME.to_string(),
                status: status.as_u16(),
            });
        }

        let plan: PersonalizedPlan =
            response
                .json()
                .await
                .map_err(|e| GenerationError::InvalidResponse {
                    generator: GENERATOR_NAME.to_string(),
                    reason: e.to_string(),
                })?;

        info!(
            endpoint = %self.config.endpoint,
            title = %plan.title,
            "Received plan from plan service"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::model::FitnessGoal;

    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};

    /// Serve `router` on a random local port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://127.0.0.1:{port}")
    }

    fn sample_plan() -> PersonalizedPlan {
        PersonalizedPlan {
            title: "Remote Plan".to_string(),
            description: "From the service".to_string(),
            workouts_per_week: 5,
            duration: "25 min".to_string(),
            exercises: Vec::new(),
        }
    }

    #[tokio::test]
    async fn posts_answers_and_decodes_plan() {
        let router = Router::new().route(
            "/plans",
            post(
                |headers: HeaderMap, Json(answers): Json<OnboardingAnswers>| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    let mut plan = sample_plan();
                    plan.description = format!(
                        "{} {}",
                        auth,
                        answers.primary_goal.map(|g| g.to_string()).unwrap_or_default()
                    );
                    Json(plan)
                },
            ),
        );
        let base = serve(router).await;

        let mut config = HttpGeneratorConfig::new(format!("{base}/plans"));
        config.api_key = Some(SecretString::from("secret-token"));
        let generator = HttpPlanGenerator::new(config).unwrap();

        let plan = generator
            .generate(OnboardingAnswers {
                primary_goal: Some(FitnessGoal::LoseWeight),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(plan.title, "Remote Plan");
        assert_eq!(plan.description, "Bearer secret-token lose_weight");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let router = Router::new().route(
            "/plans",
            post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let base = serve(router).await;
        let generator = HttpPlanGenerator::new(HttpGeneratorConfig::new(format!("{base}/plans")))
            .unwrap();

        let err = generator
            .generate(OnboardingAnswers::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let router = Router::new().route("/plans", post(|| async { "not json" }));
        let base = serve(router).await;
        let generator = HttpPlanGenerator::new(HttpGeneratorConfig::new(format!("{base}/plans")))
            .unwrap();

        let err = generator
            .generate(OnboardingAnswers::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let router = Router::new().route(
            "/plans",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(sample_plan())
            }),
        );
        let base = serve(router).await;
        let mut config = HttpGeneratorConfig::new(format!("{base}/plans"));
        config.timeout = Duration::from_millis(100);
        let generator = HttpPlanGenerator::new(config).unwrap();

        let err = generator
            .generate(OnboardingAnswers::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Timeout { .. }));
    }
}
