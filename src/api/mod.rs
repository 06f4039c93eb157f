use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::{ExportError, InvestmentParameters, Projection, project, yearly_breakdown_csv};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const CSV_FILENAME: &str = "sip-yearly-breakdown.csv";

// Slider bounds exposed by the parameter form.
const MONTHLY_INVESTMENT_RANGE: (f64, f64) = (500.0, 1_000_000.0);
const ANNUAL_RETURN_RANGE: (f64, f64) = (1.0, 30.0);
const YEARS_RANGE: (f64, f64) = (1.0, 40.0);
const STEP_UP_RANGE: (f64, f64) = (0.0, 50.0);
const INFLATION_RANGE: (f64, f64) = (0.0, 15.0);

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Summary,
    Json,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{flag} must be a finite number")]
    NotFinite { flag: &'static str },
    #[error("{flag} must be between {min} and {max}")]
    OutOfRange {
        flag: &'static str,
        min: f64,
        max: f64,
    },
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Args(#[from] clap::Error),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Args(_) | ApiError::Input(_) => StatusCode::BAD_REQUEST,
            ApiError::Export(_) | ApiError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {self}");
        } else {
            warn!("rejected request: {self}");
        }
        error_response(status, &self.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    #[serde(alias = "monthly_investment")]
    monthly_investment: Option<f64>,
    #[serde(alias = "annualReturnPercent", alias = "annual_return")]
    annual_return: Option<f64>,
    years: Option<u32>,
    #[serde(alias = "stepUpPercent", alias = "step_up")]
    step_up: Option<f64>,
    #[serde(alias = "inflationRatePercent", alias = "inflation_rate")]
    inflation_rate: Option<f64>,
}

#[derive(Parser, Debug)]
#[command(
    name = "sip-planner",
    about = "Monthly SIP projection with annual step-up and inflation-adjusted returns",
    after_help = "Run `sip-planner serve [port]` to start the web calculator instead."
)]
struct Cli {
    #[arg(long, default_value_t = 5000.0, help = "Monthly contribution amount")]
    monthly_investment: f64,
    #[arg(
        long,
        default_value_t = 12.0,
        help = "Expected annual return in percent, e.g. 12"
    )]
    annual_return: f64,
    #[arg(long, default_value_t = 10, help = "Investment horizon in years")]
    years: u32,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Annual increase of the monthly contribution in percent"
    )]
    step_up: f64,
    #[arg(
        long,
        default_value_t = 6.0,
        help = "Expected annual inflation in percent"
    )]
    inflation_rate: f64,
    #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionResponse {
    parameters: InvestmentParameters,
    #[serde(flatten)]
    projection: Projection,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_params(cli: &Cli) -> Result<InvestmentParameters, InputError> {
    let monthly_investment = check_range(
        "--monthly-investment",
        cli.monthly_investment,
        MONTHLY_INVESTMENT_RANGE,
    )?;
    let annual_return_percent =
        check_range("--annual-return", cli.annual_return, ANNUAL_RETURN_RANGE)?;
    check_range("--years", f64::from(cli.years), YEARS_RANGE)?;
    let step_up_percent = check_range("--step-up", cli.step_up, STEP_UP_RANGE)?;
    let inflation_rate_percent =
        check_range("--inflation-rate", cli.inflation_rate, INFLATION_RANGE)?;

    Ok(InvestmentParameters {
        monthly_investment,
        annual_return_percent,
        years: cli.years,
        step_up_percent,
        inflation_rate_percent,
    })
}

fn check_range(flag: &'static str, value: f64, (min, max): (f64, f64)) -> Result<f64, InputError> {
    if !value.is_finite() {
        return Err(InputError::NotFinite { flag });
    }
    if !(min..=max).contains(&value) {
        return Err(InputError::OutOfRange { flag, min, max });
    }
    Ok(value)
}

/// Parses command-line flags, runs one projection and renders it in the
/// requested format.
pub fn run_cli<I, T>(args: I) -> Result<String, ApiError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)?;
    let params = build_params(&cli)?;
    let projection = project(&params);
    debug!("computed projection for {params:?}");

    match cli.format {
        OutputFormat::Summary => Ok(render_summary(&params, &projection)),
        OutputFormat::Json => {
            let response = ProjectionResponse {
                parameters: params,
                projection,
            };
            Ok(format!("{}\n", serde_json::to_string_pretty(&response)?))
        }
        OutputFormat::Csv => Ok(yearly_breakdown_csv(&projection.yearly_breakdown)?),
    }
}

fn render_summary(params: &InvestmentParameters, projection: &Projection) -> String {
    let mut lines = vec![
        format!(
            "Monthly investment {:.0}, return {}%, {} years, step-up {}%, inflation {}%",
            params.monthly_investment,
            params.annual_return_percent,
            params.years,
            params.step_up_percent,
            params.inflation_rate_percent,
        ),
        format!("{:<28}{:>16}{:>16}", "", "Normal SIP", "Step-up SIP"),
    ];

    let normal = &projection.normal;
    let step_up = &projection.step_up;
    let rows = [
        (
            "Future value",
            normal.future_value_nominal,
            step_up.future_value_nominal,
        ),
        (
            "Total invested",
            normal.total_contributed_nominal,
            step_up.total_contributed_nominal,
        ),
        ("Returns", normal.nominal_gain, step_up.nominal_gain),
        (
            "Future value (real)",
            normal.future_value_real,
            step_up.future_value_real,
        ),
        (
            "Total invested (real)",
            normal.total_contributed_present_value,
            step_up.total_contributed_present_value,
        ),
        ("Returns (real)", normal.real_gain, step_up.real_gain),
    ];
    lines.extend(rows.iter().map(|(label, normal_value, step_up_value)| {
        format!("{label:<28}{normal_value:>16.0}{step_up_value:>16.0}")
    }));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("SIP planner HTTP API listening on http://{addr}");
    info!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, router()).await
}

fn router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/projection",
            get(projection_get_handler).post(projection_post_handler),
        )
        .route("/api/projection.csv", get(projection_csv_handler))
        .fallback(not_found_handler)
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn projection_get_handler(
    Query(payload): Query<ProjectionPayload>,
) -> Result<Response, ApiError> {
    projection_handler_impl(payload)
}

async fn projection_post_handler(
    Json(payload): Json<ProjectionPayload>,
) -> Result<Response, ApiError> {
    projection_handler_impl(payload)
}

fn projection_handler_impl(payload: ProjectionPayload) -> Result<Response, ApiError> {
    let params = params_from_payload(payload)?;
    let projection = project(&params);
    debug!(
        "projection for {params:?}: normal {:.2}, step-up {:.2}",
        projection.normal.future_value_nominal, projection.step_up.future_value_nominal
    );
    Ok(json_response(
        StatusCode::OK,
        ProjectionResponse {
            parameters: params,
            projection,
        },
    ))
}

async fn projection_csv_handler(
    Query(payload): Query<ProjectionPayload>,
) -> Result<Response, ApiError> {
    let params = params_from_payload(payload)?;
    let projection = project(&params);
    let body = yearly_breakdown_csv(&projection.yearly_breakdown)?;
    let disposition = format!("attachment; filename=\"{CSV_FILENAME}\"");
    Ok(with_cache_control((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )))
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn params_from_json(json: &str) -> Result<InvestmentParameters, String> {
    let payload = serde_json::from_str::<ProjectionPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    params_from_payload(payload).map_err(|e| e.to_string())
}

fn params_from_payload(payload: ProjectionPayload) -> Result<InvestmentParameters, InputError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.monthly_investment {
        cli.monthly_investment = v;
    }
    if let Some(v) = payload.annual_return {
        cli.annual_return = v;
    }
    if let Some(v) = payload.years {
        cli.years = v;
    }
    if let Some(v) = payload.step_up {
        cli.step_up = v;
    }
    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }

    build_params(&cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        monthly_investment: 5_000.0,
        annual_return: 12.0,
        years: 10,
        step_up: 10.0,
        inflation_rate: 6.0,
        format: OutputFormat::Json,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::YEARLY_BREAKDOWN_HEADER;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        String::from_utf8(bytes.to_vec()).expect("body should be UTF-8")
    }

    #[test]
    fn build_params_accepts_defaults() {
        let params = build_params(&sample_cli()).expect("valid params");
        assert_approx(params.monthly_investment, 5_000.0);
        assert_approx(params.annual_return_percent, 12.0);
        assert_eq!(params.years, 10);
        assert_approx(params.step_up_percent, 10.0);
        assert_approx(params.inflation_rate_percent, 6.0);
    }

    #[test]
    fn build_params_accepts_range_bounds() {
        let mut cli = sample_cli();
        cli.monthly_investment = 500.0;
        cli.annual_return = 30.0;
        cli.years = 40;
        cli.step_up = 0.0;
        cli.inflation_rate = 15.0;
        assert!(build_params(&cli).is_ok());
    }

    #[test]
    fn build_params_rejects_zero_years() {
        let mut cli = sample_cli();
        cli.years = 0;
        let err = build_params(&cli).expect_err("must reject zero years");
        assert_eq!(err.to_string(), "--years must be between 1 and 40");
    }

    #[test]
    fn build_params_rejects_negative_investment() {
        let mut cli = sample_cli();
        cli.monthly_investment = -100.0;
        let err = build_params(&cli).expect_err("must reject negative investment");
        assert!(err.to_string().contains("--monthly-investment"));
    }

    #[test]
    fn build_params_rejects_non_finite_values() {
        let mut cli = sample_cli();
        cli.inflation_rate = f64::NAN;
        let err = build_params(&cli).expect_err("must reject NaN");
        assert_eq!(
            err,
            InputError::NotFinite {
                flag: "--inflation-rate"
            }
        );

        let mut cli = sample_cli();
        cli.step_up = f64::INFINITY;
        let err = build_params(&cli).expect_err("must reject infinity");
        assert!(err.to_string().contains("--step-up"));
    }

    #[test]
    fn params_from_json_parses_web_keys() {
        let params = params_from_json(
            r#"{
                "monthlyInvestment": 1000,
                "annualReturn": 8.5,
                "years": 25,
                "stepUp": 5,
                "inflationRate": 3
            }"#,
        )
        .expect("valid payload");
        assert_approx(params.monthly_investment, 1_000.0);
        assert_approx(params.annual_return_percent, 8.5);
        assert_eq!(params.years, 25);
        assert_approx(params.step_up_percent, 5.0);
        assert_approx(params.inflation_rate_percent, 3.0);
    }

    #[test]
    fn params_from_json_accepts_engine_field_names() {
        let params = params_from_json(
            r#"{"annualReturnPercent": 9, "stepUpPercent": 0, "inflationRatePercent": 4}"#,
        )
        .expect("valid payload");
        assert_approx(params.annual_return_percent, 9.0);
        assert_approx(params.step_up_percent, 0.0);
        assert_approx(params.inflation_rate_percent, 4.0);
        assert_approx(params.monthly_investment, 5_000.0);
    }

    #[test]
    fn params_from_json_rejects_out_of_range_return() {
        let err = params_from_json(r#"{"annualReturn": 45}"#).expect_err("must reject");
        assert_eq!(err, "--annual-return must be between 1 and 30");
    }

    #[test]
    fn params_from_json_reports_malformed_payload() {
        let err = params_from_json(r#"{"years": "ten"}"#).expect_err("must reject");
        assert!(err.starts_with("Invalid API JSON payload"));
    }

    #[test]
    fn projection_response_serialization_contains_expected_fields() {
        let params = build_params(&sample_cli()).expect("valid params");
        let response = ProjectionResponse {
            parameters: params,
            projection: project(&params),
        };
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"parameters\""));
        assert!(json.contains("\"monthlyInvestment\""));
        assert!(json.contains("\"normal\""));
        assert!(json.contains("\"stepUp\""));
        assert!(json.contains("\"futureValueNominal\""));
        assert!(json.contains("\"totalContributedPresentValue\""));
        assert!(json.contains("\"yearlyBreakdown\""));
        assert!(json.contains("\"monthlyContributionThisYear\""));
        assert!(json.contains("\"chartSeries\""));
        assert!(json.contains("\"normalSIPValue\""));
        assert!(json.contains("\"stepUpSIPValue\""));
    }

    #[test]
    fn run_cli_renders_summary_by_default() {
        let output = run_cli(["sip-planner"]).expect("cli should run");
        assert!(output.contains("Normal SIP"));
        assert!(output.contains("Step-up SIP"));
        assert!(output.contains("1161695"));
    }

    #[test]
    fn render_summary_emits_one_line_per_figure() {
        let params = build_params(&sample_cli()).expect("valid params");
        let summary = render_summary(&params, &project(&params));
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(summary.ends_with('\n'));
        assert!(lines[0].starts_with("Monthly investment 5000, return 12%, 10 years"));
        let invested = lines
            .iter()
            .find(|line| line.starts_with("Total invested "))
            .expect("total invested row");
        assert!(invested.contains("600000"));
    }

    #[test]
    fn run_cli_renders_csv_breakdown() {
        let output = run_cli([
            "sip-planner",
            "--monthly-investment",
            "1000",
            "--years",
            "3",
            "--format",
            "csv",
        ])
        .expect("cli should run");
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], YEARLY_BREAKDOWN_HEADER.join(","));
        assert!(lines[1].starts_with("1,1000,12000,12000,"));
    }

    #[test]
    fn run_cli_renders_json() {
        let output = run_cli(["sip-planner", "--format", "json", "--years", "20"])
            .expect("cli should run");
        let value: serde_json::Value = serde_json::from_str(&output).expect("valid json");
        assert_eq!(value["parameters"]["years"], 20);
        assert_eq!(value["yearlyBreakdown"].as_array().map(Vec::len), Some(20));
        assert_eq!(value["chartSeries"].as_array().map(Vec::len), Some(10));
    }

    #[test]
    fn run_cli_rejects_invalid_flags() {
        let err = run_cli(["sip-planner", "--step-up", "75"]).expect_err("must reject");
        assert!(matches!(err, ApiError::Input(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = run_cli(["sip-planner", "--years", "many"]).expect_err("must reject");
        assert!(matches!(err, ApiError::Args(_)));
    }

    #[test]
    fn input_errors_map_to_bad_request_responses() {
        let response = ApiError::from(InputError::OutOfRange {
            flag: "--years",
            min: 1.0,
            max: 40.0,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&header::HeaderValue::from_static("no-store"))
        );
    }

    #[tokio::test]
    async fn projection_handler_returns_json_projection() {
        let payload = ProjectionPayload {
            monthly_investment: Some(1_000.0),
            annual_return: Some(1.0),
            years: Some(5),
            step_up: Some(0.0),
            inflation_rate: Some(0.0),
        };
        let response = projection_get_handler(Query(payload))
            .await
            .expect("valid request");
        assert_eq!(response.status(), StatusCode::OK);

        let value: serde_json::Value =
            serde_json::from_str(&body_text(response).await).expect("valid json");
        let records = value["yearlyBreakdown"].as_array().expect("breakdown array");
        assert_eq!(records.len(), 5);
        assert_eq!(records[4]["cumulativeContributed"], 60_000);
        assert_eq!(value["chartSeries"][4]["year"], 5);
    }

    #[tokio::test]
    async fn projection_csv_handler_returns_attachment() {
        let payload = ProjectionPayload {
            years: Some(12),
            ..ProjectionPayload::default()
        };
        let response = projection_csv_handler(Query(payload))
            .await
            .expect("valid request");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION),
            Some(&header::HeaderValue::from_static(
                "attachment; filename=\"sip-yearly-breakdown.csv\""
            ))
        );

        let body = body_text(response).await;
        assert_eq!(body.lines().count(), 13);
        assert!(body.starts_with("Year,Monthly SIP,"));
    }

    #[tokio::test]
    async fn projection_csv_handler_rejects_invalid_query() {
        let payload = ProjectionPayload {
            years: Some(90),
            ..ProjectionPayload::default()
        };
        let Err(err) = projection_csv_handler(Query(payload)).await else {
            panic!("must reject out-of-range years");
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
