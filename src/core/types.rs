use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentParameters {
    pub monthly_investment: f64,
    pub annual_return_percent: f64,
    pub years: u32,
    pub step_up_percent: f64,
    pub inflation_rate_percent: f64,
}

/// One year of the step-up ledger, rounded to whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub year: u32,
    pub monthly_contribution_this_year: i64,
    pub yearly_contribution: i64,
    pub cumulative_contributed: i64,
    pub end_of_year_value: i64,
    pub gain: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub future_value_nominal: f64,
    pub total_contributed_nominal: f64,
    pub total_contributed_present_value: f64,
    pub nominal_gain: f64,
    pub future_value_real: f64,
    pub real_gain: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub year: u32,
    #[serde(rename = "normalSIPValue")]
    pub normal_sip_value: i64,
    #[serde(rename = "stepUpSIPValue")]
    pub step_up_sip_value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub normal: ResultSummary,
    pub step_up: ResultSummary,
    pub yearly_breakdown: Vec<YearRecord>,
    pub chart_series: Vec<ChartPoint>,
}
