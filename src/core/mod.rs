mod engine;
mod export;
mod types;

pub use engine::{
    chart_series, constant_contribution_future_value, discount_for_inflation, project,
    step_up_contribution_future_value, summarize, yearly_breakdown,
};
pub use export::{
    ExportError, YEARLY_BREAKDOWN_HEADER, write_yearly_breakdown_csv, yearly_breakdown_csv,
};
pub use types::{ChartPoint, InvestmentParameters, Projection, ResultSummary, YearRecord};
