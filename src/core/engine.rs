use super::types::{ChartPoint, InvestmentParameters, Projection, ResultSummary, YearRecord};

const MONTHS_PER_YEAR: u32 = 12;
const CHART_TARGET_POINTS: u32 = 10;

/// Full-precision state at the end of one simulated year. Never rounded; the
/// public ledger is derived from it through `round_ledger`.
#[derive(Debug, Clone, Copy)]
struct SimulatedYear {
    year: u32,
    monthly_contribution: f64,
    yearly_contribution: f64,
    cumulative_contributed: f64,
    end_balance: f64,
}

/// Rounds a simulated ledger to whole currency units. Only the monthly
/// contribution and the balance are rounded from full precision; the other
/// fields are derived from those so every emitted row adds up exactly.
fn round_ledger(simulated: &[SimulatedYear]) -> Vec<YearRecord> {
    let mut cumulative: i64 = 0;
    simulated
        .iter()
        .map(|sim| {
            let monthly = round_currency(sim.monthly_contribution);
            let yearly = monthly.saturating_mul(i64::from(MONTHS_PER_YEAR));
            cumulative = cumulative.saturating_add(yearly);
            let end_of_year_value = round_currency(sim.end_balance);
            YearRecord {
                year: sim.year,
                monthly_contribution_this_year: monthly,
                yearly_contribution: yearly,
                cumulative_contributed: cumulative,
                end_of_year_value,
                gain: end_of_year_value.saturating_sub(cumulative),
            }
        })
        .collect()
}

/// Recomputes every derived figure for one parameter set.
pub fn project(params: &InvestmentParameters) -> Projection {
    let (normal, step_up) = summarize(params);
    Projection {
        normal,
        step_up,
        yearly_breakdown: yearly_breakdown(
            params.monthly_investment,
            params.annual_return_percent,
            params.years,
            params.step_up_percent,
        ),
        chart_series: chart_series(
            params.monthly_investment,
            params.annual_return_percent,
            params.years,
            params.step_up_percent,
        ),
    }
}

/// Future value of a level monthly contribution paid at the start of each month.
pub fn constant_contribution_future_value(
    monthly_investment: f64,
    annual_return_percent: f64,
    years: u32,
) -> f64 {
    let rate = monthly_rate(annual_return_percent);
    let months = months_in(years);
    if rate == 0.0 {
        return monthly_investment * f64::from(months);
    }
    let compounded = (1.0 + rate).powi(exponent(months));
    monthly_investment * (compounded - 1.0) / rate * (1.0 + rate)
}

/// Future value when the monthly contribution is raised by `step_up_percent`
/// after every twelve months.
pub fn step_up_contribution_future_value(
    monthly_investment: f64,
    annual_return_percent: f64,
    years: u32,
    step_up_percent: f64,
) -> f64 {
    simulate_contributions(
        monthly_investment,
        annual_return_percent,
        years,
        step_up_percent,
    )
    .last()
    .map_or(0.0, |last| last.end_balance)
}

pub fn discount_for_inflation(future_value: f64, inflation_rate_percent: f64, years: u32) -> f64 {
    future_value / growth_factor(inflation_rate_percent).powi(exponent(years))
}

pub fn yearly_breakdown(
    monthly_investment: f64,
    annual_return_percent: f64,
    years: u32,
    step_up_percent: f64,
) -> Vec<YearRecord> {
    round_ledger(&simulate_contributions(
        monthly_investment,
        annual_return_percent,
        years,
        step_up_percent,
    ))
}

/// Sparse overlay of the constant and step-up balances. Samples every
/// `max(1, years / 10)` years and always includes the final year.
pub fn chart_series(
    monthly_investment: f64,
    annual_return_percent: f64,
    years: u32,
    step_up_percent: f64,
) -> Vec<ChartPoint> {
    let constant = simulate_contributions(monthly_investment, annual_return_percent, years, 0.0);
    let stepped = simulate_contributions(
        monthly_investment,
        annual_return_percent,
        years,
        step_up_percent,
    );
    let stride = (years / CHART_TARGET_POINTS).max(1);

    constant
        .iter()
        .zip(&stepped)
        .filter(|(normal, _)| normal.year % stride == 0 || normal.year == years)
        .map(|(normal, step_up)| ChartPoint {
            year: normal.year,
            normal_sip_value: round_currency(normal.end_balance),
            step_up_sip_value: round_currency(step_up.end_balance),
        })
        .collect()
}

/// Returns the `(normal, step_up)` summaries.
pub fn summarize(params: &InvestmentParameters) -> (ResultSummary, ResultSummary) {
    let m = params.monthly_investment;
    let years = params.years;
    let inflation = params.inflation_rate_percent;

    let normal = build_summary(
        constant_contribution_future_value(m, params.annual_return_percent, years),
        m * f64::from(months_in(years)),
        present_value_of_contributions(m, years, 0.0, inflation),
        inflation,
        years,
    );

    let stepped = simulate_contributions(
        m,
        params.annual_return_percent,
        years,
        params.step_up_percent,
    );
    let (step_up_value, step_up_contributed) = stepped
        .last()
        .map_or((0.0, 0.0), |last| (last.end_balance, last.cumulative_contributed));
    let step_up = build_summary(
        step_up_value,
        step_up_contributed,
        present_value_of_contributions(m, years, params.step_up_percent, inflation),
        inflation,
        years,
    );

    (normal, step_up)
}

fn build_summary(
    future_value: f64,
    contributed: f64,
    contributed_present_value: f64,
    inflation_rate_percent: f64,
    years: u32,
) -> ResultSummary {
    let future_value_real = discount_for_inflation(future_value, inflation_rate_percent, years);
    ResultSummary {
        future_value_nominal: future_value,
        total_contributed_nominal: contributed,
        total_contributed_present_value: contributed_present_value,
        nominal_gain: future_value - contributed,
        future_value_real,
        real_gain: future_value_real - contributed_present_value,
    }
}

/// Discounts each monthly contribution individually by the elapsed time in
/// years, with the first contribution made at time zero.
fn present_value_of_contributions(
    monthly_investment: f64,
    years: u32,
    step_up_percent: f64,
    inflation_rate_percent: f64,
) -> f64 {
    if is_empty_plan(monthly_investment, years) {
        return 0.0;
    }
    let inflation = growth_factor(inflation_rate_percent);
    let step_up = growth_factor(step_up_percent);
    let mut contribution = monthly_investment;
    let mut present_value = 0.0;
    for year in 0..years {
        for month in 0..MONTHS_PER_YEAR {
            let elapsed_years = (f64::from(year) * 12.0 + f64::from(month)) / 12.0;
            present_value += contribution / inflation.powf(elapsed_years);
        }
        contribution *= step_up;
    }
    present_value
}

fn simulate_contributions(
    monthly_investment: f64,
    annual_return_percent: f64,
    years: u32,
    step_up_percent: f64,
) -> Vec<SimulatedYear> {
    if is_empty_plan(monthly_investment, years) {
        return Vec::new();
    }

    let rate = monthly_rate(annual_return_percent);
    let step_up = growth_factor(step_up_percent);
    let mut contribution = monthly_investment;
    let mut balance = 0.0;
    let mut cumulative = 0.0;
    let mut simulated = Vec::with_capacity(years as usize);

    for year in 1..=years {
        let mut yearly = 0.0;
        for _ in 0..MONTHS_PER_YEAR {
            balance = (balance + contribution) * (1.0 + rate);
            yearly += contribution;
        }
        cumulative += yearly;
        simulated.push(SimulatedYear {
            year,
            monthly_contribution: contribution,
            yearly_contribution: yearly,
            cumulative_contributed: cumulative,
            end_balance: balance,
        });
        contribution *= step_up;
    }

    simulated
}

// Zero horizon or zero contribution yields no ledger rows at all.
fn is_empty_plan(monthly_investment: f64, years: u32) -> bool {
    years == 0 || monthly_investment == 0.0
}

fn months_in(years: u32) -> u32 {
    years.saturating_mul(MONTHS_PER_YEAR)
}

fn exponent(periods: u32) -> i32 {
    i32::try_from(periods).unwrap_or(i32::MAX)
}

fn monthly_rate(annual_return_percent: f64) -> f64 {
    annual_return_percent / 12.0 / 100.0
}

fn growth_factor(percent: f64) -> f64 {
    1.0 + percent / 100.0
}

fn round_currency(value: f64) -> i64 {
    value.round() as i64
}
