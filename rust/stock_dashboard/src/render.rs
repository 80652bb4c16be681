// src/render.rs
//
// Pure projections of the fetch state into the five dashboard sections. A section is
// `None` whenever there is nothing to draw: no report yet, a request in flight, a failed
// request, or an empty slice of the report.

use chrono::NaiveDate;

use crate::controller::{FetchState, RequestId};
use crate::error::ErrorKind;
use crate::models::{IncomeStatement, PricePoint, StockAnalysis};

#[derive(Debug, Clone, PartialEq)]
pub enum StatusIndicator {
    Hidden,
    Loading(RequestId),
    Error { message: String, kind: ErrorKind },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverviewView<'a> {
    pub name: &'a str,
    pub sector: &'a str,
    pub industry: &'a str,
    pub country: &'a str,
    pub website: &'a str,
    pub price: f64,
    pub summary: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceChartView<'a> {
    /// Ascending by date, exactly as stored in the report.
    pub points: &'a [PricePoint],
    pub min: f64,
    pub max: f64,
}

impl PriceChartView<'_> {
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatioRow {
    pub label: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatioTableView {
    pub rows: Vec<RatioRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationItem<'a> {
    pub header: &'a str,
    pub description: String,
    pub firm: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationListView<'a> {
    pub items: Vec<RecommendationItem<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncomeChartView<'a> {
    /// Ascending by year, one group of bars per statement.
    pub bars: &'a [IncomeStatement],
    pub max: f64,
}

pub const TOTAL_REVENUE_LABEL: &str = "Total Revenue";
pub const NET_INCOME_LABEL: &str = "Net Income";

fn report(state: &FetchState) -> Option<&StockAnalysis> {
    state.analysis()
}

pub fn status(state: &FetchState) -> StatusIndicator {
    match state {
        FetchState::Idle | FetchState::Success(..) => StatusIndicator::Hidden,
        FetchState::Loading(id) => StatusIndicator::Loading(*id),
        FetchState::Error(err, _) => StatusIndicator::Error {
            message: err.user_message(),
            kind: err.kind(),
        },
    }
}

pub fn overview(state: &FetchState) -> Option<OverviewView<'_>> {
    let analysis = report(state)?;
    let info = analysis.company_info();

    Some(OverviewView {
        name: &info.name,
        sector: &info.sector,
        industry: &info.industry,
        country: &info.country,
        website: &info.website,
        price: analysis.current_price(),
        summary: &info.business_summary,
    })
}

pub fn price_chart(state: &FetchState) -> Option<PriceChartView<'_>> {
    let points = report(state)?.historical_prices();
    if points.is_empty() {
        return None;
    }

    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.price), hi.max(p.price))
        });

    Some(PriceChartView { points, min, max })
}

/// Display label for a ratio key: underscores become spaces, letters are uppercased.
pub fn humanize_ratio_key(key: &str) -> String {
    key.replace('_', " ").to_uppercase()
}

pub fn ratio_table(state: &FetchState) -> Option<RatioTableView> {
    let ratios = report(state)?.financial_ratios();
    if ratios.is_empty() {
        return None;
    }

    let rows = ratios
        .iter()
        .map(|(key, value)| RatioRow {
            label: humanize_ratio_key(key),
            value,
        })
        .collect();

    Some(RatioTableView { rows })
}

pub fn recommendation_list(state: &FetchState) -> Option<RecommendationListView<'_>> {
    let recommendations = report(state)?.analyst_recommendations();
    if recommendations.is_empty() {
        return None;
    }

    let items = recommendations
        .iter()
        .map(|rec| {
            let mut description = rec.recommendation.clone();
            if let Some(target) = rec.target_price {
                description.push_str(&format!(" - Target: ${target}"));
            }
            if let Some(firm) = &rec.firm {
                description.push_str(&format!(" ({firm})"));
            }

            RecommendationItem {
                header: &rec.date,
                description,
                firm: rec.firm.as_deref(),
            }
        })
        .collect();

    Some(RecommendationListView { items })
}

pub fn income_chart(state: &FetchState) -> Option<IncomeChartView<'_>> {
    let bars = report(state)?.income_statements();
    if bars.is_empty() {
        return None;
    }

    let max = bars
        .iter()
        .flat_map(|s| [s.total_revenue, s.net_income])
        .flatten()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));

    Some(IncomeChartView { bars, max })
}

/// Every section of the page for one state.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard<'a> {
    pub status: StatusIndicator,
    pub overview: Option<OverviewView<'a>>,
    pub price_chart: Option<PriceChartView<'a>>,
    pub ratio_table: Option<RatioTableView>,
    pub recommendations: Option<RecommendationListView<'a>>,
    pub income_chart: Option<IncomeChartView<'a>>,
}

impl<'a> Dashboard<'a> {
    pub fn project(state: &'a FetchState) -> Self {
        Dashboard {
            status: status(state),
            overview: overview(state),
            price_chart: price_chart(state),
            ratio_table: ratio_table(state),
            recommendations: recommendation_list(state),
            income_chart: income_chart(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use std::sync::Arc;

    const NVDA: &str = r#"{
        "stock_analysis": {
            "current_price": 500.0,
            "company_info": {
                "name": "NVIDIA Corporation",
                "sector": "Technology",
                "industry": "Semiconductors",
                "country": "United States",
                "business_summary": "Designs GPUs."
            },
            "historical_prices": [
                { "datevalue": "2024-01-03", "price": 500 },
                { "datevalue": "2024-01-02", "price": 495 }
            ],
            "financial_ratios": { "pe_ratio": 65.2, "debt_to_equity": 0.41 },
            "analyst_recommendations": [
                { "datevalue": "2024-02-01", "recommendation": "Buy", "target_price": 650, "firm": "Morgan Stanley" },
                { "datevalue": "2024-01-20", "recommendation": "Hold", "target_price": 520 }
            ],
            "income_statements": [
                { "year": 2023, "total_revenue": 60922000000, "net_income": 29760000000 },
                { "year": 2022, "total_revenue": 26974000000, "net_income": 4368000000 }
            ]
        }
    }"#;

    fn loaded(body: &str) -> FetchState {
        let analysis = StockAnalysis::from_json(body.as_bytes()).unwrap();
        FetchState::Success(Arc::new(analysis), RequestId::new(1))
    }

    #[test]
    fn test_sections_hidden_while_idle_or_loading() {
        let idle_state = FetchState::Idle;
        let idle = Dashboard::project(&idle_state);
        assert_eq!(idle.status, StatusIndicator::Hidden);
        assert!(idle.overview.is_none() && idle.price_chart.is_none());

        let loading_state = FetchState::Loading(RequestId::new(3));
        let loading = Dashboard::project(&loading_state);
        assert_eq!(loading.status, StatusIndicator::Loading(RequestId::new(3)));
        assert!(loading.ratio_table.is_none());
        assert!(loading.recommendations.is_none());
        assert!(loading.income_chart.is_none());
    }

    #[test]
    fn test_http_500_shows_only_error_indicator() {
        let state = FetchState::Error(FetchError::Http(500), RequestId::new(1));

        let dashboard = Dashboard::project(&state);

        assert!(matches!(
            dashboard.status,
            StatusIndicator::Error { kind: ErrorKind::Http(500), .. }
        ));
        assert!(dashboard.ratio_table.is_none());
        assert!(dashboard.price_chart.is_none());
        assert!(dashboard.overview.is_none());
    }

    #[test]
    fn test_overview_fields() {
        let state = loaded(NVDA);

        let view = overview(&state).unwrap();

        assert_eq!(view.name, "NVIDIA Corporation");
        assert_eq!(view.sector, "Technology");
        assert_eq!(view.country, "United States");
        assert_eq!(view.price, 500.0);
        assert_eq!(view.website, "");
    }

    #[test]
    fn test_price_chart_uses_normalized_points() {
        let state = loaded(NVDA);

        let chart = price_chart(&state).unwrap();

        let prices: Vec<f64> = chart.points.iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![495.0, 500.0]);
        assert_eq!((chart.min, chart.max), (495.0, 500.0));
        assert_eq!(chart.first_date().unwrap().to_string(), "2024-01-02");
        // projecting twice never reorders the stored series
        let again = price_chart(&state).unwrap();
        assert_eq!(chart.points, again.points);
    }

    #[test]
    fn test_ratio_labels_are_humanized() {
        let state = loaded(NVDA);

        let table = ratio_table(&state).unwrap();

        assert_eq!(
            table.rows,
            vec![
                RatioRow { label: "DEBT TO EQUITY".to_string(), value: Some(0.41) },
                RatioRow { label: "PE RATIO".to_string(), value: Some(65.2) },
            ]
        );
        assert_eq!(humanize_ratio_key("return_on_equity_ttm"), "RETURN ON EQUITY TTM");
    }

    #[test]
    fn test_recommendation_without_firm_has_no_annotation() {
        let state = loaded(NVDA);

        let list = recommendation_list(&state).unwrap();

        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].header, "2024-02-01");
        assert_eq!(list.items[0].description, "Buy - Target: $650 (Morgan Stanley)");
        assert_eq!(list.items[1].description, "Hold - Target: $520");
        assert_eq!(list.items[1].firm, None);
    }

    #[test]
    fn test_income_chart_ascending_years() {
        let state = loaded(NVDA);

        let chart = income_chart(&state).unwrap();

        let years: Vec<i32> = chart.bars.iter().map(|s| s.year).collect();
        assert_eq!(years, vec![2022, 2023]);
        assert_eq!(chart.max, 60922000000.0);
    }

    #[test]
    fn test_empty_sections_render_nothing() {
        let state = loaded(
            r#"{ "stock_analysis": { "current_price": 12, "company_info": { "name": "Quiet Co" } } }"#,
        );

        let dashboard = Dashboard::project(&state);

        assert_eq!(dashboard.status, StatusIndicator::Hidden);
        assert!(dashboard.overview.is_some());
        assert!(dashboard.price_chart.is_none());
        assert!(dashboard.ratio_table.is_none());
        assert!(dashboard.recommendations.is_none());
        assert!(dashboard.income_chart.is_none());
    }
}
