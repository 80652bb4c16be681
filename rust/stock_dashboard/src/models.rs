// src/models.rs

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use validator::Validate;

use crate::error::ParseError;
use crate::loader::{
    self, RawCompanyInfo, RawIncomeStatement, RawPricePoint, RawRecommendation, RawStockAnalysis,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompanyInfo {
    pub name: String,
    pub sector: String,
    pub industry: String,
    pub country: String,
    pub website: String,
    pub business_summary: String,
}

impl CompanyInfo {
    fn from_raw(raw: RawCompanyInfo) -> Result<Self, ParseError> {
        let name = raw
            .name
            .ok_or(ParseError::MissingField("company_info.name"))?;

        Ok(CompanyInfo {
            name,
            sector: raw.sector.unwrap_or_default(),
            industry: raw.industry.unwrap_or_default(),
            country: raw.country.unwrap_or_default(),
            website: raw.website.unwrap_or_default(),
            business_summary: raw.business_summary.unwrap_or_default(),
        })
    }
}

// Closing price on one trading day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    // Ok(None) when the point is incomplete and cannot be charted
    fn from_raw(raw: RawPricePoint) -> Result<Option<Self>, ParseError> {
        match (raw.date, raw.price) {
            (Some(date), Some(price)) => Ok(Some(PricePoint {
                date: parse_iso_date(&date)?,
                price,
            })),
            (date, price) => {
                log::warn!("Dropping incomplete price point (date: {date:?}, price: {price:?})");
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub date: String,
    pub recommendation: String,
    pub target_price: Option<f64>,
    /// `None` when the backend did not name the firm.
    pub firm: Option<String>,
}

impl From<RawRecommendation> for Recommendation {
    fn from(raw: RawRecommendation) -> Self {
        Recommendation {
            date: raw.date.unwrap_or_default(),
            recommendation: raw.recommendation.unwrap_or_default(),
            target_price: raw.target_price,
            firm: raw
                .firm
                .map(|firm| firm.trim().to_string())
                .filter(|firm| !firm.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncomeStatement {
    pub year: i32,
    pub total_revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub operating_income: Option<f64>,
    pub net_income: Option<f64>,
    pub eps: Option<f64>,
}

impl IncomeStatement {
    fn from_raw(raw: RawIncomeStatement) -> Option<Self> {
        let Some(year) = raw.year else {
            log::warn!("Dropping income statement without a year");
            return None;
        };

        Some(IncomeStatement {
            year,
            total_revenue: raw.total_revenue,
            gross_profit: raw.gross_profit,
            operating_income: raw.operating_income,
            net_income: raw.net_income,
            eps: raw.eps,
        })
    }
}

/// Ratio name to value, in a fixed order for the lifetime of one response.
///
/// Keys are kept exactly as the backend sent them; turning `pe_ratio` into a label is
/// the display layer's job. A `None` value means the backend reported the ratio as null.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinancialRatios {
    entries: Vec<(String, Option<f64>)>,
}

impl FinancialRatios {
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> + '_ {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), *value))
    }

    pub fn get(&self, key: &str) -> Option<Option<f64>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<BTreeMap<String, Option<f64>>> for FinancialRatios {
    fn from(map: BTreeMap<String, Option<f64>>) -> Self {
        FinancialRatios {
            entries: map.into_iter().collect(),
        }
    }
}

/// Normalized analysis report for one symbol.
///
/// Built once from the backend payload and never mutated afterwards: price history is
/// ascending by date and income statements ascending by year.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct StockAnalysis {
    company_info: CompanyInfo,
    #[validate(range(min = 0.0))]
    current_price: f64,
    historical_prices: Vec<PricePoint>,
    financial_ratios: FinancialRatios,
    analyst_recommendations: Vec<Recommendation>,
    income_statements: Vec<IncomeStatement>,
}

impl StockAnalysis {
    // Decode and normalize a full response body
    pub fn from_json(body: &[u8]) -> Result<Self, ParseError> {
        let response = loader::parse_payload(body)?;
        Self::from_payload(response.stock_analysis)
    }

    pub fn from_payload(raw: RawStockAnalysis) -> Result<Self, ParseError> {
        let company_info = CompanyInfo::from_raw(
            raw.company_info
                .ok_or(ParseError::MissingField("company_info"))?,
        )?;
        let current_price = raw
            .current_price
            .ok_or(ParseError::MissingField("current_price"))?;

        let mut historical_prices = Vec::new();
        for point in raw.historical_prices.unwrap_or_default() {
            if let Some(point) = PricePoint::from_raw(point)? {
                historical_prices.push(point);
            }
        }

        let income_statements = raw
            .income_statements
            .unwrap_or_default()
            .into_iter()
            .filter_map(IncomeStatement::from_raw)
            .collect();

        let analysis = StockAnalysis {
            company_info,
            current_price,
            historical_prices: normalize_prices(historical_prices),
            financial_ratios: raw.financial_ratios.unwrap_or_default().into(),
            analyst_recommendations: raw
                .analyst_recommendations
                .unwrap_or_default()
                .into_iter()
                .map(Recommendation::from)
                .collect(),
            income_statements: normalize_income(income_statements),
        };

        analysis
            .validate()
            .map_err(|e| ParseError::InvalidField {
                field: "current_price",
                reason: e.to_string(),
            })?;

        Ok(analysis)
    }

    pub fn company_info(&self) -> &CompanyInfo {
        &self.company_info
    }

    pub fn current_price(&self) -> f64 {
        self.current_price
    }

    /// Ascending by date.
    pub fn historical_prices(&self) -> &[PricePoint] {
        &self.historical_prices
    }

    pub fn financial_ratios(&self) -> &FinancialRatios {
        &self.financial_ratios
    }

    /// In the order the backend delivered them.
    pub fn analyst_recommendations(&self) -> &[Recommendation] {
        &self.analyst_recommendations
    }

    /// Ascending by year.
    pub fn income_statements(&self) -> &[IncomeStatement] {
        &self.income_statements
    }
}

// Stable ascending sort; points sharing a date keep their delivered order
pub fn normalize_prices(mut prices: Vec<PricePoint>) -> Vec<PricePoint> {
    prices.sort_by_key(|point| point.date);
    prices
}

// Stable ascending sort by fiscal year
pub fn normalize_income(mut statements: Vec<IncomeStatement>) -> Vec<IncomeStatement> {
    statements.sort_by_key(|statement| statement.year);
    statements
}

// Accepts YYYY-MM-DD, RFC 3339 or a naive ISO 8601 timestamp; keeps the calendar date
fn parse_iso_date(value: &str) -> Result<NaiveDate, ParseError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date()))
        .map_err(|_| ParseError::InvalidField {
            field: "historical_prices.datevalue",
            reason: format!("`{value}` is not an ISO 8601 date"),
        })
}
