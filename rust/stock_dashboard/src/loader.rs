// src/loader.rs

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

use crate::error::ParseError;

// Custom function to accept a year as a JSON integer or a numeric string
fn int_or_string<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }

    match Option::<IntOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntOrString::Int(n)) => i32::try_from(n)
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(IntOrString::Str(s)) => s
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

// Top-level envelope returned by POST /stock-analysis
#[derive(Deserialize, Debug, Clone)]
pub struct StockAnalysisResponse {
    pub stock_analysis: RawStockAnalysis,
}

// Every field is nullable on the wire; required ones are checked during normalization
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RawStockAnalysis {
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub company_info: Option<RawCompanyInfo>,
    #[serde(default)]
    pub historical_prices: Option<Vec<RawPricePoint>>,
    #[serde(default)]
    pub analyst_recommendations: Option<Vec<RawRecommendation>>,
    #[serde(default)]
    pub financial_ratios: Option<BTreeMap<String, Option<f64>>>,
    #[serde(default)]
    pub income_statements: Option<Vec<RawIncomeStatement>>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct RawCompanyInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub business_summary: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RawPricePoint {
    #[serde(default, rename = "datevalue")]
    pub date: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RawRecommendation {
    #[serde(default, rename = "datevalue")]
    pub date: Option<String>,
    #[serde(default)]
    pub firm: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub target_price: Option<f64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RawIncomeStatement {
    #[serde(default, deserialize_with = "int_or_string")]
    pub year: Option<i32>,
    #[serde(default)]
    pub total_revenue: Option<f64>,
    #[serde(default)]
    pub gross_profit: Option<f64>,
    #[serde(default)]
    pub operating_income: Option<f64>,
    #[serde(default)]
    pub net_income: Option<f64>,
    #[serde(default)]
    pub eps: Option<f64>,
}

/// Decode a response body into the wire shape without normalizing it.
pub fn parse_payload(body: &[u8]) -> Result<StockAnalysisResponse, ParseError> {
    serde_json::from_slice(body).map_err(|e| ParseError::Malformed(e.to_string()))
}
