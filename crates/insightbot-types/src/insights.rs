//! Business insight report shapes computed from raw sales records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsReport {
    pub generated_at: DateTime<Utc>,
    pub record_count: usize,
    pub sales_trends: SalesTrends,
    pub customers: CustomerInsights,
    pub products: ProductInsights,
    pub regions: RegionalInsights,
    pub sales_reps: RepInsights,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesTrends {
    pub total_sales: f64,
    pub average_daily_sales: f64,
    /// Second-half vs first-half mean of daily totals, in percent.
    pub sales_growth_rate: f64,
    pub top_performing_days: Vec<DailyTotal>,
    pub total_unique_customers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total_sales: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerInsights {
    pub total_customers: usize,
    pub top_customers: Vec<RankedEntry>,
    pub segment_analysis: Vec<SegmentSummary>,
    /// Customers whose last order falls within seven days of `generated_at`.
    pub recent_customers: usize,
    pub returning_customers: usize,
    /// Share of customers with more than one order, in percent.
    pub customer_retention_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductInsights {
    pub total_products: usize,
    pub top_products: Vec<ProductSummary>,
    /// Rolled up from per-product aggregates, not raw records.
    pub categories: Vec<CategorySummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionalInsights {
    pub total_regions: usize,
    pub top_regions: Vec<RankedEntry>,
    pub best_performing_region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepInsights {
    pub total_sales_reps: usize,
    pub top_sales_reps: Vec<RankedEntry>,
    pub top_performing_rep: Option<String>,
}

/// One row of a ranking: a grouping key with its aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub key: String,
    pub total_sales: f64,
    pub order_count: usize,
    pub total_quantity: f64,
    pub average_order_value: f64,
    pub unique_customers: usize,
}

/// Customers grouped by their segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment: String,
    pub customer_count: usize,
    pub total_sales: f64,
    /// Mean of the member customers' average order values.
    pub average_order_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    #[serde(flatten)]
    pub sales: RankedEntry,
    pub category: String,
    /// `None` when no record for the product carries a unit price.
    pub average_unit_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub product_count: usize,
    pub total_sales: f64,
    pub total_quantity: f64,
    /// Mean of the member products' average unit prices.
    pub average_unit_price: Option<f64>,
}
