//! Business records served by the external data API.
//!
//! All records are read-only snapshots; nothing here is persisted or
//! mutated by the bot. The data API emits the customer lookup in
//! snake_case and every tabular endpoint with PascalCase column names, so
//! tabular fields are renamed on deserialize and accept snake_case aliases.
//! Records always serialize with snake_case names.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used on every data API query parameter.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single customer as returned by `GET /api/customers/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    #[serde(default)]
    pub customer_segment: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub sales_rep: Option<String>,
    #[serde(default)]
    pub total_orders: Option<i64>,
    #[serde(default)]
    pub total_sales_amount: Option<f64>,
    #[serde(default)]
    pub last_order_date: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub updated_date: Option<String>,
}

/// One sales line from `GET /api/sales`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    #[serde(rename(deserialize = "CustomerID"), alias = "customer_id")]
    pub customer_id: String,
    #[serde(rename(deserialize = "ProductCode"), alias = "product_code", default)]
    pub product_code: Option<String>,
    #[serde(rename(deserialize = "OrderNumber"), alias = "order_number", default)]
    pub order_number: Option<String>,
    #[serde(rename(deserialize = "SalesDate"), alias = "sales_date", default)]
    pub sales_date: Option<String>,
    #[serde(rename(deserialize = "SalesAmount"), alias = "sales_amount", default)]
    pub sales_amount: Option<f64>,
    #[serde(rename(deserialize = "SalesQuantity"), alias = "sales_quantity", default)]
    pub sales_quantity: Option<f64>,
    #[serde(rename(deserialize = "UnitPrice"), alias = "unit_price", default)]
    pub unit_price: Option<f64>,
    #[serde(rename(deserialize = "Region"), alias = "region", default)]
    pub region: Option<String>,
    #[serde(rename(deserialize = "Channel"), alias = "channel", default)]
    pub channel: Option<String>,
    #[serde(rename(deserialize = "SalesRep"), alias = "sales_rep", default)]
    pub sales_rep: Option<String>,
    #[serde(rename(deserialize = "DataSource"), alias = "data_source", default)]
    pub data_source: Option<String>,
    #[serde(rename(deserialize = "CustomerSegment"), alias = "customer_segment", default)]
    pub customer_segment: Option<String>,
    #[serde(rename(deserialize = "ProductCategory"), alias = "product_category", default)]
    pub product_category: Option<String>,
}

impl SalesRecord {
    /// The calendar day of the sale, if the timestamp parses.
    ///
    /// Accepts `YYYY-MM-DD` optionally followed by a time component.
    pub fn sale_day(&self) -> Option<NaiveDate> {
        let raw = self.sales_date.as_deref()?;
        let day = raw.get(..10)?;
        NaiveDate::parse_from_str(day, DATE_FORMAT).ok()
    }

    pub fn amount(&self) -> f64 {
        self.sales_amount.unwrap_or(0.0)
    }

    pub fn quantity(&self) -> f64 {
        self.sales_quantity.unwrap_or(0.0)
    }
}

/// One order from `GET /api/customers/{id}/orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerOrder {
    #[serde(rename(deserialize = "OrderNumber"), alias = "order_number", default)]
    pub order_number: Option<String>,
    #[serde(rename(deserialize = "SalesDate"), alias = "sales_date", default)]
    pub sales_date: Option<String>,
    #[serde(rename(deserialize = "ProductCode"), alias = "product_code", default)]
    pub product_code: Option<String>,
    #[serde(rename(deserialize = "SalesAmount"), alias = "sales_amount", default)]
    pub sales_amount: Option<f64>,
    #[serde(rename(deserialize = "SalesQuantity"), alias = "sales_quantity", default)]
    pub sales_quantity: Option<f64>,
    #[serde(rename(deserialize = "UnitPrice"), alias = "unit_price", default)]
    pub unit_price: Option<f64>,
    #[serde(rename(deserialize = "Region"), alias = "region", default)]
    pub region: Option<String>,
    #[serde(rename(deserialize = "Channel"), alias = "channel", default)]
    pub channel: Option<String>,
    #[serde(rename(deserialize = "SalesRep"), alias = "sales_rep", default)]
    pub sales_rep: Option<String>,
    #[serde(rename(deserialize = "ProductCategory"), alias = "product_category", default)]
    pub product_category: Option<String>,
}

/// A ranked customer from `GET /api/customers/top`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCustomer {
    #[serde(rename(deserialize = "CustomerID"), alias = "customer_id")]
    pub customer_id: String,
    #[serde(rename(deserialize = "CustomerSegment"), alias = "customer_segment", default)]
    pub customer_segment: Option<String>,
    #[serde(rename(deserialize = "Region"), alias = "region", default)]
    pub region: Option<String>,
    #[serde(rename(deserialize = "SalesRep"), alias = "sales_rep", default)]
    pub sales_rep: Option<String>,
    #[serde(rename(deserialize = "TotalOrders"), alias = "total_orders", default)]
    pub total_orders: Option<i64>,
    #[serde(
        rename(deserialize = "TotalQuantityPurchased"),
        alias = "total_quantity_purchased",
        default
    )]
    pub total_quantity_purchased: Option<f64>,
    #[serde(rename(deserialize = "TotalSalesAmount"), alias = "total_sales_amount", default)]
    pub total_sales_amount: Option<f64>,
    #[serde(rename(deserialize = "AverageOrderValue"), alias = "average_order_value", default)]
    pub average_order_value: Option<f64>,
    #[serde(rename(deserialize = "LastOrderDate"), alias = "last_order_date", default)]
    pub last_order_date: Option<String>,
}

/// Per-product aggregate from `GET /api/products/performance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPerformance {
    #[serde(rename(deserialize = "ProductCode"), alias = "product_code")]
    pub product_code: String,
    #[serde(rename(deserialize = "ProductCategory"), alias = "product_category", default)]
    pub product_category: Option<String>,
    #[serde(rename(deserialize = "TotalSales"), alias = "total_sales", default)]
    pub total_sales: Option<i64>,
    #[serde(rename(deserialize = "TotalQuantitySold"), alias = "total_quantity_sold", default)]
    pub total_quantity_sold: Option<f64>,
    #[serde(rename(deserialize = "TotalSalesAmount"), alias = "total_sales_amount", default)]
    pub total_sales_amount: Option<f64>,
    #[serde(rename(deserialize = "AverageUnitPrice"), alias = "average_unit_price", default)]
    pub average_unit_price: Option<f64>,
    #[serde(rename(deserialize = "FirstSaleDate"), alias = "first_sale_date", default)]
    pub first_sale_date: Option<String>,
    #[serde(rename(deserialize = "LastSaleDate"), alias = "last_sale_date", default)]
    pub last_sale_date: Option<String>,
}

/// Per-region aggregate from `GET /api/sales/regional`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalSales {
    #[serde(rename(deserialize = "Region"), alias = "region")]
    pub region: String,
    #[serde(rename(deserialize = "TotalSales"), alias = "total_sales", default)]
    pub total_sales: Option<i64>,
    #[serde(rename(deserialize = "UniqueCustomers"), alias = "unique_customers", default)]
    pub unique_customers: Option<i64>,
    #[serde(rename(deserialize = "TotalQuantitySold"), alias = "total_quantity_sold", default)]
    pub total_quantity_sold: Option<f64>,
    #[serde(rename(deserialize = "TotalSalesAmount"), alias = "total_sales_amount", default)]
    pub total_sales_amount: Option<f64>,
    #[serde(rename(deserialize = "AverageSaleAmount"), alias = "average_sale_amount", default)]
    pub average_sale_amount: Option<f64>,
}

/// Per-representative aggregate from `GET /api/sales/reps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepPerformance {
    #[serde(rename(deserialize = "SalesRep"), alias = "sales_rep")]
    pub sales_rep: String,
    #[serde(rename(deserialize = "TotalSales"), alias = "total_sales", default)]
    pub total_sales: Option<i64>,
    #[serde(rename(deserialize = "UniqueCustomers"), alias = "unique_customers", default)]
    pub unique_customers: Option<i64>,
    #[serde(rename(deserialize = "TotalQuantitySold"), alias = "total_quantity_sold", default)]
    pub total_quantity_sold: Option<f64>,
    #[serde(rename(deserialize = "TotalSalesAmount"), alias = "total_sales_amount", default)]
    pub total_sales_amount: Option<f64>,
    #[serde(rename(deserialize = "AverageSaleAmount"), alias = "average_sale_amount", default)]
    pub average_sale_amount: Option<f64>,
}

/// Optional inclusive date window applied to most data API queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Query pairs for the bounds that are set, formatted `YYYY-MM-DD`.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(start) = self.start {
            pairs.push(("start_date", start.format(DATE_FORMAT).to_string()));
        }
        if let Some(end) = self.end {
            pairs.push(("end_date", end.format(DATE_FORMAT).to_string()));
        }
        pairs
    }
}

/// Filters for `GET /api/sales`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesFilter {
    pub range: DateRange,
    pub region: Option<String>,
    pub customer_id: Option<String>,
}

impl SalesFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = self.range.query_pairs();
        if let Some(region) = self.region.as_deref().filter(|r| !r.is_empty()) {
            pairs.push(("region", region.to_string()));
        }
        if let Some(customer_id) = self.customer_id.as_deref().filter(|c| !c.is_empty()) {
            pairs.push(("customer_id", customer_id.to_string()));
        }
        pairs
    }
}
