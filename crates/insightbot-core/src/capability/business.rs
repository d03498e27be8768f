//! Business data capabilities offered to the model.
//!
//! Each capability is a thin wrapper over one `BusinessDataSource` method.
//! Date arguments are `YYYY-MM-DD` strings; anything else is rejected with an
//! `InvalidArguments` error that the orchestrator hands back to the model.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use insightbot_types::business::{DATE_FORMAT, DateRange, SalesFilter};
use insightbot_types::error::CapabilityError;

use super::registry::CapabilityRegistry;
use super::render::{no_data, render_records, render_value};
use crate::insights::generate_insights;
use crate::repository::data::BusinessDataSource;

pub const GET_CUSTOMER: &str = "get_customer";
pub const GET_CUSTOMER_ORDERS: &str = "get_customer_orders";
pub const GET_TOP_CUSTOMERS: &str = "get_top_customers";
pub const GET_SALES_DATA: &str = "get_sales_data";
pub const GET_PRODUCT_PERFORMANCE: &str = "get_product_performance";
pub const GET_REGIONAL_SALES: &str = "get_regional_sales";
pub const GET_SALES_REP_PERFORMANCE: &str = "get_sales_rep_performance";
pub const GENERATE_SALES_INSIGHTS: &str = "generate_sales_insights";

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

#[derive(Debug, Deserialize)]
struct CustomerArgs {
    customer_id: String,
}

#[derive(Debug, Deserialize)]
struct CustomerOrdersArgs {
    customer_id: String,
    #[serde(default = "default_limit")]
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct TopCustomersArgs {
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SalesArgs {
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    customer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductArgs {
    #[serde(default)]
    product_code: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RangeArgs {
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

/// Parse an optional `YYYY-MM-DD` argument. Blank counts as absent.
pub fn parse_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, CapabilityError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map(Some)
            .map_err(|_| {
                CapabilityError::InvalidArguments(format!(
                    "{field} must be a date in YYYY-MM-DD format, got '{raw}'"
                ))
            }),
    }
}

/// Parse a start/end pair and reject inverted windows.
pub fn parse_range(start: Option<&str>, end: Option<&str>) -> Result<DateRange, CapabilityError> {
    let range = DateRange::new(parse_date("start_date", start)?, parse_date("end_date", end)?);
    if let (Some(s), Some(e)) = (range.start, range.end) {
        if s > e {
            return Err(CapabilityError::InvalidArguments(format!(
                "start_date {s} is after end_date {e}"
            )));
        }
    }
    Ok(range)
}

fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_LIMIT)
}

fn required(field: &str, value: &str) -> Result<(), CapabilityError> {
    if value.trim().is_empty() {
        return Err(CapabilityError::InvalidArguments(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn range_schema(extra: serde_json::Value) -> serde_json::Value {
    let mut properties = json!({
        "start_date": {"type": "string", "description": "Inclusive start date, YYYY-MM-DD"},
        "end_date": {"type": "string", "description": "Inclusive end date, YYYY-MM-DD"},
    });
    if let (Some(props), Some(extra)) = (properties.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            props.insert(k.clone(), v.clone());
        }
    }
    json!({"type": "object", "properties": properties})
}

/// Build a registry containing every business capability.
pub fn business_capabilities<D>(source: Arc<D>) -> CapabilityRegistry
where
    D: BusinessDataSource + 'static,
{
    let mut registry = CapabilityRegistry::new();
    register_business_capabilities(&mut registry, source);
    registry
}

/// Register every business capability on `registry`.
pub fn register_business_capabilities<D>(registry: &mut CapabilityRegistry, source: Arc<D>)
where
    D: BusinessDataSource + 'static,
{
    let s = Arc::clone(&source);
    registry.register_typed(
        GET_CUSTOMER,
        "Look up a single customer's profile: segment, region, sales rep, order count, total sales, and last order date.",
        json!({
            "type": "object",
            "properties": {"customer_id": {"type": "string", "description": "Customer identifier, e.g. C123"}},
            "required": ["customer_id"],
        }),
        move |args: CustomerArgs| {
            let s = Arc::clone(&s);
            async move {
                required("customer_id", &args.customer_id)?;
                match s.customer(args.customer_id.trim()).await {
                    Some(customer) => render_value(&customer),
                    None => Ok(no_data(&format!("customer {}", args.customer_id.trim()))),
                }
            }
        },
    );

    let s = Arc::clone(&source);
    registry.register_typed(
        GET_CUSTOMER_ORDERS,
        "List a customer's most recent orders, newest first.",
        json!({
            "type": "object",
            "properties": {
                "customer_id": {"type": "string", "description": "Customer identifier"},
                "limit": {"type": "integer", "description": "Maximum number of orders (default 10)"},
            },
            "required": ["customer_id"],
        }),
        move |args: CustomerOrdersArgs| {
            let s = Arc::clone(&s);
            async move {
                required("customer_id", &args.customer_id)?;
                let id = args.customer_id.trim();
                let orders = s.customer_orders(id, clamp_limit(args.limit)).await;
                render_records(&format!("orders of customer {id}"), &orders)
            }
        },
    );

    let s = Arc::clone(&source);
    registry.register_typed(
        GET_TOP_CUSTOMERS,
        "Rank customers by total sales amount, optionally within a date window.",
        range_schema(json!({
            "limit": {"type": "integer", "description": "Number of customers to return (default 10)"},
        })),
        move |args: TopCustomersArgs| {
            let s = Arc::clone(&s);
            async move {
                let range = parse_range(args.start_date.as_deref(), args.end_date.as_deref())?;
                let customers = s.top_customers(clamp_limit(args.limit), &range).await;
                render_records("top customers", &customers)
            }
        },
    );

    let s = Arc::clone(&source);
    registry.register_typed(
        GET_SALES_DATA,
        "Fetch raw sales records, optionally filtered by date window, region, or customer.",
        range_schema(json!({
            "region": {"type": "string", "description": "Sales region name"},
            "customer_id": {"type": "string", "description": "Customer identifier"},
        })),
        move |args: SalesArgs| {
            let s = Arc::clone(&s);
            async move {
                let filter = SalesFilter {
                    range: parse_range(args.start_date.as_deref(), args.end_date.as_deref())?,
                    region: non_blank(args.region),
                    customer_id: non_blank(args.customer_id),
                };
                let sales = s.sales(&filter).await;
                render_records("sales", &sales)
            }
        },
    );

    let s = Arc::clone(&source);
    registry.register_typed(
        GET_PRODUCT_PERFORMANCE,
        "Aggregate sales per product: units sold, revenue, average price, first and last sale.",
        range_schema(json!({
            "product_code": {"type": "string", "description": "Restrict to one product code"},
        })),
        move |args: ProductArgs| {
            let s = Arc::clone(&s);
            async move {
                let range = parse_range(args.start_date.as_deref(), args.end_date.as_deref())?;
                let product_code = non_blank(args.product_code);
                let products = s.product_performance(product_code.as_deref(), &range).await;
                render_records("product performance", &products)
            }
        },
    );

    let s = Arc::clone(&source);
    registry.register_typed(
        GET_REGIONAL_SALES,
        "Aggregate sales per region: order count, unique customers, revenue.",
        range_schema(json!({})),
        move |args: RangeArgs| {
            let s = Arc::clone(&s);
            async move {
                let range = parse_range(args.start_date.as_deref(), args.end_date.as_deref())?;
                let regions = s.regional_sales(&range).await;
                render_records("regional sales", &regions)
            }
        },
    );

    let s = Arc::clone(&source);
    registry.register_typed(
        GET_SALES_REP_PERFORMANCE,
        "Aggregate sales per sales representative: order count, unique customers, revenue.",
        range_schema(json!({})),
        move |args: RangeArgs| {
            let s = Arc::clone(&s);
            async move {
                let range = parse_range(args.start_date.as_deref(), args.end_date.as_deref())?;
                let reps = s.rep_performance(&range).await;
                render_records("sales rep performance", &reps)
            }
        },
    );

    let s = source;
    registry.register_typed(
        GENERATE_SALES_INSIGHTS,
        "Compute a summary report over sales in a date window: trends, growth rate, top customers, products, regions, and reps.",
        range_schema(json!({})),
        move |args: RangeArgs| {
            let s = Arc::clone(&s);
            async move {
                let filter = SalesFilter {
                    range: parse_range(args.start_date.as_deref(), args.end_date.as_deref())?,
                    ..Default::default()
                };
                let records = s.sales(&filter).await;
                if records.is_empty() {
                    return Ok(no_data("sales insights"));
                }
                render_value(&generate_insights(&records, Utc::now()))
            }
        },
    );
}
