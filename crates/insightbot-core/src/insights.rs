//! Sales insight computation.
//!
//! Pure functions over a slice of `SalesRecord`s. Monetary aggregates are
//! rounded to two decimals; rankings sort by total sales descending and break
//! ties by key so output is stable across runs.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Days, NaiveDate, Utc};

use insightbot_types::business::SalesRecord;
use insightbot_types::insights::{
    CategorySummary, CustomerInsights, DailyTotal, InsightsReport, ProductInsights, ProductSummary,
    RankedEntry, RegionalInsights, RepInsights, SalesTrends, SegmentSummary,
};

const TOP_DAYS: usize = 5;
const TOP_CUSTOMERS: usize = 10;
const TOP_PRODUCTS: usize = 10;
const TOP_REGIONS: usize = 5;
const TOP_REPS: usize = 5;
const RECENT_DAYS: u64 = 7;

const UNKNOWN: &str = "Unknown";

/// Build the full report for `records`.
pub fn generate_insights(records: &[SalesRecord], generated_at: DateTime<Utc>) -> InsightsReport {
    let regions = ranked_by(records, |r| {
        Some(r.region.clone().unwrap_or_else(|| UNKNOWN.to_string()))
    });
    let reps = ranked_by(records, |r| r.sales_rep.clone().filter(|s| !s.is_empty()));

    InsightsReport {
        generated_at,
        record_count: records.len(),
        sales_trends: sales_trends(records),
        customers: customer_insights(records, generated_at),
        products: product_insights(records),
        regions: RegionalInsights {
            total_regions: regions.len(),
            best_performing_region: regions.first().map(|e| e.key.clone()),
            top_regions: regions.into_iter().take(TOP_REGIONS).collect(),
        },
        sales_reps: RepInsights {
            total_sales_reps: reps.len(),
            top_performing_rep: reps.first().map(|e| e.key.clone()),
            top_sales_reps: reps.into_iter().take(TOP_REPS).collect(),
        },
    }
}

/// Daily totals, average, growth, and best days.
pub fn sales_trends(records: &[SalesRecord]) -> SalesTrends {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        if let Some(day) = record.sale_day() {
            *daily.entry(day).or_default() += record.amount();
        }
    }

    let totals: Vec<f64> = daily.values().copied().collect();
    let average = if totals.is_empty() {
        0.0
    } else {
        totals.iter().sum::<f64>() / totals.len() as f64
    };

    let mut top_days: Vec<DailyTotal> = daily
        .iter()
        .map(|(date, total)| DailyTotal {
            date: *date,
            total_sales: round2(*total),
        })
        .collect();
    top_days.sort_by(|a, b| {
        b.total_sales
            .total_cmp(&a.total_sales)
            .then(a.date.cmp(&b.date))
    });
    top_days.truncate(TOP_DAYS);

    let unique_customers: BTreeSet<&str> =
        records.iter().map(|r| r.customer_id.as_str()).collect();

    SalesTrends {
        total_sales: round2(records.iter().map(SalesRecord::amount).sum()),
        average_daily_sales: round2(average),
        sales_growth_rate: round2(growth_rate(&totals)),
        top_performing_days: top_days,
        total_unique_customers: unique_customers.len(),
    }
}

/// Mean of the second half against the mean of the first half, in percent.
///
/// For an odd count the middle value belongs to the second half. Returns 0
/// for fewer than two values or a zero first-half mean.
pub fn growth_rate(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let (first, second) = values.split_at(values.len() / 2);
    let first_mean = mean(first);
    if first_mean == 0.0 {
        return 0.0;
    }
    (mean(second) - first_mean) / first_mean * 100.0
}

pub fn customer_insights(records: &[SalesRecord], generated_at: DateTime<Utc>) -> CustomerInsights {
    let ranked = ranked_by(records, |r| Some(r.customer_id.clone()));
    let returning = ranked.iter().filter(|e| e.order_count > 1).count();
    let retention = if ranked.is_empty() {
        0.0
    } else {
        returning as f64 / ranked.len() as f64 * 100.0
    };

    // first non-empty segment and latest order day per customer
    let mut profiles: HashMap<&str, (Option<&str>, Option<NaiveDate>)> = HashMap::new();
    for record in records {
        let (segment, last_order) = profiles.entry(record.customer_id.as_str()).or_default();
        if segment.is_none() {
            *segment = non_empty(record.customer_segment.as_deref());
        }
        *last_order = (*last_order).max(record.sale_day());
    }

    let cutoff = generated_at.date_naive().checked_sub_days(Days::new(RECENT_DAYS));
    let recent = profiles
        .values()
        .filter(|(_, last_order)| last_order.is_some() && *last_order >= cutoff)
        .count();

    let mut segments: BTreeMap<&str, (usize, f64, f64)> = BTreeMap::new();
    for entry in &ranked {
        let segment = profiles
            .get(entry.key.as_str())
            .and_then(|(segment, _)| *segment)
            .unwrap_or(UNKNOWN);
        let (count, total, order_values) = segments.entry(segment).or_default();
        *count += 1;
        *total += entry.total_sales;
        *order_values += entry.average_order_value;
    }
    let mut segment_analysis: Vec<SegmentSummary> = segments
        .into_iter()
        .map(|(segment, (count, total, order_values))| SegmentSummary {
            segment: segment.to_string(),
            customer_count: count,
            total_sales: round2(total),
            average_order_value: round2(order_values / count as f64),
        })
        .collect();
    segment_analysis.sort_by(|a, b| b.total_sales.total_cmp(&a.total_sales));

    CustomerInsights {
        total_customers: ranked.len(),
        segment_analysis,
        recent_customers: recent,
        returning_customers: returning,
        customer_retention_rate: round2(retention),
        top_customers: ranked.into_iter().take(TOP_CUSTOMERS).collect(),
    }
}

pub fn product_insights(records: &[SalesRecord]) -> ProductInsights {
    let product_code = |r: &SalesRecord| r.product_code.clone().filter(|p| !p.is_empty());
    let ranked = ranked_by(records, product_code);

    // first non-empty category and unit price sum/count per product
    let mut details: HashMap<String, (Option<&str>, f64, usize)> = HashMap::new();
    for record in records {
        let Some(code) = product_code(record) else { continue };
        let (category, price_sum, priced) = details.entry(code).or_default();
        if category.is_none() {
            *category = non_empty(record.product_category.as_deref());
        }
        if let Some(price) = record.unit_price {
            *price_sum += price;
            *priced += 1;
        }
    }

    let products: Vec<ProductSummary> = ranked
        .into_iter()
        .map(|sales| {
            let (category, price_sum, priced) =
                details.get(&sales.key).copied().unwrap_or_default();
            ProductSummary {
                category: category.unwrap_or(UNKNOWN).to_string(),
                average_unit_price: (priced > 0).then(|| round2(price_sum / priced as f64)),
                sales,
            }
        })
        .collect();

    ProductInsights {
        total_products: products.len(),
        categories: category_summaries(&products),
        top_products: products.into_iter().take(TOP_PRODUCTS).collect(),
    }
}

fn category_summaries(products: &[ProductSummary]) -> Vec<CategorySummary> {
    let mut groups: BTreeMap<&str, Vec<&ProductSummary>> = BTreeMap::new();
    for product in products {
        groups.entry(product.category.as_str()).or_default().push(product);
    }

    let mut summaries: Vec<CategorySummary> = groups
        .into_iter()
        .map(|(category, members)| {
            let prices: Vec<f64> = members.iter().filter_map(|p| p.average_unit_price).collect();
            CategorySummary {
                category: category.to_string(),
                product_count: members.len(),
                total_sales: round2(members.iter().map(|p| p.sales.total_sales).sum()),
                total_quantity: round2(members.iter().map(|p| p.sales.total_quantity).sum()),
                average_unit_price: (!prices.is_empty()).then(|| round2(mean(&prices))),
            }
        })
        .collect();
    summaries.sort_by(|a, b| b.total_sales.total_cmp(&a.total_sales));
    summaries
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Default)]
struct Accumulator<'a> {
    total_sales: f64,
    order_count: usize,
    total_quantity: f64,
    customers: BTreeSet<&'a str>,
}

/// Group records by `key`, aggregate, and rank by total sales.
/// Records for which `key` returns `None` are skipped.
fn ranked_by<F>(records: &[SalesRecord], key: F) -> Vec<RankedEntry>
where
    F: Fn(&SalesRecord) -> Option<String>,
{
    let mut groups: HashMap<String, Accumulator<'_>> = HashMap::new();
    for record in records {
        let Some(k) = key(record) else { continue };
        let acc = groups.entry(k).or_default();
        acc.total_sales += record.amount();
        acc.order_count += 1;
        acc.total_quantity += record.quantity();
        acc.customers.insert(record.customer_id.as_str());
    }

    let mut ranked: Vec<RankedEntry> = groups
        .into_iter()
        .map(|(key, acc)| RankedEntry {
            key,
            total_sales: round2(acc.total_sales),
            order_count: acc.order_count,
            total_quantity: round2(acc.total_quantity),
            average_order_value: round2(acc.total_sales / acc.order_count as f64),
            unique_customers: acc.customers.len(),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.total_sales
            .total_cmp(&a.total_sales)
            .then_with(|| a.key.cmp(&b.key))
    });
    ranked
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
