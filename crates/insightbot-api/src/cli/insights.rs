//! Sales insights report over a date range.

use anyhow::{Result, bail};
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets};
use console::style;

use insightbot_core::capability::business::parse_range;
use insightbot_core::insights::generate_insights;
use insightbot_core::repository::data::BusinessDataSource;
use insightbot_types::business::SalesFilter;
use insightbot_types::insights::{
    CategorySummary, InsightsReport, ProductSummary, RankedEntry, SegmentSummary,
};

use crate::state::AppState;

/// Fetch matching sales records and print the computed report.
pub async fn insights(
    state: &AppState,
    start_date: Option<&str>,
    end_date: Option<&str>,
    region: Option<String>,
    json: bool,
) -> Result<()> {
    let range = parse_range(start_date, end_date)?;
    if !state.data.is_configured() {
        bail!("data API is not configured (set DATA_API_BASE_URL)");
    }

    let filter = SalesFilter {
        range,
        region,
        customer_id: None,
    };
    let records = state.data.sales(&filter).await;
    let report = generate_insights(&records, chrono::Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &InsightsReport) {
    println!();
    if report.record_count == 0 {
        println!("  {}", style("No sales records found for this range.").dim());
        println!();
        return;
    }

    let trends = &report.sales_trends;
    println!("  {}", style("── Sales trends ──").dim());
    println!("  Records:         {}", style(report.record_count).bold());
    println!("  Total sales:     {}", style(money(trends.total_sales)).bold());
    println!("  Avg daily sales: {}", money(trends.average_daily_sales));
    println!("  Growth rate:     {}", growth(trends.sales_growth_rate));
    println!("  Customers:       {}", trends.total_unique_customers);
    println!(
        "  Retention:       {:.1}% ({} returning)",
        report.customers.customer_retention_rate, report.customers.returning_customers
    );
    println!("  Recent (7 days): {}", report.customers.recent_customers);
    if let Some(region) = &report.regions.best_performing_region {
        println!("  Best region:     {}", style(region).cyan());
    }
    if let Some(rep) = &report.sales_reps.top_performing_rep {
        println!("  Best sales rep:  {}", style(rep).cyan());
    }

    let sections = [
        ("Top customers", table_or_none(&report.customers.top_customers, ranked_table)),
        ("Segments", table_or_none(&report.customers.segment_analysis, segment_table)),
        ("Top products", table_or_none(&report.products.top_products, product_table)),
        ("Categories", table_or_none(&report.products.categories, category_table)),
        ("Regions", table_or_none(&report.regions.top_regions, ranked_table)),
        ("Sales reps", table_or_none(&report.sales_reps.top_sales_reps, ranked_table)),
    ];
    for (title, table) in sections {
        let Some(table) = table else { continue };
        println!();
        println!("  {}", style(format!("── {title} ──")).dim());
        println!("{table}");
    }
    println!();
}

fn table_or_none<T>(rows: &[T], render: fn(&[T]) -> Table) -> Option<Table> {
    (!rows.is_empty()).then(|| render(rows))
}

fn table_with_header(columns: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        columns
            .iter()
            .map(|c| Cell::new(c).fg(Color::White))
            .collect::<Vec<_>>(),
    );
    table
}

fn right(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

fn optional_money(amount: Option<f64>) -> String {
    amount.map(money).unwrap_or_else(|| "-".to_string())
}

fn ranked_table(entries: &[RankedEntry]) -> Table {
    let mut table = table_with_header(&["NAME", "SALES", "ORDERS", "AVG ORDER", "CUSTOMERS"]);
    for entry in entries {
        table.add_row(vec![
            Cell::new(&entry.key),
            right(money(entry.total_sales)),
            right(entry.order_count),
            right(money(entry.average_order_value)),
            right(entry.unique_customers),
        ]);
    }
    table
}

fn segment_table(segments: &[SegmentSummary]) -> Table {
    let mut table = table_with_header(&["SEGMENT", "CUSTOMERS", "SALES", "AVG ORDER"]);
    for segment in segments {
        table.add_row(vec![
            Cell::new(&segment.segment),
            right(segment.customer_count),
            right(money(segment.total_sales)),
            right(money(segment.average_order_value)),
        ]);
    }
    table
}

fn product_table(products: &[ProductSummary]) -> Table {
    let mut table = table_with_header(&["PRODUCT", "CATEGORY", "SALES", "QTY", "AVG PRICE"]);
    for product in products {
        table.add_row(vec![
            Cell::new(&product.sales.key),
            Cell::new(&product.category),
            right(money(product.sales.total_sales)),
            right(product.sales.total_quantity),
            right(optional_money(product.average_unit_price)),
        ]);
    }
    table
}

fn category_table(categories: &[CategorySummary]) -> Table {
    let mut table = table_with_header(&["CATEGORY", "PRODUCTS", "SALES", "QTY", "AVG PRICE"]);
    for category in categories {
        table.add_row(vec![
            Cell::new(&category.category),
            right(category.product_count),
            right(money(category.total_sales)),
            right(category.total_quantity),
            right(optional_money(category.average_unit_price)),
        ]);
    }
    table
}

fn money(amount: f64) -> String {
    format!("{amount:.2}")
}

fn growth(rate: f64) -> String {
    let text = format!("{rate:+.1}%");
    if rate > 0.0 {
        style(text).green().to_string()
    } else if rate < 0.0 {
        style(text).red().to_string()
    } else {
        text
    }
}
