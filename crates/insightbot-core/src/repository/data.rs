//! Business data source port.
//!
//! Every operation degrades instead of failing: transport, status, and decode
//! problems surface as `None` or an empty list, and the implementation is
//! responsible for recording the failure exactly once.

use std::future::Future;

use insightbot_types::business::{
    Customer, CustomerOrder, DateRange, ProductPerformance, RegionalSales, RepPerformance,
    SalesFilter, SalesRecord, TopCustomer,
};

/// Read-only access to customer and sales data.
pub trait BusinessDataSource: Send + Sync {
    /// Single customer profile, or `None` when unknown or unreachable.
    fn customer(&self, customer_id: &str) -> impl Future<Output = Option<Customer>> + Send;

    /// Most recent orders for a customer, newest first.
    fn customer_orders(
        &self,
        customer_id: &str,
        limit: u32,
    ) -> impl Future<Output = Vec<CustomerOrder>> + Send;

    /// Customers ranked by total sales amount.
    fn top_customers(
        &self,
        limit: u32,
        range: &DateRange,
    ) -> impl Future<Output = Vec<TopCustomer>> + Send;

    /// Raw sales records matching the filter.
    fn sales(&self, filter: &SalesFilter) -> impl Future<Output = Vec<SalesRecord>> + Send;

    /// Per-product aggregates, optionally restricted to one product.
    fn product_performance(
        &self,
        product_code: Option<&str>,
        range: &DateRange,
    ) -> impl Future<Output = Vec<ProductPerformance>> + Send;

    /// Per-region aggregates.
    fn regional_sales(&self, range: &DateRange)
    -> impl Future<Output = Vec<RegionalSales>> + Send;

    /// Per-sales-rep aggregates.
    fn rep_performance(
        &self,
        range: &DateRange,
    ) -> impl Future<Output = Vec<RepPerformance>> + Send;
}
