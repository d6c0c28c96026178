//! # Reports
//!
//! Back-office dashboard figures, top sellers, the sales chart and the
//! sales report.

use crate::error::{ShopError, ShopResult};
use crate::lifecycle::OrderStats;
use crate::money::Price;
use crate::order::{Order, OrderStatus};
use crate::store::{Page, Shop, ShopState};
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub const TOP_PERFORMERS: usize = 10;
pub const SALES_REPORT_PAGE_SIZE: usize = 20;
/// Years shown by the yearly chart
pub const CHART_YEARS: i32 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_customers: usize,
    /// Products not blocked
    pub total_products: usize,
    #[serde(flatten)]
    pub orders: OrderStats,
}

/// A product, category or brand ranked by revenue
#[derive(Debug, Clone, Serialize)]
pub struct TopEntry {
    pub id: Uuid,
    pub name: String,
    pub units_sold: u32,
    pub revenue: Price,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopPerformers {
    pub products: Vec<TopEntry>,
    pub categories: Vec<TopEntry>,
    pub brands: Vec<TopEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartFilter {
    Yearly,
    Monthly,
    Weekly,
    Daily,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub revenue: Price,
    pub orders: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesChart {
    pub filter: ChartFilter,
    pub points: Vec<ChartPoint>,
}

/// Sales report window, measured back from `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "period", rename_all = "snake_case")]
pub enum SalesPeriod {
    All,
    /// Since midnight today
    Daily,
    /// The last 7 days
    Weekly,
    /// The last month
    Monthly,
    /// The last year
    Yearly,
    /// Inclusive of the whole end day
    Custom { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SalesTotals {
    pub count: usize,
    /// Sum of subtotals before discounts
    pub total_amount: i64,
    pub final_amount: i64,
    pub discount: i64,
    pub unique_customers: usize,
    pub cancelled: usize,
    pub returned: usize,
    pub delivered: usize,
    pub pending: usize,
    pub average_order_value: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub period: SalesPeriod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
    pub totals: SalesTotals,
    pub active_revenue: Price,
    pub total_revenue: Price,
    /// Units across every order in the window
    pub products_sold: u32,
    pub orders: Page<Order>,
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = first.and_then(|d| d.checked_add_months(Months::new(1)));
    match (first, next) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 30,
    }
}

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

impl SalesPeriod {
    /// The `[from, to]` window this period covers at `now`
    pub fn window(&self, now: DateTime<Utc>) -> ShopResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        let back = |from: Option<DateTime<Utc>>| {
            from.ok_or_else(|| ShopError::InvalidRequest("Report window out of range".into()))
        };
        Ok(match *self {
            SalesPeriod::All => (None, None),
            SalesPeriod::Daily => (Some(midnight(now.date_naive())), Some(now)),
            SalesPeriod::Weekly => (Some(back(now.checked_sub_days(Days::new(7)))?), None),
            SalesPeriod::Monthly => (Some(back(now.checked_sub_months(Months::new(1)))?), None),
            SalesPeriod::Yearly => (Some(back(now.checked_sub_months(Months::new(12)))?), None),
            SalesPeriod::Custom { start, end } => {
                if end < start {
                    return Err(ShopError::InvalidRequest(
                        "Report end date is before its start date".into(),
                    ));
                }
                let end = back(end.checked_add_days(Days::new(1)).map(midnight))?;
                (Some(midnight(start)), Some(end - chrono::Duration::milliseconds(1)))
            }
        })
    }
}

/// Rank what `resolve` maps each sold product to, by revenue over orders
/// that were not cancelled
fn top_by<'a>(
    orders: impl Iterator<Item = &'a Order>,
    resolve: impl Fn(Uuid) -> Option<(Uuid, String)>,
) -> Vec<TopEntry> {
    let mut totals: HashMap<Uuid, TopEntry> = HashMap::new();
    for order in orders.filter(|o| o.status != OrderStatus::Cancelled) {
        for item in &order.items {
            let Some((id, name)) = resolve(item.product_id) else {
                continue;
            };
            let entry = totals.entry(id).or_insert_with(|| TopEntry {
                id,
                name,
                units_sold: 0,
                revenue: Price::zero(item.unit_price.currency),
            });
            entry.units_sold += item.quantity;
            entry.revenue = entry.revenue.plus(item.total());
        }
    }
    let mut entries: Vec<TopEntry> = totals.into_values().collect();
    entries.sort_by(|a, b| {
        b.revenue
            .amount
            .cmp(&a.revenue.amount)
            .then(a.name.cmp(&b.name))
    });
    entries.truncate(TOP_PERFORMERS);
    entries
}

impl Shop {
    pub fn dashboard(&self) -> ShopResult<DashboardSummary> {
        let state = self.read()?;
        Ok(DashboardSummary {
            total_customers: state.customers.len(),
            total_products: state.products.values().filter(|p| !p.blocked).count(),
            orders: OrderStats::over(state.orders.values(), Price::zero(self.currency())),
        })
    }

    /// Best sellers by revenue over orders that were not cancelled
    pub fn top_performers(&self) -> ShopResult<TopPerformers> {
        let guard = self.read()?;
        let s: &ShopState = &guard;
        let products = top_by(s.orders.values(), |id| {
            s.products.get(&id).map(|p| (p.id, p.name.clone()))
        });
        let categories = top_by(s.orders.values(), |id| {
            let product = s.products.get(&id)?;
            let category = s.categories.get(&product.category_id)?;
            Some((category.id, category.name.clone()))
        });
        let brands = top_by(s.orders.values(), |id| {
            let product = s.products.get(&id)?;
            let brand = s.brands.get(&product.brand_id)?;
            Some((brand.id, brand.name.clone()))
        });
        Ok(TopPerformers {
            products,
            categories,
            brands,
        })
    }

    /// Revenue over time. Cancelled and returned orders are left out.
    pub fn sales_chart(&self, filter: ChartFilter, year: i32, today: NaiveDate) -> ShopResult<SalesChart> {
        let zero = Price::zero(self.currency());
        let month_days = days_in_month(today.year(), today.month());

        let labels: Vec<String> = match filter {
            ChartFilter::Yearly => ((year - CHART_YEARS + 1)..=year).map(|y| y.to_string()).collect(),
            ChartFilter::Monthly => MONTH_LABELS.iter().map(|m| m.to_string()).collect(),
            ChartFilter::Weekly => (1..=month_days.div_ceil(7)).map(|w| format!("Week {w}")).collect(),
            ChartFilter::Daily => (1..=month_days).map(|d| d.to_string()).collect(),
        };
        let mut points: Vec<ChartPoint> = labels
            .into_iter()
            .map(|label| ChartPoint {
                label,
                revenue: zero,
                orders: 0,
            })
            .collect();

        let state = self.read()?;
        for order in state.orders.values().filter(|o| o.status.is_active()) {
            let date = order.created_at.date_naive();
            let in_current_month = date.year() == today.year() && date.month() == today.month();
            let slot = match filter {
                ChartFilter::Yearly => {
                    let offset = date.year() - (year - CHART_YEARS + 1);
                    (0..CHART_YEARS).contains(&offset).then_some(offset as usize)
                }
                ChartFilter::Monthly => (date.year() == year).then(|| date.month0() as usize),
                ChartFilter::Weekly => in_current_month.then(|| date.day0() as usize / 7),
                ChartFilter::Daily => in_current_month.then(|| date.day0() as usize),
            };
            if let Some(point) = slot.and_then(|i| points.get_mut(i)) {
                point.revenue = point.revenue.plus(order.final_amount);
                point.orders += 1;
            }
        }
        Ok(SalesChart { filter, points })
    }

    pub fn sales_report(&self, period: SalesPeriod, page: usize, now: DateTime<Utc>) -> ShopResult<SalesReport> {
        let (from, to) = period.window(now)?;
        let zero = Price::zero(self.currency());
        let state = self.read()?;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| from.map_or(true, |f| o.created_at >= f))
            .filter(|o| to.map_or(true, |t| o.created_at <= t))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let mut totals = SalesTotals::default();
        let mut customers = HashSet::new();
        let mut products_sold = 0;
        for order in &orders {
            totals.count += 1;
            totals.total_amount += order.subtotal.amount;
            totals.final_amount += order.final_amount.amount;
            totals.discount += order.discount.amount;
            customers.insert(order.customer_id);
            match order.status {
                OrderStatus::Cancelled => totals.cancelled += 1,
                OrderStatus::Returned => totals.returned += 1,
                OrderStatus::Delivered => totals.delivered += 1,
                OrderStatus::Pending => totals.pending += 1,
                _ => {}
            }
            products_sold += order.item_count();
        }
        totals.unique_customers = customers.len();
        if totals.count > 0 {
            totals.average_order_value = totals.final_amount / totals.count as i64;
        }
        let stats = OrderStats::over(orders.iter(), zero);

        Ok(SalesReport {
            period,
            from,
            to,
            totals,
            active_revenue: stats.active_revenue,
            total_revenue: stats.total_revenue,
            products_sold,
            orders: Page::paginate(orders, page, SALES_REPORT_PAGE_SIZE),
        })
    }
}
