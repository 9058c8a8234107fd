//! Spending statistics derived from the in-memory expense list.

use std::collections::BTreeMap;

use api_types::expense::Category;
use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::{Expense, Money};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    pub total: Money,
    pub this_month: Money,
    pub this_week: Money,
    pub count: usize,
    /// Spending per category, largest first.
    pub by_category: Vec<(Category, Money)>,
}

impl Statistics {
    /// Aggregates `expenses` by occurrence date relative to `today`.
    ///
    /// `this_month` counts every expense dated on or after the first of
    /// `today`'s month, `this_week` every one on or after the most recent
    /// `week_start`. Neither has an upper bound, so an expense dated in the
    /// future still lands in both and `total` is always `this_month` plus the
    /// expenses dated before the month.
    pub fn compute(expenses: &[Expense], today: NaiveDate, week_start: Weekday) -> Self {
        let first_of_month = today.with_day(1).unwrap_or(today);
        let first_of_week = start_of_week(today, week_start);

        let mut stats = Statistics::default();
        let mut per_category: BTreeMap<Category, Money> = BTreeMap::new();

        for expense in expenses {
            stats.total += expense.amount;
            stats.count += 1;
            *per_category.entry(expense.category).or_default() += expense.amount;

            if expense.date >= first_of_month {
                stats.this_month += expense.amount;
            }
            if expense.date >= first_of_week {
                stats.this_week += expense.amount;
            }
        }

        stats.by_category = per_category.into_iter().collect();
        stats
            .by_category
            .sort_by(|(ca, a), (cb, b)| b.cmp(a).then(ca.cmp(cb)));
        stats
    }
}

/// Most recent `first` weekday on or before `day`.
pub fn start_of_week(day: NaiveDate, first: Weekday) -> NaiveDate {
    let back = (day.weekday().num_days_from_monday() + 7 - first.num_days_from_monday()) % 7;
    day.checked_sub_days(Days::new(u64::from(back)))
        .unwrap_or(day)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn expense(cents: i64, category: Category, date: &str) -> Expense {
        let now = Utc::now();
        Expense {
            id: format!("{cents}-{date}"),
            user_id: "u1".to_string(),
            amount: Money::new(cents),
            category,
            description: "x".to_string(),
            date: day(date),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn week_start_is_on_or_before_day() {
        // 2026-10-16 is a Friday.
        assert_eq!(start_of_week(day("2026-10-16"), Weekday::Mon), day("2026-10-12"));
        assert_eq!(start_of_week(day("2026-10-16"), Weekday::Sun), day("2026-10-11"));
        assert_eq!(start_of_week(day("2026-10-12"), Weekday::Mon), day("2026-10-12"));
    }

    #[test]
    fn empty_list_is_all_zero() {
        let stats = Statistics::compute(&[], day("2026-10-16"), Weekday::Mon);
        assert_eq!(stats, Statistics::default());
    }

    #[test]
    fn buckets_by_month_and_week() {
        let today = day("2026-10-16");
        let expenses = [
            expense(1000, Category::Food, "2026-10-15"),
            expense(200, Category::Food, "2026-10-02"),
            expense(3000, Category::Rent, "2026-09-30"),
            expense(50, Category::Other, "2025-10-15"),
        ];
        let stats = Statistics::compute(&expenses, today, Weekday::Mon);

        assert_eq!(stats.count, 4);
        assert_eq!(stats.total, Money::new(4250));
        assert_eq!(stats.this_month, Money::new(1200));
        assert_eq!(stats.this_week, Money::new(1000));
        assert_eq!(
            stats.by_category,
            vec![
                (Category::Rent, Money::new(3000)),
                (Category::Food, Money::new(1200)),
                (Category::Other, Money::new(50)),
            ]
        );
    }

    #[test]
    fn week_spanning_months_counts_previous_month_only_in_week() {
        // Thursday 2026-10-01: the week started on Monday 2026-09-28.
        let today = day("2026-10-01");
        let expenses = [
            expense(100, Category::Food, "2026-09-29"),
            expense(200, Category::Food, "2026-10-01"),
        ];
        let stats = Statistics::compute(&expenses, today, Weekday::Mon);
        assert_eq!(stats.this_week, Money::new(300));
        assert_eq!(stats.this_month, Money::new(200));
    }

    #[test]
    fn total_is_month_plus_older() {
        let today = day("2026-10-16");
        let expenses = [
            expense(1, Category::Food, "2026-10-01"),
            expense(20, Category::Food, "2026-10-31"),
            expense(300, Category::Food, "2026-08-01"),
            expense(4000, Category::Food, "2020-01-01"),
            expense(50000, Category::Food, "2026-11-25"),
        ];
        let stats = Statistics::compute(&expenses, today, Weekday::Sun);
        let older: Money = expenses
            .iter()
            .filter(|e| e.date < day("2026-10-01"))
            .map(|e| e.amount)
            .sum();
        assert_eq!(stats.total, stats.this_month + older);
        assert_eq!(stats.this_month, Money::new(50021));
    }

    #[test]
    fn future_dates_count_in_month_and_week() {
        let today = day("2026-10-16");
        let expenses = [
            expense(1000, Category::Food, "2026-11-25"),
            expense(200, Category::Food, "2026-10-11"),
        ];
        let stats = Statistics::compute(&expenses, today, Weekday::Mon);
        assert_eq!(stats.total, Money::new(1200));
        assert_eq!(stats.this_month, Money::new(1200));
        assert_eq!(stats.this_week, Money::new(1000));
    }
}
