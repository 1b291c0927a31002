//! Deterministic mock data.
//!
//! Two generators built with the same seed produce identical records. Dates
//! count back from a fixed reference day so output does not drift over time.

use chrono::{NaiveDate, TimeDelta};
use rand::prelude::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde_json::{Value, json};

use crate::store::Record;

const FIRST_NAMES_F: &[&str] = &[
    "Sarah", "Emily", "Ngozi", "Amaka", "Funmi", "Grace", "Blessing", "Zainab", "Ada", "Kemi",
];
const FIRST_NAMES_M: &[&str] = &[
    "David", "Tunde", "Chidi", "Emeka", "Musa", "Samuel", "Ibrahim", "Femi", "Kunle", "John",
];
const LAST_NAMES: &[&str] = &[
    "Williams", "Brown", "Jones", "Okafor", "Adeyemi", "Bello", "Eze", "Johnson", "Okonkwo",
    "Balogun", "Nwosu", "Garba",
];
const LOCATIONS: &[&str] = &[
    "Lagos", "Abuja", "Ibadan", "Enugu", "Kano", "Benin City", "Port Harcourt", "Jos",
];
const POVERTY_STATUS: &[&str] = &["Own", "Rent", "Homeless", "Family"];
const ITEMS: &[&str] = &["Rice", "Beans", "Oil", "Garri", "Clothing", "Soap", "Sugar"];
const DISBURSEMENT_STATUS: &[&str] = &["Pending", "Delivered", "Cancelled"];
const PROGRAMME_OPTIONS: &[&str] = &["Yes", "No", "Pending"];
const ASSET_NAMES: &[&str] = &["Delivery Van", "Warehouse", "Laptops", "Generator", "Office Furniture"];
const ASSET_CATEGORIES: &[&str] = &["Fixed", "Current", "Equipment"];
const LIABILITY_NAMES: &[&str] = &["Bank Loan", "Supplier Credit", "Rent Payable", "Salaries Payable"];
const LIABILITY_CATEGORIES: &[&str] = &["Short-term", "Long-term"];
const RECEIPT_TYPES: &[&str] = &["Cash", "Transfer", "Cheque", "In-kind"];
const PAYMENT_DETAILS: &[&str] = &[
    "Food purchase", "Fuel", "Transport", "Utility bill", "Staff welfare", "Printing",
];
const PAYMENT_TYPES: &[&str] = &["Cash", "Transfer", "POS"];
const ROLES: &[&str] = &["Admin", "Editor", "Viewer"];

/// Seedable record generator.
#[derive(Debug, Clone)]
pub struct Generator {
    rng: Pcg64,
    reference: NaiveDate,
}

impl Generator {
    /// Creates a generator. The same seed yields the same records.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg64::seed_from_u64(seed),
            reference: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap_or_default(),
        }
    }

    fn pick(&mut self, pool: &[&str]) -> String {
        pool.choose(&mut self.rng).copied().unwrap_or_default().to_string()
    }

    fn date(&mut self) -> String {
        let days = self.rng.random_range(0..540);
        (self.reference - TimeDelta::days(days))
            .format("%Y-%m-%d")
            .to_string()
    }

    fn person(&mut self) -> (String, String, &'static str) {
        let female = self.rng.random_bool(0.5);
        let first = if female {
            self.pick(FIRST_NAMES_F)
        } else {
            self.pick(FIRST_NAMES_M)
        };
        let last = self.pick(LAST_NAMES);
        (first, last, if female { "Female" } else { "Male" })
    }

    fn pin(&mut self) -> String {
        format!("{:06}", self.rng.random_range(100_000..1_000_000))
    }

    fn amount(&mut self, low: u32, high: u32) -> f64 {
        f64::from(self.rng.random_range(low..high)) * 50.0
    }

    fn records(&mut self, n: usize, mut make: impl FnMut(&mut Self) -> Value) -> Vec<Record> {
        (0..n)
            .filter_map(|_| match make(self) {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()
    }

    /// Beneficiaries.
    pub fn users(&mut self, n: usize) -> Vec<Record> {
        self.records(n, |g| {
            let (first, last, gender) = g.person();
            json!({
                "date": g.date(),
                "first_name": first,
                "last_name": last,
                "gender": gender,
                "age": g.rng.random_range(18..80),
                "location": g.pick(LOCATIONS),
                "poverty_status": g.pick(POVERTY_STATUS),
                "pin": g.pin(),
                "score": g.rng.random_range(0..40),
            })
        })
    }

    pub fn donors(&mut self, n: usize) -> Vec<Record> {
        self.records(n, |g| {
            let (first, last, gender) = g.person();
            json!({
                "date": g.date(),
                "donor_id": format!("DN-{:04}", g.rng.random_range(1..10_000)),
                "email": format!("{}.{}@example.org", first.to_lowercase(), last.to_lowercase()),
                "phone_number": format!("080{:08}", g.rng.random_range(0..100_000_000)),
                "address": format!("{} {} Street, {}", g.rng.random_range(1..200), g.pick(LAST_NAMES), g.pick(LOCATIONS)),
                "first_name": first,
                "last_name": last,
                "gender": gender,
            })
        })
    }

    /// Archived donors, restorable into the donor list.
    pub fn archived(&mut self, n: usize) -> Vec<Record> {
        self.records(n, |g| {
            let (first, last, gender) = g.person();
            json!({
                "date": g.date(),
                "first_name": first,
                "last_name": last,
                "pin": g.pin(),
                "gender": gender,
                "email": format!("{}.{}@example.org", first.to_lowercase(), last.to_lowercase()),
            })
        })
    }

    pub fn programmes(&mut self, n: usize) -> Vec<Record> {
        self.records(n, |g| {
            let (first, last, _) = g.person();
            json!({
                "date": g.date(),
                "name_of_beneficiary": format!("{first} {last}"),
                "safety_net": g.pick(PROGRAMME_OPTIONS),
                "upliftment_project": g.pick(PROGRAMME_OPTIONS),
                "referral_to_micro-credit": g.pick(PROGRAMME_OPTIONS),
            })
        })
    }

    pub fn disbursements(&mut self, n: usize) -> Vec<Record> {
        self.records(n, |g| {
            let (first, last, gender) = g.person();
            let count = g.rng.random_range(1..4);
            let items: Vec<String> = (0..count).map(|_| g.pick(ITEMS)).collect();
            json!({
                "date": g.date(),
                "receiver": format!("{first} {last}"),
                "pin": g.pin(),
                "gender": gender,
                "status": g.pick(DISBURSEMENT_STATUS),
                "item_category": if count > 1 { "Multiple Items".to_string() } else { items[0].clone() },
                "item": items[0].clone(),
                "items": items,
            })
        })
    }

    pub fn assets(&mut self, n: usize) -> Vec<Record> {
        self.records(n, |g| {
            json!({
                "name": g.pick(ASSET_NAMES),
                "category": g.pick(ASSET_CATEGORIES),
                "amount": g.amount(100, 20_000),
                "date": g.date(),
            })
        })
    }

    pub fn liabilities(&mut self, n: usize) -> Vec<Record> {
        self.records(n, |g| {
            json!({
                "name": g.pick(LIABILITY_NAMES),
                "category": g.pick(LIABILITY_CATEGORIES),
                "amount": g.amount(100, 10_000),
                "date": g.date(),
            })
        })
    }

    pub fn receipts(&mut self, n: usize) -> Vec<Record> {
        self.records(n, |g| {
            let (first, last, _) = g.person();
            json!({
                "date": g.date(),
                "donor_name": format!("{first} {last}"),
                "amount": g.amount(10, 2_000),
                "receipt_type": g.pick(RECEIPT_TYPES),
            })
        })
    }

    pub fn expenses(&mut self, n: usize) -> Vec<Record> {
        self.records(n, |g| {
            json!({
                "date": g.date(),
                "payment_details": g.pick(PAYMENT_DETAILS),
                "amount": g.amount(10, 1_000),
                "payment_type": g.pick(PAYMENT_TYPES),
            })
        })
    }

    /// Donated items, for the donor domain report.
    pub fn donations(&mut self, n: usize) -> Vec<Record> {
        self.records(n, |g| {
            let (first, last, _) = g.person();
            json!({
                "date": g.date(),
                "name_of_donor": format!("{first} {last}"),
                "item": g.pick(ITEMS),
                "quantity": g.rng.random_range(1..50),
                "amount": g.amount(10, 2_000),
            })
        })
    }

    /// Dashboard operators.
    pub fn staff(&mut self, n: usize) -> Vec<Record> {
        self.records(n, |g| {
            let (first, last, _) = g.person();
            json!({
                "date": g.date(),
                "first_name": first,
                "last_name": last,
                "email": format!("{}@ehicentre.org", first.to_lowercase()),
                "role": g.pick(ROLES),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_records() {
        let a = Generator::new(7).donors(20);
        let b = Generator::new(7).donors(20);
        let c = Generator::new(8).donors(20);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_records_have_display_fields() {
        let mut g = Generator::new(1);
        let users = g.users(5);
        assert_eq!(users.len(), 5);
        for user in &users {
            for key in ["date", "first_name", "last_name", "pin", "gender", "age"] {
                assert!(user.contains_key(key), "missing {key}");
            }
            assert_eq!(user["pin"].as_str().unwrap().len(), 6);
            let date = NaiveDate::parse_from_str(user["date"].as_str().unwrap(), "%Y-%m-%d").unwrap();
            assert!(date <= NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
        }
        for d in g.disbursements(10) {
            let items = d["items"].as_array().unwrap();
            let expected = if items.len() > 1 { "Multiple Items" } else { items[0].as_str().unwrap() };
            assert_eq!(d["item_category"], expected);
        }
    }
}
