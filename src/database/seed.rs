use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};

use super::{MemoryStore, TrackingRepository, UserRepository};
use crate::models::tracking::{EventEntry, EventType, ProductDetails, TrackingRecord};
use crate::models::user::User;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).single()
}

fn step(
    event_type: EventType,
    location: &str,
    timestamp: Option<DateTime<Utc>>,
    description: &str,
    actor: &str,
) -> EventEntry {
    EventEntry {
        event_type,
        location: location.to_string(),
        timestamp,
        description: description.to_string(),
        actor: actor.to_string(),
        status: None,
    }
}

fn details(id: &str, name: &str, description: &str, manufacturer: &str, category: &str) -> ProductDetails {
    ProductDetails {
        product_id: id.to_string(),
        product_name: name.to_string(),
        description: description.to_string(),
        manufacturer: manufacturer.to_string(),
        category: Some(category.to_string()),
        batch_number: None,
        expiry_date: None,
    }
}

/// Demo journeys shown by the dashboard and tracking screens
pub fn demo_products() -> Result<Vec<TrackingRecord>> {
    let coffee = TrackingRecord::from_history(
        details(
            "PRD123456",
            "Organic Coffee Beans",
            "Premium organic coffee beans from Colombia",
            "Colombian Coffee Co.",
            "Food & Beverage",
        ),
        at(2024, 1, 15, 8, 0).context("invalid seed date")?,
        vec![
            step(EventType::Registered, "Bogotá, Colombia", at(2024, 1, 15, 8, 0), "Product registered in supply chain", "Colombian Coffee Co."),
            step(EventType::QualityCheck, "Bogotá Processing Plant", at(2024, 1, 16, 10, 30), "Quality inspection passed", "Quality Inspector"),
            step(EventType::Shipped, "Port of Cartagena", at(2024, 1, 18, 14, 0), "Shipped via cargo vessel", "Shipping Company"),
            step(EventType::Customs, "Port of Miami", at(2024, 1, 22, 9, 15), "Customs clearance completed", "Customs Officer"),
            step(EventType::Received, "Miami Distribution Center", at(2024, 1, 22, 16, 45), "Arrived at distribution center", "Warehouse Manager"),
        ],
    )?;

    let tracked = TrackingRecord::from_history(
        details(
            "PR-2024-001",
            "Fair Trade Chocolate",
            "Ethically sourced dark chocolate",
            "Ethical Foods Ltd.",
            "Food & Beverage",
        ),
        at(2024, 2, 1, 9, 0).context("invalid seed date")?,
        vec![
            step(EventType::Registered, "Accra, Ghana", at(2024, 2, 1, 9, 0), "Manufactured", "Ethical Foods Ltd."),
            step(EventType::Shipped, "Port of Tema", at(2024, 2, 3, 11, 0), "Shipped to Rotterdam", "Maersk Line"),
            step(EventType::Delivered, "Amsterdam Retail Store", None, "Out for Delivery", "City Courier"),
        ],
    )?;

    let electronics = TrackingRecord::from_history(
        details(
            "PRD789012",
            "Electronic Components",
            "Surface-mount controller boards",
            "Austin Circuits Inc.",
            "Electronics",
        ),
        at(2024, 1, 20, 7, 0).context("invalid seed date")?,
        vec![
            step(EventType::Registered, "Austin Manufacturing", at(2024, 1, 20, 7, 0), "Production batch completed", "Austin Circuits Inc."),
            step(EventType::QualityCheck, "Austin Manufacturing", at(2024, 1, 22, 14, 30), "Quality inspection completed successfully", "Quality Inspector"),
        ],
    )?;

    let medical = TrackingRecord::from_history(
        details(
            "PRD345678",
            "Medical Supplies",
            "Sterile surgical kits",
            "MedLine Health",
            "Healthcare",
        ),
        at(2024, 1, 18, 6, 0).context("invalid seed date")?,
        vec![
            step(EventType::Registered, "Columbus Plant", at(2024, 1, 18, 6, 0), "Product registered in supply chain", "MedLine Health"),
            step(EventType::Shipped, "Interstate 70", at(2024, 1, 19, 8, 0), "Dispatched by refrigerated truck", "Logistics Coordinator"),
            step(EventType::Received, "Chicago Distribution Hub", at(2024, 1, 20, 13, 0), "Received at hub", "Warehouse Staff"),
            step(EventType::Delivered, "Chicago Hospital", at(2024, 1, 22, 12, 15), "Final delivery to end customer", "Delivery Driver"),
        ],
    )?;

    Ok(vec![coffee, tracked, electronics, medical])
}

pub fn demo_users() -> Result<Vec<User>> {
    let created = at(2024, 1, 10, 9, 0).context("invalid seed date")?;
    let user = |name: &str, email: &str, role: &str, company: &str, location: &str| User {
        id: uuid::Uuid::new_v4(),
        name: name.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        company: Some(company.to_string()),
        location: Some(location.to_string()),
        active: true,
        created_at: created,
    };

    Ok(vec![
        user("John Smith", "john@example.com", "Producer", "Colombian Coffee Co.", "Bogotá"),
        user("Sarah Johnson", "sarah@example.com", "Distributor", "Miami Logistics", "Miami"),
        user("Priya Patel", "priya@example.com", "Retailer", "Fresh Market", "Chicago"),
    ])
}

/// Load the demo data set, returning (products, users) inserted
pub async fn load(store: &MemoryStore) -> Result<(usize, usize)> {
    let products = demo_products()?;
    let users = demo_users()?;
    let counts = (products.len(), users.len());

    for record in products {
        TrackingRepository::insert(store, record)
            .await
            .context("Failed to seed demo product")?;
    }
    for user in users {
        UserRepository::insert(store, user)
            .await
            .context("Failed to seed demo user")?;
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tracking::ProductStatus;

    #[test]
    fn demo_records_respect_derivation() {
        for record in demo_products().unwrap() {
            let last = record.latest_completed().unwrap();
            assert_eq!(record.current_status(), last.status, "{}", record.product_id);
            assert_eq!(record.current_location(), last.location, "{}", record.product_id);
        }
    }

    #[tokio::test]
    async fn load_fills_the_store() {
        let store = MemoryStore::default();
        let (products, users) = load(&store).await.unwrap();
        assert_eq!(products, 4);
        assert_eq!(users, 3);

        let coffee = store.get("PRD123456").await.unwrap().unwrap();
        assert_eq!(coffee.current_status(), ProductStatus::AtDistributor);
        assert_eq!(coffee.current_location(), "Miami Distribution Center");
    }
}
