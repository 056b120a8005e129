use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{BoxdropError, Result};

macro_rules! record_id {
    ($name:ident, $label:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        #[cfg_attr(feature = "database", derive(sqlx::Type), sqlx(transparent))]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $label, self.0)
            }
        }
    };
}

record_id!(StoreId, "store");
record_id!(BoxTypeId, "box_type");
record_id!(DeliveryId, "delivery");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    /// Free-form phone as typed by the operator. Normalized only when a
    /// receipt is dispatched.
    pub phone: Option<String>,
    pub address: Option<String>,
    pub keywords: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxType {
    pub id: BoxTypeId,
    pub type_name: String,
    pub keywords: Option<String>,
}

/// One shipment of boxes to a store.
///
/// `receipt_number` and `generated_image_path` start unset and are written
/// once by the receipt workflow; a number is never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: DeliveryId,
    pub store_id: StoreId,
    pub box_type_id: BoxTypeId,
    pub date: NaiveDate,
    pub delivery_content: Option<String>,
    pub quantity_carton: i32,
    pub quantity_basket: i32,
    pub vehicle_number: Option<String>,
    pub exit_time: Option<String>,
    pub receipt_number: Option<i64>,
    pub generated_image_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewStore {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
}

impl NewStore {
    pub fn validated(self) -> Result<Self> {
        Ok(Self {
            name: required(self.name, "store name", NAME_MAX)?,
            phone: optional(self.phone, "phone", SHORT_MAX)?,
            address: optional(self.address, "address", ADDRESS_MAX)?,
            keywords: optional(self.keywords, "keywords", TEXT_MAX)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBoxType {
    pub type_name: String,
    #[serde(default)]
    pub keywords: Option<String>,
}

impl NewBoxType {
    pub fn validated(self) -> Result<Self> {
        Ok(Self {
            type_name: required(self.type_name, "box type name", NAME_MAX)?,
            keywords: optional(self.keywords, "keywords", TEXT_MAX)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDelivery {
    pub store_id: StoreId,
    pub box_type_id: BoxTypeId,
    pub date: NaiveDate,
    #[serde(default)]
    pub delivery_content: Option<String>,
    #[serde(default)]
    pub quantity_carton: Option<i32>,
    #[serde(default)]
    pub quantity_basket: Option<i32>,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    #[serde(default)]
    pub exit_time: Option<String>,
}

impl NewDelivery {
    /// Trim free-text fields, default missing quantities to zero and reject
    /// negative ones.
    pub fn validated(self) -> Result<ValidDelivery> {
        Ok(ValidDelivery {
            store_id: self.store_id,
            box_type_id: self.box_type_id,
            date: self.date,
            delivery_content: optional(self.delivery_content, "delivery_content", TEXT_MAX)?,
            quantity_carton: quantity(self.quantity_carton, "quantity_carton")?,
            quantity_basket: quantity(self.quantity_basket, "quantity_basket")?,
            vehicle_number: optional(self.vehicle_number, "vehicle_number", SHORT_MAX)?,
            exit_time: optional(self.exit_time, "exit_time", EXIT_TIME_MAX)?,
        })
    }
}

/// A delivery that passed input validation and is ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDelivery {
    pub store_id: StoreId,
    pub box_type_id: BoxTypeId,
    pub date: NaiveDate,
    pub delivery_content: Option<String>,
    pub quantity_carton: i32,
    pub quantity_basket: i32,
    pub vehicle_number: Option<String>,
    pub exit_time: Option<String>,
}

/// Everything the receipt workflow needs to know about one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptContext {
    pub delivery: Delivery,
    pub store: Store,
    /// `None` when the referenced box type row is gone.
    pub box_type: Option<BoxType>,
}

// Column widths of the schema, counted in characters.
const NAME_MAX: usize = 100;
const SHORT_MAX: usize = 20;
const ADDRESS_MAX: usize = 200;
const TEXT_MAX: usize = 500;
const EXIT_TIME_MAX: usize = 10;

fn required(value: String, field: &str, max: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BoxdropError::InvalidInput(format!("{field} must not be empty")));
    }
    within(trimmed, field, max)?;
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>, field: &str, max: usize) -> Result<Option<String>> {
    let Some(trimmed) = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    else {
        return Ok(None);
    };
    within(&trimmed, field, max)?;
    Ok(Some(trimmed))
}

fn within(value: &str, field: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(BoxdropError::InvalidInput(format!(
            "{field} must be at most {max} characters (got {len})"
        )));
    }
    Ok(())
}

fn quantity(value: Option<i32>, field: &str) -> Result<i32> {
    match value.unwrap_or(0) {
        n if n < 0 => Err(BoxdropError::InvalidInput(format!(
            "{field} must not be negative (got {n})"
        ))),
        n => Ok(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_delivery() -> NewDelivery {
        NewDelivery {
            store_id: StoreId(1),
            box_type_id: BoxTypeId(2),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            delivery_content: Some("   ".into()),
            quantity_carton: Some(3),
            quantity_basket: None,
            vehicle_number: Some(" 12-345-67 ".into()),
            exit_time: None,
        }
    }

    #[test]
    fn delivery_validation_trims_and_defaults() {
        let valid = new_delivery().validated().unwrap();
        assert_eq!(valid.delivery_content, None);
        assert_eq!(valid.quantity_carton, 3);
        assert_eq!(valid.quantity_basket, 0);
        assert_eq!(valid.vehicle_number.as_deref(), Some("12-345-67"));
    }

    #[test]
    fn negative_quantities_are_rejected() {
        let mut input = new_delivery();
        input.quantity_basket = Some(-1);
        let err = input.validated().unwrap_err();
        assert!(matches!(err, BoxdropError::InvalidInput(msg) if msg.contains("quantity_basket")));
    }

    #[test]
    fn blank_store_name_is_rejected() {
        let err = NewStore {
            name: "  ".into(),
            ..Default::default()
        }
        .validated()
        .unwrap_err();
        assert!(matches!(err, BoxdropError::InvalidInput(_)));
    }

    #[test]
    fn fields_longer_than_their_columns_are_rejected() {
        let err = NewStore {
            name: "x".repeat(101),
            ..Default::default()
        }
        .validated()
        .unwrap_err();
        assert!(matches!(err, BoxdropError::InvalidInput(msg) if msg.contains("store name")));

        let err = NewStore {
            name: "Corner Market".into(),
            phone: Some("0".repeat(21)),
            ..Default::default()
        }
        .validated()
        .unwrap_err();
        assert!(matches!(err, BoxdropError::InvalidInput(msg) if msg.contains("phone")));

        let mut input = new_delivery();
        input.exit_time = Some("07:30 in the morning".into());
        let err = input.validated().unwrap_err();
        assert!(matches!(err, BoxdropError::InvalidInput(msg) if msg.contains("exit_time")));

        let mut input = new_delivery();
        input.delivery_content = Some("x".repeat(501));
        assert!(input.validated().is_err());
    }

    #[test]
    fn column_width_counts_characters_not_bytes() {
        let store = NewStore {
            name: "ש".repeat(100),
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert_eq!(store.name.chars().count(), 100);
    }

    #[test]
    fn ids_display_with_their_kind() {
        assert_eq!(DeliveryId(7).to_string(), "delivery:7");
        assert_eq!(StoreId(3).to_string(), "store:3");
    }
}
