//! Catalog entities: clients and products.

use chrono::NaiveDate;
use common::{ClientId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::{InvalidReason, Result};
use crate::money::Money;

/// A registered client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub registered_on: NaiveDate,
}

/// Input for registering a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub registered_on: Option<NaiveDate>,
}

impl NewClient {
    /// Creates a client input with only the required names.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            phone: None,
            address: None,
            registered_on: None,
        }
    }

    /// Sets the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Trims every field, drops blank optional fields and checks that
    /// both names are present.
    pub fn validate(self) -> Result<NewClient> {
        let first_name = self.first_name.trim().to_string();
        if first_name.is_empty() {
            return Err(InvalidReason::MissingFirstName.into());
        }
        let last_name = self.last_name.trim().to_string();
        if last_name.is_empty() {
            return Err(InvalidReason::MissingLastName.into());
        }

        Ok(NewClient {
            first_name,
            last_name,
            email: non_blank(self.email),
            phone: non_blank(self.phone),
            address: non_blank(self.address),
            registered_on: self.registered_on,
        })
    }
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: i64,
    pub created_on: NaiveDate,
}

impl Product {
    /// Returns true if `quantity` units can be taken from current stock.
    pub fn has_stock_for(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

/// Input for adding a product to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    pub stock: i64,
    #[serde(default)]
    pub created_on: Option<NaiveDate>,
}

impl NewProduct {
    /// Creates a product input without description or creation date.
    pub fn new(name: impl Into<String>, price: Money, stock: i64) -> Self {
        Self {
            name: name.into(),
            description: None,
            price,
            stock,
            created_on: None,
        }
    }

    /// Checks the name, sellable price and stock level.
    pub fn validate(self) -> Result<NewProduct> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(InvalidReason::MissingName.into());
        }
        if !self.price.is_positive() {
            return Err(InvalidReason::BadPrice.into());
        }
        if self.stock < 0 {
            return Err(InvalidReason::BadStock.into());
        }

        Ok(NewProduct {
            name,
            description: non_blank(self.description),
            price: self.price,
            stock: self.stock,
            created_on: self.created_on,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
