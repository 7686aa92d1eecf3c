//! Sales, line items and the pricing of a sale request.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use common::{ClientId, LineItemId, ProductId, SaleId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{InvalidReason, Result};
use crate::money::Money;

/// A committed sale header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub client_id: ClientId,
    pub sale_date: NaiveDate,
    pub total: Money,
}

impl Sale {
    /// Returns true if the stored total matches the given line items.
    pub fn is_consistent_with(&self, items: &[LineItem]) -> bool {
        items.iter().all(LineItem::is_consistent)
            && total(items.iter().map(|i| i.subtotal)).is_ok_and(|total| total == self.total)
    }
}

/// A committed line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub sale_id: SaleId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

impl LineItem {
    /// Returns true if the subtotal equals the rounded quantity times unit price.
    pub fn is_consistent(&self) -> bool {
        subtotal(self.quantity, self.unit_price).is_ok_and(|subtotal| subtotal == self.subtotal)
    }
}

/// Computes `round(quantity * unit_price, 2)`.
///
/// Fails with [`InvalidReason::AmountTooLarge`] when the result cannot be
/// represented or stored.
pub fn subtotal(quantity: u32, unit_price: Money) -> Result<Money> {
    unit_price
        .checked_multiply(quantity)
        .map(|amount| amount.rounded())
        .filter(Money::fits_stored)
        .ok_or_else(|| InvalidReason::AmountTooLarge.into())
}

/// Sums rounded subtotals into a sale total, with the same limits as
/// [`subtotal`].
pub fn total(subtotals: impl IntoIterator<Item = Money>) -> Result<Money> {
    subtotals
        .into_iter()
        .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
        .map(|amount| amount.rounded())
        .filter(Money::fits_stored)
        .ok_or_else(|| InvalidReason::AmountTooLarge.into())
}

/// One product line as submitted by a caller.
///
/// Quantity is kept signed so that negative input reaches validation
/// instead of failing deserialization. A missing unit price means the
/// product's current catalog price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedItem {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
}

impl RequestedItem {
    /// Creates a requested item with an explicit unit price.
    pub fn new(product_id: ProductId, quantity: i64, unit_price: Decimal) -> Self {
        Self {
            product_id,
            quantity,
            unit_price: Some(unit_price),
        }
    }

    /// Creates a requested item priced at the product's catalog price.
    pub fn at_catalog_price(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
            unit_price: None,
        }
    }

    /// Returns the quantity if it is a positive integer that fits a line.
    pub fn checked_quantity(&self) -> Result<u32> {
        match u32::try_from(self.quantity) {
            Ok(quantity) if quantity > 0 => Ok(quantity),
            _ => Err(InvalidReason::BadQuantity.into()),
        }
    }

    /// Returns the unit price to snapshot, falling back to `catalog_price`.
    pub fn checked_unit_price(&self, catalog_price: Money) -> Result<Money> {
        let price = self.unit_price.map(Money::new).unwrap_or(catalog_price);
        if price.is_negative() {
            return Err(InvalidReason::BadPrice.into());
        }
        Ok(price)
    }
}

/// A sale submission: who buys, when, and what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    pub client_id: ClientId,
    #[serde(default)]
    pub sale_date: Option<NaiveDate>,
    pub items: Vec<RequestedItem>,
}

impl SaleRequest {
    /// Creates a request dated today.
    pub fn new(client_id: ClientId, items: Vec<RequestedItem>) -> Self {
        Self {
            client_id,
            sale_date: None,
            items,
        }
    }

    /// Sets the sale date.
    pub fn on(mut self, sale_date: NaiveDate) -> Self {
        self.sale_date = Some(sale_date);
        self
    }
}

/// A validated, priced line ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// A fully priced sale.
///
/// Subtotals and the total are always derived here, never taken from the
/// caller. `demand` holds the summed quantity per product, ordered by
/// product id, which is both the stock check input and the lock order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalePlan {
    client_id: ClientId,
    sale_date: NaiveDate,
    lines: Vec<PlannedLine>,
    total: Money,
    demand: BTreeMap<ProductId, i64>,
}

impl SalePlan {
    /// Prices `(product, quantity, unit price)` lines into a plan.
    pub fn new(
        client_id: ClientId,
        sale_date: NaiveDate,
        priced: impl IntoIterator<Item = (ProductId, u32, Money)>,
    ) -> Result<Self> {
        let lines = priced
            .into_iter()
            .map(|(product_id, quantity, unit_price)| {
                Ok(PlannedLine {
                    product_id,
                    quantity,
                    unit_price,
                    subtotal: subtotal(quantity, unit_price)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if lines.is_empty() {
            return Err(InvalidReason::EmptySale.into());
        }

        let total = total(lines.iter().map(|l| l.subtotal))?;

        let mut demand = BTreeMap::new();
        for line in &lines {
            *demand.entry(line.product_id).or_insert(0) += i64::from(line.quantity);
        }

        Ok(Self {
            client_id,
            sale_date,
            lines,
            total,
            demand,
        })
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn sale_date(&self) -> NaiveDate {
        self.sale_date
    }

    pub fn lines(&self) -> &[PlannedLine] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.total
    }

    /// Summed quantity per product, ascending by product id.
    pub fn demand(&self) -> impl Iterator<Item = (ProductId, i64)> + '_ {
        self.demand.iter().map(|(id, qty)| (*id, *qty))
    }

    /// The sale header to insert.
    pub fn new_sale(&self) -> NewSale {
        NewSale {
            client_id: self.client_id,
            sale_date: self.sale_date,
            total: self.total,
        }
    }

    /// The line item rows to insert under `sale_id`.
    pub fn new_line_items(&self, sale_id: SaleId) -> Vec<NewLineItem> {
        self.lines
            .iter()
            .map(|line| NewLineItem {
                sale_id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal: line.subtotal,
            })
            .collect()
    }
}

/// A sale header row about to be inserted. Only built from a [`SalePlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    client_id: ClientId,
    sale_date: NaiveDate,
    total: Money,
}

impl NewSale {
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn sale_date(&self) -> NaiveDate {
        self.sale_date
    }

    pub fn total(&self) -> Money {
        self.total
    }
}

/// A line item row about to be inserted. Only built from a [`SalePlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    sale_id: SaleId,
    product_id: ProductId,
    quantity: u32,
    unit_price: Money,
    subtotal: Money,
}

impl NewLineItem {
    pub fn sale_id(&self) -> SaleId {
        self.sale_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    /// Attaches the id assigned by the ledger.
    pub fn into_line_item(self, id: LineItemId) -> LineItem {
        LineItem {
            id,
            sale_id: self.sale_id,
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
            subtotal: self.subtotal,
        }
    }
}
