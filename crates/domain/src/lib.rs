//! Domain layer for the sales admin service.
//!
//! This crate provides the entities and value objects shared by the
//! stores and the sale coordinator:
//! - [`Money`] decimal amounts with fixed two-digit rounding
//! - Catalog entities: [`Client`], [`Product`] and their creation inputs
//! - Ledger entities: [`Sale`], [`LineItem`]
//! - [`SalePlan`], the pure pricing step that turns validated lines into
//!   rows whose totals are derived rather than trusted

pub mod catalog;
pub mod error;
pub mod money;
pub mod sale;

pub use catalog::{Client, NewClient, NewProduct, Product};
pub use error::{DomainError, InvalidReason, Result};
pub use money::{MONEY_SCALE, Money};
pub use sale::{
    LineItem, NewLineItem, NewSale, PlannedLine, RequestedItem, Sale, SalePlan, SaleRequest,
    subtotal, total,
};
