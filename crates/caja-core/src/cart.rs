//! # Cart
//!
//! The cart handed to checkout: a mapping from product id to a decimal
//! quantity string, exactly as the register screen keeps it.
//!
//! ```text
//! {"9f1c…": "2", "b07e…": "0.5"}
//!        │
//!        ▼  Cart::from_lines / serde
//! Cart { lines: BTreeMap<product_id, Quantity> }
//!        │
//!        ▼  Cart::validate  (non-empty, size limit, positive quantities)
//! CheckoutEngine
//! ```
//!
//! Lines are kept sorted by product id so that every sale touches product
//! rows in the same order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::quantity::Quantity;
use crate::{BULK_INCREMENT, MAX_CART_ITEMS};

/// One line of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine<'a> {
    pub product_id: &'a str,
    pub quantity: Quantity,
}

/// A set of product quantities waiting to be sold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: BTreeMap<String, Quantity>,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    /// Builds a cart from `(product_id, "decimal quantity")` pairs.
    ///
    /// Repeated product ids are merged.
    pub fn from_lines<'a, I>(lines: I) -> CoreResult<Cart>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut cart = Cart::new();
        for (product_id, quantity) in lines {
            let quantity: Quantity = quantity.parse()?;
            cart.add(product_id, quantity)?;
        }
        Ok(cart)
    }

    /// Adds `quantity` of a product, merging with an existing line.
    pub fn add(&mut self, product_id: &str, quantity: Quantity) -> CoreResult<()> {
        if !quantity.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        if !self.lines.contains_key(product_id) && self.lines.len() >= MAX_CART_ITEMS {
            return Err(too_many_items().into());
        }

        *self.lines.entry(product_id.to_string()).or_default() += quantity;
        Ok(())
    }

    /// One click on a product tile: half a kilo for bulk goods, one unit otherwise.
    pub fn increment(&mut self, product_id: &str, is_bulk: bool) -> CoreResult<()> {
        let step = if is_bulk {
            BULK_INCREMENT.parse::<Quantity>()?
        } else {
            Quantity::from_units(1)
        };
        self.add(product_id, step)
    }

    /// Replaces the quantity of a line. A zero quantity removes it.
    pub fn set(&mut self, product_id: &str, quantity: Quantity) -> CoreResult<()> {
        if quantity.is_negative() {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }
        if quantity == Quantity::zero() {
            self.remove(product_id);
            return Ok(());
        }
        self.lines.remove(product_id);
        self.add(product_id, quantity)
    }

    pub fn remove(&mut self, product_id: &str) -> Option<Quantity> {
        self.lines.remove(product_id)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn quantity_of(&self, product_id: &str) -> Option<Quantity> {
        self.lines.get(product_id).copied()
    }

    /// Lines in product id order.
    pub fn lines(&self) -> impl Iterator<Item = CartLine<'_>> {
        self.lines.iter().map(|(product_id, quantity)| CartLine {
            product_id,
            quantity: *quantity,
        })
    }

    /// Checks a cart before checkout.
    ///
    /// A deserialized cart has not gone through [`Cart::add`], so every rule
    /// is checked again here.
    pub fn validate(&self) -> CoreResult<()> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        if self.lines.len() > MAX_CART_ITEMS {
            return Err(too_many_items().into());
        }
        for (product_id, quantity) in &self.lines {
            if product_id.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "product_id".to_string(),
                }
                .into());
            }
            if !quantity.is_positive() {
                return Err(ValidationError::MustBePositive {
                    field: format!("quantity of {}", product_id),
                }
                .into());
            }
        }
        Ok(())
    }
}

fn too_many_items() -> ValidationError {
    ValidationError::OutOfRange {
        field: "cart items".to_string(),
        min: 1,
        max: MAX_CART_ITEMS as i64,
    }
}
