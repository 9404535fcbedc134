//! # Cart
//!
//! A user's mutable pre-purchase selection and the service that edits it.

use crate::catalog::{ProductId, UserId};
use crate::error::{CommerceError, CommerceResult};
use crate::money::Amount;
use crate::store::SharedStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

pub type CartId = i64;
pub type CartLineId = i64;

/// A cart header. `version` is bumped on every line mutation so checkout can
/// detect a cart that changed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub version: u64,
}

/// One product in a cart; at most one line per (cart, product)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Catalog price when the line was first added
    pub price_at_add: Amount,
}

impl CartLine {
    pub fn total(&self) -> CommerceResult<Amount> {
        self.price_at_add.times(self.quantity)
    }
}

/// A cart together with its lines, in insertion order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartWithLines {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
}

impl CartWithLines {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total(&self) -> CommerceResult<Amount> {
        Amount::sum(self.lines.iter().map(CartLine::total))
    }
}

/// Edits carts on behalf of users
#[derive(Clone)]
pub struct CartService {
    store: SharedStore,
}

impl CartService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Return the user's cart, creating an empty one on first access
    #[instrument(skip(self))]
    pub async fn get_user_cart(&self, user_id: UserId) -> CommerceResult<CartWithLines> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| CommerceError::NotFound(format!("user {}", user_id)))?;

        self.store.upsert_cart(user_id).await
    }

    /// Add a product, or increment its quantity if already in the cart
    #[instrument(skip(self))]
    pub async fn add_or_update_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> CommerceResult<CartLine> {
        let quantity = positive_quantity(quantity, "quantity")?;
        let cart = self.get_user_cart(user_id).await?;

        let product = self
            .store
            .find_product(product_id)
            .await?
            .ok_or_else(|| CommerceError::NotFound(format!("product {}", product_id)))?;

        let line = match self
            .store
            .add_cart_line(cart.cart.id, product.id, quantity, product.price)
            .await
        {
            Err(CommerceError::NotFound(_)) => {
                // The cart was checked out after it was read; start the next one
                debug!(cart_id = cart.cart.id, "cart gone before add, retrying");
                let cart = self.store.upsert_cart(user_id).await?;
                self.store
                    .add_cart_line(cart.cart.id, product.id, quantity, product.price)
                    .await?
            }
            result => result?,
        };

        debug!(cart_id = line.cart_id, quantity = line.quantity, "cart line saved");
        Ok(line)
    }

    /// Overwrite the quantity of a product already in the cart
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        new_quantity: i64,
    ) -> CommerceResult<Option<CartLine>> {
        let new_quantity = positive_quantity(new_quantity, "new quantity")?;
        let cart = self.get_user_cart(user_id).await?;

        self.store
            .set_cart_line_quantity(cart.cart.id, product_id, new_quantity)
            .await
    }

    /// Remove a product from the cart; `false` if it was not there
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, product_id: ProductId) -> CommerceResult<bool> {
        let cart = self.get_user_cart(user_id).await?;
        self.store.remove_cart_line(cart.cart.id, product_id).await
    }
}

fn positive_quantity(quantity: i64, what: &str) -> CommerceResult<u32> {
    if quantity <= 0 {
        return Err(CommerceError::InvalidState(format!(
            "{} must be positive",
            what
        )));
    }
    u32::try_from(quantity)
        .map_err(|_| CommerceError::InvalidState(format!("{} is too large", what)))
}
