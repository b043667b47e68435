//! JSON request/response surface.
//!
//! A request is an [`Envelope`]: the caller's credentials plus one tagged
//! operation. Every outcome, success or failure, is a [`WireResponse`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use souk_commerce::order::OrderNumber;
use souk_commerce::{
    CartItemId, CommerceError, ErrorKind, GuestToken, LineOptions, Money, Owner, ProductId,
};
use souk_store::Store;

use crate::checkout::CheckoutRequest;
use crate::identity::Credentials;
use crate::Storefront;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub credentials: Credentials,
    pub request: WireRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WireRequest {
    ListCart,
    AddItem {
        product_id: ProductId,
        quantity: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    UpdateQuantity {
        item_id: CartItemId,
        quantity: i64,
    },
    RemoveItem {
        item_id: CartItemId,
    },
    ClearCart,
    /// Without a subtotal, the caller's live cart subtotal is used.
    ValidateDiscount {
        code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subtotal: Option<Money>,
    },
    Checkout(CheckoutRequest),
    /// Requires a verified bearer; merges the guest cart, if any.
    Login,
    GetOrder {
        order_number: OrderNumber,
    },
}

impl WireRequest {
    pub fn op(&self) -> &'static str {
        match self {
            WireRequest::ListCart => "list_cart",
            WireRequest::AddItem { .. } => "add_item",
            WireRequest::UpdateQuantity { .. } => "update_quantity",
            WireRequest::RemoveItem { .. } => "remove_item",
            WireRequest::ClearCart => "clear_cart",
            WireRequest::ValidateDiscount { .. } => "validate_discount",
            WireRequest::Checkout(_) => "checkout",
            WireRequest::Login => "login",
            WireRequest::GetOrder { .. } => "get_order",
        }
    }

    /// Cart operations create an owner on the fly when none is present.
    fn mints_guest(&self) -> bool {
        matches!(
            self,
            WireRequest::ListCart
                | WireRequest::AddItem { .. }
                | WireRequest::UpdateQuantity { .. }
                | WireRequest::RemoveItem { .. }
                | WireRequest::ClearCart
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&CommerceError> for WireError {
    fn from(err: &CommerceError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
    /// A guest token minted for this request; the client must keep it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_token: Option<GuestToken>,
}

impl WireResponse {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            guest_token: None,
        }
    }

    pub fn failure(err: &CommerceError) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(err.into()),
            guest_token: None,
        }
    }

    fn with_guest_token(mut self, token: Option<GuestToken>) -> Self {
        self.guest_token = token;
        self
    }
}

impl<S: Store> Storefront<S> {
    /// Serve one envelope.
    pub async fn handle(&self, envelope: Envelope) -> WireResponse {
        let op = envelope.request.op();
        let (owner, minted) = if envelope.request.mints_guest() {
            let (owner, minted) = self.identity.resolve_or_mint(&envelope.credentials).await;
            (Ok(owner), minted)
        } else {
            (self.identity.resolve(&envelope.credentials).await, None)
        };

        match self
            .dispatch(owner, &envelope.credentials, envelope.request)
            .await
        {
            Ok(data) => WireResponse::success(data).with_guest_token(minted),
            Err(err) => {
                match err.kind() {
                    ErrorKind::Infrastructure => tracing::error!(op, error = %err, "request failed"),
                    _ => tracing::debug!(op, error = %err, "request refused"),
                }
                // A token that was minted but never used to write is still
                // the client's identity.
                WireResponse::failure(&err).with_guest_token(minted)
            }
        }
    }

    async fn dispatch(
        &self,
        owner: Result<Owner, CommerceError>,
        credentials: &Credentials,
        request: WireRequest,
    ) -> Result<Value, CommerceError> {
        match request {
            WireRequest::ListCart => to_value(self.carts.list(&owner?).await?),
            WireRequest::AddItem {
                product_id,
                quantity,
                size,
                color,
            } => {
                let options = LineOptions::new(size, color);
                to_value(self.carts.add(&owner?, &product_id, quantity, options).await?)
            }
            WireRequest::UpdateQuantity { item_id, quantity } => {
                to_value(self.carts.update_quantity(&owner?, &item_id, quantity).await?)
            }
            WireRequest::RemoveItem { item_id } => {
                self.carts.remove(&owner?, &item_id).await?;
                Ok(Value::Null)
            }
            WireRequest::ClearCart => {
                self.carts.clear(&owner?).await?;
                Ok(Value::Null)
            }
            WireRequest::ValidateDiscount { code, subtotal } => {
                let subtotal = match subtotal {
                    Some(subtotal) => subtotal,
                    None => self.carts.subtotal(&owner?).await?,
                };
                to_value(self.discounts.validate(&code, subtotal).await?)
            }
            WireRequest::Checkout(request) => {
                to_value(self.checkout.checkout(&owner?, request).await?)
            }
            WireRequest::Login => {
                let account = self
                    .identity
                    .account(credentials)
                    .await
                    .ok_or(CommerceError::OwnerRequired)?;
                let guest = credentials.guest_token.as_ref().filter(|t| !t.is_blank());
                to_value(self.login(guest, account).await?)
            }
            WireRequest::GetOrder { order_number } => {
                let owner = owner?;
                let order = self.ledger.order(&order_number).await?;
                // Orders carry contact details; only their owner sees them.
                if order.owner != owner {
                    return Err(CommerceError::OrderNotFound(order_number.to_string()));
                }
                to_value(order)
            }
        }
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, CommerceError> {
    Ok(serde_json::to_value(value)?)
}
