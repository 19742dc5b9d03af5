use crate::{
    config::AppConfig,
    entities::order::{self, PaymentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    money::format_vnd,
    services::accounts::AccountService,
    services::catalog::ProductService,
    services::orders::{NewOrder, NewOrderItem, OrderService},
    services::payments::{CheckoutClient, CreateSessionRequest, SessionLineItem},
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Minor-unit scaling applied to item prices when building processor line
/// items. The shipping entry is deliberately NOT scaled; it is sent at the
/// raw fee amount.
const PROCESSOR_UNIT_SCALE: i64 = 1000;
const SHIPPING_LINE_NAME: &str = "Shipping fee";

/// One cart line as submitted by the storefront. Prices are taken verbatim;
/// see `enforce_catalog_prices` for the optional server-side re-check.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PlaceOrderInput {
    pub items: Vec<CartLine>,
    pub shipping_address: Option<String>,
    pub payment_method: String,
    pub note: Option<String>,
}

#[derive(Debug)]
pub enum CheckoutOutcome {
    /// Order finalized immediately; awaiting physical payment.
    CashOnDelivery { order_id: Uuid },
    /// Order initiated; the client must complete payment on the hosted page.
    HostedCheckout { order_id: Uuid, session_url: String },
}

/// Sequences order creation, the unconditional cart clear and the optional
/// hosted-checkout session. The two writes are independent: a failure after
/// order persistence leaves the order in place ("initiated", not "paid").
#[derive(Clone)]
pub struct CheckoutService {
    orders: Arc<OrderService>,
    accounts: Arc<AccountService>,
    catalog: Arc<ProductService>,
    checkout_client: Arc<dyn CheckoutClient>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl CheckoutService {
    pub fn new(
        orders: Arc<OrderService>,
        accounts: Arc<AccountService>,
        catalog: Arc<ProductService>,
        checkout_client: Arc<dyn CheckoutClient>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            orders,
            accounts,
            catalog,
            checkout_client,
            event_sender,
            config,
        }
    }

    #[instrument(skip(self, input), fields(user_id = %user_id, items = input.items.len(), payment_method = %input.payment_method))]
    pub async fn place_order(
        &self,
        user_id: Uuid,
        input: PlaceOrderInput,
    ) -> Result<CheckoutOutcome, ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Order must contain at least one item".to_string(),
            ));
        }
        for item in &input.items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity for {} must be positive",
                    item.name
                )));
            }
            if item.price.is_sign_negative() {
                return Err(ServiceError::ValidationError(format!(
                    "Price for {} must not be negative",
                    item.name
                )));
            }
        }

        if self.config.enforce_catalog_prices {
            self.check_catalog_prices(&input.items).await?;
        }

        let shipping_fee = Decimal::from(self.config.shipping_fee);
        let total = subtotal(&input.items) + shipping_fee;

        let cash_on_delivery = is_cash_on_delivery(&input.payment_method);
        let payment_status = if cash_on_delivery {
            PaymentStatus::PendingCashOnDelivery
        } else {
            PaymentStatus::PendingBank
        };

        let order = self
            .orders
            .create_order(NewOrder {
                user_id,
                items: input
                    .items
                    .iter()
                    .map(|item| NewOrderItem {
                        product_id: item.product_id.clone(),
                        name: item.name.clone(),
                        price: format_vnd(item.price),
                        quantity: item.quantity,
                        image: item.image.clone(),
                    })
                    .collect(),
                total_amount: format_vnd(total),
                shipping_address: input.shipping_address,
                payment_method: input.payment_method,
                payment_status,
                note: input.note,
            })
            .await?;

        // Two independent writes: no compensation if this one fails after
        // the order was persisted.
        self.accounts.clear_cart(user_id).await?;

        if cash_on_delivery {
            info!(order_id = %order.id, "Cash-on-delivery order placed");
            return Ok(CheckoutOutcome::CashOnDelivery { order_id: order.id });
        }

        let request = CreateSessionRequest {
            currency: self.config.currency.clone(),
            line_items: build_session_line_items(&input.items, self.config.shipping_fee)?,
            success_url: format!("{}/verify/success", self.config.client_url),
            cancel_url: format!(
                "{}/verify?success=false&orderId={}",
                self.config.client_url, order.id
            ),
        };

        // Single unretried call; the order above already exists either way.
        let session = self.checkout_client.create_session(request).await?;

        info!(order_id = %order.id, session_id = %session.id, "Hosted checkout session created");
        self.event_sender
            .send_or_log(Event::CheckoutSessionCreated {
                order_id: order.id,
                session_id: session.id,
            })
            .await;

        Ok(CheckoutOutcome::HostedCheckout {
            order_id: order.id,
            session_url: session.url,
        })
    }

    /// Client-redirect confirmation: marks the order paid or failed. This
    /// path trusts the caller's flag; the gateway IPN is the verified path.
    #[instrument(skip(self))]
    pub async fn confirm_payment(
        &self,
        order_id: Uuid,
        success: bool,
    ) -> Result<order::Model, ServiceError> {
        let status = if success {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Failed
        };
        self.orders.set_payment_status(order_id, status).await
    }

    async fn check_catalog_prices(&self, items: &[CartLine]) -> Result<(), ServiceError> {
        for item in items {
            let product_id = Uuid::parse_str(&item.product_id).map_err(|_| {
                ServiceError::ValidationError(format!(
                    "Unknown product reference: {}",
                    item.product_id
                ))
            })?;
            let product = self
                .catalog
                .get_product(product_id)
                .await?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "Unknown product reference: {}",
                        item.product_id
                    ))
                })?;
            if product.price != item.price {
                return Err(ServiceError::ValidationError(format!(
                    "Price for {} does not match the catalog",
                    item.name
                )));
            }
        }
        Ok(())
    }
}

fn subtotal(items: &[CartLine]) -> Decimal {
    items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum()
}

/// Mirrors the cart into processor line items: one entry per product at its
/// unit price in minor units, plus one synthetic entry for the shipping fee.
fn build_session_line_items(
    items: &[CartLine],
    shipping_fee: i64,
) -> Result<Vec<SessionLineItem>, ServiceError> {
    let mut line_items = Vec::with_capacity(items.len() + 1);
    for item in items {
        let unit_amount = (item.price * Decimal::from(PROCESSOR_UNIT_SCALE))
            .round()
            .to_i64()
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("Price for {} is out of range", item.name))
            })?;
        line_items.push(SessionLineItem {
            name: item.name.clone(),
            unit_amount,
            quantity: item.quantity as i64,
        });
    }
    line_items.push(SessionLineItem {
        name: SHIPPING_LINE_NAME.to_string(),
        unit_amount: shipping_fee,
        quantity: 1,
    });
    Ok(line_items)
}

/// Payment-method tag mapping: only the cash-on-delivery tag avoids the
/// external processor; every other tag goes through hosted checkout.
pub fn is_cash_on_delivery(tag: &str) -> bool {
    matches!(
        tag.trim().to_ascii_lowercase().as_str(),
        "cash on delivery" | "cod"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(price: Decimal, quantity: i32) -> CartLine {
        CartLine {
            product_id: Uuid::new_v4().to_string(),
            name: "Item".to_string(),
            price,
            quantity,
            image: None,
        }
    }

    #[test]
    fn subtotal_multiplies_price_by_quantity() {
        let items = vec![line(dec!(100000), 2), line(dec!(45000), 1)];
        assert_eq!(subtotal(&items), dec!(245000));
    }

    #[test]
    fn session_mirrors_cart_plus_shipping_entry() {
        let items = vec![line(dec!(100000), 2), line(dec!(45000), 3)];
        let session_items = build_session_line_items(&items, 30_000).unwrap();

        assert_eq!(session_items.len(), items.len() + 1);
        assert_eq!(session_items[0].unit_amount, 100_000_000);
        assert_eq!(session_items[0].quantity, 2);
        assert_eq!(session_items[1].unit_amount, 45_000_000);

        let shipping = session_items.last().unwrap();
        assert_eq!(shipping.name, SHIPPING_LINE_NAME);
        assert_eq!(shipping.unit_amount, 30_000);
        assert_eq!(shipping.quantity, 1);
    }

    #[test]
    fn cash_on_delivery_tags() {
        assert!(is_cash_on_delivery("cash on delivery"));
        assert!(is_cash_on_delivery("COD"));
        assert!(is_cash_on_delivery(" Cash On Delivery "));
        assert!(!is_cash_on_delivery("card"));
        assert!(!is_cash_on_delivery("bank_transfer"));
    }
}
