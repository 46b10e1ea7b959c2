use serde_json::Value;
use spares_calc::timestamp::to_wire;
use spares_calc::{expected_delivery, is_delayed, Moment};
use spares_core::repository::{Collection, Filter};
use spares_shared::models::activity::{ActivityRow, OrderLogRow};
use spares_shared::models::events::{
    Notification, OrderConfirmedEvent, OrderDelayedEvent, OrderStatusChangedEvent,
};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::manager::{fields, require, LifecycleEngine, LifecycleError, LifecycleResult};
use crate::models::{Order, OrderStatus, OrderView, User};

impl LifecycleEngine {
    /// Places an order in `Pending` due a week out, then confirms it to
    /// the customer and staff and logs it, both best-effort.
    pub async fn create_order(
        &self,
        user_id: &str,
        product: &str,
        quantity: i64,
    ) -> LifecycleResult<Order> {
        require(!product.trim().is_empty(), "product is required")?;
        require(quantity > 0, "quantity must be positive")?;

        let now = self.now();
        let mut order = Order {
            id: String::new(),
            user_id: user_id.to_string(),
            product: product.to_string(),
            quantity,
            status: OrderStatus::pending(),
            order_date: now,
            expected_delivery_date: Some(expected_delivery(now)),
        };
        order.id = self.persist(Collection::Orders, &order).await?;
        info!(order_id = %order.id, user_id, "Order created");

        if let Some(user) = self.resolve_user(user_id).await {
            let recipients = self.customer_and_staff(&user);
            self.notify(
                &recipients,
                Notification::OrderConfirmation(OrderConfirmedEvent {
                    order_id: order.id.clone(),
                    product: order.product.clone(),
                    quantity: order.quantity,
                    status: order.status.to_string(),
                }),
            )
            .await;
            self.record_activity(ActivityRow::Orders(OrderLogRow {
                order_id: order.id.clone(),
                customer_name: user.name,
                customer_phone: user.phone,
                product: order.product.clone(),
                quantity: order.quantity,
                order_date: order.order_date,
            }))
            .await;
        }

        Ok(order)
    }

    pub async fn get_order(&self, order_id: &str) -> LifecycleResult<Option<Order>> {
        self.load(Collection::Orders, order_id).await
    }

    /// Every order with its owner's name and phone. Orders whose owner is
    /// gone get empty contact fields.
    pub async fn list_orders(&self) -> LifecycleResult<Vec<OrderView>> {
        let orders: Vec<Order> = self.load_all(Collection::Orders, &[]).await?;
        let mut owners: HashMap<String, Option<User>> = HashMap::new();
        let mut views = Vec::with_capacity(orders.len());

        for order in orders {
            if !owners.contains_key(&order.user_id) {
                let user = self.load::<User>(Collection::Users, &order.user_id).await?;
                owners.insert(order.user_id.clone(), user);
            }
            let owner = owners.get(&order.user_id).and_then(Option::as_ref);
            views.push(OrderView {
                user_name: owner.map(|u| u.name.clone()).unwrap_or_default(),
                user_phone: owner.and_then(|u| u.phone.clone()).unwrap_or_default(),
                order,
            });
        }
        Ok(views)
    }

    pub async fn list_orders_for_user(&self, user_id: &str) -> LifecycleResult<Vec<Order>> {
        self.load_all(Collection::Orders, &[Filter::eq("user_id", user_id)])
            .await
    }

    /// Sets a new status. Only a change is written and announced; after a
    /// change to anything but `Delivered`, a late order also gets a delay
    /// notice. Setting the current status again does nothing.
    pub async fn update_order_status(
        &self,
        order_id: &str,
        status: &str,
    ) -> LifecycleResult<Option<Order>> {
        require(!status.trim().is_empty(), "status is required")?;

        let Some(mut order) = self.get_order(order_id).await? else {
            return Ok(None);
        };
        if order.status == status {
            debug!(order_id, status, "Status unchanged");
            return Ok(Some(order));
        }

        self.store
            .update(
                Collection::Orders,
                order_id,
                fields([("status", Value::from(status))]),
            )
            .await?;
        order.status = OrderStatus::new(status);
        info!(order_id, status, "Order status updated");

        let Some(user) = self.resolve_user(&order.user_id).await else {
            return Ok(Some(order));
        };
        let recipients = self.customer_and_staff(&user);
        self.notify(
            &recipients,
            Notification::StatusUpdate(OrderStatusChangedEvent {
                order_id: order.id.clone(),
                status: order.status.to_string(),
            }),
        )
        .await;

        if let Some(expected) = order.expected_delivery_date {
            if is_delayed(self.now(), expected, order.status.as_str()) {
                self.notify(
                    &recipients,
                    Notification::DelayNotice(OrderDelayedEvent {
                        order_id: order.id.clone(),
                        expected_delivery_date: expected,
                        current_status: order.status.to_string(),
                    }),
                )
                .await;
            }
        }

        Ok(Some(order))
    }

    /// Reschedules delivery. Accepts any stored timestamp shape; naive
    /// values are taken as UTC.
    pub async fn update_expected_delivery(
        &self,
        order_id: &str,
        expected: &str,
    ) -> LifecycleResult<Option<Order>> {
        let moment = Moment::parse(expected)
            .map_err(|e| LifecycleError::Validation(e.to_string()))?;
        let expected = moment.to_utc();

        let Some(mut order) = self.get_order(order_id).await? else {
            return Ok(None);
        };
        self.store
            .update(
                Collection::Orders,
                order_id,
                fields([("expected_delivery_date", Value::from(to_wire(&expected)))]),
            )
            .await?;
        order.expected_delivery_date = Some(expected);
        info!(order_id, expected = %to_wire(&expected), "Expected delivery updated");
        Ok(Some(order))
    }

    pub async fn delete_order(&self, order_id: &str) -> LifecycleResult<bool> {
        let existed = self.store.delete(Collection::Orders, order_id).await?;
        if existed {
            info!(order_id, "Order deleted");
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{harness, staff, utc};
    use spares_shared::models::events::NotificationKind;

    #[tokio::test]
    async fn test_create_order_sets_expected_delivery_and_notifies() {
        let h = harness();
        let user = h.customer("Ravi").await;

        let order = h.engine.create_order(&user.id, "Gasket 40mm", 250).await.unwrap();
        assert_eq!(order.order_date, utc(2024, 1, 1));
        assert_eq!(order.expected_delivery_date, Some(utc(2024, 1, 8)));
        assert_eq!(order.status, OrderStatus::PENDING);

        let stored = h.engine.get_order(&order.id).await.unwrap().unwrap();
        assert_eq!(stored, order);

        let sent = h.dispatcher.sent_of(NotificationKind::OrderConfirmation);
        assert_eq!(sent.len(), 1);
        let mut expected_to = vec![user.email.clone()];
        expected_to.extend(staff());
        assert_eq!(sent[0].recipients, expected_to);

        let rows = h.log.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sheet(), "Orders");
    }

    #[tokio::test]
    async fn test_expected_delivery_is_always_a_week_after_order_date() {
        let h = harness();
        let user = h.customer("Ravi").await;
        for day in [3, 17, 28] {
            h.clock.set(utc(2024, 2, day));
            let order = h.engine.create_order(&user.id, "Seal", 1).await.unwrap();
            assert_eq!(
                order.expected_delivery_date.unwrap() - order.order_date,
                chrono::Duration::days(7)
            );
        }
    }

    #[tokio::test]
    async fn test_create_order_validates_before_writing() {
        let h = harness();
        let user = h.customer("Ravi").await;
        assert!(matches!(
            h.engine.create_order(&user.id, "  ", 5).await,
            Err(LifecycleError::Validation(_))
        ));
        assert!(matches!(
            h.engine.create_order(&user.id, "Seal", 0).await,
            Err(LifecycleError::Validation(_))
        ));
        assert_eq!(h.store.len(Collection::Orders).await, 0);
    }

    #[tokio::test]
    async fn test_order_for_unknown_user_is_saved_silently() {
        let h = harness();
        let order = h.engine.create_order("ghost", "Seal", 3).await.unwrap();
        assert!(h.engine.get_order(&order.id).await.unwrap().is_some());
        assert!(h.dispatcher.sent().is_empty());
        assert!(h.log.rows().is_empty());
    }

    #[tokio::test]
    async fn test_failed_side_effects_do_not_fail_creation() {
        let h = harness();
        let user = h.customer("Ravi").await;
        h.dispatcher.fail_on(NotificationKind::OrderConfirmation);
        h.log.set_failing(true);

        let order = h.engine.create_order(&user.id, "Seal", 3).await.unwrap();
        assert!(h.engine.get_order(&order.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_late_status_change_fires_delay_notice() {
        let h = harness();
        let user = h.customer("Ravi").await;
        let order = h.engine.create_order(&user.id, "Gasket", 10).await.unwrap();
        h.dispatcher.clear();

        h.clock.set(utc(2024, 1, 10));
        let updated = h
            .engine
            .update_order_status(&order.id, "Shipped")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, "Shipped");

        assert_eq!(h.dispatcher.sent_of(NotificationKind::StatusUpdate).len(), 1);
        let delays = h.dispatcher.sent_of(NotificationKind::DelayNotice);
        assert_eq!(delays.len(), 1);
        match &delays[0].notification {
            Notification::DelayNotice(e) => {
                assert_eq!(e.expected_delivery_date, utc(2024, 1, 8));
                assert_eq!(e.current_status, "Shipped");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_on_time_or_delivered_change_has_no_delay_notice() {
        let h = harness();
        let user = h.customer("Ravi").await;
        let order = h.engine.create_order(&user.id, "Gasket", 10).await.unwrap();

        h.clock.set(utc(2024, 1, 5));
        h.engine.update_order_status(&order.id, "InProgress").await.unwrap();
        h.clock.set(utc(2024, 1, 12));
        h.engine.update_order_status(&order.id, "Delivered").await.unwrap();

        assert_eq!(h.dispatcher.sent_of(NotificationKind::StatusUpdate).len(), 2);
        assert!(h.dispatcher.sent_of(NotificationKind::DelayNotice).is_empty());
    }

    #[tokio::test]
    async fn test_repeating_a_status_notifies_once() {
        let h = harness();
        let user = h.customer("Ravi").await;
        let order = h.engine.create_order(&user.id, "Gasket", 10).await.unwrap();
        h.dispatcher.clear();

        h.engine.update_order_status(&order.id, "InProgress").await.unwrap();
        let again = h
            .engine
            .update_order_status(&order.id, "InProgress")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.status, "InProgress");
        assert_eq!(h.dispatcher.sent().len(), 1);

        // Same as the initial status: nothing at all.
        let other = h.engine.create_order(&user.id, "Seal", 1).await.unwrap();
        h.dispatcher.clear();
        h.engine.update_order_status(&other.id, "Pending").await.unwrap();
        assert!(h.dispatcher.sent().is_empty());
    }

    #[tokio::test]
    async fn test_status_update_edge_cases() {
        let h = harness();
        assert!(h.engine.update_order_status("missing", "Shipped").await.unwrap().is_none());
        assert!(matches!(
            h.engine.update_order_status("missing", "").await,
            Err(LifecycleError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_status_notification_failure_keeps_the_write() {
        let h = harness();
        let user = h.customer("Ravi").await;
        let order = h.engine.create_order(&user.id, "Gasket", 10).await.unwrap();
        h.dispatcher.fail_on(NotificationKind::StatusUpdate);

        h.engine.update_order_status(&order.id, "Curing").await.unwrap();
        let stored = h.engine.get_order(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, "Curing");
    }

    #[tokio::test]
    async fn test_update_expected_delivery_accepts_naive_and_rejects_garbage() {
        let h = harness();
        let user = h.customer("Ravi").await;
        let order = h.engine.create_order(&user.id, "Gasket", 10).await.unwrap();

        let moved = h
            .engine
            .update_expected_delivery(&order.id, "2024-01-20 00:00:00")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.expected_delivery_date, Some(utc(2024, 1, 20)));
        let stored = h.engine.get_order(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.expected_delivery_date, Some(utc(2024, 1, 20)));

        assert!(matches!(
            h.engine.update_expected_delivery(&order.id, "soon").await,
            Err(LifecycleError::Validation(_))
        ));
        assert!(h
            .engine
            .update_expected_delivery("missing", "2024-01-20T00:00:00Z")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_listing_joins_owner_contact() {
        let h = harness();
        let ravi = h.customer("Ravi").await;
        let meena = h.customer("Meena").await;
        h.engine.create_order(&ravi.id, "Gasket", 10).await.unwrap();
        h.engine.create_order(&meena.id, "Seal", 4).await.unwrap();
        h.engine.create_order("ghost", "Bush", 2).await.unwrap();

        let views = h.engine.list_orders().await.unwrap();
        assert_eq!(views.len(), 3);
        assert_eq!(views[0].user_name, "Ravi");
        assert_eq!(views[0].user_phone, "9000000000");
        assert_eq!(views[1].user_name, "Meena");
        assert_eq!(views[2].user_name, "");

        let mine = h.engine.list_orders_for_user(&meena.id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].product, "Seal");
    }

    #[tokio::test]
    async fn test_delete_order_reports_existence() {
        let h = harness();
        let order = h.engine.create_order("u", "Seal", 1).await.unwrap();
        assert!(h.engine.delete_order(&order.id).await.unwrap());
        assert!(!h.engine.delete_order(&order.id).await.unwrap());
    }
}
