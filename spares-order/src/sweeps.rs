use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use spares_calc::timestamp::to_wire;
use spares_calc::{is_delayed, is_overdue_unconsumed, Moment};
use spares_core::repository::{Collection, Filter};
use spares_shared::models::events::{NaturalRubberAlertEvent, Notification, OrderDelayedEvent};
use tracing::{debug, error, info, warn};

use crate::manager::{decode, LifecycleEngine, LifecycleError, LifecycleResult};
use crate::models::{Order, OrderStatus, RawMaterial};

/// Outcome of one sweep. Every examined record lands in exactly one of
/// `notified`, `skipped` or `failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub examined: usize,
    pub notified: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl LifecycleEngine {
    /// Daily: tells the owner and staff about every undelivered order past
    /// its expected date. Read-only; one bad record never stops the sweep.
    pub async fn check_and_notify_delays(&self) -> LifecycleResult<SweepReport> {
        let now = self.now();
        let mut report = SweepReport::default();
        let mut docs = self
            .store
            .query(
                Collection::Orders,
                &[
                    Filter::lt("expected_delivery_date", to_wire(&now)),
                    Filter::ne("status", OrderStatus::DELIVERED),
                ],
            )
            .await?;

        while let Some(doc) = docs.next().await {
            report.examined += 1;
            let order: Order = match doc.map_err(LifecycleError::from).and_then(|d| decode(Collection::Orders, d)) {
                Ok(order) => order,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable order in delay sweep");
                    report.failed += 1;
                    continue;
                }
            };
            let Some(expected) = order.expected_delivery_date else {
                report.skipped += 1;
                continue;
            };
            if !is_delayed(now, expected, order.status.as_str()) {
                report.skipped += 1;
                continue;
            }
            let Some(user) = self.resolve_user(&order.user_id).await else {
                debug!(order_id = %order.id, "Late order has no resolvable owner");
                report.skipped += 1;
                continue;
            };

            let sent = self
                .notify(
                    &self.customer_and_staff(&user),
                    Notification::DelayNotice(OrderDelayedEvent {
                        order_id: order.id.clone(),
                        expected_delivery_date: expected,
                        current_status: order.status.to_string(),
                    }),
                )
                .await;
            if sent {
                report.notified += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(?report, "Delay sweep finished");
        Ok(report)
    }

    /// Daily: alerts staff about natural rubber still unconsumed past its
    /// deadline. Matches `rubber_type` exactly against "Natural", unlike
    /// the case-insensitive check made when the deadline is assigned.
    pub async fn check_natural_rubber_alerts(&self) -> LifecycleResult<SweepReport> {
        let now = self.now();
        let mut report = SweepReport::default();
        let mut docs = self
            .store
            .query(
                Collection::RawMaterials,
                &[
                    Filter::eq("rubber_type", "Natural"),
                    Filter::is_null("consumption_date"),
                ],
            )
            .await?;

        while let Some(doc) = docs.next().await {
            report.examined += 1;
            let doc = match doc {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable material in rubber sweep");
                    report.failed += 1;
                    continue;
                }
            };

            let Some(raw_deadline) = doc.get("consumption_deadline").and_then(Value::as_str) else {
                report.skipped += 1;
                continue;
            };
            let deadline = match Moment::parse(raw_deadline) {
                Ok(deadline) => deadline,
                Err(e) => {
                    error!(material_id = ?doc.get("id"), error = %e, "Unparseable consumption deadline");
                    report.failed += 1;
                    continue;
                }
            };
            if !is_overdue_unconsumed(now, deadline, None) {
                report.skipped += 1;
                continue;
            }

            let material: RawMaterial = match decode(Collection::RawMaterials, doc) {
                Ok(material) => material,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable material in rubber sweep");
                    report.failed += 1;
                    continue;
                }
            };

            let sent = self
                .notify(
                    &self.config.staff_recipients,
                    Notification::NaturalRubberAlert(NaturalRubberAlertEvent {
                        material_id: material.id,
                        order_id: material.order_id,
                        batch_no: material.batch_no,
                        consumption_deadline: deadline.to_utc(),
                    }),
                )
                .await;
            if sent {
                report.notified += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(?report, "Natural rubber sweep finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRawMaterial;
    use crate::testkit::{harness, staff, utc};
    use serde_json::json;
    use spares_core::DocumentStore;
    use spares_shared::models::events::NotificationKind;

    #[tokio::test]
    async fn test_delay_sweep_notifies_late_undelivered_orders() {
        let h = harness();
        let user = h.customer("Ravi").await;
        let late = h.engine.create_order(&user.id, "Gasket", 10).await.unwrap();
        let delivered = h.engine.create_order(&user.id, "Seal", 2).await.unwrap();
        h.engine.update_order_status(&delivered.id, "Delivered").await.unwrap();
        h.clock.set(utc(2024, 1, 5));
        let fresh = h.engine.create_order(&user.id, "Bush", 2).await.unwrap();
        h.dispatcher.clear();

        h.clock.set(utc(2024, 1, 10));
        let report = h.engine.check_and_notify_delays().await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                examined: 1,
                notified: 1,
                skipped: 0,
                failed: 0
            }
        );

        let sent = h.dispatcher.sent_of(NotificationKind::DelayNotice);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].notification.order_id(), Some(late.id.as_str()));
        assert_ne!(sent[0].notification.order_id(), Some(fresh.id.as_str()));
        assert!(sent[0].recipients.contains(&user.email));
    }

    #[tokio::test]
    async fn test_delay_sweep_survives_failures_and_orphans() {
        let h = harness();
        let user = h.customer("Ravi").await;
        h.engine.create_order(&user.id, "Gasket", 10).await.unwrap();
        h.engine.create_order("ghost", "Seal", 2).await.unwrap();
        h.engine.create_order(&user.id, "Bush", 2).await.unwrap();
        h.dispatcher.fail_on(NotificationKind::DelayNotice);

        h.clock.set(utc(2024, 2, 1));
        let report = h.engine.check_and_notify_delays().await.unwrap();
        assert_eq!(report.examined, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.notified, 0);
    }

    #[tokio::test]
    async fn test_delay_sweep_reads_legacy_naive_dates() {
        let h = harness();
        let user = h.customer("Ravi").await;
        h.store
            .insert(
                Collection::Orders,
                json!({
                    "user_id": user.id,
                    "product": "Gasket",
                    "quantity": 4,
                    "status": "InProgress",
                    "order_date": "2023-12-20 08:00:00",
                    "expected_delivery_date": "2023-12-27 08:00:00"
                }),
            )
            .await
            .unwrap();

        let report = h.engine.check_and_notify_delays().await.unwrap();
        assert_eq!(report.notified, 1);
    }

    async fn natural(h: &crate::testkit::Harness, rubber_type: &str) -> RawMaterial {
        h.engine
            .create_raw_material(NewRawMaterial {
                order_id: None,
                batch_no: format!("B-{rubber_type}"),
                recipe_no: "R-1".to_string(),
                raw_material_quantity: 40.0,
                rubber_type: rubber_type.to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_rubber_sweep_alerts_staff_for_overdue_batches() {
        let h = harness();
        let overdue = natural(&h, "Natural").await;
        let consumed = natural(&h, "Natural").await;
        h.clock.set(utc(2024, 1, 3));
        h.engine.mark_consumed(&consumed.id).await.unwrap();
        natural(&h, "Natural").await;

        h.clock.set(utc(2024, 1, 7));
        let report = h.engine.check_natural_rubber_alerts().await.unwrap();
        assert_eq!(report.examined, 2);
        assert_eq!(report.notified, 1);
        assert_eq!(report.skipped, 1);

        let alerts = h.dispatcher.sent_of(NotificationKind::NaturalRubberAlert);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].recipients, staff());
        match &alerts[0].notification {
            Notification::NaturalRubberAlert(e) => {
                assert_eq!(e.material_id, overdue.id);
                assert_eq!(e.consumption_deadline, utc(2024, 1, 6));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rubber_sweep_matches_type_case_sensitively() {
        let h = harness();
        let lower = natural(&h, "natural").await;
        assert!(lower.consumption_deadline.is_some());

        h.clock.set(utc(2024, 2, 1));
        let report = h.engine.check_natural_rubber_alerts().await.unwrap();
        assert_eq!(report.examined, 0);
        assert!(h.dispatcher.sent().is_empty());
    }

    #[tokio::test]
    async fn test_rubber_sweep_reads_legacy_deadlines() {
        let h = harness();
        for deadline in [
            "2023-12-27 08:00:00",
            "2023-12-27T08:00:00",
            "2023-12-27T08:00:00+05:30",
        ] {
            h.store
                .insert(
                    Collection::RawMaterials,
                    json!({
                        "batch_no": "B-legacy",
                        "recipe_no": "R-1",
                        "raw_material_quantity": 12.0,
                        "rubber_type": "Natural",
                        "arrival_date": "2023-12-22 08:00:00",
                        "consumption_deadline": deadline
                    }),
                )
                .await
                .unwrap();
        }

        let report = h.engine.check_natural_rubber_alerts().await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                examined: 3,
                notified: 3,
                skipped: 0,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_rubber_sweep_compares_offset_deadlines_as_instants() {
        use chrono::{TimeZone, Utc};

        let h = harness();
        // 05:00 IST on Jan 1 is 23:30 UTC on Dec 31.
        h.store
            .insert(
                Collection::RawMaterials,
                json!({
                    "batch_no": "B-ist",
                    "recipe_no": "R-1",
                    "raw_material_quantity": 12.0,
                    "rubber_type": "Natural",
                    "arrival_date": "2023-12-27T05:00:00+05:30",
                    "consumption_deadline": "2024-01-01T05:00:00+05:30"
                }),
            )
            .await
            .unwrap();

        h.clock.set(Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap());
        let report = h.engine.check_natural_rubber_alerts().await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.notified, 0);

        h.clock.set(utc(2024, 1, 1));
        let report = h.engine.check_natural_rubber_alerts().await.unwrap();
        assert_eq!(report.notified, 1);
    }

    #[tokio::test]
    async fn test_rubber_sweep_reports_bad_deadlines() {
        let h = harness();
        h.store
            .insert(
                Collection::RawMaterials,
                json!({
                    "batch_no": "B-x",
                    "recipe_no": "R-1",
                    "raw_material_quantity": 1.0,
                    "rubber_type": "Natural",
                    "arrival_date": "2023-12-01T00:00:00Z",
                    "consumption_deadline": "sometime"
                }),
            )
            .await
            .unwrap();
        natural(&h, "Natural").await;

        h.clock.set(utc(2024, 2, 1));
        let report = h.engine.check_natural_rubber_alerts().await.unwrap();
        assert_eq!(report.examined, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.notified, 1);
    }
}
