use serde_json::Value;
use spares_calc::consumption_deadline;
use spares_calc::timestamp::to_wire;
use spares_core::repository::{Collection, Filter};
use spares_shared::models::activity::{ActivityRow, InventoryLogRow};
use spares_shared::models::events::{MaterialArrivedEvent, Notification};
use tracing::{info, warn};

use crate::manager::{fields, require, LifecycleEngine, LifecycleResult};
use crate::models::{NewRawMaterial, Order, RawMaterial};

impl LifecycleEngine {
    /// Books raw material in. Natural rubber gets a consumption deadline.
    ///
    /// The first material recorded against an order announces its arrival
    /// to the customer and staff. The first-material check is a count after
    /// the insert, so two concurrent inserts for one order can both or
    /// neither announce.
    pub async fn create_raw_material(&self, new: NewRawMaterial) -> LifecycleResult<RawMaterial> {
        require(!new.batch_no.trim().is_empty(), "batch_no is required")?;
        require(
            new.raw_material_quantity.is_finite() && new.raw_material_quantity > 0.0,
            "raw_material_quantity must be positive",
        )?;

        let now = self.now();
        let mut material = RawMaterial {
            id: String::new(),
            order_id: new.order_id,
            batch_no: new.batch_no,
            recipe_no: new.recipe_no,
            raw_material_quantity: new.raw_material_quantity,
            consumption_deadline: consumption_deadline(now, &new.rubber_type),
            rubber_type: new.rubber_type,
            arrival_date: now,
            consumption_date: None,
        };
        material.id = self.persist(Collection::RawMaterials, &material).await?;
        info!(
            material_id = %material.id,
            order_id = material.order_id.as_deref().unwrap_or("-"),
            rubber_type = %material.rubber_type,
            "Raw material recorded"
        );

        if let Some(order_id) = material.order_id.as_deref() {
            if let Err(e) = self.announce_first_arrival(order_id, &material).await {
                warn!(order_id, error = %e, "Arrival check failed");
            }
        }

        self.record_activity(ActivityRow::Inventory(InventoryLogRow {
            order_id: material.order_id.clone(),
            batch_no: material.batch_no.clone(),
            recipe_no: material.recipe_no.clone(),
            quantity: material.raw_material_quantity,
            rubber_type: material.rubber_type.clone(),
            arrival_date: material.arrival_date,
        }))
        .await;

        Ok(material)
    }

    async fn announce_first_arrival(&self, order_id: &str, material: &RawMaterial) -> LifecycleResult<()> {
        let Some(order) = self.load::<Order>(Collection::Orders, order_id).await? else {
            return Ok(());
        };
        let materials = self
            .count(Collection::RawMaterials, &[Filter::eq("order_id", order_id)])
            .await?;
        if materials != 1 {
            return Ok(());
        }
        let Some(user) = self.resolve_user(&order.user_id).await else {
            return Ok(());
        };

        self.notify(
            &self.customer_and_staff(&user),
            Notification::MaterialArrival(MaterialArrivedEvent {
                order_id: order.id,
                batch_no: material.batch_no.clone(),
                recipe_no: material.recipe_no.clone(),
                quantity: material.raw_material_quantity,
            }),
        )
        .await;
        Ok(())
    }

    pub async fn list_raw_materials(&self) -> LifecycleResult<Vec<RawMaterial>> {
        self.load_all(Collection::RawMaterials, &[]).await
    }

    pub async fn get_raw_material(&self, material_id: &str) -> LifecycleResult<Option<RawMaterial>> {
        self.load(Collection::RawMaterials, material_id).await
    }

    /// Stamps the consumption time. Consuming again overwrites the stamp.
    pub async fn mark_consumed(&self, material_id: &str) -> LifecycleResult<Option<RawMaterial>> {
        let Some(mut material) = self.get_raw_material(material_id).await? else {
            return Ok(None);
        };
        let now = self.now();
        self.store
            .update(
                Collection::RawMaterials,
                material_id,
                fields([("consumption_date", Value::from(to_wire(&now)))]),
            )
            .await?;
        material.consumption_date = Some(now);
        info!(material_id, "Raw material consumed");
        Ok(Some(material))
    }

    pub async fn delete_raw_material(&self, material_id: &str) -> LifecycleResult<bool> {
        let existed = self.store.delete(Collection::RawMaterials, material_id).await?;
        if existed {
            info!(material_id, "Raw material deleted");
        }
        Ok(existed)
    }
}
