use chrono::{DateTime, Utc};
use serde_json::Value;
use spares_calc::tax::simple_invoice_totals;
use spares_calc::{
    amount_in_words, compute_invoice_totals, compute_line_item, generate_invoice_number,
    invoice_due_date, LineAmounts,
};
use spares_core::repository::{Collection, Filter};
use tracing::{info, warn};

use crate::manager::{fields, require, to_document, LifecycleEngine, LifecycleResult};
use crate::models::{
    Invoice, InvoiceLineItem, NewGstInvoice, Order, User, INVOICE_PENDING,
};

fn valid_percent(p: f64) -> bool {
    p.is_finite() && (0.0..=100.0).contains(&p)
}

impl LifecycleEngine {
    fn next_invoice_number(&self, now: DateTime<Utc>) -> String {
        generate_invoice_number(now, &mut rand::thread_rng())
    }

    /// Stores the invoice document without its line items.
    async fn persist_invoice(&self, invoice: &Invoice) -> LifecycleResult<String> {
        let mut body = to_document(invoice)?;
        body.remove("line_items");
        Ok(self.store.insert(Collection::Invoices, Value::Object(body)).await?)
    }

    async fn attach_line_items(&self, mut invoice: Invoice) -> LifecycleResult<Invoice> {
        invoice.line_items = self
            .load_all(
                Collection::InvoiceLineItems,
                &[Filter::eq("invoice_id", invoice.id.as_str())],
            )
            .await?;
        Ok(invoice)
    }

    /// Single-line invoice for an existing order, priced per unit with one
    /// flat tax rate. `None` when the order or its owner cannot be found.
    pub async fn create_invoice(
        &self,
        order_id: &str,
        unit_price: f64,
        tax_percent: f64,
        discount_percent: f64,
    ) -> LifecycleResult<Option<Invoice>> {
        require(unit_price.is_finite() && unit_price >= 0.0, "unit_price must be non-negative")?;
        require(valid_percent(tax_percent), "tax percentage must be between 0 and 100")?;
        require(valid_percent(discount_percent), "discount percentage must be between 0 and 100")?;

        let Some(order) = self.load::<Order>(Collection::Orders, order_id).await? else {
            return Ok(None);
        };
        let Some(user) = self.load::<User>(Collection::Users, &order.user_id).await? else {
            return Ok(None);
        };

        let now = self.now();
        let totals = simple_invoice_totals(order.quantity as f64, unit_price, tax_percent, discount_percent);
        let mut invoice = Invoice {
            id: String::new(),
            order_id: Some(order.id),
            invoice_number: self.next_invoice_number(now),
            customer_name: user.name,
            customer_email: user.email,
            customer_gstin: None,
            customer_address: None,
            delivery_note_no: None,
            buyer_order_no: None,
            dispatch_through: None,
            dispatch_doc_no: None,
            product: Some(order.product),
            quantity: Some(order.quantity),
            unit_price: Some(unit_price),
            amount_in_words: amount_in_words(totals.final_amount),
            totals,
            status: INVOICE_PENDING.to_string(),
            issue_date: now,
            due_date: invoice_due_date(now),
            notes: None,
            line_items: Vec::new(),
        };
        invoice.id = self.persist_invoice(&invoice).await?;
        info!(invoice_id = %invoice.id, invoice_number = %invoice.invoice_number, order_id, "Invoice created");
        Ok(Some(invoice))
    }

    /// GST invoice from a customer snapshot and line items, returned with
    /// the items in input order.
    ///
    /// The invoice is written first, then each item. A failure part way
    /// leaves the invoice with only the items written so far.
    pub async fn create_gst_invoice(&self, new: NewGstInvoice) -> LifecycleResult<Invoice> {
        require(!new.line_items.is_empty(), "at least one line item is required")?;
        require(!new.customer_name.trim().is_empty(), "customer_name is required")?;
        require(valid_percent(new.discount_percent), "discount percentage must be between 0 and 100")?;
        for item in &new.line_items {
            require(item.quantity > 0, "line item quantity must be positive")?;
            require(item.rate.is_finite() && item.rate >= 0.0, "line item rate must be non-negative")?;
        }

        let amounts: Vec<LineAmounts> = new
            .line_items
            .iter()
            .map(|item| compute_line_item(item.quantity as f64, item.rate, item.rates))
            .collect();
        let totals = compute_invoice_totals(&amounts, new.discount_percent);

        let now = self.now();
        let mut invoice = Invoice {
            id: String::new(),
            order_id: new.order_id,
            invoice_number: self.next_invoice_number(now),
            customer_name: new.customer_name,
            customer_email: new.customer_email,
            customer_gstin: new.customer_gstin,
            customer_address: new.customer_address,
            delivery_note_no: new.delivery_note_no,
            buyer_order_no: new.buyer_order_no,
            dispatch_through: new.dispatch_through,
            dispatch_doc_no: new.dispatch_doc_no,
            product: None,
            quantity: None,
            unit_price: None,
            amount_in_words: amount_in_words(totals.final_amount),
            totals,
            status: INVOICE_PENDING.to_string(),
            issue_date: now,
            due_date: invoice_due_date(now),
            notes: new.notes,
            line_items: Vec::with_capacity(new.line_items.len()),
        };
        invoice.id = self.persist_invoice(&invoice).await?;

        for (item, amounts) in new.line_items.into_iter().zip(amounts) {
            let mut line = InvoiceLineItem {
                id: String::new(),
                invoice_id: invoice.id.clone(),
                hsn_code: item.hsn_code,
                description: item.description,
                quantity: item.quantity,
                rate: item.rate,
                rates: item.rates,
                amounts,
            };
            line.id = match self.persist(Collection::InvoiceLineItems, &line).await {
                Ok(id) => id,
                Err(e) => {
                    warn!(invoice_id = %invoice.id, error = %e, "Line item write failed; invoice is incomplete");
                    return Err(e);
                }
            };
            invoice.line_items.push(line);
        }

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            items = invoice.line_items.len(),
            final_amount = invoice.totals.final_amount,
            "GST invoice created"
        );
        Ok(invoice)
    }

    pub async fn get_invoice(&self, invoice_id: &str) -> LifecycleResult<Option<Invoice>> {
        match self.load::<Invoice>(Collection::Invoices, invoice_id).await? {
            Some(invoice) => self.attach_line_items(invoice).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn list_invoices(&self) -> LifecycleResult<Vec<Invoice>> {
        let invoices: Vec<Invoice> = self.load_all(Collection::Invoices, &[]).await?;
        let mut out = Vec::with_capacity(invoices.len());
        for invoice in invoices {
            out.push(self.attach_line_items(invoice).await?);
        }
        Ok(out)
    }

    /// First invoice raised against the order, if any.
    pub async fn get_invoice_by_order(&self, order_id: &str) -> LifecycleResult<Option<Invoice>> {
        let invoices: Vec<Invoice> = self
            .load_all(Collection::Invoices, &[Filter::eq("order_id", order_id)])
            .await?;
        match invoices.into_iter().next() {
            Some(invoice) => self.attach_line_items(invoice).await.map(Some),
            None => Ok(None),
        }
    }

    /// Unconditional status set. No transition rules, no notification.
    pub async fn update_invoice_status(
        &self,
        invoice_id: &str,
        status: &str,
    ) -> LifecycleResult<Option<Invoice>> {
        require(!status.trim().is_empty(), "status is required")?;
        let Some(mut invoice) = self.get_invoice(invoice_id).await? else {
            return Ok(None);
        };
        self.store
            .update(
                Collection::Invoices,
                invoice_id,
                fields([("status", Value::from(status))]),
            )
            .await?;
        invoice.status = status.to_string();
        info!(invoice_id, status, "Invoice status updated");
        Ok(Some(invoice))
    }

    /// Deletes the line items, then the invoice. Reports whether the
    /// invoice existed.
    pub async fn delete_invoice(&self, invoice_id: &str) -> LifecycleResult<bool> {
        let items: Vec<InvoiceLineItem> = self
            .load_all(
                Collection::InvoiceLineItems,
                &[Filter::eq("invoice_id", invoice_id)],
            )
            .await?;
        for item in &items {
            self.store.delete(Collection::InvoiceLineItems, &item.id).await?;
        }
        let existed = self.store.delete(Collection::Invoices, invoice_id).await?;
        if existed {
            info!(invoice_id, line_items = items.len(), "Invoice deleted");
        }
        Ok(existed)
    }
}
