use serde::{Deserialize, Serialize};

/// GST components applied to a line item, as percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxRates {
    #[serde(default)]
    pub cgst_percent: f64,
    #[serde(default)]
    pub sgst_percent: f64,
    #[serde(default)]
    pub igst_percent: f64,
}

impl TaxRates {
    /// Intra-state supply: central and state halves.
    pub fn intra_state(cgst_percent: f64, sgst_percent: f64) -> Self {
        Self {
            cgst_percent,
            sgst_percent,
            igst_percent: 0.0,
        }
    }

    pub fn inter_state(igst_percent: f64) -> Self {
        Self {
            igst_percent,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineAmounts {
    pub amount: f64,
    pub cgst_amount: f64,
    pub sgst_amount: f64,
    pub igst_amount: f64,
    pub total_with_tax: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub total_cgst: f64,
    pub total_sgst: f64,
    pub total_igst: f64,
    pub total_tax: f64,
    pub discount_amount: f64,
    pub final_amount: f64,
}

fn percent_of(base: f64, percent: f64) -> f64 {
    base * (percent / 100.0)
}

pub fn compute_line_item(quantity: f64, rate: f64, rates: TaxRates) -> LineAmounts {
    let amount = quantity * rate;
    let cgst_amount = percent_of(amount, rates.cgst_percent);
    let sgst_amount = percent_of(amount, rates.sgst_percent);
    let igst_amount = percent_of(amount, rates.igst_percent);
    LineAmounts {
        amount,
        cgst_amount,
        sgst_amount,
        igst_amount,
        total_with_tax: amount + cgst_amount + sgst_amount + igst_amount,
    }
}

/// Sums line items in the order given. The discount applies to the
/// pre-tax subtotal.
pub fn compute_invoice_totals<'a, I>(line_items: I, discount_percent: f64) -> InvoiceTotals
where
    I: IntoIterator<Item = &'a LineAmounts>,
{
    let mut totals = InvoiceTotals::default();
    for item in line_items {
        totals.subtotal += item.amount;
        totals.total_cgst += item.cgst_amount;
        totals.total_sgst += item.sgst_amount;
        totals.total_igst += item.igst_amount;
    }
    totals.total_tax = totals.total_cgst + totals.total_sgst + totals.total_igst;
    totals.discount_amount = percent_of(totals.subtotal, discount_percent);
    totals.final_amount = totals.subtotal + totals.total_tax - totals.discount_amount;
    totals
}

/// Single-line invoice raised straight from an order: one flat tax
/// percentage, reported as the whole tax amount with no GST split.
pub fn simple_invoice_totals(
    quantity: f64,
    unit_price: f64,
    tax_percent: f64,
    discount_percent: f64,
) -> InvoiceTotals {
    let subtotal = quantity * unit_price;
    let total_tax = percent_of(subtotal, tax_percent);
    let discount_amount = percent_of(subtotal, discount_percent);
    InvoiceTotals {
        subtotal,
        total_tax,
        discount_amount,
        final_amount: subtotal + total_tax - discount_amount,
        ..InvoiceTotals::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_intra_state_line() {
        let line = compute_line_item(10.0, 100.0, TaxRates::intra_state(9.0, 9.0));
        assert_eq!(line.amount, 1000.0);
        assert_eq!(line.cgst_amount, 90.0);
        assert_eq!(line.sgst_amount, 90.0);
        assert_eq!(line.igst_amount, 0.0);
        assert_eq!(line.total_with_tax, 1180.0);

        let totals = compute_invoice_totals([&line], 0.0);
        assert_eq!(totals.subtotal, 1000.0);
        assert_eq!(totals.total_tax, 180.0);
        assert_eq!(totals.discount_amount, 0.0);
        assert_eq!(totals.final_amount, 1180.0);
    }

    #[test]
    fn test_absent_rates_default_to_zero() {
        let rates: TaxRates = serde_json::from_str(r#"{"igst_percent": 18}"#).unwrap();
        assert_eq!(rates, TaxRates::inter_state(18.0));
        let line = compute_line_item(2.0, 50.0, TaxRates::default());
        assert_eq!(line.total_with_tax, line.amount);
    }

    #[test]
    fn test_amount_rederives_from_quantity_and_rate() {
        for (q, r) in [(3.0, 19.99), (7.0, 0.1), (12.0, 1234.56)] {
            let line = compute_line_item(q, r, TaxRates::intra_state(2.5, 2.5));
            assert_eq!(line.amount, q * r);
        }
    }

    #[test]
    fn test_totals_scale_linearly_with_quantity() {
        let rates = TaxRates {
            cgst_percent: 6.0,
            sgst_percent: 6.0,
            igst_percent: 0.0,
        };
        let items = [(3.0, 12.5), (7.0, 99.99), (1.0, 0.3)];
        let single: Vec<LineAmounts> = items
            .iter()
            .map(|&(q, r)| compute_line_item(q, r, rates))
            .collect();
        let doubled: Vec<LineAmounts> = items
            .iter()
            .map(|&(q, r)| compute_line_item(q * 2.0, r, rates))
            .collect();

        let a = compute_invoice_totals(&single, 5.0);
        let b = compute_invoice_totals(&doubled, 5.0);
        assert_eq!(b.subtotal, a.subtotal * 2.0);
        assert_eq!(b.total_cgst, a.total_cgst * 2.0);
        assert_eq!(b.total_sgst, a.total_sgst * 2.0);
        assert_eq!(b.total_igst, a.total_igst * 2.0);
        assert_eq!(b.total_tax, a.total_tax * 2.0);
        assert_eq!(b.final_amount, a.final_amount * 2.0);
    }

    #[test]
    fn test_rerun_is_stable() {
        let lines: Vec<LineAmounts> = [(4.0, 17.3), (2.0, 250.0)]
            .iter()
            .map(|&(q, r)| compute_line_item(q, r, TaxRates::inter_state(18.0)))
            .collect();
        assert_eq!(
            compute_invoice_totals(&lines, 2.5),
            compute_invoice_totals(&lines, 2.5)
        );
    }

    #[test]
    fn test_discount_reduces_final_amount() {
        let line = compute_line_item(10.0, 100.0, TaxRates::intra_state(9.0, 9.0));
        let totals = compute_invoice_totals([&line], 10.0);
        assert_eq!(totals.discount_amount, 100.0);
        assert_eq!(totals.final_amount, 1080.0);
    }

    #[test]
    fn test_simple_invoice_totals() {
        let totals = simple_invoice_totals(4.0, 250.0, 18.0, 10.0);
        assert_eq!(totals.subtotal, 1000.0);
        assert_eq!(totals.total_tax, 180.0);
        assert_eq!(totals.discount_amount, 100.0);
        assert_eq!(totals.final_amount, 1080.0);
        assert_eq!(totals.total_cgst, 0.0);
    }
}
