const ONES: [&str; 10] = [
    "", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine",
];
const TEENS: [&str; 10] = [
    "Ten", "Eleven", "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen",
    "Eighteen", "Nineteen",
];
const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

fn below_thousand(n: u64) -> String {
    match n {
        0 => String::new(),
        1..=9 => ONES[n as usize].to_string(),
        10..=19 => TEENS[(n - 10) as usize].to_string(),
        20..=99 => {
            let mut s = TENS[(n / 10) as usize].to_string();
            if n % 10 != 0 {
                s.push(' ');
                s.push_str(ONES[(n % 10) as usize]);
            }
            s
        }
        _ => {
            let mut s = format!("{} Hundred", ONES[(n / 100) as usize]);
            if n % 100 != 0 {
                s.push(' ');
                s.push_str(&below_thousand(n % 100));
            }
            s
        }
    }
}

/// Whole number with Indian grouping (crore, lakh, thousand). Empty for 0.
fn spell_indian(mut n: u64) -> String {
    let crore = n / 10_000_000;
    n %= 10_000_000;
    let lakh = n / 100_000;
    n %= 100_000;
    let thousand = n / 1_000;
    n %= 1_000;

    let mut groups: Vec<String> = Vec::new();
    if crore > 0 {
        groups.push(format!("{} Crore", spell_indian(crore)));
    }
    if lakh > 0 {
        groups.push(format!("{} Lakh", below_thousand(lakh)));
    }
    if thousand > 0 {
        groups.push(format!("{} Thousand", below_thousand(thousand)));
    }
    if n > 0 {
        groups.push(below_thousand(n));
    }
    groups.join(" ")
}

/// Rupee amount in words as printed on tax invoices: `1180.5` becomes
/// "One Thousand One Hundred Eighty Rupees and Fifty Paise Only".
pub fn amount_in_words(amount: f64) -> String {
    if amount == 0.0 || !amount.is_finite() || amount < 0.0 {
        return "Zero Rupees Only".to_string();
    }

    // Round to paise before splitting so a round-up carries into rupees.
    let total_paise = (amount * 100.0).round() as u64;
    let paise = total_paise % 100;
    let rupees = spell_indian(total_paise / 100);

    let mut words = if rupees.is_empty() {
        "Zero Rupees".to_string()
    } else {
        format!("{} Rupees", rupees)
    };
    if paise > 0 {
        words.push_str(&format!(" and {} Paise", below_thousand(paise)));
    }
    words.push_str(" Only");
    words
}
