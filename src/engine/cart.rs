use serde::{Deserialize, Serialize};

use crate::models::order::LineItem;

const FREE_DELIVERY_THRESHOLD: f64 = 500.0;
const DELIVERY_FEE: f64 = 29.0;

struct CouponRule {
    code: &'static str,
    percent: u32,
    min_order: f64,
}

const COUPONS: [CouponRule; 3] = [
    CouponRule {
        code: "SAVE10",
        percent: 10,
        min_order: 500.0,
    },
    CouponRule {
        code: "FIRST20",
        percent: 20,
        min_order: 300.0,
    },
    CouponRule {
        code: "WELCOME15",
        percent: 15,
        min_order: 400.0,
    },
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CouponOutcome {
    Applied { code: String, percent: u32 },
    UnknownCode { code: String },
    MinimumNotMet { code: String, required: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub discount: f64,
    pub total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<CouponOutcome>,
}

/// Prices a cart. Delivery is free strictly above the threshold; a coupon
/// discounts the subtotal only, never the fee.
pub fn quote(items: &[LineItem], coupon_code: Option<&str>) -> Quote {
    let subtotal: f64 = items
        .iter()
        .map(|item| item.price * f64::from(item.quantity))
        .sum();

    let delivery_fee = if subtotal > FREE_DELIVERY_THRESHOLD {
        0.0
    } else {
        DELIVERY_FEE
    };

    let coupon = coupon_code
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(|code| apply_coupon(code, subtotal));

    let discount = match &coupon {
        Some(CouponOutcome::Applied { percent, .. }) => subtotal * f64::from(*percent) / 100.0,
        _ => 0.0,
    };

    Quote {
        subtotal,
        delivery_fee,
        discount,
        total: subtotal + delivery_fee - discount,
        coupon,
    }
}

fn apply_coupon(code: &str, subtotal: f64) -> CouponOutcome {
    let normalized = code.to_uppercase();

    let rule = match COUPONS.iter().find(|rule| rule.code == normalized) {
        Some(rule) => rule,
        None => return CouponOutcome::UnknownCode { code: normalized },
    };

    if subtotal < rule.min_order {
        return CouponOutcome::MinimumNotMet {
            code: normalized,
            required: rule.min_order,
        };
    }

    CouponOutcome::Applied {
        code: normalized,
        percent: rule.percent,
    }
}
