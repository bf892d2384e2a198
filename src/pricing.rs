//! Premium tables and quote arithmetic.
//!
//! Pure lookup tables plus multiplier arithmetic: identical inputs always
//! price identically. The engine recomputes the whole quote after every
//! state merge instead of adjusting it incrementally.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::state::{Answers, Product, SelectedRider, VehicleKind};

/// GST applied on top of base + rider premium.
const GST_RATE: Decimal = dec!(0.18);

/// Rider cap class. Accidental riders together may cost at most 30 % of
/// the base premium, critical-illness riders at most 100 %.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiderClass {
    Accidental,
    CriticalIllness,
}

impl RiderClass {
    /// Cap as a percentage of the base premium.
    pub fn cap_pct(self) -> Decimal {
        match self {
            Self::Accidental => dec!(30),
            Self::CriticalIllness => dec!(100),
        }
    }
}

/// A rider available for attachment to a life plan.
#[derive(Debug, Clone, Copy)]
pub struct RiderInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub class: RiderClass,
    /// Annual premium per 1 000 of rider cover.
    rate_per_mille: Decimal,
    /// Whether the age/smoker loadings apply.
    loaded: bool,
}

/// The fixed rider catalogue.
pub const RIDERS: &[RiderInfo] = &[
    RiderInfo {
        id: "accidental_death",
        label: "Accidental Death Benefit",
        class: RiderClass::Accidental,
        rate_per_mille: dec!(0.456),
        loaded: false,
    },
    RiderInfo {
        id: "accidental_disability",
        label: "Accidental Total Disability",
        class: RiderClass::Accidental,
        rate_per_mille: dec!(0.30),
        loaded: false,
    },
    RiderInfo {
        id: "critical_illness",
        label: "Critical Illness Cover",
        class: RiderClass::CriticalIllness,
        rate_per_mille: dec!(1.25),
        loaded: true,
    },
    RiderInfo {
        id: "cancer_shield",
        label: "Cancer Shield",
        class: RiderClass::CriticalIllness,
        rate_per_mille: dec!(0.90),
        loaded: true,
    },
];

/// Look a rider up by id.
pub fn rider_info(id: &str) -> Option<&'static RiderInfo> {
    RIDERS.iter().find(|r| r.id == id)
}

fn ci_age_multiplier(age: u32) -> Decimal {
    match age {
        0..=34 => dec!(1.0),
        35..=44 => dec!(1.3),
        45..=54 => dec!(1.7),
        _ => dec!(2.2),
    }
}

/// Annual premium for a rider at the given cover. Unloaded riders price
/// flat per cover; loaded riders take age and smoker multipliers.
pub fn rider_premium(id: &str, cover: Decimal, age: u32, smoker: bool) -> Option<Decimal> {
    let info = rider_info(id)?;
    let base = cover / dec!(1000) * info.rate_per_mille;
    let premium = if info.loaded {
        let smoker_mult = if smoker { dec!(1.5) } else { dec!(1.0) };
        base * ci_age_multiplier(age) * smoker_mult
    } else {
        base
    };
    Some(premium.round_dp(2))
}

/// Combined premium of the selected riders in one cap class.
pub fn class_premium(riders: &[SelectedRider], class: RiderClass, age: u32, smoker: bool) -> Decimal {
    riders
        .iter()
        .filter(|r| rider_info(&r.id).is_some_and(|info| info.class == class))
        .filter_map(|r| rider_premium(&r.id, r.cover, age, smoker))
        .sum()
}

/// How much of a cap class's budget is used, as a percentage. 100 means
/// the cap is exactly exhausted.
pub fn limit_used_pct(
    riders: &[SelectedRider],
    class: RiderClass,
    base_premium: Decimal,
    age: u32,
    smoker: bool,
) -> Decimal {
    if base_premium <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let budget = base_premium * class.cap_pct() / dec!(100);
    let used = class_premium(riders, class, age, smoker);
    (used / budget * dec!(100)).round_dp(1)
}

/// Whether any rider class is at or past its cap.
pub fn over_cap(riders: &[SelectedRider], base_premium: Decimal, age: u32, smoker: bool) -> bool {
    [RiderClass::Accidental, RiderClass::CriticalIllness]
        .into_iter()
        .any(|class| limit_used_pct(riders, class, base_premium, age, smoker) >= dec!(100))
}

// ── Base premium tables ─────────────────────────────────────────────

/// Multiplier for the selected plan variant; unknown plans price at 1.0.
pub fn plan_multiplier(plan: &str) -> Decimal {
    match plan {
        "health_essential" | "life_basic" => dec!(1.0),
        "health_plus" => dec!(1.25),
        "health_premium" => dec!(1.55),
        "life_shield_plus" => dec!(1.2),
        _ => dec!(1.0),
    }
}

fn health_rate_pct(age: u32) -> Decimal {
    match age {
        0..=29 => dec!(0.9),
        30..=44 => dec!(1.2),
        45..=59 => dec!(1.9),
        _ => dec!(3.2),
    }
}

/// Health base premium for an explicit plan choice (used to price the
/// plan cards before one is selected).
pub fn health_premium(
    sum_insured: Decimal,
    age: u32,
    members: usize,
    conditions: usize,
    plan: &str,
) -> Decimal {
    let per_member = sum_insured * health_rate_pct(age) / dec!(100);
    let household = dec!(1) + dec!(0.35) * Decimal::from(members.saturating_sub(1));
    let loading = dec!(1) + dec!(0.15) * Decimal::from(conditions);
    (per_member * household * loading * plan_multiplier(plan)).round_dp(2)
}

fn life_rate_per_mille(age: u32) -> Decimal {
    match age {
        0..=29 => dec!(0.60),
        30..=39 => dec!(0.85),
        40..=49 => dec!(1.45),
        _ => dec!(2.40),
    }
}

/// Annual term-life base premium for a plan choice.
pub fn life_premium(cover: Decimal, age: u32, smoker: bool, plan: &str) -> Decimal {
    let smoker_mult = if smoker { dec!(1.5) } else { dec!(1.0) };
    (cover / dec!(1000) * life_rate_per_mille(age) * smoker_mult * plan_multiplier(plan)).round_dp(2)
}

/// Motor base premium: IDV rate plus add-on pricing.
pub fn motor_premium(idv: Decimal, kind: VehicleKind, addons: &[String]) -> Decimal {
    let rate = match kind {
        VehicleKind::Car => dec!(2.4),
        VehicleKind::Bike => dec!(1.8),
    };
    let mut premium = idv * rate / dec!(100);
    for addon in addons {
        premium += match addon.as_str() {
            "zero_dep" => idv * dec!(0.4) / dec!(100),
            "roadside" => dec!(199),
            "engine_protect" => idv * dec!(0.25) / dec!(100),
            _ => Decimal::ZERO,
        };
    }
    premium.round_dp(2)
}

/// Base premium for the product currently being configured, if enough
/// answers have accumulated to price it.
pub fn base_premium(answers: &Answers) -> Option<Decimal> {
    match answers.product? {
        Product::Health => {
            let sum_insured = answers.health.sum_insured?;
            let age = answers.profile.age?;
            let members = answers.health.members.as_ref().map_or(1, |m| m.len().max(1));
            let conditions = answers
                .health
                .conditions
                .as_ref()
                .map_or(0, |c| c.iter().filter(|c| c.as_str() != "none").count());
            let plan = answers.health.plan.as_deref().unwrap_or("health_essential");
            Some(health_premium(sum_insured, age, members, conditions, plan))
        }
        Product::Motor => {
            let idv = answers.motor.idv?;
            let kind = answers.motor.vehicle_kind?;
            let addons = answers.motor.addons.clone().unwrap_or_default();
            Some(motor_premium(idv, kind, &addons))
        }
        Product::Life => {
            let cover = answers.life.cover?;
            let age = answers.profile.age?;
            let smoker = answers.life.smoker.unwrap_or(false);
            let plan = answers.life.plan.as_deref().unwrap_or("life_basic");
            Some(life_premium(cover, age, smoker, plan))
        }
    }
}

// ── Quote ───────────────────────────────────────────────────────────

/// Computed quote, always derived from the current answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub base_premium: Decimal,
    pub rider_premium: Decimal,
    pub taxes: Decimal,
    pub total: Decimal,
}

/// Recompute the quote from scratch. Returns `None` until the answers can
/// price a base premium; idempotent for identical inputs.
pub fn recompute(answers: &Answers) -> Option<Quote> {
    let base = base_premium(answers)?;
    let age = answers.profile.age.unwrap_or(30);
    let smoker = answers.life.smoker.unwrap_or(false);
    let riders: Decimal = answers
        .life
        .riders
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|r| rider_premium(&r.id, r.cover, age, smoker))
        .sum();
    let taxes = ((base + riders) * GST_RATE).round_dp(2);
    Some(Quote {
        base_premium: base,
        rider_premium: riders,
        taxes,
        total: base + riders + taxes,
    })
}

/// Format an amount with Indian digit grouping: `1234567` → `₹12,34,567`.
pub fn fmt_inr(amount: Decimal) -> String {
    let rounded = amount.round_dp(0);
    let digits = rounded.abs().to_string();
    let (head, tail) = if digits.len() > 3 {
        digits.split_at(digits.len() - 3)
    } else {
        ("", digits.as_str())
    };
    let mut grouped = String::new();
    let head_chars: Vec<char> = head.chars().collect();
    for (i, c) in head_chars.iter().enumerate() {
        if i > 0 && (head_chars.len() - i) % 2 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }
    if grouped.is_empty() {
        format!("₹{tail}")
    } else {
        format!("₹{grouped},{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AnswersPatch;

    #[test]
    fn accidental_death_prices_flat_from_the_table() {
        // 0.456 per mille: 10 lakh cover → 456, regardless of age/smoker.
        assert_eq!(
            rider_premium("accidental_death", dec!(1_000_000), 32, false),
            Some(dec!(456.00))
        );
        assert_eq!(
            rider_premium("accidental_death", dec!(1_000_000), 58, true),
            Some(dec!(456.00))
        );
    }

    #[test]
    fn critical_illness_takes_age_and_smoker_loadings() {
        let young = rider_premium("critical_illness", dec!(1_000_000), 30, false).unwrap();
        let older_smoker = rider_premium("critical_illness", dec!(1_000_000), 48, true).unwrap();
        assert_eq!(young, dec!(1250.00));
        assert_eq!(older_smoker, dec!(1250) * dec!(1.7) * dec!(1.5));
    }

    #[test]
    fn accidental_limit_used_matches_hand_math() {
        // Base 10 000 → accidental budget 3 000; 456 used → 15.2 %.
        let riders = vec![SelectedRider {
            id: "accidental_death".to_string(),
            cover: dec!(1_000_000),
        }];
        let pct = limit_used_pct(&riders, RiderClass::Accidental, dec!(10_000), 32, false);
        assert_eq!(pct, dec!(15.2));
    }

    #[test]
    fn over_cap_detects_exhausted_accidental_budget() {
        // 30 % of 1 000 is 300; two accidental riders on 10 lakh cover
        // cost 456 + 300 = 756, far past the budget.
        let riders = vec![
            SelectedRider {
                id: "accidental_death".to_string(),
                cover: dec!(1_000_000),
            },
            SelectedRider {
                id: "accidental_disability".to_string(),
                cover: dec!(1_000_000),
            },
        ];
        assert!(over_cap(&riders, dec!(1_000), 32, false));
        assert!(!over_cap(&riders, dec!(10_000), 32, false));
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut answers = Answers::default();
        answers.merge(AnswersPatch {
            product: Some(Product::Life),
            age: Some(32),
            smoker: Some(false),
            cover: Some(dec!(5_000_000)),
            life_plan: Some("life_basic".to_string()),
            ..Default::default()
        });

        let first = recompute(&answers).unwrap();
        let second = recompute(&answers).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.base_premium, dec!(4250.00));
        assert_eq!(first.total, first.base_premium + first.rider_premium + first.taxes);
    }

    #[test]
    fn recompute_needs_a_product_and_its_inputs() {
        assert!(recompute(&Answers::default()).is_none());

        let mut answers = Answers::default();
        answers.merge(AnswersPatch {
            product: Some(Product::Life),
            ..Default::default()
        });
        assert!(recompute(&answers).is_none());
    }

    #[test]
    fn inr_formatting_uses_indian_grouping() {
        assert_eq!(fmt_inr(dec!(456)), "₹456");
        assert_eq!(fmt_inr(dec!(10000)), "₹10,000");
        assert_eq!(fmt_inr(dec!(1234567)), "₹12,34,567");
        assert_eq!(fmt_inr(dec!(50000000)), "₹5,00,00,000");
    }
}
