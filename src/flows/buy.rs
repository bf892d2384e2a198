//! Buy flow: product intake (health / motor / life), plan and rider
//! selection, proposer details, simulated payment, and e-KYC.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::i18n::Language;
use crate::pricing;
use crate::state::{
    AnswersPatch, Gender, JourneyState, KycMethod, Product, SelectedRider, VehicleKind,
};
use crate::step::{
    Choice, Module, Script, StepCtx, StepDef, StepId, TextPattern, Transition, UserResponse,
    WidgetType,
};

use super::demo_ref;

pub const ENTRY: StepId = "welcome";

const M: Module = Module::Onboarding;

/// Riders attach at the life cover, capped at 10 lakh.
const RIDER_COVER_CAP: Decimal = dec!(1_000_000);

pub fn steps() -> Vec<StepDef> {
    vec![
        StepDef::auto("welcome", M, welcome_script).to("ask_name"),
        StepDef::new("ask_name", M, WidgetType::Text, ask_name_script)
            .process(set_name)
            .to("ask_language"),
        StepDef::new("ask_language", M, WidgetType::SingleSelect, ask_language_script)
            .process(set_language)
            .to("product_select"),
        StepDef::new("product_select", M, WidgetType::SingleSelect, product_select_script)
            .process(set_product)
            .route(route_product),
        // ── Health intake ───────────────────────────────────────────
        StepDef::auto("health_intro", M, health_intro_script).to("health_age"),
        StepDef::new("health_age", M, WidgetType::Number, health_age_script)
            .process(set_age)
            .to("health_gender"),
        StepDef::new("health_gender", M, WidgetType::SingleSelect, gender_script)
            .process(set_gender)
            .to("health_pincode"),
        StepDef::new("health_pincode", M, WidgetType::Text, pincode_script)
            .process(set_pincode)
            .to("health_members"),
        StepDef::new("health_members", M, WidgetType::MultiSelect, members_script)
            .process(set_members)
            .to("health_sum_insured"),
        StepDef::new("health_sum_insured", M, WidgetType::SingleSelect, sum_insured_script)
            .process(set_sum_insured)
            .to("health_conditions"),
        StepDef::new("health_conditions", M, WidgetType::MultiSelect, health_conditions_script)
            .process(set_health_conditions)
            .to("health_senior_note"),
        StepDef::auto("health_senior_note", M, health_senior_note_script)
            .when(|state| state.answers.profile.age.unwrap_or(0) >= 60)
            .to("health_plans"),
        StepDef::new("health_plans", M, WidgetType::SingleSelect, health_plans_script)
            .process(set_health_plan)
            .to("health_summary"),
        StepDef::new("health_summary", M, WidgetType::Summary, health_summary_script)
            .label_with(quote_reviewed_label)
            .to("proposer_email"),
        // ── Motor intake ────────────────────────────────────────────
        StepDef::auto("motor_intro", M, motor_intro_script).to("motor_vehicle_kind"),
        StepDef::new("motor_vehicle_kind", M, WidgetType::SingleSelect, vehicle_kind_script)
            .process(set_vehicle_kind)
            .to("motor_registration"),
        StepDef::new("motor_registration", M, WidgetType::Text, registration_script)
            .process(set_registration)
            .to("motor_make"),
        StepDef::new("motor_make", M, WidgetType::SingleSelect, motor_make_script)
            .process(set_make)
            .to("motor_year"),
        StepDef::new("motor_year", M, WidgetType::Number, motor_year_script)
            .process(set_year)
            .to("motor_idv"),
        StepDef::new("motor_idv", M, WidgetType::SingleSelect, motor_idv_script)
            .process(set_idv)
            .to("motor_addons"),
        StepDef::new("motor_addons", M, WidgetType::MultiSelect, motor_addons_script)
            .process(set_addons)
            .to("motor_summary"),
        StepDef::new("motor_summary", M, WidgetType::Summary, motor_summary_script)
            .label_with(quote_reviewed_label)
            .to("proposer_email"),
        // ── Life intake ─────────────────────────────────────────────
        StepDef::auto("life_intro", M, life_intro_script).to("life_age"),
        StepDef::new("life_age", M, WidgetType::Number, life_age_script)
            .process(set_age)
            .to("life_smoker"),
        StepDef::new("life_smoker", M, WidgetType::SingleSelect, smoker_script)
            .process(set_smoker)
            .to("life_income"),
        StepDef::new("life_income", M, WidgetType::Amount, life_income_script)
            .process(set_annual_income)
            .to("life_cover"),
        StepDef::new("life_cover", M, WidgetType::SingleSelect, life_cover_script)
            .process(set_cover)
            .to("life_cover_note"),
        StepDef::auto("life_cover_note", M, life_cover_note_script)
            .when(|state| state.answers.life.cover.unwrap_or_default() >= dec!(10_000_000))
            .to("life_term"),
        StepDef::new("life_term", M, WidgetType::Number, life_term_script)
            .process(set_term)
            .to("life_plans"),
        StepDef::new("life_plans", M, WidgetType::SingleSelect, life_plans_script)
            .process(set_life_plan)
            .to("life_riders"),
        StepDef::new("life_riders", M, WidgetType::MultiSelect, life_riders_script)
            .process(set_riders)
            .route(route_riders),
        StepDef::new("life_quote_summary", M, WidgetType::Summary, life_quote_summary_script)
            .label_with(quote_reviewed_label)
            .to("proposer_email"),
        // ── Proposer & payment ──────────────────────────────────────
        StepDef::new("proposer_email", M, WidgetType::Text, email_script)
            .process(set_email)
            .to("nominee_name"),
        StepDef::new("nominee_name", M, WidgetType::Text, nominee_name_script)
            .process(set_nominee_name)
            .to("nominee_relation"),
        StepDef::new("nominee_relation", M, WidgetType::SingleSelect, nominee_relation_script)
            .process(set_nominee_relation)
            .to("payment_method"),
        StepDef::new("payment_method", M, WidgetType::SingleSelect, payment_method_script)
            .process(set_payment_method)
            .to("payment_confirm"),
        StepDef::new("payment_confirm", M, WidgetType::Summary, payment_confirm_script)
            .label_with(payment_confirm_label)
            .process(process_payment)
            .route(route_payment),
        StepDef::auto("payment_failed", M, payment_failed_script).to("payment_retry"),
        StepDef::new("payment_retry", M, WidgetType::SingleSelect, payment_retry_script)
            .route(route_payment_retry),
        StepDef::auto("payment_processing", M, payment_processing_script).to("payment_success"),
        StepDef::auto("payment_success", M, payment_success_script).to("kyc_intro"),
        // ── e-KYC ───────────────────────────────────────────────────
        StepDef::auto("kyc_intro", M, kyc_intro_script).to("kyc_method"),
        StepDef::new("kyc_method", M, WidgetType::SingleSelect, kyc_method_script)
            .process(set_kyc_method)
            .route(route_kyc_method),
        StepDef::new("kyc_aadhaar_number", M, WidgetType::Text, aadhaar_number_script)
            .process(set_aadhaar)
            .to("kyc_aadhaar_otp"),
        StepDef::new("kyc_aadhaar_otp", M, WidgetType::Otp, aadhaar_otp_script)
            .process(process_aadhaar_otp)
            .route(route_aadhaar_otp),
        StepDef::auto("kyc_otp_retry", M, kyc_otp_retry_script).to("kyc_aadhaar_otp"),
        StepDef::auto("kyc_fallback", M, kyc_fallback_script).to("kyc_pan"),
        StepDef::new("kyc_pan", M, WidgetType::Text, pan_script)
            .process(set_pan)
            .to("kyc_selfie"),
        StepDef::new("kyc_selfie", M, WidgetType::Upload, selfie_script)
            .process(set_selfie)
            .to("kyc_success"),
        StepDef::auto("kyc_success", M, kyc_success_script).route(route_after_kyc),
        StepDef::auto("journey_complete", M, journey_complete_script).end(),
    ]
}

// ── Scripts ─────────────────────────────────────────────────────────

fn welcome_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().greeting)
        .and_say("I'll help you find the right cover, finish the paperwork, and stay with you after you buy. It usually takes about five minutes.")
}

fn ask_name_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Before we begin — what should I call you?")
        .with_placeholder("Your name")
        .with_pattern(TextPattern::FreeText)
}

fn ask_language_script(_: &StepCtx, state: &JourneyState) -> Script {
    let name = state.answers.profile.name.as_deref().unwrap_or("there");
    Script::say(format!("Nice to meet you, {name}! Which language works best for you?")).with_options(vec![
        Choice::new("en", "English"),
        Choice::new("hi", "हिन्दी"),
    ])
}

fn product_select_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("What would you like to protect today?").with_options(vec![
        Choice::new("health", "Health insurance").with_sublabel("Hospital bills, for you and family"),
        Choice::new("motor", "Motor insurance").with_sublabel("Car or bike, own damage + third party"),
        Choice::new("life", "Term life insurance").with_sublabel("Income protection for your family"),
    ])
}

fn health_intro_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Great choice. A few quick questions and I'll show you plans with live prices.")
}

fn health_age_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("How old is the eldest member you want covered?")
        .with_placeholder("Age in years")
        .with_range(18, 75)
}

fn gender_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("And their gender?").with_options(vec![
        Choice::new("male", "Male"),
        Choice::new("female", "Female"),
        Choice::new("other", "Other"),
    ])
}

fn pincode_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Which PIN code do you live in? Hospital networks vary by city.")
        .with_placeholder("6-digit PIN code")
        .with_pattern(TextPattern::Pincode)
}

fn members_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Who all should the policy cover?").with_options(vec![
        Choice::new("self", "Myself"),
        Choice::new("spouse", "Spouse"),
        Choice::new("son", "Son"),
        Choice::new("daughter", "Daughter"),
        Choice::new("father", "Father"),
        Choice::new("mother", "Mother"),
    ])
}

fn sum_insured_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("How much hospital cover would you like?").with_options(vec![
        Choice::new("300000", "₹3 lakh").with_sublabel("Basic protection"),
        Choice::new("500000", "₹5 lakh").with_sublabel("Most popular"),
        Choice::new("1000000", "₹10 lakh").with_sublabel("Comfortable for metros"),
        Choice::new("2500000", "₹25 lakh").with_sublabel("Premium hospitals covered"),
    ])
}

fn health_conditions_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Does anyone being covered have an existing condition? This only affects pricing, never eligibility here.").with_options(vec![
        Choice::new("none", "None of these"),
        Choice::new("diabetes", "Diabetes"),
        Choice::new("hypertension", "Blood pressure"),
        Choice::new("asthma", "Asthma"),
        Choice::new("cardiac", "Heart condition"),
    ])
}

fn health_senior_note_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Since the eldest member is 60 or older, the insurer may ask for a short health checkup before issuing. I'll flag it if needed — nothing for you to do now.")
}

fn health_plans_script(_: &StepCtx, state: &JourneyState) -> Script {
    let answers = &state.answers;
    let sum_insured = answers.health.sum_insured.unwrap_or(dec!(500_000));
    let age = answers.profile.age.unwrap_or(30);
    let members = answers.health.members.as_ref().map_or(1, |m| m.len().max(1));
    let conditions = answers
        .health
        .conditions
        .as_ref()
        .map_or(0, |c| c.iter().filter(|c| c.as_str() != "none").count());

    let options = [
        ("health_essential", "Essential", "Network hospitals, 2-yr waiting"),
        ("health_plus", "Plus", "No room-rent cap, 1-yr waiting"),
        ("health_premium", "Premium", "Everything, plus OPD & dental"),
    ]
    .into_iter()
    .map(|(id, label, detail)| {
        let premium = pricing::health_premium(sum_insured, age, members, conditions, id);
        Choice::new(id, label).with_sublabel(format!("{} / year · {detail}", pricing::fmt_inr(premium)))
    })
    .collect();

    Script::say("Here are the plans that fit. Prices are for everyone you selected, per year.")
        .with_options(options)
}

fn health_summary_script(_: &StepCtx, state: &JourneyState) -> Script {
    quote_summary_script(state, "Your health plan is ready:")
}

fn motor_intro_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Let's get your vehicle covered. I just need a few details from the RC.")
}

fn vehicle_kind_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("What are we insuring?").with_options(vec![
        Choice::new("car", "Car"),
        Choice::new("bike", "Bike / scooter"),
    ])
}

fn registration_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("What's the registration number?")
        .with_placeholder("e.g. KA01AB1234")
        .with_pattern(TextPattern::Registration)
}

fn motor_make_script(_: &StepCtx, state: &JourneyState) -> Script {
    let options = match state.answers.motor.vehicle_kind {
        Some(VehicleKind::Bike) => vec![
            Choice::new("honda_activa", "Honda Activa"),
            Choice::new("hero_splendor", "Hero Splendor"),
            Choice::new("tvs_apache", "TVS Apache"),
        ],
        _ => vec![
            Choice::new("maruti_swift", "Maruti Swift"),
            Choice::new("hyundai_i20", "Hyundai i20"),
            Choice::new("tata_nexon", "Tata Nexon"),
        ],
    };
    Script::say("Which model is it?").with_options(options)
}

fn motor_year_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Which year was it registered?")
        .with_placeholder("e.g. 2021")
        .with_range(2005, 2026)
}

fn motor_idv_script(_: &StepCtx, state: &JourneyState) -> Script {
    let options = match state.answers.motor.vehicle_kind {
        Some(VehicleKind::Bike) => vec![
            Choice::new("40000", "₹40,000"),
            Choice::new("60000", "₹60,000"),
            Choice::new("90000", "₹90,000"),
        ],
        _ => vec![
            Choice::new("200000", "₹2 lakh"),
            Choice::new("400000", "₹4 lakh"),
            Choice::new("600000", "₹6 lakh"),
            Choice::new("900000", "₹9 lakh"),
        ],
    };
    Script::say("Pick the insured value (IDV). Higher IDV means a bigger payout if the vehicle is totalled, for a slightly higher premium.")
        .with_options(options)
}

fn motor_addons_script(_: &StepCtx, state: &JourneyState) -> Script {
    let idv = state.answers.motor.idv.unwrap_or(dec!(400_000));
    Script::say("Any add-ons? These are optional but popular.").with_options(vec![
        Choice::new("zero_dep", "Zero depreciation")
            .with_sublabel(format!("{} / year", pricing::fmt_inr(idv * dec!(0.004)))),
        Choice::new("roadside", "Roadside assistance").with_sublabel("₹199 / year"),
        Choice::new("engine_protect", "Engine protection")
            .with_sublabel(format!("{} / year", pricing::fmt_inr(idv * dec!(0.0025)))),
    ])
}

fn motor_summary_script(_: &StepCtx, state: &JourneyState) -> Script {
    quote_summary_script(state, "Your motor policy is ready:")
}

fn life_intro_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Term life is the simplest, cheapest way to protect your family's income. A few questions to price it right.")
}

fn life_age_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("How old are you?")
        .with_placeholder("Age in years")
        .with_range(18, 65)
}

fn smoker_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Have you smoked or used tobacco in the last 12 months? Honest answers keep claims safe.").with_options(vec![
        Choice::new("no", "No"),
        Choice::new("yes", "Yes"),
    ])
}

fn life_income_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("What's your annual income? Insurers use this to cap the cover they can offer.")
        .with_placeholder("Annual income in ₹")
}

fn life_cover_script(_: &StepCtx, state: &JourneyState) -> Script {
    let income = state.answers.life.annual_income.unwrap_or(dec!(1_000_000));
    let suggested = income * dec!(10);
    Script::say(format!(
        "A common rule of thumb is 10–15× your annual income — around {} for you. How much cover do you want?",
        pricing::fmt_inr(suggested)
    ))
    .with_options(vec![
        Choice::new("2500000", "₹25 lakh"),
        Choice::new("5000000", "₹50 lakh"),
        Choice::new("10000000", "₹1 crore"),
        Choice::new("20000000", "₹2 crore"),
    ])
}

fn life_cover_note_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("For covers of ₹1 crore and above, the insurer needs income proof and a quick medical evaluation. I'll walk you through both after payment — all from your phone.")
}

fn life_term_script(_: &StepCtx, state: &JourneyState) -> Script {
    let age = state.answers.profile.age.unwrap_or(30);
    let suggested = (65u32.saturating_sub(age)).clamp(5, 40);
    Script::say(format!(
        "For how many years should the cover run? Most people cover themselves until 65 — that's {suggested} years for you."
    ))
    .with_placeholder("Term in years")
    .with_range(5, 40)
}

fn life_plans_script(_: &StepCtx, state: &JourneyState) -> Script {
    let answers = &state.answers;
    let cover = answers.life.cover.unwrap_or(dec!(5_000_000));
    let age = answers.profile.age.unwrap_or(30);
    let smoker = answers.life.smoker.unwrap_or(false);

    let options = [
        ("life_basic", "Basic Term", "Pure protection, level premium"),
        ("life_shield_plus", "Shield Plus", "Premiums back at maturity"),
    ]
    .into_iter()
    .map(|(id, label, detail)| {
        let premium = pricing::life_premium(cover, age, smoker, id);
        Choice::new(id, label).with_sublabel(format!("{} / year · {detail}", pricing::fmt_inr(premium)))
    })
    .collect();

    Script::say("Two plans fit what you've told me:").with_options(options)
}

fn life_riders_script(_: &StepCtx, state: &JourneyState) -> Script {
    let answers = &state.answers;
    let base = pricing::base_premium(answers).unwrap_or_default();
    let age = answers.profile.age.unwrap_or(30);
    let smoker = answers.life.smoker.unwrap_or(false);
    let cover = rider_cover(state);
    let selected = answers.life.riders.as_deref().unwrap_or_default();

    let options = pricing::RIDERS
        .iter()
        .map(|info| {
            let premium = pricing::rider_premium(info.id, cover, age, smoker).unwrap_or_default();
            let already = selected.iter().any(|r| r.id == info.id);
            // Adding this rider must not bust its class budget.
            let mut hypothetical = selected.to_vec();
            if !already {
                hypothetical.push(SelectedRider {
                    id: info.id.to_string(),
                    cover,
                });
            }
            let disabled = !already
                && base > Decimal::ZERO
                && pricing::limit_used_pct(&hypothetical, info.class, base, age, smoker)
                    >= dec!(100);
            Choice::new(info.id, info.label)
                .with_sublabel(format!("{} / year", pricing::fmt_inr(premium)))
                .disabled(disabled)
        })
        .collect();

    let mut script = Script::say(
        "Want to strengthen the cover with riders? They attach to the same policy — no separate paperwork.",
    )
    .with_options(options);
    if base > Decimal::ZERO
        && pricing::over_cap(selected, base, age, smoker)
    {
        script = script.and_say(
            "Your current rider selection exceeds what this plan allows — drop one to continue.",
        );
    }
    script
}

fn life_quote_summary_script(_: &StepCtx, state: &JourneyState) -> Script {
    quote_summary_script(state, "Here's your full term-life quote:")
}

fn quote_summary_script(state: &JourneyState, heading: &str) -> Script {
    let mut lines = vec![heading.to_string()];
    if let Some(quote) = &state.quote {
        lines.push(format!("• Base premium: {} / year", pricing::fmt_inr(quote.base_premium)));
        if quote.rider_premium > Decimal::ZERO {
            lines.push(format!("• Riders: {} / year", pricing::fmt_inr(quote.rider_premium)));
        }
        lines.push(format!("• GST (18%): {}", pricing::fmt_inr(quote.taxes)));
        lines.push(format!("• Total: {} / year", pricing::fmt_inr(quote.total)));
    } else {
        lines.push("• Quote pending — a detail or two is still missing.".to_string());
    }
    Script::say(lines.join("\n")).and_say("Take a look — you can tap any earlier answer to change it.")
}

fn email_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Where should I send the policy document?")
        .with_placeholder("you@example.com")
        .with_pattern(TextPattern::Email)
}

fn nominee_name_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Who should receive the benefit if something happens? (your nominee)")
        .with_placeholder("Nominee's full name")
        .with_pattern(TextPattern::FreeText)
}

fn nominee_relation_script(_: &StepCtx, state: &JourneyState) -> Script {
    let nominee = state
        .answers
        .profile
        .nominee_name
        .as_deref()
        .unwrap_or("they");
    Script::say(format!("And how is {nominee} related to you?")).with_options(vec![
        Choice::new("spouse", "Spouse"),
        Choice::new("parent", "Parent"),
        Choice::new("child", "Child"),
        Choice::new("sibling", "Sibling"),
    ])
}

fn payment_method_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("How would you like to pay?").with_options(vec![
        Choice::new("upi", "UPI"),
        Choice::new("card", "Credit / debit card"),
        Choice::new("netbanking", "Net banking"),
    ])
}

fn payment_confirm_script(_: &StepCtx, state: &JourneyState) -> Script {
    let total = state
        .quote
        .as_ref()
        .map(|q| pricing::fmt_inr(q.total))
        .unwrap_or_else(|| "your premium".to_string());
    Script::say(format!(
        "You're paying {total} for the first year. I'll take you to the gateway — this is a simulated payment, no money moves."
    ))
}

fn payment_failed_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("The payment didn't go through. This happens — banks decline simulated charges all the time.")
}

fn payment_retry_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("What would you like to do?").with_options(vec![
        Choice::new("try_again", "Try the same method again"),
        Choice::new("change_method", "Pay a different way"),
    ])
}

fn payment_processing_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().verifying)
}

fn payment_success_script(_: &StepCtx, state: &JourneyState) -> Script {
    let reference = state
        .answers
        .payment
        .reference
        .clone()
        .unwrap_or_else(|| "PAY-000000".to_string());
    Script::say(format!(
        "Payment received ✅ Your receipt number is {reference}. One last thing before the policy is issued — a quick identity check."
    ))
}

fn kyc_intro_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Regulations need me to verify your identity (KYC). The fastest way takes under a minute.")
}

fn kyc_method_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Pick a method:").with_options(vec![
        Choice::new("aadhaar", "Aadhaar OTP").with_sublabel("Instant, needs your Aadhaar-linked mobile"),
        Choice::new("offline", "PAN + selfie").with_sublabel("A day or two for manual review"),
    ])
}

fn aadhaar_number_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Enter your 12-digit Aadhaar number. I only keep the last four digits.")
        .with_placeholder("XXXX XXXX XXXX")
        .with_pattern(TextPattern::Aadhaar)
}

fn aadhaar_otp_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().otp_sent).with_otp(6, 30)
}

fn kyc_otp_retry_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().otp_retry)
}

fn kyc_fallback_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().try_other_way)
        .and_say("We'll verify with your PAN and a selfie instead.")
}

fn pan_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Your PAN, please.")
        .with_placeholder("ABCDE1234F")
        .with_pattern(TextPattern::Pan)
}

fn selfie_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("And a clear selfie — plain background, no sunglasses.")
}

fn kyc_success_script(_: &StepCtx, state: &JourneyState) -> Script {
    let name = state.answers.profile.name.as_deref().unwrap_or("you");
    Script::say(format!("Identity verified ✅ Thanks, {name}."))
}

fn journey_complete_script(_: &StepCtx, state: &JourneyState) -> Script {
    let reference = demo_ref(
        "POL",
        &[
            state.answers.profile.name.as_deref().unwrap_or(""),
            state.answers.profile.email.as_deref().unwrap_or(""),
        ],
    );
    Script::say(format!(
        "All done 🎉 Your policy {reference} is being issued and will reach your email shortly. You can manage it any time from the dashboard."
    ))
}

// ── Processors ──────────────────────────────────────────────────────

fn set_name(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        name: r.as_text().map(str::to_string),
        ..Default::default()
    }
}

fn set_language(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    let language = match r.as_select() {
        Some("hi") => Some(Language::Hi),
        Some(_) => Some(Language::En),
        None => None,
    };
    AnswersPatch {
        language,
        ..Default::default()
    }
}

fn set_product(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    let product = match r.as_select() {
        Some("motor") => Some(Product::Motor),
        Some("life") => Some(Product::Life),
        Some(_) => Some(Product::Health),
        None => None,
    };
    AnswersPatch {
        product,
        ..Default::default()
    }
}

fn set_age(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        age: r.as_number().map(|n| n as u32),
        ..Default::default()
    }
}

fn set_gender(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    let gender = match r.as_select() {
        Some("male") => Some(Gender::Male),
        Some("female") => Some(Gender::Female),
        Some(_) => Some(Gender::Other),
        None => None,
    };
    AnswersPatch {
        gender,
        ..Default::default()
    }
}

fn set_pincode(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        pincode: r.as_text().map(str::to_string),
        ..Default::default()
    }
}

fn set_members(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    let members = r.as_multi().map(|ids| {
        if ids.is_empty() {
            vec!["self".to_string()]
        } else {
            ids.to_vec()
        }
    });
    AnswersPatch {
        members,
        ..Default::default()
    }
}

fn set_sum_insured(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        sum_insured: r.as_select().and_then(|id| id.parse().ok()),
        ..Default::default()
    }
}

fn set_health_conditions(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        health_conditions: r.as_multi().map(<[String]>::to_vec),
        ..Default::default()
    }
}

fn set_health_plan(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        health_plan: r.as_select().map(str::to_string),
        ..Default::default()
    }
}

fn set_vehicle_kind(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    let vehicle_kind = match r.as_select() {
        Some("bike") => Some(VehicleKind::Bike),
        Some(_) => Some(VehicleKind::Car),
        None => None,
    };
    AnswersPatch {
        vehicle_kind,
        ..Default::default()
    }
}

fn set_registration(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        registration: r.as_text().map(str::to_string),
        ..Default::default()
    }
}

fn set_make(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        make: r.as_select().map(str::to_string),
        ..Default::default()
    }
}

fn set_year(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        year: r.as_number().map(|n| n as i32),
        ..Default::default()
    }
}

fn set_idv(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        idv: r.as_select().and_then(|id| id.parse().ok()),
        ..Default::default()
    }
}

fn set_addons(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        addons: r.as_multi().map(<[String]>::to_vec),
        ..Default::default()
    }
}

fn set_smoker(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        smoker: r.as_select().map(|id| id == "yes"),
        ..Default::default()
    }
}

fn set_annual_income(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        annual_income: r.as_amount(),
        ..Default::default()
    }
}

fn set_cover(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        cover: r.as_select().and_then(|id| id.parse().ok()),
        ..Default::default()
    }
}

fn set_term(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        term_years: r.as_number().map(|n| n as u32),
        ..Default::default()
    }
}

fn set_life_plan(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        life_plan: r.as_select().map(str::to_string),
        ..Default::default()
    }
}

fn rider_cover(state: &JourneyState) -> Decimal {
    state
        .answers
        .life
        .cover
        .unwrap_or(dec!(1_000_000))
        .min(RIDER_COVER_CAP)
}

fn set_riders(_: &StepCtx, r: &UserResponse, state: &JourneyState) -> AnswersPatch {
    let cover = rider_cover(state);
    let riders = r.as_multi().map(|ids| {
        ids.iter()
            .filter(|id| pricing::rider_info(id).is_some())
            .map(|id| SelectedRider {
                id: id.clone(),
                cover,
            })
            .collect()
    });
    AnswersPatch {
        riders,
        ..Default::default()
    }
}

fn set_email(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        email: r.as_text().map(str::to_string),
        ..Default::default()
    }
}

fn set_nominee_name(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        nominee_name: r.as_text().map(str::to_string),
        ..Default::default()
    }
}

fn set_nominee_relation(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        nominee_relation: r.as_select().map(str::to_string),
        ..Default::default()
    }
}

fn set_payment_method(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        payment_method: r.as_select().map(str::to_string),
        ..Default::default()
    }
}

/// Shares one roll with [`route_payment`], so the recorded outcome and the
/// branch taken always agree.
fn process_payment(ctx: &StepCtx, _: &UserResponse, state: &JourneyState) -> AnswersPatch {
    let attempts = state.answers.payment.attempts + 1;
    if ctx.roll < ctx.demo.payment_failure_odds {
        AnswersPatch {
            payment_attempts: Some(attempts),
            ..Default::default()
        }
    } else {
        let reference = demo_ref(
            "PAY",
            &[
                state.answers.profile.name.as_deref().unwrap_or(""),
                state.answers.payment.method.as_deref().unwrap_or(""),
            ],
        );
        AnswersPatch {
            payment_attempts: Some(attempts),
            paid: Some(true),
            payment_reference: Some(reference),
            ..Default::default()
        }
    }
}

fn set_kyc_method(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    let method = match r.as_select() {
        Some("offline") => Some(KycMethod::Offline),
        Some(_) => Some(KycMethod::AadhaarOtp),
        None => None,
    };
    AnswersPatch {
        kyc_method: method,
        ..Default::default()
    }
}

fn set_aadhaar(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    let last4 = r
        .as_text()
        .map(|s| s.chars().rev().take(4).collect::<Vec<_>>().iter().rev().collect());
    AnswersPatch {
        aadhaar_last4: last4,
        ..Default::default()
    }
}

fn process_aadhaar_otp(ctx: &StepCtx, r: &UserResponse, state: &JourneyState) -> AnswersPatch {
    if r.as_otp() == Some(ctx.demo.aadhaar_otp.as_str()) {
        AnswersPatch {
            kyc_verified: Some(true),
            kyc_otp_attempts: Some(0),
            ..Default::default()
        }
    } else {
        AnswersPatch {
            kyc_otp_attempts: Some(state.answers.kyc.otp_attempts + 1),
            ..Default::default()
        }
    }
}

fn set_pan(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        pan: r.as_text().map(str::to_string),
        ..Default::default()
    }
}

fn set_selfie(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        selfie_document: r.as_upload().map(str::to_string),
        kyc_verified: Some(true),
        ..Default::default()
    }
}

// ── Routers ─────────────────────────────────────────────────────────

fn route_product(_: &StepCtx, r: Option<&UserResponse>, _: &JourneyState) -> Transition {
    match r.and_then(UserResponse::as_select) {
        Some("motor") => Transition::Goto("motor_intro"),
        Some("life") => Transition::Goto("life_intro"),
        _ => Transition::Goto("health_intro"),
    }
}

/// Refuses to advance while the merged rider selection is over a cap; the
/// widget disables over-budget additions, but an upstream edit can shrink
/// the base premium underneath an existing selection.
fn route_riders(_: &StepCtx, _: Option<&UserResponse>, state: &JourneyState) -> Transition {
    let answers = &state.answers;
    let base = pricing::base_premium(answers).unwrap_or_default();
    let riders = answers.life.riders.as_deref().unwrap_or_default();
    let age = answers.profile.age.unwrap_or(30);
    let smoker = answers.life.smoker.unwrap_or(false);
    if base > Decimal::ZERO && pricing::over_cap(riders, base, age, smoker) {
        return Transition::Goto("life_riders");
    }
    Transition::Goto("life_quote_summary")
}

fn route_payment(ctx: &StepCtx, _: Option<&UserResponse>, _: &JourneyState) -> Transition {
    if ctx.roll < ctx.demo.payment_failure_odds {
        Transition::Goto("payment_failed")
    } else {
        Transition::Goto("payment_processing")
    }
}

fn route_payment_retry(_: &StepCtx, r: Option<&UserResponse>, _: &JourneyState) -> Transition {
    match r.and_then(UserResponse::as_select) {
        Some("change_method") => Transition::Goto("payment_method"),
        _ => Transition::Goto("payment_confirm"),
    }
}

fn route_kyc_method(_: &StepCtx, r: Option<&UserResponse>, _: &JourneyState) -> Transition {
    match r.and_then(UserResponse::as_select) {
        Some("offline") => Transition::Goto("kyc_pan"),
        _ => Transition::Goto("kyc_aadhaar_number"),
    }
}

fn route_aadhaar_otp(ctx: &StepCtx, _: Option<&UserResponse>, state: &JourneyState) -> Transition {
    let kyc = &state.answers.kyc;
    if kyc.verified == Some(true) {
        Transition::Goto("kyc_success")
    } else if kyc.otp_attempts >= ctx.demo.max_otp_attempts {
        Transition::Goto("kyc_fallback")
    } else {
        Transition::Goto("kyc_otp_retry")
    }
}

fn route_after_kyc(_: &StepCtx, _: Option<&UserResponse>, state: &JourneyState) -> Transition {
    if state.answers.product == Some(Product::Life) {
        Transition::Goto("income_intro")
    } else {
        Transition::Goto("journey_complete")
    }
}

// ── Labels ──────────────────────────────────────────────────────────

fn quote_reviewed_label(_: &UserResponse, _: &Script) -> String {
    "Reviewed quote, continuing".to_string()
}

fn payment_confirm_label(_: &UserResponse, _: &Script) -> String {
    "Payment authorised".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DemoConfig;
    use crate::persona::Persona;
    use crate::state::StateStore;

    fn ctx(demo: &DemoConfig, roll: f64) -> StepCtx<'_> {
        StepCtx {
            demo,
            persona: Persona::FirstTimer,
            lang: Language::En,
            roll,
        }
    }

    fn life_state(cover: Decimal, plan: &str) -> StateStore {
        let mut store = StateStore::new(ENTRY, M);
        store.apply(AnswersPatch {
            product: Some(Product::Life),
            age: Some(32),
            smoker: Some(false),
            cover: Some(cover),
            life_plan: Some(plan.to_string()),
            ..Default::default()
        });
        store
    }

    #[test]
    fn product_routing_covers_all_three_lines() {
        let demo = DemoConfig::default();
        let store = StateStore::new(ENTRY, M);
        let c = ctx(&demo, 0.5);
        assert_eq!(
            route_product(&c, Some(&UserResponse::Select("health".into())), store.state()),
            Transition::Goto("health_intro")
        );
        assert_eq!(
            route_product(&c, Some(&UserResponse::Select("motor".into())), store.state()),
            Transition::Goto("motor_intro")
        );
        assert_eq!(
            route_product(&c, Some(&UserResponse::Select("life".into())), store.state()),
            Transition::Goto("life_intro")
        );
    }

    #[test]
    fn rider_selection_refuses_to_advance_over_cap() {
        let demo = DemoConfig::default();
        let c = ctx(&demo, 0.5);

        // Tiny cover → tiny base premium → accidental budget blown by one
        // rider at the 10 lakh rider cover.
        let mut store = life_state(dec!(2_500_000), "life_basic");
        store.apply(AnswersPatch {
            riders: Some(vec![
                SelectedRider {
                    id: "accidental_death".into(),
                    cover: dec!(1_000_000),
                },
                SelectedRider {
                    id: "accidental_disability".into(),
                    cover: dec!(1_000_000),
                },
            ]),
            ..Default::default()
        });
        // base = 2 500 000 * 0.85/1000 = 2125; accidental budget 637.5;
        // riders cost 456 + 300 = 756 → over cap.
        assert_eq!(
            route_riders(&c, None, store.state()),
            Transition::Goto("life_riders")
        );

        let mut ok = life_state(dec!(10_000_000), "life_basic");
        ok.apply(AnswersPatch {
            riders: Some(vec![SelectedRider {
                id: "accidental_death".into(),
                cover: dec!(1_000_000),
            }]),
            ..Default::default()
        });
        assert_eq!(
            route_riders(&c, None, ok.state()),
            Transition::Goto("life_quote_summary")
        );
    }

    #[test]
    fn rider_widget_disables_options_that_would_bust_the_budget() {
        let demo = DemoConfig::default();
        let c = ctx(&demo, 0.5);
        let store = life_state(dec!(2_500_000), "life_basic");

        let script = life_riders_script(&c, store.state());
        // base 2125 → accidental budget 637.5; a lone 456 rider fits.
        let ad = script.options.iter().find(|o| o.id == "accidental_death").unwrap();
        assert!(!ad.disabled);

        // With accidental_death already selected, adding disability would
        // exceed the 30 % budget, so it renders disabled.
        let mut selected = life_state(dec!(2_500_000), "life_basic");
        selected.apply(AnswersPatch {
            riders: Some(vec![SelectedRider {
                id: "accidental_death".into(),
                cover: dec!(1_000_000),
            }]),
            ..Default::default()
        });
        let script = life_riders_script(&c, selected.state());
        let disability = script
            .options
            .iter()
            .find(|o| o.id == "accidental_disability")
            .unwrap();
        assert!(disability.disabled);
    }

    #[test]
    fn aadhaar_otp_success_and_failure_branches() {
        let demo = DemoConfig::default();
        let c = ctx(&demo, 0.5);
        let mut store = StateStore::new(ENTRY, M);

        // Wrong OTP increments attempts and retries.
        let patch = process_aadhaar_otp(&c, &UserResponse::Otp("999999".into()), store.state());
        assert_eq!(patch.kyc_otp_attempts, Some(1));
        store.apply(patch);
        assert_eq!(
            route_aadhaar_otp(&c, None, store.state()),
            Transition::Goto("kyc_otp_retry")
        );

        // The demo OTP verifies.
        let patch = process_aadhaar_otp(&c, &UserResponse::Otp("123456".into()), store.state());
        assert_eq!(patch.kyc_verified, Some(true));
        store.apply(patch);
        assert_eq!(
            route_aadhaar_otp(&c, None, store.state()),
            Transition::Goto("kyc_success")
        );
    }

    #[test]
    fn aadhaar_otp_exhausts_into_offline_fallback() {
        let demo = DemoConfig::default();
        let c = ctx(&demo, 0.5);
        let mut store = StateStore::new(ENTRY, M);

        for _ in 0..3 {
            let patch = process_aadhaar_otp(&c, &UserResponse::Otp("999999".into()), store.state());
            store.apply(patch);
        }
        assert_eq!(
            route_aadhaar_otp(&c, None, store.state()),
            Transition::Goto("kyc_fallback")
        );
    }

    #[test]
    fn payment_outcome_follows_the_shared_roll() {
        let demo = DemoConfig::default();
        let store = StateStore::new(ENTRY, M);

        let fail = ctx(&demo, 0.01);
        let patch = process_payment(&fail, &UserResponse::Ack, store.state());
        assert_eq!(patch.paid, None);
        assert_eq!(route_payment(&fail, None, store.state()), Transition::Goto("payment_failed"));

        let ok = ctx(&demo, 0.95);
        let patch = process_payment(&ok, &UserResponse::Ack, store.state());
        assert_eq!(patch.paid, Some(true));
        assert!(patch.payment_reference.is_some());
        assert_eq!(
            route_payment(&ok, None, store.state()),
            Transition::Goto("payment_processing")
        );
    }

    #[test]
    fn kyc_success_routes_life_into_income_verification() {
        let demo = DemoConfig::default();
        let c = ctx(&demo, 0.5);

        let life = life_state(dec!(5_000_000), "life_basic");
        assert_eq!(route_after_kyc(&c, None, life.state()), Transition::Goto("income_intro"));

        let mut health = StateStore::new(ENTRY, M);
        health.apply(AnswersPatch {
            product: Some(Product::Health),
            ..Default::default()
        });
        assert_eq!(
            route_after_kyc(&c, None, health.state()),
            Transition::Goto("journey_complete")
        );
    }
}
