//! End-to-end journey scenarios driven through the spawned engine.
//!
//! All tests run under a paused clock, so typing delays and pauses resolve
//! in virtual time, and use a fixed randomness source so probabilistic
//! branches are forced deterministically.

use std::sync::Arc;

use rust_decimal_macros::dec;
use tokio::sync::watch;

use insurechat::config::EngineConfig;
use insurechat::engine::{self, EngineDeps, EngineView, JourneySpawn};
use insurechat::flows;
use insurechat::i18n::Language;
use insurechat::sim::{FixedRandom, RandomSource};
use insurechat::state::{Product, Sender};
use insurechat::step::{StepId, UserResponse};

fn spawn_at(entry: StepId, random: Arc<dyn RandomSource>) -> JourneySpawn {
    engine::spawn(EngineDeps {
        registry: Arc::new(flows::registry().expect("flow registry builds")),
        entry,
        config: EngineConfig::default(),
        random,
        language: Language::En,
    })
    .expect("engine spawns")
}

/// Wait until the view satisfies `pred`, panicking on faults.
async fn view_when(
    rx: &mut watch::Receiver<EngineView>,
    what: &str,
    pred: impl Fn(&EngineView) -> bool,
) -> EngineView {
    loop {
        {
            let view = rx.borrow_and_update().clone();
            if let Some(fault) = &view.fault {
                panic!("journey faulted while waiting for {what}: {fault}");
            }
            if pred(&view) {
                return view;
            }
        }
        rx.changed().await.expect("engine task alive");
    }
}

/// Wait for the widget of a specific step, requiring at least
/// `min_messages` history entries so a stale pre-submit snapshot of the
/// same step cannot satisfy the wait.
async fn widget_at(
    rx: &mut watch::Receiver<EngineView>,
    step: &str,
    min_messages: usize,
) -> EngineView {
    view_when(rx, step, |v| {
        v.messages.len() >= min_messages && v.widget.as_ref().is_some_and(|w| w.step == step)
    })
    .await
}

fn has_bot_step(view: &EngineView, step: &str) -> bool {
    view.messages
        .iter()
        .any(|m| m.step == step && m.sender == Sender::Bot)
}

fn select(id: &str) -> UserResponse {
    UserResponse::Select(id.to_string())
}

fn text(s: &str) -> UserResponse {
    UserResponse::Text(s.to_string())
}

fn otp(code: &str) -> UserResponse {
    UserResponse::Otp(code.to_string())
}

// ── Scenario 1: EPFO timeout sentinel ───────────────────────────────

#[tokio::test(start_paused = true)]
async fn epfo_sentinel_mobile_routes_to_timeout() {
    let journey = spawn_at(flows::income::ENTRY, Arc::new(FixedRandom::new(0.5)));
    let handle = journey.handle;
    let mut rx = handle.watch();

    widget_at(&mut rx, "employment_type", 0).await;
    handle.submit(select("salaried")).await.unwrap();

    widget_at(&mut rx, "epfo_mobile", 0).await;
    handle.submit(text("9999999999")).await.unwrap();

    let view = widget_at(&mut rx, "income_alt_method", 0).await;
    assert!(has_bot_step(&view, "epfo_timeout"), "expected the timeout stage");
    assert!(!has_bot_step(&view, "epfo_otp"), "OTP must never be offered");
    assert!(!has_bot_step(&view, "epfo_success"));
}

// ── Scenario 2: EPFO reject OTP ─────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn epfo_reject_otp_fails_then_exhausts_attempts() {
    let journey = spawn_at(flows::income::ENTRY, Arc::new(FixedRandom::new(0.5)));
    let handle = journey.handle;
    let mut rx = handle.watch();

    widget_at(&mut rx, "employment_type", 0).await;
    handle.submit(select("salaried")).await.unwrap();
    widget_at(&mut rx, "epfo_mobile", 0).await;
    handle.submit(text("9876543210")).await.unwrap();

    let view = widget_at(&mut rx, "epfo_otp", 0).await;
    let before = view.messages.len();

    // First rejection: failure stage, then back to the OTP widget.
    handle.submit(otp("000000")).await.unwrap();
    let view = widget_at(&mut rx, "epfo_otp", before + 1).await;
    assert!(has_bot_step(&view, "epfo_failure"), "expected the failure stage");

    // Two more rejections exhaust the attempt budget.
    let before = view.messages.len();
    handle.submit(otp("000000")).await.unwrap();
    let view = widget_at(&mut rx, "epfo_otp", before + 1).await;
    let before = view.messages.len();
    handle.submit(otp("000000")).await.unwrap();
    let view = widget_at(&mut rx, "income_alt_method", before + 1).await;
    assert!(has_bot_step(&view, "epfo_failure"));
}

// ── Scenario 3: GSTIN length predicate ──────────────────────────────

#[tokio::test(start_paused = true)]
async fn gstin_of_exactly_fifteen_characters_succeeds() {
    let journey = spawn_at(flows::income::ENTRY, Arc::new(FixedRandom::new(0.5)));
    let handle = journey.handle;
    let mut rx = handle.watch();

    widget_at(&mut rx, "employment_type", 0).await;
    handle.submit(select("business")).await.unwrap();
    widget_at(&mut rx, "gst_number", 0).await;
    handle.submit(text("29ABCDE1234F1Z5")).await.unwrap();

    let view = widget_at(&mut rx, "gst_confirm", 0).await;
    assert!(has_bot_step(&view, "gst_success"));
    assert!(!has_bot_step(&view, "gst_failure"));
}

#[tokio::test(start_paused = true)]
async fn short_gstin_routes_to_failure() {
    let journey = spawn_at(flows::income::ENTRY, Arc::new(FixedRandom::new(0.5)));
    let handle = journey.handle;
    let mut rx = handle.watch();

    widget_at(&mut rx, "employment_type", 0).await;
    handle.submit(select("business")).await.unwrap();
    let view = widget_at(&mut rx, "gst_number", 0).await;
    let before = view.messages.len();
    handle.submit(text("29ABCDE")).await.unwrap();

    let view = widget_at(&mut rx, "gst_number", before + 1).await;
    assert!(has_bot_step(&view, "gst_failure"));
    assert!(!has_bot_step(&view, "gst_success"));
}

// ── Scenario 4 + cap enforcement: rider pricing through the flow ────

#[tokio::test(start_paused = true)]
async fn over_cap_rider_selection_cannot_advance() {
    let journey = spawn_at(flows::buy::ENTRY, Arc::new(FixedRandom::new(0.5)));
    let handle = journey.handle;
    let mut rx = handle.watch();

    widget_at(&mut rx, "ask_name", 0).await;
    handle.submit(text("Asha")).await.unwrap();
    widget_at(&mut rx, "ask_language", 0).await;
    handle.submit(select("en")).await.unwrap();
    widget_at(&mut rx, "product_select", 0).await;
    handle.submit(select("life")).await.unwrap();

    widget_at(&mut rx, "life_age", 0).await;
    handle.submit(UserResponse::Number(32)).await.unwrap();
    widget_at(&mut rx, "life_smoker", 0).await;
    handle.submit(select("no")).await.unwrap();
    widget_at(&mut rx, "life_income", 0).await;
    handle.submit(UserResponse::Amount(dec!(1_200_000))).await.unwrap();
    widget_at(&mut rx, "life_cover", 0).await;
    handle.submit(select("2500000")).await.unwrap();
    widget_at(&mut rx, "life_term", 0).await;
    handle.submit(UserResponse::Number(25)).await.unwrap();
    widget_at(&mut rx, "life_plans", 0).await;
    handle.submit(select("life_basic")).await.unwrap();

    let view = widget_at(&mut rx, "life_riders", 0).await;
    let before = view.messages.len();

    // Both accidental riders together bust the 30 % budget at this base
    // premium; the router must refuse to advance.
    handle
        .submit(UserResponse::Multi(vec![
            "accidental_death".to_string(),
            "accidental_disability".to_string(),
        ]))
        .await
        .unwrap();
    let view = widget_at(&mut rx, "life_riders", before + 1).await;
    assert!(
        view.widget.as_ref().unwrap().script.content().contains("exceeds"),
        "re-rendered rider widget should explain the refusal"
    );

    // A single accidental-death rider fits and prices at exactly 456 from
    // the fixed table (10 lakh rider cover).
    let before = view.messages.len();
    handle
        .submit(UserResponse::Multi(vec!["accidental_death".to_string()]))
        .await
        .unwrap();
    let view = widget_at(&mut rx, "life_quote_summary", before + 1).await;
    let quote = view.quote.expect("quote recomputed");
    assert_eq!(quote.rider_premium, dec!(456.00));
}

// ── Scenario 5: Aadhaar demo OTP completes the journey ──────────────

#[tokio::test(start_paused = true)]
async fn aadhaar_demo_otp_completes_the_journey_exactly_once() {
    let journey = spawn_at(flows::buy::ENTRY, Arc::new(FixedRandom::new(0.9)));
    let handle = journey.handle;
    let mut rx = handle.watch();

    widget_at(&mut rx, "ask_name", 0).await;
    handle.submit(text("Asha")).await.unwrap();
    widget_at(&mut rx, "ask_language", 0).await;
    handle.submit(select("en")).await.unwrap();
    widget_at(&mut rx, "product_select", 0).await;
    handle.submit(select("health")).await.unwrap();

    widget_at(&mut rx, "health_age", 0).await;
    handle.submit(UserResponse::Number(32)).await.unwrap();
    widget_at(&mut rx, "health_gender", 0).await;
    handle.submit(select("female")).await.unwrap();
    widget_at(&mut rx, "health_pincode", 0).await;
    handle.submit(text("560001")).await.unwrap();
    widget_at(&mut rx, "health_members", 0).await;
    handle.submit(UserResponse::Multi(vec!["self".to_string()])).await.unwrap();
    widget_at(&mut rx, "health_sum_insured", 0).await;
    handle.submit(select("500000")).await.unwrap();
    widget_at(&mut rx, "health_conditions", 0).await;
    handle.submit(UserResponse::Multi(vec![])).await.unwrap();

    // The senior note is an invisible conditional step at age 32: it must
    // leave no trace in history.
    let view = widget_at(&mut rx, "health_plans", 0).await;
    assert!(!has_bot_step(&view, "health_senior_note"));

    handle.submit(select("health_plus")).await.unwrap();
    widget_at(&mut rx, "health_summary", 0).await;
    handle.submit(UserResponse::Ack).await.unwrap();
    widget_at(&mut rx, "proposer_email", 0).await;
    handle.submit(text("asha@example.com")).await.unwrap();
    widget_at(&mut rx, "nominee_name", 0).await;
    handle.submit(text("Ravi")).await.unwrap();
    widget_at(&mut rx, "nominee_relation", 0).await;
    handle.submit(select("spouse")).await.unwrap();
    widget_at(&mut rx, "payment_method", 0).await;
    handle.submit(select("upi")).await.unwrap();
    widget_at(&mut rx, "payment_confirm", 0).await;
    handle.submit(UserResponse::Ack).await.unwrap();

    widget_at(&mut rx, "kyc_method", 0).await;
    handle.submit(select("aadhaar")).await.unwrap();
    widget_at(&mut rx, "kyc_aadhaar_number", 0).await;
    handle.submit(text("123412341234")).await.unwrap();

    let view = widget_at(&mut rx, "kyc_aadhaar_otp", 0).await;
    assert!(
        view.widget.as_ref().unwrap().countdown_remaining.is_some(),
        "OTP widget carries its resend countdown"
    );
    handle.submit(otp("123456")).await.unwrap();

    let view = view_when(&mut rx, "journey end", |v| v.ended).await;
    assert!(has_bot_step(&view, "kyc_success"));
    assert!(has_bot_step(&view, "journey_complete"));

    // The completion callback fires exactly once, after the fixed delay.
    let summary = journey.completion.await.expect("completion sent once");
    assert_eq!(summary.product, Some(Product::Health));
    assert!(summary.messages > 0);
}

// ── Scenario 6 + idempotence: edit/rewind ───────────────────────────

#[tokio::test(start_paused = true)]
async fn edit_rewind_truncates_history_and_replays_downstream() {
    let journey = spawn_at(flows::buy::ENTRY, Arc::new(FixedRandom::new(0.5)));
    let handle = journey.handle;
    let mut rx = handle.watch();

    widget_at(&mut rx, "ask_name", 0).await;
    handle.submit(text("Asha")).await.unwrap();
    widget_at(&mut rx, "ask_language", 0).await;
    handle.submit(select("en")).await.unwrap();

    // welcome(bot) + ask_name(bot+user) + ask_language(bot+user) +
    // product_select(bot) = 6 entries.
    let view = widget_at(&mut rx, "product_select", 6).await;
    assert_eq!(view.messages.len(), 6);

    let prompt = handle.request_edit("ask_name").await.unwrap();
    assert_eq!(prompt.step, "ask_name");

    handle.confirm_edit("ask_name", text("Meera")).await.unwrap();

    // History rewinds to [welcome, ask_name prompt, new answer] and the
    // journey replays forward into ask_language.
    let view = widget_at(&mut rx, "ask_language", 0).await;
    assert_eq!(view.messages.len(), 4);
    assert_eq!(view.messages[1].step, "ask_name");
    assert_eq!(view.messages[1].sender, Sender::Bot);
    assert_eq!(view.messages[2].text, "Meera");
    assert_eq!(view.messages[2].sender, Sender::User);
    assert!(
        view.messages.iter().all(|m| !m.text.contains("Asha")),
        "the edited answer replaces, never appends"
    );
    assert!(
        view.messages[3].text.contains("Meera"),
        "downstream scripts re-render from the edited state"
    );
}

#[tokio::test(start_paused = true)]
async fn editing_with_the_same_answer_reproduces_the_transcript() {
    async fn transcript(with_edit: bool) -> Vec<(Sender, StepId, String)> {
        let journey = spawn_at(flows::buy::ENTRY, Arc::new(FixedRandom::new(0.5)));
        let handle = journey.handle;
        let mut rx = handle.watch();

        widget_at(&mut rx, "ask_name", 0).await;
        handle.submit(text("Asha")).await.unwrap();
        widget_at(&mut rx, "ask_language", 0).await;
        handle.submit(select("en")).await.unwrap();
        widget_at(&mut rx, "product_select", 6).await;

        if with_edit {
            handle.confirm_edit("ask_name", text("Asha")).await.unwrap();
            widget_at(&mut rx, "ask_language", 0).await;
            handle.submit(select("en")).await.unwrap();
        }

        let view = widget_at(&mut rx, "product_select", 6).await;
        view.messages
            .iter()
            .map(|m| (m.sender, m.step, m.text.clone()))
            .collect()
    }

    let plain = transcript(false).await;
    let edited = transcript(true).await;
    assert_eq!(plain, edited);
}

// ── Randomized branches are forced through the injected source ──────

#[tokio::test(start_paused = true)]
async fn account_aggregator_unavailability_is_injectable() {
    async fn drive_to_aa(random: Arc<FixedRandom>) -> (engine::JourneyHandle, watch::Receiver<EngineView>) {
        let journey = spawn_at(flows::income::ENTRY, random);
        let handle = journey.handle;
        let mut rx = handle.watch();

        widget_at(&mut rx, "employment_type", 0).await;
        handle.submit(select("salaried")).await.unwrap();
        widget_at(&mut rx, "epfo_mobile", 0).await;
        // Sentinel mobile forces the timeout branch into alternate methods.
        handle.submit(text("9999999999")).await.unwrap();
        widget_at(&mut rx, "income_alt_method", 0).await;
        handle.submit(select("bank_aa")).await.unwrap();
        widget_at(&mut rx, "aa_bank_select", 0).await;
        handle.submit(select("hdfc")).await.unwrap();
        widget_at(&mut rx, "aa_consent", 0).await;
        (handle, rx)
    }

    // Roll below the unavailability odds: the link fails over to manual
    // upload.
    let random = Arc::new(FixedRandom::new(0.05));
    let (handle, mut rx) = drive_to_aa(random).await;
    handle.submit(select("approve")).await.unwrap();
    let view = widget_at(&mut rx, "income_manual_upload", 0).await;
    assert!(has_bot_step(&view, "aa_unavailable"));

    // Roll above the odds: the link succeeds.
    let random = Arc::new(FixedRandom::new(0.95));
    let (handle, mut rx) = drive_to_aa(random).await;
    handle.submit(select("approve")).await.unwrap();
    let view = widget_at(&mut rx, "income_summary", 0).await;
    assert!(has_bot_step(&view, "aa_success"));
}

// ── Widget boundary refuses invalid input ───────────────────────────

#[tokio::test(start_paused = true)]
async fn invalid_input_is_refused_at_the_widget_boundary() {
    let journey = spawn_at(flows::income::ENTRY, Arc::new(FixedRandom::new(0.5)));
    let handle = journey.handle;
    let mut rx = handle.watch();

    widget_at(&mut rx, "employment_type", 0).await;
    // Wrong shape for a select widget.
    assert!(handle.submit(text("salaried")).await.is_err());
    // Unknown option id.
    assert!(handle.submit(select("freelancer")).await.is_err());

    handle.submit(select("salaried")).await.unwrap();
    widget_at(&mut rx, "epfo_mobile", 0).await;
    // Malformed mobile number never reaches the processor.
    assert!(handle.submit(text("12345")).await.is_err());
    handle.submit(text("9876543210")).await.unwrap();

    let view = widget_at(&mut rx, "epfo_otp", 0).await;
    // Too-short OTP is refused.
    assert!(handle.submit(otp("123")).await.is_err());
    assert!(view.widget.is_some());
}

// ── Servicing entry point ───────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn servicing_menu_files_a_claim_and_loops_back() {
    let journey = spawn_at(flows::post_payment::ENTRY, Arc::new(FixedRandom::new(0.5)));
    let handle = journey.handle;
    let mut rx = handle.watch();

    widget_at(&mut rx, "service_menu", 0).await;
    handle.submit(select("file_claim")).await.unwrap();
    widget_at(&mut rx, "claim_type", 0).await;
    handle.submit(select("cashless")).await.unwrap();
    widget_at(&mut rx, "claim_date", 0).await;
    handle
        .submit(UserResponse::Date(
            chrono::NaiveDate::from_ymd_opt(2026, 7, 14).unwrap(),
        ))
        .await
        .unwrap();
    widget_at(&mut rx, "claim_description", 0).await;
    handle.submit(text("Appendix surgery at Apollo")).await.unwrap();
    widget_at(&mut rx, "claim_documents", 0).await;
    handle.submit(UserResponse::Upload("preauth.pdf".to_string())).await.unwrap();
    widget_at(&mut rx, "claim_review", 0).await;
    handle.submit(UserResponse::Ack).await.unwrap();

    let view = widget_at(&mut rx, "service_again", 0).await;
    assert!(has_bot_step(&view, "claim_submitted"));
    let submitted = view
        .messages
        .iter()
        .find(|m| m.step == "claim_submitted")
        .unwrap();
    assert!(submitted.text.contains("CLM-"), "claim reference surfaced to the user");

    // Loop back for another request, then leave cleanly.
    handle.submit(select("yes")).await.unwrap();
    widget_at(&mut rx, "service_menu", 0).await;
    handle.submit(select("exit")).await.unwrap();
    let view = view_when(&mut rx, "journey end", |v| v.ended).await;
    assert!(has_bot_step(&view, "service_end"));

    let summary = journey.completion.await.expect("completion fires");
    assert!(summary.messages > 0);
}
