use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tower::ServiceExt;

use salonbook::config::AppConfig;
use salonbook::db::{self, queries};
use salonbook::models::{AppointmentStatus, ConversationStep};
use salonbook::services::booking::{self, CreateResult};
use salonbook::services::clock::BusinessClock;
use salonbook::services::conversation::{self, ConversationStore};
use salonbook::services::messaging::{Button, ChatProvider, ListItem};
use salonbook::state::AppState;

// ── Mock chat transport ──

#[derive(Debug, Clone)]
enum Sent {
    Text { to: String, body: String },
    List { to: String, body: String, items: Vec<(String, String)> },
    Buttons { to: String, body: String, buttons: Vec<(String, String)> },
}

struct MockChat {
    sent: Arc<Mutex<Vec<Sent>>>,
}

#[async_trait]
impl ChatProvider for MockChat {
    async fn send_text(&self, to: &str, body: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(Sent::Text {
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn send_list(
        &self,
        to: &str,
        body: &str,
        _button_label: &str,
        items: &[ListItem],
    ) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(Sent::List {
            to: to.to_string(),
            body: body.to_string(),
            items: items
                .iter()
                .map(|i| (i.id.clone(), i.title.clone()))
                .collect(),
        });
        Ok(())
    }

    async fn send_buttons(&self, to: &str, body: &str, buttons: &[Button]) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(Sent::Buttons {
            to: to.to_string(),
            body: body.to_string(),
            buttons: buttons
                .iter()
                .map(|b| (b.id.clone(), b.title.clone()))
                .collect(),
        });
        Ok(())
    }
}

// ── Helpers ──

const PHONE: &str = "+905551110000";

// 2025-06-09 is a Monday.
const NOW: &str = "2025-06-09 08:00";

fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        business_timezone: "Europe/Istanbul".to_string(),
        whatsapp_access_token: String::new(),
        whatsapp_phone_number_id: String::new(),
        whatsapp_verify_token: "verify-me".to_string(),
        whatsapp_app_secret: String::new(), // empty = skip signature validation
    }
}

/// State with a fixed clock, one worker (Tuesday 10:00-13:00), and a capture
/// of everything the bot sends.
fn test_state() -> (Arc<AppState>, Arc<Mutex<Vec<Sent>>>) {
    let conn = db::init_db(":memory:").unwrap();
    let worker_id = queries::create_worker(&conn, "Ayşe", Some("Kesim")).unwrap();
    queries::upsert_schedule(&conn, worker_id, 2, time("10:00"), time("13:00"), true).unwrap();

    let sent = Arc::new(Mutex::new(vec![]));
    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(),
        clock: BusinessClock::fixed(dt(NOW)),
        chat: Box::new(MockChat {
            sent: Arc::clone(&sent),
        }),
        conversations: ConversationStore::default(),
    });
    (state, sent)
}

fn last_sent(sent: &Arc<Mutex<Vec<Sent>>>) -> Sent {
    sent.lock().unwrap().last().cloned().expect("nothing sent")
}

fn test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(salonbook::handlers::health::health))
        .route(
            "/webhook/whatsapp",
            get(salonbook::handlers::webhook::verify_webhook),
        )
        .route(
            "/webhook/whatsapp",
            post(salonbook::handlers::webhook::receive_webhook),
        )
        .route(
            "/api/admin/appointments",
            get(salonbook::handlers::admin::get_appointments),
        )
        .route(
            "/api/admin/appointments",
            post(salonbook::handlers::admin::create_appointment),
        )
        .route(
            "/api/admin/appointments/:id/status",
            post(salonbook::handlers::admin::update_appointment_status),
        )
        .route(
            "/api/admin/appointments/:id/notes",
            post(salonbook::handlers::admin::update_appointment_notes),
        )
        .route(
            "/api/admin/workers/:id",
            axum::routing::put(salonbook::handlers::admin::update_worker),
        )
        .route(
            "/api/admin/workers/:id",
            axum::routing::delete(salonbook::handlers::admin::delete_worker),
        )
        .route(
            "/api/admin/workers/:id/slots",
            get(salonbook::handlers::admin::get_worker_slots),
        )
        .with_state(state)
}

// ── Conversation flow ──

#[tokio::test]
async fn booking_command_offers_seven_dates() {
    let (state, sent) = test_state();

    conversation::handle_message(&state, PHONE, "randevu", None)
        .await
        .unwrap();

    match last_sent(&sent) {
        Sent::List { to, items, .. } => {
            assert_eq!(to, PHONE);
            assert_eq!(items.len(), 7);
            assert_eq!(items[0].0, "date_2025-06-09");
            assert_eq!(items[6].0, "date_2025-06-15");
            assert_eq!(items[1].1, "Salı");
        }
        other => panic!("expected date list, got {other:?}"),
    }

    let conv = state.conversations.get(PHONE).unwrap();
    assert_eq!(conv.step, ConversationStep::AwaitingDate);
}

#[tokio::test]
async fn full_booking_flow_creates_pending_appointment() {
    let (state, sent) = test_state();

    conversation::handle_message(&state, PHONE, "/randevu", None)
        .await
        .unwrap();
    conversation::handle_reply(&state, PHONE, "date_2025-06-10")
        .await
        .unwrap();

    match last_sent(&sent) {
        Sent::List { items, .. } => {
            assert_eq!(
                items.iter().map(|i| i.0.as_str()).collect::<Vec<_>>(),
                vec!["time_10:00", "time_11:00", "time_12:00"]
            );
        }
        other => panic!("expected time list, got {other:?}"),
    }
    assert_eq!(
        state.conversations.get(PHONE).unwrap().step,
        ConversationStep::AwaitingTime
    );

    conversation::handle_reply(&state, PHONE, "time_10:00")
        .await
        .unwrap();

    match last_sent(&sent) {
        Sent::Buttons { buttons, .. } => {
            assert_eq!(
                buttons.iter().map(|b| b.0.as_str()).collect::<Vec<_>>(),
                vec!["confirm_yes", "confirm_no"]
            );
        }
        other => panic!("expected confirm buttons, got {other:?}"),
    }

    conversation::handle_reply(&state, PHONE, "confirm_yes")
        .await
        .unwrap();

    match last_sent(&sent) {
        Sent::Text { body, .. } => assert!(body.contains("Randevu No")),
        other => panic!("expected confirmation text, got {other:?}"),
    }
    assert!(state.conversations.get(PHONE).is_none());

    let db = state.db.lock().unwrap();
    let customer = queries::get_customer_by_phone(&db, PHONE).unwrap().unwrap();
    let appointments = queries::appointments_for_customer(&db, customer.id).unwrap();
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].status, AppointmentStatus::Pending);
    assert_eq!(appointments[0].date, date("2025-06-10"));
    assert_eq!(appointments[0].time, time("10:00"));
}

#[tokio::test]
async fn date_without_availability_clears_state() {
    let (state, sent) = test_state();

    conversation::handle_message(&state, PHONE, "randevu", None)
        .await
        .unwrap();
    // Wednesday has no schedule row.
    conversation::handle_reply(&state, PHONE, "date_2025-06-11")
        .await
        .unwrap();

    match last_sent(&sent) {
        Sent::Text { body, .. } => assert!(body.contains("müsait saat yok")),
        other => panic!("expected no-availability text, got {other:?}"),
    }
    assert!(state.conversations.get(PHONE).is_none());
}

#[tokio::test]
async fn free_text_mid_flow_keeps_state() {
    let (state, sent) = test_state();

    conversation::handle_message(&state, PHONE, "randevu", None)
        .await
        .unwrap();
    conversation::handle_reply(&state, PHONE, "date_2025-06-10")
        .await
        .unwrap();

    conversation::handle_message(&state, PHONE, "merhaba, saat kaçta açıksınız?", None)
        .await
        .unwrap();

    match last_sent(&sent) {
        Sent::Text { body, .. } => assert!(body.contains("seçeneklerden birini")),
        other => panic!("expected guidance text, got {other:?}"),
    }

    let conv = state.conversations.get(PHONE).unwrap();
    assert_eq!(conv.step, ConversationStep::AwaitingTime);
    assert_eq!(conv.selected_date, Some(date("2025-06-10")));
}

#[tokio::test]
async fn malformed_reply_reprompts_without_state_change() {
    let (state, sent) = test_state();

    conversation::handle_message(&state, PHONE, "randevu", None)
        .await
        .unwrap();
    conversation::handle_reply(&state, PHONE, "date_not-a-date")
        .await
        .unwrap();

    match last_sent(&sent) {
        Sent::Text { body, .. } => assert!(body.contains("Geçersiz")),
        other => panic!("expected invalid-selection text, got {other:?}"),
    }
    assert_eq!(
        state.conversations.get(PHONE).unwrap().step,
        ConversationStep::AwaitingDate
    );
}

#[tokio::test]
async fn confirm_no_clears_state() {
    let (state, sent) = test_state();

    conversation::handle_message(&state, PHONE, "randevu", None)
        .await
        .unwrap();
    conversation::handle_reply(&state, PHONE, "date_2025-06-10")
        .await
        .unwrap();
    conversation::handle_reply(&state, PHONE, "time_11:00")
        .await
        .unwrap();
    conversation::handle_reply(&state, PHONE, "confirm_no")
        .await
        .unwrap();

    match last_sent(&sent) {
        Sent::Text { body, .. } => assert!(body.contains("iptal edildi")),
        other => panic!("expected decline ack, got {other:?}"),
    }
    assert!(state.conversations.get(PHONE).is_none());
}

#[tokio::test]
async fn confirm_on_stolen_slot_reports_taken_and_clears() {
    let (state, sent) = test_state();

    conversation::handle_message(&state, PHONE, "randevu", None)
        .await
        .unwrap();
    conversation::handle_reply(&state, PHONE, "date_2025-06-10")
        .await
        .unwrap();
    conversation::handle_reply(&state, PHONE, "time_10:00")
        .await
        .unwrap();

    // Another customer wins the slot between confirmation prompt and reply.
    {
        let db = state.db.lock().unwrap();
        let rival = queries::get_or_create_customer(&db, "+905552220000", None).unwrap();
        let result = booking::create_appointment(
            &db,
            rival.id,
            1,
            date("2025-06-10"),
            time("10:00"),
            60,
            None,
            dt(NOW),
        )
        .unwrap();
        assert!(matches!(result, CreateResult::Booked(_)));
    }

    conversation::handle_reply(&state, PHONE, "confirm_yes")
        .await
        .unwrap();

    match last_sent(&sent) {
        Sent::Text { body, .. } => assert!(body.contains("artık müsait değil")),
        other => panic!("expected slot-taken text, got {other:?}"),
    }
    assert!(state.conversations.get(PHONE).is_none());

    // Only the rival's appointment exists.
    let db = state.db.lock().unwrap();
    let customer = queries::get_customer_by_phone(&db, PHONE).unwrap().unwrap();
    assert!(queries::appointments_for_customer(&db, customer.id)
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn cancellation_flow_lists_and_cancels() {
    let (state, sent) = test_state();

    conversation::handle_message(&state, PHONE, "/iptal", None)
        .await
        .unwrap();
    match last_sent(&sent) {
        Sent::Text { body, .. } => assert!(body.contains("Aktif randevunuz bulunmamaktadır")),
        other => panic!("expected no-appointments text, got {other:?}"),
    }

    let appointment_id = {
        let db = state.db.lock().unwrap();
        let customer = queries::get_customer_by_phone(&db, PHONE).unwrap().unwrap();
        match booking::create_appointment(
            &db,
            customer.id,
            1,
            date("2025-06-10"),
            time("10:00"),
            60,
            None,
            dt(NOW),
        )
        .unwrap()
        {
            CreateResult::Booked(a) => a.id,
            other => panic!("expected Booked, got {other:?}"),
        }
    };

    conversation::handle_message(&state, PHONE, "/iptal", None)
        .await
        .unwrap();
    match last_sent(&sent) {
        Sent::List { items, .. } => {
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].0, format!("cancel_{appointment_id}"));
        }
        other => panic!("expected cancel list, got {other:?}"),
    }

    conversation::handle_reply(&state, PHONE, &format!("cancel_{appointment_id}"))
        .await
        .unwrap();
    match last_sent(&sent) {
        Sent::Text { body, .. } => assert!(body.contains("başarıyla iptal edildi")),
        other => panic!("expected cancel ack, got {other:?}"),
    }

    let db = state.db.lock().unwrap();
    let appointment = queries::get_appointment(&db, appointment_id).unwrap().unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn idle_free_text_gets_welcome() {
    let (state, sent) = test_state();

    conversation::handle_message(&state, PHONE, "merhaba", None)
        .await
        .unwrap();

    match last_sent(&sent) {
        Sent::Text { body, .. } => assert!(body.contains("Hoş geldiniz")),
        other => panic!("expected welcome text, got {other:?}"),
    }
    assert!(state.conversations.get(PHONE).is_none());
}

#[tokio::test]
async fn customer_name_set_once() {
    let (state, _sent) = test_state();

    conversation::handle_message(&state, PHONE, "merhaba", Some("Ali"))
        .await
        .unwrap();
    conversation::handle_message(&state, PHONE, "merhaba", Some("Veli"))
        .await
        .unwrap();

    let db = state.db.lock().unwrap();
    let customer = queries::get_customer_by_phone(&db, PHONE).unwrap().unwrap();
    assert_eq!(customer.name.as_deref(), Some("Ali"));
}

// ── Concurrency ──

#[tokio::test]
async fn concurrent_creates_only_one_wins() {
    let (state, _sent) = test_state();

    let mut handles = vec![];
    for i in 0..5 {
        let state = Arc::clone(&state);
        handles.push(tokio::spawn(async move {
            let db = state.db.lock().unwrap();
            let customer =
                queries::get_or_create_customer(&db, &format!("+9055511100{i:02}"), None).unwrap();
            booking::create_appointment(
                &db,
                customer.id,
                1,
                date("2025-06-10"),
                time("10:00"),
                60,
                None,
                dt(NOW),
            )
            .unwrap()
        }));
    }

    let mut booked = 0;
    let mut taken = 0;
    for handle in handles {
        match handle.await.unwrap() {
            CreateResult::Booked(_) => booked += 1,
            CreateResult::SlotTaken => taken += 1,
            CreateResult::InPast => panic!("unexpected past rejection"),
        }
    }
    assert_eq!(booked, 1);
    assert_eq!(taken, 4);
}

// ── Webhook over HTTP ──

#[tokio::test]
async fn webhook_verify_handshake() {
    let (state, _sent) = test_state();
    let app = test_app(state);

    let ok = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/webhook/whatsapp?hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=12345")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let body = axum::body::to_bytes(ok.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"12345");

    let bad = app
        .oneshot(
            Request::builder()
                .uri("/webhook/whatsapp?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=12345")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn webhook_text_message_starts_flow() {
    let (state, sent) = test_state();
    let app = test_app(Arc::clone(&state));

    let payload = serde_json::json!({
        "entry": [{
            "changes": [{
                "value": {
                    "contacts": [{ "wa_id": PHONE, "profile": { "name": "Ali" } }],
                    "messages": [{
                        "from": PHONE,
                        "type": "text",
                        "text": { "body": "randevu" }
                    }]
                }
            }]
        }]
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/whatsapp")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(matches!(last_sent(&sent), Sent::List { .. }));
    assert!(state.conversations.get(PHONE).is_some());
}

#[tokio::test]
async fn webhook_interactive_reply_advances_flow() {
    let (state, sent) = test_state();
    conversation::handle_message(&state, PHONE, "randevu", None)
        .await
        .unwrap();

    let app = test_app(Arc::clone(&state));
    let payload = serde_json::json!({
        "entry": [{
            "changes": [{
                "value": {
                    "messages": [{
                        "from": PHONE,
                        "type": "interactive",
                        "interactive": {
                            "type": "list_reply",
                            "list_reply": { "id": "date_2025-06-10", "title": "Salı" }
                        }
                    }]
                }
            }]
        }]
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/whatsapp")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(matches!(last_sent(&sent), Sent::List { .. }));
    assert_eq!(
        state.conversations.get(PHONE).unwrap().step,
        ConversationStep::AwaitingTime
    );
}

// ── Admin API ──

#[tokio::test]
async fn admin_requires_token() {
    let (state, _sent) = test_state();
    let app = test_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/appointments?date=2025-06-10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_create_then_conflict() {
    let (state, _sent) = test_state();
    let app = test_app(state);

    let body = serde_json::json!({
        "phone_number": PHONE,
        "customer_name": "Ali",
        "worker_id": 1,
        "date": "2025-06-10",
        "time": "10:00",
        "service_type": "Kesim"
    });

    let make_request = || {
        Request::builder()
            .method("POST")
            .uri("/api/admin/appointments")
            .header("authorization", "Bearer test-token")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let first = app.clone().oneshot(make_request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(make_request()).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn admin_status_update_validates_value() {
    let (state, _sent) = test_state();

    let appointment_id = {
        let db = state.db.lock().unwrap();
        let customer = queries::get_or_create_customer(&db, PHONE, None).unwrap();
        match booking::create_appointment(
            &db,
            customer.id,
            1,
            date("2025-06-10"),
            time("10:00"),
            60,
            None,
            dt(NOW),
        )
        .unwrap()
        {
            CreateResult::Booked(a) => a.id,
            other => panic!("expected Booked, got {other:?}"),
        }
    };

    let app = test_app(Arc::clone(&state));

    let bad = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/admin/appointments/{appointment_id}/status"))
                .header("authorization", "Bearer test-token")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"status":"done"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let ok = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/admin/appointments/{appointment_id}/status"))
                .header("authorization", "Bearer test-token")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"status":"completed"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let db = state.db.lock().unwrap();
    let appointment = queries::get_appointment(&db, appointment_id).unwrap().unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn admin_worker_slots_excludes_booked() {
    let (state, _sent) = test_state();

    {
        let db = state.db.lock().unwrap();
        let customer = queries::get_or_create_customer(&db, PHONE, None).unwrap();
        let result = booking::create_appointment(
            &db,
            customer.id,
            1,
            date("2025-06-10"),
            time("11:00"),
            60,
            None,
            dt(NOW),
        )
        .unwrap();
        assert!(matches!(result, CreateResult::Booked(_)));
    }

    let app = test_app(state);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/workers/1/slots?date=2025-06-10")
                .header("authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let slots: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert_eq!(slots, vec!["10:00", "12:00"]);
}

#[tokio::test]
async fn admin_rejects_zero_duration() {
    let (state, _sent) = test_state();
    let app = test_app(state);

    let body = serde_json::json!({
        "phone_number": PHONE,
        "worker_id": 1,
        "date": "2025-06-10",
        "time": "10:00",
        "duration_minutes": 0
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/appointments")
                .header("authorization", "Bearer test-token")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn admin_notes_inline_update() {
    let (state, _sent) = test_state();

    let appointment_id = {
        let db = state.db.lock().unwrap();
        let customer = queries::get_or_create_customer(&db, PHONE, None).unwrap();
        match booking::create_appointment(
            &db,
            customer.id,
            1,
            date("2025-06-10"),
            time("10:00"),
            60,
            None,
            dt(NOW),
        )
        .unwrap()
        {
            CreateResult::Booked(a) => a.id,
            other => panic!("expected Booked, got {other:?}"),
        }
    };

    let app = test_app(Arc::clone(&state));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/admin/appointments/{appointment_id}/notes"))
                .header("authorization", "Bearer test-token")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"notes":"Sarı boya istiyor"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let db = state.db.lock().unwrap();
    let appointment = queries::get_appointment(&db, appointment_id).unwrap().unwrap();
    assert_eq!(appointment.notes.as_deref(), Some("Sarı boya istiyor"));
    // Everything else stays put.
    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.time, time("10:00"));
}

#[tokio::test]
async fn admin_worker_edit_updates_name_and_schedule() {
    let (state, _sent) = test_state();
    let app = test_app(Arc::clone(&state));

    let body = serde_json::json!({
        "name": "Ayşe Yılmaz",
        "specialty": "Boya",
        "schedules": [
            { "day_of_week": 2, "start_time": "09:00", "end_time": "12:00" }
        ]
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/admin/workers/1")
                .header("authorization", "Bearer test-token")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let db = state.db.lock().unwrap();
    let worker = queries::get_worker(&db, 1).unwrap().unwrap();
    assert_eq!(worker.name, "Ayşe Yılmaz");
    assert_eq!(worker.specialty.as_deref(), Some("Boya"));

    let schedules = queries::get_schedules(&db, 1).unwrap();
    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0].start_time, time("09:00"));
    assert_eq!(schedules[0].end_time, time("12:00"));
}

#[tokio::test]
async fn admin_worker_delete_blocked_by_appointments() {
    let (state, _sent) = test_state();

    {
        let db = state.db.lock().unwrap();
        let customer = queries::get_or_create_customer(&db, PHONE, None).unwrap();
        let result = booking::create_appointment(
            &db,
            customer.id,
            1,
            date("2025-06-10"),
            time("10:00"),
            60,
            None,
            dt(NOW),
        )
        .unwrap();
        assert!(matches!(result, CreateResult::Booked(_)));
    }

    let app = test_app(Arc::clone(&state));

    let delete_worker = |id: i64| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/admin/workers/{id}"))
            .header("authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap()
    };

    let blocked = app.clone().oneshot(delete_worker(1)).await.unwrap();
    assert_eq!(blocked.status(), StatusCode::CONFLICT);

    // A worker with no appointments can be removed along with her schedules.
    let spare_id = {
        let db = state.db.lock().unwrap();
        let id = queries::create_worker(&db, "Zeynep", None).unwrap();
        queries::upsert_schedule(&db, id, 3, time("10:00"), time("14:00"), true).unwrap();
        id
    };

    let removed = app.oneshot(delete_worker(spare_id)).await.unwrap();
    assert_eq!(removed.status(), StatusCode::OK);

    let db = state.db.lock().unwrap();
    assert!(queries::get_worker(&db, spare_id).unwrap().is_none());
    assert!(queries::get_schedules(&db, spare_id).unwrap().is_empty());
}
