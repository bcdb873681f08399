use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Datelike, Duration, NaiveDate};

use crate::db::queries;
use crate::models::{Command, ConversationState, ConversationStep, Customer, ReplyAction};
use crate::services::availability;
use crate::services::booking::{self, CreateResult};
use crate::services::messaging::{Button, ListItem};
use crate::state::AppState;

/// In-memory conversation store keyed by phone number. State is ephemeral:
/// it lives for the duration of a booking dialogue and is cleared when the
/// flow completes, is declined, or hits a dead end. `key_lock` hands out a
/// per-phone mutex so one customer's events are processed strictly in order
/// while different customers run in parallel.
#[derive(Default)]
pub struct ConversationStore {
    states: Mutex<HashMap<String, ConversationState>>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ConversationStore {
    pub fn get(&self, phone: &str) -> Option<ConversationState> {
        self.states.lock().unwrap().get(phone).cloned()
    }

    pub fn set(&self, state: ConversationState) {
        self.states
            .lock()
            .unwrap()
            .insert(state.phone_number.clone(), state);
    }

    pub fn clear(&self, phone: &str) {
        self.states.lock().unwrap().remove(phone);
    }

    pub fn key_lock(&self, phone: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .unwrap()
            .entry(phone.to_string())
            .or_default()
            .clone()
    }
}

/// Inbound free-text message.
pub async fn handle_message(
    state: &Arc<AppState>,
    from: &str,
    text: &str,
    sender_name: Option<&str>,
) -> anyhow::Result<()> {
    let customer = {
        let db = state.db.lock().unwrap();
        queries::get_or_create_customer(&db, from, sender_name)?
    };

    tracing::info!(phone = from, text, "processing message");

    match Command::parse(text) {
        Some(Command::Book) => start_booking_flow(state, from).await,
        Some(Command::CancelFlow) => start_cancellation_flow(state, from, &customer).await,
        Some(Command::Help) => state.chat.send_text(from, HELP_MESSAGE).await,
        None => {
            if state.conversations.get(from).is_some() {
                // Mid-flow free text: guide, never drop the stored step.
                state.chat.send_text(from, GUIDANCE_MESSAGE).await
            } else {
                state.chat.send_text(from, WELCOME_MESSAGE).await
            }
        }
    }
}

/// Inbound interactive reply (list or button selection).
pub async fn handle_reply(state: &Arc<AppState>, from: &str, reply_id: &str) -> anyhow::Result<()> {
    let customer = {
        let db = state.db.lock().unwrap();
        queries::get_or_create_customer(&db, from, None)?
    };

    tracing::info!(phone = from, reply_id, "processing interactive reply");

    let Some(action) = ReplyAction::parse(reply_id) else {
        return state.chat.send_text(from, INVALID_SELECTION_MESSAGE).await;
    };

    // Cancellation works from any state and leaves the booking sub-flow alone.
    if let ReplyAction::CancelAppointment(appointment_id) = action {
        return cancel_selected_appointment(state, from, &customer, appointment_id).await;
    }

    let Some(conversation) = state.conversations.get(from) else {
        return state.chat.send_text(from, WELCOME_MESSAGE).await;
    };

    match (conversation.step, action) {
        (ConversationStep::AwaitingDate, ReplyAction::SelectDate(date)) => {
            handle_date_selection(state, from, conversation, date).await
        }
        (ConversationStep::AwaitingTime, ReplyAction::SelectTime(time)) => {
            let mut conversation = conversation;
            conversation.selected_time = Some(time);
            conversation.step = ConversationStep::ConfirmingAppointment;

            let date_text = conversation
                .selected_date
                .map(format_turkish_date)
                .unwrap_or_default();
            state.conversations.set(conversation);

            let body = format!(
                "✅ Randevu Onayı\n\n📅 Tarih: {date_text}\n🕐 Saat: {}\n\nRandevunuzu onaylıyor musunuz?",
                time.format("%H:%M")
            );
            state
                .chat
                .send_buttons(
                    from,
                    &body,
                    &[
                        Button {
                            id: "confirm_yes".to_string(),
                            title: "✅ Evet, Onayla".to_string(),
                        },
                        Button {
                            id: "confirm_no".to_string(),
                            title: "❌ Hayır, İptal".to_string(),
                        },
                    ],
                )
                .await
        }
        (ConversationStep::ConfirmingAppointment, ReplyAction::ConfirmYes) => {
            confirm_appointment(state, from, conversation, &customer).await
        }
        (ConversationStep::ConfirmingAppointment, ReplyAction::ConfirmNo) => {
            state.conversations.clear(from);
            state
                .chat
                .send_text(
                    from,
                    "Randevu oluşturma iptal edildi. Yeni randevu için /randevu yazabilirsiniz.",
                )
                .await
        }
        // Reply does not fit the current step: re-prompt, state unchanged.
        (step, _) => {
            tracing::debug!(phone = from, reply_id, step = step.as_str(), "reply does not match step");
            state.chat.send_text(from, GUIDANCE_MESSAGE).await
        }
    }
}

async fn start_booking_flow(state: &Arc<AppState>, from: &str) -> anyhow::Result<()> {
    let worker = {
        let db = state.db.lock().unwrap();
        queries::first_active_worker(&db)?
    };

    let Some(worker) = worker else {
        tracing::warn!("booking requested but no active worker configured");
        return state
            .chat
            .send_text(from, "❌ Şu anda randevu alınamıyor. Lütfen daha sonra tekrar deneyin.")
            .await;
    };

    let today = state.clock.now().date();
    let dates: Vec<ListItem> = (0..7)
        .map(|i| {
            let date = today + Duration::days(i);
            ListItem {
                id: format!("date_{}", date.format("%Y-%m-%d")),
                title: turkish_weekday(date).to_string(),
                description: Some(format_turkish_date(date)),
            }
        })
        .collect();

    state
        .conversations
        .set(ConversationState::new(from, worker.id));

    state
        .chat
        .send_list(
            from,
            "📅 Lütfen randevu için bir tarih seçin:",
            "Tarih Seç",
            &dates,
        )
        .await
}

async fn handle_date_selection(
    state: &Arc<AppState>,
    from: &str,
    mut conversation: ConversationState,
    date: NaiveDate,
) -> anyhow::Result<()> {
    let slots = {
        let db = state.db.lock().unwrap();
        availability::available_slots(&db, conversation.worker_id, date, state.clock.now())?
    };

    if slots.is_empty() {
        state.conversations.clear(from);
        return state
            .chat
            .send_text(
                from,
                "❌ Bu tarih için müsait saat yok. Lütfen başka bir tarih seçin. /randevu",
            )
            .await;
    }

    conversation.selected_date = Some(date);
    conversation.step = ConversationStep::AwaitingTime;
    state.conversations.set(conversation);

    let items: Vec<ListItem> = slots
        .iter()
        .take(10)
        .map(|time| ListItem {
            id: format!("time_{}", time.format("%H:%M")),
            title: time.format("%H:%M").to_string(),
            description: None,
        })
        .collect();

    let body = format!(
        "🕐 {} için müsait saatler:\n\nLütfen bir saat seçin:",
        format_turkish_date(date)
    );
    state.chat.send_list(from, &body, "Saat Seç", &items).await
}

async fn confirm_appointment(
    state: &Arc<AppState>,
    from: &str,
    conversation: ConversationState,
    customer: &Customer,
) -> anyhow::Result<()> {
    let (Some(date), Some(time)) = (conversation.selected_date, conversation.selected_time) else {
        state.conversations.clear(from);
        return state
            .chat
            .send_text(from, "❌ Bir hata oluştu. Lütfen tekrar deneyin. /randevu")
            .await;
    };

    let result = {
        let db = state.db.lock().unwrap();
        let duration = queries::slot_duration_minutes(&db);
        booking::create_appointment(
            &db,
            customer.id,
            conversation.worker_id,
            date,
            time,
            duration,
            conversation.service_type.as_deref(),
            state.clock.now(),
        )?
    };

    state.conversations.clear(from);

    match result {
        CreateResult::Booked(appointment) => {
            let body = format!(
                "✅ Randevunuz Oluşturuldu!\n\n📅 Tarih: {}\n🕐 Saat: {}\n📝 Randevu No: {}\n\nRandevunuzu iptal etmek için: /iptal\n\nGörüşmek üzere! 👋",
                format_turkish_date(date),
                time.format("%H:%M"),
                appointment.id
            );
            state.chat.send_text(from, &body).await
        }
        CreateResult::SlotTaken | CreateResult::InPast => {
            state
                .chat
                .send_text(
                    from,
                    "❌ Bu saat artık müsait değil. Lütfen başka bir saat seçin. /randevu",
                )
                .await
        }
    }
}

async fn start_cancellation_flow(
    state: &Arc<AppState>,
    from: &str,
    customer: &Customer,
) -> anyhow::Result<()> {
    let appointments = {
        let db = state.db.lock().unwrap();
        queries::appointments_for_customer(&db, customer.id)?
    };

    if appointments.is_empty() {
        return state
            .chat
            .send_text(from, "❌ Aktif randevunuz bulunmamaktadır.")
            .await;
    }

    let items: Vec<ListItem> = appointments
        .iter()
        .map(|a| ListItem {
            id: format!("cancel_{}", a.id),
            title: format!("{} {}", a.date.format("%d/%m/%Y"), a.time.format("%H:%M")),
            description: Some(format!("Randevu No: {}", a.id)),
        })
        .collect();

    state
        .chat
        .send_list(
            from,
            "❌ İptal etmek istediğiniz randevuyu seçin:",
            "Randevu Seç",
            &items,
        )
        .await
}

async fn cancel_selected_appointment(
    state: &Arc<AppState>,
    from: &str,
    customer: &Customer,
    appointment_id: i64,
) -> anyhow::Result<()> {
    let cancelled = {
        let db = state.db.lock().unwrap();
        booking::cancel_appointment(&db, customer.id, appointment_id)?
    };

    if cancelled {
        let body = format!("✅ Randevunuz (No: {appointment_id}) başarıyla iptal edildi.");
        state.chat.send_text(from, &body).await
    } else {
        state
            .chat
            .send_text(from, "❌ Randevu iptal edilemedi. Lütfen daha sonra tekrar deneyin.")
            .await
    }
}

const WELCOME_MESSAGE: &str = "👋 Hoş geldiniz! Kuaför randevu sistemine hoş geldiniz.\n\n📅 Randevu almak için: /randevu\n❌ Randevuyu iptal etmek için: /iptal\n❓ Yardım için: /yardim";

const HELP_MESSAGE: &str = "ℹ️ Yardım Menüsü\n\nKullanılabilir Komutlar:\n📅 /randevu - Yeni randevu oluştur\n❌ /iptal - Mevcut randevuyu iptal et\n❓ /yardim - Bu yardım mesajını göster\n\nNasıl Çalışır:\n1. /randevu yazın\n2. Müsait tarihleri görün\n3. Tarih seçin\n4. Müsait saatleri görün\n5. Saat seçin\n6. Randevunuzu onaylayın";

const GUIDANCE_MESSAGE: &str =
    "Lütfen yukarıdaki seçeneklerden birini seçin veya /randevu yazarak yeni bir randevu oluşturun.";

const INVALID_SELECTION_MESSAGE: &str = "❌ Geçersiz seçim. Lütfen tekrar deneyin.";

fn turkish_weekday(date: NaiveDate) -> &'static str {
    match date.weekday() {
        chrono::Weekday::Mon => "Pazartesi",
        chrono::Weekday::Tue => "Salı",
        chrono::Weekday::Wed => "Çarşamba",
        chrono::Weekday::Thu => "Perşembe",
        chrono::Weekday::Fri => "Cuma",
        chrono::Weekday::Sat => "Cumartesi",
        chrono::Weekday::Sun => "Pazar",
    }
}

fn format_turkish_date(date: NaiveDate) -> String {
    const MONTHS: [&str; 12] = [
        "Ocak", "Şubat", "Mart", "Nisan", "Mayıs", "Haziran", "Temmuz", "Ağustos", "Eylül",
        "Ekim", "Kasım", "Aralık",
    ];
    format!(
        "{:02} {} {}",
        date.day(),
        MONTHS[date.month0() as usize],
        date.year()
    )
}
