use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    models::MessageModel,
    repository::MessageRepository,
    types::{ConversationSummary, Counterpart, SendMessageRequest},
};
use crate::booking::repository::BookingRepository;
use crate::notification::{notify, templates, EmailSender};
use crate::shared::AppError;
use crate::user::repository::UserRepository;

const MAX_CONTENT_CHARS: usize = 2000;

/// Service for direct messages between users
pub struct MessageService {
    repository: Arc<dyn MessageRepository + Send + Sync>,
    user_repository: Arc<dyn UserRepository + Send + Sync>,
    booking_repository: Arc<dyn BookingRepository + Send + Sync>,
    email_sender: Arc<dyn EmailSender>,
    base_url: String,
}

impl MessageService {
    pub fn new(
        repository: Arc<dyn MessageRepository + Send + Sync>,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        booking_repository: Arc<dyn BookingRepository + Send + Sync>,
        email_sender: Arc<dyn EmailSender>,
        base_url: String,
    ) -> Self {
        Self {
            repository,
            user_repository,
            booking_repository,
            email_sender,
            base_url,
        }
    }

    #[instrument(skip(self, request), fields(receiver_id = %request.receiver_id))]
    pub async fn send(
        &self,
        sender_id: &str,
        request: SendMessageRequest,
    ) -> Result<MessageModel, AppError> {
        if request.receiver_id == sender_id {
            return Err(AppError::BadRequest(
                "自分自身にメッセージは送信できません".to_string(),
            ));
        }

        let content = request.content.trim();
        if content.is_empty() || content.chars().count() > MAX_CONTENT_CHARS {
            return Err(AppError::BadRequest(format!(
                "メッセージは1〜{MAX_CONTENT_CHARS}文字で入力してください"
            )));
        }

        let sender = self
            .user_repository
            .get_user(sender_id)
            .await?
            .ok_or_else(AppError::unauthenticated)?;
        let receiver = self
            .user_repository
            .get_user(&request.receiver_id)
            .await?
            .ok_or_else(|| AppError::NotFound("送信先のユーザーが見つかりません".to_string()))?;

        if let Some(booking_id) = &request.booking_id {
            let booking = self
                .booking_repository
                .get_booking(booking_id)
                .await?
                .ok_or_else(|| AppError::NotFound("予約が見つかりません".to_string()))?;
            if !booking.involves_pair(sender_id, &receiver.id) {
                warn!(booking_id = %booking_id, "Message references a booking between other users");
                return Err(AppError::Forbidden(
                    "この予約に関するメッセージは送信できません".to_string(),
                ));
            }
        }

        let mut message = MessageModel::new(sender_id, &receiver.id, content.to_string());
        message.booking_id = request.booking_id;
        self.repository.create_message(&message).await?;
        info!(message_id = %message.id, sender_id = %sender_id, "Message sent");

        notify(
            self.email_sender.as_ref(),
            templates::new_message(
                &receiver.email,
                &receiver.name,
                &sender.name,
                &message.content,
                &self.base_url,
            ),
        )
        .await;

        Ok(message)
    }

    /// One entry per counterpart, newest conversation first
    #[instrument(skip(self))]
    pub async fn conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>, AppError> {
        let latest = self.repository.latest_per_counterpart(user_id).await?;
        let unread = self.repository.unread_by_sender(user_id).await?;

        let mut summaries = Vec::with_capacity(latest.len());
        for last_message in latest {
            let counterpart_id = last_message.counterpart(user_id).to_string();
            let Some(user) = self.user_repository.get_user(&counterpart_id).await? else {
                debug!(counterpart_id = %counterpart_id, "Skipping conversation with deleted user");
                continue;
            };
            summaries.push(ConversationSummary {
                unread_count: unread.get(&counterpart_id).copied().unwrap_or(0),
                user: Counterpart {
                    id: user.id,
                    name: user.name,
                    image: user.image,
                },
                last_message,
            });
        }
        Ok(summaries)
    }

    /// The thread with `other_id`, oldest first. Marks what they sent as read.
    #[instrument(skip(self))]
    pub async fn thread(&self, user_id: &str, other_id: &str) -> Result<Vec<MessageModel>, AppError> {
        let marked = self.repository.mark_read(user_id, other_id).await?;
        if marked > 0 {
            debug!(user_id = %user_id, other_id = %other_id, marked, "Marked messages as read");
        }
        self.repository.list_thread(user_id, other_id).await
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<i64, AppError> {
        self.repository.count_unread(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{models::BookingModel, repository::InMemoryBookingRepository};
    use crate::message::repository::InMemoryMessageRepository;
    use crate::notification::RecordingEmailSender;
    use crate::user::{models::UserModel, repository::InMemoryUserRepository};
    use chrono::NaiveDate;

    struct Fixture {
        service: MessageService,
        emails: Arc<RecordingEmailSender>,
        bookings: Arc<InMemoryBookingRepository>,
        alice: UserModel,
        bob: UserModel,
    }

    fn fixture() -> Fixture {
        let alice = UserModel::new("alice@example.jp", "アリス".to_string(), &[]);
        let bob = UserModel::new("bob@example.jp", "ボブ".to_string(), &[]);
        let emails = Arc::new(RecordingEmailSender::new());
        let bookings = Arc::new(InMemoryBookingRepository::new());
        let service = MessageService::new(
            Arc::new(InMemoryMessageRepository::new()),
            Arc::new(InMemoryUserRepository::with_users(vec![
                alice.clone(),
                bob.clone(),
            ])),
            bookings.clone(),
            emails.clone(),
            "http://localhost:3000".to_string(),
        );
        Fixture {
            service,
            emails,
            bookings,
            alice,
            bob,
        }
    }

    fn request(to: &str, content: &str) -> SendMessageRequest {
        SendMessageRequest {
            receiver_id: to.to_string(),
            content: content.to_string(),
            booking_id: None,
        }
    }

    #[tokio::test]
    async fn test_send_trims_and_notifies() {
        let f = fixture();
        let message = f
            .service
            .send(&f.alice.id, request(&f.bob.id, "  こんにちは  "))
            .await
            .unwrap();

        assert_eq!(message.content, "こんにちは");
        assert_eq!(f.emails.sent_to("bob@example.jp").len(), 1);
    }

    #[tokio::test]
    async fn test_send_validation() {
        let f = fixture();
        assert!(matches!(
            f.service.send(&f.alice.id, request(&f.alice.id, "hi")).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            f.service.send(&f.alice.id, request(&f.bob.id, "   ")).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            f.service
                .send(&f.alice.id, request(&f.bob.id, &"あ".repeat(2001)))
                .await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            f.service.send(&f.alice.id, request("ghost", "hi")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_booking_must_involve_both_users() {
        let f = fixture();
        let date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let theirs = BookingModel::new("s", &f.alice.id, "carol", date);
        let ours = BookingModel::new("s2", &f.alice.id, &f.bob.id, date);
        f.bookings.create_booking(&theirs).await.unwrap();
        f.bookings.create_booking(&ours).await.unwrap();

        let mut req = request(&f.bob.id, "予約の件");
        req.booking_id = Some(theirs.id.clone());
        assert!(matches!(
            f.service.send(&f.alice.id, req).await,
            Err(AppError::Forbidden(_))
        ));

        let mut req = request(&f.alice.id, "予約の件");
        req.booking_id = Some(ours.id.clone());
        let sent = f.service.send(&f.bob.id, req).await.unwrap();
        assert_eq!(sent.booking_id.as_deref(), Some(ours.id.as_str()));
    }

    #[tokio::test]
    async fn test_reading_thread_clears_unread() {
        let f = fixture();
        f.service
            .send(&f.alice.id, request(&f.bob.id, "1"))
            .await
            .unwrap();
        f.service
            .send(&f.alice.id, request(&f.bob.id, "2"))
            .await
            .unwrap();

        assert_eq!(f.service.unread_count(&f.bob.id).await.unwrap(), 2);
        let conversations = f.service.conversations(&f.bob.id).await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].user.id, f.alice.id);
        assert_eq!(conversations[0].unread_count, 2);

        let thread = f.service.thread(&f.bob.id, &f.alice.id).await.unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(f.service.unread_count(&f.bob.id).await.unwrap(), 0);
        // The sender's own view is unaffected
        assert_eq!(f.service.unread_count(&f.alice.id).await.unwrap(), 0);
    }
}
