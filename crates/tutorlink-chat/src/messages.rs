use anyhow::anyhow;
use tracing::warn;
use uuid::Uuid;

use tutorlink_db::models::ConversationRow;
use tutorlink_gateway::{ConversationSubscription, SubscriptionPolicy};
use tutorlink_types::api::Identity;
use tutorlink_types::events::ChatEvent;
use tutorlink_types::models::{Message, SenderType};

use crate::ChatService;
use crate::convert;
use crate::error::ChatError;

impl ChatService {
    /// Append one message to a conversation's transcript.
    ///
    /// The sender role is derived from the caller's membership in the
    /// conversation, never taken from the request. On success the parent
    /// conversation's `updated_at` is bumped for inbox ordering — that
    /// bump is best-effort and never rolls back the message write — and a
    /// `MessageCreate` event goes out on the live update channel.
    pub fn append(
        &self,
        identity: &Identity,
        conversation_id: Uuid,
        content: &str,
    ) -> Result<Message, ChatError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyContent);
        }

        let conversation = self
            .db
            .get_conversation(&conversation_id.to_string())?
            .ok_or(ChatError::ConversationNotFound)?;

        let sender_type = sender_role(&conversation, identity.id)?;

        // Insert and publish under one lock so events reach subscribers in
        // the same order the transcript records.
        let _order = self
            .append_lock
            .lock()
            .map_err(|e| ChatError::StoreUnavailable(anyhow!("append lock poisoned: {e}")))?;

        let row = self.db.insert_message(
            &Uuid::new_v4().to_string(),
            &conversation.id,
            sender_type.as_str(),
            content,
        )?;

        if let Err(e) = self.db.touch_conversation(&conversation.id) {
            warn!(
                "Failed to bump updated_at on conversation {}: {} (message {} stands)",
                conversation.id, e, row.id
            );
        }

        let message = convert::message(row);

        self.dispatcher.publish(ChatEvent::MessageCreate {
            id: message.id,
            conversation_id: message.conversation_id,
            client_id: convert::parse_uuid(&conversation.client_id, "client_id"),
            tutor_id: convert::parse_uuid(&conversation.tutor_id, "tutor_id"),
            sender_type: message.sender_type,
            content: message.content.clone(),
            created_at: message.created_at,
        });

        Ok(message)
    }

    /// Full transcript in append order. A fresh read each call; an empty
    /// conversation yields an empty vec. Participants only.
    pub fn list(&self, identity: &Identity, conversation_id: Uuid) -> Result<Vec<Message>, ChatError> {
        let conversation = self
            .db
            .get_conversation(&conversation_id.to_string())?
            .ok_or(ChatError::ConversationNotFound)?;

        sender_role(&conversation, identity.id)?;

        let rows = self.db.list_messages(&conversation.id)?;
        Ok(rows.into_iter().map(convert::message).collect())
    }

    /// Open a live view onto a conversation. Participants only. The
    /// returned handle delivers each subsequent append exactly once, in
    /// order, and unsubscribes when dropped.
    pub fn subscribe(
        &self,
        identity: &Identity,
        conversation_id: Uuid,
    ) -> Result<ConversationSubscription, ChatError> {
        let conversation = self
            .db
            .get_conversation(&conversation_id.to_string())?
            .ok_or(ChatError::ConversationNotFound)?;

        sender_role(&conversation, identity.id)?;

        Ok(self.dispatcher.subscribe(conversation_id))
    }
}

/// Membership check the gateway consults before honoring a Subscribe
/// command. Store failures deny rather than fail open.
impl SubscriptionPolicy for ChatService {
    fn can_subscribe(&self, user_id: Uuid, conversation_id: Uuid) -> bool {
        match self.db.get_conversation(&conversation_id.to_string()) {
            Ok(Some(conversation)) => sender_role(&conversation, user_id).is_ok(),
            Ok(None) => false,
            Err(e) => {
                warn!(
                    "membership check for conversation {} failed, denying: {}",
                    conversation_id, e
                );
                false
            }
        }
    }
}

/// Which side of the conversation this user is, or `UnauthorizedSender`
/// for a non-participant.
fn sender_role(conversation: &ConversationRow, user_id: Uuid) -> Result<SenderType, ChatError> {
    let uid = user_id.to_string();
    if conversation.client_id == uid {
        Ok(SenderType::Client)
    } else if conversation.tutor_id == uid {
        Ok(SenderType::Tutor)
    } else {
        Err(ChatError::UnauthorizedSender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use std::time::Duration;

    #[test]
    fn whitespace_only_content_is_rejected_before_writing() {
        let service = testutil::service();
        let client = testutil::identity("ada");
        let tutor = testutil::tutor(&service, "reyes");
        let conversation = service.resolve(&client, tutor.id).unwrap();

        let err = service.append(&client, conversation.id, "   \n\t").unwrap_err();
        assert!(matches!(err, ChatError::EmptyContent));

        assert!(service.list(&client, conversation.id).unwrap().is_empty());
    }

    #[test]
    fn transcript_preserves_append_order() {
        let service = testutil::service();
        let client = testutil::identity("ada");
        let tutor = testutil::tutor(&service, "reyes");
        let conversation = service.resolve(&client, tutor.id).unwrap();

        service.append(&client, conversation.id, "first").unwrap();
        service.append(&tutor, conversation.id, "second").unwrap();
        service.append(&client, conversation.id, "third").unwrap();

        let transcript = service.list(&client, conversation.id).unwrap();
        let contents: Vec<&str> = transcript.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);

        for pair in transcript.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
    }

    #[test]
    fn sender_role_is_derived_from_membership() {
        let service = testutil::service();
        let client = testutil::identity("ada");
        let tutor = testutil::tutor(&service, "reyes");
        let conversation = service.resolve(&client, tutor.id).unwrap();

        let from_client = service.append(&client, conversation.id, "hi").unwrap();
        assert_eq!(from_client.sender_type, SenderType::Client);

        let from_tutor = service.append(&tutor, conversation.id, "hello").unwrap();
        assert_eq!(from_tutor.sender_type, SenderType::Tutor);
    }

    #[test]
    fn non_participants_cannot_append_or_read() {
        let service = testutil::service();
        let client = testutil::identity("ada");
        let tutor = testutil::tutor(&service, "reyes");
        let stranger = testutil::identity("mallory");
        let conversation = service.resolve(&client, tutor.id).unwrap();

        let err = service.append(&stranger, conversation.id, "let me in").unwrap_err();
        assert!(matches!(err, ChatError::UnauthorizedSender));

        let err = service.list(&stranger, conversation.id).unwrap_err();
        assert!(matches!(err, ChatError::UnauthorizedSender));

        let err = service.subscribe(&stranger, conversation.id).unwrap_err();
        assert!(matches!(err, ChatError::UnauthorizedSender));
    }

    #[test]
    fn append_to_unknown_conversation_fails() {
        let service = testutil::service();
        let client = testutil::identity("ada");

        let err = service.append(&client, Uuid::new_v4(), "hello?").unwrap_err();
        assert!(matches!(err, ChatError::ConversationNotFound));
    }

    /// Full walkthrough: resolve → append → list → subscribe → append →
    /// the subscriber sees exactly one event for the new message.
    #[tokio::test]
    async fn subscriber_sees_each_append_exactly_once() {
        let service = testutil::service();
        let client = testutil::identity("ada");
        let tutor = testutil::tutor(&service, "reyes");

        let conversation = service.resolve(&client, tutor.id).unwrap();
        service.append(&client, conversation.id, "Hello").unwrap();

        let transcript = service.list(&tutor, conversation.id).unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].content, "Hello");
        assert_eq!(transcript[0].sender_type, SenderType::Client);

        // Tutor opens the conversation view before the next append.
        let mut subscription = service.subscribe(&tutor, conversation.id).unwrap();

        service.append(&client, conversation.id, "Are you there?").unwrap();

        let event = subscription.recv().await.unwrap();
        match event {
            ChatEvent::MessageCreate { conversation_id, content, sender_type, .. } => {
                assert_eq!(conversation_id, conversation.id);
                assert_eq!(content, "Are you there?");
                assert_eq!(sender_type, SenderType::Client);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // Exactly once: nothing further is pending.
        let pending = tokio::time::timeout(Duration::from_millis(50), subscription.recv()).await;
        assert!(pending.is_err());
    }

    #[test]
    fn gateway_policy_only_admits_participants() {
        let service = testutil::service();
        let client = testutil::identity("ada");
        let tutor = testutil::tutor(&service, "reyes");
        let stranger = testutil::identity("mallory");
        let conversation = service.resolve(&client, tutor.id).unwrap();

        assert!(service.can_subscribe(client.id, conversation.id));
        assert!(service.can_subscribe(tutor.id, conversation.id));
        assert!(!service.can_subscribe(stranger.id, conversation.id));
        assert!(!service.can_subscribe(client.id, Uuid::new_v4()));
    }

    /// Two writers race on the same conversation; the event stream must
    /// match the transcript order, not just contain the same messages.
    #[tokio::test]
    async fn concurrent_appends_are_delivered_in_insertion_order() {
        use std::sync::Arc;
        use std::thread;

        let service = Arc::new(testutil::service());
        let client = testutil::identity("ada");
        let tutor = testutil::tutor(&service, "reyes");
        let conversation = service.resolve(&client, tutor.id).unwrap();

        let mut subscription = service.subscribe(&tutor, conversation.id).unwrap();

        let writers: Vec<_> = [client.clone(), tutor.clone()]
            .into_iter()
            .map(|who| {
                let service = service.clone();
                let conversation_id = conversation.id;
                thread::spawn(move || {
                    for i in 0..10 {
                        service
                            .append(&who, conversation_id, &format!("{} {i}", who.display_name))
                            .unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let mut event_ids = Vec::new();
        for _ in 0..20 {
            match subscription.recv().await.unwrap() {
                ChatEvent::MessageCreate { id, .. } => event_ids.push(id),
                other => panic!("unexpected event: {other:?}"),
            }
        }

        let transcript_ids: Vec<_> = service
            .list(&client, conversation.id)
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(event_ids, transcript_ids);
    }
}
