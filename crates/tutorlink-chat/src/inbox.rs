use tutorlink_types::api::Identity;
use tutorlink_types::models::{ConversationSummary, SenderType};

use crate::ChatService;
use crate::convert;
use crate::error::ChatError;

impl ChatService {
    /// The caller's conversations, most recently active first, each with
    /// its latest message and an unread count. Pure read; idempotent.
    ///
    /// `role` selects which side of the relationship to list: the same
    /// user may hold client conversations and tutor conversations.
    ///
    /// The unread count is the number of messages authored by the other
    /// party. No read-state is persisted, so it never decreases — a
    /// coarse badge indicator, not a precise tracker.
    pub fn inbox(
        &self,
        identity: &Identity,
        role: SenderType,
    ) -> Result<Vec<ConversationSummary>, ChatError> {
        let uid = identity.id.to_string();
        let rows = match role {
            SenderType::Client => self.db.list_conversations_for_client(&uid)?,
            SenderType::Tutor => self.db.list_conversations_for_tutor(&uid)?,
        };

        Ok(rows.into_iter().map(convert::summary).collect())
    }
}
