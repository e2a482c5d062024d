use uuid::Uuid;

use tutorlink_types::api::Identity;
use tutorlink_types::models::{Conversation, TutorProfile};

use crate::ChatService;
use crate::convert;
use crate::error::ChatError;

impl ChatService {
    /// Find or create the single conversation between the requesting
    /// client and a tutor. Idempotent: an existing pair row is returned
    /// unchanged, with no side effects.
    ///
    /// Display fields on a new row are a snapshot of the profiles at
    /// creation time; later renames do not propagate.
    pub fn resolve(&self, identity: &Identity, tutor_id: Uuid) -> Result<Conversation, ChatError> {
        let tutor = self
            .db
            .get_tutor(&tutor_id.to_string())?
            .ok_or(ChatError::CounterpartyNotFound)?;

        let row = self.db.resolve_conversation(
            &Uuid::new_v4().to_string(),
            &identity.id.to_string(),
            &tutor.id,
            &identity.display_name,
            &identity.email,
            &tutor.display_name,
        )?;

        Ok(convert::conversation(row))
    }

    /// Put the caller into the tutor directory. Stands in for the
    /// external tutor-profile collaborator; only existence and display
    /// name matter to the resolver.
    pub fn register_tutor(
        &self,
        identity: &Identity,
        display_name: &str,
    ) -> Result<TutorProfile, ChatError> {
        let display_name = display_name.trim();
        // Blank submissions fall back to the identity's own name.
        let display_name = if display_name.is_empty() {
            identity.display_name.as_str()
        } else {
            display_name
        };

        self.db
            .upsert_tutor(&identity.id.to_string(), display_name, &identity.email)?;

        Ok(TutorProfile {
            id: identity.id,
            display_name: display_name.to_string(),
            email: identity.email.clone(),
        })
    }
}
