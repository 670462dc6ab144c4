use crate::auth::Subject;
use crate::models::Event;

/// Public events are readable by everyone. Private events only by their
/// organizer and invited users.
pub fn can_view(subject: &Subject, event: &Event) -> bool {
    if event.is_public {
        return true;
    }
    match subject.user_id() {
        None => false,
        Some(user_id) => event.is_organized_by(user_id) || event.is_invited(user_id),
    }
}
