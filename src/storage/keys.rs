//! Blob key namespaces
//!
//! `users/profile-images/*`, `projects/cover-images/*`,
//! `projects/{projectId}/files/*` and `attachments/{projectId}/*`.

use chrono::{DateTime, Utc};

fn file_part(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect::<String>()
        .replace("..", "_")
}

pub fn profile_image(user_id: &str, name: &str, at: DateTime<Utc>) -> String {
    format!(
        "users/profile-images/{}_{}_{}",
        file_part(user_id),
        at.timestamp_millis(),
        file_part(name)
    )
}

pub fn cover_image(project_id: &str, name: &str, at: DateTime<Utc>) -> String {
    format!(
        "projects/cover-images/{}_{}_{}",
        file_part(project_id),
        at.timestamp_millis(),
        file_part(name)
    )
}

pub fn project_file(project_id: &str, name: &str, at: DateTime<Utc>) -> String {
    format!(
        "projects/{}/files/{}_{}",
        file_part(project_id),
        at.timestamp_millis(),
        file_part(name)
    )
}

pub fn attachment(project_id: &str, name: &str, at: DateTime<Utc>) -> String {
    format!(
        "attachments/{}/{}_{}",
        file_part(project_id),
        at.timestamp_millis(),
        file_part(name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::validate_key;
    use chrono::TimeZone;

    #[test]
    fn keys_live_in_their_namespace() {
        let at = Utc.timestamp_millis_opt(7).unwrap();
        assert_eq!(project_file("p1", "a.txt", at), "projects/p1/files/7_a.txt");
        assert_eq!(attachment("p1", "b.png", at), "attachments/p1/7_b.png");
        assert_eq!(profile_image("u1", "me.jpg", at), "users/profile-images/u1_7_me.jpg");
        assert_eq!(cover_image("p1", "c.gif", at), "projects/cover-images/p1_7_c.gif");
    }

    #[test]
    fn hostile_names_stay_inside() {
        let at = Utc.timestamp_millis_opt(7).unwrap();
        let key = project_file("p1", "../../etc/passwd", at);
        assert!(key.starts_with("projects/p1/files/"));
        assert!(validate_key(&key).is_ok());
    }
}
