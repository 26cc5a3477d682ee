use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::notifications::repo::NotificationRow;
use crate::users::dto::UserSummary;

#[derive(Debug, Serialize)]
pub struct NotificationPost {
    pub id: Uuid,
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub kind: String,
    pub is_read: bool,
    pub actor: UserSummary,
    /// Present only for like/comment notifications whose post still exists.
    pub post: Option<NotificationPost>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<NotificationRow> for NotificationResponse {
    fn from(n: NotificationRow) -> Self {
        let post = match (n.post_id, n.post_image_url) {
            (Some(id), Some(image_url)) => Some(NotificationPost { id, image_url }),
            _ => None,
        };
        Self {
            id: n.id,
            kind: n.kind,
            is_read: n.is_read,
            actor: UserSummary {
                id: n.actor_id,
                username: n.actor_username,
                avatar_url: n.actor_avatar_url,
            },
            post,
            created_at: n.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(post: Option<(Uuid, &str)>) -> NotificationRow {
        NotificationRow {
            id: Uuid::new_v4(),
            kind: "like".into(),
            is_read: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
            actor_id: Uuid::new_v4(),
            actor_username: "bob".into(),
            actor_avatar_url: None,
            post_id: post.map(|(id, _)| id),
            post_image_url: post.map(|(_, url)| url.to_string()),
        }
    }

    #[test]
    fn resolves_post_reference_when_alive() {
        let post_id = Uuid::new_v4();
        let resp = NotificationResponse::from(row(Some((post_id, "https://img/p.jpg"))));
        let post = resp.post.expect("post reference");
        assert_eq!(post.id, post_id);
        assert_eq!(post.image_url, "https://img/p.jpg");
    }

    #[test]
    fn read_notification_keeps_its_full_shape() {
        let mut n = row(None);
        n.kind = "follow".into();
        n.is_read = true;
        let json = serde_json::to_value(NotificationResponse::from(n)).expect("serialize");
        assert_eq!(json["is_read"], true);
        assert_eq!(json["kind"], "follow");
        assert_eq!(json["actor"]["username"], "bob");
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn deleted_post_leaves_no_reference() {
        let resp = NotificationResponse::from(row(None));
        assert!(resp.post.is_none());
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["post"], serde_json::Value::Null);
        assert_eq!(json["kind"], "like");
        assert_eq!(json["is_read"], false);
    }
}
