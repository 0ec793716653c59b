use crate::{
    database::get_db,
    events::{self, ChangeEvent, ChangeKind},
};
use futures::stream::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime, Document},
    options::FindOptions,
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{admin::Admin, report::Report};

pub const FEED_LIMIT: usize = 20;
pub const FEED_REPORT_LIMIT: usize = 5;
pub const FEED_EXPIRY_MS: i64 = 24 * 60 * 60 * 1000;

fn admin_feed_filter() -> Document {
    doc! {
        "audience": { "$ne": "citizen" },
        "kind": { "$ne": "new_report" },
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewReport,
    AdminUpdate,
    WorkerUpdate,
    AdminAlert,
}
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAudience {
    Citizen,
    Admin,
    Team,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Notification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub audience: NotificationAudience,
    pub report_id: Option<ObjectId>,
    pub timestamp: DateTime,
    pub is_read: bool,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct NotificationResponse {
    pub _id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub audience: NotificationAudience,
    pub report_id: Option<String>,
    pub timestamp: i64,
    pub is_read: bool,
}
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct FeedItem {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: i64,
    pub report_id: Option<String>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct NotificationFeed {
    pub items: Vec<FeedItem>,
    pub unread: usize,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
        audience: NotificationAudience,
        report_id: Option<ObjectId>,
    ) -> Self {
        Notification {
            _id: None,
            title: title.into(),
            message: message.into(),
            kind,
            audience,
            report_id,
            timestamp: DateTime::now(),
            is_read: false,
        }
    }
    pub async fn save(&mut self) -> Result<ObjectId, String> {
        let db: Database = get_db()?;
        let collection: Collection<Notification> =
            db.collection::<Notification>("notifications");

        self._id = Some(ObjectId::new());

        let _id = collection
            .insert_one(&*self, None)
            .await
            .map_err(|_| "INSERTING_FAILED".to_string())?
            .inserted_id
            .as_object_id()
            .ok_or_else(|| "INSERTING_FAILED".to_string())?;

        events::publish(ChangeEvent::new(ChangeKind::Notification, &_id));
        Ok(_id)
    }
    pub async fn find_by_report(report_id: &ObjectId) -> Result<Vec<NotificationResponse>, String> {
        let notifications = Self::find(doc! { "report_id": report_id }, None).await?;
        Ok(notifications.iter().filter_map(Self::to_response).collect())
    }
    /// Latest notifications meant for the admin bell.
    pub async fn find_for_admins(limit: usize) -> Result<Vec<Notification>, String> {
        Self::find(admin_feed_filter(), Some(limit as i64)).await
    }
    /// Citizen-facing rows belong to the report timeline, and new reports
    /// reach the bell from the reports themselves.
    pub fn shows_in_admin_feed(&self) -> bool {
        self.audience != NotificationAudience::Citizen && self.kind != NotificationKind::NewReport
    }
    async fn find(
        filter: Document,
        limit: Option<i64>,
    ) -> Result<Vec<Notification>, String> {
        let db: Database = get_db()?;
        let collection: Collection<Notification> =
            db.collection::<Notification>("notifications");

        let options = FindOptions::builder()
            .sort(doc! { "timestamp": -1 })
            .limit(limit)
            .build();

        let mut notifications: Vec<Notification> = Vec::new();
        let mut cursor = collection
            .find(filter, options)
            .await
            .map_err(|_| "NOTIFICATION_NOT_FOUND".to_string())?;
        while let Some(Ok(notification)) = cursor.next().await {
            notifications.push(notification);
        }
        Ok(notifications)
    }
    pub async fn mark_read(_id: &ObjectId) -> Result<ObjectId, String> {
        let db: Database = get_db()?;
        let collection: Collection<Notification> =
            db.collection::<Notification>("notifications");

        let result = collection
            .update_one(doc! { "_id": _id }, doc! { "$set": { "is_read": true } }, None)
            .await
            .map_err(|_| "UPDATE_FAILED".to_string())?;
        if result.matched_count == 0 {
            return Err("NOTIFICATION_NOT_FOUND".to_string());
        }
        events::publish(ChangeEvent::new(ChangeKind::Notification, _id));
        Ok(*_id)
    }
    fn to_response(&self) -> Option<NotificationResponse> {
        Some(NotificationResponse {
            _id: self._id?.to_hex(),
            title: self.title.clone(),
            message: self.message.clone(),
            kind: self.kind.clone(),
            audience: self.audience.clone(),
            report_id: self.report_id.map(|_id| _id.to_hex()),
            timestamp: self.timestamp.timestamp_millis(),
            is_read: self.is_read,
        })
    }
    fn to_feed_item(&self) -> Option<FeedItem> {
        Some(FeedItem {
            id: self._id?.to_hex(),
            kind: self.kind.clone(),
            title: self.title.clone(),
            message: self.message.clone(),
            timestamp: self.timestamp.timestamp_millis(),
            report_id: self.report_id.map(|_id| _id.to_hex()),
        })
    }
}

impl NotificationFeed {
    /// Merges report arrivals with stored notifications for the admin bell.
    /// Items at or before `cleared_at` or older than a day are dropped.
    pub fn build(
        reports: Vec<FeedItem>,
        notifications: Vec<FeedItem>,
        cleared_at: Option<i64>,
        seen_at: Option<i64>,
        now: i64,
    ) -> Self {
        let cleared_at = cleared_at.unwrap_or(0);
        let expire_cutoff = now - FEED_EXPIRY_MS;

        let mut items: Vec<FeedItem> = reports.into_iter().chain(notifications).collect();
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        items.retain(|item| item.timestamp > cleared_at && item.timestamp > expire_cutoff);
        items.truncate(FEED_LIMIT);

        let seen_at = seen_at.unwrap_or(0);
        let unread = items.iter().filter(|item| item.timestamp > seen_at).count();

        NotificationFeed { items, unread }
    }
    /// Feed for `admin` from raw reports and notifications.
    pub fn assemble(
        reports: &[Report],
        notifications: &[Notification],
        admin: &Admin,
        now: i64,
    ) -> Self {
        Self::build(
            reports.iter().filter_map(Report::to_feed_item).collect(),
            notifications
                .iter()
                .filter(|notification| notification.shows_in_admin_feed())
                .filter_map(Notification::to_feed_item)
                .collect(),
            admin.cleared_at.map(|time| time.timestamp_millis()),
            admin.seen_at.map(|time| time.timestamp_millis()),
            now,
        )
    }
    pub async fn load(admin: &Admin) -> Result<Self, String> {
        let reports = Report::find_latest(FEED_REPORT_LIMIT).await?;
        let notifications = Notification::find_for_admins(FEED_LIMIT).await?;

        Ok(Self::assemble(
            &reports,
            &notifications,
            admin,
            DateTime::now().timestamp_millis(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000_000;

    fn item(id: &str, kind: NotificationKind, minutes_ago: i64) -> FeedItem {
        FeedItem {
            id: id.to_string(),
            kind,
            title: id.to_uppercase(),
            message: String::new(),
            timestamp: NOW - minutes_ago * 60_000,
            report_id: None,
        }
    }

    #[test]
    fn merges_newest_first() {
        let feed = NotificationFeed::build(
            vec![item("r1", NotificationKind::NewReport, 30)],
            vec![
                item("n1", NotificationKind::AdminUpdate, 10),
                item("n2", NotificationKind::WorkerUpdate, 50),
            ],
            None,
            None,
            NOW,
        );
        let ids: Vec<&str> = feed.items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "r1", "n2"]);
        assert_eq!(feed.unread, 3);
    }

    #[test]
    fn drops_expired_and_cleared_items() {
        let feed = NotificationFeed::build(
            vec![item("old", NotificationKind::NewReport, 25 * 60)],
            vec![
                item("before-clear", NotificationKind::AdminAlert, 40),
                item("after-clear", NotificationKind::AdminAlert, 5),
            ],
            Some(NOW - 20 * 60_000),
            None,
            NOW,
        );
        let ids: Vec<&str> = feed.items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["after-clear"]);
    }

    #[test]
    fn caps_feed_and_counts_unseen() {
        let notifications: Vec<FeedItem> = (0..30)
            .map(|i| item(&format!("n{i}"), NotificationKind::WorkerUpdate, i))
            .collect();
        let feed = NotificationFeed::build(
            Vec::new(),
            notifications,
            None,
            Some(NOW - 3 * 60_000),
            NOW,
        );
        assert_eq!(feed.items.len(), FEED_LIMIT);
        assert_eq!(feed.items[0].id, "n0");
        assert_eq!(feed.unread, 3);
    }

    #[test]
    fn bell_shows_each_report_once_without_citizen_updates() {
        let submitted = crate::models::report::tests::report(
            "R-001",
            "Pothole",
            crate::models::report::ReportStatusKind::Submitted,
            NOW - 10 * 60_000,
        );
        let stored = |title: &str, kind, audience, minutes_ago: i64| Notification {
            _id: Some(ObjectId::new()),
            title: title.to_string(),
            message: String::new(),
            kind,
            audience,
            report_id: submitted._id,
            timestamp: DateTime::from_millis(NOW - minutes_ago * 60_000),
            is_read: false,
        };
        let notifications = vec![
            stored("Report Approved", NotificationKind::AdminUpdate, NotificationAudience::Citizen, 2),
            stored("Crew Delayed", NotificationKind::WorkerUpdate, NotificationAudience::Admin, 5),
            stored("New Report R-001", NotificationKind::NewReport, NotificationAudience::Admin, 10),
        ];
        let admin = Admin {
            _id: Some(ObjectId::new()),
            name: "Officer".to_string(),
            email: "officer@rda.gov.lk".to_string(),
            password: String::new(),
            role: crate::models::role::AdminRole::Officer,
            seen_at: Some(DateTime::from_millis(NOW - 7 * 60_000)),
            cleared_at: None,
            created_at: DateTime::from_millis(0),
        };

        let feed = NotificationFeed::assemble(&[submitted], &notifications, &admin, NOW);

        let titles: Vec<&str> = feed.items.iter().map(|item| item.title.as_str()).collect();
        assert_eq!(titles, vec!["Crew Delayed", "New Report R-001"]);
        assert_eq!(feed.unread, 1);
    }

    #[test]
    fn admin_query_excludes_citizen_and_new_report_rows() {
        let filter = admin_feed_filter();
        assert_eq!(
            filter.get_document("audience").unwrap(),
            &doc! { "$ne": "citizen" }
        );
        assert_eq!(
            filter.get_document("kind").unwrap(),
            &doc! { "$ne": "new_report" }
        );
    }
}
