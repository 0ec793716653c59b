use crate::{
    database::get_db,
    events::{self, ChangeEvent, ChangeKind},
};
use actix_multipart::form::{tempfile::TempFile, MultipartForm};
use futures::stream::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, to_bson, Bson, DateTime, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{
    notification::{
        FeedItem, Notification, NotificationAudience, NotificationKind, NotificationResponse,
    },
    staff::Staff,
    team::{Team, TeamStatusKind},
};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum ReportStatusKind {
    Submitted,
    Pending,
    #[serde(rename = "In-progress")]
    InProgress,
    #[serde(rename = "On-Hold")]
    OnHold,
    Resolved,
    Declined,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub report_id: String,
    pub category: String,
    pub description: String,
    pub status: ReportStatusKind,
    pub history: Vec<ReportStatus>,
    pub location: ReportLocation,
    pub reporter: ReportReporter,
    pub photos: Vec<String>,
    pub proof_photo: Option<String>,
    pub assignment: Option<ReportAssignment>,
    pub estimated_date: Option<DateTime>,
    pub decline_reason: Option<String>,
    pub created_at: DateTime,
}
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReportStatus {
    pub kind: ReportStatusKind,
    pub time: DateTime,
    pub message: Option<String>,
}
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ReportLocation {
    pub name: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ReportReporter {
    pub uid: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReportAssignment {
    pub team: ObjectId,
    pub team_id: String,
    pub team_name: String,
    pub assigned_at: DateTime,
}
#[derive(Debug, Deserialize, Serialize)]
struct ReportCounter {
    _id: String,
    last_number: i64,
}
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub status: Option<ReportStatusKind>,
    pub search: Option<String>,
    pub limit: Option<usize>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ReportRequest {
    pub category: String,
    pub description: String,
    pub location: Option<ReportLocation>,
    pub reporter: Option<ReportReporter>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ReportDeclineRequest {
    pub reason: String,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ReportAssignRequest {
    pub team: String,
    pub estimated_date: Option<i64>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ReportStatusRequest {
    pub status: ReportStatusKind,
    pub message: Option<String>,
}
#[derive(Debug, MultipartForm)]
pub struct ReportPhotoMultipartRequest {
    #[multipart(rename = "file")]
    pub files: Vec<TempFile>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ReportResponse {
    pub _id: String,
    pub report_id: String,
    pub category: String,
    pub description: String,
    pub status: ReportStatusKind,
    pub label: String,
    pub history: Vec<ReportStatusResponse>,
    pub location: ReportLocation,
    pub reporter: ReportReporter,
    pub photos: Vec<String>,
    pub proof_photo: Option<String>,
    pub assignment: Option<ReportAssignmentResponse>,
    pub estimated_date: Option<i64>,
    pub overdue_days: Option<i64>,
    pub decline_reason: Option<String>,
    pub created_at: i64,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ReportStatusResponse {
    pub kind: ReportStatusKind,
    pub time: i64,
    pub message: Option<String>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ReportAssignmentResponse {
    pub team: String,
    pub team_id: String,
    pub team_name: String,
    pub assigned_at: i64,
}
#[derive(Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub submitted: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub on_hold: usize,
    pub resolved: usize,
    pub declined: usize,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ReportListResponse {
    pub summary: ReportSummary,
    pub reports: Vec<ReportResponse>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ReportDetailResponse {
    pub report: ReportResponse,
    pub timeline: Vec<NotificationResponse>,
}

impl ReportStatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatusKind::Submitted => "Submitted",
            ReportStatusKind::Pending => "Pending",
            ReportStatusKind::InProgress => "In-progress",
            ReportStatusKind::OnHold => "On-Hold",
            ReportStatusKind::Resolved => "Resolved",
            ReportStatusKind::Declined => "Declined",
        }
    }
    pub fn label(&self) -> &'static str {
        match self {
            ReportStatusKind::Submitted => "Pending Approval",
            ReportStatusKind::Pending => "Pending Assignment",
            _ => self.as_str(),
        }
    }
    pub fn can_transition_to(&self, next: &ReportStatusKind) -> bool {
        use ReportStatusKind::*;

        matches!(
            (*self, *next),
            (Submitted, Pending)
                | (Submitted, Declined)
                | (Pending, Declined)
                | (Pending, InProgress)
                | (InProgress, OnHold)
                | (OnHold, InProgress)
                | (InProgress, Resolved)
        )
    }
}

/// Matches the report only while it still holds `status`.
fn status_filter(_id: &ObjectId, status: ReportStatusKind) -> Document {
    doc! { "_id": _id, "status": status.as_str() }
}

fn transition_update(entry: &ReportStatus, mut fields: Document) -> Result<Document, String> {
    fields.insert("status", entry.kind.as_str());
    Ok(doc! {
        "$set": fields,
        "$push": {
            "history": to_bson(entry).map_err(|_| "SERIALIZATION_FAILED".to_string())?
        },
    })
}

/// Restores `previous`, drops the newest history entry and clears `unset`.
fn revert_update(previous: ReportStatusKind, unset: &[&str]) -> Document {
    let mut update = doc! {
        "$set": { "status": previous.as_str() },
        "$pop": { "history": 1 },
    };
    if !unset.is_empty() {
        let fields: Document = unset
            .iter()
            .map(|field| (field.to_string(), Bson::String(String::new())))
            .collect();
        update.insert("$unset", fields);
    }
    update
}

fn ensure_unchanged(matched_count: u64) -> Result<(), String> {
    if matched_count == 0 {
        return Err("REPORT_STATUS_CONFLICT".to_string());
    }
    Ok(())
}

pub fn format_report_id(number: i64) -> String {
    format!("R-{number:03}")
}

impl ReportSummary {
    pub fn count(reports: &[Report]) -> Self {
        let mut summary = ReportSummary {
            total: reports.len(),
            ..Default::default()
        };
        for report in reports {
            match report.status {
                ReportStatusKind::Submitted => summary.submitted += 1,
                ReportStatusKind::Pending => summary.pending += 1,
                ReportStatusKind::InProgress => summary.in_progress += 1,
                ReportStatusKind::OnHold => summary.on_hold += 1,
                ReportStatusKind::Resolved => summary.resolved += 1,
                ReportStatusKind::Declined => summary.declined += 1,
            }
        }
        summary
    }
}

impl ReportListResponse {
    /// `reports` is expected newest first; the summary always covers all of them.
    pub fn build(reports: Vec<Report>, query: &ReportQuery, now: i64) -> Self {
        let summary = ReportSummary::count(&reports);
        let limit = query.limit.unwrap_or(usize::MAX);
        let reports = reports
            .iter()
            .filter(|report| query.status.map_or(true, |status| report.status == status))
            .filter(|report| {
                query
                    .search
                    .as_deref()
                    .map_or(true, |search| report.matches_search(search))
            })
            .filter_map(|report| report.to_response(now))
            .take(limit)
            .collect();

        ReportListResponse { summary, reports }
    }
}

impl Report {
    pub fn matches_search(&self, search: &str) -> bool {
        let search = search.trim().to_lowercase();
        search.is_empty()
            || self.report_id.to_lowercase().contains(&search)
            || self.category.to_lowercase().contains(&search)
            || self.description.to_lowercase().contains(&search)
    }
    pub fn overdue_days(&self, now: i64) -> Option<i64> {
        let estimated = self.estimated_date?.timestamp_millis();
        if self.status == ReportStatusKind::Resolved || now <= estimated {
            return None;
        }
        let late = now - estimated;
        Some((late + DAY_MS - 1) / DAY_MS)
    }
    pub fn location_name(&self) -> String {
        self.location
            .name
            .clone()
            .or_else(|| self.location.address.clone())
            .unwrap_or_else(|| "Unknown Location".to_string())
    }
    pub fn to_response(&self, now: i64) -> Option<ReportResponse> {
        Some(ReportResponse {
            _id: self._id?.to_hex(),
            report_id: self.report_id.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
            status: self.status,
            label: self.status.label().to_string(),
            history: self
                .history
                .iter()
                .map(|status| ReportStatusResponse {
                    kind: status.kind,
                    time: status.time.timestamp_millis(),
                    message: status.message.clone(),
                })
                .collect(),
            location: self.location.clone(),
            reporter: self.reporter.clone(),
            photos: self.photos.clone(),
            proof_photo: self.proof_photo.clone(),
            assignment: self
                .assignment
                .as_ref()
                .map(|assignment| ReportAssignmentResponse {
                    team: assignment.team.to_hex(),
                    team_id: assignment.team_id.clone(),
                    team_name: assignment.team_name.clone(),
                    assigned_at: assignment.assigned_at.timestamp_millis(),
                }),
            estimated_date: self.estimated_date.map(|date| date.timestamp_millis()),
            overdue_days: self.overdue_days(now),
            decline_reason: self.decline_reason.clone(),
            created_at: self.created_at.timestamp_millis(),
        })
    }
    pub fn to_feed_item(&self) -> Option<FeedItem> {
        Some(FeedItem {
            id: self._id?.to_hex(),
            kind: NotificationKind::NewReport,
            title: format!("New Report {}", self.report_id),
            message: format!("{} reported at {}", self.category, self.location_name()),
            timestamp: self.created_at.timestamp_millis(),
            report_id: self._id.map(|_id| _id.to_hex()),
        })
    }

    pub async fn submit(request: ReportRequest) -> Result<ObjectId, String> {
        if request.category.trim().is_empty() {
            return Err("REPORT_MUST_HAVE_CATEGORY".to_string());
        }
        if request.description.trim().is_empty() {
            return Err("REPORT_MUST_HAVE_DESCRIPTION".to_string());
        }

        let created_at = DateTime::now();
        let mut report = Report {
            _id: Some(ObjectId::new()),
            report_id: Self::next_report_id().await?,
            category: request.category.trim().to_string(),
            description: request.description.trim().to_string(),
            status: ReportStatusKind::Submitted,
            history: vec![ReportStatus {
                kind: ReportStatusKind::Submitted,
                time: created_at,
                message: None,
            }],
            location: request.location.unwrap_or_default(),
            reporter: request.reporter.unwrap_or_default(),
            photos: Vec::new(),
            proof_photo: None,
            assignment: None,
            estimated_date: None,
            decline_reason: None,
            created_at,
        };
        let _id = report.save().await?;

        let mut notification = Notification::new(
            format!("New Report {}", report.report_id),
            format!("{} reported at {}", report.category, report.location_name()),
            NotificationKind::NewReport,
            NotificationAudience::Admin,
            Some(_id),
        );
        if let Err(error) = notification.save().await {
            tracing::warn!(report = %_id, %error, "new report notification was not stored");
        }

        Ok(_id)
    }
    async fn save(&mut self) -> Result<ObjectId, String> {
        let db: Database = get_db()?;
        let collection: Collection<Report> = db.collection::<Report>("reports");

        let _id = collection
            .insert_one(&*self, None)
            .await
            .map_err(|_| "INSERTING_FAILED".to_string())?
            .inserted_id
            .as_object_id()
            .ok_or_else(|| "INSERTING_FAILED".to_string())?;

        events::publish(ChangeEvent::new(ChangeKind::Report, &_id));
        Ok(_id)
    }
    async fn next_report_id() -> Result<String, String> {
        let db: Database = get_db()?;
        let collection: Collection<ReportCounter> = db.collection::<ReportCounter>("metadata");

        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let counter = collection
            .find_one_and_update(
                doc! { "_id": "report_counter" },
                doc! { "$inc": { "last_number": 1_i64 } },
                options,
            )
            .await
            .map_err(|_| "REPORT_COUNTER_FAILED".to_string())?
            .ok_or_else(|| "REPORT_COUNTER_FAILED".to_string())?;

        Ok(format_report_id(counter.last_number))
    }
    pub async fn find_all() -> Result<Vec<Report>, String> {
        Self::find(None).await
    }
    pub async fn find_latest(limit: usize) -> Result<Vec<Report>, String> {
        Self::find(Some(limit as i64)).await
    }
    async fn find(limit: Option<i64>) -> Result<Vec<Report>, String> {
        let db: Database = get_db()?;
        let collection: Collection<Report> = db.collection::<Report>("reports");

        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .build();

        let mut reports: Vec<Report> = Vec::new();
        let mut cursor = collection
            .find(doc! {}, options)
            .await
            .map_err(|_| "REPORT_NOT_FOUND".to_string())?;
        while let Some(Ok(report)) = cursor.next().await {
            reports.push(report);
        }
        Ok(reports)
    }
    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<Report>, String> {
        let db: Database = get_db()?;
        let collection: Collection<Report> = db.collection::<Report>("reports");

        collection
            .find_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| "REPORT_NOT_FOUND".to_string())
    }
    pub async fn find_detail_by_id(_id: &ObjectId) -> Result<Option<ReportDetailResponse>, String> {
        let report = match Self::find_by_id(_id).await? {
            Some(report) => report,
            None => return Ok(None),
        };
        let timeline = Notification::find_by_report(_id).await?;

        Ok(report
            .to_response(DateTime::now().timestamp_millis())
            .map(|report| ReportDetailResponse { report, timeline }))
    }
    pub async fn add_photos(&mut self, names: Vec<String>) -> Result<ObjectId, String> {
        let _id = self._id.ok_or_else(|| "REPORT_NOT_FOUND".to_string())?;
        let db: Database = get_db()?;
        let collection: Collection<Report> = db.collection::<Report>("reports");

        collection
            .update_one(
                doc! { "_id": _id },
                doc! { "$push": { "photos": { "$each": names.clone() } } },
                None,
            )
            .await
            .map_err(|_| "UPDATE_FAILED".to_string())?;

        self.photos.extend(names);
        events::publish(ChangeEvent::new(ChangeKind::Report, &_id));
        Ok(_id)
    }
    pub async fn set_proof_photo(&mut self, name: String) -> Result<ObjectId, String> {
        let _id = self._id.ok_or_else(|| "REPORT_NOT_FOUND".to_string())?;
        let db: Database = get_db()?;
        let collection: Collection<Report> = db.collection::<Report>("reports");

        collection
            .update_one(
                doc! { "_id": _id },
                doc! { "$set": { "proof_photo": name.clone() } },
                None,
            )
            .await
            .map_err(|_| "UPDATE_FAILED".to_string())?;

        self.proof_photo = Some(name);
        events::publish(ChangeEvent::new(ChangeKind::Report, &_id));
        Ok(_id)
    }

    pub async fn approve(&mut self) -> Result<ObjectId, String> {
        let previous = self
            .transition(ReportStatusKind::Pending, None, Document::new())
            .await?;
        self.notify_citizen(
            "Report Approved",
            "Your report has been verified and approved by the admin.".to_string(),
            previous,
            &[],
        )
        .await
    }
    pub async fn decline(&mut self, reason: &str) -> Result<ObjectId, String> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err("DECLINE_REASON_REQUIRED".to_string());
        }

        let previous = self
            .transition(
                ReportStatusKind::Declined,
                Some(reason.to_string()),
                doc! { "decline_reason": reason },
            )
            .await?;
        self.notify_citizen(
            "Report Declined",
            format!("Reason: {reason}"),
            previous,
            &["decline_reason"],
        )
        .await?;

        self.decline_reason = Some(reason.to_string());
        self.report_object_id()
    }
    pub async fn assign_team(
        &mut self,
        team: &Team,
        estimated_date: Option<DateTime>,
    ) -> Result<ObjectId, String> {
        let team_object_id = team._id.ok_or_else(|| "TEAM_NOT_FOUND".to_string())?;
        if team.category.as_str() != self.category {
            return Err("TEAM_CATEGORY_MISMATCH".to_string());
        }
        if self.status != ReportStatusKind::Pending {
            return Err("INVALID_STATUS_TRANSITION".to_string());
        }
        if team.status != TeamStatusKind::Available {
            return Err("TEAM_IS_BUSY".to_string());
        }

        let assignment = ReportAssignment {
            team: team_object_id,
            team_id: team.team_id.clone(),
            team_name: team.name.clone(),
            assigned_at: DateTime::now(),
        };
        let mut fields = doc! {
            "assignment": to_bson(&assignment).map_err(|_| "SERIALIZATION_FAILED".to_string())?,
        };
        if let Some(date) = estimated_date {
            fields.insert("estimated_date", date);
        }

        let previous = self
            .transition(
                ReportStatusKind::InProgress,
                Some(format!("Assigned to {}", team.name)),
                fields,
            )
            .await?;

        if let Err(error) = Team::occupy(&team_object_id).await {
            self.revert(previous, &["assignment", "estimated_date"])
                .await?;
            return Err(error);
        }

        let report_object_id = self.report_object_id()?;
        if let Some(supervisor) = team.supervisor {
            if let Err(error) = Staff::link_report(&supervisor, &report_object_id).await {
                Team::release(&team_object_id)
                    .await
                    .map_err(|_| "TEAM_ROLLBACK_FAILED".to_string())?;
                self.revert(previous, &["assignment", "estimated_date"])
                    .await?;
                return Err(error);
            }
        }

        if let Err(error) = self
            .notify_citizen(
                "Team Assigned",
                format!("Work assigned to {}.", team.name),
                previous,
                &["assignment", "estimated_date"],
            )
            .await
        {
            if let Some(supervisor) = team.supervisor {
                Staff::unlink_report(&supervisor)
                    .await
                    .map_err(|_| "STAFF_ROLLBACK_FAILED".to_string())?;
            }
            Team::release(&team_object_id)
                .await
                .map_err(|_| "TEAM_ROLLBACK_FAILED".to_string())?;
            return Err(error);
        }

        self.assignment = Some(assignment);
        self.estimated_date = estimated_date;
        self.report_object_id()
    }
    /// Field progress: hold, resume or complete an assigned report.
    pub async fn update_status(
        &mut self,
        next: ReportStatusKind,
        message: Option<String>,
    ) -> Result<ObjectId, String> {
        if !matches!(
            self.status,
            ReportStatusKind::InProgress | ReportStatusKind::OnHold
        ) {
            return Err("INVALID_STATUS_TRANSITION".to_string());
        }
        let message = message
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty());

        let (title, default_message) = match next {
            ReportStatusKind::OnHold => ("Work On Hold", "Work on your report has been paused."),
            ReportStatusKind::InProgress => ("Work Resumed", "Work on your report has resumed."),
            ReportStatusKind::Resolved => {
                ("Report Resolved", "The reported issue has been resolved.")
            }
            _ => return Err("INVALID_STATUS_TRANSITION".to_string()),
        };

        let previous = self.transition(next, message.clone(), Document::new()).await?;

        let team = self.assignment.as_ref().map(|assignment| assignment.team);
        if next == ReportStatusKind::Resolved {
            if let Some(team) = team {
                if let Err(error) = Team::release(&team).await {
                    self.revert(previous, &[]).await?;
                    return Err(error);
                }
            }
        }

        let result = self
            .notify_citizen(
                title,
                message.unwrap_or_else(|| default_message.to_string()),
                previous,
                &[],
            )
            .await;
        if next == ReportStatusKind::Resolved {
            if let Some(team) = team {
                if result.is_err() {
                    Team::occupy(&team)
                        .await
                        .map_err(|_| "TEAM_ROLLBACK_FAILED".to_string())?;
                } else {
                    self.unlink_supervisor(&team).await;
                }
            }
        }
        result
    }
    async fn unlink_supervisor(&self, team: &ObjectId) {
        let supervisor = match Team::find_by_id(team).await {
            Ok(Some(team)) => team.supervisor,
            _ => None,
        };
        if let Some(supervisor) = supervisor {
            if let Err(error) = Staff::unlink_report(&supervisor).await {
                tracing::warn!(report = %self.report_id, %error, "supervisor still points at resolved report");
            }
        }
    }

    fn report_object_id(&self) -> Result<ObjectId, String> {
        self._id.ok_or_else(|| "REPORT_NOT_FOUND".to_string())
    }
    /// Writes `next` only if the stored status still matches what was read.
    /// Returns the status that was replaced.
    async fn transition(
        &mut self,
        next: ReportStatusKind,
        message: Option<String>,
        fields: Document,
    ) -> Result<ReportStatusKind, String> {
        let current = self.status;
        if !current.can_transition_to(&next) {
            return Err("INVALID_STATUS_TRANSITION".to_string());
        }
        let _id = self.report_object_id()?;
        let db: Database = get_db()?;
        let collection: Collection<Report> = db.collection::<Report>("reports");

        let entry = ReportStatus {
            kind: next,
            time: DateTime::now(),
            message,
        };

        let result = collection
            .update_one(
                status_filter(&_id, current),
                transition_update(&entry, fields)?,
                None,
            )
            .await
            .map_err(|_| "UPDATE_FAILED".to_string())?;
        ensure_unchanged(result.matched_count)?;

        tracing::info!(report = %self.report_id, from = current.as_str(), to = next.as_str(), "report status changed");
        self.status = next;
        self.history.push(entry);
        events::publish(ChangeEvent::new(ChangeKind::Report, &_id));
        Ok(current)
    }
    async fn revert(&mut self, previous: ReportStatusKind, unset: &[&str]) -> Result<(), String> {
        let _id = self.report_object_id()?;
        let db: Database = get_db()?;
        let collection: Collection<Report> = db.collection::<Report>("reports");

        let result = collection
            .update_one(
                status_filter(&_id, self.status),
                revert_update(previous, unset),
                None,
            )
            .await
            .map_err(|_| "REPORT_ROLLBACK_FAILED".to_string())?;
        if result.matched_count == 0 {
            tracing::error!(report = %self.report_id, "report changed before rollback");
            return Err("REPORT_ROLLBACK_FAILED".to_string());
        }

        tracing::warn!(report = %self.report_id, to = previous.as_str(), "report status reverted");
        self.status = previous;
        self.history.pop();
        events::publish(ChangeEvent::new(ChangeKind::Report, &_id));
        Ok(())
    }
    async fn notify_citizen(
        &mut self,
        title: &str,
        message: String,
        previous: ReportStatusKind,
        unset: &[&str],
    ) -> Result<ObjectId, String> {
        let _id = self.report_object_id()?;
        let mut notification = Notification::new(
            title,
            message,
            NotificationKind::AdminUpdate,
            NotificationAudience::Citizen,
            Some(_id),
        );

        match notification.save().await {
            Ok(_) => Ok(_id),
            Err(error) => {
                tracing::error!(report = %self.report_id, %error, "status notification failed");
                self.revert(previous, unset).await?;
                Err("NOTIFICATION_FAILED".to_string())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ReportStatusKind::*;

    const ALL: [ReportStatusKind; 6] = [Submitted, Pending, InProgress, OnHold, Resolved, Declined];

    pub(crate) fn report(report_id: &str, category: &str, status: ReportStatusKind, created_at: i64) -> Report {
        Report {
            _id: Some(ObjectId::new()),
            report_id: report_id.to_string(),
            category: category.to_string(),
            description: format!("{category} near the junction"),
            status,
            history: Vec::new(),
            location: ReportLocation {
                name: Some("Galle Road".to_string()),
                ..Default::default()
            },
            reporter: ReportReporter::default(),
            photos: Vec::new(),
            proof_photo: None,
            assignment: None,
            estimated_date: None,
            decline_reason: None,
            created_at: DateTime::from_millis(created_at),
        }
    }

    #[test]
    fn transition_table_is_exact() {
        let allowed = [
            (Submitted, Pending),
            (Submitted, Declined),
            (Pending, Declined),
            (Pending, InProgress),
            (InProgress, OnHold),
            (OnHold, InProgress),
            (InProgress, Resolved),
        ];
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(&to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from.as_str(),
                    to.as_str()
                );
            }
        }
    }

    #[test]
    fn terminal_states_have_no_exit() {
        for from in [Resolved, Declined] {
            assert!(ALL.iter().all(|to| !from.can_transition_to(to)));
        }
    }

    #[test]
    fn status_uses_dashboard_wire_names() {
        assert_eq!(serde_json::to_string(&InProgress).unwrap(), "\"In-progress\"");
        assert_eq!(serde_json::to_string(&OnHold).unwrap(), "\"On-Hold\"");
        assert_eq!(
            serde_json::from_str::<ReportStatusKind>("\"Submitted\"").unwrap(),
            Submitted
        );
        assert_eq!(Submitted.label(), "Pending Approval");
        assert_eq!(Pending.label(), "Pending Assignment");
        assert_eq!(Resolved.label(), "Resolved");
    }

    #[test]
    fn report_ids_are_zero_padded() {
        assert_eq!(format_report_id(1), "R-001");
        assert_eq!(format_report_id(42), "R-042");
        assert_eq!(format_report_id(1234), "R-1234");
    }

    #[test]
    fn overdue_counts_started_days() {
        let now = 1_760_000_000_000;
        let mut late = report("R-001", "Pothole", InProgress, now);
        late.estimated_date = Some(DateTime::from_millis(now - DAY_MS - 1));
        assert_eq!(late.overdue_days(now), Some(2));

        late.status = Resolved;
        assert_eq!(late.overdue_days(now), None);

        let mut on_time = report("R-002", "Pothole", InProgress, now);
        on_time.estimated_date = Some(DateTime::from_millis(now + DAY_MS));
        assert_eq!(on_time.overdue_days(now), None);
    }

    #[test]
    fn list_filters_but_summarises_everything() {
        let reports = vec![
            report("R-003", "Drainage", Pending, 3_000),
            report("R-002", "Pothole", Resolved, 2_000),
            report("R-001", "Pothole", Pending, 1_000),
        ];
        let query = ReportQuery {
            status: Some(Pending),
            search: Some("POTHOLE".to_string()),
            limit: None,
        };
        let list = ReportListResponse::build(reports, &query, 4_000);

        assert_eq!(list.summary.total, 3);
        assert_eq!(list.summary.pending, 2);
        assert_eq!(list.summary.resolved, 1);
        assert_eq!(list.reports.len(), 1);
        assert_eq!(list.reports[0].report_id, "R-001");
    }

    #[test]
    fn search_matches_id_category_and_description() {
        let subject = report("R-017", "Streetlight", Pending, 0);
        assert!(subject.matches_search("r-017"));
        assert!(subject.matches_search("street"));
        assert!(subject.matches_search("junction"));
        assert!(subject.matches_search("  "));
        assert!(!subject.matches_search("drainage"));
    }

    #[test]
    fn feed_item_describes_new_report() {
        let subject = report("R-005", "Drainage", Submitted, 5_000);
        let item = subject.to_feed_item().unwrap();
        assert_eq!(item.title, "New Report R-005");
        assert_eq!(item.message, "Drainage reported at Galle Road");
        assert_eq!(item.timestamp, 5_000);
        assert_eq!(item.kind, NotificationKind::NewReport);
    }

    #[test]
    fn status_writes_are_conditional_on_the_status_read() {
        let _id = ObjectId::new();
        let entry = ReportStatus {
            kind: InProgress,
            time: DateTime::from_millis(1_000),
            message: Some("Assigned to Alpha".to_string()),
        };

        assert_eq!(status_filter(&_id, Pending), doc! { "_id": _id, "status": "Pending" });

        let update = transition_update(&entry, doc! { "estimated_date": DateTime::from_millis(9_000) }).unwrap();
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "In-progress");
        assert!(set.contains_key("estimated_date"));
        let pushed = update.get_document("$push").unwrap().get_document("history").unwrap();
        assert_eq!(pushed.get_str("kind").unwrap(), "In-progress");
        assert_eq!(pushed.get_str("message").unwrap(), "Assigned to Alpha");
    }

    #[test]
    fn lost_race_is_a_conflict() {
        assert_eq!(ensure_unchanged(0), Err("REPORT_STATUS_CONFLICT".to_string()));
        assert_eq!(ensure_unchanged(1), Ok(()));
    }

    #[test]
    fn revert_restores_status_and_clears_fields() {
        let update = revert_update(Pending, &["assignment", "estimated_date"]);
        assert_eq!(
            update,
            doc! {
                "$set": { "status": "Pending" },
                "$pop": { "history": 1 },
                "$unset": { "assignment": "", "estimated_date": "" },
            }
        );

        let bare = revert_update(Submitted, &[]);
        assert!(!bare.contains_key("$unset"));
    }
}
