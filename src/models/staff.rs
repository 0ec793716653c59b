use crate::{
    database::{get_db, insert_error},
    events::{self, ChangeEvent, ChangeKind},
};
use chrono::{Datelike, NaiveDate};
use futures::stream::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime, Document},
    options::FindOptions,
    Collection, Database,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::{
    credential::{generate_code, generate_passcode, hash_passcode, MAX_ATTEMPTS},
    report::Report,
    team::Team,
};

const MINIMUM_AGE: i32 = 18;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static NIC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d{9}[Vv]|\d{12})$").unwrap());
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:0|94|\+94)?7(0|1|2|4|5|6|7|8)\d{7}$").unwrap());

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum StaffRoleKind {
    Worker,
    Supervisor,
}
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum StaffSpecialization {
    #[serde(rename = "Pothole Maintenance")]
    PotholeMaintenance,
    Drainage,
    Streetlight,
    Signage,
}
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum StaffStatusKind {
    Available,
    #[serde(rename = "In-Work")]
    InWork,
    Away,
    Sick,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Staff {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub staff_id: String,
    pub full_name: String,
    pub email: String,
    pub nic: String,
    pub phone: String,
    pub address: String,
    pub dob: String,
    pub role: StaffRoleKind,
    pub specialization: StaffSpecialization,
    pub status: StaffStatusKind,
    pub passcode: String,
    pub current_report_id: Option<ObjectId>,
    pub current_team_id: Option<ObjectId>,
    pub created_at: DateTime,
}
#[derive(Debug, Default, Deserialize)]
pub struct StaffQuery {
    pub role: Option<StaffRoleKind>,
    pub search: Option<String>,
}
#[derive(Debug, Default, Deserialize)]
pub struct StaffConfirmQuery {
    pub confirm: Option<bool>,
}
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StaffRequest {
    pub full_name: String,
    pub nic: String,
    pub email: String,
    pub phone: String,
    pub dob: String,
    pub address: String,
    pub role: StaffRoleKind,
    pub specialization: Option<StaffSpecialization>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct StaffUpdateRequest {
    pub full_name: String,
    pub phone: String,
    pub specialization: StaffSpecialization,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct StaffStatusRequest {
    pub status: StaffStatusKind,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct StaffResponse {
    pub _id: String,
    pub staff_id: String,
    pub full_name: String,
    pub email: String,
    pub nic: String,
    pub phone: String,
    pub address: String,
    pub dob: String,
    pub role: StaffRoleKind,
    pub specialization: StaffSpecialization,
    pub status: StaffStatusKind,
    pub current_report_id: Option<String>,
    pub current_team_id: Option<String>,
    pub created_at: i64,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct StaffCreatedResponse {
    pub _id: String,
    pub staff_id: String,
    pub passcode: String,
}
/// What an In-Work member is busy with, shown before a guarded change.
#[derive(Debug, Deserialize, Serialize)]
pub struct StaffWorkContext {
    pub error: String,
    pub report_id: Option<String>,
    pub location: Option<String>,
    pub team_id: Option<String>,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}
pub fn is_valid_nic(nic: &str) -> bool {
    NIC_PATTERN.is_match(nic)
}
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_PATTERN.is_match(phone)
}
pub fn is_valid_name(name: &str) -> bool {
    name.trim().chars().count() >= 3
}
pub fn age_on(dob: &str, today: NaiveDate) -> Option<i32> {
    let dob = NaiveDate::parse_from_str(dob.trim(), "%Y-%m-%d").ok()?;
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    Some(age)
}

fn report_link_update(report: Option<&ObjectId>) -> Document {
    match report {
        Some(report) => doc! { "$set": { "current_report_id": report } },
        None => doc! { "$unset": { "current_report_id": "" } },
    }
}

impl StaffRequest {
    pub fn validate(&self, today: NaiveDate) -> Result<(), String> {
        if !is_valid_name(&self.full_name) {
            return Err("STAFF_MUST_HAVE_VALID_NAME".to_string());
        }
        if !is_valid_nic(self.nic.trim()) {
            return Err("STAFF_MUST_HAVE_VALID_NIC".to_string());
        }
        if !is_valid_email(self.email.trim()) {
            return Err("STAFF_MUST_HAVE_VALID_EMAIL".to_string());
        }
        if !is_valid_phone(self.phone.trim()) {
            return Err("STAFF_MUST_HAVE_VALID_PHONE".to_string());
        }
        match age_on(&self.dob, today) {
            Some(age) if age >= MINIMUM_AGE => Ok(()),
            _ => Err("STAFF_MUST_BE_ADULT".to_string()),
        }
    }
}

impl StaffRoleKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            StaffRoleKind::Supervisor => "S",
            StaffRoleKind::Worker => "W",
        }
    }
}

impl Staff {
    pub async fn register(request: StaffRequest) -> Result<StaffCreatedResponse, String> {
        request.validate(chrono::Local::now().date_naive())?;

        let email = request.email.trim().to_lowercase();
        let nic = request.nic.trim().to_uppercase();

        if Self::find_by_nic(&nic).await?.is_some() {
            return Err("STAFF_NIC_ALREADY_EXIST".to_string());
        }
        if Self::find_by_email(&email).await?.is_some() {
            return Err("STAFF_EMAIL_ALREADY_EXIST".to_string());
        }

        let staff_id = Self::unique_staff_id(&request.role).await?;
        let passcode = generate_passcode();

        let mut staff = Staff {
            _id: None,
            staff_id: staff_id.clone(),
            full_name: request.full_name.trim().to_string(),
            email,
            nic,
            phone: request.phone.trim().to_string(),
            address: request.address.trim().to_string(),
            dob: request.dob.trim().to_string(),
            role: request.role,
            specialization: request
                .specialization
                .unwrap_or(StaffSpecialization::PotholeMaintenance),
            status: StaffStatusKind::Available,
            passcode: hash_passcode(&passcode)?,
            current_report_id: None,
            current_team_id: None,
            created_at: DateTime::now(),
        };
        let _id = staff.save().await?;
        tracing::info!(staff = %staff_id, "staff registered");

        Ok(StaffCreatedResponse {
            _id: _id.to_hex(),
            staff_id,
            passcode,
        })
    }
    async fn unique_staff_id(role: &StaffRoleKind) -> Result<String, String> {
        for _ in 0..MAX_ATTEMPTS {
            let staff_id = generate_code(role.prefix());
            if Self::find_one(doc! { "staff_id": &staff_id }).await?.is_none() {
                return Ok(staff_id);
            }
        }
        Err("STAFF_ID_EXHAUSTED".to_string())
    }
    async fn save(&mut self) -> Result<ObjectId, String> {
        let db: Database = get_db()?;
        let collection: Collection<Staff> = db.collection::<Staff>("staff");

        self._id = Some(ObjectId::new());

        let _id = collection
            .insert_one(&*self, None)
            .await
            .map_err(|error| insert_error(&error, "STAFF_ALREADY_EXIST"))?
            .inserted_id
            .as_object_id()
            .ok_or_else(|| "INSERTING_FAILED".to_string())?;

        events::publish(ChangeEvent::new(ChangeKind::Staff, &_id));
        Ok(_id)
    }
    pub fn matches(&self, query: &StaffQuery) -> bool {
        if let Some(role) = query.role {
            if self.role != role {
                return false;
            }
        }
        match query.search.as_deref().map(str::trim) {
            Some(search) if !search.is_empty() => {
                self.full_name
                    .to_lowercase()
                    .contains(&search.to_lowercase())
                    || self.nic.contains(search)
                    || self.nic.contains(&search.to_uppercase())
            }
            _ => true,
        }
    }
    pub async fn find_all() -> Result<Vec<Staff>, String> {
        let db: Database = get_db()?;
        let collection: Collection<Staff> = db.collection::<Staff>("staff");

        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();

        let mut staff: Vec<Staff> = Vec::new();
        let mut cursor = collection
            .find(doc! {}, options)
            .await
            .map_err(|_| "STAFF_NOT_FOUND".to_string())?;
        while let Some(Ok(member)) = cursor.next().await {
            staff.push(member);
        }
        Ok(staff)
    }
    pub async fn find_many(query: &StaffQuery) -> Result<Vec<StaffResponse>, String> {
        Ok(Self::find_all()
            .await?
            .iter()
            .filter(|member| member.matches(query))
            .filter_map(Staff::to_response)
            .collect())
    }
    async fn find_one(filter: Document) -> Result<Option<Staff>, String> {
        let db: Database = get_db()?;
        let collection: Collection<Staff> = db.collection::<Staff>("staff");

        collection
            .find_one(filter, None)
            .await
            .map_err(|_| "STAFF_NOT_FOUND".to_string())
    }
    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<Staff>, String> {
        Self::find_one(doc! { "_id": _id }).await
    }
    pub async fn find_by_email(email: &str) -> Result<Option<Staff>, String> {
        Self::find_one(doc! { "email": email.trim().to_lowercase() }).await
    }
    pub async fn find_by_nic(nic: &str) -> Result<Option<Staff>, String> {
        Self::find_one(doc! { "nic": nic.trim().to_uppercase() }).await
    }
    pub async fn update_profile(
        &mut self,
        request: StaffUpdateRequest,
        confirmed: bool,
    ) -> Result<ObjectId, String> {
        let _id = self._id.ok_or_else(|| "STAFF_NOT_FOUND".to_string())?;
        if !is_valid_name(&request.full_name) {
            return Err("STAFF_MUST_HAVE_VALID_NAME".to_string());
        }
        if !is_valid_phone(request.phone.trim()) {
            return Err("STAFF_MUST_HAVE_VALID_PHONE".to_string());
        }
        self.guard_in_work(confirmed)?;

        let db: Database = get_db()?;
        let collection: Collection<Staff> = db.collection::<Staff>("staff");

        let full_name = request.full_name.trim().to_string();
        let phone = request.phone.trim().to_string();
        collection
            .update_one(
                doc! { "_id": _id },
                doc! {
                    "$set": {
                        "full_name": &full_name,
                        "phone": &phone,
                        "specialization": mongodb::bson::to_bson(&request.specialization)
                            .map_err(|_| "SERIALIZATION_FAILED".to_string())?,
                    }
                },
                None,
            )
            .await
            .map_err(|_| "UPDATE_FAILED".to_string())?;

        self.full_name = full_name;
        self.phone = phone;
        self.specialization = request.specialization;
        events::publish(ChangeEvent::new(ChangeKind::Staff, &_id));
        Ok(_id)
    }
    /// Manual status change. In-Work is only entered through assignments.
    pub async fn update_status(
        &mut self,
        next: StaffStatusKind,
        confirmed: bool,
    ) -> Result<ObjectId, String> {
        let _id = self._id.ok_or_else(|| "STAFF_NOT_FOUND".to_string())?;
        if next == StaffStatusKind::InWork {
            return Err("STAFF_STATUS_NOT_ALLOWED".to_string());
        }
        if next == self.status {
            return Ok(_id);
        }
        self.guard_in_work(confirmed)?;

        let leaving_work = self.status == StaffStatusKind::InWork;
        let clear_assignment = leaving_work || next == StaffStatusKind::Available;

        let unlinked_team = if leaving_work {
            self.unlink_team(&_id).await?
        } else {
            None
        };

        let db: Database = get_db()?;
        let collection: Collection<Staff> = db.collection::<Staff>("staff");

        let mut update = doc! {
            "$set": {
                "status": mongodb::bson::to_bson(&next)
                    .map_err(|_| "SERIALIZATION_FAILED".to_string())?,
            }
        };
        if clear_assignment {
            update.insert(
                "$unset",
                doc! { "current_team_id": "", "current_report_id": "" },
            );
        }

        if let Err(error) = collection
            .update_one(doc! { "_id": _id }, update, None)
            .await
            .map_err(|_| "UPDATE_FAILED".to_string())
        {
            if let Some(team) = unlinked_team {
                Team::set_supervisor(&team, Some(_id))
                    .await
                    .map_err(|_| "TEAM_ROLLBACK_FAILED".to_string())?;
            }
            return Err(error);
        }

        tracing::info!(staff = %self.staff_id, ?next, "staff status changed");
        self.status = next;
        if clear_assignment {
            self.current_team_id = None;
            self.current_report_id = None;
        }
        events::publish(ChangeEvent::new(ChangeKind::Staff, &_id));
        Ok(_id)
    }
    pub async fn delete(&self, confirmed: bool) -> Result<u64, String> {
        let _id = self._id.ok_or_else(|| "STAFF_NOT_FOUND".to_string())?;
        self.guard_in_work(confirmed)?;

        let unlinked_team = self.unlink_team(&_id).await?;

        let db: Database = get_db()?;
        let collection: Collection<Staff> = db.collection::<Staff>("staff");

        match collection.delete_one(doc! { "_id": _id }, None).await {
            Ok(result) => {
                tracing::info!(staff = %self.staff_id, "staff removed");
                events::publish(ChangeEvent::new(ChangeKind::Staff, &_id));
                Ok(result.deleted_count)
            }
            Err(_) => {
                if let Some(team) = unlinked_team {
                    Team::set_supervisor(&team, Some(_id))
                        .await
                        .map_err(|_| "TEAM_ROLLBACK_FAILED".to_string())?;
                }
                Err("DELETION_FAILED".to_string())
            }
        }
    }
    /// Puts an available supervisor to work leading `team`.
    pub async fn occupy_for_team(_id: &ObjectId, team: &ObjectId) -> Result<ObjectId, String> {
        let db: Database = get_db()?;
        let collection: Collection<Staff> = db.collection::<Staff>("staff");

        let result = collection
            .update_one(
                doc! { "_id": _id, "status": "Available" },
                doc! { "$set": { "status": "In-Work", "current_team_id": team } },
                None,
            )
            .await
            .map_err(|_| "UPDATE_FAILED".to_string())?;
        if result.matched_count == 0 {
            return Err("STAFF_NOT_AVAILABLE".to_string());
        }
        events::publish(ChangeEvent::new(ChangeKind::Staff, _id));
        Ok(*_id)
    }
    /// Returns a member to the available pool.
    pub async fn relieve(_id: &ObjectId) -> Result<ObjectId, String> {
        let db: Database = get_db()?;
        let collection: Collection<Staff> = db.collection::<Staff>("staff");

        collection
            .update_one(
                doc! { "_id": _id },
                doc! {
                    "$set": { "status": "Available" },
                    "$unset": { "current_team_id": "", "current_report_id": "" },
                },
                None,
            )
            .await
            .map_err(|_| "UPDATE_FAILED".to_string())?;
        events::publish(ChangeEvent::new(ChangeKind::Staff, _id));
        Ok(*_id)
    }
    /// Points a working supervisor at the report their team was given.
    pub async fn link_report(_id: &ObjectId, report: &ObjectId) -> Result<ObjectId, String> {
        Self::set_report(_id, report_link_update(Some(report))).await
    }
    pub async fn unlink_report(_id: &ObjectId) -> Result<ObjectId, String> {
        Self::set_report(_id, report_link_update(None)).await
    }
    async fn set_report(_id: &ObjectId, update: Document) -> Result<ObjectId, String> {
        let db: Database = get_db()?;
        let collection: Collection<Staff> = db.collection::<Staff>("staff");

        let result = collection
            .update_one(doc! { "_id": _id }, update, None)
            .await
            .map_err(|_| "UPDATE_FAILED".to_string())?;
        if result.matched_count == 0 {
            return Err("STAFF_NOT_FOUND".to_string());
        }
        events::publish(ChangeEvent::new(ChangeKind::Staff, _id));
        Ok(*_id)
    }
    pub async fn work_context(&self) -> Result<StaffWorkContext, String> {
        let report = match &self.current_report_id {
            Some(report_id) => Report::find_by_id(report_id).await?,
            None => None,
        };
        Ok(self.describe_work(report.as_ref()))
    }
    pub fn describe_work(&self, report: Option<&Report>) -> StaffWorkContext {
        StaffWorkContext {
            error: "STAFF_IS_IN_WORK".to_string(),
            report_id: self.current_report_id.map(|_id| _id.to_hex()),
            location: report.map(Report::location_name),
            team_id: self.current_team_id.map(|_id| _id.to_hex()),
        }
    }
    fn guard_in_work(&self, confirmed: bool) -> Result<(), String> {
        if self.status == StaffStatusKind::InWork && !confirmed {
            return Err("STAFF_IS_IN_WORK".to_string());
        }
        Ok(())
    }
    async fn unlink_team(&self, _id: &ObjectId) -> Result<Option<ObjectId>, String> {
        if self.role != StaffRoleKind::Supervisor {
            return Ok(None);
        }
        match self.current_team_id {
            Some(team) if Team::unset_supervisor(&team, _id).await? => Ok(Some(team)),
            _ => Ok(None),
        }
    }
    pub fn to_response(&self) -> Option<StaffResponse> {
        Some(StaffResponse {
            _id: self._id?.to_hex(),
            staff_id: self.staff_id.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            nic: self.nic.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            dob: self.dob.clone(),
            role: self.role,
            specialization: self.specialization,
            status: self.status,
            current_report_id: self.current_report_id.map(|_id| _id.to_hex()),
            current_team_id: self.current_team_id.map(|_id| _id.to_hex()),
            created_at: self.created_at.timestamp_millis(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn member(name: &str, role: StaffRoleKind, status: StaffStatusKind) -> Staff {
        Staff {
            _id: Some(ObjectId::new()),
            staff_id: format!("{}-1000", role.prefix()),
            full_name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            nic: "200012345678".to_string(),
            phone: "0771234567".to_string(),
            address: "Colombo".to_string(),
            dob: "1990-01-01".to_string(),
            role,
            specialization: StaffSpecialization::Drainage,
            status,
            passcode: String::new(),
            current_report_id: None,
            current_team_id: None,
            created_at: DateTime::from_millis(0),
        }
    }

    fn request() -> StaffRequest {
        StaffRequest {
            full_name: "Nimal Perera".to_string(),
            nic: "901234567V".to_string(),
            email: "nimal@example.com".to_string(),
            phone: "+94771234567".to_string(),
            dob: "1990-05-20".to_string(),
            address: "Kandy".to_string(),
            role: StaffRoleKind::Worker,
            specialization: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    #[test]
    fn nic_accepts_old_and_new_formats() {
        assert!(is_valid_nic("901234567V"));
        assert!(is_valid_nic("901234567v"));
        assert!(is_valid_nic("199012345678"));
        assert!(!is_valid_nic("90123456V"));
        assert!(!is_valid_nic("1990123456789"));
        assert!(!is_valid_nic("901234567X"));
    }

    #[test]
    fn phone_accepts_sri_lankan_mobiles() {
        assert!(is_valid_phone("0771234567"));
        assert!(is_valid_phone("94711234567"));
        assert!(is_valid_phone("+94781234567"));
        assert!(is_valid_phone("771234567"));
        assert!(!is_valid_phone("0731234567"));
        assert!(!is_valid_phone("0112345678"));
        assert!(!is_valid_phone("07712345"));
    }

    #[test]
    fn email_requires_domain_with_dot() {
        assert!(is_valid_email("worker@rda.gov.lk"));
        assert!(!is_valid_email("worker@localhost"));
        assert!(!is_valid_email("wor ker@rda.lk"));
    }

    #[test]
    fn age_respects_birthday() {
        assert_eq!(age_on("2008-10-17", today()), Some(18));
        assert_eq!(age_on("2008-10-18", today()), Some(17));
        assert_eq!(age_on("not-a-date", today()), None);
    }

    #[test]
    fn request_validation_reports_first_failure() {
        assert_eq!(request().validate(today()), Ok(()));

        let mut short_name = request();
        short_name.full_name = "Al".to_string();
        assert_eq!(
            short_name.validate(today()),
            Err("STAFF_MUST_HAVE_VALID_NAME".to_string())
        );

        let mut minor = request();
        minor.dob = "2010-01-01".to_string();
        assert_eq!(
            minor.validate(today()),
            Err("STAFF_MUST_BE_ADULT".to_string())
        );

        let mut bad_phone = request();
        bad_phone.phone = "12345".to_string();
        assert_eq!(
            bad_phone.validate(today()),
            Err("STAFF_MUST_HAVE_VALID_PHONE".to_string())
        );
    }

    #[test]
    fn search_by_name_or_nic_within_role() {
        let subject = member("Kamal Silva", StaffRoleKind::Supervisor, StaffStatusKind::Available);

        let by_name = StaffQuery {
            role: Some(StaffRoleKind::Supervisor),
            search: Some("kamal".to_string()),
        };
        assert!(subject.matches(&by_name));

        let by_nic = StaffQuery {
            role: None,
            search: Some("20001234".to_string()),
        };
        assert!(subject.matches(&by_nic));

        let other_role = StaffQuery {
            role: Some(StaffRoleKind::Worker),
            search: None,
        };
        assert!(!subject.matches(&other_role));
    }

    #[test]
    fn statuses_use_directory_wire_names() {
        assert_eq!(
            serde_json::to_string(&StaffStatusKind::InWork).unwrap(),
            "\"In-Work\""
        );
        assert_eq!(
            serde_json::to_string(&StaffSpecialization::PotholeMaintenance).unwrap(),
            "\"Pothole Maintenance\""
        );
    }

    #[actix_web::test]
    async fn in_work_members_need_confirmation() {
        let mut busy = member("Sunil Fernando", StaffRoleKind::Worker, StaffStatusKind::InWork);
        assert_eq!(
            busy.update_status(StaffStatusKind::Away, false).await,
            Err("STAFF_IS_IN_WORK".to_string())
        );
        assert_eq!(busy.delete(false).await, Err("STAFF_IS_IN_WORK".to_string()));
    }

    #[actix_web::test]
    async fn in_work_cannot_be_set_manually() {
        let mut idle = member("Ruwan Jayasuriya", StaffRoleKind::Worker, StaffStatusKind::Away);
        assert_eq!(
            idle.update_status(StaffStatusKind::InWork, true).await,
            Err("STAFF_STATUS_NOT_ALLOWED".to_string())
        );
        let _id = idle._id.unwrap();
        assert_eq!(idle.update_status(StaffStatusKind::Away, false).await, Ok(_id));
    }

    #[test]
    fn work_context_names_the_assigned_report() {
        let mut lead = member("Kamal Silva", StaffRoleKind::Supervisor, StaffStatusKind::InWork);
        let job = crate::models::report::tests::report(
            "R-007",
            "Pothole",
            crate::models::report::ReportStatusKind::InProgress,
            0,
        );
        lead.current_report_id = job._id;
        lead.current_team_id = Some(ObjectId::new());

        let context = lead.describe_work(Some(&job));

        assert_eq!(context.error, "STAFF_IS_IN_WORK");
        assert_eq!(context.report_id, job._id.map(|_id| _id.to_hex()));
        assert_eq!(context.location.as_deref(), Some("Galle Road"));
        assert_eq!(context.team_id, lead.current_team_id.map(|_id| _id.to_hex()));
    }

    #[test]
    fn report_link_sets_and_clears_current_report() {
        let report = ObjectId::new();
        assert_eq!(
            report_link_update(Some(&report)),
            doc! { "$set": { "current_report_id": report } }
        );
        assert_eq!(
            report_link_update(None),
            doc! { "$unset": { "current_report_id": "" } }
        );
    }
}
