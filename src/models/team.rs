use crate::{
    database::{get_db, insert_error},
    events::{self, ChangeEvent, ChangeKind},
};
use futures::stream::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime, Document},
    options::FindOptions,
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{
    credential::{generate_code, generate_passcode, hash_passcode, MAX_ATTEMPTS},
    staff::{Staff, StaffRoleKind},
};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum TeamCategory {
    Pothole,
    Drainage,
    Signage,
    Streetlight,
}
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum TeamStatusKind {
    Available,
    Busy,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Team {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub team_id: String,
    pub name: String,
    pub category: TeamCategory,
    pub status: TeamStatusKind,
    pub passcode: String,
    pub supervisor: Option<ObjectId>,
    /// Derived from staff on read, never stored.
    #[serde(default, skip_serializing)]
    pub member_count: i32,
    pub created_at: DateTime,
}
#[derive(Debug, Default, Deserialize)]
pub struct TeamQuery {
    pub category: Option<TeamCategory>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct TeamRequest {
    pub name: String,
    pub category: TeamCategory,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct TeamSupervisorRequest {
    pub staff: String,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct TeamResponse {
    pub _id: String,
    pub team_id: String,
    pub name: String,
    pub category: TeamCategory,
    pub status: TeamStatusKind,
    pub supervisor: Option<String>,
    pub member_count: i32,
    pub created_at: i64,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct TeamCreatedResponse {
    pub _id: String,
    pub team_id: String,
    pub passcode: String,
}

impl TeamCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamCategory::Pothole => "Pothole",
            TeamCategory::Drainage => "Drainage",
            TeamCategory::Signage => "Signage",
            TeamCategory::Streetlight => "Streetlight",
        }
    }
}

impl Team {
    pub async fn create(request: TeamRequest) -> Result<TeamCreatedResponse, String> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err("TEAM_MUST_HAVE_NAME".to_string());
        }

        let team_id = Self::unique_team_id().await?;
        let passcode = generate_passcode();

        let mut team = Team {
            _id: None,
            team_id: team_id.clone(),
            name: name.to_string(),
            category: request.category,
            status: TeamStatusKind::Available,
            passcode: hash_passcode(&passcode)?,
            supervisor: None,
            member_count: 0,
            created_at: DateTime::now(),
        };
        let _id = team.save().await?;
        tracing::info!(team = %team_id, "team created");

        Ok(TeamCreatedResponse {
            _id: _id.to_hex(),
            team_id,
            passcode,
        })
    }
    async fn unique_team_id() -> Result<String, String> {
        for _ in 0..MAX_ATTEMPTS {
            let team_id = generate_code("T");
            if Self::find_by_team_id(&team_id).await?.is_none() {
                return Ok(team_id);
            }
        }
        Err("TEAM_ID_EXHAUSTED".to_string())
    }
    async fn save(&mut self) -> Result<ObjectId, String> {
        let db: Database = get_db()?;
        let collection: Collection<Team> = db.collection::<Team>("teams");

        self._id = Some(ObjectId::new());

        let _id = collection
            .insert_one(&*self, None)
            .await
            .map_err(|error| insert_error(&error, "TEAM_ALREADY_EXIST"))?
            .inserted_id
            .as_object_id()
            .ok_or_else(|| "INSERTING_FAILED".to_string())?;

        events::publish(ChangeEvent::new(ChangeKind::Team, &_id));
        Ok(_id)
    }
    pub async fn find_many(query: &TeamQuery) -> Result<Vec<Team>, String> {
        let db: Database = get_db()?;
        let collection: Collection<Team> = db.collection::<Team>("teams");

        let mut filter = Document::new();
        if let Some(category) = query.category {
            filter.insert("category", category.as_str());
        }
        let options = FindOptions::builder().sort(doc! { "team_id": 1 }).build();

        let mut teams: Vec<Team> = Vec::new();
        let mut cursor = collection
            .find(filter, options)
            .await
            .map_err(|_| "TEAM_NOT_FOUND".to_string())?;
        while let Some(Ok(team)) = cursor.next().await {
            teams.push(team);
        }

        let staff = Staff::find_all().await?;
        for team in teams.iter_mut() {
            team.count_members(&staff);
        }
        Ok(teams)
    }
    pub fn count_members(&mut self, staff: &[Staff]) {
        self.member_count = staff
            .iter()
            .filter(|member| member.current_team_id.is_some() && member.current_team_id == self._id)
            .count() as i32;
    }
    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<Team>, String> {
        let db: Database = get_db()?;
        let collection: Collection<Team> = db.collection::<Team>("teams");

        collection
            .find_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| "TEAM_NOT_FOUND".to_string())
    }
    pub async fn find_by_team_id(team_id: &str) -> Result<Option<Team>, String> {
        let db: Database = get_db()?;
        let collection: Collection<Team> = db.collection::<Team>("teams");

        collection
            .find_one(doc! { "team_id": team_id }, None)
            .await
            .map_err(|_| "TEAM_NOT_FOUND".to_string())
    }
    /// Marks an available team busy; fails if another report got there first.
    pub async fn occupy(_id: &ObjectId) -> Result<ObjectId, String> {
        let db: Database = get_db()?;
        let collection: Collection<Team> = db.collection::<Team>("teams");

        let result = collection
            .update_one(
                doc! { "_id": _id, "status": "Available" },
                doc! { "$set": { "status": "Busy" } },
                None,
            )
            .await
            .map_err(|_| "UPDATE_FAILED".to_string())?;
        if result.matched_count == 0 {
            return Err("TEAM_IS_BUSY".to_string());
        }
        events::publish(ChangeEvent::new(ChangeKind::Team, _id));
        Ok(*_id)
    }
    pub async fn release(_id: &ObjectId) -> Result<ObjectId, String> {
        let db: Database = get_db()?;
        let collection: Collection<Team> = db.collection::<Team>("teams");

        let result = collection
            .update_one(
                doc! { "_id": _id },
                doc! { "$set": { "status": "Available" } },
                None,
            )
            .await
            .map_err(|_| "UPDATE_FAILED".to_string())?;
        if result.matched_count == 0 {
            return Err("TEAM_NOT_FOUND".to_string());
        }
        events::publish(ChangeEvent::new(ChangeKind::Team, _id));
        Ok(*_id)
    }
    pub async fn set_supervisor(
        _id: &ObjectId,
        supervisor: Option<ObjectId>,
    ) -> Result<ObjectId, String> {
        let db: Database = get_db()?;
        let collection: Collection<Team> = db.collection::<Team>("teams");

        let result = collection
            .update_one(
                doc! { "_id": _id },
                doc! { "$set": { "supervisor": supervisor } },
                None,
            )
            .await
            .map_err(|_| "UPDATE_FAILED".to_string())?;
        if result.matched_count == 0 {
            return Err("TEAM_NOT_FOUND".to_string());
        }
        events::publish(ChangeEvent::new(ChangeKind::Team, _id));
        Ok(*_id)
    }
    /// Clears the supervisor only while it is still `supervisor`.
    pub async fn unset_supervisor(_id: &ObjectId, supervisor: &ObjectId) -> Result<bool, String> {
        let db: Database = get_db()?;
        let collection: Collection<Team> = db.collection::<Team>("teams");

        let result = collection
            .update_one(
                doc! { "_id": _id, "supervisor": supervisor },
                doc! { "$set": { "supervisor": null } },
                None,
            )
            .await
            .map_err(|_| "UPDATE_FAILED".to_string())?;
        if result.matched_count > 0 {
            events::publish(ChangeEvent::new(ChangeKind::Team, _id));
        }
        Ok(result.matched_count > 0)
    }
    /// Hands the team to `staff`, relieving the previous supervisor.
    pub async fn assign_supervisor(&mut self, staff: &Staff) -> Result<ObjectId, String> {
        let _id = self._id.ok_or_else(|| "TEAM_NOT_FOUND".to_string())?;
        let staff_id = staff._id.ok_or_else(|| "STAFF_NOT_FOUND".to_string())?;

        if staff.role != StaffRoleKind::Supervisor {
            return Err("STAFF_NOT_SUPERVISOR".to_string());
        }
        if self.supervisor == Some(staff_id) {
            return Ok(_id);
        }

        let previous = self.supervisor;

        Staff::occupy_for_team(&staff_id, &_id).await?;

        if let Err(error) = Self::set_supervisor(&_id, Some(staff_id)).await {
            Staff::relieve(&staff_id)
                .await
                .map_err(|_| "STAFF_ROLLBACK_FAILED".to_string())?;
            return Err(error);
        }

        if let Some(previous) = previous {
            if let Err(error) = Staff::relieve(&previous).await {
                tracing::error!(team = %self.team_id, %error, "previous supervisor was not relieved");
                Self::set_supervisor(&_id, Some(previous))
                    .await
                    .map_err(|_| "TEAM_ROLLBACK_FAILED".to_string())?;
                Staff::relieve(&staff_id)
                    .await
                    .map_err(|_| "STAFF_ROLLBACK_FAILED".to_string())?;
                return Err(error);
            }
        }

        tracing::info!(team = %self.team_id, supervisor = %staff.staff_id, "supervisor assigned");
        self.supervisor = Some(staff_id);
        Ok(_id)
    }
    pub async fn delete(&self) -> Result<u64, String> {
        let _id = self._id.ok_or_else(|| "TEAM_NOT_FOUND".to_string())?;
        if self.status == TeamStatusKind::Busy {
            return Err("TEAM_IS_BUSY".to_string());
        }

        if let Some(supervisor) = self.supervisor {
            Staff::relieve(&supervisor).await?;
        }

        let db: Database = get_db()?;
        let collection: Collection<Team> = db.collection::<Team>("teams");

        match collection.delete_one(doc! { "_id": _id, "status": "Available" }, None).await {
            Ok(result) if result.deleted_count > 0 => {
                tracing::info!(team = %self.team_id, "team disbanded");
                events::publish(ChangeEvent::new(ChangeKind::Team, &_id));
                Ok(result.deleted_count)
            }
            outcome => {
                if let Some(supervisor) = self.supervisor {
                    Staff::occupy_for_team(&supervisor, &_id)
                        .await
                        .map_err(|_| "STAFF_ROLLBACK_FAILED".to_string())?;
                }
                match outcome {
                    Ok(_) => Err("TEAM_IS_BUSY".to_string()),
                    Err(_) => Err("DELETION_FAILED".to_string()),
                }
            }
        }
    }
    pub fn to_response(&self) -> Option<TeamResponse> {
        Some(TeamResponse {
            _id: self._id?.to_hex(),
            team_id: self.team_id.clone(),
            name: self.name.clone(),
            category: self.category,
            status: self.status,
            supervisor: self.supervisor.map(|_id| _id.to_hex()),
            member_count: self.member_count,
            created_at: self.created_at.timestamp_millis(),
        })
    }
}
