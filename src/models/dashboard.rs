use crate::database::get_db;
use chrono::{Duration, FixedOffset, NaiveDate, TimeZone};
use mongodb::{
    bson::{doc, DateTime, Document},
    Collection, Database,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    report::{Report, ReportResponse, ReportSummary},
    staff::{Staff, StaffRoleKind},
    team::{Team, TeamQuery, TeamResponse},
};

const RECENT_REPORTS: usize = 5;
const ACTIVITY_DAYS: i64 = 7;
const ACTIVE_TEAMS: usize = 5;
/// Sri Lanka Standard Time, UTC+05:30.
const LOCAL_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DailyActivity {
    pub date: String,
    pub count: usize,
}
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CategoryCount {
    pub name: String,
    pub value: usize,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct DashboardStats {
    pub total_community: u64,
    pub total_personnel: usize,
    pub total_reports: usize,
    pub resolved: usize,
    pub success_rate: u32,
    pub summary: ReportSummary,
    pub recent_reports: Vec<ReportResponse>,
    pub activity: Vec<DailyActivity>,
    pub categories: Vec<CategoryCount>,
    pub active_teams: Vec<TeamResponse>,
}

fn local_date(millis: i64) -> Option<NaiveDate> {
    let offset = FixedOffset::east_opt(LOCAL_OFFSET_SECONDS)?;
    offset
        .timestamp_millis_opt(millis)
        .single()
        .map(|time| time.date_naive())
}

pub fn success_rate(resolved: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((resolved as f64 / total as f64) * 100.0).round() as u32
}

/// Per-day report counts for the week ending `now`, oldest day first.
pub fn activity(reports: &[Report], now: i64) -> Vec<DailyActivity> {
    let today = match local_date(now) {
        Some(today) => today,
        None => return Vec::new(),
    };

    let mut counts: BTreeMap<NaiveDate, usize> = (0..ACTIVITY_DAYS)
        .map(|offset| (today - Duration::days(ACTIVITY_DAYS - 1 - offset), 0))
        .collect();
    for report in reports {
        if let Some(date) = local_date(report.created_at.timestamp_millis()) {
            if let Some(count) = counts.get_mut(&date) {
                *count += 1;
            }
        }
    }

    counts
        .into_iter()
        .map(|(date, count)| DailyActivity {
            date: date.format("%b %-d").to_string(),
            count,
        })
        .collect()
}

/// Reports per category, largest first; ties keep alphabetical order.
pub fn categories(reports: &[Report]) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for report in reports {
        let name = match report.category.trim() {
            "" => "Unknown".to_string(),
            category => category.to_string(),
        };
        *counts.entry(name).or_insert(0) += 1;
    }

    let mut categories: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(name, value)| CategoryCount { name, value })
        .collect();
    categories.sort_by(|a, b| b.value.cmp(&a.value));
    categories
}

impl DashboardStats {
    /// `reports` is expected newest first.
    pub fn compute(
        reports: &[Report],
        staff: &[Staff],
        teams: &[Team],
        total_community: u64,
        now: i64,
    ) -> Self {
        let summary = ReportSummary::count(reports);

        DashboardStats {
            total_community,
            total_personnel: staff
                .iter()
                .filter(|member| member.role == StaffRoleKind::Worker)
                .count(),
            total_reports: reports.len(),
            resolved: summary.resolved,
            success_rate: success_rate(summary.resolved, reports.len()),
            recent_reports: reports
                .iter()
                .filter_map(|report| report.to_response(now))
                .take(RECENT_REPORTS)
                .collect(),
            activity: activity(reports, now),
            categories: categories(reports),
            active_teams: teams
                .iter()
                .filter(|team| team.supervisor.is_some())
                .filter_map(Team::to_response)
                .take(ACTIVE_TEAMS)
                .collect(),
            summary,
        }
    }
    pub async fn load() -> Result<Self, String> {
        let reports = Report::find_all().await?;
        let staff = Staff::find_all().await?;
        let teams = Team::find_many(&TeamQuery::default()).await?;

        let db: Database = get_db()?;
        let users: Collection<Document> = db.collection::<Document>("users");
        let total_community = users
            .count_documents(doc! {}, None)
            .await
            .map_err(|_| "USER_COUNT_FAILED".to_string())?;

        Ok(Self::compute(
            &reports,
            &staff,
            &teams,
            total_community,
            DateTime::now().timestamp_millis(),
        ))
    }
}
