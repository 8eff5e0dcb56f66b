use crate::models::{Plan, UsageCounts};
use crate::services::Database;
use serde::Serialize;
use service_core::error::AppError;
use uuid::Uuid;

pub const PLAN_LIMIT_MESSAGE: &str = "Plan limit reached. Upgrade your plan to continue.";

/// Per-plan caps. `None` means unlimited and serializes as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    pub max_users: Option<i64>,
    pub max_projects: Option<i64>,
    pub max_documents: Option<i64>,
    pub max_tasks: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Users,
    Projects,
    Documents,
    Tasks,
}

impl PlanLimits {
    pub fn for_plan(plan: Plan) -> Self {
        match plan {
            Plan::Starter => Self {
                max_users: Some(5),
                max_projects: Some(10),
                max_documents: Some(100),
                max_tasks: Some(500),
            },
            Plan::Pro => Self {
                max_users: Some(25),
                max_projects: Some(100),
                max_documents: Some(1000),
                max_tasks: Some(5000),
            },
            Plan::Enterprise => Self {
                max_users: None,
                max_projects: None,
                max_documents: None,
                max_tasks: None,
            },
        }
    }

    pub fn limit(&self, kind: LimitKind) -> Option<i64> {
        match kind {
            LimitKind::Users => self.max_users,
            LimitKind::Projects => self.max_projects,
            LimitKind::Documents => self.max_documents,
            LimitKind::Tasks => self.max_tasks,
        }
    }

    pub fn allows(&self, kind: LimitKind, usage: &UsageCounts) -> bool {
        check_plan_limit(usage_for(usage, kind), self.limit(kind)).is_ok()
    }
}

fn usage_for(usage: &UsageCounts, kind: LimitKind) -> i64 {
    match kind {
        LimitKind::Users => usage.users,
        LimitKind::Projects => usage.projects,
        LimitKind::Documents => usage.documents,
        LimitKind::Tasks => usage.tasks,
    }
}

pub fn check_plan_limit(current: i64, limit: Option<i64>) -> Result<(), AppError> {
    match limit {
        Some(limit) if current >= limit => {
            Err(AppError::Forbidden(anyhow::anyhow!(PLAN_LIMIT_MESSAGE)))
        }
        _ => Ok(()),
    }
}

/// Reject creating one more `kind` row when the company is at its plan cap.
pub async fn enforce_plan_limit(
    db: &Database,
    company_id: Uuid,
    kind: LimitKind,
) -> Result<(), AppError> {
    let company = db
        .get_company(company_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;

    let usage = db.usage_counts(company_id).await?;
    let limits = PlanLimits::for_plan(company.plan());

    check_plan_limit(usage_for(&usage, kind), limits.limit(kind)).inspect_err(|_| {
        tracing::warn!(company_id = %company_id, ?kind, "Plan limit reached");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_plan_limit() {
        assert!(check_plan_limit(4, Some(5)).is_ok());
        assert!(matches!(
            check_plan_limit(5, Some(5)),
            Err(AppError::Forbidden(_))
        ));
        assert!(check_plan_limit(1_000_000, None).is_ok());
    }

    #[test]
    fn test_plan_tables() {
        let starter = PlanLimits::for_plan(Plan::Starter);
        assert_eq!(starter.limit(LimitKind::Tasks), Some(500));

        let pro = PlanLimits::for_plan(Plan::Pro);
        assert_eq!(pro.limit(LimitKind::Users), Some(25));
        assert_eq!(pro.limit(LimitKind::Documents), Some(1000));

        let enterprise = PlanLimits::for_plan(Plan::Enterprise);
        assert_eq!(enterprise.limit(LimitKind::Projects), None);
        assert_eq!(
            serde_json::to_value(enterprise).unwrap()["maxUsers"],
            serde_json::Value::Null
        );
    }

    #[test]
    fn test_allows_against_usage() {
        let usage = UsageCounts {
            users: 5,
            projects: 3,
            documents: 0,
            tasks: 0,
        };
        let starter = PlanLimits::for_plan(Plan::Starter);

        assert!(!starter.allows(LimitKind::Users, &usage));
        assert!(starter.allows(LimitKind::Projects, &usage));
    }
}
