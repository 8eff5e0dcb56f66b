use crate::dtos::billing::{
    CheckoutRequest, CheckoutResponse, PlanLimitsResponse, SubscriptionStatusResponse,
    SyncResponse, WebhookAck,
};
use crate::middleware::AuthUser;
use crate::models::{Company, Plan, Role, SubscriptionUpdate};
use crate::services::metrics::record_webhook_event;
use crate::services::plan_limits::{LimitKind, PlanLimits};
use crate::services::stripe::{CheckoutParams, CompanyRef, StripeError};
use crate::AppState;
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

async fn load_company(state: &AppState, company_id: Uuid) -> Result<Company, AppError> {
    state
        .db
        .get_company(company_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))
}

/// Plans that can be bought through checkout.
fn checkout_plan(plan_id: &str) -> Option<Plan> {
    match plan_id.trim().to_uppercase().as_str() {
        "STARTER" => Some(Plan::Starter),
        "PRO" => Some(Plan::Pro),
        _ => None,
    }
}

#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn subscription_status(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<SubscriptionStatusResponse>, AppError> {
    user.require_role(&[Role::Admin])?;

    let company = load_company(&state, user.company_id).await?;
    Ok(Json(SubscriptionStatusResponse::from(company)))
}

#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn plan_limits(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PlanLimitsResponse>, AppError> {
    user.require_role(&[Role::Admin])?;

    let company = load_company(&state, user.company_id).await?;
    let usage = state.db.usage_counts(user.company_id).await?;
    let plan = company.plan();
    let limits = PlanLimits::for_plan(plan);

    Ok(Json(PlanLimitsResponse {
        plan: plan.as_str().to_string(),
        can_add_user: limits.allows(LimitKind::Users, &usage),
        can_add_project: limits.allows(LimitKind::Projects, &usage),
        limits,
        usage,
    }))
}

/// Start a Stripe Checkout session for a subscription plan.
#[instrument(skip_all, fields(company_id = %user.company_id, plan_id = %payload.plan_id))]
pub async fn create_checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    user.require_role(&[Role::Admin])?;

    if !state.stripe.is_configured() {
        return Err(StripeError::NotConfigured.into());
    }

    let plan = checkout_plan(&payload.plan_id)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Invalid plan")))?;
    let price_id = state
        .stripe
        .price_for(plan)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Invalid plan")))?
        .to_string();

    let company = load_company(&state, user.company_id).await?;

    let customer_id = match company.stripe_customer_id.clone().filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => {
            let customer = state
                .stripe
                .create_customer(&company.name, company.company_id)
                .await?;
            state
                .db
                .update_subscription(
                    company.company_id,
                    &SubscriptionUpdate {
                        stripe_customer_id: Some(customer.id.clone()),
                        ..Default::default()
                    },
                )
                .await?;
            customer.id
        }
    };

    let frontend = state.config.frontend_url.trim_end_matches('/');
    let success_url = format!(
        "{}/billing/success?session_id={{CHECKOUT_SESSION_ID}}",
        frontend
    );
    let cancel_url = format!("{}/billing/cancel", frontend);

    let session = state
        .stripe
        .create_checkout_session(&CheckoutParams {
            customer_id: &customer_id,
            price_id: &price_id,
            success_url: &success_url,
            cancel_url: &cancel_url,
            company_id: company.company_id,
            plan,
        })
        .await?;

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}

/// Stripe webhook receiver. Only signed events are processed.
#[instrument(skip_all)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let event = state.stripe.verify_and_parse(signature, &body).map_err(|e| {
        tracing::warn!(error = %e, "Rejected Stripe webhook");
        record_webhook_event("unknown", "rejected");
        AppError::from(e)
    })?;

    tracing::info!(event_id = %event.id, event_type = %event.event_type, "Stripe webhook received");

    let Some(change) = event.subscription_change() else {
        record_webhook_event(&event.event_type, "ignored");
        return Ok(Json(WebhookAck { received: true }));
    };

    let company_id = match &change.company {
        CompanyRef::Id(id) => Some(*id),
        CompanyRef::Subscription(subscription_id) => state
            .db
            .find_company_by_stripe_subscription(subscription_id)
            .await?
            .map(|company| company.company_id),
    };

    let updated = match company_id {
        Some(company_id) => state
            .db
            .update_subscription(company_id, &change.update)
            .await?
            .is_some(),
        None => false,
    };

    if updated {
        record_webhook_event(&event.event_type, "processed");
    } else {
        tracing::warn!(
            event_id = %event.id,
            company = ?change.company,
            "No company matches Stripe event"
        );
        record_webhook_event(&event.event_type, "unmatched");
    }

    Ok(Json(WebhookAck { received: true }))
}

/// Pull the current subscription status from Stripe.
#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn sync_subscription(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<SyncResponse>, AppError> {
    user.require_role(&[Role::Admin])?;

    let company = load_company(&state, user.company_id).await?;
    let Some(subscription_id) = company
        .stripe_subscription_id
        .as_deref()
        .filter(|id| !id.is_empty())
    else {
        return Ok(Json(SyncResponse {
            message: "No subscription to sync".to_string(),
            status: company.subscription_status,
        }));
    };

    let subscription = state.stripe.retrieve_subscription(subscription_id).await?;
    let status = subscription.status.to_uppercase();

    state
        .db
        .update_subscription(
            company.company_id,
            &SubscriptionUpdate {
                status: Some(status.clone()),
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(status = %status, "Subscription status synced");
    Ok(Json(SyncResponse {
        message: "Subscription status synced".to_string(),
        status,
    }))
}
