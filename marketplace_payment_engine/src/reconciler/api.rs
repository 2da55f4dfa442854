use std::fmt::Debug;

use chrono::Duration;
use log::*;

use crate::{
    db_types::{ListingStatus, RequestStatus, SubscriptionStatus, SubscriptionTier, SubscriptionUpdate, VendorContact},
    provider_events::{CheckoutMetadata, PaymentEvent, PaymentEventKind, ProviderSubscriptionStatus},
    reconciler::ReconciliationError,
    traits::{ClaimOutcome, EventLedger, MarketplaceStore},
};

/// What happened to an event, from the provider's point of view. All three variants are
/// acknowledged as success so the provider stops redelivering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Entity state was (or may have been) changed by this delivery.
    Applied,
    /// The event id was already processed, or another worker holds a live claim on it.
    Duplicate,
    /// The event was intentionally not applied: an unknown family, a stale lifecycle update, a
    /// transition from an unexpected state, or a lifecycle event for a company we no longer
    /// track. Logged, never an error.
    Ignored,
}

/// `ReconcilerApi` is the single entry point for applying verified provider events to
/// marketplace state.
///
/// The flow for every event is: ledger claim -> route to the handler for the event family ->
/// conditional entity writes -> ledger commit (or release on failure). Handlers are re-entrant
/// safe: the ledger gives best-effort, not guaranteed, exactly-once semantics, so every entity
/// mutation is a compare-and-swap that detects "already applied" on redelivery.
pub struct ReconcilerApi<B> {
    db: B,
    /// How long an uncommitted ledger claim shadows redeliveries of the same event.
    lease: Duration,
}

impl<B> Debug for ReconcilerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconcilerApi")
    }
}

impl<B> ReconcilerApi<B> {
    pub fn new(db: B, lease: Duration) -> Self {
        Self { db, lease }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> ReconcilerApi<B>
where B: MarketplaceStore + EventLedger
{
    /// Apply a verified event exactly once (best effort), returning how it was disposed of.
    ///
    /// On handler failure the claim is released and the error propagates, so the caller can
    /// surface a retryable status to the provider.
    pub async fn process_event(&self, event: PaymentEvent) -> Result<EventOutcome, ReconciliationError> {
        if let PaymentEventKind::Unknown(family) = &event.kind {
            // Intentionally ignored families must still be acknowledged as success, otherwise
            // the provider keeps retrying them forever.
            info!("🔁️ Ignoring event {} with unhandled family '{family}'", event.id);
            return Ok(EventOutcome::Ignored);
        }
        match self.db.try_claim(&event.id, self.lease).await? {
            ClaimOutcome::AlreadyProcessed => {
                debug!("🔁️ Event {} has already been processed. Acknowledging duplicate.", event.id);
                return Ok(EventOutcome::Duplicate);
            },
            ClaimOutcome::InFlight => {
                debug!("🔁️ Event {} is being processed by another worker. Acknowledging.", event.id);
                return Ok(EventOutcome::Duplicate);
            },
            ClaimOutcome::Claimed => {},
        }
        match self.apply(&event).await {
            Ok(outcome) => {
                self.db.commit(&event.id).await?;
                debug!("🔁️ Event {} ({}) committed: {outcome:?}", event.id, event.kind.family());
                Ok(outcome)
            },
            Err(e) => {
                if let Err(release_err) = self.db.release(&event.id).await {
                    // The lease will expire on its own; losing the release only delays the retry.
                    warn!("🔁️ Could not release claim for event {}: {release_err}", event.id);
                }
                Err(e)
            },
        }
    }

    async fn apply(&self, event: &PaymentEvent) -> Result<EventOutcome, ReconciliationError> {
        match &event.kind {
            PaymentEventKind::CheckoutCompleted(CheckoutMetadata::Subscription {
                company_id,
                customer_ref,
                subscription_ref,
            }) => self.activate_subscription(event, *company_id, customer_ref, subscription_ref).await,
            PaymentEventKind::CheckoutCompleted(CheckoutMetadata::MatchmakingFee {
                request_id,
                company_id,
                vendor_id,
                listing_id,
            }) => self.finalize_deal(*request_id, *company_id, *vendor_id, *listing_id).await,
            PaymentEventKind::SubscriptionUpdated { subscription_ref, status, current_period_end } => {
                self.subscription_updated(event, subscription_ref, status, *current_period_end).await
            },
            PaymentEventKind::SubscriptionDeleted { subscription_ref } => {
                self.subscription_deleted(event, subscription_ref).await
            },
            PaymentEventKind::InvoicePaymentFailed { subscription_ref } => {
                self.invoice_payment_failed(event, subscription_ref.as_deref()).await
            },
            PaymentEventKind::Unknown(_) => unreachable!("unknown families are filtered in process_event"),
        }
    }

    /// Checkout-Completed / Subscription: the company's first (or renewed) subscription charge
    /// has cleared. Activation is idempotent; re-applying the same target state is a no-op at
    /// the row level.
    async fn activate_subscription(
        &self,
        event: &PaymentEvent,
        company_id: i64,
        customer_ref: &Option<String>,
        subscription_ref: &Option<String>,
    ) -> Result<EventOutcome, ReconciliationError> {
        self.db
            .fetch_company(company_id)
            .await?
            .ok_or(ReconciliationError::CompanyNotFound(company_id))?;
        let mut update = SubscriptionUpdate::default()
            .with_status(SubscriptionStatus::Active)
            .with_tier(SubscriptionTier::Buyer);
        if let Some(customer_ref) = customer_ref {
            update = update.with_customer_ref(customer_ref);
        }
        if let Some(subscription_ref) = subscription_ref {
            update = update.with_subscription_ref(subscription_ref);
        }
        let changed = self.db.update_company_subscription(company_id, update, event.created).await?;
        if changed {
            info!("🔁️💳️ Subscription activated for company #{company_id}");
            Ok(EventOutcome::Applied)
        } else {
            info!("🔁️💳️ Stale subscription checkout for company #{company_id} ignored");
            Ok(EventOutcome::Ignored)
        }
    }

    /// Checkout-Completed / Matchmaking-Fee: the deal finalization workflow.
    ///
    /// Each sub-step is independently idempotent and safely retriable; perfect atomicity across
    /// the four entities is deliberately not assumed. If the request is already `Accepted`, the
    /// one-shot side effects (disclosure message, founding-deal decrement) are skipped, but any
    /// sub-step that is detectably unfinished, such as a listing still `Available` after a crash,
    /// is completed on redelivery.
    async fn finalize_deal(
        &self,
        request_id: i64,
        buyer_id: i64,
        vendor_id: i64,
        listing_id: Option<i64>,
    ) -> Result<EventOutcome, ReconciliationError> {
        let details = self
            .db
            .fetch_request_with_relations(request_id)
            .await?
            .ok_or(ReconciliationError::RequestNotFound(request_id))?;
        if details.vendor.company_id != vendor_id {
            warn!(
                "🔁️🤝️ Matchmaking fee for request #{request_id} names vendor #{vendor_id}, but the request belongs \
                 to vendor #{}. Proceeding with the request's own vendor.",
                details.vendor.company_id
            );
        }
        // Step 3: PENDING -> ACCEPTED, exactly once. `accepted_now` gates the one-shot steps.
        let accepted_now =
            self.db.update_request_status(request_id, RequestStatus::Pending, RequestStatus::Accepted).await?;
        if !accepted_now && details.request.status != RequestStatus::Accepted {
            // Declined or cancelled in the meantime. The conditional update makes the bad
            // transition physically impossible to apply; log and move on.
            warn!(
                "🔁️🤝️ Request #{request_id} is {} and cannot be accepted. Event acknowledged as a no-op.",
                details.request.status
            );
            return Ok(EventOutcome::Ignored);
        }
        // Step 4: book the listing. Monotonic, so a redelivery that finds it booked is a no-op,
        // and a redelivery that finds it still available (earlier crash) completes it.
        if let Some(listing_id) = listing_id {
            let booked =
                self.db.update_listing_status(listing_id, ListingStatus::Available, ListingStatus::Booked).await?;
            if booked {
                info!("🔁️🤝️ Listing #{listing_id} booked for request #{request_id}");
            } else {
                trace!("🔁️🤝️ Listing #{listing_id} was already booked");
            }
        }
        if accepted_now {
            // Step 5: disclose the vendor's contact details, once per accepted request.
            let content = disclosure_message(&details.vendor);
            self.db.append_system_message(details.request.conversation_id, &content).await?;
            // Step 6: burn one founding-member deal, if applicable. The store-level guard keeps
            // the counter non-negative even if this branch were ever re-entered.
            let decremented = self.db.decrement_founding_deals(buyer_id).await?;
            if decremented {
                debug!("🔁️🤝️ Founding member #{buyer_id} used one matchmaking deal");
            }
            info!("🔁️🤝️ Deal finalized for request #{request_id}: contact details disclosed to buyer #{buyer_id}");
        } else {
            debug!("🔁️🤝️ Request #{request_id} was already accepted. One-shot steps skipped.");
        }
        Ok(EventOutcome::Applied)
    }

    /// Subscription-Updated: map the provider's status vocabulary onto the internal lifecycle
    /// and refresh the period end. Stale (out-of-order) events are rejected by the store-level
    /// timestamp guard and acknowledged as ignored.
    async fn subscription_updated(
        &self,
        event: &PaymentEvent,
        subscription_ref: &str,
        status: &ProviderSubscriptionStatus,
        current_period_end: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<EventOutcome, ReconciliationError> {
        let Some(company) = self.db.fetch_company_by_subscription_ref(subscription_ref).await? else {
            info!("🔁️📋️ Subscription update for unknown reference '{subscription_ref}'. Ignoring.");
            return Ok(EventOutcome::Ignored);
        };
        let mut update = match status {
            ProviderSubscriptionStatus::Active => SubscriptionUpdate::default()
                .with_status(SubscriptionStatus::Active)
                .with_tier(SubscriptionTier::Buyer),
            ProviderSubscriptionStatus::PastDue => SubscriptionUpdate::default()
                .with_status(SubscriptionStatus::PastDue)
                .with_tier(SubscriptionTier::Buyer),
            ProviderSubscriptionStatus::Canceled | ProviderSubscriptionStatus::Unpaid => SubscriptionUpdate::default()
                .with_status(SubscriptionStatus::Cancelled)
                .with_tier(SubscriptionTier::Free)
                .clearing_subscription_ref(),
            ProviderSubscriptionStatus::Other(s) => {
                info!("🔁️📋️ Unmapped provider subscription status '{s}' for company #{}. Ignoring.", company.id);
                return Ok(EventOutcome::Ignored);
            },
        };
        if let Some(ends_at) = current_period_end {
            update = update.with_ends_at(ends_at);
        }
        let changed = self.db.update_company_subscription(company.id, update, event.created).await?;
        if changed {
            info!("🔁️📋️ Subscription for company #{} is now {status:?}", company.id);
            Ok(EventOutcome::Applied)
        } else {
            info!("🔁️📋️ Stale subscription update for company #{} ignored", company.id);
            Ok(EventOutcome::Ignored)
        }
    }

    /// Subscription-Deleted: the subscription has ended for good. Tier reverts to Free and the
    /// provider references are cleared, as the tier invariant requires.
    async fn subscription_deleted(
        &self,
        event: &PaymentEvent,
        subscription_ref: &str,
    ) -> Result<EventOutcome, ReconciliationError> {
        let Some(company) = self.db.fetch_company_by_subscription_ref(subscription_ref).await? else {
            info!("🔁️📋️ Subscription deletion for unknown reference '{subscription_ref}'. Ignoring.");
            return Ok(EventOutcome::Ignored);
        };
        let update = SubscriptionUpdate::default()
            .with_status(SubscriptionStatus::Cancelled)
            .with_tier(SubscriptionTier::Free)
            .clearing_subscription_ref()
            .clearing_ends_at();
        let changed = self.db.update_company_subscription(company.id, update, event.created).await?;
        if changed {
            info!("🔁️📋️ Subscription cancelled for company #{}", company.id);
            Ok(EventOutcome::Applied)
        } else {
            info!("🔁️📋️ Stale subscription deletion for company #{} ignored", company.id);
            Ok(EventOutcome::Ignored)
        }
    }

    /// Invoice-Payment-Failed: a recurring charge bounced. A missing match is logged, not an
    /// error; the company may have already cancelled.
    async fn invoice_payment_failed(
        &self,
        event: &PaymentEvent,
        subscription_ref: Option<&str>,
    ) -> Result<EventOutcome, ReconciliationError> {
        let Some(subscription_ref) = subscription_ref else {
            info!("🔁️📋️ Failed invoice without a subscription reference. Nothing to do.");
            return Ok(EventOutcome::Ignored);
        };
        let Some(company) = self.db.fetch_company_by_subscription_ref(subscription_ref).await? else {
            info!("🔁️📋️ Failed invoice for unknown subscription '{subscription_ref}'. The company may have cancelled.");
            return Ok(EventOutcome::Ignored);
        };
        let update = SubscriptionUpdate::default().with_status(SubscriptionStatus::PastDue);
        let changed = self.db.update_company_subscription(company.id, update, event.created).await?;
        if changed {
            warn!("🔁️📋️ Company #{} is past due after a failed invoice payment", company.id);
            Ok(EventOutcome::Applied)
        } else {
            info!("🔁️📋️ Stale failed-invoice event for company #{} ignored", company.id);
            Ok(EventOutcome::Ignored)
        }
    }
}

/// Assemble the contact disclosure posted into the conversation when a deal is finalized.
/// Whichever of email, phone and name are present are included, in that order of preference.
fn disclosure_message(vendor: &VendorContact) -> String {
    let mut parts = Vec::new();
    if let Some(email) = &vendor.email {
        parts.push(format!("email: {email}"));
    }
    if let Some(phone) = &vendor.phone {
        parts.push(format!("phone: {phone}"));
    }
    if let Some(name) = &vendor.name {
        parts.push(format!("contact: {name}"));
    }
    if parts.is_empty() {
        "Your deal has been finalized. The vendor will reach out to you shortly.".to_string()
    } else {
        format!("Your deal has been finalized. You can reach the vendor directly. {}", parts.join(", "))
    }
}
