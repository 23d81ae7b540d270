// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Agent application review workflow.
//!
//! Approve and Reject are locked, double-checked state transitions with a
//! settlement step against the external ledger:
//!
//! 1. advisory load + input guards (fail fast before paying for the lock)
//! 2. per-member lock with bounded wait
//! 3. re-read under the lock (the authoritative check)
//! 4. role + status committed in one local transaction
//! 5. escrow release for the direction/outcome pairs that owe a refund,
//!    idempotent by application-derived transaction id
//! 6. `released_at` stamp, compare-and-set
//!
//! The release and its stamp are deliberately outside the transaction in
//! step 4: a remote call cannot be atomic with a local write. A failure
//! after step 4 leaves a terminal status with no stamp; re-issuing the same
//! call takes the idempotent path through step 3 and retries the release,
//! which the compare-and-set stamp and the ledger's duplicate detection
//! make safe.
//!
//! The lock is scoped per member, not per application: the member role
//! mutation is the shared resource at risk of a lost update. The
//! predicate-guarded writes in the repository are an independent second
//! layer, protecting both fields even if a lock expires early.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::ledger::{LedgerClient, LedgerError, ReleaseReason, ReleaseRequest};
use crate::lock::LockService;
use crate::storage::database::{AdminDatabase, AdminDbError};
use crate::storage::repository::applications::{
    ApplicationRepository, ApplicationStatus, Direction, ReviewUpdate, StoredApplication,
};
use crate::storage::repository::members::MemberRole;

/// How long an Approve/Reject waits for the per-member lock.
const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);

fn agent_apply_lock_key(member_id: i64) -> String {
    format!("lock:agent-apply:{member_id}")
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("application {0} not found")]
    NotFound(i64),

    #[error("wrong status {0}")]
    WrongStatus(ApplicationStatus),

    #[error("freeze ID lost")]
    MissingFreeze,

    #[error("review lock unavailable for member {0}")]
    LockUnavailable(i64),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Storage(#[from] AdminDbError),

    #[error("update release time error: {0}")]
    ReleaseStamp(#[source] AdminDbError),
}

/// Review workflow engine.
pub struct ReviewService {
    db: Arc<AdminDatabase>,
    locks: Arc<LockService>,
    ledger: Arc<dyn LedgerClient>,
    lock_wait: Duration,
}

impl ReviewService {
    pub fn new(
        db: Arc<AdminDatabase>,
        locks: Arc<LockService>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        Self {
            db,
            locks,
            ledger,
            lock_wait: DEFAULT_LOCK_WAIT,
        }
    }

    /// Override the lock wait; used to keep contention tests fast.
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    /// The review queue, newest first, with the total count.
    pub fn list(&self, page: usize, size: usize) -> Result<(Vec<StoredApplication>, u64), ReviewError> {
        Ok(ApplicationRepository::new(&self.db).get_list(page, size)?)
    }

    /// Approve an application, promoting/demoting the member and refunding
    /// the deposit when the direction owes one (ToMember only).
    pub async fn approve(&self, admin_id: i64, application_id: i64) -> Result<(), ReviewError> {
        self.review(admin_id, application_id, ApplicationStatus::Approved, String::new())
            .await
    }

    /// Reject an application with a reason, refunding the deposit when the
    /// direction owes one (ToAgent only).
    pub async fn reject(
        &self,
        admin_id: i64,
        application_id: i64,
        reason: &str,
    ) -> Result<(), ReviewError> {
        if reason.trim().is_empty() {
            return Err(ReviewError::Validation("empty reject reason"));
        }
        self.review(admin_id, application_id, ApplicationStatus::Rejected, reason.to_string())
            .await
    }

    async fn review(
        &self,
        admin_id: i64,
        application_id: i64,
        target: ApplicationStatus,
        reject_reason: String,
    ) -> Result<(), ReviewError> {
        if admin_id <= 0 {
            return Err(ReviewError::Validation("empty admin ID"));
        }
        if application_id <= 0 {
            return Err(ReviewError::Validation("empty application ID"));
        }

        let repo = ApplicationRepository::new(&self.db);

        // Advisory read: fail fast on missing data before locking.
        let advisory = repo
            .get_one(application_id)?
            .ok_or(ReviewError::NotFound(application_id))?;
        if advisory.member_id <= 0 {
            return Err(ReviewError::Validation("empty member ID"));
        }

        let _guard = self
            .locks
            .acquire(&agent_apply_lock_key(advisory.member_id), self.lock_wait)
            .await
            .ok_or(ReviewError::LockUnavailable(advisory.member_id))?;

        // Double check: the re-read under the lock is the authority; a
        // concurrent review for the same member may have landed between
        // the advisory read and lock acquisition.
        let application = repo
            .get_one(application_id)?
            .ok_or(ReviewError::NotFound(application_id))?;

        let needs_transition = if application.status == target {
            // Legitimate retry; fall through so an unfinished release
            // (released_at still null) gets another attempt.
            false
        } else if application.status != ApplicationStatus::Reviewing {
            return Err(ReviewError::WrongStatus(application.status));
        } else {
            true
        };
        if application.freeze_id <= 0 {
            return Err(ReviewError::MissingFreeze);
        }

        let now = Utc::now();
        if needs_transition {
            let update = ReviewUpdate {
                id: application.id,
                status: target,
                reviewed_by: admin_id,
                reviewed_at: now,
                reject_reason,
            };
            match target {
                ApplicationStatus::Approved => {
                    // Role and status commit together or not at all.
                    let role = match application.direction {
                        Direction::ToAgent => MemberRole::Agent,
                        Direction::ToMember => MemberRole::Member,
                    };
                    repo.reviewed_with_role(application.member_id, role, &update)?;
                }
                _ => {
                    repo.reviewed(&update)?;
                }
            }
            tracing::info!(
                admin_id,
                application_id,
                member_id = application.member_id,
                status = %target,
                "application reviewed"
            );
        }

        if refund_due(application.direction, target) && application.released_at.is_none() {
            self.release_escrow(&application, target).await?;
        }
        Ok(())
    }

    async fn release_escrow(
        &self,
        application: &StoredApplication,
        outcome: ApplicationStatus,
    ) -> Result<(), ReviewError> {
        let (reason, desc) = match outcome {
            ApplicationStatus::Approved => (
                ReleaseReason::ApplyToMemberRefund,
                "agent reverting to member, deposit refunded on approval",
            ),
            _ => (
                ReleaseReason::ApplyToAgentReject,
                "agent application rejected, deposit refunded",
            ),
        };

        // Zero delta means "release everything still held"; the tx id is
        // derived from the application so the ledger detects duplicates.
        let outcome = self
            .ledger
            .release(&ReleaseRequest {
                freeze_id: application.freeze_id,
                delta: Decimal::ZERO,
                reason,
                tx_id: application.id.to_string(),
                desc: desc.to_string(),
            })
            .await?;
        tracing::info!(
            application_id = application.id,
            freeze_id = application.freeze_id,
            ?outcome,
            "escrow released"
        );

        // Funds have moved by now; a failed stamp is surfaced so an
        // operator can reconcile, but the stamp's compare-and-set keeps a
        // later retry harmless.
        ApplicationRepository::new(&self.db)
            .release(application.id, Utc::now())
            .map_err(ReviewError::ReleaseStamp)?;
        Ok(())
    }
}

/// The direction/outcome pairs that owe a refund.
///
/// Entering agent-hood consumes the deposit, so approving ToAgent keeps the
/// freeze; every path where the applicant does not end up (or stay) a
/// paying agent returns it.
fn refund_due(direction: Direction, outcome: ApplicationStatus) -> bool {
    matches!(
        (direction, outcome),
        (Direction::ToMember, ApplicationStatus::Approved)
            | (Direction::ToAgent, ApplicationStatus::Rejected)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ReleaseOutcome;
    use crate::storage::repository::members::{MemberRepository, StoredMember};
    use std::sync::Mutex;

    enum LedgerBehavior {
        Succeed,
        IdempotentHit,
        Fail,
    }

    struct MockLedger {
        behavior: Mutex<LedgerBehavior>,
        calls: Mutex<Vec<ReleaseRequest>>,
    }

    impl MockLedger {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                behavior: Mutex::new(LedgerBehavior::Succeed),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn set_behavior(&self, behavior: LedgerBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }

        fn calls(&self) -> Vec<ReleaseRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl LedgerClient for MockLedger {
        async fn release(
            &self,
            request: &ReleaseRequest,
        ) -> Result<ReleaseOutcome, LedgerError> {
            self.calls.lock().unwrap().push(request.clone());
            match *self.behavior.lock().unwrap() {
                LedgerBehavior::Succeed => Ok(ReleaseOutcome::Released),
                LedgerBehavior::IdempotentHit => Ok(ReleaseOutcome::IdempotentHit),
                LedgerBehavior::Fail => Err(LedgerError::Remote {
                    code: 500,
                    message: "ledger unavailable".to_string(),
                }),
            }
        }
    }

    struct Fixture {
        service: Arc<ReviewService>,
        db: Arc<AdminDatabase>,
        locks: Arc<LockService>,
        ledger: Arc<MockLedger>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(AdminDatabase::open(&dir.path().join("admin.redb")).unwrap());
        let locks = Arc::new(LockService::new(Duration::from_secs(5)));
        let ledger = MockLedger::new();
        let ledger_client: Arc<dyn LedgerClient> = ledger.clone();
        let service = Arc::new(
            ReviewService::new(Arc::clone(&db), Arc::clone(&locks), ledger_client)
                .with_lock_wait(Duration::from_millis(100)),
        );
        Fixture {
            service,
            db,
            locks,
            ledger,
            _dir: dir,
        }
    }

    fn seed(fx: &Fixture, id: i64, member_id: i64, direction: Direction, freeze_id: i64) {
        let now = Utc::now();
        MemberRepository::new(&fx.db)
            .upsert(&StoredMember {
                id: member_id,
                role: match direction {
                    Direction::ToAgent => MemberRole::Member,
                    Direction::ToMember => MemberRole::Agent,
                },
                created_at: now,
                updated_at: now,
            })
            .unwrap();
        ApplicationRepository::new(&fx.db)
            .upsert(&StoredApplication {
                id,
                member_id,
                direction,
                status: ApplicationStatus::Reviewing,
                currency: "USD".to_string(),
                deposit: Decimal::new(500_00, 2),
                freeze_id,
                reviewed_by: 0,
                reject_reason: String::new(),
                applied_at: now,
                reviewed_at: None,
                released_at: None,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
    }

    fn load(fx: &Fixture, id: i64) -> StoredApplication {
        ApplicationRepository::new(&fx.db)
            .get_one(id)
            .unwrap()
            .unwrap()
    }

    fn member_role(fx: &Fixture, member_id: i64) -> MemberRole {
        MemberRepository::new(&fx.db)
            .get(member_id)
            .unwrap()
            .unwrap()
            .role
    }

    #[tokio::test]
    async fn approve_to_agent_promotes_without_refund() {
        let fx = fixture();
        seed(&fx, 1, 7, Direction::ToAgent, 55);

        fx.service.approve(9, 1).await.unwrap();

        let app = load(&fx, 1);
        assert_eq!(app.status, ApplicationStatus::Approved);
        assert_eq!(app.reviewed_by, 9);
        assert!(app.reviewed_at.is_some());
        assert!(app.released_at.is_none(), "ToAgent approval owes no refund");
        assert_eq!(member_role(&fx, 7), MemberRole::Agent);
        assert!(fx.ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn approve_to_member_demotes_and_refunds() {
        let fx = fixture();
        seed(&fx, 2, 8, Direction::ToMember, 77);

        fx.service.approve(9, 2).await.unwrap();

        let app = load(&fx, 2);
        assert_eq!(app.status, ApplicationStatus::Approved);
        assert!(app.released_at.is_some());
        assert_eq!(member_role(&fx, 8), MemberRole::Member);

        let calls = fx.ledger.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].freeze_id, 77);
        assert_eq!(calls[0].delta, Decimal::ZERO);
        assert_eq!(calls[0].tx_id, "2");
        assert_eq!(calls[0].reason, ReleaseReason::ApplyToMemberRefund);
    }

    #[tokio::test]
    async fn reject_to_agent_refunds_with_reason() {
        let fx = fixture();
        seed(&fx, 42, 7, Direction::ToAgent, 99);

        fx.service.reject(1, 42, "insufficient docs").await.unwrap();

        let app = load(&fx, 42);
        assert_eq!(app.status, ApplicationStatus::Rejected);
        assert_eq!(app.reject_reason, "insufficient docs");
        assert!(app.released_at.is_some());
        // Rejection never touches the member role.
        assert_eq!(member_role(&fx, 7), MemberRole::Member);

        let calls = fx.ledger.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].freeze_id, 99);
        assert_eq!(calls[0].delta, Decimal::ZERO);
        assert_eq!(calls[0].tx_id, "42");
        assert_eq!(calls[0].reason, ReleaseReason::ApplyToAgentReject);
    }

    #[tokio::test]
    async fn reject_to_member_keeps_escrow() {
        let fx = fixture();
        seed(&fx, 3, 11, Direction::ToMember, 88);

        fx.service.reject(1, 3, "demotion denied").await.unwrap();

        let app = load(&fx, 3);
        assert_eq!(app.status, ApplicationStatus::Rejected);
        assert!(app.released_at.is_none());
        assert!(fx.ledger.calls().is_empty());
        assert_eq!(member_role(&fx, 11), MemberRole::Agent);
    }

    #[tokio::test]
    async fn repeated_approve_releases_exactly_once() {
        let fx = fixture();
        seed(&fx, 4, 12, Direction::ToMember, 66);

        fx.service.approve(9, 4).await.unwrap();
        let first = load(&fx, 4);

        fx.service.approve(9, 4).await.unwrap();
        let second = load(&fx, 4);

        assert_eq!(fx.ledger.calls().len(), 1);
        assert_eq!(first.released_at, second.released_at);
        assert_eq!(first.reviewed_by, second.reviewed_by);
        assert_eq!(first.reviewed_at, second.reviewed_at);
    }

    #[tokio::test]
    async fn idempotent_hit_from_ledger_is_success() {
        let fx = fixture();
        seed(&fx, 5, 13, Direction::ToMember, 44);
        fx.ledger.set_behavior(LedgerBehavior::IdempotentHit);

        fx.service.approve(9, 5).await.unwrap();

        let app = load(&fx, 5);
        assert_eq!(app.status, ApplicationStatus::Approved);
        assert!(app.released_at.is_some());
    }

    #[tokio::test]
    async fn ledger_failure_is_recoverable_by_retry() {
        let fx = fixture();
        seed(&fx, 6, 14, Direction::ToMember, 33);
        fx.ledger.set_behavior(LedgerBehavior::Fail);

        let err = fx.service.approve(9, 6).await.unwrap_err();
        assert!(matches!(err, ReviewError::Ledger(_)));

        // Partial-failure state: status committed, refund pending.
        let app = load(&fx, 6);
        assert_eq!(app.status, ApplicationStatus::Approved);
        assert!(app.released_at.is_none());

        // A repeat call short-circuits the transition and retries the
        // release.
        fx.ledger.set_behavior(LedgerBehavior::Succeed);
        fx.service.approve(9, 6).await.unwrap();

        assert_eq!(fx.ledger.calls().len(), 2);
        assert!(load(&fx, 6).released_at.is_some());
    }

    #[tokio::test]
    async fn cannot_approve_a_rejected_application() {
        let fx = fixture();
        seed(&fx, 7, 15, Direction::ToAgent, 22);

        fx.service.reject(1, 7, "no").await.unwrap();
        let err = fx.service.approve(1, 7).await.unwrap_err();
        assert!(matches!(
            err,
            ReviewError::WrongStatus(ApplicationStatus::Rejected)
        ));
        assert_eq!(load(&fx, 7).status, ApplicationStatus::Rejected);
    }

    #[tokio::test]
    async fn concurrent_approve_and_reject_yield_one_terminal_status() {
        let fx = fixture();
        seed(&fx, 8, 16, Direction::ToAgent, 11);

        let service = Arc::clone(&fx.service);
        let a = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.approve(100, 8).await })
        };
        let b = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.reject(200, 8, "beaten").await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(ReviewError::WrongStatus(_))))
            .count();
        assert_eq!(ok, 1, "exactly one transition wins");
        assert_eq!(conflicts, 1, "the loser observes a state conflict");

        let app = load(&fx, 8);
        assert_ne!(app.status, ApplicationStatus::Reviewing);
        let winner = if app.status == ApplicationStatus::Approved {
            100
        } else {
            200
        };
        assert_eq!(app.reviewed_by, winner);
    }

    #[tokio::test]
    async fn lock_timeout_leaves_state_untouched() {
        let fx = fixture();
        seed(&fx, 9, 17, Direction::ToMember, 10);
        let before = load(&fx, 9);

        let _held = fx
            .locks
            .acquire(&agent_apply_lock_key(17), Duration::ZERO)
            .await
            .unwrap();

        let err = fx.service.approve(9, 9).await.unwrap_err();
        assert!(matches!(err, ReviewError::LockUnavailable(17)));

        assert_eq!(load(&fx, 9), before);
        assert!(fx.ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_freeze_fails_before_any_write() {
        let fx = fixture();
        seed(&fx, 10, 18, Direction::ToAgent, 0);

        let err = fx.service.reject(1, 10, "whatever").await.unwrap_err();
        assert!(matches!(err, ReviewError::MissingFreeze));

        let app = load(&fx, 10);
        assert_eq!(app.status, ApplicationStatus::Reviewing);
        assert!(fx.ledger.calls().is_empty());
        assert_eq!(member_role(&fx, 18), MemberRole::Member);
    }

    #[tokio::test]
    async fn input_validation_rejects_bad_identifiers() {
        let fx = fixture();
        seed(&fx, 11, 19, Direction::ToAgent, 5);

        assert!(matches!(
            fx.service.approve(0, 11).await,
            Err(ReviewError::Validation(_))
        ));
        assert!(matches!(
            fx.service.reject(1, 0, "r").await,
            Err(ReviewError::Validation(_))
        ));
        assert!(matches!(
            fx.service.reject(1, 11, "  ").await,
            Err(ReviewError::Validation(_))
        ));
        assert!(matches!(
            fx.service.approve(1, 404).await,
            Err(ReviewError::NotFound(404))
        ));
    }
}
