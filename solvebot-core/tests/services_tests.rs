// tests/services_tests.rs

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use solvebot_core::models::{Link, SolveOutcome};
use solvebot_core::repositories::{
    LinkRepository, SolveRepository, SqliteLinkRepository, SqliteSolveRepository,
    SqliteUserRepository, UserRepository,
};
use solvebot_core::services::{IssuanceService, RedemptionService, ReportService, UserService};
use solvebot_core::{Database, Error};

struct Harness {
    user_service: Arc<UserService>,
    issuance: Arc<IssuanceService>,
    redemption: Arc<RedemptionService>,
    report: Arc<ReportService>,
}

async fn setup() -> Harness {
    let db = Database::new("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();

    let link_repo: Arc<dyn LinkRepository + Send + Sync> =
        Arc::new(SqliteLinkRepository::new(db.pool().clone()));
    let user_repo: Arc<dyn UserRepository + Send + Sync> =
        Arc::new(SqliteUserRepository::new(db.pool().clone()));
    let solve_repo: Arc<dyn SolveRepository + Send + Sync> =
        Arc::new(SqliteSolveRepository::new(db.pool().clone()));

    let user_service = Arc::new(UserService::new(user_repo.clone()));
    let issuance = Arc::new(IssuanceService::new(link_repo.clone(), solve_repo.clone()));
    let redemption = Arc::new(RedemptionService::new(
        user_service.clone(),
        link_repo.clone(),
        solve_repo.clone(),
    ));
    let report = Arc::new(ReportService::new(
        user_repo,
        link_repo,
        solve_repo,
        user_service.clone(),
    ));

    Harness {
        user_service,
        issuance,
        redemption,
        report,
    }
}

#[tokio::test]
async fn test_issue_batch_tokens_distinct() -> Result<(), Error> {
    let h = setup().await;
    let links = h.issuance.issue_batch(10).await?;

    assert_eq!(links.len(), 10);
    let tokens: HashSet<&str> = links.iter().map(|l| l.token.as_str()).collect();
    assert_eq!(tokens.len(), 10);
    assert_eq!(links[0].label, "Link-1");
    assert_eq!(links[9].label, "Link-10");

    // Issuing again keeps the earlier batch valid.
    let more = h.issuance.issue_batch(10).await?;
    assert_eq!(more.len(), 10);
    assert_eq!(h.report.overview().await?.total_links, 20);
    Ok(())
}

/// Link repository that swaps the token of the first `collisions_left`
/// inserts for one already present in the store, so the service sees real
/// unique-violation errors from SQLite.
struct CollidingLinkRepository {
    inner: SqliteLinkRepository,
    collisions_left: AtomicU32,
    taken_token: String,
}

impl CollidingLinkRepository {
    fn take_collision(&self) -> bool {
        self.collisions_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl LinkRepository for CollidingLinkRepository {
    async fn insert(&self, link: &Link) -> Result<(), Error> {
        if self.take_collision() {
            let clash = Link {
                token: self.taken_token.clone(),
                ..link.clone()
            };
            return self.inner.insert(&clash).await;
        }
        self.inner.insert(link).await
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Link>, Error> {
        self.inner.get_by_token(token).await
    }

    async fn count(&self) -> Result<i64, Error> {
        self.inner.count().await
    }

    async fn delete_all(&self) -> Result<(), Error> {
        self.inner.delete_all().await
    }
}

async fn setup_colliding_issuance(collisions: u32) -> (IssuanceService, Arc<CollidingLinkRepository>) {
    let db = Database::new("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();

    let taken_token = "already-taken".to_string();
    let seed_repo = SqliteLinkRepository::new(db.pool().clone());
    seed_repo
        .insert(&Link {
            token: taken_token.clone(),
            label: "Link-0".to_string(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    let colliding = Arc::new(CollidingLinkRepository {
        inner: SqliteLinkRepository::new(db.pool().clone()),
        collisions_left: AtomicU32::new(collisions),
        taken_token,
    });
    let link_repo: Arc<dyn LinkRepository + Send + Sync> = colliding.clone();
    let solve_repo: Arc<dyn SolveRepository + Send + Sync> =
        Arc::new(SqliteSolveRepository::new(db.pool().clone()));
    (IssuanceService::new(link_repo, solve_repo), colliding)
}

#[tokio::test]
async fn test_issue_batch_regenerates_on_collision() -> Result<(), Error> {
    let (issuance, link_repo) = setup_colliding_issuance(2).await;

    // Two colliding inserts in a row are retried with fresh tokens; the
    // operator still gets the full batch.
    let links = issuance.issue_batch(3).await?;
    assert_eq!(links.len(), 3);
    let tokens: HashSet<&str> = links.iter().map(|l| l.token.as_str()).collect();
    assert_eq!(tokens.len(), 3);
    assert!(!tokens.contains("already-taken"));

    // Seed link plus the three issued ones; nothing was silently dropped.
    assert_eq!(link_repo.count().await?, 4);
    Ok(())
}

#[tokio::test]
async fn test_issue_batch_gives_up_after_repeated_collisions() {
    let (issuance, link_repo) = setup_colliding_issuance(u32::MAX).await;

    match issuance.issue_batch(1).await {
        Err(Error::TokenCollision(attempts)) => assert_eq!(attempts, 5),
        other => panic!("Expected TokenCollision, got {other:?}"),
    }
    // Only the seed link remains.
    assert_eq!(link_repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_redeem_unknown_token() -> Result<(), Error> {
    let h = setup().await;
    h.issuance.issue_batch(3).await?;

    let outcome = h.redemption.redeem(42, Some("alice"), "no-such-token").await?;
    assert_eq!(outcome, SolveOutcome::InvalidToken);

    // The attempt still registered the user, but wrote no solve.
    let overview = h.report.overview().await?;
    assert_eq!(overview.total_users, 1);
    assert_eq!(overview.total_solves, 0);

    // Unknown token stays invalid no matter the user's history.
    let link = &h.issuance.issue_batch(1).await?[0];
    h.redemption.redeem(42, Some("alice"), &link.token).await?;
    let outcome = h.redemption.redeem(42, Some("alice"), "no-such-token").await?;
    assert_eq!(outcome, SolveOutcome::InvalidToken);
    Ok(())
}

#[tokio::test]
async fn test_redeem_first_and_subsequent() -> Result<(), Error> {
    let h = setup().await;
    let links = h.issuance.issue_batch(3).await?;

    let first = h.redemption.redeem(42, Some("alice"), &links[0].token).await?;
    assert_eq!(first, SolveOutcome::FirstSolve);

    let second = h.redemption.redeem(42, Some("alice"), &links[1].token).await?;
    assert_eq!(second, SolveOutcome::Solved { total: 2 });

    let third = h.redemption.redeem(42, Some("alice"), &links[2].token).await?;
    assert_eq!(third, SolveOutcome::Solved { total: 3 });

    // A different user starts their own count.
    let other = h.redemption.redeem(43, Some("bob"), &links[0].token).await?;
    assert_eq!(other, SolveOutcome::FirstSolve);
    Ok(())
}

#[tokio::test]
async fn test_redeem_idempotent_per_user() -> Result<(), Error> {
    let h = setup().await;
    let links = h.issuance.issue_batch(1).await?;

    let first = h.redemption.redeem(42, Some("alice"), &links[0].token).await?;
    assert_eq!(first, SolveOutcome::FirstSolve);

    let again = h.redemption.redeem(42, Some("alice"), &links[0].token).await?;
    assert_eq!(again, SolveOutcome::AlreadySolved);
    assert_eq!(h.report.overview().await?.total_solves, 1);
    Ok(())
}

#[tokio::test]
async fn test_issue_redeem_reset_scenario() -> Result<(), Error> {
    let h = setup().await;
    let links = h.issuance.issue_batch(10).await?;

    // User A solves token #3.
    let outcome = h.redemption.redeem(1001, Some("alice"), &links[2].token).await?;
    assert_eq!(outcome, SolveOutcome::FirstSolve);
    assert_eq!(h.report.overview().await?.total_solves, 1);

    // Second attempt by A is a no-op.
    let outcome = h.redemption.redeem(1001, Some("alice"), &links[2].token).await?;
    assert_eq!(outcome, SolveOutcome::AlreadySolved);
    assert_eq!(h.report.overview().await?.total_solves, 1);

    // User B may still solve the same token.
    let outcome = h.redemption.redeem(1002, Some("bob"), &links[2].token).await?;
    assert_eq!(outcome, SolveOutcome::FirstSolve);
    assert_eq!(h.report.overview().await?.total_solves, 2);

    // Reset clears solves and links but keeps users.
    let fresh = h.issuance.reset_all(10).await?;
    assert_eq!(fresh.len(), 10);
    let overview = h.report.overview().await?;
    assert_eq!(overview.total_solves, 0);
    assert_eq!(overview.total_links, 10);
    assert_eq!(overview.total_users, 2);

    // Old tokens are now invalid.
    let outcome = h.redemption.redeem(1001, Some("alice"), &links[2].token).await?;
    assert_eq!(outcome, SolveOutcome::InvalidToken);
    Ok(())
}

#[tokio::test]
async fn test_user_first_seen_and_username_refresh() -> Result<(), Error> {
    let h = setup().await;

    let created = h.user_service.get_or_create(42, Some("alice")).await?;
    let fetched = h.user_service.get_or_create(42, Some("alice")).await?;
    assert_eq!(created.user_id, fetched.user_id);
    assert_eq!(created.first_seen.timestamp(), fetched.first_seen.timestamp());

    // A changed username is refreshed in place.
    let renamed = h.user_service.get_or_create(42, Some("alice_v2")).await?;
    assert_eq!(renamed.user_id, created.user_id);
    assert_eq!(renamed.username.as_deref(), Some("alice_v2"));
    assert_eq!(h.report.overview().await?.total_users, 1);
    Ok(())
}

#[tokio::test]
async fn test_user_detail_lookup_and_empty_history() -> Result<(), Error> {
    let h = setup().await;
    h.user_service.get_or_create(42, Some("Alice")).await?;

    // Zero solves is an empty history, not an error.
    let detail = h.report.user_detail("42").await?;
    assert_eq!(detail.user.telegram_id, 42);
    assert!(detail.solves.is_empty());

    // Name lookup: leading @ stripped, case-insensitive.
    let detail = h.report.user_detail("@alice").await?;
    assert_eq!(detail.user.telegram_id, 42);

    match h.report.user_detail("nobody").await {
        Err(Error::UserNotFound(id)) => assert_eq!(id, "nobody"),
        other => panic!("Expected UserNotFound, got {other:?}"),
    }

    // A digit string past i64 range matches nobody rather than failing.
    match h.report.user_detail("99999999999999999999").await {
        Err(Error::UserNotFound(_)) => {}
        other => panic!("Expected UserNotFound, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_user_detail_history_ordered() -> Result<(), Error> {
    let h = setup().await;
    let links = h.issuance.issue_batch(3).await?;

    h.redemption.redeem(42, Some("alice"), &links[1].token).await?;
    h.redemption.redeem(42, Some("alice"), &links[0].token).await?;

    let detail = h.report.user_detail("alice").await?;
    assert_eq!(detail.solves.len(), 2);
    // Time ascending: Link-2 was solved before Link-1.
    assert_eq!(detail.solves[0].label.as_deref(), Some("Link-2"));
    assert_eq!(detail.solves[1].label.as_deref(), Some("Link-1"));
    Ok(())
}

#[tokio::test]
async fn test_recent_newest_first_and_bounded() -> Result<(), Error> {
    let h = setup().await;
    let links = h.issuance.issue_batch(5).await?;

    for (i, link) in links.iter().enumerate() {
        h.redemption.redeem(100 + i as i64, Some("user"), &link.token).await?;
    }

    let recent = h.report.recent(10).await?;
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0].token, links[4].token);
    assert_eq!(recent[0].telegram_id, 104);
    assert_eq!(recent[4].token, links[0].token);

    assert_eq!(h.report.recent(3).await?.len(), 3);
    Ok(())
}
