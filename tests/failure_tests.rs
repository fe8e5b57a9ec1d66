mod common;

use async_trait::async_trait;
use common::purchase;
use purs_ptb::application::orchestrator::{PtbOrchestrator, Step};
use purs_ptb::domain::parameters::ParameterSet;
use purs_ptb::domain::ports::{
    Statement, StatementExecutor, TransactionContext, TransactionalExecutor,
};
use purs_ptb::domain::purchase::{PaymentMethod, PromotionInput};
use purs_ptb::error::{ExecutorError, PtbError, ValidationError};
use purs_ptb::infrastructure::in_memory::InMemoryExecutor;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};

const ALL_STEPS: [Step; 5] = [
    Step::Payment,
    Step::FedNowPayment,
    Step::LedgerEntry,
    Step::PromotionLedgerEntry,
    Step::TransactionLinks,
];

#[tokio::test]
async fn test_run_stops_at_the_first_failing_step() {
    for (position, failing) in ALL_STEPS.into_iter().enumerate() {
        let executor = InMemoryExecutor::new();
        executor.fail_on(failing.statement(), "constraint violation").await;
        let orchestrator = PtbOrchestrator::new(Box::new(executor.clone()));
        let ctx = executor.begin().await.unwrap();

        let err = orchestrator
            .run(
                &purchase(dec!(1), PaymentMethod::Instant),
                &PromotionInput::new(dec!(1)),
                &ctx,
            )
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some(failing));
        assert!(matches!(
            err,
            PtbError::Executor {
                source: ExecutorError::Rejected { .. },
                ..
            }
        ));
        assert!(err.to_string().contains(&format!("step {}", failing.index())));

        // only the writes before the failing step were issued
        let issued: Vec<Statement> = executor
            .statements_in(&ctx)
            .await
            .iter()
            .map(|s| s.statement)
            .collect();
        let expected: Vec<Statement> = ALL_STEPS[..position]
            .iter()
            .map(|step| step.statement())
            .collect();
        assert_eq!(issued, expected);

        executor.rollback(ctx).await.unwrap();
        assert!(executor.committed().await.is_empty());
    }
}

#[tokio::test]
async fn test_skipped_steps_cannot_fail() {
    let executor = InMemoryExecutor::new();
    executor.fail_on(Statement::InsertFedNowPayment, "unavailable").await;
    executor.fail_on(Statement::InsertPromoLedgerEntry, "unavailable").await;
    let orchestrator = PtbOrchestrator::new(Box::new(executor.clone()));
    let ctx = executor.begin().await.unwrap();

    let bundle = orchestrator
        .run(
            &purchase(dec!(4), PaymentMethod::Card),
            &PromotionInput::none(),
            &ctx,
        )
        .await
        .unwrap();

    assert!(bundle.primary_fed_now_payment_id.is_none());
    assert!(bundle.promotion_ledger_entry_id.is_none());
    executor.commit(ctx).await.unwrap();
    assert_eq!(executor.committed().await.len(), 3);
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_any_write() {
    let executor = InMemoryExecutor::new();
    let orchestrator = PtbOrchestrator::new(Box::new(executor.clone()));
    let ctx = executor.begin().await.unwrap();

    let negative = purchase(dec!(-1), PaymentMethod::Instant);
    let err = orchestrator
        .run(&negative, &PromotionInput::none(), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PtbError::Validation(ValidationError::NegativeAmount { .. })
    ));
    assert_eq!(err.step(), None);

    let mut bad_payee = purchase(dec!(1), PaymentMethod::Instant);
    bad_payee.payee = "not-hex".to_string();
    let err = orchestrator
        .run(&bad_payee, &PromotionInput::none(), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PtbError::Validation(ValidationError::InvalidIdentifier { field: "payee", .. })
    ));

    let mut no_developer = purchase(dec!(1), PaymentMethod::Card);
    no_developer.developer = String::new();
    let err = orchestrator
        .run(&no_developer, &PromotionInput::none(), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PtbError::Validation(ValidationError::MissingIdentifier { field: "developer" })
    ));

    let err = orchestrator
        .run(
            &purchase(dec!(1), PaymentMethod::Card),
            &PromotionInput::new(dec!(-0.5)),
            &ctx,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PtbError::Validation(ValidationError::NegativeAmount { .. })
    ));

    assert!(executor.executed().await.is_empty());
}

#[tokio::test]
async fn test_run_outside_an_open_transaction_fails_at_the_first_step() {
    let executor = InMemoryExecutor::new();
    let orchestrator = PtbOrchestrator::new(Box::new(executor.clone()));

    let err = orchestrator
        .run(
            &purchase(dec!(1), PaymentMethod::Card),
            &PromotionInput::none(),
            &TransactionContext::new("closed"),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PtbError::Executor {
            step: Step::Payment,
            source: ExecutorError::UnknownTransaction(_),
        }
    ));
}

/// Aborts the transaction from the outside once `after` writes went through.
struct AbortAfter {
    inner: InMemoryExecutor,
    after: usize,
    writes: AtomicUsize,
}

impl AbortAfter {
    async fn count(&self, ctx: &TransactionContext) {
        if self.writes.fetch_add(1, Ordering::SeqCst) + 1 == self.after {
            self.inner.abort(ctx).await;
        }
    }
}

#[async_trait]
impl StatementExecutor for AbortAfter {
    async fn execute_single(
        &self,
        statement: Statement,
        parameters: ParameterSet,
        ctx: &TransactionContext,
    ) -> Result<(), ExecutorError> {
        self.inner.execute_single(statement, parameters, ctx).await?;
        self.count(ctx).await;
        Ok(())
    }

    async fn execute_batch(
        &self,
        statement: Statement,
        parameter_sets: Vec<ParameterSet>,
        ctx: &TransactionContext,
    ) -> Result<(), ExecutorError> {
        self.inner.execute_batch(statement, parameter_sets, ctx).await?;
        self.count(ctx).await;
        Ok(())
    }
}

#[tokio::test]
async fn test_cancelled_transaction_stops_the_run() {
    let executor = InMemoryExecutor::new();
    let orchestrator = PtbOrchestrator::new(Box::new(AbortAfter {
        inner: executor.clone(),
        after: 1,
        writes: AtomicUsize::new(0),
    }));
    let ctx = executor.begin().await.unwrap();

    let err = orchestrator
        .run(
            &purchase(dec!(0), PaymentMethod::Card),
            &PromotionInput::new(dec!(1)),
            &ctx,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PtbError::Executor {
            step: Step::LedgerEntry,
            source: ExecutorError::TransactionAborted(_),
        }
    ));
    assert_eq!(executor.statements_in(&ctx).await.len(), 1);
    assert!(executor.commit(ctx.clone()).await.is_err());
    executor.rollback(ctx.clone()).await.unwrap();

    assert!(executor.statements_in(&ctx).await.is_empty());
    assert!(executor.committed().await.is_empty());
}
