use super::parameters::{self, PaymentIds};
use crate::domain::bundle::IdentifierBundle;
use crate::domain::identifier::{IdentifierGeneratorBox, RandomIdentifierGenerator};
use crate::domain::parameters::ParameterSet;
use crate::domain::ports::{Statement, StatementExecutorBox, TransactionContext};
use crate::domain::purchase::{PromotionInput, PurchaseInput};
use crate::error::{EncodingError, PtbError};
use chrono::Utc;
use std::fmt;
use tracing::{debug, info, warn};

/// One write of a bundle run, numbered in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Payment,
    FedNowPayment,
    LedgerEntry,
    PromotionLedgerEntry,
    TransactionLinks,
}

impl Step {
    pub fn index(self) -> u8 {
        match self {
            Step::Payment => 1,
            Step::FedNowPayment => 2,
            Step::LedgerEntry => 3,
            Step::PromotionLedgerEntry => 4,
            Step::TransactionLinks => 5,
        }
    }

    pub fn statement(self) -> Statement {
        match self {
            Step::Payment => Statement::InsertPayment,
            Step::FedNowPayment => Statement::InsertFedNowPayment,
            Step::LedgerEntry => Statement::InsertLedgerEntry,
            Step::PromotionLedgerEntry => Statement::InsertPromoLedgerEntry,
            Step::TransactionLinks => Statement::InsertTransaction,
        }
    }

    /// State reached once this step's write succeeded.
    pub fn completes(self) -> PtbState {
        match self {
            Step::Payment => PtbState::PaymentInserted,
            Step::FedNowPayment => PtbState::FedNowInserted,
            Step::LedgerEntry => PtbState::LedgerInserted,
            Step::PromotionLedgerEntry => PtbState::PromotionInserted,
            Step::TransactionLinks => PtbState::LinksWritten,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Step::Payment => "payment",
            Step::FedNowPayment => "instant payment",
            Step::LedgerEntry => "ledger entry",
            Step::PromotionLedgerEntry => "promotion ledger entry",
            Step::TransactionLinks => "transaction links",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.index(), self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtbState {
    Init,
    PaymentInserted,
    FedNowInserted,
    LedgerInserted,
    PromotionInserted,
    LinksWritten,
    Done,
    Failed,
}

/// The writes a run will issue for a given pair of inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    steps: Vec<Step>,
}

impl StepPlan {
    pub fn for_inputs(purchase: &PurchaseInput, promotion: &PromotionInput) -> Self {
        let mut steps = vec![Step::Payment];
        if purchase.settles_instantly() {
            steps.push(Step::FedNowPayment);
        }
        steps.push(Step::LedgerEntry);
        if promotion.is_active() {
            steps.push(Step::PromotionLedgerEntry);
        }
        steps.push(Step::TransactionLinks);
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn contains(&self, step: Step) -> bool {
        self.steps.contains(&step)
    }

    /// Path through the state machine for a run that succeeds.
    pub fn states(&self) -> Vec<PtbState> {
        std::iter::once(PtbState::Init)
            .chain(self.steps.iter().map(|step| step.completes()))
            .chain(std::iter::once(PtbState::Done))
            .collect()
    }
}

enum Write {
    Single(ParameterSet),
    Batch(Vec<ParameterSet>),
}

/// Records Purs Transaction Bundles.
///
/// The orchestrator holds no per-run state, so one instance can serve
/// concurrent runs. Each run writes through the injected executor inside the
/// transaction the caller supplies; it never begins, commits or rolls back.
pub struct PtbOrchestrator {
    executor: StatementExecutorBox,
    generator: IdentifierGeneratorBox,
}

impl PtbOrchestrator {
    pub fn new(executor: StatementExecutorBox) -> Self {
        Self::with_generator(executor, Box::new(RandomIdentifierGenerator))
    }

    pub fn with_generator(executor: StatementExecutorBox, generator: IdentifierGeneratorBox) -> Self {
        Self {
            executor,
            generator,
        }
    }

    /// Writes every record of one purchase and links its ledger entries to a
    /// new transaction record.
    ///
    /// Stops at the first failing write and returns it with its step. The
    /// caller is expected to roll back `ctx` in that case; nothing is undone here.
    #[tracing::instrument(name = "ptb_run", skip_all, fields(transaction = %ctx))]
    pub async fn run(
        &self,
        purchase: &PurchaseInput,
        promotion: &PromotionInput,
        ctx: &TransactionContext,
    ) -> Result<IdentifierBundle, PtbError> {
        purchase.validate()?;
        promotion.validate()?;
        let plan = StepPlan::for_inputs(purchase, promotion);
        debug!(steps = ?plan.steps(), "planned bundle run");

        let ids = PaymentIds {
            payment_id: self.generator.generate(),
            customer_ledger_entry_id: self.generator.generate(),
            fed_now_payment_id: self.generator.generate(),
        };
        let mut ledger_entries = vec![ids.customer_ledger_entry_id];

        let payment = parameters::payment_parameters(purchase, &ids, Utc::now())
            .map_err(encoding(Step::Payment))?;
        self.write(Step::Payment, Write::Single(payment.clone()), ctx)
            .await?;

        let mut primary_fed_now_payment_id = None;
        if plan.contains(Step::FedNowPayment) {
            let fed_now = parameters::fed_now_parameters(&payment, purchase);
            self.write(Step::FedNowPayment, Write::Single(fed_now), ctx)
                .await?;
            primary_fed_now_payment_id = Some(ids.fed_now_payment_id);
        }

        let ledger = parameters::ledger_parameters(&payment);
        self.write(Step::LedgerEntry, Write::Single(ledger), ctx)
            .await?;

        let mut promotion_ledger_entry_id = None;
        if plan.contains(Step::PromotionLedgerEntry) {
            let ledger_id = self.generator.generate();
            let promo = parameters::promotion_parameters(purchase, promotion, &ledger_id)
                .map_err(encoding(Step::PromotionLedgerEntry))?;
            self.write(Step::PromotionLedgerEntry, Write::Single(promo), ctx)
                .await?;
            ledger_entries.push(ledger_id);
            promotion_ledger_entry_id = Some(ledger_id);
        }

        let purs_transaction_id = self.generator.generate();
        let links = parameters::link_parameter_sets(&purs_transaction_id, &ledger_entries);
        self.write(Step::TransactionLinks, Write::Batch(links), ctx)
            .await?;

        let bundle = IdentifierBundle {
            primary_payment_id: ids.payment_id,
            customer_ledger_entry_id: ids.customer_ledger_entry_id,
            purs_transaction_id,
            primary_fed_now_payment_id,
            promotion_ledger_entry_id,
        };
        info!(
            state = ?PtbState::Done,
            payment = %bundle.primary_payment_id,
            purs_transaction = %bundle.purs_transaction_id,
            linked = ledger_entries.len(),
            "recorded bundle"
        );
        Ok(bundle)
    }

    async fn write(
        &self,
        step: Step,
        write: Write,
        ctx: &TransactionContext,
    ) -> Result<(), PtbError> {
        let statement = step.statement();
        let result = match write {
            Write::Single(parameters) => {
                self.executor
                    .execute_single(statement, parameters, ctx)
                    .await
            }
            Write::Batch(parameter_sets) => {
                self.executor
                    .execute_batch(statement, parameter_sets, ctx)
                    .await
            }
        };

        match result {
            Ok(()) => {
                debug!(%step, state = ?step.completes(), "step completed");
                Ok(())
            }
            Err(source) => {
                warn!(%step, state = ?PtbState::Failed, error = %source, "bundle run aborted");
                Err(PtbError::Executor { step, source })
            }
        }
    }
}

fn encoding(step: Step) -> impl FnOnce(EncodingError) -> PtbError {
    move |source| PtbError::Encoding { step, source }
}
