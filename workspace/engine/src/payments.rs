//! Payment seam. Confirming a match settles the installment through this
//! trait; the engine never flips payment state directly, so a deployment
//! can route the call into its own billing service.

use async_trait::async_trait;
use chrono::NaiveDate;
use model::entities::installment::{self, InstallmentStatus};
use sea_orm::{ActiveModelTrait, DatabaseTransaction, EntityTrait, Set};
use tracing::{debug, instrument};

use crate::context::OperationContext;
use crate::error::{EngineError, Result};

/// External payment operation invoked by match confirmation. Runs inside
/// the confirmation's transaction so a failed payment rolls everything
/// back.
#[async_trait]
pub trait InstallmentPayments: Send + Sync {
    async fn mark_paid(
        &self,
        txn: &DatabaseTransaction,
        installment_id: i32,
        payment_date: NaiveDate,
        ctx: &OperationContext,
    ) -> Result<()>;
}

/// Default implementation: settle the installment row in place.
pub struct DbPayments;

#[async_trait]
impl InstallmentPayments for DbPayments {
    #[instrument(skip(self, txn, _ctx))]
    async fn mark_paid(
        &self,
        txn: &DatabaseTransaction,
        installment_id: i32,
        payment_date: NaiveDate,
        _ctx: &OperationContext,
    ) -> Result<()> {
        let installment = installment::Entity::find_by_id(installment_id)
            .one(txn)
            .await?
            .ok_or_else(|| EngineError::not_found("installment", installment_id))?;

        let mut active: installment::ActiveModel = installment.into();
        active.status = Set(InstallmentStatus::Paid);
        active.payment_date = Set(Some(payment_date));
        active.update(txn).await?;

        debug!(
            "Installment {} marked paid on {}",
            installment_id, payment_date
        );
        Ok(())
    }
}
