//! The order lifecycle engine.
//!
//! Owns the `CREATED -> PROCESS -> {SUCCESS, FAILURE}` state machine and
//! the shared wrapper every adapter invocation funnels through: audit log
//! entry, restore-on-error, persistence, lifecycle event. Terminal
//! transitions themselves are delegated to `OrderStore::finalize`, which
//! performs them atomically together with the queued ledger operations.

use crate::audit::{CallLogStore, ProviderCallLog};
use crate::commission::calculate_out_amount;
use crate::config::PaymentConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::events::{LifecycleListener, LifecycleStage, PaymentProcessEvent};
use crate::ledger::Ledger;
use crate::money::CurrencyConverter;
use crate::order::{
    CreateOrderParams, MethodRegistry, PaymentOrder, PaymentProcess, PaymentStatus,
};
use crate::provider::adapter::ProviderCall;
use crate::provider::registry::ProviderRegistry;
use crate::request::RequestInfo;
use crate::store::{FinalizeOutcome, OrderStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

pub struct PaymentEngine {
    config: PaymentConfig,
    methods: Arc<MethodRegistry>,
    providers: Arc<ProviderRegistry>,
    store: Arc<dyn OrderStore>,
    ledger: Arc<dyn Ledger>,
    rates: Arc<dyn CurrencyConverter>,
    call_logs: Arc<dyn CallLogStore>,
    listeners: Vec<Arc<dyn LifecycleListener>>,
}

impl PaymentEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: PaymentConfig,
        methods: Arc<MethodRegistry>,
        providers: Arc<ProviderRegistry>,
        store: Arc<dyn OrderStore>,
        ledger: Arc<dyn Ledger>,
        rates: Arc<dyn CurrencyConverter>,
        call_logs: Arc<dyn CallLogStore>,
    ) -> Self {
        Self {
            config,
            methods,
            providers,
            store,
            ledger,
            rates,
            call_logs,
            listeners: Vec::new(),
        }
    }

    /// Listeners run synchronously, in registration order, after the
    /// transition they observe has been persisted.
    pub fn add_listener(&mut self, listener: Arc<dyn LifecycleListener>) -> &mut Self {
        self.listeners.push(listener);
        self
    }

    /// Builds and persists a new order in CREATED with its provider-side
    /// amount already computed and the rate snapshotted.
    pub async fn create_order(
        &self,
        method_name: &str,
        payer_id: i64,
        in_currency: &str,
        in_amount: i64,
        params: CreateOrderParams,
    ) -> PaymentResult<PaymentOrder> {
        if in_amount <= 0 {
            return Err(PaymentError::Validation {
                message: format!("payment amount must be positive, got {in_amount}"),
                field: Some("inAmount".to_string()),
            });
        }
        let method = self.methods.get(method_name)?;
        let mut order = PaymentOrder::new(&method, payer_id, in_currency, in_amount, params);
        let out = calculate_out_amount(
            order.in_amount,
            &order.in_currency,
            &order.out_currency,
            order.direction,
            &order.commission,
            self.rates.as_ref(),
        )?;
        order.out_amount = out.amount;
        order.rate_snapshot = Some(out.rate);

        let order = self.store.create(order).await?;
        info!(
            order_id = order.id,
            method = %order.method_name,
            direction = ?order.direction,
            in_amount = order.in_amount,
            out_amount = order.out_amount,
            "payment order created"
        );
        Ok(order)
    }

    /// Initiates the order with the provider. Only valid from CREATED; the
    /// order is persisted as PROCESS regardless of any status the adapter
    /// returns, since initiation is not completion.
    ///
    /// Withdrawals never reach the adapter here: with manual mode on an
    /// operator reviews the order elsewhere, with it off the payout
    /// round-trip happens inside `end`.
    pub async fn start(
        &self,
        order_id: i64,
        request: &RequestInfo,
    ) -> PaymentResult<PaymentProcess> {
        let mut order = self.store.get(order_id).await?;
        if order.status != PaymentStatus::Created {
            return Err(PaymentError::Validation {
                message: format!(
                    "order {} cannot start from status {}",
                    order.id, order.status
                ),
                field: Some("status".to_string()),
            });
        }

        let process = if order.is_withdraw() {
            PaymentProcess {
                response_text: Some("ok".to_string()),
                ..Default::default()
            }
        } else {
            self.call_provider(&mut order, ProviderCall::Start, request)
                .await?
        };

        order.status = PaymentStatus::Process;
        self.persist(&mut order).await?;
        info!(order_id = order.id, "payment order started");
        Ok(process)
    }

    /// Handles an inbound provider notification. When the adapter maps it
    /// to a terminal status and the order is not yet terminal, finalizes
    /// immediately. The returned process carries the `response_text` the
    /// HTTP caller must answer the provider with, verbatim.
    pub async fn callback(
        &self,
        order_id: i64,
        request: &RequestInfo,
    ) -> PaymentResult<PaymentProcess> {
        let mut order = self.store.get(order_id).await?;
        let process = self
            .call_provider(&mut order, ProviderCall::Callback, request)
            .await?;

        if !order.status.is_terminal() {
            if let Some(status) = process.new_status {
                if status.is_terminal() {
                    self.finish(&mut order, request, process.clone()).await?;
                }
            }
        }
        Ok(process)
    }

    /// Drives the order to the terminal status carried by `process`. The
    /// only path to SUCCESS or FAILURE. Idempotent against replayed and
    /// duplicate terminal signals.
    pub async fn end(
        &self,
        order_id: i64,
        request: &RequestInfo,
        process: PaymentProcess,
    ) -> PaymentResult<PaymentOrder> {
        let mut order = self.store.get(order_id).await?;
        self.finish(&mut order, request, process).await?;
        Ok(order)
    }

    async fn finish(
        &self,
        order: &mut PaymentOrder,
        request: &RequestInfo,
        mut process: PaymentProcess,
    ) -> PaymentResult<()> {
        let Some(mut target) = process.new_status else {
            return Ok(());
        };
        if !target.is_terminal() || order.status.is_terminal() || order.status == target {
            return Ok(());
        }

        // Auto-confirm: the payout itself is the second round-trip, and its
        // result supersedes the caller-supplied one.
        if order.is_withdraw() && !self.config.manual_withdraw && target == PaymentStatus::Success
        {
            process = self
                .call_provider(order, ProviderCall::Withdraw, request)
                .await?;
            match process.new_status {
                Some(confirmed) if confirmed.is_terminal() => target = confirmed,
                _ => return Ok(()),
            }
        }

        let outcome = self
            .store
            .finalize(order, target, self.ledger.as_ref())
            .await?;
        if let FinalizeOutcome::Applied { executed } = outcome {
            info!(
                order_id = order.id,
                status = %order.status,
                executed,
                "payment order ended"
            );
            self.emit(LifecycleStage::End, order, request, &process);
        }
        Ok(())
    }

    /// Which order an inbound request for `provider_name` refers to.
    /// `Ok(None)` means the protocol cannot say.
    pub fn resolve_order_id(
        &self,
        provider_name: &str,
        request: &RequestInfo,
    ) -> PaymentResult<Option<i64>> {
        self.providers.get(provider_name)?.resolve_order_id(request)
    }

    pub fn resolve_error_message(
        &self,
        provider_name: &str,
        request: &RequestInfo,
    ) -> PaymentResult<Option<String>> {
        Ok(self
            .providers
            .get(provider_name)?
            .resolve_error_message(request))
    }

    /// Where to send the end user after the order finalizes: the order's
    /// redirect target (or the configured default for its outcome) with
    /// `paymentStatus` and, on failure, `paymentError` query parameters.
    pub fn redirect_url(&self, order: &PaymentOrder) -> PaymentResult<String> {
        let target = order.redirect_url.clone().unwrap_or_else(|| {
            if order.status == PaymentStatus::Failure {
                self.config.failure_url.clone()
            } else {
                self.config.success_url.clone()
            }
        });
        let mut url = url::Url::parse(&target).map_err(|e| PaymentError::Validation {
            message: format!("invalid redirect target {target}: {e}"),
            field: Some("redirectUrl".to_string()),
        })?;
        url.query_pairs_mut()
            .append_pair("paymentStatus", order.status.as_str());
        if order.status == PaymentStatus::Failure {
            if let Some(message) = &order.error_message {
                url.query_pairs_mut().append_pair("paymentError", message);
            }
        }
        Ok(url.to_string())
    }

    /// The shared wrapper every adapter invocation funnels through.
    async fn call_provider(
        &self,
        order: &mut PaymentOrder,
        call: ProviderCall,
        request: &RequestInfo,
    ) -> PaymentResult<PaymentProcess> {
        let mut entry = ProviderCallLog::open(
            order.id,
            &order.method_name,
            &order.provider_name,
            call,
            request,
        );
        let snapshot = order.clone();

        match self.dispatch(order, call, request).await {
            Ok(process) => {
                entry.response_raw = process.response_text.clone();
                if let Some(status) = process.new_status {
                    entry.append(&format!("mapped status: {status}"));
                }
                entry.close();
                self.call_logs.record(entry).await;

                self.persist(order).await?;
                self.emit(stage_for(call), order, request, &process);
                Ok(process)
            }
            Err(err) => {
                *order = snapshot;
                error!(
                    order_id = order.id,
                    provider = %order.provider_name,
                    call = %call,
                    error = %err,
                    "provider call failed"
                );
                entry.error_raw = Some(err.to_string());
                entry.close();
                self.call_logs.record(entry).await;
                Err(err)
            }
        }
    }

    async fn dispatch(
        &self,
        order: &mut PaymentOrder,
        call: ProviderCall,
        request: &RequestInfo,
    ) -> PaymentResult<PaymentProcess> {
        let adapter = self.providers.get(&order.provider_name)?;
        match call {
            ProviderCall::Start => adapter.start(order, request).await,
            ProviderCall::Callback => adapter.callback(order, request).await,
            ProviderCall::Withdraw => match adapter.withdraw_support() {
                Some(support) => support.withdraw(order).await,
                None => Err(PaymentError::configuration(format!(
                    "provider '{}' does not support withdrawals",
                    order.provider_name
                ))),
            },
        }
    }

    /// Persist the order, re-running the commission calculation while it
    /// is non-terminal and deriving `real_in_amount` when the provider
    /// reported a settled amount different from the requested one.
    async fn persist(&self, order: &mut PaymentOrder) -> PaymentResult<()> {
        if !order.status.is_terminal() && order.in_amount > 0 {
            let out = calculate_out_amount(
                order.in_amount,
                &order.in_currency,
                &order.out_currency,
                order.direction,
                &order.commission,
                self.rates.as_ref(),
            )?;
            order.out_amount = out.amount;
            order.rate_snapshot = Some(out.rate);
        }

        if let Some(real_out) = order.real_out_amount {
            if real_out != order.out_amount || order.real_in_amount.is_none() {
                let real_in = self.rates.convert(
                    &order.out_currency,
                    &order.in_currency,
                    real_out,
                    order.direction.rate_direction(),
                )?;
                order.real_in_amount = Some(real_in);
            }
        }

        order.updated_at = Utc::now();
        self.store.save(order).await
    }

    fn emit(
        &self,
        stage: LifecycleStage,
        order: &PaymentOrder,
        request: &RequestInfo,
        process: &PaymentProcess,
    ) {
        let event = PaymentProcessEvent {
            stage,
            order,
            request,
            process,
        };
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }
}

fn stage_for(call: ProviderCall) -> LifecycleStage {
    match call {
        ProviderCall::Start => LifecycleStage::Start,
        ProviderCall::Callback => LifecycleStage::Callback,
        ProviderCall::Withdraw => LifecycleStage::Withdraw,
    }
}
