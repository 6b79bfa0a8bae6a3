use activator_tools::{
    FarsAcceptance,
    FarsApi,
    FarsConfig,
    KokosApi,
    KokosConfig,
    SmileOneApi,
    SmileOneConfig,
    UCodeiumApi,
    UCodeiumConfig,
};
use log::*;
use uc_store_engine::{
    db_types::Activator,
    traits::{ActivationGateway, ActivationGatewayError, ActivationOutcome, ActivationRequest, ExternalOrderRequest},
};

/// The full set of provider clients. Each is optional: a provider with no environment
/// configuration is simply reported as unsupported and skipped by the activation loop.
#[derive(Clone, Default)]
pub struct ActivatorRig {
    ucodeium: Option<UCodeiumApi>,
    kokos: Option<KokosApi>,
    fars: Option<FarsApi>,
    smileone: Option<SmileOneApi>,
}

impl ActivatorRig {
    pub fn from_env() -> Self {
        let ucodeium = UCodeiumConfig::from_env().and_then(|c| {
            UCodeiumApi::new(c).map_err(|e| error!("🔌️ Could not build the UCodeium client: {e}")).ok()
        });
        let kokos = KokosConfig::from_env()
            .and_then(|c| KokosApi::new(c).map_err(|e| error!("🔌️ Could not build the Kokos client: {e}")).ok());
        let fars = FarsConfig::from_env()
            .and_then(|c| FarsApi::new(c).map_err(|e| error!("🔌️ Could not build the FARS client: {e}")).ok());
        let smileone = SmileOneConfig::from_env().and_then(|c| {
            SmileOneApi::new(c).map_err(|e| error!("🔌️ Could not build the SmileOne client: {e}")).ok()
        });
        let rig = Self { ucodeium, kokos, fars, smileone };
        let enabled = [
            ("ucodeium", rig.ucodeium.is_some()),
            ("kokos", rig.kokos.is_some()),
            ("fars", rig.fars.is_some()),
            ("smileone", rig.smileone.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, configured)| configured.then_some(name))
        .collect::<Vec<_>>();
        if enabled.is_empty() {
            warn!("🔌️ No activation providers are configured. UC code orders cannot be activated.");
        } else {
            info!("🔌️ Configured activation providers: {}", enabled.join(", "));
        }
        rig
    }
}

impl ActivationGateway for ActivatorRig {
    fn supports(&self, provider: Activator) -> bool {
        match provider {
            Activator::UCodeium => self.ucodeium.is_some(),
            Activator::Kokos => self.kokos.is_some(),
            Activator::Fars => self.fars.is_some(),
            // SmileOne only creates external orders; it never participates in the redemption loop.
            Activator::SmileOne => false,
        }
    }

    async fn redeem(
        &self,
        provider: Activator,
        request: &ActivationRequest,
    ) -> Result<ActivationOutcome, ActivationGatewayError> {
        match provider {
            Activator::UCodeium => {
                let api = self.ucodeium.as_ref().ok_or(ActivationGatewayError::NoHandler(provider))?;
                let (success, status) = api
                    .activate(&request.player_id, &request.code, request.amount)
                    .await
                    .map_err(|e| ActivationGatewayError::TransportError(e.to_string()))?;
                Ok(if success { ActivationOutcome::Success { status } } else { ActivationOutcome::Failure { status } })
            },
            Activator::Kokos => {
                let api = self.kokos.as_ref().ok_or(ActivationGatewayError::NoHandler(provider))?;
                let (success, status) = api
                    .activate(&request.player_id, &request.code)
                    .await
                    .map_err(|e| ActivationGatewayError::TransportError(e.to_string()))?;
                Ok(if success { ActivationOutcome::Success { status } } else { ActivationOutcome::Failure { status } })
            },
            Activator::Fars => {
                let api = self.fars.as_ref().ok_or(ActivationGatewayError::NoHandler(provider))?;
                let acceptance = api
                    .redeem(request.order_id, &request.player_id, &request.code, request.amount)
                    .await
                    .map_err(|e| ActivationGatewayError::TransportError(e.to_string()))?;
                Ok(match acceptance {
                    FarsAcceptance::Accepted => ActivationOutcome::Accepted,
                    FarsAcceptance::Declined(status) => ActivationOutcome::Failure { status },
                })
            },
            // SmileOne creates external orders; it does not redeem codes.
            Activator::SmileOne => Err(ActivationGatewayError::NoHandler(provider)),
        }
    }

    async fn create_external_order(
        &self,
        request: &ExternalOrderRequest,
    ) -> Result<(bool, String), ActivationGatewayError> {
        let api = self.smileone.as_ref().ok_or(ActivationGatewayError::NoHandler(Activator::SmileOne))?;
        api.create_order(&request.product, &request.product_id, &request.user_id, request.zone_id.as_deref())
            .await
            .map_err(|e| ActivationGatewayError::TransportError(e.to_string()))
    }
}
