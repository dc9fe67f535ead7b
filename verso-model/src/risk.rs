use crate::Payload;

/// Scores how risky a payload is to publish, from 0.0 (safe) to 1.0.
///
/// The engine blocks any write scoring above its configured risk threshold.
/// Most deployments do not need one; [`NoRisk`] is the default.
pub trait RiskAnalyzer: Send + Sync {
    fn analyze(&self, payload: &Payload) -> f64;
}

/// Scores every payload as safe.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRisk;

impl RiskAnalyzer for NoRisk {
    fn analyze(&self, _payload: &Payload) -> f64 {
        0.0
    }
}

impl<F> RiskAnalyzer for F
where
    F: Fn(&Payload) -> f64 + Send + Sync,
{
    fn analyze(&self, payload: &Payload) -> f64 {
        self(payload)
    }
}
