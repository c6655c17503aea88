//! Enable and start the configured systemd units.

use crate::config::Configuration;
use crate::error::StepError;
use crate::host::Host;
use crate::services::ServiceState;
use crate::step::{Step, StepResult};

pub struct EnableServices;

impl Step for EnableServices {
    fn name(&self) -> &'static str {
        "Enable services"
    }

    fn should_run(&self, config: &Configuration) -> bool {
        config.enable_services
    }

    fn apply(&self, config: &Configuration, host: &Host) -> Result<StepResult, StepError> {
        if config.services.is_empty() {
            return Ok(StepResult::success("no services configured"));
        }

        let mut done = Vec::new();
        let mut errors = Vec::new();

        // One broken unit must not keep the others disabled
        for unit in &config.services {
            match host.services.enable_now(unit) {
                Ok(ServiceState::AlreadyActive) => done.push(format!("{} (already active)", unit)),
                Ok(ServiceState::Started) => done.push(format!("{} (enabled)", unit)),
                Err(e) => errors.push(format!("{}: {}", unit, e)),
            }
        }

        if errors.is_empty() {
            Ok(StepResult::success(done.join(", ")))
        } else {
            Err(StepError::Partial {
                failed: errors.len(),
                total: config.services.len(),
                errors,
            })
        }
    }
}
