use vm_infra::VmController;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub controller: VmController,
    pub config: AppConfig,
}
