//! 共享应用状态

use clinic_admin::DirectoryService;
use clinic_auth::AuthService;
use clinic_workflow::{AppointmentService, ClinicalRecordService, SlotService};

/// 接口层共享的服务集合
pub struct AppState {
    pub auth: AuthService,
    pub directory: DirectoryService,
    pub slots: SlotService,
    pub appointments: AppointmentService,
    pub records: ClinicalRecordService,
}
